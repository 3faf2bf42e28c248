/// Level pack loader.
///
/// ## Sources (priority order):
///   1. Pack file named by `general.pack` in `config.toml`
///   2. Built-in pack embedded in the binary
///
/// A pack that fails to load is reported with `warn!` and the built-in pack
/// is used instead.
///
/// ## Pack format (TOML):
///   ```toml
///   name = "Pack Name"
///   start_room = 0
///   final_room = 2
///
///   [[room]]
///   id = 0
///   name = "Room Name"
///   next = 1               # forward link (door with the same digit)
///   prev = 0               # backward link, optional
///   spawn = [3, 5]         # arrival from the previous room
///   spawn_back = [75, 17]  # arrival from the next room
///   riddles = [0]          # riddle ids for `?` cells, row-major
///   map = ["WWW", "W W", "WWW"]
///
///   [[room.door]]
///   id = 1
///   keys = 1
///   switches = 0
///
///   [[room.dark_zone]]
///   from = [21, 5]
///   to = [46, 14]
///   ```
///
/// Player 2 arrives one row below player 1, so `spawn.y + 1` should be
/// open floor too.

use std::collections::HashSet;
use std::path::Path;
use std::rc::Rc;

use serde::Deserialize;
use thiserror::Error;

use crate::domain::grid::Layout;
use crate::domain::lighting::DarkZone;
use crate::domain::motion::Pos;
use crate::domain::puzzle::MAX_DOORS;
use super::room::{DoorSpec, RoomDef};

const BUILTIN_PACK: &str = include_str!("builtin_pack.toml");

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("cannot read level pack: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse level pack: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("level pack has no rooms")]
    Empty,
    #[error("room {room}: row {row} is {len} wide, expected {expected}")]
    RaggedRow { room: u32, row: usize, len: usize, expected: usize },
    #[error("room {room}: map is empty")]
    EmptyMap { room: u32 },
    #[error("room {id} is defined twice")]
    DuplicateRoom { id: u32 },
    #[error("room {room} links to unknown room {link}")]
    UnknownLink { room: u32, link: u32 },
    #[error("room {room}: spawn ({x}, {y}) is outside the map")]
    SpawnOutside { room: u32, x: i32, y: i32 },
    #[error("room {room}: door id {id} is not a digit")]
    BadDoor { room: u32, id: u32 },
}

/// Everything the world needs to start a session.
#[derive(Clone, Debug)]
pub struct LevelPack {
    pub name: String,
    pub start_room: u32,
    pub final_room: u32,
    pub rooms: Vec<RoomDef>,
}

// ── TOML schema ──

#[derive(Deserialize)]
struct PackFile {
    #[serde(default = "default_pack_name")]
    name: String,
    #[serde(default)]
    start_room: u32,
    final_room: u32,
    #[serde(default)]
    room: Vec<RoomFile>,
}

#[derive(Deserialize)]
struct RoomFile {
    id: u32,
    #[serde(default)]
    name: String,
    next: Option<u32>,
    prev: Option<u32>,
    spawn: (i32, i32),
    spawn_back: Option<(i32, i32)>,
    #[serde(default)]
    riddles: Vec<u32>,
    map: Vec<String>,
    #[serde(default)]
    door: Vec<DoorFile>,
    #[serde(default)]
    dark_zone: Vec<ZoneFile>,
}

#[derive(Deserialize)]
struct DoorFile {
    id: u32,
    #[serde(default = "default_door_keys")]
    keys: u32,
    #[serde(default)]
    switches: u32,
}

#[derive(Deserialize)]
struct ZoneFile {
    from: (i32, i32),
    to: (i32, i32),
}

fn default_pack_name() -> String { "Unnamed Pack".into() }
fn default_door_keys() -> u32 { 1 }

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

impl LevelPack {
    pub fn builtin() -> Result<Self, LevelError> {
        Self::from_toml_str(BUILTIN_PACK)
    }

    pub fn load(path: &Path) -> Result<Self, LevelError> {
        let src = std::fs::read_to_string(path)?;
        Self::from_toml_str(&src)
    }

    /// Load `path` if given; any failure falls back to the built-in pack.
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self, LevelError> {
        if let Some(p) = path {
            match Self::load(p) {
                Ok(pack) => {
                    log::info!("loaded pack \"{}\" ({} rooms) from {}", pack.name, pack.rooms.len(), p.display());
                    return Ok(pack);
                }
                Err(e) => log::warn!("{}: {}; using built-in pack", p.display(), e),
            }
        }
        Self::builtin()
    }

    pub fn from_toml_str(src: &str) -> Result<Self, LevelError> {
        let file: PackFile = toml::from_str(src)?;
        if file.room.is_empty() {
            return Err(LevelError::Empty);
        }

        let mut seen = HashSet::new();
        let mut rooms = Vec::with_capacity(file.room.len());
        for r in file.room {
            if !seen.insert(r.id) {
                return Err(LevelError::DuplicateRoom { id: r.id });
            }
            rooms.push(build_room(r)?);
        }

        for def in &rooms {
            for link in [def.next, def.prev].into_iter().flatten() {
                if !seen.contains(&link) {
                    return Err(LevelError::UnknownLink { room: def.id, link });
                }
            }
        }
        for id in [file.start_room, file.final_room] {
            if !seen.contains(&id) {
                return Err(LevelError::UnknownLink { room: id, link: id });
            }
        }

        Ok(LevelPack {
            name: file.name,
            start_room: file.start_room,
            final_room: file.final_room,
            rooms,
        })
    }
}

// ══════════════════════════════════════════════════════════════
// Room validation
// ══════════════════════════════════════════════════════════════

fn build_room(r: RoomFile) -> Result<RoomDef, LevelError> {
    let expected = r.map.first().map(|row| row.chars().count()).unwrap_or(0);
    if expected == 0 {
        return Err(LevelError::EmptyMap { room: r.id });
    }
    for (row, line) in r.map.iter().enumerate() {
        let len = line.chars().count();
        if len != expected {
            return Err(LevelError::RaggedRow { room: r.id, row, len, expected });
        }
    }
    let layout = Layout::from_rows(&r.map);

    let spawn = Pos::new(r.spawn.0, r.spawn.1);
    let spawn_back = r.spawn_back.map(|(x, y)| Pos::new(x, y)).unwrap_or(spawn);
    for p in [spawn, spawn_back] {
        if !layout.in_bounds(p) {
            return Err(LevelError::SpawnOutside { room: r.id, x: p.x, y: p.y });
        }
    }

    let mut doors = Vec::with_capacity(r.door.len());
    for d in r.door {
        if d.id as usize >= MAX_DOORS {
            return Err(LevelError::BadDoor { room: r.id, id: d.id });
        }
        doors.push(DoorSpec { id: d.id as u8, keys: d.keys, switches: d.switches });
    }

    let dark_zones = r
        .dark_zone
        .iter()
        .map(|z| DarkZone::new(Pos::new(z.from.0, z.from.1), Pos::new(z.to.0, z.to.1)))
        .collect();

    let name = if r.name.is_empty() { format!("Room {}", r.id) } else { r.name };

    Ok(RoomDef {
        id: r.id,
        name,
        layout: Rc::new(layout),
        next: r.next,
        prev: r.prev,
        spawn,
        spawn_back,
        doors,
        dark_zones,
        riddles: r.riddles,
    })
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_ROOMS: &str = r#"
        final_room = 1

        [[room]]
        id = 0
        next = 1
        spawn = [1, 1]
        map = ["WWWW", "W  1", "W  W", "WWWW"]

        [[room.door]]
        id = 1
        keys = 2

        [[room]]
        id = 1
        prev = 0
        spawn = [1, 1]
        map = ["WWWW", "0  W", "W  W", "WWWW"]
    "#;

    #[test]
    fn builtin_pack_is_valid() {
        let pack = LevelPack::builtin().expect("built-in pack parses");
        assert_eq!(pack.rooms.len(), 3);
        assert_eq!(pack.final_room, 2);
        for def in &pack.rooms {
            assert_eq!(def.layout.width(), 79);
            assert_eq!(def.layout.height(), 21);
        }
        let cellar = &pack.rooms[1];
        assert_eq!(cellar.spawn, Pos::new(3, 5));
        assert_eq!(cellar.spawn_back, Pos::new(75, 17));
        assert_eq!(cellar.doors, vec![DoorSpec { id: 2, keys: 1, switches: 0 }]);
        assert_eq!(cellar.dark_zones.len(), 1);
        assert_eq!(cellar.layout.char_at(Pos::new(0, 5)), '0');
        assert_eq!(cellar.layout.char_at(Pos::new(78, 18)), '2');
    }

    #[test]
    fn small_pack_parses_with_defaults() {
        let pack = LevelPack::from_toml_str(TWO_ROOMS).expect("valid pack");
        assert_eq!(pack.name, "Unnamed Pack");
        assert_eq!(pack.start_room, 0);
        assert_eq!(pack.rooms[0].name, "Room 0");
        assert_eq!(pack.rooms[0].spawn_back, Pos::new(1, 1));
        assert_eq!(pack.rooms[0].doors[0], DoorSpec { id: 1, keys: 2, switches: 0 });
    }

    #[test]
    fn ragged_rows_rejected() {
        let src = TWO_ROOMS.replace("\"W  W\", \"WWWW\"]\n\n        [[room.door]]", "\"W W\", \"WWWW\"]\n\n        [[room.door]]");
        assert!(matches!(
            LevelPack::from_toml_str(&src),
            Err(LevelError::RaggedRow { room: 0, row: 2, len: 3, expected: 4 })
        ));
    }

    #[test]
    fn unknown_link_rejected() {
        let src = TWO_ROOMS.replace("next = 1", "next = 7");
        assert!(matches!(
            LevelPack::from_toml_str(&src),
            Err(LevelError::UnknownLink { room: 0, link: 7 })
        ));
    }

    #[test]
    fn duplicate_and_spawn_errors() {
        let dup = TWO_ROOMS.replace("id = 1\n        prev", "id = 0\n        prev");
        assert!(matches!(LevelPack::from_toml_str(&dup), Err(LevelError::DuplicateRoom { id: 0 })));

        let outside = TWO_ROOMS.replacen("spawn = [1, 1]", "spawn = [9, 1]", 1);
        assert!(matches!(
            LevelPack::from_toml_str(&outside),
            Err(LevelError::SpawnOutside { room: 0, x: 9, y: 1 })
        ));
    }

    #[test]
    fn missing_file_falls_back() {
        let pack = LevelPack::load_or_builtin(Some(Path::new("/nonexistent/pack.toml")))
            .expect("fallback to built-in");
        assert_eq!(pack.name, "Tandem");
    }
}
