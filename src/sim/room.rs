/// Room: the composition root of one level screen.
///
/// ## Layers
///
///   - `grid`: shared immutable layout + this room's mutation overlay.
///   - `entities`: arena of every object the layout produced or that was
///     dropped here. Removal deactivates the slot; slots are
///     reused by later drops.
///   - `cell_index`: O(1) cell → active entity lookup. At most one active
///     entity per cell.
///
/// All entity mutations go through `add_entity()` / `remove_entity()` so the
/// grid overlay and the index never drift apart.
///
/// ## Derived state
///
///   - `springs`: assembled at load from runs of `#`.
///   - `visibility`: dark-zone bitmap, recomputed every tick.
///   - `puzzle`: one-way latch over the room's switches.
///   - `bombs`: armed fuses, each tied to its bomb's arena slot.

use std::rc::Rc;

use crate::domain::entity::{Entity, EntityKind, Item};
use crate::domain::explosion::{self, BlastOutcome, RoomBomb};
use crate::domain::glyph;
use crate::domain::grid::{Grid, Layout};
use crate::domain::lighting::{DarkZone, Visibility};
use crate::domain::motion::Pos;
use crate::domain::puzzle::{DoorTable, PuzzleLatch};
use crate::domain::rules;
use crate::domain::spring::{self, Spring};

/// Upper bound on live entities per room.
pub const MAX_ENTITIES: usize = 4096;

/// Door requirement as written in a level pack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DoorSpec {
    pub id: u8,
    pub keys: u32,
    pub switches: u32,
}

/// Everything needed to build a room. Produced by the level loader.
#[derive(Clone, Debug)]
pub struct RoomDef {
    pub id: u32,
    pub name: String,
    pub layout: Rc<Layout>,
    pub next: Option<u32>,
    pub prev: Option<u32>,
    pub spawn: Pos,
    pub spawn_back: Pos,
    pub doors: Vec<DoorSpec>,
    pub dark_zones: Vec<DarkZone>,
    /// Riddle ids handed to `?` cells in row-major order.
    pub riddles: Vec<u32>,
}

/// Result of flipping a switch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwitchFlip {
    pub on: bool,
    /// The flip completed the room's puzzle.
    pub solved: bool,
}

/// A bomb that went off this tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Detonation {
    pub pos: Pos,
    pub outcome: BlastOutcome,
}

#[derive(Clone, Debug)]
pub struct Room {
    pub id: u32,
    pub name: String,
    grid: Grid,
    entities: Vec<Entity>,
    cell_index: Vec<Option<usize>>,
    springs: Vec<Spring>,
    doors: DoorTable,
    dark_zones: Vec<DarkZone>,
    visibility: Visibility,
    bombs: Vec<RoomBomb>,
    puzzle: PuzzleLatch,
    pub next: Option<u32>,
    pub prev: Option<u32>,
    pub spawn: Pos,
    pub spawn_back: Pos,
}

// ── Construction ──

impl Room {
    pub fn new(def: &RoomDef) -> Self {
        let grid = Grid::new(Rc::clone(&def.layout));
        let (w, h) = (grid.width(), grid.height());

        let mut doors = DoorTable::default();
        for d in &def.doors {
            doors.set_requirements(d.id, d.keys, d.switches);
        }

        let mut room = Room {
            id: def.id,
            name: def.name.clone(),
            grid,
            entities: Vec::new(),
            cell_index: vec![None; w * h],
            springs: Vec::new(),
            doors,
            dark_zones: def.dark_zones.clone(),
            visibility: Visibility::new(w, h, &def.dark_zones),
            bombs: Vec::new(),
            puzzle: PuzzleLatch::default(),
            next: def.next,
            prev: def.prev,
            spawn: def.spawn,
            spawn_back: def.spawn_back,
        };
        room.populate(&def.riddles);
        room
    }

    /// Factory pass over the layout: one entity per non-air glyph.
    fn populate(&mut self, riddle_ids: &[u32]) {
        let (w, h) = (self.grid.width(), self.grid.height());
        let mut riddle_seq = 0usize;
        let mut total_switches = 0;
        let mut on_switches = 0;

        for y in 0..h {
            for x in 0..w {
                let p = Pos::new(x as i32, y as i32);
                let c = self.grid.char_at(p);
                if c == glyph::SPRING {
                    continue;
                }
                let Some(mut e) = Entity::from_glyph(c, p) else { continue };
                match e.kind {
                    EntityKind::Riddle { .. } => {
                        let id = riddle_ids.get(riddle_seq).copied().unwrap_or(riddle_seq as u32);
                        e.set_kind(EntityKind::Riddle { riddle_id: id });
                        riddle_seq += 1;
                    }
                    EntityKind::Switch { on } => {
                        total_switches += 1;
                        if on {
                            on_switches += 1;
                        }
                    }
                    _ => {}
                }
                self.insert_entity(e);
            }
        }
        self.puzzle = PuzzleLatch::new(total_switches, on_switches);

        let grid = &self.grid;
        let runs = spring::collect_runs(w, h, |p| grid.char_at(p) == glyph::SPRING);
        for run in runs {
            match Spring::assemble(run.clone(), |p| glyph::is_wall(self.grid.char_at(p))) {
                Ok(s) => {
                    let idx = self.springs.len();
                    for &p in s.cells() {
                        self.insert_entity(Entity::new(EntityKind::Spring { spring: idx }, p));
                    }
                    self.springs.push(s);
                }
                Err(e) => {
                    log::warn!("room {}: {}; spring discarded", self.id, e);
                    for p in run {
                        self.grid.set_char_at(p, glyph::AIR);
                    }
                }
            }
        }
    }

    fn index_of(&self, p: Pos) -> Option<usize> {
        if !self.grid.in_bounds(p) {
            return None;
        }
        Some(p.y as usize * self.grid.width() + p.x as usize)
    }

    /// Arena insert without touching the grid. Reuses a dead slot if any.
    fn insert_entity(&mut self, e: Entity) -> Option<usize> {
        let cell = self.index_of(e.pos)?;
        if self.cell_index[cell].is_some() {
            return None;
        }
        let slot = match self.entities.iter().position(|x| !x.active) {
            Some(i) => {
                self.entities[i] = e;
                i
            }
            None if self.entities.len() < MAX_ENTITIES => {
                self.entities.push(e);
                self.entities.len() - 1
            }
            None => {
                log::warn!("room {}: entity arena full", self.id);
                return None;
            }
        };
        self.cell_index[cell] = Some(slot);
        Some(slot)
    }
}

// ── Grid / entity query and mutation API ──

impl Room {
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn width(&self) -> usize {
        self.grid.width()
    }

    pub fn height(&self) -> usize {
        self.grid.height()
    }

    #[inline]
    pub fn char_at(&self, p: Pos) -> char {
        self.grid.char_at(p)
    }

    pub fn set_char_at(&mut self, p: Pos, c: char) -> bool {
        self.grid.set_char_at(p, c)
    }

    /// Active entity at `p`, with its arena index.
    pub fn entity_at(&self, p: Pos) -> Option<(usize, &Entity)> {
        let i = self.cell_index[self.index_of(p)?]?;
        let e = &self.entities[i];
        e.active.then_some((i, e))
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(|e| e.active)
    }

    /// Place a new entity and paint its glyph. Fails if the cell is taken or
    /// the arena is full.
    pub fn add_entity(&mut self, e: Entity) -> Option<usize> {
        let (p, g) = (e.pos, e.glyph);
        let slot = self.insert_entity(e)?;
        self.grid.set_char_at(p, g);
        Some(slot)
    }

    /// Deactivate an entity and blank its cell. A bomb's fuse goes with it.
    pub fn remove_entity(&mut self, idx: usize) -> Option<Entity> {
        let e = self.entities.get_mut(idx).filter(|e| e.active)?;
        e.active = false;
        let removed = e.clone();
        if let Some(cell) = self.index_of(removed.pos) {
            self.cell_index[cell] = None;
        }
        self.bombs.retain(|b| b.entity != idx);
        self.grid.set_char_at(removed.pos, glyph::AIR);
        Some(removed)
    }

    /// Drop an item next to `origin`. Armed bombs get `fuse` ticks.
    pub fn drop_item(&mut self, origin: Pos, item: Item, fuse: u32) -> Option<Pos> {
        let at = rules::find_drop_cell(&self.grid, origin, |p| self.entity_at(p).is_some())?;
        let slot = self.add_entity(item.into_entity(at))?;
        if item == Item::Bomb {
            self.bombs.push(RoomBomb::new(at, slot, fuse));
            log::info!("room {}: bomb armed at ({}, {})", self.id, at.x, at.y);
        }
        Some(at)
    }
}

// ── Puzzle and doors ──

impl Room {
    pub fn active_switches(&self) -> u32 {
        self.entities()
            .filter(|e| matches!(e.kind, EntityKind::Switch { on: true }))
            .count() as u32
    }

    pub fn puzzle(&self) -> &PuzzleLatch {
        &self.puzzle
    }

    /// Flip the switch at `idx` and re-evaluate the puzzle latch before
    /// returning.
    pub fn toggle_switch(&mut self, idx: usize) -> Option<SwitchFlip> {
        let e = self.entities.get_mut(idx).filter(|e| e.active)?;
        let on = e.toggle()?;
        let (p, g) = (e.pos, e.glyph);
        self.grid.set_char_at(p, g);

        let solved = self.puzzle.update(self.active_switches());
        if solved {
            self.clear_switch_controlled();
            log::info!("room {}: switch puzzle solved", self.id);
        }
        Some(SwitchFlip { on, solved })
    }

    fn clear_switch_controlled(&mut self) {
        let targets: Vec<usize> = self
            .entities
            .iter()
            .enumerate()
            .filter(|(_, e)| e.active && e.kind.is_switch_controlled())
            .map(|(i, _)| i)
            .collect();
        for i in targets {
            self.remove_entity(i);
        }
    }

    pub fn doors(&self) -> &DoorTable {
        &self.doors
    }

    pub fn can_open_door(&self, id: u8, keys_held: u32) -> bool {
        self.doors.can_open(id, keys_held, self.active_switches())
    }

    pub fn unlock_door(&mut self, id: u8) -> bool {
        let unlocked = self.doors.unlock(id);
        if unlocked {
            log::info!("room {}: door {} unlocked", self.id, id);
        }
        unlocked
    }

    /// Does door `id` lead forward from this room?
    pub fn is_forward_door(&self, id: u8) -> bool {
        self.next == Some(id as u32)
    }

    pub fn is_backward_door(&self, id: u8) -> bool {
        self.prev == Some(id as u32)
    }
}

// ── Bombs ──

impl Room {
    pub fn bombs(&self) -> &[RoomBomb] {
        &self.bombs
    }

    /// Advance every fuse, then detonate the expired bombs in list order.
    /// A bomb caught in an earlier blast of the same tick is gone by then
    /// and never fires.
    pub fn update_bombs(&mut self, avatars: [Pos; 2], radius: i32) -> Vec<Detonation> {
        let due: Vec<usize> = self
            .bombs
            .iter_mut()
            .filter_map(|b| b.tick().then_some(b.entity))
            .collect();

        let mut fired = Vec::new();
        for entity in due {
            let Some(i) = self.bombs.iter().position(|b| b.entity == entity) else {
                continue;
            };
            let pos = self.bombs.remove(i).pos;
            let outcome = self.detonate(pos, radius, avatars);
            fired.push(Detonation { pos, outcome });
        }
        fired
    }

    /// Remove the bomb at `center`, then sweep the blast. Springs lose every
    /// cell the blast cuts off from their anchor.
    pub fn detonate(&mut self, center: Pos, radius: i32, avatars: [Pos; 2]) -> BlastOutcome {
        if let Some((i, _)) = self.entity_at(center) {
            self.remove_entity(i);
        }
        self.grid.set_char_at(center, glyph::AIR);

        let grid = &self.grid;
        let cells = explosion::blast_cells(center, radius, |p| grid.in_bounds(p), |p| grid.char_at(p));

        let mut out = BlastOutcome::default();
        for &p in &cells {
            for (k, &a) in avatars.iter().enumerate() {
                if a == p {
                    out.avatar_hit[k] = true;
                }
            }
            match self.entity_at(p).map(|(i, e)| (i, e.kind)) {
                Some((i, kind)) => {
                    if kind == EntityKind::Key {
                        out.key_destroyed = true;
                    }
                    if kind.on_explosion() {
                        self.remove_entity(i);
                        out.destroyed += 1;
                    }
                }
                None => {
                    if glyph::is_blast_debris(self.grid.char_at(p)) {
                        self.grid.set_char_at(p, glyph::AIR);
                        out.destroyed += 1;
                    }
                }
            }
        }

        for idx in 0..self.springs.len() {
            for p in self.springs[idx].break_cells(&cells) {
                if let Some((i, _)) = self.entity_at(p) {
                    self.remove_entity(i);
                }
            }
        }

        log::info!(
            "room {}: detonation at ({}, {}), {} destroyed",
            self.id, center.x, center.y, out.destroyed
        );
        out
    }
}

// ── Visibility ──

impl Room {
    pub fn visibility(&self) -> &Visibility {
        &self.visibility
    }

    /// Skipped entirely for rooms without dark zones.
    pub fn update_visibility(&mut self, torch_bearers: &[Pos], radius: i32) {
        if self.dark_zones.is_empty() {
            return;
        }
        self.visibility.recompute(torch_bearers, radius);
    }
}

// ── Springs ──

impl Room {
    pub fn springs(&self) -> &[Spring] {
        &self.springs
    }

    pub fn spring_mut(&mut self, idx: usize) -> Option<&mut Spring> {
        self.springs.get_mut(idx)
    }

    /// Spring owning the cell at `p`.
    pub fn spring_at(&self, p: Pos) -> Option<usize> {
        match self.entity_at(p)?.1.kind {
            EntityKind::Spring { spring } => Some(spring),
            _ => None,
        }
    }

    /// Spring the avatar is currently compressing.
    pub fn compressed_by(&self, avatar: usize) -> Option<usize> {
        self.springs.iter().position(|s| s.compression_of(avatar) > 0)
    }

    /// Spring currently launching the avatar.
    pub fn launching(&self, avatar: usize) -> Option<usize> {
        self.springs.iter().position(|s| s.launch_of(avatar).is_some())
    }

    pub fn reset_springs(&mut self) {
        for s in &mut self.springs {
            s.reset();
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::motion::Direction;

    /// Helper: build a room from a string diagram (layout glyphs).
    pub(crate) fn room_from(rows: &[&str]) -> Room {
        room_with(rows, |_| {})
    }

    pub(crate) fn room_with(rows: &[&str], tweak: impl FnOnce(&mut RoomDef)) -> Room {
        let mut def = RoomDef {
            id: 0,
            name: "test".into(),
            layout: Rc::new(Layout::from_rows(rows)),
            next: Some(1),
            prev: None,
            spawn: Pos::new(1, 1),
            spawn_back: Pos::new(1, 1),
            doors: vec![],
            dark_zones: vec![],
            riddles: vec![],
        };
        tweak(&mut def);
        Room::new(&def)
    }

    const FAR: [Pos; 2] = [Pos::new(-9, -9), Pos::new(-9, -9)];

    #[test]
    fn factory_indexes_every_glyph() {
        let r = room_from(&[
            "WWWWWW",
            "WK\\?=W",
            "WWWWWW",
        ]);
        assert_eq!(r.entity_at(Pos::new(1, 1)).map(|(_, e)| e.kind), Some(EntityKind::Key));
        assert_eq!(r.entity_at(Pos::new(0, 0)).map(|(_, e)| e.kind), Some(EntityKind::Wall));
        assert!(r.entity_at(Pos::new(9, 9)).is_none());
        assert_eq!(r.puzzle().total_switches, 1);
    }

    #[test]
    fn riddle_ids_assigned_in_reading_order() {
        let r = room_with(
            &[
                "WWWWW",
                "W? ?W",
                "W?  W",
                "WWWWW",
            ],
            |d| d.riddles = vec![4, 2],
        );
        let id = |p| match r.entity_at(p).map(|(_, e)| e.kind) {
            Some(EntityKind::Riddle { riddle_id }) => riddle_id,
            _ => u32::MAX,
        };
        assert_eq!(id(Pos::new(1, 1)), 4);
        assert_eq!(id(Pos::new(3, 1)), 2);
        // Out of listed ids: falls back to its sequence number
        assert_eq!(id(Pos::new(1, 2)), 2);
    }

    #[test]
    fn malformed_spring_is_blanked() {
        let r = room_from(&[
            "WWWWWWW",
            "W ### W",
            "W     W",
            "WWWWWWW",
        ]);
        assert!(r.springs().is_empty());
        assert_eq!(r.char_at(Pos::new(2, 1)), ' ');
        assert_eq!(r.char_at(Pos::new(4, 1)), ' ');
        assert!(r.entity_at(Pos::new(3, 1)).is_none());
    }

    #[test]
    fn spring_cells_map_to_their_spring() {
        let r = room_from(&[
            "WWWWWWW",
            "W##   W",
            "W   ##W",
            "WWWWWWW",
        ]);
        assert_eq!(r.springs().len(), 2);
        assert_eq!(r.spring_at(Pos::new(2, 1)), Some(0));
        assert_eq!(r.spring_at(Pos::new(4, 2)), Some(1));
        assert_eq!(r.springs()[0].projection(), Direction::Right);
        assert_eq!(r.springs()[1].projection(), Direction::Left);
    }

    // ── Switch puzzle scenario ──

    #[test]
    fn two_switches_open_obstacles() {
        let mut r = room_with(
            &[
                "WWWWWWW",
                "W\\ \\ *W",
                "W   ZZW",
                "WWWWWWW",
            ],
            |d| d.doors = vec![DoorSpec { id: 1, keys: 0, switches: 2 }],
        );
        let a = r.entity_at(Pos::new(1, 1)).map(|(i, _)| i).expect("switch A");
        let b = r.entity_at(Pos::new(3, 1)).map(|(i, _)| i).expect("switch B");

        assert_eq!(r.toggle_switch(a), Some(SwitchFlip { on: true, solved: false }));
        assert!(!r.puzzle().solved);
        assert!(r.entity_at(Pos::new(5, 1)).map(|(_, e)| e.is_blocking()).unwrap_or(false));
        assert!(!r.can_open_door(1, 0));

        assert_eq!(r.toggle_switch(b), Some(SwitchFlip { on: true, solved: true }));
        assert!(r.puzzle().solved);
        assert!(r.entity_at(Pos::new(5, 1)).is_none());
        assert!(r.entity_at(Pos::new(4, 2)).is_none());
        assert_eq!(r.char_at(Pos::new(5, 1)), ' ');
        assert_eq!(r.char_at(Pos::new(4, 2)), ' ');
        assert!(r.can_open_door(1, 0));
    }

    #[test]
    fn switch_round_trip_does_not_double_count() {
        let mut r = room_from(&[
            "WWWWWW",
            "W\\ \\*W",
            "WWWWWW",
        ]);
        let a = r.entity_at(Pos::new(1, 1)).map(|(i, _)| i).expect("switch");
        r.toggle_switch(a);
        r.toggle_switch(a);
        assert_eq!(r.char_at(Pos::new(1, 1)), '\\');
        assert_eq!(r.active_switches(), 0);
        r.toggle_switch(a);
        assert!(!r.puzzle().solved);
        assert!(r.entity_at(Pos::new(4, 1)).is_some());
    }

    #[test]
    fn latch_survives_switch_off() {
        let mut r = room_from(&[
            "WWWWW",
            "W\\ *W",
            "WWWWW",
        ]);
        let a = r.entity_at(Pos::new(1, 1)).map(|(i, _)| i).expect("switch");
        assert!(r.toggle_switch(a).map(|f| f.solved).unwrap_or(false));
        r.toggle_switch(a);
        assert!(r.puzzle().solved);
        assert!(r.entity_at(Pos::new(3, 1)).is_none());
    }

    // ── Explosion scenario ──

    fn open_room() -> Vec<String> {
        let mut rows = vec!["W".repeat(21)];
        for _ in 0..11 {
            rows.push(format!("W{}W", " ".repeat(19)));
        }
        rows.push("W".repeat(21));
        rows
    }

    fn put(rows: &mut [String], p: Pos, c: char) {
        let mut chars: Vec<char> = rows[p.y as usize].chars().collect();
        chars[p.x as usize] = c;
        rows[p.y as usize] = chars.into_iter().collect();
    }

    #[test]
    fn bomb_scenario_fuse_radius_occlusion() {
        let mut rows = open_room();
        let center = Pos::new(10, 6);
        put(&mut rows, Pos::new(13, 6), '=');
        put(&mut rows, Pos::new(10, 4), 'W');
        let refs: Vec<&str> = rows.iter().map(String::as_str).collect();
        let mut r = room_from(&refs);

        assert_eq!(r.drop_item(Pos::new(10, 5), Item::Bomb, 50), Some(center));
        let avatars = [Pos::new(6, 6), Pos::new(1, 1)];
        for _ in 0..49 {
            assert!(r.update_bombs(avatars, 5).is_empty());
        }
        let fired = r.update_bombs(avatars, 5);
        assert_eq!(fired.len(), 1);
        let out = fired[0].outcome;

        assert_eq!(r.char_at(Pos::new(13, 6)), ' ');
        assert!(r.entity_at(Pos::new(13, 6)).is_none());
        assert_eq!(r.char_at(Pos::new(10, 4)), 'W');
        assert!(out.avatar_hit[0]);
        assert!(!out.avatar_hit[1]);
        assert!(!out.key_destroyed);
        assert!(r.bombs().is_empty());
        assert_eq!(r.char_at(center), ' ');
    }

    #[test]
    fn blast_spares_far_and_shadowed_cells() {
        let mut rows = open_room();
        put(&mut rows, Pos::new(16, 6), '=');
        put(&mut rows, Pos::new(12, 8), 'W');
        put(&mut rows, Pos::new(13, 9), '=');
        put(&mut rows, Pos::new(8, 6), 'K');
        put(&mut rows, Pos::new(10, 9), '5');
        let refs: Vec<&str> = rows.iter().map(String::as_str).collect();
        let mut r = room_from(&refs);

        let out = r.detonate(Pos::new(10, 6), 5, FAR);
        // Distance 6
        assert_eq!(r.char_at(Pos::new(16, 6)), '=');
        // Within range, behind the W at (12,8)
        assert_eq!(r.char_at(Pos::new(13, 9)), '=');
        assert_eq!(r.char_at(Pos::new(10, 9)), '5');
        assert!(out.key_destroyed);
        assert!(out.is_fatal());
    }

    #[test]
    fn blast_shortens_spring_from_free_end() {
        let mut r = room_from(&[
            "WWWWWWW",
            "W##   W",
            "W     W",
            "WWWWWWW",
        ]);
        let out = r.detonate(Pos::new(4, 1), 2, FAR);
        assert_eq!(r.char_at(Pos::new(2, 1)), ' ');
        assert!(r.entity_at(Pos::new(2, 1)).is_none());
        assert_eq!(out.destroyed, 1);
        assert_eq!(r.springs()[0].cells(), &[Pos::new(1, 1)]);
        assert_eq!(r.spring_at(Pos::new(1, 1)), Some(0));
    }

    #[test]
    fn blast_at_anchor_takes_whole_spring() {
        let mut r = room_from(&[
            "WWWWWWW",
            "W##   W",
            "W     W",
            "WWWWWWW",
        ]);
        let out = r.detonate(Pos::new(1, 2), 1, FAR);
        assert_eq!(out.destroyed, 1);
        // Cut off from the wall, the far cell falls too.
        assert_eq!(r.char_at(Pos::new(1, 1)), ' ');
        assert_eq!(r.char_at(Pos::new(2, 1)), ' ');
        assert!(r.spring_at(Pos::new(2, 1)).is_none());
        assert_eq!(r.springs()[0].len(), 0);
    }

    #[test]
    fn chained_bomb_is_defused() {
        let mut r = room_from(&[
            "WWWWWWWW",
            "W      W",
            "W      W",
            "WWWWWWWW",
        ]);
        let first = r.drop_item(Pos::new(2, 1), Item::Bomb, 2).expect("first bomb");
        let second = r.drop_item(Pos::new(3, 1), Item::Bomb, 2).expect("second bomb");
        r.update_bombs(FAR, 2);
        let fired = r.update_bombs(FAR, 2);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].pos, first);
        assert_eq!(r.char_at(second), ' ');
        assert!(r.bombs().is_empty());
    }

    #[test]
    fn fuse_dies_with_its_bomb() {
        let mut r = room_from(&[
            "WWWWW",
            "W   W",
            "W   W",
            "WWWWW",
        ]);
        let at = r.drop_item(Pos::new(2, 1), Item::Bomb, 5).expect("bomb");
        let (i, _) = r.entity_at(at).expect("armed bomb");
        r.remove_entity(i);
        assert!(r.bombs().is_empty());

        // Same cell, likely the same slot: only the new fuse counts.
        assert_eq!(r.drop_item(Pos::new(2, 1), Item::Bomb, 50), Some(at));
        for _ in 0..10 {
            assert!(r.update_bombs(FAR, 1).is_empty());
        }
        assert_eq!(r.bombs().len(), 1);
        assert_eq!(r.bombs()[0].fuse, 40);
    }

    #[test]
    fn bombs_tick_independently() {
        let mut r = room_from(&[
            "WWWWWWWWWWWWWWWWWWWW",
            "W                  W",
            "W                  W",
            "WWWWWWWWWWWWWWWWWWWW",
        ]);
        r.drop_item(Pos::new(2, 1), Item::Bomb, 3);
        r.drop_item(Pos::new(16, 1), Item::Bomb, 5);
        assert_eq!(r.bombs().len(), 2);
        r.update_bombs(FAR, 1);
        r.update_bombs(FAR, 1);
        assert_eq!(r.update_bombs(FAR, 1).len(), 1);
        assert_eq!(r.bombs().len(), 1);
        r.update_bombs(FAR, 1);
        assert_eq!(r.update_bombs(FAR, 1).len(), 1);
        assert!(r.bombs().is_empty());
    }

    // ── Drop / pickup ──

    #[test]
    fn dropped_key_lands_below_first() {
        let mut r = room_from(&[
            "WWWWW",
            "W   W",
            "W   W",
            "W   W",
            "WWWWW",
        ]);
        assert_eq!(r.drop_item(Pos::new(2, 2), Item::Key, 50), Some(Pos::new(2, 3)));
        assert_eq!(r.char_at(Pos::new(2, 3)), 'K');
        assert_eq!(r.drop_item(Pos::new(2, 2), Item::Torch, 50), Some(Pos::new(2, 1)));
        assert!(r.bombs().is_empty());
    }

    #[test]
    fn removed_slot_is_reused() {
        let mut r = room_from(&[
            "WWWWW",
            "W K W",
            "W   W",
            "WWWWW",
        ]);
        let (i, _) = r.entity_at(Pos::new(2, 1)).expect("key");
        let before = r.entities().count();
        assert!(r.remove_entity(i).is_some());
        assert!(r.remove_entity(i).is_none());
        assert_eq!(r.entities().count(), before - 1);
        assert_eq!(r.add_entity(Item::Key.into_entity(Pos::new(2, 2))), Some(i));
    }

    // ── Visibility ──

    #[test]
    fn dark_room_hides_until_torch() {
        let mut r = room_with(
            &[
                "WWWWWWWWWW",
                "W        W",
                "W        W",
                "W        W",
                "WWWWWWWWWW",
            ],
            |d| d.dark_zones = vec![DarkZone::new(Pos::new(2, 1), Pos::new(7, 3))],
        );
        r.update_visibility(&[], 2);
        assert!(r.visibility().is_hidden(Pos::new(4, 2)));
        r.update_visibility(&[Pos::new(4, 2)], 2);
        assert!(!r.visibility().is_hidden(Pos::new(4, 2)));
        assert!(!r.visibility().is_hidden(Pos::new(6, 2)));
        assert!(r.visibility().is_hidden(Pos::new(7, 2)));
    }
}
