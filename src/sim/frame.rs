/// Display composition, kept apart from the terminal.
///
/// A `Frame` is the room exactly as the player should see it this tick,
/// built in layers:
///
///   1. effective grid glyphs (layout + overlay)
///   2. compressed spring cells blanked
///   3. armed bombs drawn with their blink glyph
///   4. living avatars
///   5. darkness: unlit dark-zone cells blanked, avatars included
///
/// The renderer never reads the room directly. It asks for the cells that
/// changed since the previous frame and draws only those.

use crate::domain::glyph;
use crate::domain::motion::Pos;
use super::avatar::Avatar;
use super::room::Room;
use super::world::WorldState;

/// One cell to redraw.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CellChange {
    pub x: i32,
    pub y: i32,
    pub glyph: char,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    width: usize,
    height: usize,
    cells: Vec<char>,
}

impl Frame {
    pub fn compose(world: &WorldState) -> Frame {
        Self::compose_room(world.room(), &world.avatars, world.rules.bomb_blink_rate)
    }

    pub fn compose_room(room: &Room, avatars: &[Avatar; 2], blink_rate: u32) -> Frame {
        let (width, height) = (room.width(), room.height());
        let mut frame = Frame { width, height, cells: Vec::with_capacity(width * height) };
        for y in 0..height {
            for x in 0..width {
                frame.cells.push(room.char_at(Pos::new(x as i32, y as i32)));
            }
        }

        for spring in room.springs() {
            for p in spring.hidden_cells() {
                frame.set(p, glyph::AIR);
            }
        }
        for bomb in room.bombs() {
            frame.set(bomb.pos, bomb.blink_glyph(blink_rate));
        }
        for a in avatars.iter().filter(|a| a.alive) {
            frame.set(a.pos, a.glyph);
        }

        let vis = room.visibility();
        if vis.has_zones() {
            for y in 0..height {
                for x in 0..width {
                    let p = Pos::new(x as i32, y as i32);
                    if vis.is_hidden(p) {
                        frame.set(p, glyph::AIR);
                    }
                }
            }
        }
        frame
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, p: Pos) -> char {
        self.index(p).map(|i| self.cells[i]).unwrap_or(glyph::AIR)
    }

    fn index(&self, p: Pos) -> Option<usize> {
        if p.x < 0 || p.y < 0 || p.x as usize >= self.width || p.y as usize >= self.height {
            return None;
        }
        Some(p.y as usize * self.width + p.x as usize)
    }

    fn set(&mut self, p: Pos, c: char) {
        if let Some(i) = self.index(p) {
            self.cells[i] = c;
        }
    }

    /// Cells that differ from `prev`, row-major. Every cell when there is no
    /// previous frame or its size differs.
    pub fn diff(&self, prev: Option<&Frame>) -> Vec<CellChange> {
        let same_shape = prev.filter(|p| p.width == self.width && p.height == self.height);
        self.cells
            .iter()
            .enumerate()
            .filter(|&(i, c)| same_shape.map_or(true, |p| p.cells[i] != *c))
            .map(|(i, &c)| CellChange {
                x: (i % self.width) as i32,
                y: (i / self.width) as i32,
                glyph: c,
            })
            .collect()
    }

    /// Row strings, for logging and tests.
    pub fn rows(&self) -> Vec<String> {
        self.cells.chunks(self.width.max(1)).map(|r| r.iter().collect()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::Item;
    use crate::domain::lighting::DarkZone;
    use crate::domain::motion::Direction;
    use crate::sim::room::tests::{room_from, room_with};

    fn avatars(a: Pos, b: Pos) -> [Avatar; 2] {
        [Avatar::new(0, '$', a, 3), Avatar::new(1, '&', b, 3)]
    }

    #[test]
    fn avatars_drawn_over_grid() {
        let room = room_from(&[
            "WWWWW",
            "W K W",
            "WWWWW",
        ]);
        let f = Frame::compose_room(&room, &avatars(Pos::new(1, 1), Pos::new(3, 1)), 10);
        assert_eq!(f.rows(), vec!["WWWWW", "W$K&W", "WWWWW"]);
    }

    #[test]
    fn dead_avatar_not_drawn() {
        let room = room_from(&["WWW", "W W", "WWW"]);
        let mut av = avatars(Pos::new(1, 1), Pos::new(1, 1));
        av[0].alive = false;
        av[1].alive = false;
        let f = Frame::compose_room(&room, &av, 10);
        assert_eq!(f.get(Pos::new(1, 1)), ' ');
    }

    #[test]
    fn compressed_spring_shrinks_from_free_end() {
        let mut room = room_from(&[
            "WWWWWW",
            "W### W",
            "WWWWWW",
        ]);
        let far = avatars(Pos::new(9, 9), Pos::new(9, 9));
        if let Some(s) = room.spring_mut(0) {
            assert_eq!(s.projection(), Direction::Right);
            s.compress(0);
        }
        let f = Frame::compose_room(&room, &far, 10);
        assert_eq!(f.rows()[1], "W##  W");
    }

    #[test]
    fn bomb_blinks() {
        let mut room = room_from(&[
            "WWWWW",
            "W   W",
            "W   W",
            "WWWWW",
        ]);
        let far = avatars(Pos::new(9, 9), Pos::new(9, 9));
        let at = room.drop_item(Pos::new(2, 1), Item::Bomb, 10).expect("room for the bomb");
        // fuse 10, rate 10: 10 % 10 = 0 < 5
        assert_eq!(Frame::compose_room(&room, &far, 10).get(at), '@');
        room.update_bombs([Pos::new(9, 9); 2], 5);
        // fuse 9: 9 % 10 = 9 >= 5
        assert_eq!(Frame::compose_room(&room, &far, 10).get(at), '*');
    }

    #[test]
    fn darkness_hides_everything_unlit() {
        let mut room = room_with(
            &[
                "WWWWWWW",
                "W K   W",
                "W     W",
                "WWWWWWW",
            ],
            |d| d.dark_zones = vec![DarkZone::new(Pos::new(1, 1), Pos::new(3, 2))],
        );
        let av = avatars(Pos::new(1, 2), Pos::new(5, 2));
        room.update_visibility(&[], 2);
        let f = Frame::compose_room(&room, &av, 10);
        assert_eq!(f.rows(), vec!["WWWWWWW", "W     W", "W    &W", "WWWWWWW"]);

        room.update_visibility(&[Pos::new(1, 2)], 2);
        let f = Frame::compose_room(&room, &av, 10);
        assert_eq!(f.get(Pos::new(2, 1)), 'K');
        assert_eq!(f.get(Pos::new(1, 2)), '$');
    }

    #[test]
    fn diff_lists_only_changed_cells() {
        let room = room_from(&["WWWWW", "W   W", "WWWWW"]);
        let before = Frame::compose_room(&room, &avatars(Pos::new(1, 1), Pos::new(3, 1)), 10);
        assert_eq!(before.diff(None).len(), 15);

        let after = Frame::compose_room(&room, &avatars(Pos::new(2, 1), Pos::new(3, 1)), 10);
        assert_eq!(
            after.diff(Some(&before)),
            vec![
                CellChange { x: 1, y: 1, glyph: ' ' },
                CellChange { x: 2, y: 1, glyph: '$' },
            ]
        );
        assert!(after.diff(Some(&after)).is_empty());
    }
}
