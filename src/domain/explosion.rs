/// Bomb fuses and blast geometry.
///
/// A bomb goes armed(fuse > 0) → exploding(fuse == 0) → removed. A fuse
/// record belongs to one entity slot and dies with it. The blast
/// covers every cell with dx² + dy² <= R² that has line of sight to the
/// center. Walls (`W`) and doors (digits) occlude the ray and are never
/// affected themselves.
///
/// Everything here is pure over a `char_at` lookup; the room applies the
/// destructive effects.

use super::glyph;
use super::motion::Pos;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct RoomBomb {
    pub pos: Pos,
    /// Arena slot of the bomb entity this fuse belongs to.
    pub entity: usize,
    pub fuse: u32,
}

impl RoomBomb {
    pub fn new(pos: Pos, entity: usize, fuse: u32) -> Self {
        RoomBomb { pos, entity, fuse }
    }

    /// Burn one tick of fuse. Returns true on the tick the bomb detonates.
    pub fn tick(&mut self) -> bool {
        self.fuse = self.fuse.saturating_sub(1);
        self.fuse == 0
    }

    /// `@` for the first half of each blink period, `*` for the second.
    pub fn blink_glyph(&self, blink_rate: u32) -> char {
        let rate = blink_rate.max(2);
        if self.fuse % rate < rate / 2 {
            glyph::BOMB
        } else {
            glyph::BOMB_BLINK
        }
    }
}

/// What a detonation did. Merged across all bombs of a tick.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct BlastOutcome {
    pub avatar_hit: [bool; 2],
    pub key_destroyed: bool,
    pub destroyed: u32,
}

impl BlastOutcome {
    pub fn merge(&mut self, other: BlastOutcome) {
        self.avatar_hit[0] |= other.avatar_hit[0];
        self.avatar_hit[1] |= other.avatar_hit[1];
        self.key_destroyed |= other.key_destroyed;
        self.destroyed += other.destroyed;
    }

    /// Any of these ends the game.
    pub fn is_fatal(&self) -> bool {
        self.avatar_hit[0] || self.avatar_hit[1] || self.key_destroyed
    }
}

/// Bresenham walk from `from` to `to`. Fails on the first intermediate cell
/// that is a wall or door. Neither endpoint is tested.
pub fn line_of_sight(from: Pos, to: Pos, char_at: impl Fn(Pos) -> char) -> bool {
    let dx = (to.x - from.x).abs();
    let dy = (to.y - from.y).abs();
    let sx = if from.x < to.x { 1 } else { -1 };
    let sy = if from.y < to.y { 1 } else { -1 };
    let mut err = dx - dy;
    let mut cur = from;

    while cur != to {
        if cur != from && glyph::is_blast_proof(char_at(cur)) {
            return false;
        }
        let e2 = 2 * err;
        if e2 > -dy {
            err -= dy;
            cur.x += sx;
        }
        if e2 < dx {
            err += dx;
            cur.y += sy;
        }
    }
    true
}

/// Cells a blast at `center` reaches, row-major from the top-left of the
/// bounding square. Out-of-grid cells, cells beyond the radius, occluded
/// cells and blast-proof cells are excluded.
pub fn blast_cells(
    center: Pos,
    radius: i32,
    in_bounds: impl Fn(Pos) -> bool,
    char_at: impl Fn(Pos) -> char,
) -> Vec<Pos> {
    let r_sq = radius * radius;
    let mut cells = Vec::new();
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let p = center.offset(dx, dy);
            if !in_bounds(p) || dx * dx + dy * dy > r_sq {
                continue;
            }
            if !line_of_sight(center, p, &char_at) {
                continue;
            }
            if glyph::is_blast_proof(char_at(p)) {
                continue;
            }
            cells.push(p);
        }
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup<'a>(rows: &'a [&'a str]) -> impl Fn(Pos) -> char + 'a {
        move |p: Pos| {
            if p.y < 0 || p.x < 0 {
                return 'W';
            }
            rows.get(p.y as usize)
                .and_then(|r| r.chars().nth(p.x as usize))
                .unwrap_or('W')
        }
    }

    fn bounds(w: i32, h: i32) -> impl Fn(Pos) -> bool {
        move |p: Pos| p.x >= 0 && p.y >= 0 && p.x < w && p.y < h
    }

    #[test]
    fn fuse_counts_down_to_detonation() {
        let mut b = RoomBomb::new(Pos::new(1, 1), 0, 3);
        assert!(!b.tick());
        assert!(!b.tick());
        assert!(b.tick());
        assert_eq!(b.fuse, 0);
    }

    #[test]
    fn blink_halves() {
        let mut b = RoomBomb::new(Pos::new(0, 0), 0, 50);
        assert_eq!(b.blink_glyph(10), '@');
        b.fuse = 47;
        assert_eq!(b.blink_glyph(10), '*');
        b.fuse = 44;
        assert_eq!(b.blink_glyph(10), '@');
    }

    #[test]
    fn wall_occludes_but_breakable_does_not() {
        let rows = [
            "       ",
            "  W  = ",
            "       ",
        ];
        let at = lookup(&rows);
        // Ray through the W at (2,1)
        assert!(!line_of_sight(Pos::new(0, 1), Pos::new(4, 1), &at));
        // Ray ending on the W is not occluded by it
        assert!(line_of_sight(Pos::new(0, 1), Pos::new(2, 1), &at));
        // Breakable walls do not stop the ray
        assert!(line_of_sight(Pos::new(4, 1), Pos::new(6, 1), &at));
    }

    #[test]
    fn door_occludes() {
        let rows = ["  3  "];
        assert!(!line_of_sight(Pos::new(0, 0), Pos::new(4, 0), lookup(&rows)));
    }

    #[test]
    fn radius_is_inclusive_euclidean() {
        let rows = [
            "           ",
            "           ",
            "           ",
            "           ",
            "           ",
            "           ",
            "           ",
        ];
        let cells = blast_cells(Pos::new(5, 3), 3, bounds(11, 7), lookup(&rows));
        assert!(cells.contains(&Pos::new(8, 3)));
        assert!(cells.contains(&Pos::new(5, 0)));
        // (2,2) away: 4+4 = 8 <= 9
        assert!(cells.contains(&Pos::new(7, 5)));
        // (3,1): 9+1 = 10 > 9
        assert!(!cells.contains(&Pos::new(8, 4)));
        assert!(cells.contains(&Pos::new(5, 3)));
    }

    #[test]
    fn blast_skips_walls_doors_and_shadow() {
        let rows = [
            "         ",
            " =  W  = ",
            "    4    ",
        ];
        let cells = blast_cells(Pos::new(2, 1), 5, bounds(9, 3), lookup(&rows));
        assert!(cells.contains(&Pos::new(1, 1)));
        assert!(!cells.contains(&Pos::new(4, 1)));
        assert!(!cells.contains(&Pos::new(4, 2)));
        // Behind the W on the same row
        assert!(!cells.contains(&Pos::new(7, 1)));
    }

    #[test]
    fn outcome_merges_by_or() {
        let mut acc = BlastOutcome::default();
        acc.merge(BlastOutcome { avatar_hit: [false, true], key_destroyed: false, destroyed: 2 });
        acc.merge(BlastOutcome { avatar_hit: [false, false], key_destroyed: true, destroyed: 1 });
        assert_eq!(acc.avatar_hit, [false, true]);
        assert!(acc.key_destroyed);
        assert_eq!(acc.destroyed, 3);
        assert!(acc.is_fatal());
        assert!(!BlastOutcome::default().is_fatal());
    }
}
