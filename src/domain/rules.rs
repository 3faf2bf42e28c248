/// Movement rules: truth-table driven.
///
/// Pure classification of a one-cell step. No side effects: the room
/// applies whatever the verdict asks for.
///
/// ## Step Truth Table
///
/// Rows are evaluated top to bottom; the first match wins.
///
/// ┌────────────────────────────────────┬──────────────┬──────────────────────┐
/// │ Condition                           │ Verdict      │ Notes                │
/// ├────────────────────────────────────┼──────────────┼──────────────────────┤
/// │ target out of grid                  │ OutOfGrid    │ DENY                 │
/// │ target on outer ring, not a door    │ Border       │ DENY                 │
/// │ target glyph `W` or `=`             │ Wall         │ DENY                 │
/// │ entity is a riddle                  │ Riddle       │ prompt decides       │
/// │ entity is a switch                  │ Switch       │ toggle, then DENY    │
/// │ entity is blocking                  │ Blocked      │ DENY                 │
/// │ entity pickable, slot empty         │ Pickup       │ ALLOW + collect      │
/// │ entity is a door                    │ Door         │ ALLOW + at-door flag │
/// │ otherwise                           │ Open         │ ALLOW                │
/// └────────────────────────────────────┴──────────────┴──────────────────────┘
///
/// A pickable entity with a full slot falls through to `Open`: the avatar
/// walks over it and it stays where it is.

use super::entity::{Entity, EntityKind, Item};
use super::glyph;
use super::grid::Grid;
use super::motion::Pos;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StepVerdict {
    OutOfGrid,
    Border,
    Wall,
    Riddle { entity: usize, riddle_id: u32 },
    Switch { entity: usize },
    Blocked { entity: usize },
    Pickup { entity: usize, item: Item },
    Door { id: u8 },
    Open,
}

/// Classify a step onto `target`. `occupant` is the active entity there,
/// with its arena index.
pub fn classify(
    grid: &Grid,
    target: Pos,
    occupant: Option<(usize, &Entity)>,
    slot_empty: bool,
) -> StepVerdict {
    if !grid.in_bounds(target) {
        return StepVerdict::OutOfGrid;
    }
    let c = grid.char_at(target);
    if grid.on_border(target) && !glyph::is_door(c) {
        return StepVerdict::Border;
    }
    if glyph::is_any_wall(c) {
        return StepVerdict::Wall;
    }

    let Some((idx, e)) = occupant else {
        return StepVerdict::Open;
    };
    if e.is_interactable() {
        match e.kind {
            EntityKind::Riddle { riddle_id } => return StepVerdict::Riddle { entity: idx, riddle_id },
            EntityKind::Switch { .. } => return StepVerdict::Switch { entity: idx },
            _ => {}
        }
    }
    if e.is_blocking() {
        return StepVerdict::Blocked { entity: idx };
    }
    if slot_empty {
        if let Some(item) = e.to_item() {
            return StepVerdict::Pickup { entity: idx, item };
        }
    }
    if let EntityKind::Door { id } = e.kind {
        return StepVerdict::Door { id };
    }
    StepVerdict::Open
}

/// Drop search order around an avatar: down, up, right, left, then the
/// diagonals.
pub const DROP_OFFSETS: [(i32, i32); 8] = [
    (0, 1), (0, -1), (1, 0), (-1, 0),
    (1, 1), (1, -1), (-1, 1), (-1, -1),
];

/// First neighbour of `origin` that is open floor, off the outer ring and
/// entity-free.
pub fn find_drop_cell(grid: &Grid, origin: Pos, occupied: impl Fn(Pos) -> bool) -> Option<Pos> {
    DROP_OFFSETS
        .iter()
        .map(|&(dx, dy)| origin.offset(dx, dy))
        .find(|&p| {
            grid.in_bounds(p)
                && !grid.on_border(p)
                && glyph::is_open_floor(grid.char_at(p))
                && !occupied(p)
        })
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::grid::Layout;
    use std::rc::Rc;

    /// Helper: build a Grid from a string diagram (layout glyphs).
    fn grid_from(rows: &[&str]) -> Grid {
        Grid::new(Rc::new(Layout::from_rows(rows)))
    }

    /// Entity the factory builds for the glyph at `p`.
    fn occupant(g: &Grid, p: Pos) -> Option<Entity> {
        Entity::from_glyph(g.char_at(p), p)
    }

    fn verdict(g: &Grid, p: Pos, slot_empty: bool) -> StepVerdict {
        let e = occupant(g, p);
        classify(g, p, e.as_ref().map(|e| (7, e)), slot_empty)
    }

    // ── Terrain rows ──

    #[test]
    fn outside_grid() {
        let g = grid_from(&["WWW", "W W", "WWW"]);
        assert_eq!(verdict(&g, Pos::new(-1, 1), true), StepVerdict::OutOfGrid);
        assert_eq!(verdict(&g, Pos::new(3, 1), true), StepVerdict::OutOfGrid);
    }

    #[test]
    fn border_only_admits_doors() {
        let g = grid_from(&[
            "WWWWW",
            "     ",
            "W   1",
            "WWWWW",
        ]);
        // Open ring cell is still rejected
        assert_eq!(verdict(&g, Pos::new(0, 1), true), StepVerdict::Border);
        assert_eq!(verdict(&g, Pos::new(4, 2), true), StepVerdict::Door { id: 1 });
    }

    #[test]
    fn walls_checked_before_entities() {
        let g = grid_from(&[
            "WWWWW",
            "W W=W",
            "WWWWW",
        ]);
        assert_eq!(verdict(&g, Pos::new(2, 1), true), StepVerdict::Wall);
        assert_eq!(verdict(&g, Pos::new(3, 1), true), StepVerdict::Wall);
    }

    // ── Entity rows ──

    #[test]
    fn interactables() {
        let g = grid_from(&[
            "WWWWWWW",
            "W?\\/*ZW",
            "WWWWWWW",
        ]);
        assert_eq!(verdict(&g, Pos::new(1, 1), true), StepVerdict::Riddle { entity: 7, riddle_id: 0 });
        assert_eq!(verdict(&g, Pos::new(2, 1), true), StepVerdict::Switch { entity: 7 });
        assert_eq!(verdict(&g, Pos::new(3, 1), true), StepVerdict::Switch { entity: 7 });
        assert_eq!(verdict(&g, Pos::new(4, 1), true), StepVerdict::Blocked { entity: 7 });
        assert_eq!(verdict(&g, Pos::new(5, 1), true), StepVerdict::Blocked { entity: 7 });
    }

    #[test]
    fn pickup_needs_empty_slot() {
        let g = grid_from(&[
            "WWWWWW",
            "WK!@#W",
            "WWWWWW",
        ]);
        assert_eq!(verdict(&g, Pos::new(1, 1), true), StepVerdict::Pickup { entity: 7, item: Item::Key });
        assert_eq!(verdict(&g, Pos::new(2, 1), true), StepVerdict::Pickup { entity: 7, item: Item::Torch });
        assert_eq!(verdict(&g, Pos::new(3, 1), true), StepVerdict::Pickup { entity: 7, item: Item::Bomb });
        assert_eq!(verdict(&g, Pos::new(1, 1), false), StepVerdict::Open);
        // Springs never block
        assert_eq!(verdict(&g, Pos::new(4, 1), true), StepVerdict::Open);
    }

    #[test]
    fn interior_door_lets_avatar_through() {
        let g = grid_from(&[
            "WWWWW",
            "W 3 W",
            "WWWWW",
        ]);
        assert_eq!(verdict(&g, Pos::new(2, 1), true), StepVerdict::Door { id: 3 });
    }

    // ── Drop search ──

    #[test]
    fn drop_prefers_down_then_up() {
        let g = grid_from(&[
            "WWWWW",
            "W   W",
            "W   W",
            "W   W",
            "WWWWW",
        ]);
        let origin = Pos::new(2, 2);
        assert_eq!(find_drop_cell(&g, origin, |_| false), Some(Pos::new(2, 3)));
        let below = Pos::new(2, 3);
        assert_eq!(find_drop_cell(&g, origin, |p| p == below), Some(Pos::new(2, 1)));
    }

    #[test]
    fn drop_falls_through_to_diagonals() {
        let g = grid_from(&[
            "WWWWW",
            "W K W",
            "W=  W",
            "W = W",
            "WWWWW",
        ]);
        // down '=' , up 'K', right open
        assert_eq!(find_drop_cell(&g, Pos::new(2, 2), |_| false), Some(Pos::new(3, 2)));
        let blocked = |p: Pos| p == Pos::new(3, 2);
        // left '=', so first diagonal (1,1) → (3,3)
        assert_eq!(find_drop_cell(&g, Pos::new(2, 2), blocked), Some(Pos::new(3, 3)));
    }

    #[test]
    fn drop_fails_when_boxed_in() {
        let g = grid_from(&[
            "WWW",
            "W W",
            "WWW",
        ]);
        assert_eq!(find_drop_cell(&g, Pos::new(1, 1), |_| false), None);
    }
}
