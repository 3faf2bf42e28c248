/// Grid layout: immutable base map + sparse mutation overlay.
///
/// ## Layers
///
///   - `Layout`: the room's map as loaded. **Never mutated.** Shared
///     between every room built from it via `Rc`.
///   - `mods`: ordered list of point mutations. A later write to the same
///     cell updates the existing entry in place; entries are never removed.
///
/// `char_at` = mutation if present, else base glyph, else `W` out of bounds.
/// A new game builds fresh rooms, so an overlay is never cleared.
///
/// `mod_index` maps a cell to its entry in `mods` so lookups are O(1)
/// instead of a scan of the list.

use std::collections::HashMap;
use std::rc::Rc;

use super::glyph;
use super::motion::Pos;

/// Upper bound on recorded mutations per room.
pub const MAX_MODS: usize = 4096;

/// Immutable rectangular character map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layout {
    width: usize,
    height: usize,
    cells: Vec<char>,
}

impl Layout {
    /// Build from map rows. Short rows are padded with air so the layout is
    /// always rectangular; the widest row sets the width.
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Self {
        let height = rows.len();
        let width = rows.iter().map(|r| r.as_ref().chars().count()).max().unwrap_or(0);
        let mut cells = vec![glyph::AIR; width * height];
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.as_ref().chars().enumerate() {
                cells[y * width + x] = ch;
            }
        }
        Layout { width, height, cells }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn in_bounds(&self, p: Pos) -> bool {
        p.x >= 0 && p.y >= 0 && (p.x as usize) < self.width && (p.y as usize) < self.height
    }

    /// Base glyph, or `W` outside the map.
    #[inline]
    pub fn char_at(&self, p: Pos) -> char {
        if self.in_bounds(p) {
            self.cells[p.y as usize * self.width + p.x as usize]
        } else {
            glyph::WALL
        }
    }
}

/// One recorded override of the base layout.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Mod {
    pub pos: Pos,
    pub glyph: char,
}

#[derive(Clone, Debug)]
pub struct Grid {
    base: Rc<Layout>,
    mods: Vec<Mod>,
    mod_index: HashMap<Pos, usize>,
}

impl Grid {
    pub fn new(base: Rc<Layout>) -> Self {
        Grid { base, mods: Vec::new(), mod_index: HashMap::new() }
    }

    pub fn width(&self) -> usize {
        self.base.width()
    }

    pub fn height(&self) -> usize {
        self.base.height()
    }

    pub fn in_bounds(&self, p: Pos) -> bool {
        self.base.in_bounds(p)
    }

    /// Outermost ring of the map: only door glyphs may be entered there.
    pub fn on_border(&self, p: Pos) -> bool {
        self.in_bounds(p)
            && (p.x == 0
                || p.y == 0
                || p.x as usize == self.width() - 1
                || p.y as usize == self.height() - 1)
    }

    /// Effective glyph: overlay, then base, then `W` out of bounds.
    #[inline]
    pub fn char_at(&self, p: Pos) -> char {
        match self.mod_index.get(&p) {
            Some(&i) => self.mods[i].glyph,
            None => self.base.char_at(p),
        }
    }

    /// Record a mutation. Out-of-bounds writes are ignored. Returns false
    /// only when a new entry would exceed `MAX_MODS`.
    pub fn set_char_at(&mut self, p: Pos, c: char) -> bool {
        if !self.in_bounds(p) {
            return true;
        }
        if let Some(&i) = self.mod_index.get(&p) {
            self.mods[i].glyph = c;
            return true;
        }
        if self.mods.len() >= MAX_MODS {
            log::warn!("mutation overlay full, dropping write at ({}, {})", p.x, p.y);
            return false;
        }
        self.mod_index.insert(p, self.mods.len());
        self.mods.push(Mod { pos: p, glyph: c });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&str]) -> Grid {
        Grid::new(Rc::new(Layout::from_rows(rows)))
    }

    #[test]
    fn base_then_overlay_then_sentinel() {
        let mut g = grid(&["W K", "W  "]);
        assert_eq!(g.char_at(Pos::new(2, 0)), 'K');
        assert!(g.set_char_at(Pos::new(2, 0), ' '));
        assert_eq!(g.char_at(Pos::new(2, 0)), ' ');
        assert_eq!(g.base.char_at(Pos::new(2, 0)), 'K');
        assert_eq!(g.char_at(Pos::new(-1, 0)), 'W');
        assert_eq!(g.char_at(Pos::new(3, 1)), 'W');
    }

    #[test]
    fn later_write_updates_in_place() {
        let mut g = grid(&["   "]);
        g.set_char_at(Pos::new(1, 0), 'K');
        g.set_char_at(Pos::new(1, 0), '@');
        g.set_char_at(Pos::new(1, 0), '@');
        assert_eq!(g.mods.len(), 1);
        assert_eq!(g.char_at(Pos::new(1, 0)), '@');
    }

    #[test]
    fn out_of_bounds_write_is_ignored() {
        let mut g = grid(&["  "]);
        assert!(g.set_char_at(Pos::new(5, 5), 'K'));
        assert!(g.mods.is_empty());
    }

    #[test]
    fn ragged_rows_padded_with_air() {
        let l = Layout::from_rows(&["WWW", "W"]);
        assert_eq!(l.width(), 3);
        assert_eq!(l.char_at(Pos::new(2, 1)), ' ');
    }

    #[test]
    fn border_ring() {
        let g = grid(&["WWW", "W W", "WWW"]);
        assert!(g.on_border(Pos::new(0, 1)));
        assert!(g.on_border(Pos::new(2, 2)));
        assert!(!g.on_border(Pos::new(1, 1)));
        assert!(!g.on_border(Pos::new(3, 1)));
    }
}
