/// Dark zones and torch light.
///
/// Recompute order, every tick a room has at least one zone:
///   1. everything lit
///   2. every cell inside any zone unlit
///   3. for each torch bearer standing inside a zone, light the disc
///      dx² + dy² <= r² around them, clipped to the grid
///
/// Only cells inside a zone are ever hidden; outside cells always show.

use super::motion::Pos;

/// Inclusive rectangle.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DarkZone {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl DarkZone {
    /// Corners may be given in any order.
    pub fn new(a: Pos, b: Pos) -> Self {
        DarkZone {
            x1: a.x.min(b.x),
            y1: a.y.min(b.y),
            x2: a.x.max(b.x),
            y2: a.y.max(b.y),
        }
    }

    pub fn contains(&self, p: Pos) -> bool {
        p.x >= self.x1 && p.x <= self.x2 && p.y >= self.y1 && p.y <= self.y2
    }
}

/// Per-cell lit flags plus the dark-zone mask they apply to.
#[derive(Clone, Debug)]
pub struct Visibility {
    width: usize,
    height: usize,
    lit: Vec<bool>,
    zoned: Vec<bool>,
}

impl Visibility {
    /// Build for a grid; the zone mask is fixed for the room's lifetime.
    pub fn new(width: usize, height: usize, zones: &[DarkZone]) -> Self {
        let mut zoned = vec![false; width * height];
        for y in 0..height {
            for x in 0..width {
                let p = Pos::new(x as i32, y as i32);
                zoned[y * width + x] = zones.iter().any(|z| z.contains(p));
            }
        }
        Visibility { width, height, lit: vec![true; width * height], zoned }
    }

    fn index(&self, p: Pos) -> Option<usize> {
        if p.x < 0 || p.y < 0 || p.x as usize >= self.width || p.y as usize >= self.height {
            return None;
        }
        Some(p.y as usize * self.width + p.x as usize)
    }

    /// Inside some dark zone (regardless of light).
    pub fn in_zone(&self, p: Pos) -> bool {
        self.index(p).map(|i| self.zoned[i]).unwrap_or(false)
    }

    pub fn is_lit(&self, p: Pos) -> bool {
        self.index(p).map(|i| self.lit[i]).unwrap_or(false)
    }

    /// Inside a zone and not lit: renders blank whatever is there.
    pub fn is_hidden(&self, p: Pos) -> bool {
        self.in_zone(p) && !self.is_lit(p)
    }

    pub fn has_zones(&self) -> bool {
        self.zoned.iter().any(|&z| z)
    }

    /// Redo the bitmap for the given torch bearers' positions.
    pub fn recompute(&mut self, torch_bearers: &[Pos], radius: i32) {
        for (lit, &zoned) in self.lit.iter_mut().zip(&self.zoned) {
            *lit = !zoned;
        }
        for &center in torch_bearers {
            if self.in_zone(center) {
                self.light_disc(center, radius);
            }
        }
    }

    fn light_disc(&mut self, center: Pos, radius: i32) {
        let r_sq = radius * radius;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy > r_sq {
                    continue;
                }
                if let Some(i) = self.index(center.offset(dx, dy)) {
                    self.lit[i] = true;
                }
            }
        }
    }
}
