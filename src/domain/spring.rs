/// Springs: straight runs of `#` anchored to a wall at one end.
///
/// ## Geometry
///
///   W###      anchor left  → projects Right
///   ###W      anchor right → projects Left
///
/// Vertical runs work the same way with Down / Up. Cells are kept sorted
/// along the axis, so index 0 is the top/left end.
///
/// ## Compression
///
/// Two slots, claimed in arrival order by distinct avatars. Each tick of
/// wall-ward pressure adds one to that avatar's counter while the shared
/// total is below the spring's length. The visible run shrinks from the
/// free end toward the anchor as the total grows.
///
/// ## Launch
///
/// Releasing N cells of compression starts a launch of N² ticks at N cells
/// per tick along the projection. Launches are keyed by avatar index.
///
/// ## Blast damage
///
/// A spring keeps only the unbroken stretch that still touches its anchor.
/// Anything past a destroyed cell goes with it.

use thiserror::Error;

use super::motion::{Direction, Pos};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MalformedSpring {
    #[error("spring has no cells")]
    Empty,
    #[error("spring cells near ({x}, {y}) are not in one straight line")]
    NotStraight { x: i32, y: i32 },
    #[error("spring cells near ({x}, {y}) are not contiguous")]
    Gap { x: i32, y: i32 },
    #[error("spring at ({x}, {y}) touches no wall at either end")]
    NoAnchor { x: i32, y: i32 },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Slot {
    avatar: usize,
    amount: u32,
}

/// Ballistic state of one avatar.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Launch {
    pub frames_left: u32,
    pub speed: u32,
}

#[derive(Clone, Debug)]
pub struct Spring {
    cells: Vec<Pos>,
    projection: Direction,
    anchor: Pos,
    slots: [Option<Slot>; 2],
    launches: [Option<Launch>; 2],
}

impl Spring {
    /// Build a spring from one connected group of `#` cells. `is_wall`
    /// decides which neighbouring cells can anchor it. When both ends touch
    /// a wall the top/left end wins.
    pub fn assemble(
        mut cells: Vec<Pos>,
        is_wall: impl Fn(Pos) -> bool,
    ) -> Result<Spring, MalformedSpring> {
        let first = *cells.first().ok_or(MalformedSpring::Empty)?;
        let horizontal = cells.iter().all(|c| c.y == first.y);
        let vertical = cells.iter().all(|c| c.x == first.x);
        if !horizontal && !vertical {
            return Err(MalformedSpring::NotStraight { x: first.x, y: first.y });
        }

        cells.sort_by_key(|c| (c.y, c.x));
        for pair in cells.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if (b.x - a.x) + (b.y - a.y) != 1 {
                return Err(MalformedSpring::Gap { x: b.x, y: b.y });
            }
        }

        let low = cells[0];
        let high = cells[cells.len() - 1];

        // Single cells may lie on either axis; try horizontal first.
        let mut axes = Vec::with_capacity(2);
        if horizontal {
            axes.push((Direction::Left, Direction::Right));
        }
        if vertical {
            axes.push((Direction::Up, Direction::Down));
        }

        for (toward_low, toward_high) in axes {
            let low_wall = low.step(toward_low);
            if is_wall(low_wall) {
                return Ok(Spring::new(cells, toward_high, low_wall));
            }
            let high_wall = high.step(toward_high);
            if is_wall(high_wall) {
                return Ok(Spring::new(cells, toward_low, high_wall));
            }
        }
        Err(MalformedSpring::NoAnchor { x: low.x, y: low.y })
    }

    fn new(cells: Vec<Pos>, projection: Direction, anchor: Pos) -> Self {
        Spring { cells, projection, anchor, slots: [None; 2], launches: [None; 2] }
    }

    pub fn len(&self) -> u32 {
        self.cells.len() as u32
    }

    pub fn cells(&self) -> &[Pos] {
        &self.cells
    }

    /// Direction launched avatars travel: away from the anchor wall.
    pub fn projection(&self) -> Direction {
        self.projection
    }

    /// Pushing toward the wall.
    pub fn is_wall_ward(&self, dir: Direction) -> bool {
        dir != Direction::Stay && dir == self.projection.opposite()
    }

    pub fn total_compression(&self) -> u32 {
        self.slots.iter().flatten().map(|s| s.amount).sum()
    }

    pub fn is_full(&self) -> bool {
        self.total_compression() >= self.len()
    }

    pub fn compression_of(&self, avatar: usize) -> u32 {
        self.slots
            .iter()
            .flatten()
            .find(|s| s.avatar == avatar)
            .map(|s| s.amount)
            .unwrap_or(0)
    }

    /// One tick of wall-ward pressure. Returns true if compression grew.
    pub fn compress(&mut self, avatar: usize) -> bool {
        if self.is_full() {
            return false;
        }
        if let Some(slot) = self.slots.iter_mut().flatten().find(|s| s.avatar == avatar) {
            slot.amount += 1;
            return true;
        }
        match self.slots.iter_mut().find(|s| s.is_none()) {
            Some(free) => {
                *free = Some(Slot { avatar, amount: 1 });
                true
            }
            None => false,
        }
    }

    /// Turn the avatar's compression into a launch. `None` when it had none.
    pub fn release(&mut self, avatar: usize) -> Option<Launch> {
        let idx = self
            .slots
            .iter()
            .position(|s| matches!(s, Some(slot) if slot.avatar == avatar))?;
        let amount = self.slots[idx].take().map(|s| s.amount).unwrap_or(0);
        if amount == 0 {
            return None;
        }
        let launch = Launch { frames_left: amount * amount, speed: amount };
        if let Some(state) = self.launches.get_mut(avatar) {
            *state = Some(launch);
        }
        Some(launch)
    }

    pub fn launch_of(&self, avatar: usize) -> Option<Launch> {
        self.launches.get(avatar).copied().flatten()
    }

    /// Count down one launch tick. Returns true while frames remain.
    pub fn advance_launch(&mut self, avatar: usize) -> bool {
        let Some(state) = self.launches.get_mut(avatar) else {
            return false;
        };
        let remaining = state.map(|l| l.frames_left).unwrap_or(0);
        if remaining > 1 {
            if let Some(launch) = state.as_mut() {
                launch.frames_left -= 1;
            }
            true
        } else {
            *state = None;
            false
        }
    }

    pub fn cancel_launch(&mut self, avatar: usize) {
        if let Some(state) = self.launches.get_mut(avatar) {
            *state = None;
        }
    }

    /// Whether cell `i` (sorted order) is currently drawn.
    pub fn is_cell_visible(&self, i: usize) -> bool {
        let total = self.total_compression() as usize;
        let visible = self.cells.len().saturating_sub(total);
        match self.projection {
            Direction::Right | Direction::Down => i < visible,
            _ => i >= total,
        }
    }

    /// Cells currently compressed out of view.
    pub fn hidden_cells(&self) -> impl Iterator<Item = Pos> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.is_cell_visible(*i))
            .map(|(_, &p)| p)
    }

    /// Remove the `lost` cells and every cell they cut off from the anchor.
    /// Returns the removed cells, row-major. Compression is dropped so it
    /// can never exceed the new length; launches in flight carry on.
    pub fn break_cells(&mut self, lost: &[Pos]) -> Vec<Pos> {
        let anchor = self.anchor;
        let reach = |c: &Pos| (c.x - anchor.x).abs() + (c.y - anchor.y).abs();
        let Some(cut) = self.cells.iter().filter(|c| lost.contains(c)).map(reach).min() else {
            return Vec::new();
        };
        let (kept, removed): (Vec<Pos>, Vec<Pos>) =
            self.cells.iter().copied().partition(|c| reach(c) < cut);
        self.cells = kept;
        self.slots = [None; 2];
        removed
    }

    /// Clear compression and launches.
    pub fn reset(&mut self) {
        self.slots = [None; 2];
        self.launches = [None; 2];
    }
}

/// Split the `is_spring` cells of a `width × height` area into straight
/// runs. The longest run among unclaimed cells is taken first, horizontal
/// on ties, so parallel springs on neighbouring rows or columns stay
/// apart. Runs are sorted row-major and come out in row-major order of
/// their first cell.
pub fn collect_runs(width: usize, height: usize, is_spring: impl Fn(Pos) -> bool) -> Vec<Vec<Pos>> {
    let mut free: Vec<bool> = (0..width * height)
        .map(|i| is_spring(Pos::new((i % width) as i32, (i / width) as i32)))
        .collect();
    let open = |free: &[bool], p: Pos| {
        p.x >= 0
            && p.y >= 0
            && (p.x as usize) < width
            && (p.y as usize) < height
            && free[p.y as usize * width + p.x as usize]
    };

    let mut runs = Vec::new();
    loop {
        let mut best: Option<Vec<Pos>> = None;
        for y in 0..height as i32 {
            for x in 0..width as i32 {
                let start = Pos::new(x, y);
                if !open(&free, start) {
                    continue;
                }
                for (dx, dy) in [(1, 0), (0, 1)] {
                    // Runs are walked from their first cell only.
                    if open(&free, start.offset(-dx, -dy)) {
                        continue;
                    }
                    let mut run = Vec::new();
                    let mut p = start;
                    while open(&free, p) {
                        run.push(p);
                        p = p.offset(dx, dy);
                    }
                    if best.as_ref().map_or(true, |b| run.len() > b.len()) {
                        best = Some(run);
                    }
                }
            }
        }
        let Some(run) = best else { break };
        for p in &run {
            free[p.y as usize * width + p.x as usize] = false;
        }
        runs.push(run);
    }
    runs.sort_by_key(|r| r.first().map(|c| (c.y, c.x)));
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walls<'a>(rows: &'a [&'a str]) -> impl Fn(Pos) -> bool + 'a {
        move |p: Pos| {
            p.x < 0
                || p.y < 0
                || rows
                    .get(p.y as usize)
                    .and_then(|r| r.chars().nth(p.x as usize))
                    .map(|c| c == 'W')
                    .unwrap_or(true)
        }
    }

    fn spring_in(rows: &[&str]) -> Result<Spring, MalformedSpring> {
        let h = rows.len();
        let w = rows[0].len();
        let runs = collect_runs(w, h, |p| {
            rows[p.y as usize].chars().nth(p.x as usize) == Some('#')
        });
        assert_eq!(runs.len(), 1);
        Spring::assemble(runs[0].clone(), walls(rows))
    }

    #[test]
    fn projection_points_away_from_wall() {
        assert_eq!(spring_in(&["W### "]).map(|s| s.projection()), Ok(Direction::Right));
        assert_eq!(spring_in(&[" ###W"]).map(|s| s.projection()), Ok(Direction::Left));
        let s = spring_in(&[" W ", " # ", " # ", "   "]).expect("anchored");
        assert_eq!(s.projection(), Direction::Down);
        let s = spring_in(&["   ", " # ", " W "]).expect("anchored");
        assert_eq!(s.projection(), Direction::Up);
    }

    #[test]
    fn malformed_shapes_rejected() {
        assert!(matches!(spring_in(&[" ### "]), Err(MalformedSpring::NoAnchor { .. })));
        assert!(matches!(
            Spring::assemble(vec![Pos::new(1, 0), Pos::new(2, 0), Pos::new(1, 1)], |_| true),
            Err(MalformedSpring::NotStraight { .. })
        ));
        assert!(matches!(
            Spring::assemble(vec![Pos::new(1, 0), Pos::new(3, 0)], |_| true),
            Err(MalformedSpring::Gap { .. })
        ));
        assert!(matches!(Spring::assemble(vec![], |_| true), Err(MalformedSpring::Empty)));
    }

    #[test]
    fn both_ends_anchored_prefers_low_end() {
        let s = spring_in(&["W##W"]).expect("anchored");
        assert_eq!(s.projection(), Direction::Right);
    }

    #[test]
    fn compression_capped_at_length_across_avatars() {
        let mut s = spring_in(&["W### "]).expect("anchored");
        assert!(s.compress(0));
        assert!(s.compress(1));
        assert!(s.compress(0));
        assert!(!s.compress(1));
        assert!(!s.compress(0));
        assert_eq!(s.total_compression(), 3);
        assert_eq!(s.compression_of(0), 2);
        assert_eq!(s.compression_of(1), 1);
        assert!(s.is_full());
    }

    #[test]
    fn release_gives_square_duration() {
        let mut s = spring_in(&["W### "]).expect("anchored");
        s.compress(0);
        s.compress(0);
        let launch = s.release(0).expect("compressed");
        assert_eq!(launch, Launch { frames_left: 4, speed: 2 });
        assert_eq!(s.total_compression(), 0);
        assert_eq!(s.launch_of(0), Some(launch));
        let mut ticks = 1;
        while s.advance_launch(0) {
            ticks += 1;
        }
        assert_eq!(ticks, 4);
        assert_eq!(s.launch_of(0), None);
        assert_eq!(s.release(1), None);
    }

    #[test]
    fn visible_run_shrinks_from_free_end() {
        let mut s = spring_in(&["W### "]).expect("anchored");
        s.compress(0);
        let hidden: Vec<Pos> = s.hidden_cells().collect();
        assert_eq!(hidden, vec![Pos::new(3, 0)]);

        let mut s = spring_in(&[" ###W"]).expect("anchored");
        s.compress(0);
        s.compress(0);
        let hidden: Vec<Pos> = s.hidden_cells().collect();
        assert_eq!(hidden, vec![Pos::new(1, 0), Pos::new(2, 0)]);
        s.reset();
        assert_eq!(s.hidden_cells().count(), 0);
    }

    #[test]
    fn wall_ward_is_against_projection() {
        let s = spring_in(&["W### "]).expect("anchored");
        assert!(s.is_wall_ward(Direction::Left));
        assert!(!s.is_wall_ward(Direction::Right));
        assert!(!s.is_wall_ward(Direction::Up));
        assert!(!s.is_wall_ward(Direction::Stay));
    }

    #[test]
    fn parallel_springs_stay_apart() {
        let rows = ["W### ", "W### ", "     "];
        let is_spring = |p: Pos| rows[p.y as usize].as_bytes()[p.x as usize] == b'#';
        let runs = collect_runs(5, 3, is_spring);
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[1], vec![Pos::new(1, 1), Pos::new(2, 1), Pos::new(3, 1)]);
        for run in runs {
            let s = Spring::assemble(run, walls(&rows)).expect("anchored");
            assert_eq!(s.projection(), Direction::Right);
        }

        // Longer columns beat the short rows they share.
        let rows = ["WW ", "## ", "## ", "## ", "   "];
        let is_spring = |p: Pos| rows[p.y as usize].as_bytes()[p.x as usize] == b'#';
        let runs = collect_runs(3, 5, is_spring);
        assert_eq!(runs, vec![
            vec![Pos::new(0, 1), Pos::new(0, 2), Pos::new(0, 3)],
            vec![Pos::new(1, 1), Pos::new(1, 2), Pos::new(1, 3)],
        ]);
    }

    #[test]
    fn broken_spring_keeps_anchored_stretch() {
        let mut s = spring_in(&["W#### "]).expect("anchored");
        s.compress(0);
        s.compress(0);
        let removed = s.break_cells(&[Pos::new(3, 0), Pos::new(5, 0)]);
        assert_eq!(removed, vec![Pos::new(3, 0), Pos::new(4, 0)]);
        assert_eq!(s.cells(), &[Pos::new(1, 0), Pos::new(2, 0)]);
        assert_eq!(s.total_compression(), 0);

        // Untouched springs are left alone.
        assert!(s.break_cells(&[Pos::new(9, 9)]).is_empty());
        assert_eq!(s.len(), 2);

        // Losing the cell at the anchor takes the whole spring.
        let mut s = spring_in(&[" ###W"]).expect("anchored");
        assert_eq!(s.break_cells(&[Pos::new(3, 0)]).len(), 3);
        assert_eq!(s.len(), 0);
        assert!(!s.compress(1));
    }
}
