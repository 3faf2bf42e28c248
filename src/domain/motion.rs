/// Positions, directions and per-tick velocity.
///
/// Player input only ever produces one of the five canonical unit vectors.
/// Larger magnitudes appear only while a spring launch is in progress.

/// Grid position. Signed so that neighbour arithmetic can step off the map
/// and be rejected by bounds checks instead of wrapping.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct Pos {
    pub x: i32,
    pub y: i32,
}

impl Pos {
    pub const fn new(x: i32, y: i32) -> Self {
        Pos { x, y }
    }

    #[inline]
    pub fn offset(self, dx: i32, dy: i32) -> Pos {
        Pos { x: self.x + dx, y: self.y + dy }
    }

    #[inline]
    pub fn step(self, dir: Direction) -> Pos {
        let (dx, dy) = dir.delta();
        self.offset(dx, dy)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    #[default]
    Stay,
}

impl Direction {
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
            Direction::Stay => (0, 0),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::Stay => Direction::Stay,
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::Left | Direction::Right)
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Direction::Up | Direction::Down)
    }

    /// Both non-stay and on the same axis.
    pub fn same_axis(self, other: Direction) -> bool {
        (self.is_horizontal() && other.is_horizontal())
            || (self.is_vertical() && other.is_vertical())
    }
}

/// Per-tick movement vector (diff_x, diff_y).
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Velocity {
    pub dx: i32,
    pub dy: i32,
}

impl Velocity {
    pub const ZERO: Velocity = Velocity { dx: 0, dy: 0 };

    pub fn from_dir(dir: Direction) -> Self {
        let (dx, dy) = dir.delta();
        Velocity { dx, dy }
    }

    /// The canonical direction this velocity points in. Only meaningful for
    /// unit vectors; anything diagonal or zero reads as `Stay`.
    pub fn direction(self) -> Direction {
        match (self.dx.signum(), self.dy.signum()) {
            (0, -1) => Direction::Up,
            (0, 1) => Direction::Down,
            (-1, 0) => Direction::Left,
            (1, 0) => Direction::Right,
            _ => Direction::Stay,
        }
    }
}

/// What an avatar was told to do this tick.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Action {
    Move(Direction),
    Stay,
    Drop,
}

/// Frame input for one avatar: the latest movement command (if any) and
/// whether a drop was requested. Both can fire in the same tick.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameInput {
    pub steer: Option<Direction>,
    pub drop: bool,
}

impl FrameInput {
    /// Fold one action into the frame. Later movement commands win.
    pub fn push(&mut self, action: Action) {
        match action {
            Action::Move(dir) => self.steer = Some(dir),
            Action::Stay => self.steer = Some(Direction::Stay),
            Action::Drop => self.drop = true,
        }
    }

    /// Fold a later frame's input into this one.
    pub fn merge(&mut self, later: FrameInput) {
        if later.steer.is_some() {
            self.steer = later.steer;
        }
        self.drop |= later.drop;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn velocity_direction_round_trip() {
        for dir in [Direction::Up, Direction::Down, Direction::Left, Direction::Right, Direction::Stay] {
            assert_eq!(Velocity::from_dir(dir).direction(), dir);
        }
        // Launch magnitudes still read as their axis direction
        assert_eq!(Velocity { dx: 0, dy: -3 }.direction(), Direction::Up);
        assert_eq!(Velocity { dx: 1, dy: 1 }.direction(), Direction::Stay);
    }

    #[test]
    fn later_steer_wins() {
        let mut input = FrameInput::default();
        input.push(Action::Move(Direction::Left));
        input.push(Action::Drop);
        input.push(Action::Stay);
        assert_eq!(input.steer, Some(Direction::Stay));
        assert!(input.drop);
    }

    #[test]
    fn merge_keeps_pending_drop() {
        let mut pending = FrameInput { steer: Some(Direction::Up), drop: true };
        pending.merge(FrameInput::default());
        assert_eq!(pending.steer, Some(Direction::Up));
        pending.merge(FrameInput { steer: Some(Direction::Down), drop: false });
        assert_eq!(pending.steer, Some(Direction::Down));
        assert!(pending.drop);
    }
}
