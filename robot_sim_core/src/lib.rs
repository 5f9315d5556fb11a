use serde::{Deserialize, Serialize};

pub mod agent;
pub mod map;
pub mod scenario;
pub mod simulation;
pub mod world;

/// Represents a 2D coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub const fn new(x: usize, y: usize) -> Self {
        Position { x, y }
    }

    /// Returns the position `steps` cells away in `direction`.
    ///
    /// Returns `None` if the result would have a negative coordinate. Whether
    /// the result lies inside a particular world is up to the caller.
    pub fn offset(self, direction: Direction, steps: usize) -> Option<Position> {
        let (dx, dy) = direction.delta();
        let steps = isize::try_from(steps).ok()?;
        Some(Position {
            x: self.x.checked_add_signed(dx.checked_mul(steps)?)?,
            y: self.y.checked_add_signed(dy.checked_mul(steps)?)?,
        })
    }

    /// `max(|dx|, |dy|)` between two positions.
    pub fn chebyshev_distance(&self, other: &Position) -> usize {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }
}

/// One of the four orthogonal movement directions.
///
/// `Up` decreases `y`, matching screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Unit step `(dx, dy)` for this direction.
    #[inline]
    pub fn delta(self) -> (isize, isize) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }
}
