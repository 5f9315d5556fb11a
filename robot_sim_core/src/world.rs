use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    Direction, Position,
    map::{Grid, GridError},
};

/// Static content of a grid cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellType {
    #[default]
    Floor,
    Obstacle,
}

/// Errors raised while building a world.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error("Obstacle {0:?} is outside the world")]
    ObstacleOutOfBounds(Position),
    #[error("Goal {0:?} is outside the world")]
    GoalOutOfBounds(Position),
    #[error("Goal {0:?} is placed on an obstacle")]
    GoalOnObstacle(Position),
    #[error("Goal {0:?} is listed more than once")]
    DuplicateGoal(Position),
    #[error("Map string is empty")]
    EmptyMap,
    #[error("Inconsistent width at row {row}: expected {expected}, found {found}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Unknown map code '{code}' at position ({x}, {y})")]
    UnknownCode { code: String, x: usize, y: usize },
}

/// The bounded cell space: obstacle membership plus the ordered goal list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridWorld {
    terrain: Grid<CellType>,
    goals: Vec<Position>,
}

impl GridWorld {
    /// Builds a world, checking that every obstacle and goal lies inside it
    /// and that no goal sits on an obstacle.
    pub fn new(
        width: usize,
        height: usize,
        obstacles: impl IntoIterator<Item = Position>,
        goals: Vec<Position>,
    ) -> Result<Self, WorldError> {
        let mut terrain: Grid<CellType> = Grid::new(width, height)?;
        for obstacle in obstacles {
            terrain
                .set(obstacle, CellType::Obstacle)
                .map_err(|_| WorldError::ObstacleOutOfBounds(obstacle))?;
        }
        for (i, goal) in goals.iter().enumerate() {
            match terrain.get(*goal) {
                None => return Err(WorldError::GoalOutOfBounds(*goal)),
                Some(CellType::Obstacle) => return Err(WorldError::GoalOnObstacle(*goal)),
                Some(CellType::Floor) => {}
            }
            if goals[..i].contains(goal) {
                return Err(WorldError::DuplicateGoal(*goal));
            }
        }
        Ok(GridWorld { terrain, goals })
    }

    /// Returns the number of columns.
    #[inline]
    pub fn width(&self) -> usize {
        self.terrain.width()
    }

    /// Returns the number of rows.
    #[inline]
    pub fn height(&self) -> usize {
        self.terrain.height()
    }

    /// Checks if `(x, y)` lies inside the world.
    #[inline]
    pub fn is_in_bounds(&self, x: usize, y: usize) -> bool {
        self.terrain.contains(x, y)
    }

    /// Checks if `(x, y)` holds an obstacle.
    pub fn is_obstacle(&self, x: usize, y: usize) -> bool {
        matches!(
            self.terrain.get(Position::new(x, y)),
            Some(CellType::Obstacle)
        )
    }

    /// In bounds and free of obstacles.
    pub fn is_valid_cell(&self, x: usize, y: usize) -> bool {
        self.is_in_bounds(x, y) && !self.is_obstacle(x, y)
    }

    /// Checks if `(x, y)` holds a goal that has not been collected.
    pub fn is_goal(&self, x: usize, y: usize) -> bool {
        self.goals.contains(&Position::new(x, y))
    }

    /// Goals still to be collected, in collection order.
    pub fn goals(&self) -> &[Position] {
        &self.goals
    }

    /// Obstacle positions in row-major order.
    pub fn obstacles(&self) -> Vec<Position> {
        self.terrain
            .enumerate()
            .filter_map(|(position, cell)| (*cell == CellType::Obstacle).then_some(position))
            .collect()
    }

    /// Removes the goal at `(x, y)` if there is one. The remaining goals keep
    /// their order.
    pub fn remove_goal_if_present(&mut self, x: usize, y: usize) -> bool {
        let target = Position::new(x, y);
        match self.goals.iter().position(|goal| *goal == target) {
            Some(index) => {
                self.goals.remove(index);
                debug!(?target, remaining = self.goals.len(), "goal removed");
                true
            }
            None => false,
        }
    }

    /// Moves the obstacle at `from` one cell in `direction`.
    ///
    /// Fails without changes when there is no obstacle at `from`, or the
    /// destination is outside the world, already an obstacle, or a goal.
    pub fn push_obstacle(&mut self, from: Position, direction: Direction) -> bool {
        if !self.is_obstacle(from.x, from.y) {
            return false;
        }
        let Some(to) = from.offset(direction, 1) else {
            return false;
        };
        if !self.is_valid_cell(to.x, to.y) || self.is_goal(to.x, to.y) {
            return false;
        }
        self.terrain[from] = CellType::Floor;
        self.terrain[to] = CellType::Obstacle;
        debug!(?from, ?to, "obstacle pushed");
        true
    }
}

/// Loads a world from a whitespace-separated token map, one row per line.
///
/// * `BL` - floor
/// * `WL` - obstacle
/// * `GL` - goal; goals are ordered by reading order (row by row)
pub fn load_world_from_string(map_string: &str) -> Result<GridWorld, WorldError> {
    let lines: Vec<&str> = map_string
        .trim()
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect();
    if lines.is_empty() {
        return Err(WorldError::EmptyMap);
    }

    let height = lines.len();
    let mut width = 0;
    let mut obstacles = Vec::new();
    let mut goals = Vec::new();

    for (y, line) in lines.iter().enumerate() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if y == 0 {
            width = tokens.len();
        } else if tokens.len() != width {
            return Err(WorldError::RaggedRow {
                row: y,
                expected: width,
                found: tokens.len(),
            });
        }
        for (x, token) in tokens.iter().enumerate() {
            let pos = Position { x, y };
            match *token {
                "BL" => {}
                "WL" => obstacles.push(pos),
                "GL" => goals.push(pos),
                unknown => {
                    return Err(WorldError::UnknownCode {
                        code: unknown.to_string(),
                        x,
                        y,
                    });
                }
            }
        }
    }

    GridWorld::new(width, height, obstacles, goals)
}
