use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{Direction, Position, world::GridWorld};

/// Battery spent by every successful move, before any surcharge.
pub const BASE_MOVE_COST: u32 = 1;
/// Battery spent by a successful push.
pub const PUSH_COST: u32 = 2;
/// Battery spent by a scan, regardless of what it finds.
pub const SCAN_COST: u32 = 1;

/// The behavioral variant of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Plain,
    /// Moves further per step and pays an extra unit of battery per move.
    Fast,
    /// Can push adjacent obstacles.
    Strong,
    /// Can scan its surroundings for obstacles and goals.
    Scout,
}

impl AgentKind {
    /// Cells covered per move unless overridden.
    pub fn default_speed(self) -> usize {
        match self {
            AgentKind::Plain | AgentKind::Strong => 1,
            AgentKind::Fast | AgentKind::Scout => 2,
        }
    }

    /// Starting and maximum charge unless overridden.
    pub fn default_battery(self) -> u32 {
        match self {
            AgentKind::Plain | AgentKind::Scout => 100,
            AgentKind::Fast => 80,
            AgentKind::Strong => 120,
        }
    }

    fn default_extra_drain(self) -> u32 {
        match self {
            AgentKind::Fast => 1,
            _ => 0,
        }
    }

    fn default_scan_radius(self) -> usize {
        match self {
            AgentKind::Scout => 2,
            _ => 0,
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AgentKind::Plain => "plain",
            AgentKind::Fast => "fast",
            AgentKind::Strong => "strong",
            AgentKind::Scout => "scout",
        };
        f.write_str(label)
    }
}

/// What a scout saw around itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    pub obstacles: Vec<Position>,
    pub goals: Vec<Position>,
}

/// A robot on the grid.
///
/// All variants share this record; `kind` decides which extra capabilities
/// apply and `extra_drain` / `scan_radius` hold their parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    name: String,
    kind: AgentKind,
    position: Position,
    battery: u32,
    max_battery: u32,
    speed: usize,
    moves: u32,
    extra_drain: u32,
    scan_radius: usize,
}

impl Agent {
    /// Creates an agent with the defaults of its kind.
    pub fn new(name: impl Into<String>, kind: AgentKind, position: Position) -> Self {
        let battery = kind.default_battery();
        Agent {
            name: name.into(),
            kind,
            position,
            battery,
            max_battery: battery,
            speed: kind.default_speed(),
            moves: 0,
            extra_drain: kind.default_extra_drain(),
            scan_radius: kind.default_scan_radius(),
        }
    }

    /// Creates a plain agent: speed 1, battery 100.
    pub fn plain(name: impl Into<String>, position: Position) -> Self {
        Self::new(name, AgentKind::Plain, position)
    }

    /// Creates a fast agent: speed 2, battery 80, two units per move.
    pub fn fast(name: impl Into<String>, position: Position) -> Self {
        Self::new(name, AgentKind::Fast, position)
    }

    /// Creates a strong agent: speed 1, battery 120, can push.
    pub fn strong(name: impl Into<String>, position: Position) -> Self {
        Self::new(name, AgentKind::Strong, position)
    }

    /// Creates a scout: speed 2, battery 100, scan radius 2.
    pub fn scout(name: impl Into<String>, position: Position) -> Self {
        Self::new(name, AgentKind::Scout, position)
    }

    /// Overrides the step size. A speed of zero is raised to one.
    pub fn with_speed(mut self, speed: usize) -> Self {
        self.speed = speed.max(1);
        self
    }

    /// Sets both the capacity and the current charge.
    pub fn with_battery(mut self, battery: u32) -> Self {
        self.battery = battery;
        self.max_battery = battery;
        self
    }

    /// Returns the display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the behavioral variant.
    pub fn kind(&self) -> AgentKind {
        self.kind
    }

    /// Returns the current cell.
    pub fn position(&self) -> Position {
        self.position
    }

    /// Returns the current charge.
    pub fn battery(&self) -> u32 {
        self.battery
    }

    /// Returns the charge a recharge restores.
    pub fn max_battery(&self) -> u32 {
        self.max_battery
    }

    /// Returns the number of cells covered by one move.
    pub fn speed(&self) -> usize {
        self.speed
    }

    /// Returns the number of successful moves.
    pub fn moves(&self) -> u32 {
        self.moves
    }

    /// Returns the scan range in cells; zero for non-scouts.
    pub fn scan_radius(&self) -> usize {
        self.scan_radius
    }

    /// Returns true when the battery is empty.
    pub fn is_depleted(&self) -> bool {
        self.battery == 0
    }

    /// Charge as a whole percentage of capacity.
    pub fn battery_percent(&self) -> u32 {
        if self.max_battery == 0 {
            return 0;
        }
        self.battery * 100 / self.max_battery
    }

    fn drain(&mut self, amount: u32) {
        self.battery = self.battery.saturating_sub(amount);
    }

    /// Moves `speed` cells in `direction` if the agent has charge and the
    /// destination is a free cell of `world`.
    pub fn attempt_move(&mut self, direction: Direction, world: &GridWorld) -> bool {
        if self.battery == 0 {
            return false;
        }
        let Some(target) = self.position.offset(direction, self.speed) else {
            return false;
        };
        if !world.is_valid_cell(target.x, target.y) {
            return false;
        }

        self.position = target;
        self.moves += 1;
        self.drain(BASE_MOVE_COST);
        if self.kind == AgentKind::Fast {
            self.drain(self.extra_drain);
        }
        trace!(agent = %self.name, ?direction, ?target, battery = self.battery, "moved");
        true
    }

    /// Refills the battery. Returns false if it was already full.
    pub fn recharge(&mut self) -> bool {
        if self.battery < self.max_battery {
            self.battery = self.max_battery;
            debug!(agent = %self.name, battery = self.battery, "recharged");
            true
        } else {
            false
        }
    }

    /// Takes one greedy step toward `goal` along the axis with the larger
    /// distance. Ties go to the vertical axis.
    pub fn move_toward_goal(&mut self, goal: Position, world: &GridWorld) -> bool {
        if self.battery == 0 {
            return false;
        }
        let dx = goal.x as isize - self.position.x as isize;
        let dy = goal.y as isize - self.position.y as isize;

        let direction = if dx.abs() > dy.abs() {
            if dx > 0 {
                Direction::Right
            } else {
                Direction::Left
            }
        } else if dy > 0 {
            Direction::Down
        } else {
            Direction::Up
        };
        self.attempt_move(direction, world)
    }

    /// Checks if the agent stands exactly on `goal`.
    pub fn is_at_goal(&self, goal: Position) -> bool {
        self.position == goal
    }

    /// Pushes an orthogonally adjacent obstacle one cell away from the agent.
    ///
    /// Only strong agents with charge can push. The world re-checks the
    /// destination cell.
    pub fn push_obstacle(&mut self, obstacle: Position, world: &mut GridWorld) -> bool {
        if self.kind != AgentKind::Strong || self.battery == 0 {
            return false;
        }
        let here = self.position;
        let adjacent = (here.y == obstacle.y && here.x.abs_diff(obstacle.x) <= 1)
            || (here.x == obstacle.x && here.y.abs_diff(obstacle.y) <= 1);
        if !adjacent {
            return false;
        }

        let direction = if obstacle.x > here.x {
            Direction::Right
        } else if obstacle.x < here.x {
            Direction::Left
        } else if obstacle.y > here.y {
            Direction::Down
        } else if obstacle.y < here.y {
            Direction::Up
        } else {
            return false;
        };

        if !world.push_obstacle(obstacle, direction) {
            return false;
        }
        self.drain(PUSH_COST);
        debug!(agent = %self.name, ?obstacle, ?direction, battery = self.battery, "pushed obstacle");
        true
    }

    /// Reports every obstacle and goal within `scan_radius` (Chebyshev).
    ///
    /// Returns `None` for agents that are not scouts or have no charge.
    pub fn scan_area(&mut self, obstacles: &[Position], goals: &[Position]) -> Option<ScanReport> {
        if self.kind != AgentKind::Scout || self.battery == 0 {
            return None;
        }
        let in_range = |p: &&Position| self.position.chebyshev_distance(p) <= self.scan_radius;
        let report = ScanReport {
            obstacles: obstacles.iter().filter(in_range).copied().collect(),
            goals: goals.iter().filter(in_range).copied().collect(),
        };
        self.drain(SCAN_COST);
        debug!(
            agent = %self.name,
            obstacles = report.obstacles.len(),
            goals = report.goals.len(),
            battery = self.battery,
            "scanned"
        );
        Some(report)
    }
}

impl fmt::Display for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}]: ({},{}) Battery:{}/{} Moves:{}",
            self.name,
            self.kind,
            self.position.x,
            self.position.y,
            self.battery,
            self.max_battery,
            self.moves
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_world() -> GridWorld {
        GridWorld::new(10, 10, [], vec![]).unwrap()
    }

    #[test]
    fn kind_defaults() {
        let fast = Agent::fast("F", Position::new(0, 0));
        assert_eq!((fast.speed(), fast.battery(), fast.max_battery()), (2, 80, 80));
        let strong = Agent::strong("S", Position::new(0, 0));
        assert_eq!((strong.speed(), strong.battery()), (1, 120));
        let scout = Agent::scout("R", Position::new(0, 0));
        assert_eq!((scout.speed(), scout.battery(), scout.scan_radius()), (2, 100, 2));
    }

    #[test]
    fn plain_move_right() {
        let world = empty_world();
        let mut agent = Agent::plain("WAMBUI", Position::new(0, 0));
        assert!(agent.attempt_move(Direction::Right, &world));
        assert_eq!(agent.position(), Position::new(1, 0));
        assert_eq!(agent.battery(), 99);
        assert_eq!(agent.moves(), 1);
    }

    #[test]
    fn failed_move_changes_nothing() {
        let world = GridWorld::new(10, 10, [Position::new(1, 0)], vec![]).unwrap();
        let mut agent = Agent::plain("A", Position::new(0, 0));
        let before = agent.clone();
        assert!(!agent.attempt_move(Direction::Up, &world));
        assert!(!agent.attempt_move(Direction::Left, &world));
        assert!(!agent.attempt_move(Direction::Right, &world));
        assert_eq!(agent, before);
    }

    #[test]
    fn speed_overshooting_the_edge_is_rejected() {
        let world = empty_world();
        let mut agent = Agent::fast("F", Position::new(9, 8));
        assert!(!agent.attempt_move(Direction::Down, &world));
        assert!(!agent.attempt_move(Direction::Right, &world));
        assert_eq!(agent.position(), Position::new(9, 8));
    }

    #[test]
    fn fast_move_jumps_over_an_obstacle() {
        let world = GridWorld::new(10, 10, [Position::new(1, 0)], vec![]).unwrap();
        let mut agent = Agent::fast("F", Position::new(0, 0));
        assert!(agent.attempt_move(Direction::Right, &world));
        assert_eq!(agent.position(), Position::new(2, 0));
        assert_eq!(agent.battery(), 78);
    }

    #[test]
    fn fast_move_costs_two_and_clamps() {
        let world = empty_world();
        let mut agent = Agent::fast("F", Position::new(0, 0));
        assert!(agent.attempt_move(Direction::Right, &world));
        assert_eq!(agent.position(), Position::new(2, 0));
        assert_eq!(agent.battery(), 78);

        let mut low = Agent::fast("F", Position::new(0, 0)).with_battery(1);
        assert!(low.attempt_move(Direction::Down, &world));
        assert_eq!(low.battery(), 0);
        assert!(!low.attempt_move(Direction::Down, &world));
        assert_eq!(low.moves(), 1);
    }

    #[test]
    fn depleted_agent_cannot_move_until_recharged() {
        let world = empty_world();
        let mut agent = Agent::plain("A", Position::new(0, 0)).with_battery(1);
        assert!(agent.attempt_move(Direction::Right, &world));
        assert!(agent.is_depleted());
        assert!(!agent.move_toward_goal(Position::new(5, 0), &world));
        assert!(agent.recharge());
        assert_eq!(agent.battery(), 1);
        assert!(agent.attempt_move(Direction::Right, &world));
    }

    #[test]
    fn recharge_when_full_is_a_no_op() {
        let mut agent = Agent::scout("R", Position::new(0, 0));
        let before = agent.clone();
        assert!(!agent.recharge());
        assert_eq!(agent, before);
    }

    #[test]
    fn move_toward_goal_prefers_dominant_axis() {
        let world = empty_world();
        let mut agent = Agent::plain("A", Position::new(0, 0));
        assert!(agent.move_toward_goal(Position::new(5, 2), &world));
        assert_eq!(agent.position(), Position::new(1, 0));

        let mut agent = Agent::plain("A", Position::new(5, 5));
        assert!(agent.move_toward_goal(Position::new(4, 1), &world));
        assert_eq!(agent.position(), Position::new(5, 4));
    }

    #[test]
    fn move_toward_goal_breaks_ties_vertically() {
        let world = empty_world();
        let mut agent = Agent::plain("A", Position::new(2, 2));
        assert!(agent.move_toward_goal(Position::new(4, 4), &world));
        assert_eq!(agent.position(), Position::new(2, 3));

        let mut agent = Agent::plain("A", Position::new(2, 2));
        assert!(agent.move_toward_goal(Position::new(0, 0), &world));
        assert_eq!(agent.position(), Position::new(2, 1));
    }

    #[test]
    fn move_toward_goal_blocked_by_obstacle() {
        let world = GridWorld::new(10, 10, [Position::new(0, 1)], vec![]).unwrap();
        let mut agent = Agent::plain("A", Position::new(0, 0));
        assert!(!agent.move_toward_goal(Position::new(0, 9), &world));
        assert_eq!(agent.position(), Position::new(0, 0));
        assert_eq!(agent.battery(), 100);
    }

    #[test]
    fn strong_push_moves_obstacle_away() {
        let mut world = GridWorld::new(10, 10, [Position::new(1, 1)], vec![]).unwrap();
        let mut agent = Agent::strong("OPTIMUS PRIME", Position::new(0, 1));
        assert!(agent.push_obstacle(Position::new(1, 1), &mut world));
        assert!(world.is_obstacle(2, 1));
        assert!(!world.is_obstacle(1, 1));
        assert_eq!(agent.battery(), 118);
        assert_eq!(agent.position(), Position::new(0, 1));
        assert_eq!(agent.moves(), 0);
    }

    #[test]
    fn push_requires_orthogonal_adjacency() {
        let mut world =
            GridWorld::new(10, 10, [Position::new(1, 1), Position::new(3, 0)], vec![]).unwrap();
        let mut agent = Agent::strong("S", Position::new(0, 0));
        assert!(!agent.push_obstacle(Position::new(1, 1), &mut world));
        assert!(!agent.push_obstacle(Position::new(3, 0), &mut world));
        assert_eq!(agent.battery(), 120);
    }

    #[test]
    fn push_blocked_by_world_costs_nothing() {
        let mut world =
            GridWorld::new(3, 3, [Position::new(1, 0)], vec![Position::new(2, 0)]).unwrap();
        let mut agent = Agent::strong("S", Position::new(0, 0));
        assert!(!agent.push_obstacle(Position::new(1, 0), &mut world));
        assert_eq!(agent.battery(), 120);
        assert!(world.is_obstacle(1, 0));
    }

    #[test]
    fn only_strong_agents_push() {
        let mut world = GridWorld::new(10, 10, [Position::new(1, 1)], vec![]).unwrap();
        let mut agent = Agent::plain("A", Position::new(0, 1));
        assert!(!agent.push_obstacle(Position::new(1, 1), &mut world));
        assert!(world.is_obstacle(1, 1));
    }

    #[test]
    fn scout_scan_uses_chebyshev_radius() {
        let mut agent = Agent::scout("REX", Position::new(1, 1));
        let obstacles = [Position::new(0, 3), Position::new(9, 9)];
        let goals = [Position::new(2, 8)];
        let report = agent.scan_area(&obstacles, &goals).unwrap();
        assert_eq!(report.obstacles, vec![Position::new(0, 3)]);
        assert!(report.goals.is_empty());
        assert_eq!(agent.battery(), 99);
    }

    #[test]
    fn scan_excludes_entities_just_outside_radius() {
        let mut agent = Agent::scout("REX", Position::new(3, 3));
        let obstacles = [Position::new(5, 1), Position::new(6, 3), Position::new(3, 0)];
        let goals = [Position::new(1, 5), Position::new(0, 6)];
        let report = agent.scan_area(&obstacles, &goals).unwrap();
        assert_eq!(report.obstacles, vec![Position::new(5, 1)]);
        assert_eq!(report.goals, vec![Position::new(1, 5)]);
    }

    #[test]
    fn non_scout_scan_is_none_and_free() {
        let mut agent = Agent::plain("A", Position::new(1, 1));
        assert_eq!(agent.scan_area(&[Position::new(1, 2)], &[]), None);
        assert_eq!(agent.battery(), 100);
    }

    #[test]
    fn summary_line() {
        let agent = Agent::fast("FAITH", Position::new(1, 0));
        assert_eq!(agent.to_string(), "FAITH [fast]: (1,0) Battery:80/80 Moves:0");
    }
}
