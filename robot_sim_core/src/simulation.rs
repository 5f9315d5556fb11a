use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    Direction, Position,
    agent::{Agent, AgentKind, ScanReport},
    world::GridWorld,
};

/// Errors raised when agents cannot be placed in the world.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimulationError {
    #[error("Agent '{name}' starts outside the world at {position:?}")]
    AgentOutOfBounds { name: String, position: Position },
    #[error("Agent '{name}' starts on an obstacle at {position:?}")]
    AgentOnObstacle { name: String, position: Position },
}

/// Where the simulation stands after an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Running,
    /// Every goal has been collected.
    Won,
    /// Goals remain but every agent is out of battery.
    Lost,
}

/// Read-only view of one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub name: String,
    pub kind: AgentKind,
    pub position: Position,
    pub battery: u32,
    pub max_battery: u32,
    pub battery_percent: u32,
    pub moves: u32,
}

/// Read-only view of the whole simulation, for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub width: usize,
    pub height: usize,
    pub obstacles: Vec<Position>,
    pub goals: Vec<Position>,
    pub agents: Vec<AgentSnapshot>,
    pub selected: usize,
    pub auto_mode: bool,
    pub won: bool,
    pub goals_collected: usize,
}

/// Owns the world and the agents and applies commands to them.
#[derive(Debug, Clone)]
pub struct Simulation {
    world: GridWorld,
    agents: Vec<Agent>,
    initial_world: GridWorld,
    initial_agents: Vec<Agent>,
    selected: usize,
    auto_mode: bool,
    won: bool,
    goals_collected: usize,
}

impl Simulation {
    /// Creates a simulation. Agents are selectable in the order given.
    pub fn new(world: GridWorld, agents: Vec<Agent>) -> Result<Self, SimulationError> {
        for agent in &agents {
            let position = agent.position();
            if !world.is_in_bounds(position.x, position.y) {
                return Err(SimulationError::AgentOutOfBounds {
                    name: agent.name().to_string(),
                    position,
                });
            }
            if world.is_obstacle(position.x, position.y) {
                return Err(SimulationError::AgentOnObstacle {
                    name: agent.name().to_string(),
                    position,
                });
            }
        }

        let won = world.goals().is_empty();
        Ok(Simulation {
            initial_world: world.clone(),
            initial_agents: agents.clone(),
            world,
            agents,
            selected: 0,
            auto_mode: false,
            won,
            goals_collected: 0,
        })
    }

    /// Returns the world in its current state.
    pub fn world(&self) -> &GridWorld {
        &self.world
    }

    /// Returns the agents in selection order.
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Returns the index of the selected agent.
    pub fn selected_index(&self) -> usize {
        self.selected
    }

    /// Returns the selected agent, or `None` when there are no agents.
    pub fn selected_agent(&self) -> Option<&Agent> {
        self.agents.get(self.selected)
    }

    /// Returns true while every agent steps on its own each update.
    pub fn is_auto_mode(&self) -> bool {
        self.auto_mode
    }

    /// Returns true once the goal list is empty, until the next reset.
    pub fn is_won(&self) -> bool {
        self.won
    }

    /// Returns how many goals have been collected since the last reset.
    pub fn goals_collected(&self) -> usize {
        self.goals_collected
    }

    /// Selects the agent at `index`; out-of-range indices are ignored.
    pub fn select_agent(&mut self, index: usize) {
        if index < self.agents.len() {
            self.selected = index;
            debug!(agent = %self.agents[index].name(), "selected");
        }
    }

    /// Flips auto mode and returns the new state.
    pub fn toggle_auto_mode(&mut self) -> bool {
        self.auto_mode = !self.auto_mode;
        info!(auto_mode = self.auto_mode, "auto mode toggled");
        self.auto_mode
    }

    /// Moves the selected agent. Rejected in auto mode and once won.
    pub fn issue_command(&mut self, direction: Direction) -> bool {
        if self.auto_mode || self.won {
            return false;
        }
        match self.agents.get_mut(self.selected) {
            Some(agent) => agent.attempt_move(direction, &self.world),
            None => false,
        }
    }

    /// Recharges the selected agent. Rejected once won.
    pub fn recharge_selected(&mut self) -> bool {
        if self.won {
            return false;
        }
        self.agents
            .get_mut(self.selected)
            .is_some_and(Agent::recharge)
    }

    /// Has the selected agent push the obstacle next to it in `direction`.
    ///
    /// Rejected if another agent stands where the obstacle would land.
    pub fn push_selected(&mut self, direction: Direction) -> bool {
        if self.won {
            return false;
        }
        let Some(agent) = self.agents.get(self.selected) else {
            return false;
        };
        let Some(obstacle) = agent.position().offset(direction, 1) else {
            return false;
        };
        let Some(landing) = obstacle.offset(direction, 1) else {
            return false;
        };
        if self.agents.iter().any(|a| a.position() == landing) {
            return false;
        }
        self.agents[self.selected].push_obstacle(obstacle, &mut self.world)
    }

    /// Scans around the selected agent, if it is a scout.
    pub fn scan_selected(&mut self) -> Option<ScanReport> {
        if self.won {
            return None;
        }
        let obstacles = self.world.obstacles();
        let agent = self.agents.get_mut(self.selected)?;
        agent.scan_area(&obstacles, self.world.goals())
    }

    /// In auto mode, steps every agent toward the first remaining goal.
    pub fn tick_auto(&mut self) {
        if !self.auto_mode {
            return;
        }
        for agent in &mut self.agents {
            let Some(&goal) = self.world.goals().first() else {
                break;
            };
            agent.move_toward_goal(goal, &self.world);
        }
    }

    /// Removes every goal an agent is standing on. Returns how many were
    /// collected by this call.
    pub fn collect_goals(&mut self) -> usize {
        let goals: Vec<Position> = self.world.goals().to_vec();
        let mut collected = 0;
        for agent in &self.agents {
            for goal in &goals {
                if agent.is_at_goal(*goal) && self.world.remove_goal_if_present(goal.x, goal.y) {
                    collected += 1;
                    info!(agent = %agent.name(), ?goal, "goal collected");
                }
            }
        }
        self.goals_collected += collected;
        if collected > 0 {
            self.latch_win();
        }
        collected
    }

    /// Sets the won flag as soon as the goal list is empty.
    fn latch_win(&mut self) {
        if self.world.goals().is_empty() && !self.won {
            info!(
                goals_collected = self.goals_collected,
                efficiency = self.efficiency(),
                "all goals collected"
            );
            self.won = true;
        }
    }

    /// True once no goals remain.
    pub fn check_win(&mut self) -> bool {
        self.latch_win();
        self.won
    }

    /// Goals remain and no agent has any charge left.
    pub fn is_lost(&self) -> bool {
        !self.won && !self.agents.is_empty() && self.agents.iter().all(Agent::is_depleted)
    }

    /// Remaining battery per move across all agents, times 100. Zero before
    /// the first move.
    pub fn efficiency(&self) -> u32 {
        let moves: u64 = self.agents.iter().map(|a| u64::from(a.moves())).sum();
        if moves == 0 {
            return 0;
        }
        let battery: u64 = self.agents.iter().map(|a| u64::from(a.battery())).sum();
        u32::try_from(battery * 100 / moves).unwrap_or(u32::MAX)
    }

    /// Runs one frame: auto step, goal collection, win check.
    pub fn update(&mut self) -> Outcome {
        self.tick_auto();
        self.collect_goals();
        if self.check_win() {
            Outcome::Won
        } else if self.is_lost() {
            Outcome::Lost
        } else {
            Outcome::Running
        }
    }

    /// Restores the world and agents to their starting state.
    pub fn reset(&mut self) {
        self.world = self.initial_world.clone();
        self.agents = self.initial_agents.clone();
        self.selected = 0;
        self.auto_mode = false;
        self.won = self.world.goals().is_empty();
        self.goals_collected = 0;
        info!("simulation reset");
    }

    /// Copies out everything a renderer needs.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            width: self.world.width(),
            height: self.world.height(),
            obstacles: self.world.obstacles(),
            goals: self.world.goals().to_vec(),
            agents: self
                .agents
                .iter()
                .map(|a| AgentSnapshot {
                    name: a.name().to_string(),
                    kind: a.kind(),
                    position: a.position(),
                    battery: a.battery(),
                    max_battery: a.max_battery(),
                    battery_percent: a.battery_percent(),
                    moves: a.moves(),
                })
                .collect(),
            selected: self.selected,
            auto_mode: self.auto_mode,
            won: self.won,
            goals_collected: self.goals_collected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sim(goals: Vec<Position>) -> Simulation {
        let world = GridWorld::new(10, 10, [Position::new(1, 1)], goals).unwrap();
        let agents = vec![
            Agent::plain("A", Position::new(0, 0)),
            Agent::fast("B", Position::new(2, 0)),
            Agent::strong("C", Position::new(0, 1)),
            Agent::scout("D", Position::new(3, 3)),
        ];
        Simulation::new(world, agents).unwrap()
    }

    #[test]
    fn rejects_agents_on_obstacles_or_outside() {
        let world = GridWorld::new(3, 3, [Position::new(1, 1)], vec![]).unwrap();
        assert!(matches!(
            Simulation::new(world.clone(), vec![Agent::plain("A", Position::new(1, 1))]),
            Err(SimulationError::AgentOnObstacle { .. })
        ));
        assert!(matches!(
            Simulation::new(world, vec![Agent::plain("A", Position::new(3, 0))]),
            Err(SimulationError::AgentOutOfBounds { .. })
        ));
    }

    #[test]
    fn selection_ignores_out_of_range() {
        let mut s = sim(vec![Position::new(9, 9)]);
        s.select_agent(2);
        assert_eq!(s.selected_index(), 2);
        s.select_agent(4);
        assert_eq!(s.selected_index(), 2);
        assert_eq!(s.selected_agent().map(Agent::name), Some("C"));
    }

    #[test]
    fn commands_go_to_the_selected_agent() {
        let mut s = sim(vec![Position::new(9, 9)]);
        s.select_agent(1);
        assert!(s.issue_command(Direction::Right));
        assert_eq!(s.agents()[1].position(), Position::new(4, 0));
        assert_eq!(s.agents()[0].moves(), 0);
    }

    #[test]
    fn manual_commands_rejected_in_auto_mode() {
        let mut s = sim(vec![Position::new(9, 9)]);
        assert!(s.toggle_auto_mode());
        assert!(!s.issue_command(Direction::Right));
        assert!(!s.toggle_auto_mode());
        assert!(s.issue_command(Direction::Right));
    }

    #[test]
    fn tick_auto_targets_first_goal_only() {
        let mut s = sim(vec![Position::new(0, 9), Position::new(9, 0)]);
        s.tick_auto();
        assert_eq!(s.agents()[0].position(), Position::new(0, 0));

        s.toggle_auto_mode();
        s.tick_auto();
        // plain at (0,0) heads down toward (0,9) even though (9,0) is listed
        assert_eq!(s.agents()[0].position(), Position::new(0, 1));
        assert_eq!(s.agents()[3].position(), Position::new(3, 5));
    }

    #[test]
    fn collect_goals_removes_every_goal_underfoot() {
        let world = GridWorld::new(
            10,
            10,
            [],
            vec![Position::new(1, 0), Position::new(5, 5), Position::new(2, 0)],
        )
        .unwrap();
        let agents = vec![
            Agent::plain("A", Position::new(1, 0)),
            Agent::plain("B", Position::new(2, 0)),
        ];
        let mut s = Simulation::new(world, agents).unwrap();
        assert_eq!(s.collect_goals(), 2);
        assert_eq!(s.world().goals(), &[Position::new(5, 5)]);
        assert_eq!(s.goals_collected(), 2);
        assert!(!s.check_win());
    }

    #[test]
    fn win_latches_and_blocks_commands() {
        let mut s = sim(vec![Position::new(1, 0)]);
        assert!(s.issue_command(Direction::Right));
        assert_eq!(s.update(), Outcome::Won);
        assert!(s.is_won());
        assert!(!s.issue_command(Direction::Down));
        assert!(!s.recharge_selected());
        s.reset();
        assert!(!s.is_won());
        assert!(s.issue_command(Direction::Down));
    }

    #[test]
    fn collecting_the_last_goal_blocks_commands() {
        let world = GridWorld::new(5, 5, [], vec![Position::new(0, 0)]).unwrap();
        let agents = vec![Agent::strong("S", Position::new(0, 0)).with_battery(10)];
        let mut s = Simulation::new(world, agents).unwrap();
        s.issue_command(Direction::Right);
        s.issue_command(Direction::Left);
        assert!(!s.is_won());

        assert_eq!(s.collect_goals(), 1);
        assert!(s.is_won());
        assert!(!s.issue_command(Direction::Right));
        assert!(!s.push_selected(Direction::Right));
        assert!(!s.recharge_selected());
        assert_eq!(s.agents()[0].position(), Position::new(0, 0));
        assert!(s.snapshot().won);
    }

    #[test]
    fn world_without_goals_starts_won() {
        let world = GridWorld::new(5, 5, [], vec![]).unwrap();
        let mut s = Simulation::new(world, vec![Agent::scout("R", Position::new(0, 0))]).unwrap();
        assert!(s.is_won());
        assert!(!s.issue_command(Direction::Down));
        assert_eq!(s.scan_selected(), None);
        s.reset();
        assert!(s.is_won());
        assert_eq!(s.update(), Outcome::Won);
    }

    #[test]
    fn shared_goal_is_collected_once() {
        let world =
            GridWorld::new(5, 5, [], vec![Position::new(2, 2), Position::new(4, 4)]).unwrap();
        let agents = vec![
            Agent::plain("A", Position::new(2, 2)),
            Agent::scout("B", Position::new(2, 2)),
        ];
        let mut s = Simulation::new(world, agents).unwrap();
        assert_eq!(s.collect_goals(), 1);
        assert_eq!(s.goals_collected(), 1);
        assert_eq!(s.world().goals(), &[Position::new(4, 4)]);
        assert!(!s.is_won());
    }

    #[test]
    fn push_selected_for_strong_agent() {
        let mut s = sim(vec![Position::new(9, 9)]);
        s.select_agent(2);
        assert!(s.push_selected(Direction::Right));
        assert!(s.world().is_obstacle(2, 1));
        assert_eq!(s.agents()[2].battery(), 118);
    }

    #[test]
    fn push_blocked_by_agent_on_landing_cell() {
        let world =
            GridWorld::new(10, 10, [Position::new(1, 1)], vec![Position::new(9, 9)]).unwrap();
        let agents = vec![
            Agent::strong("S", Position::new(0, 1)),
            Agent::plain("P", Position::new(2, 1)),
        ];
        let mut s = Simulation::new(world, agents).unwrap();
        assert!(!s.push_selected(Direction::Right));
        assert!(s.world().is_obstacle(1, 1));
        assert_eq!(s.agents()[0].battery(), 120);
    }

    #[test]
    fn scan_selected_only_for_scouts() {
        let mut s = sim(vec![Position::new(4, 4)]);
        assert_eq!(s.scan_selected(), None);
        s.select_agent(3);
        let report = s.scan_selected().unwrap();
        assert_eq!(report.obstacles, vec![Position::new(1, 1)]);
        assert_eq!(report.goals, vec![Position::new(4, 4)]);
        assert_eq!(s.agents()[3].battery(), 99);
    }

    #[test]
    fn recharge_selected() {
        let mut s = sim(vec![Position::new(9, 9)]);
        assert!(!s.recharge_selected());
        s.issue_command(Direction::Right);
        assert!(s.recharge_selected());
        assert_eq!(s.agents()[0].battery(), 100);
    }

    #[test]
    fn lost_when_every_agent_is_depleted() {
        let world = GridWorld::new(5, 5, [], vec![Position::new(4, 4)]).unwrap();
        let agents = vec![Agent::plain("A", Position::new(0, 0)).with_battery(1)];
        let mut s = Simulation::new(world, agents).unwrap();
        assert_eq!(s.update(), Outcome::Running);
        s.issue_command(Direction::Right);
        assert_eq!(s.update(), Outcome::Lost);
    }

    #[test]
    fn efficiency_is_battery_per_move() {
        let mut s = sim(vec![Position::new(9, 9)]);
        assert_eq!(s.efficiency(), 0);
        s.issue_command(Direction::Right);
        // 99 + 80 + 120 + 100 remaining over one move
        assert_eq!(s.efficiency(), 39_900);
    }

    #[test]
    fn snapshot_reflects_state() {
        let mut s = sim(vec![Position::new(9, 9)]);
        s.select_agent(1);
        let snap = s.snapshot();
        assert_eq!((snap.width, snap.height), (10, 10));
        assert_eq!(snap.obstacles, vec![Position::new(1, 1)]);
        assert_eq!(snap.goals, vec![Position::new(9, 9)]);
        assert_eq!(snap.agents.len(), 4);
        assert_eq!(snap.agents[1].kind, AgentKind::Fast);
        assert_eq!(snap.agents[1].battery_percent, 100);
        assert_eq!(snap.selected, 1);
        assert!(!snap.won);
    }
}
