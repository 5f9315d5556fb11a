//! Scenario files: the world layout and the robots that start in it.
//!
//! Scenarios are YAML documents. The world is given either as explicit
//! coordinate lists or as a token map (see [`load_world_from_string`]).
//!
//! ```yaml
//! name: corridor
//! world:
//!   width: 6
//!   height: 3
//!   obstacles: [[2, 1]]
//!   goals: [[5, 2]]
//! agents:
//!   - { name: WAMBUI, kind: plain, x: 0, y: 0 }
//!   - { name: FAITH, kind: fast, x: 0, y: 2, battery: 40 }
//! ```

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    Position,
    agent::{Agent, AgentKind},
    simulation::{Simulation, SimulationError},
    world::{GridWorld, WorldError, load_world_from_string},
};

#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("Failed to read scenario file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid scenario YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    World(#[from] WorldError),
    #[error(transparent)]
    Simulation(#[from] SimulationError),
    #[error("Scenario '{0}' has no agents")]
    NoAgents(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldConfig {
    #[serde(default)]
    pub width: usize,
    #[serde(default)]
    pub height: usize,
    #[serde(default)]
    pub obstacles: Vec<[usize; 2]>,
    /// Collected in this order by auto mode.
    #[serde(default)]
    pub goals: Vec<[usize; 2]>,
    /// Token map; replaces every other field when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub name: String,
    pub kind: AgentKind,
    pub x: usize,
    pub y: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery: Option<u32>,
}

impl AgentConfig {
    fn to_agent(&self) -> Agent {
        let mut agent = Agent::new(self.name.clone(), self.kind, Position::new(self.x, self.y));
        if let Some(speed) = self.speed {
            agent = agent.with_speed(speed);
        }
        if let Some(battery) = self.battery {
            agent = agent.with_battery(battery);
        }
        agent
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    #[serde(default = "default_name")]
    pub name: String,
    pub world: WorldConfig,
    pub agents: Vec<AgentConfig>,
}

fn default_name() -> String {
    "unnamed".to_string()
}

fn positions(cells: &[[usize; 2]]) -> Vec<Position> {
    cells.iter().map(|&[x, y]| Position::new(x, y)).collect()
}

impl ScenarioConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ScenarioError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_yaml_str(&content)?;
        info!(path = %path.display(), name = %config.name, "scenario loaded");
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> Result<String, ScenarioError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn build_world(&self) -> Result<GridWorld, ScenarioError> {
        let world = match &self.world.map {
            Some(map) => load_world_from_string(map)?,
            None => GridWorld::new(
                self.world.width,
                self.world.height,
                positions(&self.world.obstacles),
                positions(&self.world.goals),
            )?,
        };
        Ok(world)
    }

    /// Builds a ready-to-run simulation.
    pub fn build(&self) -> Result<Simulation, ScenarioError> {
        if self.agents.is_empty() {
            return Err(ScenarioError::NoAgents(self.name.clone()));
        }
        let world = self.build_world()?;
        let agents = self.agents.iter().map(AgentConfig::to_agent).collect();
        Ok(Simulation::new(world, agents)?)
    }
}

impl Default for ScenarioConfig {
    /// The 10x10 robot race with four robots and three goals.
    fn default() -> Self {
        const OBSTACLES: [[usize; 2]; 35] = [
            [0, 3], [0, 6], [0, 7], [1, 2], [1, 4], [1, 5], [1, 8],
            [2, 0], [2, 4], [2, 9], [3, 0], [3, 1], [3, 3], [4, 5],
            [4, 7], [4, 0], [4, 6], [5, 0], [5, 2], [5, 4], [5, 7],
            [5, 9], [6, 2], [6, 3], [7, 1], [7, 2], [7, 4], [7, 6],
            [7, 7], [7, 9], [8, 4], [8, 8], [9, 1], [9, 3], [9, 6],
        ];
        let agent = |name: &str, kind, x, y| AgentConfig {
            name: name.to_string(),
            kind,
            x,
            y,
            speed: None,
            battery: None,
        };

        ScenarioConfig {
            name: "robot race".to_string(),
            world: WorldConfig {
                width: 10,
                height: 10,
                obstacles: OBSTACLES.to_vec(),
                goals: vec![[9, 9], [2, 8], [8, 2]],
                map: None,
            },
            agents: vec![
                agent("WAMBUI", AgentKind::Plain, 0, 0),
                agent("FAITH", AgentKind::Fast, 1, 0),
                agent("OPTIMUS PRIME", AgentKind::Strong, 0, 1),
                agent("REX", AgentKind::Scout, 1, 1),
            ],
        }
    }
}
