//! Scenario loading and configuration.
//!
//! Scenarios define the starting world for a headless run: map and islands,
//! teams with their controllers and bases, build costs, income and unit
//! speeds.

use std::collections::HashSet;
use std::path::Path;

use farmers_core::build::BuildKind;
use farmers_core::config::PolicyConfig;
use farmers_core::dispatch::UnitKind;
use farmers_core::engine::TerrainGrid;
use farmers_core::error::PolicyError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// Parsed but unusable.
    #[error("Invalid scenario: {0}")]
    Invalid(String),
    /// A team's policy config was rejected.
    #[error("Invalid policy for team: {0}")]
    Policy(#[from] PolicyError),
}

/// Longest map side, in cells. Keeps every position and travel leg well
/// inside the fixed-point range.
pub const MAX_MAP_SIDE: u32 = 1 << 20;

/// Fastest allowed unit speed, in cells per tick.
pub const MAX_SPEED: i32 = 1 << 10;

/// Who drives a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Controller {
    /// The farmers policy.
    #[default]
    Policy,
    /// Nobody; the team's bases and units never act.
    Idle,
}

/// A circular patch of land.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Island {
    /// Center x, in cells.
    pub x: i32,
    /// Center y, in cells.
    pub y: i32,
    /// Radius, in cells.
    pub radius: u32,
}

impl Island {
    /// Create an island.
    #[must_use]
    pub const fn new(x: i32, y: i32, radius: u32) -> Self {
        Self { x, y, radius }
    }
}

/// One team's starting setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamSetup {
    /// Team name.
    pub name: String,
    /// Who plays it.
    #[serde(default)]
    pub controller: Controller,
    /// Starting base positions, in cells.
    pub bases: Vec<(i32, i32)>,
    /// Crystal each starting base holds.
    pub starting_crystal: i32,
    /// Policy overrides for this team; the team name is always forced.
    #[serde(default)]
    pub policy: Option<PolicyConfig>,
}

impl TeamSetup {
    /// A policy-controlled team.
    #[must_use]
    pub fn policy(name: &str, bases: Vec<(i32, i32)>, starting_crystal: i32) -> Self {
        Self {
            name: name.to_string(),
            controller: Controller::Policy,
            bases,
            starting_crystal,
            policy: None,
        }
    }

    /// A team that never acts.
    #[must_use]
    pub fn idle(name: &str, bases: Vec<(i32, i32)>) -> Self {
        Self {
            name: name.to_string(),
            controller: Controller::Idle,
            bases,
            starting_crystal: 0,
            policy: None,
        }
    }
}

/// Build costs charged by the sandbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CostTable {
    /// Mine cost.
    pub mine: i32,
    /// Ship cost.
    pub ship: i32,
    /// Tank cost.
    pub tank: i32,
    /// Jet cost.
    pub jet: i32,
}

impl CostTable {
    /// Cost of `kind`.
    #[must_use]
    pub const fn cost(&self, kind: BuildKind) -> i32 {
        match kind {
            BuildKind::Mine => self.mine,
            BuildKind::Ship => self.ship,
            BuildKind::Tank => self.tank,
            BuildKind::Jet => self.jet,
        }
    }
}

impl Default for CostTable {
    fn default() -> Self {
        Self {
            mine: 50,
            ship: 60,
            tank: 15,
            jet: 25,
        }
    }
}

/// Crystal income per base per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EconomySetup {
    /// Income every base gets.
    pub base_income: i32,
    /// Extra income per mine.
    pub income_per_mine: i32,
}

impl Default for EconomySetup {
    fn default() -> Self {
        Self {
            base_income: 1,
            income_per_mine: 1,
        }
    }
}

/// Unit speeds in cells per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpeedTable {
    /// Tank speed.
    pub tank: i32,
    /// Ship speed.
    pub ship: i32,
    /// Jet speed.
    pub jet: i32,
}

impl SpeedTable {
    /// Speed of `kind`.
    #[must_use]
    pub const fn speed(&self, kind: UnitKind) -> i32 {
        match kind {
            UnitKind::Tank => self.tank,
            UnitKind::Ship => self.ship,
            UnitKind::Jet => self.jet,
        }
    }
}

impl Default for SpeedTable {
    fn default() -> Self {
        Self {
            tank: 1,
            ship: 2,
            jet: 3,
        }
    }
}

/// A complete scenario configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Map dimensions (width, height) in cells.
    pub map_size: (u32, u32),
    /// Land patches; everything else is water.
    pub islands: Vec<Island>,
    /// Teams, in snapshot order.
    pub teams: Vec<TeamSetup>,
    /// Build costs.
    #[serde(default)]
    pub costs: CostTable,
    /// Income.
    #[serde(default)]
    pub economy: EconomySetup,
    /// Unit speeds.
    #[serde(default)]
    pub speeds: SpeedTable,
    /// Ticks to run.
    pub ticks: u64,
}

impl Default for Scenario {
    fn default() -> Self {
        Self::duel()
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Resolve a preset name or a path to a RON file.
    pub fn resolve(name_or_path: &str) -> Result<Self, ScenarioError> {
        match name_or_path {
            "duel" => Ok(Self::duel()),
            "free_for_all" => Ok(Self::free_for_all()),
            path => Self::load(path),
        }
    }

    /// Two islands, the farmers against an idle opponent.
    #[must_use]
    pub fn duel() -> Self {
        Self {
            name: "duel".to_string(),
            description: "Farmers against a passive opponent across open water".to_string(),
            map_size: (256, 128),
            islands: vec![Island::new(40, 64, 18), Island::new(216, 64, 18)],
            teams: vec![
                TeamSetup::policy("Farmers", vec![(40, 64)], 100),
                TeamSetup::idle("Rivals", vec![(216, 64)]),
            ],
            costs: CostTable::default(),
            economy: EconomySetup::default(),
            speeds: SpeedTable::default(),
            ticks: 2000,
        }
    }

    /// Three policy teams on a shared archipelago.
    #[must_use]
    pub fn free_for_all() -> Self {
        Self {
            name: "free_for_all".to_string(),
            description: "Three policy-driven teams on an archipelago".to_string(),
            map_size: (256, 256),
            islands: vec![
                Island::new(48, 48, 20),
                Island::new(208, 48, 20),
                Island::new(128, 208, 20),
                Island::new(128, 110, 10),
            ],
            teams: vec![
                TeamSetup::policy("Farmers", vec![(48, 48)], 100),
                TeamSetup::policy("Herders", vec![(208, 48)], 100),
                TeamSetup::policy("Fishers", vec![(128, 208)], 100),
            ],
            costs: CostTable::default(),
            economy: EconomySetup::default(),
            speeds: SpeedTable::default(),
            ticks: 3000,
        }
    }

    /// Reject scenarios the sandbox cannot run.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        let (width, height) = self.map_size;
        if width == 0 || height == 0 {
            return Err(ScenarioError::Invalid("map must not be empty".to_string()));
        }
        if width > MAX_MAP_SIDE || height > MAX_MAP_SIDE {
            return Err(ScenarioError::Invalid(format!(
                "map {width}x{height} exceeds {MAX_MAP_SIDE} cells per side"
            )));
        }
        if let Some(island) = self.islands.iter().find(|i| i.radius > MAX_MAP_SIDE) {
            return Err(ScenarioError::Invalid(format!(
                "island at ({}, {}) is wider than any map",
                island.x, island.y
            )));
        }
        if self.teams.is_empty() {
            return Err(ScenarioError::Invalid("scenario has no teams".to_string()));
        }

        let mut names = HashSet::new();
        for team in &self.teams {
            if !names.insert(team.name.as_str()) {
                return Err(ScenarioError::Invalid(format!(
                    "duplicate team name '{}'",
                    team.name
                )));
            }
            for &(x, y) in &team.bases {
                let inside = x >= 0
                    && y >= 0
                    && i64::from(x) < i64::from(width)
                    && i64::from(y) < i64::from(height);
                if !inside {
                    return Err(ScenarioError::Invalid(format!(
                        "base ({x}, {y}) of team '{}' lies outside the map",
                        team.name
                    )));
                }
            }
        }

        let speeds = [self.speeds.tank, self.speeds.ship, self.speeds.jet];
        if speeds.iter().any(|&speed| speed <= 0 || speed > MAX_SPEED) {
            return Err(ScenarioError::Invalid(format!(
                "unit speeds must lie in 1..={MAX_SPEED}"
            )));
        }
        Ok(())
    }

    /// Rasterize the islands into a terrain grid.
    #[must_use]
    pub fn terrain(&self) -> TerrainGrid {
        let (width, height) = self.map_size;
        let mut grid = TerrainGrid::new(width, height);
        for island in &self.islands {
            let r = i64::from(island.radius);
            let (cx, cy) = (i64::from(island.x), i64::from(island.y));
            for y in (cy - r)..=(cy + r) {
                for x in (cx - r)..=(cx + r) {
                    let (dx, dy) = (x - cx, y - cy);
                    if dx * dx + dy * dy <= r * r {
                        grid.set(x, y, TerrainGrid::LAND);
                    }
                }
            }
        }
        grid
    }

    /// Policy config for `team`, with the name forced and the seed mixed in.
    #[must_use]
    pub fn policy_config(team: &TeamSetup, seed: u64, team_index: usize) -> PolicyConfig {
        let mut config = team.policy.clone().unwrap_or_default();
        config.team.clone_from(&team.name);
        config.heading_seed = config
            .heading_seed
            .wrapping_add(seed)
            .wrapping_mul(0x100_0000_01B3)
            .wrapping_add(team_index as u64);
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(Scenario::duel().validate().is_ok());
        assert!(Scenario::free_for_all().validate().is_ok());
    }

    #[test]
    fn test_islands_become_land() {
        let scenario = Scenario::duel();
        let terrain = scenario.terrain();
        assert_eq!(terrain.get(40, 64), Some(TerrainGrid::LAND));
        assert_eq!(terrain.get(128, 64), Some(TerrainGrid::WATER));
    }

    #[test]
    fn test_rejects_duplicate_teams() {
        let mut scenario = Scenario::duel();
        scenario.teams[1].name = "Farmers".to_string();
        assert!(matches!(scenario.validate(), Err(ScenarioError::Invalid(_))));
    }

    #[test]
    fn test_rejects_base_off_map() {
        let mut scenario = Scenario::duel();
        scenario.teams[0].bases.push((999, 0));
        assert!(matches!(scenario.validate(), Err(ScenarioError::Invalid(_))));
    }

    #[test]
    fn test_rejects_oversized_map_and_speed() {
        let mut scenario = Scenario::duel();
        scenario.map_size = (MAX_MAP_SIDE + 1, 64);
        assert!(matches!(scenario.validate(), Err(ScenarioError::Invalid(_))));

        let mut scenario = Scenario::duel();
        scenario.speeds.jet = MAX_SPEED + 1;
        assert!(matches!(scenario.validate(), Err(ScenarioError::Invalid(_))));
    }

    #[test]
    fn test_policy_config_forces_team_name() {
        let mut team = TeamSetup::policy("Herders", vec![(1, 1)], 10);
        team.policy = Some(PolicyConfig::for_team("Ignored"));

        let config = Scenario::policy_config(&team, 7, 1);
        assert_eq!(config.team, "Herders");
        assert_ne!(
            config.heading_seed,
            Scenario::policy_config(&team, 8, 1).heading_seed
        );
    }

    #[test]
    fn test_ron_round_trip_of_preset() {
        let text = ron::to_string(&Scenario::free_for_all()).expect("serialize");
        let back = Scenario::from_ron_str(&text).expect("parse");
        assert_eq!(back, Scenario::free_for_all());
    }
}
