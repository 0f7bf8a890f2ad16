//! Policy configuration.
//!
//! Configs are plain RON files. Every field has a default, so a config file
//! only needs to name what it changes:
//!
//! ```ron
//! (
//!     team: "Farmers",
//!     scheduling: Priority,
//!     ship_quota: 4,
//! )
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::build::BuildKind;
use crate::error::{PolicyError, Result};
use crate::math::Fixed;

/// Team name used when a config does not set one.
pub const DEFAULT_TEAM: &str = "Farmers";

/// How bases choose what to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SchedulingMode {
    /// Mines first, then capped ships, then capped tanks, then jets.
    #[default]
    Priority,
    /// One team-wide ring over `build_order`, advancing on each build.
    Cycle,
}

/// Tunable parameters of the policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Name of the team this policy plays.
    pub team: String,
    /// Scheduling mode for bases.
    pub scheduling: SchedulingMode,
    /// Ring order used by [`SchedulingMode::Cycle`].
    pub build_order: Vec<BuildKind>,
    /// Mines each base builds before anything else.
    pub mine_target: u32,
    /// Ships each base builds before moving on to tanks.
    pub ship_quota: u32,
    /// Tanks each base builds before moving on to jets.
    pub tank_quota: u32,
    /// A stuck ship converts only when farther than this from every own base.
    pub conversion_distance: i32,
    /// Seed for the heading generator.
    pub heading_seed: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            team: DEFAULT_TEAM.to_string(),
            scheduling: SchedulingMode::Priority,
            build_order: vec![
                BuildKind::Mine,
                BuildKind::Tank,
                BuildKind::Ship,
                BuildKind::Jet,
            ],
            mine_target: 2,
            ship_quota: 3,
            tank_quota: 5,
            conversion_distance: 40,
            heading_seed: 0x5EED,
        }
    }
}

impl PolicyConfig {
    /// Load a config from a RON file and validate it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PolicyError::ConfigNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Parse a config from a RON string and validate it.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let config: Self = ron::from_str(ron)?;
        config.validate()?;
        Ok(config)
    }

    /// Default config playing under a different team name.
    #[must_use]
    pub fn for_team(team: impl Into<String>) -> Self {
        Self {
            team: team.into(),
            ..Self::default()
        }
    }

    /// Set the heading seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.heading_seed = seed;
        self
    }

    /// Set the scheduling mode.
    #[must_use]
    pub fn with_scheduling(mut self, scheduling: SchedulingMode) -> Self {
        self.scheduling = scheduling;
        self
    }

    /// Reject configs the policy cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.team.trim().is_empty() {
            return Err(PolicyError::InvalidConfig(
                "team name must not be empty".to_string(),
            ));
        }
        if self.conversion_distance < 0 {
            return Err(PolicyError::InvalidConfig(format!(
                "conversion_distance must be non-negative, got {}",
                self.conversion_distance
            )));
        }
        if self.scheduling == SchedulingMode::Cycle && self.build_order.is_empty() {
            return Err(PolicyError::InvalidConfig(
                "cycle scheduling needs a non-empty build_order".to_string(),
            ));
        }
        Ok(())
    }

    /// Conversion distance as a fixed-point value.
    #[must_use]
    pub fn conversion_range(&self) -> Fixed {
        Fixed::from_num(self.conversion_distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_farmers_bot() {
        let config = PolicyConfig::default();
        assert_eq!(config.team, "Farmers");
        assert_eq!(config.mine_target, 2);
        assert_eq!(config.ship_quota, 3);
        assert_eq!(config.tank_quota, 5);
        assert_eq!(config.conversion_distance, 40);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_ron_keeps_defaults() {
        let config = PolicyConfig::from_ron_str(r#"(team: "Miners", ship_quota: 1)"#)
            .expect("config should parse");
        assert_eq!(config.team, "Miners");
        assert_eq!(config.ship_quota, 1);
        assert_eq!(config.tank_quota, 5);
        assert_eq!(config.scheduling, SchedulingMode::Priority);
    }

    #[test]
    fn test_build_order_names_parse() {
        let config =
            PolicyConfig::from_ron_str("(scheduling: Cycle, build_order: [ship, jet])")
                .expect("config should parse");
        assert_eq!(config.build_order, vec![BuildKind::Ship, BuildKind::Jet]);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            PolicyConfig::from_ron_str(r#"(team: "  ")"#),
            Err(PolicyError::InvalidConfig(_))
        ));
        assert!(matches!(
            PolicyConfig::from_ron_str("(conversion_distance: -1)"),
            Err(PolicyError::InvalidConfig(_))
        ));
        assert!(matches!(
            PolicyConfig::from_ron_str("(scheduling: Cycle, build_order: [])"),
            Err(PolicyError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_parse_error_surfaces() {
        assert!(matches!(
            PolicyConfig::from_ron_str("(ship_quota: \"many\")"),
            Err(PolicyError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            PolicyConfig::load("/definitely/not/here.ron"),
            Err(PolicyError::ConfigNotFound(_))
        ));
    }
}
