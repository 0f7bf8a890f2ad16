//! Per-game and per-batch metrics.
//!
//! Maps are ordered so that serialized output is stable across runs.

use std::collections::BTreeMap;

use farmers_core::build::BuildKind;
use farmers_core::dispatch::DispatchEvent;
use farmers_core::policy::TickReport;
use serde::{Deserialize, Serialize};

use crate::sandbox::TeamState;

/// Complete metrics for a single game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameMetrics {
    /// Unique game identifier.
    pub game_id: String,
    /// Scenario name.
    pub scenario: String,
    /// Seed used.
    pub seed: u64,
    /// Ticks simulated.
    pub duration_ticks: u64,
    /// Per-team metrics.
    pub teams: BTreeMap<String, TeamMetrics>,
    /// Final sandbox state hash.
    pub final_state_hash: u64,
}

impl GameMetrics {
    /// Create an empty record.
    #[must_use]
    pub fn new(game_id: impl Into<String>, scenario: impl Into<String>, seed: u64) -> Self {
        Self {
            game_id: game_id.into(),
            scenario: scenario.into(),
            seed,
            ..Default::default()
        }
    }

    /// Get or create team metrics.
    pub fn team_mut(&mut self, team: &str) -> &mut TeamMetrics {
        self.teams
            .entry(team.to_string())
            .or_insert_with(|| TeamMetrics::new(team))
    }

    /// Fold one policy report into the team's totals.
    pub fn record_report(&mut self, tick: u64, team: &str, report: &TickReport) {
        let metrics = self.team_mut(team);
        for build in &report.builds {
            *metrics.builds.entry(build.kind).or_default() += 1;
        }
        for command in &report.commands {
            match command {
                DispatchEvent::Converted { .. } => {
                    metrics.conversions += 1;
                    metrics.first_conversion_tick.get_or_insert(tick);
                }
                DispatchEvent::Heading { .. } | DispatchEvent::Goto { .. } => {
                    metrics.unit_commands += 1;
                }
            }
        }
        if report.target.is_some() {
            metrics.first_target_tick.get_or_insert(tick);
        }
    }

    /// Track army size after a tick.
    pub fn record_army(&mut self, team: &TeamState) {
        let size = u32::try_from(team.vehicles.len()).unwrap_or(u32::MAX);
        let metrics = self.team_mut(&team.name);
        metrics.peak_army_size = metrics.peak_army_size.max(size);
    }

    /// Close the record with the final world state.
    pub fn finalize(&mut self, duration: u64, teams: &[TeamState], state_hash: u64) {
        self.duration_ticks = duration;
        self.final_state_hash = state_hash;
        for team in teams {
            let metrics = self.team_mut(&team.name);
            metrics.final_bases = u32::try_from(team.bases.len()).unwrap_or(u32::MAX);
            metrics.final_vehicles = u32::try_from(team.vehicles.len()).unwrap_or(u32::MAX);
            metrics.final_mines = team.bases.values().map(|b| b.mines).sum();
            metrics.final_crystal = team.total_crystal();
        }
    }
}

/// Metrics for one team in a game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMetrics {
    /// Team name.
    pub team: String,
    /// Build orders issued, by kind.
    pub builds: BTreeMap<BuildKind, u32>,
    /// Heading and goto orders issued.
    pub unit_commands: u32,
    /// Ships ordered to become bases.
    pub conversions: u32,
    /// Tick of the first conversion order.
    pub first_conversion_tick: Option<u64>,
    /// Tick a target was first known.
    pub first_target_tick: Option<u64>,
    /// Most vehicles alive at once.
    pub peak_army_size: u32,
    /// Bases at the end.
    pub final_bases: u32,
    /// Mines at the end.
    pub final_mines: u32,
    /// Vehicles at the end.
    pub final_vehicles: u32,
    /// Crystal held at the end.
    pub final_crystal: i64,
}

impl TeamMetrics {
    /// Create empty metrics for `team`.
    #[must_use]
    pub fn new(team: impl Into<String>) -> Self {
        Self {
            team: team.into(),
            ..Default::default()
        }
    }

    /// Total build orders of every kind.
    #[must_use]
    pub fn total_builds(&self) -> u32 {
        self.builds.values().sum()
    }
}

/// Summary statistics across multiple games.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Games summarized.
    pub total_games: u32,
    /// Average game length in ticks.
    pub avg_duration_ticks: f64,
    /// Average bases held at the end, by team.
    pub avg_final_bases: BTreeMap<String, f64>,
    /// Average build orders per game, by team.
    pub avg_builds: BTreeMap<String, f64>,
    /// Average conversions per game, by team.
    pub avg_conversions: BTreeMap<String, f64>,
    /// Average tick of the first conversion, over games that had one.
    pub avg_first_conversion_tick: BTreeMap<String, f64>,
}

impl BatchSummary {
    /// Summarize `games`.
    #[must_use]
    pub fn from_games(games: &[GameMetrics]) -> Self {
        if games.is_empty() {
            return Self::default();
        }

        let count = games.len() as f64;
        let mut summary = Self {
            total_games: u32::try_from(games.len()).unwrap_or(u32::MAX),
            avg_duration_ticks: games.iter().map(|g| g.duration_ticks as f64).sum::<f64>()
                / count,
            ..Default::default()
        };

        let mut first_conversions: BTreeMap<String, Vec<u64>> = BTreeMap::new();
        for game in games {
            for (name, team) in &game.teams {
                *summary.avg_final_bases.entry(name.clone()).or_default() +=
                    f64::from(team.final_bases) / count;
                *summary.avg_builds.entry(name.clone()).or_default() +=
                    f64::from(team.total_builds()) / count;
                *summary.avg_conversions.entry(name.clone()).or_default() +=
                    f64::from(team.conversions) / count;
                if let Some(tick) = team.first_conversion_tick {
                    first_conversions.entry(name.clone()).or_default().push(tick);
                }
            }
        }

        for (name, ticks) in first_conversions {
            let avg = ticks.iter().map(|&t| t as f64).sum::<f64>() / ticks.len() as f64;
            summary.avg_first_conversion_tick.insert(name, avg);
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use farmers_core::engine::{TickClock, Uid};
    use farmers_core::math::Vec2Fixed;
    use farmers_core::production::ProductionEvent;

    fn report_with_conversion() -> TickReport {
        TickReport {
            clock: TickClock::default(),
            builds: vec![ProductionEvent {
                base: Uid::new(1),
                kind: BuildKind::Ship,
                heading: None,
            }],
            target: Some(Vec2Fixed::from_num(5, 5)),
            commands: vec![DispatchEvent::Converted {
                ship: Uid::new(2),
                owner: Uid::new(1),
                position: Vec2Fixed::from_num(50, 50),
            }],
        }
    }

    #[test]
    fn test_record_report_counts() {
        let mut metrics = GameMetrics::new("g", "duel", 1);
        metrics.record_report(7, "Farmers", &report_with_conversion());
        metrics.record_report(9, "Farmers", &report_with_conversion());

        let team = &metrics.teams["Farmers"];
        assert_eq!(team.builds[&BuildKind::Ship], 2);
        assert_eq!(team.conversions, 2);
        assert_eq!(team.first_conversion_tick, Some(7));
        assert_eq!(team.first_target_tick, Some(7));
    }

    #[test]
    fn test_summary_averages() {
        let mut a = GameMetrics::new("a", "duel", 1);
        a.team_mut("Farmers").final_bases = 2;
        a.team_mut("Farmers").first_conversion_tick = Some(100);
        let mut b = GameMetrics::new("b", "duel", 2);
        b.team_mut("Farmers").final_bases = 4;

        let summary = BatchSummary::from_games(&[a, b]);

        assert_eq!(summary.total_games, 2);
        assert!((summary.avg_final_bases["Farmers"] - 3.0).abs() < f64::EPSILON);
        assert!((summary.avg_first_conversion_tick["Farmers"] - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_summary() {
        assert_eq!(BatchSummary::from_games(&[]), BatchSummary::default());
    }
}
