//! Drives policies against the sandbox, tick by tick.

use farmers_core::engine::TickClock;
use farmers_core::math::Fixed;
use farmers_core::policy::{Policy, TickReport};
use tracing::{debug, info};

use crate::metrics::GameMetrics;
use crate::sandbox::Sandbox;
use crate::scenario::{Controller, Scenario, ScenarioError};

/// One team's policy together with the team it plays.
#[derive(Debug)]
struct Seat {
    team: String,
    policy: Policy,
}

/// Runs a scenario headlessly with one policy per policy-controlled team.
#[derive(Debug)]
pub struct HeadlessRunner {
    scenario: Scenario,
    seed: u64,
    sandbox: Sandbox,
    seats: Vec<Seat>,
    metrics: GameMetrics,
}

impl HeadlessRunner {
    /// Set up `scenario` with policies seeded from `seed`.
    pub fn new(scenario: Scenario, seed: u64) -> Result<Self, ScenarioError> {
        scenario.validate()?;
        let mut seats = Vec::new();
        for (index, team) in scenario.teams.iter().enumerate() {
            if team.controller != Controller::Policy {
                continue;
            }
            let config = Scenario::policy_config(team, seed, index);
            seats.push(Seat {
                team: team.name.clone(),
                policy: Policy::new(config)?,
            });
        }

        let sandbox = Sandbox::from_scenario(&scenario);
        let metrics = GameMetrics::new(
            format!("{}_{seed}", scenario.name),
            scenario.name.clone(),
            seed,
        );
        info!(
            scenario = %scenario.name,
            seed,
            policies = seats.len(),
            "Headless runner ready"
        );
        Ok(Self {
            scenario,
            seed,
            sandbox,
            seats,
            metrics,
        })
    }

    /// The scenario being played.
    #[must_use]
    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    /// Seed of this run.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Current world.
    #[must_use]
    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    /// Metrics collected so far.
    #[must_use]
    pub fn metrics(&self) -> &GameMetrics {
        &self.metrics
    }

    /// Run every policy once, apply their orders, then step the world.
    ///
    /// Each policy sees a fresh snapshot that already reflects the orders
    /// of the teams before it.
    pub fn tick(&mut self) -> Vec<(String, TickReport)> {
        let tick = self.sandbox.tick();
        let clock = TickClock::new(Fixed::from_num(tick), Fixed::from_num(1));
        let mut reports = Vec::with_capacity(self.seats.len());

        for seat in &mut self.seats {
            let mut snapshot = self.sandbox.snapshot();
            let report = seat
                .policy
                .run(clock, &mut snapshot, self.sandbox.terrain());
            let applied = self.sandbox.apply(snapshot);
            debug!(
                tick,
                team = %seat.team,
                builds = applied.builds,
                rejected = applied.rejected_builds,
                moves = applied.moves,
                conversions = applied.conversions,
                "Orders applied"
            );
            self.metrics.record_report(tick, &seat.team, &report);
            reports.push((seat.team.clone(), report));
        }

        self.sandbox.step();
        for team in self.sandbox.teams() {
            self.metrics.record_army(team);
        }
        reports
    }

    /// Run `ticks` ticks.
    pub fn run_for(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.tick();
        }
    }

    /// Play the scenario to its tick limit and return the metrics.
    #[must_use]
    pub fn run(mut self) -> GameMetrics {
        let ticks = self.scenario.ticks;
        self.run_for(ticks);
        self.finish()
    }

    /// Close the game at the current tick.
    #[must_use]
    pub fn finish(mut self) -> GameMetrics {
        let hash = self.sandbox.state_hash();
        self.metrics
            .finalize(self.sandbox.tick(), self.sandbox.teams(), hash);
        info!(
            game = %self.metrics.game_id,
            ticks = self.metrics.duration_ticks,
            hash = %format_args!("{hash:016x}"),
            "Game finished"
        );
        self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_teams_get_no_policy() {
        let runner = HeadlessRunner::new(Scenario::duel(), 1).expect("valid scenario");
        assert_eq!(runner.seats.len(), 1);
        assert_eq!(runner.seats[0].team, "Farmers");
    }

    #[test]
    fn test_tick_advances_the_world() {
        let mut runner = HeadlessRunner::new(Scenario::duel(), 1).expect("valid scenario");
        let reports = runner.tick();

        assert_eq!(reports.len(), 1);
        assert_eq!(runner.sandbox().tick(), 1);
    }
}
