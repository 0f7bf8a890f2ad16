//! The per-tick policy.
//!
//! [`Policy::run`] is the single entry point the engine calls each tick:
//!
//! 1. production: every own base gets at most one build decision
//! 2. target acquisition: one enemy base position for the whole team
//! 3. dispatch: every own unit runs its type's rule against that target
//!
//! The only state kept between ticks is the scheduler's per-base counters
//! (and the build ring in cycle mode).

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::PolicyConfig;
use crate::dispatch::{DispatchEvent, UnitDispatcher};
use crate::engine::{Snapshot, TerrainGrid, TickClock, World};
use crate::error::Result;
use crate::headings::{HeadingSource, SeededHeadings};
use crate::math::Vec2Fixed;
use crate::production::{CounterBook, ProductionEvent, ProductionScheduler};
use crate::targeting::acquire_target;

/// Everything the policy did during one tick.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TickReport {
    /// Clock reading of the tick.
    pub clock: TickClock,
    /// Build orders issued.
    pub builds: Vec<ProductionEvent>,
    /// Shared target chosen for the tick.
    pub target: Option<Vec2Fixed>,
    /// Unit orders issued.
    pub commands: Vec<DispatchEvent>,
}

impl TickReport {
    fn empty(clock: TickClock) -> Self {
        Self {
            clock,
            ..Self::default()
        }
    }

    /// True when no command of any kind was issued.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.builds.is_empty() && self.commands.is_empty()
    }

    /// Number of ship conversions ordered.
    #[must_use]
    pub fn conversions(&self) -> usize {
        self.commands
            .iter()
            .filter(|event| matches!(event, DispatchEvent::Converted { .. }))
            .count()
    }
}

/// Decision policy for one team.
#[derive(Debug, Clone)]
pub struct Policy<H: HeadingSource = SeededHeadings> {
    config: PolicyConfig,
    scheduler: ProductionScheduler,
    dispatcher: UnitDispatcher,
    headings: H,
    last_target: Option<Vec2Fixed>,
}

impl Policy<SeededHeadings> {
    /// Create a policy with headings seeded from the config.
    pub fn new(config: PolicyConfig) -> Result<Self> {
        let headings = SeededHeadings::new(config.heading_seed);
        Self::with_headings(config, headings)
    }
}

impl<H: HeadingSource> Policy<H> {
    /// Create a policy drawing headings from `headings`.
    pub fn with_headings(config: PolicyConfig, headings: H) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            scheduler: ProductionScheduler::new(&config),
            dispatcher: UnitDispatcher::new(config.conversion_range()),
            config,
            headings,
            last_target: None,
        })
    }

    /// Team this policy plays.
    #[must_use]
    pub fn team(&self) -> &str {
        &self.config.team
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Per-base counters gathered so far.
    #[must_use]
    pub fn counters(&self) -> &CounterBook {
        self.scheduler.counters()
    }

    /// Run one tick against `snapshot`.
    ///
    /// A snapshot without this policy's team produces an empty report.
    pub fn run<W: World>(
        &mut self,
        clock: TickClock,
        snapshot: &mut Snapshot<W>,
        terrain: &TerrainGrid,
    ) -> TickReport {
        let mut report = TickReport::empty(clock);

        let Some(team) = snapshot.team_mut(&self.config.team) else {
            warn!(team = %self.config.team, "Own team missing from snapshot");
            return report;
        };
        report.builds = self
            .scheduler
            .schedule_all(&mut team.bases, &mut self.headings);

        report.target = acquire_target(snapshot, &self.config.team);
        if report.target != self.last_target {
            info!(team = %self.config.team, target = ?report.target, "Target changed");
            self.last_target = report.target;
        }

        if let Some(team) = snapshot.team_mut(&self.config.team) {
            report.commands =
                self.dispatcher
                    .dispatch(team, report.target, terrain, &mut self.headings);
        }
        report
    }
}
