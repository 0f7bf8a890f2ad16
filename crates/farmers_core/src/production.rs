//! Production scheduling for bases.
//!
//! Each tick every base gets at most one build decision. In the default
//! [`SchedulingMode::Priority`] mode the tiers are, first match wins:
//!
//! 1. fewer than `mine_target` mines: a mine
//! 2. fewer than `ship_quota` ships from this base: a ship
//! 3. fewer than `tank_quota` tanks from this base: a tank
//! 4. otherwise: a jet
//!
//! A tier that cannot be paid for ends the decision for that base; the
//! scheduler never falls through to a cheaper tier. The engine owns the
//! crystal balance, so the scheduler never debits its own view of it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::build::{can_afford, BuildKind, BuildOrder, BuildQueue};
use crate::config::{PolicyConfig, SchedulingMode};
use crate::engine::{BaseHandle, Uid};
use crate::headings::HeadingSource;
use crate::math::Heading;

/// Units a single base has produced, as counted by the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BaseCounters {
    /// Ships ordered from this base.
    pub ships: u32,
    /// Tanks ordered from this base.
    pub tanks: u32,
}

impl BaseCounters {
    fn record(&mut self, kind: BuildKind) {
        match kind {
            BuildKind::Ship => self.ships += 1,
            BuildKind::Tank => self.tanks += 1,
            BuildKind::Mine | BuildKind::Jet => {}
        }
    }
}

/// Per-base counters keyed by base uid.
///
/// Entries are created on first sight and never removed or reset, so counts
/// only ever grow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CounterBook {
    by_base: HashMap<Uid, BaseCounters>,
}

impl CounterBook {
    /// Create an empty book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters for `base`, creating zeroed counters on first sight.
    pub fn entry(&mut self, base: Uid) -> &mut BaseCounters {
        self.by_base.entry(base).or_default()
    }

    /// Counters for `base` if it has been seen.
    #[must_use]
    pub fn get(&self, base: Uid) -> Option<&BaseCounters> {
        self.by_base.get(&base)
    }

    /// Number of bases ever seen.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_base.len()
    }

    /// True when no base has been seen yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_base.is_empty()
    }
}

/// A build the scheduler issued this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionEvent {
    /// Base the order was issued against.
    pub base: Uid,
    /// What was ordered.
    pub kind: BuildKind,
    /// Initial heading for vehicles.
    pub heading: Option<Heading>,
}

impl ProductionEvent {
    fn new(base: Uid, order: BuildOrder) -> Self {
        Self {
            base,
            kind: order.kind,
            heading: order.heading,
        }
    }
}

/// Decides what each base builds.
#[derive(Debug, Clone)]
pub struct ProductionScheduler {
    mine_target: u32,
    ship_quota: u32,
    tank_quota: u32,
    queue: Option<BuildQueue>,
    counters: CounterBook,
}

impl ProductionScheduler {
    /// Create a scheduler from the policy config.
    #[must_use]
    pub fn new(config: &PolicyConfig) -> Self {
        let queue = match config.scheduling {
            SchedulingMode::Priority => None,
            SchedulingMode::Cycle => Some(BuildQueue::new(config.build_order.clone(), true)),
        };
        Self {
            mine_target: config.mine_target,
            ship_quota: config.ship_quota,
            tank_quota: config.tank_quota,
            queue,
            counters: CounterBook::new(),
        }
    }

    /// Per-base counters gathered so far.
    #[must_use]
    pub fn counters(&self) -> &CounterBook {
        &self.counters
    }

    /// Kind the priority tiers ask `base` to build next.
    #[must_use]
    pub fn desired_kind(&self, mines: u32, counters: BaseCounters) -> BuildKind {
        if mines < self.mine_target {
            BuildKind::Mine
        } else if counters.ships < self.ship_quota {
            BuildKind::Ship
        } else if counters.tanks < self.tank_quota {
            BuildKind::Tank
        } else {
            BuildKind::Jet
        }
    }

    /// Make at most one build decision for `base`.
    pub fn schedule_base<B: BaseHandle>(
        &mut self,
        base: &mut B,
        headings: &mut impl HeadingSource,
    ) -> Option<ProductionEvent> {
        let uid = base.uid();
        // Counters must exist before anything is decided for this base.
        let counters = *self.counters.entry(uid);

        let order = match self.queue.as_mut() {
            Some(queue) => queue.try_build(base, headings)?,
            None => {
                let kind = self.desired_kind(base.mines(), counters);
                if !can_afford(base, kind) {
                    trace!(base = %uid, %kind, crystal = base.crystal(), "Cannot afford build");
                    return None;
                }
                let order = BuildOrder::draw(kind, headings);
                base.build(order);
                order
            }
        };

        self.counters.entry(uid).record(order.kind);
        debug!(base = %uid, kind = %order.kind, "Issued build order");
        Some(ProductionEvent::new(uid, order))
    }

    /// Run [`Self::schedule_base`] over every base, in listed order.
    pub fn schedule_all<B: BaseHandle>(
        &mut self,
        bases: &mut [B],
        headings: &mut impl HeadingSource,
    ) -> Vec<ProductionEvent> {
        bases
            .iter_mut()
            .filter_map(|base| self.schedule_base(base, headings))
            .collect()
    }
}
