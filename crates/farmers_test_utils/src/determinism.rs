//! Determinism testing utilities.
//!
//! The policy's only source of randomness is its heading source. With the
//! same seed and the same snapshots it must issue exactly the same commands.
//! This module replays scripted snapshot sequences through a policy and
//! compares report hashes across runs.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use farmers_core::config::PolicyConfig;
use farmers_core::engine::{Snapshot, TerrainGrid, TickClock};
use farmers_core::math::Fixed;
use farmers_core::policy::{Policy, TickReport};

use crate::fixtures::MockWorld;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks replayed per run.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic policy).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that every run matched, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Policy is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a setup/step/hash cycle several times and compare final hashes.
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S, u64),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for tick in 0..ticks {
            step(&mut state, tick);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Hash any hashable value with the std hasher.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Hash a sequence of tick reports through their JSON form.
#[must_use]
pub fn hash_reports(reports: &[TickReport]) -> u64 {
    let json = serde_json::to_string(reports).unwrap_or_default();
    compute_hash(&json)
}

/// Drive a fresh policy through `ticks` snapshots produced by `make_snapshot`.
///
/// # Panics
///
/// Panics if `config` is invalid.
pub fn replay_policy<F>(config: &PolicyConfig, ticks: u64, make_snapshot: F) -> Vec<TickReport>
where
    F: Fn(u64) -> Snapshot<MockWorld>,
{
    let mut policy = Policy::new(config.clone()).expect("test config must be valid");
    let terrain = TerrainGrid::default();
    let dt = Fixed::from_num(1) / Fixed::from_num(60);

    (0..ticks)
        .map(|tick| {
            let clock = TickClock::new(dt * Fixed::from_num(tick), dt);
            let mut snapshot = make_snapshot(tick);
            policy.run(clock, &mut snapshot, &terrain)
        })
        .collect()
}

/// Replay a policy `runs` times and check the reports never differ.
pub fn verify_policy_determinism<F>(
    config: &PolicyConfig,
    runs: usize,
    ticks: u64,
    make_snapshot: F,
) -> DeterminismResult
where
    F: Fn(u64) -> Snapshot<MockWorld>,
{
    let hashes: Vec<u64> = (0..runs)
        .map(|_| hash_reports(&replay_policy(config, ticks, &make_snapshot)))
        .collect();
    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Proptest strategies for policy inputs.
pub mod strategies {
    use proptest::prelude::*;

    use farmers_core::build::BuildKind;
    use farmers_core::math::{Fixed, Vec2Fixed};
    use farmers_core::production::BaseCounters;

    use crate::fixtures::{MockBase, MockVehicle};

    /// Generate a fixed-point coordinate in a typical map range.
    pub fn arb_coordinate() -> impl Strategy<Value = Fixed> {
        (-2000i32..2000i32).prop_map(Fixed::from_num)
    }

    /// Generate a position.
    pub fn arb_position() -> impl Strategy<Value = Vec2Fixed> {
        (arb_coordinate(), arb_coordinate()).prop_map(|(x, y)| Vec2Fixed::new(x, y))
    }

    /// Generate a build cost.
    pub fn arb_cost() -> impl Strategy<Value = i32> {
        1i32..500i32
    }

    /// Generate a base with random balance, mines and cost table.
    pub fn arb_base(uid: u64) -> impl Strategy<Value = MockBase> {
        (
            arb_position(),
            0i32..1000i32,
            0u32..5u32,
            (arb_cost(), arb_cost(), arb_cost(), arb_cost()),
        )
            .prop_map(move |(position, crystal, mines, (mine, ship, tank, jet))| {
                let mut base = MockBase::new(uid).with_crystal(crystal).with_mines(mines);
                base.position = position;
                for (kind, cost) in BuildKind::ALL.into_iter().zip([mine, ship, tank, jet]) {
                    base = base.with_cost(kind, cost);
                }
                base
            })
    }

    /// Generate counters within or just past the default quotas.
    pub fn arb_counters() -> impl Strategy<Value = BaseCounters> {
        (0u32..5u32, 0u32..7u32).prop_map(|(ships, tanks)| BaseCounters { ships, tanks })
    }

    /// Generate a vehicle with random flags.
    pub fn arb_vehicle(uid: u64) -> impl Strategy<Value = MockVehicle> {
        (arb_position(), any::<bool>(), any::<bool>()).prop_map(
            move |(position, stopped, stuck)| {
                let mut vehicle = MockVehicle::moving(uid);
                vehicle.position = position;
                vehicle.stopped = stopped;
                vehicle.stuck = stuck;
                vehicle
            },
        )
    }

    /// Generate up to `max` vehicles with distinct uids starting at `first_uid`.
    pub fn arb_vehicles(first_uid: u64, max: usize) -> impl Strategy<Value = Vec<MockVehicle>> {
        proptest::collection::vec(arb_vehicle(0), 0..max).prop_map(move |mut vehicles| {
            for (offset, vehicle) in (0u64..).zip(vehicles.iter_mut()) {
                vehicle.uid = farmers_core::engine::Uid::new(first_uid + offset);
            }
            vehicles
        })
    }
}
