//! Production scheduler behavior through the public API.

use farmers_core::prelude::*;
use farmers_test_utils::determinism::strategies::{arb_base, arb_counters};
use farmers_test_utils::fixtures::{snapshot, team, team_of, MockBase, MockWorld, ScriptedHeadings};
use farmers_test_utils::proptest::prelude::*;

fn farmers_policy() -> Policy<ScriptedHeadings> {
    Policy::with_headings(PolicyConfig::default(), ScriptedHeadings::new(&[45, 135, 225]))
        .expect("default config is valid")
}

fn run_once(policy: &mut Policy<ScriptedHeadings>, base: MockBase) -> (TickReport, MockBase) {
    let mut snap: Snapshot<MockWorld> = snapshot(vec![team("Farmers").base(base).build()]);
    let report = policy.run(TickClock::default(), &mut snap, &TerrainGrid::default());
    let base = team_of(&snap, "Farmers").bases[0].clone();
    (report, base)
}

#[test]
fn test_mine_priority_ignores_counters() {
    let mut policy = farmers_policy();
    let (report, base) = run_once(&mut policy, MockBase::new(1).with_crystal(1000).with_mines(1));

    assert_eq!(base.built, vec![BuildOrder::mine()]);
    assert_eq!(report.builds.len(), 1);
    assert_eq!(report.builds[0].heading, None);
}

#[test]
fn test_ships_then_tanks_then_jets() {
    let mut policy = farmers_policy();
    let mut kinds = Vec::new();
    for _ in 0..10 {
        let (_, base) = run_once(&mut policy, MockBase::new(7).with_crystal(1000).with_mines(2));
        kinds.extend(base.built_kinds());
    }

    let mut expected = vec![BuildKind::Ship; 3];
    expected.extend([BuildKind::Tank; 5]);
    expected.extend([BuildKind::Jet; 2]);
    assert_eq!(kinds, expected);

    let counters = policy.counters().get(Uid::new(7)).copied();
    assert_eq!(counters, Some(BaseCounters { ships: 3, tanks: 5 }));
}

#[test]
fn test_ship_cap_moves_on_to_tanks() {
    let mut policy = farmers_policy();
    for _ in 0..3 {
        run_once(&mut policy, MockBase::new(3).with_crystal(1000).with_mines(2));
    }

    // Ships are the cheapest thing on offer, but the cap is reached.
    let (report, base) = run_once(
        &mut policy,
        MockBase::new(3)
            .with_crystal(1000)
            .with_mines(2)
            .with_cost(BuildKind::Ship, 1),
    );
    assert_eq!(base.built_kinds(), vec![BuildKind::Tank]);
    assert!(report.builds[0].heading.is_some());
}

#[test]
fn test_counters_initialized_on_first_sight_even_without_build() {
    let mut policy = farmers_policy();
    run_once(&mut policy, MockBase::new(42).with_crystal(0).with_mines(2));

    assert_eq!(
        policy.counters().get(Uid::new(42)),
        Some(&BaseCounters::default())
    );
}

#[test]
fn test_counters_are_per_base() {
    let mut policy = farmers_policy();
    let mut snap = snapshot(vec![team("Farmers")
        .base(MockBase::new(1).with_crystal(1000).with_mines(2))
        .base(MockBase::new(2).with_crystal(1000).with_mines(2))
        .build()]);
    policy.run(TickClock::default(), &mut snap, &TerrainGrid::default());

    assert_eq!(policy.counters().get(Uid::new(1)).map(|c| c.ships), Some(1));
    assert_eq!(policy.counters().get(Uid::new(2)).map(|c| c.ships), Some(1));
}

#[test]
fn test_cost_is_queried_every_tick() {
    let mut policy = farmers_policy();
    let (first, _) = run_once(
        &mut policy,
        MockBase::new(5)
            .with_crystal(100)
            .with_cost(BuildKind::Mine, 100),
    );
    let (second, _) = run_once(
        &mut policy,
        MockBase::new(5).with_crystal(100).with_cost(BuildKind::Mine, 99),
    );

    assert!(first.builds.is_empty());
    assert_eq!(second.builds.len(), 1);
}

#[test]
fn test_cycle_mode_follows_build_order() {
    let config = PolicyConfig::default().with_scheduling(SchedulingMode::Cycle);
    let mut policy =
        Policy::with_headings(config, ScriptedHeadings::constant(0)).expect("valid config");

    let mut kinds = Vec::new();
    for _ in 0..5 {
        let (_, base) = run_once(&mut policy, MockBase::new(1).with_crystal(1000));
        kinds.extend(base.built_kinds());
    }
    assert_eq!(
        kinds,
        vec![
            BuildKind::Mine,
            BuildKind::Tank,
            BuildKind::Ship,
            BuildKind::Jet,
            BuildKind::Mine,
        ]
    );
}

proptest! {
    #[test]
    fn prop_no_build_when_nothing_affordable(base in arb_base(1), counters in arb_counters()) {
        let cheapest = BuildKind::ALL.into_iter().map(|kind| base.cost(kind)).min().unwrap_or(0);
        let mut base = base.with_crystal(cheapest);
        let mut scheduler = ProductionScheduler::new(&PolicyConfig::default());
        let mut headings = ScriptedHeadings::constant(0);

        // Seed the counters through real builds on a rich twin base.
        let mut twin = MockBase::new(1).with_crystal(i32::MAX).with_mines(2);
        for _ in 0..counters.ships {
            scheduler.schedule_base(&mut twin, &mut headings);
        }

        prop_assert!(scheduler.schedule_base(&mut base, &mut headings).is_none());
        prop_assert!(base.built.is_empty());
    }

    #[test]
    fn prop_at_most_one_build_of_the_desired_tier(base in arb_base(1)) {
        let mut base = base;
        let mut scheduler = ProductionScheduler::new(&PolicyConfig::default());
        let mut headings = ScriptedHeadings::constant(90);
        let desired = scheduler.desired_kind(base.mines(), BaseCounters::default());

        let event = scheduler.schedule_base(&mut base, &mut headings);

        prop_assert!(base.built.len() <= 1);
        match event {
            Some(event) => {
                prop_assert_eq!(event.kind, desired);
                prop_assert!(base.crystal() > base.cost(desired));
                prop_assert_eq!(event.heading.is_some(), desired.is_vehicle());
            }
            None => prop_assert!(base.crystal() <= base.cost(desired)),
        }
    }

    #[test]
    fn prop_mine_first_while_below_target(base in arb_base(1)) {
        prop_assume!(base.mines() < 2);
        let mine_cost = base.cost(BuildKind::Mine);
        let mut base = base.with_crystal(mine_cost.saturating_add(1));
        let mut scheduler = ProductionScheduler::new(&PolicyConfig::default());

        scheduler.schedule_base(&mut base, &mut ScriptedHeadings::constant(0));
        prop_assert_eq!(base.built_kinds(), vec![BuildKind::Mine]);
    }

    #[test]
    fn prop_ship_counter_counts_ship_builds(n in 0u32..=3) {
        let mut scheduler = ProductionScheduler::new(&PolicyConfig::default());
        let mut headings = ScriptedHeadings::constant(0);
        let mut previous = 0;
        for _ in 0..n {
            let mut base = MockBase::new(8).with_crystal(1000).with_mines(2);
            scheduler.schedule_base(&mut base, &mut headings);
            let ships = scheduler.counters().get(Uid::new(8)).map_or(0, |c| c.ships);
            prop_assert!(ships >= previous);
            previous = ships;
        }
        prop_assert_eq!(previous, n);
    }
}
