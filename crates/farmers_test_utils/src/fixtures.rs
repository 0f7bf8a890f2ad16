//! Test fixtures and helpers.
//!
//! Recording implementations of the engine handle traits. Every command the
//! policy issues is appended to the handle so tests can assert on it after
//! the tick.

use std::collections::HashMap;

use farmers_core::build::{BuildKind, BuildOrder};
use farmers_core::engine::{
    BaseHandle, ShipHandle, Snapshot, TeamContext, Uid, UnitOrder, VehicleHandle, World,
};
use farmers_core::headings::HeadingSource;
use farmers_core::math::{Fixed, Heading, Vec2Fixed};
use fixed::types::I32F32;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Build costs used by mock bases unless overridden.
pub const DEFAULT_COSTS: [(BuildKind, i32); 4] = [
    (BuildKind::Mine, 50),
    (BuildKind::Ship, 60),
    (BuildKind::Tank, 40),
    (BuildKind::Jet, 80),
];

/// Mock base that records build orders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockBase {
    /// Identity.
    pub uid: Uid,
    /// Position.
    pub position: Vec2Fixed,
    /// Crystal balance reported to the policy.
    pub crystal: i32,
    /// Mines reported to the policy.
    pub mines: u32,
    /// Cost table.
    pub costs: HashMap<BuildKind, i32>,
    /// Orders received, in issue order.
    pub built: Vec<BuildOrder>,
}

impl MockBase {
    /// A base at the origin with no crystal and no mines.
    #[must_use]
    pub fn new(uid: u64) -> Self {
        Self {
            uid: Uid::new(uid),
            position: Vec2Fixed::ZERO,
            crystal: 0,
            mines: 0,
            costs: DEFAULT_COSTS.into_iter().collect(),
            built: Vec::new(),
        }
    }

    /// Place the base.
    #[must_use]
    pub fn at(mut self, x: i32, y: i32) -> Self {
        self.position = Vec2Fixed::from_num(x, y);
        self
    }

    /// Set the crystal balance.
    #[must_use]
    pub fn with_crystal(mut self, crystal: i32) -> Self {
        self.crystal = crystal;
        self
    }

    /// Set the mine count.
    #[must_use]
    pub fn with_mines(mut self, mines: u32) -> Self {
        self.mines = mines;
        self
    }

    /// Override the cost of one kind.
    #[must_use]
    pub fn with_cost(mut self, kind: BuildKind, cost: i32) -> Self {
        self.costs.insert(kind, cost);
        self
    }

    /// Kinds received, in issue order.
    #[must_use]
    pub fn built_kinds(&self) -> Vec<BuildKind> {
        self.built.iter().map(|order| order.kind).collect()
    }
}

impl BaseHandle for MockBase {
    fn uid(&self) -> Uid {
        self.uid
    }

    fn position(&self) -> Vec2Fixed {
        self.position
    }

    fn crystal(&self) -> i32 {
        self.crystal
    }

    fn mines(&self) -> u32 {
        self.mines
    }

    fn cost(&self, kind: BuildKind) -> i32 {
        self.costs.get(&kind).copied().unwrap_or(i32::MAX)
    }

    fn build(&mut self, order: BuildOrder) {
        self.built.push(order);
    }
}

/// Mock tank or jet that records unit orders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockVehicle {
    /// Identity.
    pub uid: Uid,
    /// Position.
    pub position: Vec2Fixed,
    /// Reported stopped flag.
    pub stopped: bool,
    /// Reported stuck flag.
    pub stuck: bool,
    /// Orders received, in issue order.
    pub orders: Vec<UnitOrder>,
}

impl MockVehicle {
    /// A moving, unstuck vehicle at the origin.
    #[must_use]
    pub fn moving(uid: u64) -> Self {
        Self {
            uid: Uid::new(uid),
            position: Vec2Fixed::ZERO,
            stopped: false,
            stuck: false,
            orders: Vec::new(),
        }
    }

    /// Place the vehicle.
    #[must_use]
    pub fn at(mut self, x: i32, y: i32) -> Self {
        self.position = Vec2Fixed::from_num(x, y);
        self
    }

    /// Place the vehicle at a fractional position.
    #[must_use]
    pub fn at_f(mut self, x: f64, y: f64) -> Self {
        self.position = Vec2Fixed::from_num(x, y);
        self
    }

    /// Mark as stopped.
    #[must_use]
    pub fn stopped(mut self) -> Self {
        self.stopped = true;
        self
    }

    /// Mark as stuck.
    #[must_use]
    pub fn stuck(mut self) -> Self {
        self.stuck = true;
        self
    }
}

impl VehicleHandle for MockVehicle {
    fn uid(&self) -> Uid {
        self.uid
    }

    fn position(&self) -> Vec2Fixed {
        self.position
    }

    fn is_stopped(&self) -> bool {
        self.stopped
    }

    fn is_stuck(&self) -> bool {
        self.stuck
    }

    fn set_heading(&mut self, heading: Heading) {
        self.orders.push(UnitOrder::Heading(heading));
    }

    fn goto(&mut self, destination: Vec2Fixed) {
        self.orders.push(UnitOrder::Goto(destination));
    }
}

/// Mock ship: a [`MockVehicle`] with an owner that can convert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockShip {
    /// Movement state and recorded orders.
    pub vehicle: MockVehicle,
    /// Base that built the ship.
    pub owner: Uid,
}

impl MockShip {
    /// Wrap a vehicle as a ship owned by `owner`.
    #[must_use]
    pub fn new(vehicle: MockVehicle, owner: u64) -> Self {
        Self {
            vehicle,
            owner: Uid::new(owner),
        }
    }

    /// Orders received, in issue order.
    #[must_use]
    pub fn orders(&self) -> &[UnitOrder] {
        &self.vehicle.orders
    }

    /// True when the ship was told to become a base.
    #[must_use]
    pub fn converted(&self) -> bool {
        self.vehicle.orders.contains(&UnitOrder::ConvertToBase)
    }
}

impl VehicleHandle for MockShip {
    fn uid(&self) -> Uid {
        self.vehicle.uid()
    }

    fn position(&self) -> Vec2Fixed {
        self.vehicle.position()
    }

    fn is_stopped(&self) -> bool {
        self.vehicle.is_stopped()
    }

    fn is_stuck(&self) -> bool {
        self.vehicle.is_stuck()
    }

    fn set_heading(&mut self, heading: Heading) {
        self.vehicle.set_heading(heading);
    }

    fn goto(&mut self, destination: Vec2Fixed) {
        self.vehicle.goto(destination);
    }
}

impl ShipHandle for MockShip {
    fn owner(&self) -> Uid {
        self.owner
    }

    fn convert_to_base(&mut self) {
        self.vehicle.orders.push(UnitOrder::ConvertToBase);
    }
}

/// World made of the mock handles.
#[derive(Debug, Clone, Copy)]
pub struct MockWorld;

impl World for MockWorld {
    type Base = MockBase;
    type Vehicle = MockVehicle;
    type Ship = MockShip;
}

/// Start building a mock team.
#[must_use]
pub fn team(name: &str) -> TeamBuilder {
    TeamBuilder {
        team: TeamContext::new(name),
    }
}

/// Builder for a [`TeamContext`] over [`MockWorld`].
pub struct TeamBuilder {
    team: TeamContext<MockWorld>,
}

impl TeamBuilder {
    /// Add a base.
    #[must_use]
    pub fn base(mut self, base: MockBase) -> Self {
        self.team.bases.push(base);
        self
    }

    /// Add a tank.
    #[must_use]
    pub fn tank(mut self, tank: MockVehicle) -> Self {
        self.team.tanks.push(tank);
        self
    }

    /// Add a ship.
    #[must_use]
    pub fn ship(mut self, ship: MockShip) -> Self {
        self.team.ships.push(ship);
        self
    }

    /// Add a jet.
    #[must_use]
    pub fn jet(mut self, jet: MockVehicle) -> Self {
        self.team.jets.push(jet);
        self
    }

    /// Finish the team.
    #[must_use]
    pub fn build(self) -> TeamContext<MockWorld> {
        self.team
    }
}

/// Snapshot holding `teams` in the given order.
#[must_use]
pub fn snapshot(teams: Vec<TeamContext<MockWorld>>) -> Snapshot<MockWorld> {
    teams
        .into_iter()
        .fold(Snapshot::new(), |snapshot, team| snapshot.with_team(team))
}

/// Look up a team that a test put into the snapshot.
///
/// # Panics
///
/// Panics if the team is missing.
#[must_use]
pub fn team_of<'a>(snapshot: &'a Snapshot<MockWorld>, name: &str) -> &'a TeamContext<MockWorld> {
    snapshot
        .team(name)
        .unwrap_or_else(|| panic!("team {name} missing from snapshot"))
}

/// Heading source that replays a fixed list of headings in a loop.
#[derive(Debug, Clone)]
pub struct ScriptedHeadings {
    script: Vec<Heading>,
    next: usize,
    /// Number of headings handed out so far.
    pub drawn: usize,
}

impl ScriptedHeadings {
    /// Replay `degrees` in order, wrapping at the end.
    ///
    /// # Panics
    ///
    /// Panics if `degrees` is empty.
    #[must_use]
    pub fn new(degrees: &[i32]) -> Self {
        assert!(!degrees.is_empty(), "scripted headings need at least one value");
        Self {
            script: degrees
                .iter()
                .map(|&d| Heading::from_degrees(Fixed::from_num(d)))
                .collect(),
            next: 0,
            drawn: 0,
        }
    }

    /// Always hand out the same heading.
    #[must_use]
    pub fn constant(degrees: i32) -> Self {
        Self::new(&[degrees])
    }
}

impl HeadingSource for ScriptedHeadings {
    fn next_heading(&mut self) -> Heading {
        let heading = self.script[self.next];
        self.next = (self.next + 1) % self.script.len();
        self.drawn += 1;
        heading
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_headings_wrap() {
        let mut headings = ScriptedHeadings::new(&[10, 20]);
        let drawn: Vec<_> = (0..3).map(|_| headings.next_heading()).collect();
        assert_eq!(drawn[0], drawn[2]);
        assert_eq!(drawn[1].degrees(), fixed(20));
        assert_eq!(headings.drawn, 3);
    }

    #[test]
    fn test_snapshot_keeps_team_order() {
        let snap = snapshot(vec![team("B").build(), team("A").build()]);
        let names: Vec<_> = snap.teams().map(|t| t.name.clone()).collect();
        assert_eq!(names, vec!["B", "A"]);
    }

    #[test]
    fn test_unknown_cost_is_unaffordable() {
        let mut base = MockBase::new(1).with_crystal(i32::MAX);
        base.costs.clear();
        assert_eq!(base.cost(BuildKind::Mine), i32::MAX);
    }
}
