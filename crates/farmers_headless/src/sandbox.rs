//! Minimal engine used for headless runs.
//!
//! The sandbox keeps just enough world state to exercise the policy: crystal
//! per base, mines, and vehicles that travel by heading or toward a goto
//! destination. A vehicle whose next step would leave the map or enter
//! terrain it cannot cross (water for tanks, land for ships once afloat)
//! stays put and reports itself stuck. Jets only stop at the map edge.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use farmers_core::build::{BuildKind, BuildOrder};
use farmers_core::dispatch::UnitKind;
use farmers_core::engine::{
    BaseHandle, ShipHandle, Snapshot, TeamContext, TerrainGrid, Uid, UnitOrder, VehicleHandle,
    World,
};
use farmers_core::math::{Fixed, Heading, Vec2Fixed};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::scenario::{CostTable, EconomySetup, Scenario, SpeedTable};

/// Authoritative state of one base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BaseState {
    /// Identity.
    pub uid: Uid,
    /// Position.
    pub position: Vec2Fixed,
    /// Crystal balance.
    pub crystal: i32,
    /// Mines built.
    pub mines: u32,
}

/// Authoritative state of one vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VehicleState {
    /// Identity.
    pub uid: Uid,
    /// Type.
    pub kind: UnitKind,
    /// Base that built it.
    pub owner: Uid,
    /// Position.
    pub position: Vec2Fixed,
    /// Heading being followed, if any.
    pub heading: Option<Heading>,
    /// Destination being approached, if any.
    pub destination: Option<Vec2Fixed>,
    /// Whether the last step was blocked.
    pub stuck: bool,
}

impl VehicleState {
    /// No pending movement order.
    #[must_use]
    pub const fn is_stopped(&self) -> bool {
        self.heading.is_none() && self.destination.is_none()
    }
}

/// Everything one team owns in the sandbox.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TeamState {
    /// Team name.
    pub name: String,
    /// Bases by uid.
    pub bases: BTreeMap<Uid, BaseState>,
    /// Vehicles by uid.
    pub vehicles: BTreeMap<Uid, VehicleState>,
}

impl TeamState {
    /// Vehicles of one type.
    pub fn vehicles_of(&self, kind: UnitKind) -> impl Iterator<Item = &VehicleState> {
        self.vehicles.values().filter(move |v| v.kind == kind)
    }

    /// Summed crystal of all bases.
    #[must_use]
    pub fn total_crystal(&self) -> i64 {
        self.bases.values().map(|b| i64::from(b.crystal)).sum()
    }
}

/// Base handle handed to policies.
#[derive(Debug, Clone)]
pub struct SandboxBase {
    state: BaseState,
    costs: CostTable,
    orders: Vec<BuildOrder>,
}

impl BaseHandle for SandboxBase {
    fn uid(&self) -> Uid {
        self.state.uid
    }

    fn position(&self) -> Vec2Fixed {
        self.state.position
    }

    fn crystal(&self) -> i32 {
        self.state.crystal
    }

    fn mines(&self) -> u32 {
        self.state.mines
    }

    fn cost(&self, kind: BuildKind) -> i32 {
        self.costs.cost(kind)
    }

    fn build(&mut self, order: BuildOrder) {
        self.orders.push(order);
    }
}

/// Tank or jet handle handed to policies.
#[derive(Debug, Clone)]
pub struct SandboxVehicle {
    uid: Uid,
    position: Vec2Fixed,
    stopped: bool,
    stuck: bool,
    orders: Vec<UnitOrder>,
}

impl SandboxVehicle {
    fn from_state(state: &VehicleState) -> Self {
        Self {
            uid: state.uid,
            position: state.position,
            stopped: state.is_stopped(),
            stuck: state.stuck,
            orders: Vec::new(),
        }
    }
}

impl VehicleHandle for SandboxVehicle {
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

/// Ship handle handed to policies.
#[derive(Debug, Clone)]
pub struct SandboxShip {
    vehicle: SandboxVehicle,
    owner: Uid,
}

impl VehicleHandle for SandboxShip {
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

impl ShipHandle for SandboxShip {
    fn owner(&self) -> Uid {
        self.owner
    }

    fn convert_to_base(&mut self) {
        self.vehicle.orders.push(UnitOrder::ConvertToBase);
    }
}

/// Handle types of the sandbox.
#[derive(Debug, Clone, Copy)]
pub struct SandboxWorld;

impl World for SandboxWorld {
    type Base = SandboxBase;
    type Vehicle = SandboxVehicle;
    type Ship = SandboxShip;
}

/// Counts of orders the sandbox carried out during one apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AppliedOrders {
    /// Builds paid for and completed.
    pub builds: u32,
    /// Builds dropped for lack of crystal.
    pub rejected_builds: u32,
    /// Movement orders accepted.
    pub moves: u32,
    /// Ships turned into bases.
    pub conversions: u32,
}

/// The sandbox world.
#[derive(Debug, Clone)]
pub struct Sandbox {
    terrain: TerrainGrid,
    costs: CostTable,
    economy: EconomySetup,
    speeds: SpeedTable,
    teams: Vec<TeamState>,
    next_uid: u64,
    tick: u64,
}

impl Sandbox {
    /// Build the starting world of `scenario`.
    #[must_use]
    pub fn from_scenario(scenario: &Scenario) -> Self {
        let mut sandbox = Self {
            terrain: scenario.terrain(),
            costs: scenario.costs,
            economy: scenario.economy,
            speeds: scenario.speeds,
            teams: Vec::with_capacity(scenario.teams.len()),
            next_uid: 1,
            tick: 0,
        };
        for setup in &scenario.teams {
            let mut team = TeamState {
                name: setup.name.clone(),
                ..TeamState::default()
            };
            for &(x, y) in &setup.bases {
                let uid = sandbox.allocate_uid();
                team.bases.insert(
                    uid,
                    BaseState {
                        uid,
                        position: Vec2Fixed::from_num(x, y),
                        crystal: setup.starting_crystal,
                        mines: 0,
                    },
                );
            }
            sandbox.teams.push(team);
        }
        sandbox
    }

    fn allocate_uid(&mut self) -> Uid {
        let uid = Uid::new(self.next_uid);
        self.next_uid += 1;
        uid
    }

    /// Terrain grid.
    #[must_use]
    pub fn terrain(&self) -> &TerrainGrid {
        &self.terrain
    }

    /// Teams in scenario order.
    #[must_use]
    pub fn teams(&self) -> &[TeamState] {
        &self.teams
    }

    /// Look up a team by name.
    #[must_use]
    pub fn team(&self, name: &str) -> Option<&TeamState> {
        self.teams.iter().find(|team| team.name == name)
    }

    /// Ticks stepped so far.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Hand out fresh handles for every entity, in scenario team order.
    ///
    /// Teams without bases or units are still listed.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot<SandboxWorld> {
        let mut snapshot = Snapshot::new();
        for team in &self.teams {
            let mut context = TeamContext::new(team.name.clone());
            context.bases = team
                .bases
                .values()
                .map(|&state| SandboxBase {
                    state,
                    costs: self.costs,
                    orders: Vec::new(),
                })
                .collect();
            for state in team.vehicles.values() {
                let vehicle = SandboxVehicle::from_state(state);
                match state.kind {
                    UnitKind::Tank => context.tanks.push(vehicle),
                    UnitKind::Jet => context.jets.push(vehicle),
                    UnitKind::Ship => context.ships.push(SandboxShip {
                        vehicle,
                        owner: state.owner,
                    }),
                }
            }
            snapshot.push_team(context);
        }
        snapshot
    }

    /// Carry out every order recorded on the snapshot's handles.
    pub fn apply(&mut self, snapshot: Snapshot<SandboxWorld>) -> AppliedOrders {
        let mut applied = AppliedOrders::default();
        for context in snapshot.into_teams() {
            let Some(index) = self.teams.iter().position(|t| t.name == context.name) else {
                warn!(team = %context.name, "Orders for unknown team dropped");
                continue;
            };

            for base in context.bases {
                for order in base.orders {
                    self.apply_build(index, base.state.uid, order, &mut applied);
                }
            }

            let vehicles = context
                .tanks
                .into_iter()
                .chain(context.jets)
                .chain(context.ships.into_iter().map(|ship| ship.vehicle));
            for vehicle in vehicles {
                for order in vehicle.orders {
                    self.apply_unit_order(index, vehicle.uid, order, &mut applied);
                }
            }
        }
        applied
    }

    fn apply_build(&mut self, team: usize, base: Uid, order: BuildOrder, applied: &mut AppliedOrders) {
        let cost = self.costs.cost(order.kind);
        let Some(state) = self.teams[team].bases.get_mut(&base) else {
            return;
        };
        if state.crystal < cost {
            applied.rejected_builds += 1;
            debug!(base = %base, kind = %order.kind, "Build rejected, not enough crystal");
            return;
        }
        state.crystal -= cost;
        applied.builds += 1;

        let kind = match order.kind {
            BuildKind::Mine => {
                state.mines += 1;
                return;
            }
            BuildKind::Ship => UnitKind::Ship,
            BuildKind::Tank => UnitKind::Tank,
            BuildKind::Jet => UnitKind::Jet,
        };
        let position = state.position;
        let uid = self.allocate_uid();
        self.teams[team].vehicles.insert(
            uid,
            VehicleState {
                uid,
                kind,
                owner: base,
                position,
                heading: Some(order.heading.unwrap_or(Heading::ZERO)),
                destination: None,
                stuck: false,
            },
        );
    }

    fn apply_unit_order(&mut self, team: usize, unit: Uid, order: UnitOrder, applied: &mut AppliedOrders) {
        let team_state = &mut self.teams[team];
        let Some(vehicle) = team_state.vehicles.get_mut(&unit) else {
            return;
        };
        match order {
            UnitOrder::Heading(heading) => {
                vehicle.heading = Some(heading);
                vehicle.destination = None;
                applied.moves += 1;
            }
            UnitOrder::Goto(destination) => {
                vehicle.destination = Some(destination);
                vehicle.heading = None;
                applied.moves += 1;
            }
            UnitOrder::ConvertToBase => {
                if vehicle.kind != UnitKind::Ship {
                    warn!(unit = %unit, "Only ships can become bases");
                    return;
                }
                let position = vehicle.position;
                team_state.vehicles.remove(&unit);
                let uid = self.allocate_uid();
                self.teams[team].bases.insert(
                    uid,
                    BaseState {
                        uid,
                        position,
                        crystal: 0,
                        mines: 0,
                    },
                );
                applied.conversions += 1;
            }
        }
    }

    /// Advance the world one tick: income, then movement.
    pub fn step(&mut self) {
        let base_income = self.economy.base_income;
        let per_mine = self.economy.income_per_mine;
        for team in &mut self.teams {
            for base in team.bases.values_mut() {
                let mines = i32::try_from(base.mines).unwrap_or(i32::MAX);
                let income = base_income.saturating_add(per_mine.saturating_mul(mines));
                base.crystal = base.crystal.saturating_add(income);
            }
        }

        for team_index in 0..self.teams.len() {
            let uids: Vec<Uid> = self.teams[team_index].vehicles.keys().copied().collect();
            for uid in uids {
                if let Some(mut vehicle) = self.teams[team_index].vehicles.get(&uid).copied() {
                    self.move_vehicle(&mut vehicle);
                    self.teams[team_index].vehicles.insert(uid, vehicle);
                }
            }
        }
        self.tick += 1;
    }

    fn move_vehicle(&self, vehicle: &mut VehicleState) {
        let speed = Fixed::from_num(self.speeds.speed(vehicle.kind));
        let (next, arrived) = if let Some(destination) = vehicle.destination {
            let delta = destination - vehicle.position;
            if delta.distance_squared(Vec2Fixed::ZERO) <= speed.saturating_mul(speed) {
                (destination, true)
            } else {
                (vehicle.position + delta.normalize().scale(speed), false)
            }
        } else if let Some(heading) = vehicle.heading {
            (vehicle.position + heading_step(heading, speed), false)
        } else {
            vehicle.stuck = false;
            return;
        };

        if self.passable(vehicle.kind, vehicle.position, next) {
            vehicle.position = next;
            vehicle.stuck = false;
            if arrived {
                vehicle.destination = None;
            }
        } else {
            vehicle.stuck = true;
        }
    }

    fn passable(&self, kind: UnitKind, from: Vec2Fixed, to: Vec2Fixed) -> bool {
        match (kind, self.terrain.at(to)) {
            (_, None) => false,
            (UnitKind::Jet, Some(_)) => true,
            (UnitKind::Tank, Some(cell)) => cell == TerrainGrid::LAND,
            // Ships launched on land may cross it until they reach water.
            (UnitKind::Ship, Some(cell)) => {
                cell == TerrainGrid::WATER || self.terrain.at(from) != Some(TerrainGrid::WATER)
            }
        }
    }

    /// Hash of the complete world state, for determinism checks.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.tick.hash(&mut hasher);
        self.teams.hash(&mut hasher);
        hasher.finish()
    }
}

fn heading_step(heading: Heading, speed: Fixed) -> Vec2Fixed {
    let radians = heading.degrees().to_num::<f64>().to_radians();
    let speed = speed.to_num::<f64>();
    Vec2Fixed::from_num(radians.cos() * speed, radians.sin() * speed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{Island, TeamSetup};

    fn pond() -> Scenario {
        Scenario {
            name: "pond".to_string(),
            description: String::new(),
            map_size: (64, 64),
            islands: vec![Island::new(10, 32, 6)],
            teams: vec![TeamSetup::policy("Farmers", vec![(10, 32)], 500)],
            costs: CostTable::default(),
            economy: EconomySetup::default(),
            speeds: SpeedTable::default(),
            ticks: 10,
        }
    }

    fn apply_build(sandbox: &mut Sandbox, order: BuildOrder) -> AppliedOrders {
        let mut snapshot = sandbox.snapshot();
        for team in snapshot.teams_mut() {
            team.bases[0].build(order);
        }
        sandbox.apply(snapshot)
    }

    #[test]
    fn test_income_grows_with_mines() {
        let mut sandbox = Sandbox::from_scenario(&pond());
        apply_build(&mut sandbox, BuildOrder::mine());
        let before = sandbox.teams()[0].total_crystal();

        sandbox.step();

        // One base income plus one mine.
        assert_eq!(sandbox.teams()[0].total_crystal(), before + 2);
    }

    #[test]
    fn test_build_spends_crystal_and_spawns() {
        let mut sandbox = Sandbox::from_scenario(&pond());
        let applied = apply_build(
            &mut sandbox,
            BuildOrder::vehicle(BuildKind::Tank, Heading::ZERO),
        );

        assert_eq!(applied.builds, 1);
        let team = &sandbox.teams()[0];
        assert_eq!(team.total_crystal(), 500 - 15);
        assert_eq!(team.vehicles_of(UnitKind::Tank).count(), 1);
    }

    #[test]
    fn test_tank_gets_stuck_at_the_shore() {
        let mut sandbox = Sandbox::from_scenario(&pond());
        apply_build(
            &mut sandbox,
            BuildOrder::vehicle(BuildKind::Tank, Heading::ZERO),
        );

        for _ in 0..10 {
            sandbox.step();
        }

        let tank = sandbox.teams()[0]
            .vehicles_of(UnitKind::Tank)
            .next()
            .copied()
            .expect("tank exists");
        assert!(tank.stuck);
        assert!(!tank.is_stopped());
        assert!(tank.position.x <= Fixed::from_num(17));
    }

    #[test]
    fn test_jet_stops_at_destination() {
        let mut sandbox = Sandbox::from_scenario(&pond());
        apply_build(
            &mut sandbox,
            BuildOrder::vehicle(BuildKind::Jet, Heading::ZERO),
        );
        let mut snapshot = sandbox.snapshot();
        for team in snapshot.teams_mut() {
            team.jets[0].goto(Vec2Fixed::from_num(20, 32));
        }
        sandbox.apply(snapshot);

        for _ in 0..10 {
            sandbox.step();
        }

        let jet = sandbox.teams()[0]
            .vehicles_of(UnitKind::Jet)
            .next()
            .copied()
            .expect("jet exists");
        assert!(jet.is_stopped());
        assert_eq!(jet.position, Vec2Fixed::from_num(20, 32));
    }

    #[test]
    fn test_long_goto_heads_the_right_way() {
        let mut scenario = pond();
        scenario.map_size = (120_000, 64);
        assert!(scenario.validate().is_ok());
        let mut sandbox = Sandbox::from_scenario(&scenario);
        apply_build(
            &mut sandbox,
            BuildOrder::vehicle(BuildKind::Jet, Heading::ZERO),
        );
        let destination = Vec2Fixed::from_num(110_000, 32);
        let mut snapshot = sandbox.snapshot();
        for team in snapshot.teams_mut() {
            team.jets[0].goto(destination);
        }
        sandbox.apply(snapshot);

        for _ in 0..5 {
            sandbox.step();
        }

        let jet = sandbox.teams()[0]
            .vehicles_of(UnitKind::Jet)
            .next()
            .copied()
            .expect("jet exists");
        assert!(!jet.stuck);
        assert_eq!(jet.destination, Some(destination));
        // Five steps at speed 3 from x = 10.
        assert!(jet.position.x > Fixed::from_num(24) && jet.position.x < Fixed::from_num(26));
        assert_eq!(jet.position.y, Fixed::from_num(32));
    }

    #[test]
    fn test_conversion_founds_a_base() {
        let mut sandbox = Sandbox::from_scenario(&pond());
        apply_build(
            &mut sandbox,
            BuildOrder::vehicle(BuildKind::Ship, Heading::ZERO),
        );
        let mut snapshot = sandbox.snapshot();
        for team in snapshot.teams_mut() {
            team.ships[0].convert_to_base();
        }
        let applied = sandbox.apply(snapshot);

        assert_eq!(applied.conversions, 1);
        let team = &sandbox.teams()[0];
        assert_eq!(team.bases.len(), 2);
        assert_eq!(team.vehicles.len(), 0);
    }

    #[test]
    fn test_unaffordable_build_is_rejected() {
        let mut scenario = pond();
        scenario.teams[0].starting_crystal = 10;
        let mut sandbox = Sandbox::from_scenario(&scenario);

        let applied = apply_build(&mut sandbox, BuildOrder::mine());

        assert_eq!(applied.rejected_builds, 1);
        assert_eq!(sandbox.teams()[0].bases.values().next().map(|b| b.mines), Some(0));
    }
}
