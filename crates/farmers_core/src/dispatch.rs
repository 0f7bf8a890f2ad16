//! Per-unit-type behavior rules.
//!
//! The dispatcher fans out over every unit of a team and applies exactly one
//! rule per unit type. Rules are independent: no unit looks at another unit,
//! and a unit with nothing to do receives no command.
//!
//! | Type | Rule |
//! |------|------|
//! | Tank | if moving: re-head when stuck, otherwise chase the target |
//! | Ship | if moving and stuck: settle far from own bases, otherwise re-head |
//! | Jet  | always chase the target |

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::engine::{ShipHandle, TeamContext, TerrainGrid, Uid, VehicleHandle, World};
use crate::headings::HeadingSource;
use crate::math::{fixed_serde, Fixed, Heading, Vec2Fixed};

/// Mobile unit types the dispatcher knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    /// Ground unit.
    Tank,
    /// Naval unit.
    Ship,
    /// Air unit.
    Jet,
}

/// A command the dispatcher issued this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatchEvent {
    /// Unit told to steer along a new heading.
    Heading {
        /// Unit commanded.
        unit: Uid,
        /// Its type.
        kind: UnitKind,
        /// New heading.
        heading: Heading,
    },
    /// Unit told to travel to a position.
    Goto {
        /// Unit commanded.
        unit: Uid,
        /// Its type.
        kind: UnitKind,
        /// Destination.
        destination: Vec2Fixed,
    },
    /// Ship told to become a base.
    Converted {
        /// Ship commanded.
        ship: Uid,
        /// Base that built the ship.
        owner: Uid,
        /// Where the new base will stand.
        position: Vec2Fixed,
    },
}

/// Read-only inputs shared by every rule during one tick.
#[derive(Debug, Clone, Copy)]
pub struct TacticalContext<'a> {
    /// Shared enemy target, if one was acquired.
    pub target: Option<Vec2Fixed>,
    /// Positions of the team's own bases.
    pub own_bases: &'a [Vec2Fixed],
    /// Terrain grid for this tick.
    pub terrain: &'a TerrainGrid,
}

/// Tank rule.
///
/// Stopped tanks are left alone. A moving tank that is stuck gets a fresh
/// heading; a moving tank that is not stuck heads for the target.
pub fn tank_rule<V: VehicleHandle>(
    tank: &mut V,
    ctx: &TacticalContext<'_>,
    headings: &mut impl HeadingSource,
) -> Option<DispatchEvent> {
    if tank.is_stopped() {
        return None;
    }
    if tank.is_stuck() {
        return Some(reheading(tank, UnitKind::Tank, headings));
    }
    ctx.target.map(|target| chase(tank, UnitKind::Tank, target))
}

/// Ship rule.
///
/// Only moving, stuck ships are considered. One that is strictly farther than
/// `conversion_range` from every own base becomes a base; any other gets a
/// fresh heading.
pub fn ship_rule<S: ShipHandle>(
    ship: &mut S,
    ctx: &TacticalContext<'_>,
    conversion_range: Fixed,
    headings: &mut impl HeadingSource,
) -> Option<DispatchEvent> {
    if ship.is_stopped() || !ship.is_stuck() {
        return None;
    }

    let position = ship.position();
    let isolated = ctx
        .own_bases
        .iter()
        .all(|&base| position.is_farther_than(base, conversion_range));

    if isolated {
        ship.convert_to_base();
        info!(ship = %ship.uid(), owner = %ship.owner(), "Converting ship to base");
        return Some(DispatchEvent::Converted {
            ship: ship.uid(),
            owner: ship.owner(),
            position,
        });
    }
    Some(reheading(ship, UnitKind::Ship, headings))
}

/// Jet rule: chase the target whenever there is one.
pub fn jet_rule<V: VehicleHandle>(jet: &mut V, ctx: &TacticalContext<'_>) -> Option<DispatchEvent> {
    ctx.target.map(|target| chase(jet, UnitKind::Jet, target))
}

fn reheading<V: VehicleHandle + ?Sized>(
    unit: &mut V,
    kind: UnitKind,
    headings: &mut impl HeadingSource,
) -> DispatchEvent {
    let heading = headings.next_heading();
    unit.set_heading(heading);
    debug!(unit = %unit.uid(), ?kind, degrees = %heading.degrees(), "New heading");
    DispatchEvent::Heading {
        unit: unit.uid(),
        kind,
        heading,
    }
}

fn chase<V: VehicleHandle + ?Sized>(
    unit: &mut V,
    kind: UnitKind,
    destination: Vec2Fixed,
) -> DispatchEvent {
    unit.goto(destination);
    debug!(unit = %unit.uid(), ?kind, "Chasing target");
    DispatchEvent::Goto {
        unit: unit.uid(),
        kind,
        destination,
    }
}

/// Applies the per-type rules to a whole team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitDispatcher {
    #[serde(with = "fixed_serde")]
    conversion_range: Fixed,
}

impl UnitDispatcher {
    /// Create a dispatcher with the given ship conversion range.
    #[must_use]
    pub const fn new(conversion_range: Fixed) -> Self {
        Self { conversion_range }
    }

    /// Ship conversion range.
    #[must_use]
    pub const fn conversion_range(&self) -> Fixed {
        self.conversion_range
    }

    /// Run every unit of `team` through its rule.
    ///
    /// Ships go first, then tanks, then jets. Every unit present this tick is
    /// handled, including ones the dispatcher has never seen before.
    pub fn dispatch<W: World>(
        &self,
        team: &mut TeamContext<W>,
        target: Option<Vec2Fixed>,
        terrain: &TerrainGrid,
        headings: &mut impl HeadingSource,
    ) -> Vec<DispatchEvent> {
        let own_bases = team.base_positions();
        let ctx = TacticalContext {
            target,
            own_bases: &own_bases,
            terrain,
        };

        let mut events = Vec::new();
        for ship in &mut team.ships {
            events.extend(ship_rule(ship, &ctx, self.conversion_range, headings));
        }
        for tank in &mut team.tanks {
            events.extend(tank_rule(tank, &ctx, headings));
        }
        for jet in &mut team.jets {
            events.extend(jet_rule(jet, &ctx));
        }
        events
    }
}
