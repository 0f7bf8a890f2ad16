//! Interface between the policy and the game engine.
//!
//! The engine owns the world. Once per tick it hands the policy a
//! [`Snapshot`] of mutable handles; the policy reads them and issues
//! fire-and-forget commands through them. Nothing here simulates anything.
//!
//! # Handles
//!
//! - [`BaseHandle`]: stationary producer with a crystal balance and a cost table
//! - [`VehicleHandle`]: tanks and jets
//! - [`ShipHandle`]: vehicles that can also settle into a new base
//!
//! Engine implementations tie the three together through [`World`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::build::{BuildKind, BuildOrder};
use crate::math::{Fixed, Heading, Vec2Fixed};

/// Stable identity of an engine entity.
///
/// The engine never reuses a uid while the entity is alive, so it is safe to
/// key per-entity bookkeeping on it across ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Uid(u64);

impl Uid {
    /// Wrap a raw engine identifier.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw numeric value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A production base as seen through the engine.
pub trait BaseHandle {
    /// Stable identity.
    fn uid(&self) -> Uid;
    /// Current position.
    fn position(&self) -> Vec2Fixed;
    /// Accumulated crystal available to this base.
    fn crystal(&self) -> i32;
    /// Number of mines already built at this base.
    fn mines(&self) -> u32;
    /// Current crystal cost of building `kind` here.
    fn cost(&self, kind: BuildKind) -> i32;
    /// Ask the engine to build something. Fire-and-forget.
    fn build(&mut self, order: BuildOrder);
}

/// A mobile unit as seen through the engine.
pub trait VehicleHandle {
    /// Stable identity.
    fn uid(&self) -> Uid;
    /// Current position.
    fn position(&self) -> Vec2Fixed;
    /// The unit has no pending movement order.
    fn is_stopped(&self) -> bool;
    /// The unit failed to make progress on its last order.
    fn is_stuck(&self) -> bool;
    /// Travel along an absolute heading until told otherwise.
    fn set_heading(&mut self, heading: Heading);
    /// Travel to `destination` and stop there.
    fn goto(&mut self, destination: Vec2Fixed);
}

/// A ship: a vehicle that can also found a base where it stands.
pub trait ShipHandle: VehicleHandle {
    /// The base that built this ship.
    fn owner(&self) -> Uid;
    /// Turn this ship into a new base at its current position.
    fn convert_to_base(&mut self);
}

/// Binds an engine's handle types together.
pub trait World {
    /// Base handle type.
    type Base: BaseHandle;
    /// Handle type for tanks and jets.
    type Vehicle: VehicleHandle;
    /// Ship handle type.
    type Ship: ShipHandle;
}

/// Order recorded against a vehicle by an engine implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitOrder {
    /// Steer along an absolute heading.
    Heading(Heading),
    /// Travel to a position.
    Goto(Vec2Fixed),
    /// Settle into a base (ships only).
    ConvertToBase,
}

/// Everything one team owns this tick.
///
/// Unit lists are always present; a team without ships simply has an empty
/// `ships` vector.
pub struct TeamContext<W: World> {
    /// Team name, unique within a snapshot.
    pub name: String,
    /// Production bases.
    pub bases: Vec<W::Base>,
    /// Tanks.
    pub tanks: Vec<W::Vehicle>,
    /// Ships.
    pub ships: Vec<W::Ship>,
    /// Jets.
    pub jets: Vec<W::Vehicle>,
}

impl<W: World> TeamContext<W> {
    /// Create a team with no entities.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bases: Vec::new(),
            tanks: Vec::new(),
            ships: Vec::new(),
            jets: Vec::new(),
        }
    }

    /// Positions of every base, in listed order.
    #[must_use]
    pub fn base_positions(&self) -> Vec<Vec2Fixed> {
        self.bases.iter().map(BaseHandle::position).collect()
    }
}

/// The world as handed to the policy for one tick.
///
/// Teams keep the engine's iteration order; target acquisition depends on it.
pub struct Snapshot<W: World> {
    teams: Vec<TeamContext<W>>,
}

impl<W: World> Snapshot<W> {
    /// Create an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self { teams: Vec::new() }
    }

    /// Append a team after all teams already present.
    pub fn push_team(&mut self, team: TeamContext<W>) {
        self.teams.push(team);
    }

    /// Builder-style [`Self::push_team`].
    #[must_use]
    pub fn with_team(mut self, team: TeamContext<W>) -> Self {
        self.push_team(team);
        self
    }

    /// Look up a team by name.
    #[must_use]
    pub fn team(&self, name: &str) -> Option<&TeamContext<W>> {
        self.teams.iter().find(|team| team.name == name)
    }

    /// Look up a team by name for issuing commands.
    pub fn team_mut(&mut self, name: &str) -> Option<&mut TeamContext<W>> {
        self.teams.iter_mut().find(|team| team.name == name)
    }

    /// Teams in snapshot order.
    pub fn teams(&self) -> impl Iterator<Item = &TeamContext<W>> {
        self.teams.iter()
    }

    /// Teams in snapshot order, mutable.
    pub fn teams_mut(&mut self) -> impl Iterator<Item = &mut TeamContext<W>> {
        self.teams.iter_mut()
    }

    /// Number of teams present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.teams.len()
    }

    /// True when no team is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    /// Consume the snapshot, yielding its teams in order.
    #[must_use]
    pub fn into_teams(self) -> Vec<TeamContext<W>> {
        self.teams
    }
}

impl<W: World> Default for Snapshot<W> {
    fn default() -> Self {
        Self::new()
    }
}

/// Simulation clock passed with each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TickClock {
    /// Elapsed simulated time.
    #[serde(with = "crate::math::fixed_serde")]
    pub time: Fixed,
    /// Time step of this tick.
    #[serde(with = "crate::math::fixed_serde")]
    pub dt: Fixed,
}

impl TickClock {
    /// Create a clock reading.
    #[must_use]
    pub const fn new(time: Fixed, dt: Fixed) -> Self {
        Self { time, dt }
    }
}

/// Read-only terrain occupancy grid, row-major.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TerrainGrid {
    width: u32,
    height: u32,
    cells: Vec<u8>,
}

impl TerrainGrid {
    /// Cell value for open water.
    pub const WATER: u8 = 0;
    /// Cell value for land.
    pub const LAND: u8 = 1;

    /// Create a grid filled with water.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![Self::WATER; width as usize * height as usize],
        }
    }

    /// Grid width in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Cell value at (x, y), or `None` off the grid.
    #[must_use]
    pub fn get(&self, x: i64, y: i64) -> Option<u8> {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return None;
        }
        let idx = y as usize * self.width as usize + x as usize;
        self.cells.get(idx).copied()
    }

    /// Overwrite the cell at (x, y). Off-grid writes are ignored.
    pub fn set(&mut self, x: i64, y: i64, value: u8) {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return;
        }
        let idx = y as usize * self.width as usize + x as usize;
        if let Some(cell) = self.cells.get_mut(idx) {
            *cell = value;
        }
    }

    /// Cell value under a world position.
    #[must_use]
    pub fn at(&self, position: Vec2Fixed) -> Option<u8> {
        self.get(
            position.x.floor().to_num::<i64>(),
            position.y.floor().to_num::<i64>(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uid_display() {
        assert_eq!(Uid::new(7).to_string(), "#7");
    }

    #[test]
    fn test_terrain_bounds() {
        let mut grid = TerrainGrid::new(4, 3);
        grid.set(1, 2, TerrainGrid::LAND);

        assert_eq!(grid.get(1, 2), Some(TerrainGrid::LAND));
        assert_eq!(grid.get(0, 0), Some(TerrainGrid::WATER));
        assert_eq!(grid.get(4, 0), None);
        assert_eq!(grid.get(-1, 0), None);
        assert_eq!(grid.at(Vec2Fixed::from_num(1.5, 2.9)), Some(TerrainGrid::LAND));
    }

    #[test]
    fn test_truncated_grid_ignores_missing_cells() {
        let mut grid: TerrainGrid =
            serde_json::from_str(r#"{"width":4,"height":4,"cells":[0,0,0,0]}"#).unwrap();

        grid.set(3, 3, TerrainGrid::LAND);
        grid.set(1, 0, TerrainGrid::LAND);

        assert_eq!(grid.get(3, 3), None);
        assert_eq!(grid.get(1, 0), Some(TerrainGrid::LAND));
    }
}
