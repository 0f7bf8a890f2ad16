//! # Farmers Core
//!
//! Per-tick decision policy for a team of bases, tanks, ships and jets
//! driven by an external game engine.
//!
//! The engine owns the world: physics, resources and the authoritative
//! state. Once per tick it hands over a [`engine::Snapshot`] of handles and
//! the policy answers by issuing commands through them:
//!
//! - build orders on bases ([`production`])
//! - one shared enemy target per tick ([`targeting`])
//! - headings, goto orders and ship conversions on units ([`dispatch`])
//!
//! ## Crate Structure
//!
//! - [`engine`] - Handle traits and snapshot types
//! - [`build`] - Build kinds, orders and the cyclic build queue
//! - [`production`] - Per-base build scheduling and counters
//! - [`targeting`] - Shared target acquisition
//! - [`dispatch`] - Per-unit-type behavior rules
//! - [`policy`] - The tick entry point
//! - [`headings`] - Seeded heading sampling
//! - [`config`] - RON configuration
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod build;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod headings;
pub mod math;
pub mod policy;
pub mod production;
pub mod targeting;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::build::{BuildKind, BuildOrder, BuildQueue};
    pub use crate::config::{PolicyConfig, SchedulingMode};
    pub use crate::dispatch::{DispatchEvent, UnitDispatcher, UnitKind};
    pub use crate::engine::{
        BaseHandle, ShipHandle, Snapshot, TeamContext, TerrainGrid, TickClock, Uid, UnitOrder,
        VehicleHandle, World,
    };
    pub use crate::error::{PolicyError, Result};
    pub use crate::headings::{HeadingSource, SeededHeadings};
    pub use crate::math::{Fixed, Heading, Vec2Fixed};
    pub use crate::policy::{Policy, TickReport};
    pub use crate::production::{BaseCounters, CounterBook, ProductionEvent, ProductionScheduler};
    pub use crate::targeting::acquire_target;
}
