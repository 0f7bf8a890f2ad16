//! Build kinds, build orders and the cyclic build queue.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::BaseHandle;
use crate::error::PolicyError;
use crate::headings::HeadingSource;
use crate::math::Heading;

/// Something a base can construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildKind {
    /// Resource mine attached to the base.
    Mine,
    /// Naval unit; can found new bases.
    Ship,
    /// Ground unit.
    Tank,
    /// Air unit.
    Jet,
}

impl BuildKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 4] = [Self::Mine, Self::Ship, Self::Tank, Self::Jet];

    /// Name the engine uses for this kind in its cost table.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mine => "mine",
            Self::Ship => "ship",
            Self::Tank => "tank",
            Self::Jet => "jet",
        }
    }

    /// Whether the built thing is a mobile unit that needs a heading.
    #[must_use]
    pub const fn is_vehicle(self) -> bool {
        !matches!(self, Self::Mine)
    }
}

impl fmt::Display for BuildKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildKind {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| PolicyError::UnknownBuildKind(s.to_string()))
    }
}

/// A single build command issued against a base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOrder {
    /// What to build.
    pub kind: BuildKind,
    /// Initial heading for vehicles; `None` for mines.
    pub heading: Option<Heading>,
}

impl BuildOrder {
    /// Order a mine.
    #[must_use]
    pub const fn mine() -> Self {
        Self {
            kind: BuildKind::Mine,
            heading: None,
        }
    }

    /// Order a vehicle leaving the base on `heading`.
    #[must_use]
    pub const fn vehicle(kind: BuildKind, heading: Heading) -> Self {
        Self {
            kind,
            heading: Some(heading),
        }
    }

    /// Order `kind`, drawing a heading only when the kind needs one.
    pub fn draw(kind: BuildKind, headings: &mut impl HeadingSource) -> Self {
        if kind.is_vehicle() {
            Self::vehicle(kind, headings.next_heading())
        } else {
            Self::mine()
        }
    }
}

/// Whether `base` can pay for `kind` right now.
///
/// The balance must strictly exceed the cost. The cost is looked up on every
/// call since the engine may change it between bases and ticks.
pub fn can_afford(base: &impl BaseHandle, kind: BuildKind) -> bool {
    base.crystal() > base.cost(kind)
}

/// Ordered ring of build kinds that advances on every successful build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildQueue {
    items: Vec<BuildKind>,
    cycle: bool,
    index: usize,
}

impl BuildQueue {
    /// Create a queue over `items`. With `cycle` the queue wraps around.
    #[must_use]
    pub fn new(items: Vec<BuildKind>, cycle: bool) -> Self {
        Self {
            items,
            cycle,
            index: 0,
        }
    }

    /// Kind the queue will try to build next, if any.
    #[must_use]
    pub fn current(&self) -> Option<BuildKind> {
        self.items.get(self.index).copied()
    }

    /// True once a non-cycling queue has built every item.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.current().is_none()
    }

    /// Build the current kind on `base` if affordable, then advance.
    ///
    /// Returns the issued order, or `None` when the base cannot pay or the
    /// queue is exhausted. The queue does not move on a failed attempt.
    pub fn try_build<B: BaseHandle>(
        &mut self,
        base: &mut B,
        headings: &mut impl HeadingSource,
    ) -> Option<BuildOrder> {
        let kind = self.current()?;
        if !can_afford(base, kind) {
            return None;
        }

        let order = BuildOrder::draw(kind, headings);
        base.build(order);
        self.advance();
        debug!(base = %base.uid(), %kind, "Build queue issued order");
        Some(order)
    }

    fn advance(&mut self) {
        self.index += 1;
        if self.cycle && self.index >= self.items.len() {
            self.index = 0;
        }
    }
}

impl Default for BuildQueue {
    fn default() -> Self {
        Self::new(
            vec![
                BuildKind::Mine,
                BuildKind::Tank,
                BuildKind::Ship,
                BuildKind::Jet,
            ],
            true,
        )
    }
}
