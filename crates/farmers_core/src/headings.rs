//! Random heading sampling.
//!
//! Every random decision the policy makes is a heading. They all come from a
//! [`HeadingSource`] so tests and replays can pin them down.

use serde::{Deserialize, Serialize};

use crate::math::{Fixed, Heading};

/// Resolution of sampled headings: 1/1000 of a degree.
const STEPS_PER_DEGREE: u64 = 1000;
const STEPS_PER_TURN: u64 = 360 * STEPS_PER_DEGREE;

/// Supplier of headings uniformly distributed over `[0, 360)`.
pub trait HeadingSource {
    /// Draw the next heading.
    fn next_heading(&mut self) -> Heading;
}

impl<H: HeadingSource + ?Sized> HeadingSource for &mut H {
    fn next_heading(&mut self) -> Heading {
        (**self).next_heading()
    }
}

/// Deterministic linear congruential heading generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeededHeadings {
    state: u64,
}

impl SeededHeadings {
    /// Create a generator from a seed.
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_add(0x9E37_79B9_7F4A_7C15),
        }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        // High bits of an LCG are the well-mixed ones.
        self.state >> 16
    }
}

impl HeadingSource for SeededHeadings {
    fn next_heading(&mut self) -> Heading {
        let steps = self.next_u64() % STEPS_PER_TURN;
        let degrees = Fixed::from_num(steps) / Fixed::from_num(STEPS_PER_DEGREE);
        Heading::from_degrees(degrees)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_headings() {
        let mut a = SeededHeadings::new(42);
        let mut b = SeededHeadings::new(42);
        for _ in 0..100 {
            assert_eq!(a.next_heading(), b.next_heading());
        }
    }

    #[test]
    fn test_headings_stay_in_range() {
        let mut source = SeededHeadings::new(7);
        let full = Fixed::from_num(360);
        for _ in 0..1000 {
            let heading = source.next_heading().degrees();
            assert!(heading >= Fixed::ZERO && heading < full, "{heading}");
        }
    }

    #[test]
    fn test_headings_spread_over_quadrants() {
        let mut source = SeededHeadings::new(3);
        let mut quadrants = [0u32; 4];
        for _ in 0..400 {
            let heading = source.next_heading().degrees();
            let quadrant = (heading / Fixed::from_num(90)).to_num::<usize>();
            quadrants[quadrant.min(3)] += 1;
        }
        assert!(quadrants.iter().all(|&count| count > 50), "{quadrants:?}");
    }
}
