//! Fixed-point math utilities.
//!
//! Positions, distances and headings all use fixed-point arithmetic so the
//! policy makes the same decision for the same snapshot on every platform.

use fixed::traits::ToFixed;
use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all policy math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Fixed = I32F32;

/// Fixed-point 2D vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec2Fixed {
    /// X coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Y coordinate.
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

impl Vec2Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Create a vector from any numeric pair (integers from the engine, floats in tests).
    #[must_use]
    pub fn from_num(x: impl ToFixed, y: impl ToFixed) -> Self {
        Self::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Calculate squared distance (avoids sqrt for comparisons).
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy))
    }

    /// True when `other` lies strictly farther than `range` from `self`.
    #[must_use]
    pub fn is_farther_than(self, other: Self, range: Fixed) -> bool {
        self.distance_squared(other) > range.saturating_mul(range)
    }

    /// Dot product of two vectors.
    #[must_use]
    pub fn dot(self, other: Self) -> Fixed {
        self.x
            .saturating_mul(other.x)
            .saturating_add(self.y.saturating_mul(other.y))
    }

    /// Normalize vector using fixed-point math.
    ///
    /// Components are first divided by the larger magnitude so the squared
    /// length stays within `[1, 2]` however long the vector is.
    #[must_use]
    pub fn normalize(self) -> Self {
        let largest = self.x.saturating_abs().max(self.y.saturating_abs());
        if largest == Fixed::ZERO {
            return Self::ZERO;
        }

        let reduced = Self::new(self.x / largest, self.y / largest);
        let len = fixed_sqrt(reduced.dot(reduced));
        if len == Fixed::ZERO {
            return Self::ZERO;
        }

        Self::new(reduced.x / len, reduced.y / len)
    }

    /// Scale both components.
    #[must_use]
    pub fn scale(self, factor: Fixed) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }
}

/// Computes the square root of a fixed-point number using binary search.
#[must_use]
pub fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    let mut low = Fixed::ZERO;
    let mut high = if value > Fixed::from_num(1) {
        value
    } else {
        Fixed::from_num(1)
    };

    for _ in 0..32 {
        let mid = low + (high - low) / Fixed::from_num(2);
        let mid_sq = mid.saturating_mul(mid);

        if mid_sq <= value {
            low = mid;
        } else {
            high = mid;
        }
    }

    low
}

impl std::ops::Add for Vec2Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::Sub for Vec2Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

/// Absolute compass heading in degrees, always within `[0, 360)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Heading(#[serde(with = "fixed_serde")] Fixed);

impl Heading {
    /// Heading pointing along the positive x axis.
    pub const ZERO: Self = Self(Fixed::ZERO);

    /// Build a heading from any degree value, wrapping it into `[0, 360)`.
    #[must_use]
    pub fn from_degrees(degrees: Fixed) -> Self {
        let full = Fixed::from_num(360);
        let mut wrapped = degrees % full;
        if wrapped < Fixed::ZERO {
            wrapped += full;
        }
        if wrapped >= full {
            wrapped = Fixed::ZERO;
        }
        Self(wrapped)
    }

    /// The heading in degrees.
    #[must_use]
    pub const fn degrees(self) -> Fixed {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec2_distance_squared() {
        let a = Vec2Fixed::new(Fixed::from_num(3), Fixed::from_num(0));
        let b = Vec2Fixed::new(Fixed::from_num(0), Fixed::from_num(4));
        let dist_sq = a.distance_squared(b);
        // 3² + 4² = 25
        assert_eq!(dist_sq, Fixed::from_num(25));
    }

    #[test]
    fn test_farther_than_is_strict() {
        let origin = Vec2Fixed::ZERO;
        let on_edge = Vec2Fixed::from_num(40, 0);
        let beyond = Vec2Fixed::from_num(24, 32.5);

        assert!(!origin.is_farther_than(on_edge, Fixed::from_num(40)));
        assert!(origin.is_farther_than(beyond, Fixed::from_num(40)));
    }

    #[test]
    fn test_vec2_normalize() {
        let v = Vec2Fixed::new(Fixed::from_num(3), Fixed::from_num(4));
        let norm = v.normalize();

        let len_sq = norm.dot(norm);
        let one = Fixed::from_num(1);
        let epsilon = one / Fixed::from_num(10000);
        assert!(
            (len_sq - one).abs() < epsilon,
            "normalized vector length² should be ~1, got {:?}",
            len_sq
        );

        let ratio_diff = (norm.x * Fixed::from_num(4)) - (norm.y * Fixed::from_num(3));
        assert!(
            ratio_diff.abs() < epsilon,
            "direction not preserved: {:?}",
            ratio_diff
        );
    }

    #[test]
    fn test_normalize_long_vector() {
        let v = Vec2Fixed::from_num(110_000, -80_000);
        let norm = v.normalize();

        let one = Fixed::from_num(1);
        let epsilon = one / Fixed::from_num(10000);
        assert!((norm.dot(norm) - one).abs() < epsilon);
        assert!(norm.x > Fixed::ZERO && norm.y < Fixed::ZERO);

        let ratio_diff = norm.x * Fixed::from_num(8) + norm.y * Fixed::from_num(11);
        assert!(ratio_diff.abs() < epsilon, "direction not preserved: {ratio_diff:?}");
    }

    #[test]
    fn test_dot_saturates() {
        let far = Vec2Fixed::from_num(100_000, 100_000);
        assert_eq!(far.dot(far), Fixed::MAX);
    }

    #[test]
    fn test_sqrt_of_large_values() {
        let thousand = fixed_sqrt(Fixed::from_num(1_000_000)) - Fixed::from_num(1000);
        assert!(thousand.abs() < Fixed::from_num(1) / Fixed::from_num(1000));
        let root = fixed_sqrt(Fixed::MAX);
        assert!(root > Fixed::from_num(46_340) && root < Fixed::from_num(46_341));
    }

    #[test]
    fn test_normalize_zero_vector() {
        assert_eq!(Vec2Fixed::ZERO.normalize(), Vec2Fixed::ZERO);
    }

    #[test]
    fn test_heading_wraps_into_range() {
        assert_eq!(
            Heading::from_degrees(Fixed::from_num(370)).degrees(),
            Fixed::from_num(10)
        );
        assert_eq!(
            Heading::from_degrees(Fixed::from_num(-90)).degrees(),
            Fixed::from_num(270)
        );
        assert_eq!(Heading::from_degrees(Fixed::from_num(360)), Heading::ZERO);
    }
}
