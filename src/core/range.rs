// src/core/range.rs
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RangeError;

/// Closed interval `[lower, upper]` over an integer domain (pay, price, ...).
///
/// Invariant: `lower <= upper`. Enforced by every constructor, including
/// deserialization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawRange")]
pub struct RangeDescriptor {
    lower: i64,
    upper: i64,
}

#[derive(Deserialize)]
struct RawRange {
    lower: i64,
    upper: i64,
}

impl TryFrom<RawRange> for RangeDescriptor {
    type Error = RangeError;
    fn try_from(raw: RawRange) -> Result<Self, Self::Error> {
        RangeDescriptor::new(raw.lower, raw.upper)
    }
}

impl RangeDescriptor {
    pub fn new(lower: i64, upper: i64) -> Result<Self, RangeError> {
        if lower > upper {
            return Err(RangeError { lower, upper });
        }
        Ok(Self { lower, upper })
    }

    /// Builds from two bounds in either order.
    pub const fn from_ordered(a: i64, b: i64) -> Self {
        if a <= b {
            Self { lower: a, upper: b }
        } else {
            Self { lower: b, upper: a }
        }
    }

    pub const fn point(value: i64) -> Self {
        Self { lower: value, upper: value }
    }

    #[inline] pub fn lower(&self) -> i64 { self.lower }
    #[inline] pub fn upper(&self) -> i64 { self.upper }
    #[inline] pub fn is_point(&self) -> bool { self.lower == self.upper }

    /// `upper - lower`; zero for a point.
    pub fn width(&self) -> u64 {
        (self.upper as i128 - self.lower as i128) as u64
    }

    pub fn contains(&self, value: i64) -> bool {
        self.lower <= value && value <= self.upper
    }

    /// `floor((lower + upper) / 2)`, exact for negative and extreme bounds.
    pub fn midpoint(&self) -> i64 {
        (self.lower as i128 + self.upper as i128).div_euclid(2) as i64
    }

    /// Split into `[lower, mid]` and `[mid + 1, upper]`.
    /// The halves are disjoint, cover `self` exactly, and are both narrower.
    /// A point cannot be split.
    pub fn bisect(&self) -> Option<(Self, Self)> {
        if self.is_point() {
            return None;
        }
        let mid = self.midpoint();
        Some((
            Self { lower: self.lower, upper: mid },
            Self { lower: mid + 1, upper: self.upper },
        ))
    }

    /// Filesystem-friendly label, e.g. `12_40`.
    pub fn slug(&self) -> String {
        format!("{}_{}", self.lower, self.upper)
    }
}

impl fmt::Display for RangeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.lower, self.upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(lo: i64, hi: i64) -> RangeDescriptor {
        RangeDescriptor::new(lo, hi).unwrap()
    }

    #[test]
    fn inverted_bounds_rejected() {
        assert_eq!(RangeDescriptor::new(5, 4), Err(RangeError { lower: 5, upper: 4 }));
        assert_eq!(RangeDescriptor::from_ordered(5, 4), r(4, 5));
    }

    #[test]
    fn bisect_matches_floor_midpoint() {
        assert_eq!(r(0, 100).bisect(), Some((r(0, 50), r(51, 100))));
        assert_eq!(r(0, 1).bisect(), Some((r(0, 0), r(1, 1))));
        assert_eq!(r(-3, 0).bisect(), Some((r(-3, -2), r(-1, 0))));
        assert_eq!(r(-5, -4).bisect(), Some((r(-5, -5), r(-4, -4))));
    }

    #[test]
    fn point_does_not_split() {
        assert!(r(5, 5).is_point());
        assert_eq!(r(5, 5).bisect(), None);
        assert_eq!(r(5, 5).width(), 0);
    }

    #[test]
    fn halves_cover_parent_without_overlap() {
        let cases = [(0, 100), (-17, 33), (7, 8), (-1, 1), (0, 999_999), (i64::MIN, i64::MAX)];
        for (lo, hi) in cases {
            let parent = r(lo, hi);
            let (left, right) = parent.bisect().unwrap();
            assert_eq!(left.lower(), parent.lower());
            assert_eq!(right.upper(), parent.upper());
            assert_eq!(left.upper() as i128 + 1, right.lower() as i128, "gap or overlap in {parent}");
            assert!(left.width() < parent.width());
            assert!(right.width() < parent.width());
        }
    }

    #[test]
    fn repeated_bisection_terminates() {
        let mut queue = vec![r(-1_000, 1_000)];
        let mut points = 0u64;
        let mut steps = 0u64;
        while let Some(range) = queue.pop() {
            steps += 1;
            match range.bisect() {
                Some((a, b)) => { queue.push(a); queue.push(b); }
                None => points += 1,
            }
        }
        assert_eq!(points, 2_001);
        assert_eq!(steps, 2 * 2_001 - 1);
    }

    #[test]
    fn deserialize_checks_invariant() {
        let ok: RangeDescriptor = serde_json::from_str(r#"{"lower":1,"upper":2}"#).unwrap();
        assert_eq!(ok, r(1, 2));
        assert!(serde_json::from_str::<RangeDescriptor>(r#"{"lower":3,"upper":2}"#).is_err());
    }

    #[test]
    fn display_and_slug() {
        assert_eq!(r(-2, 9).to_string(), "[-2, 9]");
        assert_eq!(r(-2, 9).slug(), "-2_9");
    }
}
