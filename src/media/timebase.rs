//! Rational time bases and timestamp rescaling.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Real-time duration of one timestamp tick, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rational {
    /// Numerator.
    pub num: i32,
    /// Denominator.
    pub den: i32,
}

impl Rational {
    /// Creates `num/den`; not reduced or validated.
    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    /// True when both terms are positive.
    pub fn is_valid(&self) -> bool {
        self.num > 0 && self.den > 0
    }

    /// Rescales `value` from time base `from` to time base `to`,
    /// rounding to the nearest tick (halves away from zero).
    pub fn rescale(value: i64, from: Rational, to: Rational) -> i64 {
        let mut n = value as i128 * from.num as i128 * to.den as i128;
        let mut d = from.den as i128 * to.num as i128;

        if d == 0 {
            return 0;
        }
        if d < 0 {
            n = -n;
            d = -d;
        }

        let q = if n >= 0 {
            (n + d / 2) / d
        } else {
            -((-n + d / 2) / d)
        };

        i64::try_from(q).unwrap_or(if q < 0 { i64::MIN } else { i64::MAX })
    }

    /// Converts a whole number of seconds into ticks of this time base.
    ///
    /// Partial ticks are truncated, so a 1001/30000 base gives 299 ticks
    /// for 10 seconds. Returns 0 for an invalid base.
    pub fn ticks_for_secs(&self, secs: u64) -> i64 {
        if !self.is_valid() {
            return 0;
        }
        let ticks = secs as i128 * self.den as i128 / self.num as i128;
        i64::try_from(ticks).unwrap_or(i64::MAX)
    }

    /// Orders two timestamps expressed in different time bases.
    pub fn compare_ts(a: i64, a_base: Rational, b: i64, b_base: Rational) -> Ordering {
        let lhs = a as i128 * a_base.num as i128 * b_base.den as i128;
        let rhs = b as i128 * b_base.num as i128 * a_base.den as i128;
        lhs.cmp(&rhs)
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}
