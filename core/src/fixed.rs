use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

const FRACTION_BITS: u32 = 16;
const HALF_RAW: i32 = 1 << (FRACTION_BITS - 1);

/// Signed 16.16 fixed-point number used for all simulation arithmetic.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Fixed(i32);

impl Fixed {
    /// The value zero.
    pub const ZERO: Self = Self(0);
    /// The value one.
    pub const ONE: Self = Self(1 << FRACTION_BITS);
    /// The value one half.
    pub const HALF: Self = Self(HALF_RAW);
    /// Largest representable value.
    pub const MAX: Self = Self(i32::MAX);
    /// Raw value used as "no value yet" by the target evaluator.
    pub const UNSET: Self = Self(-1);

    /// Wraps a raw 16.16 value.
    #[must_use]
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// Raw 16.16 representation.
    #[must_use]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Converts an integer into fixed point.
    #[must_use]
    pub const fn from_int(value: i32) -> Self {
        Self(value.wrapping_shl(FRACTION_BITS))
    }

    /// Truncates toward negative infinity.
    #[must_use]
    pub const fn to_int(self) -> i32 {
        self.0 >> FRACTION_BITS
    }

    /// Rounds to the nearest integer, with halves rounded toward zero.
    #[must_use]
    pub const fn round(self) -> i32 {
        if self.0 >= 0 {
            self.0.wrapping_add(HALF_RAW) >> FRACTION_BITS
        } else {
            (self.0.wrapping_sub(HALF_RAW) >> FRACTION_BITS) + 1
        }
    }

    /// Fixed-point multiplication.
    #[must_use]
    pub const fn mul(self, other: Self) -> Self {
        Self(((self.0 as i64 * other.0 as i64) >> FRACTION_BITS) as i32)
    }

    /// Fixed-point division, or `None` when dividing by zero.
    #[must_use]
    pub const fn checked_div(self, other: Self) -> Option<Self> {
        if other.0 == 0 {
            None
        } else {
            Some(Self((((self.0 as i64) << FRACTION_BITS) / other.0 as i64) as i32))
        }
    }

    /// Builds `numerator / denominator` as a fraction, or zero when the denominator is zero.
    #[must_use]
    pub const fn ratio(numerator: i32, denominator: i32) -> Self {
        if denominator == 0 {
            Self::ZERO
        } else {
            Self((((numerator as i64) << FRACTION_BITS) / denominator as i64) as i32)
        }
    }

    /// Absolute value, saturating at the maximum.
    #[must_use]
    pub const fn abs(self) -> Self {
        Self(self.0.saturating_abs())
    }

    /// Shifts the raw representation left, wrapping on overflow.
    #[must_use]
    pub const fn shl(self, bits: u32) -> Self {
        Self(self.0.wrapping_shl(bits))
    }

    /// Shifts the raw representation right (arithmetic).
    #[must_use]
    pub const fn shr(self, bits: u32) -> Self {
        Self(self.0 >> bits)
    }

    /// Saturating addition.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Reports whether the value is strictly positive.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }
}

impl Add for Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.wrapping_add(rhs.0))
    }
}

impl AddAssign for Fixed {
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.wrapping_add(rhs.0);
    }
}

impl Sub for Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0.wrapping_sub(rhs.0))
    }
}

impl SubAssign for Fixed {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 = self.0.wrapping_sub(rhs.0);
    }
}

impl Neg for Fixed {
    type Output = Self;

    fn neg(self) -> Self {
        Self(self.0.wrapping_neg())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiplies_in_sixteen_sixteen() {
        let one_and_half = Fixed::from_raw(0x0001_8000);
        let two = Fixed::from_int(2);
        assert_eq!(one_and_half.mul(two), Fixed::from_int(3));
        assert_eq!(Fixed::from_int(-2).mul(Fixed::HALF), Fixed::from_int(-1));
    }

    #[test]
    fn rounds_halves_toward_zero() {
        assert_eq!(Fixed::from_raw(0x0001_8000).round(), 2);
        assert_eq!(Fixed::from_raw(-0x8000).round(), 0);
        assert_eq!(Fixed::from_raw(-0x0001_8000).round(), -1);
        assert_eq!(Fixed::from_raw(-0x0001_9000).round(), -2);
    }

    #[test]
    fn division_by_zero_is_none() {
        assert_eq!(Fixed::ONE.checked_div(Fixed::ZERO), None);
        assert_eq!(
            Fixed::from_int(3).checked_div(Fixed::from_int(2)),
            Some(Fixed::from_raw(0x0001_8000))
        );
    }
}
