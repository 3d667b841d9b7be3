//! Whole-degree rotation table and angle helpers.
//!
//! Angles are whole degrees in `0..360`. Angle zero points up the screen
//! (negative `v`) and angles grow clockwise.

use crate::{Fixed, FixedPoint};

/// Number of discrete headings.
pub const ROTATION_POSITIONS: i32 = 360;

const SINE_TABLE: [i32; 360] = build_sine_table();

// Bhaskara approximation of sin(x) for x in degrees, in 16.16.
const fn approximate_sine(degrees: i64) -> i32 {
    let (x, sign) = if degrees < 180 {
        (degrees, 1)
    } else {
        (degrees - 180, -1)
    };
    let product = x * (180 - x);
    let value = ((4 * product) << 16) / (40_500 - product);
    (value * sign) as i32
}

const fn build_sine_table() -> [i32; 360] {
    let mut table = [0_i32; 360];
    let mut degree = 0;
    while degree < 360 {
        table[degree] = approximate_sine(degree as i64);
        degree += 1;
    }
    table
}

/// Wraps an arbitrary angle into `0..360`.
#[must_use]
pub const fn normalize_angle(angle: i32) -> i32 {
    angle.rem_euclid(ROTATION_POSITIONS)
}

/// Sine of a whole-degree angle.
#[must_use]
pub const fn sine(angle: i32) -> Fixed {
    Fixed::from_raw(SINE_TABLE[normalize_angle(angle) as usize])
}

/// Cosine of a whole-degree angle.
#[must_use]
pub const fn cosine(angle: i32) -> Fixed {
    sine(angle + 90)
}

/// Unit vector pointing along a heading.
#[must_use]
pub const fn rot_point(angle: i32) -> FixedPoint {
    FixedPoint::new(sine(angle), Fixed::from_raw(-cosine(angle).raw()))
}

/// Heading of a displacement, the inverse of [`rot_point`].
///
/// A zero displacement yields heading zero.
#[must_use]
pub fn ratio_to_angle(h: i64, v: i64) -> i32 {
    if h == 0 && v == 0 {
        return 0;
    }
    let across = h.unsigned_abs() as i128;
    let along = v.unsigned_abs() as i128;

    let mut best_angle = 0;
    let mut best_error = i128::MAX;
    for angle in 0..=90 {
        let error = (i128::from(sine(angle).raw()) * along
            - i128::from(cosine(angle).raw()) * across)
            .abs();
        if error < best_error {
            best_error = error;
            best_angle = angle;
        }
    }

    let heading = match (h >= 0, v <= 0) {
        (true, true) => best_angle,
        (true, false) => 180 - best_angle,
        (false, false) => 180 + best_angle,
        (false, true) => 360 - best_angle,
    };
    normalize_angle(heading)
}

/// Signed shortest turn from `from` to `to`, in `-180..=180`.
#[must_use]
pub const fn angle_difference(from: i32, to: i32) -> i32 {
    let delta = normalize_angle(to - from);
    if delta > 180 {
        delta - ROTATION_POSITIONS
    } else {
        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cardinal_headings_are_exact() {
        assert_eq!(rot_point(0), FixedPoint::new(Fixed::ZERO, -Fixed::ONE));
        assert_eq!(rot_point(90), FixedPoint::new(Fixed::ONE, Fixed::ZERO));
        assert_eq!(rot_point(180), FixedPoint::new(Fixed::ZERO, Fixed::ONE));
        assert_eq!(rot_point(270), FixedPoint::new(-Fixed::ONE, Fixed::ZERO));
    }

    #[test]
    fn ratio_to_angle_inverts_rot_point() {
        for angle in [0, 15, 45, 89, 90, 135, 200, 270, 300, 359] {
            let point = rot_point(angle);
            let recovered = ratio_to_angle(
                i64::from(point.h.raw()),
                i64::from(point.v.raw()),
            );
            assert!(
                angle_difference(angle, recovered).abs() <= 1,
                "angle {angle} recovered as {recovered}"
            );
        }
    }

    #[test]
    fn angle_difference_takes_short_way() {
        assert_eq!(angle_difference(350, 10), 20);
        assert_eq!(angle_difference(10, 350), -20);
        assert_eq!(angle_difference(0, 180), 180);
    }
}
