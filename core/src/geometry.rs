use serde::{Deserialize, Serialize};

use crate::Fixed;

/// Centre of the universe in absolute coordinates.
pub const UNIVERSAL_CENTER: u32 = 1_073_741_823;

/// Half-extent of the region in which objects may think and move.
pub const THINKIVERSE_HALF_EXTENT: u32 = 2 * 65_534;

/// Distance beyond which objects are considered unrelated.
pub const MAXIMUM_RELEVANT_DISTANCE: u32 = 46_340;

/// Square of [`MAXIMUM_RELEVANT_DISTANCE`].
pub const MAXIMUM_RELEVANT_DISTANCE_SQUARED: u64 =
    MAXIMUM_RELEVANT_DISTANCE as u64 * MAXIMUM_RELEVANT_DISTANCE as u64;

/// Absolute universe location measured in world units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coord {
    /// Horizontal component.
    pub h: u32,
    /// Vertical component, growing downward.
    pub v: u32,
}

impl Coord {
    /// Creates a coordinate from absolute components.
    #[must_use]
    pub const fn new(h: u32, v: u32) -> Self {
        Self { h, v }
    }

    /// Creates a coordinate relative to the universal centre.
    #[must_use]
    pub const fn from_center(h: i32, v: i32) -> Self {
        Self {
            h: UNIVERSAL_CENTER.wrapping_add_signed(h),
            v: UNIVERSAL_CENTER.wrapping_add_signed(v),
        }
    }

    /// Offsets the coordinate by a signed displacement.
    #[must_use]
    pub const fn offset(self, by: Point) -> Self {
        Self {
            h: self.h.wrapping_add_signed(by.h),
            v: self.v.wrapping_add_signed(by.v),
        }
    }

    /// Per-axis absolute distance to another coordinate.
    #[must_use]
    pub const fn axis_distance(self, other: Self) -> (u32, u32) {
        (self.h.abs_diff(other.h), self.v.abs_diff(other.v))
    }

    /// Squared euclidean distance to another coordinate.
    #[must_use]
    pub const fn distance_squared(self, other: Self) -> u64 {
        let (dh, dv) = self.axis_distance(other);
        dh as u64 * dh as u64 + dv as u64 * dv as u64
    }

    /// Signed displacement from this coordinate to another.
    #[must_use]
    pub const fn delta_to(self, other: Self) -> Point {
        Point {
            h: other.h.wrapping_sub(self.h) as i32,
            v: other.v.wrapping_sub(self.v) as i32,
        }
    }
}

/// Signed integer displacement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal component.
    pub h: i32,
    /// Vertical component.
    pub v: i32,
}

impl Point {
    /// Creates a displacement.
    #[must_use]
    pub const fn new(h: i32, v: i32) -> Self {
        Self { h, v }
    }
}

/// Fixed-point two-component vector, used for velocities.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FixedPoint {
    /// Horizontal component.
    pub h: Fixed,
    /// Vertical component.
    pub v: Fixed,
}

impl FixedPoint {
    /// The zero vector.
    pub const ZERO: Self = Self {
        h: Fixed::ZERO,
        v: Fixed::ZERO,
    };

    /// Creates a vector from components.
    #[must_use]
    pub const fn new(h: Fixed, v: Fixed) -> Self {
        Self { h, v }
    }

    /// Larger of the two component magnitudes.
    #[must_use]
    pub fn max_component(self) -> Fixed {
        self.h.abs().max(self.v.abs())
    }
}

/// Axis-aligned rectangle in absolute coordinates, right and bottom exclusive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub left: i64,
    /// Top edge.
    pub top: i64,
    /// Right edge.
    pub right: i64,
    /// Bottom edge.
    pub bottom: i64,
}

impl Rect {
    /// Builds a rectangle of the given size centred on a coordinate.
    #[must_use]
    pub const fn centered(at: Coord, width: u32, height: u32) -> Self {
        let left = at.h as i64 - (width / 2) as i64;
        let top = at.v as i64 - (height / 2) as i64;
        Self {
            left,
            top,
            right: left + width as i64,
            bottom: top + height as i64,
        }
    }

    /// Intersection test treating both rectangles as inclusive of their far edges.
    #[must_use]
    pub const fn intersects_inclusive(&self, other: &Self) -> bool {
        self.left <= other.right
            && other.left <= self.right
            && self.top <= other.bottom
            && other.top <= self.bottom
    }

    /// Reports whether the rectangle has no area.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.left >= self.right || self.top >= self.bottom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inclusive_intersection_counts_touching_edges() {
        let a = Rect::centered(Coord::new(100, 100), 10, 10);
        let b = Rect {
            left: a.right,
            top: a.top,
            right: a.right + 5,
            bottom: a.bottom,
        };
        assert!(a.intersects_inclusive(&b));

        let c = Rect {
            left: a.right + 1,
            ..b
        };
        assert!(!a.intersects_inclusive(&c));
    }

    #[test]
    fn delta_handles_wrapping_coordinates() {
        let origin = Coord::from_center(0, 0);
        let target = Coord::from_center(-40, 25);
        assert_eq!(origin.delta_to(target), Point::new(-40, 25));
        assert_eq!(origin.distance_squared(target), 40 * 40 + 25 * 25);
    }
}
