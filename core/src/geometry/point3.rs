//! 3-D Points

use super::Vector3;
use crate::math::*;
use num_traits::{Num, Zero};
use std::ops;

/// A 3-D point containing numeric values.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Point3<T> {
    /// X-coordinate.
    pub x: T,

    /// Y-coordinate.
    pub y: T,

    /// Z-coordinate.
    pub z: T,
}

/// 3-D point containing `Float` values.
pub type Point3f = Point3<Float>;
impl Point3f {
    /// Point at the origin.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0, z: 0.0 };
}

impl<T: Num> Point3<T> {
    /// Creates a new 3-D point.
    ///
    /// * `x` - X-coordinate.
    /// * `y` - Y-coordinate.
    /// * `z` - Z-coordinate.
    pub fn new(x: T, y: T, z: T) -> Self {
        Self { x, y, z }
    }

    /// Creates a new 3-D zero point.
    pub fn zero() -> Self
    where
        T: Zero,
    {
        Self::new(T::zero(), T::zero(), T::zero())
    }

    /// Returns true if either coordinate is NaN.
    pub fn has_nans(&self) -> bool
    where
        T: num_traits::Float,
    {
        self.x.is_nan() || self.y.is_nan() || self.z.is_nan()
    }

    /// Return the component-wise minimum coordinate values with another point.
    ///
    /// * `other` - The other point.
    pub fn min(&self, other: &Self) -> Self
    where
        T: PartialOrd + Copy,
    {
        Self::new(min(self.x, other.x), min(self.y, other.y), min(self.z, other.z))
    }

    /// Return the component-wise maximum coordinate values with another point.
    ///
    /// * `other` - The other point.
    pub fn max(&self, other: &Self) -> Self
    where
        T: PartialOrd + Copy,
    {
        Self::new(max(self.x, other.x), max(self.y, other.y), max(self.z, other.z))
    }

    /// Returns the squared distance to another point.
    ///
    /// * `p` - The other point.
    pub fn distance_squared(&self, p: &Self) -> T
    where
        T: Copy,
    {
        (*self - *p).length_squared()
    }

    /// Returns the distance to another point.
    ///
    /// * `p` - The other point.
    pub fn distance(&self, p: &Self) -> T
    where
        T: num_traits::Float,
    {
        (*self - *p).length()
    }
}

impl<T: Num> ops::Add<Vector3<T>> for Point3<T> {
    type Output = Point3<T>;

    /// Offsets a point by the given vector.
    ///
    /// * `other` - The vector to add.
    fn add(self, other: Vector3<T>) -> Self::Output {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl<T: Num + Copy> ops::AddAssign<Vector3<T>> for Point3<T> {
    /// Offsets a point by the given vector.
    ///
    /// * `other` - The vector to add.
    fn add_assign(&mut self, other: Vector3<T>) {
        *self = *self + other;
    }
}

impl<T: Num> ops::Add for Point3<T> {
    type Output = Point3<T>;

    /// Adds the given point and returns the result. Only meaningful for
    /// weighted sums such as `lerp`.
    ///
    /// * `other` - The point to add.
    fn add(self, other: Self) -> Self::Output {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl<T: Num> ops::Sub for Point3<T> {
    type Output = Vector3<T>;

    /// Returns the vector between two points.
    ///
    /// * `other` - The starting point.
    fn sub(self, other: Self) -> Self::Output {
        Vector3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl<T: Num> ops::Sub<Vector3<T>> for Point3<T> {
    type Output = Point3<T>;

    /// Offsets a point by the negated vector.
    ///
    /// * `other` - The vector to subtract.
    fn sub(self, other: Vector3<T>) -> Self::Output {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl<T: Num + Copy> ops::Mul<T> for Point3<T> {
    type Output = Point3<T>;

    /// Scale the point.
    ///
    /// * `f` - The scaling factor.
    fn mul(self, f: T) -> Self::Output {
        Self::new(f * self.x, f * self.y, f * self.z)
    }
}

impl ops::Mul<Point3f> for Float {
    type Output = Point3f;

    /// Scale the point.
    ///
    /// * `p` - The point.
    fn mul(self, p: Point3f) -> Self::Output {
        Point3::new(self * p.x, self * p.y, self * p.z)
    }
}

impl<T: Num + ops::Neg<Output = T>> ops::Neg for Point3<T> {
    type Output = Point3<T>;

    /// Mirrors the point through the origin.
    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl<T> ops::Index<Axis> for Point3<T> {
    type Output = T;

    /// Index the point by an axis to get the immutable coordinate axis value.
    ///
    /// * `axis` - A 3-D coordinate axis.
    fn index(&self, axis: Axis) -> &Self::Output {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
        }
    }
}

impl<T> ops::IndexMut<Axis> for Point3<T> {
    /// Index the point by an axis to get a mutable coordinate axis value.
    ///
    /// * `axis` - A 3-D coordinate axis.
    fn index_mut(&mut self, axis: Axis) -> &mut Self::Output {
        match axis {
            Axis::X => &mut self.x,
            Axis::Y => &mut self.y,
            Axis::Z => &mut self.z,
        }
    }
}

impl<T> From<Vector3<T>> for Point3<T> {
    /// Convert a 3-D vector to a 3-D point.
    ///
    /// * `v` - 3-D vector.
    fn from(v: Vector3<T>) -> Self {
        Self { x: v.x, y: v.y, z: v.z }
    }
}

impl<T> From<Point3<T>> for Vector3<T> {
    /// Convert a 3-D point to a 3-D vector.
    ///
    /// * `p` - 3-D point.
    fn from(p: Point3<T>) -> Self {
        Self { x: p.x, y: p.y, z: p.z }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
