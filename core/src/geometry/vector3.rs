//! 3-D Vectors

use crate::math::*;
use num_traits::{Num, Zero};
use std::ops::{Add, AddAssign, Div, DivAssign, Index, IndexMut, Mul, MulAssign, Neg, Sub, SubAssign};

/// A 3-D vector containing numeric values.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Vector3<T> {
    /// X-coordinate.
    pub x: T,

    /// Y-coordinate.
    pub y: T,

    /// Z-coordinate.
    pub z: T,
}

/// 3-D vector containing `Float` values.
pub type Vector3f = Vector3<Float>;
impl Vector3f {
    /// Zero vector.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0, z: 0.0 };
}

impl<T: Num> Vector3<T> {
    /// Creates a new 3-D vector.
    ///
    /// * `x` - X-coordinate.
    /// * `y` - Y-coordinate.
    /// * `z` - Z-coordinate.
    pub fn new(x: T, y: T, z: T) -> Self {
        Self { x, y, z }
    }

    /// Creates a new 3-D zero vector.
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

    /// Returns the square of the vector's length.
    pub fn length_squared(&self) -> T
    where
        T: Copy,
    {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    /// Returns the vector's length.
    pub fn length(&self) -> T
    where
        T: num_traits::Float,
    {
        self.length_squared().sqrt()
    }

    /// Returns the unit vector.
    pub fn normalize(&self) -> Self
    where
        T: num_traits::Float,
    {
        *self / self.length()
    }

    /// Returns the unit vector or a zero vector when the length is below
    /// `epsilon`.
    ///
    /// * `epsilon` - Smallest length that is normalized.
    pub fn normalize_or_zero(&self, epsilon: T) -> Self
    where
        T: num_traits::Float,
    {
        let len = self.length();
        if len < epsilon {
            Self::zero()
        } else {
            *self / len
        }
    }

    /// Returns a new vector containing absolute values of the components.
    pub fn abs(&self) -> Self
    where
        T: Neg<Output = T> + PartialOrd + Copy,
    {
        Self::new(abs(self.x), abs(self.y), abs(self.z))
    }

    /// Returns the dot product with another vector.
    ///
    /// * `other` - The other vector.
    pub fn dot(&self, other: &Self) -> T
    where
        T: Copy,
    {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Returns the cross product with another vector.
    ///
    /// * `other` - The other vector.
    pub fn cross(&self, other: &Self) -> Self
    where
        T: Copy,
    {
        Self::new(
            (self.y * other.z) - (self.z * other.y),
            (self.z * other.x) - (self.x * other.z),
            (self.x * other.y) - (self.y * other.x),
        )
    }

    /// Returns the smallest coordinate value.
    pub fn min_component(&self) -> T
    where
        T: PartialOrd + Copy,
    {
        min(self.x, min(self.y, self.z))
    }
}

impl<T: Num> Add for Vector3<T> {
    type Output = Self;

    /// Adds the given vector and returns the result.
    ///
    /// * `other` - The vector to add.
    fn add(self, other: Self) -> Self::Output {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl<T: Num + Copy> AddAssign for Vector3<T> {
    /// Performs the `+=` operation.
    ///
    /// * `other` - The vector to add.
    fn add_assign(&mut self, other: Self) {
        *self = Self::new(self.x + other.x, self.y + other.y, self.z + other.z);
    }
}

impl<T: Num> Sub for Vector3<T> {
    type Output = Self;

    /// Subtracts the given vector and returns the result.
    ///
    /// * `other` - The vector to subtract.
    fn sub(self, other: Self) -> Self::Output {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl<T: Num + Copy> SubAssign for Vector3<T> {
    /// Performs the `-=` operation.
    ///
    /// * `other` - The vector to subtract.
    fn sub_assign(&mut self, other: Self) {
        *self = Self::new(self.x - other.x, self.y - other.y, self.z - other.z);
    }
}

impl<T: Num + Copy> Mul<T> for Vector3<T> {
    type Output = Self;

    /// Scale the vector.
    ///
    /// * `f` - The scaling factor.
    fn mul(self, f: T) -> Self::Output {
        Self::new(f * self.x, f * self.y, f * self.z)
    }
}

impl Mul<Vector3f> for Float {
    type Output = Vector3f;

    /// Scale the vector.
    ///
    /// * `v` - The vector.
    fn mul(self, v: Vector3f) -> Self::Output {
        Vector3::new(self * v.x, self * v.y, self * v.z)
    }
}

impl<T: Num + Copy> MulAssign<T> for Vector3<T> {
    /// Scale the vector.
    ///
    /// * `f` - The scaling factor.
    fn mul_assign(&mut self, f: T) {
        *self = Self::new(f * self.x, f * self.y, f * self.z);
    }
}

impl<T: Num + Copy> Div<T> for Vector3<T> {
    type Output = Self;

    /// Scale the vector by 1/f.
    ///
    /// * `f` - The scaling factor.
    fn div(self, f: T) -> Self::Output {
        debug_assert!(!f.is_zero());
        let inv = T::one() / f;
        Self::new(inv * self.x, inv * self.y, inv * self.z)
    }
}

impl<T: Num + Copy> DivAssign<T> for Vector3<T> {
    /// Scale the vector by 1/f.
    ///
    /// * `f` - The scaling factor.
    fn div_assign(&mut self, f: T) {
        *self = *self / f;
    }
}

impl<T: Num + Neg<Output = T>> Neg for Vector3<T> {
    type Output = Self;

    /// Flip the vector's direction (scale by -1).
    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl<T> Index<Axis> for Vector3<T> {
    type Output = T;

    /// Index the vector by an axis to get the immutable coordinate axis value.
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

impl<T> IndexMut<Axis> for Vector3<T> {
    /// Index the vector by an axis to get a mutable coordinate axis value.
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

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
#[macro_use]
mod tests {
    use super::*;
    use float_cmp::*;
    use proptest::prelude::*;

    #[test]
    fn zero_vector() {
        assert!(Vector3::new(0, 0, 0) == Vector3::zero());
        assert!(Vector3::new(0.0, 0.0, 0.0) == Vector3f::ZERO);
    }

    #[test]
    fn has_nans() {
        assert!(!Vector3::new(0.0, 0.0, 0.0).has_nans());
        assert!(Vector3::new(0.0, f32::NAN, 0.0).has_nans());
    }

    #[test]
    fn normalize_or_zero_of_tiny_vector_returns_zero() {
        let v = Vector3::new(1e-6, 0.0, 0.0);
        assert_eq!(v.normalize_or_zero(1e-3), Vector3f::ZERO);
    }

    // Define some properties for tests.
    prop_range!(range_f32, f32, -100.0..100.0f32);

    prop_vector3!(
        vector3_f32,
        f32,
        -100.0..100.0f32,
        -100.0..100.0f32,
        -100.0..100.0f32
    );

    proptest! {
        #[test]
        fn length_squared_f32(v in vector3_f32()) {
            prop_assert_eq!(v.length_squared(), v.x * v.x + v.y * v.y + v.z * v.z);
        }

        #[test]
        fn normalize_f32(v in vector3_f32().prop_filter("non-zero", |v| v.length() > 0.01)) {
            prop_assert!(approx_eq!(f32, v.normalize().length(), 1.0, epsilon = 0.0001));
        }

        #[test]
        fn cross_is_orthogonal_f32(
            v1 in vector3_f32().prop_map(|v| v / 100.0),
            v2 in vector3_f32().prop_map(|v| v / 100.0),
        ) {
            let c = v1.cross(&v2);
            prop_assert!(approx_eq!(f32, c.dot(&v1), 0.0, epsilon = 0.001));
            prop_assert!(approx_eq!(f32, c.dot(&v2), 0.0, epsilon = 0.001));
        }

        #[test]
        fn mul_f32(v in vector3_f32(), f in range_f32()) {
            let expected = Vector3::new(v.x * f, v.y * f, v.z * f);
            prop_assert_eq!(v * f, expected);
            prop_assert_eq!(f * v, expected);
        }

        #[test]
        fn neg_f32(v in vector3_f32()) {
            prop_assert_eq!(-v, Vector3::new(-v.x, -v.y, -v.z));
            prop_assert_eq!(--v, v);
        }

        #[test]
        fn index_mut_f32(v in vector3_f32()) {
            let mut v1 = Vector3::new(-200.0, 200.0, -200.0);
            v1[Axis::X] = v.x;
            v1[Axis::Y] = v.y;
            v1[Axis::Z] = v.z;
            prop_assert_eq!(v1, v);
        }
    }
}
