//! Common

use num_traits::Num;
use std::ops::{Add, Mul, Neg};

/// Use 32-bit precision for floating point numbers.
pub type Float = f32;

/// Infinty (∞)
pub const INFINITY: Float = Float::INFINITY;

/// Returns the absolute value of a number.
///
/// * `n` - The number.
#[inline(always)]
pub fn abs<T>(n: T) -> T
where
    T: Num + Neg<Output = T> + PartialOrd + Copy,
{
    if n < T::zero() {
        -n
    } else {
        n
    }
}

/// Returns the minimum of 2 numbers.
///
/// * `a` - First number.
/// * `b` - Second number.
#[inline(always)]
pub fn min<T>(a: T, b: T) -> T
where
    T: Num + PartialOrd + Copy,
{
    if a < b {
        a
    } else {
        b
    }
}

/// Returns the maximum of 2 numbers.
///
/// * `a` - First number.
/// * `b` - Second number.
#[inline(always)]
pub fn max<T>(a: T, b: T) -> T
where
    T: Num + PartialOrd + Copy,
{
    if a > b {
        a
    } else {
        b
    }
}

/// Clamps a value to the range [min, max].
///
/// * `x`   - The value.
/// * `min` - Lower bound.
/// * `max` - Upper bound.
#[inline(always)]
pub fn clamp<T>(x: T, min: T, max: T) -> T
where
    T: Num + PartialOrd + Copy,
{
    if x < min {
        min
    } else if x > max {
        max
    } else {
        x
    }
}

/// Linearly interpolate between two points for parameters in [0, 1] and
/// extrapolate for parameters outside that interval.
///
/// * `t` - Parameter.
/// * `p0` - Point at t=0.
/// * `p1` - Point at t=1.
#[inline(always)]
pub fn lerp<P>(t: Float, p0: P, p1: P) -> P
where
    Float: Mul<P, Output = P>,
    P: Add<P, Output = P>,
{
    (1.0 - t) * p0 + t * p1
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::*;
    use proptest::prelude::*;

    #[test]
    fn clamp_returns_bounds_outside_range() {
        assert_eq!(clamp(-1.0, 0.0, 1.0), 0.0);
        assert_eq!(clamp(2.0, 0.0, 1.0), 1.0);
        assert_eq!(clamp(5, 0, 10), 5);
    }

    proptest! {
        #[test]
        fn lerp_hits_end_points(p0 in -100.0..100.0f32, p1 in -100.0..100.0f32) {
            prop_assert!(approx_eq!(f32, lerp(0.0, p0, p1), p0, epsilon = 0.0001));
            prop_assert!(approx_eq!(f32, lerp(1.0, p0, p1), p1, epsilon = 0.0001));
        }

        #[test]
        fn min_max_are_ordered(a in -100..100i32, b in -100..100i32) {
            prop_assert!(min(a, b) <= max(a, b));
            prop_assert_eq!(abs(a - b), max(a, b) - min(a, b));
        }
    }
}
