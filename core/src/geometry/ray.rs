//! Rays

use super::{Point3f, Vector3f};
use crate::math::*;
use std::fmt::{Debug, Formatter, Result};

/// A Ray
#[derive(Copy, Clone)]
pub struct Ray {
    /// Origin.
    pub o: Point3f,

    /// Direction.
    pub d: Vector3f,

    /// Maximum extent of the ray.
    pub t_max: Float,
}

impl Ray {
    /// Returns a new ray.
    ///
    /// * `o`      - Origin.
    /// * `d`      - Direction.
    /// * `t_max`  - Maximum extent of the ray.
    pub fn new(o: Point3f, d: Vector3f, t_max: Float) -> Self {
        Self { o, d, t_max }
    }

    /// Returns a ray with a unit direction from `from` towards `to` whose
    /// `t_max` is the distance between the two points. The direction is zero
    /// when the points coincide.
    ///
    /// * `from` - Start point.
    /// * `to`   - End point.
    pub fn between(from: &Point3f, to: &Point3f) -> Self {
        let d = *to - *from;
        let t_max = d.length();
        let d = if t_max > 0.0 { d / t_max } else { Vector3f::ZERO };
        Self::new(*from, d, t_max)
    }

    /// Returns true if either coordinate is NaN.
    pub fn has_nans(&self) -> bool {
        self.o.has_nans() || self.d.has_nans() || self.t_max.is_nan()
    }

    /// Get position along the ray at given parameter.
    ///
    /// * `t` - Parameter to evaluate.
    pub fn at(&self, t: Float) -> Point3f {
        self.o + self.d * t
    }
}

impl Debug for Ray {
    /// Display the ray parameters.
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.debug_struct("Ray")
            .field("o", &self.o)
            .field("d", &self.d)
            .field("t_max", &self.t_max)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
#[macro_use]
mod tests {
    use super::super::{Point3, Vector3};
    use super::*;
    use float_cmp::*;
    use proptest::prelude::*;

    #[test]
    fn has_nans() {
        let nan_point = Point3::new(f32::NAN, f32::NAN, f32::NAN);
        let nan_vector = Vector3::new(f32::NAN, f32::NAN, f32::NAN);
        let point = Point3::new(0.0, 0.0, 0.0);
        let vector = Vector3::new(1.0, 0.0, 0.0);

        assert!(Ray::new(nan_point, vector, 0.0).has_nans());
        assert!(Ray::new(point, nan_vector, 0.0).has_nans());
        assert!(Ray::new(point, vector, f32::NAN).has_nans());
        assert!(!Ray::new(point, vector, 0.0).has_nans());
    }

    #[test]
    fn at() {
        let o = Point3::new(0.0, 0.0, 0.0);
        let d = Vector3::new(1.0, 1.0, 1.0);
        let r = Ray::new(o, d, INFINITY);
        assert!(r.at(0.0) == o);
        assert!(r.at(1.0) == Point3::from(d));
    }

    #[test]
    fn between_coincident_points_has_zero_length() {
        let p = Point3::new(1.0, 2.0, 3.0);
        let r = Ray::between(&p, &p);
        assert_eq!(r.t_max, 0.0);
        assert_eq!(r.d, Vector3f::ZERO);
    }

    prop_point3!(
        point3_f32,
        f32,
        -100.0..100.0f32,
        -100.0..100.0f32,
        -100.0..100.0f32
    );

    proptest! {
        #[test]
        fn between_reaches_end_point(p1 in point3_f32(), p2 in point3_f32()) {
            prop_assume!(p1.distance(&p2) > 0.01);
            let r = Ray::between(&p1, &p2);
            let end = r.at(r.t_max);
            prop_assert!(approx_eq!(f32, end.x, p2.x, epsilon = 0.001));
            prop_assert!(approx_eq!(f32, end.y, p2.y, epsilon = 0.001));
            prop_assert!(approx_eq!(f32, end.z, p2.z, epsilon = 0.001));
        }
    }
}
