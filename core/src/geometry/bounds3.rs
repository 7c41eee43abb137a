//! 3-D Axis Aligned Bounding Boxes.

use super::{Point3, Point3f, Ray, Vector3, Vector3f};
use crate::math::*;
use num_traits::Num;
use std::fmt;
use std::ops::Index;

/// 3-D Axis Aligned Bounding Box.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Bounds3<T> {
    /// Minimum bounds.
    pub p_min: Point3<T>,

    /// Maximum bounds.
    pub p_max: Point3<T>,
}

/// 3-D bounding box containing `Float` points.
pub type Bounds3f = Bounds3<Float>;

impl<T: Num + PartialOrd + Copy> From<Point3<T>> for Bounds3<T> {
    /// Use a 3-D point as minimum and maximum 3-D bounds.
    ///
    /// * `p` - 3-D point.
    fn from(p: Point3<T>) -> Self {
        Self { p_min: p, p_max: p }
    }
}

impl<T: Num + PartialOrd + Copy> Bounds3<T> {
    /// Creates a new 3-D bounding box from 2 points. The minimum and maximum
    /// bounds are used for each coordinate axis.
    ///
    /// * `p1` - First point.
    /// * `p2` - Second point.
    pub fn new(p1: Point3<T>, p2: Point3<T>) -> Self {
        Self {
            p_min: p1.min(&p2),
            p_max: p1.max(&p2),
        }
    }

    /// Returns the vector along the box diagonal from the minimum point to
    /// the maximum point.
    pub fn diagonal(&self) -> Vector3<T> {
        self.p_max - self.p_min
    }

    /// Returns the volume of the bounding box.
    pub fn volume(&self) -> T {
        let d = self.diagonal();
        d.x * d.y * d.z
    }

    /// Returns true if a point is inside the bounding box.
    ///
    /// * `p` - The point.
    pub fn contains(&self, p: &Point3<T>) -> bool {
        (p.x >= self.p_min.x && p.x <= self.p_max.x)
            && (p.y >= self.p_min.y && p.y <= self.p_max.y)
            && (p.z >= self.p_min.z && p.z <= self.p_max.z)
    }

    /// Returns the smallest bounding box containing this one and a point.
    ///
    /// * `p` - The point.
    pub fn union_point(&self, p: &Point3<T>) -> Self {
        Self {
            p_min: self.p_min.min(p),
            p_max: self.p_max.max(p),
        }
    }

    /// Returns the coordinates of one of the eight corners of the bounding box.
    /// Bit 0 selects x, bit 1 selects y and bit 2 selects z.
    ///
    /// * `corner` - Corner index in 0..8.
    pub fn corner(&self, corner: usize) -> Point3<T> {
        Point3::new(
            self[corner & 1].x,
            self[if corner & 2 != 0 { 1 } else { 0 }].y,
            self[if corner & 4 != 0 { 1 } else { 0 }].z,
        )
    }
}

impl Bounds3f {
    /// Returns true when any extent of the box is below `epsilon`.
    ///
    /// * `epsilon` - Smallest extent considered non-degenerate.
    pub fn is_degenerate(&self, epsilon: Float) -> bool {
        self.diagonal().min_component() < epsilon
    }

    /// Returns the continuous position of a point relative to the corners of the
    /// box, where a point at the minimum corner has offset `(0, 0, 0)` and a
    /// point at the maximum corner has offset is `(1, 1, 1)`.
    ///
    /// * `p` - The point.
    pub fn offset(&self, p: &Point3f) -> Vector3f {
        let mut o = *p - self.p_min;
        let d = self.diagonal();
        for axis in Axis::ALL {
            if d[axis] > 0.0 {
                o[axis] /= d[axis];
            }
        }
        o
    }

    /// Linearly interpolates between the corners of the box by the given amount
    /// in each dimension.
    ///
    /// * `t` - The interpolation parameter in x, y and z directions.
    pub fn lerp(&self, t: &Vector3f) -> Point3f {
        Point3::new(
            lerp(t.x, self.p_min.x, self.p_max.x),
            lerp(t.y, self.p_min.y, self.p_max.y),
            lerp(t.z, self.p_min.z, self.p_max.z),
        )
    }

    /// Returns the center of the box.
    pub fn center(&self) -> Point3f {
        self.lerp(&Vector3::new(0.5, 0.5, 0.5))
    }

    /// Slab test against a ray. Returns the parametric range `[t0, t1]` of the
    /// ray that overlaps the box, clipped to `[0, ray.t_max]`.
    ///
    /// * `ray` - The ray.
    pub fn intersect_p(&self, ray: &Ray) -> Option<(Float, Float)> {
        let mut t0 = 0.0;
        let mut t1 = ray.t_max;
        for axis in Axis::ALL {
            // Update interval for the slab of this axis. A zero direction
            // component yields +/- infinity (or NaN on the slab plane), which
            // the comparisons below leave untouched.
            let inv_ray_dir = 1.0 / ray.d[axis];
            let mut t_near = (self.p_min[axis] - ray.o[axis]) * inv_ray_dir;
            let mut t_far = (self.p_max[axis] - ray.o[axis]) * inv_ray_dir;
            if t_near > t_far {
                std::mem::swap(&mut t_near, &mut t_far);
            }

            if t_near > t0 {
                t0 = t_near;
            }
            if t_far < t1 {
                t1 = t_far;
            }
            if t0 > t1 {
                return None;
            }
        }
        Some((t0, t1))
    }
}

impl<T> Index<usize> for Bounds3<T> {
    type Output = Point3<T>;

    /// Index the minimum and maximum bounds.
    ///
    /// * `i` - 0 = minimum, 1 = maximum.
    fn index(&self, i: usize) -> &Self::Output {
        match i {
            0 => &self.p_min,
            1 => &self.p_max,
            _ => panic!("invalid index into bounds"),
        }
    }
}

impl fmt::Display for Bounds3f {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[({}, {}, {}) - ({}, {}, {})]",
            self.p_min.x, self.p_min.y, self.p_min.z, self.p_max.x, self.p_max.y, self.p_max.z
        )
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
