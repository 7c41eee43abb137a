//! Occluders: furniture boxes and wall quads.

use crate::geometry::{Bounds3f, Point3f, Vector3f};
use crate::math::*;
use crate::propagation::OCCLUSION_EPSILON;

/// An axis aligned furniture box.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb {
    /// Box extents.
    pub bounds: Bounds3f,
}

impl Aabb {
    /// Creates a box from two opposite corners in any order.
    ///
    /// * `p1` - First corner.
    /// * `p2` - Second corner.
    pub fn new(p1: Point3f, p2: Point3f) -> Self {
        Self {
            bounds: Bounds3f::new(p1, p2),
        }
    }
}

/// A vertical rectangular wall spanned by two opposite corners. `corner_a`
/// and `corner_b` differ in height and in at least one horizontal coordinate.
/// Occlusion treats the wall as an infinitely thin quad.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Wall {
    /// First corner.
    pub corner_a: Point3f,

    /// Opposite corner.
    pub corner_b: Point3f,
}

impl Wall {
    /// Creates a new wall.
    ///
    /// * `corner_a` - First corner.
    /// * `corner_b` - Opposite corner.
    pub fn new(corner_a: Point3f, corner_b: Point3f) -> Self {
        Self { corner_a, corner_b }
    }

    /// Returns the quad vertices in winding order:
    /// `a`, `a` moved horizontally to `b`, `b`, `b` moved horizontally to `a`.
    pub fn vertices(&self) -> [Point3f; 4] {
        let a = self.corner_a;
        let b = self.corner_b;
        [
            a,
            Point3f::new(b.x, a.y, b.z),
            b,
            Point3f::new(a.x, b.y, a.z),
        ]
    }

    /// Returns the horizontal length of the wall.
    pub fn length(&self) -> Float {
        let d = self.corner_b - self.corner_a;
        (d.x * d.x + d.z * d.z).sqrt()
    }

    /// Returns the height of the wall.
    pub fn height(&self) -> Float {
        abs(self.corner_b.y - self.corner_a.y)
    }

    /// Returns the unit horizontal normal of the wall plane, or zero for a
    /// zero-length wall.
    pub fn horizontal_normal(&self) -> Vector3f {
        let d = self.corner_b - self.corner_a;
        Vector3f::new(-d.z, 0.0, d.x).normalize_or_zero(OCCLUSION_EPSILON)
    }

    /// Returns true when the wall spans no area.
    pub fn is_degenerate(&self) -> bool {
        self.length() < OCCLUSION_EPSILON || self.height() < OCCLUSION_EPSILON
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
