//! Box and quad render meshes.

use wavemap_core::geometry::*;
use wavemap_core::math::*;

/// Corner choices `(a, b, c)` along the three edge vectors for each face,
/// starting with the face whose normal points along `-u`.
const FACES: [[[usize; 3]; 4]; 6] = [
    [[0, 0, 0], [0, 0, 1], [0, 1, 1], [0, 1, 0]],
    [[1, 0, 0], [1, 1, 0], [1, 1, 1], [1, 0, 1]],
    [[0, 0, 0], [1, 0, 0], [1, 0, 1], [0, 0, 1]],
    [[0, 1, 0], [0, 1, 1], [1, 1, 1], [1, 1, 0]],
    [[0, 0, 0], [0, 1, 0], [1, 1, 0], [1, 0, 0]],
    [[0, 0, 1], [1, 0, 1], [1, 1, 1], [0, 1, 1]],
];

/// A closed box with flat per-face normals: 24 vertices (4 per face) and 36
/// indices (2 triangles per face), counter-clockwise seen from outside.
#[derive(Clone, Debug, PartialEq)]
pub struct BoxMesh {
    /// Vertex positions.
    pub positions: Vec<Point3f>,

    /// Vertex normals.
    pub normals: Vec<Vector3f>,

    /// Triangle vertex indices.
    pub indices: Vec<u32>,
}

impl BoxMesh {
    /// Returns an axis aligned box mesh.
    ///
    /// * `bounds` - Box extents.
    pub fn from_bounds(bounds: &Bounds3f) -> Self {
        let d = bounds.diagonal();
        Self::from_edges(
            bounds.p_min,
            Vector3f::new(d.x, 0.0, 0.0),
            Vector3f::new(0.0, d.y, 0.0),
            Vector3f::new(0.0, 0.0, d.z),
        )
    }

    /// Returns the mesh of the parallelepiped spanned by three edge vectors
    /// from an origin corner. The edge vectors must be linearly independent.
    ///
    /// * `origin` - Corner.
    /// * `u`      - First edge.
    /// * `v`      - Second edge.
    /// * `w`      - Third edge.
    pub fn from_edges(origin: Point3f, u: Vector3f, v: Vector3f, w: Vector3f) -> Self {
        let center = origin + (u + v + w) * 0.5;
        let corner = |c: &[usize; 3]| {
            origin + u * c[0] as Float + v * c[1] as Float + w * c[2] as Float
        };

        let mut positions = Vec::with_capacity(24);
        let mut normals = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for face in FACES.iter() {
            let mut quad = [
                corner(&face[0]),
                corner(&face[1]),
                corner(&face[2]),
                corner(&face[3]),
            ];
            let mut n = (quad[1] - quad[0]).cross(&(quad[2] - quad[0])).normalize();
            // Face must wind counter-clockwise seen from outside.
            if n.dot(&(quad[0] - center)) < 0.0 {
                quad.reverse();
                n = -n;
            }

            let base = positions.len() as u32;
            for p in quad {
                positions.push(p);
                normals.push(n);
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self {
            positions,
            normals,
            indices,
        }
    }
}

/// A single upward facing quad: 4 vertices and 6 indices.
#[derive(Clone, Debug, PartialEq)]
pub struct FloorQuad {
    /// Vertex positions.
    pub positions: [Point3f; 4],

    /// Shared normal.
    pub normal: Vector3f,

    /// Triangle vertex indices.
    pub indices: [u32; 6],
}

impl FloorQuad {
    /// Returns the quad covering the x/z extent of `bounds` at its lowest
    /// height.
    ///
    /// * `bounds` - Room bounds.
    pub fn from_bounds(bounds: &Bounds3f) -> Self {
        let (lo, hi) = (bounds.p_min, bounds.p_max);
        Self {
            positions: [
                Point3f::new(lo.x, lo.y, lo.z),
                Point3f::new(lo.x, lo.y, hi.z),
                Point3f::new(hi.x, lo.y, hi.z),
                Point3f::new(hi.x, lo.y, lo.z),
            ],
            normal: Vector3f::new(0.0, 1.0, 0.0),
            indices: [0, 1, 2, 0, 2, 3],
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
