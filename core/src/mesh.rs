//! Isosurface triangle mesh.

use crate::color::Rgb;
use crate::geometry::*;
use crate::math::*;
use bitflags::bitflags;

bitflags! {
    /// Stores combination of flags for the per-vertex attributes a mesh holds.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct MeshAttributes: u8 {
        /// Per-vertex normals.
        const NORMALS = 1;
        /// Per-vertex colors.
        const COLORS = 2;
        /// Normals and colors are averaged per triangle.
        const FLAT = 4;
    }
}

/// A mesh vertex before it is stored.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct MeshVertex {
    /// Position.
    pub position: Point3f,

    /// Unit normal pointing away from higher density.
    pub normal: Vector3f,

    /// Color; ignored unless the mesh stores colors.
    pub color: Rgb,
}

/// Triangle soup with three consecutive vertices per triangle, bounded by a
/// triangle budget.
#[derive(Clone, Debug, PartialEq)]
pub struct IsosurfaceMesh {
    /// Vertex positions.
    pub positions: Vec<Point3f>,

    /// Vertex normals, parallel to `positions`.
    pub normals: Vec<Vector3f>,

    /// Vertex colors, parallel to `positions` when present.
    pub colors: Option<Vec<Rgb>>,

    /// Attributes stored.
    attributes: MeshAttributes,

    /// Triangle budget.
    max_triangles: usize,

    /// True once a triangle was rejected for exceeding the budget.
    truncated: bool,
}

impl IsosurfaceMesh {
    /// Create a new empty mesh.
    ///
    /// * `max_triangles` - Triangle budget.
    /// * `attributes`    - Attributes to store.
    pub fn new(max_triangles: usize, attributes: MeshAttributes) -> Self {
        let colors = if attributes.contains(MeshAttributes::COLORS) {
            Some(vec![])
        } else {
            None
        };
        Self {
            positions: vec![],
            normals: vec![],
            colors,
            attributes,
            max_triangles,
            truncated: false,
        }
    }

    /// Returns the attributes stored.
    pub fn attributes(&self) -> MeshAttributes {
        self.attributes
    }

    /// Returns the triangle budget.
    pub fn max_triangles(&self) -> usize {
        self.max_triangles
    }

    /// Returns the number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Returns true if the mesh has no triangles.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Returns true if triangles were dropped for exceeding the budget.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Returns the vertices of triangle `i`.
    ///
    /// * `i` - Triangle index.
    pub fn triangle(&self, i: usize) -> [Point3f; 3] {
        [
            self.positions[3 * i],
            self.positions[3 * i + 1],
            self.positions[3 * i + 2],
        ]
    }

    /// Returns the bounds of all vertices, or `None` for an empty mesh.
    pub fn bounds(&self) -> Option<Bounds3f> {
        let (first, rest) = self.positions.split_first()?;
        Some(
            rest.iter()
                .fold(Bounds3f::from(*first), |b, p| b.union_point(p)),
        )
    }

    /// Appends a triangle. Returns false and marks the mesh truncated when the
    /// budget is already used up.
    ///
    /// * `vertices` - Triangle vertices in counter-clockwise order seen from
    ///                the side the normals point to.
    pub fn push_triangle(&mut self, vertices: &[MeshVertex; 3]) -> bool {
        if self.triangle_count() >= self.max_triangles {
            self.truncated = true;
            return false;
        }

        if self.attributes.contains(MeshAttributes::FLAT) {
            let n = (vertices[0].normal + vertices[1].normal + vertices[2].normal)
                .normalize_or_zero(1e-12);
            let c = (vertices[0].color + vertices[1].color + vertices[2].color) / 3.0;
            for v in vertices {
                self.push_vertex(v.position, n, c);
            }
        } else {
            for v in vertices {
                self.push_vertex(v.position, v.normal, v.color);
            }
        }
        true
    }

    fn push_vertex(&mut self, position: Point3f, normal: Vector3f, color: Rgb) {
        self.positions.push(position);
        self.normals.push(normal);
        if let Some(colors) = self.colors.as_mut() {
            colors.push(color);
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(x: Float, nx: Float, r: Float) -> MeshVertex {
        MeshVertex {
            position: Point3f::new(x, 0.0, 0.0),
            normal: Vector3f::new(nx, 1.0, 0.0).normalize(),
            color: Rgb::new(r, 0.0, 0.0),
        }
    }

    fn triangle() -> [MeshVertex; 3] {
        [vertex(0.0, 0.0, 0.0), vertex(1.0, 1.0, 0.3), vertex(2.0, -1.0, 0.6)]
    }

    #[test]
    fn budget_stops_emission() {
        let mut m = IsosurfaceMesh::new(2, MeshAttributes::NORMALS);
        assert!(m.push_triangle(&triangle()));
        assert!(m.push_triangle(&triangle()));
        assert!(!m.is_truncated());
        assert!(!m.push_triangle(&triangle()));
        assert!(m.is_truncated());
        assert_eq!(m.triangle_count(), 2);
        assert_eq!(m.positions.len(), 6);
        assert_eq!(m.normals.len(), 6);
        assert!(m.colors.is_none());
    }

    #[test]
    fn zero_budget_yields_empty_truncated_mesh() {
        let mut m = IsosurfaceMesh::new(0, MeshAttributes::NORMALS);
        assert!(!m.push_triangle(&triangle()));
        assert!(m.is_empty());
        assert!(m.is_truncated());
        assert_eq!(m.bounds(), None);
    }

    #[test]
    fn smooth_keeps_vertex_attributes() {
        let mut m = IsosurfaceMesh::new(10, MeshAttributes::NORMALS | MeshAttributes::COLORS);
        let t = triangle();
        m.push_triangle(&t);
        assert_eq!(m.normals[1], t[1].normal);
        assert_eq!(m.colors.as_ref().map(|c| c[2]), Some(t[2].color));
    }

    #[test]
    fn flat_averages_per_triangle() {
        let attributes = MeshAttributes::NORMALS | MeshAttributes::COLORS | MeshAttributes::FLAT;
        let mut m = IsosurfaceMesh::new(10, attributes);
        m.push_triangle(&triangle());
        assert_eq!(m.normals[0], m.normals[1]);
        assert_eq!(m.normals[1], m.normals[2]);
        assert!((m.normals[0].length() - 1.0).abs() < 1e-5);
        assert!(m.normals[0].y > 0.99);
        let colors = m.colors.as_ref().map(|c| c.clone()).unwrap_or_default();
        assert_eq!(colors.len(), 3);
        assert!((colors[0].r - 0.3).abs() < 1e-5);
    }

    #[test]
    fn bounds_cover_all_vertices() {
        let mut m = IsosurfaceMesh::new(10, MeshAttributes::NORMALS);
        m.push_triangle(&triangle());
        assert_eq!(
            m.bounds(),
            Some(Bounds3f::new(Point3f::ZERO, Point3f::new(2.0, 0.0, 0.0)))
        );
        assert_eq!(m.triangle(0)[2], Point3f::new(2.0, 0.0, 0.0));
    }
}
