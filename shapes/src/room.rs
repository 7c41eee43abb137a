//! Room geometry for display.

use crate::cuboid::*;
use wavemap_core::geometry::*;
use wavemap_core::math::*;
use wavemap_core::scene::*;

/// Display thickness of walls; occlusion treats walls as infinitely thin.
pub const WALL_THICKNESS: Float = 0.1;

/// Render meshes for the obstacles and floor of a room.
#[derive(Clone, Debug, PartialEq)]
pub struct RoomGeometry {
    /// One mesh per box obstacle, in scene order.
    pub boxes: Vec<BoxMesh>,

    /// One mesh per non-degenerate wall, in scene order.
    pub walls: Vec<BoxMesh>,

    /// Floor spanning the room bounds.
    pub floor: FloorQuad,
}

/// Builds `RoomGeometry` from a scene.
#[derive(Copy, Clone, Debug)]
pub struct RoomGeometryBuilder {
    /// Display thickness of walls.
    wall_thickness: Float,
}

impl Default for RoomGeometryBuilder {
    fn default() -> Self {
        Self {
            wall_thickness: WALL_THICKNESS,
        }
    }
}

impl RoomGeometryBuilder {
    /// Returns a builder with the default wall thickness.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the display thickness of walls.
    ///
    /// * `wall_thickness` - Thickness in world units.
    pub fn with_wall_thickness(mut self, wall_thickness: Float) -> Self {
        self.wall_thickness = wall_thickness;
        self
    }

    /// Builds box meshes for every obstacle and a floor quad.
    ///
    /// * `scene`  - Obstacles.
    /// * `bounds` - Room bounds.
    pub fn build(&self, scene: &Scene, bounds: &Bounds3f) -> RoomGeometry {
        let boxes: Vec<BoxMesh> = scene
            .boxes
            .iter()
            .map(|b| BoxMesh::from_bounds(&b.bounds))
            .collect();

        let mut walls = Vec::with_capacity(scene.walls.len());
        for (i, wall) in scene.walls.iter().enumerate() {
            if wall.is_degenerate() {
                debug!("Skipping degenerate wall {}", i);
                continue;
            }
            walls.push(self.wall_mesh(wall));
        }

        debug!(
            "Room geometry: {} boxes, {} walls",
            boxes.len(),
            walls.len()
        );
        RoomGeometry {
            boxes,
            walls,
            floor: FloorQuad::from_bounds(bounds),
        }
    }

    /// Returns the wall slab centered on the wall plane.
    fn wall_mesh(&self, wall: &Wall) -> BoxMesh {
        let (a, b) = (wall.corner_a, wall.corner_b);
        let n = wall.horizontal_normal();
        let y0 = min(a.y, b.y);
        let origin = Point3f::new(a.x, y0, a.z) - n * (0.5 * self.wall_thickness);
        BoxMesh::from_edges(
            origin,
            Vector3f::new(b.x - a.x, 0.0, b.z - a.z),
            Vector3f::new(0.0, wall.height(), 0.0),
            n * self.wall_thickness,
        )
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
