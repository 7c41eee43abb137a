//! Scene description: signal sources and the obstacles occluding them.

mod obstacle;
mod source;

// Re-export
pub use obstacle::*;
pub use source::*;

use crate::geometry::Point3f;
use crate::propagation::{density, FieldSample};

/// The set of emitters and occluders a configuration evaluates.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scene {
    /// Ordered sources. The position in this list is the source identity.
    pub sources: Vec<Source>,

    /// Furniture-like boxes.
    pub boxes: Vec<Aabb>,

    /// Wall quads.
    pub walls: Vec<Wall>,
}

impl Scene {
    /// Returns an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a source.
    ///
    /// * `source` - The source.
    pub fn with_source(mut self, source: Source) -> Self {
        self.sources.push(source);
        self
    }

    /// Adds a box obstacle.
    ///
    /// * `aabb` - The box.
    pub fn with_box(mut self, aabb: Aabb) -> Self {
        self.boxes.push(aabb);
        self
    }

    /// Adds a wall obstacle.
    ///
    /// * `wall` - The wall.
    pub fn with_wall(mut self, wall: Wall) -> Self {
        self.walls.push(wall);
        self
    }

    /// Evaluates the propagation model at a point. This is the per-point entry
    /// used by floor shading; volume sampling calls the same function.
    ///
    /// * `p` - The point.
    pub fn density_at(&self, p: &Point3f) -> FieldSample {
        density(p, &self.sources, &self.boxes, &self.walls)
    }
}
