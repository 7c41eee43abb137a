//! Signal sources.

use crate::geometry::Point3f;
use crate::math::Float;

/// A point emitter. `intensity` is a characteristic range in world units: the
/// distance at which unobstructed density drops to one quarter.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Source {
    /// Position of the emitter.
    pub position: Point3f,

    /// Characteristic range.
    pub intensity: Float,
}

impl Source {
    /// Creates a new source.
    ///
    /// * `position`  - Position of the emitter.
    /// * `intensity` - Characteristic range, must be positive.
    pub fn new(position: Point3f, intensity: Float) -> Self {
        Self { position, intensity }
    }
}
