//! Geometry

#[macro_use]
extern crate log;

mod cuboid;
mod room;

// Re-export
pub use cuboid::*;
pub use room::*;
