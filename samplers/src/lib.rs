//! Samplers

#[macro_use]
extern crate log;

mod evaluator;
mod floor;
mod voxel;

// Re-export.
pub use evaluator::*;
pub use floor::*;
pub use voxel::*;
