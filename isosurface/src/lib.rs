//! Isosurface

#[macro_use]
extern crate log;

mod marching_cubes;
pub mod tables;

// Re-export.
pub use marching_cubes::*;
