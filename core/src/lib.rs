//! Core

#[macro_use]
extern crate log;

#[macro_use]
pub mod geometry;
pub mod color;
pub mod config;
pub mod error;
pub mod math;
pub mod mesh;
pub mod propagation;
pub mod scene;
pub mod volume;

// Re-export.
pub use config::{Configuration, FieldMode, Options, SamplingConfig, Shading, Validated};
pub use error::{EntryKind, Error, Warning};
