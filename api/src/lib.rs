//! API

#[macro_use]
extern crate log;

mod pipeline;
mod service;

// Re-export.
pub use pipeline::*;
pub use service::*;
