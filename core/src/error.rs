//! Error and warning types.
//!
//! Errors reject a configuration before any evaluation starts. Warnings
//! describe inputs that were clamped or outputs that were truncated; they are
//! logged and handed to the caller alongside a still valid result.

use crate::geometry::Bounds3f;
use crate::math::{Axis, Float};
use std::fmt;

/// Kinds of configuration entries that have compiled-in capacity limits.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EntryKind {
    /// Signal sources.
    Source,
    /// Axis aligned furniture boxes.
    Box,
    /// Wall quads.
    Wall,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::Source => write!(f, "sources"),
            EntryKind::Box => write!(f, "boxes"),
            EntryKind::Wall => write!(f, "walls"),
        }
    }
}

/// Errors that reject a configuration or an export.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// More entries than the compiled-in limit.
    CapacityExceeded {
        kind: EntryKind,
        count: usize,
        limit: usize,
    },
    /// Requested grid has more nodes than the sampling budget allows.
    ResourceExhausted { nodes: usize, limit: usize },
    /// A grid dimension is too small to hold an interior cell.
    InvalidResolution { axis: Axis, value: usize },
    /// Room bounds are empty or not finite.
    InvalidBounds(Bounds3f),
    /// Writing an image failed.
    Image(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::CapacityExceeded { kind, count, limit } => {
                write!(f, "Too many {kind}: {count} exceeds the limit of {limit}")
            }
            Error::ResourceExhausted { nodes, limit } => {
                write!(f, "Sampling grid has {nodes} nodes, budget is {limit}")
            }
            Error::InvalidResolution { axis, value } => {
                write!(f, "Resolution {value} along {axis} is below the minimum of 3")
            }
            Error::InvalidBounds(b) => write!(f, "Room bounds {b} are empty or not finite"),
            Error::Image(msg) => write!(f, "Failed to write image: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

/// Non fatal conditions surfaced to the caller.
#[derive(Clone, Debug, PartialEq)]
pub enum Warning {
    /// Source intensity was not positive (or too small) and got clamped.
    DegenerateSource { index: usize, intensity: Float },
    /// Box had a zero extent and got inflated.
    DegenerateBox { index: usize },
    /// Wall had zero length or height and is ignored for occlusion.
    DegenerateWall { index: usize },
    /// Isosurface extraction hit the triangle budget.
    MeshBudgetExceeded { limit: usize },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::DegenerateSource { index, intensity } => {
                write!(f, "Source {index} intensity {intensity} is below the minimum; clamped")
            }
            Warning::DegenerateBox { index } => write!(f, "Box {index} has zero size; inflated"),
            Warning::DegenerateWall { index } => {
                write!(f, "Wall {index} has zero length or height; ignored")
            }
            Warning::MeshBudgetExceeded { limit } => {
                write!(f, "Isosurface needs more than {limit} triangles; mesh truncated")
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
