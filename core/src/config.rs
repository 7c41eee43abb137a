//! Configuration values and validation.
//!
//! A `Configuration` is an immutable description of one coverage request:
//! the scene plus how to sample it. Callers build one with the `with_*`
//! methods, then `validate` it once before any evaluation. Validation rejects
//! inputs that cannot be evaluated and sanitizes the ones that can, returning
//! the warnings it produced.

use crate::error::*;
use crate::geometry::*;
use crate::math::*;
use crate::propagation::MIN_INTENSITY;
use crate::scene::*;

/// Maximum number of sources.
pub const MAX_SOURCES: usize = 8;

/// Maximum number of box obstacles.
pub const MAX_BOXES: usize = 32;

/// Maximum number of wall obstacles.
pub const MAX_WALLS: usize = 32;

/// Smallest grid dimension that still has an interior cell.
pub const MIN_RESOLUTION: usize = 3;

/// Extent a degenerate box is inflated to along its empty axes.
pub const MIN_EXTENT: Float = 1e-3;

/// Default triangle budget for isosurface extraction.
pub const DEFAULT_MAX_TRIANGLES: usize = 20_000;

/// Default budget of grid nodes per sampling pass.
pub const DEFAULT_MAX_NODES: usize = 1 << 22;

/// Which field drives per-node and per-pixel colors.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum FieldMode {
    /// Heat map of the density.
    #[default]
    Density,

    /// Hue of the strongest source.
    DominantSource,
}

/// Isosurface normal and color interpolation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Shading {
    /// Per-vertex normals and colors interpolated from the grid.
    #[default]
    Smooth,

    /// One normal and color per triangle.
    Flat,
}

/// How to sample a scene and extract its isosurface.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SamplingConfig {
    /// Number of grid nodes along x and z.
    pub resolution_xz: usize,

    /// Number of grid nodes along y.
    pub resolution_y: usize,

    /// Room bounds covered by the grid.
    pub bounds: Bounds3f,

    /// Density level of the isosurface.
    pub isovalue: Float,

    /// Field used for colors.
    pub mode: FieldMode,

    /// Isosurface shading.
    pub shading: Shading,

    /// Compute per-node colors.
    pub colors: bool,

    /// Triangle budget for extraction.
    pub max_triangles: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            resolution_xz: 32,
            resolution_y: 16,
            bounds: Bounds3f::new(Point3f::new(-5.0, 0.0, -5.0), Point3f::new(5.0, 3.0, 5.0)),
            isovalue: 0.5,
            mode: FieldMode::Density,
            shading: Shading::Smooth,
            colors: false,
            max_triangles: DEFAULT_MAX_TRIANGLES,
        }
    }
}

/// A complete coverage request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Configuration {
    /// Sources and obstacles.
    pub scene: Scene,

    /// Sampling and extraction parameters.
    pub sampling: SamplingConfig,
}

impl Configuration {
    /// Returns a configuration with an empty scene and default sampling.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the scene.
    ///
    /// * `scene` - The scene.
    pub fn with_scene(mut self, scene: Scene) -> Self {
        self.scene = scene;
        self
    }

    /// Adds a source.
    ///
    /// * `source` - The source.
    pub fn with_source(mut self, source: Source) -> Self {
        self.scene.sources.push(source);
        self
    }

    /// Adds a box obstacle.
    ///
    /// * `aabb` - The box.
    pub fn with_box(mut self, aabb: Aabb) -> Self {
        self.scene.boxes.push(aabb);
        self
    }

    /// Adds a wall obstacle.
    ///
    /// * `wall` - The wall.
    pub fn with_wall(mut self, wall: Wall) -> Self {
        self.scene.walls.push(wall);
        self
    }

    /// Sets grid resolution.
    ///
    /// * `resolution_xz` - Nodes along x and z.
    /// * `resolution_y`  - Nodes along y.
    pub fn with_resolution(mut self, resolution_xz: usize, resolution_y: usize) -> Self {
        self.sampling.resolution_xz = resolution_xz;
        self.sampling.resolution_y = resolution_y;
        self
    }

    /// Sets room bounds.
    ///
    /// * `bounds` - The bounds.
    pub fn with_bounds(mut self, bounds: Bounds3f) -> Self {
        self.sampling.bounds = bounds;
        self
    }

    /// Sets the isovalue.
    ///
    /// * `isovalue` - Density level of the isosurface.
    pub fn with_isovalue(mut self, isovalue: Float) -> Self {
        self.sampling.isovalue = isovalue;
        self
    }

    /// Sets the color field.
    ///
    /// * `mode` - The field.
    pub fn with_mode(mut self, mode: FieldMode) -> Self {
        self.sampling.mode = mode;
        self
    }

    /// Sets isosurface shading.
    ///
    /// * `shading` - The shading.
    pub fn with_shading(mut self, shading: Shading) -> Self {
        self.sampling.shading = shading;
        self
    }

    /// Enables or disables per-node colors.
    ///
    /// * `colors` - True to compute colors.
    pub fn with_colors(mut self, colors: bool) -> Self {
        self.sampling.colors = colors;
        self
    }

    /// Sets the triangle budget.
    ///
    /// * `max_triangles` - The budget.
    pub fn with_max_triangles(mut self, max_triangles: usize) -> Self {
        self.sampling.max_triangles = max_triangles;
        self
    }

    /// Returns grid dimensions `(nx, ny, nz)`.
    pub fn dims(&self) -> (usize, usize, usize) {
        (
            self.sampling.resolution_xz,
            self.sampling.resolution_y,
            self.sampling.resolution_xz,
        )
    }

    /// Checks the configuration and returns a sanitized copy.
    ///
    /// Capacity, resolution, bounds and node budget violations are errors.
    /// Non-positive source intensities are clamped, zero-size boxes inflated
    /// and zero-area walls dropped; each of those yields a warning.
    ///
    /// * `options` - Evaluation options holding the node budget.
    pub fn validate(&self, options: &Options) -> Result<Validated, Error> {
        self.check_entries()?;

        let (nx, ny, nz) = self.dims();
        for (axis, value) in [(Axis::X, nx), (Axis::Y, ny), (Axis::Z, nz)] {
            if value < MIN_RESOLUTION {
                return Err(Error::InvalidResolution { axis, value });
            }
        }

        self.check_bounds()?;

        let nodes = nx.saturating_mul(ny).saturating_mul(nz);
        if nodes > options.max_nodes {
            return Err(Error::ResourceExhausted {
                nodes,
                limit: options.max_nodes,
            });
        }

        Ok(self.sanitize())
    }

    /// Checks and sanitizes only the scene and room bounds, ignoring the
    /// volume resolution and node budget. Used by per-point queries such as
    /// floor shading that never allocate a grid.
    pub fn validate_scene(&self) -> Result<Validated, Error> {
        self.check_entries()?;
        self.check_bounds()?;
        Ok(self.sanitize())
    }

    fn check_entries(&self) -> Result<(), Error> {
        check_capacity(EntryKind::Source, self.scene.sources.len(), MAX_SOURCES)?;
        check_capacity(EntryKind::Box, self.scene.boxes.len(), MAX_BOXES)?;
        check_capacity(EntryKind::Wall, self.scene.walls.len(), MAX_WALLS)
    }

    fn check_bounds(&self) -> Result<(), Error> {
        let b = self.sampling.bounds;
        let finite = [b.p_min, b.p_max]
            .iter()
            .all(|p| p.x.is_finite() && p.y.is_finite() && p.z.is_finite());
        if !finite || b.is_degenerate(MIN_EXTENT) {
            Err(Error::InvalidBounds(b))
        } else {
            Ok(())
        }
    }

    /// Clamps, inflates and drops degenerate scene entries.
    fn sanitize(&self) -> Validated {
        let mut warnings = vec![];
        let mut configuration = self.clone();

        for (index, source) in configuration.scene.sources.iter_mut().enumerate() {
            if !(source.intensity >= MIN_INTENSITY) {
                warn!("Source {} intensity {} clamped", index, source.intensity);
                warnings.push(Warning::DegenerateSource {
                    index,
                    intensity: source.intensity,
                });
                source.intensity = MIN_INTENSITY;
            }
        }

        for (index, aabb) in configuration.scene.boxes.iter_mut().enumerate() {
            if aabb.bounds.is_degenerate(MIN_EXTENT) {
                warn!("Box {} has zero size", index);
                warnings.push(Warning::DegenerateBox { index });
                *aabb = inflate(aabb);
            }
        }

        let walls = std::mem::take(&mut configuration.scene.walls);
        for (index, wall) in walls.into_iter().enumerate() {
            if wall.is_degenerate() {
                warn!("Wall {} is degenerate and ignored", index);
                warnings.push(Warning::DegenerateWall { index });
            } else {
                configuration.scene.walls.push(wall);
            }
        }

        Validated {
            configuration,
            warnings,
        }
    }
}

fn check_capacity(kind: EntryKind, count: usize, limit: usize) -> Result<(), Error> {
    if count > limit {
        error!("{} {} exceeds limit {}", count, kind, limit);
        Err(Error::CapacityExceeded { kind, count, limit })
    } else {
        Ok(())
    }
}

/// Grows empty axes of a box symmetrically to `MIN_EXTENT`.
fn inflate(aabb: &Aabb) -> Aabb {
    let mut p_min = aabb.bounds.p_min;
    let mut p_max = aabb.bounds.p_max;
    for axis in Axis::ALL {
        if p_max[axis] - p_min[axis] < MIN_EXTENT {
            let mid = 0.5 * (p_min[axis] + p_max[axis]);
            p_min[axis] = mid - 0.5 * MIN_EXTENT;
            p_max[axis] = mid + 0.5 * MIN_EXTENT;
        }
    }
    Aabb::new(p_min, p_max)
}

/// A configuration that passed validation together with the warnings
/// sanitizing it produced.
#[derive(Clone, Debug, PartialEq)]
pub struct Validated {
    /// Sanitized configuration.
    pub configuration: Configuration,

    /// Warnings in the order they were found.
    pub warnings: Vec<Warning>,
}

/// Evaluation options.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Options {
    /// Requested number of evaluator threads.
    pub n_threads: usize,

    /// Maximum grid nodes per sampling pass.
    pub max_nodes: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            n_threads: num_cpus::get(),
            max_nodes: DEFAULT_MAX_NODES,
        }
    }
}

impl Options {
    /// Returns options with the given thread count and default node budget.
    ///
    /// * `n_threads` - Requested number of threads.
    pub fn with_threads(n_threads: usize) -> Self {
        Self {
            n_threads,
            ..Self::default()
        }
    }

    /// Returns the number of threads to use.
    pub fn threads(&self) -> usize {
        let max_threads = num_cpus::get();
        match self.n_threads {
            0 => {
                warn!("Invalid nthreads");
                1
            }
            n if n > max_threads => {
                warn!("Num threads > max logical CPUs {}", max_threads);
                max_threads
            }
            n => n,
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
