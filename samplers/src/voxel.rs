//! Voxel Sampler

use crate::evaluator::*;
use itertools::iproduct;
use std::time::Instant;
use wavemap_core::color::*;
use wavemap_core::config::*;
use wavemap_core::error::Error;
use wavemap_core::geometry::Bounds3f;
use wavemap_core::math::Float;
use wavemap_core::propagation::FieldSample;
use wavemap_core::scene::Scene;
use wavemap_core::volume::*;

/// Samples the propagation model on a regular grid over the room.
pub struct VoxelSampler {
    /// Backend running z-slices.
    evaluator: Box<dyn Evaluator>,

    /// Evaluation options.
    options: Options,
}

impl VoxelSampler {
    /// Create a new `VoxelSampler` with a backend chosen from the thread count
    /// in `options`: serial for one thread, a thread pool otherwise.
    ///
    /// * `options` - Evaluation options.
    pub fn new(options: Options) -> Self {
        Self::with_evaluator(options, default_evaluator(&options))
    }

    /// Create a new `VoxelSampler` with an explicit backend.
    ///
    /// * `options`   - Evaluation options.
    /// * `evaluator` - Backend running z-slices.
    pub fn with_evaluator(options: Options, evaluator: Box<dyn Evaluator>) -> Self {
        Self { evaluator, options }
    }

    /// Returns the evaluation options.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Validates the configuration and samples the density and dominant
    /// source fields at every grid node.
    ///
    /// * `configuration` - The configuration.
    pub fn sample(&self, configuration: &Configuration) -> Result<ScalarVolume, Error> {
        let volume = self.sample_cancellable(configuration, &|| false)?;
        // Never cancelled, so a volume is always produced.
        Ok(volume.unwrap_or_else(|| empty_volume(configuration)))
    }

    /// Same as `sample` but polls `cancel` between z-slices and returns
    /// `Ok(None)` once it reports true.
    ///
    /// * `configuration` - The configuration.
    /// * `cancel`        - Cancellation check.
    pub fn sample_cancellable(
        &self,
        configuration: &Configuration,
        cancel: &CancelCheck,
    ) -> Result<Option<ScalarVolume>, Error> {
        let validated = configuration.validate(&self.options)?;
        let configuration = &validated.configuration;
        let scene = &configuration.scene;
        let sampling = &configuration.sampling;
        let (nx, ny, nz) = configuration.dims();
        let bounds = sampling.bounds;

        info!(
            "Sampling {}x{}x{} grid over {} with {} evaluator",
            nx,
            ny,
            nz,
            bounds,
            self.evaluator.name()
        );
        let start = Instant::now();

        let slice = |iz: usize| sample_z_slice(scene, &bounds, (nx, ny, nz), iz);
        let slices = match self.evaluator.evaluate(nz, &slice, cancel) {
            Some(slices) => slices,
            None => {
                debug!("Sampling cancelled");
                return Ok(None);
            }
        };

        let n = nx * ny * nz;
        let mut density = Vec::with_capacity(n);
        let mut dominant = Vec::with_capacity(n);
        for sample in slices.into_iter().flatten() {
            density.push(sample.density);
            dominant.push(sample.dominant);
        }

        let colors = if sampling.colors {
            Some(node_colors(sampling.mode, &density, &dominant))
        } else {
            None
        };

        debug!("Sampled {} nodes in {:?}", n, start.elapsed());
        Ok(Some(ScalarVolume::new(
            nx, ny, nz, bounds, density, dominant, colors,
        )))
    }
}

/// Returns a serial backend for one thread and a thread pool otherwise.
///
/// * `options` - Evaluation options.
pub fn default_evaluator(options: &Options) -> Box<dyn Evaluator> {
    match options.threads() {
        1 => Box::new(SerialEvaluator),
        n => Box::new(ThreadPoolEvaluator::new(n)),
    }
}

/// Evaluates the model at every node of z-slice `iz`, x fastest.
fn sample_z_slice(
    scene: &Scene,
    bounds: &Bounds3f,
    dims: (usize, usize, usize),
    iz: usize,
) -> Vec<FieldSample> {
    let (nx, ny, _) = dims;
    iproduct!(0..ny, 0..nx)
        .map(|(iy, ix)| scene.density_at(&node_position_in(bounds, dims, ix, iy, iz)))
        .collect()
}

/// Maps the selected field to colors.
///
/// * `mode`     - Field driving the colors.
/// * `density`  - Density values.
/// * `dominant` - Dominant source values.
pub fn node_colors(
    mode: FieldMode,
    density: &[Float],
    dominant: &[Float],
) -> Vec<Rgb> {
    match mode {
        FieldMode::Density => density.iter().map(|&d| heat_color(d)).collect(),
        FieldMode::DominantSource => dominant.iter().map(|&d| source_color(d)).collect(),
    }
}

fn empty_volume(configuration: &Configuration) -> ScalarVolume {
    let (nx, ny, nz) = configuration.dims();
    ScalarVolume::from_fn(nx, ny, nz, configuration.sampling.bounds, |_| 0.0)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
