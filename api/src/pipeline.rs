//! One coverage pass: validate, sample, extract.

use isosurface::*;
use samplers::*;
use shapes::{RoomGeometry, RoomGeometryBuilder};
use std::sync::Arc;
use std::time::Instant;
use wavemap_core::config::*;
use wavemap_core::error::*;
use wavemap_core::mesh::IsosurfaceMesh;
use wavemap_core::volume::ScalarVolume;

/// Everything produced for one configuration version.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    /// Version the snapshot was computed for.
    pub version: u64,

    /// Sanitized configuration the snapshot was computed from.
    pub configuration: Arc<Configuration>,

    /// Sampled volume.
    pub volume: ScalarVolume,

    /// Isosurface of the volume at the configured isovalue.
    pub mesh: IsosurfaceMesh,

    /// Display meshes for the obstacles and floor.
    pub room: RoomGeometry,

    /// Validation and extraction warnings.
    pub warnings: Vec<Warning>,
}

/// Runs the sampler and extractor for a configuration.
pub struct Pipeline {
    /// Volume sampler.
    sampler: VoxelSampler,
}

impl Pipeline {
    /// Create a new `Pipeline`.
    ///
    /// * `options` - Evaluation options.
    pub fn new(options: Options) -> Self {
        Self {
            sampler: VoxelSampler::new(options),
        }
    }

    /// Create a new `Pipeline` around an existing sampler.
    ///
    /// * `sampler` - Volume sampler.
    pub fn with_sampler(sampler: VoxelSampler) -> Self {
        Self { sampler }
    }

    /// Computes a snapshot, never cancelling.
    ///
    /// * `version`       - Version to attribute the snapshot to.
    /// * `configuration` - The configuration.
    pub fn run(&self, version: u64, configuration: &Configuration) -> Result<Snapshot, Error> {
        let start = Instant::now();
        let validated = configuration.validate(self.sampler.options())?;
        let volume = self.sampler.sample(&validated.configuration)?;
        Ok(finish(version, validated, volume, start))
    }

    /// Computes a snapshot, polling `cancel` while sampling. Returns
    /// `Ok(None)` when cancelled.
    ///
    /// * `version`       - Version to attribute the snapshot to.
    /// * `configuration` - The configuration.
    /// * `cancel`        - Cancellation check.
    pub fn run_cancellable(
        &self,
        version: u64,
        configuration: &Configuration,
        cancel: &CancelCheck,
    ) -> Result<Option<Snapshot>, Error> {
        let start = Instant::now();
        let validated = configuration.validate(self.sampler.options())?;
        let volume = self
            .sampler
            .sample_cancellable(&validated.configuration, cancel)?;
        Ok(volume.map(|volume| finish(version, validated, volume, start)))
    }
}

/// Extracts the isosurface of a sampled volume and assembles the snapshot.
fn finish(version: u64, validated: Validated, volume: ScalarVolume, start: Instant) -> Snapshot {
    let Validated {
        configuration,
        mut warnings,
    } = validated;

    let sampling = &configuration.sampling;
    let extraction = extract(&volume, sampling.isovalue, &ExtractOptions::from(sampling));
    warnings.extend(extraction.warnings);
    let room = RoomGeometryBuilder::new().build(&configuration.scene, &sampling.bounds);

    info!(
        "Version {}: {} triangles, {} warnings in {:?}",
        version,
        extraction.mesh.triangle_count(),
        warnings.len(),
        start.elapsed()
    );
    Snapshot {
        version,
        configuration: Arc::new(configuration),
        volume,
        mesh: extraction.mesh,
        room,
        warnings,
    }
}
