//! Floor heat map shading.

use crate::evaluator::*;
use crate::voxel::{default_evaluator, node_colors};
use image::{ImageBuffer, ImageFormat, Rgb as Rgb8};
use itertools::iproduct;
use std::path::Path;
use wavemap_core::color::Rgb;
use wavemap_core::config::*;
use wavemap_core::error::{Error, Warning};
use wavemap_core::geometry::*;
use wavemap_core::math::*;
use wavemap_core::propagation::FieldSample;
use wavemap_core::volume::grid_coordinate;

/// Density over a horizontal plane of the room, one value per pixel. Pixel
/// `(i, j)` lies at x node `i` and z node `j` of the room bounds.
#[derive(Clone, Debug, PartialEq)]
pub struct FloorHeatmap {
    /// Pixels along x.
    pub width: usize,

    /// Pixels along z.
    pub height: usize,

    /// Room bounds; only x and z are used.
    pub bounds: Bounds3f,

    /// Height of the plane.
    pub floor_y: Float,

    /// Density values, x fastest.
    pub density: Vec<Float>,

    /// Dominant source values, x fastest.
    pub dominant: Vec<Float>,

    /// Pixel colors for the configured field.
    pub colors: Vec<Rgb>,

    /// Warnings from sanitizing the scene.
    pub warnings: Vec<Warning>,
}

impl FloorHeatmap {
    /// Returns the linear offset of a pixel.
    ///
    /// * `i` - Pixel along x.
    /// * `j` - Pixel along z.
    #[inline]
    pub fn offset(&self, i: usize, j: usize) -> usize {
        j * self.width + i
    }

    /// Returns the world position of a pixel.
    ///
    /// * `i` - Pixel along x.
    /// * `j` - Pixel along z.
    pub fn pixel_position(&self, i: usize, j: usize) -> Point3f {
        pixel_position(&self.bounds, self.width, self.height, self.floor_y, i, j)
    }

    /// Returns the density at a pixel.
    ///
    /// * `i` - Pixel along x.
    /// * `j` - Pixel along z.
    pub fn density_at(&self, i: usize, j: usize) -> Float {
        self.density[self.offset(i, j)]
    }

    /// Writes the colors as an 8-bit image. The format is taken from the
    /// file extension; `.png` and `.tga` are supported.
    ///
    /// * `path` - Output file path.
    pub fn write_image(&self, path: &str) -> Result<(), Error> {
        let format = match Path::new(path).extension().and_then(|e| e.to_str()) {
            Some("png") => ImageFormat::Png,
            Some("tga") => ImageFormat::Tga,
            Some(extension) => {
                return Err(Error::Image(format!(
                    "Extension .{extension} is not supported"
                )))
            }
            None => {
                return Err(Error::Image(format!(
                    "Can't determine file type from suffix of filename {path}"
                )))
            }
        };

        let res_x = self.width as u32;
        let res_y = self.height as u32;
        info!("Writing image {path} with resolution {res_x}x{res_y}");

        let mut imgbuf = ImageBuffer::new(res_x, res_y);
        for (y, x) in iproduct!(0..res_y, 0..res_x) {
            let c = self.colors[self.offset(x as usize, y as usize)];
            imgbuf.put_pixel(x, y, Rgb8(c.to_rgb8()));
        }

        imgbuf
            .save_with_format(path, format)
            .map_err(|err| Error::Image(format!("Error saving output image {path}: {err}.")))
    }
}

/// Shades the floor by evaluating the propagation model per pixel.
pub struct FloorShader {
    /// Backend running pixel rows.
    evaluator: Box<dyn Evaluator>,
}

impl FloorShader {
    /// Create a new `FloorShader`.
    ///
    /// * `options` - Evaluation options.
    pub fn new(options: Options) -> Self {
        Self {
            evaluator: default_evaluator(&options),
        }
    }

    /// Shades a `width` x `height` heat map at height `floor_y` over the
    /// configuration's room bounds. Colors follow the configured field.
    ///
    /// Only the scene and bounds are validated; the volume resolution and
    /// node budget do not apply to the floor.
    ///
    /// * `configuration` - The configuration.
    /// * `width`         - Pixels along x, at least 2.
    /// * `height`        - Pixels along z, at least 2.
    /// * `floor_y`       - Height of the plane.
    pub fn shade(
        &self,
        configuration: &Configuration,
        width: usize,
        height: usize,
        floor_y: Float,
    ) -> Result<FloorHeatmap, Error> {
        if width < 2 {
            return Err(Error::InvalidResolution {
                axis: Axis::X,
                value: width,
            });
        }
        if height < 2 {
            return Err(Error::InvalidResolution {
                axis: Axis::Z,
                value: height,
            });
        }

        let Validated {
            configuration,
            warnings,
        } = configuration.validate_scene()?;
        let scene = &configuration.scene;
        let bounds = configuration.sampling.bounds;

        info!(
            "Shading {}x{} floor at y = {} with {} evaluator",
            width,
            height,
            floor_y,
            self.evaluator.name()
        );

        let row = |j: usize| -> Vec<FieldSample> {
            (0..width)
                .map(|i| scene.density_at(&pixel_position(&bounds, width, height, floor_y, i, j)))
                .collect()
        };
        let rows = self
            .evaluator
            .evaluate(height, &row, &|| false)
            .unwrap_or_default();

        let mut density = Vec::with_capacity(width * height);
        let mut dominant = Vec::with_capacity(width * height);
        for sample in rows.into_iter().flatten() {
            density.push(sample.density);
            dominant.push(sample.dominant);
        }
        let colors = node_colors(configuration.sampling.mode, &density, &dominant);

        Ok(FloorHeatmap {
            width,
            height,
            bounds,
            floor_y,
            density,
            dominant,
            colors,
            warnings,
        })
    }
}

/// Pixel placement shared by shading and lookup. Uses the same grid
/// coordinates as volume nodes so coincident points evaluate identically.
fn pixel_position(
    bounds: &Bounds3f,
    width: usize,
    height: usize,
    floor_y: Float,
    i: usize,
    j: usize,
) -> Point3f {
    Point3f::new(
        grid_coordinate(i, width, bounds.p_min.x, bounds.p_max.x),
        floor_y,
        grid_coordinate(j, height, bounds.p_min.z, bounds.p_max.z),
    )
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxel::VoxelSampler;
    use wavemap_core::color::heat_color;
    use wavemap_core::scene::*;

    fn room() -> Configuration {
        Configuration::new()
            .with_source(Source::new(Point3f::new(1.0, 1.5, -0.5), 6.0))
            .with_box(Aabb::new(
                Point3f::new(-2.0, 0.0, -2.0),
                Point3f::new(-1.0, 2.0, 2.0),
            ))
            .with_resolution(9, 5)
    }

    #[test]
    fn floor_agrees_with_volume_at_coincident_points() {
        let c = room();
        let volume = VoxelSampler::new(Options::with_threads(2)).sample(&c).unwrap();
        let iy = 2;
        let floor_y = volume.node_position(0, iy, 0).y;
        let floor = FloorShader::new(Options::with_threads(1))
            .shade(&c, 9, 9, floor_y)
            .unwrap();
        for (ix, iz) in iproduct!(0..9, 0..9) {
            assert_eq!(floor.pixel_position(ix, iz), volume.node_position(ix, iy, iz));
            assert_eq!(floor.density_at(ix, iz), volume.density_at(ix, iy, iz));
        }
    }

    #[test]
    fn colors_are_heat_mapped_density() {
        let floor = FloorShader::new(Options::with_threads(1))
            .shade(&room(), 4, 3, 0.0)
            .unwrap();
        assert_eq!(floor.colors.len(), 12);
        assert_eq!(floor.colors[5], heat_color(floor.density[5]));
    }

    #[test]
    fn tiny_resolution_is_rejected() {
        let shader = FloorShader::new(Options::with_threads(1));
        assert_eq!(
            shader.shade(&room(), 1, 4, 0.0),
            Err(Error::InvalidResolution {
                axis: Axis::X,
                value: 1
            })
        );
    }

    #[test]
    fn sanitizing_warnings_reach_heatmap() {
        let c = room()
            .with_source(Source::new(Point3f::new(-3.0, 1.0, 3.0), 0.0))
            .with_wall(Wall::new(
                Point3f::new(2.0, 0.0, 2.0),
                Point3f::new(2.0, 3.0, 2.0),
            ));
        let floor = FloorShader::new(Options::with_threads(1))
            .shade(&c, 5, 5, 0.0)
            .unwrap();
        assert_eq!(
            floor.warnings,
            vec![
                Warning::DegenerateSource {
                    index: 1,
                    intensity: 0.0
                },
                Warning::DegenerateWall { index: 0 },
            ]
        );
        assert!(floor.density.iter().all(|d| d.is_finite()));
    }

    #[test]
    fn clean_scene_has_no_warnings() {
        let floor = FloorShader::new(Options::with_threads(1))
            .shade(&room(), 3, 3, 0.0)
            .unwrap();
        assert!(floor.warnings.is_empty());
    }

    #[test]
    fn volume_limits_do_not_apply_to_floor() {
        let options = Options {
            n_threads: 1,
            max_nodes: 10,
        };
        let floor = FloorShader::new(options)
            .shade(&room().with_resolution(2, 2), 6, 6, 0.0)
            .unwrap();
        assert_eq!(floor.density.len(), 36);
    }

    #[test]
    fn unsupported_extension_is_an_error() {
        let floor = FloorShader::new(Options::with_threads(1))
            .shade(&room(), 4, 4, 0.0)
            .unwrap();
        assert!(matches!(floor.write_image("heatmap.bmp"), Err(Error::Image(_))));
        assert!(matches!(floor.write_image("heatmap"), Err(Error::Image(_))));
    }

    #[test]
    fn writes_png() {
        let floor = FloorShader::new(Options::with_threads(1))
            .shade(&room(), 8, 6, 0.5)
            .unwrap();
        let path = std::env::temp_dir().join(format!("floor-{}.png", std::process::id()));
        let path = path.to_string_lossy().to_string();
        assert_eq!(floor.write_image(&path), Ok(()));
        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (8, 6));
        assert_eq!(img.get_pixel(3, 2).0, floor.colors[floor.offset(3, 2)].to_rgb8());
        let _ = std::fs::remove_file(&path);
    }
}
