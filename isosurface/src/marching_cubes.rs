//! Marching Cubes

use crate::tables::*;
use itertools::iproduct;
use wavemap_core::color::Rgb;
use wavemap_core::config::{SamplingConfig, Shading, DEFAULT_MAX_TRIANGLES};
use wavemap_core::error::Warning;
use wavemap_core::geometry::*;
use wavemap_core::math::*;
use wavemap_core::mesh::*;
use wavemap_core::volume::ScalarVolume;

/// Denominators below this interpolate edge crossings at the midpoint.
const INTERPOLATION_EPSILON: Float = 1e-12;

/// Extraction parameters.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Triangle budget.
    pub max_triangles: usize,

    /// Normal and color interpolation.
    pub shading: Shading,

    /// Interpolate per-node colors when the volume has them.
    pub colors: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            max_triangles: DEFAULT_MAX_TRIANGLES,
            shading: Shading::Smooth,
            colors: false,
        }
    }
}

impl From<&SamplingConfig> for ExtractOptions {
    fn from(sampling: &SamplingConfig) -> Self {
        Self {
            max_triangles: sampling.max_triangles,
            shading: sampling.shading,
            colors: sampling.colors,
        }
    }
}

/// Result of an extraction.
#[derive(Clone, Debug, PartialEq)]
pub struct Extraction {
    /// The mesh; partial when the budget was exceeded.
    pub mesh: IsosurfaceMesh,

    /// Warnings raised while extracting.
    pub warnings: Vec<Warning>,
}

/// Extracts the isosurface of a volume's density field.
#[derive(Copy, Clone, Debug, Default)]
pub struct IsosurfaceExtractor {
    /// Extraction parameters.
    options: ExtractOptions,
}

impl IsosurfaceExtractor {
    /// Create a new `IsosurfaceExtractor`.
    ///
    /// * `options` - Extraction parameters.
    pub fn new(options: ExtractOptions) -> Self {
        Self { options }
    }

    /// Extracts the surface at `isovalue`.
    ///
    /// * `volume`   - Sampled volume.
    /// * `isovalue` - Density level.
    pub fn extract(&self, volume: &ScalarVolume, isovalue: Float) -> Extraction {
        extract(volume, isovalue, &self.options)
    }
}

/// Extracts the density isosurface at `isovalue` with Marching Cubes.
///
/// Only interior cells are visited, so no emitted vertex lies on the outermost
/// node layer. An isovalue outside the density range yields an empty mesh.
/// When the triangle budget runs out, emission stops and the partial mesh is
/// returned with a `Warning::MeshBudgetExceeded`.
///
/// * `volume`   - Sampled volume.
/// * `isovalue` - Density level.
/// * `options`  - Extraction parameters.
pub fn extract(volume: &ScalarVolume, isovalue: Float, options: &ExtractOptions) -> Extraction {
    let with_colors = options.colors && volume.colors.is_some();
    let mut attributes = MeshAttributes::NORMALS;
    if with_colors {
        attributes |= MeshAttributes::COLORS;
    }
    if options.shading == Shading::Flat {
        attributes |= MeshAttributes::FLAT;
    }
    let mut mesh = IsosurfaceMesh::new(options.max_triangles, attributes);
    let mut warnings = vec![];

    match volume.min_max() {
        Some((lo, hi)) if isovalue >= lo && isovalue <= hi => {}
        _ => {
            debug!("Isovalue {} outside density range; empty mesh", isovalue);
            return Extraction { mesh, warnings };
        }
    }

    let (nx, ny, nz) = volume.dims();
    if nx < 4 || ny < 4 || nz < 4 {
        debug!("Grid {}x{}x{} has no interior cells", nx, ny, nz);
        return Extraction { mesh, warnings };
    }

    let h = volume.cell_size();
    'cells: for (z, y, x) in iproduct!(1..nz - 2, 1..ny - 2, 1..nx - 2) {
        let mut corners = [(0, 0, 0); 8];
        let mut values = [0.0; 8];
        let mut code = 0;
        for (i, o) in CORNER_OFFSETS.iter().enumerate() {
            corners[i] = (x + o[0], y + o[1], z + o[2]);
            values[i] = volume.density_at(corners[i].0, corners[i].1, corners[i].2);
            if values[i] < isovalue {
                code |= 1 << i;
            }
        }

        let edges = EDGE_TABLE[code];
        if edges == 0 {
            continue;
        }

        let mut crossings = [MeshVertex::default(); 12];
        for (e, [a, b]) in EDGE_CONNECTIONS.iter().enumerate() {
            if edges & (1 << e) == 0 {
                continue;
            }
            let (va, vb) = (values[*a], values[*b]);
            let denom = vb - va;
            let t = if abs(denom) < INTERPOLATION_EPSILON {
                0.5
            } else {
                clamp((isovalue - va) / denom, 0.0, 1.0)
            };

            let (ca, cb) = (corners[*a], corners[*b]);
            let pa = volume.node_position(ca.0, ca.1, ca.2);
            let pb = volume.node_position(cb.0, cb.1, cb.2);
            let na = normal_at(volume, &h, ca);
            let nb = normal_at(volume, &h, cb);
            let color = if with_colors {
                let c0 = volume.color_at(ca.0, ca.1, ca.2).unwrap_or(Rgb::BLACK);
                let c1 = volume.color_at(cb.0, cb.1, cb.2).unwrap_or(Rgb::BLACK);
                lerp(t, c0, c1)
            } else {
                Rgb::BLACK
            };

            crossings[e] = MeshVertex {
                position: lerp(t, pa, pb),
                normal: lerp(t, na, nb).normalize_or_zero(INTERPOLATION_EPSILON),
                color,
            };
        }

        let tris = &TRI_TABLE[code];
        for t in tris.chunks_exact(3).take_while(|t| t[0] != -1) {
            let triangle = [
                crossings[t[0] as usize],
                crossings[t[1] as usize],
                crossings[t[2] as usize],
            ];
            if !mesh.push_triangle(&triangle) {
                warn!(
                    "Isosurface exceeds {} triangles; mesh truncated",
                    options.max_triangles
                );
                warnings.push(Warning::MeshBudgetExceeded {
                    limit: options.max_triangles,
                });
                break 'cells;
            }
        }
    }

    debug!(
        "Extracted {} triangles at isovalue {}",
        mesh.triangle_count(),
        isovalue
    );
    Extraction { mesh, warnings }
}

/// Returns the unit surface normal at a node: the negated density gradient,
/// from central differences inside the grid and one-sided differences on
/// its faces. Zero where the gradient vanishes.
///
/// * `volume` - Sampled volume.
/// * `h`      - Node spacing.
/// * `node`   - Node indices.
pub fn normal_at(volume: &ScalarVolume, h: &Vector3f, node: (usize, usize, usize)) -> Vector3f {
    let (ix, iy, iz) = node;
    let (nx, ny, nz) = volume.dims();
    let v = |x: usize, y: usize, z: usize| volume.density_at(x, y, z);

    let dx = difference(ix, nx, h.x, |i| v(i, iy, iz));
    let dy = difference(iy, ny, h.y, |i| v(ix, i, iz));
    let dz = difference(iz, nz, h.z, |i| v(ix, iy, i));
    (-Vector3f::new(dx, dy, dz)).normalize_or_zero(INTERPOLATION_EPSILON)
}

/// Finite difference of `f` at index `i` of `n` with spacing `h`.
fn difference<F>(i: usize, n: usize, h: Float, f: F) -> Float
where
    F: Fn(usize) -> Float,
{
    if n < 2 {
        0.0
    } else if i == 0 {
        (f(1) - f(0)) / h
    } else if i == n - 1 {
        (f(i) - f(i - 1)) / h
    } else {
        (f(i + 1) - f(i - 1)) / (2.0 * h)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::*;

    fn cube_bounds() -> Bounds3f {
        Bounds3f::new(Point3f::new(-1.0, -1.0, -1.0), Point3f::new(1.0, 1.0, 1.0))
    }

    /// Planar field decreasing along +x; the 0.5 level is the plane x = 0.1.
    fn ramp() -> ScalarVolume {
        ScalarVolume::from_fn(8, 8, 8, cube_bounds(), |p| 0.5 - 0.5 * (p.x - 0.1))
    }

    #[test]
    fn plane_vertices_lie_on_level_set() {
        let e = extract(&ramp(), 0.5, &ExtractOptions::default());
        assert!(e.warnings.is_empty());
        assert!(!e.mesh.is_empty());
        for (p, n) in e.mesh.positions.iter().zip(e.mesh.normals.iter()) {
            assert!(approx_eq!(f32, p.x, 0.1, epsilon = 0.0001), "{:?}", p);
            assert!(approx_eq!(f32, n.x, 1.0, epsilon = 0.0001), "{:?}", n);
        }
    }

    #[test]
    fn interior_cells_only() {
        let v = ScalarVolume::from_fn(8, 8, 8, cube_bounds(), |p| 0.5 - 0.5 * p.x);
        let e = extract(&v, 0.5, &ExtractOptions::default());
        let h = v.cell_size();
        for p in e.mesh.positions.iter() {
            for axis in Axis::ALL {
                assert!(p[axis] >= v.bounds.p_min[axis] + h[axis] - 0.0001);
                assert!(p[axis] <= v.bounds.p_max[axis] - h[axis] + 0.0001);
            }
        }
    }

    #[test]
    fn out_of_range_isovalue_is_empty() {
        let v = ramp();
        for iso in [-1.0, 2.0] {
            let e = extract(&v, iso, &ExtractOptions::default());
            assert!(e.mesh.is_empty());
            assert!(!e.mesh.is_truncated());
            assert!(e.warnings.is_empty());
        }
    }

    #[test]
    fn tiny_grid_is_empty() {
        let v = ScalarVolume::from_fn(3, 3, 3, cube_bounds(), |p| p.x);
        assert!(extract(&v, 0.0, &ExtractOptions::default()).mesh.is_empty());
    }

    #[test]
    fn budget_truncates_with_warning() {
        let options = ExtractOptions {
            max_triangles: 3,
            ..ExtractOptions::default()
        };
        let e = extract(&ramp(), 0.5, &options);
        assert_eq!(e.mesh.triangle_count(), 3);
        assert!(e.mesh.is_truncated());
        assert_eq!(e.warnings, vec![Warning::MeshBudgetExceeded { limit: 3 }]);
    }

    #[test]
    fn flat_shading_shares_normal_per_triangle() {
        let v = ScalarVolume::from_fn(10, 10, 10, cube_bounds(), |p| {
            1.0 - p.distance(&Point3f::ZERO)
        });
        let options = ExtractOptions {
            shading: Shading::Flat,
            ..ExtractOptions::default()
        };
        let e = extract(&v, 0.5, &options);
        assert!(e.mesh.attributes().contains(MeshAttributes::FLAT));
        for t in e.mesh.normals.chunks_exact(3) {
            assert_eq!(t[0], t[1]);
            assert_eq!(t[1], t[2]);
        }
    }

    #[test]
    fn colors_are_interpolated_when_present() {
        let mut v = ramp();
        v.colors = Some(vec![Rgb::new(0.2, 0.4, 0.6); v.len()]);
        let options = ExtractOptions {
            colors: true,
            ..ExtractOptions::default()
        };
        let e = extract(&v, 0.5, &options);
        let colors = e.mesh.colors.clone().unwrap_or_default();
        assert_eq!(colors.len(), e.mesh.positions.len());
        assert!(colors
            .iter()
            .all(|c| approx_eq!(f32, c.g, 0.4, epsilon = 0.00001)));

        let e = extract(&ramp(), 0.5, &options);
        assert!(e.mesh.colors.is_none());
    }

    #[test]
    fn one_sided_normals_on_faces() {
        let v = ramp();
        let h = v.cell_size();
        for node in [(0, 0, 0), (7, 7, 7), (3, 0, 7)] {
            let n = normal_at(&v, &h, node);
            assert!(approx_eq!(f32, n.x, 1.0, epsilon = 0.0001));
        }
        let flat = ScalarVolume::from_fn(4, 4, 4, cube_bounds(), |_| 0.3);
        assert_eq!(normal_at(&flat, &flat.cell_size(), (1, 1, 1)), Vector3f::ZERO);
    }
}
