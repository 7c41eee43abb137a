//! Scalar volume sampled on a regular grid.

use crate::color::Rgb;
use crate::config::FieldMode;
use crate::geometry::*;
use crate::math::*;

/// Returns the world coordinate of grid node `i` out of `n` along an axis
/// spanning `[lo, hi]`. Floor shading and volume sampling both place samples
/// through this function so coincident points evaluate identically.
///
/// * `i`  - Node index.
/// * `n`  - Node count along the axis (at least 2).
/// * `lo` - Lower end of the axis.
/// * `hi` - Upper end of the axis.
#[inline]
pub fn grid_coordinate(i: usize, n: usize, lo: Float, hi: Float) -> Float {
    debug_assert!(n > 1);
    lerp(i as Float / (n - 1) as Float, lo, hi)
}

/// Dense density and dominant source fields over a regular grid. Values are
/// stored with x varying fastest, then y, then z.
#[derive(Clone, Debug, PartialEq)]
pub struct ScalarVolume {
    /// Grid size in x-direction.
    pub nx: usize,

    /// Grid size in y-direction.
    pub ny: usize,

    /// Grid size in z-direction.
    pub nz: usize,

    /// World bounds; the outermost nodes lie on its faces.
    pub bounds: Bounds3f,

    /// Density values in `[0, 1]`.
    pub density: Vec<Float>,

    /// Normalized dominant source index in `[0, 1)`.
    pub dominant: Vec<Float>,

    /// Optional per-node colors.
    pub colors: Option<Vec<Rgb>>,
}

impl ScalarVolume {
    /// Create a new `ScalarVolume`.
    ///
    /// * `nx`       - Grid size in x-direction.
    /// * `ny`       - Grid size in y-direction.
    /// * `nz`       - Grid size in z-direction.
    /// * `bounds`   - World bounds.
    /// * `density`  - Density values.
    /// * `dominant` - Dominant source values.
    /// * `colors`   - Optional per-node colors.
    pub fn new(
        nx: usize,
        ny: usize,
        nz: usize,
        bounds: Bounds3f,
        density: Vec<Float>,
        dominant: Vec<Float>,
        colors: Option<Vec<Rgb>>,
    ) -> Self {
        let n = nx * ny * nz;
        assert!(density.len() == n, "density has {} values, expected {}", density.len(), n);
        assert!(dominant.len() == n, "dominant has {} values, expected {}", dominant.len(), n);
        if let Some(c) = colors.as_ref() {
            assert!(c.len() == n, "colors has {} values, expected {}", c.len(), n);
        }
        Self {
            nx,
            ny,
            nz,
            bounds,
            density,
            dominant,
            colors,
        }
    }

    /// Builds a density-only volume by evaluating `f` at every node position.
    /// The dominant field is zero.
    ///
    /// * `nx`     - Grid size in x-direction.
    /// * `ny`     - Grid size in y-direction.
    /// * `nz`     - Grid size in z-direction.
    /// * `bounds` - World bounds.
    /// * `f`      - Density function.
    pub fn from_fn<F>(nx: usize, ny: usize, nz: usize, bounds: Bounds3f, f: F) -> Self
    where
        F: Fn(&Point3f) -> Float,
    {
        let mut density = Vec::with_capacity(nx * ny * nz);
        for iz in 0..nz {
            for iy in 0..ny {
                for ix in 0..nx {
                    let p = node_position_in(&bounds, (nx, ny, nz), ix, iy, iz);
                    density.push(f(&p));
                }
            }
        }
        let dominant = vec![0.0; density.len()];
        Self::new(nx, ny, nz, bounds, density, dominant, None)
    }

    /// Returns grid dimensions `(nx, ny, nz)`.
    pub fn dims(&self) -> (usize, usize, usize) {
        (self.nx, self.ny, self.nz)
    }

    /// Returns the number of nodes.
    pub fn len(&self) -> usize {
        self.density.len()
    }

    /// Returns true if the grid has no nodes.
    pub fn is_empty(&self) -> bool {
        self.density.is_empty()
    }

    /// Returns the linear offset of a node.
    ///
    /// * `ix` - Index along x.
    /// * `iy` - Index along y.
    /// * `iz` - Index along z.
    #[inline]
    pub fn offset(&self, ix: usize, iy: usize, iz: usize) -> usize {
        (iz * self.ny + iy) * self.nx + ix
    }

    /// Returns the world position of a node.
    ///
    /// * `ix` - Index along x.
    /// * `iy` - Index along y.
    /// * `iz` - Index along z.
    pub fn node_position(&self, ix: usize, iy: usize, iz: usize) -> Point3f {
        node_position_in(&self.bounds, self.dims(), ix, iy, iz)
    }

    /// Returns the density at a node.
    ///
    /// * `ix` - Index along x.
    /// * `iy` - Index along y.
    /// * `iz` - Index along z.
    #[inline]
    pub fn density_at(&self, ix: usize, iy: usize, iz: usize) -> Float {
        self.density[self.offset(ix, iy, iz)]
    }

    /// Returns the dominant source value at a node.
    ///
    /// * `ix` - Index along x.
    /// * `iy` - Index along y.
    /// * `iz` - Index along z.
    #[inline]
    pub fn dominant_at(&self, ix: usize, iy: usize, iz: usize) -> Float {
        self.dominant[self.offset(ix, iy, iz)]
    }

    /// Returns the color at a node if colors were computed.
    ///
    /// * `ix` - Index along x.
    /// * `iy` - Index along y.
    /// * `iz` - Index along z.
    pub fn color_at(&self, ix: usize, iy: usize, iz: usize) -> Option<Rgb> {
        let o = self.offset(ix, iy, iz);
        self.colors.as_ref().map(|c| c[o])
    }

    /// Returns the field selected by `mode`.
    ///
    /// * `mode` - The field.
    pub fn field(&self, mode: FieldMode) -> &[Float] {
        match mode {
            FieldMode::Density => &self.density,
            FieldMode::DominantSource => &self.dominant,
        }
    }

    /// Returns the distance between adjacent nodes along each axis.
    pub fn cell_size(&self) -> Vector3f {
        let d = self.bounds.diagonal();
        Vector3f::new(
            d.x / (self.nx - 1) as Float,
            d.y / (self.ny - 1) as Float,
            d.z / (self.nz - 1) as Float,
        )
    }

    /// Returns the minimum and maximum density, or `None` for an empty grid.
    pub fn min_max(&self) -> Option<(Float, Float)> {
        if self.density.is_empty() {
            return None;
        }
        Some(
            self.density
                .iter()
                .fold((INFINITY, -INFINITY), |(lo, hi), &v| (min(lo, v), max(hi, v))),
        )
    }

    /// Reconstructs the density at an arbitrary position by trilinear
    /// interpolation. Positions outside the bounds are clamped to the nearest
    /// face.
    ///
    /// * `p` - World position.
    pub fn sample(&self, p: &Point3f) -> Float {
        let o = self.bounds.offset(p);
        let g = Point3f::new(
            clamp(o.x, 0.0, 1.0) * (self.nx - 1) as Float,
            clamp(o.y, 0.0, 1.0) * (self.ny - 1) as Float,
            clamp(o.z, 0.0, 1.0) * (self.nz - 1) as Float,
        );
        let ix = min(g.x as usize, self.nx - 2);
        let iy = min(g.y as usize, self.ny - 2);
        let iz = min(g.z as usize, self.nz - 2);
        let d = Vector3f::new(g.x - ix as Float, g.y - iy as Float, g.z - iz as Float);

        let v = |dx: usize, dy: usize, dz: usize| self.density_at(ix + dx, iy + dy, iz + dz);
        let d00 = lerp(d.x, v(0, 0, 0), v(1, 0, 0));
        let d10 = lerp(d.x, v(0, 1, 0), v(1, 1, 0));
        let d01 = lerp(d.x, v(0, 0, 1), v(1, 0, 1));
        let d11 = lerp(d.x, v(0, 1, 1), v(1, 1, 1));
        let d0 = lerp(d.y, d00, d10);
        let d1 = lerp(d.y, d01, d11);
        lerp(d.z, d0, d1)
    }
}

/// Returns the world position of node `(ix, iy, iz)` of a grid with the given
/// dimensions spanning `bounds`.
///
/// * `bounds` - World bounds.
/// * `dims`   - Grid dimensions.
/// * `ix`     - Index along x.
/// * `iy`     - Index along y.
/// * `iz`     - Index along z.
pub fn node_position_in(
    bounds: &Bounds3f,
    dims: (usize, usize, usize),
    ix: usize,
    iy: usize,
    iz: usize,
) -> Point3f {
    let (nx, ny, nz) = dims;
    Point3f::new(
        grid_coordinate(ix, nx, bounds.p_min.x, bounds.p_max.x),
        grid_coordinate(iy, ny, bounds.p_min.y, bounds.p_max.y),
        grid_coordinate(iz, nz, bounds.p_min.z, bounds.p_max.z),
    )
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
