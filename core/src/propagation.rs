//! Signal propagation and occlusion model.
//!
//! Density at a point is the strongest contribution over all sources. Each
//! contribution is an inverse-square style falloff of the straight line
//! distance, attenuated by whatever lies on the segment between source and
//! point:
//!
//! - furniture boxes absorb proportionally to the length of segment inside
//!   them (`exp(-BOX_ABSORPTION * length)`),
//! - every wall crossed removes a flat `WALL_PENALTY` fraction regardless of
//!   the crossing angle.
//!
//! Both obstacle kinds attenuate multiplicatively, so densities stay in
//! `[0, 1]` and adding an obstacle never raises the density anywhere.

use crate::geometry::*;
use crate::math::*;
use crate::scene::{Aabb, Source, Wall};

/// Tolerance used for parallel rays, degenerate triangles and quad edges.
pub const OCCLUSION_EPSILON: Float = 1e-3;

/// Smallest intensity the falloff is evaluated with.
pub const MIN_INTENSITY: Float = 1e-3;

/// Absorption per unit length travelled inside a box.
pub const BOX_ABSORPTION: Float = 0.5;

/// Fraction of density removed by each wall crossed.
pub const WALL_PENALTY: Float = 0.2;

/// Result of evaluating the model at a point.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct FieldSample {
    /// Strongest density over all sources, in `[0, 1]`.
    pub density: Float,

    /// Index of the source providing `density`, divided by the source count.
    /// Lies in `[0, 1)`.
    pub dominant: Float,
}

impl FieldSample {
    /// Sample used where there are no sources.
    pub const EMPTY: Self = Self {
        density: 0.0,
        dominant: 0.0,
    };
}

/// Stateless facade over the model functions for callers that prefer a type
/// to a module path.
#[derive(Copy, Clone, Debug, Default)]
pub struct PropagationModel;

impl PropagationModel {
    /// See [`decay`].
    #[inline]
    pub fn decay(dist: Float, intensity: Float) -> Float {
        decay(dist, intensity)
    }

    /// See [`density`].
    pub fn density(p: &Point3f, sources: &[Source], boxes: &[Aabb], walls: &[Wall]) -> FieldSample {
        density(p, sources, boxes, walls)
    }
}

/// Falloff of an unobstructed source: `1 / (dist / intensity + 1)^2`.
///
/// * `dist`      - Distance to the source.
/// * `intensity` - Characteristic range of the source.
#[inline]
pub fn decay(dist: Float, intensity: Float) -> Float {
    let x = dist / max(intensity, MIN_INTENSITY) + 1.0;
    1.0 / (x * x)
}

/// Evaluates the model at `p`.
///
/// * `p`       - The point.
/// * `sources` - Ordered sources.
/// * `boxes`   - Box obstacles.
/// * `walls`   - Wall obstacles.
pub fn density(p: &Point3f, sources: &[Source], boxes: &[Aabb], walls: &[Wall]) -> FieldSample {
    let count = sources.len() as Float;
    let mut best = FieldSample::EMPTY;
    for (i, source) in sources.iter().enumerate() {
        let candidate = source_density(p, source, boxes, walls);
        if i == 0 || candidate > best.density {
            best = FieldSample {
                density: candidate,
                dominant: i as Float / count,
            };
        }
    }
    best
}

/// Returns the contribution of a single source at `p`.
///
/// * `p`      - The point.
/// * `source` - The source.
/// * `boxes`  - Box obstacles.
/// * `walls`  - Wall obstacles.
pub fn source_density(p: &Point3f, source: &Source, boxes: &[Aabb], walls: &[Wall]) -> Float {
    let ray = Ray::between(&source.position, p);
    let unobstructed = decay(ray.t_max, source.intensity);
    if boxes.is_empty() && walls.is_empty() {
        return unobstructed;
    }

    let occluded_len: Float = boxes.iter().map(|b| segment_box_overlap(&ray, b)).sum();
    let walls_crossed = walls.iter().filter(|w| segment_crosses_wall(&ray, w)).count();

    let mut transmittance = 1.0;
    if occluded_len > 0.0 {
        transmittance *= (-BOX_ABSORPTION * occluded_len).exp();
    }
    if walls_crossed > 0 {
        transmittance *= (1.0 - WALL_PENALTY).powi(walls_crossed as i32);
    }
    unobstructed * transmittance
}

/// Returns the length of the segment `[0, ray.t_max]` that lies inside the
/// box. `ray.d` must be unit length.
///
/// * `ray`  - Segment from source to point.
/// * `aabb` - The box.
pub fn segment_box_overlap(ray: &Ray, aabb: &Aabb) -> Float {
    if ray.t_max <= 0.0 {
        return 0.0;
    }
    match aabb.bounds.intersect_p(ray) {
        Some((t0, t1)) => max(0.0, t1 - t0),
        None => 0.0,
    }
}

/// Returns true when the open segment `(0, ray.t_max)` crosses the wall quad.
/// `ray.d` must be unit length.
///
/// * `ray`  - Segment from source to point.
/// * `wall` - The wall.
pub fn segment_crosses_wall(ray: &Ray, wall: &Wall) -> bool {
    let [v0, v1, v2, v3] = wall.vertices();
    let n = (v1 - v0).cross(&(v3 - v0));
    let n_len = n.length();
    if n_len < OCCLUSION_EPSILON {
        return false;
    }
    let n = n / n_len;

    let denom = n.dot(&ray.d);
    if abs(denom) < OCCLUSION_EPSILON {
        return false;
    }

    let t = n.dot(&(v0 - ray.o)) / denom;
    if t <= OCCLUSION_EPSILON || t >= ray.t_max - OCCLUSION_EPSILON {
        return false;
    }

    let hit = ray.at(t);
    inside_triangle(&hit, &v0, &v1, &v2) || inside_triangle(&hit, &v0, &v2, &v3)
}

/// Sign test of a coplanar point against the three edges of a triangle.
/// Degenerate triangles contain nothing.
fn inside_triangle(p: &Point3f, a: &Point3f, b: &Point3f, c: &Point3f) -> bool {
    let n = (*b - *a).cross(&(*c - *a));
    let n_len = n.length();
    if n_len < OCCLUSION_EPSILON {
        return false;
    }
    let n = n / n_len;

    let e0 = (*b - *a).cross(&(*p - *a)).dot(&n);
    let e1 = (*c - *b).cross(&(*p - *b)).dot(&n);
    let e2 = (*a - *c).cross(&(*p - *c)).dot(&n);
    e0 >= -OCCLUSION_EPSILON && e1 >= -OCCLUSION_EPSILON && e2 >= -OCCLUSION_EPSILON
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
#[macro_use]
mod tests {
    use super::*;
    use float_cmp::*;
    use proptest::prelude::*;

    fn source_at_origin() -> Source {
        Source::new(Point3f::ZERO, 2.0)
    }

    #[test]
    fn decay_is_one_at_source_and_quarter_at_intensity() {
        assert_eq!(decay(0.0, 5.0), 1.0);
        assert!(approx_eq!(f32, decay(5.0, 5.0), 0.25, epsilon = 0.00001));
    }

    #[test]
    fn decay_clamps_non_positive_intensity() {
        let d = decay(1.0, 0.0);
        assert!(d.is_finite());
        assert!(d >= 0.0);
        assert_eq!(d, decay(1.0, -3.0));
    }

    #[test]
    fn no_sources_yields_empty_sample() {
        assert_eq!(density(&Point3f::ZERO, &[], &[], &[]), FieldSample::EMPTY);
    }

    #[test]
    fn dominant_index_selects_nearest_source() {
        let sources = [
            Source::new(Point3f::new(-2.0, 0.0, 0.0), 3.0),
            Source::new(Point3f::new(2.0, 0.0, 0.0), 3.0),
        ];
        let left = density(&Point3f::new(-1.0, 0.0, 0.0), &sources, &[], &[]);
        let right = density(&Point3f::new(1.0, 0.0, 0.0), &sources, &[], &[]);
        assert_eq!(left.dominant, 0.0);
        assert_eq!(right.dominant, 0.5);
        assert_eq!(left.density, right.density);
    }

    #[test]
    fn box_between_source_and_point_attenuates() {
        let s = source_at_origin();
        let p = Point3f::new(4.0, 0.0, 0.0);
        let b = Aabb::new(Point3f::new(1.0, -1.0, -1.0), Point3f::new(2.0, 1.0, 1.0));
        let ray = Ray::between(&s.position, &p);
        assert!(approx_eq!(f32, segment_box_overlap(&ray, &b), 1.0, epsilon = 0.0001));

        let free = source_density(&p, &s, &[], &[]);
        let blocked = source_density(&p, &s, &[b], &[]);
        assert!(approx_eq!(f32, blocked, free * (-BOX_ABSORPTION).exp(), epsilon = 0.00001));
    }

    #[test]
    fn box_beyond_point_does_not_attenuate() {
        let s = source_at_origin();
        let p = Point3f::new(0.5, 0.0, 0.0);
        let b = Aabb::new(Point3f::new(1.0, -1.0, -1.0), Point3f::new(2.0, 1.0, 1.0));
        assert_eq!(source_density(&p, &s, &[b], &[]), decay(0.5, s.intensity));
    }

    #[test]
    fn point_inside_box_counts_partial_overlap() {
        let s = source_at_origin();
        let p = Point3f::new(1.5, 0.0, 0.0);
        let b = Aabb::new(Point3f::new(1.0, -1.0, -1.0), Point3f::new(2.0, 1.0, 1.0));
        let ray = Ray::between(&s.position, &p);
        assert!(approx_eq!(f32, segment_box_overlap(&ray, &b), 0.5, epsilon = 0.0001));
    }

    #[test]
    fn wall_crossing_applies_flat_penalty() {
        let s = source_at_origin();
        let w = Wall::new(Point3f::new(1.0, -1.0, -1.0), Point3f::new(1.0, 1.0, 1.0));
        let near = Point3f::new(2.0, 0.0, 0.0);
        let far = Point3f::new(6.0, 0.2, -0.1);

        for p in [near, far] {
            let free = source_density(&p, &s, &[], &[]);
            let blocked = source_density(&p, &s, &[], &[w]);
            assert!(approx_eq!(f32, blocked, free * (1.0 - WALL_PENALTY), epsilon = 0.00001));
        }
    }

    #[test]
    fn segment_passing_beside_wall_is_not_blocked() {
        let s = source_at_origin();
        let w = Wall::new(Point3f::new(1.0, -1.0, -1.0), Point3f::new(1.0, 1.0, 1.0));
        let p = Point3f::new(2.0, 0.0, 3.0);
        let ray = Ray::between(&s.position, &p);
        assert!(!segment_crosses_wall(&ray, &w));
    }

    #[test]
    fn segment_ending_before_wall_is_not_blocked() {
        let s = source_at_origin();
        let w = Wall::new(Point3f::new(1.0, -1.0, -1.0), Point3f::new(1.0, 1.0, 1.0));
        let ray = Ray::between(&s.position, &Point3f::new(0.5, 0.0, 0.0));
        assert!(!segment_crosses_wall(&ray, &w));
    }

    #[test]
    fn segment_parallel_to_wall_is_not_blocked() {
        let w = Wall::new(Point3f::new(1.0, -1.0, -1.0), Point3f::new(1.0, 1.0, 1.0));
        let ray = Ray::between(&Point3f::new(1.0, 0.0, -3.0), &Point3f::new(1.0, 0.0, 3.0));
        assert!(!segment_crosses_wall(&ray, &w));
    }

    #[test]
    fn diagonal_wall_blocks_through_both_triangles() {
        let w = Wall::new(Point3f::new(1.0, 0.0, -1.0), Point3f::new(3.0, 2.0, 1.0));
        let s = Point3f::new(0.0, 0.0, 2.0);
        // One segment crosses the lower-right triangle, one the upper-left.
        let low = Ray::between(&Point3f::new(1.5, 0.3, 2.0), &Point3f::new(3.5, 0.3, -2.0));
        let high = Ray::between(&Point3f::new(1.5, 1.7, 2.0), &Point3f::new(3.5, 1.7, -2.0));
        assert!(segment_crosses_wall(&low, &w));
        assert!(segment_crosses_wall(&high, &w));
        let above = Ray::between(&s, &Point3f::new(4.0, 6.0, -2.0));
        assert!(!segment_crosses_wall(&above, &w));
    }

    #[test]
    fn degenerate_wall_never_blocks() {
        let w = Wall::new(Point3f::new(1.0, -1.0, 0.0), Point3f::new(1.0, 1.0, 0.0));
        let ray = Ray::between(&Point3f::ZERO, &Point3f::new(2.0, 0.0, 0.0));
        assert!(!segment_crosses_wall(&ray, &w));
    }

    prop_point3!(
        point3_f32,
        f32,
        -10.0..10.0f32,
        -10.0..10.0f32,
        -10.0..10.0f32
    );

    prop_compose! {
        fn aabb()(p in point3_f32(), dx in 0.1..3.0f32, dy in 0.1..3.0f32, dz in 0.1..3.0f32) -> Aabb {
            Aabb::new(p, p + Vector3::new(dx, dy, dz))
        }
    }

    prop_compose! {
        fn wall()(p in point3_f32(), dx in -3.0..3.0f32, dy in 0.5..3.0f32, dz in -3.0..3.0f32) -> Wall {
            Wall::new(p, p + Vector3::new(dx, dy, dz))
        }
    }

    proptest! {
        #[test]
        fn unobstructed_density_equals_closed_form(
            s in point3_f32(), p in point3_f32(), intensity in 0.1..20.0f32,
        ) {
            let source = Source::new(s, intensity);
            let sample = density(&p, &[source], &[], &[]);
            let ray = Ray::between(&s, &p);
            prop_assert_eq!(sample.density, decay(ray.t_max, intensity));
            prop_assert_eq!(sample.dominant, 0.0);
        }

        #[test]
        fn density_is_non_increasing_with_distance(
            s in point3_f32(), d in point3_f32(), intensity in 0.1..20.0f32,
            t0 in 0.0..5.0f32, dt in 0.0..5.0f32,
        ) {
            let dir = Vector3::from(d);
            prop_assume!(dir.length() > 0.1);
            let dir = dir.normalize();
            let source = Source::new(s, intensity);
            let near = density(&(s + dir * t0), &[source], &[], &[]);
            let far = density(&(s + dir * (t0 + dt)), &[source], &[], &[]);
            prop_assert!(far.density <= near.density + 1e-4);
        }

        #[test]
        fn adding_obstacles_never_increases_density(
            s in point3_f32(), p in point3_f32(), intensity in 0.1..20.0f32,
            b in aabb(), w in wall(),
        ) {
            let source = Source::new(s, intensity);
            let free = density(&p, &[source], &[], &[]).density;
            let with_box = density(&p, &[source], &[b], &[]).density;
            let with_both = density(&p, &[source], &[b], &[w]).density;
            prop_assert!(with_box <= free);
            prop_assert!(with_both <= with_box);
            prop_assert!(with_both >= 0.0);
        }

        #[test]
        fn dominant_index_is_in_unit_range(
            p in point3_f32(), s1 in point3_f32(), s2 in point3_f32(), s3 in point3_f32(),
        ) {
            let sources = [Source::new(s1, 1.0), Source::new(s2, 2.0), Source::new(s3, 3.0)];
            let sample = density(&p, &sources, &[], &[]);
            prop_assert!(sample.dominant >= 0.0 && sample.dominant < 1.0);
            prop_assert!(sample.density > 0.0 && sample.density <= 1.0);
        }
    }
}
