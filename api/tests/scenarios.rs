use api::*;
use float_cmp::*;
use samplers::*;
use wavemap_core::config::*;
use wavemap_core::error::*;
use wavemap_core::geometry::*;
use wavemap_core::propagation::WALL_PENALTY;
use wavemap_core::scene::*;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// 10 x 3 x 10 room sampled at 16 x 8 x 16 with one source in the middle.
fn room() -> Configuration {
    Configuration::new()
        .with_bounds(Bounds3f::new(
            Point3f::new(-5.0, 0.0, -5.0),
            Point3f::new(5.0, 3.0, 5.0),
        ))
        .with_resolution(16, 8)
        .with_isovalue(0.5)
        .with_source(Source::new(Point3f::new(0.0, 1.5, 0.0), 10.0))
}

fn pipeline() -> Pipeline {
    Pipeline::new(Options::with_threads(4))
}

#[test]
fn single_source_surface_is_centered_on_source() {
    init();
    let snapshot = pipeline().run(1, &room()).unwrap();
    let mesh = &snapshot.mesh;
    assert!(mesh.triangle_count() > 0);
    assert!(mesh.triangle_count() < DEFAULT_MAX_TRIANGLES);
    assert!(!mesh.is_truncated());
    assert!(snapshot.warnings.is_empty());

    let c = mesh.bounds().unwrap().center();
    assert!(approx_eq!(f32, c.x, 0.0, epsilon = 0.05), "center {:?}", c);
    assert!(approx_eq!(f32, c.z, 0.0, epsilon = 0.05), "center {:?}", c);

    // Unobstructed level set of 1 / (d / 10 + 1)^2 = 0.5.
    let radius = 10.0 * (2.0f32.sqrt() - 1.0);
    let slack = snapshot.volume.cell_size().length();
    for p in mesh.positions.iter() {
        let d = p.distance(&Point3f::new(0.0, 1.5, 0.0));
        assert!((d - radius).abs() <= slack, "vertex {:?} at {}", p, d);
    }
}

#[test]
fn box_shadows_positive_x_half() {
    init();
    let c = room().with_box(Aabb::new(
        Point3f::new(1.0, 0.0, -5.0),
        Point3f::new(1.2, 3.0, 5.0),
    ));
    let v = VoxelSampler::new(Options::with_threads(2)).sample(&c).unwrap();
    let (nx, ny, nz) = v.dims();
    for iz in 0..nz {
        for iy in 0..ny {
            for ix in 10..nx {
                let shadowed = v.density_at(ix, iy, iz);
                let mirrored = v.density_at(nx - 1 - ix, iy, iz);
                assert!(shadowed < mirrored, "node ({ix}, {iy}, {iz})");
            }
        }
    }
}

#[test]
fn wall_applies_flat_penalty_behind_it() {
    init();
    let c = room().with_wall(Wall::new(
        Point3f::new(1.0, 0.0, -5.0),
        Point3f::new(1.0, 3.0, 5.0),
    ));
    let v = VoxelSampler::new(Options::with_threads(1)).sample(&c).unwrap();
    let (nx, ny, nz) = v.dims();
    for iz in 1..nz - 1 {
        for iy in 1..ny - 1 {
            for ix in 10..nx {
                let behind = v.density_at(ix, iy, iz);
                let mirrored = v.density_at(nx - 1 - ix, iy, iz);
                assert!(
                    approx_eq!(f32, behind, mirrored * (1.0 - WALL_PENALTY), epsilon = 0.0001),
                    "node ({ix}, {iy}, {iz})"
                );
            }
        }
    }
}

#[test]
fn symmetric_sources_mirror_fields() {
    init();
    let c = room()
        .with_scene(
            Scene::new()
                .with_source(Source::new(Point3f::new(-2.0, 1.5, 0.0), 4.0))
                .with_source(Source::new(Point3f::new(2.0, 1.5, 0.0), 4.0)),
        )
        .with_colors(true)
        .with_mode(FieldMode::DominantSource);
    let snapshot = pipeline().run(1, &c).unwrap();
    let v = &snapshot.volume;
    let (nx, ny, nz) = v.dims();
    for iz in 0..nz {
        for iy in 0..ny {
            for ix in 0..nx {
                let m = nx - 1 - ix;
                assert!(approx_eq!(
                    f32,
                    v.density_at(ix, iy, iz),
                    v.density_at(m, iy, iz),
                    epsilon = 0.00001
                ));
                let expected = if ix < nx / 2 { 0.0 } else { 0.5 };
                assert_eq!(v.dominant_at(ix, iy, iz), expected);
                assert_eq!(v.dominant_at(m, iy, iz), 0.5 - expected);
            }
        }
    }
    let colors = v.colors.as_ref().unwrap();
    assert_ne!(colors[v.offset(0, 0, 0)], colors[v.offset(nx - 1, 0, 0)]);
}

#[test]
fn sampling_is_idempotent() {
    init();
    let c = room()
        .with_box(Aabb::new(Point3f::new(-3.0, 0.0, 1.0), Point3f::new(-2.0, 1.0, 2.0)))
        .with_wall(Wall::new(Point3f::new(2.0, 0.0, -4.0), Point3f::new(4.0, 3.0, -1.0)));
    let p = pipeline();
    assert_eq!(p.run(3, &c).unwrap(), p.run(3, &c).unwrap());
}

#[test]
fn floor_heatmap_matches_volume_slice() {
    init();
    let c = room().with_wall(Wall::new(
        Point3f::new(-1.0, 0.0, 2.0),
        Point3f::new(3.0, 3.0, 2.5),
    ));
    let v = VoxelSampler::new(Options::with_threads(3)).sample(&c).unwrap();
    let floor_y = v.node_position(0, 3, 0).y;
    let floor = FloorShader::new(Options::with_threads(2))
        .shade(&c, 16, 16, floor_y)
        .unwrap();
    for iz in 0..16 {
        for ix in 0..16 {
            assert_eq!(floor.density_at(ix, iz), v.density_at(ix, 3, iz));
        }
    }
}

#[test]
fn point_query_matches_volume_node() {
    init();
    let c = room().with_box(Aabb::new(Point3f::new(1.0, 0.0, 1.0), Point3f::new(2.0, 2.0, 2.0)));
    let snapshot = pipeline().run(1, &c).unwrap();
    let v = &snapshot.volume;
    let p = v.node_position(12, 2, 13);
    let sample = snapshot.configuration.scene.density_at(&p);
    assert_eq!(sample.density, v.density_at(12, 2, 13));
}

#[test]
fn out_of_range_isovalue_gives_empty_mesh() {
    init();
    let p = pipeline();
    for _ in 0..2 {
        let snapshot = p.run(1, &room().with_isovalue(1.5)).unwrap();
        assert!(snapshot.mesh.is_empty());
        assert!(snapshot.warnings.is_empty());
    }
}

#[test]
fn triangle_budget_is_reported() {
    init();
    let snapshot = pipeline().run(1, &room().with_max_triangles(10)).unwrap();
    assert_eq!(snapshot.mesh.triangle_count(), 10);
    assert!(snapshot.mesh.is_truncated());
    assert_eq!(
        snapshot.warnings,
        vec![Warning::MeshBudgetExceeded { limit: 10 }]
    );
}

#[test]
fn sanitizing_warnings_reach_snapshot() {
    init();
    let c = room()
        .with_source(Source::new(Point3f::new(3.0, 1.0, 3.0), 0.0))
        .with_wall(Wall::new(Point3f::new(1.0, 0.0, 1.0), Point3f::new(1.0, 3.0, 1.0)));
    let snapshot = pipeline().run(1, &c).unwrap();
    assert_eq!(
        snapshot.warnings,
        vec![
            Warning::DegenerateSource {
                index: 1,
                intensity: 0.0
            },
            Warning::DegenerateWall { index: 0 },
        ]
    );
    assert!(snapshot.configuration.scene.walls.is_empty());
    assert!(snapshot.room.walls.is_empty());
    assert!(snapshot
        .volume
        .density
        .iter()
        .all(|d| d.is_finite() && *d >= 0.0 && *d <= 1.0));
}

#[test]
fn room_geometry_covers_obstacles() {
    init();
    let c = room()
        .with_box(Aabb::new(Point3f::new(1.0, 0.0, 1.0), Point3f::new(2.0, 1.0, 2.0)))
        .with_wall(Wall::new(Point3f::new(-4.0, 0.0, 3.0), Point3f::new(4.0, 3.0, 3.0)));
    let snapshot = pipeline().run(1, &c).unwrap();
    assert_eq!(snapshot.room.boxes.len(), 1);
    assert_eq!(snapshot.room.walls.len(), 1);
    assert_eq!(snapshot.room.floor.positions[0], Point3f::new(-5.0, 0.0, -5.0));
}

#[test]
fn capacity_is_enforced() {
    init();
    let mut c = room();
    for i in 0..MAX_WALLS + 1 {
        let x = -4.0 + 0.2 * i as f32;
        c = c.with_wall(Wall::new(Point3f::new(x, 0.0, -1.0), Point3f::new(x, 3.0, 1.0)));
    }
    assert_eq!(
        pipeline().run(1, &c),
        Err(Error::CapacityExceeded {
            kind: EntryKind::Wall,
            count: MAX_WALLS + 1,
            limit: MAX_WALLS
        })
    );
}

#[test]
fn oversized_grid_is_rejected() {
    init();
    let options = Options {
        n_threads: 1,
        max_nodes: 10_000,
    };
    assert_eq!(
        Pipeline::new(options).run(1, &room().with_resolution(64, 8)),
        Err(Error::ResourceExhausted {
            nodes: 64 * 8 * 64,
            limit: 10_000
        })
    );
}
