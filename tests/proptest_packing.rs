//! Property-based tests for the packing invariants using proptest
//!
//! - Grid buckets always match the cell range of each stored sphere
//! - Sampled centres keep the sphere inside its volume
//! - Finished packings have no overlap and no escaped sphere

use densepack_rs::grid::CellRange;
use densepack_rs::*;
use proptest::prelude::*;

const HALF_WIDTH: f64 = 5.0;
const MAX_RADIUS: f64 = 0.5;

/// Strategy for a point inside the grid bounds
fn grid_point() -> impl Strategy<Value = Vec3> {
    (-HALF_WIDTH..HALF_WIDTH, -HALF_WIDTH..HALF_WIDTH, -HALF_WIDTH..HALF_WIDTH)
        .prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

/// Strategy for any of the six solids, with moderate parameters
fn volume_spec() -> impl Strategy<Value = VolumeSpec> {
    prop_oneof![
        (2.0..8.0f64).prop_map(|radius| VolumeSpec::Sphere { radius }),
        (2.0..6.0f64, -4.0..-1.0f64, 1.0..4.0f64)
            .prop_map(|(radius, zmin, zmax)| VolumeSpec::Cylinder { radius, zmin, zmax }),
        (1.5..6.0f64).prop_map(|half_width| VolumeSpec::Cube { half_width }),
        (0.5..2.0f64, 2.0..3.0f64, 2.0..4.0f64).prop_map(|(inner, width, height)| VolumeSpec::AnnularCylinder {
            inner_radius: inner,
            outer_radius: inner + width,
            zmin: -height / 2.0,
            zmax: height / 2.0,
        }),
        (1.5..5.0f64, 1.5..5.0f64, 1.5..5.0f64)
            .prop_map(|(half_x, half_y, half_z)| VolumeSpec::Cuboid { half_x, half_y, half_z }),
        (3.0..6.0f64, 3.0..6.0f64, 3.0..6.0f64, -30.0..30.0f64, 0.0..30.0f64, 0.0..360.0f64)
            .prop_map(|(la, lb, lc, psi, theta, phi)| VolumeSpec::Parallelepiped { la, lb, lc, psi, theta, phi }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: after any insert/relocate/remove sequence each id sits in
    /// exactly the buckets of its current cell range
    #[test]
    fn test_grid_buckets_match_ranges(
        moves in prop::collection::vec((0usize..8, grid_point(), 0.01..MAX_RADIUS), 1..60)
    ) {
        let mut grid = SpatialGrid::new(Aabb::centered(HALF_WIDTH, HALF_WIDTH, HALF_WIDTH), MAX_RADIUS).unwrap();
        let mut ranges: Vec<Option<CellRange>> = vec![None; 8];

        for (id, position, radius) in moves {
            let new = grid.cell_range_for(&position, radius);
            match ranges[id] {
                // every third move on a stored id removes it instead
                Some(old) if id % 3 == 0 => {
                    grid.remove(id, &old).unwrap();
                    ranges[id] = None;
                }
                Some(old) => {
                    grid.relocate(id, &old, &new).unwrap();
                    ranges[id] = Some(new);
                }
                None => {
                    grid.insert(id, &new).unwrap();
                    ranges[id] = Some(new);
                }
            }
        }

        let mut expected_entries = 0;
        for (id, range) in ranges.iter().enumerate() {
            let mut cells = grid.buckets_containing(id);
            cells.sort_unstable();
            let mut expected: Vec<_> = range.map(|r| r.cells().collect()).unwrap_or_default();
            expected.sort_unstable();
            expected_entries += expected.len();
            prop_assert_eq!(cells, expected, "id {}", id);
        }
        prop_assert_eq!(grid.total_entries(), expected_entries);
    }

    /// Property: a sampled centre keeps the sphere inside the solid
    #[test]
    fn test_sampled_spheres_contained(spec in volume_spec(), seed in any::<u64>(), fraction in 0.05..0.9f64) {
        let volume = BoundingVolume::from_spec(&spec).unwrap();
        let radius = fraction * volume.inscribed_radius();
        let mut rng = RandomGenerator::new(seed);
        for _ in 0..20 {
            let p = volume.sample_uniform(&mut rng, radius);
            prop_assert!(volume.contains(&p, radius), "{} escaped {} with radius {}", p, volume, radius);
            prop_assert!(volume.bounding_box().contains_point(&p));
        }
    }

    /// Property: a finished packing is overlap-free, contained, and indexed
    #[test]
    fn test_packing_invariants(spec in volume_spec(), seed in any::<u64>(), refine in any::<bool>()) {
        let volume = BoundingVolume::from_spec(&spec).unwrap();
        let radius = (0.2 * volume.inscribed_radius()).min(0.4);
        let refinement = refine.then(|| RefinementParams::new(0.1, 0.25));
        let mut packer = DensePacker::new(volume, &[ParticleGroupSpec::new(0.1, radius, "p")], refinement, seed).unwrap();
        packer.run().unwrap();

        let state = packer.state();
        prop_assert!(verify_packing(state).is_ok());
        prop_assert!(state.grid.verify(&state.registry).is_ok());
        let ps = state.registry.particles();
        for i in 0..ps.len() {
            for j in (i + 1)..ps.len() {
                let d = ps[i].position().distance_squared(&ps[j].position()).sqrt();
                prop_assert!(d >= ps[i].radius() + ps[j].radius());
            }
        }
    }
}
