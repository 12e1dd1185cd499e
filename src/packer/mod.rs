//! # Packer Module
//!
//! Packing session combining the volume, registry, grid and both engines.
//!
//! ```text
//! groups ──▶ registry ──▶ feasibility (V1/V0 ≤ 0.7)
//!                              │
//!                              ▼
//!              initial placement ──▶ grow-and-shake (optional)
//!                              │
//!                              ▼
//!                    verification ──▶ distribution file
//! ```

pub mod placement;
pub mod refinement;

pub use placement::{InitialPlacement, PlacementReport, RoundProgress};
pub use refinement::{GrowAndShake, RefinementParams, RefinementReport};

use rayon::prelude::*;
use serde::Serialize;
use std::time::{Duration, Instant};

use crate::constants::{sphere_volume, INITIAL_RADIUS_FRACTION, MAX_PACKING_FRACTION};
use crate::error::{PackError, PackResult};
use crate::geometry::BoundingVolume;
use crate::grid::SpatialGrid;
use crate::particle::{ParticleGroupSpec, ParticleRegistry};
use crate::stochastic::RandomGenerator;

// ============================================================================
// PACKING STATE
// ============================================================================

/// Mutable state shared by the placement and refinement engines
#[derive(Debug, Clone)]
pub struct PackingState {
    pub volume: BoundingVolume,
    pub registry: ParticleRegistry,
    pub grid: SpatialGrid,
    /// V0
    pub container_volume: f64,
    /// V1
    pub requested_volume: f64,
    /// V2, maintained incrementally
    pub committed_volume: f64,
}

impl PackingState {
    /// Build the registry and grid and enforce the feasibility cap.
    ///
    /// `initial_fraction` is the seed radius fraction (1.0 without
    /// refinement). No position is sampled here.
    pub fn new(volume: BoundingVolume, groups: &[ParticleGroupSpec], initial_fraction: f64) -> PackResult<Self> {
        if groups.is_empty() {
            return Err(PackError::config("at least one particle group is required"));
        }

        let v0 = volume.volume();
        let inscribed = volume.inscribed_radius();
        let mut total = 0usize;
        let mut v1 = 0.0;
        for spec in groups {
            spec.validate()?;
            if spec.radius >= inscribed {
                return Err(PackError::config(format!(
                    "group '{}': radius {} does not fit in the {} (largest admissible radius {})",
                    spec.tag, spec.radius, volume.name(), inscribed
                )));
            }
            let count = spec.resolve_count(v0);
            if count == 0 {
                log::warn!("group '{}' resolves to zero particles", spec.tag);
            }
            total = total.saturating_add(count);
            v1 += count as f64 * sphere_volume(spec.radius);
        }
        if total == 0 {
            return Err(PackError::config("the requested groups contain no particles"));
        }

        // V1 from the specs, before any particle is allocated
        let requested = v1 / v0;
        if requested > MAX_PACKING_FRACTION {
            return Err(PackError::Infeasible { requested, limit: MAX_PACKING_FRACTION });
        }

        let mut registry = ParticleRegistry::new();
        for spec in groups {
            registry.add_group(spec.clone(), v0, initial_fraction)?;
        }
        let v1 = registry.requested_volume();

        let grid = SpatialGrid::new(volume.bounding_box(), registry.max_radius())?;

        Ok(Self {
            volume,
            registry,
            grid,
            container_volume: v0,
            requested_volume: v1,
            committed_volume: 0.0,
        })
    }

    /// V1 / V0
    pub fn requested_fraction(&self) -> f64 {
        self.requested_volume / self.container_volume
    }

    /// V2 / V0
    pub fn achieved_fraction(&self) -> f64 {
        self.committed_volume / self.container_volume
    }
}

// ============================================================================
// REPORT
// ============================================================================

/// Summary of a finished packing run
#[derive(Debug, Clone, Serialize)]
pub struct PackingReport {
    pub seed: u64,
    pub particles: usize,
    pub container_volume: f64,
    pub requested_fraction: f64,
    pub achieved_fraction: f64,
    pub placement: PlacementReport,
    pub refinement: Option<RefinementReport>,
    pub elapsed: Duration,
}

// ============================================================================
// DENSE PACKER
// ============================================================================

/// Packing session driver
pub struct DensePacker {
    state: PackingState,
    rng: RandomGenerator,
    refinement: Option<GrowAndShake>,
}

impl DensePacker {
    /// Prepare a session; fails fast on bad input or infeasible density
    pub fn new(
        volume: BoundingVolume,
        groups: &[ParticleGroupSpec],
        refinement: Option<RefinementParams>,
        seed: u64,
    ) -> PackResult<Self> {
        if let Some(params) = &refinement {
            params.validate()?;
        }
        let initial_fraction = if refinement.is_some() { INITIAL_RADIUS_FRACTION } else { 1.0 };
        let state = PackingState::new(volume, groups, initial_fraction)?;

        log::info!(
            "{}: V0 = {:.6e}, {} particles, requested packing fraction {:.5}",
            state.volume,
            state.container_volume,
            state.registry.len(),
            state.requested_fraction()
        );
        log::debug!("{}", state.grid);

        Ok(Self {
            state,
            rng: RandomGenerator::new(seed),
            refinement: refinement.map(GrowAndShake::new),
        })
    }

    pub fn state(&self) -> &PackingState {
        &self.state
    }

    pub fn registry(&self) -> &ParticleRegistry {
        &self.state.registry
    }

    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    /// Run placement, then refinement when configured
    pub fn run(&mut self) -> PackResult<PackingReport> {
        let start = Instant::now();

        let placement = InitialPlacement::new().run(&mut self.state, &mut self.rng)?;
        let refinement = match &self.refinement {
            Some(engine) => Some(engine.run(&mut self.state, &mut self.rng)?),
            None => None,
        };

        if cfg!(debug_assertions) {
            self.state.grid.verify(&self.state.registry)?;
        }

        let report = PackingReport {
            seed: self.rng.seed(),
            particles: self.state.registry.len(),
            container_volume: self.state.container_volume,
            requested_fraction: self.state.requested_fraction(),
            achieved_fraction: self.state.achieved_fraction(),
            placement,
            refinement,
            elapsed: start.elapsed(),
        };
        log::info!(
            "packed {} particles, packing fraction {:.5} in {:.3} s",
            report.particles,
            report.achieved_fraction,
            report.elapsed.as_secs_f64()
        );
        Ok(report)
    }
}

// ============================================================================
// VERIFICATION
// ============================================================================

/// Re-check the final packing: every particle placed at full radius,
/// contained, and free of overlaps.
pub fn verify_packing(state: &PackingState) -> PackResult<()> {
    let registry = &state.registry;
    let violations: Vec<String> = registry
        .particles()
        .par_iter()
        .filter_map(|p| {
            if !p.is_committed() || p.current_radius() != p.radius() {
                Some(format!("particle {} is not placed at full radius", p.id()))
            } else if !state.volume.contains(&p.position(), p.radius()) {
                Some(format!("particle {} at {} leaves the container", p.id(), p.position()))
            } else if state.grid.query_overlap(registry, &p.position(), p.radius(), Some(p.id())) {
                Some(format!("particle {} at {} overlaps a neighbour", p.id(), p.position()))
            } else {
                None
            }
        })
        .collect();

    match violations.first() {
        None => Ok(()),
        Some(first) => Err(PackError::internal(format!(
            "{} verification failures, first: {}",
            violations.len(),
            first
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::VolumeSpec;
    use crate::types::Vec3;

    fn sphere(radius: f64) -> BoundingVolume {
        BoundingVolume::from_spec(&VolumeSpec::Sphere { radius }).unwrap()
    }

    #[test]
    fn test_feasibility_cap() {
        let err = PackingState::new(
            sphere(5.0),
            &[
                ParticleGroupSpec::new(0.5, 0.2, "a"),
                ParticleGroupSpec::new(0.3, 0.3, "b"),
            ],
            1.0,
        )
        .unwrap_err();
        match err {
            PackError::Infeasible { requested, limit } => {
                assert!((requested - 0.8).abs() < 0.01);
                assert_eq!(limit, MAX_PACKING_FRACTION);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_huge_count_is_infeasible_not_allocated() {
        let result = DensePacker::new(sphere(10.0), &[ParticleGroupSpec::new(1e15, 0.1, "a")], None, 1);
        match result {
            Err(PackError::Infeasible { requested, limit }) => {
                assert!(requested > 1e8);
                assert_eq!(limit, MAX_PACKING_FRACTION);
            }
            Err(other) => panic!("unexpected error {:?}", other),
            Ok(_) => panic!("1e15 particles accepted"),
        }
    }

    #[test]
    fn test_radius_must_fit() {
        let err = PackingState::new(sphere(1.0), &[ParticleGroupSpec::new(2.0, 1.0, "a")], 1.0).unwrap_err();
        assert!(matches!(err, PackError::Config(_)));
    }

    #[test]
    fn test_empty_groups() {
        assert!(PackingState::new(sphere(1.0), &[], 1.0).is_err());
        // a fraction that rounds to zero particles
        assert!(PackingState::new(sphere(1.0), &[ParticleGroupSpec::new(1e-9, 0.1, "a")], 1.0).is_err());
    }

    #[test]
    fn test_grid_sized_by_largest_radius() {
        let state = PackingState::new(
            sphere(10.0),
            &[
                ParticleGroupSpec::new(10.0, 0.1, "small"),
                ParticleGroupSpec::new(10.0, 1.0, "large"),
            ],
            1.0,
        )
        .unwrap();
        assert_eq!(state.grid.dims(), [10, 10, 10]);
    }

    #[test]
    fn test_run_without_refinement() {
        let mut packer = DensePacker::new(sphere(10.0), &[ParticleGroupSpec::new(100.0, 0.5, "1")], None, 42).unwrap();
        let report = packer.run().unwrap();

        assert_eq!(report.particles, 100);
        assert!(report.refinement.is_none());
        verify_packing(packer.state()).unwrap();
        for p in packer.registry().iter() {
            assert_eq!(p.current_radius(), 0.5);
            assert!(p.position().mag_squared() <= 9.5 * 9.5 + 1e-9);
        }
    }

    #[test]
    fn test_run_with_refinement() {
        let mut packer = DensePacker::new(
            sphere(4.0),
            &[ParticleGroupSpec::new(0.2, 0.3, "triso")],
            Some(RefinementParams::new(0.2, 0.1)),
            9,
        )
        .unwrap();
        let report = packer.run().unwrap();
        let refinement = report.refinement.unwrap();
        assert_eq!(refinement.min_ratio_history.last().copied(), Some(1.0));
        assert!((report.achieved_fraction - report.requested_fraction).abs() < 1e-9);
        verify_packing(packer.state()).unwrap();
    }

    #[test]
    fn test_verify_detects_overlap() {
        let mut packer = DensePacker::new(sphere(5.0), &[ParticleGroupSpec::new(2.0, 0.5, "a")], None, 3).unwrap();
        packer.run().unwrap();

        // force the second particle onto the first without touching the grid
        let first = packer.state.registry.get(0).position();
        let range_old = packer.state.grid.cell_range_for(&packer.state.registry.get(1).position(), 0.5);
        let range_new = packer.state.grid.cell_range_for(&first, 0.5);
        packer.state.grid.relocate(1, &range_old, &range_new).unwrap();
        packer.state.registry.get_mut(1).position = first + Vec3::new(0.1, 0.0, 0.0);
        assert!(verify_packing(packer.state()).is_err());
    }

    #[test]
    fn test_invalid_refinement_rejected() {
        let result = DensePacker::new(
            sphere(5.0),
            &[ParticleGroupSpec::new(10.0, 0.5, "a")],
            Some(RefinementParams::new(0.1, 2.0)),
            1,
        );
        assert!(matches!(result, Err(PackError::Config(_))));
    }
}
