//! # Grow-and-Shake Refinement
//!
//! Particles are placed at a seed radius and then grown toward their
//! target radius in full sweeps. Each particle in turn:
//!
//! 1. **Grows**: `crp' = min(rp, crp + g·rp)`, accepted when the sphere at
//!    `crp'` is contained and overlaps nothing.
//! 2. **Shakes**: `x' = x + U(−1, 1)³ · s·rp`, accepted under the same test
//!    at the current radius.
//!
//! Radii never shrink, so `min(crp/rp)` is non-decreasing sweep over sweep;
//! a regression means the grid and registry disagree.

use serde::{Deserialize, Serialize};

use super::PackingState;
use crate::constants::{sphere_volume, MAX_GROWTH_RATE, MIN_GROWTH_RATE};
use crate::error::{PackError, PackResult};
use crate::particle::ParticleState;
use crate::stochastic::RandomGenerator;

/// Grow-and-shake settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RefinementParams {
    /// Shake amplitude as a fraction of the target radius (s ≥ 0)
    pub shake_factor: f64,
    /// Radius increment per sweep as a fraction of the target radius, (0.0001, 1]
    pub growth_rate: f64,
}

impl RefinementParams {
    pub fn new(shake_factor: f64, growth_rate: f64) -> Self {
        Self { shake_factor, growth_rate }
    }

    pub fn validate(&self) -> PackResult<()> {
        if !(self.shake_factor.is_finite() && self.shake_factor >= 0.0) {
            return Err(PackError::config(format!(
                "shake factor must be non-negative, got {}",
                self.shake_factor
            )));
        }
        if !(self.growth_rate > MIN_GROWTH_RATE && self.growth_rate <= MAX_GROWTH_RATE) {
            return Err(PackError::config(format!(
                "growth rate must lie in ({}, {}], got {}",
                MIN_GROWTH_RATE, MAX_GROWTH_RATE, self.growth_rate
            )));
        }
        Ok(())
    }
}

/// Outcome of the refinement phase
#[derive(Debug, Clone, Default, Serialize)]
pub struct RefinementReport {
    pub sweeps: usize,
    /// min(crp/rp) after each sweep
    pub min_ratio_history: Vec<f64>,
    pub accepted_growths: usize,
    pub accepted_shakes: usize,
}

/// Grow-and-shake engine
#[derive(Debug, Clone, Copy)]
pub struct GrowAndShake {
    params: RefinementParams,
}

impl GrowAndShake {
    pub fn new(params: RefinementParams) -> Self {
        Self { params }
    }

    /// Sweep until every particle reaches its target radius
    pub fn run(&self, state: &mut PackingState, rng: &mut RandomGenerator) -> PackResult<RefinementReport> {
        let mut report = RefinementReport::default();
        if let Some(id) = state.registry.ids_where(|p| !p.is_committed()).first() {
            return Err(PackError::internal(format!("particle {} is not placed before refinement", id)));
        }

        let mut min_ratio = state.registry.min_growth_ratio();
        log::info!(
            "grow-and-shake: growth rate {}, shake factor {}, starting at min radius ratio {:.5}",
            self.params.growth_rate, self.params.shake_factor, min_ratio
        );

        while min_ratio < 1.0 {
            report.sweeps += 1;
            for id in 0..state.registry.len() {
                if self.grow(state, id)? {
                    report.accepted_growths += 1;
                }
                if self.shake(state, rng, id)? {
                    report.accepted_shakes += 1;
                }
            }

            let ratio = state.registry.min_growth_ratio();
            if ratio < min_ratio {
                return Err(PackError::internal(format!(
                    "minimum radius ratio regressed from {} to {} in sweep {}",
                    min_ratio, ratio, report.sweeps
                )));
            }
            min_ratio = ratio;
            report.min_ratio_history.push(ratio);
            log::info!(
                "sweep {:>5}: min radius ratio {:.5}, packing fraction {:.5}, {} grown",
                report.sweeps,
                ratio,
                state.achieved_fraction(),
                state.registry.count_in_state(ParticleState::Grown)
            );
        }

        log::debug!(
            "refinement done: {} sweeps, {} growths, {} shakes accepted",
            report.sweeps, report.accepted_growths, report.accepted_shakes
        );
        Ok(report)
    }

    /// Growth step for one particle
    fn grow(&self, state: &mut PackingState, id: usize) -> PackResult<bool> {
        let p = state.registry.get(id);
        if p.state() != ParticleState::Growing {
            return Ok(false);
        }
        let (position, radius, target) = (p.position(), p.current_radius(), p.radius());
        let candidate = (radius + self.params.growth_rate * target).min(target);

        if !state.volume.contains(&position, candidate)
            || state.grid.query_overlap(&state.registry, &position, candidate, Some(id))
        {
            return Ok(false);
        }

        let old = state.grid.cell_range_for(&position, radius);
        let new = state.grid.cell_range_for(&position, candidate);
        state.grid.relocate(id, &old, &new)?;

        let p = state.registry.get_mut(id);
        p.current_radius = candidate;
        if candidate >= target {
            p.current_radius = target;
            p.state = ParticleState::Grown;
        }
        state.committed_volume += sphere_volume(candidate) - sphere_volume(radius);
        Ok(true)
    }

    /// Shake step for one particle at its current radius
    fn shake(&self, state: &mut PackingState, rng: &mut RandomGenerator, id: usize) -> PackResult<bool> {
        if self.params.shake_factor == 0.0 {
            return Ok(false);
        }
        let p = state.registry.get(id);
        let (position, radius) = (p.position(), p.current_radius());
        let candidate = position + rng.displacement(self.params.shake_factor * p.radius());

        if !state.volume.contains(&candidate, radius)
            || state.grid.query_overlap(&state.registry, &candidate, radius, Some(id))
        {
            return Ok(false);
        }

        let old = state.grid.cell_range_for(&position, radius);
        let new = state.grid.cell_range_for(&candidate, radius);
        state.grid.relocate(id, &old, &new)?;
        state.registry.get_mut(id).position = candidate;
        Ok(true)
    }
}
