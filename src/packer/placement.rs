//! # Initial Placement
//!
//! Random sequential placement with deferred retries.
//!
//! Each round resamples every pending particle inside the container, then
//! walks the pending list in creation order and commits each particle that
//! overlaps nothing committed so far. Losers wait for the next round. The
//! loop ends when no particle is pending; termination relies on the
//! feasibility cap checked before the engine starts.

use serde::Serialize;

use super::PackingState;
use crate::constants::sphere_volume;
use crate::error::PackResult;
use crate::stochastic::RandomGenerator;

/// Progress snapshot after a placement round
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RoundProgress {
    pub round: usize,
    /// Particles still pending
    pub pending: usize,
    /// V2 / V0
    pub achieved_fraction: f64,
    /// V1 / V0
    pub requested_fraction: f64,
}

/// Outcome of the placement phase
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlacementReport {
    pub rounds: usize,
    /// One entry per round in which the pending count changed
    pub progress: Vec<RoundProgress>,
}

/// Placement engine
#[derive(Debug, Clone, Copy, Default)]
pub struct InitialPlacement;

impl InitialPlacement {
    pub fn new() -> Self {
        Self
    }

    /// Commit every pending particle
    pub fn run(&self, state: &mut PackingState, rng: &mut RandomGenerator) -> PackResult<PlacementReport> {
        let mut report = PlacementReport::default();
        let mut pending = state.registry.ids_where(|p| !p.is_committed());
        let mut last_pending = None;

        log::info!("placing {} particles", pending.len());

        while !pending.is_empty() {
            report.rounds += 1;

            for &id in &pending {
                let radius = state.registry.get(id).current_radius();
                let position = state.volume.sample_uniform(rng, radius);
                state.registry.get_mut(id).position = position;
            }

            for &id in &pending {
                self.try_commit(state, id)?;
            }

            pending.retain(|&id| !state.registry.get(id).is_committed());

            let n = pending.len();
            if last_pending != Some(n) {
                let progress = RoundProgress {
                    round: report.rounds,
                    pending: n,
                    achieved_fraction: state.achieved_fraction(),
                    requested_fraction: state.requested_fraction(),
                };
                log::info!(
                    "round {:>5}: {:>8} pending, packing fraction {:.5} of {:.5}",
                    progress.round, progress.pending, progress.achieved_fraction, progress.requested_fraction
                );
                report.progress.push(progress);
            }
            last_pending = Some(n);
        }

        log::debug!("placement converged after {} rounds", report.rounds);
        Ok(report)
    }

    /// Commit `id` at its sampled position unless it overlaps a committed particle
    fn try_commit(&self, state: &mut PackingState, id: usize) -> PackResult<bool> {
        let p = state.registry.get(id);
        let (position, radius) = (p.position(), p.current_radius());
        if state.grid.query_overlap(&state.registry, &position, radius, Some(id)) {
            return Ok(false);
        }

        let range = state.grid.cell_range_for(&position, radius);
        state.grid.insert(id, &range)?;
        let p = state.registry.get_mut(id);
        p.state = p.committed_state();
        state.committed_volume += sphere_volume(radius);
        Ok(true)
    }
}
