//! # Particle Module
//!
//! Registry of the spheres being packed.
//!
//! Particles live in an arena indexed by their creation order. The target
//! radius is fixed at creation; placement and refinement only move a
//! particle, grow its current radius and advance its state:
//!
//! ```text
//! Pending ──commit──▶ Growing ──grow to rp──▶ Grown
//!    └──────────commit at full radius─────────▲
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::sphere_volume;
use crate::error::{PackError, PackResult};
use crate::types::Vec3;

// ============================================================================
// PARTICLE STATE
// ============================================================================

/// Lifecycle of a particle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParticleState {
    /// Not yet placed without overlap
    Pending,
    /// Placed and indexed, current radius below target
    Growing,
    /// Placed and indexed at full target radius
    Grown,
}

impl ParticleState {
    /// Placed and registered in the spatial grid
    #[inline]
    pub fn is_committed(&self) -> bool {
        !matches!(self, ParticleState::Pending)
    }
}

// ============================================================================
// GROUP SPECIFICATION
// ============================================================================

/// Requested group of equal spheres
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleGroupSpec {
    /// Absolute count when > 1, packing fraction of the container when ≤ 1
    pub amount: f64,
    /// Sphere radius
    pub radius: f64,
    /// Identifier written to the output (e.g. destination universe)
    pub tag: String,
}

impl ParticleGroupSpec {
    pub fn new(amount: f64, radius: f64, tag: impl Into<String>) -> Self {
        Self { amount, radius, tag: tag.into() }
    }

    /// Amount is interpreted as a packing fraction
    pub fn is_fraction(&self) -> bool {
        self.amount <= 1.0
    }

    /// Number of spheres for a container of volume `v0`
    pub fn resolve_count(&self, v0: f64) -> usize {
        if self.is_fraction() {
            (v0 * self.amount / sphere_volume(self.radius)).round() as usize
        } else {
            self.amount.round() as usize
        }
    }

    pub fn validate(&self) -> PackResult<()> {
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(PackError::config(format!(
                "group '{}': radius must be positive, got {}",
                self.tag, self.radius
            )));
        }
        if !(self.amount.is_finite() && self.amount > 0.0) {
            return Err(PackError::config(format!(
                "group '{}': count or fraction must be positive, got {}",
                self.tag, self.amount
            )));
        }
        if self.tag.is_empty() || self.tag.chars().any(char::is_whitespace) {
            return Err(PackError::config(format!(
                "group tag '{}' must be a single non-empty token",
                self.tag
            )));
        }
        Ok(())
    }
}

/// Group as materialised in the registry
#[derive(Debug, Clone)]
pub struct ParticleGroup {
    pub spec: ParticleGroupSpec,
    /// Number of particles created for this group
    pub count: usize,
    /// Id of the group's first particle
    pub first: usize,
}

// ============================================================================
// PARTICLE
// ============================================================================

/// A sphere in the packing
#[derive(Debug, Clone)]
pub struct Particle {
    pub(crate) id: usize,
    pub(crate) position: Vec3,
    radius: f64,
    pub(crate) current_radius: f64,
    pub(crate) group: usize,
    pub(crate) state: ParticleState,
}

impl Particle {
    fn new(id: usize, radius: f64, current_radius: f64, group: usize) -> Self {
        Self {
            id,
            position: Vec3::zero(),
            radius,
            current_radius,
            group,
            state: ParticleState::Pending,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Target radius rp
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Current radius crp ≤ rp
    pub fn current_radius(&self) -> f64 {
        self.current_radius
    }

    pub fn group(&self) -> usize {
        self.group
    }

    pub fn state(&self) -> ParticleState {
        self.state
    }

    #[inline]
    pub fn is_committed(&self) -> bool {
        self.state.is_committed()
    }

    /// crp / rp
    pub fn growth_ratio(&self) -> f64 {
        self.current_radius / self.radius
    }

    /// State a particle enters when committed at its current radius
    pub(crate) fn committed_state(&self) -> ParticleState {
        if self.current_radius >= self.radius {
            ParticleState::Grown
        } else {
            ParticleState::Growing
        }
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

/// Arena of all particles in creation order
#[derive(Debug, Clone, Default)]
pub struct ParticleRegistry {
    particles: Vec<Particle>,
    groups: Vec<ParticleGroup>,
}

impl ParticleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expand a group into new pending particles.
    ///
    /// `initial_fraction` sets crp = fraction·rp; pass 1.0 when refinement
    /// is disabled. Returns the number of particles created.
    pub fn add_group(&mut self, spec: ParticleGroupSpec, v0: f64, initial_fraction: f64) -> PackResult<usize> {
        spec.validate()?;
        let count = spec.resolve_count(v0);
        self.particles.try_reserve(count)?;

        let group = self.groups.len();
        let first = self.particles.len();
        let current = if initial_fraction >= 1.0 { spec.radius } else { spec.radius * initial_fraction };
        for i in 0..count {
            self.particles.push(Particle::new(first + i, spec.radius, current, group));
        }

        log::debug!(
            "group '{}': {} particles of radius {} (first id {})",
            spec.tag, count, spec.radius, first
        );
        self.groups.push(ParticleGroup { spec, count, first });
        Ok(count)
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn get(&self, id: usize) -> &Particle {
        &self.particles[id]
    }

    pub(crate) fn get_mut(&mut self, id: usize) -> &mut Particle {
        &mut self.particles[id]
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter()
    }

    pub fn groups(&self) -> &[ParticleGroup] {
        &self.groups
    }

    /// Output tag of a particle's group
    pub fn group_tag(&self, id: usize) -> &str {
        &self.groups[self.particles[id].group].spec.tag
    }

    /// Visit every particle matching `predicate`
    pub fn for_each<P, F>(&self, predicate: P, mut f: F)
    where
        P: Fn(&Particle) -> bool,
        F: FnMut(&Particle),
    {
        for p in self.particles.iter().filter(|p| predicate(p)) {
            f(p);
        }
    }

    pub fn for_each_mut<P, F>(&mut self, predicate: P, mut f: F)
    where
        P: Fn(&Particle) -> bool,
        F: FnMut(&mut Particle),
    {
        for p in self.particles.iter_mut().filter(|p| predicate(p)) {
            f(p);
        }
    }

    /// Ids of particles matching `predicate`, in creation order
    pub fn ids_where<P: Fn(&Particle) -> bool>(&self, predicate: P) -> Vec<usize> {
        self.particles.iter().filter(|p| predicate(p)).map(|p| p.id).collect()
    }

    /// Largest target radius (sets grid resolution)
    pub fn max_radius(&self) -> f64 {
        self.particles.iter().map(|p| p.radius).fold(0.0, f64::max)
    }

    /// V1: sum of target-radius volumes
    pub fn requested_volume(&self) -> f64 {
        self.particles.iter().map(|p| sphere_volume(p.radius)).sum()
    }

    /// V2 recomputed from scratch: sum of committed current-radius volumes
    pub fn committed_volume(&self) -> f64 {
        self.particles
            .iter()
            .filter(|p| p.is_committed())
            .map(|p| sphere_volume(p.current_radius))
            .sum()
    }

    pub fn count_in_state(&self, state: ParticleState) -> usize {
        self.particles.iter().filter(|p| p.state == state).count()
    }

    /// min(crp/rp) over all particles, 1.0 for an empty registry
    pub fn min_growth_ratio(&self) -> f64 {
        self.particles.iter().map(Particle::growth_ratio).fold(1.0, f64::min)
    }
}

impl fmt::Display for ParticleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} particles in {} groups", self.particles.len(), self.groups.len())
    }
}
