//! # Packing Constants
//!
//! Limits and tolerances shared by the placement and refinement engines.

use std::f64::consts::PI;

// ============================================================================
// GEOMETRY
// ============================================================================

/// Volume factor of a sphere: V = (4/3)·π·r³
pub const SPHERE_VOLUME_FACTOR: f64 = 4.0 / 3.0 * PI;

/// Tolerance for the parallelepiped face equations at the defining vertices
pub const FACE_PLANE_TOLERANCE: f64 = 1e-6;

// ============================================================================
// FEASIBILITY
// ============================================================================

/// Largest requested packing fraction accepted before placement starts.
///
/// Random sequential placement jams well below the ~0.64 random close
/// packing limit at full radius; 0.7 is only reachable with grow-and-shake.
pub const MAX_PACKING_FRACTION: f64 = 0.7;

// ============================================================================
// SPATIAL GRID
// ============================================================================

/// Minimum number of cells per axis
pub const GRID_MIN_CELLS: usize = 5;

/// Maximum number of cells per axis
pub const GRID_MAX_CELLS: usize = 200;

// ============================================================================
// GROW-AND-SHAKE
// ============================================================================

/// Exclusive lower bound of the growth rate
pub const MIN_GROWTH_RATE: f64 = 0.0001;

/// Inclusive upper bound of the growth rate
pub const MAX_GROWTH_RATE: f64 = 1.0;

/// Seed radius, as a fraction of the target radius, when refinement is enabled
pub const INITIAL_RADIUS_FRACTION: f64 = 0.01;

// ============================================================================
// SESSION
// ============================================================================

/// Environment variable consulted for the RNG seed
pub const SEED_ENV_VAR: &str = "DENSEPACK_SEED";

/// Sphere volume for radius `r`
#[inline]
pub fn sphere_volume(r: f64) -> f64 {
    SPHERE_VOLUME_FACTOR * r * r * r
}
