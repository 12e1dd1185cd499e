//! # DENSEPACK-RS
//!
//! Random dense packing of spheres inside bounding volumes
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │                          DENSEPACK-RS                                       │
//! │                Stochastic Sphere Packing in Rust                            │
//! ├─────────────────────────────────────────────────────────────────────────────┤
//! │  LEVEL 1: GEOMETRY   (sphere, cylinder, cube, annulus, cuboid, parallelep.) │
//! │  LEVEL 2: PARTICLES  (registry of groups, Pending → Growing → Grown)        │
//! │  LEVEL 3: GRID       (uniform bucket index for overlap queries)             │
//! │  LEVEL 4: PACKER     (random sequential placement, grow-and-shake)          │
//! │  LEVEL 5: SESSION    (token protocol / JSON input, distribution output)     │
//! └─────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarantees
//!
//! | Property          | Guarantee                                            |
//! |-------------------|------------------------------------------------------|
//! | Overlap           | None: pair distance ≥ sum of radii                   |
//! | Containment       | Every sphere lies fully inside the volume            |
//! | Density           | Requested packing fraction ≤ 0.7, checked up front   |
//! | Determinism       | Same seed + configuration ⇒ byte-identical output    |
//!
//! ## Example
//!
//! ```no_run
//! use densepack_rs::{BoundingVolume, DensePacker, ParticleGroupSpec, VolumeSpec};
//!
//! let volume = BoundingVolume::from_spec(&VolumeSpec::Sphere { radius: 10.0 })?;
//! let groups = [ParticleGroupSpec::new(100.0, 0.5, "fuel")];
//! let mut packer = DensePacker::new(volume, &groups, None, 42)?;
//! let report = packer.run()?;
//! println!("packing fraction {:.4}", report.achieved_fraction);
//! # Ok::<(), densepack_rs::PackError>(())
//! ```

pub mod constants;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod input;
pub mod output;
pub mod packer;
pub mod particle;
pub mod stochastic;
pub mod types;

// Re-exports
pub use constants::*;
pub use error::{PackError, PackResult};
pub use geometry::{BoundingVolume, VolumeSpec};
pub use grid::SpatialGrid;
pub use input::PackingConfig;
pub use output::write_distribution;
pub use packer::{verify_packing, DensePacker, PackingReport, RefinementParams};
pub use particle::{Particle, ParticleGroupSpec, ParticleRegistry, ParticleState};
pub use stochastic::RandomGenerator;
pub use types::*;

/// DENSEPACK version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Information about the packer
pub fn info() -> String {
    format!(
        "DENSEPACK-RS v{}\n\
         Random Dense Sphere Packing\n\
         Placement + Grow-and-Shake on a bucket grid\n\
         Deterministic ChaCha8 sampling",
        VERSION
    )
}
