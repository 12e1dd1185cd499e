//! # Input Module
//!
//! Session configuration from the token protocol or from JSON.
//!
//! ## Token protocol
//!
//! ```text
//! <volume type 1-6> <volume parameters...>
//! <count|fraction> <radius> <tag> <another group? yes|no>   (repeated)
//! <output file>
//! <grow-and-shake? yes|no> [<shake factor> <growth rate>]
//! ```
//!
//! Volume parameters by type:
//!
//! | Type | Solid           | Parameters                     |
//! |------|-----------------|--------------------------------|
//! | 1    | sphere          | R                              |
//! | 2    | cylinder        | R zmin zmax                    |
//! | 3    | cube            | h                              |
//! | 4    | annular cylinder| r_in r_out zmin zmax           |
//! | 5    | cuboid          | hx hy hz                       |
//! | 6    | parallelepiped  | La Lb Lc Psi Theta Phi (deg)   |
//!
//! ## JSON
//!
//! ```text
//! {
//!   "volume": { "type": "sphere", "radius": 10.0 },
//!   "groups": [ { "amount": 100, "radius": 0.5, "tag": "1" } ],
//!   "output": "spheres.txt",
//!   "refinement": { "shake_factor": 0.1, "growth_rate": 0.05 },
//!   "seed": 42
//! }
//! ```

pub mod tokens;

pub use tokens::TokenReader;

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use crate::error::{PackError, PackResult};
use crate::geometry::{BoundingVolume, VolumeSpec};
use crate::output::validate_output_path;
use crate::packer::{DensePacker, RefinementParams};
use crate::particle::ParticleGroupSpec;

/// Complete packing session description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackingConfig {
    pub volume: VolumeSpec,
    pub groups: Vec<ParticleGroupSpec>,
    pub output: PathBuf,
    #[serde(default)]
    pub refinement: Option<RefinementParams>,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl PackingConfig {
    /// Parse a JSON document
    pub fn from_json(text: &str) -> PackResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a JSON file
    pub fn from_json_file(path: &Path) -> PackResult<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| PackError::config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }

    /// Load a token-protocol batch file
    pub fn from_batch_file(path: &Path) -> PackResult<Self> {
        let file = fs::File::open(path)
            .map_err(|e| PackError::config(format!("cannot read {}: {}", path.display(), e)))?;
        read_config(&mut TokenReader::batch(std::io::BufReader::new(file)))
    }

    pub fn to_json(&self) -> PackResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// All configuration checks, before any sampling
    pub fn validate(&self) -> PackResult<()> {
        let volume = BoundingVolume::from_spec(&self.volume)?;
        if self.groups.is_empty() {
            return Err(PackError::config("at least one particle group is required"));
        }
        let inscribed = volume.inscribed_radius();
        for group in &self.groups {
            group.validate()?;
            if group.radius >= inscribed {
                return Err(PackError::config(format!(
                    "group '{}': radius {} does not fit in the {} (largest admissible radius {})",
                    group.tag,
                    group.radius,
                    volume.name(),
                    inscribed
                )));
            }
        }
        if let Some(params) = &self.refinement {
            params.validate()?;
        }
        validate_output_path(&self.output)
    }

    /// Validate and build a packer for this session
    pub fn packer(&self, seed: u64) -> PackResult<DensePacker> {
        self.validate()?;
        let volume = BoundingVolume::from_spec(&self.volume)?;
        DensePacker::new(volume, &self.groups, self.refinement, seed)
    }
}

/// Read one session from the token protocol
pub fn read_config<R: BufRead, W: Write>(tokens: &mut TokenReader<R, W>) -> PackResult<PackingConfig> {
    let volume = read_volume(tokens)?;

    let mut groups = Vec::new();
    loop {
        let n = groups.len() + 1;
        tokens.ask(&format!("Group {}: number of particles (> 1) or packing fraction (<= 1):", n))?;
        let amount = tokens.next_f64("particle count or packing fraction")?;
        tokens.ask("Particle radius:")?;
        let radius = tokens.next_f64("particle radius")?;
        tokens.ask("Group tag:")?;
        let tag = tokens.next_token("group tag")?;
        groups.push(ParticleGroupSpec::new(amount, radius, tag));
        tokens.ask("Another group? (yes/no):")?;
        if !tokens.next_yes_no("another group")? {
            break;
        }
    }

    tokens.ask("Output file:")?;
    let output = PathBuf::from(tokens.next_token("output file")?);

    tokens.ask("Use grow-and-shake? (yes/no):")?;
    let refinement = if tokens.next_yes_no("grow-and-shake")? {
        tokens.ask("Shake factor (>= 0):")?;
        let shake_factor = tokens.next_f64("shake factor")?;
        tokens.ask("Growth rate (0.0001, 1.0]:")?;
        let growth_rate = tokens.next_f64("growth rate")?;
        Some(RefinementParams::new(shake_factor, growth_rate))
    } else {
        None
    };

    Ok(PackingConfig {
        volume,
        groups,
        output,
        refinement,
        seed: None,
    })
}

fn read_volume<R: BufRead, W: Write>(tokens: &mut TokenReader<R, W>) -> PackResult<VolumeSpec> {
    tokens.ask("Volume type (1 sphere, 2 cylinder, 3 cube, 4 annular cylinder, 5 cuboid, 6 parallelepiped):")?;
    let selector = tokens.next_u32("volume type")?;

    let spec = match selector {
        1 => {
            tokens.ask("Sphere radius:")?;
            VolumeSpec::Sphere { radius: tokens.next_f64("sphere radius")? }
        }
        2 => {
            tokens.ask("Cylinder radius, zmin, zmax:")?;
            VolumeSpec::Cylinder {
                radius: tokens.next_f64("cylinder radius")?,
                zmin: tokens.next_f64("zmin")?,
                zmax: tokens.next_f64("zmax")?,
            }
        }
        3 => {
            tokens.ask("Cube half-width:")?;
            VolumeSpec::Cube { half_width: tokens.next_f64("cube half-width")? }
        }
        4 => {
            tokens.ask("Inner radius, outer radius, zmin, zmax:")?;
            VolumeSpec::AnnularCylinder {
                inner_radius: tokens.next_f64("inner radius")?,
                outer_radius: tokens.next_f64("outer radius")?,
                zmin: tokens.next_f64("zmin")?,
                zmax: tokens.next_f64("zmax")?,
            }
        }
        5 => {
            tokens.ask("Half-widths x, y, z:")?;
            VolumeSpec::Cuboid {
                half_x: tokens.next_f64("half-width x")?,
                half_y: tokens.next_f64("half-width y")?,
                half_z: tokens.next_f64("half-width z")?,
            }
        }
        6 => {
            tokens.ask("Edge lengths La, Lb, Lc and angles Psi, Theta, Phi (degrees):")?;
            VolumeSpec::Parallelepiped {
                la: tokens.next_f64("La")?,
                lb: tokens.next_f64("Lb")?,
                lc: tokens.next_f64("Lc")?,
                psi: tokens.next_f64("Psi")?,
                theta: tokens.next_f64("Theta")?,
                phi: tokens.next_f64("Phi")?,
            }
        }
        other => {
            return Err(PackError::config(format!(
                "line {}: unknown volume type {}, expected 1-6",
                tokens.line(),
                other
            )))
        }
    };
    log::debug!("volume: {}", spec.name());
    Ok(spec)
}
