//! # Geometry Module
//!
//! Bounding volumes that contain the packed spheres.
//!
//! ## Solids
//!
//! | Selector | Solid            | Parameters                        |
//! |----------|------------------|-----------------------------------|
//! | 1        | Sphere           | R                                 |
//! | 2        | Cylinder (z)     | R, z_min, z_max                   |
//! | 3        | Cube             | half-width h                      |
//! | 4        | Annular cylinder | r_in, r_out, z_min, z_max         |
//! | 5        | Cuboid           | half-widths h_x, h_y, h_z         |
//! | 6        | Parallelepiped   | L_a, L_b, L_c, ψ, θ, φ (degrees)  |
//!
//! All solids are centred on the origin. A sphere of radius r centred at p
//! is *contained* when it lies entirely inside the solid (touching allowed).

pub mod parallelepiped;

pub use parallelepiped::{FacePlane, Parallelepiped};

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

use crate::error::{PackError, PackResult};
use crate::stochastic::RandomGenerator;
use crate::types::{Aabb, Vec3};

// ============================================================================
// VOLUME SPECIFICATION
// ============================================================================

/// Raw solid parameters as read from configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VolumeSpec {
    Sphere { radius: f64 },
    Cylinder { radius: f64, zmin: f64, zmax: f64 },
    Cube { half_width: f64 },
    AnnularCylinder { inner_radius: f64, outer_radius: f64, zmin: f64, zmax: f64 },
    Cuboid { half_x: f64, half_y: f64, half_z: f64 },
    Parallelepiped { la: f64, lb: f64, lc: f64, psi: f64, theta: f64, phi: f64 },
}

impl VolumeSpec {
    /// Selector used by the token protocol
    pub fn selector(&self) -> u32 {
        match self {
            VolumeSpec::Sphere { .. } => 1,
            VolumeSpec::Cylinder { .. } => 2,
            VolumeSpec::Cube { .. } => 3,
            VolumeSpec::AnnularCylinder { .. } => 4,
            VolumeSpec::Cuboid { .. } => 5,
            VolumeSpec::Parallelepiped { .. } => 6,
        }
    }

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            VolumeSpec::Sphere { .. } => "sphere",
            VolumeSpec::Cylinder { .. } => "cylinder",
            VolumeSpec::Cube { .. } => "cube",
            VolumeSpec::AnnularCylinder { .. } => "annular cylinder",
            VolumeSpec::Cuboid { .. } => "cuboid",
            VolumeSpec::Parallelepiped { .. } => "parallelepiped",
        }
    }
}

fn positive(name: &str, v: f64) -> PackResult<f64> {
    if v.is_finite() && v > 0.0 {
        Ok(v)
    } else {
        Err(PackError::config(format!("{} must be positive, got {}", name, v)))
    }
}

fn axial(zmin: f64, zmax: f64) -> PackResult<()> {
    if zmin.is_finite() && zmax.is_finite() && zmax > zmin {
        Ok(())
    } else {
        Err(PackError::config(format!(
            "axial limits must satisfy zmin < zmax, got [{}, {}]",
            zmin, zmax
        )))
    }
}

// ============================================================================
// BOUNDING VOLUME
// ============================================================================

/// Container solid with derived bounding box and volume
#[derive(Debug, Clone, PartialEq)]
pub enum BoundingVolume {
    Sphere { radius: f64 },
    Cylinder { radius: f64, zmin: f64, zmax: f64 },
    Cube { half_width: f64 },
    AnnularCylinder { inner_radius: f64, outer_radius: f64, zmin: f64, zmax: f64 },
    Cuboid { half_x: f64, half_y: f64, half_z: f64 },
    Parallelepiped(Box<Parallelepiped>),
}

impl BoundingVolume {
    /// Validate the parameters and derive the solid
    pub fn from_spec(spec: &VolumeSpec) -> PackResult<Self> {
        let volume = match *spec {
            VolumeSpec::Sphere { radius } => BoundingVolume::Sphere {
                radius: positive("sphere radius", radius)?,
            },
            VolumeSpec::Cylinder { radius, zmin, zmax } => {
                positive("cylinder radius", radius)?;
                axial(zmin, zmax)?;
                BoundingVolume::Cylinder { radius, zmin, zmax }
            }
            VolumeSpec::Cube { half_width } => BoundingVolume::Cube {
                half_width: positive("cube half-width", half_width)?,
            },
            VolumeSpec::AnnularCylinder { inner_radius, outer_radius, zmin, zmax } => {
                if !(inner_radius.is_finite() && inner_radius >= 0.0) {
                    return Err(PackError::config(format!(
                        "annulus inner radius must be non-negative, got {}",
                        inner_radius
                    )));
                }
                if !(outer_radius.is_finite() && outer_radius > inner_radius) {
                    return Err(PackError::config(format!(
                        "annulus outer radius {} must exceed inner radius {}",
                        outer_radius, inner_radius
                    )));
                }
                axial(zmin, zmax)?;
                BoundingVolume::AnnularCylinder { inner_radius, outer_radius, zmin, zmax }
            }
            VolumeSpec::Cuboid { half_x, half_y, half_z } => BoundingVolume::Cuboid {
                half_x: positive("cuboid half-width x", half_x)?,
                half_y: positive("cuboid half-width y", half_y)?,
                half_z: positive("cuboid half-width z", half_z)?,
            },
            VolumeSpec::Parallelepiped { la, lb, lc, psi, theta, phi } => {
                BoundingVolume::Parallelepiped(Box::new(Parallelepiped::new(la, lb, lc, psi, theta, phi)?))
            }
        };
        Ok(volume)
    }

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            BoundingVolume::Sphere { .. } => "sphere",
            BoundingVolume::Cylinder { .. } => "cylinder",
            BoundingVolume::Cube { .. } => "cube",
            BoundingVolume::AnnularCylinder { .. } => "annular cylinder",
            BoundingVolume::Cuboid { .. } => "cuboid",
            BoundingVolume::Parallelepiped(_) => "parallelepiped",
        }
    }

    /// Exact volume V0
    pub fn volume(&self) -> f64 {
        match self {
            BoundingVolume::Sphere { radius } => 4.0 / 3.0 * PI * radius.powi(3),
            BoundingVolume::Cylinder { radius, zmin, zmax } => PI * radius * radius * (zmax - zmin),
            BoundingVolume::Cube { half_width } => (2.0 * half_width).powi(3),
            BoundingVolume::AnnularCylinder { inner_radius, outer_radius, zmin, zmax } => {
                PI * (outer_radius * outer_radius - inner_radius * inner_radius) * (zmax - zmin)
            }
            BoundingVolume::Cuboid { half_x, half_y, half_z } => 8.0 * half_x * half_y * half_z,
            BoundingVolume::Parallelepiped(p) => p.volume(),
        }
    }

    /// Axis-aligned bounding box
    pub fn bounding_box(&self) -> Aabb {
        match self {
            BoundingVolume::Sphere { radius } => Aabb::centered(*radius, *radius, *radius),
            BoundingVolume::Cylinder { radius, zmin, zmax } => Aabb::new(
                Vec3::new(-radius, -radius, *zmin),
                Vec3::new(*radius, *radius, *zmax),
            ),
            BoundingVolume::Cube { half_width } => Aabb::centered(*half_width, *half_width, *half_width),
            BoundingVolume::AnnularCylinder { outer_radius, zmin, zmax, .. } => Aabb::new(
                Vec3::new(-outer_radius, -outer_radius, *zmin),
                Vec3::new(*outer_radius, *outer_radius, *zmax),
            ),
            BoundingVolume::Cuboid { half_x, half_y, half_z } => Aabb::centered(*half_x, *half_y, *half_z),
            BoundingVolume::Parallelepiped(p) => p.bounding_box(),
        }
    }

    /// Sphere of `radius` centred at `p` lies fully inside
    pub fn contains(&self, p: &Vec3, radius: f64) -> bool {
        match self {
            BoundingVolume::Sphere { radius: big } => p.mag() + radius <= *big,
            BoundingVolume::Cylinder { radius: big, zmin, zmax } => {
                p.radial() + radius <= *big && p.z - radius >= *zmin && p.z + radius <= *zmax
            }
            BoundingVolume::Cube { half_width } => {
                let limit = half_width - radius;
                p.x.abs() <= limit && p.y.abs() <= limit && p.z.abs() <= limit
            }
            BoundingVolume::AnnularCylinder { inner_radius, outer_radius, zmin, zmax } => {
                let rho = p.radial();
                rho - radius >= *inner_radius
                    && rho + radius <= *outer_radius
                    && p.z - radius >= *zmin
                    && p.z + radius <= *zmax
            }
            BoundingVolume::Cuboid { half_x, half_y, half_z } => {
                p.x.abs() + radius <= *half_x
                    && p.y.abs() + radius <= *half_y
                    && p.z.abs() + radius <= *half_z
            }
            BoundingVolume::Parallelepiped(pp) => pp.contains(p, radius),
        }
    }

    /// Largest sphere radius the solid can hold
    pub fn inscribed_radius(&self) -> f64 {
        match self {
            BoundingVolume::Sphere { radius } => *radius,
            BoundingVolume::Cylinder { radius, zmin, zmax } => radius.min(0.5 * (zmax - zmin)),
            BoundingVolume::Cube { half_width } => *half_width,
            BoundingVolume::AnnularCylinder { inner_radius, outer_radius, zmin, zmax } => {
                (0.5 * (outer_radius - inner_radius)).min(0.5 * (zmax - zmin))
            }
            BoundingVolume::Cuboid { half_x, half_y, half_z } => half_x.min(*half_y).min(*half_z),
            BoundingVolume::Parallelepiped(p) => p.inscribed_radius(),
        }
    }

    /// Rejection-sample a centre whose sphere of `radius` is contained.
    ///
    /// Candidates are drawn uniformly from the bounding box shrunk by
    /// `radius`, which every contained centre lies in. The loop is unbounded;
    /// callers must keep `radius` below [`inscribed_radius`](Self::inscribed_radius).
    pub fn sample_uniform(&self, rng: &mut RandomGenerator, radius: f64) -> Vec3 {
        let inner = self.bounding_box().shrunk(radius);
        let bounds = if inner.is_valid() { inner } else { self.bounding_box() };
        debug_assert!(radius < self.inscribed_radius(), "radius {} cannot fit", radius);

        loop {
            let x = rng.uniform_range(bounds.min.x, bounds.max.x);
            let y = rng.uniform_range(bounds.min.y, bounds.max.y);
            let z = rng.uniform_range(bounds.min.z, bounds.max.z);
            let p = Vec3::new(x, y, z);
            if self.contains(&p, radius) {
                return p;
            }
        }
    }
}

impl fmt::Display for BoundingVolume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundingVolume::Sphere { radius } => write!(f, "sphere R={}", radius),
            BoundingVolume::Cylinder { radius, zmin, zmax } => {
                write!(f, "cylinder R={} z=[{}, {}]", radius, zmin, zmax)
            }
            BoundingVolume::Cube { half_width } => write!(f, "cube h={}", half_width),
            BoundingVolume::AnnularCylinder { inner_radius, outer_radius, zmin, zmax } => write!(
                f,
                "annular cylinder R=[{}, {}] z=[{}, {}]",
                inner_radius, outer_radius, zmin, zmax
            ),
            BoundingVolume::Cuboid { half_x, half_y, half_z } => {
                write!(f, "cuboid h=({}, {}, {})", half_x, half_y, half_z)
            }
            BoundingVolume::Parallelepiped(p) => write!(
                f,
                "parallelepiped L=({}, {}, {}) angles=({}, {}, {})",
                p.la, p.lb, p.lc, p.psi, p.theta, p.phi
            ),
        }
    }
}
