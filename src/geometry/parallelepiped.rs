//! # Parallelepiped
//!
//! Skewed box spanned by three edge vectors, centred on the origin.
//!
//! ## Edge vectors
//!
//! ```text
//! a = La · (1, 0, 0)
//! b = Lb · (sin ψ, cos ψ, 0)
//! c = Lc · (sin θ cos φ, sin θ sin φ, cos θ)
//! ```
//!
//! Containment is six half-space tests against unit-normal face planes
//! `n·x + d ≥ 0`, so the signed plane value is directly the distance to
//! the face and a sphere fits iff every value is at least its radius.

use crate::constants::FACE_PLANE_TOLERANCE;
use crate::error::{PackError, PackResult};
use crate::types::{Aabb, Vec3};

/// Oriented face plane, `normal · x + d ≥ 0` inside
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FacePlane {
    /// Unit inward normal (a, b, c)
    pub normal: Vec3,
    /// Offset d
    pub d: f64,
}

impl FacePlane {
    /// Plane through `point` with the given inward `normal` (normalized here)
    fn through(point: Vec3, normal: Vec3) -> Self {
        let normal = normal.normalize();
        Self { normal, d: -normal.dot(&point) }
    }

    /// Signed distance, positive inside
    #[inline]
    pub fn signed_distance(&self, p: &Vec3) -> f64 {
        self.normal.dot(p) + self.d
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parallelepiped {
    pub la: f64,
    pub lb: f64,
    pub lc: f64,
    /// Angles in degrees
    pub psi: f64,
    pub theta: f64,
    pub phi: f64,
    edges: [Vec3; 3],
    vertices: [Vec3; 8],
    planes: [FacePlane; 6],
    volume: f64,
    bounds: Aabb,
}

impl Parallelepiped {
    /// Build the solid and derive its face planes.
    ///
    /// Fails with a configuration error for non-positive edges or a
    /// degenerate (flat) cell, and with an internal error if a derived face
    /// plane misses one of its own vertices.
    pub fn new(la: f64, lb: f64, lc: f64, psi: f64, theta: f64, phi: f64) -> PackResult<Self> {
        for (name, v) in [("La", la), ("Lb", lb), ("Lc", lc)] {
            if !(v.is_finite() && v > 0.0) {
                return Err(PackError::config(format!(
                    "parallelepiped edge {} must be positive, got {}",
                    name, v
                )));
            }
        }
        for (name, v) in [("Psi", psi), ("Theta", theta), ("Phi", phi)] {
            if !v.is_finite() {
                return Err(PackError::config(format!("parallelepiped angle {} is not finite", name)));
            }
        }

        let (psi_r, theta_r, phi_r) = (psi.to_radians(), theta.to_radians(), phi.to_radians());
        let a = Vec3::new(la, 0.0, 0.0);
        let b = Vec3::new(psi_r.sin(), psi_r.cos(), 0.0) * lb;
        let c = Vec3::new(
            theta_r.sin() * phi_r.cos(),
            theta_r.sin() * phi_r.sin(),
            theta_r.cos(),
        ) * lc;

        let volume = a.dot(&b.cross(&c)).abs();
        if volume <= 1e-9 * la * lb * lc {
            return Err(PackError::config(format!(
                "parallelepiped with angles ({}, {}, {}) is degenerate",
                psi, theta, phi
            )));
        }

        let origin = -((a + b + c) * 0.5);
        let mut vertices = [Vec3::zero(); 8];
        for (i, v) in vertices.iter_mut().enumerate() {
            let mut p = origin;
            if i & 1 != 0 { p += a; }
            if i & 2 != 0 { p += b; }
            if i & 4 != 0 { p += c; }
            *v = p;
        }

        // Each face pair is spanned by two edges; the third edge points inward
        // from the lower face.
        let edges = [a, b, c];
        let mut planes = [FacePlane { normal: Vec3::zero(), d: 0.0 }; 6];
        for k in 0..3 {
            let u = edges[(k + 1) % 3];
            let w = edges[(k + 2) % 3];
            let through = edges[k];
            let mut n = u.cross(&w);
            if n.dot(&through) < 0.0 {
                n = -n;
            }
            planes[2 * k] = FacePlane::through(origin, n);
            planes[2 * k + 1] = FacePlane::through(origin + through, -n);
        }

        let bounds = Aabb::enclosing(&vertices);
        let solid = Self {
            la, lb, lc, psi, theta, phi,
            edges,
            vertices,
            planes,
            volume,
            bounds,
        };
        solid.check_face_planes()?;
        Ok(solid)
    }

    /// Verify that every face plane passes through its four vertices.
    fn check_face_planes(&self) -> PackResult<()> {
        let tolerance = FACE_PLANE_TOLERANCE * self.bounds.extent().mag().max(1.0);
        for k in 0..3 {
            let bit = 1usize << k;
            for (side, plane) in [(0, &self.planes[2 * k]), (bit, &self.planes[2 * k + 1])] {
                for (i, v) in self.vertices.iter().enumerate() {
                    if i & bit != side {
                        continue;
                    }
                    let residual = plane.signed_distance(v).abs();
                    if residual > tolerance {
                        return Err(PackError::internal(format!(
                            "face plane {} misses vertex {} by {:.3e}",
                            2 * k + (side != 0) as usize,
                            i,
                            residual
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn bounding_box(&self) -> Aabb {
        self.bounds
    }

    pub fn planes(&self) -> &[FacePlane; 6] {
        &self.planes
    }

    pub fn vertices(&self) -> &[Vec3; 8] {
        &self.vertices
    }

    /// Sphere of `radius` at `p` lies inside all six faces
    #[inline]
    pub fn contains(&self, p: &Vec3, radius: f64) -> bool {
        self.planes.iter().all(|plane| plane.signed_distance(p) >= radius)
    }

    /// Half of the smallest distance between opposite faces
    pub fn inscribed_radius(&self) -> f64 {
        (0..3)
            .map(|k| {
                let u = self.edges[(k + 1) % 3];
                let w = self.edges[(k + 2) % 3];
                0.5 * self.volume / u.cross(&w).mag()
            })
            .fold(f64::INFINITY, f64::min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangular_cell() {
        let p = Parallelepiped::new(2.0, 4.0, 6.0, 0.0, 0.0, 0.0).unwrap();
        assert!((p.volume() - 48.0).abs() < 1e-9);
        assert!((p.inscribed_radius() - 1.0).abs() < 1e-9);

        let bb = p.bounding_box();
        assert!((bb.min.x + 1.0).abs() < 1e-12);
        assert!((bb.max.z - 3.0).abs() < 1e-12);

        assert!(p.contains(&Vec3::zero(), 0.99));
        assert!(!p.contains(&Vec3::zero(), 1.01));
        assert!(p.contains(&Vec3::new(0.0, 1.5, 2.5), 0.5));
        assert!(!p.contains(&Vec3::new(0.0, 1.6, 0.0), 0.5));
    }

    #[test]
    fn test_skewed_cell_volume() {
        let p = Parallelepiped::new(1.0, 2.0, 3.0, 30.0, 20.0, 45.0).unwrap();
        let expected = 1.0 * 2.0 * 3.0 * 30f64.to_radians().cos() * 20f64.to_radians().cos();
        assert!((p.volume() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_planes_are_unit_and_inward() {
        let p = Parallelepiped::new(3.0, 2.0, 1.5, 15.0, 10.0, 60.0).unwrap();
        for plane in p.planes() {
            assert!((plane.normal.mag() - 1.0).abs() < 1e-12);
            assert!(plane.signed_distance(&Vec3::zero()) > 0.0);
        }
    }

    #[test]
    fn test_vertices_on_faces() {
        let p = Parallelepiped::new(5.0, 4.0, 3.0, 25.0, 35.0, 120.0).unwrap();
        // every vertex touches exactly three faces
        for v in p.vertices() {
            let touching = p
                .planes()
                .iter()
                .filter(|plane| plane.signed_distance(v).abs() < 1e-9)
                .count();
            assert_eq!(touching, 3);
        }
    }

    #[test]
    fn test_degenerate_rejected() {
        let err = Parallelepiped::new(1.0, 1.0, 1.0, 90.0, 0.0, 0.0).unwrap_err();
        assert!(matches!(err, PackError::Config(_)));
        assert!(Parallelepiped::new(-1.0, 1.0, 1.0, 0.0, 0.0, 0.0).is_err());
    }
}
