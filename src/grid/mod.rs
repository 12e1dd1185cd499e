//! # Spatial Grid Module
//!
//! Uniform bucket grid over the container's bounding box.
//!
//! ## Invariant
//!
//! A committed particle's id is stored in exactly the buckets whose cells
//! intersect the box `[centre − crp, centre + crp]` on every axis (clamped
//! to the grid). Every move or growth therefore removes the id using the
//! *old* cell range before inserting it with the *new* one.
//!
//! ## Resolution
//!
//! ```text
//! n_axis = clamp(⌊extent_axis / (2·r_max)⌋, 5, 200)
//! ```
//!
//! so a cell is at least one particle diameter wide whenever the box allows.

use std::fmt;

use crate::constants::{GRID_MAX_CELLS, GRID_MIN_CELLS};
use crate::error::{PackError, PackResult};
use crate::particle::ParticleRegistry;
use crate::types::{Aabb, Vec3};

// ============================================================================
// CELL RANGE
// ============================================================================

/// Inclusive range of cells on each axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub imin: usize,
    pub imax: usize,
    pub jmin: usize,
    pub jmax: usize,
    pub kmin: usize,
    pub kmax: usize,
}

impl CellRange {
    /// Number of cells covered (never zero)
    pub fn cell_count(&self) -> usize {
        (self.imax - self.imin + 1) * (self.jmax - self.jmin + 1) * (self.kmax - self.kmin + 1)
    }

    pub fn contains(&self, i: usize, j: usize, k: usize) -> bool {
        (self.imin..=self.imax).contains(&i)
            && (self.jmin..=self.jmax).contains(&j)
            && (self.kmin..=self.kmax).contains(&k)
    }

    /// All (i, j, k) in the range, k fastest
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, usize)> {
        let r = *self;
        (r.imin..=r.imax).flat_map(move |i| {
            (r.jmin..=r.jmax).flat_map(move |j| (r.kmin..=r.kmax).map(move |k| (i, j, k)))
        })
    }
}

// ============================================================================
// SPATIAL GRID
// ============================================================================

/// Bucket grid of particle ids
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    bounds: Aabb,
    dims: [usize; 3],
    cell_size: [f64; 3],
    buckets: Vec<Vec<usize>>,
}

impl SpatialGrid {
    /// Cells per axis for a box edge of `extent` and largest radius `max_radius`
    pub fn resolution(extent: f64, max_radius: f64) -> usize {
        let n = (extent / (2.0 * max_radius)).floor();
        if n.is_finite() {
            (n.max(0.0) as usize).clamp(GRID_MIN_CELLS, GRID_MAX_CELLS)
        } else {
            GRID_MAX_CELLS
        }
    }

    /// Create an empty grid covering `bounds`
    pub fn new(bounds: Aabb, max_radius: f64) -> PackResult<Self> {
        if !(max_radius.is_finite() && max_radius > 0.0) {
            return Err(PackError::config(format!(
                "grid needs a positive particle radius, got {}",
                max_radius
            )));
        }
        let extent = bounds.extent();
        let dims = [
            Self::resolution(extent.x, max_radius),
            Self::resolution(extent.y, max_radius),
            Self::resolution(extent.z, max_radius),
        ];
        let cell_size = [
            extent.x / dims[0] as f64,
            extent.y / dims[1] as f64,
            extent.z / dims[2] as f64,
        ];

        let total = dims[0] * dims[1] * dims[2];
        let mut buckets = Vec::new();
        buckets.try_reserve_exact(total)?;
        buckets.resize_with(total, Vec::new);

        log::debug!(
            "spatial grid {}x{}x{} cells of ({:.4e}, {:.4e}, {:.4e}) over {}",
            dims[0], dims[1], dims[2], cell_size[0], cell_size[1], cell_size[2], bounds
        );

        Ok(Self { bounds, dims, cell_size, buckets })
    }

    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    pub fn cell_size(&self) -> [f64; 3] {
        self.cell_size
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Flat bucket index
    #[inline]
    fn idx(&self, i: usize, j: usize, k: usize) -> usize {
        k + self.dims[2] * (j + self.dims[1] * i)
    }

    /// Cell coordinate of `v` on `axis`, clamped to the grid
    #[inline]
    fn axis_cell(&self, axis: usize, v: f64) -> usize {
        let min = self.bounds.min.axis(axis);
        let c = ((v - min) / self.cell_size[axis]).floor();
        c.max(0.0).min((self.dims[axis] - 1) as f64) as usize
    }

    /// Cells touched by the box of half-width `radius` around `position`
    pub fn cell_range_for(&self, position: &Vec3, radius: f64) -> CellRange {
        CellRange {
            imin: self.axis_cell(0, position.x - radius),
            imax: self.axis_cell(0, position.x + radius),
            jmin: self.axis_cell(1, position.y - radius),
            jmax: self.axis_cell(1, position.y + radius),
            kmin: self.axis_cell(2, position.z - radius),
            kmax: self.axis_cell(2, position.z + radius),
        }
    }

    /// Add `id` to every bucket in `range`
    pub fn insert(&mut self, id: usize, range: &CellRange) -> PackResult<()> {
        for (i, j, k) in range.cells() {
            let idx = self.idx(i, j, k);
            let bucket = &mut self.buckets[idx];
            bucket.try_reserve(1)?;
            bucket.push(id);
        }
        Ok(())
    }

    /// Remove `id` from every bucket in `range`
    pub fn remove(&mut self, id: usize, range: &CellRange) -> PackResult<()> {
        for (i, j, k) in range.cells() {
            let idx = self.idx(i, j, k);
            let bucket = &mut self.buckets[idx];
            match bucket.iter().position(|&m| m == id) {
                Some(pos) => {
                    bucket.swap_remove(pos);
                }
                None => {
                    return Err(PackError::internal(format!(
                        "particle {} missing from cell ({}, {}, {})",
                        id, i, j, k
                    )))
                }
            }
        }
        Ok(())
    }

    /// Move `id` from `old` to `new`
    pub fn relocate(&mut self, id: usize, old: &CellRange, new: &CellRange) -> PackResult<()> {
        if old != new {
            self.remove(id, old)?;
            self.insert(id, new)?;
        }
        Ok(())
    }

    /// Sphere (`position`, `radius`) overlaps a committed particle other than `exclude`
    pub fn query_overlap(
        &self,
        registry: &ParticleRegistry,
        position: &Vec3,
        radius: f64,
        exclude: Option<usize>,
    ) -> bool {
        let range = self.cell_range_for(position, radius);
        for (i, j, k) in range.cells() {
            for &m in &self.buckets[self.idx(i, j, k)] {
                if Some(m) == exclude {
                    continue;
                }
                let other = registry.get(m);
                if !other.is_committed() {
                    continue;
                }
                let reach = radius + other.current_radius();
                if position.distance_squared(&other.position()) < reach * reach {
                    return true;
                }
            }
        }
        false
    }

    /// Ids stored in cell (i, j, k)
    pub fn bucket(&self, i: usize, j: usize, k: usize) -> &[usize] {
        &self.buckets[self.idx(i, j, k)]
    }

    /// Cells whose bucket holds `id`
    pub fn buckets_containing(&self, id: usize) -> Vec<(usize, usize, usize)> {
        let mut cells = Vec::new();
        for i in 0..self.dims[0] {
            for j in 0..self.dims[1] {
                for k in 0..self.dims[2] {
                    if self.bucket(i, j, k).contains(&id) {
                        cells.push((i, j, k));
                    }
                }
            }
        }
        cells
    }

    /// Total number of stored ids across all buckets
    pub fn total_entries(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    /// Check the grid invariant against the registry
    pub fn verify(&self, registry: &ParticleRegistry) -> PackResult<()> {
        let mut found: Vec<Vec<usize>> = vec![Vec::new(); registry.len()];
        for (idx, bucket) in self.buckets.iter().enumerate() {
            for &id in bucket {
                match found.get_mut(id) {
                    Some(cells) => cells.push(idx),
                    None => return Err(PackError::internal(format!("grid holds unknown particle {}", id))),
                }
            }
        }

        for p in registry.iter() {
            let mut expected: Vec<usize> = if p.is_committed() {
                self.cell_range_for(&p.position(), p.current_radius())
                    .cells()
                    .map(|(i, j, k)| self.idx(i, j, k))
                    .collect()
            } else {
                Vec::new()
            };
            expected.sort_unstable();
            let actual = &mut found[p.id()];
            actual.sort_unstable();
            if *actual != expected {
                return Err(PackError::internal(format!(
                    "particle {} indexed in {} cells, expected {}",
                    p.id(),
                    actual.len(),
                    expected.len()
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for SpatialGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}x{} grid, {} entries",
            self.dims[0],
            self.dims[1],
            self.dims[2],
            self.total_entries()
        )
    }
}
