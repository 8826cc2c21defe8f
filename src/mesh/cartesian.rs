use crate::error::{Result, WaveError};
use crate::mesh::Sparsity;
use crate::util::*;
use std::sync::Arc;

/// Uniform box grid, `cells[d]` cells of width `spacing[d]` along each axis.
#[derive(Debug, Clone)]
pub struct CartesianMesh<const GRID_DIMENSION: usize> {
    aabb: AABB<GRID_DIMENSION>,
    spacing: Extent<GRID_DIMENSION>,
    sparsity: Arc<Sparsity>,
}

impl<const GRID_DIMENSION: usize> CartesianMesh<GRID_DIMENSION> {
    /// Grid of `cells` covering `[0, lengths[d]]` along each dimension.
    pub fn new(
        cells: [usize; GRID_DIMENSION],
        lengths: Extent<GRID_DIMENSION>,
    ) -> Result<Self> {
        let aabb = AABB::from_cell_counts(&cells).ok_or_else(|| {
            WaveError::invalid(format!("cell counts must be positive, got {cells:?}"))
        })?;
        if lengths.iter().any(|l| !l.is_finite() || *l <= 0.0) {
            return Err(WaveError::invalid(format!(
                "domain lengths must be positive, got {:?}",
                lengths.as_slice()
            )));
        }
        let spacing =
            Extent::from_fn(|d, _| lengths[d] / cells[d] as f64);
        let sparsity = Arc::new(Sparsity::from_aabb(&aabb));
        Ok(CartesianMesh {
            aabb,
            spacing,
            sparsity,
        })
    }

    /// Cube of `n` cells per side with unit cell width.
    pub fn unit_cells(n: usize) -> Result<Self> {
        Self::new([n; GRID_DIMENSION], Extent::repeat(n as f64))
    }

    pub fn aabb(&self) -> &AABB<GRID_DIMENSION> {
        &self.aabb
    }

    pub fn n_cells(&self) -> usize {
        self.aabb.buffer_size()
    }

    pub fn spacing(&self) -> &Extent<GRID_DIMENSION> {
        &self.spacing
    }

    pub fn min_spacing(&self) -> f64 {
        self.spacing.min()
    }

    pub fn cell_volume(&self) -> f64 {
        self.spacing.product()
    }

    /// Area of a face normal to dimension `d`.
    pub fn face_area(&self, d: usize) -> f64 {
        (0..GRID_DIMENSION)
            .filter(|dn| *dn != d)
            .map(|dn| self.spacing[dn])
            .product()
    }

    /// Distance between the centres of two cells sharing a face normal to `d`.
    pub fn centre_distance(&self, d: usize) -> f64 {
        self.spacing[d]
    }

    /// Distance from a cell centre to its boundary face normal to `d`.
    pub fn boundary_distance(&self, d: usize) -> f64 {
        0.5 * self.spacing[d]
    }

    pub fn cell_centre(&self, coord: &Coord<GRID_DIMENSION>) -> Extent<GRID_DIMENSION> {
        Extent::from_fn(|d, _| {
            (coord[d] as f64 + 0.5) * self.spacing[d]
        })
    }

    /// Position of a cell corner point, `point` indexes `aabb().point_bounds()`.
    pub fn point_position(&self, point: &Coord<GRID_DIMENSION>) -> Extent<GRID_DIMENSION> {
        Extent::from_fn(|d, _| point[d] as f64 * self.spacing[d])
    }

    pub fn sparsity(&self) -> &Arc<Sparsity> {
        &self.sparsity
    }

    /// Physical length of the grid along each dimension.
    pub fn lengths(&self) -> Extent<GRID_DIMENSION> {
        let cells = self.aabb.exclusive_bounds();
        Extent::from_fn(|d, _| cells[d] as f64 * self.spacing[d])
    }
}
