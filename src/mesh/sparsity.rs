use crate::util::*;
use std::ops::Range;

/// Off-diagonal pattern of a face-adjacency matrix in compressed row form.
///
/// Row `i` holds one entry per interior face of cell `i`, in the order
/// (dimension 0 low, dimension 0 high, dimension 1 low, ...).
/// `directions[k]` records which dimension entry `k` crosses so operators
/// can pick the face geometry without recomputing coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sparsity {
    row_offsets: Vec<usize>,
    columns: Vec<usize>,
    directions: Vec<usize>,
}

impl Sparsity {
    pub fn from_aabb<const GRID_DIMENSION: usize>(
        aabb: &AABB<GRID_DIMENSION>,
    ) -> Self {
        let n = aabb.buffer_size();
        let mut row_offsets = Vec::with_capacity(n + 1);
        let mut columns = Vec::with_capacity(n * 2 * GRID_DIMENSION);
        let mut directions = Vec::with_capacity(n * 2 * GRID_DIMENSION);
        row_offsets.push(0);
        for coord in aabb.coord_iter() {
            for d in 0..GRID_DIMENSION {
                for side in 0..2 {
                    if let Some(neighbour) = aabb.face_neighbour(&coord, d, side)
                    {
                        columns.push(aabb.coord_to_linear(&neighbour));
                        directions.push(d);
                    }
                }
            }
            row_offsets.push(columns.len());
        }
        Sparsity {
            row_offsets,
            columns,
            directions,
        }
    }

    pub fn n_rows(&self) -> usize {
        self.row_offsets.len() - 1
    }

    /// Number of stored off-diagonal entries.
    pub fn n_entries(&self) -> usize {
        self.columns.len()
    }

    /// Entry range of row `i`.
    pub fn row(&self, i: usize) -> Range<usize> {
        self.row_offsets[i]..self.row_offsets[i + 1]
    }

    pub fn row_offsets(&self) -> &[usize] {
        &self.row_offsets
    }

    pub fn columns(&self) -> &[usize] {
        &self.columns
    }

    pub fn column(&self, k: usize) -> usize {
        self.columns[k]
    }

    pub fn direction(&self, k: usize) -> usize {
        self.directions[k]
    }

    /// Entry index of (i, j), if i and j share a face.
    pub fn find(&self, i: usize, j: usize) -> Option<usize> {
        self.row(i).find(|k| self.columns[*k] == j)
    }

    /// Every (i, j) has a matching (j, i).
    pub fn is_structurally_symmetric(&self) -> bool {
        (0..self.n_rows()).all(|i| {
            self.row(i).all(|k| self.find(self.columns[k], i).is_some())
        })
    }
}
