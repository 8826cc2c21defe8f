use crate::error::{Result, WaveError};
use crate::field::DimensionSet;
use crate::mesh::Sparsity;
use crate::par_slice::ExecutionPolicy;
use rayon::prelude::*;
use std::sync::Arc;

/// Finite-volume matrix over the face-adjacency pattern of a mesh.
///
/// Row `i` reads `diag[i] x_i + Σ_k off_diag[k] x_col(k) = source[i]`
/// for `k` in `sparsity.row(i)`. Terms are volume integrated, so
/// `dimensions` is the dimension set of the integrated equation.
#[derive(Debug, Clone, PartialEq)]
pub struct FvMatrix {
    sparsity: Arc<Sparsity>,
    dimensions: DimensionSet,
    diag: Vec<f64>,
    off_diag: Vec<f64>,
    source: Vec<f64>,
}

/// Mutable view of a contiguous block of rows, handed to one rayon task.
pub struct RowBlock<'a> {
    pub first_row: usize,
    pub first_entry: usize,
    pub diag: &'a mut [f64],
    pub off_diag: &'a mut [f64],
    pub source: &'a mut [f64],
}

impl FvMatrix {
    /// All coefficients zero.
    pub fn new(sparsity: Arc<Sparsity>, dimensions: DimensionSet) -> Self {
        let n = sparsity.n_rows();
        let n_entries = sparsity.n_entries();
        FvMatrix {
            sparsity,
            dimensions,
            diag: vec![0.0; n],
            off_diag: vec![0.0; n_entries],
            source: vec![0.0; n],
        }
    }

    pub fn n_rows(&self) -> usize {
        self.diag.len()
    }

    pub fn sparsity(&self) -> &Arc<Sparsity> {
        &self.sparsity
    }

    pub fn dimensions(&self) -> &DimensionSet {
        &self.dimensions
    }

    pub fn diag(&self) -> &[f64] {
        &self.diag
    }

    pub fn off_diag(&self) -> &[f64] {
        &self.off_diag
    }

    pub fn source(&self) -> &[f64] {
        &self.source
    }

    /// Coefficient (i, j), zero outside the pattern.
    pub fn coefficient(&self, i: usize, j: usize) -> f64 {
        if i == j {
            return self.diag[i];
        }
        self.sparsity
            .find(i, j)
            .map(|k| self.off_diag[k])
            .unwrap_or(0.0)
    }

    /// Split the rows into blocks of `chunk_size` rows with disjoint
    /// mutable coefficient slices.
    pub fn row_blocks_mut(&mut self, chunk_size: usize) -> Vec<RowBlock<'_>> {
        let chunk_size = chunk_size.max(1);
        let n = self.n_rows();
        let mut blocks = Vec::with_capacity(n / chunk_size + 1);
        let mut diag: &mut [f64] = &mut self.diag;
        let mut off_diag: &mut [f64] = &mut self.off_diag;
        let mut source: &mut [f64] = &mut self.source;
        let offsets = self.sparsity.row_offsets();
        let mut first_row = 0;
        while first_row < n {
            let rows = chunk_size.min(n - first_row);
            let first_entry = offsets[first_row];
            let entries = offsets[first_row + rows] - first_entry;
            let (d, d_rest) = std::mem::take(&mut diag).split_at_mut(rows);
            let (o, o_rest) = std::mem::take(&mut off_diag).split_at_mut(entries);
            let (s, s_rest) = std::mem::take(&mut source).split_at_mut(rows);
            blocks.push(RowBlock {
                first_row,
                first_entry,
                diag: d,
                off_diag: o,
                source: s,
            });
            diag = d_rest;
            off_diag = o_rest;
            source = s_rest;
            first_row += rows;
        }
        blocks
    }

    /// `out = A x`
    pub fn multiply(&self, x: &[f64], out: &mut [f64], policy: ExecutionPolicy) {
        debug_assert_eq!(x.len(), self.n_rows());
        debug_assert_eq!(out.len(), self.n_rows());
        let chunk_size = policy.chunk_size(self.n_rows());
        out.par_chunks_mut(chunk_size).enumerate().for_each(
            |(c, out_chunk): (usize, &mut [f64])| {
                let first_row = c * chunk_size;
                for (local, o) in out_chunk.iter_mut().enumerate() {
                    *o = self.row_product(first_row + local, x);
                }
            },
        );
    }

    /// `out = source - A x`
    pub fn residual(&self, x: &[f64], out: &mut [f64], policy: ExecutionPolicy) {
        debug_assert_eq!(out.len(), self.n_rows());
        let chunk_size = policy.chunk_size(self.n_rows());
        out.par_chunks_mut(chunk_size).enumerate().for_each(
            |(c, out_chunk): (usize, &mut [f64])| {
                let first_row = c * chunk_size;
                for (local, o) in out_chunk.iter_mut().enumerate() {
                    let i = first_row + local;
                    *o = self.source[i] - self.row_product(i, x);
                }
            },
        );
    }

    #[inline]
    fn row_product(&self, i: usize, x: &[f64]) -> f64 {
        let mut sum = self.diag[i] * x[i];
        for k in self.sparsity.row(i) {
            sum += self.off_diag[k] * x[self.sparsity.column(k)];
        }
        sum
    }

    /// `diag + Σ off_diag` per row.
    pub fn row_sums(&self) -> Vec<f64> {
        (0..self.n_rows())
            .map(|i| {
                self.diag[i]
                    + self.sparsity.row(i).map(|k| self.off_diag[k]).sum::<f64>()
            })
            .collect()
    }

    /// Check (i, j) equals (j, i) up to `tolerance`.
    pub fn is_symmetric(&self, tolerance: f64) -> bool {
        (0..self.n_rows()).all(|i| {
            self.sparsity.row(i).all(|k| {
                let j = self.sparsity.column(k);
                (self.off_diag[k] - self.coefficient(j, i)).abs() <= tolerance
            })
        })
    }

    /// `|diag| >= Σ |off_diag|` in every row.
    pub fn is_diagonally_dominant(&self) -> bool {
        (0..self.n_rows()).all(|i| {
            let off: f64 =
                self.sparsity.row(i).map(|k| self.off_diag[k].abs()).sum();
            self.diag[i].abs() >= off
        })
    }

    /// The equation `lhs == rhs`, i.e. `lhs - rhs` moved to one side.
    /// Both terms must share the sparsity pattern and dimensions.
    pub fn equation(mut lhs: FvMatrix, rhs: &FvMatrix) -> Result<FvMatrix> {
        if lhs.dimensions != rhs.dimensions {
            return Err(WaveError::DimensionMismatch {
                lhs: lhs.dimensions.to_string(),
                rhs: rhs.dimensions.to_string(),
            });
        }
        if !Arc::ptr_eq(&lhs.sparsity, &rhs.sparsity)
            && lhs.sparsity != rhs.sparsity
        {
            return Err(WaveError::invalid(
                "equation terms are assembled on different meshes",
            ));
        }
        for (a, b) in lhs.diag.iter_mut().zip(&rhs.diag) {
            *a -= b;
        }
        for (a, b) in lhs.off_diag.iter_mut().zip(&rhs.off_diag) {
            *a -= b;
        }
        for (a, b) in lhs.source.iter_mut().zip(&rhs.source) {
            *a -= b;
        }
        Ok(lhs)
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use crate::field::*;
    use crate::util::*;

    fn line(n: i32) -> Arc<Sparsity> {
        Arc::new(Sparsity::from_aabb(&AABB::new(matrix![0, n - 1])))
    }

    /// 1D  [2 -1; -1 2 -1; ...] with source = 1.
    fn poisson(n: i32) -> FvMatrix {
        let mut m = FvMatrix::new(line(n), DIMLESS);
        for block in m.row_blocks_mut(3) {
            for v in block.diag.iter_mut() {
                *v = 2.0;
            }
            for v in block.off_diag.iter_mut() {
                *v = -1.0;
            }
            for v in block.source.iter_mut() {
                *v = 1.0;
            }
        }
        m
    }

    #[test]
    fn row_blocks_cover_everything() {
        let mut m = FvMatrix::new(line(10), DIMLESS);
        let blocks = m.row_blocks_mut(4);
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[1].first_row, 4);
        assert_eq!(blocks[1].diag.len(), 4);
        assert_eq!(blocks[2].diag.len(), 2);
        let entries: usize = blocks.iter().map(|b| b.off_diag.len()).sum();
        assert_eq!(entries, 18);
        assert_eq!(blocks[1].first_entry, 7);
    }

    #[test]
    fn multiply_and_residual() {
        let m = poisson(5);
        let x = vec![1.0; 5];
        let mut out = vec![0.0; 5];
        for policy in [
            ExecutionPolicy::Serial,
            ExecutionPolicy::Parallel { chunk_size: 2 },
        ] {
            m.multiply(&x, &mut out, policy);
            assert_eq!(out, vec![1.0, 0.0, 0.0, 0.0, 1.0]);
            m.residual(&x, &mut out, policy);
            assert_eq!(out, vec![0.0, 1.0, 1.0, 1.0, 0.0]);
        }
        assert_eq!(m.coefficient(1, 2), -1.0);
        assert_eq!(m.coefficient(0, 2), 0.0);
        assert!(m.is_symmetric(0.0));
        assert!(m.is_diagonally_dominant());
        assert_eq!(m.row_sums(), vec![1.0, 0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn equation_subtracts() {
        let a = poisson(4);
        let b = poisson(4);
        let e = FvMatrix::equation(a, &b).unwrap();
        assert!(e.diag().iter().all(|v| *v == 0.0));
        assert!(e.off_diag().iter().all(|v| *v == 0.0));
        assert!(e.source().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn equation_checks_dimensions() {
        let a = poisson(4);
        let b = FvMatrix::new(a.sparsity().clone(), DIM_LENGTH);
        assert!(matches!(
            FvMatrix::equation(a, &b),
            Err(WaveError::DimensionMismatch { .. })
        ));

        let c = poisson(4);
        let d = poisson(5);
        assert!(matches!(
            FvMatrix::equation(c, &d),
            Err(WaveError::InvalidConfiguration(_))
        ));
    }
}
