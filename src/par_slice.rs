//! Chunked rayon kernels over `f64` slices.
//!
//! Reductions are summed per chunk and then chunk by chunk in order,
//! so the result depends on the chunk size but never on the number
//! of threads or on scheduling.

use rayon::prelude::*;

/// How per-cell loops are split into tasks.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExecutionPolicy {
    /// One task covering the whole slice.
    Serial,
    /// Tasks of `chunk_size` consecutive cells, no shared mutable state.
    Parallel { chunk_size: usize },
}

impl Default for ExecutionPolicy {
    fn default() -> Self {
        ExecutionPolicy::Parallel { chunk_size: 1000 }
    }
}

impl ExecutionPolicy {
    pub fn from_chunk_size(chunk_size: Option<usize>) -> Self {
        match chunk_size {
            Some(chunk_size) => ExecutionPolicy::Parallel { chunk_size },
            None => ExecutionPolicy::Serial,
        }
    }

    /// Chunk size to use for a slice of length `n`, never zero.
    pub fn chunk_size(&self, n: usize) -> usize {
        match self {
            ExecutionPolicy::Serial => n.max(1),
            ExecutionPolicy::Parallel { chunk_size } => (*chunk_size).max(1),
        }
    }
}

/// `y += alpha * x`
pub fn axpy(alpha: f64, x_slice: &[f64], y_slice: &mut [f64], chunk_size: usize) {
    debug_assert_eq!(x_slice.len(), y_slice.len());
    y_slice
        .par_chunks_mut(chunk_size)
        .zip(x_slice.par_chunks(chunk_size))
        .for_each(|(y_chunk, x_chunk)| {
            for (y, x) in y_chunk.iter_mut().zip(x_chunk) {
                *y += alpha * *x;
            }
        });
}

/// `y = x + beta * y`
pub fn xpby(x_slice: &[f64], beta: f64, y_slice: &mut [f64], chunk_size: usize) {
    debug_assert_eq!(x_slice.len(), y_slice.len());
    y_slice
        .par_chunks_mut(chunk_size)
        .zip(x_slice.par_chunks(chunk_size))
        .for_each(|(y_chunk, x_chunk)| {
            for (y, x) in y_chunk.iter_mut().zip(x_chunk) {
                *y = *x + beta * *y;
            }
        });
}

/// `out = a * b` element wise.
pub fn multiply_into(
    a_slice: &[f64],
    b_slice: &[f64],
    out_slice: &mut [f64],
    chunk_size: usize,
) {
    debug_assert_eq!(a_slice.len(), b_slice.len());
    debug_assert_eq!(a_slice.len(), out_slice.len());
    out_slice
        .par_chunks_mut(chunk_size)
        .zip(a_slice.par_chunks(chunk_size))
        .zip(b_slice.par_chunks(chunk_size))
        .for_each(|((out_chunk, a_chunk), b_chunk)| {
            for ((o, a), b) in out_chunk.iter_mut().zip(a_chunk).zip(b_chunk) {
                *o = *a * *b;
            }
        });
}

pub fn dot(a_slice: &[f64], b_slice: &[f64], chunk_size: usize) -> f64 {
    debug_assert_eq!(a_slice.len(), b_slice.len());
    let partials: Vec<f64> = a_slice
        .par_chunks(chunk_size)
        .zip(b_slice.par_chunks(chunk_size))
        .map(|(a_chunk, b_chunk)| {
            a_chunk.iter().zip(b_chunk).map(|(a, b)| a * b).sum::<f64>()
        })
        .collect();
    partials.iter().sum()
}

pub fn norm2(a_slice: &[f64], chunk_size: usize) -> f64 {
    dot(a_slice, a_slice, chunk_size).sqrt()
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn axpy_xpby_test() {
        let x = vec![1.0, 2.0, 3.0];
        let mut y = vec![1.0, 1.0, 1.0];
        axpy(2.0, &x, &mut y, 2);
        assert_eq!(y, vec![3.0, 5.0, 7.0]);
        xpby(&x, 0.5, &mut y, 1);
        assert_eq!(y, vec![2.5, 4.5, 6.5]);

        let mut out = vec![0.0; 3];
        multiply_into(&x, &y, &mut out, 2);
        assert_eq!(out, vec![2.5, 9.0, 19.5]);
    }

    #[test]
    fn dot_is_reproducible() {
        let n = 10_000;
        let a: Vec<f64> = (0..n).map(|i| (i as f64 * 0.37).sin()).collect();
        let b: Vec<f64> = (0..n).map(|i| (i as f64 * 0.11).cos()).collect();
        let first = dot(&a, &b, 64);
        for _ in 0..10 {
            assert_eq!(dot(&a, &b, 64).to_bits(), first.to_bits());
        }
        let serial: f64 = a.iter().zip(&b).map(|(a, b)| a * b).sum();
        assert_approx_eq!(f64, first, serial, epsilon = 1e-9);
        assert_approx_eq!(f64, norm2(&[3.0, 4.0], 1), 5.0);
    }

    #[test]
    fn policy_chunk_size() {
        assert_eq!(ExecutionPolicy::Serial.chunk_size(50), 50);
        assert_eq!(ExecutionPolicy::Serial.chunk_size(0), 1);
        let p = ExecutionPolicy::Parallel { chunk_size: 8 };
        assert_eq!(p.chunk_size(50), 8);
        assert_eq!(
            ExecutionPolicy::from_chunk_size(None),
            ExecutionPolicy::Serial
        );
    }
}
