use crate::error::{Result, WaveError};
use crate::fvm::FvMatrix;
use crate::linear::*;
use crate::par_slice::{self, ExecutionPolicy};
use crate::util::*;
use rayon::prelude::*;

/// Preconditioned conjugate gradient for symmetric positive definite systems.
#[derive(Clone, Debug)]
pub struct Pcg {
    controls: SolverControls,
    policy: ExecutionPolicy,
}

impl Pcg {
    pub fn new(controls: SolverControls, policy: ExecutionPolicy) -> Result<Self> {
        controls.validate()?;
        Ok(Pcg { controls, policy })
    }

    /// `z = M^-1 r`
    fn precondition(&self, inv_diag: &[f64], r: &[f64], z: &mut [f64], chunk_size: usize) {
        match self.controls.preconditioner {
            Preconditioner::Diagonal => {
                par_slice::multiply_into(inv_diag, r, z, chunk_size)
            }
            Preconditioner::None => z.copy_from_slice(r),
        }
    }

    fn normalised(&self, r: &[f64], norm_factor: f64, chunk_size: usize) -> f64 {
        par_slice::norm2(r, chunk_size) / norm_factor
    }

    fn failure(&self, field: &str, iterations: usize, residual: f64) -> WaveError {
        WaveError::Convergence {
            field: field.to_string(),
            iterations,
            residual,
        }
    }
}

impl LinearSolver for Pcg {
    fn name(&self) -> &'static str {
        "PCG"
    }

    fn controls(&self) -> &SolverControls {
        &self.controls
    }

    fn solve(
        &self,
        matrix: &FvMatrix,
        x: &mut [f64],
        field: &str,
    ) -> Result<SolverPerformance> {
        profiling::scope!("pcg");
        let n = matrix.n_rows();
        if x.len() != n {
            return Err(WaveError::invalid(format!(
                "solution vector has {} entries, matrix has {} rows",
                x.len(),
                n
            )));
        }
        let chunk_size = self.policy.chunk_size(n);

        let mut r = vec![0.0; n];
        matrix.residual(x, &mut r, self.policy);
        let norm_factor =
            par_slice::norm2(matrix.source(), chunk_size).max(SMALL);
        let initial_residual = self.normalised(&r, norm_factor, chunk_size);

        let mut performance = SolverPerformance {
            solver: self.name(),
            field: field.to_string(),
            initial_residual,
            final_residual: initial_residual,
            iterations: 0,
        };
        if self.controls.converged(initial_residual, initial_residual) {
            tracing::info!("{performance}");
            return Ok(performance);
        }

        let mut inv_diag = vec![0.0; n];
        inv_diag
            .par_chunks_mut(chunk_size)
            .zip(matrix.diag().par_chunks(chunk_size))
            .for_each(|(inv_chunk, diag_chunk)| {
                for (inv, d) in inv_chunk.iter_mut().zip(diag_chunk) {
                    *inv = if d.abs() > SMALL { 1.0 / d } else { 1.0 };
                }
            });

        let mut z = vec![0.0; n];
        self.precondition(&inv_diag, &r, &mut z, chunk_size);
        let mut p = z.clone();
        let mut rz = par_slice::dot(&r, &z, chunk_size);
        let mut ap = vec![0.0; n];

        for iteration in 1..=self.controls.max_iterations {
            matrix.multiply(&p, &mut ap, self.policy);
            let p_ap = par_slice::dot(&p, &ap, chunk_size);
            if !(p_ap > 0.0) || !p_ap.is_finite() {
                // Only reachable if the system is not positive definite.
                tracing::warn!(
                    "{}: breakdown solving for {field}, p.Ap = {p_ap:e}",
                    self.name()
                );
                return Err(self.failure(
                    field,
                    iteration,
                    performance.final_residual,
                ));
            }

            let alpha = rz / p_ap;
            par_slice::axpy(alpha, &p, x, chunk_size);
            par_slice::axpy(-alpha, &ap, &mut r, chunk_size);

            performance.final_residual =
                self.normalised(&r, norm_factor, chunk_size);
            performance.iterations = iteration;
            if self
                .controls
                .converged(initial_residual, performance.final_residual)
            {
                tracing::info!("{performance}");
                return Ok(performance);
            }

            self.precondition(&inv_diag, &r, &mut z, chunk_size);
            let rz_new = par_slice::dot(&r, &z, chunk_size);
            par_slice::xpby(&z, rz_new / rz, &mut p, chunk_size);
            rz = rz_new;
        }

        tracing::info!("{performance}");
        Err(self.failure(
            field,
            performance.iterations,
            performance.final_residual,
        ))
    }
}
