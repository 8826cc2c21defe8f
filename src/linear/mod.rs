//! Iterative solution of assembled finite-volume systems.

mod pcg;

pub use pcg::*;

use crate::error::{Result, WaveError};
use crate::fvm::FvMatrix;
use clap::ValueEnum;

/// Preconditioner applied inside the conjugate gradient iteration.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum, Default)]
pub enum Preconditioner {
    /// Jacobi, divide by the matrix diagonal.
    #[default]
    Diagonal,
    None,
}

impl std::fmt::Display for Preconditioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Preconditioner::Diagonal => write!(f, "diagonal"),
            Preconditioner::None => write!(f, "none"),
        }
    }
}

/// Stopping criteria of an iterative solve.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SolverControls {
    /// Absolute bound on the normalised residual.
    pub tolerance: f64,
    /// Bound relative to the initial residual, 0 disables it.
    pub rel_tol: f64,
    pub max_iterations: usize,
    pub preconditioner: Preconditioner,
}

impl Default for SolverControls {
    fn default() -> Self {
        SolverControls {
            tolerance: 1e-8,
            rel_tol: 0.0,
            max_iterations: 1000,
            preconditioner: Preconditioner::Diagonal,
        }
    }
}

impl SolverControls {
    pub fn validate(&self) -> Result<()> {
        if !(self.tolerance > 0.0 && self.tolerance.is_finite()) {
            return Err(WaveError::invalid(format!(
                "solver tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        if !(self.rel_tol >= 0.0 && self.rel_tol < 1.0) {
            return Err(WaveError::invalid(format!(
                "relative tolerance must lie in [0, 1), got {}",
                self.rel_tol
            )));
        }
        if self.max_iterations == 0 {
            return Err(WaveError::invalid("max iterations must be at least 1"));
        }
        Ok(())
    }

    /// Has a normalised residual met either bound.
    pub fn converged(&self, initial_residual: f64, residual: f64) -> bool {
        residual <= self.tolerance
            || (self.rel_tol > 0.0 && residual <= self.rel_tol * initial_residual)
    }
}

/// Outcome of one solve.
#[derive(Clone, Debug, PartialEq)]
pub struct SolverPerformance {
    pub solver: &'static str,
    pub field: String,
    pub initial_residual: f64,
    pub final_residual: f64,
    pub iterations: usize,
}

impl std::fmt::Display for SolverPerformance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: Solving for {}, Initial residual = {:e}, \
             Final residual = {:e}, No Iterations {}",
            self.solver,
            self.field,
            self.initial_residual,
            self.final_residual,
            self.iterations
        )
    }
}

pub trait LinearSolver: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &'static str;

    fn controls(&self) -> &SolverControls;

    /// Solve `matrix` in place, `x` holds the initial guess on entry.
    /// Fails with `Convergence` if the iteration limit is reached,
    /// `x` is then left at the last iterate.
    fn solve(
        &self,
        matrix: &FvMatrix,
        x: &mut [f64],
        field: &str,
    ) -> Result<SolverPerformance>;
}
