//! Error types for the wave solver.

use thiserror::Error;

/// Everything that can stop a run.
///
/// `UnknownField` and `InvalidConfiguration` are set-up mistakes,
/// `Convergence` is a numerical failure of the current step,
/// `InsufficientHistory` means the time history was not seeded.
#[derive(Error, Debug)]
pub enum WaveError {
    /// A field name was queried that was never registered.
    #[error("unknown field '{name}', registered fields: {available:?}")]
    UnknownField {
        name: String,
        available: Vec<String>,
    },

    /// The linear solver hit its iteration limit.
    #[error(
        "solving for {field} did not converge: {iterations} iterations, \
         residual {residual:e}"
    )]
    Convergence {
        field: String,
        iterations: usize,
        residual: f64,
    },

    /// The temporal operator needs more stored levels than are available.
    #[error(
        "time history holds {available} levels, \
         second derivative needs {required}"
    )]
    InsufficientHistory { required: usize, available: usize },

    /// Rejected before the first step.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Scheme name not found in the registry.
    #[error("unknown {kind} scheme '{name}', valid choices: {available:?}")]
    UnknownScheme {
        kind: &'static str,
        name: String,
        available: Vec<String>,
    },

    /// Two equation terms with different physical dimensions.
    #[error("dimensions of equation terms differ: {lhs} vs {rhs}")]
    DimensionMismatch { lhs: String, rhs: String },

    /// A checkpoint could not be decoded or is incompatible with the case.
    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("VTK export failed: {0}")]
    Vtk(String),

    #[error("image output failed: {0}")]
    Image(#[from] image::ImageError),
}

impl WaveError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }

    /// Numerical failure of a single run, as opposed to a set-up mistake.
    pub fn is_numerical(&self) -> bool {
        matches!(
            self,
            Self::Convergence { .. } | Self::InsufficientHistory { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, WaveError>;

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn convergence_message() {
        let e = WaveError::Convergence {
            field: "h".to_string(),
            iterations: 1,
            residual: 0.5,
        };
        let message = e.to_string();
        assert!(message.contains("h"));
        assert!(message.contains("1 iterations"));
        assert!(message.contains("5e-1"));
        assert!(e.is_numerical());
        assert!(!WaveError::invalid("dt").is_numerical());
    }
}
