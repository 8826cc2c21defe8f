//! Implicit finite-volume operators on a Cartesian mesh.

mod assembler;
mod d2dt2;
mod laplacian;
mod matrix;

pub use assembler::*;
pub use d2dt2::*;
pub use laplacian::*;
pub use matrix::*;
