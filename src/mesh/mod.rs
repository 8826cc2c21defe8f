//! Structured Cartesian finite-volume mesh.
//!
//! Cells are axis aligned boxes indexed by an `AABB` starting at the
//! origin. The mesh answers the geometric questions the operators ask:
//! cell volumes, face areas, centre to centre distances, and which
//! cells share a face.

mod cartesian;
mod sparsity;

pub use cartesian::*;
pub use sparsity::*;
