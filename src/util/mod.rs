pub use nalgebra::{matrix, vector};
pub use num_traits::{One, Zero};

mod aabb;
pub mod indexing;
pub use aabb::*;

/// Integer cell coordinate.
pub type Coord<const GRID_DIMENSION: usize> =
    nalgebra::SVector<i32, { GRID_DIMENSION }>;

/// Inclusive min / max corners, one row per dimension.
pub type Bounds<const GRID_DIMENSION: usize> =
    nalgebra::SMatrix<i32, { GRID_DIMENSION }, 2>;

/// Physical quantities per dimension (spacing, lengths, positions).
pub type Extent<const GRID_DIMENSION: usize> =
    nalgebra::SVector<f64, { GRID_DIMENSION }>;

/// Guards divisions by residual norms and Courant numbers.
pub const SMALL: f64 = 1.0e-15;
