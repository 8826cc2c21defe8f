//! This module has things for managing value buffers over the cell grid,
//! which really means retrieving values based on cell coordinates.
//! Fields, time-history levels and checkpoints all store their values
//! in an `OwnedDomain`.
//! Boundary conditions describe what lies beyond the edge of the grid.

mod bc;
mod view;

pub use bc::*;
pub use view::*;
