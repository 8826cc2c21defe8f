//! Checkpoints and post-processing output.

pub mod checkpoint;
mod csv;
mod image;
mod vtk;

pub use checkpoint::{Checkpoint, CheckpointStore, DirectoryStore, MemoryStore};
pub use csv::*;
pub use image::*;
pub use vtk::*;

use crate::error::Result;
use crate::field::Field;
use crate::mesh::CartesianMesh;
use crate::time::SimulationClock;

/// Output produced each time the run writes, next to the checkpoint.
pub trait FieldWriter<const GRID_DIMENSION: usize>: Send {
    fn write(
        &mut self,
        mesh: &CartesianMesh<GRID_DIMENSION>,
        field: &Field<GRID_DIMENSION>,
        clock: &SimulationClock,
    ) -> Result<()>;

    /// Called once when the run ends, successful or not.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}
