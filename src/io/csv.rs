use crate::domain::*;
use crate::error::Result;
use crate::field::Field;
use crate::io::FieldWriter;
use crate::mesh::CartesianMesh;
use crate::time::SimulationClock;
use crate::util::*;
use std::io::prelude::*;
use std::path::{Path, PathBuf};

/// Samples along dimension 0 through the middle of the other dimensions,
/// one `x, value` line per cell.
pub fn write_centreline_csv<const GRID_DIMENSION: usize, P: AsRef<Path>>(
    mesh: &CartesianMesh<GRID_DIMENSION>,
    field: &Field<GRID_DIMENSION>,
    path: &P,
) -> Result<()> {
    tracing::debug!("Writing: {:?}", path.as_ref());
    let mut output = std::io::BufWriter::new(std::fs::File::create(path)?);
    let aabb = mesh.aabb();
    let mut coord = Coord::from_fn(|d, _| {
        aabb.bounds[(d, 0)] + (aabb.bounds[(d, 1)] - aabb.bounds[(d, 0)]) / 2
    });

    writeln!(output, "x, {}", field.name())?;
    for x in aabb.bounds[(0, 0)]..=aabb.bounds[(0, 1)] {
        coord[0] = x;
        let position = mesh.cell_centre(&coord);
        let r = field.domain().view(&coord);
        writeln!(output, "{}, {r}", position[0])?;
    }
    output.flush()?;
    Ok(())
}

/// `<directory>/<time>/centreline_<field>.csv` for every written level.
#[derive(Debug, Clone)]
pub struct CsvWriter {
    directory: PathBuf,
}

impl CsvWriter {
    pub fn new<P: AsRef<Path>>(directory: P) -> Result<Self> {
        std::fs::create_dir_all(directory.as_ref())?;
        Ok(CsvWriter {
            directory: directory.as_ref().to_path_buf(),
        })
    }

    pub fn sample_path(&self, field: &str, time_name: &str) -> PathBuf {
        let mut result = self.directory.clone();
        result.push(time_name);
        result.push(format!("centreline_{field}.csv"));
        result
    }
}

impl<const GRID_DIMENSION: usize> FieldWriter<GRID_DIMENSION> for CsvWriter {
    fn write(
        &mut self,
        mesh: &CartesianMesh<GRID_DIMENSION>,
        field: &Field<GRID_DIMENSION>,
        clock: &SimulationClock,
    ) -> Result<()> {
        let path = self.sample_path(field.name(), &clock.time_name());
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        write_centreline_csv(mesh, field, &path)
    }
}
