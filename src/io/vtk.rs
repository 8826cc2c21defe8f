use crate::domain::*;
use crate::error::{Result, WaveError};
use crate::field::Field;
use crate::io::FieldWriter;
use crate::mesh::CartesianMesh;
use crate::time::SimulationClock;
use crate::util::*;
use std::path::{Path, PathBuf};
use vtkio::model::*;

/// Corner offsets of one cell in VTK vertex order, and its cell type.
fn cell_corners<const GRID_DIMENSION: usize>(
) -> Result<(CellType, Vec<Coord<GRID_DIMENSION>>)> {
    let (cell_type, table): (CellType, &[[i32; 3]]) = match GRID_DIMENSION {
        1 => (CellType::Line, &[[0, 0, 0], [1, 0, 0]]),
        2 => (
            CellType::Quad,
            &[[0, 0, 0], [1, 0, 0], [1, 1, 0], [0, 1, 0]],
        ),
        3 => (
            CellType::Hexahedron,
            &[
                [0, 0, 0],
                [1, 0, 0],
                [1, 1, 0],
                [0, 1, 0],
                [0, 0, 1],
                [1, 0, 1],
                [1, 1, 1],
                [0, 1, 1],
            ],
        ),
        d => {
            return Err(WaveError::Vtk(format!("no VTK cell type for {d}D grids")))
        }
    };
    let corners = table
        .iter()
        .map(|t| Coord::from_fn(|d, _| t[d]))
        .collect();
    Ok((cell_type, corners))
}

/// Unstructured grid of the mesh cells with `field` as cell data.
pub fn write_vtk<const GRID_DIMENSION: usize, P: AsRef<Path>>(
    mesh: &CartesianMesh<GRID_DIMENSION>,
    field: &Field<GRID_DIMENSION>,
    path: &P,
) -> Result<()> {
    profiling::scope!("write_vtk");
    tracing::debug!("Writing vtk: {:?}", path.as_ref());
    let aabb = mesh.aabb();
    let point_bounds = aabb.point_bounds();

    let mut points = Vec::with_capacity(3 * point_bounds.buffer_size());
    for point in point_bounds.coord_iter() {
        let position = mesh.point_position(&point);
        for d in 0..3 {
            points.push(if d < GRID_DIMENSION {
                position[d] as f32
            } else {
                0.0
            });
        }
    }

    let (cell_type, corners) = cell_corners::<GRID_DIMENSION>()?;
    let n_cells = aabb.buffer_size();
    let mut connectivity = Vec::with_capacity(n_cells * corners.len());
    let mut offsets = Vec::with_capacity(n_cells);
    for cell in aabb.coord_iter() {
        for corner in &corners {
            let point = cell + corner;
            connectivity.push(point_bounds.coord_to_linear(&point) as u64);
        }
        offsets.push(connectivity.len() as u64);
    }

    Vtk {
        version: Version::Auto,
        title: field.name().to_string(),
        byte_order: ByteOrder::LittleEndian,
        file_path: None,
        data: DataSet::inline(UnstructuredGridPiece {
            points: IOBuffer::F32(points),
            cells: Cells {
                cell_verts: VertexNumbers::XML {
                    connectivity,
                    offsets,
                },
                types: vec![cell_type; n_cells],
            },
            data: Attributes {
                point: vec![],
                cell: vec![Attribute::DataArray(DataArray {
                    name: field.name().to_string(),
                    elem: ElementType::Scalars {
                        num_comp: 1,
                        lookup_table: None,
                    },
                    data: IOBuffer::F64(field.domain().buffer().to_vec()),
                })],
            },
        }),
    }
    .export(path.as_ref())
    .map_err(|e| WaveError::Vtk(format!("{}: {e:?}", path.as_ref().display())))
}

/// `<directory>/<field>_<step>.vtu` for every written level.
#[derive(Debug, Clone)]
pub struct VtkWriter {
    directory: PathBuf,
}

impl VtkWriter {
    pub fn new<P: AsRef<Path>>(directory: P) -> Result<Self> {
        std::fs::create_dir_all(directory.as_ref())?;
        Ok(VtkWriter {
            directory: directory.as_ref().to_path_buf(),
        })
    }

    pub fn frame_name(&self, field: &str, step_index: usize) -> PathBuf {
        let mut result = self.directory.clone();
        result.push(format!("{field}_{step_index:04}.vtu"));
        result
    }
}

impl<const GRID_DIMENSION: usize> FieldWriter<GRID_DIMENSION> for VtkWriter {
    fn write(
        &mut self,
        mesh: &CartesianMesh<GRID_DIMENSION>,
        field: &Field<GRID_DIMENSION>,
        clock: &SimulationClock,
    ) -> Result<()> {
        write_vtk(mesh, field, &self.frame_name(field.name(), clock.step_index()))
    }
}
