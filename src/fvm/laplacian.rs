use crate::domain::*;
use crate::error::{Result, WaveError};
use crate::field::*;
use crate::fvm::FvMatrix;
use crate::mesh::CartesianMesh;
use crate::par_slice::ExecutionPolicy;
use crate::schemes::InterpolationScheme;
use rayon::prelude::*;

/// Implicit `laplacian(gamma, psi)` integrated over each cell.
///
/// Interior faces contribute `gamma_f * A / d` to the neighbour coefficient
/// and subtract it from the diagonal. A fixed value face adds
/// `gamma_P * A / (d / 2)` with the prescribed value moved to the source.
/// Zero gradient faces contribute nothing, so without fixed faces
/// every row sums to zero.
pub fn laplacian<const GRID_DIMENSION: usize>(
    mesh: &CartesianMesh<GRID_DIMENSION>,
    gamma: &Field<GRID_DIMENSION>,
    psi_dimensions: &DimensionSet,
    bcs: &BoundaryConditions<GRID_DIMENSION>,
    scheme: &dyn InterpolationScheme,
    policy: ExecutionPolicy,
) -> Result<FvMatrix> {
    profiling::scope!("laplacian");
    if gamma.domain().aabb() != mesh.aabb() {
        return Err(WaveError::invalid(format!(
            "diffusivity {} covers {}, mesh covers {}",
            gamma.name(),
            gamma.domain().aabb(),
            mesh.aabb()
        )));
    }

    let dimensions = gamma
        .dimensions()
        .mul(psi_dimensions)
        .div(&DIM_LENGTH.pow(2.0))
        .mul(&DIM_VOLUME);
    let sparsity = mesh.sparsity().clone();
    let mut matrix = FvMatrix::new(sparsity.clone(), dimensions);

    let aabb = *mesh.aabb();
    let gamma_values = gamma.values();
    let interior: [f64; GRID_DIMENSION] = std::array::from_fn(|d| {
        mesh.face_area(d) / mesh.centre_distance(d)
    });
    let boundary: [f64; GRID_DIMENSION] = std::array::from_fn(|d| {
        mesh.face_area(d) / mesh.boundary_distance(d)
    });

    let chunk_size = policy.chunk_size(mesh.n_cells());
    matrix
        .row_blocks_mut(chunk_size)
        .into_par_iter()
        .for_each(|block| {
            for local in 0..block.diag.len() {
                let i = block.first_row + local;
                let gamma_p = gamma_values[i];
                let mut diag = 0.0;
                let mut source = 0.0;

                for k in sparsity.row(i) {
                    let j = sparsity.column(k);
                    let d = sparsity.direction(k);
                    let gamma_f =
                        scheme.interpolate(gamma_p, gamma_values[j], 0.5);
                    let coeff = gamma_f * interior[d];
                    block.off_diag[k - block.first_entry] = coeff;
                    diag -= coeff;
                }

                let coord = aabb.linear_to_coord(i);
                for (d, side) in BoundaryConditions::boundary_sides(&aabb, &coord)
                {
                    if let PatchCondition::FixedValue(value) = bcs.patch(d, side)
                    {
                        let coeff = gamma_p * boundary[d];
                        diag -= coeff;
                        source -= coeff * value;
                    }
                }

                block.diag[local] = diag;
                block.source[local] = source;
            }
        });

    Ok(matrix)
}
