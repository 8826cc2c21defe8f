use crate::domain::*;
use crate::error::Result;
use crate::field::*;
use crate::fvm::{d2dt2, laplacian, FvMatrix};
use crate::mesh::CartesianMesh;
use crate::par_slice::ExecutionPolicy;
use crate::schemes::InterpolationScheme;
use crate::time::TimeHistory;
use rayon::prelude::*;

/// Builds the discrete wave equation `d2dt2(psi) == laplacian(c^2, psi)`
/// for one step.
///
/// Assembly only reads its inputs, so calling it twice with the same
/// arguments gives identical matrices.
#[derive(Debug)]
pub struct EquationAssembler<const GRID_DIMENSION: usize> {
    bcs: BoundaryConditions<GRID_DIMENSION>,
    scheme: Box<dyn InterpolationScheme>,
    policy: ExecutionPolicy,
}

impl<const GRID_DIMENSION: usize> EquationAssembler<GRID_DIMENSION> {
    pub fn new(
        bcs: BoundaryConditions<GRID_DIMENSION>,
        scheme: Box<dyn InterpolationScheme>,
        policy: ExecutionPolicy,
    ) -> Self {
        EquationAssembler {
            bcs,
            scheme,
            policy,
        }
    }

    pub fn boundary_conditions(&self) -> &BoundaryConditions<GRID_DIMENSION> {
        &self.bcs
    }

    pub fn scheme(&self) -> &dyn InterpolationScheme {
        self.scheme.as_ref()
    }

    /// `c^2` as a cell field, the diffusivity of the spatial term.
    pub fn squared_speed(
        &self,
        wave_speed: &Field<GRID_DIMENSION>,
    ) -> Field<GRID_DIMENSION> {
        let mut values = wave_speed.domain().clone();
        let chunk_size = self.policy.chunk_size(values.buffer().len());
        values
            .buffer_mut()
            .par_chunks_mut(chunk_size)
            .for_each(|chunk: &mut [f64]| {
                for c in chunk {
                    *c *= *c;
                }
            });
        Field::new(
            format!("sqr({})", wave_speed.name()),
            wave_speed.dimensions().pow(2.0),
            values,
        )
    }

    /// Assemble the system for the level `delta_t` after the current one.
    pub fn assemble(
        &self,
        mesh: &CartesianMesh<GRID_DIMENSION>,
        psi: &Field<GRID_DIMENSION>,
        wave_speed: &Field<GRID_DIMENSION>,
        history: &TimeHistory<GRID_DIMENSION>,
        delta_t: f64,
    ) -> Result<FvMatrix> {
        profiling::scope!("assemble");
        let temporal =
            d2dt2(mesh, psi.dimensions(), history, delta_t, self.policy)?;
        let gamma = self.squared_speed(wave_speed);
        let spatial = laplacian(
            mesh,
            &gamma,
            psi.dimensions(),
            &self.bcs,
            self.scheme.as_ref(),
            self.policy,
        )?;
        FvMatrix::equation(temporal, &spatial)
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use crate::error::WaveError;
    use crate::schemes::*;
    use crate::util::*;
    use float_cmp::assert_approx_eq;

    fn case() -> (CartesianMesh<2>, Field<2>, Field<2>, TimeHistory<2>) {
        let mesh = CartesianMesh::new([6, 5], vector![1.2, 1.0]).unwrap();
        let aabb = *mesh.aabb();
        let mut h = OwnedDomain::new(aabb);
        h.par_set_values(|c| (c[0] * c[1]) as f64 * 0.1, 4);
        let history = TimeHistory::seed_zero_velocity(h.clone(), 0.0, 0.01);
        let psi = Field::new("h", DIMLESS, h);
        let c = Field::uniform("C", DIM_VELOCITY, aabb, 2.0);
        (mesh, psi, c, history)
    }

    #[test]
    fn assembly_is_idempotent() {
        let (mesh, psi, c, history) = case();
        let assembler = EquationAssembler::new(
            BoundaryConditions::zero_gradient(),
            Box::new(Linear),
            ExecutionPolicy::Parallel { chunk_size: 7 },
        );
        let a = assembler.assemble(&mesh, &psi, &c, &history, 0.01).unwrap();
        let b = assembler.assemble(&mesh, &psi, &c, &history, 0.01).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn system_is_spd_shaped() {
        let (mesh, psi, c, history) = case();
        let assembler = EquationAssembler::new(
            BoundaryConditions::zero_gradient(),
            Box::new(Linear),
            ExecutionPolicy::Serial,
        );
        let m = assembler.assemble(&mesh, &psi, &c, &history, 0.01).unwrap();
        assert!(m.is_symmetric(1e-12));
        assert!(m.is_diagonally_dominant());
        assert!(m.diag().iter().all(|d| *d > 0.0));
        // d2dt2 diagonal plus the negated Laplacian row sum.
        let row_sums = m.row_sums();
        let temporal = 1.0e4 * mesh.cell_volume();
        for s in row_sums {
            assert_approx_eq!(f64, s, temporal, epsilon = 1e-9);
        }
    }

    #[test]
    fn squared_speed_field() {
        let (_, _, c, _) = case();
        let assembler = EquationAssembler::<2>::new(
            BoundaryConditions::zero_gradient(),
            Box::new(MidPoint),
            ExecutionPolicy::Serial,
        );
        let gamma = assembler.squared_speed(&c);
        assert_eq!(gamma.name(), "sqr(C)");
        assert_eq!(gamma.dimensions(), &DIM_VELOCITY.pow(2.0));
        assert!(gamma.values().iter().all(|v| *v == 4.0));
    }

    #[test]
    fn inconsistent_speed_dimensions() {
        let (mesh, psi, _, history) = case();
        let c = Field::uniform("C", DIMLESS, *mesh.aabb(), 1.0);
        let assembler = EquationAssembler::new(
            BoundaryConditions::zero_gradient(),
            Box::new(Linear),
            ExecutionPolicy::Serial,
        );
        assert!(matches!(
            assembler.assemble(&mesh, &psi, &c, &history, 0.01),
            Err(WaveError::DimensionMismatch { .. })
        ));
    }
}
