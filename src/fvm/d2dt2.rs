use crate::domain::*;
use crate::error::{Result, WaveError};
use crate::field::*;
use crate::fvm::FvMatrix;
use crate::mesh::CartesianMesh;
use crate::par_slice::ExecutionPolicy;
use crate::time::TimeHistory;
use rayon::prelude::*;

/// Weights of the three level backward difference for a second time
/// derivative with a possibly changing step.
///
/// With `delta_t` the step being taken and `delta_t0` the previous one,
/// `d2psi/dt2 ~ r * (coefft psi_new - coefft0 psi_cur + coefft00 psi_old)`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EulerD2dt2Weights {
    pub coefft: f64,
    pub coefft0: f64,
    pub coefft00: f64,
    pub r: f64,
}

impl EulerD2dt2Weights {
    pub fn new(delta_t: f64, delta_t0: f64) -> Result<Self> {
        if !(delta_t > 0.0 && delta_t.is_finite()) {
            return Err(WaveError::invalid(format!(
                "time step must be positive and finite, got {delta_t}"
            )));
        }
        if !(delta_t0 > 0.0 && delta_t0.is_finite()) {
            return Err(WaveError::invalid(format!(
                "previous time step must be positive and finite, got {delta_t0}"
            )));
        }
        let coefft = (delta_t + delta_t0) / (2.0 * delta_t);
        let coefft00 = (delta_t + delta_t0) / (2.0 * delta_t0);
        Ok(EulerD2dt2Weights {
            coefft,
            coefft0: coefft + coefft00,
            coefft00,
            r: 4.0 / (delta_t + delta_t0).powi(2),
        })
    }
}

/// Implicit `d2dt2(psi)` integrated over each cell.
///
/// Needs the current and old levels of `psi`, the previous step is
/// taken from the difference of their times. Off-diagonal entries stay zero.
pub fn d2dt2<const GRID_DIMENSION: usize>(
    mesh: &CartesianMesh<GRID_DIMENSION>,
    psi_dimensions: &DimensionSet,
    history: &TimeHistory<GRID_DIMENSION>,
    delta_t: f64,
    policy: ExecutionPolicy,
) -> Result<FvMatrix> {
    profiling::scope!("d2dt2");
    history.require(2)?;
    let current = history.current()?;
    let old = history.old()?;
    if current.values.aabb() != mesh.aabb() {
        return Err(WaveError::invalid(format!(
            "time history covers {}, mesh covers {}",
            current.values.aabb(),
            mesh.aabb()
        )));
    }
    let weights = EulerD2dt2Weights::new(delta_t, current.time - old.time)?;

    let dimensions = psi_dimensions.div(&DIM_TIME.pow(2.0)).mul(&DIM_VOLUME);
    let mut matrix = FvMatrix::new(mesh.sparsity().clone(), dimensions);

    let volume_r = weights.r * mesh.cell_volume();
    let diag = weights.coefft * volume_r;
    let psi_cur = current.values.buffer();
    let psi_old = old.values.buffer();

    let chunk_size = policy.chunk_size(mesh.n_cells());
    matrix
        .row_blocks_mut(chunk_size)
        .into_par_iter()
        .for_each(|block| {
            for local in 0..block.diag.len() {
                let i = block.first_row + local;
                block.diag[local] = diag;
                block.source[local] = volume_r
                    * (weights.coefft0 * psi_cur[i]
                        - weights.coefft00 * psi_old[i]);
            }
        });

    Ok(matrix)
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use crate::util::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn constant_step_weights() {
        let w = EulerD2dt2Weights::new(0.1, 0.1).unwrap();
        assert_approx_eq!(f64, w.coefft, 1.0);
        assert_approx_eq!(f64, w.coefft00, 1.0);
        assert_approx_eq!(f64, w.coefft0, 2.0);
        assert_approx_eq!(f64, w.r, 100.0, epsilon = 1e-9);
    }

    #[test]
    fn bad_steps() {
        assert!(EulerD2dt2Weights::new(0.0, 0.1).is_err());
        assert!(EulerD2dt2Weights::new(0.1, -0.1).is_err());
        assert!(EulerD2dt2Weights::new(f64::NAN, 0.1).is_err());
    }

    /// Second derivative estimate of psi(t) at the current time.
    fn estimate(psi: impl Fn(f64) -> f64, t: f64, dt: f64, dt0: f64) -> f64 {
        let w = EulerD2dt2Weights::new(dt, dt0).unwrap();
        w.r * (w.coefft * psi(t + dt) - w.coefft0 * psi(t) + w.coefft00 * psi(t - dt0))
    }

    #[test]
    fn exact_for_quadratics() {
        let psi = |t: f64| 3.0 * t * t - t + 2.0;
        assert_approx_eq!(f64, estimate(psi, 1.0, 0.1, 0.1), 6.0, epsilon = 1e-9);
        assert_approx_eq!(f64, estimate(psi, 1.0, 0.1, 0.05), 6.0, epsilon = 1e-9);
    }

    #[test]
    fn converges_second_order_for_smooth_signal() {
        let error = |dt: f64| (estimate(f64::sin, 0.7, dt, dt) + 0.7f64.sin()).abs();
        let e1 = error(0.02);
        let e2 = error(0.01);
        let order = (e1 / e2).log2();
        assert!((order - 2.0).abs() < 0.1, "observed order {order}");
    }

    #[test]
    fn assembled_operator_converges_second_order() {
        // psi_i(t) = a_i sin(t) on cells of volume 0.5
        let mesh = CartesianMesh::new([4], vector![2.0]).unwrap();
        let aabb = *mesh.aabb();
        let amplitude = |c: Coord<1>| 1.0 + c[0] as f64;
        let t = 0.7;
        let error = |dt: f64| -> f64 {
            let mut history = TimeHistory::new();
            for level_time in [t - dt, t] {
                let mut level = OwnedDomain::new(aabb);
                level.par_set_values(move |c| amplitude(c) * level_time.sin(), 2);
                history.push(level_time, level);
            }
            let m = d2dt2(
                &mesh,
                &DIMLESS,
                &history,
                dt,
                ExecutionPolicy::Parallel { chunk_size: 3 },
            )
            .unwrap();
            let next: Vec<f64> = aabb
                .coord_iter()
                .map(|c| amplitude(c) * (t + dt).sin())
                .collect();
            let mut r = vec![0.0; 4];
            m.residual(&next, &mut r, ExecutionPolicy::Serial);
            aabb.coord_iter()
                .zip(r)
                .map(|(c, r)| (r / mesh.cell_volume() - amplitude(c) * t.sin()).abs())
                .fold(0.0, f64::max)
        };
        let e1 = error(0.02);
        let e2 = error(0.01);
        let order = (e1 / e2).log2();
        assert!((order - 2.0).abs() < 0.1, "observed order {order}");
    }

    #[test]
    fn matrix_rows() {
        let mesh = CartesianMesh::new([3], vector![3.0]).unwrap();
        let aabb = *mesh.aabb();
        let mut history = TimeHistory::new();
        history.push(0.0, OwnedDomain::uniform(aabb, 1.0));
        assert!(matches!(
            d2dt2(&mesh, &DIMLESS, &history, 0.5, ExecutionPolicy::Serial),
            Err(WaveError::InsufficientHistory { .. })
        ));

        history.push(0.5, OwnedDomain::uniform(aabb, 2.0));
        let m = d2dt2(
            &mesh,
            &DIMLESS,
            &history,
            0.5,
            ExecutionPolicy::Parallel { chunk_size: 2 },
        )
        .unwrap();
        // r = 4, V = 1
        for i in 0..3 {
            assert_approx_eq!(f64, m.diag()[i], 4.0);
            assert_approx_eq!(f64, m.source()[i], 4.0 * (2.0 * 2.0 - 1.0));
        }
        assert!(m.off_diag().iter().all(|v| *v == 0.0));

        // Zero acceleration continues the linear trend: psi_new = 3.
        let mut r = vec![0.0; 3];
        m.residual(&[3.0; 3], &mut r, ExecutionPolicy::Serial);
        for v in r {
            assert_approx_eq!(f64, v, 0.0);
        }
    }
}
