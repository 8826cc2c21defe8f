use crate::domain::*;
use crate::error::{Result, WaveError};
use crate::field::*;
use crate::mesh::CartesianMesh;
use crate::par_slice::ExecutionPolicy;
use crate::time::{SimulationClock, TimeHistory};

/// Name of the solved field.
pub const SOLVED_FIELD: &str = "h";
/// Name of the wave speed field.
pub const SPEED_FIELD: &str = "C";

/// Everything needed to set up a run, before any validation.
#[derive(Debug, Clone)]
pub struct WaveCase<const GRID_DIMENSION: usize> {
    pub mesh: CartesianMesh<GRID_DIMENSION>,
    pub initial: OwnedDomain<GRID_DIMENSION>,
    pub wave_speed: OwnedDomain<GRID_DIMENSION>,
    pub bcs: BoundaryConditions<GRID_DIMENSION>,
    /// Face interpolation scheme of `c^2`, looked up in the registry.
    pub scheme: String,
    pub policy: ExecutionPolicy,
}

impl<const GRID_DIMENSION: usize> WaveCase<GRID_DIMENSION> {
    /// Zero gradient walls, linear interpolation and the default policy.
    pub fn uniform_speed(
        mesh: CartesianMesh<GRID_DIMENSION>,
        initial: OwnedDomain<GRID_DIMENSION>,
        wave_speed: f64,
    ) -> Self {
        let speed = OwnedDomain::uniform(*mesh.aabb(), wave_speed);
        WaveCase {
            mesh,
            initial,
            wave_speed: speed,
            bcs: BoundaryConditions::default(),
            scheme: "linear".to_string(),
            policy: ExecutionPolicy::default(),
        }
    }

    pub fn with_bcs(mut self, bcs: BoundaryConditions<GRID_DIMENSION>) -> Self {
        self.bcs = bcs;
        self
    }

    pub fn with_scheme(mut self, scheme: &str) -> Self {
        self.scheme = scheme.to_string();
        self
    }

    pub fn with_policy(mut self, policy: ExecutionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let aabb = self.mesh.aabb();
        for (name, domain) in [
            (SOLVED_FIELD, &self.initial),
            (SPEED_FIELD, &self.wave_speed),
        ] {
            if domain.aabb() != aabb {
                return Err(WaveError::invalid(format!(
                    "field {name} covers {}, mesh covers {aabb}",
                    domain.aabb()
                )));
            }
            if domain.buffer().iter().any(|v| !v.is_finite()) {
                return Err(WaveError::invalid(format!(
                    "field {name} has non-finite values"
                )));
            }
        }
        if self.wave_speed.buffer().iter().any(|c| *c < 0.0) {
            return Err(WaveError::invalid("wave speed must not be negative"));
        }
        Ok(())
    }
}

/// Mutable state of a run, owned by the time loop.
#[derive(Debug, Clone)]
pub struct SimulationContext<const GRID_DIMENSION: usize> {
    pub mesh: CartesianMesh<GRID_DIMENSION>,
    pub fields: FieldStore<GRID_DIMENSION>,
    pub history: TimeHistory<GRID_DIMENSION>,
    pub clock: SimulationClock,
}

impl<const GRID_DIMENSION: usize> SimulationContext<GRID_DIMENSION> {
    /// Register `h` and `C` from the case.
    pub fn new(
        mesh: CartesianMesh<GRID_DIMENSION>,
        solved: OwnedDomain<GRID_DIMENSION>,
        wave_speed: OwnedDomain<GRID_DIMENSION>,
        history: TimeHistory<GRID_DIMENSION>,
        clock: SimulationClock,
    ) -> Self {
        let mut fields = FieldStore::new();
        fields.insert(Field::new(SOLVED_FIELD, DIMLESS, solved));
        fields.insert(Field::new(SPEED_FIELD, DIM_VELOCITY, wave_speed));
        SimulationContext {
            mesh,
            fields,
            history,
            clock,
        }
    }

    pub fn solved(&self) -> Result<&Field<GRID_DIMENSION>> {
        self.fields.get(SOLVED_FIELD)
    }

    pub fn wave_speed(&self) -> Result<&Field<GRID_DIMENSION>> {
        self.fields.get(SPEED_FIELD)
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use crate::util::*;

    #[test]
    fn case_validation() {
        let mesh = CartesianMesh::new([4], vector![1.0]).unwrap();
        let initial = OwnedDomain::new(*mesh.aabb());
        let case = WaveCase::uniform_speed(mesh.clone(), initial, 1.0);
        assert!(case.validate().is_ok());

        let mut negative = case.clone();
        negative.wave_speed = OwnedDomain::uniform(*mesh.aabb(), -1.0);
        assert!(negative.validate().is_err());

        let mut wrong_grid = case.clone();
        wrong_grid.initial = OwnedDomain::new(AABB::new(matrix![0, 5]));
        assert!(wrong_grid.validate().is_err());

        let mut nan = case;
        nan.initial = OwnedDomain::uniform(*mesh.aabb(), f64::NAN);
        assert!(nan.validate().is_err());
    }

    #[test]
    fn context_fields() {
        let mesh = CartesianMesh::new([4], vector![1.0]).unwrap();
        let aabb = *mesh.aabb();
        let history =
            TimeHistory::seed_zero_velocity(OwnedDomain::new(aabb), 0.0, 0.1);
        let clock = SimulationClock::new(0.0, 1.0, 0.1).unwrap();
        let context = SimulationContext::new(
            mesh,
            OwnedDomain::new(aabb),
            OwnedDomain::uniform(aabb, 2.0),
            history,
            clock,
        );
        assert_eq!(context.solved().unwrap().name(), "h");
        assert_eq!(context.wave_speed().unwrap().values(), &[2.0; 4]);
        assert_eq!(context.fields.names().collect::<Vec<_>>(), vec!["C", "h"]);
    }
}
