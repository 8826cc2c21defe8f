use crate::domain::*;
use crate::error::{Result, WaveError};
use crate::field::Field;
use crate::fvm::EquationAssembler;
use crate::io::{Checkpoint, CheckpointStore, FieldWriter};
use crate::linear::{LinearSolver, SolverPerformance};
use crate::schemes::interpolation_scheme;
use crate::time::*;
use crate::util::*;
use std::time::{Duration, Instant};

/// Clock and output settings of a run.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RunControls {
    pub start_time: f64,
    pub end_time: f64,
    pub delta_t: f64,
    pub time_step: TimeStepPolicy,
    pub write: WritePolicy,
}

impl Default for RunControls {
    fn default() -> Self {
        RunControls {
            start_time: 0.0,
            end_time: 1.0,
            delta_t: 0.01,
            time_step: TimeStepPolicy::Fixed,
            write: WritePolicy::default(),
        }
    }
}

impl RunControls {
    pub fn validate(&self) -> Result<SimulationClock> {
        self.time_step.validate()?;
        self.write.validate()?;
        SimulationClock::new(self.start_time, self.end_time, self.delta_t)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LoopState {
    Initializing,
    Stepping,
    Checkpointing,
    Finished,
    Failed,
}

/// What one completed step did.
#[derive(Clone, Debug)]
pub struct StepReport {
    pub step_index: usize,
    pub time: f64,
    pub delta_t: f64,
    pub performance: SolverPerformance,
    pub written: bool,
}

#[derive(Clone, Debug)]
pub struct RunSummary {
    pub steps: usize,
    pub final_time: f64,
    pub final_time_name: String,
    pub checkpoints: usize,
    pub elapsed: Duration,
}

/// Drives the wave equation forward one implicit step at a time.
///
/// Each step assembles `d2dt2(h) == laplacian(c^2, h)`, solves it into a
/// copy of `h`, and only on success commits the copy, pushes it onto the
/// history and advances the clock. A failed solve leaves the state
/// `Failed` with the last good level in place and nothing written.
pub struct TimeLoop<const GRID_DIMENSION: usize> {
    context: SimulationContext<GRID_DIMENSION>,
    assembler: EquationAssembler<GRID_DIMENSION>,
    solver: Box<dyn LinearSolver>,
    controls: RunControls,
    scheduler: WriteScheduler,
    store: Box<dyn CheckpointStore<GRID_DIMENSION>>,
    writers: Vec<Box<dyn FieldWriter<GRID_DIMENSION>>>,
    state: LoopState,
    started: Instant,
    steps_taken: usize,
    checkpoints_written: usize,
    max_speed: f64,
}

impl<const GRID_DIMENSION: usize> TimeLoop<GRID_DIMENSION> {
    /// Start from `case.initial` at rest.
    pub fn new(
        case: WaveCase<GRID_DIMENSION>,
        controls: RunControls,
        solver: Box<dyn LinearSolver>,
        store: Box<dyn CheckpointStore<GRID_DIMENSION>>,
    ) -> Result<Self> {
        let mut clock = controls.validate()?;
        case.validate()?;
        let max_speed = case.wave_speed.max_abs();
        if let TimeStepPolicy::Adaptive {
            max_courant,
            max_delta_t,
        } = controls.time_step
        {
            let mut delta_t = clock.delta_t().min(max_delta_t);
            if max_speed > 0.0 {
                delta_t = delta_t.min(max_courant * case.mesh.min_spacing() / max_speed);
            }
            clock.set_delta_t(delta_t)?;
        }
        let history = TimeHistory::seed_zero_velocity(
            case.initial.clone(),
            clock.time(),
            clock.delta_t(),
        );
        let initial = case.initial.clone();
        Self::build(case, initial, history, clock, controls, solver, store)
    }

    /// Continue from a checkpoint. With the same case and controls the
    /// continued run reproduces the uninterrupted one exactly.
    pub fn resume(
        case: WaveCase<GRID_DIMENSION>,
        checkpoint: Checkpoint<GRID_DIMENSION>,
        controls: RunControls,
        solver: Box<dyn LinearSolver>,
        store: Box<dyn CheckpointStore<GRID_DIMENSION>>,
    ) -> Result<Self> {
        controls.validate()?;
        case.validate()?;
        if checkpoint.field != SOLVED_FIELD {
            return Err(WaveError::Checkpoint(format!(
                "checkpoint holds field {}, expected {SOLVED_FIELD}",
                checkpoint.field
            )));
        }
        if checkpoint.aabb() != case.mesh.aabb() {
            return Err(WaveError::Checkpoint(format!(
                "checkpoint covers {}, mesh covers {}",
                checkpoint.aabb(),
                case.mesh.aabb()
            )));
        }
        let delta_t = match controls.time_step {
            TimeStepPolicy::Fixed => controls.delta_t,
            TimeStepPolicy::Adaptive { .. } => checkpoint.delta_t,
        };
        let clock = SimulationClock::restore(
            controls.start_time,
            controls.end_time,
            checkpoint.time(),
            delta_t,
            checkpoint.delta_t0,
            checkpoint.step_index,
        )?;
        let history = checkpoint.history()?;
        tracing::info!(
            "Resuming from Time = {} (step {})",
            checkpoint.time_name(),
            checkpoint.step_index
        );
        let current = checkpoint.current.values;
        Self::build(case, current, history, clock, controls, solver, store)
    }

    fn build(
        case: WaveCase<GRID_DIMENSION>,
        solved: OwnedDomain<GRID_DIMENSION>,
        history: TimeHistory<GRID_DIMENSION>,
        clock: SimulationClock,
        controls: RunControls,
        solver: Box<dyn LinearSolver>,
        store: Box<dyn CheckpointStore<GRID_DIMENSION>>,
    ) -> Result<Self> {
        let scheme = interpolation_scheme(&case.scheme)?;
        let max_speed = case.wave_speed.max_abs();
        let assembler = EquationAssembler::new(case.bcs, scheme, case.policy);
        let scheduler = WriteScheduler::new(controls.write, &clock);
        let context = SimulationContext::new(
            case.mesh,
            solved,
            case.wave_speed,
            history,
            clock,
        );
        let mut time_loop = TimeLoop {
            context,
            assembler,
            solver,
            controls,
            scheduler,
            store,
            writers: Vec::new(),
            state: LoopState::Initializing,
            started: Instant::now(),
            steps_taken: 0,
            checkpoints_written: 0,
            max_speed,
        };
        time_loop.state = if time_loop.context.clock.running() {
            LoopState::Stepping
        } else {
            LoopState::Finished
        };
        tracing::debug!(
            "{} cells, delta t = {}, end time = {}, solver {}",
            time_loop.context.mesh.n_cells(),
            time_loop.context.clock.delta_t(),
            time_loop.context.clock.end_time(),
            time_loop.solver.name()
        );
        Ok(time_loop)
    }

    pub fn with_writer(
        mut self,
        writer: Box<dyn FieldWriter<GRID_DIMENSION>>,
    ) -> Self {
        self.writers.push(writer);
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn context(&self) -> &SimulationContext<GRID_DIMENSION> {
        &self.context
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.context.clock
    }

    pub fn field(&self, name: &str) -> Result<&Field<GRID_DIMENSION>> {
        self.context.fields.get(name)
    }

    pub fn history(&self) -> &TimeHistory<GRID_DIMENSION> {
        &self.context.history
    }

    pub fn steps_taken(&self) -> usize {
        self.steps_taken
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Step size for the coming step, clipped to land on the end time.
    fn next_delta_t(&mut self) -> Result<f64> {
        let clock = &mut self.context.clock;
        if let TimeStepPolicy::Adaptive {
            max_courant,
            max_delta_t,
        } = self.controls.time_step
        {
            let delta_t = clock.delta_t();
            let courant =
                self.max_speed * delta_t / self.context.mesh.min_spacing();
            let factor = max_courant / (courant + SMALL);
            let new_delta_t = (factor.min(1.0 + 0.1 * factor).min(1.2) * delta_t)
                .min(max_delta_t);
            clock.set_delta_t(new_delta_t)?;
            tracing::debug!("Courant Number max: {}", courant);
        }
        clock.clip_to_end()?;
        Ok(clock.delta_t())
    }

    /// Advance one step.
    pub fn step(&mut self) -> Result<StepReport> {
        match self.state {
            LoopState::Finished => {
                return Err(WaveError::invalid("time loop has already finished"))
            }
            LoopState::Failed => {
                return Err(WaveError::invalid("time loop stopped after a failure"))
            }
            _ => {}
        }
        self.state = LoopState::Stepping;
        self.advance().inspect_err(|e| self.fail(e))
    }

    fn advance(&mut self) -> Result<StepReport> {
        profiling::scope!("step");
        let delta_t = self.next_delta_t()?;
        tracing::info!(
            "Time = {}",
            time_name(self.context.clock.time() + delta_t, delta_t)
        );

        let matrix = self.assembler.assemble(
            &self.context.mesh,
            self.context.fields.get(SOLVED_FIELD)?,
            self.context.fields.get(SPEED_FIELD)?,
            &self.context.history,
            delta_t,
        )?;
        let mut solution = self.context.fields.snapshot(SOLVED_FIELD)?;
        let performance =
            self.solver.solve(&matrix, &mut solution, SOLVED_FIELD)?;

        self.context.fields.set(SOLVED_FIELD, &solution)?;
        let level = OwnedDomain::from_values(*self.context.mesh.aabb(), solution)
            .ok_or_else(|| WaveError::invalid("solution does not fit the mesh"))?;
        let time = self.context.clock.advance();
        self.context.history.push(time, level);
        self.steps_taken += 1;

        self.state = LoopState::Checkpointing;
        let written = if self.scheduler.should_write(&self.context.clock) {
            self.write_outputs()?;
            true
        } else {
            false
        };

        tracing::info!(
            "ExecutionTime = {:.3} s",
            self.started.elapsed().as_secs_f64()
        );
        self.state = if self.context.clock.running() {
            LoopState::Stepping
        } else {
            LoopState::Finished
        };

        Ok(StepReport {
            step_index: self.context.clock.step_index(),
            time,
            delta_t,
            performance,
            written,
        })
    }

    fn write_outputs(&mut self) -> Result<()> {
        profiling::scope!("write");
        let checkpoint = Checkpoint::capture(
            SOLVED_FIELD,
            &self.context.clock,
            &self.context.history,
        )?;
        tracing::info!("Writing Time = {}", checkpoint.time_name());
        self.store.save(&checkpoint)?;
        self.checkpoints_written += 1;
        for name in self.store.purge(self.controls.write.purge_write)? {
            tracing::debug!("Purged Time = {name}");
        }

        let field = self.context.fields.get(SOLVED_FIELD)?;
        for writer in self.writers.iter_mut() {
            writer.write(&self.context.mesh, field, &self.context.clock)?;
        }
        Ok(())
    }

    fn fail(&mut self, error: &WaveError) {
        self.state = LoopState::Failed;
        tracing::error!("{error}");
        tracing::info!(
            "ExecutionTime = {:.3} s",
            self.started.elapsed().as_secs_f64()
        );
    }

    fn finish_writers(&mut self) -> Result<()> {
        for writer in self.writers.iter_mut() {
            writer.finish()?;
        }
        Ok(())
    }

    /// Step until the end time, or until the first failure.
    pub fn run(&mut self) -> Result<RunSummary> {
        loop {
            match self.state {
                LoopState::Finished => break,
                LoopState::Failed => {
                    return Err(WaveError::invalid(
                        "time loop stopped after a failure",
                    ))
                }
                _ => {}
            }
            if let Err(e) = self.step() {
                if let Err(finish_error) = self.finish_writers() {
                    tracing::warn!("{finish_error}");
                }
                return Err(e);
            }
        }
        self.finish_writers()?;
        tracing::info!("End");
        Ok(RunSummary {
            steps: self.steps_taken,
            final_time: self.context.clock.time(),
            final_time_name: self.context.clock.time_name(),
            checkpoints: self.checkpoints_written,
            elapsed: self.started.elapsed(),
        })
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use crate::io::MemoryStore;
    use crate::linear::*;
    use crate::mesh::CartesianMesh;
    use crate::par_slice::ExecutionPolicy;
    use float_cmp::assert_approx_eq;

    fn impulse_case(n: usize) -> WaveCase<1> {
        let mesh = CartesianMesh::new([n], vector![1.0]).unwrap();
        let mut initial = OwnedDomain::new(*mesh.aabb());
        crate::initial_conditions::impulse_ic(&mut initial, 4);
        WaveCase::uniform_speed(mesh, initial, 1.0)
            .with_policy(ExecutionPolicy::Parallel { chunk_size: 8 })
    }

    fn pcg(controls: SolverControls) -> Box<dyn LinearSolver> {
        Box::new(Pcg::new(controls, ExecutionPolicy::Parallel { chunk_size: 8 }).unwrap())
    }

    #[test]
    fn hundred_steps() {
        let mut time_loop = TimeLoop::new(
            impulse_case(41),
            RunControls::default(),
            pcg(SolverControls::default()),
            Box::new(MemoryStore::new()),
        )
        .unwrap();
        assert_eq!(time_loop.state(), LoopState::Stepping);
        let summary = time_loop.run().unwrap();
        assert_eq!(summary.steps, 100);
        assert_approx_eq!(f64, summary.final_time, 1.0, epsilon = 1e-9);
        assert_eq!(time_loop.state(), LoopState::Finished);
        // written every 10 steps
        assert_eq!(summary.checkpoints, 10);
        assert!(time_loop.step().is_err());
    }

    #[test]
    fn zero_gradient_conserves_mean() {
        let mut time_loop = TimeLoop::new(
            impulse_case(21),
            RunControls {
                end_time: 0.2,
                ..Default::default()
            },
            pcg(SolverControls {
                tolerance: 1e-12,
                ..Default::default()
            }),
            Box::new(MemoryStore::new()),
        )
        .unwrap();
        time_loop.run().unwrap();
        let sum: f64 = time_loop.field("h").unwrap().values().iter().sum();
        assert_approx_eq!(f64, sum, 1.0, epsilon = 1e-8);
    }

    #[test]
    fn invalid_step_fails_fast() {
        for delta_t in [0.0, -0.01, f64::NAN] {
            let result = TimeLoop::new(
                impulse_case(5),
                RunControls {
                    delta_t,
                    ..Default::default()
                },
                pcg(SolverControls::default()),
                Box::new(MemoryStore::new()),
            );
            assert!(matches!(result, Err(WaveError::InvalidConfiguration(_))));
        }
    }

    #[test]
    fn unknown_scheme() {
        let result = TimeLoop::new(
            impulse_case(5).with_scheme("upwind"),
            RunControls::default(),
            pcg(SolverControls::default()),
            Box::new(MemoryStore::new()),
        );
        assert!(matches!(result, Err(WaveError::UnknownScheme { .. })));
    }

    #[test]
    fn convergence_failure_stops_the_loop() {
        let mut time_loop = TimeLoop::new(
            impulse_case(21),
            RunControls::default(),
            pcg(SolverControls {
                tolerance: 1e-14,
                max_iterations: 1,
                ..Default::default()
            }),
            Box::new(MemoryStore::new()),
        )
        .unwrap();
        let before = time_loop.field("h").unwrap().clone();
        assert!(matches!(
            time_loop.step(),
            Err(WaveError::Convergence { iterations: 1, .. })
        ));
        assert_eq!(time_loop.state(), LoopState::Failed);
        assert_eq!(time_loop.clock().step_index(), 0);
        assert_eq!(time_loop.field("h").unwrap(), &before);
        assert!(time_loop.run().is_err());
    }

    #[test]
    fn adaptive_step_respects_courant() {
        let mut time_loop = TimeLoop::new(
            impulse_case(20),
            RunControls {
                delta_t: 1.0,
                end_time: 0.5,
                time_step: TimeStepPolicy::Adaptive {
                    max_courant: 0.5,
                    max_delta_t: 1.0,
                },
                ..Default::default()
            },
            pcg(SolverControls::default()),
            Box::new(MemoryStore::new()),
        )
        .unwrap();
        // dx = 0.05, c = 1
        assert_approx_eq!(f64, time_loop.clock().delta_t(), 0.025);
        while time_loop.state() != LoopState::Finished {
            let report = time_loop.step().unwrap();
            assert!(report.delta_t <= 0.025 + 1e-12);
        }
        assert_approx_eq!(f64, time_loop.clock().time(), 0.5, epsilon = 1e-9);
    }

    #[test]
    fn last_fixed_step_lands_on_end_time() {
        let mut time_loop = TimeLoop::new(
            impulse_case(11),
            RunControls {
                delta_t: 0.3,
                end_time: 1.0,
                ..Default::default()
            },
            pcg(SolverControls::default()),
            Box::new(MemoryStore::new()),
        )
        .unwrap();
        let mut steps = Vec::new();
        while time_loop.state() != LoopState::Finished {
            steps.push(time_loop.step().unwrap().delta_t);
        }
        assert_eq!(steps.len(), 4);
        assert_approx_eq!(f64, steps[3], 0.1, epsilon = 1e-12);
        assert_approx_eq!(f64, time_loop.clock().time(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn empty_interval_is_finished() {
        let mut time_loop = TimeLoop::new(
            impulse_case(5),
            RunControls {
                end_time: 0.0,
                ..Default::default()
            },
            pcg(SolverControls::default()),
            Box::new(MemoryStore::new()),
        )
        .unwrap();
        assert_eq!(time_loop.state(), LoopState::Finished);
        assert_eq!(time_loop.run().unwrap().steps, 0);
    }
}
