use crate::error::{Result, WaveError};
use crate::time::SimulationClock;
use clap::ValueEnum;
use std::time::{Duration, Instant};

/// When solved levels are persisted.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum WriteControl {
    /// Every `n` steps.
    TimeStep(usize),
    /// Each time simulated time passes a multiple of the interval.
    RunTime(f64),
    /// Each time the wall clock passes a multiple of the interval.
    ClockTime(Duration),
    /// Only the final level.
    EndOnly,
}

#[derive(Copy, Clone, Debug, ValueEnum, Default, PartialEq, Eq)]
pub enum ClapWriteControl {
    #[default]
    TimeStep,
    RunTime,
    ClockTime,
    EndOnly,
}

impl ClapWriteControl {
    pub fn to_write_control(&self, interval: f64) -> Result<WriteControl> {
        let positive = |what: &str| -> Result<()> {
            if !(interval > 0.0 && interval.is_finite()) {
                return Err(WaveError::invalid(format!(
                    "{what} write interval must be positive, got {interval}"
                )));
            }
            Ok(())
        };
        match self {
            ClapWriteControl::TimeStep => {
                positive("time step")?;
                if interval.fract() != 0.0 {
                    return Err(WaveError::invalid(format!(
                        "time step write interval must be a whole number, got {interval}"
                    )));
                }
                Ok(WriteControl::TimeStep(interval as usize))
            }
            ClapWriteControl::RunTime => {
                positive("run time")?;
                Ok(WriteControl::RunTime(interval))
            }
            ClapWriteControl::ClockTime => {
                positive("clock time")?;
                Ok(WriteControl::ClockTime(Duration::from_secs_f64(interval)))
            }
            ClapWriteControl::EndOnly => Ok(WriteControl::EndOnly),
        }
    }
}

/// Write control plus retention.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct WritePolicy {
    pub control: WriteControl,
    /// Keep only this many newest checkpoints, 0 keeps all.
    pub purge_write: usize,
    /// Always persist the last level of a finished run.
    pub write_at_end: bool,
}

impl Default for WritePolicy {
    fn default() -> Self {
        WritePolicy {
            control: WriteControl::TimeStep(10),
            purge_write: 0,
            write_at_end: true,
        }
    }
}

impl WritePolicy {
    pub fn validate(&self) -> Result<()> {
        match self.control {
            WriteControl::TimeStep(0) => {
                Err(WaveError::invalid("time step write interval must be at least 1"))
            }
            WriteControl::RunTime(dt) if !(dt > 0.0 && dt.is_finite()) => Err(
                WaveError::invalid(format!("run time write interval must be positive, got {dt}")),
            ),
            WriteControl::ClockTime(d) if d.is_zero() => {
                Err(WaveError::invalid("clock time write interval must be positive"))
            }
            _ => Ok(()),
        }
    }
}

/// Decides after each step whether this level is written.
#[derive(Debug)]
pub struct WriteScheduler {
    policy: WritePolicy,
    last_index: u64,
    started: Instant,
}

impl WriteScheduler {
    /// Scheduler for a run whose clock currently reads `clock`.
    pub fn new(policy: WritePolicy, clock: &SimulationClock) -> Self {
        let mut scheduler = WriteScheduler {
            policy,
            last_index: 0,
            started: Instant::now(),
        };
        scheduler.last_index = scheduler.index(clock);
        scheduler
    }

    pub fn policy(&self) -> &WritePolicy {
        &self.policy
    }

    fn index(&self, clock: &SimulationClock) -> u64 {
        match self.policy.control {
            WriteControl::TimeStep(n) => (clock.step_index() / n.max(1)) as u64,
            WriteControl::RunTime(interval) => {
                let elapsed = clock.time() - clock.start_time();
                ((elapsed + 0.5 * clock.delta_t()) / interval).floor().max(0.0) as u64
            }
            WriteControl::ClockTime(interval) => {
                (self.started.elapsed().as_secs_f64() / interval.as_secs_f64()) as u64
            }
            WriteControl::EndOnly => 0,
        }
    }

    /// Call once after each completed step.
    pub fn should_write(&mut self, clock: &SimulationClock) -> bool {
        let index = self.index(clock);
        let due = index > self.last_index;
        self.last_index = index;
        due || (self.policy.write_at_end && !clock.running())
    }
}
