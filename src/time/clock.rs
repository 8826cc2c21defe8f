use crate::error::{Result, WaveError};

/// How the step size is chosen.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum TimeStepPolicy {
    Fixed,
    /// Keep `max(c) dt / min(dx)` at or below `max_courant`.
    Adaptive {
        max_courant: f64,
        max_delta_t: f64,
    },
}

impl TimeStepPolicy {
    pub fn validate(&self) -> Result<()> {
        if let TimeStepPolicy::Adaptive {
            max_courant,
            max_delta_t,
        } = self
        {
            if !(*max_courant > 0.0 && max_courant.is_finite()) {
                return Err(WaveError::invalid(format!(
                    "max Courant number must be positive, got {max_courant}"
                )));
            }
            if !(*max_delta_t > 0.0) {
                return Err(WaveError::invalid(format!(
                    "max time step must be positive, got {max_delta_t}"
                )));
            }
        }
        Ok(())
    }
}

/// Simulated time, step size and step counter.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SimulationClock {
    start_time: f64,
    end_time: f64,
    time: f64,
    delta_t: f64,
    delta_t0: f64,
    step_index: usize,
}

fn check_step(delta_t: f64) -> Result<()> {
    if !delta_t.is_finite() || delta_t <= 0.0 {
        return Err(WaveError::invalid(format!(
            "time step must be positive and finite, got {delta_t}"
        )));
    }
    Ok(())
}

impl SimulationClock {
    pub fn new(start_time: f64, end_time: f64, delta_t: f64) -> Result<Self> {
        check_step(delta_t)?;
        if !start_time.is_finite() || !end_time.is_finite() {
            return Err(WaveError::invalid(format!(
                "start and end time must be finite, got {start_time} and {end_time}"
            )));
        }
        if end_time < start_time {
            return Err(WaveError::invalid(format!(
                "end time {end_time} is before start time {start_time}"
            )));
        }
        Ok(SimulationClock {
            start_time,
            end_time,
            time: start_time,
            delta_t,
            delta_t0: delta_t,
            step_index: 0,
        })
    }

    /// Clock positioned at a previously reached state.
    pub fn restore(
        start_time: f64,
        end_time: f64,
        time: f64,
        delta_t: f64,
        delta_t0: f64,
        step_index: usize,
    ) -> Result<Self> {
        let mut clock = Self::new(start_time, end_time, delta_t)?;
        check_step(delta_t0)?;
        if !time.is_finite() || time < start_time {
            return Err(WaveError::invalid(format!(
                "restored time {time} is before start time {start_time}"
            )));
        }
        clock.time = time;
        clock.delta_t0 = delta_t0;
        clock.step_index = step_index;
        Ok(clock)
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn end_time(&self) -> f64 {
        self.end_time
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn delta_t(&self) -> f64 {
        self.delta_t
    }

    /// Size of the last completed step.
    pub fn delta_t0(&self) -> f64 {
        self.delta_t0
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    /// Another step is due. Round-off within `END_TOLERANCE` of a step
    /// counts as having reached the end.
    pub fn running(&self) -> bool {
        self.time < self.end_time - END_TOLERANCE * self.delta_t
    }

    /// Shorten the coming step so it lands on the end time instead of
    /// passing it.
    pub fn clip_to_end(&mut self) -> Result<()> {
        let remaining = self.end_time - self.time;
        if remaining > 0.0 && self.delta_t - remaining > END_TOLERANCE * self.delta_t {
            self.set_delta_t(remaining)?;
        }
        Ok(())
    }

    pub fn set_delta_t(&mut self, delta_t: f64) -> Result<()> {
        check_step(delta_t)?;
        self.delta_t = delta_t;
        Ok(())
    }

    /// Move forward by the current step.
    pub fn advance(&mut self) -> f64 {
        self.delta_t0 = self.delta_t;
        self.time += self.delta_t;
        self.step_index += 1;
        self.time
    }

    /// Current time rounded for display and directory names, resolved
    /// finely enough to tell it apart from the previous step.
    pub fn time_name(&self) -> String {
        time_name(self.time, self.delta_t0)
    }
}

/// Relative slack on step boundaries for accumulated round-off.
pub const END_TOLERANCE: f64 = 1e-6;

/// Decimals used to name times reached with steps of `delta_t`.
/// At least 6, one more than the first significant digit of `delta_t`.
pub fn time_precision(delta_t: f64) -> usize {
    if !(delta_t > 0.0 && delta_t.is_finite()) {
        return 6;
    }
    let digits = (-delta_t.log10()).ceil() + 1.0;
    (digits.max(6.0) as usize).min(12)
}

/// `t` rounded to `time_precision(delta_t)` decimals without trailing
/// zeros, e.g. `0.3` for `0.30000000000000004` with a step of 0.1.
pub fn time_name(t: f64, delta_t: f64) -> String {
    let s = format!("{t:.*}", time_precision(delta_t));
    let s = s.trim_end_matches('0').trim_end_matches('.');
    match s {
        "" | "-" | "-0" => "0".to_string(),
        _ => s.to_string(),
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn hundred_steps() {
        let mut clock = SimulationClock::new(0.0, 1.0, 0.01).unwrap();
        let mut steps = 0;
        while clock.running() {
            clock.advance();
            steps += 1;
        }
        assert_eq!(steps, 100);
        assert_eq!(clock.step_index(), 100);
        assert_approx_eq!(f64, clock.time(), 1.0, epsilon = 1e-9);
        assert_eq!(clock.time_name(), "1");
    }

    #[test]
    fn invalid_steps() {
        for dt in [0.0, -0.1, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                SimulationClock::new(0.0, 1.0, dt),
                Err(WaveError::InvalidConfiguration(_))
            ));
        }
        assert!(SimulationClock::new(1.0, 0.0, 0.1).is_err());
        let mut clock = SimulationClock::new(0.0, 1.0, 0.1).unwrap();
        assert!(clock.set_delta_t(0.0).is_err());
        assert_approx_eq!(f64, clock.delta_t(), 0.1);
    }

    #[test]
    fn empty_interval() {
        let clock = SimulationClock::new(0.5, 0.5, 0.1).unwrap();
        assert!(!clock.running());
    }

    #[test]
    fn restore_and_names() {
        let clock = SimulationClock::restore(0.0, 1.0, 0.3, 0.1, 0.05, 4).unwrap();
        assert_eq!(clock.step_index(), 4);
        assert_approx_eq!(f64, clock.delta_t0(), 0.05);
        assert!(SimulationClock::restore(0.0, 1.0, -1.0, 0.1, 0.1, 0).is_err());

        assert_eq!(time_name(0.30000000000000004, 0.1), "0.3");
        assert_eq!(time_name(0.0, 0.1), "0");
        assert_eq!(time_name(12.5, 0.5), "12.5");
        assert_eq!(time_name(1e-7, 0.01), "0");
    }

    #[test]
    fn small_steps_get_distinct_names() {
        assert_eq!(time_precision(0.01), 6);
        assert_eq!(time_precision(2e-7), 8);
        let mut clock = SimulationClock::new(0.0, 1e-6, 2e-7).unwrap();
        let mut names = Vec::new();
        while clock.running() {
            clock.advance();
            names.push(clock.time_name());
        }
        assert_eq!(
            names,
            vec!["0.0000002", "0.0000004", "0.0000006", "0.0000008", "0.000001"]
        );
    }

    #[test]
    fn last_step_lands_on_end_time() {
        let mut clock = SimulationClock::new(0.0, 1.0, 0.3).unwrap();
        let mut steps = 0;
        while clock.running() {
            clock.clip_to_end().unwrap();
            clock.advance();
            steps += 1;
        }
        assert_eq!(steps, 4);
        assert_approx_eq!(f64, clock.delta_t0(), 0.1, epsilon = 1e-12);
        assert_approx_eq!(f64, clock.time(), 1.0, epsilon = 1e-12);
        assert_eq!(clock.time_name(), "1");

        // a whole number of steps is left alone
        let mut clock = SimulationClock::new(0.0, 1.0, 0.01).unwrap();
        while clock.running() {
            clock.clip_to_end().unwrap();
            clock.advance();
        }
        assert_eq!(clock.step_index(), 100);
        assert_eq!(clock.delta_t0(), 0.01);
    }

    #[test]
    fn adaptive_policy_validation() {
        assert!(TimeStepPolicy::Fixed.validate().is_ok());
        assert!(TimeStepPolicy::Adaptive {
            max_courant: 0.0,
            max_delta_t: 1.0
        }
        .validate()
        .is_err());
        assert!(TimeStepPolicy::Adaptive {
            max_courant: 0.5,
            max_delta_t: f64::INFINITY
        }
        .validate()
        .is_ok());
    }
}
