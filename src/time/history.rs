use crate::domain::*;
use crate::error::{Result, WaveError};
use std::collections::VecDeque;

/// Levels retained, the width of the second derivative stencil.
/// The temporal operator reads the two newest.
pub const HISTORY_CAPACITY: usize = 3;

/// One solved time level.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeLevel<const GRID_DIMENSION: usize> {
    pub time: f64,
    pub values: OwnedDomain<GRID_DIMENSION>,
}

/// Ring of the most recent solved levels of one field, newest first.
///
/// Levels are immutable once pushed. Pushing beyond `HISTORY_CAPACITY`
/// evicts the oldest level.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeHistory<const GRID_DIMENSION: usize> {
    levels: VecDeque<TimeLevel<GRID_DIMENSION>>,
}

impl<const GRID_DIMENSION: usize> Default for TimeHistory<GRID_DIMENSION> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const GRID_DIMENSION: usize> TimeHistory<GRID_DIMENSION> {
    pub fn new() -> Self {
        TimeHistory {
            levels: VecDeque::with_capacity(HISTORY_CAPACITY + 1),
        }
    }

    /// Start from rest: the initial values are stored as both the current
    /// level at `time` and the old level at `time - delta_t`, which makes
    /// the backward difference of the first step zero.
    pub fn seed_zero_velocity(
        initial: OwnedDomain<GRID_DIMENSION>,
        time: f64,
        delta_t: f64,
    ) -> Self {
        let mut history = Self::new();
        history.push(time - delta_t, initial.clone());
        history.push(time, initial);
        history
    }

    /// Rebuild from two stored levels, e.g. from a checkpoint.
    pub fn from_levels(
        current: TimeLevel<GRID_DIMENSION>,
        old: TimeLevel<GRID_DIMENSION>,
    ) -> Result<Self> {
        if current.values.aabb() != old.values.aabb() {
            return Err(WaveError::invalid(format!(
                "time levels cover different grids: {} vs {}",
                current.values.aabb(),
                old.values.aabb()
            )));
        }
        if current.time <= old.time {
            return Err(WaveError::invalid(format!(
                "current level time {} is not after old level time {}",
                current.time, old.time
            )));
        }
        let mut history = Self::new();
        history.levels.push_back(current);
        history.levels.push_back(old);
        Ok(history)
    }

    pub fn push(&mut self, time: f64, values: OwnedDomain<GRID_DIMENSION>) {
        self.levels.push_front(TimeLevel { time, values });
        self.levels.truncate(HISTORY_CAPACITY);
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Fail unless at least `required` levels are stored.
    pub fn require(&self, required: usize) -> Result<()> {
        if self.levels.len() < required {
            return Err(WaveError::InsufficientHistory {
                required,
                available: self.levels.len(),
            });
        }
        Ok(())
    }

    /// Level `age` steps back, 0 is the current level.
    pub fn level(&self, age: usize) -> Result<&TimeLevel<GRID_DIMENSION>> {
        self.levels.get(age).ok_or(WaveError::InsufficientHistory {
            required: age + 1,
            available: self.levels.len(),
        })
    }

    pub fn current(&self) -> Result<&TimeLevel<GRID_DIMENSION>> {
        self.level(0)
    }

    pub fn old(&self) -> Result<&TimeLevel<GRID_DIMENSION>> {
        self.level(1)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimeLevel<GRID_DIMENSION>> {
        self.levels.iter()
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use crate::util::*;
    use float_cmp::assert_approx_eq;

    fn level(v: f64) -> OwnedDomain<1> {
        OwnedDomain::uniform(AABB::new(matrix![0, 2]), v)
    }

    #[test]
    fn seeding() {
        let h = TimeHistory::seed_zero_velocity(level(1.0), 0.0, 0.1);
        assert_eq!(h.len(), 2);
        assert_approx_eq!(f64, h.current().unwrap().time, 0.0);
        assert_approx_eq!(f64, h.old().unwrap().time, -0.1);
        assert_eq!(h.current().unwrap().values, h.old().unwrap().values);
    }

    #[test]
    fn push_evicts_oldest() {
        let mut h = TimeHistory::seed_zero_velocity(level(0.0), 0.0, 0.1);
        h.push(0.1, level(1.0));
        h.push(0.2, level(2.0));
        assert_eq!(h.len(), HISTORY_CAPACITY);
        assert_eq!(h.current().unwrap().values, level(2.0));
        assert_eq!(h.old().unwrap().values, level(1.0));
        let times: Vec<f64> = h.iter().map(|l| l.time).collect();
        assert_eq!(times, vec![0.2, 0.1, 0.0]);
    }

    #[test]
    fn missing_levels() {
        let mut h = TimeHistory::new();
        assert!(h.is_empty());
        assert!(matches!(
            h.require(2),
            Err(WaveError::InsufficientHistory {
                required: 2,
                available: 0
            })
        ));
        h.push(0.0, level(0.0));
        assert!(h.current().is_ok());
        assert!(matches!(
            h.old(),
            Err(WaveError::InsufficientHistory {
                required: 2,
                available: 1
            })
        ));
    }

    #[test]
    fn from_levels_checks_order() {
        let current = TimeLevel {
            time: 0.0,
            values: level(0.0),
        };
        let old = TimeLevel {
            time: 0.1,
            values: level(0.0),
        };
        assert!(TimeHistory::from_levels(current.clone(), old.clone()).is_err());
        let h = TimeHistory::from_levels(old, current).unwrap();
        assert_approx_eq!(f64, h.current().unwrap().time, 0.1);
    }
}
