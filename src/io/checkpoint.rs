//! Restartable snapshots of a run.
//!
//! A checkpoint holds what the second order time scheme needs to continue:
//! the clock position, the last two step sizes and the two newest levels
//! of the solved field.
//!
//! Encoded as one line of JSON describing the snapshot, then the current
//! and old values as little-endian `f64`.

use crate::domain::*;
use crate::error::{Result, WaveError};
use crate::time::{time_name, SimulationClock, TimeHistory, TimeLevel};
use crate::util::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const FORMAT: &str = "fvwave-checkpoint";
const FORMAT_VERSION: u32 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CheckpointHeader {
    format: String,
    version: u32,
    dimension: usize,
    /// Inclusive min and max per dimension.
    bounds: Vec<[i32; 2]>,
    field: String,
    step_index: usize,
    time: f64,
    old_time: f64,
    delta_t: f64,
    delta_t0: f64,
    cells: usize,
}

impl CheckpointHeader {
    /// Grid the payload covers, checked against a `GRID_DIMENSION` run.
    fn aabb<const GRID_DIMENSION: usize>(&self) -> Result<AABB<GRID_DIMENSION>> {
        if self.format != FORMAT {
            return Err(WaveError::Checkpoint("not a checkpoint file".to_string()));
        }
        if self.version != FORMAT_VERSION {
            return Err(WaveError::Checkpoint(format!(
                "unsupported format version {}",
                self.version
            )));
        }
        if self.dimension != GRID_DIMENSION || self.bounds.len() != GRID_DIMENSION {
            return Err(WaveError::Checkpoint(format!(
                "checkpoint is {}D, run is {GRID_DIMENSION}D",
                self.dimension
            )));
        }
        let aabb = AABB::new(Bounds::<GRID_DIMENSION>::from_fn(|d, side| {
            self.bounds[d][side]
        }));
        if !aabb.check_validity() {
            return Err(WaveError::Checkpoint(format!("invalid bounds {aabb}")));
        }
        match aabb.checked_buffer_size() {
            Some(n) if n == self.cells => Ok(aabb),
            _ => Err(WaveError::Checkpoint(format!(
                "{} cells do not fit bounds {aabb}",
                self.cells
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint<const GRID_DIMENSION: usize> {
    pub field: String,
    pub step_index: usize,
    pub delta_t: f64,
    pub delta_t0: f64,
    pub current: TimeLevel<GRID_DIMENSION>,
    pub old: TimeLevel<GRID_DIMENSION>,
}

impl<const GRID_DIMENSION: usize> Checkpoint<GRID_DIMENSION> {
    /// Copy the state needed to resume out of a running simulation.
    pub fn capture(
        field: &str,
        clock: &SimulationClock,
        history: &TimeHistory<GRID_DIMENSION>,
    ) -> Result<Self> {
        Ok(Checkpoint {
            field: field.to_string(),
            step_index: clock.step_index(),
            delta_t: clock.delta_t(),
            delta_t0: clock.delta_t0(),
            current: history.current()?.clone(),
            old: history.old()?.clone(),
        })
    }

    pub fn time(&self) -> f64 {
        self.current.time
    }

    pub fn time_name(&self) -> String {
        time_name(self.current.time, self.delta_t0)
    }

    pub fn aabb(&self) -> &AABB<GRID_DIMENSION> {
        self.current.values.aabb()
    }

    pub fn history(&self) -> Result<TimeHistory<GRID_DIMENSION>> {
        TimeHistory::from_levels(self.current.clone(), self.old.clone())
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let aabb = self.aabb();
        let header = CheckpointHeader {
            format: FORMAT.to_string(),
            version: FORMAT_VERSION,
            dimension: GRID_DIMENSION,
            bounds: (0..GRID_DIMENSION)
                .map(|d| [aabb.bounds[(d, 0)], aabb.bounds[(d, 1)]])
                .collect(),
            field: self.field.clone(),
            step_index: self.step_index,
            time: self.current.time,
            old_time: self.old.time,
            delta_t: self.delta_t,
            delta_t0: self.delta_t0,
            cells: self.current.values.buffer().len(),
        };
        let mut bytes = serde_json::to_vec(&header)
            .map_err(|e| WaveError::Checkpoint(format!("header: {e}")))?;
        bytes.push(b'\n');
        push_values(&mut bytes, self.current.values.buffer());
        push_values(&mut bytes, self.old.values.buffer());
        Ok(bytes)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let split = bytes
            .iter()
            .position(|b| *b == b'\n')
            .ok_or_else(|| WaveError::Checkpoint("not a checkpoint file".to_string()))?;
        let header: CheckpointHeader = serde_json::from_slice(&bytes[..split])
            .map_err(|e| WaveError::Checkpoint(format!("header: {e}")))?;
        let aabb = header.aabb::<GRID_DIMENSION>()?;

        let payload = &bytes[split + 1..];
        let expected = header
            .cells
            .checked_mul(2 * std::mem::size_of::<f64>());
        if expected != Some(payload.len()) {
            return Err(WaveError::Checkpoint(format!(
                "{} payload bytes for {} cells",
                payload.len(),
                header.cells
            )));
        }
        let (current, old) = payload.split_at(payload.len() / 2);

        let level = |time: f64, raw: &[u8]| -> Result<TimeLevel<GRID_DIMENSION>> {
            let values = OwnedDomain::from_values(aabb, read_values(raw))
                .ok_or_else(|| {
                    WaveError::Checkpoint(format!("values do not fit bounds {aabb}"))
                })?;
            Ok(TimeLevel { time, values })
        };
        Ok(Checkpoint {
            field: header.field.clone(),
            step_index: header.step_index,
            delta_t: header.delta_t,
            delta_t0: header.delta_t0,
            current: level(header.time, current)?,
            old: level(header.old_time, old)?,
        })
    }
}

fn push_values(bytes: &mut Vec<u8>, values: &[f64]) {
    if cfg!(target_endian = "little") {
        bytes.extend_from_slice(bytemuck::cast_slice(values));
    } else {
        for v in values {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
    }
}

fn read_values(raw: &[u8]) -> Vec<f64> {
    let mut values = vec![0.0f64; raw.len() / std::mem::size_of::<f64>()];
    bytemuck::cast_slice_mut::<f64, u8>(&mut values).copy_from_slice(raw);
    for v in values.iter_mut() {
        *v = f64::from_bits(u64::from_le(v.to_bits()));
    }
    values
}

/// Where checkpoints are kept. Times are identified by their `time_name`.
pub trait CheckpointStore<const GRID_DIMENSION: usize>: Send {
    fn save(&mut self, checkpoint: &Checkpoint<GRID_DIMENSION>) -> Result<()>;

    /// Stored time names, oldest first.
    fn times(&self) -> Result<Vec<String>>;

    fn load(&self, time_name: &str) -> Result<Checkpoint<GRID_DIMENSION>>;

    fn remove(&mut self, time_name: &str) -> Result<()>;

    fn latest(&self) -> Result<Option<Checkpoint<GRID_DIMENSION>>> {
        match self.times()?.last() {
            Some(name) => Ok(Some(self.load(name)?)),
            None => Ok(None),
        }
    }

    /// Delete all but the newest `keep` checkpoints, 0 keeps everything.
    /// Returns the removed time names.
    fn purge(&mut self, keep: usize) -> Result<Vec<String>> {
        if keep == 0 {
            return Ok(Vec::new());
        }
        let times = self.times()?;
        let excess = times.len().saturating_sub(keep);
        let removed: Vec<String> = times.into_iter().take(excess).collect();
        for name in &removed {
            self.remove(name)?;
        }
        Ok(removed)
    }
}

/// Keeps checkpoints in memory, newest last.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore<const GRID_DIMENSION: usize> {
    checkpoints: Vec<(String, Checkpoint<GRID_DIMENSION>)>,
    retention: usize,
}

impl<const GRID_DIMENSION: usize> MemoryStore<GRID_DIMENSION> {
    /// Keeps every checkpoint until purged.
    pub fn new() -> Self {
        Self::with_retention(0)
    }

    /// Keeps at most the newest `retention` checkpoints, 0 keeps all.
    pub fn with_retention(retention: usize) -> Self {
        MemoryStore {
            checkpoints: Vec::new(),
            retention,
        }
    }

    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }
}

impl<const GRID_DIMENSION: usize> CheckpointStore<GRID_DIMENSION>
    for MemoryStore<GRID_DIMENSION>
{
    fn save(&mut self, checkpoint: &Checkpoint<GRID_DIMENSION>) -> Result<()> {
        let name = checkpoint.time_name();
        self.checkpoints.retain(|(n, _)| *n != name);
        self.checkpoints.push((name, checkpoint.clone()));
        self.checkpoints
            .sort_by(|a, b| a.1.time().total_cmp(&b.1.time()));
        if self.retention > 0 {
            let excess = self.checkpoints.len().saturating_sub(self.retention);
            self.checkpoints.drain(..excess);
        }
        Ok(())
    }

    fn times(&self) -> Result<Vec<String>> {
        Ok(self.checkpoints.iter().map(|(n, _)| n.clone()).collect())
    }

    fn load(&self, time_name: &str) -> Result<Checkpoint<GRID_DIMENSION>> {
        self.checkpoints
            .iter()
            .find(|(n, _)| n == time_name)
            .map(|(_, c)| c.clone())
            .ok_or_else(|| {
                WaveError::Checkpoint(format!("no checkpoint at time {time_name}"))
            })
    }

    fn remove(&mut self, time_name: &str) -> Result<()> {
        self.checkpoints.retain(|(n, _)| n != time_name);
        Ok(())
    }
}

/// One directory per written time below `root`, holding `<field>.bin`.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
    field: String,
}

impl DirectoryStore {
    pub fn new<P: AsRef<Path>>(root: P, field: &str) -> Result<Self> {
        std::fs::create_dir_all(root.as_ref())?;
        Ok(DirectoryStore {
            root: root.as_ref().to_path_buf(),
            field: field.to_string(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_name(&self) -> String {
        format!("{}.bin", self.field)
    }

    pub fn checkpoint_path(&self, time_name: &str) -> PathBuf {
        let mut path = self.root.clone();
        path.push(time_name);
        path.push(self.file_name());
        path
    }
}

impl<const GRID_DIMENSION: usize> CheckpointStore<GRID_DIMENSION> for DirectoryStore {
    fn save(&mut self, checkpoint: &Checkpoint<GRID_DIMENSION>) -> Result<()> {
        profiling::scope!("checkpoint save");
        let name = checkpoint.time_name();
        let mut dir = self.root.clone();
        dir.push(&name);
        std::fs::create_dir_all(&dir)?;

        // temporary name, then rename into place
        let final_path = self.checkpoint_path(&name);
        let mut temp_path = dir;
        temp_path.push(format!(".{}.tmp", self.file_name()));
        std::fs::write(&temp_path, checkpoint.encode()?)?;
        std::fs::rename(&temp_path, &final_path)?;
        tracing::debug!("Wrote checkpoint {:?}", final_path);
        Ok(())
    }

    fn times(&self) -> Result<Vec<String>> {
        let mut times = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let Ok(time) = name.parse::<f64>() else {
                continue;
            };
            if self.checkpoint_path(&name).is_file() {
                times.push((time, name));
            }
        }
        times.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(times.into_iter().map(|(_, name)| name).collect())
    }

    fn load(&self, time_name: &str) -> Result<Checkpoint<GRID_DIMENSION>> {
        let path = self.checkpoint_path(time_name);
        let bytes = std::fs::read(&path).map_err(|e| {
            WaveError::Checkpoint(format!("reading {}: {e}", path.display()))
        })?;
        let checkpoint = Checkpoint::decode(&bytes)?;
        if checkpoint.field != self.field {
            return Err(WaveError::Checkpoint(format!(
                "{} holds field {}, expected {}",
                path.display(),
                checkpoint.field,
                self.field
            )));
        }
        Ok(checkpoint)
    }

    fn remove(&mut self, time_name: &str) -> Result<()> {
        let path = self.checkpoint_path(time_name);
        std::fs::remove_file(&path)?;
        let mut dir = self.root.clone();
        dir.push(time_name);
        if std::fs::read_dir(&dir)?.next().is_none() {
            std::fs::remove_dir(&dir)?;
        }
        tracing::debug!("Removed checkpoint {:?}", path);
        Ok(())
    }
}
