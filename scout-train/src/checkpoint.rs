//! Checkpoint persistence keyed by epoch number.
//!
//! One JSON file per saved epoch under `<logs_dir>/checkpoint`. The latest
//! checkpoint is chosen by numeric parse of the trailing integer in the
//! filename, never by file timestamps.

use crate::error::{PipelineError, Result};
use crate::model::{LrScheduler, Model, Optimizer, ParamMap, SchedulerState};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::info;

/// On-disk checkpoint contents.
#[derive(Debug, Serialize, Deserialize)]
pub struct CheckpointData {
    pub epoch: u32,
    pub model_state: ParamMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimizer_state: Option<ParamMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduler_state: Option<SchedulerState>,
}

/// Finds, loads and saves checkpoints for one training run.
pub struct CheckpointManager {
    ckpt_dir: PathBuf,
}

impl CheckpointManager {
    /// Checkpoints live under `<logs_dir>/checkpoint`.
    pub fn new(logs_dir: impl AsRef<Path>) -> Self {
        Self {
            ckpt_dir: logs_dir.as_ref().join("checkpoint"),
        }
    }

    /// The checkpoint directory.
    pub fn dir(&self) -> &Path {
        &self.ckpt_dir
    }

    /// Epoch number embedded in a checkpoint filename, if any.
    pub fn epoch_in_name(path: &Path) -> Option<u32> {
        let stem = path.file_stem()?.to_str()?;
        let digits: String = stem
            .chars()
            .rev()
            .take_while(|c| c.is_ascii_digit())
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        digits.parse().ok()
    }

    /// The checkpoint with the numerically largest epoch, if any exist.
    pub fn latest(&self) -> Option<PathBuf> {
        let entries = fs::read_dir(&self.ckpt_dir).ok()?;
        let mut best: Option<(u32, PathBuf)> = None;
        for entry in entries.flatten() {
            let path = entry.path();
            let is_ckpt = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("ckpt_") && n.ends_with(".json"));
            if !is_ckpt {
                continue;
            }
            if let Some(epoch) = Self::epoch_in_name(&path)
                && best.as_ref().is_none_or(|(e, _)| epoch > *e)
            {
                best = Some((epoch, path));
            }
        }
        best.map(|(_, p)| p)
    }

    /// Restore pipeline state and return the epoch to resume from.
    ///
    /// With no explicit path: auto-discovers the latest checkpoint and, when
    /// `is_resume` holds, restores it and returns its epoch plus one;
    /// otherwise returns 0 without touching any state. An explicit path that
    /// does not exist is fatal. Model parameters are restored
    /// unconditionally; optimizer and scheduler state only when present in
    /// the file and attached here.
    pub fn load<M: Model>(
        &self,
        model: &mut M,
        mut optimizer: Option<&mut (dyn Optimizer + 'static)>,
        mut scheduler: Option<&mut (dyn LrScheduler + 'static)>,
        ckpt_path: Option<&Path>,
        is_resume: bool,
    ) -> Result<u32> {
        fs::create_dir_all(&self.ckpt_dir)?;

        let mut epoch = 0;
        let path = match ckpt_path {
            Some(p) => p.to_path_buf(),
            None => match self.latest() {
                Some(p) if is_resume => {
                    info!("no checkpoint path given, restoring from the latest");
                    epoch = Self::epoch_in_name(&p).unwrap_or(0) + 1;
                    p
                }
                _ => {
                    info!("initializing from scratch");
                    return Ok(0);
                }
            },
        };

        if !path.exists() {
            return Err(PipelineError::CheckpointNotFound(path));
        }

        info!("loading checkpoint {}", path.display());
        let data: CheckpointData = serde_json::from_reader(BufReader::new(File::open(&path)?))?;
        model.load_state(data.model_state);
        if let (Some(state), Some(opt)) = (data.optimizer_state, optimizer.as_deref_mut()) {
            info!("loading checkpoint optimizer state");
            opt.load_state(state);
        }
        if let (Some(state), Some(sched)) = (data.scheduler_state, scheduler.as_deref_mut()) {
            info!("loading checkpoint scheduler state");
            sched.load_state(state);
        }

        Ok(epoch)
    }

    /// Persist model and optimizer state for one epoch.
    ///
    /// Scheduler state is intentionally not written.
    pub fn save<M: Model>(
        &self,
        epoch: u32,
        model: &M,
        optimizer: Option<&dyn Optimizer>,
    ) -> Result<PathBuf> {
        fs::create_dir_all(&self.ckpt_dir)?;
        let path = self.ckpt_dir.join(format!("ckpt_{epoch:05}.json"));
        let data = CheckpointData {
            epoch,
            model_state: model.state(),
            optimizer_state: optimizer.map(|o| o.state()),
            scheduler_state: None,
        };
        serde_json::to_writer(BufWriter::new(File::create(&path)?), &data)?;
        info!("epoch {epoch}: saved checkpoint to {}", path.display());
        Ok(path)
    }
}
