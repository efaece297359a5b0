//! Pipeline configuration surface.

use crate::model::Device;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Optimizer hyperparameters handed to `Model::make_optimizer`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Learning rate.
    pub lr: f32,
    /// Momentum factor (0 disables momentum).
    pub momentum: f32,
    /// Optional learning-rate decay schedule.
    pub lr_decay: Option<LrDecayConfig>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            lr: 0.01,
            momentum: 0.9,
            lr_decay: None,
        }
    }
}

/// Step-decay schedule parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LrDecayConfig {
    /// Multiplicative decay factor.
    pub gamma: f32,
    /// Epochs between decays.
    pub step_size: u32,
}

/// Metric-evaluation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Class indices to evaluate.
    pub classes: Vec<i32>,
    /// Difficulty buckets to evaluate.
    pub difficulties: Vec<usize>,
    /// Descending box-height thresholds separating difficulty buckets.
    pub difficulty_thresholds: Vec<f32>,
    /// Minimum-overlap variants; each entry carries one threshold per class.
    pub overlaps: Vec<Vec<f32>>,
    /// Predicted class -> ground-truth class treated as a match to ignore.
    pub similar_classes: BTreeMap<i32, i32>,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            classes: vec![0, 1, 2],
            difficulties: vec![0, 1, 2],
            difficulty_thresholds: vec![40.0, 25.0],
            overlaps: vec![vec![0.5, 0.5, 0.7]],
            similar_classes: BTreeMap::from([(0, 4), (2, 3)]),
        }
    }
}

/// Configuration of the object-detection pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Last epoch to train (inclusive).
    pub max_epoch: u32,
    /// Save a checkpoint every this many epochs; 0 disables saving.
    pub save_ckpt_freq: u32,
    /// Clip gradient values to this magnitude; negative disables clipping.
    pub grad_clip_norm: f32,
    /// Resume from the latest checkpoint when no explicit path is given.
    pub is_resume: bool,
    /// Explicit checkpoint to load; must exist when set.
    pub ckpt_path: Option<PathBuf>,
    /// Cap on training batches per epoch.
    pub steps_per_epoch_train: Option<usize>,
    /// Compute mAP during `run_test`.
    pub test_compute_metric: bool,
    /// Ask the data-loading layer to cache preprocessed samples.
    pub use_cache: bool,
    /// Run validation every this many epochs; 0 disables it.
    pub validation_freq: u32,
    /// Reload a checkpoint before `run_test`.
    pub test_reload_ckpt: bool,
    /// Root directory for logs and checkpoints.
    pub logs_dir: PathBuf,
    /// Compute device handed to the model.
    pub device: Device,
    /// Optimizer hyperparameters.
    pub optimizer: OptimizerConfig,
    /// Metric-evaluation parameters.
    pub eval: EvalConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_epoch: 1,
            save_ckpt_freq: 1,
            grad_clip_norm: -1.0,
            is_resume: true,
            ckpt_path: None,
            steps_per_epoch_train: None,
            test_compute_metric: true,
            use_cache: false,
            validation_freq: 1,
            test_reload_ckpt: true,
            logs_dir: PathBuf::from("./logs"),
            device: Device::Cpu,
            optimizer: OptimizerConfig::default(),
            eval: EvalConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.save_ckpt_freq, 1);
        assert!(cfg.grad_clip_norm < 0.0);
        assert!(cfg.is_resume);
        assert!(cfg.test_compute_metric);
        assert!(cfg.test_reload_ckpt);
        assert_eq!(cfg.validation_freq, 1);
        assert_eq!(cfg.device, Device::Cpu);
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let cfg: PipelineConfig =
            serde_json::from_str(r#"{"max_epoch": 12, "grad_clip_norm": 0.5}"#).unwrap();
        assert_eq!(cfg.max_epoch, 12);
        assert_eq!(cfg.grad_clip_norm, 0.5);
        assert!(cfg.ckpt_path.is_none());
        assert_eq!(cfg.eval.classes, vec![0, 1, 2]);
    }

    #[test]
    fn eval_defaults_mirror_reference_setup() {
        let eval = EvalConfig::default();
        assert_eq!(eval.overlaps, vec![vec![0.5, 0.5, 0.7]]);
        assert_eq!(eval.similar_classes.get(&0), Some(&4));
        assert_eq!(eval.similar_classes.get(&2), Some(&3));
    }
}
