//! Model, optimizer and scheduler contracts.
//!
//! The pipeline drives any learned model through the [`Model`] trait; the
//! tensor backend behind `forward`/`backward` is the implementor's concern.
//! Parameters and gradients cross the boundary as flat name-keyed vectors so
//! checkpoints stay backend-agnostic.

use crate::config::OptimizerConfig;
use scout_data::{BoundingBox3d, Sample};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Named parameter (or gradient) vectors.
pub type ParamMap = BTreeMap<String, Vec<f32>>;

/// Named scalar state for schedulers.
pub type SchedulerState = BTreeMap<String, f32>;

/// Per-batch named loss terms.
pub type LossRecord = BTreeMap<String, f32>;

/// Compute device handed to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    #[default]
    Cpu,
    Gpu(u32),
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Gpu(i) => write!(f, "gpu:{i}"),
        }
    }
}

/// Training or evaluation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Train,
    Eval,
}

/// Contract between the pipeline and a learned detection model.
pub trait Model {
    /// Raw forward-pass output consumed by `loss` and `inference_end`.
    type Output;

    /// Move the model to a device.
    fn set_device(&mut self, device: Device);

    /// Switch between training and evaluation behavior.
    fn set_mode(&mut self, mode: Mode);

    /// Per-sample preprocessing applied by the data loader.
    fn preprocess(&self, sample: Sample) -> Sample {
        sample
    }

    /// Training-time augmentation applied after preprocessing.
    fn transform(&self, sample: Sample) -> Sample {
        sample
    }

    /// Forward pass.
    fn forward(&self, sample: &Sample) -> Self::Output;

    /// Named loss terms for one batch.
    fn loss(&self, output: &Self::Output, sample: &Sample) -> LossRecord;

    /// Clear accumulated gradients.
    fn zero_grad(&mut self);

    /// Accumulate gradients of the summed loss.
    fn backward(&mut self, output: &Self::Output, sample: &Sample);

    /// Clamp every gradient value to `[-max, max]`.
    fn clip_grad_value(&mut self, max: f32) {
        for grad in self.grads_mut().values_mut() {
            for v in grad.iter_mut() {
                *v = v.clamp(-max, max);
            }
        }
    }

    /// Turn raw outputs into detection boxes.
    fn inference_end(&mut self, output: &Self::Output, sample: &Sample) -> Vec<BoundingBox3d>;

    /// Snapshot of all parameters.
    fn state(&self) -> ParamMap;

    /// Restore all parameters from a snapshot.
    fn load_state(&mut self, state: ParamMap);

    /// Mutable access to the parameters, for the optimizer step.
    fn params_mut(&mut self) -> &mut ParamMap;

    /// Accumulated gradients.
    fn grads(&self) -> &ParamMap;

    /// Mutable access to the gradients.
    fn grads_mut(&mut self) -> &mut ParamMap;

    /// Build the optimizer (and optional scheduler) for this model.
    fn make_optimizer(
        &self,
        config: &OptimizerConfig,
    ) -> (Box<dyn Optimizer>, Option<Box<dyn LrScheduler>>);
}

/// First-order optimizer over name-keyed parameter vectors.
pub trait Optimizer {
    /// Apply one update step.
    fn step(&mut self, params: &mut ParamMap, grads: &ParamMap);

    /// Override the learning rate (used by schedulers).
    fn set_lr(&mut self, lr: f32);

    /// Snapshot of the optimizer state for checkpointing.
    fn state(&self) -> ParamMap;

    /// Restore optimizer state from a checkpoint.
    fn load_state(&mut self, state: ParamMap);
}

/// Epoch-level learning-rate schedule.
pub trait LrScheduler {
    /// Advance one epoch and return the new learning rate.
    fn step(&mut self) -> f32;

    /// Current learning rate.
    fn lr(&self) -> f32;

    /// Snapshot for checkpointing.
    fn state(&self) -> SchedulerState;

    /// Restore from a checkpoint.
    fn load_state(&mut self, state: SchedulerState);
}

/// Stochastic gradient descent with momentum.
///
/// The momentum buffers are the checkpointed optimizer state.
#[derive(Debug, Clone)]
pub struct Sgd {
    lr: f32,
    momentum: f32,
    velocity: ParamMap,
}

impl Sgd {
    pub fn new(lr: f32, momentum: f32) -> Self {
        Self {
            lr,
            momentum,
            velocity: ParamMap::new(),
        }
    }

    /// Current learning rate.
    pub fn lr(&self) -> f32 {
        self.lr
    }
}

impl Optimizer for Sgd {
    fn step(&mut self, params: &mut ParamMap, grads: &ParamMap) {
        for (name, grad) in grads {
            let Some(param) = params.get_mut(name) else {
                continue;
            };
            let velocity = self
                .velocity
                .entry(name.clone())
                .or_insert_with(|| vec![0.0; grad.len()]);
            for i in 0..param.len().min(grad.len()) {
                velocity[i] = self.momentum * velocity[i] + grad[i];
                param[i] -= self.lr * velocity[i];
            }
        }
    }

    fn set_lr(&mut self, lr: f32) {
        self.lr = lr;
    }

    fn state(&self) -> ParamMap {
        self.velocity.clone()
    }

    fn load_state(&mut self, state: ParamMap) {
        self.velocity = state;
    }
}

/// Multiplies the learning rate by `gamma` every `step_size` epochs.
#[derive(Debug, Clone)]
pub struct StepDecay {
    base_lr: f32,
    gamma: f32,
    step_size: u32,
    epochs: u32,
}

impl StepDecay {
    pub fn new(base_lr: f32, gamma: f32, step_size: u32) -> Self {
        Self {
            base_lr,
            gamma,
            step_size: step_size.max(1),
            epochs: 0,
        }
    }
}

impl LrScheduler for StepDecay {
    fn step(&mut self) -> f32 {
        self.epochs += 1;
        self.lr()
    }

    fn lr(&self) -> f32 {
        self.base_lr * self.gamma.powi((self.epochs / self.step_size) as i32)
    }

    fn state(&self) -> SchedulerState {
        SchedulerState::from([("epochs".to_string(), self.epochs as f32)])
    }

    fn load_state(&mut self, state: SchedulerState) {
        if let Some(epochs) = state.get("epochs") {
            self.epochs = *epochs as u32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(values: &[f32]) -> ParamMap {
        ParamMap::from([("w".to_string(), values.to_vec())])
    }

    #[test]
    fn sgd_without_momentum_is_plain_descent() {
        let mut opt = Sgd::new(0.1, 0.0);
        let mut p = params(&[1.0, 2.0]);
        opt.step(&mut p, &params(&[1.0, -1.0]));
        assert_eq!(p["w"], vec![0.9, 2.1]);
    }

    #[test]
    fn sgd_momentum_accumulates_velocity() {
        let mut opt = Sgd::new(1.0, 0.5);
        let mut p = params(&[0.0]);
        opt.step(&mut p, &params(&[1.0]));
        // v = 1, p = -1
        opt.step(&mut p, &params(&[1.0]));
        // v = 1.5, p = -2.5
        assert!((p["w"][0] + 2.5).abs() < 1e-6);
    }

    #[test]
    fn sgd_state_roundtrip_preserves_velocity() {
        let mut opt = Sgd::new(1.0, 0.5);
        let mut p = params(&[0.0]);
        opt.step(&mut p, &params(&[1.0]));
        let state = opt.state();

        let mut fresh = Sgd::new(1.0, 0.5);
        fresh.load_state(state);
        let mut a = params(&[0.0]);
        let mut b = params(&[0.0]);
        opt.step(&mut a, &params(&[1.0]));
        fresh.step(&mut b, &params(&[1.0]));
        assert_eq!(a["w"], b["w"]);
    }

    #[test]
    fn sgd_ignores_unknown_parameter_names() {
        let mut opt = Sgd::new(0.1, 0.0);
        let mut p = params(&[1.0]);
        let grads = ParamMap::from([("other".to_string(), vec![1.0])]);
        opt.step(&mut p, &grads);
        assert_eq!(p["w"], vec![1.0]);
    }

    #[test]
    fn step_decay_schedule() {
        let mut sched = StepDecay::new(1.0, 0.1, 2);
        assert_eq!(sched.lr(), 1.0);
        sched.step();
        assert_eq!(sched.lr(), 1.0);
        sched.step();
        assert!((sched.lr() - 0.1).abs() < 1e-7);
    }

    #[test]
    fn step_decay_state_roundtrip() {
        let mut sched = StepDecay::new(1.0, 0.5, 1);
        sched.step();
        sched.step();
        let state = sched.state();
        let mut fresh = StepDecay::new(1.0, 0.5, 1);
        fresh.load_state(state);
        assert_eq!(fresh.lr(), sched.lr());
    }

    #[test]
    fn device_display() {
        assert_eq!(Device::Cpu.to_string(), "cpu");
        assert_eq!(Device::Gpu(1).to_string(), "gpu:1");
    }
}
