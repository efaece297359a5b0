//! A minimal analytic reference detector.
//!
//! Predicts one box per sample at the point-cloud centroid plus a learned
//! offset, with a learned size. Gradients are closed-form, so the full
//! pipeline can be exercised without a tensor backend.

use crate::config::OptimizerConfig;
use crate::model::{Device, LossRecord, LrScheduler, Mode, Model, Optimizer, ParamMap, Sgd, StepDecay};
use glam::Vec3;
use scout_data::{BoundingBox3d, BoxIdGen, Sample};

const OFFSET: &str = "offset";
const SIZE: &str = "size";

/// Raw output of [`CentroidDetector`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CentroidOutput {
    pub center: Vec3,
    pub size: Vec3,
}

/// One-box-per-sample detector with analytic gradients.
pub struct CentroidDetector {
    params: ParamMap,
    grads: ParamMap,
    device: Device,
    mode: Mode,
    label_class: i32,
    ids: BoxIdGen,
}

impl CentroidDetector {
    /// Create a detector emitting boxes of the given class.
    pub fn new(label_class: i32) -> Self {
        let params = ParamMap::from([
            (OFFSET.to_string(), vec![0.0; 3]),
            (SIZE.to_string(), vec![1.0; 3]),
        ]);
        let grads = ParamMap::from([
            (OFFSET.to_string(), vec![0.0; 3]),
            (SIZE.to_string(), vec![0.0; 3]),
        ]);
        Self {
            params,
            grads,
            device: Device::Cpu,
            mode: Mode::Eval,
            label_class,
            ids: BoxIdGen::new(),
        }
    }

    /// Current device.
    pub fn device(&self) -> Device {
        self.device
    }

    /// Current mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    fn param_vec3(&self, name: &str) -> Vec3 {
        let v = &self.params[name];
        Vec3::new(v[0], v[1], v[2])
    }

    fn target(sample: &Sample) -> Option<&BoundingBox3d> {
        sample.bboxes.first()
    }
}

impl Model for CentroidDetector {
    type Output = CentroidOutput;

    fn set_device(&mut self, device: Device) {
        self.device = device;
    }

    fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    fn forward(&self, sample: &Sample) -> CentroidOutput {
        CentroidOutput {
            center: sample.centroid() + self.param_vec3(OFFSET),
            size: self.param_vec3(SIZE),
        }
    }

    fn loss(&self, output: &CentroidOutput, sample: &Sample) -> LossRecord {
        let (center, size) = match Self::target(sample) {
            Some(gt) => (
                (output.center - gt.center).length_squared(),
                (output.size - gt.size).length_squared(),
            ),
            None => (0.0, 0.0),
        };
        LossRecord::from([
            ("loss_center".to_string(), center),
            ("loss_size".to_string(), size),
        ])
    }

    fn zero_grad(&mut self) {
        for grad in self.grads.values_mut() {
            grad.fill(0.0);
        }
    }

    fn backward(&mut self, output: &CentroidOutput, sample: &Sample) {
        let Some(gt) = Self::target(sample) else {
            return;
        };
        let d_center = 2.0 * (output.center - gt.center);
        let d_size = 2.0 * (output.size - gt.size);
        if let Some(g) = self.grads.get_mut(OFFSET) {
            g[0] += d_center.x;
            g[1] += d_center.y;
            g[2] += d_center.z;
        }
        if let Some(g) = self.grads.get_mut(SIZE) {
            g[0] += d_size.x;
            g[1] += d_size.y;
            g[2] += d_size.z;
        }
    }

    fn inference_end(&mut self, output: &CentroidOutput, _sample: &Sample) -> Vec<BoundingBox3d> {
        vec![BoundingBox3d::axis_aligned(
            output.center,
            output.size,
            self.label_class,
            1.0,
            self.ids.next_id(),
        )]
    }

    fn state(&self) -> ParamMap {
        self.params.clone()
    }

    fn load_state(&mut self, state: ParamMap) {
        self.params = state;
    }

    fn params_mut(&mut self) -> &mut ParamMap {
        &mut self.params
    }

    fn grads(&self) -> &ParamMap {
        &self.grads
    }

    fn grads_mut(&mut self) -> &mut ParamMap {
        &mut self.grads
    }

    fn make_optimizer(
        &self,
        config: &OptimizerConfig,
    ) -> (Box<dyn Optimizer>, Option<Box<dyn LrScheduler>>) {
        let optimizer = Box::new(Sgd::new(config.lr, config.momentum));
        let scheduler = config
            .lr_decay
            .as_ref()
            .map(|d| Box::new(StepDecay::new(config.lr, d.gamma, d.step_size)) as Box<dyn LrScheduler>);
        (optimizer, scheduler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_data::BoxIdGen;

    fn sample_with_target(center: Vec3, size: Vec3) -> Sample {
        let mut ids = BoxIdGen::new();
        let gt = BoundingBox3d::axis_aligned(center, size, 0, 1.0, ids.next_id());
        // Cloud centered exactly on the target.
        let points = vec![
            center + Vec3::new(0.1, 0.0, 0.0),
            center - Vec3::new(0.1, 0.0, 0.0),
        ];
        Sample::new(points, vec![gt])
    }

    #[test]
    fn forward_adds_offset_to_centroid() {
        let mut model = CentroidDetector::new(0);
        model.params_mut().insert(OFFSET.to_string(), vec![1.0, 0.0, 0.0]);
        let sample = sample_with_target(Vec3::ZERO, Vec3::ONE);
        let out = model.forward(&sample);
        assert_eq!(out.center, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(out.size, Vec3::ONE);
    }

    #[test]
    fn gradients_are_analytic() {
        let mut model = CentroidDetector::new(0);
        let sample = sample_with_target(Vec3::new(0.0, 0.0, 0.0), Vec3::new(3.0, 1.0, 1.0));
        let out = model.forward(&sample);
        model.zero_grad();
        model.backward(&out, &sample);
        // d(size)/d(param) = 2 * (1 - 3) = -4 on the x axis.
        assert!((model.grads()[SIZE][0] + 4.0).abs() < 1e-6);
        assert!((model.grads()[OFFSET][0]).abs() < 1e-6);
    }

    #[test]
    fn zero_grad_resets_accumulation() {
        let mut model = CentroidDetector::new(0);
        let sample = sample_with_target(Vec3::ZERO, Vec3::new(3.0, 1.0, 1.0));
        let out = model.forward(&sample);
        model.backward(&out, &sample);
        model.backward(&out, &sample);
        assert!((model.grads()[SIZE][0] + 8.0).abs() < 1e-6);
        model.zero_grad();
        assert_eq!(model.grads()[SIZE], vec![0.0; 3]);
    }

    #[test]
    fn clipping_changes_large_updates_only() {
        let sample = sample_with_target(Vec3::ZERO, Vec3::new(10.0, 1.0, 1.0));

        let run = |clip: Option<f32>| {
            let mut model = CentroidDetector::new(0);
            let (mut opt, _) = model.make_optimizer(&OptimizerConfig {
                lr: 0.1,
                momentum: 0.0,
                lr_decay: None,
            });
            let out = model.forward(&sample);
            model.zero_grad();
            model.backward(&out, &sample);
            if let Some(max) = clip {
                model.clip_grad_value(max);
            }
            let grads = model.grads().clone();
            opt.step(model.params_mut(), &grads);
            model.state()
        };

        // Raw size gradient is 2*(1-10) = -18: a clip of 1.0 bites, a clip
        // of 100.0 does not.
        let unclipped = run(None);
        let clipped = run(Some(1.0));
        let loose = run(Some(100.0));
        assert_ne!(unclipped[SIZE], clipped[SIZE]);
        assert_eq!(unclipped[SIZE], loose[SIZE]);
    }

    #[test]
    fn training_step_reduces_loss() {
        let mut model = CentroidDetector::new(0);
        let (mut opt, _) = model.make_optimizer(&OptimizerConfig {
            lr: 0.05,
            momentum: 0.0,
            lr_decay: None,
        });
        let sample = sample_with_target(Vec3::new(1.0, 0.0, -2.0), Vec3::new(2.0, 2.0, 2.0));
        let before: f32 = {
            let out = model.forward(&sample);
            model.loss(&out, &sample).values().sum()
        };
        for _ in 0..10 {
            let out = model.forward(&sample);
            model.zero_grad();
            model.backward(&out, &sample);
            let grads = model.grads().clone();
            opt.step(model.params_mut(), &grads);
        }
        let after: f32 = {
            let out = model.forward(&sample);
            model.loss(&out, &sample).values().sum()
        };
        assert!(after < before);
    }

    #[test]
    fn inference_emits_one_box_per_sample() {
        let mut model = CentroidDetector::new(2);
        let sample = sample_with_target(Vec3::ZERO, Vec3::ONE);
        let out = model.forward(&sample);
        let boxes = model.inference_end(&out, &sample);
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].label_class, 2);
        let again = model.inference_end(&out, &sample);
        assert_ne!(boxes[0].id, again[0].id);
    }
}
