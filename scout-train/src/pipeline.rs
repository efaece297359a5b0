//! The object-detection pipeline: training, validation, test, inference.
//!
//! A single logical thread drives everything; forward/backward and optimizer
//! steps are synchronous, and validation only runs between completed steps.

use crate::checkpoint::CheckpointManager;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::loader::SplitLoader;
use crate::losses::LossAccumulator;
use crate::model::{LrScheduler, Mode, Model, Optimizer};
use crate::sink::MetricsSink;
use scout_data::{BoundingBox3d, Dataset, Sample, SplitName};
use scout_eval::{ApArray, EvalPlane, convert_for_eval, mean_average_precision};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Outcome of one validation pass.
#[derive(Debug)]
pub struct ValidationReport {
    /// Mean loss per term over the split.
    pub losses: BTreeMap<String, f32>,
    /// AP over the bird's-eye-view overlap metric.
    pub ap_bev: ApArray,
    /// AP over the full-3D overlap metric.
    pub ap_3d: ApArray,
}

/// Outcome of one test pass with metrics enabled.
#[derive(Debug)]
pub struct TestReport {
    pub ap_bev: ApArray,
    pub ap_3d: ApArray,
}

/// Drives a detection model over a dataset.
pub struct ObjectDetection<M: Model, D: Dataset, S: MetricsSink> {
    model: M,
    dataset: D,
    sink: S,
    cfg: PipelineConfig,
    ckpts: CheckpointManager,
    optimizer: Option<Box<dyn Optimizer>>,
    scheduler: Option<Box<dyn LrScheduler>>,
}

impl<M: Model, D: Dataset, S: MetricsSink> ObjectDetection<M, D, S> {
    pub fn new(mut model: M, dataset: D, sink: S, cfg: PipelineConfig) -> Self {
        let ckpts = CheckpointManager::new(&cfg.logs_dir);
        model.set_device(cfg.device);
        Self {
            model,
            dataset,
            sink,
            cfg,
            ckpts,
            optimizer: None,
            scheduler: None,
        }
    }

    /// The wrapped model.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// The metrics sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// The checkpoint manager for this run.
    pub fn checkpoints(&self) -> &CheckpointManager {
        &self.ckpts
    }

    /// Run inference on one prepared sample.
    pub fn run_inference(&mut self, sample: &Sample) -> Vec<BoundingBox3d> {
        self.model.set_mode(Mode::Eval);
        let output = self.model.forward(sample);
        self.model.inference_end(&output, sample)
    }

    /// Train over the training split, validating and checkpointing along
    /// the way.
    pub fn run_train(&mut self) -> Result<()> {
        info!(device = %self.cfg.device, "starting training run");
        let loader = SplitLoader::new(self.dataset.get_split(SplitName::Training)?)
            .with_transform(true)
            .with_cache(self.cfg.use_cache)
            .with_steps(self.cfg.steps_per_epoch_train);

        let (optimizer, scheduler) = self.model.make_optimizer(&self.cfg.optimizer);
        self.optimizer = Some(optimizer);
        self.scheduler = scheduler;

        let start_epoch = self.ckpts.load(
            &mut self.model,
            self.optimizer.as_deref_mut(),
            self.scheduler.as_deref_mut(),
            self.cfg.ckpt_path.as_deref(),
            self.cfg.is_resume,
        )?;

        self.sink
            .add_text("configuration/pipeline", &serde_json::to_string_pretty(&self.cfg)?);

        info!("started training");
        for epoch in start_epoch.max(1)..=self.cfg.max_epoch {
            info!("=== EPOCH {epoch}/{} ===", self.cfg.max_epoch);
            self.model.set_mode(Mode::Train);

            let mut losses = LossAccumulator::new();
            for i in 0..loader.len() {
                let sample = loader.get(i, &self.model)?;
                let output = self.model.forward(&sample);
                let record = self.model.loss(&output, &sample);

                self.model.zero_grad();
                self.model.backward(&output, &sample);
                if self.cfg.grad_clip_norm > 0.0 {
                    self.model.clip_grad_value(self.cfg.grad_clip_norm);
                }
                let grads = self.model.grads().clone();
                let optimizer = self
                    .optimizer
                    .as_mut()
                    .ok_or(PipelineError::MissingConfig("optimizer"))?;
                optimizer.step(self.model.params_mut(), &grads);

                losses.record(&record);
            }
            debug!("{}", losses.summary("training"));

            let report = if self.cfg.validation_freq > 0 && epoch % self.cfg.validation_freq == 0 {
                Some(self.run_valid()?)
            } else {
                None
            };

            for (term, mean) in losses.means() {
                self.sink.add_scalar("train", &term, epoch, mean);
            }
            if let Some(report) = &report {
                for (term, mean) in &report.losses {
                    self.sink.add_scalar("valid", term, epoch, *mean);
                }
            }

            if self.cfg.save_ckpt_freq > 0 && epoch % self.cfg.save_ckpt_freq == 0 {
                self.ckpts
                    .save(epoch, &self.model, self.optimizer.as_deref())?;
            }
        }
        Ok(())
    }

    /// Run one pass over the validation split: losses plus BEV and 3D mAP.
    pub fn run_valid(&mut self) -> Result<ValidationReport> {
        self.model.set_mode(Mode::Eval);
        let loader = SplitLoader::new(self.dataset.get_split(SplitName::Validation)?)
            .with_cache(self.cfg.use_cache);

        info!("started validation");
        let mut losses = LossAccumulator::new();
        let mut pred = Vec::with_capacity(loader.len());
        let mut gt = Vec::with_capacity(loader.len());
        for i in 0..loader.len() {
            let sample = loader.get(i, &self.model)?;
            let inputs = self.model.transform(sample);
            let output = self.model.forward(&inputs);
            losses.record(&self.model.loss(&output, &inputs));

            let boxes = self.model.inference_end(&output, &inputs);
            pred.push(convert_for_eval(&boxes, &self.cfg.eval.difficulty_thresholds));
            gt.push(convert_for_eval(
                &inputs.bboxes,
                &self.cfg.eval.difficulty_thresholds,
            ));
        }
        info!("{}", losses.summary("validation"));

        let ap_bev = self.evaluate(&pred, &gt, EvalPlane::Bev);
        self.log_ap("BEV", &ap_bev);
        let ap_3d = self.evaluate(&pred, &gt, EvalPlane::Full3d);
        self.log_ap("3D", &ap_3d);

        Ok(ValidationReport {
            losses: losses.means(),
            ap_bev,
            ap_3d,
        })
    }

    /// Run inference over the test split and report mAP.
    ///
    /// Returns `None` when metric computation is disabled by config.
    pub fn run_test(&mut self) -> Result<Option<TestReport>> {
        info!(device = %self.cfg.device, "starting test run");
        self.model.set_mode(Mode::Eval);
        // The test split is always read uncached.
        let loader = SplitLoader::new(self.dataset.get_split(SplitName::Test)?);

        if self.cfg.test_reload_ckpt {
            let path = match self.cfg.ckpt_path.clone() {
                Some(p) => p,
                None => self.ckpts.latest().ok_or_else(|| {
                    PipelineError::CheckpointNotFound(self.ckpts.dir().to_path_buf())
                })?,
            };
            self.ckpts
                .load(&mut self.model, None, None, Some(&path), true)?;
        }

        info!("started testing");
        let mut pred = Vec::with_capacity(loader.len());
        let mut gt = Vec::with_capacity(loader.len());
        for i in 0..loader.len() {
            let sample = loader.get(i, &self.model)?;
            let boxes = self.run_inference(&sample);
            pred.push(convert_for_eval(&boxes, &self.cfg.eval.difficulty_thresholds));
            gt.push(convert_for_eval(
                &sample.bboxes,
                &self.cfg.eval.difficulty_thresholds,
            ));
        }

        if !self.cfg.test_compute_metric {
            return Ok(None);
        }
        let ap_bev = self.evaluate(&pred, &gt, EvalPlane::Bev);
        self.log_ap("BEV", &ap_bev);
        let ap_3d = self.evaluate(&pred, &gt, EvalPlane::Full3d);
        self.log_ap("3D", &ap_3d);
        Ok(Some(TestReport { ap_bev, ap_3d }))
    }

    fn evaluate(
        &self,
        pred: &[Vec<scout_eval::EvalBox>],
        gt: &[Vec<scout_eval::EvalBox>],
        plane: EvalPlane,
    ) -> ApArray {
        let eval = &self.cfg.eval;
        mean_average_precision(
            pred,
            gt,
            &eval.classes,
            &eval.difficulties,
            &eval.overlaps,
            &eval.similar_classes,
            plane,
        )
    }

    fn log_ap(&self, tag: &str, ap: &ApArray) {
        info!("mAP {tag}:");
        for (ci, class) in self.cfg.eval.classes.iter().enumerate() {
            info!("class {class}: {:?}", ap.class_row(ci, 0));
        }
    }
}
