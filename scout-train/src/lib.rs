//! Scout Train Crate
//!
//! Training, validation and test pipeline for 3D object detection.
//!
//! ## Modules
//!
//! - [`config`]: the pipeline configuration surface
//! - [`model`]: model/optimizer/scheduler contracts and reference SGD
//! - [`detector`]: a minimal analytic detector for demos and tests
//! - [`checkpoint`]: epoch-keyed checkpoint persistence
//! - [`losses`]: per-pass loss accumulation
//! - [`loader`]: split iteration with model hooks
//! - [`sink`]: metric sinks
//! - [`pipeline`]: the object-detection pipeline itself

pub mod checkpoint;
pub mod config;
pub mod detector;
pub mod error;
pub mod loader;
pub mod losses;
pub mod model;
pub mod pipeline;
pub mod sink;

pub use checkpoint::{CheckpointData, CheckpointManager};
pub use config::{EvalConfig, LrDecayConfig, OptimizerConfig, PipelineConfig};
pub use detector::{CentroidDetector, CentroidOutput};
pub use error::{PipelineError, Result};
pub use loader::SplitLoader;
pub use losses::LossAccumulator;
pub use model::{Device, LossRecord, LrScheduler, Mode, Model, Optimizer, ParamMap, Sgd, StepDecay};
pub use pipeline::{ObjectDetection, TestReport, ValidationReport};
pub use sink::{JsonlSink, MemorySink, MetricsSink};
