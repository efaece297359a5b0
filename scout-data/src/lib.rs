//! Scout Data Crate
//!
//! CPU-side data types and dataset adapters for the scout3d toolkit.
//! This crate is backend-agnostic and focuses on point-cloud samples,
//! oriented 3D bounding boxes, and the geometry needed to visualize them.

pub mod bbox;
pub mod dataset;
pub mod lineset;
pub mod sample;

pub use bbox::{BoundingBox3d, BoxId, BoxIdGen};
pub use dataset::{Dataset, DatasetError, Split, SplitName, SyntheticSceneDataset};
pub use lineset::LineSet;
pub use sample::{Calibration, Sample, SampleAttr};
