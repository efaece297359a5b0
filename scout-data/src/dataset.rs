//! Dataset adapter traits and a synthetic scene generator.
//!
//! File-parsing adapters (scene scans on disk, cached loaders) plug in
//! behind [`Dataset`] and [`Split`]; the pipeline only depends on these
//! traits.

use crate::bbox::{BoundingBox3d, BoxIdGen};
use crate::sample::{Sample, SampleAttr};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

/// Errors raised by dataset adapters.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("invalid split name: {0}")]
    InvalidSplit(String),

    #[error("sample index {index} out of range for split of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Canonical split identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitName {
    Training,
    Validation,
    Test,
}

impl SplitName {
    /// All splits, in canonical order.
    pub const ALL: [SplitName; 3] = [SplitName::Training, SplitName::Validation, SplitName::Test];
}

impl FromStr for SplitName {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "train" | "training" => Ok(SplitName::Training),
            "val" | "validation" => Ok(SplitName::Validation),
            "test" | "testing" => Ok(SplitName::Test),
            other => Err(DatasetError::InvalidSplit(other.to_string())),
        }
    }
}

impl fmt::Display for SplitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SplitName::Training => "training",
            SplitName::Validation => "validation",
            SplitName::Test => "test",
        };
        f.write_str(s)
    }
}

/// One split of a dataset: an indexable sequence of samples.
pub trait Split {
    /// Number of samples in the split.
    fn len(&self) -> usize;

    /// Whether the split is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read one sample.
    fn sample(&self, index: usize) -> Result<Sample, DatasetError>;

    /// Identity of one sample.
    fn attr(&self, index: usize) -> Result<SampleAttr, DatasetError>;
}

/// A dataset that can hand out its splits.
pub trait Dataset {
    /// Human-readable dataset name.
    fn name(&self) -> &str;

    /// Open one split.
    fn get_split(&self, split: SplitName) -> Result<Box<dyn Split>, DatasetError>;
}

/// Configuration for [`SyntheticSceneDataset`].
#[derive(Debug, Clone)]
pub struct SyntheticSceneConfig {
    /// Samples generated per split.
    pub scenes_per_split: usize,
    /// Ground-truth boxes per scene.
    pub boxes_per_scene: usize,
    /// Points sampled inside each box.
    pub points_per_box: usize,
    /// Number of object classes to cycle through.
    pub num_classes: i32,
    /// Seed for the generator.
    pub seed: u64,
}

impl Default for SyntheticSceneConfig {
    fn default() -> Self {
        Self {
            scenes_per_split: 4,
            boxes_per_scene: 2,
            points_per_box: 32,
            num_classes: 3,
            seed: 7,
        }
    }
}

/// Deterministic in-memory scene generator.
///
/// Produces point clouds clustered around ground-truth boxes. Stands in for
/// file-backed adapters in demos and tests; the same config and seed always
/// yield the same scenes.
pub struct SyntheticSceneDataset {
    name: String,
    splits: BTreeMap<SplitName, Vec<(Sample, SampleAttr)>>,
}

impl SyntheticSceneDataset {
    /// Generate all splits up front.
    pub fn new(config: SyntheticSceneConfig) -> Self {
        let mut splits = BTreeMap::new();
        let mut ids = BoxIdGen::new();
        for (si, split) in SplitName::ALL.iter().enumerate() {
            let mut scenes = Vec::with_capacity(config.scenes_per_split);
            for scene in 0..config.scenes_per_split {
                let mut rng = Lcg::new(
                    config
                        .seed
                        .wrapping_add(si as u64 * 7919)
                        .wrapping_add(scene as u64 * 104_729),
                );
                scenes.push(Self::generate_scene(&config, *split, scene, &mut rng, &mut ids));
            }
            splits.insert(*split, scenes);
        }
        info!(
            scenes_per_split = config.scenes_per_split,
            "generated synthetic scenes"
        );
        Self {
            name: "SyntheticScenes".to_string(),
            splits,
        }
    }

    fn generate_scene(
        config: &SyntheticSceneConfig,
        split: SplitName,
        index: usize,
        rng: &mut Lcg,
        ids: &mut BoxIdGen,
    ) -> (Sample, SampleAttr) {
        let mut points = Vec::new();
        let mut bboxes = Vec::new();
        for b in 0..config.boxes_per_scene {
            let center = Vec3::new(
                rng.next_range(-8.0, 8.0),
                rng.next_range(0.0, 2.0),
                rng.next_range(-8.0, 8.0),
            );
            let size = Vec3::new(
                rng.next_range(0.8, 2.4),
                rng.next_range(0.8, 2.4),
                rng.next_range(0.8, 2.4),
            );
            let label = (b as i32) % config.num_classes;
            bboxes.push(BoundingBox3d::axis_aligned(
                center,
                size,
                label,
                1.0,
                ids.next_id(),
            ));
            for _ in 0..config.points_per_box {
                points.push(Vec3::new(
                    center.x + rng.next_range(-0.5, 0.5) * size.x,
                    center.y + rng.next_range(-0.5, 0.5) * size.y,
                    center.z + rng.next_range(-0.5, 0.5) * size.z,
                ));
            }
        }
        let name = format!("scene_{split}_{index:04}");
        let attr = SampleAttr {
            path: format!("synthetic://{name}"),
            name,
            split,
        };
        (Sample::new(points, bboxes), attr)
    }
}

impl Dataset for SyntheticSceneDataset {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_split(&self, split: SplitName) -> Result<Box<dyn Split>, DatasetError> {
        let scenes = self.splits.get(&split).cloned().unwrap_or_default();
        info!("found {} pointclouds for {}", scenes.len(), split);
        Ok(Box::new(SyntheticSplit { scenes }))
    }
}

struct SyntheticSplit {
    scenes: Vec<(Sample, SampleAttr)>,
}

impl Split for SyntheticSplit {
    fn len(&self) -> usize {
        self.scenes.len()
    }

    fn sample(&self, index: usize) -> Result<Sample, DatasetError> {
        self.scenes
            .get(index)
            .map(|(s, _)| s.clone())
            .ok_or(DatasetError::IndexOutOfRange {
                index,
                len: self.scenes.len(),
            })
    }

    fn attr(&self, index: usize) -> Result<SampleAttr, DatasetError> {
        self.scenes
            .get(index)
            .map(|(_, a)| a.clone())
            .ok_or(DatasetError::IndexOutOfRange {
                index,
                len: self.scenes.len(),
            })
    }
}

/// Small linear congruential generator, enough for reproducible test scenes.
struct Lcg {
    state: u64,
}

impl Lcg {
    fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1),
        }
    }

    fn next_u32(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (self.state >> 33) as u32
    }

    fn next_f32(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 / (1u32 << 24) as f32
    }

    fn next_range(&mut self, lo: f32, hi: f32) -> f32 {
        lo + (hi - lo) * self.next_f32()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_name_aliases() {
        assert_eq!("train".parse::<SplitName>().unwrap(), SplitName::Training);
        assert_eq!("training".parse::<SplitName>().unwrap(), SplitName::Training);
        assert_eq!("val".parse::<SplitName>().unwrap(), SplitName::Validation);
        assert_eq!("testing".parse::<SplitName>().unwrap(), SplitName::Test);
    }

    #[test]
    fn invalid_split_is_an_error() {
        let err = "holdout".parse::<SplitName>().unwrap_err();
        assert!(matches!(err, DatasetError::InvalidSplit(s) if s == "holdout"));
    }

    #[test]
    fn synthetic_scenes_are_deterministic() {
        let a = SyntheticSceneDataset::new(SyntheticSceneConfig::default());
        let b = SyntheticSceneDataset::new(SyntheticSceneConfig::default());
        let sa = a.get_split(SplitName::Training).unwrap();
        let sb = b.get_split(SplitName::Training).unwrap();
        assert_eq!(sa.len(), sb.len());
        let x = sa.sample(0).unwrap();
        let y = sb.sample(0).unwrap();
        assert_eq!(x.points, y.points);
        assert_eq!(x.bboxes.len(), y.bboxes.len());
        assert_eq!(x.bboxes[0].center, y.bboxes[0].center);
    }

    #[test]
    fn splits_have_configured_size() {
        let ds = SyntheticSceneDataset::new(SyntheticSceneConfig {
            scenes_per_split: 2,
            ..Default::default()
        });
        for split in SplitName::ALL {
            let s = ds.get_split(split).unwrap();
            assert_eq!(s.len(), 2);
        }
    }

    #[test]
    fn out_of_range_index_is_an_error() {
        let ds = SyntheticSceneDataset::new(SyntheticSceneConfig {
            scenes_per_split: 1,
            ..Default::default()
        });
        let s = ds.get_split(SplitName::Test).unwrap();
        assert!(s.sample(5).is_err());
    }

    #[test]
    fn attrs_name_the_split() {
        let ds = SyntheticSceneDataset::new(SyntheticSceneConfig::default());
        let s = ds.get_split(SplitName::Validation).unwrap();
        let attr = s.attr(0).unwrap();
        assert_eq!(attr.split, SplitName::Validation);
        assert!(attr.name.contains("validation"));
        assert!(attr.path.starts_with("synthetic://"));
    }

    #[test]
    fn points_cluster_inside_their_boxes() {
        let ds = SyntheticSceneDataset::new(SyntheticSceneConfig {
            scenes_per_split: 1,
            boxes_per_scene: 1,
            points_per_box: 16,
            ..Default::default()
        });
        let s = ds.get_split(SplitName::Training).unwrap();
        let sample = s.sample(0).unwrap();
        let b = &sample.bboxes[0];
        for p in &sample.points {
            let d = (*p - b.center).abs();
            assert!(d.x <= b.size.x * 0.5 + 1e-4);
            assert!(d.y <= b.size.y * 0.5 + 1e-4);
            assert!(d.z <= b.size.z * 0.5 + 1e-4);
        }
    }
}
