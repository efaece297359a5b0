//! Point-cloud samples produced by dataset adapters.

use crate::bbox::BoundingBox3d;
use crate::dataset::SplitName;
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Sensor calibration attached to a sample.
///
/// Both matrices are row-major 4x4 transforms.
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    /// World to camera transform.
    pub world_cam: [f32; 16],
    /// Camera to image transform.
    pub cam_img: [f32; 16],
}

/// One point-cloud sample with ground truth.
///
/// Immutable once produced by a dataset adapter.
#[derive(Debug, Clone)]
pub struct Sample {
    /// Point coordinates.
    pub points: Vec<Vec3>,
    /// Optional per-point features, one row per point.
    pub features: Option<Vec<Vec<f32>>>,
    /// Optional sensor calibration.
    pub calib: Option<Calibration>,
    /// Ground-truth boxes.
    pub bboxes: Vec<BoundingBox3d>,
}

impl Sample {
    /// Create a sample with points and ground truth only.
    pub fn new(points: Vec<Vec3>, bboxes: Vec<BoundingBox3d>) -> Self {
        Self {
            points,
            features: None,
            calib: None,
            bboxes,
        }
    }

    /// Number of points in the cloud.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the cloud is empty.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Centroid of the point cloud, or the origin for an empty cloud.
    pub fn centroid(&self) -> Vec3 {
        if self.points.is_empty() {
            return Vec3::ZERO;
        }
        self.points.iter().copied().sum::<Vec3>() / self.points.len() as f32
    }
}

/// Identity of a sample within its dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleAttr {
    /// Short name of the sample (usually the file stem).
    pub name: String,
    /// Source path, or a synthetic identifier.
    pub path: String,
    /// Split the sample belongs to.
    pub split: SplitName,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centroid_of_empty_cloud_is_origin() {
        let s = Sample::new(vec![], vec![]);
        assert!(s.is_empty());
        assert_eq!(s.centroid(), Vec3::ZERO);
    }

    #[test]
    fn centroid_averages_points() {
        let s = Sample::new(
            vec![Vec3::new(1.0, 0.0, 0.0), Vec3::new(3.0, 2.0, -4.0)],
            vec![],
        );
        assert_eq!(s.len(), 2);
        assert_eq!(s.centroid(), Vec3::new(2.0, 1.0, -2.0));
    }
}
