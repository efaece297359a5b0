//! Scout Eval Crate
//!
//! Detection-quality metrics for 3D object detection: canonical evaluation
//! boxes, rotated bird's-eye-view and full-3D overlap, and mean average
//! precision over classes, difficulty buckets, and overlap thresholds.

pub mod ap;
pub mod overlap;

pub use ap::{ApArray, EvalBox, EvalPlane, convert_for_eval, mean_average_precision};
pub use overlap::{BevRect, intersection_area, iou_3d, iou_bev};
