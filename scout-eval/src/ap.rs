//! Average precision over classes, difficulty buckets and overlap variants.

use crate::overlap::{BevRect, iou_3d, iou_bev};
use glam::Vec2;
use ordered_float::OrderedFloat;
use scout_data::BoundingBox3d;
use std::collections::BTreeMap;
use tracing::debug;

/// Which overlap metric to evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalPlane {
    /// Ground-plane projected overlap.
    Bev,
    /// Full 3D overlap.
    Full3d,
}

/// Canonical per-box record used by the evaluator.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalBox {
    /// Classification label.
    pub label_class: i32,
    /// Difficulty bucket (0 = easiest).
    pub difficulty: usize,
    /// Ground-plane footprint.
    pub rect: BevRect,
    /// Vertical interval (min, max).
    pub y_interval: (f32, f32),
    /// Detection confidence.
    pub score: f32,
}

impl EvalBox {
    fn overlap(&self, other: &EvalBox, plane: EvalPlane) -> f32 {
        match plane {
            EvalPlane::Bev => iou_bev(&self.rect, &other.rect),
            EvalPlane::Full3d => iou_3d(&self.rect, self.y_interval, &other.rect, other.y_interval),
        }
    }
}

/// Assign a difficulty bucket from descending height thresholds.
///
/// A box taller than `thresholds[k]` lands in bucket `k`; anything shorter
/// than every threshold lands in the bucket after the last. An empty
/// threshold list puts everything in bucket 0.
pub fn difficulty_for_height(height: f32, thresholds: &[f32]) -> usize {
    for (k, t) in thresholds.iter().enumerate() {
        if height >= *t {
            return k;
        }
    }
    thresholds.len()
}

/// Convert detection boxes into the canonical evaluation representation.
pub fn convert_for_eval(boxes: &[BoundingBox3d], difficulty_thresholds: &[f32]) -> Vec<EvalBox> {
    boxes
        .iter()
        .map(|b| EvalBox {
            label_class: b.label_class,
            difficulty: difficulty_for_height(b.height(), difficulty_thresholds),
            rect: BevRect::new(
                Vec2::new(b.center.x, b.center.z),
                Vec2::new(b.size.x * 0.5, b.size.z * 0.5),
                b.yaw(),
            ),
            y_interval: (b.center.y - b.size.y * 0.5, b.center.y + b.size.y * 0.5),
            score: b.confidence,
        })
        .collect()
}

/// Average precision indexed by `[class, difficulty, overlap variant]`.
///
/// Produced fresh by [`mean_average_precision`]; never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ApArray {
    classes: usize,
    difficulties: usize,
    variants: usize,
    values: Vec<f32>,
}

impl ApArray {
    fn zeros(classes: usize, difficulties: usize, variants: usize) -> Self {
        Self {
            classes,
            difficulties,
            variants,
            values: vec![0.0; classes * difficulties * variants],
        }
    }

    fn index(&self, class: usize, difficulty: usize, variant: usize) -> usize {
        (class * self.difficulties + difficulty) * self.variants + variant
    }

    /// AP for one cell.
    pub fn get(&self, class: usize, difficulty: usize, variant: usize) -> f32 {
        self.values[self.index(class, difficulty, variant)]
    }

    fn set(&mut self, class: usize, difficulty: usize, variant: usize, value: f32) {
        let i = self.index(class, difficulty, variant);
        self.values[i] = value;
    }

    /// (classes, difficulties, variants).
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.classes, self.difficulties, self.variants)
    }

    /// All AP values for one class at one overlap variant, ordered by
    /// difficulty bucket.
    pub fn class_row(&self, class: usize, variant: usize) -> Vec<f32> {
        (0..self.difficulties)
            .map(|d| self.get(class, d, variant))
            .collect()
    }

    /// Mean over every cell.
    pub fn mean(&self) -> f32 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f32>() / self.values.len() as f32
    }
}

/// Recall positions sampled for AP interpolation.
const RECALL_SAMPLES: usize = 41;

/// Compute average precision per class and difficulty bucket.
///
/// `pred` and `gt` hold one list of boxes per sample, in the same sample
/// order. `overlaps` lists the minimum-overlap variants (third result axis);
/// each variant carries one threshold per entry of `classes`.
/// `similar_classes` maps a predicted class to a ground-truth class whose
/// instances are ignored rather than counted as false positives.
///
/// Deterministic: identical inputs yield bit-identical results. A class with
/// zero ground-truth instances at a given difficulty yields an AP of 0.0.
pub fn mean_average_precision(
    pred: &[Vec<EvalBox>],
    gt: &[Vec<EvalBox>],
    classes: &[i32],
    difficulties: &[usize],
    overlaps: &[Vec<f32>],
    similar_classes: &BTreeMap<i32, i32>,
    plane: EvalPlane,
) -> ApArray {
    debug_assert_eq!(pred.len(), gt.len());
    let mut ap = ApArray::zeros(classes.len(), difficulties.len(), overlaps.len());
    for (ci, class) in classes.iter().enumerate() {
        let similar = similar_classes.get(class).copied();
        for (di, difficulty) in difficulties.iter().enumerate() {
            for (vi, variant) in overlaps.iter().enumerate() {
                let min_overlap = variant[ci];
                let value = average_precision(
                    pred,
                    gt,
                    *class,
                    *difficulty,
                    min_overlap,
                    similar,
                    plane,
                );
                ap.set(ci, di, vi, value);
            }
        }
    }
    debug!(
        classes = classes.len(),
        difficulties = difficulties.len(),
        variants = overlaps.len(),
        "computed AP table"
    );
    ap
}

fn average_precision(
    pred: &[Vec<EvalBox>],
    gt: &[Vec<EvalBox>],
    class: i32,
    difficulty: usize,
    min_overlap: f32,
    similar: Option<i32>,
    plane: EvalPlane,
) -> f32 {
    // Ground truth of this class above the requested difficulty, and ground
    // truth of a "similar" class, are ignored: matching them is neither a
    // true nor a false positive.
    let mut npos = 0usize;
    let mut valid: Vec<Vec<usize>> = Vec::with_capacity(gt.len());
    let mut ignored: Vec<Vec<usize>> = Vec::with_capacity(gt.len());
    for sample_gt in gt {
        let mut v = Vec::new();
        let mut ig = Vec::new();
        for (k, g) in sample_gt.iter().enumerate() {
            if g.label_class == class {
                if g.difficulty <= difficulty {
                    v.push(k);
                } else {
                    ig.push(k);
                }
            } else if similar == Some(g.label_class) {
                ig.push(k);
            }
        }
        npos += v.len();
        valid.push(v);
        ignored.push(ig);
    }
    if npos == 0 {
        return 0.0;
    }

    // All predictions of the class, ranked by descending confidence. The
    // stable sort keeps (sample, insertion) order for equal scores.
    let mut ranked: Vec<(usize, usize)> = Vec::new();
    for (si, sample_pred) in pred.iter().enumerate() {
        for (pi, p) in sample_pred.iter().enumerate() {
            if p.label_class == class {
                ranked.push((si, pi));
            }
        }
    }
    ranked.sort_by_key(|(si, pi)| std::cmp::Reverse(OrderedFloat(pred[*si][*pi].score)));

    let mut matched: Vec<Vec<bool>> = gt.iter().map(|s| vec![false; s.len()]).collect();
    let mut tp = Vec::with_capacity(ranked.len());
    let mut fp = Vec::with_capacity(ranked.len());
    for (si, pi) in ranked {
        let p = &pred[si][pi];
        let mut best_iou = 0.0f32;
        let mut best_gt = None;
        for &k in &valid[si] {
            if matched[si][k] {
                continue;
            }
            let iou = p.overlap(&gt[si][k], plane);
            if iou > best_iou {
                best_iou = iou;
                best_gt = Some(k);
            }
        }
        if let Some(k) = best_gt
            && best_iou >= min_overlap
        {
            matched[si][k] = true;
            tp.push(1u32);
            fp.push(0u32);
            continue;
        }
        let hits_ignored = ignored[si]
            .iter()
            .any(|&k| p.overlap(&gt[si][k], plane) >= min_overlap);
        if hits_ignored {
            continue;
        }
        tp.push(0);
        fp.push(1);
    }

    // Precision/recall curve, then AP over uniformly sampled recall
    // positions with right-max interpolation.
    let mut recalls = Vec::with_capacity(tp.len());
    let mut precisions = Vec::with_capacity(tp.len());
    let mut tp_acc = 0u32;
    let mut fp_acc = 0u32;
    for i in 0..tp.len() {
        tp_acc += tp[i];
        fp_acc += fp[i];
        recalls.push(tp_acc as f32 / npos as f32);
        precisions.push(tp_acc as f32 / (tp_acc + fp_acc) as f32);
    }

    let mut acc = 0.0f32;
    for s in 0..RECALL_SAMPLES {
        let r = s as f32 / (RECALL_SAMPLES - 1) as f32;
        let mut best = 0.0f32;
        for i in 0..recalls.len() {
            if recalls[i] >= r && precisions[i] > best {
                best = precisions[i];
            }
        }
        acc += best;
    }
    acc / RECALL_SAMPLES as f32
}
