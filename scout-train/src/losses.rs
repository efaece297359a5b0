//! Per-epoch accumulation of named loss terms.

use crate::model::LossRecord;
use std::collections::BTreeMap;

/// Collects per-batch loss terms over one pass.
///
/// A fresh accumulator is created at the start of every epoch and every
/// validation pass; there is no cross-pass state.
#[derive(Debug, Default)]
pub struct LossAccumulator {
    terms: BTreeMap<String, Vec<f32>>,
}

impl LossAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one batch worth of loss terms.
    pub fn record(&mut self, record: &LossRecord) {
        for (name, value) in record {
            self.terms.entry(name.clone()).or_default().push(*value);
        }
    }

    /// Whether anything was recorded.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Mean of every term over the recorded batches.
    pub fn means(&self) -> BTreeMap<String, f32> {
        self.terms
            .iter()
            .map(|(name, values)| {
                let mean = values.iter().sum::<f32>() / values.len() as f32;
                (name.clone(), mean)
            })
            .collect()
    }

    /// Sum of all term means.
    pub fn total(&self) -> f32 {
        self.means().values().sum()
    }

    /// One-line summary in the form
    /// `"<prefix> -  term: 0.123 ... > loss: 0.456"`.
    pub fn summary(&self, prefix: &str) -> String {
        let mut out = format!("{prefix} - ");
        for (name, mean) in self.means() {
            out.push_str(&format!(" {name}: {mean:.3}"));
        }
        out.push_str(&format!(" > loss: {:.3}", self.total()));
        out
    }
}
