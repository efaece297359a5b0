//! Write-only sinks for scalar time series and configuration snapshots.

use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::warn;

/// Destination for training metrics. Write-only; failures are logged, never
/// surfaced to the training loop.
pub trait MetricsSink {
    /// Record one scalar keyed by (split, loss term, epoch).
    fn add_scalar(&mut self, split: &str, term: &str, epoch: u32, value: f32);

    /// Record a free-text snapshot (configuration dumps and the like).
    fn add_text(&mut self, tag: &str, body: &str);
}

#[derive(Serialize)]
struct ScalarLine<'a> {
    kind: &'static str,
    split: &'a str,
    term: &'a str,
    epoch: u32,
    value: f32,
}

#[derive(Serialize)]
struct TextLine<'a> {
    kind: &'static str,
    tag: &'a str,
    body: &'a str,
}

/// Appends one JSON record per line to a file.
pub struct JsonlSink {
    writer: BufWriter<File>,
}

impl JsonlSink {
    /// Create (truncate) the sink file.
    pub fn create(path: impl AsRef<Path>) -> std::io::Result<Self> {
        Ok(Self {
            writer: BufWriter::new(File::create(path)?),
        })
    }

    fn write_line(&mut self, line: &impl Serialize) {
        let result = serde_json::to_writer(&mut self.writer, line)
            .map_err(std::io::Error::from)
            .and_then(|_| self.writer.write_all(b"\n"))
            .and_then(|_| self.writer.flush());
        if let Err(e) = result {
            warn!("failed to write metrics record: {e}");
        }
    }
}

impl MetricsSink for JsonlSink {
    fn add_scalar(&mut self, split: &str, term: &str, epoch: u32, value: f32) {
        self.write_line(&ScalarLine {
            kind: "scalar",
            split,
            term,
            epoch,
            value,
        });
    }

    fn add_text(&mut self, tag: &str, body: &str) {
        self.write_line(&TextLine {
            kind: "text",
            tag,
            body,
        });
    }
}

/// One recorded scalar, for inspection in tests.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarRecord {
    pub split: String,
    pub term: String,
    pub epoch: u32,
    pub value: f32,
}

/// In-memory sink for tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub scalars: Vec<ScalarRecord>,
    pub texts: Vec<(String, String)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Epochs for which a scalar was recorded under the given split.
    pub fn epochs_for_split(&self, split: &str) -> Vec<u32> {
        let mut epochs: Vec<u32> = self
            .scalars
            .iter()
            .filter(|s| s.split == split)
            .map(|s| s.epoch)
            .collect();
        epochs.sort_unstable();
        epochs.dedup();
        epochs
    }
}

impl MetricsSink for MemorySink {
    fn add_scalar(&mut self, split: &str, term: &str, epoch: u32, value: f32) {
        self.scalars.push(ScalarRecord {
            split: split.to_string(),
            term: term.to_string(),
            epoch,
            value,
        });
    }

    fn add_text(&mut self, tag: &str, body: &str) {
        self.texts.push((tag.to_string(), body.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    #[test]
    fn memory_sink_groups_epochs_by_split() {
        let mut sink = MemorySink::new();
        sink.add_scalar("train", "loss_a", 1, 0.5);
        sink.add_scalar("train", "loss_b", 1, 0.25);
        sink.add_scalar("valid", "loss_a", 1, 0.75);
        sink.add_scalar("train", "loss_a", 2, 0.4);
        assert_eq!(sink.epochs_for_split("train"), vec![1, 2]);
        assert_eq!(sink.epochs_for_split("valid"), vec![1]);
        assert!(sink.epochs_for_split("test").is_empty());
    }

    #[test]
    fn jsonl_sink_writes_one_record_per_line() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("metrics.jsonl");
        let mut sink = JsonlSink::create(&path).unwrap();
        sink.add_scalar("train", "loss", 1, 0.5);
        sink.add_text("config", "{}");
        drop(sink);

        let mut body = String::new();
        File::open(&path).unwrap().read_to_string(&mut body).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"kind\":\"scalar\""));
        assert!(lines[0].contains("\"split\":\"train\""));
        assert!(lines[1].contains("\"kind\":\"text\""));
    }
}
