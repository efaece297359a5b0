//! Train the centroid detector on the synthetic scene dataset, then test it.
//!
//! ```sh
//! RUST_LOG=info cargo run -p scout-train --example train_toy
//! ```

use scout_data::SyntheticSceneDataset;
use scout_data::dataset::SyntheticSceneConfig;
use scout_train::{CentroidDetector, JsonlSink, ObjectDetection, PipelineConfig};

fn main() -> scout_train::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let logs_dir = std::path::PathBuf::from("./logs/train_toy");
    std::fs::create_dir_all(&logs_dir)?;

    let dataset = SyntheticSceneDataset::new(SyntheticSceneConfig::default());
    let sink = JsonlSink::create(logs_dir.join("metrics.jsonl"))?;
    let cfg = PipelineConfig {
        max_epoch: 8,
        save_ckpt_freq: 4,
        validation_freq: 2,
        logs_dir,
        ..Default::default()
    };

    let mut pipeline = ObjectDetection::new(CentroidDetector::new(0), dataset, sink, cfg);
    pipeline.run_train()?;

    if let Some(report) = pipeline.run_test()? {
        println!("test mAP (BEV): {:.4}", report.ap_bev.mean());
        println!("test mAP (3D):  {:.4}", report.ap_3d.mean());
    }
    Ok(())
}
