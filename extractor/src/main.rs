mod batch;
mod error;
mod keys;
mod pipeline;
mod probe;
mod sink;
mod source;
mod storage;
mod summary;

use keyframe_common::config::{Config, SourceMode};
use pipeline::Extractor;
use std::path::PathBuf;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let mut config = match Config::load_or_default(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {e}", config_path.display());
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();

    if !config_path.exists() {
        warn!(
            path = config_path.display().to_string(),
            "config file not found, using defaults"
        );
    }

    config.apply_env_overrides();
    if let Err(e) = config.validate() {
        error!(error = %e, "invalid configuration");
        std::process::exit(1);
    }

    info!(
        mode = ?config.source.mode,
        input = config.source.path.display().to_string(),
        output = ?config.output.kind,
        output_dir = config.output.dir.display().to_string(),
        threshold = config.selection.threshold,
        max_time_interval_secs = config.selection.max_time_interval_secs,
        "starting keyframe extractor"
    );

    if config.source.mode != SourceMode::Images {
        source::ffmpeg::check_ffmpeg_available(&config.source.ffmpeg_path).await;
    }

    let extractor = match Extractor::new(config).await {
        Ok(x) => x,
        Err(e) => {
            error!(error = %e, "failed to set up output");
            std::process::exit(1);
        }
    };

    if let Err(e) = extractor.run().await {
        error!(error = %e, "keyframe extraction failed");
        std::process::exit(1);
    }
    info!("keyframe extraction complete");
}
