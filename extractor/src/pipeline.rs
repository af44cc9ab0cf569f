use chrono::Utc;
use keyframe_common::config::{Config, ConfigError, OutputKind, SourceMode};
use keyframe_engine::{Engine, FrameSource, RunConfig, RunSummary};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::batch::{discover_videos, shared_stems, video_stem};
use crate::error::ExtractorError;
use crate::sink::OutputTarget;
use crate::source::{FfmpegSource, ImageDirSource};
use crate::storage::S3Storage;
use crate::summary::RunReport;

/// Wires the configured source and output to the selection engine.
pub struct Extractor {
    config: Config,
    engine: Engine,
    target: OutputTarget,
}

impl Extractor {
    pub async fn new(config: Config) -> Result<Self, ExtractorError> {
        let target = match config.output.kind {
            OutputKind::Local => OutputTarget::Local {
                root: config.output.dir.clone(),
            },
            OutputKind::S3 => {
                let s3 = config.s3.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("output.kind = \"s3\" requires an [s3] section".into())
                })?;
                let storage = S3Storage::new(s3).await;
                storage.ensure_bucket().await?;
                OutputTarget::S3 {
                    storage: Arc::new(storage),
                }
            }
        };
        let engine = Engine::new(RunConfig::from(&config.selection));

        Ok(Self {
            config,
            engine,
            target,
        })
    }

    pub async fn run(&self) -> Result<(), ExtractorError> {
        let path = &self.config.source.path;
        match self.config.source.mode {
            SourceMode::Video => {
                let mut source = self.video_source(path);
                self.extract(&mut source, None).await?;
            }
            SourceMode::Images => {
                let mut source = ImageDirSource::new(path, self.config.source.fps);
                self.extract(&mut source, None).await?;
            }
            SourceMode::Batch => self.run_batch(path).await?,
        }
        Ok(())
    }

    /// One run per video; a failed video is logged and the batch moves on.
    async fn run_batch(&self, dir: &Path) -> Result<(), ExtractorError> {
        let videos = discover_videos(dir, &self.config.source.extensions)?;
        if videos.is_empty() {
            warn!(dir = dir.display().to_string(), "no videos found");
            return Ok(());
        }
        info!(
            dir = dir.display().to_string(),
            count = videos.len(),
            "processing batch"
        );
        for stem in shared_stems(&videos) {
            warn!(
                stem,
                "several videos share this name; later runs overwrite earlier keyframes"
            );
        }

        let mut failed = 0;
        for video in &videos {
            let stem = video_stem(video);
            let mut source = self.video_source(video);
            if let Err(e) = self.extract(&mut source, Some(&stem)).await {
                error!(video = video.display().to_string(), error = %e, "video failed");
                failed += 1;
            }
        }

        info!(total = videos.len(), failed, "batch complete");
        if failed > 0 {
            return Err(ExtractorError::BatchFailed {
                failed,
                total: videos.len(),
            });
        }
        Ok(())
    }

    async fn extract(
        &self,
        source: &mut dyn FrameSource,
        location: Option<&str>,
    ) -> Result<RunSummary, ExtractorError> {
        let started_at = Utc::now();
        let mut sink = self.target.sink(location, self.config.output.image_format);
        let summary = self.engine.run(&mut *source, sink.as_mut()).await?;

        if self.config.output.summary_file {
            let report = RunReport {
                source: source.name(),
                started_at,
                finished_at: Utc::now(),
                threshold: self.config.selection.threshold,
                max_time_interval_secs: self.config.selection.max_time_interval_secs,
                summary: &summary,
            };
            self.target.write_summary(location, report.to_json()?).await?;
        }
        Ok(summary)
    }

    fn video_source(&self, path: &Path) -> FfmpegSource {
        let source = &self.config.source;
        FfmpegSource::new(
            path,
            &source.ffmpeg_path,
            &source.ffprobe_path,
            source.color,
            source.decode_queue_depth,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use keyframe_common::config::OutputFormat;

    fn write_gray(path: &Path, value: u8) {
        GrayImage::from_pixel(4, 4, Luma([value])).save(path).unwrap();
    }

    async fn local_extractor(mode: SourceMode, input: &Path, output: &Path) -> Extractor {
        let mut config = Config::default();
        config.source.mode = mode;
        config.source.path = input.to_path_buf();
        config.source.fps = 1.0;
        config.selection.threshold = 30.0;
        config.selection.max_time_interval_secs = 3.0;
        config.output.dir = output.to_path_buf();
        config.output.image_format = OutputFormat::Png;
        Extractor::new(config).await.unwrap()
    }

    #[tokio::test]
    async fn image_directory_run_writes_keyframes_and_summary() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        for (i, v) in [10u8, 10, 10, 10, 200, 200].iter().enumerate() {
            write_gray(&input.path().join(format!("frame_{i:03}.png")), *v);
        }

        let extractor = local_extractor(SourceMode::Images, input.path(), output.path()).await;
        extractor.run().await.unwrap();

        assert!(output.path().join("keyframe_0000.png").exists());
        assert!(output.path().join("keyframe_0001.png").exists());
        assert!(output.path().join("keyframe_0002.png").exists());
        assert!(!output.path().join("keyframe_0003.png").exists());

        let json: serde_json::Value =
            serde_json::from_slice(&std::fs::read(output.path().join("summary.json")).unwrap())
                .unwrap();
        assert_eq!(json["total_keyframes"], 3);
        assert_eq!(json["total_frames_analyzed"], 5);
        assert_eq!(json["keyframes"][1]["index"], 3);
        assert_eq!(json["keyframes"][1]["reason"]["kind"], "time_exceeded");
        assert_eq!(json["keyframes"][2]["index"], 4);
        assert_eq!(json["keyframes"][2]["reason"]["kind"], "scene_change");
    }

    #[tokio::test]
    async fn empty_image_directory_fails() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();

        let extractor = local_extractor(SourceMode::Images, input.path(), output.path()).await;
        let err = extractor.run().await.unwrap_err();
        assert!(matches!(
            err,
            ExtractorError::Engine(keyframe_engine::EngineError::EmptyStream)
        ));
    }

    #[tokio::test]
    async fn batch_reports_failed_videos() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        std::fs::write(input.path().join("broken.mp4"), b"not a video").unwrap();

        let mut extractor = local_extractor(SourceMode::Batch, input.path(), output.path()).await;
        extractor.config.source.ffprobe_path = "/nonexistent/ffprobe".into();
        let err = extractor.run().await.unwrap_err();
        assert!(matches!(
            err,
            ExtractorError::BatchFailed { failed: 1, total: 1 }
        ));
    }

    #[tokio::test]
    async fn empty_batch_directory_is_ok() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();

        let extractor = local_extractor(SourceMode::Batch, input.path(), output.path()).await;
        extractor.run().await.unwrap();
    }
}
