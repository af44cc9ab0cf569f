use keyframe_common::config::SelectionConfig;
use keyframe_common::frame::{keyframe_identifier, Frame};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::fps::{max_frames_interval, resolve_frame_rate};
use crate::io::{FrameSource, OutputSink};
use crate::selection::{SelectionDecision, SelectionPolicy};

/// Immutable parameters of one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunConfig {
    /// Scene-change cutoff, in the units of the difference metric (0-255).
    pub threshold: f64,
    /// Time fallback budget in seconds.
    pub max_time_interval_secs: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            threshold: 30.0,
            max_time_interval_secs: 5.0,
        }
    }
}

impl From<&SelectionConfig> for RunConfig {
    fn from(config: &SelectionConfig) -> Self {
        Self {
            threshold: config.threshold,
            max_time_interval_secs: config.max_time_interval_secs,
        }
    }
}

/// One emitted keyframe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyframeRecord {
    /// Position of the frame in the source stream.
    pub index: u64,
    pub reason: SelectionDecision,
    /// Name the frame was persisted under.
    pub identifier: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// Index of the last frame read.
    pub total_frames_analyzed: u64,
    pub total_keyframes: u64,
    pub fps: f64,
    pub fps_substituted: bool,
    pub max_frames_interval: u64,
    pub keyframes: Vec<KeyframeRecord>,
}

/// Drives one pass of a [`FrameSource`] through the selection policy,
/// persisting every selected frame to an [`OutputSink`] as it is found.
///
/// Frames are processed strictly in order: frame N+1 is not requested until
/// frame N has been classified and, if selected, written.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: RunConfig,
}

impl Engine {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    pub async fn run<S, K>(&self, source: &mut S, sink: &mut K) -> Result<RunSummary, EngineError>
    where
        S: FrameSource + ?Sized,
        K: OutputSink + ?Sized,
    {
        source.open().await.map_err(EngineError::SourceOpen)?;

        let rate = resolve_frame_rate(source.frame_rate());
        let interval = max_frames_interval(self.config.max_time_interval_secs, rate.fps);
        info!(
            source = source.name(),
            sink = sink.name(),
            fps = format!("{:.2}", rate.fps),
            max_time_interval_secs = self.config.max_time_interval_secs,
            max_frames_interval = interval,
            threshold = self.config.threshold,
            "starting keyframe extraction"
        );

        let first = match source.next_frame().await {
            Ok(Some(frame)) => frame,
            Ok(None) => return Err(EngineError::EmptyStream),
            Err(e) => return Err(EngineError::SourceRead(e)),
        };

        let mut policy = SelectionPolicy::new(self.config.threshold, interval);
        let mut keyframes = Vec::new();
        let mut index: u64 = 0;
        classify(&mut policy, sink, first, index, &mut keyframes).await?;

        loop {
            let frame = match source.next_frame().await {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, last_index = index, "read failed mid-stream, treating as end of stream");
                    break;
                }
            };
            index += 1;
            if frame.index != index {
                debug!(expected = index, got = frame.index, "source frame index out of step");
            }
            classify(&mut policy, sink, frame, index, &mut keyframes).await?;
        }

        debug_assert_eq!(policy.keyframe_count(), keyframes.len() as u64);

        info!(
            total_frames_analyzed = index,
            total_keyframes = policy.keyframe_count(),
            "keyframe extraction complete"
        );

        Ok(RunSummary {
            total_frames_analyzed: index,
            total_keyframes: policy.keyframe_count(),
            fps: rate.fps,
            fps_substituted: rate.substituted,
            max_frames_interval: interval,
            keyframes,
        })
    }
}

async fn classify<K>(
    policy: &mut SelectionPolicy,
    sink: &mut K,
    frame: Frame,
    index: u64,
    keyframes: &mut Vec<KeyframeRecord>,
) -> Result<(), EngineError>
where
    K: OutputSink + ?Sized,
{
    let decision = policy.observe(index, frame.to_gray())?;
    if !decision.is_keyframe() {
        return Ok(());
    }

    let identifier = keyframe_identifier(keyframes.len() as u64);
    sink.persist(&frame, &identifier)
        .await
        .map_err(|source| EngineError::Write {
            identifier: identifier.clone(),
            source,
        })?;

    info!(index, identifier, reason = %decision, "keyframe saved");
    keyframes.push(KeyframeRecord {
        index,
        reason: decision,
        identifier,
    });
    Ok(())
}
