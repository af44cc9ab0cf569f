use async_trait::async_trait;
use keyframe_common::frame::Frame;

use crate::error::{SinkError, SourceError};

/// Supplier of decoded frames, in strictly increasing index order from 0.
#[async_trait]
pub trait FrameSource: Send {
    /// Establish the underlying stream. Called once, before anything else.
    async fn open(&mut self) -> Result<(), SourceError> {
        Ok(())
    }

    /// Frame rate as reported by the stream. May be zero, negative or NaN.
    fn frame_rate(&self) -> f64;

    /// Next frame, or `None` at end of stream.
    async fn next_frame(&mut self) -> Result<Option<Frame>, SourceError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}

/// Durable destination for selected keyframes.
#[async_trait]
pub trait OutputSink: Send {
    async fn persist(&mut self, frame: &Frame, identifier: &str) -> Result<(), SinkError>;

    fn name(&self) -> &str {
        "unnamed"
    }
}
