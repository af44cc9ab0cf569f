use crate::metric::MetricError;

/// Failure reported by a [`crate::FrameSource`].
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to open frame source: {0}")]
    Open(String),
    #[error("failed to read frame: {0}")]
    Read(String),
}

/// Failure reported by an [`crate::OutputSink`].
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("failed to write {identifier}: {reason}")]
    Write { identifier: String, reason: String },
}

/// Terminal outcome of an engine run. None of these are retried.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("frame source could not be opened: {0}")]
    SourceOpen(#[source] SourceError),
    #[error("frame source yielded no frames")]
    EmptyStream,
    #[error("first frame could not be read: {0}")]
    SourceRead(#[source] SourceError),
    #[error("keyframe {identifier} could not be persisted: {source}")]
    Write {
        identifier: String,
        #[source]
        source: SinkError,
    },
    #[error(transparent)]
    DimensionMismatch(#[from] MetricError),
}
