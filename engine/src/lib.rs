//! Keyframe selection engine.
//!
//! A single sequential pass over a decoded frame stream. Every frame is
//! compared with the one right before it; a frame is kept when the mean
//! absolute difference exceeds the threshold, or when too many frames have
//! gone by since the previous keyframe. Frame 0 is always kept.

pub mod engine;
pub mod error;
pub mod fps;
pub mod io;
pub mod metric;
pub mod selection;

pub use engine::{Engine, KeyframeRecord, RunConfig, RunSummary};
pub use error::{EngineError, SinkError, SourceError};
pub use io::{FrameSource, OutputSink};
pub use metric::{DifferenceMetric, MeanAbsDiff, MetricError};
pub use selection::{SelectionDecision, SelectionPolicy};
