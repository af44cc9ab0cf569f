use keyframe_common::config::ConfigError;
use keyframe_engine::EngineError;

use crate::storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum ExtractorError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize run summary: {0}")]
    Summary(#[from] serde_json::Error),
    #[error("{failed} of {total} videos failed")]
    BatchFailed { failed: usize, total: usize },
}
