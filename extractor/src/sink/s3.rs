use async_trait::async_trait;
use keyframe_common::config::OutputFormat;
use keyframe_common::frame::Frame;
use keyframe_engine::{OutputSink, SinkError};
use std::sync::Arc;

use super::encode;
use crate::keys::{folder_key, keyframe_key};
use crate::storage::S3Storage;

/// Uploads keyframes to `<prefix>[<location>/]<identifier>.<ext>`.
pub struct S3Sink {
    storage: Arc<S3Storage>,
    location: Option<String>,
    format: OutputFormat,
    name: String,
}

impl S3Sink {
    pub fn new(storage: Arc<S3Storage>, location: Option<String>, format: OutputFormat) -> Self {
        let name = format!(
            "s3://{}/{}",
            storage.bucket(),
            folder_key(storage.prefix(), location.as_deref())
        );
        Self {
            storage,
            location,
            format,
            name,
        }
    }
}

#[async_trait]
impl OutputSink for S3Sink {
    async fn persist(&mut self, frame: &Frame, identifier: &str) -> Result<(), SinkError> {
        let bytes = encode(frame, self.format).map_err(|e| SinkError::Write {
            identifier: identifier.to_string(),
            reason: e.to_string(),
        })?;
        let key = keyframe_key(
            self.storage.prefix(),
            self.location.as_deref(),
            identifier,
            self.format.extension(),
        );
        self.storage
            .put_object(&key, bytes, self.format.content_type())
            .await
            .map_err(|e| SinkError::Write {
                identifier: identifier.to_string(),
                reason: e.to_string(),
            })
    }

    fn name(&self) -> &str {
        &self.name
    }
}
