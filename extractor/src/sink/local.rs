use async_trait::async_trait;
use keyframe_common::config::OutputFormat;
use keyframe_common::frame::Frame;
use keyframe_engine::{OutputSink, SinkError};
use std::path::PathBuf;
use tracing::{debug, info};

use super::encode;

/// Writes keyframes as `<identifier>.<ext>` files into one directory.
pub struct LocalDirSink {
    dir: PathBuf,
    name: String,
    format: OutputFormat,
    dir_ready: bool,
}

impl LocalDirSink {
    pub fn new(dir: PathBuf, format: OutputFormat) -> Self {
        Self {
            name: dir.display().to_string(),
            dir,
            format,
            dir_ready: false,
        }
    }
}

#[async_trait]
impl OutputSink for LocalDirSink {
    async fn persist(&mut self, frame: &Frame, identifier: &str) -> Result<(), SinkError> {
        let write_err = |reason: String| SinkError::Write {
            identifier: identifier.to_string(),
            reason,
        };

        if !self.dir_ready {
            if !self.dir.exists() {
                info!(dir = self.name, "creating output folder");
            }
            tokio::fs::create_dir_all(&self.dir)
                .await
                .map_err(|e| write_err(format!("{}: {e}", self.name)))?;
            self.dir_ready = true;
        }

        let bytes = encode(frame, self.format).map_err(|e| write_err(e.to_string()))?;
        let path = self
            .dir
            .join(format!("{identifier}.{}", self.format.extension()));
        let size = bytes.len();
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| write_err(format!("{}: {e}", path.display())))?;

        debug!(path = path.display().to_string(), size, "keyframe written");
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_into_created_folder() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("out").join("clip");
        let mut sink = LocalDirSink::new(dir.clone(), OutputFormat::Png);

        let frame = Frame::luma(0, 2, 2, vec![1, 2, 3, 4]).unwrap();
        sink.persist(&frame, "keyframe_0000").await.unwrap();

        let saved = image::open(dir.join("keyframe_0000.png")).unwrap().to_luma8();
        assert_eq!(saved.as_raw(), &vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn unwritable_location_is_a_write_error() {
        let root = tempfile::tempdir().unwrap();
        let blocker = root.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();

        let mut sink = LocalDirSink::new(blocker.join("sub"), OutputFormat::Jpg);
        let frame = Frame::luma(0, 2, 2, vec![0; 4]).unwrap();
        let err = sink.persist(&frame, "keyframe_0000").await.unwrap_err();
        let SinkError::Write { identifier, .. } = err;
        assert_eq!(identifier, "keyframe_0000");
    }
}
