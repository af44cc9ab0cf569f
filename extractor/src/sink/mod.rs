pub mod local;
pub mod s3;

use keyframe_common::config::OutputFormat;
use keyframe_common::frame::Frame;
use keyframe_engine::OutputSink;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::error::ExtractorError;
use crate::keys::summary_key;
use crate::storage::S3Storage;

pub use local::LocalDirSink;
pub use s3::S3Sink;

/// Encode a frame into an in-memory image file.
pub fn encode(frame: &Frame, format: OutputFormat) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    frame
        .to_image()
        .write_to(&mut Cursor::new(&mut buf), format.image_format())?;
    Ok(buf)
}

/// Where a whole invocation writes; each run gets its own sink under it.
pub enum OutputTarget {
    Local { root: PathBuf },
    S3 { storage: Arc<S3Storage> },
}

impl OutputTarget {
    /// Sink for one run. `location` names a per-video sub-folder, if any.
    pub fn sink(&self, location: Option<&str>, format: OutputFormat) -> Box<dyn OutputSink> {
        match self {
            OutputTarget::Local { root } => {
                let dir = match location {
                    Some(loc) => root.join(loc),
                    None => root.clone(),
                };
                Box::new(LocalDirSink::new(dir, format))
            }
            OutputTarget::S3 { storage } => Box::new(S3Sink::new(
                Arc::clone(storage),
                location.map(str::to_string),
                format,
            )),
        }
    }

    /// Store `summary.json` next to the run's keyframes.
    pub async fn write_summary(
        &self,
        location: Option<&str>,
        json: Vec<u8>,
    ) -> Result<(), ExtractorError> {
        match self {
            OutputTarget::Local { root } => {
                let dir = match location {
                    Some(loc) => root.join(loc),
                    None => root.clone(),
                };
                tokio::fs::create_dir_all(&dir).await?;
                let path = dir.join("summary.json");
                tokio::fs::write(&path, json).await?;
                info!(path = path.display().to_string(), "run summary written");
            }
            OutputTarget::S3 { storage } => {
                let key = summary_key(storage.prefix(), location);
                storage.put_object(&key, json, "application/json").await?;
                info!(key, bucket = storage.bucket(), "run summary uploaded");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_gray_and_rgb() {
        let gray = Frame::luma(0, 4, 4, vec![128; 16]).unwrap();
        let jpg = encode(&gray, OutputFormat::Jpg).unwrap();
        assert_eq!(&jpg[..2], &[0xFF, 0xD8]);

        let rgb = Frame::rgb(0, 4, 4, vec![200; 48]).unwrap();
        let png = encode(&rgb, OutputFormat::Png).unwrap();
        assert_eq!(&png[1..4], b"PNG");
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 4));
    }

    #[tokio::test]
    async fn local_summary_lands_in_location() {
        let dir = tempfile::tempdir().unwrap();
        let target = OutputTarget::Local {
            root: dir.path().to_path_buf(),
        };
        target
            .write_summary(Some("clip"), b"{}".to_vec())
            .await
            .unwrap();
        let written = std::fs::read(dir.path().join("clip").join("summary.json")).unwrap();
        assert_eq!(written, b"{}");
    }
}
