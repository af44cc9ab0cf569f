use async_trait::async_trait;
use keyframe_common::frame::Frame;
use keyframe_engine::{FrameSource, SourceError};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tracing::debug;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp"];

/// A directory of still images replayed as a frame stream, in filename order.
pub struct ImageDirSource {
    dir: PathBuf,
    name: String,
    fps: f64,
    pending: VecDeque<PathBuf>,
    next_index: u64,
    dimensions: Option<(u32, u32)>,
}

impl ImageDirSource {
    /// `fps` is reported as-is; an unusable value is resolved by the engine.
    pub fn new(dir: &Path, fps: f64) -> Self {
        Self {
            dir: dir.to_path_buf(),
            name: dir.display().to_string(),
            fps,
            pending: VecDeque::new(),
            next_index: 0,
            dimensions: None,
        }
    }
}

#[async_trait]
impl FrameSource for ImageDirSource {
    async fn open(&mut self) -> Result<(), SourceError> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| SourceError::Open(format!("{}: {e}", self.name)))?;

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SourceError::Open(format!("{}: {e}", self.name)))?
        {
            let path = entry.path();
            if path.is_file() && is_image(&path) {
                files.push(path);
            }
        }
        files.sort();

        debug!(dir = self.name, count = files.len(), "image frames discovered");
        self.pending = files.into();
        Ok(())
    }

    fn frame_rate(&self) -> f64 {
        self.fps
    }

    async fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        let Some(path) = self.pending.pop_front() else {
            return Ok(None);
        };

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| SourceError::Read(format!("{}: {e}", path.display())))?;
        let image = image::load_from_memory(&bytes)
            .map_err(|e| SourceError::Read(format!("{}: {e}", path.display())))?;

        let frame = Frame::from_image(self.next_index, image);
        let dims = (frame.width(), frame.height());
        match self.dimensions {
            None => self.dimensions = Some(dims),
            Some(expected) if expected != dims => {
                return Err(SourceError::Read(format!(
                    "{}: {}x{} differs from stream size {}x{}",
                    path.display(),
                    dims.0,
                    dims.1,
                    expected.0,
                    expected.1
                )));
            }
            Some(_) => {}
        }

        self.next_index += 1;
        Ok(Some(frame))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}
