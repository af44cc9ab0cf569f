use async_trait::async_trait;
use keyframe_common::frame::Frame;
use keyframe_engine::{FrameSource, SourceError};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::probe::probe_video;

/// Frames of a video file, decoded by an ffmpeg subprocess.
///
/// ffmpeg writes raw `rgb24` (or `gray`) frames to stdout. A reader task cuts
/// the pipe into whole frames and feeds them through a bounded channel, so
/// decoding runs ahead of classification by at most `queue_depth` frames
/// while keeping stream order.
pub struct FfmpegSource {
    path: PathBuf,
    name: String,
    ffmpeg: String,
    ffprobe: String,
    color: bool,
    queue_depth: usize,
    fps: f64,
    child: Option<Child>,
    stderr: Option<JoinHandle<String>>,
    frames: Option<mpsc::Receiver<Result<Frame, SourceError>>>,
}

impl FfmpegSource {
    pub fn new(
        path: &Path,
        ffmpeg: &str,
        ffprobe: &str,
        color: bool,
        queue_depth: usize,
    ) -> Self {
        Self {
            path: path.to_path_buf(),
            name: path.display().to_string(),
            ffmpeg: ffmpeg.to_string(),
            ffprobe: ffprobe.to_string(),
            color,
            queue_depth: queue_depth.max(1),
            fps: 0.0,
            child: None,
            stderr: None,
            frames: None,
        }
    }

    /// Reap ffmpeg after its output is exhausted. A non-zero exit becomes a read error.
    async fn finish(&mut self) -> Result<(), SourceError> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let status = child
            .wait()
            .await
            .map_err(|e| SourceError::Read(format!("failed to wait for ffmpeg: {e}")))?;
        let stderr = match self.stderr.take() {
            Some(handle) => handle.await.unwrap_or_default(),
            None => String::new(),
        };
        if !status.success() {
            error!(stderr = %stderr, path = self.name, "ffmpeg exited with error");
            return Err(SourceError::Read(format!(
                "ffmpeg exited with {status}: {}",
                stderr.trim()
            )));
        }
        debug!(path = self.name, "ffmpeg decoder finished");
        Ok(())
    }
}

#[async_trait]
impl FrameSource for FfmpegSource {
    async fn open(&mut self) -> Result<(), SourceError> {
        if !self.path.is_file() {
            return Err(SourceError::Open(format!("no such file: {}", self.name)));
        }
        let probe = probe_video(&self.ffprobe, &self.path)
            .await
            .map_err(|e| SourceError::Open(e.to_string()))?;
        self.fps = probe.fps;

        let pix_fmt = if self.color { "rgb24" } else { "gray" };
        // Autorotation stays on; the probed size is already the displayed one.
        let mut child = Command::new(&self.ffmpeg)
            .args(["-v", "error", "-nostdin", "-i"])
            .arg(&self.path)
            .args([
                "-map", "0:v:0",
                "-vsync", "0",
                "-f", "rawvideo",
                "-pix_fmt", pix_fmt,
                "pipe:1",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SourceError::Open(format!("failed to spawn ffmpeg: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SourceError::Open("could not get ffmpeg stdout handle".into()))?;

        // Drain stderr alongside stdout; a full pipe would block ffmpeg.
        let stderr = child.stderr.take().map(|mut pipe| {
            tokio::spawn(async move {
                let mut text = String::new();
                let _ = pipe.read_to_string(&mut text).await;
                text
            })
        });

        let (tx, rx) = mpsc::channel(self.queue_depth);
        tokio::spawn(read_frames(stdout, probe.width, probe.height, self.color, tx));

        debug!(
            path = self.name,
            width = probe.width,
            height = probe.height,
            pix_fmt,
            queue_depth = self.queue_depth,
            "ffmpeg decoder started"
        );

        self.child = Some(child);
        self.stderr = stderr;
        self.frames = Some(rx);
        Ok(())
    }

    fn frame_rate(&self) -> f64 {
        self.fps
    }

    async fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        let Some(frames) = self.frames.as_mut() else {
            return Err(SourceError::Read("source not opened".into()));
        };
        match frames.recv().await {
            Some(Ok(frame)) => Ok(Some(frame)),
            Some(Err(e)) => Err(e),
            None => {
                self.frames = None;
                self.finish().await?;
                Ok(None)
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Decode stage: split the raw pipe into frames until EOF or the consumer goes away.
async fn read_frames<R>(
    mut reader: R,
    width: u32,
    height: u32,
    color: bool,
    tx: mpsc::Sender<Result<Frame, SourceError>>,
) where
    R: AsyncRead + Unpin,
{
    let channels = if color { 3 } else { 1 };
    let frame_len = width as usize * height as usize * channels;
    let mut index: u64 = 0;

    loop {
        let mut buf = vec![0u8; frame_len];
        let filled = match fill(&mut reader, &mut buf).await {
            Ok(n) => n,
            Err(e) => {
                let _ = tx.send(Err(SourceError::Read(e.to_string()))).await;
                break;
            }
        };
        if filled < frame_len {
            if filled > 0 {
                warn!(
                    index,
                    bytes = filled,
                    expected = frame_len,
                    "truncated frame at end of decode, dropping it"
                );
            }
            break;
        }

        let frame = if color {
            Frame::rgb(index, width, height, buf)
        } else {
            Frame::luma(index, width, height, buf)
        }
        .map_err(|e| SourceError::Read(e.to_string()));

        if tx.send(frame).await.is_err() {
            // Consumer stopped early; dropping stdout lets ffmpeg exit.
            debug!(index, "frame consumer gone, stopping decode");
            break;
        }
        index += 1;
    }
}

/// Read until `buf` is full or the reader reaches EOF. Returns the bytes read.
async fn fill<R>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]).await? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

/// Check whether ffmpeg is available on PATH. Logs a warning if not found.
pub async fn check_ffmpeg_available(ffmpeg: &str) {
    match Command::new(ffmpeg).arg("-version").output().await {
        Ok(out) if out.status.success() => {
            debug!("ffmpeg is available");
        }
        Ok(_) => {
            warn!("ffmpeg returned non-zero for -version; decoding may fail");
        }
        Err(e) => {
            warn!(
                error = %e,
                "ffmpeg not found on PATH; video sources will fail to open. \
                 Install ffmpeg or set source.ffmpeg_path."
            );
        }
    }
}
