use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// What the decoder needs to know about the first video stream of a file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoProbe {
    /// Displayed size: the stored size with any 90/270 degree rotation applied,
    /// which is what ffmpeg's default autorotation writes to the pipe.
    pub width: u32,
    pub height: u32,
    /// Reported frame rate. 0.0 when ffprobe gives none or an unparsable one.
    pub fps: f64,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    #[serde(default)]
    side_data_list: Vec<FfprobeSideData>,
    #[serde(default)]
    tags: FfprobeTags,
}

#[derive(Debug, Deserialize)]
struct FfprobeSideData {
    rotation: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeTags {
    /// Legacy rotation tag written by older muxers.
    rotate: Option<String>,
}

impl FfprobeStream {
    /// Display rotation in whole degrees, normalised to 0..360.
    fn rotation(&self) -> i64 {
        let degrees = self
            .side_data_list
            .iter()
            .find_map(|d| d.rotation)
            .or_else(|| {
                self.tags
                    .rotate
                    .as_deref()
                    .and_then(|r| r.trim().parse::<f64>().ok())
            })
            .filter(|d| d.is_finite())
            .unwrap_or(0.0);
        (degrees.round() as i64).rem_euclid(360)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("failed to run ffprobe: {0}")]
    Spawn(String),
    #[error("ffprobe failed: {0}")]
    Failed(String),
    #[error("failed to parse ffprobe output: {0}")]
    Parse(String),
    #[error("no video stream with known dimensions")]
    NoVideoStream,
}

/// Run ffprobe on the first video stream of `path`.
pub async fn probe_video(ffprobe: &str, path: &Path) -> Result<VideoProbe, ProbeError> {
    let output = Command::new(ffprobe)
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-select_streams",
            "v:0",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| ProbeError::Spawn(e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ProbeError::Failed(format!("{} {}", output.status, stderr.trim())));
    }

    let probe = parse_probe_output(&output.stdout)?;
    debug!(
        path = path.display().to_string(),
        width = probe.width,
        height = probe.height,
        fps = probe.fps,
        "probed video"
    );
    Ok(probe)
}

fn parse_probe_output(json: &[u8]) -> Result<VideoProbe, ProbeError> {
    let parsed: FfprobeOutput =
        serde_json::from_slice(json).map_err(|e| ProbeError::Parse(e.to_string()))?;
    let stream = parsed.streams.first().ok_or(ProbeError::NoVideoStream)?;
    let (Some(width), Some(height)) = (stream.width, stream.height) else {
        return Err(ProbeError::NoVideoStream);
    };
    if width == 0 || height == 0 {
        return Err(ProbeError::NoVideoStream);
    }
    let (width, height) = match stream.rotation() {
        90 | 270 => (height, width),
        _ => (width, height),
    };

    let fps = parse_frame_rate(stream.r_frame_rate.as_deref())
        .or_else(|| parse_frame_rate(stream.avg_frame_rate.as_deref()))
        .unwrap_or(0.0);

    Ok(VideoProbe { width, height, fps })
}

/// Parse a rate like "30000/1001" or "25". "0/0" and garbage yield `None`.
pub fn parse_frame_rate(rate: Option<&str>) -> Option<f64> {
    let rate = rate?;
    let value = match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => rate.trim().parse().ok()?,
    };
    (value.is_finite() && value > 0.0).then_some(value)
}
