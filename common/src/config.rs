use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub output: OutputConfig,
    /// Required only when `output.kind = "s3"`.
    pub s3: Option<S3Config>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectionConfig {
    /// Mean absolute pixel difference (0-255) above which a frame is a scene change.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Longest stretch of video, in seconds, allowed between two keyframes.
    #[serde(default = "default_max_time_interval_secs")]
    pub max_time_interval_secs: f64,
}

/// Where frames come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// A single video file decoded through ffmpeg.
    Video,
    /// Every video file in a directory, one run per file.
    Batch,
    /// A directory of still images treated as consecutive frames.
    Images,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_mode")]
    pub mode: SourceMode,
    #[serde(default = "default_source_path")]
    pub path: PathBuf,
    /// Reported frame rate for image directories. Zero means unknown.
    #[serde(default)]
    pub fps: f64,
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: String,
    /// Decode rgb24 when true, gray otherwise.
    #[serde(default = "default_color")]
    pub color: bool,
    #[serde(default = "default_decode_queue_depth")]
    pub decode_queue_depth: usize,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Local,
    S3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpg,
    Png,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpg => "jpg",
            OutputFormat::Png => "png",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            OutputFormat::Jpg => "image/jpeg",
            OutputFormat::Png => "image/png",
        }
    }

    pub fn image_format(self) -> image::ImageFormat {
        match self {
            OutputFormat::Jpg => image::ImageFormat::Jpeg,
            OutputFormat::Png => image::ImageFormat::Png,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_kind")]
    pub kind: OutputKind,
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_image_format")]
    pub image_format: OutputFormat,
    #[serde(default = "default_summary_file")]
    pub summary_file: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    #[serde(default = "default_s3_bucket")]
    pub bucket: String,
    #[serde(default = "default_s3_prefix")]
    pub prefix: String,
    #[serde(default = "default_region")]
    pub region: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            max_time_interval_secs: default_max_time_interval_secs(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            path: default_source_path(),
            fps: 0.0,
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            color: default_color(),
            decode_queue_depth: default_decode_queue_depth(),
            extensions: default_extensions(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            kind: default_output_kind(),
            dir: default_output_dir(),
            image_format: default_image_format(),
            summary_file: default_summary_file(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        Self::parse(&content)
    }

    /// Like [`Config::load`], but a missing file yields the built-in defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply `INPUT_DIR` / `OUTPUT_DIR` overrides as set by container deployments.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(
            std::env::var_os("INPUT_DIR").map(PathBuf::from),
            std::env::var_os("OUTPUT_DIR").map(PathBuf::from),
        );
    }

    fn apply_overrides(&mut self, input: Option<PathBuf>, output: Option<PathBuf>) {
        if let Some(input) = input {
            info!(path = input.display().to_string(), "INPUT_DIR override");
            self.source.path = input;
        }
        if let Some(output) = output {
            info!(path = output.display().to_string(), "OUTPUT_DIR override");
            self.output.dir = output;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.selection.threshold;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "selection.threshold must be a non-negative number, got {threshold}"
            )));
        }
        let interval = self.selection.max_time_interval_secs;
        if !interval.is_finite() || interval < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "selection.max_time_interval_secs must be a non-negative number, got {interval}"
            )));
        }
        if self.source.decode_queue_depth == 0 {
            return Err(ConfigError::Invalid(
                "source.decode_queue_depth must be at least 1".into(),
            ));
        }
        if self.output.kind == OutputKind::S3 && self.s3.is_none() {
            return Err(ConfigError::Invalid(
                "output.kind = \"s3\" requires an [s3] section".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// Default value functions
fn default_threshold() -> f64 {
    30.0
}
fn default_max_time_interval_secs() -> f64 {
    5.0
}
fn default_mode() -> SourceMode {
    SourceMode::Video
}
fn default_source_path() -> PathBuf {
    PathBuf::from("input.mp4")
}
fn default_ffmpeg_path() -> String {
    "ffmpeg".into()
}
fn default_ffprobe_path() -> String {
    "ffprobe".into()
}
fn default_color() -> bool {
    true
}
fn default_decode_queue_depth() -> usize {
    8
}
fn default_extensions() -> Vec<String> {
    vec!["mp4".into(), "mov".into(), "avi".into()]
}
fn default_output_kind() -> OutputKind {
    OutputKind::Local
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("keyframes")
}
fn default_image_format() -> OutputFormat {
    OutputFormat::Jpg
}
fn default_summary_file() -> bool {
    true
}
fn default_s3_bucket() -> String {
    "keyframes".into()
}
fn default_s3_prefix() -> String {
    "keyframes/".into()
}
fn default_region() -> String {
    "us-east-1".into()
}
fn default_log_level() -> String {
    "info".into()
}
