pub mod ffmpeg;
pub mod images;

pub use ffmpeg::FfmpegSource;
pub use images::ImageDirSource;
