use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};

/// The pixels carried by a decoded frame: single-channel luma or packed RGB.
#[derive(Debug, Clone)]
pub enum FramePixels {
    /// One 8-bit luma sample per pixel.
    Luma(GrayImage),
    /// Three 8-bit samples per pixel, R-G-B order.
    Rgb(RgbImage),
}

/// A decoded video frame.
///
/// `index` is the zero-based position of the frame in its stream. The pixel
/// buffer is owned by the frame; the engine converts it to grayscale for
/// comparison and hands the frame itself to the output sink unchanged.
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: u64,
    pub pixels: FramePixels,
}

impl Frame {
    /// Build a luma frame from a raw `width * height` byte buffer.
    pub fn luma(index: u64, width: u32, height: u32, data: Vec<u8>) -> Result<Self, FrameError> {
        let got = data.len();
        let image = GrayImage::from_raw(width, height, data).ok_or(FrameError::PayloadSize {
            width,
            height,
            channels: 1,
            got,
        })?;
        Ok(Self {
            index,
            pixels: FramePixels::Luma(image),
        })
    }

    /// Build an RGB frame from a raw `width * height * 3` byte buffer.
    pub fn rgb(index: u64, width: u32, height: u32, data: Vec<u8>) -> Result<Self, FrameError> {
        let got = data.len();
        let image = RgbImage::from_raw(width, height, data).ok_or(FrameError::PayloadSize {
            width,
            height,
            channels: 3,
            got,
        })?;
        Ok(Self {
            index,
            pixels: FramePixels::Rgb(image),
        })
    }

    /// Wrap an already decoded image. Single-channel images stay luma,
    /// everything else is flattened to 8-bit RGB.
    pub fn from_image(index: u64, image: DynamicImage) -> Self {
        let pixels = match image {
            DynamicImage::ImageLuma8(gray) => FramePixels::Luma(gray),
            other => FramePixels::Rgb(other.to_rgb8()),
        };
        Self { index, pixels }
    }

    pub fn width(&self) -> u32 {
        match &self.pixels {
            FramePixels::Luma(img) => img.width(),
            FramePixels::Rgb(img) => img.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match &self.pixels {
            FramePixels::Luma(img) => img.height(),
            FramePixels::Rgb(img) => img.height(),
        }
    }

    /// Grayscale version of this frame using BT.601 luma weights.
    pub fn to_gray(&self) -> GrayImage {
        match &self.pixels {
            FramePixels::Luma(img) => img.clone(),
            FramePixels::Rgb(img) => {
                GrayImage::from_fn(img.width(), img.height(), |x, y| bt601(img.get_pixel(x, y)))
            }
        }
    }

    /// The frame as a [`DynamicImage`], for encoding by sinks.
    pub fn to_image(&self) -> DynamicImage {
        match &self.pixels {
            FramePixels::Luma(img) => DynamicImage::ImageLuma8(img.clone()),
            FramePixels::Rgb(img) => DynamicImage::ImageRgb8(img.clone()),
        }
    }
}

/// Y = 0.299 R + 0.587 G + 0.114 B, rounded to nearest.
fn bt601(px: &Rgb<u8>) -> Luma<u8> {
    let [r, g, b] = px.0;
    let y = (r as u32 * 299 + g as u32 * 587 + b as u32 * 114 + 500) / 1000;
    Luma([y as u8])
}

/// Identifier of the `sequence`-th keyframe of a run, in emission order.
/// e.g. "keyframe_0000", "keyframe_0001", ...
pub fn keyframe_identifier(sequence: u64) -> String {
    format!("keyframe_{sequence:04}")
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame payload is {got} bytes, expected {width}x{height}x{channels}")]
    PayloadSize {
        width: u32,
        height: u32,
        channels: u8,
        got: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn luma_frame_dimensions() {
        let frame = Frame::luma(7, 4, 2, vec![10; 8]).unwrap();
        assert_eq!(frame.index, 7);
        assert_eq!(frame.width(), 4);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.to_gray().as_raw(), &vec![10u8; 8]);
    }

    #[test]
    fn payload_size_checked() {
        let err = Frame::rgb(0, 4, 4, vec![0; 47]).unwrap_err();
        assert!(matches!(
            err,
            FrameError::PayloadSize {
                channels: 3,
                got: 47,
                ..
            }
        ));
        assert!(Frame::luma(0, 4, 4, vec![0; 15]).is_err());
    }

    #[test]
    fn rgb_to_gray_uses_bt601() {
        // pure red, pure green, pure blue, white
        let data = vec![255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255];
        let frame = Frame::rgb(0, 4, 1, data).unwrap();
        let gray = frame.to_gray();
        assert_eq!(gray.as_raw(), &vec![76, 150, 29, 255]);
    }

    #[test]
    fn from_image_keeps_luma() {
        let frame = Frame::from_image(3, DynamicImage::ImageLuma8(GrayImage::new(2, 2)));
        assert!(matches!(frame.pixels, FramePixels::Luma(_)));

        let frame = Frame::from_image(3, DynamicImage::ImageRgba8(image::RgbaImage::new(2, 2)));
        assert!(matches!(frame.pixels, FramePixels::Rgb(_)));
        assert_eq!(frame.index, 3);
    }

    #[test]
    fn identifiers_are_zero_padded() {
        assert_eq!(keyframe_identifier(0), "keyframe_0000");
        assert_eq!(keyframe_identifier(42), "keyframe_0042");
        assert_eq!(keyframe_identifier(12345), "keyframe_12345");
    }
}
