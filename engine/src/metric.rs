use image::GrayImage;

/// Dissimilarity score between two equally sized grayscale frames.
///
/// Implementations must be pure: the same pair of inputs always yields the
/// same score.
pub trait DifferenceMetric: Send + Sync {
    fn score(&self, current: &GrayImage, previous: &GrayImage) -> Result<f64, MetricError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}

/// Mean absolute per-pixel difference, in the 0-255 range of 8-bit luma.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanAbsDiff;

impl DifferenceMetric for MeanAbsDiff {
    fn score(&self, current: &GrayImage, previous: &GrayImage) -> Result<f64, MetricError> {
        mean_abs_diff(current, previous)
    }

    fn name(&self) -> &str {
        "mean-abs-diff"
    }
}

/// Mean of `|a - b|` over all pixels. Empty frames score 0.
pub fn mean_abs_diff(a: &GrayImage, b: &GrayImage) -> Result<f64, MetricError> {
    if a.dimensions() != b.dimensions() {
        return Err(MetricError::DimensionMismatch {
            left: a.dimensions(),
            right: b.dimensions(),
        });
    }
    let pixels = a.as_raw().len();
    if pixels == 0 {
        return Ok(0.0);
    }
    let total: u64 = a
        .as_raw()
        .iter()
        .zip(b.as_raw())
        .map(|(&x, &y)| x.abs_diff(y) as u64)
        .sum();
    Ok(total as f64 / pixels as f64)
}

#[derive(Debug, thiserror::Error)]
pub enum MetricError {
    #[error("frame dimensions differ: {left:?} vs {right:?}")]
    DimensionMismatch { left: (u32, u32), right: (u32, u32) },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(w: u32, h: u32, value: u8) -> GrayImage {
        GrayImage::from_pixel(w, h, image::Luma([value]))
    }

    #[test]
    fn identical_frames_score_zero() {
        let a = filled(16, 9, 128);
        assert_eq!(mean_abs_diff(&a, &a.clone()).unwrap(), 0.0);
    }

    #[test]
    fn uniform_shift_scores_the_shift() {
        let a = filled(8, 8, 100);
        let b = filled(8, 8, 150);
        assert_eq!(mean_abs_diff(&a, &b).unwrap(), 50.0);
        assert_eq!(mean_abs_diff(&b, &a).unwrap(), 50.0);
    }

    #[test]
    fn extremes_score_255() {
        assert_eq!(
            mean_abs_diff(&filled(4, 4, 0), &filled(4, 4, 255)).unwrap(),
            255.0
        );
    }

    #[test]
    fn partial_change_is_averaged() {
        let a = filled(2, 2, 0);
        let mut b = a.clone();
        b.put_pixel(0, 0, image::Luma([200]));
        assert_eq!(mean_abs_diff(&a, &b).unwrap(), 50.0);
    }

    #[test]
    fn mismatched_dimensions_fail() {
        let err = mean_abs_diff(&filled(4, 4, 0), &filled(4, 5, 0)).unwrap_err();
        assert!(matches!(
            err,
            MetricError::DimensionMismatch {
                left: (4, 4),
                right: (4, 5)
            }
        ));
    }

    #[test]
    fn deterministic() {
        let a = GrayImage::from_fn(32, 32, |x, y| image::Luma([(x * 7 + y * 3) as u8]));
        let b = GrayImage::from_fn(32, 32, |x, y| image::Luma([(x * 5 + y * 11) as u8]));
        let metric = MeanAbsDiff;
        let first = metric.score(&a, &b).unwrap();
        for _ in 0..5 {
            assert_eq!(metric.score(&a, &b).unwrap(), first);
        }
    }
}
