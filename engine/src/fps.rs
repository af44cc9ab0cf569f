use tracing::warn;

/// Sampling rate used when the stream does not report a usable one.
pub const DEFAULT_FPS: f64 = 25.0;

/// A frame rate that is guaranteed finite and strictly positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedFrameRate {
    pub fps: f64,
    /// True when the reported rate was unusable and [`DEFAULT_FPS`] was substituted.
    pub substituted: bool,
}

/// Normalize a reported frame rate. Zero, negative, NaN and infinite rates
/// are replaced by [`DEFAULT_FPS`] with a warning; this is never an error.
pub fn resolve_frame_rate(reported: f64) -> ResolvedFrameRate {
    if reported.is_finite() && reported > 0.0 {
        return ResolvedFrameRate {
            fps: reported,
            substituted: false,
        };
    }
    warn!(
        reported,
        default = DEFAULT_FPS,
        "unusable frame rate reported, falling back to default"
    );
    ResolvedFrameRate {
        fps: DEFAULT_FPS,
        substituted: true,
    }
}

/// Number of frames that may pass without a keyframe:
/// `floor(max_time_interval_secs * fps)`, never less than 1.
pub fn max_frames_interval(max_time_interval_secs: f64, fps: f64) -> u64 {
    let frames = (max_time_interval_secs * fps).floor();
    if frames.is_nan() || frames < 1.0 {
        return 1;
    }
    frames as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_rate_passes_through() {
        let rate = resolve_frame_rate(29.97);
        assert_eq!(rate.fps, 29.97);
        assert!(!rate.substituted);
    }

    #[test]
    fn unusable_rates_default_to_25() {
        for reported in [0.0, -0.0, -30.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let rate = resolve_frame_rate(reported);
            assert_eq!(rate.fps, DEFAULT_FPS, "reported {reported}");
            assert!(rate.substituted);
        }
    }

    #[test]
    fn interval_is_floored() {
        assert_eq!(max_frames_interval(5.0, 25.0), 125);
        assert_eq!(max_frames_interval(1.0, 5.0), 5);
        assert_eq!(max_frames_interval(5.0, 29.97), 149);
    }

    #[test]
    fn interval_clamped_to_one() {
        assert_eq!(max_frames_interval(0.0, 25.0), 1);
        assert_eq!(max_frames_interval(0.01, 25.0), 1);
        assert_eq!(max_frames_interval(-3.0, 25.0), 1);
        assert_eq!(max_frames_interval(f64::NAN, 25.0), 1);
    }
}
