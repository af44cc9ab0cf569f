use std::fmt;

use image::GrayImage;
use serde::Serialize;
use tracing::debug;

use crate::metric::{DifferenceMetric, MeanAbsDiff, MetricError};

/// Outcome of classifying one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SelectionDecision {
    /// First frame of the stream, always kept.
    Initial,
    /// Difference to the previous frame exceeded the threshold.
    SceneChange { score: f64 },
    /// Nothing changed for `max_frames_interval` frames.
    TimeExceeded,
    NoSelection,
}

impl SelectionDecision {
    pub fn is_keyframe(&self) -> bool {
        !matches!(self, SelectionDecision::NoSelection)
    }
}

impl fmt::Display for SelectionDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionDecision::Initial => f.write_str("initial frame"),
            SelectionDecision::SceneChange { score } => write!(f, "scene change (diff {score:.2})"),
            SelectionDecision::TimeExceeded => f.write_str("time interval exceeded"),
            SelectionDecision::NoSelection => f.write_str("not selected"),
        }
    }
}

/// Pure decision rule. Scene change wins over the time fallback when both hold.
pub fn decide(score: f64, elapsed: u64, threshold: f64, max_frames_interval: u64) -> SelectionDecision {
    if score > threshold {
        SelectionDecision::SceneChange { score }
    } else if elapsed >= max_frames_interval {
        SelectionDecision::TimeExceeded
    } else {
        SelectionDecision::NoSelection
    }
}

/// Per-run mutable state, seeded from frame 0.
#[derive(Debug)]
struct SelectionState {
    /// Grayscale of the most recently seen frame, selected or not.
    previous_gray: GrayImage,
    last_keyframe_index: u64,
    keyframe_count: u64,
}

/// Streaming keyframe selector.
///
/// Feed frames in stream order through [`SelectionPolicy::observe`]. The
/// comparison baseline is always the immediately preceding frame, never the
/// last selected keyframe, so gradual drift below the threshold is only
/// caught by the time fallback.
pub struct SelectionPolicy<M = MeanAbsDiff> {
    state: Option<SelectionState>,
    threshold: f64,
    max_frames_interval: u64,
    metric: M,
}

impl SelectionPolicy<MeanAbsDiff> {
    pub fn new(threshold: f64, max_frames_interval: u64) -> Self {
        Self::with_metric(threshold, max_frames_interval, MeanAbsDiff)
    }
}

impl<M: DifferenceMetric> SelectionPolicy<M> {
    pub fn with_metric(threshold: f64, max_frames_interval: u64, metric: M) -> Self {
        Self {
            state: None,
            threshold,
            max_frames_interval: max_frames_interval.max(1),
            metric,
        }
    }

    /// Classify the frame at `index`, taking ownership of its grayscale buffer
    /// as the baseline for the next call.
    pub fn observe(&mut self, index: u64, gray: GrayImage) -> Result<SelectionDecision, MetricError> {
        let Some(state) = self.state.as_mut() else {
            debug!(index, "first frame, accepting unconditionally");
            self.state = Some(SelectionState {
                previous_gray: gray,
                last_keyframe_index: index,
                keyframe_count: 1,
            });
            return Ok(SelectionDecision::Initial);
        };

        let score = self.metric.score(&gray, &state.previous_gray)?;
        let elapsed = index.saturating_sub(state.last_keyframe_index);
        let decision = decide(score, elapsed, self.threshold, self.max_frames_interval);

        debug!(
            index,
            score = format!("{score:.4}"),
            threshold = self.threshold,
            elapsed,
            max_frames_interval = self.max_frames_interval,
            selected = decision.is_keyframe(),
            metric = self.metric.name(),
            "frame comparison"
        );

        if decision.is_keyframe() {
            state.last_keyframe_index = index;
            state.keyframe_count += 1;
        }
        state.previous_gray = gray;
        Ok(decision)
    }

    pub fn keyframe_count(&self) -> u64 {
        self.state.as_ref().map_or(0, |s| s.keyframe_count)
    }

    pub fn last_keyframe_index(&self) -> Option<u64> {
        self.state.as_ref().map(|s| s.last_keyframe_index)
    }

    pub fn max_frames_interval(&self) -> u64 {
        self.max_frames_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(value: u8) -> GrayImage {
        GrayImage::from_pixel(8, 8, image::Luma([value]))
    }

    #[test]
    fn first_frame_is_initial() {
        let mut policy = SelectionPolicy::new(30.0, 5);
        assert_eq!(policy.keyframe_count(), 0);
        assert_eq!(policy.observe(0, filled(0)).unwrap(), SelectionDecision::Initial);
        assert_eq!(policy.keyframe_count(), 1);
        assert_eq!(policy.last_keyframe_index(), Some(0));
    }

    #[test]
    fn scene_change_above_threshold() {
        let mut policy = SelectionPolicy::new(30.0, 100);
        policy.observe(0, filled(0)).unwrap();
        assert_eq!(policy.observe(1, filled(30)).unwrap(), SelectionDecision::NoSelection);
        assert_eq!(
            policy.observe(2, filled(61)).unwrap(),
            SelectionDecision::SceneChange { score: 31.0 }
        );
        assert_eq!(policy.last_keyframe_index(), Some(2));
    }

    #[test]
    fn score_equal_to_threshold_is_not_a_change() {
        assert_eq!(decide(30.0, 1, 30.0, 10), SelectionDecision::NoSelection);
    }

    #[test]
    fn time_fallback_fires_at_boundary() {
        let mut policy = SelectionPolicy::new(30.0, 3);
        policy.observe(0, filled(0)).unwrap();
        assert!(!policy.observe(1, filled(0)).unwrap().is_keyframe());
        assert!(!policy.observe(2, filled(0)).unwrap().is_keyframe());
        assert_eq!(policy.observe(3, filled(0)).unwrap(), SelectionDecision::TimeExceeded);
        assert_eq!(policy.last_keyframe_index(), Some(3));
    }

    #[test]
    fn scene_change_wins_over_time() {
        assert_eq!(
            decide(99.0, 10, 30.0, 5),
            SelectionDecision::SceneChange { score: 99.0 }
        );
    }

    #[test]
    fn baseline_is_previous_frame_not_last_keyframe() {
        // Each step moves by 20 with threshold 30: cumulative drift is large
        // but no single step is a scene change.
        let mut policy = SelectionPolicy::new(30.0, 1000);
        policy.observe(0, filled(0)).unwrap();
        for i in 1..=10u64 {
            let decision = policy.observe(i, filled((i * 20) as u8)).unwrap();
            assert_eq!(decision, SelectionDecision::NoSelection, "frame {i}");
        }
        assert_eq!(policy.keyframe_count(), 1);
    }

    #[test]
    fn interval_of_zero_is_clamped() {
        let mut policy = SelectionPolicy::new(30.0, 0);
        assert_eq!(policy.max_frames_interval(), 1);
        policy.observe(0, filled(0)).unwrap();
        assert_eq!(policy.observe(1, filled(0)).unwrap(), SelectionDecision::TimeExceeded);
    }

    #[test]
    fn mismatched_frame_is_an_error() {
        let mut policy = SelectionPolicy::new(30.0, 5);
        policy.observe(0, filled(0)).unwrap();
        let err = policy.observe(1, GrayImage::new(4, 4)).unwrap_err();
        assert!(matches!(err, MetricError::DimensionMismatch { .. }));
    }

    #[test]
    fn display_reasons() {
        assert_eq!(SelectionDecision::Initial.to_string(), "initial frame");
        assert_eq!(
            SelectionDecision::SceneChange { score: 42.123 }.to_string(),
            "scene change (diff 42.12)"
        );
        assert_eq!(SelectionDecision::TimeExceeded.to_string(), "time interval exceeded");
    }
}
