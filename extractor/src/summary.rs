use chrono::{DateTime, Utc};
use keyframe_engine::RunSummary;
use serde::Serialize;

/// Contents of `summary.json`: the engine's run summary plus where it came from.
#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    pub source: &'a str,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub threshold: f64,
    pub max_time_interval_secs: f64,
    #[serde(flatten)]
    pub summary: &'a RunSummary,
}

impl RunReport<'_> {
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyframe_engine::{KeyframeRecord, SelectionDecision};

    #[test]
    fn report_flattens_summary() {
        let summary = RunSummary {
            total_frames_analyzed: 9,
            total_keyframes: 1,
            fps: 25.0,
            fps_substituted: true,
            max_frames_interval: 125,
            keyframes: vec![KeyframeRecord {
                index: 0,
                reason: SelectionDecision::Initial,
                identifier: "keyframe_0000".into(),
            }],
        };
        let now = Utc::now();
        let report = RunReport {
            source: "clip.mp4",
            started_at: now,
            finished_at: now,
            threshold: 30.0,
            max_time_interval_secs: 5.0,
            summary: &summary,
        };

        let json: serde_json::Value = serde_json::from_slice(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["source"], "clip.mp4");
        assert_eq!(json["total_frames_analyzed"], 9);
        assert_eq!(json["fps_substituted"], true);
        assert_eq!(json["keyframes"][0]["identifier"], "keyframe_0000");
        assert!(json["started_at"].is_string());
    }
}
