/// Key for a keyframe image.
/// e.g. "keyframes/holiday/keyframe_0003.jpg", or "keyframes/keyframe_0003.jpg"
/// when the run has no per-video location.
pub fn keyframe_key(prefix: &str, location: Option<&str>, identifier: &str, ext: &str) -> String {
    format!("{}{identifier}.{ext}", folder_key(prefix, location))
}

/// Key for the JSON run summary stored next to the keyframes.
pub fn summary_key(prefix: &str, location: Option<&str>) -> String {
    format!("{}summary.json", folder_key(prefix, location))
}

/// Common key prefix of everything a run stores, with trailing slash.
pub fn folder_key(prefix: &str, location: Option<&str>) -> String {
    match location {
        Some(loc) => format!("{prefix}{loc}/"),
        None => prefix.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_format() {
        let k = keyframe_key("keyframes/", Some("holiday"), "keyframe_0003", "jpg");
        assert_eq!(k, "keyframes/holiday/keyframe_0003.jpg");

        let k = keyframe_key("keyframes/", None, "keyframe_0000", "png");
        assert_eq!(k, "keyframes/keyframe_0000.png");

        let s = summary_key("keyframes/", Some("holiday"));
        assert_eq!(s, "keyframes/holiday/summary.json");

        // Keyframes and summary share the same folder
        let kf = keyframe_key("keyframes/", Some("holiday"), "keyframe_0000", "jpg");
        assert_eq!(&kf[..kf.rfind('/').unwrap()], &s[..s.rfind('/').unwrap()]);
    }
}
