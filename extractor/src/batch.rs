use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Regular files in `dir` whose extension is one of `extensions`
/// (case-insensitive), sorted by path. Not recursive.
pub fn discover_videos(dir: &Path, extensions: &[String]) -> std::io::Result<Vec<PathBuf>> {
    let mut videos = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)));
        if matches {
            videos.push(path);
        }
    }
    videos.sort();
    Ok(videos)
}

/// Output sub-folder for a video: its file name without extension.
pub fn video_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string())
}

/// Stems used by more than one video. Those videos write into the same
/// output folder, the later run overwriting the earlier one.
pub fn shared_stems(videos: &[PathBuf]) -> Vec<String> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for video in videos {
        *counts.entry(video_stem(video)).or_default() += 1;
    }
    counts
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(stem, _)| stem)
        .collect()
}
