use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::config::ProjectConfig;
use crate::error::{Result, ResultError};
use crate::model::{LineUnits, ProcessState, Segments};

/// Scans `<page_dir>/<page_id>/<segment>/` for every requested page and builds
/// a fresh tree with all line units unprocessed.
///
/// A missing page directory aborts the whole build.
pub fn build<S: AsRef<str>>(config: &ProjectConfig, page_ids: &[S]) -> Result<ProcessState> {
    let mut state = ProcessState::new();

    for page_id in page_ids {
        let page_id = page_id.as_ref();
        let segments = scan_page(config, page_id)?;
        debug!(page_id, segments = segments.len(), "scanned page");
        state.insert_page(page_id, segments);
    }

    info!(
        pages = state.page_count(),
        segments = state.segment_count(),
        units = state.unit_count(),
        "built process state"
    );

    Ok(state)
}

fn scan_page(config: &ProjectConfig, page_id: &str) -> Result<Segments> {
    let page_path = config.page_path(page_id);
    if !page_path.is_dir() {
        return Err(ResultError::DirectoryUnavailable { path: page_path });
    }

    let mut segments = Segments::new();
    let entries = fs::read_dir(&page_path).map_err(|err| ResultError::io(&page_path, err))?;

    for entry in entries {
        let entry = entry.map_err(|err| ResultError::io(&page_path, err))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }

        let segment_id = entry.file_name().to_string_lossy().into_owned();
        let units = scan_segment(config, &path)?;
        segments.insert(segment_id, units);
    }

    Ok(segments)
}

fn scan_segment(config: &ProjectConfig, segment_path: &Path) -> Result<LineUnits> {
    let mut units = LineUnits::new();
    let entries =
        fs::read_dir(segment_path).map_err(|err| ResultError::io(segment_path, err))?;

    for entry in entries {
        let entry = entry.map_err(|err| ResultError::io(segment_path, err))?;
        if !entry.path().is_file() {
            continue;
        }

        let file_name = entry.file_name();
        if let Some(unit_id) = config.line_unit_id(&file_name.to_string_lossy()) {
            units.insert(unit_id, false);
        }
    }

    Ok(units)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::config::ImageType;

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().expect("fixture has parent")).expect("create fixture dir");
        fs::write(path, contents).expect("write fixture");
    }

    #[test]
    fn build_sorts_every_level_and_skips_ground_truth_files() {
        let temp = TempDir::new().expect("tempdir");
        let config = ProjectConfig::new(temp.path(), ImageType::Binary);
        let page = config.page_path("0007");

        write(&page.join("seg_b").join("l1.txt"), "b1");
        write(&page.join("seg_b").join("l0.txt"), "b0");
        write(&page.join("seg_b").join("l0.gt.txt"), "b0 corrected");
        write(&page.join("seg_b").join("l0.bin.png"), "");
        write(&page.join("seg_a").join("l9.txt"), "a9");
        write(&page.join("stray.txt"), "not a segment");

        let state = build(&config, &["0007"]).expect("build should succeed");

        let segments: Vec<_> = state.pages()["0007"].keys().cloned().collect();
        assert_eq!(segments, vec!["seg_a", "seg_b"]);

        let units: Vec<_> = state.pages()["0007"]["seg_b"].keys().cloned().collect();
        assert_eq!(units, vec!["l0", "l1"]);
        assert_eq!(state.unit_count(), 3);
        assert_eq!(state.processed_count(), 0);
    }

    #[test]
    fn page_without_segments_is_kept_empty() {
        let temp = TempDir::new().expect("tempdir");
        let config = ProjectConfig::new(temp.path(), ImageType::Binary);
        fs::create_dir_all(config.page_path("0001")).expect("create page dir");

        let state = build(&config, &["0001"]).expect("build should succeed");
        assert!(state.pages()["0001"].is_empty());
        assert_eq!(state.unit_count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn build_follows_symlinked_segments_and_line_files() {
        use std::os::unix::fs::symlink;

        let temp = TempDir::new().expect("tempdir");
        let config = ProjectConfig::new(temp.path(), ImageType::Binary);
        let elsewhere = temp.path().join("elsewhere");
        write(&elsewhere.join("seg_a").join("l0.txt"), "linked segment");
        write(&elsewhere.join("l1.txt"), "linked line");

        let page = config.page_path("0001");
        fs::create_dir_all(page.join("seg_b")).expect("create segment");
        symlink(elsewhere.join("seg_a"), page.join("seg_a")).expect("link segment");
        symlink(elsewhere.join("l1.txt"), page.join("seg_b").join("l1.txt")).expect("link line");

        let state = build(&config, &["0001"]).expect("build should succeed");

        assert_eq!(state.is_processed("0001", "seg_a", "l0"), Some(false));
        assert_eq!(state.is_processed("0001", "seg_b", "l1"), Some(false));
        assert_eq!(state.unit_count(), 2);
    }

    #[test]
    fn missing_page_directory_aborts_build() {
        let temp = TempDir::new().expect("tempdir");
        let config = ProjectConfig::new(temp.path(), ImageType::Binary);
        fs::create_dir_all(config.page_path("0001")).expect("create page dir");

        let err = build(&config, &["0001", "0002"]).expect_err("missing page must fail");
        match err {
            ResultError::DirectoryUnavailable { path } => {
                assert_eq!(path, config.page_path("0002"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
