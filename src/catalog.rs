use std::fs;
use std::path::Path;

use regex::Regex;
use tracing::warn;

use crate::config::ProjectConfig;
use crate::error::{Result, ResultError};

pub trait PageCatalog: Send + Sync {
    fn page_ids(&self) -> Result<Vec<String>>;

    fn recognition_completed(&self, page_id: &str) -> bool;
}

#[derive(Debug, Clone)]
pub struct ProjectPageCatalog {
    config: ProjectConfig,
    image_pattern: Regex,
}

impl ProjectPageCatalog {
    pub fn new(config: ProjectConfig) -> Self {
        let image_pattern = Regex::new(r"(?i)^(?P<id>[^.]+)\.(?:png|jpe?g|tiff?)$")
            .expect("page image pattern is valid");
        Self {
            config,
            image_pattern,
        }
    }

    fn page_id_for(&self, file_name: &str) -> Option<String> {
        self.image_pattern
            .captures(file_name)
            .and_then(|captures| captures.name("id"))
            .map(|id| id.as_str().to_string())
    }

    fn count_line_images(&self, segment_path: &Path) -> Option<(usize, usize)> {
        let image_ext = self.config.image_type.line_image_ext();
        let rec_ext = &self.config.settings.rec_ext;

        let entries = match fs::read_dir(segment_path) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(path = %segment_path.display(), error = %err, "skipping unreadable segment");
                return None;
            }
        };

        let mut images = 0;
        let mut recognized = 0;
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(
                        path = %segment_path.display(),
                        error = %err,
                        "skipping unreadable line entry"
                    );
                    continue;
                }
            };
            let file_name = entry.file_name();
            let Some(stem) = file_name.to_string_lossy().strip_suffix(image_ext).map(str::to_owned)
            else {
                continue;
            };
            images += 1;
            if segment_path.join(format!("{stem}{rec_ext}")).is_file() {
                recognized += 1;
            }
        }

        Some((images, recognized))
    }
}

impl PageCatalog for ProjectPageCatalog {
    fn page_ids(&self) -> Result<Vec<String>> {
        let dir = &self.config.original_dir;
        if !dir.is_dir() {
            return Err(ResultError::DirectoryUnavailable { path: dir.clone() });
        }

        let entries = fs::read_dir(dir).map_err(|err| ResultError::io(dir, err))?;
        let mut page_ids = Vec::new();

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(path = %dir.display(), error = %err, "skipping unreadable page entry");
                    continue;
                }
            };

            if !entry.path().is_file() {
                continue;
            }

            if let Some(page_id) = self.page_id_for(&entry.file_name().to_string_lossy()) {
                page_ids.push(page_id);
            }
        }

        page_ids.sort();
        page_ids.dedup();
        Ok(page_ids)
    }

    /// True when the page has line images and every one of them has a
    /// recognition file next to it.
    fn recognition_completed(&self, page_id: &str) -> bool {
        let page_path = self.config.page_path(page_id);
        let entries = match fs::read_dir(&page_path) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(
                    page_id,
                    path = %page_path.display(),
                    error = %err,
                    "skipping page without segments"
                );
                return false;
            }
        };

        let mut images = 0;
        let mut recognized = 0;
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(
                        path = %page_path.display(),
                        error = %err,
                        "skipping unreadable segment entry"
                    );
                    continue;
                }
            };
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            if let Some((segment_images, segment_recognized)) = self.count_line_images(&path) {
                images += segment_images;
                recognized += segment_recognized;
            }
        }

        images > 0 && images == recognized
    }
}

pub fn valid_page_ids_for_result(catalog: &dyn PageCatalog) -> Result<Vec<String>> {
    let mut page_ids: Vec<String> = catalog
        .page_ids()?
        .into_iter()
        .filter(|page_id| catalog.recognition_completed(page_id))
        .collect();
    page_ids.sort();
    Ok(page_ids)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::aggregate::fixtures::write;
    use crate::config::ImageType;

    fn project() -> (TempDir, ProjectConfig) {
        let temp = TempDir::new().expect("tempdir");
        let config = ProjectConfig::new(temp.path(), ImageType::Binary);
        for name in ["0003.png", "0001.JPG", "0002.tif", "readme.md"] {
            write(&config.original_dir.join(name), "");
        }
        fs::create_dir_all(config.original_dir.join("thumbs.png")).expect("create dir");
        (temp, config)
    }

    #[test]
    fn page_ids_lists_images_sorted_and_ignores_other_entries() {
        let (_temp, config) = project();
        let catalog = ProjectPageCatalog::new(config);

        let page_ids = catalog.page_ids().expect("listing");
        assert_eq!(page_ids, vec!["0001", "0002", "0003"]);
    }

    #[test]
    fn page_ids_requires_original_directory() {
        let temp = TempDir::new().expect("tempdir");
        let catalog = ProjectPageCatalog::new(ProjectConfig::new(temp.path(), ImageType::Binary));

        assert!(matches!(
            catalog.page_ids(),
            Err(ResultError::DirectoryUnavailable { .. })
        ));
    }

    #[test]
    fn recognition_completed_requires_a_prediction_for_every_line_image() {
        let (_temp, config) = project();
        let done = config.segment_path("0001", "seg");
        write(&done.join("l0.bin.png"), "");
        write(&done.join("l0.txt"), "text");

        let partial = config.segment_path("0002", "seg");
        write(&partial.join("l0.bin.png"), "");
        write(&partial.join("l0.txt"), "text");
        write(&partial.join("l1.bin.png"), "");

        fs::create_dir_all(config.segment_path("0003", "seg")).expect("create empty segment");

        let catalog = ProjectPageCatalog::new(config);
        assert!(catalog.recognition_completed("0001"));
        assert!(!catalog.recognition_completed("0002"));
        assert!(!catalog.recognition_completed("0003"));
        assert!(!catalog.recognition_completed("0099"));

        let valid = valid_page_ids_for_result(&catalog).expect("valid pages");
        assert_eq!(valid, vec!["0001"]);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_pages_and_segments_are_listed_and_checked() {
        use std::os::unix::fs::symlink;

        let (temp, config) = project();
        let elsewhere = temp.path().join("elsewhere");
        write(&elsewhere.join("0004.png"), "");
        write(&elsewhere.join("seg").join("l0.bin.png"), "");
        write(&elsewhere.join("seg").join("l0.txt"), "text");
        symlink(elsewhere.join("0004.png"), config.original_dir.join("0004.png"))
            .expect("link page image");
        fs::create_dir_all(config.page_path("0004")).expect("create page dir");
        symlink(elsewhere.join("seg"), config.segment_path("0004", "seg")).expect("link segment");

        let catalog = ProjectPageCatalog::new(config.clone());
        assert!(catalog.page_ids().expect("listing").contains(&"0004".to_string()));
        assert!(catalog.recognition_completed("0004"));

        let state = crate::hierarchy::build(&config, &["0004"]).expect("build");
        assert_eq!(state.is_processed("0004", "seg", "l0"), Some(false));
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_segment_is_skipped_not_fatal() {
        use std::os::unix::fs::PermissionsExt;

        let (_temp, config) = project();
        let segment = config.segment_path("0001", "seg");
        write(&segment.join("l0.bin.png"), "");
        write(&segment.join("l0.txt"), "text");
        let locked = config.segment_path("0001", "locked");
        fs::create_dir_all(&locked).expect("create locked segment");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).expect("lock segment");

        let catalog = ProjectPageCatalog::new(config);
        let completed = catalog.recognition_completed("0001");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).expect("unlock segment");

        assert!(completed);
    }

    #[test]
    fn gray_projects_look_for_normalized_line_images() {
        let temp = TempDir::new().expect("tempdir");
        let config = ProjectConfig::new(temp.path(), ImageType::Gray);
        let segment = config.segment_path("0001", "seg");
        write(&segment.join("l0.bin.png"), "");
        write(&segment.join("l0.nrm.png"), "");
        write(&segment.join("l0.txt"), "text");

        let catalog = ProjectPageCatalog::new(config);
        assert!(catalog.recognition_completed("0001"));
    }
}
