use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub const DEFAULT_REC_EXT: &str = ".txt";
pub const DEFAULT_GT_EXT: &str = ".gt.txt";
pub const DEFAULT_CONF_EXT: &str = ".conf";
pub const DEFAULT_CONVERTER: &str = "pagedir2pagexml.py";
pub const CORPUS_FILE_NAME: &str = "complete.txt";

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageType {
    #[default]
    Binary,
    Gray,
}

impl ImageType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::Gray => "gray",
        }
    }

    pub fn line_image_ext(self) -> &'static str {
        match self {
            Self::Binary => ".bin.png",
            Self::Gray => ".nrm.png",
        }
    }
}

/// Tunables for result generation. Every field falls back to its default when
/// absent from a settings file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultSettings {
    pub rec_ext: String,
    pub gt_ext: String,
    pub conf_ext: String,
    pub converter_program: String,
    /// Unbounded when `None`.
    pub converter_timeout_secs: Option<u64>,
    pub converter_poll_ms: u64,
}

impl Default for ResultSettings {
    fn default() -> Self {
        Self {
            rec_ext: DEFAULT_REC_EXT.to_string(),
            gt_ext: DEFAULT_GT_EXT.to_string(),
            conf_ext: DEFAULT_CONF_EXT.to_string(),
            converter_program: DEFAULT_CONVERTER.to_string(),
            converter_timeout_secs: None,
            converter_poll_ms: 50,
        }
    }
}

impl ResultSettings {
    pub fn converter_timeout(&self) -> Option<Duration> {
        self.converter_timeout_secs.map(Duration::from_secs)
    }

    pub fn converter_poll_interval(&self) -> Duration {
        Duration::from_millis(self.converter_poll_ms.max(1))
    }
}

#[derive(Debug, Clone)]
pub struct ProjectConfig {
    pub project_dir: PathBuf,
    pub original_dir: PathBuf,
    pub page_dir: PathBuf,
    pub ocr_dir: PathBuf,
    pub result_dir: PathBuf,
    pub result_pages_dir: PathBuf,
    pub image_type: ImageType,
    pub settings: ResultSettings,
}

impl ProjectConfig {
    pub fn new(project_dir: impl Into<PathBuf>, image_type: ImageType) -> Self {
        Self::with_settings(project_dir, image_type, ResultSettings::default())
    }

    pub fn with_settings(
        project_dir: impl Into<PathBuf>,
        image_type: ImageType,
        settings: ResultSettings,
    ) -> Self {
        let project_dir = project_dir.into();
        let ocr_dir = project_dir.join("OCR");
        let result_dir = project_dir.join("Results");

        Self {
            original_dir: project_dir.join("Original"),
            page_dir: ocr_dir.join("Pages"),
            result_pages_dir: result_dir.join("Pages"),
            ocr_dir,
            result_dir,
            project_dir,
            image_type,
            settings,
        }
    }

    pub fn page_path(&self, page_id: &str) -> PathBuf {
        self.page_dir.join(page_id)
    }

    pub fn segment_path(&self, page_id: &str, segment_id: &str) -> PathBuf {
        self.page_dir.join(page_id).join(segment_id)
    }

    pub fn page_result_path(&self, page_id: &str) -> PathBuf {
        self.result_pages_dir.join(format!("{page_id}.txt"))
    }

    pub fn corpus_path(&self) -> PathBuf {
        self.result_dir.join(CORPUS_FILE_NAME)
    }

    /// Line-unit id for a file name, or `None` if the file is not a primary
    /// recognition output. Ground-truth files are never primary units.
    pub fn line_unit_id(&self, file_name: &str) -> Option<String> {
        if file_name.ends_with(&self.settings.gt_ext) {
            return None;
        }
        file_name
            .strip_suffix(&self.settings.rec_ext)
            .filter(|stem| !stem.is_empty())
            .map(ToOwned::to_owned)
    }
}
