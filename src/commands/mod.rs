pub mod pages;
pub mod result;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use ocr_result::{ProjectConfig, ResultSettings};
use tracing::debug;

use crate::cli::ProjectArgs;

fn load_config(args: &ProjectArgs) -> Result<ProjectConfig> {
    let mut settings = match &args.settings_path {
        Some(path) => load_settings(path)?,
        None => ResultSettings::default(),
    };

    if let Some(rec_ext) = &args.rec_ext {
        settings.rec_ext = rec_ext.clone();
    }
    if let Some(gt_ext) = &args.gt_ext {
        settings.gt_ext = gt_ext.clone();
    }

    debug!(?settings, "resolved result settings");
    Ok(ProjectConfig::with_settings(
        &args.project_dir,
        args.image_type,
        settings,
    ))
}

fn load_settings(path: &Path) -> Result<ResultSettings> {
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("failed to parse {}", path.display()))
}
