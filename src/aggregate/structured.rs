use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::ProjectConfig;
use crate::converter::{Conversion, ConverterInvoker};
use crate::error::{Result, ResultError};
use crate::job::{CancellationToken, ProgressSink, percent_of};
use crate::model::{ResultMode, RunSummary};

/// Invokes the converter once per configuration artifact in the OCR
/// directory.
///
/// Every artifact is converted regardless of `page_ids`; the ids are only
/// logged. Artifacts are processed in sorted file-name order. A missing OCR
/// directory means nothing to convert yet and is not an error.
pub fn run<S: AsRef<str>>(
    page_ids: &[S],
    config: &ProjectConfig,
    cancel: &CancellationToken,
    progress: &dyn ProgressSink,
    converter: &dyn ConverterInvoker,
) -> Result<RunSummary> {
    if !config.ocr_dir.is_dir() {
        debug!(path = %config.ocr_dir.display(), "no configuration artifacts to convert");
        return Ok(RunSummary::new(ResultMode::Structured, 0));
    }

    let artifacts = list_artifacts(&config.ocr_dir, &config.settings.conf_ext)?;
    let mut summary = RunSummary::new(ResultMode::Structured, artifacts.len());
    info!(
        artifacts = artifacts.len(),
        requested_pages = page_ids.len(),
        "converting every configuration artifact"
    );

    for artifact in &artifacts {
        if cancel.is_cancelled() {
            info!(processed = summary.units_processed, "structured conversion cancelled");
            return Ok(summary.cancelled());
        }

        match converter.convert(artifact, cancel)? {
            Conversion::Cancelled => return Ok(summary.cancelled()),
            Conversion::Exited(report) if !report.success => {
                warn!(
                    artifact = %artifact.display(),
                    code = ?report.code,
                    stderr = %report.stderr.trim(),
                    "converter exited unsuccessfully"
                );
            }
            Conversion::Exited(_) => {
                debug!(artifact = %artifact.display(), "converter finished");
            }
        }

        summary.units_processed += 1;
        if let Some(percent) = percent_of(summary.units_processed, artifacts.len()) {
            progress.report(percent);
        }
    }

    Ok(summary)
}

fn list_artifacts(dir: &Path, conf_ext: &str) -> Result<Vec<PathBuf>> {
    let mut artifacts = Vec::new();
    let entries = fs::read_dir(dir).map_err(|err| ResultError::io(dir, err))?;

    for entry in entries {
        let entry = entry.map_err(|err| ResultError::io(dir, err))?;
        let path = entry.path();
        if path.is_file() && entry.file_name().to_string_lossy().ends_with(conf_ext) {
            artifacts.push(path);
        }
    }

    artifacts.sort();
    artifacts
        .into_iter()
        .map(|path| fs::canonicalize(&path).map_err(|err| ResultError::io(&path, err)))
        .collect()
}
