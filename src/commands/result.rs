use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use chrono::Utc;
use ocr_result::model::{OutputEntry, ResultRunCounts, ResultRunManifest};
use ocr_result::{ConflictKind, ProjectConfig, ResultError, ResultJob, ResultMode, RunSummary};
use tracing::{info, warn};

use crate::cli::ResultArgs;
use crate::commands::load_config;
use crate::util::{now_utc_string, sha256_file, utc_compact_string, write_json_pretty};

type WorkerResult = std::result::Result<RunSummary, ResultError>;

pub fn run(args: ResultArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("result-{}", utc_compact_string(started_ts));

    let mut config = load_config(&args.project)?;
    if let Some(program) = &args.converter {
        config.settings.converter_program = program.clone();
    }
    if let Some(timeout_secs) = args.converter_timeout_secs {
        config.settings.converter_timeout_secs = Some(timeout_secs);
    }

    let manifest_path = args.manifest_path.clone().unwrap_or_else(|| {
        config
            .project_dir
            .join("manifests")
            .join(format!("result_run_{}.json", utc_compact_string(started_ts)))
    });

    let job = Arc::new(ResultJob::new(config.clone()));

    let conflict = job.conflict_type(&args.running);
    match conflict {
        ConflictKind::Blocking => bail!(
            "refusing to start: a conflicting process is running on {}",
            config.project_dir.display()
        ),
        ConflictKind::Advisory => warn!(
            running = ?args.running,
            "recognition still running; results may be incomplete"
        ),
        ConflictKind::None => {}
    }

    let page_ids = if args.pages.is_empty() {
        job.valid_page_ids_for_result()
            .context("failed to list pages with completed recognition")?
    } else {
        args.pages.clone()
    };

    if page_ids.is_empty() && args.mode == ResultMode::Text {
        warn!("no pages selected for text results");
    }

    info!(run_id = %run_id, mode = %args.mode, pages = page_ids.len(), "starting result run");

    let worker = spawn_worker(&job, page_ids.clone(), args.mode)?;
    let interval = Duration::from_millis(args.poll_interval_ms.max(10));
    let outcome = wait_with_progress(&job, worker, interval)?;

    let page_count = page_ids.len();
    let mut manifest = ResultRunManifest {
        manifest_version: 1,
        run_id: run_id.clone(),
        status: "failed".to_string(),
        mode: args.mode,
        image_type: config.image_type.as_str().to_string(),
        started_at,
        updated_at: String::new(),
        project_dir: config.project_dir.display().to_string(),
        page_ids,
        conflict,
        failure_reason: None,
        counts: ResultRunCounts {
            page_count,
            units_total: 0,
            units_processed: 0,
            page_files_written: 0,
        },
        outputs: Vec::new(),
        warnings: Vec::new(),
    };

    match outcome {
        Ok(summary) => {
            manifest.status = summary.outcome.as_str().to_string();
            manifest.counts.units_total = summary.units_total;
            manifest.counts.units_processed = summary.units_processed;
            manifest.counts.page_files_written = summary.page_files.len();
            manifest.outputs = hash_outputs(&summary, &config)?;
            if args.mode == ResultMode::Structured && !config.ocr_dir.is_dir() {
                manifest.warnings.push(format!(
                    "{} does not exist; nothing was converted",
                    config.ocr_dir.display()
                ));
            }
            manifest.updated_at = now_utc_string();

            write_json_pretty(&manifest_path, &manifest)?;
            info!(path = %manifest_path.display(), "wrote result run manifest");
            info!(
                run_id = %run_id,
                status = %manifest.status,
                processed = summary.units_processed,
                total = summary.units_total,
                "result run finished"
            );
            Ok(())
        }
        Err(err) => {
            job.reset_progress();
            manifest.failure_reason = Some(err.to_string());
            manifest.updated_at = now_utc_string();
            write_json_pretty(&manifest_path, &manifest)?;
            info!(path = %manifest_path.display(), "wrote failed result run manifest");
            Err(err).context("result generation failed")
        }
    }
}

fn spawn_worker(
    job: &Arc<ResultJob>,
    page_ids: Vec<String>,
    mode: ResultMode,
) -> Result<JoinHandle<WorkerResult>> {
    let job = Arc::clone(job);
    thread::Builder::new()
        .name("result-worker".to_string())
        .spawn(move || job.execute_process(page_ids.as_slice(), mode))
        .context("failed to spawn result worker")
}

fn wait_with_progress(
    job: &ResultJob,
    worker: JoinHandle<WorkerResult>,
    interval: Duration,
) -> Result<WorkerResult> {
    let mut last_reported = None;

    loop {
        let finished = worker.is_finished();
        let progress = job.progress();
        if last_reported != Some(progress) {
            info!(progress, "result progress");
            last_reported = Some(progress);
        }
        if finished {
            break;
        }
        thread::sleep(interval);
    }

    worker
        .join()
        .map_err(|_| anyhow!("result worker panicked"))
}

fn hash_outputs(summary: &RunSummary, config: &ProjectConfig) -> Result<Vec<OutputEntry>> {
    summary
        .page_files
        .iter()
        .chain(summary.corpus_file.iter())
        .map(|path| output_entry(path, &config.project_dir))
        .collect()
}

fn output_entry(path: &Path, project_dir: &Path) -> Result<OutputEntry> {
    let display: PathBuf = path
        .strip_prefix(project_dir)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf());

    Ok(OutputEntry {
        path: display.display().to_string(),
        sha256: sha256_file(path)?,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use ocr_result::{ImageType, RunOutcome};
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn output_entries_are_project_relative_and_hashed() {
        let temp = TempDir::new().expect("tempdir");
        let config = ProjectConfig::new(temp.path(), ImageType::Binary);
        fs::create_dir_all(&config.result_pages_dir).expect("create result dirs");
        fs::write(config.page_result_path("0001"), "abc").expect("write page");
        fs::write(config.corpus_path(), "abc\n").expect("write corpus");

        let summary = RunSummary {
            mode: ResultMode::Text,
            outcome: RunOutcome::Completed,
            units_total: 1,
            units_processed: 1,
            page_files: vec![config.page_result_path("0001")],
            corpus_file: Some(config.corpus_path()),
        };

        let outputs = hash_outputs(&summary, &config).expect("hash outputs");
        assert_eq!(outputs.len(), 2);
        assert_eq!(
            outputs[0].path,
            Path::new("Results").join("Pages").join("0001.txt").display().to_string()
        );
        assert_eq!(
            outputs[0].sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(
            outputs[1].path,
            Path::new("Results").join("complete.txt").display().to_string()
        );
    }
}
