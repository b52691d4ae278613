use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::ProjectConfig;
use crate::error::{Result, ResultError};
use crate::job::{CancellationToken, ProgressSink, percent_of};
use crate::model::{ProcessState, ResultMode, RunSummary};

/// Concatenates every line unit of `state` into per-page files and the corpus
/// file.
///
/// Cancellation is checked before each unit. A cancelled run keeps the page
/// files it already finished and never writes the corpus file. Read and write
/// failures propagate immediately.
pub fn run(
    state: &mut ProcessState,
    config: &ProjectConfig,
    cancel: &CancellationToken,
    progress: &dyn ProgressSink,
) -> Result<RunSummary> {
    let units_total = state.unit_count();
    let mut summary = RunSummary::new(ResultMode::Text, units_total);
    let mut page_texts = Vec::with_capacity(state.page_count());

    for (page_id, segments) in state.pages_mut() {
        let mut page_text = String::new();

        for (segment_id, units) in segments.iter_mut() {
            let segment_path = config.segment_path(page_id, segment_id);

            for (unit_id, processed) in units.iter_mut() {
                if cancel.is_cancelled() {
                    info!(
                        page_id = %page_id,
                        processed = summary.units_processed,
                        total = units_total,
                        "text aggregation cancelled"
                    );
                    return Ok(summary.cancelled());
                }

                let source = resolve_source(config, &segment_path, unit_id);
                append_lines(&source, &mut page_text)?;
                *processed = true;

                summary.units_processed += 1;
                if let Some(percent) = percent_of(summary.units_processed, units_total) {
                    progress.report(percent);
                }
            }
        }

        let page_path = config.page_result_path(page_id);
        fs::write(&page_path, &page_text).map_err(|err| ResultError::io(&page_path, err))?;
        debug!(page_id = %page_id, path = %page_path.display(), "wrote page result");

        summary.page_files.push(page_path);
        page_texts.push(page_text);
    }

    let corpus = join_pages(&page_texts);
    let corpus_path = config.corpus_path();
    fs::write(&corpus_path, corpus).map_err(|err| ResultError::io(&corpus_path, err))?;
    info!(
        path = %corpus_path.display(),
        pages = page_texts.len(),
        units = summary.units_processed,
        "wrote corpus result"
    );

    summary.corpus_file = Some(corpus_path);
    Ok(summary)
}

/// Ground truth wins over recognition output when both exist.
fn resolve_source(config: &ProjectConfig, segment_path: &Path, unit_id: &str) -> PathBuf {
    let ground_truth = segment_path.join(format!("{unit_id}{}", config.settings.gt_ext));
    if ground_truth.is_file() {
        return ground_truth;
    }
    segment_path.join(format!("{unit_id}{}", config.settings.rec_ext))
}

fn append_lines(path: &Path, buffer: &mut String) -> Result<()> {
    let file = File::open(path).map_err(|err| ResultError::io(path, err))?;
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|err| ResultError::io(path, err))?;
        buffer.push_str(&line);
        buffer.push('\n');
    }
    Ok(())
}

/// Each page text followed by one newline, so pages are separated by a blank
/// line and the corpus ends with one.
fn join_pages(page_texts: &[String]) -> String {
    let mut corpus = String::with_capacity(page_texts.iter().map(|text| text.len() + 1).sum());
    for text in page_texts {
        corpus.push_str(text);
        corpus.push('\n');
    }
    corpus
}
