use std::fs;

use tracing::info;

use crate::aggregate::{structured, text};
use crate::catalog::{self, PageCatalog, ProjectPageCatalog};
use crate::config::ProjectConfig;
use crate::conflict::{ConflictDetector, ProcessConflictDetector};
use crate::converter::{ConverterInvoker, ProcessConverter};
use crate::error::{Result, ResultError};
use crate::hierarchy;
use crate::job::JobContext;
use crate::model::{ConflictKind, ProcessState, ResultMode, RunSummary};

/// Result generation for one project.
///
/// Runs synchronously on the calling thread. The job is `Sync`, so another
/// thread holding the same `Arc<ResultJob>` may poll [`ResultJob::progress`]
/// or call [`ResultJob::cancel_process`] while a run is in flight. Callers
/// must not start two runs on the same project at once; check
/// [`ResultJob::conflict_type`] first.
pub struct ResultJob {
    config: ProjectConfig,
    context: JobContext,
    catalog: Box<dyn PageCatalog>,
    detector: Box<dyn ConflictDetector>,
    converter: Box<dyn ConverterInvoker>,
}

impl ResultJob {
    pub fn new(config: ProjectConfig) -> Self {
        Self {
            catalog: Box::new(ProjectPageCatalog::new(config.clone())),
            detector: Box::new(ProcessConflictDetector),
            converter: Box::new(ProcessConverter::from_settings(&config.settings)),
            context: JobContext::default(),
            config,
        }
    }

    pub fn with_catalog(mut self, catalog: impl PageCatalog + 'static) -> Self {
        self.catalog = Box::new(catalog);
        self
    }

    pub fn with_conflict_detector(mut self, detector: impl ConflictDetector + 'static) -> Self {
        self.detector = Box::new(detector);
        self
    }

    pub fn with_converter(mut self, converter: impl ConverterInvoker + 'static) -> Self {
        self.converter = Box::new(converter);
        self
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn context(&self) -> &JobContext {
        &self.context
    }

    pub fn initialize<S: AsRef<str>>(&self, page_ids: &[S]) -> Result<ProcessState> {
        hierarchy::build(&self.config, page_ids)
    }

    /// Runs one result generation. Progress starts at 0 and any earlier
    /// cancellation request is dropped.
    ///
    /// On error the progress value is left where the run stopped; callers
    /// should [`reset_progress`](Self::reset_progress) so pollers can tell a
    /// failure from a run in progress.
    pub fn execute_process<S: AsRef<str>>(
        &self,
        page_ids: &[S],
        mode: ResultMode,
    ) -> Result<RunSummary> {
        self.context.begin_run();
        self.initialize_result_directories()?;

        info!(
            mode = %mode,
            pages = page_ids.len(),
            project = %self.config.project_dir.display(),
            "starting result generation"
        );

        let summary = match mode {
            ResultMode::Text => {
                let mut state = self.initialize(page_ids)?;
                text::run(
                    &mut state,
                    &self.config,
                    &self.context.cancel,
                    &self.context.progress,
                )?
            }
            ResultMode::Structured => structured::run(
                page_ids,
                &self.config,
                &self.context.cancel,
                &self.context.progress,
                self.converter.as_ref(),
            )?,
        };

        info!(
            mode = %mode,
            outcome = summary.outcome.as_str(),
            processed = summary.units_processed,
            total = summary.units_total,
            "result generation finished"
        );

        Ok(summary)
    }

    pub fn progress(&self) -> i32 {
        self.context.progress.get()
    }

    pub fn reset_progress(&self) {
        self.context.progress.reset();
    }

    /// Stops the current run before its next unit and terminates an in-flight
    /// converter process.
    pub fn cancel_process(&self) {
        info!("result generation cancellation requested");
        self.context.cancel.cancel();
    }

    pub fn valid_page_ids_for_result(&self) -> Result<Vec<String>> {
        catalog::valid_page_ids_for_result(self.catalog.as_ref())
    }

    pub fn conflict_type(&self, running: &[String]) -> ConflictKind {
        let conflict = self.detector.result_conflict(running);
        info!(?conflict, running = running.len(), "result conflict check");
        conflict
    }

    fn initialize_result_directories(&self) -> Result<()> {
        for dir in [&self.config.result_dir, &self.config.result_pages_dir] {
            fs::create_dir_all(dir).map_err(|err| ResultError::io(dir, err))?;
        }
        Ok(())
    }
}
