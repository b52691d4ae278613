use crate::model::ConflictKind;

/// Classifies whether a result run may start next to the processes that are
/// already running on the same project.
pub trait ConflictDetector: Send + Sync {
    fn result_conflict(&self, running: &[String]) -> ConflictKind;
}

pub const RESULT_PROCESS: &str = "result";

pub const RECOGNITION_PROCESSES: &[&str] = &["recognition", "groundtruth"];

/// Name-based detector: another result run blocks, a run still producing
/// line texts is advisory.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessConflictDetector;

impl ConflictDetector for ProcessConflictDetector {
    fn result_conflict(&self, running: &[String]) -> ConflictKind {
        let is_running = |name: &str| {
            running
                .iter()
                .any(|process| process.trim().eq_ignore_ascii_case(name))
        };

        if is_running(RESULT_PROCESS) {
            return ConflictKind::Blocking;
        }
        if RECOGNITION_PROCESSES.iter().any(|name| is_running(name)) {
            return ConflictKind::Advisory;
        }
        ConflictKind::None
    }
}
