use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

/// Progress value for a job that has not started or was reset after a failure.
pub const PROGRESS_IDLE: i32 = -1;

pub trait ProgressSink: Send + Sync {
    fn report(&self, percent: i32);
}

/// `floor(100 * done / total)`, or `None` when there is nothing to count.
pub fn percent_of(done: usize, total: usize) -> Option<i32> {
    if total == 0 {
        return None;
    }
    let percent = (done.min(total) as u64 * 100) / total as u64;
    Some(percent as i32)
}

/// Atomic percentage in `-1..=100`. Clones share the same value.
#[derive(Debug, Clone)]
pub struct Progress {
    value: Arc<AtomicI32>,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            value: Arc::new(AtomicI32::new(PROGRESS_IDLE)),
        }
    }
}

impl Progress {
    pub fn get(&self) -> i32 {
        self.value.load(Ordering::Acquire)
    }

    pub fn set(&self, percent: i32) {
        self.value
            .store(percent.clamp(PROGRESS_IDLE, 100), Ordering::Release);
    }

    pub fn reset(&self) {
        self.set(PROGRESS_IDLE);
    }
}

impl ProgressSink for Progress {
    fn report(&self, percent: i32) {
        self.set(percent);
    }
}

/// Cooperative stop request, checked between work units. Never cleared by the
/// aggregators themselves.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn clear(&self) {
        self.cancelled.store(false, Ordering::Release);
    }
}

#[derive(Debug, Clone, Default)]
pub struct JobContext {
    pub progress: Progress,
    pub cancel: CancellationToken,
}

impl JobContext {
    pub fn begin_run(&self) {
        self.cancel.clear();
        self.progress.set(0);
    }
}
