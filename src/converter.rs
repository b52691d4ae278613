use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::ResultSettings;
use crate::error::{Result, ResultError};
use crate::job::CancellationToken;

const OUTPUT_GRACE: Duration = Duration::from_secs(2);

/// Captured result of one converter invocation. The output is kept for logs
/// only and never parsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExitReport {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conversion {
    Exited(ExitReport),
    /// Stopped because the cancellation token was set mid-conversion.
    Cancelled,
}

/// Runs the external structured-format converter for one configuration
/// artifact and blocks until it is done.
pub trait ConverterInvoker: Send + Sync {
    fn convert(&self, artifact: &Path, cancel: &CancellationToken) -> Result<Conversion>;
}

/// Spawns `program <artifact>` as a subprocess.
///
/// The child is polled rather than waited on so cancellation and the optional
/// timeout can kill it.
#[derive(Debug, Clone)]
pub struct ProcessConverter {
    program: String,
    timeout: Option<Duration>,
    poll_interval: Duration,
}

impl ProcessConverter {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            timeout: None,
            poll_interval: Duration::from_millis(50),
        }
    }

    pub fn from_settings(settings: &ResultSettings) -> Self {
        Self {
            program: settings.converter_program.clone(),
            timeout: settings.converter_timeout(),
            poll_interval: settings.converter_poll_interval(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(1));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl ConverterInvoker for ProcessConverter {
    fn convert(&self, artifact: &Path, cancel: &CancellationToken) -> Result<Conversion> {
        debug!(program = %self.program, artifact = %artifact.display(), "starting converter");

        let mut child = Command::new(&self.program)
            .arg(artifact)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ResultError::ConverterSpawn {
                program: self.program.clone(),
                source,
            })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());
        let started = Instant::now();

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(err) => {
                    terminate(&mut child);
                    return Err(ResultError::io(artifact, err));
                }
            }

            if cancel.is_cancelled() {
                terminate(&mut child);
                info!(artifact = %artifact.display(), "converter terminated on cancellation");
                return Ok(Conversion::Cancelled);
            }

            if let Some(timeout) = self.timeout {
                if started.elapsed() >= timeout {
                    terminate(&mut child);
                    warn!(artifact = %artifact.display(), ?timeout, "converter timed out");
                    return Err(ResultError::ConverterTimeout {
                        path: artifact.to_path_buf(),
                        timeout,
                    });
                }
            }

            thread::sleep(self.poll_interval);
        };

        let deadline = Instant::now() + OUTPUT_GRACE;
        Ok(Conversion::Exited(ExitReport {
            success: status.success(),
            code: status.code(),
            stdout: collect(stdout, deadline, self.poll_interval),
            stderr: collect(stderr, deadline, self.poll_interval),
        }))
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

/// Reader threads outlive the child when a process it spawned still holds the
/// pipes. Past the deadline the thread is detached and its output dropped.
fn collect(handle: Option<JoinHandle<String>>, deadline: Instant, poll: Duration) -> String {
    let Some(handle) = handle else {
        return String::new();
    };

    while !handle.is_finished() {
        if Instant::now() >= deadline {
            warn!("converter output still open after exit, detaching reader");
            return String::new();
        }
        thread::sleep(poll);
    }

    handle.join().unwrap_or_default()
}

/// Best effort: the child may already have exited.
fn terminate(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}
