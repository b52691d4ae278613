use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ResultError>;

#[derive(Debug, Error)]
pub enum ResultError {
    #[error("directory unavailable: {}", path.display())]
    DirectoryUnavailable { path: PathBuf },

    #[error("i/o failure on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to start converter {program}")]
    ConverterSpawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("converter timed out after {timeout:?} on {}", path.display())]
    ConverterTimeout { path: PathBuf, timeout: Duration },

    #[error("unknown result mode: {0} (expected text or structured)")]
    UnknownMode(String),
}

impl ResultError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
