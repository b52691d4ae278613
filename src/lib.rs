pub mod aggregate;
pub mod catalog;
pub mod config;
pub mod conflict;
pub mod converter;
pub mod error;
pub mod hierarchy;
pub mod job;
pub mod model;
pub mod orchestrator;

pub use config::{ImageType, ProjectConfig, ResultSettings};
pub use error::{Result, ResultError};
pub use model::{ConflictKind, ProcessState, ResultMode, RunOutcome, RunSummary};
pub use orchestrator::ResultJob;
