use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ResultError;

pub type LineUnits = BTreeMap<String, bool>;

pub type Segments = BTreeMap<String, LineUnits>;

/// Page -> segment -> line unit -> processed flag.
///
/// Every level is a `BTreeMap`, so iteration is lexicographic by id. Output
/// concatenation order depends on this.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessState {
    pages: BTreeMap<String, Segments>,
}

impl ProcessState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_page(&mut self, page_id: impl Into<String>, segments: Segments) {
        self.pages.insert(page_id.into(), segments);
    }

    pub fn pages(&self) -> &BTreeMap<String, Segments> {
        &self.pages
    }

    pub fn pages_mut(&mut self) -> &mut BTreeMap<String, Segments> {
        &mut self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn segment_count(&self) -> usize {
        self.pages.values().map(BTreeMap::len).sum()
    }

    pub fn unit_count(&self) -> usize {
        self.pages
            .values()
            .flat_map(BTreeMap::values)
            .map(BTreeMap::len)
            .sum()
    }

    pub fn processed_count(&self) -> usize {
        self.pages
            .values()
            .flat_map(BTreeMap::values)
            .flat_map(BTreeMap::values)
            .filter(|processed| **processed)
            .count()
    }

    pub fn is_processed(&self, page_id: &str, segment_id: &str, unit_id: &str) -> Option<bool> {
        self.pages
            .get(page_id)
            .and_then(|segments| segments.get(segment_id))
            .and_then(|units| units.get(unit_id))
            .copied()
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultMode {
    Text,
    Structured,
}

impl ResultMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Structured => "structured",
        }
    }
}

impl fmt::Display for ResultMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResultMode {
    type Err = ResultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "structured" | "xml" => Ok(Self::Structured),
            _ => Err(ResultError::UnknownMode(s.to_string())),
        }
    }
}

/// Verdict on whether a new result run may start next to running processes.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictKind {
    #[default]
    None,
    /// Starting now would corrupt or duplicate work.
    Blocking,
    /// Starting is allowed but the output may be incomplete.
    Advisory,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunOutcome {
    Completed,
    Cancelled,
}

impl RunOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub mode: ResultMode,
    pub outcome: RunOutcome,
    /// Line units in text mode, configuration artifacts in structured mode.
    pub units_total: usize,
    pub units_processed: usize,
    pub page_files: Vec<PathBuf>,
    pub corpus_file: Option<PathBuf>,
}

impl RunSummary {
    pub fn new(mode: ResultMode, units_total: usize) -> Self {
        Self {
            mode,
            outcome: RunOutcome::Completed,
            units_total,
            units_processed: 0,
            page_files: Vec::new(),
            corpus_file: None,
        }
    }

    pub fn cancelled(mut self) -> Self {
        self.outcome = RunOutcome::Cancelled;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OutputEntry {
    pub path: String,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultRunCounts {
    pub page_count: usize,
    pub units_total: usize,
    pub units_processed: usize,
    pub page_files_written: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub mode: ResultMode,
    pub image_type: String,
    pub started_at: String,
    pub updated_at: String,
    pub project_dir: String,
    pub page_ids: Vec<String>,
    pub conflict: ConflictKind,
    pub failure_reason: Option<String>,
    pub counts: ResultRunCounts,
    pub outputs: Vec<OutputEntry>,
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> ProcessState {
        let mut state = ProcessState::new();
        let mut segments = Segments::new();
        segments.insert(
            "b_seg".to_string(),
            LineUnits::from([("l1".to_string(), false), ("l0".to_string(), true)]),
        );
        segments.insert("a_seg".to_string(), LineUnits::new());
        state.insert_page("0002", segments);
        state.insert_page("0001", Segments::new());
        state
    }

    #[test]
    fn process_state_iterates_in_key_order() {
        let state = sample_state();
        let pages: Vec<_> = state.pages().keys().cloned().collect();
        assert_eq!(pages, vec!["0001", "0002"]);

        let segments: Vec<_> = state.pages()["0002"].keys().cloned().collect();
        assert_eq!(segments, vec!["a_seg", "b_seg"]);

        let units: Vec<_> = state.pages()["0002"]["b_seg"].keys().cloned().collect();
        assert_eq!(units, vec!["l0", "l1"]);
    }

    #[test]
    fn process_state_counts_units_and_processed_flags() {
        let state = sample_state();
        assert_eq!(state.page_count(), 2);
        assert_eq!(state.segment_count(), 2);
        assert_eq!(state.unit_count(), 2);
        assert_eq!(state.processed_count(), 1);
        assert_eq!(state.is_processed("0002", "b_seg", "l1"), Some(false));
        assert_eq!(state.is_processed("0002", "b_seg", "missing"), None);
    }

    #[test]
    fn result_mode_accepts_legacy_aliases() {
        assert_eq!("txt".parse::<ResultMode>().ok(), Some(ResultMode::Text));
        assert_eq!("XML".parse::<ResultMode>().ok(), Some(ResultMode::Structured));
        assert_eq!("structured".parse::<ResultMode>().ok(), Some(ResultMode::Structured));
        assert!(matches!(
            "pdf".parse::<ResultMode>(),
            Err(ResultError::UnknownMode(mode)) if mode == "pdf"
        ));
    }
}
