//! Per-row outcomes and run totals.

use std::fmt;

use pss_core::Diagnostics;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowStatus {
    Succeeded,
    Failed,
    Skipped,
}

impl RowStatus {
    pub fn symbol(&self) -> &'static str {
        match self {
            RowStatus::Succeeded => "✓",
            RowStatus::Failed => "✗",
            RowStatus::Skipped => "-",
        }
    }
}

/// What happened to one source row (or one stored document, for
/// reconciliations driven by a listing).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowOutcome {
    pub sheet: String,
    /// 0-based data row index
    pub row: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub status: RowStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Why a row was skipped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Documents written for this row
    pub writes: usize,
    /// Field-level changes (applied, or would-be in a dry run)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<String>,
}

impl RowOutcome {
    pub fn new(sheet: &str, row: usize, key: Option<String>, status: RowStatus) -> Self {
        Self {
            sheet: sheet.to_string(),
            row,
            key,
            status,
            error: None,
            note: None,
            writes: 0,
            changes: Vec::new(),
        }
    }

    pub fn skipped(sheet: &str, row: usize, key: Option<String>, note: impl Into<String>) -> Self {
        let mut outcome = Self::new(sheet, row, key, RowStatus::Skipped);
        outcome.note = Some(note.into());
        outcome
    }

    pub fn failed(sheet: &str, row: usize, key: Option<String>, error: impl fmt::Display) -> Self {
        let mut outcome = Self::new(sheet, row, key, RowStatus::Failed);
        outcome.error = Some(error.to_string());
        outcome
    }
}

impl fmt::Display for RowOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}:{}", self.status.symbol(), self.sheet, self.row + 2)?;
        if let Some(key) = &self.key {
            write!(f, " {key}")?;
        }
        if let Some(error) = &self.error {
            write!(f, " - {error}")?;
        } else if let Some(note) = &self.note {
            write!(f, " ({note})")?;
        }
        Ok(())
    }
}

/// Totals of one import or reconcile run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub writes: usize,
    pub outcomes: Vec<RowOutcome>,
    #[serde(default)]
    pub diagnostics: Diagnostics,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: RowOutcome) {
        match outcome.status {
            RowStatus::Succeeded => self.succeeded += 1,
            RowStatus::Failed => self.failed += 1,
            RowStatus::Skipped => self.skipped += 1,
        }
        self.writes += outcome.writes;
        self.outcomes.push(outcome);
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} succeeded, {} failed, {} skipped, {} write(s)",
            self.succeeded, self.failed, self.skipped, self.writes
        )
    }
}
