use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use crate::summary::{RowOutcome, RowStatus, RunSummary};
use pss_core::Diagnostics;

/// JSON record of a finished run, also the input of `--retry-failed`.
#[derive(Debug, Serialize, Deserialize)]
pub struct RunReport {
    pub created_at: DateTime<Utc>,
    pub command: String,
    pub dry_run: bool,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub writes: usize,
    pub outcomes: Vec<RowOutcome>,
    #[serde(default)]
    pub diagnostics: Diagnostics,
}

impl RunReport {
    pub fn from_summary(command: &str, dry_run: bool, summary: &RunSummary) -> Self {
        Self {
            created_at: Utc::now(),
            command: command.to_string(),
            dry_run,
            succeeded: summary.succeeded,
            failed: summary.failed,
            skipped: summary.skipped,
            writes: summary.writes,
            outcomes: summary.outcomes.clone(),
            diagnostics: summary.diagnostics.clone(),
        }
    }

    /// `(sheet, row)` pairs whose status was failed.
    pub fn failed_rows(&self) -> BTreeSet<(String, usize)> {
        self.outcomes
            .iter()
            .filter(|o| o.status == RowStatus::Failed)
            .map(|o| (o.sheet.clone(), o.row))
            .collect()
    }
}

pub fn write_run_report(path: &Path, report: &RunReport) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating report directory '{}'", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(report).context("serializing run report to JSON")?;
    fs::write(path, json).with_context(|| format!("writing run report '{}'", path.display()))?;
    Ok(())
}

pub fn load_run_report(path: &Path) -> Result<RunReport> {
    let file = fs::File::open(path)
        .with_context(|| format!("opening run report '{}'", path.display()))?;
    serde_json::from_reader(file)
        .with_context(|| format!("parsing run report '{}'", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn report_writes_and_reads_back() {
        let mut summary = RunSummary::new();
        summary.record(RowOutcome::new("Sheet1", 0, Some("darlipali".into()), RowStatus::Succeeded));
        summary.record(RowOutcome::failed("Sheet1", 3, Some("sadar".into()), "FEEDERS empty"));
        summary.record(RowOutcome::failed("admins", 1, None, "bad phone"));
        summary
            .diagnostics
            .add_warning_with_entity("ptr", "no PTR count given; using 2", "darlipali");

        let report = RunReport::from_summary("import", false, &summary);
        let tmp = NamedTempFile::new().unwrap();
        write_run_report(tmp.path(), &report).unwrap();
        let parsed = load_run_report(tmp.path()).unwrap();

        assert_eq!(parsed.command, "import");
        assert_eq!(parsed.failed, 2);
        assert_eq!(parsed.diagnostics.warning_count(), 1);
        let failed: Vec<_> = parsed.failed_rows().into_iter().collect();
        assert_eq!(
            failed,
            vec![("Sheet1".to_string(), 3), ("admins".to_string(), 1)]
        );
    }
}
