use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::info;

use pss_core::SourceRow;
use pss_io::schema::SheetSchema;
use pss_io::{resolve_credentials, FirestoreStore, Workbook};
use pss_sync::{verify_store, write_run_report, RowStatus, RunReport, RunSummary};

use pss_cli::config::PssConfig;

/// Resolve credentials, build the store client and prove it can read
/// `collection` before any row is touched.
pub fn open_store(
    credentials: Option<&Path>,
    config: &PssConfig,
    collection: &str,
) -> Result<FirestoreStore> {
    let creds = resolve_credentials(credentials)?;
    let auth = creds.auth()?;
    info!(
        project = %creds.project_id,
        database = %config.store.database,
        "connecting to document store"
    );
    let store = FirestoreStore::new(config.firestore(&creds.project_id), auth)?;
    verify_store(&store, collection, &config.retry_policy())?;
    Ok(store)
}

/// Resolve a sheet, check its columns and read every row.
pub fn read_sheet(
    book: &mut Workbook,
    selector: &str,
    schema: &SheetSchema,
) -> Result<(String, Vec<SourceRow>)> {
    let sheet = book.sheet(selector)?;
    let name = sheet.name().to_string();
    schema.check(&name, sheet.headers())?;
    let rows = sheet.collect_rows()?;
    info!(sheet = %name, kind = schema.kind, rows = rows.len(), "read sheet");
    Ok((name, rows))
}

pub fn print_summary(summary: &RunSummary, dry_run: bool) {
    for outcome in &summary.outcomes {
        if outcome.status == RowStatus::Skipped && outcome.changes.is_empty() && !dry_run {
            continue;
        }
        println!("{outcome}");
        for change in &outcome.changes {
            println!("    {change}");
        }
    }
    let prefix = if dry_run { "dry run: " } else { "" };
    println!("{prefix}{summary}");
    if !summary.diagnostics.issues.is_empty() {
        println!("{}", summary.diagnostics.summary());
    }
}

pub fn finish(
    command: &str,
    dry_run: bool,
    summary: &RunSummary,
    report: Option<&Path>,
) -> Result<ExitCode> {
    print_summary(summary, dry_run);
    if let Some(path) = report {
        write_run_report(path, &RunReport::from_summary(command, dry_run, summary))
            .with_context(|| format!("saving report for '{command}'"))?;
        println!("Wrote run report to {}", path.display());
    }
    Ok(if summary.has_failures() {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    })
}
