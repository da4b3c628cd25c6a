//! Station/personnel import.
//!
//! **Phases:**
//! 1. Transform every station and admin row (pure). Invalid rows are recorded
//!    as failed, blank rows as skipped.
//! 2. Register every station key and login id. A collision aborts the run
//!    before the store is touched.
//! 3. Write station documents, then their people, then admins. In a dry run
//!    the stored copy is read instead and the field-level diff recorded.

use std::collections::BTreeSet;

use tracing::{error, info};

use pss_core::{
    diff_replace, transform_admin_row, transform_station_row, KeyRegistry, LoginRegistry,
    PersonRecord, PlannedWrite, PssResult, SourceRow, StationBundle, TransformContext,
};
use pss_io::DocumentStore;

use crate::collections::Collections;
use crate::retry::RetryPolicy;
use crate::summary::{RowOutcome, RowStatus, RunSummary};

/// Source rows of one import.
#[derive(Debug, Clone, Default)]
pub struct ImportPlan {
    pub station_sheet: String,
    pub station_rows: Vec<SourceRow>,
    pub admin_sheet: Option<String>,
    pub admin_rows: Vec<SourceRow>,
}

#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub dry_run: bool,
    /// Restrict writes to these `(sheet, row)` pairs; collision checks
    /// still cover every row
    pub only_rows: Option<BTreeSet<(String, usize)>>,
    pub retry: RetryPolicy,
    pub collections: Collections,
    pub context: TransformContext,
}

impl ImportOptions {
    fn selected(&self, sheet: &str, row: usize) -> bool {
        self.only_rows
            .as_ref()
            .map_or(true, |rows| rows.contains(&(sheet.to_string(), row)))
    }
}

pub fn run_import(
    plan: &ImportPlan,
    store: &impl DocumentStore,
    options: &ImportOptions,
) -> PssResult<RunSummary> {
    let mut summary = RunSummary::new();
    let station_sheet = plan.station_sheet.as_str();
    let admin_sheet = plan.admin_sheet.as_deref().unwrap_or("admins");

    info!(
        rows = plan.station_rows.len(),
        admins = plan.admin_rows.len(),
        dry_run = options.dry_run,
        "transforming source rows"
    );
    let mut bundles: Vec<StationBundle> = Vec::new();
    for row in &plan.station_rows {
        match transform_station_row(row, &options.context) {
            Ok(Some(bundle)) => bundles.push(bundle),
            Ok(None) => {
                if options.selected(station_sheet, row.index) {
                    summary.record(RowOutcome::skipped(station_sheet, row.index, None, "blank row"));
                }
            }
            Err(err) if !err.is_fatal() => {
                if options.selected(station_sheet, row.index) {
                    error!("{station_sheet}: {err}");
                    summary.diagnostics.add_error_at_row("transform", &err.to_string(), row.index);
                    summary.record(RowOutcome::failed(station_sheet, row.index, None, &err));
                }
            }
            Err(err) => return Err(err),
        }
    }

    let mut admins: Vec<(usize, PersonRecord)> = Vec::new();
    for row in &plan.admin_rows {
        match transform_admin_row(row) {
            Ok(Some(admin)) => admins.push((row.index, admin)),
            Ok(None) => {
                if options.selected(admin_sheet, row.index) {
                    summary.record(RowOutcome::skipped(admin_sheet, row.index, None, "blank row"));
                }
            }
            Err(err) if !err.is_fatal() => {
                if options.selected(admin_sheet, row.index) {
                    error!("{admin_sheet}: {err}");
                    summary.diagnostics.add_error_at_row("transform", &err.to_string(), row.index);
                    summary.record(RowOutcome::failed(admin_sheet, row.index, None, &err));
                }
            }
            Err(err) => return Err(err),
        }
    }

    check_collisions(&bundles, &admins)?;

    for bundle in &bundles {
        if !options.selected(station_sheet, bundle.row) {
            continue;
        }
        let outcome = write_row(
            station_sheet,
            bundle.row,
            &bundle.station.key,
            bundle.writes(),
            store,
            options,
        );
        summary.record(outcome);
    }

    for (row, admin) in &admins {
        if !options.selected(admin_sheet, *row) {
            continue;
        }
        let writes = vec![pss_core::transform::person_write(admin)];
        let outcome = write_row(admin_sheet, *row, &admin.login_id, writes, store, options);
        summary.record(outcome);
    }

    info!("import finished: {summary}");
    Ok(summary)
}

/// Station keys and login ids across the whole source, admins included.
fn check_collisions(bundles: &[StationBundle], admins: &[(usize, PersonRecord)]) -> PssResult<()> {
    let mut keys = KeyRegistry::new();
    let mut logins = LoginRegistry::new();
    for bundle in bundles {
        keys.register_unique(&bundle.station.name)?;
        for person in &bundle.people {
            logins.register(&person.login_id, &person.describe())?;
        }
    }
    for (_, admin) in admins {
        logins.register(&admin.login_id, &admin.describe())?;
    }
    Ok(())
}

fn write_row(
    sheet: &str,
    row: usize,
    key: &str,
    writes: Vec<PlannedWrite>,
    store: &impl DocumentStore,
    options: &ImportOptions,
) -> RowOutcome {
    let mut outcome = RowOutcome::new(sheet, row, Some(key.to_string()), RowStatus::Succeeded);
    for write in writes {
        let collection = options.collections.name(write.collection);
        let target = format!("{collection}/{}", write.id);
        if options.dry_run {
            let current = match options
                .retry
                .run(&format!("read {target}"), || store.get(collection, &write.id))
            {
                Ok(current) => current,
                Err(err) => {
                    error!("{sheet} line {}: reading {target}: {err}", row + 2);
                    return RowOutcome::failed(sheet, row, Some(key.to_string()), format!("{target}: {err}"));
                }
            };
            let changes = diff_replace(current.as_ref(), &write.fields);
            if current.is_none() {
                outcome.changes.push(format!("{target}: new document"));
            }
            outcome
                .changes
                .extend(changes.iter().map(|change| format!("{target}: {change}")));
            continue;
        }
        match options
            .retry
            .run(&format!("write {target}"), || store.upsert(collection, &write.id, &write.fields))
        {
            Ok(()) => outcome.writes += 1,
            Err(err) => {
                error!("{sheet} line {}: writing {target}: {err}", row + 2);
                let mut failed =
                    RowOutcome::failed(sheet, row, Some(key.to_string()), format!("{target}: {err}"));
                failed.writes = outcome.writes;
                return failed;
            }
        }
    }
    if options.dry_run && outcome.changes.is_empty() {
        info!("{sheet} line {}: {key} already up to date", row + 2);
        outcome.note = Some("unchanged".to_string());
    }
    outcome
}
