//! Targeted patches of already-imported documents.
//!
//! Reconciliation never replaces a document: it reads the stored copy, diffs
//! the fields it owns, and patches only what differs. Running it twice
//! against an unchanged source performs no writes the second time.

use std::fmt;
use std::str::FromStr;

use tracing::{error, info, warn};

use pss_core::feeders::{feeder_fields, feeder_key_ordinal};
use pss_core::transform::{feeder_names_by_station, plan_feeders, FeederPlan};
use pss_core::{
    diff_patch, normalize_key, Document, FieldPath, FieldValue, PssError, PssResult, SourceRow,
    DEFAULT_PTR_COUNT,
};
use pss_io::DocumentStore;

use crate::collections::Collections;
use crate::retry::RetryPolicy;
use crate::summary::{RowOutcome, RowStatus, RunSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileTarget {
    /// Station `feeders`, `feederCount` and `ptrCount`
    Feeders,
    /// Feeder names inside daily submissions
    FeederNames,
}

impl ReconcileTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileTarget::Feeders => "feeders",
            ReconcileTarget::FeederNames => "feeder-names",
        }
    }
}

impl fmt::Display for ReconcileTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReconcileTarget {
    type Err = PssError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "feeders" => Ok(ReconcileTarget::Feeders),
            "feeder-names" => Ok(ReconcileTarget::FeederNames),
            other => Err(PssError::Config(format!(
                "unknown reconcile field '{other}' (expected feeders or feeder-names)"
            ))),
        }
    }
}

/// Feeder sheet (`PSS`, `Equipment`) and optional PTR sheet rows.
#[derive(Debug, Clone, Default)]
pub struct ReconcilePlan {
    pub feeder_sheet: String,
    pub feeder_rows: Vec<SourceRow>,
    pub ptr_rows: Vec<SourceRow>,
}

#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    pub dry_run: bool,
    pub retry: RetryPolicy,
    pub collections: Collections,
    pub default_ptr_count: u32,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            retry: RetryPolicy::default(),
            collections: Collections::default(),
            default_ptr_count: DEFAULT_PTR_COUNT,
        }
    }
}

pub fn run_reconcile(
    target: ReconcileTarget,
    plan: &ReconcilePlan,
    store: &impl DocumentStore,
    options: &ReconcileOptions,
) -> PssResult<RunSummary> {
    let mut summary = RunSummary::new();
    let plans = plan_feeders(
        &plan.feeder_rows,
        &plan.ptr_rows,
        options.default_ptr_count,
        &mut summary.diagnostics,
    )?;
    info!(
        %target,
        stations = plans.len(),
        dry_run = options.dry_run,
        "reconciling"
    );
    match target {
        ReconcileTarget::Feeders => reconcile_feeders(&plans, &plan.feeder_sheet, store, options, &mut summary),
        ReconcileTarget::FeederNames => reconcile_feeder_names(&plans, store, options, &mut summary),
    }
    info!("reconcile {target} finished: {summary}");
    Ok(summary)
}

fn reconcile_feeders(
    plans: &[FeederPlan],
    sheet: &str,
    store: &impl DocumentStore,
    options: &ReconcileOptions,
    summary: &mut RunSummary,
) {
    let collection = options.collections.stations.as_str();
    for plan in plans {
        let key = Some(plan.key.clone());
        let (feeders, ptr_count) = match (plan.feeders(), &plan.ptr_count) {
            (Some(feeders), Ok(ptr)) => (feeders, *ptr),
            (_, Err(err)) => {
                error!("{}: {err}", plan.key);
                summary.record(RowOutcome::failed(sheet, plan.first_row, key, err));
                continue;
            }
            (None, Ok(_)) => continue,
        };
        let target = format!("{collection}/{}", plan.key);
        let current = match options
            .retry
            .run(&format!("read {target}"), || store.get(collection, &plan.key))
        {
            Ok(Some(doc)) => doc,
            Ok(None) => {
                warn!("{target} does not exist; skipping {}", plan.name);
                summary.diagnostics.add_warning_with_entity(
                    "reconcile",
                    "station not found in store",
                    &plan.key,
                );
                summary.record(RowOutcome::skipped(sheet, plan.first_row, key, "station not found"));
                continue;
            }
            Err(err) => {
                error!("reading {target}: {err}");
                summary.record(RowOutcome::failed(sheet, plan.first_row, key, format!("{target}: {err}")));
                continue;
            }
        };

        let desired = feeder_fields(&feeders, ptr_count);
        let changes = diff_patch(&current, &desired);
        if changes.is_empty() {
            summary.record(RowOutcome::skipped(sheet, plan.first_row, key, "unchanged"));
            continue;
        }
        let updates: Vec<(FieldPath, FieldValue)> = changes
            .iter()
            .filter_map(|change| {
                change
                    .after
                    .clone()
                    .map(|value| (FieldPath::field(change.field.clone()), value))
            })
            .collect();
        let lines: Vec<String> = changes
            .iter()
            .map(|change| format!("{target}: {change}"))
            .collect();
        summary.record(apply(sheet, plan.first_row, key, &target, lines, || {
            store.patch(collection, &plan.key, &updates)
        }, options));
    }
}

fn reconcile_feeder_names(
    plans: &[FeederPlan],
    store: &impl DocumentStore,
    options: &ReconcileOptions,
    summary: &mut RunSummary,
) {
    let collection = options.collections.submissions.as_str();
    let names = feeder_names_by_station(plans);
    let mut entries = match options
        .retry
        .run(&format!("list {collection}"), || store.list(collection))
    {
        Ok(entries) => entries,
        Err(err) => {
            error!("listing {collection}: {err}");
            summary.record(RowOutcome::failed(collection, 0, None, format!("{collection}: {err}")));
            return;
        }
    };
    entries.sort_by(|a, b| a.id.cmp(&b.id));
    info!("{} {collection} document(s) to check", entries.len());

    for (index, entry) in entries.iter().enumerate() {
        let key = Some(entry.id.clone());
        let Some((station, feeders)) = station_feeders(entry) else {
            summary.record(RowOutcome::skipped(collection, index, key, "no station or feeders"));
            continue;
        };
        let Some(source) = names.get(&normalize_key(station)) else {
            summary.record(RowOutcome::skipped(
                collection,
                index,
                key,
                format!("no source feeders for station '{station}'"),
            ));
            continue;
        };

        let mut updates = Vec::new();
        let mut lines = Vec::new();
        let target = format!("{collection}/{}", entry.id);
        for (position, feeder_key) in ordered_feeder_keys(feeders).into_iter().enumerate() {
            let Some(wanted) = source.get(position) else {
                break;
            };
            let Some(feeder) = feeders.get(feeder_key).and_then(FieldValue::as_map) else {
                summary.diagnostics.add_warning_with_entity(
                    "reconcile",
                    &format!("feeders.{feeder_key} is not a map"),
                    &entry.id,
                );
                continue;
            };
            let stored = feeder.get("name").and_then(FieldValue::as_str);
            if stored != Some(wanted.as_str()) {
                let path = FieldPath::new(["feeders", feeder_key.as_str(), "name"]);
                lines.push(format!(
                    "{target}: {path}: {} -> {:?}",
                    stored.map_or_else(|| "<missing>".to_string(), |s| format!("{s:?}")),
                    wanted
                ));
                updates.push((path, FieldValue::string(wanted.as_str())));
            }
        }
        if updates.is_empty() {
            summary.record(RowOutcome::skipped(collection, index, key, "unchanged"));
            continue;
        }
        summary.record(apply(collection, index, key, &target, lines, || {
            store.patch(collection, &entry.id, &updates)
        }, options));
    }
}

fn station_feeders(entry: &Document) -> Option<(&str, &pss_core::Fields)> {
    let station = entry.get("pssStation").and_then(FieldValue::as_str)?;
    let feeders = entry.get("feeders").and_then(FieldValue::as_map)?;
    (!station.trim().is_empty()).then_some((station, feeders))
}

/// `feeder-<n>` keys by numeric suffix; keys without one sort last by name.
fn ordered_feeder_keys(feeders: &pss_core::Fields) -> Vec<&String> {
    let mut keys: Vec<&String> = feeders.keys().collect();
    keys.sort_by_key(|key| (feeder_key_ordinal(key).unwrap_or(u32::MAX), (*key).clone()));
    keys
}

fn apply(
    sheet: &str,
    row: usize,
    key: Option<String>,
    target: &str,
    changes: Vec<String>,
    mut patch: impl FnMut() -> Result<(), pss_core::StoreError>,
    options: &ReconcileOptions,
) -> RowOutcome {
    for line in &changes {
        info!("{line}");
    }
    if options.dry_run {
        let mut outcome = RowOutcome::new(sheet, row, key, RowStatus::Succeeded);
        outcome.changes = changes;
        return outcome;
    }
    match options.retry.run(&format!("patch {target}"), &mut patch) {
        Ok(()) => {
            let mut outcome = RowOutcome::new(sheet, row, key, RowStatus::Succeeded);
            outcome.writes = 1;
            outcome.changes = changes;
            outcome
        }
        Err(err) => {
            error!("patching {target}: {err}");
            let mut outcome = RowOutcome::failed(sheet, row, key, format!("{target}: {err}"));
            outcome.changes = changes;
            outcome
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pss_core::{CellValue, Fields, StoreErrorKind};
    use pss_io::MemoryStore;
    use std::time::Duration;

    fn row(index: usize, cells: &[(&str, CellValue)]) -> SourceRow {
        SourceRow::new(
            index,
            cells.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
        )
    }

    fn feeder(index: usize, pss: &str, equipment: &str) -> SourceRow {
        row(
            index,
            &[
                ("PSS", CellValue::text(pss)),
                ("Equipment", CellValue::text(equipment)),
            ],
        )
    }

    fn plan() -> ReconcilePlan {
        ReconcilePlan {
            feeder_sheet: "Sheet3".into(),
            feeder_rows: vec![
                feeder(0, "DARLIPALI", "11kV GHANTIMAL"),
                feeder(1, "DARLIPALI", "11kV RAIDIHI"),
                feeder(2, "DARLIPALI", "11kV BHALUMUDA"),
                feeder(3, "LEPHRIPARA", "11kV dmf"),
            ],
            ptr_rows: vec![row(
                0,
                &[
                    ("PSS NAME", CellValue::text("DARLIPALI")),
                    ("PTR COUNT", CellValue::Integer(2)),
                ],
            )],
        }
    }

    fn options() -> ReconcileOptions {
        ReconcileOptions {
            retry: RetryPolicy {
                max_retries: 2,
                backoff: Duration::ZERO,
            },
            ..ReconcileOptions::default()
        }
    }

    fn fields(pairs: Vec<(&str, FieldValue)>) -> Fields {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    fn v0_station(id: &str, count: i64) -> Document {
        Document::new(
            id,
            fields(vec![
                ("name", FieldValue::string(id.to_uppercase())),
                ("feeders", FieldValue::Integer(count)),
                ("linemen", FieldValue::list(["A"])),
            ]),
        )
    }

    fn submission(id: &str, station: &str, names: &[&str]) -> Document {
        let feeders: Fields = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let entry = fields(vec![
                    ("name", FieldValue::string(*name)),
                    ("load", FieldValue::Float(1.5)),
                ]);
                (format!("feeder-{}", i + 1), FieldValue::Map(entry))
            })
            .collect();
        Document::new(
            id,
            fields(vec![
                ("pssStation", FieldValue::string(station)),
                ("feeders", FieldValue::Map(feeders)),
            ]),
        )
    }

    #[test]
    fn v0_station_is_migrated_once() {
        let store = MemoryStore::new()
            .with_document("stations", v0_station("darlipali", 3))
            .with_document("stations", v0_station("lephripara", 1));

        let first = run_reconcile(ReconcileTarget::Feeders, &plan(), &store, &options()).unwrap();
        assert_eq!(first.succeeded, 2);
        assert_eq!(first.writes, 2);

        let doc = store.document("stations", "darlipali").unwrap();
        assert_eq!(doc.get("feederCount"), Some(&FieldValue::Integer(3)));
        assert_eq!(doc.get("ptrCount"), Some(&FieldValue::Integer(2)));
        let third = doc
            .get_path(&FieldPath::new(["feeders", "feeder-3", "ptrNo"]))
            .cloned();
        assert_eq!(third, Some(FieldValue::Integer(1)));
        // untouched fields survive the patch
        assert_eq!(doc.get("linemen"), Some(&FieldValue::list(["A"])));

        let second = run_reconcile(ReconcileTarget::Feeders, &plan(), &store, &options()).unwrap();
        assert_eq!(second.writes, 0);
        assert_eq!(second.skipped, 2);
        assert_eq!(store.write_count(), 2);
    }

    #[test]
    fn unsupported_array_layout_is_rewritten() {
        let mut legacy = v0_station("lephripara", 0);
        legacy.fields.remove("feeders");
        legacy.unsupported.push("feeders".into());
        let store = MemoryStore::new().with_document("stations", legacy);

        let summary = run_reconcile(ReconcileTarget::Feeders, &plan(), &store, &options()).unwrap();
        assert_eq!(summary.writes, 1);
        let doc = store.document("stations", "lephripara").unwrap();
        assert!(doc.unsupported.is_empty());
        assert!(doc.get("feeders").and_then(FieldValue::as_map).is_some());
    }

    #[test]
    fn missing_station_is_skipped_with_warning() {
        let store = MemoryStore::new().with_document("stations", v0_station("darlipali", 3));
        let summary = run_reconcile(ReconcileTarget::Feeders, &plan(), &store, &options()).unwrap();
        let skipped = summary
            .outcomes
            .iter()
            .find(|o| o.key.as_deref() == Some("lephripara"))
            .unwrap();
        assert_eq!(skipped.status, RowStatus::Skipped);
        assert!(summary.diagnostics.warning_count() >= 1);
    }

    #[test]
    fn dry_run_reads_but_never_writes() {
        let store = MemoryStore::read_only().with_document("stations", v0_station("darlipali", 3));
        let mut opts = options();
        opts.dry_run = true;
        let summary = run_reconcile(ReconcileTarget::Feeders, &plan(), &store, &opts).unwrap();
        assert_eq!(store.attempted_writes(), 0);
        let darlipali = &summary.outcomes[0];
        assert!(darlipali.changes.iter().any(|c| c.contains("feederCount")));
    }

    #[test]
    fn collision_in_feeder_sheet_aborts_before_writes() {
        let store = MemoryStore::new().with_document("stations", v0_station("darlipali", 3));
        let mut plan = plan();
        plan.feeder_rows.push(feeder(4, "Darli Pali", "11kV X"));
        let err = run_reconcile(ReconcileTarget::Feeders, &plan, &store, &options()).unwrap_err();
        assert!(matches!(err, PssError::KeyCollision { .. }));
        assert_eq!(store.attempted_writes(), 0);
    }

    #[test]
    fn feeder_names_patch_only_differing_paths() {
        let store = MemoryStore::new()
            .with_document(
                "submissions",
                submission("s1", "darlipali", &["Feeder-1", "11kV RAIDIHI", "Feeder-3"]),
            )
            .with_document("submissions", submission("s2", "lephripara", &["11kV dmf"]))
            .with_document("submissions", submission("s3", "unknown", &["Feeder-1"]))
            .with_document("submissions", Document::new("s4", Fields::new()));

        let summary =
            run_reconcile(ReconcileTarget::FeederNames, &plan(), &store, &options()).unwrap();
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.skipped, 3);
        let writes = store.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(
            writes[0].paths,
            Some(vec![
                "feeders.feeder-1.name".to_string(),
                "feeders.feeder-3.name".to_string()
            ])
        );
        let doc = store.document("submissions", "s1").unwrap();
        let load = doc.get_path(&FieldPath::new(["feeders", "feeder-1", "load"]));
        assert_eq!(load, Some(&FieldValue::Float(1.5)));

        let again = run_reconcile(ReconcileTarget::FeederNames, &plan(), &store, &options()).unwrap();
        assert_eq!(again.writes, 0);
    }

    #[test]
    fn feeder_keys_sort_numerically() {
        let feeders: Fields = (1..=11)
            .map(|n| (format!("feeder-{n}"), FieldValue::Null))
            .collect();
        let keys: Vec<&str> = ordered_feeder_keys(&feeders).into_iter().map(String::as_str).collect();
        assert_eq!(keys[1], "feeder-2");
        assert_eq!(keys[10], "feeder-11");
    }

    #[test]
    fn listing_failure_is_retried() {
        let store = MemoryStore::new()
            .with_document("submissions", submission("s1", "lephripara", &["old"]));
        store.fail_next(StoreErrorKind::Timeout);
        let summary =
            run_reconcile(ReconcileTarget::FeederNames, &plan(), &store, &options()).unwrap();
        assert_eq!(summary.writes, 1);
    }

    #[test]
    fn targets_parse() {
        assert_eq!("feeders".parse::<ReconcileTarget>().unwrap(), ReconcileTarget::Feeders);
        assert_eq!(
            "feeder-names".parse::<ReconcileTarget>().unwrap(),
            ReconcileTarget::FeederNames
        );
        assert!("linemen".parse::<ReconcileTarget>().is_err());
    }
}
