use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use tracing::warn;

use pss_io::{schema, Workbook};
use pss_sync::{run_reconcile, ReconcileOptions, ReconcilePlan, ReconcileTarget};

use super::common::{finish, open_store, read_sheet};
use pss_cli::config::PssConfig;

pub struct ReconcileArgs<'a> {
    pub target: ReconcileTarget,
    pub source: &'a Path,
    pub sheet: &'a str,
    pub ptr_sheet: Option<&'a str>,
    pub dry_run: bool,
    pub report: Option<&'a Path>,
}

pub fn handle(
    args: ReconcileArgs<'_>,
    credentials: Option<&Path>,
    config: &PssConfig,
) -> Result<ExitCode> {
    let mut book = Workbook::open(args.source)?;
    let (feeder_sheet, feeder_rows) = read_sheet(&mut book, args.sheet, &schema::FEEDER)?;
    let ptr_rows = match args.ptr_sheet {
        Some(selector) => read_sheet(&mut book, selector, &schema::PTR)?.1,
        None => {
            if args.target == ReconcileTarget::Feeders {
                warn!(
                    "no --ptr-sheet given; every station uses {} PTR(s)",
                    config.import.default_ptr_count
                );
            }
            Vec::new()
        }
    };
    let plan = ReconcilePlan {
        feeder_sheet,
        feeder_rows,
        ptr_rows,
    };

    let probed = match args.target {
        ReconcileTarget::Feeders => &config.collections.stations,
        ReconcileTarget::FeederNames => &config.collections.submissions,
    };
    let store = open_store(credentials, config, probed)?;
    let options = ReconcileOptions {
        dry_run: args.dry_run,
        retry: config.retry_policy(),
        collections: config.collections(),
        default_ptr_count: config.import.default_ptr_count,
    };
    let summary = run_reconcile(args.target, &plan, &store, &options)?;
    finish(
        &format!("reconcile {}", args.target),
        args.dry_run,
        &summary,
        args.report,
    )
}
