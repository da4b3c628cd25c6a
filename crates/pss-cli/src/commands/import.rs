use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use tracing::{info, warn};

use pss_io::{schema, Workbook};
use pss_sync::{load_run_report, run_import, ImportOptions, ImportPlan};

use super::common::{finish, open_store, read_sheet};
use pss_cli::config::PssConfig;

pub struct ImportArgs<'a> {
    pub source: &'a Path,
    pub sheet: &'a str,
    pub admin_sheet: Option<&'a str>,
    pub dry_run: bool,
    pub report: Option<&'a Path>,
    pub retry_failed: Option<&'a Path>,
}

pub fn handle(args: ImportArgs<'_>, credentials: Option<&Path>, config: &PssConfig) -> Result<ExitCode> {
    let only_rows = match args.retry_failed {
        Some(path) => {
            let previous = load_run_report(path)?;
            let failed = previous.failed_rows();
            if failed.is_empty() {
                println!("No failed rows in {}; nothing to retry", path.display());
                return Ok(ExitCode::SUCCESS);
            }
            info!("retrying {} failed row(s) from {}", failed.len(), path.display());
            Some(failed)
        }
        None => None,
    };

    let mut book = Workbook::open(args.source)?;
    let (station_sheet, station_rows) = read_sheet(&mut book, args.sheet, &schema::STATION)?;
    let (admin_sheet, admin_rows) = match args.admin_sheet {
        Some(selector) => {
            let (name, rows) = read_sheet(&mut book, selector, &schema::ADMIN)?;
            (Some(name), rows)
        }
        None => {
            warn!("no --admin-sheet given; admins will not be imported");
            (None, Vec::new())
        }
    };
    let plan = ImportPlan {
        station_sheet,
        station_rows,
        admin_sheet,
        admin_rows,
    };

    let store = open_store(credentials, config, &config.collections.stations)?;
    let options = ImportOptions {
        dry_run: args.dry_run,
        only_rows,
        retry: config.retry_policy(),
        collections: config.collections(),
        context: config.transform_context(),
    };
    let summary = run_import(&plan, &store, &options)?;
    finish("import", args.dry_run, &summary, args.report)
}
