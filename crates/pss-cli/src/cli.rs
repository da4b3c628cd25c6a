use clap::{CommandFactory, Parser, Subcommand, ValueEnum, ValueHint};
use clap_complete::Shell;
use std::path::PathBuf;

use pss_sync::ReconcileTarget;

#[derive(Parser, Debug)]
#[command(author, version, about = "Load PSS station, personnel and feeder data into the document store", long_about = None)]
pub struct Cli {
    /// Set the logging level [default: info, or [logging] level from the config file]
    #[arg(long, global = true)]
    pub log_level: Option<tracing::Level>,

    /// Configuration file (defaults to <config dir>/pss-loader/config.toml)
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Store credentials JSON (falls back to PSS_CREDENTIALS, then PSS_PROJECT_ID + token/key)
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub credentials: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import stations, personnel and admins from a workbook
    Import {
        /// Workbook (.xlsx/.xls/.ods), a .csv file, or a directory of .csv sheets
        #[arg(long, value_hint = ValueHint::AnyPath)]
        source: PathBuf,
        /// Station sheet name or 0-based index
        #[arg(long)]
        sheet: String,
        /// Admin sheet name or 0-based index
        #[arg(long)]
        admin_sheet: Option<String>,
        /// Read and diff against the store without writing
        #[arg(long)]
        dry_run: bool,
        /// Write a JSON run report here
        #[arg(long, value_hint = ValueHint::FilePath)]
        report: Option<PathBuf>,
        /// Only rerun the rows that failed in this earlier run report
        #[arg(long, value_hint = ValueHint::FilePath)]
        retry_failed: Option<PathBuf>,
    },
    /// Patch one derived field of already-imported documents
    Reconcile {
        /// Field to reconcile
        #[arg(long, value_enum)]
        field: ReconcileField,
        /// Workbook holding the feeder sheet (and PTR sheet)
        #[arg(long, value_hint = ValueHint::AnyPath)]
        source: PathBuf,
        /// Feeder sheet (`PSS`, `Equipment`) name or 0-based index
        #[arg(long, default_value = "0")]
        sheet: String,
        /// PTR sheet (`PSS NAME`, `PTR COUNT`) name or 0-based index
        #[arg(long)]
        ptr_sheet: Option<String>,
        /// Read and diff against the store without writing
        #[arg(long)]
        dry_run: bool,
        /// Write a JSON run report here
        #[arg(long, value_hint = ValueHint::FilePath)]
        report: Option<PathBuf>,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: Shell,
        /// Write output to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileField {
    /// Station feeders map, feederCount and ptrCount
    Feeders,
    /// Feeder names inside daily submissions
    FeederNames,
}

impl From<ReconcileField> for ReconcileTarget {
    fn from(field: ReconcileField) -> Self {
        match field {
            ReconcileField::Feeders => ReconcileTarget::Feeders,
            ReconcileField::FeederNames => ReconcileTarget::FeederNames,
        }
    }
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}
