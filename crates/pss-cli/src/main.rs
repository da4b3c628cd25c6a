use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::FmtSubscriber;

use pss_cli::{load_config, Cli, Commands};

mod commands;

use commands::import::ImportArgs;
use commands::reconcile::ReconcileArgs;

/// Fatal errors: bad source, sheet, schema, collisions, credentials, config.
const EXIT_FATAL: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err:#}");
            return ExitCode::from(EXIT_FATAL);
        }
    };
    let level = match cli.log_level {
        Some(level) => level,
        None => config.log_level().unwrap_or(tracing::Level::INFO),
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("warning: logging disabled: {err}");
    }

    let credentials = cli.credentials.as_deref();
    let result = match &cli.command {
        Commands::Import {
            source,
            sheet,
            admin_sheet,
            dry_run,
            report,
            retry_failed,
        } => commands::import::handle(
            ImportArgs {
                source,
                sheet,
                admin_sheet: admin_sheet.as_deref(),
                dry_run: *dry_run,
                report: report.as_deref(),
                retry_failed: retry_failed.as_deref(),
            },
            credentials,
            &config,
        ),
        Commands::Reconcile {
            field,
            source,
            sheet,
            ptr_sheet,
            dry_run,
            report,
        } => commands::reconcile::handle(
            ReconcileArgs {
                target: (*field).into(),
                source,
                sheet,
                ptr_sheet: ptr_sheet.as_deref(),
                dry_run: *dry_run,
                report: report.as_deref(),
            },
            credentials,
            &config,
        ),
        Commands::Completions { shell, out } => {
            commands::completions::handle(*shell, out.as_deref()).map(|()| ExitCode::SUCCESS)
        }
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            error!("{err:#}");
            eprintln!("error: {err:#}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}
