pub mod cli;
pub mod config;

pub use cli::{build_cli_command, Cli, Commands, ReconcileField};
pub use config::{load_config, PssConfig};
