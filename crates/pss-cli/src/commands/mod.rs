pub mod common;
pub mod completions;
pub mod import;
pub mod reconcile;
