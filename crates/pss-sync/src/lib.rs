//! Import and reconcile orchestration.
//!
//! Both entry points take already-read source rows and a
//! [`pss_io::DocumentStore`], run sequentially, and return a [`RunSummary`]
//! whose outcomes can be persisted as a [`RunReport`].

pub mod collections;
pub mod import;
pub mod preflight;
pub mod reconcile;
pub mod report;
pub mod retry;
pub mod summary;

pub use collections::Collections;
pub use import::{run_import, ImportOptions, ImportPlan};
pub use preflight::verify_store;
pub use reconcile::{run_reconcile, ReconcileOptions, ReconcilePlan, ReconcileTarget};
pub use report::{load_run_report, write_run_report, RunReport};
pub use retry::RetryPolicy;
pub use summary::{RowOutcome, RowStatus, RunSummary};
