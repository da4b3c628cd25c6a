//! # pss-core: PSS Loading Data record model
//!
//! Pure building blocks of the PSS loader: nothing in this crate touches the
//! filesystem, the network, or the clock.
//!
//! ## Pipeline
//!
//! ```text
//! SourceRow ──transform──▶ StationBundle ──writes()──▶ PlannedWrite ──▶ store
//!                │                │
//!          normalize_key     FeederRecord (round-robin PTR)
//!                │                │
//!           KeyRegistry      LoginScheme / LoginRegistry
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use pss_core::{transform_station_row, CellValue, SourceRow, TransformContext};
//!
//! let row = SourceRow::new(0, vec![
//!     ("PSS NAME".to_string(), CellValue::text("River Side PTR")),
//!     ("FEEDERS".to_string(), CellValue::Integer(3)),
//!     ("LINEMAN".to_string(), CellValue::text("A,B")),
//!     ("HELPER".to_string(), CellValue::text("C")),
//! ]);
//! let bundle = transform_station_row(&row, &TransformContext::default())?.unwrap();
//! assert_eq!(bundle.station.key, "riversideptr");
//! assert_eq!(bundle.people.len(), 3);
//! # Ok::<(), pss_core::PssError>(())
//! ```
//!
//! ## Modules
//!
//! - [`row`] - cell values with a real notion of emptiness
//! - [`keys`] - key normalization, collision and login-id registries
//! - [`feeders`] - feeder parsing and PTR assignment
//! - [`transform`] - row transformers and feeder planning
//! - [`value`] - store field values, documents, field-level diffs
//! - [`error`] / [`diagnostics`] - error taxonomy and row diagnostics

pub mod diagnostics;
pub mod error;
pub mod feeders;
pub mod keys;
pub mod model;
pub mod row;
pub mod transform;
pub mod value;

pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use error::{PssError, PssResult, StoreError, StoreErrorKind};
pub use feeders::{assign_ptr, build_feeders, FeederRecord, FeederSpec, DEFAULT_PTR_COUNT};
pub use keys::{normalize_key, KeyRegistry, LoginRegistry, LoginScheme};
pub use model::{PersonRecord, Role, StationRecord};
pub use row::{CellValue, SourceRow};
pub use transform::{
    plan_feeders, transform_admin_row, transform_station_row, Collection, FeederPlan,
    PlannedWrite, StationBundle, TransformContext,
};
pub use value::{diff_patch, diff_replace, Document, FieldChange, FieldPath, FieldValue, Fields};
