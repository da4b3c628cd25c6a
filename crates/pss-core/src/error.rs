//! Error types shared by every PSS loader crate.
//!
//! [`PssError`] covers the whole taxonomy of an import or reconcile run.
//! Errors are split into two classes:
//!
//! - **fatal** errors ([`PssError::is_fatal`]) stop the run, ideally before the
//!   store has been touched (missing source, bad schema, key collisions);
//! - **row-level** errors are recorded against the offending row and the run
//!   carries on with the next one.
//!
//! # Example
//!
//! ```
//! use pss_core::{PssError, PssResult};
//!
//! fn parse_count(raw: &str) -> PssResult<u32> {
//!     raw.parse().map_err(|_| PssError::InvalidField {
//!         row: 0,
//!         column: "FEEDERS".into(),
//!         reason: format!("'{raw}' is not a positive integer"),
//!     })
//! }
//!
//! let err = parse_count("nan").unwrap_err();
//! assert!(!err.is_fatal());
//! ```

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure classes reported by a document store call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreErrorKind {
    /// The call did not complete within the configured timeout.
    Timeout,
    /// The service or network was unreachable or overloaded.
    Unavailable,
    /// Credentials were rejected or lack access.
    PermissionDenied,
    /// The write conflicted with the stored document state.
    Conflict,
    /// The addressed document does not exist.
    NotFound,
    /// The request was refused as invalid.
    Rejected,
    /// The response could not be understood.
    Malformed,
}

impl StoreErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreErrorKind::Timeout => "timeout",
            StoreErrorKind::Unavailable => "unavailable",
            StoreErrorKind::PermissionDenied => "permission denied",
            StoreErrorKind::Conflict => "conflict",
            StoreErrorKind::NotFound => "not found",
            StoreErrorKind::Rejected => "rejected",
            StoreErrorKind::Malformed => "malformed response",
        }
    }
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error from a single store round trip.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct StoreError {
    pub kind: StoreErrorKind,
    pub message: String,
}

impl StoreError {
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Timeouts and unavailability are transient; everything else is surfaced immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            StoreErrorKind::Timeout | StoreErrorKind::Unavailable
        )
    }
}

/// Unified error type for all loader operations.
#[derive(Error, Debug)]
pub enum PssError {
    /// The source locator does not resolve to a readable file or directory
    #[error("source not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// No sheet matches the selector
    #[error("sheet '{selector}' not found (available: {})", .available.join(", "))]
    SheetNotFound {
        selector: String,
        available: Vec<String>,
    },

    /// Required columns are missing from a sheet
    #[error("sheet '{sheet}' is missing required column(s) {missing:?} (found {found:?})")]
    Schema {
        sheet: String,
        missing: Vec<String>,
        found: Vec<String>,
    },

    /// A cell could not be coerced; `row` is the 0-based data row index
    #[error("sheet line {}: invalid value in column '{column}': {reason}", .row + 2)]
    InvalidField {
        row: usize,
        column: String,
        reason: String,
    },

    /// Two source rows derive the same document key
    #[error("key collision: '{first}' and '{second}' both normalize to '{key}'")]
    KeyCollision {
        key: String,
        first: String,
        second: String,
    },

    /// A login identifier was derived twice
    #[error("login identifier {login_id} assigned to both {first} and {second}")]
    LoginCollision {
        login_id: String,
        first: String,
        second: String,
    },

    /// A stored value falls outside the supported field types
    #[error("unsupported field type '{wire_type}' in field '{field}'")]
    UnsupportedFieldType { field: String, wire_type: String },

    /// Document store failure
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The store could not be reached or refused the credentials before any
    /// row was processed
    #[error("cannot use document store ({collection}): {source}")]
    StoreUnavailable {
        collection: String,
        source: StoreError,
    },

    /// Missing or unreadable store credentials
    #[error("credentials error: {0}")]
    Credentials(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("parse error: {0}")]
    Parse(String),
}

/// Convenience type alias for Results using PssError.
pub type PssResult<T> = Result<T, PssError>;

impl PssError {
    /// Fatal errors abort the whole run; the rest are isolated to a single row.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            PssError::InvalidField { .. }
                | PssError::Store(_)
                | PssError::UnsupportedFieldType { .. }
        )
    }
}

impl From<serde_json::Error> for PssError {
    fn from(err: serde_json::Error) -> Self {
        PssError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PssError::InvalidField {
            row: 3,
            column: "FEEDERS".into(),
            reason: "empty cell".into(),
        };
        let text = err.to_string();
        assert!(text.contains("sheet line 5"));
        assert!(text.contains("FEEDERS"));
    }

    #[test]
    fn test_fatal_classification() {
        assert!(PssError::SourceNotFound(PathBuf::from("x.xlsx")).is_fatal());
        assert!(PssError::KeyCollision {
            key: "riverside".into(),
            first: "River Side".into(),
            second: "RiverSide".into(),
        }
        .is_fatal());
        assert!(!PssError::Store(StoreError::new(StoreErrorKind::Timeout, "slow")).is_fatal());
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(StoreError::new(StoreErrorKind::Timeout, "").is_retryable());
        assert!(StoreError::new(StoreErrorKind::Unavailable, "").is_retryable());
        assert!(!StoreError::new(StoreErrorKind::PermissionDenied, "").is_retryable());
        assert!(!StoreError::new(StoreErrorKind::Conflict, "").is_retryable());
    }

    #[test]
    fn test_store_error_conversion() {
        fn inner() -> PssResult<()> {
            Err(StoreError::new(StoreErrorKind::Conflict, "exists"))?;
            Ok(())
        }
        let err = inner().unwrap_err();
        assert!(matches!(err, PssError::Store(ref e) if e.kind == StoreErrorKind::Conflict));
    }

    #[test]
    fn unusable_store_is_fatal() {
        let err = PssError::StoreUnavailable {
            collection: "stations".into(),
            source: StoreError::new(StoreErrorKind::PermissionDenied, "HTTP 403: denied"),
        };
        assert!(err.is_fatal());
        assert!(err.to_string().contains("stations"));
    }
}
