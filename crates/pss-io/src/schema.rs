//! Required-column checks for each kind of input sheet.

use pss_core::transform::columns;
use pss_core::{PssError, PssResult};

/// A required column, satisfied by any one of its accepted spellings.
#[derive(Debug, Clone, Copy)]
pub struct Column(pub &'static [&'static str]);

impl Column {
    fn present_in(&self, headers: &[String]) -> bool {
        self.0
            .iter()
            .any(|wanted| headers.iter().any(|h| h.trim() == *wanted))
    }

    fn label(&self) -> String {
        self.0.join("|")
    }
}

/// Columns a sheet must carry before any of its rows are processed.
#[derive(Debug, Clone, Copy)]
pub struct SheetSchema {
    pub kind: &'static str,
    pub required: &'static [Column],
}

pub const STATION: SheetSchema = SheetSchema {
    kind: "station",
    required: &[
        Column(columns::STATION_NAME),
        Column(&[columns::FEEDERS]),
        Column(&[columns::LINEMAN]),
        Column(&[columns::HELPER]),
    ],
};

pub const ADMIN: SheetSchema = SheetSchema {
    kind: "admin",
    required: &[Column(&[columns::ADMIN_PHONE]), Column(&[columns::ADMIN_NAME])],
};

pub const FEEDER: SheetSchema = SheetSchema {
    kind: "feeder",
    required: &[
        Column(&[columns::FEEDER_STATION]),
        Column(&[columns::FEEDER_NAME]),
    ],
};

pub const PTR: SheetSchema = SheetSchema {
    kind: "PTR",
    required: &[Column(columns::STATION_NAME), Column(columns::PTR_COUNT)],
};

impl SheetSchema {
    pub fn check(&self, sheet: &str, headers: &[String]) -> PssResult<()> {
        let missing: Vec<String> = self
            .required
            .iter()
            .filter(|column| !column.present_in(headers))
            .map(Column::label)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(PssError::Schema {
                sheet: sheet.to_string(),
                missing,
                found: headers.to_vec(),
            })
        }
    }
}
