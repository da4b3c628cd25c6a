//! Workbook format detection.

use std::path::Path;

/// Supported source layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkbookFormat {
    /// Native spreadsheet workbook (xlsx, xlsm, xls, ods)
    Spreadsheet,
    /// A directory whose `*.csv` files are the sheets
    CsvDirectory,
    /// A single CSV file acting as a one-sheet workbook
    CsvFile,
}

impl WorkbookFormat {
    pub const SPREADSHEET_EXTENSIONS: &'static [&'static str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

    /// Detect from the path; `None` for unknown extensions.
    pub fn detect(path: &Path) -> Option<Self> {
        if path.is_dir() {
            return Some(WorkbookFormat::CsvDirectory);
        }
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        if ext == "csv" {
            Some(WorkbookFormat::CsvFile)
        } else if Self::SPREADSHEET_EXTENSIONS.contains(&ext.as_str()) {
            Some(WorkbookFormat::Spreadsheet)
        } else {
            None
        }
    }

    pub fn friendly_name(&self) -> &'static str {
        match self {
            WorkbookFormat::Spreadsheet => "spreadsheet workbook",
            WorkbookFormat::CsvDirectory => "CSV directory",
            WorkbookFormat::CsvFile => "CSV file",
        }
    }
}
