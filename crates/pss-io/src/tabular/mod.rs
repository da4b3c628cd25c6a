//! Tabular sources: spreadsheet workbooks and CSV sheets.
//!
//! A [`Workbook`] is opened from a locator and exposes named sheets. Each
//! [`Sheet`] carries its header row and yields [`SourceRow`]s in file order.
//! Cells are normalized on the way in, so a blank cell, a whitespace-only
//! cell and a NaN number all read as [`CellValue::Empty`].

mod format;

use std::fs::File;
use std::path::{Path, PathBuf};

use pss_core::{CellValue, PssError, PssResult, SourceRow};
use tracing::debug;

pub use format::WorkbookFormat;

enum Backing {
    #[cfg(feature = "spreadsheet")]
    Spreadsheet(calamine::Sheets<std::io::BufReader<File>>),
    /// Sheet name (file stem) -> CSV path, sorted by name
    Csv(Vec<(String, PathBuf)>),
}

/// An opened source workbook.
pub struct Workbook {
    backing: Backing,
}

impl Workbook {
    pub fn open(locator: impl AsRef<Path>) -> PssResult<Self> {
        let path = locator.as_ref().to_path_buf();
        if !path.exists() {
            return Err(PssError::SourceNotFound(path));
        }
        let format = WorkbookFormat::detect(&path).ok_or_else(|| {
            PssError::Parse(format!(
                "unrecognized source '{}' (expected {}, a .csv file or a directory of .csv files)",
                path.display(),
                WorkbookFormat::SPREADSHEET_EXTENSIONS.join("/")
            ))
        })?;
        let backing = match format {
            WorkbookFormat::Spreadsheet => open_spreadsheet(&path)?,
            WorkbookFormat::CsvDirectory => Backing::Csv(csv_sheets_in(&path)?),
            WorkbookFormat::CsvFile => Backing::Csv(vec![(file_stem(&path), path.clone())]),
        };
        debug!(path = %path.display(), format = format.friendly_name(), "opened workbook");
        Ok(Self { backing })
    }

    pub fn sheet_names(&self) -> Vec<String> {
        match &self.backing {
            #[cfg(feature = "spreadsheet")]
            Backing::Spreadsheet(book) => calamine::Reader::sheet_names(book),
            Backing::Csv(sheets) => sheets.iter().map(|(name, _)| name.clone()).collect(),
        }
    }

    /// Resolve a selector: exact sheet name first, then a 0-based index.
    pub fn resolve(&self, selector: &str) -> PssResult<String> {
        let names = self.sheet_names();
        if let Some(name) = names.iter().find(|name| name.as_str() == selector) {
            return Ok(name.clone());
        }
        let trimmed = selector.trim();
        if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
            if let Some(name) = trimmed.parse::<usize>().ok().and_then(|i| names.get(i)) {
                return Ok(name.clone());
            }
        }
        Err(PssError::SheetNotFound {
            selector: selector.to_string(),
            available: names,
        })
    }

    pub fn sheet(&mut self, selector: &str) -> PssResult<Sheet> {
        let name = self.resolve(selector)?;
        match &mut self.backing {
            #[cfg(feature = "spreadsheet")]
            Backing::Spreadsheet(book) => spreadsheet_sheet(book, name),
            Backing::Csv(sheets) => {
                let path = sheets
                    .iter()
                    .find(|(sheet, _)| *sheet == name)
                    .map(|(_, path)| path.clone())
                    .ok_or_else(|| PssError::SheetNotFound {
                        selector: selector.to_string(),
                        available: sheets.iter().map(|(n, _)| n.clone()).collect(),
                    })?;
                csv_sheet(name, &path)
            }
        }
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn csv_sheets_in(dir: &Path) -> PssResult<Vec<(String, PathBuf)>> {
    let mut sheets = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        if path.is_file() && is_csv {
            sheets.push((file_stem(&path), path));
        }
    }
    sheets.sort();
    Ok(sheets)
}

#[cfg(feature = "spreadsheet")]
fn open_spreadsheet(path: &Path) -> PssResult<Backing> {
    calamine::open_workbook_auto(path)
        .map(Backing::Spreadsheet)
        .map_err(|e| PssError::Parse(format!("failed to open workbook '{}': {e}", path.display())))
}

#[cfg(not(feature = "spreadsheet"))]
fn open_spreadsheet(path: &Path) -> PssResult<Backing> {
    Err(PssError::Config(format!(
        "'{}' is a spreadsheet workbook but spreadsheet support was not compiled in; export the sheets as CSV",
        path.display()
    )))
}

#[cfg(feature = "spreadsheet")]
fn spreadsheet_sheet(
    book: &mut calamine::Sheets<std::io::BufReader<File>>,
    name: String,
) -> PssResult<Sheet> {
    use calamine::Reader;

    let range = book
        .worksheet_range(&name)
        .map_err(|e| PssError::Parse(format!("failed to read sheet '{name}': {e}")))?;
    let mut lines = range.rows();
    let headers = lines
        .next()
        .map(|cells| cells.iter().map(|c| header_text(&data_cell(c))).collect())
        .unwrap_or_default();
    let body: Vec<Vec<CellValue>> = lines
        .map(|cells| cells.iter().map(data_cell).collect())
        .collect();
    Ok(Sheet {
        name,
        headers,
        body: Body::Cells(body.into_iter()),
    })
}

#[cfg(feature = "spreadsheet")]
fn data_cell(data: &calamine::Data) -> CellValue {
    use calamine::Data;

    match data {
        Data::Empty => CellValue::Empty,
        Data::Int(i) => CellValue::Integer(*i),
        Data::Float(x) => CellValue::number(*x),
        Data::String(s) => CellValue::text(s.as_str()),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => CellValue::number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::text(s.as_str()),
        // #N/A, #DIV/0! and friends carry no usable value
        Data::Error(_) => CellValue::Empty,
    }
}

fn header_text(cell: &CellValue) -> String {
    cell.as_text().unwrap_or_default()
}

fn csv_sheet(name: String, path: &Path) -> PssResult<Sheet> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| csv_error(path, e))?;
    let headers = reader
        .headers()
        .map_err(|e| csv_error(path, e))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();
    Ok(Sheet {
        name,
        headers,
        body: Body::Csv {
            path: path.to_path_buf(),
            records: reader.into_records(),
        },
    })
}

fn csv_error(path: &Path, err: csv::Error) -> PssError {
    PssError::Parse(format!("failed to read CSV '{}': {err}", path.display()))
}

enum Body {
    Cells(std::vec::IntoIter<Vec<CellValue>>),
    Csv {
        path: PathBuf,
        records: csv::StringRecordsIntoIter<File>,
    },
}

/// One sheet: header row plus lazily-read data rows.
pub struct Sheet {
    name: String,
    headers: Vec<String>,
    body: Body,
}

impl Sheet {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Header cells, trimmed.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(self) -> Rows {
        Rows {
            headers: self.headers,
            body: self.body,
            next_index: 0,
        }
    }

    /// Read every row, stopping at the first malformed one.
    pub fn collect_rows(self) -> PssResult<Vec<SourceRow>> {
        self.rows().collect()
    }
}

/// Iterator over the data rows of a [`Sheet`].
pub struct Rows {
    headers: Vec<String>,
    body: Body,
    next_index: usize,
}

impl Rows {
    fn build(&mut self, cells: Vec<CellValue>) -> SourceRow {
        let mut cells = cells.into_iter();
        let row = self
            .headers
            .iter()
            .map(|header| (header.clone(), cells.next().unwrap_or(CellValue::Empty)))
            .collect();
        let index = self.next_index;
        self.next_index += 1;
        SourceRow::new(index, row)
    }
}

impl Iterator for Rows {
    type Item = PssResult<SourceRow>;

    fn next(&mut self) -> Option<Self::Item> {
        let cells = match &mut self.body {
            Body::Cells(rows) => rows.next()?,
            Body::Csv { path, records } => match records.next()? {
                Ok(record) => record.iter().map(CellValue::text).collect(),
                Err(e) => return Some(Err(csv_error(path, e))),
            },
        };
        Some(Ok(self.build(cells)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn missing_source_is_reported() {
        let err = Workbook::open("/definitely/not/here.xlsx").err().unwrap();
        assert!(matches!(err, PssError::SourceNotFound(_)));
    }

    #[test]
    fn csv_directory_sheets_by_stem() {
        let dir = tempdir().unwrap();
        write(dir.path(), "Sheet1.csv", "PSS NAME,FEEDERS\nDARLIPALI,4\n");
        write(dir.path(), "admins.csv", "phone number,pss/admin name\n9124581417,ADMIN01\n");
        write(dir.path(), "readme.txt", "ignored");

        let book = Workbook::open(dir.path()).unwrap();
        assert_eq!(book.sheet_names(), vec!["Sheet1", "admins"]);
        assert_eq!(book.resolve("admins").unwrap(), "admins");
        assert_eq!(book.resolve("0").unwrap(), "Sheet1");
        match book.resolve("Sheet9").unwrap_err() {
            PssError::SheetNotFound { available, .. } => assert_eq!(available.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rows_are_normalized_and_indexed() {
        let dir = tempdir().unwrap();
        let path = write(
            dir.path(),
            "stations.csv",
            "\u{feff}PSS NAME , FEEDERS,LINEMAN,HELPER\nRiver Side PTR,3,\"A,B\",C\nSADAR,nan,,\n,,,\n",
        );
        let mut book = Workbook::open(&path).unwrap();
        let sheet = book.sheet("stations").unwrap();
        assert_eq!(sheet.headers(), ["PSS NAME", "FEEDERS", "LINEMAN", "HELPER"]);
        let rows = sheet.collect_rows().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].get("LINEMAN").as_text().as_deref(), Some("A,B"));
        assert_eq!(rows[1].index, 1);
        assert!(rows[1].get("HELPER").is_empty());
        assert!(rows[2].is_blank());
    }

    #[test]
    fn short_records_pad_with_empty_cells() {
        let dir = tempdir().unwrap();
        let path = write(dir.path(), "feeders.csv", "PSS,Equipment\nDARLIPALI\n");
        let mut book = Workbook::open(&path).unwrap();
        let rows = book.sheet("0").unwrap().collect_rows().unwrap();
        assert!(rows[0].get("Equipment").is_empty());
    }
}
