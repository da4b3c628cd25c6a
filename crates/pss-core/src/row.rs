//! Raw tabular rows as produced by the source readers.

use std::fmt;

use serde::Serialize;

/// One spreadsheet cell.
///
/// Absence is its own variant: blank cells, whitespace-only text and NaN
/// numbers all become [`CellValue::Empty`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Empty,
    Text(String),
    Integer(i64),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    /// Normalizing constructor for text cells.
    pub fn text(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        if raw.trim().is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(raw)
        }
    }

    /// Normalizing constructor for numeric cells.
    pub fn number(value: f64) -> Self {
        if value.is_nan() {
            CellValue::Empty
        } else {
            CellValue::Number(value)
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Trimmed text rendering; `None` for empty cells.
    ///
    /// Whole floats render without a fractional part, so a phone number stored
    /// as `9124581417.0` reads back as `"9124581417"`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(s) => Some(s.trim().to_string()),
            CellValue::Integer(i) => Some(i.to_string()),
            CellValue::Number(x) => {
                if x.fract() == 0.0 && x.abs() < 1e15 {
                    Some(format!("{}", *x as i64))
                } else {
                    Some(x.to_string())
                }
            }
            CellValue::Bool(b) => Some(b.to_string()),
        }
    }

    /// Integer interpretation: integer cells, whole floats and integer text.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            CellValue::Integer(i) => Some(*i),
            CellValue::Number(x) if x.fract() == 0.0 && x.abs() < 9.0e15 => Some(*x as i64),
            CellValue::Text(s) => {
                let trimmed = s.trim();
                if let Ok(v) = trimmed.parse::<i64>() {
                    return Some(v);
                }
                match trimmed.parse::<f64>() {
                    Ok(x) if x.is_finite() && x.fract() == 0.0 && x.abs() < 9.0e15 => {
                        Some(x as i64)
                    }
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_text() {
            Some(text) => f.write_str(&text),
            None => f.write_str("<empty>"),
        }
    }
}

/// One data row of a sheet, in column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceRow {
    /// 0-based index among data rows (the header row is not counted)
    pub index: usize,
    pub cells: Vec<(String, CellValue)>,
}

impl SourceRow {
    pub fn new(index: usize, cells: Vec<(String, CellValue)>) -> Self {
        Self { index, cells }
    }

    /// Cell by header name, compared after trimming both sides.
    pub fn get(&self, column: &str) -> &CellValue {
        const EMPTY: &CellValue = &CellValue::Empty;
        let wanted = column.trim();
        self.cells
            .iter()
            .find(|(name, _)| name.trim() == wanted)
            .map(|(_, value)| value)
            .unwrap_or(EMPTY)
    }

    /// First column among `candidates` present in this row.
    pub fn get_any(&self, candidates: &[&str]) -> &CellValue {
        const EMPTY: &CellValue = &CellValue::Empty;
        candidates
            .iter()
            .find_map(|c| {
                self.cells
                    .iter()
                    .find(|(name, _)| name.trim() == *c)
                    .map(|(_, value)| value)
            })
            .unwrap_or(EMPTY)
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|(_, value)| value.is_empty())
    }

    /// Spreadsheet line number (1-based, header on line 1).
    pub fn line(&self) -> usize {
        self.index + 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_nan_cells_are_empty() {
        assert!(CellValue::text("   ").is_empty());
        assert!(CellValue::number(f64::NAN).is_empty());
        assert!(!CellValue::text("nan").is_empty());
    }

    #[test]
    fn integer_coercion() {
        assert_eq!(CellValue::Number(3.0).as_integer(), Some(3));
        assert_eq!(CellValue::Number(3.5).as_integer(), None);
        assert_eq!(CellValue::text(" 12 ").as_integer(), Some(12));
        assert_eq!(CellValue::text("9124581417.0").as_integer(), Some(9124581417));
        assert_eq!(CellValue::text("nan").as_integer(), None);
        assert_eq!(CellValue::Empty.as_integer(), None);
    }

    #[test]
    fn whole_floats_render_as_integers() {
        assert_eq!(
            CellValue::Number(9124581417.0).as_text().as_deref(),
            Some("9124581417")
        );
    }

    #[test]
    fn lookup_trims_header_names() {
        let row = SourceRow::new(
            0,
            vec![
                ("PSS NAME ".to_string(), CellValue::text("DARLIPALI")),
                ("FEEDERS".to_string(), CellValue::Integer(4)),
            ],
        );
        assert_eq!(row.get("PSS NAME"), &CellValue::text("DARLIPALI"));
        assert_eq!(row.get_any(&["PSS_NAME", "PSS NAME"]), &CellValue::text("DARLIPALI"));
        assert!(row.get("pss name").is_empty());
        assert_eq!(row.line(), 2);
    }
}
