//! Domain types shared by the indexing, formatting and rewriting stages.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Largest column index a worksheet can address (XFD).
pub const MAX_COLUMN: u32 = 16_384;

/// Largest row index a worksheet can address.
pub const MAX_ROW: u32 = 1_048_576;

/// A contiguous block of rows on a named sheet, delimited by start/end markers.
///
/// Rows are 1-based and inclusive; `start_row <= end_row` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerRange {
    /// Marker name taken from the `pptstart:<name>` cell.
    pub name: String,

    /// Sheet the markers were found on.
    pub sheet_name: String,

    /// Row holding the start marker.
    pub start_row: u32,

    /// Last data row (the end-marker row itself is excluded).
    pub end_row: u32,
}

impl MarkerRange {
    /// Create a new range.
    pub fn new(name: impl Into<String>, sheet_name: impl Into<String>, start_row: u32, end_row: u32) -> Self {
        Self {
            name: name.into(),
            sheet_name: sheet_name.into(),
            start_row,
            end_row,
        }
    }

    /// Number of rows covered by the range.
    pub fn row_count(&self) -> u32 {
        self.end_row - self.start_row + 1
    }

    /// Iterate the 1-based row numbers covered by the range.
    pub fn rows(&self) -> impl Iterator<Item = u32> {
        self.start_row..=self.end_row
    }
}

/// Name-keyed index of marker ranges built from the master workbook.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerIndex {
    ranges: HashMap<String, MarkerRange>,
}

impl MarkerIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a range under its own name, returning the range it replaced.
    pub fn insert(&mut self, range: MarkerRange) -> Option<MarkerRange> {
        self.ranges.insert(range.name.clone(), range)
    }

    /// Look up a range by marker name.
    pub fn get(&self, name: &str) -> Option<&MarkerRange> {
        self.ranges.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ranges.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MarkerRange> {
        self.ranges.values()
    }

    /// All ranges ordered by marker name.
    pub fn sorted(&self) -> Vec<&MarkerRange> {
        let mut ranges: Vec<&MarkerRange> = self.iter().collect();
        ranges.sort_by(|a, b| a.name.cmp(&b.name));
        ranges
    }
}

/// A typed cell value as cached in a workbook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Bool(bool),
    /// Error value such as `#N/A`, kept as its display text.
    Error(String),
}

impl CellValue {
    /// The string content, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(n) => f.write_str(&plain_number(*n)),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Bool(true) => f.write_str("TRUE"),
            CellValue::Bool(false) => f.write_str("FALSE"),
            CellValue::Error(e) => f.write_str(e),
        }
    }
}

/// Plain string conversion of a number: integral values have no trailing decimal.
pub(crate) fn plain_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// A cell's cached value together with its number format code.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub value: CellValue,

    /// Number format code; `"General"` when the cell carries none.
    pub number_format: String,
}

impl Cell {
    /// Create a cell with the `General` number format.
    pub fn new(value: CellValue) -> Self {
        Self::with_format(value, "General")
    }

    pub fn with_format(value: CellValue, number_format: impl Into<String>) -> Self {
        Self {
            value,
            number_format: number_format.into(),
        }
    }
}

/// A 1-based (row, column) cell address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Parse an A1-style reference such as `B12` (case-insensitive).
    pub fn parse(reference: &str) -> Result<Self> {
        let invalid = || Error::InvalidCellReference(reference.to_string());

        let split = reference
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(invalid)?;
        let (letters, digits) = reference.split_at(split);

        if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(invalid());
        }
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let mut col: u32 = 0;
        for c in letters.chars() {
            let digit = c.to_ascii_uppercase() as u32 - 'A' as u32 + 1;
            col = col.checked_mul(26).and_then(|v| v.checked_add(digit)).ok_or_else(invalid)?;
            if col > MAX_COLUMN {
                return Err(invalid());
            }
        }

        let row: u32 = digits.parse().map_err(|_| invalid())?;
        if row == 0 || row > MAX_ROW {
            return Err(invalid());
        }

        Ok(Self { row, col })
    }

    /// Column letters for this reference, e.g. `AB`.
    pub fn column_letters(&self) -> String {
        let mut col = self.col;
        let mut letters = Vec::new();
        while col > 0 {
            let rem = ((col - 1) % 26) as u8;
            letters.push((b'A' + rem) as char);
            col = (col - 1) / 26;
        }
        letters.iter().rev().collect()
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.column_letters(), self.row)
    }
}

/// A `[[Sheet!Cell]]` token found in slide markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderToken {
    pub sheet_name: String,
    pub cell_ref: String,
}

impl PlaceholderToken {
    pub fn new(sheet_name: impl Into<String>, cell_ref: impl Into<String>) -> Self {
        Self {
            sheet_name: sheet_name.into(),
            cell_ref: cell_ref.into(),
        }
    }
}

/// Read access to a workbook's cached cell values.
///
/// Implementations must return cached computed values for formula cells,
/// never formula text.
pub trait Workbook {
    /// Sheet names in workbook order.
    fn sheet_names(&self) -> Vec<String>;

    /// Whether a sheet with exactly this name exists.
    fn has_sheet(&self, name: &str) -> bool {
        self.sheet_names().iter().any(|n| n == name)
    }

    /// Highest used (row, column) on a sheet.
    fn dimensions(&self, sheet: &str) -> Result<(u32, u32)>;

    /// A single cell, or `None` when the cell holds no value.
    fn cell(&self, sheet: &str, cell: CellRef) -> Result<Option<Cell>>;

    /// Values of one row from column 1 up to the sheet's highest used column.
    fn row_values(&self, sheet: &str, row: u32) -> Result<Vec<Option<CellValue>>> {
        let (_, max_col) = self.dimensions(sheet)?;
        (1..=max_col)
            .map(|col| Ok(self.cell(sheet, CellRef::new(row, col))?.map(|c| c.value)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cell_ref() {
        assert_eq!(CellRef::parse("A1").unwrap(), CellRef::new(1, 1));
        assert_eq!(CellRef::parse("b2").unwrap(), CellRef::new(2, 2));
        assert_eq!(CellRef::parse("AA10").unwrap(), CellRef::new(10, 27));
        assert_eq!(CellRef::parse("XFD1048576").unwrap(), CellRef::new(1_048_576, 16_384));
    }

    #[test]
    fn test_parse_cell_ref_rejects_malformed() {
        for bad in ["", "A", "12", "A0", "1A", "A1B", "XFE1", "A1048577"] {
            assert!(CellRef::parse(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_cell_ref_display() {
        assert_eq!(CellRef::new(3, 28).to_string(), "AB3");
        assert_eq!(CellRef::new(1, 26).to_string(), "Z1");
    }

    #[test]
    fn test_marker_index_last_wins() {
        let mut index = MarkerIndex::new();
        assert!(index.insert(MarkerRange::new("sales", "S1", 1, 3)).is_none());
        let replaced = index.insert(MarkerRange::new("sales", "S2", 5, 9));
        assert_eq!(replaced.map(|r| r.sheet_name), Some("S1".to_string()));
        assert_eq!(index.len(), 1);
        assert_eq!(index.get("sales").unwrap().start_row, 5);
    }

    #[test]
    fn test_marker_range_rows() {
        let range = MarkerRange::new("m", "S", 5, 7);
        assert_eq!(range.row_count(), 3);
        assert_eq!(range.rows().collect::<Vec<_>>(), vec![5, 6, 7]);
    }

    #[test]
    fn test_cell_value_display() {
        assert_eq!(CellValue::Number(42.0).to_string(), "42");
        assert_eq!(CellValue::Number(0.25).to_string(), "0.25");
        assert_eq!(CellValue::Bool(true).to_string(), "TRUE");
        assert_eq!(CellValue::Text("x".into()).to_string(), "x");
    }
}
