//! Read-only access to the master workbook.

use pptsync_core::{Cell, CellRef, CellValue, Error, Result, Workbook};
use std::io::Cursor;
use std::path::Path;
use umya_spreadsheet::{CellRawValue, Spreadsheet, Worksheet};

/// Number format reported for cells without an explicit format.
const GENERAL_FORMAT: &str = "General";

/// The master workbook, loaded once with every sheet deserialized.
///
/// Formula cells expose their cached values.
pub struct MasterWorkbook {
    book: Spreadsheet,
}

impl MasterWorkbook {
    /// Load a workbook from an `.xlsx` file.
    pub fn open(path: &Path) -> Result<Self> {
        let book = umya_spreadsheet::reader::xlsx::read(path).map_err(|e| {
            Error::WorkbookError(format!("Failed to read workbook '{}': {}", path.display(), e))
        })?;
        log::debug!("Loaded workbook {} ({} sheets)", path.display(), book.get_sheet_count());
        Ok(Self { book })
    }

    /// Load a workbook from in-memory `.xlsx` bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let book = umya_spreadsheet::reader::xlsx::read_reader(Cursor::new(bytes), true)
            .map_err(|e| Error::WorkbookError(format!("Failed to read workbook: {}", e)))?;
        Ok(Self { book })
    }

    /// Wrap an already loaded spreadsheet.
    pub fn from_spreadsheet(book: Spreadsheet) -> Self {
        Self { book }
    }

    fn sheet(&self, name: &str) -> Result<&Worksheet> {
        self.book
            .get_sheet_by_name(name)
            .ok_or_else(|| Error::SheetNotFound(name.to_string()))
    }
}

impl Workbook for MasterWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.book
            .get_sheet_collection()
            .iter()
            .map(|s| s.get_name().to_string())
            .collect()
    }

    fn has_sheet(&self, name: &str) -> bool {
        self.book.get_sheet_by_name(name).is_some()
    }

    fn dimensions(&self, sheet: &str) -> Result<(u32, u32)> {
        let (max_col, max_row) = self.sheet(sheet)?.get_highest_column_and_row();
        Ok((max_row, max_col))
    }

    fn cell(&self, sheet: &str, cell: CellRef) -> Result<Option<Cell>> {
        let ws = self.sheet(sheet)?;
        // umya addresses cells as (column, row)
        let Some(c) = ws.get_cell((cell.col, cell.row)) else {
            return Ok(None);
        };
        Ok(cell_value(c).map(|value| Cell::with_format(value, number_format(c))))
    }
}

/// Convert a umya cell's cached value, `None` when empty.
pub(crate) fn cell_value(cell: &umya_spreadsheet::Cell) -> Option<CellValue> {
    match cell.get_raw_value() {
        CellRawValue::Empty => None,
        CellRawValue::Numeric(n) => Some(CellValue::Number(*n)),
        CellRawValue::Bool(b) => Some(CellValue::Bool(*b)),
        CellRawValue::String(s) => Some(CellValue::Text(s.to_string())),
        CellRawValue::RichText(rt) => Some(CellValue::Text(rt.get_text().to_string())),
        CellRawValue::Error(_) => Some(CellValue::Error(cell.get_value().to_string())),
        // Values read lazily from the sheet XML, including formula results.
        CellRawValue::Lazy(s) => lazy_value(s.as_ref()),
    }
}

fn lazy_value(text: &str) -> Option<CellValue> {
    if text.is_empty() {
        None
    } else if let Ok(n) = text.parse::<f64>() {
        Some(CellValue::Number(n))
    } else if text.eq_ignore_ascii_case("TRUE") {
        Some(CellValue::Bool(true))
    } else if text.eq_ignore_ascii_case("FALSE") {
        Some(CellValue::Bool(false))
    } else {
        Some(CellValue::Text(text.to_string()))
    }
}

fn number_format(cell: &umya_spreadsheet::Cell) -> String {
    cell.get_style()
        .get_number_format()
        .map(|nf| nf.get_format_code().to_string())
        .filter(|code| !code.is_empty())
        .unwrap_or_else(|| GENERAL_FORMAT.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pptsync_core::PlaceholderSubstitutor;
    use std::io::{Read, Write};

    fn sample() -> MasterWorkbook {
        let mut book = umya_spreadsheet::new_file();
        let sheet = book.get_sheet_by_name_mut("Sheet1").unwrap();
        sheet.get_cell_mut("A1").set_value_string("pptstart:sales");
        sheet.get_cell_mut("B2").set_value_number(0.256);
        sheet.get_cell_mut("C3").set_value_bool(true);
        sheet
            .get_style_mut("B2")
            .get_number_format_mut()
            .set_format_code("0.0%");
        book.new_sheet("Other").unwrap();
        MasterWorkbook::from_spreadsheet(book)
    }

    #[test]
    fn test_sheet_names_in_order() {
        let wb = sample();
        assert_eq!(wb.sheet_names(), vec!["Sheet1", "Other"]);
        assert!(wb.has_sheet("Other"));
        assert!(!wb.has_sheet("Missing"));
    }

    #[test]
    fn test_cell_values_and_formats() {
        let wb = sample();
        let a1 = wb.cell("Sheet1", CellRef::parse("A1").unwrap()).unwrap().unwrap();
        assert_eq!(a1.value, CellValue::Text("pptstart:sales".to_string()));
        assert_eq!(a1.number_format, "General");

        let b2 = wb.cell("Sheet1", CellRef::parse("B2").unwrap()).unwrap().unwrap();
        assert_eq!(b2.value, CellValue::Number(0.256));
        assert_eq!(b2.number_format, "0.0%");

        let c3 = wb.cell("Sheet1", CellRef::parse("C3").unwrap()).unwrap().unwrap();
        assert_eq!(c3.value, CellValue::Bool(true));
    }

    #[test]
    fn test_missing_cell_and_sheet() {
        let wb = sample();
        assert!(wb.cell("Sheet1", CellRef::new(50, 50)).unwrap().is_none());
        assert!(matches!(
            wb.cell("Missing", CellRef::new(1, 1)),
            Err(Error::SheetNotFound(_))
        ));
    }

    #[test]
    fn test_dimensions() {
        let wb = sample();
        assert_eq!(wb.dimensions("Sheet1").unwrap(), (3, 3));
    }

    #[test]
    fn test_from_bytes_roundtrip() {
        let mut book = umya_spreadsheet::new_file();
        book.get_sheet_by_name_mut("Sheet1")
            .unwrap()
            .get_cell_mut("B2")
            .set_value_number(42);
        let mut cursor = Cursor::new(Vec::new());
        umya_spreadsheet::writer::xlsx::write_writer(&book, &mut cursor).unwrap();

        let wb = MasterWorkbook::from_bytes(cursor.get_ref()).unwrap();
        let b2 = wb.cell("Sheet1", CellRef::new(2, 2)).unwrap().unwrap();
        assert_eq!(b2.value, CellValue::Number(42.0));
    }

    /// Workbook bytes whose `Sheet1!B2` holds `=A1*2` with a cached result.
    fn formula_workbook() -> Vec<u8> {
        let mut book = umya_spreadsheet::new_file();
        let sheet = book.get_sheet_by_name_mut("Sheet1").unwrap();
        sheet.get_cell_mut("A1").set_value_number(1_250_000);
        sheet.get_cell_mut("B2").set_value_number(2_500_000);
        let mut cursor = Cursor::new(Vec::new());
        umya_spreadsheet::writer::xlsx::write_writer(&book, &mut cursor).unwrap();

        let mut input = zip::ZipArchive::new(Cursor::new(cursor.into_inner())).unwrap();
        let mut output = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for i in 0..input.len() {
            let mut file = input.by_index(i).unwrap();
            let name = file.name().to_string();
            let mut data = String::new();
            file.read_to_string(&mut data).unwrap();
            if name == "xl/worksheets/sheet1.xml" {
                assert!(data.contains("<v>2500000</v>"));
                data = data.replace("<v>2500000</v>", "<f>A1*2</f><v>2500000</v>");
            }
            output.start_file(name, zip::write::FileOptions::default()).unwrap();
            output.write_all(data.as_bytes()).unwrap();
        }
        output.finish().unwrap().into_inner()
    }

    #[test]
    fn test_formula_cell_reads_cached_value() {
        let wb = MasterWorkbook::from_bytes(&formula_workbook()).unwrap();
        let b2 = wb.cell("Sheet1", CellRef::parse("B2").unwrap()).unwrap().unwrap();
        assert_eq!(b2.value, CellValue::Number(2_500_000.0));

        let markup = PlaceholderSubstitutor::new().substitute("<a:t>[[Sheet1!B2]]</a:t>", &wb);
        assert_eq!(markup, "<a:t>2.5M</a:t>");
    }

    #[test]
    fn test_lazy_values() {
        assert_eq!(lazy_value(""), None);
        assert_eq!(lazy_value("42.5"), Some(CellValue::Number(42.5)));
        assert_eq!(lazy_value("TRUE"), Some(CellValue::Bool(true)));
        assert_eq!(lazy_value("false"), Some(CellValue::Bool(false)));
        assert_eq!(lazy_value("North"), Some(CellValue::Text("North".to_string())));
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        assert!(matches!(
            MasterWorkbook::from_bytes(b"not a workbook"),
            Err(Error::WorkbookError(_))
        ));
    }
}
