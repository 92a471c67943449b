//! Rewriting of workbooks embedded in a presentation package.
//!
//! An embedded workbook is bound to a marker through the first cell of its
//! active sheet (`pptstart:<name>`). Rewriting discards its contents and
//! generates a fresh single-sheet workbook mirroring the indexed master range.

use crate::master::cell_value;
use pptsync_core::{parse_marker_name, CellValue, Error, MarkerIndex, MarkerRange, Result, Workbook};
use std::io::Cursor;
use std::panic::{self, AssertUnwindSafe};
use umya_spreadsheet::Spreadsheet;

/// An embedded workbook bound to a marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedBinding {
    /// Marker name parsed from the first cell of the active sheet.
    pub marker_name: String,

    /// Title of the embedded workbook's active sheet.
    pub sheet_title: String,
}

/// Rewrites embedded workbooks from master workbook ranges.
pub struct EmbeddedObjectRewriter<'a, W: Workbook + ?Sized> {
    master: &'a W,
    index: &'a MarkerIndex,
}

impl<'a, W: Workbook + ?Sized> EmbeddedObjectRewriter<'a, W> {
    pub fn new(master: &'a W, index: &'a MarkerIndex) -> Self {
        Self { master, index }
    }

    /// Produce replacement bytes for an embedded workbook part.
    ///
    /// Returns `None` when the part should be kept unchanged: no marker in
    /// its first cell, a marker the index does not know, or any failure
    /// while building the replacement.
    pub fn rewrite(&self, part_path: &str, bytes: &[u8]) -> Option<Vec<u8>> {
        // umya-spreadsheet can panic on malformed parts; one bad chart must
        // not abort the whole package.
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.try_rewrite(part_path, bytes)));

        match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                log::error!("Failed to modify '{}': {}", part_path, e);
                None
            }
            Err(_) => {
                log::error!("Failed to modify '{}': workbook reader panicked", part_path);
                None
            }
        }
    }

    fn try_rewrite(&self, part_path: &str, bytes: &[u8]) -> Result<Option<Vec<u8>>> {
        let Some(binding) = read_binding(bytes)? else {
            log::info!("No valid marker in A1 of embedded workbook '{}', skipping", part_path);
            return Ok(None);
        };

        let Some(range) = self.index.get(&binding.marker_name) else {
            log::info!(
                "Marker '{}' of '{}' not found in the workbook index, skipping chart",
                binding.marker_name,
                part_path
            );
            return Ok(None);
        };

        let book = self.build_workbook(range, &binding.sheet_title)?;
        let bytes = write_workbook(&book)?;
        log::debug!(
            "Rewrote '{}' from {}!{}:{} ({} bytes)",
            part_path,
            range.sheet_name,
            range.start_row,
            range.end_row,
            bytes.len()
        );
        Ok(Some(bytes))
    }

    /// Copy the range's rows into a new single-sheet workbook, starting at A1.
    fn build_workbook(&self, range: &MarkerRange, sheet_title: &str) -> Result<Spreadsheet> {
        let mut book = umya_spreadsheet::new_file_empty_worksheet();
        let sheet = book
            .new_sheet(sheet_title)
            .map_err(|e| Error::WorkbookError(format!("Failed to create sheet '{}': {}", sheet_title, e)))?;

        for (offset, source_row) in range.rows().enumerate() {
            let row = offset as u32 + 1;
            let values = self.master.row_values(&range.sheet_name, source_row)?;
            for (col_offset, value) in values.into_iter().enumerate() {
                let Some(value) = value else {
                    continue;
                };
                let cell = sheet.get_cell_mut((col_offset as u32 + 1, row));
                match value {
                    CellValue::Number(n) => {
                        cell.set_value_number(n);
                    }
                    CellValue::Bool(b) => {
                        cell.set_value_bool(b);
                    }
                    CellValue::Text(s) | CellValue::Error(s) => {
                        cell.set_value_string(s);
                    }
                }
            }
        }

        Ok(book)
    }
}

/// Read the marker binding from an embedded workbook's active sheet.
pub fn read_binding(bytes: &[u8]) -> Result<Option<EmbeddedBinding>> {
    let book = umya_spreadsheet::reader::xlsx::read_reader(Cursor::new(bytes), true)
        .map_err(|e| Error::WorkbookError(format!("Failed to read embedded workbook: {}", e)))?;
    let sheet = book.get_active_sheet();

    let marker = sheet.get_cell((1u32, 1u32)).and_then(cell_value);
    let Some(text) = marker.as_ref().and_then(CellValue::as_text) else {
        return Ok(None);
    };

    Ok(parse_marker_name(text).map(|name| EmbeddedBinding {
        marker_name: name.to_string(),
        sheet_title: sheet.get_name().to_string(),
    }))
}

fn write_workbook(book: &Spreadsheet) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    umya_spreadsheet::writer::xlsx::write_writer(book, &mut cursor)
        .map_err(|e| Error::WorkbookError(format!("Failed to serialize workbook: {}", e)))?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MasterWorkbook;
    use pptsync_core::{CellRef, MarkerIndexer};

    fn master() -> MasterWorkbook {
        let mut book = umya_spreadsheet::new_file();
        let sheet = book.get_sheet_by_name_mut("Sheet1").unwrap();
        sheet.set_name("S");
        sheet.get_cell_mut("A5").set_value_string("pptstart:sales");
        sheet.get_cell_mut("B5").set_value_string("Revenue");
        sheet.get_cell_mut("C5").set_value_string("Cost");
        sheet.get_cell_mut("A6").set_value_string("Q1");
        sheet.get_cell_mut("B6").set_value_number(100);
        sheet.get_cell_mut("C6").set_value_number(40);
        sheet.get_cell_mut("A7").set_value_string("Q2");
        sheet.get_cell_mut("B7").set_value_number(120);
        sheet.get_cell_mut("C7").set_value_bool(false);
        sheet.get_cell_mut("A8").set_value_string("pptend:sales");
        sheet.get_cell_mut("B8").set_value_number(999);
        MasterWorkbook::from_spreadsheet(book)
    }

    fn embedded(first_cell: Option<&str>, title: &str) -> Vec<u8> {
        let mut book = umya_spreadsheet::new_file();
        let sheet = book.get_sheet_by_name_mut("Sheet1").unwrap();
        sheet.set_name(title);
        if let Some(text) = first_cell {
            sheet.get_cell_mut("A1").set_value_string(text);
        }
        sheet.get_cell_mut("B2").set_value_number(1);
        sheet.get_cell_mut("Z40").set_value_string("stale");
        write_workbook(&book).unwrap()
    }

    #[test]
    fn test_read_binding() {
        let binding = read_binding(&embedded(Some("pptstart:sales"), "Chart Data")).unwrap();
        assert_eq!(
            binding,
            Some(EmbeddedBinding {
                marker_name: "sales".to_string(),
                sheet_title: "Chart Data".to_string(),
            })
        );
        assert_eq!(read_binding(&embedded(Some("Revenue"), "S")).unwrap(), None);
        assert_eq!(read_binding(&embedded(None, "S")).unwrap(), None);
    }

    #[test]
    fn test_rewrite_mirrors_range() {
        let master = master();
        let index = MarkerIndexer::new().index(&master);
        let rewriter = EmbeddedObjectRewriter::new(&master, &index);

        let bytes = rewriter
            .rewrite("ppt/embeddings/Microsoft_Excel_Worksheet.xlsx", &embedded(Some("pptstart:sales"), "Chart Data"))
            .expect("rewritten");
        let out = MasterWorkbook::from_bytes(&bytes).unwrap();

        assert_eq!(out.sheet_names(), vec!["Chart Data"]);
        assert_eq!(out.dimensions("Chart Data").unwrap(), (3, 3));
        for (out_row, src_row) in [(1, 5), (2, 6), (3, 7)] {
            assert_eq!(
                out.row_values("Chart Data", out_row).unwrap(),
                master.row_values("S", src_row).unwrap(),
                "row {out_row}"
            );
        }
        // Pre-existing embedded content is discarded.
        assert!(out.cell("Chart Data", CellRef::parse("Z40").unwrap()).unwrap().is_none());
        // The marker cell is regenerated so the part stays bound.
        assert_eq!(read_binding(&bytes).unwrap().unwrap().marker_name, "sales");
    }

    #[test]
    fn test_unbound_or_unknown_marker_is_noop() {
        let master = master();
        let index = MarkerIndexer::new().index(&master);
        let rewriter = EmbeddedObjectRewriter::new(&master, &index);

        assert!(rewriter.rewrite("a.xlsx", &embedded(None, "S")).is_none());
        assert!(rewriter.rewrite("b.xlsx", &embedded(Some("pptstart:gone"), "S")).is_none());
    }

    #[test]
    fn test_corrupt_part_is_noop() {
        let master = master();
        let index = MarkerIndexer::new().index(&master);
        let rewriter = EmbeddedObjectRewriter::new(&master, &index);

        assert!(rewriter.rewrite("broken.xlsx", b"PK\x03\x04 not really").is_none());
    }
}
