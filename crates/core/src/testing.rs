//! In-memory workbook used by unit tests.

use crate::{Cell, CellRef, CellValue, Error, Result, Workbook};
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub(crate) struct MemoryWorkbook {
    sheets: Vec<(String, BTreeMap<CellRef, Cell>)>,
}

impl MemoryWorkbook {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn sheet(mut self, name: &str) -> Self {
        self.sheets.push((name.to_string(), BTreeMap::new()));
        self
    }

    pub(crate) fn set(mut self, sheet: &str, reference: &str, value: CellValue) -> Self {
        self.set_formatted(sheet, reference, value, "General");
        self
    }

    pub(crate) fn set_with_format(mut self, sheet: &str, reference: &str, value: CellValue, format: &str) -> Self {
        self.set_formatted(sheet, reference, value, format);
        self
    }

    fn set_formatted(&mut self, sheet: &str, reference: &str, value: CellValue, format: &str) {
        let cell = CellRef::parse(reference).unwrap();
        let (_, cells) = self.sheets.iter_mut().find(|(n, _)| n == sheet).unwrap();
        cells.insert(cell, Cell::with_format(value, format));
    }

    fn cells(&self, sheet: &str) -> Result<&BTreeMap<CellRef, Cell>> {
        self.sheets
            .iter()
            .find(|(n, _)| n == sheet)
            .map(|(_, c)| c)
            .ok_or_else(|| Error::SheetNotFound(sheet.to_string()))
    }
}

impl Workbook for MemoryWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(n, _)| n.clone()).collect()
    }

    fn dimensions(&self, sheet: &str) -> Result<(u32, u32)> {
        let cells = self.cells(sheet)?;
        Ok(cells.keys().fold((0, 0), |(r, c), k| (r.max(k.row), c.max(k.col))))
    }

    fn cell(&self, sheet: &str, cell: CellRef) -> Result<Option<Cell>> {
        Ok(self.cells(sheet)?.get(&cell).cloned())
    }
}

pub(crate) fn text(s: &str) -> CellValue {
    CellValue::Text(s.to_string())
}
