//! Marker indexing over a master workbook.
//!
//! Column A of every sheet is scanned for `pptstart:<name>` / `pptend:` cell
//! pairs. Each pair yields a [`MarkerRange`] covering the start-marker row up
//! to the row before the end marker.

use crate::{CellRef, MarkerIndex, MarkerRange, Result, Workbook};

/// Prefix of a cell opening a named range.
pub const START_MARKER_PREFIX: &str = "pptstart:";

/// Prefix of a cell closing the pending range.
pub const END_MARKER_PREFIX: &str = "pptend:";

/// Extract the marker name from a `pptstart:<name>` string.
pub fn parse_marker_name(text: &str) -> Option<&str> {
    if !text.starts_with(START_MARKER_PREFIX) {
        return None;
    }
    text.split_once(':').map(|(_, name)| name)
}

/// Builds a [`MarkerIndex`] from a workbook.
#[derive(Debug, Clone, Default)]
pub struct MarkerIndexer;

impl MarkerIndexer {
    pub fn new() -> Self {
        Self
    }

    /// Index every marker pair in the workbook.
    ///
    /// Never fails: a read error stops scanning and the ranges collected so
    /// far are returned.
    pub fn index<W: Workbook + ?Sized>(&self, workbook: &W) -> MarkerIndex {
        let mut index = MarkerIndex::new();

        for sheet in workbook.sheet_names() {
            if let Err(e) = self.index_sheet(workbook, &sheet, &mut index) {
                log::error!(
                    "Failed to analyze workbook markers on sheet '{}': {} ({} ranges collected)",
                    sheet,
                    e,
                    index.len()
                );
                break;
            }
        }

        log::info!("Indexed {} marker ranges", index.len());
        index
    }

    fn index_sheet<W: Workbook + ?Sized>(&self, workbook: &W, sheet: &str, index: &mut MarkerIndex) -> Result<()> {
        let (max_row, _) = workbook.dimensions(sheet)?;
        let mut pending: Option<(String, u32)> = None;

        for row in 1..=max_row {
            let Some(cell) = workbook.cell(sheet, CellRef::new(row, 1))? else {
                continue;
            };
            let Some(text) = cell.value.as_text() else {
                continue;
            };

            if let Some(name) = parse_marker_name(text) {
                if let Some((previous, start)) = &pending {
                    log::debug!(
                        "Marker '{}' at {}!A{} replaced by '{}' at row {} before its end marker",
                        previous,
                        sheet,
                        start,
                        name,
                        row
                    );
                }
                pending = Some((name.to_string(), row));
            } else if text.starts_with(END_MARKER_PREFIX) {
                match pending.take() {
                    Some((name, start_row)) => {
                        let end_row = row - 1;
                        let range = MarkerRange::new(name, sheet, start_row, end_row);
                        log::debug!(
                            "Marker '{}' -> {}!{}:{}",
                            range.name,
                            sheet,
                            range.start_row,
                            range.end_row
                        );
                        if let Some(previous) = index.insert(range) {
                            log::warn!(
                                "Duplicate marker '{}': range on sheet '{}' replaced by a later one",
                                previous.name,
                                previous.sheet_name
                            );
                        }
                    }
                    None => {
                        log::debug!("End marker at {}!A{} has no open start marker", sheet, row);
                    }
                }
            }
        }

        if let Some((name, row)) = pending {
            log::warn!("Marker '{}' at {}!A{} is never closed", name, sheet, row);
        }

        Ok(())
    }
}
