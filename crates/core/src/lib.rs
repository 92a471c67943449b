//! Core domain types, marker indexing, value formatting and placeholder
//! substitution for binding spreadsheet ranges to presentation documents.

pub mod automation;
pub mod config;
pub mod error;
pub mod format;
pub mod markers;
pub mod placeholder;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use automation::{AutomationSlot, SlotGuard};
pub use config::TransformConfig;
pub use error::{Error, Result};
pub use format::ValueFormatter;
pub use markers::{parse_marker_name, MarkerIndexer, END_MARKER_PREFIX, START_MARKER_PREFIX};
pub use placeholder::PlaceholderSubstitutor;
pub use types::{Cell, CellRef, CellValue, MarkerIndex, MarkerRange, PlaceholderToken, Workbook};
