//! Spreadsheet backend for binding workbook ranges to presentations.
//!
//! Reads the master workbook and rewrites the workbooks embedded in a
//! presentation package behind its charts, using `umya-spreadsheet`.

pub mod embedded;
pub mod master;

pub use embedded::EmbeddedObjectRewriter;
pub use master::MasterWorkbook;
