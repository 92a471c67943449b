//! PPTX (Office Open XML) package transformation.
//!
//! Rewrites the workbooks embedded behind charts from a master workbook,
//! substitutes `[[Sheet!Cell]]` placeholders in slide markup, and parses the
//! result back into a typed [`PresentationDocument`].

pub mod archive;
pub mod document;
pub mod refresh;
pub mod transform;

pub use archive::PartKind;
pub use document::{ChartDocument, PresentationDocument, SlideDocument};
pub use refresh::{ChartRefresher, CommandRefresher};
pub use transform::PackageTransformer;
