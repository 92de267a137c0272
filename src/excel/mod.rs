//! Excel import/export
//!
//! - Import: the order master sheet (.xlsx) → source records
//! - Reference: a template workbook with its formatting, read from the package parts
//! - Copy: a reference sheet → a new sheet of an output workbook plan
//! - Export: workbook plan → .xlsx bytes, named styles added to the package afterwards

mod copier;
mod exporter;
mod importer;
mod named_styles;
mod reference;
mod styles;
mod xml;

pub use copier::copy_sheet;
pub use exporter::{format_for, WorkbookExporter};
pub use importer::{read_source_file, SourceImporter, MOLD_STAGE_COLUMN};
pub use reference::ReferenceWorkbook;
pub use styles::{apply_tint, StyleSheet, ThemePalette};
