//! Deep copy of a reference sheet into an output workbook plan

use super::reference::ReferenceWorkbook;
use crate::error::{ConvertError, ConvertResult};
use crate::workbook::{FormattedSheet, WorkbookPlan};
use tracing::debug;

/// Copy sheet `source_name` of `source` into `target`, named `new_name` (or the
/// source name). Values, per-cell styles, dimensions, merges, sheet-level
/// settings and conditional formats are copied by value; named styles are added
/// only when `target` has none with the same name.
pub fn copy_sheet<'t>(
    source: &ReferenceWorkbook,
    source_name: &str,
    target: &'t mut WorkbookPlan,
    new_name: Option<&str>,
) -> ConvertResult<&'t mut FormattedSheet> {
    let donor = source
        .sheet(source_name)
        .ok_or_else(|| ConvertError::NotFound(source_name.to_string()))?;
    let name = new_name.unwrap_or(source_name);

    let sheet = target.add_sheet(name)?;

    sheet.cells = donor.cells.clone();

    sheet.column_widths = donor.column_widths.clone();
    sheet.row_heights = donor.row_heights.clone();
    sheet.hidden_columns = donor.hidden_columns.clone();
    sheet.hidden_rows = donor.hidden_rows.clone();

    sheet.merged_ranges = donor
        .merged_ranges
        .iter()
        .filter(|range| !range.is_single_cell())
        .copied()
        .collect();

    sheet.format = donor.format;
    sheet.properties = donor.properties;
    sheet.margins = donor.margins;
    sheet.freeze_panes = donor.freeze_panes;
    sheet.page_setup = donor.page_setup;
    sheet.print_options = donor.print_options;
    sheet.conditional_formats = donor.conditional_formats.clone();
    let (cells, merged) = (sheet.cells.len(), sheet.merged_ranges.len());

    let mut added_styles = 0;
    for style in source.named_styles() {
        if target.add_named_style(style.clone()) {
            added_styles += 1;
        }
    }

    debug!(
        from = source_name,
        to = name,
        cells,
        merged,
        named_styles = added_styles,
        "copied reference sheet"
    );
    target
        .sheet_mut(name)
        .ok_or_else(|| ConvertError::Workbook(format!("sheet '{}' vanished during copy", name)))
}
