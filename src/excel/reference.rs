//! Reference (template) workbook loader
//!
//! Cell values come from calamine; everything calamine does not expose
//! (styles, widths, heights, merges, print setup, conditional formats) is read
//! straight from the package parts.

use super::importer::cell_value;
use super::styles::{StyleSheet, ThemePalette};
use super::xml::XmlElement;
use crate::error::{ConvertError, ConvertResult};
use crate::types::CellValue;
use crate::workbook::{
    parse_cell_ref, CellOperator, CellRange, ConditionalKind, ConditionalRule, FormattedSheet,
    NamedStyle, Orientation, PageMargins, PageSetup, PrintOptions, SheetCell, SheetVisibility,
};
use calamine::{Reader, Xlsx};
use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use tracing::{debug, info};
use zip::result::ZipError;
use zip::ZipArchive;

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
pub(super) const STYLES_PART: &str = "xl/styles.xml";
const THEME_PART: &str = "xl/theme/theme1.xml";

/// Column width padding Excel adds to the character count (5px at 7px/char).
const COLUMN_WIDTH_PADDING: f64 = 5.0 / 7.0;

/// A template workbook, fully loaded into memory.
#[derive(Debug, Clone)]
pub struct ReferenceWorkbook {
    sheets: Vec<FormattedSheet>,
    named_styles: Vec<NamedStyle>,
}

impl ReferenceWorkbook {
    pub fn from_path<P: AsRef<Path>>(path: P) -> ConvertResult<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> ConvertResult<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut values: Xlsx<_> = Xlsx::new(Cursor::new(bytes))?;

        let theme = match read_part(&mut archive, THEME_PART)? {
            Some(xml) => ThemePalette::parse(&xml)?,
            None => ThemePalette::default(),
        };
        let styles = match read_part(&mut archive, STYLES_PART)? {
            Some(xml) => StyleSheet::parse(&xml, &theme)?,
            None => StyleSheet::default(),
        };

        let mut sheets = Vec::new();
        for (entry, target) in sheet_parts(&mut archive)? {
            let Some(name) = entry.attr("name") else {
                continue;
            };
            let target = target.as_str();
            let sheet_xml = read_part(&mut archive, target)?
                .ok_or_else(|| ConvertError::Workbook(format!("missing part {}", target)))?;

            let mut sheet = FormattedSheet::new(name);
            if matches!(entry.attr("state"), Some("hidden" | "veryHidden")) {
                sheet.visibility = SheetVisibility::Hidden;
            }
            read_layout(&mut sheet, target, &sheet_xml, &styles, &theme)?;

            let range = values.worksheet_range(name)?;
            let (top, left) = range.start().unwrap_or((0, 0));
            for (row, col, data) in range.used_cells() {
                sheet
                    .cells
                    .entry((top + row as u32, (left as usize + col) as u16))
                    .or_default()
                    .value = cell_value(data);
            }

            debug!(
                sheet = name,
                cells = sheet.cells.len(),
                merged = sheet.merged_ranges.len(),
                "loaded reference sheet"
            );
            sheets.push(sheet);
        }

        info!(sheets = sheets.len(), "loaded reference workbook");
        Ok(Self {
            sheets,
            named_styles: styles.named_styles().to_vec(),
        })
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn sheet(&self, name: &str) -> Option<&FormattedSheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn named_styles(&self) -> &[NamedStyle] {
        &self.named_styles
    }

    pub fn named_style(&self, name: &str) -> Option<&NamedStyle> {
        self.named_styles.iter().find(|s| s.name == name)
    }
}

pub(super) fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> ConvertResult<Option<String>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut text = String::new();
    file.read_to_string(&mut text)?;
    Ok(Some(text))
}

/// Every named `<sheet>` entry of `xl/workbook.xml` with its worksheet part path.
pub(super) fn sheet_parts<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
) -> ConvertResult<Vec<(XmlElement, String)>> {
    let workbook_xml = read_part(archive, WORKBOOK_PART)?
        .ok_or_else(|| ConvertError::Workbook(format!("missing part {}", WORKBOOK_PART)))?;
    let rels = match read_part(archive, WORKBOOK_RELS_PART)? {
        Some(xml) => parse_relationships(&xml)?,
        None => HashMap::new(),
    };

    let root = XmlElement::parse(WORKBOOK_PART, &workbook_xml)?;
    let mut parts = Vec::new();
    for entry in root
        .child("sheets")
        .into_iter()
        .flat_map(|e| e.children_named("sheet"))
    {
        let Some(name) = entry.attr("name") else {
            continue;
        };
        let target = entry
            .attr("r:id")
            .and_then(|id| rels.get(id))
            .ok_or_else(|| {
                ConvertError::Workbook(format!("sheet '{}' has no worksheet part", name))
            })?
            .clone();
        parts.push((entry.clone(), target));
    }
    Ok(parts)
}

/// Relationship id → package part path.
fn parse_relationships(xml: &str) -> ConvertResult<HashMap<String, String>> {
    let root = XmlElement::parse(WORKBOOK_RELS_PART, xml)?;
    Ok(root
        .children_named("Relationship")
        .filter_map(|rel| {
            let id = rel.attr("Id")?;
            let target = rel.attr("Target")?;
            Some((id.to_string(), resolve_target(target)))
        })
        .collect())
}

/// Targets are relative to `xl/` unless absolute.
fn resolve_target(target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut parts: Vec<&str> = vec!["xl"];
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

fn read_layout(
    sheet: &mut FormattedSheet,
    part: &str,
    xml: &str,
    styles: &StyleSheet,
    theme: &ThemePalette,
) -> ConvertResult<()> {
    let root = XmlElement::parse(part, xml)?;

    if let Some(pr) = root.child("sheetPr") {
        sheet.properties.tab_color = pr
            .child("tabColor")
            .and_then(|c| super::styles::parse_color(c, theme));
        sheet.properties.fit_to_page = pr
            .child("pageSetUpPr")
            .and_then(|p| p.attr_bool("fitToPage"))
            .unwrap_or(false);
    }

    if let Some(pane) = root
        .child("sheetViews")
        .and_then(|v| v.child("sheetView"))
        .and_then(|v| v.child("pane"))
    {
        if matches!(pane.attr("state"), Some("frozen" | "frozenSplit")) {
            let rows = pane.attr_parse::<f64>("ySplit").unwrap_or(0.0) as u32;
            let cols = pane.attr_parse::<f64>("xSplit").unwrap_or(0.0) as u16;
            if rows > 0 || cols > 0 {
                sheet.freeze_panes = Some((rows, cols));
            }
        }
    }

    if let Some(format) = root.child("sheetFormatPr") {
        sheet.format.default_row_height = format.attr_parse("defaultRowHeight");
        sheet.format.default_column_width = format.attr_parse("defaultColWidth");
    }

    for col in root
        .child("cols")
        .into_iter()
        .flat_map(|c| c.children_named("col"))
    {
        let (Some(min), Some(max)) = (col.attr_parse::<u16>("min"), col.attr_parse::<u16>("max"))
        else {
            continue;
        };
        let width = col.attr_parse::<f64>("width");
        let hidden = col.attr_bool("hidden").unwrap_or(false);
        for index in min.max(1)..=max {
            if let Some(width) = width {
                sheet.set_column_width(index - 1, (width - COLUMN_WIDTH_PADDING).max(0.0));
            }
            if hidden {
                sheet.hidden_columns.insert(index - 1);
            }
        }
    }

    read_sheet_data(sheet, &root, styles);

    for merge in root
        .child("mergeCells")
        .into_iter()
        .flat_map(|m| m.children_named("mergeCell"))
    {
        if let Some(range) = merge.attr("ref").and_then(CellRange::parse) {
            sheet.merged_ranges.push(range);
        }
    }

    for block in root.children_named("conditionalFormatting") {
        let ranges: Vec<CellRange> = block
            .attr("sqref")
            .unwrap_or("")
            .split_whitespace()
            .filter_map(CellRange::parse)
            .collect();
        if ranges.is_empty() {
            continue;
        }
        for rule in block.children_named("cfRule") {
            let formulas: Vec<String> = rule
                .children_named("formula")
                .map(|f| f.text().trim().to_string())
                .collect();
            let kind = match rule.attr("type") {
                Some("expression") => match formulas.into_iter().next() {
                    Some(formula) => ConditionalKind::Expression(formula),
                    None => continue,
                },
                Some("cellIs") => match rule.attr("operator").and_then(CellOperator::from_ooxml) {
                    Some(operator) => ConditionalKind::CellIs { operator, formulas },
                    None => continue,
                },
                other => {
                    debug!(sheet = %sheet.name, rule = ?other, "skipping unsupported conditional format");
                    continue;
                }
            };
            sheet.conditional_formats.push(ConditionalRule {
                ranges: ranges.clone(),
                kind,
                style: rule
                    .attr_parse::<usize>("dxfId")
                    .and_then(|id| styles.differential(id).cloned()),
                stop_if_true: rule.attr_bool("stopIfTrue").unwrap_or(false),
            });
        }
    }

    if let Some(options) = root.child("printOptions") {
        sheet.print_options = Some(PrintOptions {
            center_horizontally: options.attr_bool("horizontalCentered").unwrap_or(false),
            center_vertically: options.attr_bool("verticalCentered").unwrap_or(false),
            gridlines: options.attr_bool("gridLines").unwrap_or(false),
        });
    }

    if let Some(margins) = root.child("pageMargins") {
        let defaults = PageMargins::default();
        let get = |name: &str, default: f64| margins.attr_parse(name).unwrap_or(default);
        sheet.margins = Some(PageMargins {
            left: get("left", defaults.left),
            right: get("right", defaults.right),
            top: get("top", defaults.top),
            bottom: get("bottom", defaults.bottom),
            header: get("header", defaults.header),
            footer: get("footer", defaults.footer),
        });
    }

    if let Some(setup) = root.child("pageSetup") {
        sheet.page_setup = Some(PageSetup {
            orientation: match setup.attr("orientation") {
                Some("landscape") => Some(Orientation::Landscape),
                Some("portrait") => Some(Orientation::Portrait),
                _ => None,
            },
            paper_size: setup.attr_parse("paperSize"),
            scale: setup.attr_parse("scale"),
            fit_to_width: setup.attr_parse("fitToWidth"),
            fit_to_height: setup.attr_parse("fitToHeight"),
        });
    }

    Ok(())
}

/// Row heights, hidden rows and per-cell style references. Cells that only
/// carry a style (no value) are kept so their formatting survives the copy.
fn read_sheet_data(sheet: &mut FormattedSheet, root: &XmlElement, styles: &StyleSheet) {
    let Some(data) = root.child("sheetData") else {
        return;
    };
    let mut next_row = 0u32;
    for row in data.children_named("row") {
        let row_index = row
            .attr_parse::<u32>("r")
            .map(|r| r.saturating_sub(1))
            .unwrap_or(next_row);
        next_row = row_index + 1;

        if let Some(height) = row.attr_parse::<f64>("ht") {
            sheet.set_row_height(row_index, height);
        }
        if row.attr_bool("hidden").unwrap_or(false) {
            sheet.hidden_rows.insert(row_index);
        }

        let mut next_col = 0u16;
        for cell in row.children_named("c") {
            let col = cell
                .attr("r")
                .and_then(parse_cell_ref)
                .map(|(_, c)| c)
                .unwrap_or(next_col);
            next_col = col.saturating_add(1);

            let Some(xf) = cell.attr_parse::<usize>("s") else {
                continue;
            };
            let entry = sheet.cells.entry((row_index, col)).or_insert_with(|| SheetCell {
                value: CellValue::Empty,
                ..Default::default()
            });
            entry.named_style = styles.named_style_of(xf).map(str::to_string);
            if xf != 0 {
                entry.style = styles.cell_style(xf).cloned();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(resolve_target("/xl/worksheets/sheet2.xml"), "xl/worksheets/sheet2.xml");
        assert_eq!(resolve_target("../xl/worksheets/sheet3.xml"), "xl/worksheets/sheet3.xml");
    }

    #[test]
    fn test_layout_from_sheet_xml() {
        let xml = r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <sheetPr><tabColor rgb="FF00B050"/><pageSetUpPr fitToPage="1"/></sheetPr>
  <sheetViews><sheetView workbookViewId="0"><pane ySplit="1" topLeftCell="A2" activePane="bottomLeft" state="frozen"/></sheetView></sheetViews>
  <sheetFormatPr defaultRowHeight="18"/>
  <cols><col min="1" max="2" width="20.7109375" customWidth="1"/><col min="4" max="4" width="9" hidden="1"/></cols>
  <sheetData>
    <row r="1" ht="30" customHeight="1"><c r="A1" s="0" t="s"><v>0</v></c><c r="C1"/></row>
    <row r="3" hidden="1"><c r="B3"><v>1</v></c></row>
  </sheetData>
  <mergeCells count="1"><mergeCell ref="A1:B1"/></mergeCells>
  <conditionalFormatting sqref="A2:A10 C2:C10"><cfRule type="cellIs" dxfId="0" priority="1" operator="greaterThan"><formula>5</formula></cfRule><cfRule type="dataBar" priority="2"/></conditionalFormatting>
  <printOptions horizontalCentered="1"/>
  <pageMargins left="0.5" right="0.5" top="1" bottom="1" header="0.3" footer="0.3"/>
  <pageSetup paperSize="9" orientation="landscape"/>
</worksheet>"#;
        let mut sheet = FormattedSheet::new("page");
        read_layout(&mut sheet, "xl/worksheets/sheet1.xml", xml, &StyleSheet::default(), &ThemePalette::default()).unwrap();

        assert_eq!(sheet.properties.tab_color, Some(crate::workbook::StyleColor::Rgb(0x00B050)));
        assert!(sheet.properties.fit_to_page);
        assert_eq!(sheet.freeze_panes, Some((1, 0)));
        assert_eq!(sheet.format.default_row_height, Some(18.0));
        assert!((sheet.column_widths[&0] - 20.0).abs() < 0.01);
        assert!((sheet.column_widths[&1] - 20.0).abs() < 0.01);
        assert!(sheet.hidden_columns.contains(&3));
        assert_eq!(sheet.row_heights.get(&0), Some(&30.0));
        assert!(sheet.hidden_rows.contains(&2));
        assert_eq!(sheet.merged_ranges, vec![CellRange::new(0, 0, 0, 1)]);
        assert_eq!(sheet.conditional_formats.len(), 1);
        assert_eq!(sheet.conditional_formats[0].ranges.len(), 2);
        assert!(sheet.print_options.unwrap().center_horizontally);
        assert_eq!(sheet.margins.unwrap().top, 1.0);
        let setup = sheet.page_setup.unwrap();
        assert_eq!(setup.orientation, Some(Orientation::Landscape));
        assert_eq!(setup.paper_size, Some(9));
        // styled cell kept even though it has no value
        assert!(sheet.cell(0, 0).is_some());
        assert!(sheet.cell(0, 2).is_none());
    }
}
