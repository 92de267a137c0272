//! Workbook exporter - WorkbookPlan → .xlsx bytes

use super::named_styles::register_named_styles;
use crate::error::{ConvertError, ConvertResult};
use crate::types::CellValue;
use crate::workbook::{
    column_letter, Alignment, Border, BorderLine, CellStyle, ConditionalRule, Fill, FillPattern,
    FormattedSheet, HorizontalAlign, NumberFormat, Orientation, Script, SheetCell, StyleColor,
    Underline, VerticalAlign, WorkbookPlan,
};
use rust_xlsxwriter::{
    Color, ConditionalFormatFormula, Format, FormatAlign, FormatBorder, FormatDiagonalBorder,
    FormatPattern, FormatScript, FormatUnderline, Workbook, Worksheet,
};
use tracing::debug;

/// Serializes a [`WorkbookPlan`] in one pass.
pub struct WorkbookExporter<'a> {
    plan: &'a WorkbookPlan,
}

impl<'a> WorkbookExporter<'a> {
    pub fn new(plan: &'a WorkbookPlan) -> Self {
        Self { plan }
    }

    /// Serialize the plan, named styles included.
    pub fn to_bytes(&self) -> ConvertResult<Vec<u8>> {
        let mut workbook = self.build()?;
        let bytes = workbook.save_to_buffer()?;
        register_named_styles(bytes, self.plan)
    }

    fn build(&self) -> ConvertResult<Workbook> {
        if self.plan.sheets().is_empty() {
            return Err(ConvertError::Workbook(
                "workbook has no sheets to write".to_string(),
            ));
        }
        let active = self
            .plan
            .sheets()
            .iter()
            .position(|s| !s.is_hidden())
            .ok_or_else(|| ConvertError::Workbook("every sheet is hidden".to_string()))?;

        let mut workbook = Workbook::new();
        for (index, sheet) in self.plan.sheets().iter().enumerate() {
            let worksheet = workbook.add_worksheet();
            self.export_sheet(worksheet, sheet)?;
            if index == active {
                worksheet.set_active(true);
            }
        }
        Ok(workbook)
    }

    fn export_sheet(&self, worksheet: &mut Worksheet, sheet: &FormattedSheet) -> ConvertResult<()> {
        worksheet.set_name(&sheet.name)?;

        // Merges first: merge_range writes blanks that the cell pass overwrites.
        let blank = Format::new();
        for range in &sheet.merged_ranges {
            worksheet.merge_range(
                range.first_row,
                range.first_col,
                range.last_row,
                range.last_col,
                "",
                &blank,
            )?;
        }

        for (&(row, col), cell) in &sheet.cells {
            self.write_cell(worksheet, row, col, cell)?;
        }

        if let Some(height) = sheet.format.default_row_height {
            worksheet.set_default_row_height(height);
        }
        for (&col, &width) in &sheet.column_widths {
            worksheet.set_column_width(col, width)?;
        }
        for &col in &sheet.hidden_columns {
            worksheet.set_column_hidden(col)?;
        }
        for (&row, &height) in &sheet.row_heights {
            worksheet.set_row_height(row, height)?;
        }
        for &row in &sheet.hidden_rows {
            worksheet.set_row_hidden(row)?;
        }

        if let Some((rows, cols)) = sheet.freeze_panes {
            worksheet.set_freeze_panes(rows, cols)?;
        }
        if let Some(color) = sheet.properties.tab_color {
            worksheet.set_tab_color(color_of(color));
        }
        if let Some(m) = sheet.margins {
            worksheet.set_margins(m.left, m.right, m.top, m.bottom, m.header, m.footer);
        }
        if let Some(setup) = sheet.page_setup {
            match setup.orientation {
                Some(Orientation::Landscape) => {
                    worksheet.set_landscape();
                }
                Some(Orientation::Portrait) => {
                    worksheet.set_portrait();
                }
                None => {}
            }
            if let Some(size) = setup.paper_size {
                worksheet.set_paper_size(size);
            }
            if sheet.properties.fit_to_page {
                worksheet.set_print_fit_to_pages(
                    setup.fit_to_width.unwrap_or(1),
                    setup.fit_to_height.unwrap_or(1),
                );
            } else if let Some(scale) = setup.scale {
                worksheet.set_print_scale(scale);
            }
        }
        if let Some(options) = sheet.print_options {
            worksheet.set_print_center_horizontally(options.center_horizontally);
            worksheet.set_print_center_vertically(options.center_vertically);
            worksheet.set_print_gridlines(options.gridlines);
        }

        for rule in &sheet.conditional_formats {
            self.write_conditional_format(worksheet, &sheet.name, rule)?;
        }

        if sheet.is_hidden() {
            worksheet.set_hidden(true);
        }

        debug!(sheet = %sheet.name, cells = sheet.cells.len(), hidden = sheet.is_hidden(), "exported sheet");
        Ok(())
    }

    /// Explicit styles win; otherwise a referenced named style is applied as a
    /// direct format.
    fn write_cell(
        &self,
        worksheet: &mut Worksheet,
        row: u32,
        col: u16,
        cell: &SheetCell,
    ) -> ConvertResult<()> {
        let style = cell.style.as_ref().or_else(|| {
            cell.named_style
                .as_deref()
                .and_then(|name| self.plan.named_style(name))
                .map(|named| &named.style)
                .filter(|style| !style.is_empty())
        });

        let Some(style) = style else {
            match &cell.value {
                CellValue::Empty => {}
                CellValue::String(s) | CellValue::DateTimeIso(s) | CellValue::Error(s) => {
                    worksheet.write_string(row, col, s)?;
                }
                CellValue::Int(i) => {
                    worksheet.write_number(row, col, *i as f64)?;
                }
                CellValue::Float(f) | CellValue::DateTime(f) => {
                    worksheet.write_number(row, col, *f)?;
                }
                CellValue::Bool(b) => {
                    worksheet.write_boolean(row, col, *b)?;
                }
            }
            return Ok(());
        };

        let format = format_for(style);
        match &cell.value {
            CellValue::Empty => {
                worksheet.write_blank(row, col, &format)?;
            }
            CellValue::String(s) | CellValue::DateTimeIso(s) | CellValue::Error(s) => {
                worksheet.write_string_with_format(row, col, s, &format)?;
            }
            CellValue::Int(i) => {
                worksheet.write_number_with_format(row, col, *i as f64, &format)?;
            }
            CellValue::Float(f) | CellValue::DateTime(f) => {
                worksheet.write_number_with_format(row, col, *f, &format)?;
            }
            CellValue::Bool(b) => {
                worksheet.write_boolean_with_format(row, col, *b, &format)?;
            }
        }
        Ok(())
    }

    fn write_conditional_format(
        &self,
        worksheet: &mut Worksheet,
        sheet_name: &str,
        rule: &ConditionalRule,
    ) -> ConvertResult<()> {
        let Some(first) = rule.ranges.first() else {
            return Ok(());
        };
        let anchor = format!("{}{}", column_letter(first.first_col), first.first_row + 1);
        let Some(formula) = rule.kind.to_formula(&anchor) else {
            debug!(sheet = sheet_name, range = %first, "skipping conditional format without formula");
            return Ok(());
        };

        let mut conditional = ConditionalFormatFormula::new()
            .set_rule(formula.as_str())
            .set_stop_if_true(rule.stop_if_true);
        if let Some(style) = &rule.style {
            conditional = conditional.set_format(format_for(style));
        }
        if rule.ranges.len() > 1 {
            let sqref = rule
                .ranges
                .iter()
                .map(|r| r.to_string())
                .collect::<Vec<_>>()
                .join(" ");
            conditional = conditional.set_multi_range(&sqref);
        }
        worksheet.add_conditional_format(
            first.first_row,
            first.first_col,
            first.last_row,
            first.last_col,
            &conditional,
        )?;
        Ok(())
    }
}

fn color_of(color: StyleColor) -> Color {
    match color {
        StyleColor::Rgb(rgb) => Color::RGB(rgb),
        StyleColor::Automatic => Color::Automatic,
    }
}

/// Build a rust_xlsxwriter format carrying every part of `style`.
pub fn format_for(style: &CellStyle) -> Format {
    let mut format = Format::new();

    if let Some(font) = &style.font {
        if let Some(name) = &font.name {
            format = format.set_font_name(name);
        }
        if let Some(size) = font.size {
            format = format.set_font_size(size);
        }
        if font.bold {
            format = format.set_bold();
        }
        if font.italic {
            format = format.set_italic();
        }
        if let Some(underline) = font.underline {
            format = format.set_underline(match underline {
                Underline::Single => FormatUnderline::Single,
                Underline::Double => FormatUnderline::Double,
                Underline::SingleAccounting => FormatUnderline::SingleAccounting,
                Underline::DoubleAccounting => FormatUnderline::DoubleAccounting,
            });
        }
        if font.strikethrough {
            format = format.set_font_strikethrough();
        }
        if let Some(color) = font.color {
            format = format.set_font_color(color_of(color));
        }
        if let Some(script) = font.script {
            format = format.set_font_script(match script {
                Script::Superscript => FormatScript::Superscript,
                Script::Subscript => FormatScript::Subscript,
            });
        }
        if let Some(family) = font.family {
            format = format.set_font_family(family);
        }
        if let Some(charset) = font.charset {
            format = format.set_font_charset(charset);
        }
    }

    if let Some(border) = &style.border {
        format = apply_border(format, border);
    }
    if let Some(fill) = &style.fill {
        format = apply_fill(format, fill);
    }

    match &style.number_format {
        Some(NumberFormat::Custom(code)) => format = format.set_num_format(code),
        Some(NumberFormat::Builtin(id)) if *id > 0 => {
            format = format.set_num_format_index(u8::try_from(*id).unwrap_or(0));
        }
        _ => {}
    }

    if let Some(protection) = &style.protection {
        if !protection.locked {
            format = format.set_unlocked();
        }
        if protection.hidden {
            format = format.set_hidden();
        }
    }

    if let Some(alignment) = &style.alignment {
        format = apply_alignment(format, alignment);
    }

    format
}

fn border_line(line: BorderLine) -> FormatBorder {
    match line {
        BorderLine::Thin => FormatBorder::Thin,
        BorderLine::Medium => FormatBorder::Medium,
        BorderLine::Dashed => FormatBorder::Dashed,
        BorderLine::Dotted => FormatBorder::Dotted,
        BorderLine::Thick => FormatBorder::Thick,
        BorderLine::Double => FormatBorder::Double,
        BorderLine::Hair => FormatBorder::Hair,
        BorderLine::MediumDashed => FormatBorder::MediumDashed,
        BorderLine::DashDot => FormatBorder::DashDot,
        BorderLine::MediumDashDot => FormatBorder::MediumDashDot,
        BorderLine::DashDotDot => FormatBorder::DashDotDot,
        BorderLine::MediumDashDotDot => FormatBorder::MediumDashDotDot,
        BorderLine::SlantDashDot => FormatBorder::SlantDashDot,
    }
}

fn apply_border(mut format: Format, border: &Border) -> Format {
    if let Some(edge) = border.left {
        format = format.set_border_left(border_line(edge.line));
        if let Some(color) = edge.color {
            format = format.set_border_left_color(color_of(color));
        }
    }
    if let Some(edge) = border.right {
        format = format.set_border_right(border_line(edge.line));
        if let Some(color) = edge.color {
            format = format.set_border_right_color(color_of(color));
        }
    }
    if let Some(edge) = border.top {
        format = format.set_border_top(border_line(edge.line));
        if let Some(color) = edge.color {
            format = format.set_border_top_color(color_of(color));
        }
    }
    if let Some(edge) = border.bottom {
        format = format.set_border_bottom(border_line(edge.line));
        if let Some(color) = edge.color {
            format = format.set_border_bottom_color(color_of(color));
        }
    }
    if let Some(edge) = border.diagonal {
        let kind = match (border.diagonal_up, border.diagonal_down) {
            (true, true) => Some(FormatDiagonalBorder::BorderUpDown),
            (true, false) => Some(FormatDiagonalBorder::BorderUp),
            (false, true) => Some(FormatDiagonalBorder::BorderDown),
            (false, false) => None,
        };
        if let Some(kind) = kind {
            format = format
                .set_border_diagonal(border_line(edge.line))
                .set_border_diagonal_type(kind);
            if let Some(color) = edge.color {
                format = format.set_border_diagonal_color(color_of(color));
            }
        }
    }
    format
}

fn fill_pattern(pattern: FillPattern) -> FormatPattern {
    match pattern {
        FillPattern::None => FormatPattern::None,
        FillPattern::Solid => FormatPattern::Solid,
        FillPattern::MediumGray => FormatPattern::MediumGray,
        FillPattern::DarkGray => FormatPattern::DarkGray,
        FillPattern::LightGray => FormatPattern::LightGray,
        FillPattern::DarkHorizontal => FormatPattern::DarkHorizontal,
        FillPattern::DarkVertical => FormatPattern::DarkVertical,
        FillPattern::DarkDown => FormatPattern::DarkDown,
        FillPattern::DarkUp => FormatPattern::DarkUp,
        FillPattern::DarkGrid => FormatPattern::DarkGrid,
        FillPattern::DarkTrellis => FormatPattern::DarkTrellis,
        FillPattern::LightHorizontal => FormatPattern::LightHorizontal,
        FillPattern::LightVertical => FormatPattern::LightVertical,
        FillPattern::LightDown => FormatPattern::LightDown,
        FillPattern::LightUp => FormatPattern::LightUp,
        FillPattern::LightGrid => FormatPattern::LightGrid,
        FillPattern::LightTrellis => FormatPattern::LightTrellis,
        FillPattern::Gray125 => FormatPattern::Gray125,
        FillPattern::Gray0625 => FormatPattern::Gray0625,
    }
}

/// Solid fills carry their color in `foreground`; other patterns draw the
/// foreground color over the background.
fn apply_fill(mut format: Format, fill: &Fill) -> Format {
    match fill.pattern {
        FillPattern::None => format,
        FillPattern::Solid => {
            if let Some(color) = fill.foreground {
                format = format.set_background_color(color_of(color));
            }
            format.set_pattern(FormatPattern::Solid)
        }
        pattern => {
            format = format.set_pattern(fill_pattern(pattern));
            if let Some(color) = fill.foreground {
                format = format.set_foreground_color(color_of(color));
            }
            if let Some(color) = fill.background {
                format = format.set_background_color(color_of(color));
            }
            format
        }
    }
}

fn apply_alignment(mut format: Format, alignment: &Alignment) -> Format {
    if let Some(horizontal) = alignment.horizontal {
        format = format.set_align(match horizontal {
            HorizontalAlign::General => FormatAlign::General,
            HorizontalAlign::Left => FormatAlign::Left,
            HorizontalAlign::Center => FormatAlign::Center,
            HorizontalAlign::Right => FormatAlign::Right,
            HorizontalAlign::Fill => FormatAlign::Fill,
            HorizontalAlign::Justify => FormatAlign::Justify,
            HorizontalAlign::CenterContinuous => FormatAlign::CenterAcross,
            HorizontalAlign::Distributed => FormatAlign::Distributed,
        });
    }
    if let Some(vertical) = alignment.vertical {
        format = format.set_align(match vertical {
            VerticalAlign::Top => FormatAlign::Top,
            VerticalAlign::Center => FormatAlign::VerticalCenter,
            VerticalAlign::Bottom => FormatAlign::Bottom,
            VerticalAlign::Justify => FormatAlign::VerticalJustify,
            VerticalAlign::Distributed => FormatAlign::VerticalDistributed,
        });
    }
    if alignment.wrap_text {
        format = format.set_text_wrap();
    }
    if alignment.shrink_to_fit {
        format = format.set_shrink();
    }
    if alignment.indent > 0 {
        format = format.set_indent(alignment.indent);
    }
    if let Some(rotation) = rotation_degrees(alignment.rotation) {
        format = format.set_rotation(rotation);
    }
    format
}

/// OOXML stores downward angles as 91-180 and stacked text as 255.
fn rotation_degrees(rotation: u16) -> Option<i16> {
    match rotation {
        0 => None,
        1..=90 => Some(rotation as i16),
        91..=180 => Some(90 - rotation as i16),
        255 => Some(270),
        _ => None,
    }
}
