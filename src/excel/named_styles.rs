//! Named styles in written workbooks
//!
//! rust_xlsxwriter only writes direct cell formats and the builtin `Normal`
//! style. The named styles registered on a [`WorkbookPlan`] are added to the
//! serialized package afterwards: each one gets a `cellStyleXfs` entry (with its
//! own font, fill, border and number format records) and a `cellStyles` entry,
//! and every cell format used by a cell that references it has its `xfId`
//! pointed at that entry.

use super::reference::{read_part, sheet_parts, STYLES_PART};
use super::xml::XmlElement;
use crate::error::{ConvertError, ConvertResult};
use crate::workbook::{
    parse_cell_ref, Alignment, Border, BorderEdge, CellStyle, Fill, FillPattern, Font, NamedStyle,
    NumberFormat, Protection, Script, StyleColor, WorkbookPlan,
};
use quick_xml::escape::escape;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::io::{Cursor, Read, Seek, Write as _};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// First number format id available to custom formats.
const FIRST_CUSTOM_NUM_FMT: u16 = 164;

/// Add the plan's named styles to an xlsx package written from it. The bytes
/// are returned unchanged when there is nothing to add.
pub(super) fn register_named_styles(bytes: Vec<u8>, plan: &WorkbookPlan) -> ConvertResult<Vec<u8>> {
    Ok(rewrite_package(&bytes, plan)?.unwrap_or(bytes))
}

fn rewrite_package(bytes: &[u8], plan: &WorkbookPlan) -> ConvertResult<Option<Vec<u8>>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let Some(styles_xml) = read_part(&mut archive, STYLES_PART)? else {
        return Ok(None);
    };

    let root = XmlElement::parse(STYLES_PART, &styles_xml)?;
    let mut registry = StyleRegistry::new(&root);
    for style in plan.named_styles() {
        registry.add(style);
    }
    let parents = cell_format_parents(&mut archive, plan, &registry)?;
    if registry.is_empty() && parents.is_empty() {
        return Ok(None);
    }

    let styles_xml = registry.apply(&styles_xml, &parents)?;
    debug!(
        named_styles = registry.style_xfs.len(),
        cell_formats = parents.len(),
        "registered named styles"
    );
    repack(&mut archive, &styles_xml).map(Some)
}

/// Cell format index (`s`) → `cellStyleXfs` index, from the cells of the plan
/// that reference a named style.
fn cell_format_parents<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    plan: &WorkbookPlan,
    registry: &StyleRegistry,
) -> ConvertResult<HashMap<usize, usize>> {
    let mut parents = HashMap::new();
    for (entry, part) in sheet_parts(archive)? {
        let Some(sheet) = entry.attr("name").and_then(|name| plan.sheet(name)) else {
            continue;
        };
        if !sheet.cells.values().any(|cell| cell.named_style.is_some()) {
            continue;
        }
        let Some(xml) = read_part(archive, &part)? else {
            continue;
        };
        let root = XmlElement::parse(&part, &xml)?;
        let cells = root
            .child("sheetData")
            .into_iter()
            .flat_map(|data| data.children_named("row"))
            .flat_map(|row| row.children_named("c"));
        for c in cells {
            let (Some(position), Some(xf)) = (
                c.attr("r").and_then(parse_cell_ref),
                c.attr_parse::<usize>("s"),
            ) else {
                continue;
            };
            let Some(name) = sheet
                .cells
                .get(&position)
                .and_then(|cell| cell.named_style.as_deref())
            else {
                continue;
            };
            let Some(&style_xf) = registry.xf_ids.get(name) else {
                continue;
            };
            // cell format 0 is the workbook default and stays on Normal
            if xf == 0 || style_xf == 0 {
                continue;
            }
            let parent = *parents.entry(xf).or_insert(style_xf);
            if parent != style_xf {
                debug!(xf, style = name, "cell format already bound to another named style");
            }
        }
    }
    Ok(parents)
}

/// Copy every entry of `archive` into a new package, replacing `xl/styles.xml`.
fn repack<R: Read + Seek>(archive: &mut ZipArchive<R>, styles_xml: &str) -> ConvertResult<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for index in 0..archive.len() {
        let file = archive.by_index_raw(index)?;
        if file.name() == STYLES_PART {
            writer.start_file(STYLES_PART, options)?;
            writer.write_all(styles_xml.as_bytes())?;
        } else {
            writer.raw_copy_file(file)?;
        }
    }
    Ok(writer.finish()?.into_inner())
}

//==============================================================================
// Registry
//==============================================================================

/// Number of records already present in each section of `xl/styles.xml`.
#[derive(Debug, Default)]
struct SectionCounts {
    num_fmts: usize,
    fonts: usize,
    fills: usize,
    borders: usize,
    style_xfs: usize,
    cell_styles: usize,
}

/// Records to append to `xl/styles.xml`, as XML fragments.
#[derive(Debug, Default)]
struct StyleRegistry {
    existing: SectionCounts,
    has_num_fmts: bool,
    has_fills: bool,
    has_borders: bool,
    has_style_xfs: bool,
    has_cell_styles: bool,
    num_fmts: Vec<String>,
    fonts: Vec<String>,
    fills: Vec<String>,
    borders: Vec<String>,
    style_xfs: Vec<String>,
    cell_styles: Vec<String>,
    custom_formats: HashMap<String, u16>,
    next_num_fmt: u16,
    /// Named style → its `cellStyleXfs` index, for old and new styles alike
    xf_ids: HashMap<String, usize>,
}

impl StyleRegistry {
    fn new(root: &XmlElement) -> Self {
        let count = |list: &str, item: &str| {
            root.child(list)
                .map_or(0, |e| e.children_named(item).count())
        };

        let custom_formats: HashMap<String, u16> = root
            .child("numFmts")
            .into_iter()
            .flat_map(|e| e.children_named("numFmt"))
            .filter_map(|e| Some((e.attr("formatCode")?.to_string(), e.attr_parse("numFmtId")?)))
            .collect();
        let next_num_fmt = custom_formats
            .values()
            .map(|id| id + 1)
            .max()
            .unwrap_or(FIRST_CUSTOM_NUM_FMT)
            .max(FIRST_CUSTOM_NUM_FMT);

        let xf_ids: HashMap<String, usize> = root
            .child("cellStyles")
            .into_iter()
            .flat_map(|e| e.children_named("cellStyle"))
            .filter_map(|e| Some((e.attr("name")?.to_string(), e.attr_parse("xfId").unwrap_or(0))))
            .collect();

        Self {
            existing: SectionCounts {
                num_fmts: count("numFmts", "numFmt"),
                fonts: count("fonts", "font"),
                fills: count("fills", "fill"),
                borders: count("borders", "border"),
                style_xfs: count("cellStyleXfs", "xf"),
                cell_styles: count("cellStyles", "cellStyle"),
            },
            has_num_fmts: root.child("numFmts").is_some(),
            has_fills: root.child("fills").is_some(),
            has_borders: root.child("borders").is_some(),
            has_style_xfs: root.child("cellStyleXfs").is_some(),
            has_cell_styles: root.child("cellStyles").is_some(),
            custom_formats,
            next_num_fmt,
            xf_ids,
            ..Default::default()
        }
    }

    fn is_empty(&self) -> bool {
        self.style_xfs.is_empty()
    }

    /// Queue `style` unless the package already declares a style of that name.
    fn add(&mut self, style: &NamedStyle) {
        if self.xf_ids.contains_key(&style.name) {
            return;
        }
        let CellStyle {
            font,
            border,
            fill,
            number_format,
            protection,
            alignment,
        } = &style.style;

        let font_id = font.as_ref().map_or(0, |font| {
            self.fonts.push(font_xml(font));
            self.existing.fonts + self.fonts.len() - 1
        });
        let fill_id = fill.as_ref().map_or(0, |fill| {
            self.fills.push(fill_xml(fill));
            self.existing.fills + self.fills.len() - 1
        });
        let border_id = border.as_ref().map_or(0, |border| {
            self.borders.push(border_xml(border));
            self.existing.borders + self.borders.len() - 1
        });
        let num_fmt_id = match number_format {
            None => 0,
            Some(NumberFormat::Builtin(id)) => *id,
            Some(NumberFormat::Custom(code)) => self.custom_format(code),
        };

        let mut xf = format!(
            r#"<xf numFmtId="{}" fontId="{}" fillId="{}" borderId="{}""#,
            num_fmt_id, font_id, fill_id, border_id
        );
        match (alignment, protection) {
            (None, None) => xf.push_str("/>"),
            _ => {
                xf.push('>');
                if let Some(alignment) = alignment {
                    xf.push_str(&alignment_xml(alignment));
                }
                if let Some(protection) = protection {
                    xf.push_str(&protection_xml(*protection));
                }
                xf.push_str("</xf>");
            }
        }

        let xf_id = self.existing.style_xfs + self.style_xfs.len();
        self.style_xfs.push(xf);

        let mut entry = format!(r#"<cellStyle name="{}" xfId="{}""#, escape(&style.name), xf_id);
        if let Some(builtin) = style.builtin_id {
            let _ = write!(entry, r#" builtinId="{}""#, builtin);
        }
        entry.push_str("/>");
        self.cell_styles.push(entry);
        self.xf_ids.insert(style.name.clone(), xf_id);
    }

    fn custom_format(&mut self, code: &str) -> u16 {
        if let Some(&id) = self.custom_formats.get(code) {
            return id;
        }
        let id = self.next_num_fmt;
        self.next_num_fmt += 1;
        self.num_fmts.push(format!(
            r#"<numFmt numFmtId="{}" formatCode="{}"/>"#,
            id,
            escape(code)
        ));
        self.custom_formats.insert(code.to_string(), id);
        id
    }

    /// New records and the resulting record count of a top-level section.
    fn section(&self, name: &str) -> Option<(&[String], usize)> {
        let (added, existing) = match name {
            "numFmts" => (&self.num_fmts, self.existing.num_fmts),
            "fonts" => (&self.fonts, self.existing.fonts),
            "fills" => (&self.fills, self.existing.fills),
            "borders" => (&self.borders, self.existing.borders),
            "cellStyleXfs" => (&self.style_xfs, self.existing.style_xfs),
            "cellStyles" => (&self.cell_styles, self.existing.cell_styles),
            _ => return None,
        };
        if added.is_empty() {
            return None;
        }
        Some((added.as_slice(), existing + added.len()))
    }

    /// A whole section for a package that lacks it.
    fn missing_section(&self, name: &str, present: bool) -> Option<String> {
        if present {
            return None;
        }
        let (added, count) = self.section(name)?;
        Some(format!(
            r#"<{name} count="{count}">{}</{name}>"#,
            added.concat()
        ))
    }

    /// Stream `xml` through, appending the queued records to their sections and
    /// setting `xfId` on the cell formats in `parents`.
    fn apply(&self, xml: &str, parents: &HashMap<usize, usize>) -> ConvertResult<String> {
        let xml_err = |message: String| ConvertError::Xml {
            part: STYLES_PART.to_string(),
            message,
        };

        let mut reader = Reader::from_str(xml);
        let mut writer = Writer::new(Vec::new());
        let mut stack: Vec<String> = Vec::new();
        let mut cell_xf = 0usize;

        loop {
            let event = reader.read_event().map_err(|e| xml_err(e.to_string()))?;
            match event {
                Event::Start(e) => {
                    let name = local_name(&e);
                    let top_level = stack.len() == 1;
                    if top_level {
                        self.before_section(&mut writer, &name)?;
                    }
                    let start = self.rewrite_start(e, &name, &stack, &mut cell_xf, parents)?;
                    writer.write_event(Event::Start(start))?;
                    stack.push(name);
                }
                Event::Empty(e) => {
                    let name = local_name(&e);
                    let top_level = stack.len() == 1;
                    if top_level {
                        self.before_section(&mut writer, &name)?;
                    }
                    let start = self.rewrite_start(e, &name, &stack, &mut cell_xf, parents)?;
                    match self.section(&name).filter(|_| top_level) {
                        Some((added, _)) => {
                            let qualified = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                            writer.write_event(Event::Start(start))?;
                            writer.get_mut().write_all(added.concat().as_bytes())?;
                            writer.write_event(Event::End(BytesEnd::new(qualified)))?;
                        }
                        None => writer.write_event(Event::Empty(start))?,
                    }
                    if top_level {
                        self.after_section(&mut writer, &name)?;
                    }
                }
                Event::End(e) => {
                    let name = stack.pop().unwrap_or_default();
                    let top_level = stack.len() == 1;
                    if let Some((added, _)) = self.section(&name).filter(|_| top_level) {
                        writer.get_mut().write_all(added.concat().as_bytes())?;
                    }
                    writer.write_event(Event::End(e))?;
                    if top_level {
                        self.after_section(&mut writer, &name)?;
                    }
                }
                Event::Eof => break,
                other => writer.write_event(other)?,
            }
        }

        String::from_utf8(writer.into_inner()).map_err(|e| xml_err(e.to_string()))
    }

    /// Sections that precede `name` in the schema order and are missing.
    fn before_section(&self, writer: &mut Writer<Vec<u8>>, name: &str) -> ConvertResult<()> {
        let missing = match name {
            "fonts" => self.missing_section("numFmts", self.has_num_fmts),
            "cellXfs" => self.missing_section("cellStyleXfs", self.has_style_xfs),
            _ => None,
        };
        if let Some(xml) = missing {
            writer.get_mut().write_all(xml.as_bytes())?;
        }
        Ok(())
    }

    /// Sections that follow `name` in the schema order and are missing.
    fn after_section(&self, writer: &mut Writer<Vec<u8>>, name: &str) -> ConvertResult<()> {
        let missing = match name {
            "fonts" => [
                self.missing_section("fills", self.has_fills),
                self.missing_section("borders", self.has_borders),
            ],
            "cellXfs" => [self.missing_section("cellStyles", self.has_cell_styles), None],
            _ => [None, None],
        };
        for xml in missing.into_iter().flatten() {
            writer.get_mut().write_all(xml.as_bytes())?;
        }
        Ok(())
    }

    fn rewrite_start(
        &self,
        e: BytesStart<'_>,
        name: &str,
        stack: &[String],
        cell_xf: &mut usize,
        parents: &HashMap<usize, usize>,
    ) -> ConvertResult<BytesStart<'static>> {
        if stack.len() == 1 {
            if let Some((_, count)) = self.section(name) {
                return with_attr(&e, "count", &count.to_string());
            }
        }
        if name == "xf" && stack.last().map(String::as_str) == Some("cellXfs") {
            let index = *cell_xf;
            *cell_xf += 1;
            if let Some(parent) = parents.get(&index) {
                return with_attr(&e, "xfId", &parent.to_string());
            }
        }
        Ok(e.into_owned())
    }
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

/// Copy of `e` with attribute `key` set to `value`.
fn with_attr(e: &BytesStart<'_>, key: &str, value: &str) -> ConvertResult<BytesStart<'static>> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut out = BytesStart::new(name);
    for attr in e.attributes() {
        let attr = attr.map_err(|err| ConvertError::Xml {
            part: STYLES_PART.to_string(),
            message: err.to_string(),
        })?;
        if attr.key.as_ref() != key.as_bytes() {
            out.push_attribute(attr);
        }
    }
    out.push_attribute((key, value));
    Ok(out)
}

//==============================================================================
// Record fragments
//==============================================================================

fn color_xml(tag: &str, color: StyleColor) -> String {
    match color {
        StyleColor::Rgb(rgb) => format!(r#"<{} rgb="FF{:06X}"/>"#, tag, rgb & 0xFF_FFFF),
        StyleColor::Automatic => format!(r#"<{} auto="1"/>"#, tag),
    }
}

fn font_xml(font: &Font) -> String {
    let mut xml = String::from("<font>");
    if font.bold {
        xml.push_str("<b/>");
    }
    if font.italic {
        xml.push_str("<i/>");
    }
    if font.strikethrough {
        xml.push_str("<strike/>");
    }
    if let Some(underline) = font.underline {
        let _ = write!(xml, r#"<u val="{}"/>"#, underline.as_ooxml());
    }
    if let Some(script) = font.script {
        let value = match script {
            Script::Superscript => "superscript",
            Script::Subscript => "subscript",
        };
        let _ = write!(xml, r#"<vertAlign val="{}"/>"#, value);
    }
    if let Some(size) = font.size {
        let _ = write!(xml, r#"<sz val="{}"/>"#, size);
    }
    if let Some(color) = font.color {
        xml.push_str(&color_xml("color", color));
    }
    if let Some(name) = &font.name {
        let _ = write!(xml, r#"<name val="{}"/>"#, escape(name));
    }
    if let Some(family) = font.family {
        let _ = write!(xml, r#"<family val="{}"/>"#, family);
    }
    if let Some(charset) = font.charset {
        let _ = write!(xml, r#"<charset val="{}"/>"#, charset);
    }
    xml.push_str("</font>");
    xml
}

fn fill_xml(fill: &Fill) -> String {
    let pattern = fill.pattern.as_ooxml();
    if fill.pattern == FillPattern::None || (fill.foreground.is_none() && fill.background.is_none())
    {
        return format!(r#"<fill><patternFill patternType="{}"/></fill>"#, pattern);
    }
    let mut xml = format!(r#"<fill><patternFill patternType="{}">"#, pattern);
    if let Some(fg) = fill.foreground {
        xml.push_str(&color_xml("fgColor", fg));
    }
    if let Some(bg) = fill.background {
        xml.push_str(&color_xml("bgColor", bg));
    }
    xml.push_str("</patternFill></fill>");
    xml
}

fn border_xml(border: &Border) -> String {
    let mut xml = String::from("<border");
    if border.diagonal_up {
        xml.push_str(r#" diagonalUp="1""#);
    }
    if border.diagonal_down {
        xml.push_str(r#" diagonalDown="1""#);
    }
    xml.push('>');
    for (tag, edge) in [
        ("left", border.left),
        ("right", border.right),
        ("top", border.top),
        ("bottom", border.bottom),
        ("diagonal", border.diagonal),
    ] {
        xml.push_str(&edge_xml(tag, edge));
    }
    xml.push_str("</border>");
    xml
}

fn edge_xml(tag: &str, edge: Option<BorderEdge>) -> String {
    match edge {
        None => format!("<{}/>", tag),
        Some(BorderEdge { line, color: None }) => {
            format!(r#"<{} style="{}"/>"#, tag, line.as_ooxml())
        }
        Some(BorderEdge {
            line,
            color: Some(color),
        }) => format!(
            r#"<{tag} style="{}">{}</{tag}>"#,
            line.as_ooxml(),
            color_xml("color", color)
        ),
    }
}

fn alignment_xml(alignment: &Alignment) -> String {
    let mut xml = String::from("<alignment");
    if let Some(horizontal) = alignment.horizontal {
        let _ = write!(xml, r#" horizontal="{}""#, horizontal.as_ooxml());
    }
    if let Some(vertical) = alignment.vertical {
        let _ = write!(xml, r#" vertical="{}""#, vertical.as_ooxml());
    }
    if alignment.rotation != 0 {
        let _ = write!(xml, r#" textRotation="{}""#, alignment.rotation);
    }
    if alignment.wrap_text {
        xml.push_str(r#" wrapText="1""#);
    }
    if alignment.indent != 0 {
        let _ = write!(xml, r#" indent="{}""#, alignment.indent);
    }
    if alignment.shrink_to_fit {
        xml.push_str(r#" shrinkToFit="1""#);
    }
    xml.push_str("/>");
    xml
}

fn protection_xml(protection: Protection) -> String {
    format!(
        r#"<protection locked="{}" hidden="{}"/>"#,
        u8::from(protection.locked),
        u8::from(protection.hidden)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excel::{StyleSheet, ThemePalette};
    use crate::workbook::{BorderLine, HorizontalAlign};
    use pretty_assertions::assert_eq;

    const WRITTEN: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="2"><font><sz val="11"/><color theme="1"/><name val="Calibri"/><family val="2"/><scheme val="minor"/></font><font><b/><sz val="12"/><color rgb="FFFF0000"/><name val="宋体"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="0" fontId="1" fillId="0" borderId="0" xfId="0" applyFont="1"/></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles><dxfs count="0"/><tableStyles count="0" defaultTableStyle="TableStyleMedium9" defaultPivotStyle="PivotStyleLight16"/></styleSheet>"#;

    fn title() -> NamedStyle {
        NamedStyle::new(
            "订单标题",
            CellStyle {
                font: Some(Font {
                    name: Some("宋体".into()),
                    size: Some(12.0),
                    bold: true,
                    color: Some(StyleColor::Rgb(0xFF0000)),
                    ..Default::default()
                }),
                fill: Some(Fill {
                    pattern: FillPattern::Solid,
                    foreground: Some(StyleColor::Rgb(0xFFFF00)),
                    background: None,
                }),
                border: Some(Border {
                    bottom: Some(BorderEdge {
                        line: BorderLine::Thin,
                        color: None,
                    }),
                    ..Default::default()
                }),
                number_format: Some(NumberFormat::Custom("0.00\"件\"".into())),
                alignment: Some(Alignment {
                    horizontal: Some(HorizontalAlign::Center),
                    ..Default::default()
                }),
                protection: None,
            },
        )
    }

    fn registered(parents: &HashMap<usize, usize>) -> StyleSheet {
        let root = XmlElement::parse(STYLES_PART, WRITTEN).unwrap();
        let mut registry = StyleRegistry::new(&root);
        registry.add(&NamedStyle::normal());
        registry.add(&title());
        let xml = registry.apply(WRITTEN, parents).unwrap();
        StyleSheet::parse(&xml, &ThemePalette::default()).unwrap()
    }

    #[test]
    fn test_named_style_is_declared() {
        let styles = registered(&HashMap::new());
        let names: Vec<_> = styles.named_styles().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Normal", "订单标题"]);

        let expected = title().style;
        let declared = &styles.named_styles()[1].style;
        assert_eq!(declared.font, expected.font);
        assert_eq!(declared.fill, expected.fill);
        assert_eq!(declared.border, expected.border);
        assert_eq!(declared.number_format, expected.number_format);
        assert_eq!(declared.alignment, expected.alignment);
    }

    #[test]
    fn test_cell_format_points_at_named_style() {
        let styles = registered(&HashMap::from([(1, 1)]));
        assert_eq!(styles.named_style_of(1), Some("订单标题"));
        assert_eq!(styles.named_style_of(0), Some("Normal"));
        // direct formatting of the cell format is untouched
        assert!(styles.cell_style(1).unwrap().font.as_ref().unwrap().bold);
    }

    #[test]
    fn test_existing_name_is_not_redeclared() {
        let root = XmlElement::parse(STYLES_PART, WRITTEN).unwrap();
        let mut registry = StyleRegistry::new(&root);
        registry.add(&NamedStyle::normal());
        assert!(registry.is_empty());
        assert_eq!(registry.xf_ids.get("Normal"), Some(&0));
    }

    #[test]
    fn test_missing_sections_are_created() {
        let bare = r#"<styleSheet><fonts count="1"><font/></fonts><cellXfs count="1"><xf/></cellXfs></styleSheet>"#;
        let root = XmlElement::parse(STYLES_PART, bare).unwrap();
        let mut registry = StyleRegistry::new(&root);
        registry.add(&title());
        let xml = registry.apply(bare, &HashMap::new()).unwrap();

        let parsed = XmlElement::parse(STYLES_PART, &xml).unwrap();
        let sections: Vec<_> = parsed.elements().map(|e| e.name.as_str()).collect();
        assert_eq!(
            sections,
            vec!["numFmts", "fonts", "fills", "borders", "cellStyleXfs", "cellXfs", "cellStyles"]
        );
        assert_eq!(parsed.child("numFmts").unwrap().attr("count"), Some("1"));
        let styles = StyleSheet::parse(&xml, &ThemePalette::default()).unwrap();
        assert_eq!(styles.named_styles()[0].name, "订单标题");
    }

    #[test]
    fn test_fragments() {
        assert_eq!(color_xml("fgColor", StyleColor::Rgb(0x00FF00)), r#"<fgColor rgb="FF00FF00"/>"#);
        assert_eq!(
            protection_xml(Protection {
                locked: false,
                hidden: true
            }),
            r#"<protection locked="0" hidden="1"/>"#
        );
        assert_eq!(
            fill_xml(&Fill::default()),
            r#"<fill><patternFill patternType="none"/></fill>"#
        );
    }
}
