//! styles.xml and theme parsing
//!
//! Resolves every `cellXfs` entry into a [`CellStyle`], collects the named
//! styles declared in `cellStyles` and the differential formats (`dxfs`) used by
//! conditional formatting. Theme and indexed colors are resolved to RGB here.

use super::xml::XmlElement;
use crate::error::ConvertResult;
use crate::workbook::{
    Alignment, Border, BorderEdge, BorderLine, CellStyle, Fill, FillPattern, Font,
    HorizontalAlign, NamedStyle, NumberFormat, Protection, Script, StyleColor, Underline,
    VerticalAlign,
};
use std::collections::HashMap;
use tracing::debug;

/// First number format id available to custom formats.
const FIRST_CUSTOM_NUM_FMT: u16 = 164;

//==============================================================================
// Colors
//==============================================================================

/// Excel's legacy 64-entry indexed palette.
const INDEXED_COLORS: [u32; 64] = [
    0x000000, 0xFFFFFF, 0xFF0000, 0x00FF00, 0x0000FF, 0xFFFF00, 0xFF00FF, 0x00FFFF, //
    0x000000, 0xFFFFFF, 0xFF0000, 0x00FF00, 0x0000FF, 0xFFFF00, 0xFF00FF, 0x00FFFF, //
    0x800000, 0x008000, 0x000080, 0x808000, 0x800080, 0x008080, 0xC0C0C0, 0x808080, //
    0x9999FF, 0x993366, 0xFFFFCC, 0xCCFFFF, 0x660066, 0xFF8080, 0x0066CC, 0xCCCCFF, //
    0x000080, 0xFF00FF, 0xFFFF00, 0x00FFFF, 0x800080, 0x800000, 0x008080, 0x0000FF, //
    0x00CCFF, 0xCCFFFF, 0xCCFFCC, 0xFFFF99, 0x99CCFF, 0xFF99CC, 0xCC99FF, 0xFFCC99, //
    0x3366FF, 0x33CCCC, 0x99CC00, 0xFFCC00, 0xFF9900, 0xFF6600, 0x666699, 0x969696, //
    0x003366, 0x339966, 0x003300, 0x333300, 0x993300, 0x993333, 0x333399, 0x333333, //
];

/// Theme colors in `theme="N"` index order: lt1, dk1, lt2, dk2, accent1-6,
/// hlink, folHlink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemePalette {
    colors: [u32; 12],
}

impl Default for ThemePalette {
    /// The stock Office theme.
    fn default() -> Self {
        Self {
            colors: [
                0xFFFFFF, 0x000000, 0xEEECE1, 0x1F497D, 0x4F81BD, 0xC0504D, 0x9BBB59, 0x8064A2,
                0x4BACC6, 0xF79646, 0x0000FF, 0x800080,
            ],
        }
    }
}

impl ThemePalette {
    /// Read the color scheme of `xl/theme/theme1.xml`, keeping defaults for
    /// any slot that is missing.
    pub fn parse(xml: &str) -> ConvertResult<Self> {
        let root = XmlElement::parse("xl/theme/theme1.xml", xml)?;
        let mut palette = Self::default();
        let Some(scheme) = root
            .child("themeElements")
            .and_then(|e| e.child("clrScheme"))
        else {
            return Ok(palette);
        };

        let slots = [
            "lt1", "dk1", "lt2", "dk2", "accent1", "accent2", "accent3", "accent4", "accent5",
            "accent6", "hlink", "folHlink",
        ];
        for (index, slot) in slots.iter().enumerate() {
            let color = scheme.child(slot).and_then(|e| e.elements().next());
            let value = color.and_then(|c| match c.name.as_str() {
                "srgbClr" => c.attr("val"),
                "sysClr" => c.attr("lastClr"),
                _ => None,
            });
            if let Some(rgb) = value.and_then(|v| u32::from_str_radix(v, 16).ok()) {
                palette.colors[index] = rgb;
            }
        }
        Ok(palette)
    }

    pub fn color(&self, index: usize) -> Option<u32> {
        self.colors.get(index).copied()
    }
}

/// Resolve a `<color>`-like element (`rgb`, `indexed`, `theme` + `tint`, `auto`).
pub fn parse_color(element: &XmlElement, theme: &ThemePalette) -> Option<StyleColor> {
    if element.attr_bool("auto") == Some(true) {
        return Some(StyleColor::Automatic);
    }
    if let Some(rgb) = element.attr("rgb") {
        let hex = rgb.trim_start_matches('#');
        let hex = if hex.len() == 8 { hex.get(2..)? } else { hex };
        let rgb = u32::from_str_radix(hex, 16).ok();
        if rgb.is_none() {
            debug!(rgb = hex, "skipping malformed rgb color");
        }
        return rgb.map(StyleColor::Rgb);
    }
    if let Some(index) = element.attr_parse::<usize>("indexed") {
        return match index {
            0..=63 => Some(StyleColor::Rgb(INDEXED_COLORS[index])),
            // 64/65 are the system foreground/background
            _ => Some(StyleColor::Automatic),
        };
    }
    let index = element.attr_parse::<usize>("theme")?;
    let base = theme.color(index)?;
    let tint = element.attr_parse::<f64>("tint").unwrap_or(0.0);
    Some(StyleColor::Rgb(apply_tint(base, tint)))
}

/// Lighten or darken a color the way Excel applies theme tints (in HLS space).
pub fn apply_tint(rgb: u32, tint: f64) -> u32 {
    if tint == 0.0 {
        return rgb;
    }
    let (h, l, s) = rgb_to_hls(rgb);
    let l = if tint < 0.0 {
        l * (1.0 + tint)
    } else {
        l * (1.0 - tint) + tint
    };
    hls_to_rgb(h, l.clamp(0.0, 1.0), s)
}

fn rgb_to_hls(rgb: u32) -> (f64, f64, f64) {
    let r = f64::from((rgb >> 16) & 0xFF) / 255.0;
    let g = f64::from((rgb >> 8) & 0xFF) / 255.0;
    let b = f64::from(rgb & 0xFF) / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;
    if (max - min).abs() < f64::EPSILON {
        return (0.0, l, 0.0);
    }
    let d = max - min;
    let s = if l > 0.5 { d / (2.0 - max - min) } else { d / (max + min) };
    let h = if max == r {
        ((g - b) / d).rem_euclid(6.0)
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };
    (h / 6.0, l, s)
}

fn hls_to_rgb(h: f64, l: f64, s: f64) -> u32 {
    let channel = |v: f64| (v * 255.0).round().clamp(0.0, 255.0) as u32;
    if s == 0.0 {
        let v = channel(l);
        return (v << 16) | (v << 8) | v;
    }
    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let hue = |mut t: f64| {
        t = t.rem_euclid(1.0);
        if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 0.5 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * (2.0 / 3.0 - t) * 6.0
        } else {
            p
        }
    };
    let r = channel(hue(h + 1.0 / 3.0));
    let g = channel(hue(h));
    let b = channel(hue(h - 1.0 / 3.0));
    (r << 16) | (g << 8) | b
}

//==============================================================================
// Style sheet
//==============================================================================

/// Everything the copier needs from `xl/styles.xml`.
#[derive(Debug, Clone, Default)]
pub struct StyleSheet {
    cell_formats: Vec<CellStyle>,
    /// `xfId` of each cell format, i.e. the named style it derives from
    cell_format_parents: Vec<Option<usize>>,
    named_styles: Vec<NamedStyle>,
    style_names: HashMap<usize, String>,
    differential: Vec<CellStyle>,
}

impl StyleSheet {
    pub fn parse(xml: &str, theme: &ThemePalette) -> ConvertResult<Self> {
        let root = XmlElement::parse("xl/styles.xml", xml)?;

        let num_fmts: HashMap<u16, String> = root
            .child("numFmts")
            .into_iter()
            .flat_map(|e| e.children_named("numFmt"))
            .filter_map(|e| Some((e.attr_parse("numFmtId")?, e.attr("formatCode")?.to_string())))
            .collect();
        let fonts: Vec<Font> = section(&root, "fonts", "font")
            .map(|e| parse_font(e, theme))
            .collect();
        let fills: Vec<Fill> = section(&root, "fills", "fill")
            .map(|e| parse_fill(e, theme, false))
            .collect();
        let borders: Vec<Border> = section(&root, "borders", "border")
            .map(|e| parse_border(e, theme))
            .collect();

        let parts = Parts {
            num_fmts: &num_fmts,
            fonts: &fonts,
            fills: &fills,
            borders: &borders,
        };

        let style_formats: Vec<CellStyle> = section(&root, "cellStyleXfs", "xf")
            .map(|xf| parts.resolve(xf))
            .collect();

        let mut cell_formats = Vec::new();
        let mut cell_format_parents = Vec::new();
        for xf in section(&root, "cellXfs", "xf") {
            cell_formats.push(parts.resolve(xf));
            cell_format_parents.push(xf.attr_parse::<usize>("xfId"));
        }

        let mut named_styles = Vec::new();
        let mut style_names = HashMap::new();
        for entry in section(&root, "cellStyles", "cellStyle") {
            let Some(name) = entry.attr("name") else {
                continue;
            };
            let xf_id = entry.attr_parse::<usize>("xfId").unwrap_or(0);
            named_styles.push(NamedStyle {
                name: name.to_string(),
                builtin_id: entry.attr_parse("builtinId"),
                style: style_formats.get(xf_id).cloned().unwrap_or_default(),
            });
            style_names.entry(xf_id).or_insert_with(|| name.to_string());
        }

        let differential = section(&root, "dxfs", "dxf")
            .map(|dxf| parse_differential(dxf, theme, &num_fmts))
            .collect::<Vec<_>>();

        debug!(
            cell_formats = cell_formats.len(),
            named_styles = named_styles.len(),
            differential = differential.len(),
            "parsed style sheet"
        );

        Ok(Self {
            cell_formats,
            cell_format_parents,
            named_styles,
            style_names,
            differential,
        })
    }

    /// Direct formatting of cell format `xf` (the `s` attribute of a cell).
    pub fn cell_style(&self, xf: usize) -> Option<&CellStyle> {
        self.cell_formats.get(xf)
    }

    /// Name of the named style cell format `xf` derives from.
    pub fn named_style_of(&self, xf: usize) -> Option<&str> {
        let parent = self.cell_format_parents.get(xf).copied().flatten()?;
        self.style_names.get(&parent).map(String::as_str)
    }

    pub fn named_styles(&self) -> &[NamedStyle] {
        &self.named_styles
    }

    pub fn differential(&self, dxf: usize) -> Option<&CellStyle> {
        self.differential.get(dxf)
    }
}

fn section<'a>(
    root: &'a XmlElement,
    list: &'a str,
    item: &'a str,
) -> impl Iterator<Item = &'a XmlElement> {
    root.child(list)
        .into_iter()
        .flat_map(move |e| e.children_named(item))
}

struct Parts<'a> {
    num_fmts: &'a HashMap<u16, String>,
    fonts: &'a [Font],
    fills: &'a [Fill],
    borders: &'a [Border],
}

impl Parts<'_> {
    fn resolve(&self, xf: &XmlElement) -> CellStyle {
        let pick = |attr: &str| xf.attr_parse::<usize>(attr);
        CellStyle {
            font: pick("fontId").and_then(|i| self.fonts.get(i).cloned()),
            fill: pick("fillId").and_then(|i| self.fills.get(i).cloned()),
            border: pick("borderId").and_then(|i| self.borders.get(i).cloned()),
            number_format: xf
                .attr_parse::<u16>("numFmtId")
                .map(|id| number_format(id, self.num_fmts)),
            alignment: xf.child("alignment").map(parse_alignment),
            protection: xf.child("protection").map(parse_protection),
        }
    }
}

fn number_format(id: u16, custom: &HashMap<u16, String>) -> NumberFormat {
    match custom.get(&id) {
        Some(code) => NumberFormat::Custom(code.clone()),
        None if id < FIRST_CUSTOM_NUM_FMT => NumberFormat::Builtin(id),
        None => NumberFormat::Builtin(0),
    }
}

fn val(element: &XmlElement, child: &str) -> Option<String> {
    element
        .child(child)
        .and_then(|e| e.attr("val"))
        .map(str::to_string)
}

/// `<b/>` means on; `<b val="0"/>` means off.
fn flag(element: &XmlElement, child: &str) -> bool {
    element
        .child(child)
        .is_some_and(|e| e.attr_bool("val").unwrap_or(true))
}

fn parse_font(element: &XmlElement, theme: &ThemePalette) -> Font {
    Font {
        name: val(element, "name"),
        size: val(element, "sz").and_then(|v| v.parse().ok()),
        bold: flag(element, "b"),
        italic: flag(element, "i"),
        underline: element
            .child("u")
            .and_then(|u| Underline::from_ooxml(u.attr("val").unwrap_or(""))),
        strikethrough: flag(element, "strike"),
        color: element.child("color").and_then(|c| parse_color(c, theme)),
        script: match val(element, "vertAlign").as_deref() {
            Some("superscript") => Some(Script::Superscript),
            Some("subscript") => Some(Script::Subscript),
            _ => None,
        },
        family: val(element, "family").and_then(|v| v.parse().ok()),
        charset: val(element, "charset").and_then(|v| v.parse().ok()),
    }
}

/// Differential fills put a solid fill's color in `bgColor` and may omit the
/// pattern type; both are normalized to the cell-format convention.
fn parse_fill(element: &XmlElement, theme: &ThemePalette, differential: bool) -> Fill {
    let Some(pattern) = element.child("patternFill") else {
        if element.child("gradientFill").is_some() {
            debug!("gradient fill approximated as no fill");
        }
        return Fill::default();
    };
    let fg = pattern.child("fgColor").and_then(|c| parse_color(c, theme));
    let bg = pattern.child("bgColor").and_then(|c| parse_color(c, theme));
    let kind = match pattern.attr("patternType") {
        Some(p) => FillPattern::from_ooxml(p).unwrap_or(FillPattern::None),
        None if differential => FillPattern::Solid,
        None => FillPattern::None,
    };
    if differential && kind == FillPattern::Solid {
        return Fill {
            pattern: kind,
            foreground: bg.or(fg),
            background: None,
        };
    }
    Fill {
        pattern: kind,
        foreground: fg,
        background: bg,
    }
}

fn parse_border(element: &XmlElement, theme: &ThemePalette) -> Border {
    let edge = |names: &[&str]| {
        names.iter().find_map(|name| {
            let e = element.child(name)?;
            let line = BorderLine::from_ooxml(e.attr("style")?)?;
            Some(BorderEdge {
                line,
                color: e.child("color").and_then(|c| parse_color(c, theme)),
            })
        })
    };
    Border {
        left: edge(&["left", "start"]),
        right: edge(&["right", "end"]),
        top: edge(&["top"]),
        bottom: edge(&["bottom"]),
        diagonal: edge(&["diagonal"]),
        diagonal_up: element.attr_bool("diagonalUp").unwrap_or(false),
        diagonal_down: element.attr_bool("diagonalDown").unwrap_or(false),
    }
}

fn parse_alignment(element: &XmlElement) -> Alignment {
    Alignment {
        horizontal: element.attr("horizontal").and_then(HorizontalAlign::from_ooxml),
        vertical: element.attr("vertical").and_then(VerticalAlign::from_ooxml),
        wrap_text: element.attr_bool("wrapText").unwrap_or(false),
        shrink_to_fit: element.attr_bool("shrinkToFit").unwrap_or(false),
        indent: element.attr_parse("indent").unwrap_or(0),
        rotation: element.attr_parse("textRotation").unwrap_or(0),
    }
}

fn parse_protection(element: &XmlElement) -> Protection {
    Protection {
        locked: element.attr_bool("locked").unwrap_or(true),
        hidden: element.attr_bool("hidden").unwrap_or(false),
    }
}

fn parse_differential(
    dxf: &XmlElement,
    theme: &ThemePalette,
    num_fmts: &HashMap<u16, String>,
) -> CellStyle {
    CellStyle {
        font: dxf.child("font").map(|e| parse_font(e, theme)),
        fill: dxf.child("fill").map(|e| parse_fill(e, theme, true)),
        border: dxf.child("border").map(|e| parse_border(e, theme)),
        number_format: dxf.child("numFmt").and_then(|e| {
            let id = e.attr_parse::<u16>("numFmtId")?;
            Some(match e.attr("formatCode") {
                Some(code) => NumberFormat::Custom(code.to_string()),
                None => number_format(id, num_fmts),
            })
        }),
        alignment: dxf.child("alignment").map(parse_alignment),
        protection: dxf.child("protection").map(parse_protection),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <numFmts count="1"><numFmt numFmtId="164" formatCode="yyyy&quot;年&quot;m&quot;月&quot;d&quot;日&quot;"/></numFmts>
  <fonts count="2">
    <font><sz val="11"/><color theme="1"/><name val="Calibri"/><family val="2"/></font>
    <font><b/><i val="0"/><u/><sz val="14"/><color rgb="FFFF0000"/><name val="宋体"/><charset val="134"/></font>
  </fonts>
  <fills count="3">
    <fill><patternFill patternType="none"/></fill>
    <fill><patternFill patternType="gray125"/></fill>
    <fill><patternFill patternType="solid"><fgColor theme="4" tint="0.79998168889431442"/><bgColor indexed="64"/></patternFill></fill>
  </fills>
  <borders count="2">
    <border><left/><right/><top/><bottom/><diagonal/></border>
    <border diagonalUp="1"><left style="thin"><color indexed="64"/></left><right style="medium"><color rgb="FF0000FF"/></right><top/><bottom style="double"/><diagonal style="hair"/></border>
  </borders>
  <cellStyleXfs count="2">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0"/>
    <xf numFmtId="0" fontId="1" fillId="2" borderId="1"/>
  </cellStyleXfs>
  <cellXfs count="3">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>
    <xf numFmtId="164" fontId="1" fillId="2" borderId="1" xfId="1" applyAlignment="1"><alignment horizontal="center" vertical="center" wrapText="1" textRotation="45"/><protection locked="0"/></xf>
    <xf numFmtId="14" fontId="0" fillId="0" borderId="0" xfId="0"/>
  </cellXfs>
  <cellStyles count="2">
    <cellStyle name="Normal" xfId="0" builtinId="0"/>
    <cellStyle name="表头" xfId="1"/>
  </cellStyles>
  <dxfs count="1"><dxf><font><color rgb="FF9C0006"/></font><fill><patternFill><bgColor rgb="FFFFC7CE"/></patternFill></fill></dxf></dxfs>
</styleSheet>"#;

    fn sheet() -> StyleSheet {
        StyleSheet::parse(STYLES, &ThemePalette::default()).unwrap()
    }

    #[test]
    fn test_cell_format_resolution() {
        let styles = sheet();
        let style = styles.cell_style(1).unwrap();

        let font = style.font.as_ref().unwrap();
        assert!(font.bold);
        assert!(!font.italic);
        assert_eq!(font.underline, Some(Underline::Single));
        assert_eq!(font.size, Some(14.0));
        assert_eq!(font.name.as_deref(), Some("宋体"));
        assert_eq!(font.color, Some(StyleColor::Rgb(0xFF0000)));
        assert_eq!(font.charset, Some(134));

        assert_eq!(
            style.number_format,
            Some(NumberFormat::Custom("yyyy\"年\"m\"月\"d\"日\"".into()))
        );
        let alignment = style.alignment.as_ref().unwrap();
        assert_eq!(alignment.horizontal, Some(HorizontalAlign::Center));
        assert_eq!(alignment.vertical, Some(VerticalAlign::Center));
        assert!(alignment.wrap_text);
        assert_eq!(alignment.rotation, 45);
        assert_eq!(style.protection, Some(Protection { locked: false, hidden: false }));

        assert_eq!(
            styles.cell_style(2).unwrap().number_format,
            Some(NumberFormat::Builtin(14))
        );
    }

    #[test]
    fn test_border_and_fill() {
        let styles = sheet();
        let style = styles.cell_style(1).unwrap();
        let border = style.border.as_ref().unwrap();
        assert_eq!(border.left.unwrap().line, BorderLine::Thin);
        assert_eq!(border.left.unwrap().color, Some(StyleColor::Automatic));
        assert_eq!(border.right.unwrap().color, Some(StyleColor::Rgb(0x0000FF)));
        assert_eq!(border.bottom.unwrap().line, BorderLine::Double);
        assert!(border.top.is_none());
        assert!(border.diagonal_up);

        let fill = style.fill.as_ref().unwrap();
        assert_eq!(fill.pattern, FillPattern::Solid);
        // accent1 lightened by 80%
        assert_eq!(fill.foreground, Some(StyleColor::Rgb(0xDCE6F2)));
        assert!(styles.cell_style(0).unwrap().border.as_ref().unwrap().is_empty());
    }

    #[test]
    fn test_named_styles() {
        let styles = sheet();
        let names: Vec<_> = styles.named_styles().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Normal", "表头"]);
        assert_eq!(styles.named_styles()[0].builtin_id, Some(0));
        assert!(styles.named_styles()[1].style.font.as_ref().unwrap().bold);
        assert_eq!(styles.named_style_of(1), Some("表头"));
        assert_eq!(styles.named_style_of(2), Some("Normal"));
    }

    #[test]
    fn test_differential_solid_fill_uses_bg_color() {
        let dxf = sheet().differential(0).cloned().unwrap();
        let fill = dxf.fill.unwrap();
        assert_eq!(fill.pattern, FillPattern::Solid);
        assert_eq!(fill.foreground, Some(StyleColor::Rgb(0xFFC7CE)));
        assert_eq!(dxf.font.unwrap().color, Some(StyleColor::Rgb(0x9C0006)));
    }

    #[test]
    fn test_non_ascii_rgb_is_skipped() {
        // 8 bytes, but the cut at byte 2 falls inside '中'
        let xml = r#"<styleSheet><fonts count="1"><font><b/><color rgb="中abcde"/></font></fonts>
            <cellXfs count="1"><xf fontId="0"/></cellXfs></styleSheet>"#;
        let styles = StyleSheet::parse(xml, &ThemePalette::default()).unwrap();
        let font = styles.cell_style(0).unwrap().font.as_ref().unwrap();
        assert!(font.bold);
        assert_eq!(font.color, None);
    }

    #[test]
    fn test_tint() {
        assert_eq!(apply_tint(0x4F81BD, 0.0), 0x4F81BD);
        assert_eq!(apply_tint(0x000000, 0.5), 0x808080);
        assert_eq!(apply_tint(0xFFFFFF, -0.5), 0x808080);
    }

    #[test]
    fn test_theme_palette() {
        let xml = r#"<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"><a:themeElements><a:clrScheme name="x">
            <a:dk1><a:sysClr val="windowText" lastClr="111111"/></a:dk1>
            <a:lt1><a:sysClr val="window" lastClr="FEFEFE"/></a:lt1>
            <a:accent1><a:srgbClr val="123456"/></a:accent1>
        </a:clrScheme></a:themeElements></a:theme>"#;
        let palette = ThemePalette::parse(xml).unwrap();
        assert_eq!(palette.color(0), Some(0xFEFEFE));
        assert_eq!(palette.color(1), Some(0x111111));
        assert_eq!(palette.color(4), Some(0x123456));
        assert_eq!(palette.color(5), Some(0xC0504D));
    }
}
