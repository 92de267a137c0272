//! In-memory workbook model
//!
//! Output workbooks are collected into a [`WorkbookPlan`] value (sheets, cells,
//! layout, named styles) and only turned into xlsx bytes by the exporter. Sheets
//! copied from the reference workbook use the same [`FormattedSheet`] type, so a
//! copy is a plain clone of owned data.

use crate::error::{ConvertError, ConvertResult};
use crate::types::CellValue;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::LazyLock;

/// Maximum worksheet name length accepted by Excel.
const MAX_SHEET_NAME_LEN: usize = 31;

//==============================================================================
// Styles
//==============================================================================

/// Resolved color. Theme and indexed colors are turned into RGB when read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleColor {
    Rgb(u32),
    Automatic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Underline {
    Single,
    Double,
    SingleAccounting,
    DoubleAccounting,
}

impl Underline {
    pub fn from_ooxml(value: &str) -> Option<Self> {
        match value {
            "" | "single" => Some(Underline::Single),
            "double" => Some(Underline::Double),
            "singleAccounting" => Some(Underline::SingleAccounting),
            "doubleAccounting" => Some(Underline::DoubleAccounting),
            _ => None,
        }
    }

    pub fn as_ooxml(self) -> &'static str {
        match self {
            Underline::Single => "single",
            Underline::Double => "double",
            Underline::SingleAccounting => "singleAccounting",
            Underline::DoubleAccounting => "doubleAccounting",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Superscript,
    Subscript,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Font {
    pub name: Option<String>,
    pub size: Option<f64>,
    pub bold: bool,
    pub italic: bool,
    pub underline: Option<Underline>,
    pub strikethrough: bool,
    pub color: Option<StyleColor>,
    pub script: Option<Script>,
    pub family: Option<u8>,
    pub charset: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillPattern {
    #[default]
    None,
    Solid,
    MediumGray,
    DarkGray,
    LightGray,
    DarkHorizontal,
    DarkVertical,
    DarkDown,
    DarkUp,
    DarkGrid,
    DarkTrellis,
    LightHorizontal,
    LightVertical,
    LightDown,
    LightUp,
    LightGrid,
    LightTrellis,
    Gray125,
    Gray0625,
}

impl FillPattern {
    pub fn from_ooxml(value: &str) -> Option<Self> {
        let pattern = match value {
            "none" => FillPattern::None,
            "solid" => FillPattern::Solid,
            "mediumGray" => FillPattern::MediumGray,
            "darkGray" => FillPattern::DarkGray,
            "lightGray" => FillPattern::LightGray,
            "darkHorizontal" => FillPattern::DarkHorizontal,
            "darkVertical" => FillPattern::DarkVertical,
            "darkDown" => FillPattern::DarkDown,
            "darkUp" => FillPattern::DarkUp,
            "darkGrid" => FillPattern::DarkGrid,
            "darkTrellis" => FillPattern::DarkTrellis,
            "lightHorizontal" => FillPattern::LightHorizontal,
            "lightVertical" => FillPattern::LightVertical,
            "lightDown" => FillPattern::LightDown,
            "lightUp" => FillPattern::LightUp,
            "lightGrid" => FillPattern::LightGrid,
            "lightTrellis" => FillPattern::LightTrellis,
            "gray125" => FillPattern::Gray125,
            "gray0625" => FillPattern::Gray0625,
            _ => return None,
        };
        Some(pattern)
    }

    pub fn as_ooxml(self) -> &'static str {
        match self {
            FillPattern::None => "none",
            FillPattern::Solid => "solid",
            FillPattern::MediumGray => "mediumGray",
            FillPattern::DarkGray => "darkGray",
            FillPattern::LightGray => "lightGray",
            FillPattern::DarkHorizontal => "darkHorizontal",
            FillPattern::DarkVertical => "darkVertical",
            FillPattern::DarkDown => "darkDown",
            FillPattern::DarkUp => "darkUp",
            FillPattern::DarkGrid => "darkGrid",
            FillPattern::DarkTrellis => "darkTrellis",
            FillPattern::LightHorizontal => "lightHorizontal",
            FillPattern::LightVertical => "lightVertical",
            FillPattern::LightDown => "lightDown",
            FillPattern::LightUp => "lightUp",
            FillPattern::LightGrid => "lightGrid",
            FillPattern::LightTrellis => "lightTrellis",
            FillPattern::Gray125 => "gray125",
            FillPattern::Gray0625 => "gray0625",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fill {
    pub pattern: FillPattern,
    pub foreground: Option<StyleColor>,
    pub background: Option<StyleColor>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderLine {
    Thin,
    Medium,
    Dashed,
    Dotted,
    Thick,
    Double,
    Hair,
    MediumDashed,
    DashDot,
    MediumDashDot,
    DashDotDot,
    MediumDashDotDot,
    SlantDashDot,
}

impl BorderLine {
    pub fn from_ooxml(value: &str) -> Option<Self> {
        let line = match value {
            "thin" => BorderLine::Thin,
            "medium" => BorderLine::Medium,
            "dashed" => BorderLine::Dashed,
            "dotted" => BorderLine::Dotted,
            "thick" => BorderLine::Thick,
            "double" => BorderLine::Double,
            "hair" => BorderLine::Hair,
            "mediumDashed" => BorderLine::MediumDashed,
            "dashDot" => BorderLine::DashDot,
            "mediumDashDot" => BorderLine::MediumDashDot,
            "dashDotDot" => BorderLine::DashDotDot,
            "mediumDashDotDot" => BorderLine::MediumDashDotDot,
            "slantDashDot" => BorderLine::SlantDashDot,
            _ => return None,
        };
        Some(line)
    }

    pub fn as_ooxml(self) -> &'static str {
        match self {
            BorderLine::Thin => "thin",
            BorderLine::Medium => "medium",
            BorderLine::Dashed => "dashed",
            BorderLine::Dotted => "dotted",
            BorderLine::Thick => "thick",
            BorderLine::Double => "double",
            BorderLine::Hair => "hair",
            BorderLine::MediumDashed => "mediumDashed",
            BorderLine::DashDot => "dashDot",
            BorderLine::MediumDashDot => "mediumDashDot",
            BorderLine::DashDotDot => "dashDotDot",
            BorderLine::MediumDashDotDot => "mediumDashDotDot",
            BorderLine::SlantDashDot => "slantDashDot",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorderEdge {
    pub line: BorderLine,
    pub color: Option<StyleColor>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Border {
    pub left: Option<BorderEdge>,
    pub right: Option<BorderEdge>,
    pub top: Option<BorderEdge>,
    pub bottom: Option<BorderEdge>,
    pub diagonal: Option<BorderEdge>,
    pub diagonal_up: bool,
    pub diagonal_down: bool,
}

impl Border {
    pub fn is_empty(&self) -> bool {
        self.left.is_none()
            && self.right.is_none()
            && self.top.is_none()
            && self.bottom.is_none()
            && self.diagonal.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NumberFormat {
    /// One of Excel's built-in format ids (0-163)
    Builtin(u16),
    Custom(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Protection {
    pub locked: bool,
    pub hidden: bool,
}

impl Default for Protection {
    fn default() -> Self {
        Self {
            locked: true,
            hidden: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalAlign {
    General,
    Left,
    Center,
    Right,
    Fill,
    Justify,
    CenterContinuous,
    Distributed,
}

impl HorizontalAlign {
    pub fn from_ooxml(value: &str) -> Option<Self> {
        let align = match value {
            "general" => HorizontalAlign::General,
            "left" => HorizontalAlign::Left,
            "center" => HorizontalAlign::Center,
            "right" => HorizontalAlign::Right,
            "fill" => HorizontalAlign::Fill,
            "justify" => HorizontalAlign::Justify,
            "centerContinuous" => HorizontalAlign::CenterContinuous,
            "distributed" => HorizontalAlign::Distributed,
            _ => return None,
        };
        Some(align)
    }

    pub fn as_ooxml(self) -> &'static str {
        match self {
            HorizontalAlign::General => "general",
            HorizontalAlign::Left => "left",
            HorizontalAlign::Center => "center",
            HorizontalAlign::Right => "right",
            HorizontalAlign::Fill => "fill",
            HorizontalAlign::Justify => "justify",
            HorizontalAlign::CenterContinuous => "centerContinuous",
            HorizontalAlign::Distributed => "distributed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalAlign {
    Top,
    Center,
    Bottom,
    Justify,
    Distributed,
}

impl VerticalAlign {
    pub fn from_ooxml(value: &str) -> Option<Self> {
        let align = match value {
            "top" => VerticalAlign::Top,
            "center" => VerticalAlign::Center,
            "bottom" => VerticalAlign::Bottom,
            "justify" => VerticalAlign::Justify,
            "distributed" => VerticalAlign::Distributed,
            _ => return None,
        };
        Some(align)
    }

    pub fn as_ooxml(self) -> &'static str {
        match self {
            VerticalAlign::Top => "top",
            VerticalAlign::Center => "center",
            VerticalAlign::Bottom => "bottom",
            VerticalAlign::Justify => "justify",
            VerticalAlign::Distributed => "distributed",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Alignment {
    pub horizontal: Option<HorizontalAlign>,
    pub vertical: Option<VerticalAlign>,
    pub wrap_text: bool,
    pub shrink_to_fit: bool,
    pub indent: u8,
    /// OOXML text rotation: 0-90 up, 91-180 down, 255 stacked
    pub rotation: u16,
}

/// Explicit formatting of one cell. Every part is optional; a missing part
/// means the workbook default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellStyle {
    pub font: Option<Font>,
    pub border: Option<Border>,
    pub fill: Option<Fill>,
    pub number_format: Option<NumberFormat>,
    pub protection: Option<Protection>,
    pub alignment: Option<Alignment>,
}

impl CellStyle {
    pub fn is_empty(&self) -> bool {
        self.font.is_none()
            && self.border.is_none()
            && self.fill.is_none()
            && self.number_format.is_none()
            && self.protection.is_none()
            && self.alignment.is_none()
    }
}

/// A reusable, named bundle of cell formatting.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedStyle {
    pub name: String,
    pub builtin_id: Option<u32>,
    pub style: CellStyle,
}

impl NamedStyle {
    pub fn new(name: impl Into<String>, style: CellStyle) -> Self {
        Self {
            name: name.into(),
            builtin_id: None,
            style,
        }
    }

    /// The `Normal` style every workbook starts with.
    pub fn normal() -> Self {
        Self {
            name: "Normal".to_string(),
            builtin_id: Some(0),
            style: CellStyle::default(),
        }
    }
}

//==============================================================================
// Cell references
//==============================================================================

static CELL_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\$?([A-Za-z]{1,3})\$?([0-9]{1,7})$").expect("valid regex"));

/// Parse an A1 reference into zero-based (row, col).
pub fn parse_cell_ref(reference: &str) -> Option<(u32, u16)> {
    let caps = CELL_REF.captures(reference.trim())?;
    let col = caps[1]
        .bytes()
        .try_fold(0u32, |acc, b| Some(acc * 26 + u32::from(b.to_ascii_uppercase() - b'A') + 1))?;
    let row: u32 = caps[2].parse().ok()?;
    if row == 0 || col == 0 || col > 16_384 {
        return None;
    }
    Some((row - 1, (col - 1) as u16))
}

/// Zero-based column index → letters (0 → A, 26 → AA).
pub fn column_letter(col: u16) -> String {
    let mut n = u32::from(col) + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        letters.push(b'A' + rem);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Rectangular, zero-based, inclusive cell range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellRange {
    pub first_row: u32,
    pub first_col: u16,
    pub last_row: u32,
    pub last_col: u16,
}

impl CellRange {
    pub fn new(first_row: u32, first_col: u16, last_row: u32, last_col: u16) -> Self {
        Self {
            first_row: first_row.min(last_row),
            first_col: first_col.min(last_col),
            last_row: first_row.max(last_row),
            last_col: first_col.max(last_col),
        }
    }

    /// Parse `A1:C3` or a single-cell `B2`.
    pub fn parse(reference: &str) -> Option<Self> {
        let mut parts = reference.trim().splitn(2, ':');
        let (r1, c1) = parse_cell_ref(parts.next()?)?;
        let (r2, c2) = match parts.next() {
            Some(end) => parse_cell_ref(end)?,
            None => (r1, c1),
        };
        Some(Self::new(r1, c1, r2, c2))
    }

    pub fn is_single_cell(&self) -> bool {
        self.first_row == self.last_row && self.first_col == self.last_col
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letter(self.first_col), self.first_row + 1)?;
        if !self.is_single_cell() {
            write!(f, ":{}{}", column_letter(self.last_col), self.last_row + 1)?;
        }
        Ok(())
    }
}

//==============================================================================
// Sheet-level settings
//==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SheetFormat {
    pub default_row_height: Option<f64>,
    pub default_column_width: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SheetProperties {
    pub tab_color: Option<StyleColor>,
    pub fit_to_page: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageMargins {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
    pub header: f64,
    pub footer: f64,
}

impl Default for PageMargins {
    fn default() -> Self {
        Self {
            left: 0.7,
            right: 0.7,
            top: 0.75,
            bottom: 0.75,
            header: 0.3,
            footer: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageSetup {
    pub orientation: Option<Orientation>,
    pub paper_size: Option<u8>,
    pub scale: Option<u16>,
    pub fit_to_width: Option<u16>,
    pub fit_to_height: Option<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PrintOptions {
    pub center_horizontally: bool,
    pub center_vertically: bool,
    pub gridlines: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellOperator {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Between,
    NotBetween,
}

impl CellOperator {
    pub fn from_ooxml(value: &str) -> Option<Self> {
        let op = match value {
            "equal" => CellOperator::Equal,
            "notEqual" => CellOperator::NotEqual,
            "greaterThan" => CellOperator::GreaterThan,
            "greaterThanOrEqual" => CellOperator::GreaterThanOrEqual,
            "lessThan" => CellOperator::LessThan,
            "lessThanOrEqual" => CellOperator::LessThanOrEqual,
            "between" => CellOperator::Between,
            "notBetween" => CellOperator::NotBetween,
            _ => return None,
        };
        Some(op)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConditionalKind {
    /// Formula rule, evaluated relative to the range's top-left cell
    Expression(String),
    CellIs {
        operator: CellOperator,
        formulas: Vec<String>,
    },
}

impl ConditionalKind {
    /// Express the rule as a single formula anchored at `anchor` (e.g. `A1`).
    pub fn to_formula(&self, anchor: &str) -> Option<String> {
        match self {
            ConditionalKind::Expression(formula) => Some(formula.clone()),
            ConditionalKind::CellIs { operator, formulas } => {
                let first = formulas.first()?;
                let formula = match operator {
                    CellOperator::Equal => format!("{}={}", anchor, first),
                    CellOperator::NotEqual => format!("{}<>{}", anchor, first),
                    CellOperator::GreaterThan => format!("{}>{}", anchor, first),
                    CellOperator::GreaterThanOrEqual => format!("{}>={}", anchor, first),
                    CellOperator::LessThan => format!("{}<{}", anchor, first),
                    CellOperator::LessThanOrEqual => format!("{}<={}", anchor, first),
                    CellOperator::Between => {
                        let second = formulas.get(1)?;
                        format!("AND({a}>={}, {a}<={})", first, second, a = anchor)
                    }
                    CellOperator::NotBetween => {
                        let second = formulas.get(1)?;
                        format!("OR({a}<{}, {a}>{})", first, second, a = anchor)
                    }
                };
                Some(formula)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalRule {
    /// Target ranges (`sqref`); formulas are relative to the first one
    pub ranges: Vec<CellRange>,
    pub kind: ConditionalKind,
    pub style: Option<CellStyle>,
    pub stop_if_true: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SheetVisibility {
    #[default]
    Visible,
    Hidden,
}

//==============================================================================
// Sheets
//==============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetCell {
    pub value: CellValue,
    pub style: Option<CellStyle>,
    /// Named style the cell's format derives from, if any
    pub named_style: Option<String>,
}

/// A worksheet's values and full visual definition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormattedSheet {
    pub name: String,
    pub cells: BTreeMap<(u32, u16), SheetCell>,
    pub column_widths: BTreeMap<u16, f64>,
    pub row_heights: BTreeMap<u32, f64>,
    pub hidden_columns: BTreeSet<u16>,
    pub hidden_rows: BTreeSet<u32>,
    pub merged_ranges: Vec<CellRange>,
    pub format: SheetFormat,
    pub properties: SheetProperties,
    pub margins: Option<PageMargins>,
    pub freeze_panes: Option<(u32, u16)>,
    pub page_setup: Option<PageSetup>,
    pub print_options: Option<PrintOptions>,
    pub conditional_formats: Vec<ConditionalRule>,
    pub visibility: SheetVisibility,
}

impl FormattedSheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn cell(&self, row: u32, col: u16) -> Option<&SheetCell> {
        self.cells.get(&(row, col))
    }

    pub fn value(&self, row: u32, col: u16) -> Option<&CellValue> {
        self.cell(row, col).map(|c| &c.value)
    }

    pub fn set_value(&mut self, row: u32, col: u16, value: CellValue) {
        self.cells.entry((row, col)).or_default().value = value;
    }

    /// Number of rows up to and including the last populated one.
    pub fn row_count(&self) -> u32 {
        self.cells.keys().map(|(row, _)| row + 1).max().unwrap_or(0)
    }

    /// Write `values` into the row after the last populated one.
    pub fn append_row(&mut self, values: Vec<CellValue>) -> u32 {
        let row = self.row_count();
        for (col, value) in values.into_iter().enumerate() {
            self.set_value(row, col as u16, value);
        }
        row
    }

    pub fn set_column_width(&mut self, col: u16, width: f64) {
        self.column_widths.insert(col, width);
    }

    pub fn set_row_height(&mut self, row: u32, height: f64) {
        self.row_heights.insert(row, height);
    }

    pub fn hide(&mut self) {
        self.visibility = SheetVisibility::Hidden;
    }

    pub fn is_hidden(&self) -> bool {
        self.visibility == SheetVisibility::Hidden
    }

    /// Names of all named styles referenced by cells of this sheet.
    pub fn referenced_styles(&self) -> BTreeSet<&str> {
        self.cells
            .values()
            .filter_map(|c| c.named_style.as_deref())
            .collect()
    }
}

//==============================================================================
// Workbooks
//==============================================================================

/// An output workbook under construction.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkbookPlan {
    sheets: Vec<FormattedSheet>,
    named_styles: Vec<NamedStyle>,
}

impl Default for WorkbookPlan {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkbookPlan {
    /// A workbook with no sheets and only the builtin `Normal` style.
    pub fn new() -> Self {
        Self {
            sheets: Vec::new(),
            named_styles: vec![NamedStyle::normal()],
        }
    }

    pub fn add_sheet(&mut self, name: &str) -> ConvertResult<&mut FormattedSheet> {
        validate_sheet_name(name)?;
        if self.sheet(name).is_some() {
            return Err(ConvertError::Workbook(format!(
                "sheet '{}' already exists",
                name
            )));
        }
        self.sheets.push(FormattedSheet::new(name));
        let last = self.sheets.len() - 1;
        Ok(&mut self.sheets[last])
    }

    pub fn sheet(&self, name: &str) -> Option<&FormattedSheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut FormattedSheet> {
        self.sheets.iter_mut().find(|s| s.name == name)
    }

    pub fn sheets(&self) -> &[FormattedSheet] {
        &self.sheets
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn named_styles(&self) -> &[NamedStyle] {
        &self.named_styles
    }

    pub fn named_style(&self, name: &str) -> Option<&NamedStyle> {
        self.named_styles.iter().find(|s| s.name == name)
    }

    /// Register a named style. Returns false, leaving the existing
    /// definition untouched, when the name is already taken.
    pub fn add_named_style(&mut self, style: NamedStyle) -> bool {
        if self.named_style(&style.name).is_some() {
            return false;
        }
        self.named_styles.push(style);
        true
    }
}

fn validate_sheet_name(name: &str) -> ConvertResult<()> {
    if name.is_empty() || name.chars().count() > MAX_SHEET_NAME_LEN {
        return Err(ConvertError::Workbook(format!(
            "invalid sheet name '{}': must be 1-{} characters",
            name, MAX_SHEET_NAME_LEN
        )));
    }
    if name.contains(['[', ']', ':', '*', '?', '/', '\\']) {
        return Err(ConvertError::Workbook(format!(
            "invalid sheet name '{}': contains a reserved character",
            name
        )));
    }
    Ok(())
}
