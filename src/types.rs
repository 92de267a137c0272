use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::fmt;

//==============================================================================
// Cell values
//==============================================================================

/// A raw cell value, as read from a workbook or written to one.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Excel serial date-time (days since 1899-12-30)
    DateTime(f64),
    /// ISO 8601 date-time text, as stored by some writers
    DateTimeIso(String),
    /// Error value such as `#N/A`
    Error(String),
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y年%m月%d日", "%Y%m%d"];

impl CellValue {
    /// Empty cells and error values both count as missing data.
    pub fn is_missing(&self) -> bool {
        matches!(self, CellValue::Empty | CellValue::Error(_))
    }

    /// Text form of the value, `None` when missing.
    ///
    /// Integral floats drop their fractional part so that an order number
    /// stored as `1001.0` reads as `1001`.
    pub fn to_text(&self) -> Option<String> {
        match self {
            CellValue::Empty | CellValue::Error(_) => None,
            CellValue::String(s) => Some(s.clone()),
            CellValue::Int(i) => Some(i.to_string()),
            CellValue::Float(f) => Some(format_float(*f)),
            CellValue::Bool(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
            CellValue::DateTime(serial) => Some(
                serial_to_datetime(*serial)
                    .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| format_float(*serial)),
            ),
            CellValue::DateTimeIso(s) => Some(s.clone()),
        }
    }

    /// True when the value is present and its text is non-blank after trimming.
    pub fn has_content(&self) -> bool {
        self.to_text().is_some_and(|t| !t.trim().is_empty())
    }

    /// Format a date-like value as `YYYY-MM-DD`.
    pub fn to_date_string(&self) -> Result<String, String> {
        let date = match self {
            CellValue::DateTime(serial) | CellValue::Float(serial) => serial_to_datetime(*serial)
                .map(|dt| dt.date())
                .ok_or_else(|| format!("serial {} is not a valid date", serial))?,
            CellValue::Int(serial) => serial_to_datetime(*serial as f64)
                .map(|dt| dt.date())
                .ok_or_else(|| format!("serial {} is not a valid date", serial))?,
            CellValue::String(s) | CellValue::DateTimeIso(s) => parse_date_text(s)
                .ok_or_else(|| format!("'{}' is not a recognizable date", s))?,
            CellValue::Empty => return Err("value is empty".to_string()),
            CellValue::Error(e) => return Err(format!("cell holds error {}", e)),
            CellValue::Bool(b) => return Err(format!("boolean {} is not a date", b)),
        };
        Ok(date.format("%Y-%m-%d").to_string())
    }

    /// Coerce to an integer. Floats truncate toward zero; text must parse as an integer.
    pub fn to_integer(&self) -> Result<i64, String> {
        match self {
            CellValue::Int(i) => Ok(*i),
            CellValue::Float(f) if f.is_finite() => Ok(f.trunc() as i64),
            CellValue::Bool(b) => Ok(i64::from(*b)),
            CellValue::String(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| format!("'{}' is not an integer", s)),
            CellValue::Empty => Err("value is empty".to_string()),
            other => Err(format!("{} cannot be converted to an integer", other)),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Error(e) => f.write_str(e),
            other => f.write_str(&other.to_text().unwrap_or_default()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Int(i)
    }
}

impl From<f64> for CellValue {
    fn from(f: f64) -> Self {
        CellValue::Float(f)
    }
}

fn format_float(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

/// Convert an Excel serial number to a date-time (1900 date system).
pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    // Serials below 60 sit before Excel's phantom 1900-02-29.
    let epoch = if serial < 60.0 {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };
    let days = serial.trunc() as i64;
    let seconds = ((serial - serial.trunc()) * 86_400.0).round() as i64;
    epoch
        .and_hms_opt(0, 0, 0)?
        .checked_add_signed(Duration::days(days))?
        .checked_add_signed(Duration::seconds(seconds))
}

fn parse_date_text(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    let try_all = |s: &str| {
        DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
    };
    try_all(text).or_else(|| {
        let date_part = text.split(['T', ' ']).next()?;
        try_all(date_part)
    })
}

//==============================================================================
// Source rows
//==============================================================================

/// Optional accessory columns, in the order they are expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Accessory {
    ParentAlloy,
    ParentAlloyPlate,
    ParentNestedSleeve,
    AlloyPin,
    Base,
}

impl Accessory {
    pub const ALL: [Accessory; 5] = [
        Accessory::ParentAlloy,
        Accessory::ParentAlloyPlate,
        Accessory::ParentNestedSleeve,
        Accessory::AlloyPin,
        Accessory::Base,
    ];

    /// Source column header for this accessory.
    pub fn column(self) -> &'static str {
        match self {
            Accessory::ParentAlloy => "母型合金",
            Accessory::ParentAlloyPlate => "母型合金板",
            Accessory::ParentNestedSleeve => "母型套中套",
            Accessory::AlloyPin => "合金针",
            Accessory::Base => "底座",
        }
    }

    /// Part number / part code of the synthetic workpiece row.
    ///
    /// Bases are named after the component they carry; every other accessory
    /// reuses its column header as a fixed label.
    pub fn part_label(self, component_name: &str) -> String {
        match self {
            Accessory::Base => format!("{}{}", component_name, self.column()),
            other => other.column().to_string(),
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// One row of the order master sheet, values kept as read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceRecord {
    /// 1-based sheet row, used in error messages
    pub row: usize,
    pub order_no: CellValue,
    pub product_name: CellValue,
    pub component_name: CellValue,
    pub order_date: CellValue,
    pub delivery_date: CellValue,
    pub mold_type: CellValue,
    pub mold_stage: CellValue,
    pub quantity: CellValue,
    pub(crate) accessories: [CellValue; 5],
}

impl SourceRecord {
    pub fn new(row: usize) -> Self {
        Self {
            row,
            ..Default::default()
        }
    }

    pub fn accessory(&self, kind: Accessory) -> &CellValue {
        &self.accessories[kind.index()]
    }

    pub fn set_accessory(&mut self, kind: Accessory, value: CellValue) {
        self.accessories[kind.index()] = value;
    }

    /// Builder-style setter, handy for tests and fixtures.
    pub fn with_accessory(mut self, kind: Accessory, value: impl Into<CellValue>) -> Self {
        self.set_accessory(kind, value.into());
        self
    }

    /// Accessories that trigger a synthetic workpiece row, in expansion order.
    pub fn present_accessories(&self) -> impl Iterator<Item = Accessory> + '_ {
        Accessory::ALL
            .into_iter()
            .filter(|kind| self.accessory(*kind).has_content())
    }
}

//==============================================================================
// Derived records
//==============================================================================

pub const ORDER_SHEET: &str = "订单录入";
pub const WORKPIECE_SHEET: &str = "工件信息";

pub const ORDER_HEADERS: [&str; 9] = [
    "项目名称",
    "项目编号",
    "项目预估交货期",
    "模具名称",
    "模具编号",
    "预估交货期",
    "模具类型",
    "模具阶段",
    "数量",
];

pub const WORKPIECE_HEADERS: [&str; 7] = [
    "生产任务号",
    "件号",
    "工件编码",
    "工件名称",
    "数量",
    "备注",
    "生产单号",
];

/// One mold-level row of the order entry workbook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderEntryRecord {
    pub project_name: String,
    pub project_code: String,
    pub project_delivery_date: String,
    pub mold_name: String,
    pub mold_code: String,
    pub delivery_date: String,
    pub mold_type: String,
    pub mold_stage: String,
    pub quantity: i64,
}

impl OrderEntryRecord {
    pub fn to_row(&self) -> Vec<CellValue> {
        vec![
            self.project_name.as_str().into(),
            self.project_code.as_str().into(),
            self.project_delivery_date.as_str().into(),
            self.mold_name.as_str().into(),
            self.mold_code.as_str().into(),
            self.delivery_date.as_str().into(),
            self.mold_type.as_str().into(),
            self.mold_stage.as_str().into(),
            self.quantity.into(),
        ]
    }
}

/// One row of the workpiece import workbook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkpieceRecord {
    pub task_no: String,
    pub part_no: String,
    pub part_code: String,
    pub part_name: String,
    pub quantity: i64,
    pub remark: String,
    pub order_no: String,
}

impl WorkpieceRecord {
    pub fn to_row(&self) -> Vec<CellValue> {
        vec![
            self.task_no.as_str().into(),
            self.part_no.as_str().into(),
            self.part_code.as_str().into(),
            self.part_name.as_str().into(),
            self.quantity.into(),
            self.remark.as_str().into(),
            self.order_no.as_str().into(),
        ]
    }
}
