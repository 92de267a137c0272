//! Source importer - order master sheet (.xlsx) → SourceRecord rows

use crate::error::{ConvertError, ConvertResult};
use crate::types::{Accessory, CellValue, SourceRecord};
use calamine::{Data, Range, Reader, Xlsx};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info};

pub const COL_ORDER_NO: &str = "生产单号";
pub const COL_PRODUCT_NAME: &str = "制品名称";
pub const COL_COMPONENT_NAME: &str = "部件名称";
pub const COL_ORDER_DATE: &str = "下单日期";
pub const COL_DELIVERY_DATE: &str = "交期";
pub const COL_MOLD_TYPE: &str = "类型";
pub const COL_QUANTITY: &str = "数量";

/// The mold stage column has no header of its own; it is always the 8th column (H).
pub const MOLD_STAGE_COLUMN: u32 = 7;

const REQUIRED_COLUMNS: [&str; 7] = [
    COL_ORDER_NO,
    COL_PRODUCT_NAME,
    COL_COMPONENT_NAME,
    COL_ORDER_DATE,
    COL_DELIVERY_DATE,
    COL_MOLD_TYPE,
    COL_QUANTITY,
];

/// Reads the first worksheet of an order master sheet.
pub struct SourceImporter<'a> {
    bytes: &'a [u8],
}

impl<'a> SourceImporter<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// Header row first, then one record per non-blank data row.
    pub fn import(&self) -> ConvertResult<Vec<SourceRecord>> {
        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(self.bytes))
            .map_err(|e| ConvertError::Data(format!("source is not a readable xlsx workbook: {}", e)))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| ConvertError::Data("source workbook has no worksheets".to_string()))??;

        let Some((header_row, first_col)) = range.start() else {
            return Err(ConvertError::Data("source sheet is empty".to_string()));
        };
        let (last_row, last_col) = range.end().unwrap_or((header_row, first_col));

        let columns = header_columns(&range, header_row, first_col, last_col);
        for name in REQUIRED_COLUMNS {
            if !columns.contains_key(name) {
                return Err(ConvertError::Data(format!("missing column '{}'", name)));
            }
        }
        if last_col < MOLD_STAGE_COLUMN {
            return Err(ConvertError::Data(format!(
                "mold stage column {} is missing (sheet has {} columns)",
                MOLD_STAGE_COLUMN + 1,
                last_col + 1
            )));
        }

        let mut records = Vec::new();
        for row in header_row + 1..=last_row {
            let cell = |col: u32| {
                range
                    .get_value((row, col))
                    .map(cell_value)
                    .unwrap_or_default()
            };
            if (first_col..=last_col).all(|col| cell(col).is_missing()) {
                continue;
            }
            let named = |name: &str| columns.get(name).map(|col| cell(*col)).unwrap_or_default();

            let mut record = SourceRecord {
                order_no: named(COL_ORDER_NO),
                product_name: named(COL_PRODUCT_NAME),
                component_name: named(COL_COMPONENT_NAME),
                order_date: named(COL_ORDER_DATE),
                delivery_date: named(COL_DELIVERY_DATE),
                mold_type: named(COL_MOLD_TYPE),
                mold_stage: cell(MOLD_STAGE_COLUMN),
                quantity: named(COL_QUANTITY),
                ..SourceRecord::new(row as usize + 1)
            };
            for kind in Accessory::ALL {
                record.set_accessory(kind, named(kind.column()));
            }
            records.push(record);
        }

        info!(rows = records.len(), "read source table");
        Ok(records)
    }
}

/// Read source records from a file on disk.
pub fn read_source_file<P: AsRef<Path>>(path: P) -> ConvertResult<Vec<SourceRecord>> {
    let bytes = std::fs::read(path.as_ref())?;
    SourceImporter::new(&bytes).import()
}

/// Header text → absolute column index; first occurrence of a name wins.
fn header_columns(
    range: &Range<Data>,
    header_row: u32,
    first_col: u32,
    last_col: u32,
) -> HashMap<String, u32> {
    let mut columns = HashMap::new();
    for col in first_col..=last_col {
        let Some(name) = range
            .get_value((header_row, col))
            .and_then(|d| cell_value(d).to_text())
        else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        columns.entry(name.to_string()).or_insert(col);
    }
    debug!(columns = columns.len(), "indexed source header");
    columns
}

pub(crate) fn cell_value(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::String(s.clone()),
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => CellValue::DateTime(dt.as_f64()),
        Data::DateTimeIso(s) => CellValue::DateTimeIso(s.clone()),
        Data::DurationIso(s) => CellValue::String(s.clone()),
        Data::Error(e) => CellValue::Error(e.to_string()),
    }
}
