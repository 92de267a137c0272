//! Workbook assembly: records + reference sheet → the two output workbooks

use super::expander::{deduplicate_orders, expand_workpieces};
use crate::error::{ConversionError, ConvertResult, Stage, StageContext};
use crate::excel::{copy_sheet, ReferenceWorkbook, SourceImporter, WorkbookExporter};
use crate::types::{
    CellValue, OrderEntryRecord, SourceRecord, WorkpieceRecord, ORDER_HEADERS, ORDER_SHEET,
    WORKPIECE_HEADERS, WORKPIECE_SHEET,
};
use crate::workbook::{FormattedSheet, WorkbookPlan};
use chrono::Local;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Name of the copied reference sheet in both outputs.
pub const HIDDEN_SHEET: &str = "page";
/// Reference sheet copied into the order entry workbook.
pub const ORDER_TEMPLATE_SHEET: &str = "page";
/// Reference sheet copied into the workpiece workbook.
pub const WORKPIECE_TEMPLATE_SHEET: &str = "page2";

pub const ORDER_COLUMN_WIDTHS: [f64; 9] = [35.0, 35.0, 15.0, 35.0, 12.0, 15.0, 20.0, 12.0, 8.0];
pub const WORKPIECE_COLUMN_WIDTHS: [f64; 7] = [15.0, 50.0, 35.0, 20.0, 8.0, 10.0, 12.0];
pub const HEADER_ROW_HEIGHT: f64 = 25.0;
pub const DATA_ROW_HEIGHT: f64 = 20.0;

pub const ORDER_FILE_PREFIX: &str = "订单录入结果";
pub const WORKPIECE_FILE_PREFIX: &str = "工件导入结果";

/// One serialized output workbook.
#[derive(Debug, Clone, Serialize)]
pub struct OutputFile {
    pub filename: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub record_count: usize,
}

impl OutputFile {
    pub fn write_to(&self, dir: &Path) -> std::io::Result<PathBuf> {
        let path = dir.join(&self.filename);
        std::fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

/// Both outputs of one conversion run.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionResult {
    pub order: OutputFile,
    pub workpiece: OutputFile,
}

impl ConversionResult {
    /// Write both files into `dir`, creating it if needed. Either both files
    /// are written or neither is left behind.
    pub fn write_to_dir(&self, dir: &Path) -> std::io::Result<(PathBuf, PathBuf)> {
        std::fs::create_dir_all(dir)?;
        let order = self.order.write_to(dir)?;
        match self.workpiece.write_to(dir) {
            Ok(workpiece) => Ok((order, workpiece)),
            Err(e) => {
                if let Err(cleanup) = std::fs::remove_file(&order) {
                    warn!(path = %order.display(), error = %cleanup, "could not remove order file");
                }
                Err(e)
            }
        }
    }
}

/// Builds the output workbooks for an already-loaded source table.
pub struct Converter<'a> {
    records: &'a [SourceRecord],
    reference: Option<&'a ReferenceWorkbook>,
}

impl<'a> Converter<'a> {
    pub fn new(records: &'a [SourceRecord], reference: &'a ReferenceWorkbook) -> Self {
        Self {
            records,
            reference: Some(reference),
        }
    }

    /// Data sheets only, no hidden reference sheet.
    pub fn without_reference(records: &'a [SourceRecord]) -> Self {
        Self {
            records,
            reference: None,
        }
    }

    pub fn build_order_workbook(&self) -> ConvertResult<(WorkbookPlan, Vec<OrderEntryRecord>)> {
        let orders = deduplicate_orders(self.records)?;
        let rows = orders.iter().map(|o| o.to_row());
        let plan = self.build_plan(
            ORDER_SHEET,
            &ORDER_HEADERS,
            rows,
            &ORDER_COLUMN_WIDTHS,
            ORDER_TEMPLATE_SHEET,
        )?;
        Ok((plan, orders))
    }

    pub fn build_workpiece_workbook(
        &self,
    ) -> ConvertResult<(WorkbookPlan, Vec<WorkpieceRecord>)> {
        let workpieces = expand_workpieces(self.records)?;
        let rows = workpieces.iter().map(|w| w.to_row());
        let plan = self.build_plan(
            WORKPIECE_SHEET,
            &WORKPIECE_HEADERS,
            rows,
            &WORKPIECE_COLUMN_WIDTHS,
            WORKPIECE_TEMPLATE_SHEET,
        )?;
        Ok((plan, workpieces))
    }

    /// Build and serialize both workbooks. Nothing is returned unless both succeed.
    pub fn convert(&self) -> Result<ConversionResult, ConversionError> {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();

        let (order_plan, orders) = self.build_order_workbook().stage(Stage::BuildOrders)?;
        let (workpiece_plan, workpieces) = self
            .build_workpiece_workbook()
            .stage(Stage::BuildWorkpieces)?;

        let order_bytes = WorkbookExporter::new(&order_plan)
            .to_bytes()
            .stage(Stage::Serialize)?;
        let workpiece_bytes = WorkbookExporter::new(&workpiece_plan)
            .to_bytes()
            .stage(Stage::Serialize)?;

        info!(
            source_rows = self.records.len(),
            orders = orders.len(),
            workpieces = workpieces.len(),
            "conversion finished"
        );

        Ok(ConversionResult {
            order: OutputFile {
                filename: format!("{}_{}.xlsx", ORDER_FILE_PREFIX, timestamp),
                bytes: order_bytes,
                record_count: orders.len(),
            },
            workpiece: OutputFile {
                filename: format!("{}_{}.xlsx", WORKPIECE_FILE_PREFIX, timestamp),
                bytes: workpiece_bytes,
                record_count: workpieces.len(),
            },
        })
    }

    fn build_plan(
        &self,
        sheet_name: &str,
        headers: &[&str],
        rows: impl Iterator<Item = Vec<CellValue>>,
        widths: &[f64],
        template_sheet: &str,
    ) -> ConvertResult<WorkbookPlan> {
        let mut plan = WorkbookPlan::new();
        if let Some(reference) = self.reference {
            copy_sheet(reference, template_sheet, &mut plan, Some(HIDDEN_SHEET))?;
        }

        let data = plan.add_sheet(sheet_name)?;
        data.append_row(headers.iter().map(|h| (*h).into()).collect());
        for row in rows {
            data.append_row(row);
        }
        apply_presentation(data, widths);

        // the data sheet is the first visible one, so it opens active
        if let Some(page) = plan.sheet_mut(HIDDEN_SHEET) {
            page.hide();
        }
        Ok(plan)
    }
}

/// Fixed column widths; header row and data rows get their own heights.
fn apply_presentation(sheet: &mut FormattedSheet, widths: &[f64]) {
    for (col, width) in widths.iter().enumerate() {
        sheet.set_column_width(col as u16, *width);
    }
    let rows = sheet.row_count();
    for row in 0..rows {
        let height = if row == 0 {
            HEADER_ROW_HEIGHT
        } else {
            DATA_ROW_HEIGHT
        };
        sheet.set_row_height(row, height);
    }
}

/// Read the source table and produce both output workbooks.
pub fn convert(
    source: &[u8],
    reference: Option<&[u8]>,
) -> Result<ConversionResult, ConversionError> {
    let records = SourceImporter::new(source)
        .import()
        .stage(Stage::ReadSource)?;
    match reference {
        Some(bytes) => {
            let reference = ReferenceWorkbook::from_bytes(bytes).stage(Stage::LoadTemplate)?;
            Converter::new(&records, &reference).convert()
        }
        None => Converter::without_reference(&records).convert(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(row: usize, order_no: &str) -> SourceRecord {
        SourceRecord {
            order_no: order_no.into(),
            product_name: "P".into(),
            component_name: "X".into(),
            order_date: "2024-01-01".into(),
            delivery_date: "2024-02-01".into(),
            mold_type: "注塑".into(),
            mold_stage: "T0".into(),
            quantity: CellValue::Float(1.0),
            ..SourceRecord::new(row)
        }
    }

    #[test]
    fn test_order_plan_layout_without_reference() {
        let records = vec![record(2, "A"), record(3, "A"), record(4, "B")];
        let (plan, orders) = Converter::without_reference(&records)
            .build_order_workbook()
            .unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(plan.sheet_names(), vec![ORDER_SHEET]);

        let sheet = plan.sheet(ORDER_SHEET).unwrap();
        assert_eq!(sheet.row_count(), 3);
        assert_eq!(sheet.value(0, 0), Some(&CellValue::from("项目名称")));
        assert_eq!(sheet.value(2, 4), Some(&CellValue::from("B")));
        assert_eq!(sheet.value(1, 8), Some(&CellValue::Int(1)));
        assert_eq!(sheet.column_widths.get(&0), Some(&35.0));
        assert_eq!(sheet.column_widths.get(&8), Some(&8.0));
        assert_eq!(sheet.row_heights.get(&0), Some(&HEADER_ROW_HEIGHT));
        assert_eq!(sheet.row_heights.get(&2), Some(&DATA_ROW_HEIGHT));
    }

    #[test]
    fn test_workpiece_plan_widths() {
        let records = vec![record(2, "A")];
        let (plan, rows) = Converter::without_reference(&records)
            .build_workpiece_workbook()
            .unwrap();
        assert_eq!(rows.len(), 1);
        let sheet = plan.sheet(WORKPIECE_SHEET).unwrap();
        let widths: Vec<f64> = sheet.column_widths.values().copied().collect();
        assert_eq!(widths, WORKPIECE_COLUMN_WIDTHS.to_vec());
    }

    #[test]
    fn test_empty_source_gives_header_only() {
        let result = Converter::without_reference(&[]).convert().unwrap();
        assert_eq!(result.order.record_count, 0);
        assert_eq!(result.workpiece.record_count, 0);
        assert!(!result.order.bytes.is_empty());
    }

    #[test]
    fn test_filenames_share_timestamp() {
        let records = vec![record(2, "A")];
        let result = Converter::without_reference(&records).convert().unwrap();
        let order_stamp = result
            .order
            .filename
            .strip_prefix("订单录入结果_")
            .unwrap();
        let workpiece_stamp = result
            .workpiece
            .filename
            .strip_prefix("工件导入结果_")
            .unwrap();
        assert_eq!(order_stamp, workpiece_stamp);
        assert!(order_stamp.ends_with(".xlsx"));
        assert_eq!(order_stamp.len(), "20240101_120000.xlsx".len());
    }

    #[test]
    fn test_bad_data_names_stage() {
        let mut bad = record(7, "A");
        bad.delivery_date = CellValue::Empty;
        let err = Converter::without_reference(&[bad]).convert().unwrap_err();
        assert_eq!(err.stage, Stage::BuildOrders);
        assert!(err.is_data_error());
        assert!(err.to_string().contains("row 7"));
    }

    #[test]
    fn test_write_to_dir_is_all_or_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let result = Converter::without_reference(&[]).convert().unwrap();
        // a directory where the workpiece file should go
        std::fs::create_dir(dir.path().join(&result.workpiece.filename)).unwrap();

        assert!(result.write_to_dir(dir.path()).is_err());
        assert!(!dir.path().join(&result.order.filename).exists());
    }

    #[test]
    fn test_write_to_dir() {
        let dir = tempfile::tempdir().unwrap();
        let result = Converter::without_reference(&[]).convert().unwrap();
        let (order, workpiece) = result.write_to_dir(&dir.path().join("out")).unwrap();
        assert!(order.exists());
        assert!(workpiece.exists());
    }
}
