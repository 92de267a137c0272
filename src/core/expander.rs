//! Row expansion: source rows → order entry and workpiece records

use crate::error::{ConvertError, ConvertResult};
use crate::types::{CellValue, OrderEntryRecord, SourceRecord, WorkpieceRecord};
use std::collections::HashSet;
use tracing::debug;

/// Suffix appended to the production order number to form the task number.
pub const TASK_SUFFIX: &str = "_T0";

/// Part name shared by every synthetic accessory row.
pub const ACCESSORY_PART_NAME: &str = "其他配件";

/// Keep the first record of every production order number, in order of first appearance.
pub fn deduplicate_orders(records: &[SourceRecord]) -> ConvertResult<Vec<OrderEntryRecord>> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut orders = Vec::new();

    for record in records {
        let order_no = required_text(record, &record.order_no, "生产单号")?;
        if !seen.insert(order_no.clone()) {
            continue;
        }

        let product_name = required_text(record, &record.product_name, "制品名称")?;
        orders.push(OrderEntryRecord {
            project_name: product_name.clone(),
            project_code: product_name.clone(),
            project_delivery_date: required_date(record, &record.order_date, "下单日期")?,
            mold_name: product_name,
            mold_code: order_no,
            delivery_date: required_date(record, &record.delivery_date, "交期")?,
            mold_type: required_text(record, &record.mold_type, "类型")?,
            mold_stage: required_text(record, &record.mold_stage, "模具阶段")?,
            quantity: 1,
        });
    }

    debug!(
        source_rows = records.len(),
        orders = orders.len(),
        "deduplicated production orders"
    );
    Ok(orders)
}

/// One base record per source row, followed by one record per present accessory.
pub fn expand_workpieces(records: &[SourceRecord]) -> ConvertResult<Vec<WorkpieceRecord>> {
    let mut workpieces = Vec::with_capacity(records.len());

    for record in records {
        let order_no = required_text(record, &record.order_no, "生产单号")?;
        let product_name = record.product_name.to_text().unwrap_or_default();
        let component_name = record.component_name.to_text().unwrap_or_default();
        let quantity = record
            .quantity
            .to_integer()
            .map_err(|e| ConvertError::data_at(record.row, format!("数量: {}", e)))?;
        let task_no = format!("{}{}", order_no, TASK_SUFFIX);

        workpieces.push(WorkpieceRecord {
            task_no: task_no.clone(),
            part_no: format!("{}{}", product_name, component_name),
            part_code: product_name,
            part_name: component_name.clone(),
            quantity,
            remark: String::new(),
            order_no: order_no.clone(),
        });

        for accessory in record.present_accessories() {
            let label = accessory.part_label(&component_name);
            workpieces.push(WorkpieceRecord {
                task_no: task_no.clone(),
                part_no: label.clone(),
                part_code: label,
                part_name: ACCESSORY_PART_NAME.to_string(),
                quantity,
                remark: String::new(),
                order_no: order_no.clone(),
            });
        }
    }

    debug!(
        source_rows = records.len(),
        workpieces = workpieces.len(),
        "expanded workpiece rows"
    );
    Ok(workpieces)
}

fn required_text(record: &SourceRecord, value: &CellValue, field: &str) -> ConvertResult<String> {
    value
        .to_text()
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| ConvertError::data_at(record.row, format!("{} is missing", field)))
}

fn required_date(record: &SourceRecord, value: &CellValue, field: &str) -> ConvertResult<String> {
    value
        .to_date_string()
        .map_err(|e| ConvertError::data_at(record.row, format!("{}: {}", field, e)))
}
