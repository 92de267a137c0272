//! End-to-end conversion tests: source sheet + reference workbook → both outputs

mod common;

use calamine::{Data, Reader, SheetVisible, Xlsx};
use common::{aab_rows, reference_workbook, source_workbook, Row};
use pretty_assertions::assert_eq;
use std::io::{Cursor, Read};
use ymdd_convert::core::assembler::{HIDDEN_SHEET, ORDER_COLUMN_WIDTHS};
use ymdd_convert::error::{ConvertError, Stage};
use ymdd_convert::excel::{ReferenceWorkbook, SourceImporter};
use ymdd_convert::types::{ORDER_HEADERS, ORDER_SHEET, WORKPIECE_SHEET};
use ymdd_convert::workbook::{CellRange, FillPattern, SheetVisibility, StyleColor};
use ymdd_convert::{convert, ConversionResult, Converter};
use zip::ZipArchive;

fn read_rows(bytes: &[u8], sheet: &str) -> Vec<Vec<String>> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes.to_vec())).unwrap();
    let range = workbook.worksheet_range(sheet).unwrap();
    range
        .rows()
        .map(|row| row.iter().map(Data::to_string).collect())
        .collect()
}

fn aab_result() -> ConversionResult {
    let reference = reference_workbook(true);
    convert(&source_workbook(&aab_rows()), Some(reference.as_slice())).unwrap()
}

fn package_part(bytes: &[u8], name: &str) -> String {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut text = String::new();
    archive.by_name(name).unwrap().read_to_string(&mut text).unwrap();
    text
}

fn sheet_states(bytes: &[u8]) -> Vec<(String, SheetVisible)> {
    let workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes.to_vec())).unwrap();
    workbook
        .sheets_metadata()
        .iter()
        .map(|s| (s.name.clone(), s.visible))
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════
// A,A,B SCENARIO
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_aab_order_workbook() {
    let result = aab_result();
    assert_eq!(result.order.record_count, 2);

    let rows = read_rows(&result.order.bytes, ORDER_SHEET);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0], ORDER_HEADERS.to_vec());
    assert_eq!(
        rows[1],
        vec!["前盖", "前盖", "2024-01-05", "前盖", "A", "2024-02-20", "注塑", "T0", "1"]
    );
    assert_eq!(rows[2][4], "B");
}

#[test]
fn test_aab_workpiece_workbook() {
    let result = aab_result();
    assert_eq!(result.workpiece.record_count, 6);

    let rows = read_rows(&result.workpiece.bytes, WORKPIECE_SHEET);
    assert_eq!(rows.len(), 7);
    let parts: Vec<(&str, &str, &str)> = rows[1..]
        .iter()
        .map(|r| (r[0].as_str(), r[1].as_str(), r[6].as_str()))
        .collect();
    assert_eq!(
        parts,
        vec![
            ("A_T0", "前盖X", "A"),
            ("A_T0", "X底座", "A"),
            ("A_T0", "前盖X", "A"),
            ("A_T0", "X底座", "A"),
            ("B_T0", "前盖Y", "B"),
            ("B_T0", "Y底座", "B"),
        ]
    );
    assert_eq!(rows[2], vec!["A_T0", "X底座", "X底座", "其他配件", "2", "", "A"]);
    assert_eq!(rows[1][4], "2");
}

#[test]
fn test_outputs_carry_hidden_page_sheet() {
    let result = aab_result();

    // the copied sheet comes first, the data sheet after it
    assert_eq!(
        sheet_states(&result.order.bytes),
        vec![
            (HIDDEN_SHEET.to_string(), SheetVisible::Hidden),
            (ORDER_SHEET.to_string(), SheetVisible::Visible),
        ]
    );
    assert_eq!(
        sheet_states(&result.workpiece.bytes),
        vec![
            (HIDDEN_SHEET.to_string(), SheetVisible::Hidden),
            (WORKPIECE_SHEET.to_string(), SheetVisible::Visible),
        ]
    );
    // and the data sheet opens active
    let workbook_xml = package_part(&result.order.bytes, "xl/workbook.xml");
    assert!(workbook_xml.contains(r#"activeTab="1""#));

    // order output copies `page`, workpiece output copies `page2`
    assert_eq!(read_rows(&result.order.bytes, HIDDEN_SHEET)[1][1], "备注");
    assert_eq!(read_rows(&result.workpiece.bytes, HIDDEN_SHEET)[0][0], "工件模板");
}

#[test]
fn test_copied_sheet_keeps_formatting_in_output() {
    let result = aab_result();
    let output = ReferenceWorkbook::from_bytes(&result.order.bytes).unwrap();

    let page = output.sheet(HIDDEN_SHEET).unwrap();
    assert_eq!(page.visibility, SheetVisibility::Hidden);
    assert_eq!(page.merged_ranges, vec![CellRange::new(0, 0, 0, 1)]);
    assert!((page.column_widths[&0] - 20.0).abs() < 0.05);
    assert!(page.hidden_columns.contains(&2));
    assert_eq!(page.row_heights.get(&0), Some(&30.0));

    let title = page.cell(0, 0).unwrap().style.as_ref().unwrap();
    let font = title.font.as_ref().unwrap();
    assert!(font.bold);
    assert_eq!(font.color, Some(StyleColor::Rgb(0xFF0000)));
    let fill = title.fill.as_ref().unwrap();
    assert_eq!(fill.pattern, FillPattern::Solid);
    assert_eq!(fill.foreground, Some(StyleColor::Rgb(0xFFFF00)));

    // styled blank in the merged area survives too
    assert!(page.cell(0, 1).unwrap().style.is_some());

    let data = output.sheet(ORDER_SHEET).unwrap();
    assert_eq!(data.visibility, SheetVisibility::Visible);
    assert!((data.column_widths[&0] - ORDER_COLUMN_WIDTHS[0]).abs() < 0.05);
    assert_eq!(data.row_heights.get(&0), Some(&25.0));
    assert_eq!(data.row_heights.get(&1), Some(&20.0));
}

#[test]
fn test_named_styles_survive_serialization() {
    let result = aab_result();
    let donor = ReferenceWorkbook::from_bytes(&reference_workbook(true)).unwrap();

    for bytes in [&result.order.bytes, &result.workpiece.bytes] {
        let output = ReferenceWorkbook::from_bytes(bytes).unwrap();
        let names: Vec<&str> = output
            .named_styles()
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["Normal", "订单标题"]);

        let written = output.named_style("订单标题").unwrap();
        let expected = donor.named_style("订单标题").unwrap();
        assert_eq!(written.style.font, expected.style.font);
        assert_eq!(written.style.fill, expected.style.fill);
        assert_eq!(written.style.border, expected.style.border);
    }

    // the title cell still refers to the style by name
    let output = ReferenceWorkbook::from_bytes(&result.order.bytes).unwrap();
    let title = output.sheet(HIDDEN_SHEET).unwrap().cell(0, 0).unwrap();
    assert_eq!(title.named_style.as_deref(), Some("订单标题"));
    let styles_xml = package_part(&result.order.bytes, "xl/styles.xml");
    assert!(styles_xml.contains(r#"<cellStyles count="2">"#));
}

// ═══════════════════════════════════════════════════════════════════════════
// EDGE CASES
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_whitespace_accessory_is_absent() {
    let rows = vec![Row::new("A", "X").with_accessory(0, "   ").with_base(" \t")];
    let result = convert(&source_workbook(&rows), None).unwrap();
    assert_eq!(result.workpiece.record_count, 1);
}

#[test]
fn test_every_accessory_expands_in_column_order() {
    let row = Row::new("A", "X")
        .with_accessory(0, "1")
        .with_accessory(1, "1")
        .with_accessory(2, "1")
        .with_accessory(3, "1")
        .with_base("1");
    let result = convert(&source_workbook(&[row]), None).unwrap();
    let rows = read_rows(&result.workpiece.bytes, WORKPIECE_SHEET);
    let labels: Vec<&str> = rows[1..].iter().map(|r| r[1].as_str()).collect();
    assert_eq!(
        labels,
        vec!["前盖X", "母型合金", "母型合金板", "母型套中套", "合金针", "X底座"]
    );
}

#[test]
fn test_zero_rows_give_header_only_outputs() {
    let reference = reference_workbook(true);
    let result = convert(&source_workbook(&[]), Some(reference.as_slice())).unwrap();
    assert_eq!(result.order.record_count, 0);
    assert_eq!(result.workpiece.record_count, 0);
    assert_eq!(read_rows(&result.order.bytes, ORDER_SHEET).len(), 1);
    assert_eq!(read_rows(&result.workpiece.bytes, WORKPIECE_SHEET).len(), 1);
}

#[test]
fn test_missing_page2_only_breaks_workpiece_build() {
    let records = SourceImporter::new(&source_workbook(&aab_rows()))
        .import()
        .unwrap();
    let reference = ReferenceWorkbook::from_bytes(&reference_workbook(false)).unwrap();
    let converter = Converter::new(&records, &reference);

    let (plan, orders) = converter.build_order_workbook().unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(plan.sheet_names(), vec![HIDDEN_SHEET, ORDER_SHEET]);
    assert!(plan.sheet(HIDDEN_SHEET).unwrap().is_hidden());

    let err = converter.build_workpiece_workbook().unwrap_err();
    assert!(matches!(err, ConvertError::NotFound(ref name) if name == "page2"));

    let err = converter.convert().unwrap_err();
    assert_eq!(err.stage, Stage::BuildWorkpieces);
    assert!(err.is_data_error());
}

#[test]
fn test_bad_values_in_source() {
    let mut row = Row::new("A", "X");
    row.quantity = 2.5;
    let ok = convert(&source_workbook(&[row]), None).unwrap();
    // fractional quantities truncate
    assert_eq!(read_rows(&ok.workpiece.bytes, WORKPIECE_SHEET)[1][4], "2");

    let mut row = Row::new("A", "X");
    row.delivery_date = "next week";
    let err = convert(&source_workbook(&[Row::new("B", "Y"), row]), None).unwrap_err();
    assert_eq!(err.stage, Stage::BuildOrders);
    assert!(err.to_string().contains("row 3"));
}

#[test]
fn test_invalid_template_fails_before_building() {
    let err = convert(&source_workbook(&aab_rows()), Some(&b"not a zip"[..])).unwrap_err();
    assert_eq!(err.stage, Stage::LoadTemplate);
    assert!(!err.is_data_error());
}

#[test]
fn test_conversion_is_repeatable() {
    let source = source_workbook(&aab_rows());
    let reference = reference_workbook(true);
    let first = convert(&source, Some(reference.as_slice())).unwrap();
    let second = convert(&source, Some(reference.as_slice())).unwrap();
    for sheet in [ORDER_SHEET, HIDDEN_SHEET] {
        assert_eq!(
            read_rows(&first.order.bytes, sheet),
            read_rows(&second.order.bytes, sheet)
        );
    }
    assert_eq!(
        read_rows(&first.workpiece.bytes, WORKPIECE_SHEET),
        read_rows(&second.workpiece.bytes, WORKPIECE_SHEET)
    );
}
