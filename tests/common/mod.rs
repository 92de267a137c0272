//! Shared fixtures: order master sheets built with rust_xlsxwriter and a
//! reference workbook assembled part by part, so it can carry custom named
//! styles that no writer library emits.

#![allow(dead_code)]

use rust_xlsxwriter::Workbook;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub const SOURCE_HEADERS: [&str; 13] = [
    "生产单号",
    "制品名称",
    "部件名称",
    "下单日期",
    "交期",
    "类型",
    "数量",
    "阶段",
    "母型合金",
    "母型合金板",
    "母型套中套",
    "合金针",
    "底座",
];

/// One data row of an order master sheet.
#[derive(Clone)]
pub struct Row {
    pub order_no: &'static str,
    pub product: &'static str,
    pub component: &'static str,
    pub order_date: &'static str,
    pub delivery_date: &'static str,
    pub mold_type: &'static str,
    pub stage: &'static str,
    pub quantity: f64,
    /// Accessory cells in column order I..M; empty strings are left blank
    pub accessories: [&'static str; 5],
}

impl Row {
    pub fn new(order_no: &'static str, component: &'static str) -> Self {
        Self {
            order_no,
            product: "前盖",
            component,
            order_date: "2024-01-05",
            delivery_date: "2024-02-20",
            mold_type: "注塑",
            stage: "T0",
            quantity: 2.0,
            accessories: ["", "", "", "", ""],
        }
    }

    pub fn with_base(mut self, value: &'static str) -> Self {
        self.accessories[4] = value;
        self
    }

    pub fn with_accessory(mut self, index: usize, value: &'static str) -> Self {
        self.accessories[index] = value;
        self
    }
}

/// The three-row A,A,B sheet: quantity 2 everywhere, a base on every row.
pub fn aab_rows() -> Vec<Row> {
    vec![
        Row::new("A", "X").with_base("1"),
        Row::new("A", "X").with_base("1"),
        Row::new("B", "Y").with_base("1"),
    ]
}

pub fn source_workbook(rows: &[Row]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("订单总表").unwrap();
    for (col, header) in SOURCE_HEADERS.iter().enumerate() {
        sheet.write_string(0, col as u16, *header).unwrap();
    }
    for (i, row) in rows.iter().enumerate() {
        let r = i as u32 + 1;
        sheet.write_string(r, 0, row.order_no).unwrap();
        sheet.write_string(r, 1, row.product).unwrap();
        sheet.write_string(r, 2, row.component).unwrap();
        sheet.write_string(r, 3, row.order_date).unwrap();
        sheet.write_string(r, 4, row.delivery_date).unwrap();
        sheet.write_string(r, 5, row.mold_type).unwrap();
        sheet.write_number(r, 6, row.quantity).unwrap();
        sheet.write_string(r, 7, row.stage).unwrap();
        for (offset, value) in row.accessories.iter().enumerate() {
            if !value.is_empty() {
                sheet.write_string(r, 8 + offset as u16, *value).unwrap();
            }
        }
    }
    workbook.save_to_buffer().unwrap()
}

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
  <Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
  <Override PartName="/xl/worksheets/sheet2.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
  <Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>
  <Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>
</Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet2.xml"/>
  <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
  <Relationship Id="rId4" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/>
</Relationships>"#;

/// Named styles: `Normal` (builtin) and `订单标题` (bold red 宋体 on yellow).
const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <fonts count="2">
    <font><sz val="11"/><color theme="1"/><name val="Calibri"/><family val="2"/></font>
    <font><b/><sz val="12"/><color rgb="FFFF0000"/><name val="宋体"/><charset val="134"/></font>
  </fonts>
  <fills count="3">
    <fill><patternFill patternType="none"/></fill>
    <fill><patternFill patternType="gray125"/></fill>
    <fill><patternFill patternType="solid"><fgColor rgb="FFFFFF00"/><bgColor indexed="64"/></patternFill></fill>
  </fills>
  <borders count="2">
    <border><left/><right/><top/><bottom/><diagonal/></border>
    <border><left style="thin"><color auto="1"/></left><right style="thin"><color auto="1"/></right><top style="thin"><color auto="1"/></top><bottom style="thin"><color auto="1"/></bottom><diagonal/></border>
  </borders>
  <cellStyleXfs count="2">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0"/>
    <xf numFmtId="0" fontId="1" fillId="2" borderId="1" applyFont="1" applyFill="1" applyBorder="1"/>
  </cellStyleXfs>
  <cellXfs count="3">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>
    <xf numFmtId="0" fontId="1" fillId="2" borderId="1" xfId="1" applyFont="1" applyFill="1" applyBorder="1" applyAlignment="1"><alignment horizontal="center" vertical="center"/></xf>
    <xf numFmtId="14" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/>
  </cellXfs>
  <cellStyles count="2">
    <cellStyle name="Normal" xfId="0" builtinId="0"/>
    <cellStyle name="订单标题" xfId="1"/>
  </cellStyles>
  <dxfs count="0"/>
</styleSheet>"#;

const SHARED_STRINGS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="3" uniqueCount="3">
  <si><t>模具信息</t></si>
  <si><t>备注</t></si>
  <si><t>工件模板</t></si>
</sst>"#;

/// `page`: A1:B1 merged title in the named style, a date in A2, column A 20 wide.
const PAGE_SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <dimension ref="A1:B3"/>
  <sheetFormatPr defaultRowHeight="15"/>
  <cols>
    <col min="1" max="1" width="20.7109375" customWidth="1"/>
    <col min="3" max="3" width="9.140625" hidden="1"/>
  </cols>
  <sheetData>
    <row r="1" ht="30" customHeight="1"><c r="A1" s="1" t="s"><v>0</v></c><c r="B1" s="1"/></row>
    <row r="2"><c r="A2" s="2"><v>45292</v></c><c r="B2" t="s"><v>1</v></c></row>
    <row r="3"><c r="A3"><v>12.5</v></c></row>
  </sheetData>
  <mergeCells count="1"><mergeCell ref="A1:B1"/></mergeCells>
  <pageMargins left="0.7" right="0.7" top="0.75" bottom="0.75" header="0.3" footer="0.3"/>
  <pageSetup paperSize="9" orientation="landscape"/>
</worksheet>"#;

const PAGE2_SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <dimension ref="A1:B1"/>
  <sheetData>
    <row r="1"><c r="A1" s="1" t="s"><v>2</v></c><c r="B1"><v>3</v></c></row>
  </sheetData>
</worksheet>"#;

/// Reference workbook with `page`, and `page2` unless `with_page2` is false.
pub fn reference_workbook(with_page2: bool) -> Vec<u8> {
    let sheets = if with_page2 {
        r#"<sheet name="page" sheetId="1" r:id="rId1"/><sheet name="page2" sheetId="2" r:id="rId2"/>"#
    } else {
        r#"<sheet name="page" sheetId="1" r:id="rId1"/>"#
    };
    let workbook = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets>{}</sheets>
</workbook>"#,
        sheets
    );

    let mut parts: Vec<(&str, String)> = vec![
        ("[Content_Types].xml", CONTENT_TYPES.to_string()),
        ("_rels/.rels", ROOT_RELS.to_string()),
        ("xl/workbook.xml", workbook),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.to_string()),
        ("xl/styles.xml", STYLES.to_string()),
        ("xl/sharedStrings.xml", SHARED_STRINGS.to_string()),
        ("xl/worksheets/sheet1.xml", PAGE_SHEET.to_string()),
    ];
    if with_page2 {
        parts.push(("xl/worksheets/sheet2.xml", PAGE2_SHEET.to_string()));
    }

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, content) in parts {
        zip.start_file(name, options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}
