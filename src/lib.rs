//! ymdd - order master sheet converter
//!
//! Reads an order master sheet (.xlsx) and builds two import workbooks: an
//! order entry workbook with one row per production order, and a workpiece
//! workbook with one row per part, accessories expanded into rows of their own.
//! Both carry a hidden `page` sheet copied from a reference workbook with its
//! cell formatting, merges, dimensions and named styles intact.
//!
//! # Features
//!
//! - Order deduplication and accessory expansion
//! - Full-fidelity sheet copy from a reference workbook (styles.xml aware)
//! - All-or-nothing conversion with a single staged error
//! - CLI (`ymdd`) and HTTP server (`ymdd-server`) front ends
//!
//! # Example
//!
//! ```no_run
//! use ymdd_convert::excel::{read_source_file, ReferenceWorkbook};
//! use ymdd_convert::core::Converter;
//! use std::path::Path;
//!
//! let records = read_source_file("订单总表.xlsx")?;
//! let reference = ReferenceWorkbook::from_path("隐藏表格.xlsx")?;
//!
//! let result = Converter::new(&records, &reference).convert()?;
//! result.write_to_dir(Path::new("out"))?;
//! println!("{} orders, {} workpieces", result.order.record_count, result.workpiece.record_count);
//! # Ok::<(), ymdd_convert::error::ConvertError>(())
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod excel;
pub mod fetch;
pub mod types;
pub mod workbook;

// Re-export commonly used types
pub use config::{ConverterConfig, TemplateLocation};
pub use core::{convert, ConversionResult, Converter};
pub use error::{ConversionError, ConvertError, ConvertResult, Stage};
pub use types::{CellValue, OrderEntryRecord, SourceRecord, WorkpieceRecord};
pub use workbook::{FormattedSheet, WorkbookPlan};
