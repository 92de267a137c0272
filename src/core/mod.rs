//! Conversion core: row expansion and workbook assembly

pub mod assembler;
pub mod expander;

pub use assembler::{convert, ConversionResult, Converter, OutputFile};
pub use expander::{deduplicate_orders, expand_workpieces};
