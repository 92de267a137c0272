//! CLI command handlers

pub mod commands;

pub use commands::{convert, inspect, preview, resolve_template};
