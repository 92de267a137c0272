//! ymdd API Server module
//!
//! HTTP upload/download front end for the converter.
//! Run with `ymdd-server`.

pub mod handlers;
pub mod server;

pub use server::{router, run_api_server, ApiConfig, AppState};
