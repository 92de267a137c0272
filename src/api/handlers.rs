//! API request handlers
//!
//! Handlers for all REST API endpoints.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::server::AppState;
use crate::core::{deduplicate_orders, expand_workpieces, ConversionResult, Converter, OutputFile};
use crate::error::{ConversionError, ConvertError, Stage, StageContext};
use crate::excel::SourceImporter;
use crate::fetch::percent_encode;

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const RECORD_COUNT_HEADER: &str = "x-record-count";

/// Standard API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            request_id: Uuid::new_v4().to_string(),
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self
    where
        T: Default,
    {
        Self {
            success: false,
            request_id: Uuid::new_v4().to_string(),
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Root endpoint response
#[derive(Serialize)]
pub struct RootResponse {
    pub name: String,
    pub version: String,
    pub description: String,
    pub endpoints: Vec<EndpointInfo>,
}

#[derive(Serialize)]
pub struct EndpointInfo {
    pub path: String,
    pub method: String,
    pub description: String,
}

impl EndpointInfo {
    fn new(method: &str, path: &str, description: &str) -> Self {
        Self {
            path: path.to_string(),
            method: method.to_string(),
            description: description.to_string(),
        }
    }
}

/// GET / - Root info
pub async fn root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let response = RootResponse {
        name: "ymdd API Server".to_string(),
        version: state.version.clone(),
        description: "Order master sheet → order entry and workpiece import workbooks"
            .to_string(),
        endpoints: vec![
            EndpointInfo::new("GET", "/health", "Health check endpoint"),
            EndpointInfo::new("GET", "/version", "Get server version"),
            EndpointInfo::new(
                "POST",
                "/api/v1/convert/orders",
                "Upload a source .xlsx, download the order entry workbook",
            ),
            EndpointInfo::new(
                "POST",
                "/api/v1/convert/workpieces",
                "Upload a source .xlsx, download the workpiece import workbook",
            ),
            EndpointInfo::new(
                "POST",
                "/api/v1/preview",
                "Upload a source .xlsx, get the expanded record counts",
            ),
        ],
    };
    Json(ApiResponse::ok(response))
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub template_loaded: bool,
}

/// GET /health - Health check
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(HealthResponse {
        status: "healthy".to_string(),
        template_loaded: state.reference.is_some(),
    }))
}

/// Version response
#[derive(Serialize)]
pub struct VersionResponse {
    pub version: String,
    pub features: Vec<String>,
}

/// GET /version - Server version
pub async fn version(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(VersionResponse {
        version: state.version.clone(),
        features: vec![
            "convert_orders".to_string(),
            "convert_workpieces".to_string(),
            "preview".to_string(),
        ],
    }))
}

/// Preview response
#[derive(Serialize, Default, Debug, PartialEq, Eq)]
pub struct PreviewResponse {
    pub source_rows: usize,
    pub order_count: usize,
    pub workpiece_count: usize,
}

/// POST /api/v1/convert/orders - Download the order entry workbook
pub async fn convert_orders(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    match run_conversion(state, body).await {
        Ok(result) => attachment(result.order),
        Err(err) => error_response(err),
    }
}

/// POST /api/v1/convert/workpieces - Download the workpiece import workbook
pub async fn convert_workpieces(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    match run_conversion(state, body).await {
        Ok(result) => attachment(result.workpiece),
        Err(err) => error_response(err),
    }
}

/// POST /api/v1/preview - Expanded record counts
pub async fn preview(body: Bytes) -> Response {
    let job = tokio::task::spawn_blocking(move || -> Result<PreviewResponse, ConversionError> {
        let records = SourceImporter::new(&body)
            .import()
            .stage(Stage::ReadSource)?;
        let orders = deduplicate_orders(&records).stage(Stage::BuildOrders)?;
        let workpieces = expand_workpieces(&records).stage(Stage::BuildWorkpieces)?;
        Ok(PreviewResponse {
            source_rows: records.len(),
            order_count: orders.len(),
            workpiece_count: workpieces.len(),
        })
    })
    .await;

    match job {
        Ok(Ok(counts)) => Json(ApiResponse::ok(counts)).into_response(),
        Ok(Err(err)) => error_response(err),
        Err(join) => internal_error(join),
    }
}

async fn run_conversion(
    state: Arc<AppState>,
    body: Bytes,
) -> Result<ConversionResult, ConversionFailure> {
    if body.is_empty() {
        return Err(ConversionFailure::Conversion(ConversionError::new(
            Stage::ReadSource,
            ConvertError::Data("request body is empty; upload the source .xlsx".to_string()),
        )));
    }

    let reference = state.reference.clone();
    tokio::task::spawn_blocking(move || {
        let records = SourceImporter::new(&body)
            .import()
            .stage(Stage::ReadSource)?;
        match reference.as_deref() {
            Some(reference) => Converter::new(&records, reference).convert(),
            None => Converter::without_reference(&records).convert(),
        }
    })
    .await
    .map_err(ConversionFailure::Join)?
    .map_err(ConversionFailure::Conversion)
}

enum ConversionFailure {
    Conversion(ConversionError),
    Join(tokio::task::JoinError),
}

fn error_response(err: impl Into<ConversionFailure>) -> Response {
    match err.into() {
        ConversionFailure::Conversion(err) => {
            let status = if err.is_data_error() {
                StatusCode::UNPROCESSABLE_ENTITY
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            warn!(stage = %err.stage, error = %err.source, "conversion rejected");
            (status, Json(ApiResponse::<()>::err(err.to_string()))).into_response()
        }
        ConversionFailure::Join(join) => internal_error(join),
    }
}

impl From<ConversionError> for ConversionFailure {
    fn from(err: ConversionError) -> Self {
        ConversionFailure::Conversion(err)
    }
}

fn internal_error(join: tokio::task::JoinError) -> Response {
    warn!(error = %join, "conversion task failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::<()>::err(format!("conversion task failed: {}", join))),
    )
        .into_response()
}

/// xlsx download with an RFC 5987 filename and the record count header.
fn attachment(file: OutputFile) -> Response {
    info!(filename = %file.filename, records = file.record_count, "serving workbook");
    let disposition = format!(
        "attachment; filename*=UTF-8''{}",
        percent_encode(&file.filename)
    );
    let mut response = (StatusCode::OK, file.bytes).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(XLSX_CONTENT_TYPE));
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    headers.insert(RECORD_COUNT_HEADER, HeaderValue::from(file.record_count));
    response
}
