//! ymdd API Server implementation
//!
//! HTTP REST API server using Axum: upload an order master sheet, download
//! either converted workbook.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::handlers;
use crate::config::TemplateLocation;
use crate::excel::ReferenceWorkbook;
use crate::fetch::fetch_template;

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// API Server configuration
#[derive(Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    /// Reference workbook loaded once at startup; `None` serves outputs without the hidden sheet
    pub template: Option<TemplateLocation>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            template: Some(TemplateLocation::default()),
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub version: String,
    pub reference: Option<Arc<ReferenceWorkbook>>,
}

impl AppState {
    pub fn new(reference: Option<ReferenceWorkbook>) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            reference: reference.map(Arc::new),
        }
    }
}

/// Routes and middleware, without binding a socket.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any);

    Router::new()
        // Health and info endpoints
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/version", get(handlers::version))
        // Conversion endpoints
        .route("/api/v1/convert/orders", post(handlers::convert_orders))
        .route("/api/v1/convert/workpieces", post(handlers::convert_workpieces))
        .route("/api/v1/preview", post(handlers::preview))
        .with_state(Arc::new(state))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Run the API server
pub async fn run_api_server(config: ApiConfig) -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ymdd_convert=info,tower_http=info".into()),
        )
        .try_init();

    let reference = match &config.template {
        Some(location) => {
            let location = location.clone();
            let reference = tokio::task::spawn_blocking(move || {
                fetch_template(&location).and_then(|bytes| ReferenceWorkbook::from_bytes(&bytes))
            })
            .await??;
            info!(sheets = ?reference.sheet_names(), "reference workbook loaded");
            Some(reference)
        }
        None => {
            warn!("no reference workbook configured; outputs will have no hidden sheet");
            None
        }
    };

    let app = router(AppState::new(reference));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("🔥 ymdd API Server starting on http://{}", addr);
    info!("   Endpoints: /api/v1/convert/orders, /api/v1/convert/workpieces, /api/v1/preview");
    info!("   Health: /health, Version: /version");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("ymdd API Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping server...");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.template, Some(TemplateLocation::default()));
    }

    #[test]
    fn test_config_address_format() {
        let config = ApiConfig {
            host: "192.168.1.100".to_string(),
            port: 9090,
            template: None,
        };
        let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse().unwrap();
        assert_eq!(addr.port(), 9090);
    }

    #[test]
    fn test_app_state_version() {
        let state = AppState::new(None);
        assert_eq!(state.version, env!("CARGO_PKG_VERSION"));
        assert!(state.reference.is_none());
    }

    #[tokio::test]
    async fn test_missing_template_fails_startup() {
        let config = ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            template: Some(TemplateLocation::Path {
                path: "/nonexistent/隐藏表格.xlsx".into(),
            }),
        };
        assert!(run_api_server(config).await.is_err());
    }
}
