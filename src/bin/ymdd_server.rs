//! ymdd API Server binary
//!
//! Upload an order master sheet, download the converted workbooks.

use clap::Parser;
use std::path::PathBuf;
use ymdd_convert::api::{run_api_server, ApiConfig};
use ymdd_convert::cli::resolve_template;
use ymdd_convert::config::ConverterConfig;

#[derive(Parser, Debug)]
#[command(name = "ymdd-server")]
#[command(version)]
#[command(about = "ymdd API Server - order master sheet conversion over HTTP")]
#[command(long_about = r#"
ymdd API Server - order master sheet conversion over HTTP

Endpoints (request body = the source .xlsx):
  - POST /api/v1/convert/orders      - Download 订单录入结果_<timestamp>.xlsx
  - POST /api/v1/convert/workpieces  - Download 工件导入结果_<timestamp>.xlsx
  - POST /api/v1/preview             - JSON record counts

Additional endpoints:
  - GET  /health           - Health check
  - GET  /version          - Server version info
  - GET  /                 - API documentation

The reference workbook is loaded once at startup. Data errors answer 422,
internal failures 500, both with a JSON body carrying a request id.

Example usage:
  ymdd-server                                  # localhost:8080, ./隐藏表格.xlsx
  ymdd-server --host 0.0.0.0 --port 3000 -t https://host/隐藏表格.xlsx

  curl -X POST http://localhost:8080/api/v1/convert/orders \
    --data-binary @订单总表.xlsx -OJ
"#)]
struct Args {
    /// Host address to bind to (use 0.0.0.0 for all interfaces)
    #[arg(short = 'H', long, default_value = "127.0.0.1", env = "YMDD_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "YMDD_PORT")]
    port: u16,

    /// Reference workbook: local path or http(s) URL
    #[arg(short, long, env = "YMDD_TEMPLATE")]
    template: Option<String>,

    /// Serve outputs without the hidden reference sheet
    #[arg(long, conflicts_with = "template")]
    no_template: bool,

    /// YAML config file
    #[arg(short, long, env = "YMDD_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let file_config = ConverterConfig::load_or_default(args.config.as_deref())?;
    let template = resolve_template(args.template.as_deref(), args.no_template, &file_config)?;

    let config = ApiConfig {
        host: args.host,
        port: args.port,
        template,
    };

    run_api_server(config).await
}
