use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use ymdd_convert::cli;

#[derive(Parser)]
#[command(name = "ymdd")]
#[command(about = "Order master sheet → order entry and workpiece import workbooks")]
#[command(long_about = "ymdd - Order master sheet converter

Reads an order master sheet (.xlsx) and produces two import workbooks:
  订单录入结果_<timestamp>.xlsx  - one row per production order
  工件导入结果_<timestamp>.xlsx  - one row per workpiece, accessories expanded

Both outputs carry a hidden 'page' sheet copied from the reference workbook
with its formatting intact.

COMMANDS:
  convert  - Convert a source sheet and write both workbooks
  preview  - Show what a conversion would produce, without writing files
  inspect  - List the sheets and named styles of a reference workbook

EXAMPLES:
  ymdd convert 订单总表.xlsx                       # template 隐藏表格.xlsx in cwd
  ymdd convert 订单总表.xlsx -t ref.xlsx -o out/
  ymdd convert 订单总表.xlsx --config ymdd.yaml --json
  ymdd preview 订单总表.xlsx --limit 5
  ymdd inspect 隐藏表格.xlsx

Logging: set RUST_LOG (e.g. RUST_LOG=ymdd_convert=debug).")]
#[command(version)]
struct Cli {
    /// Show verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(long_about = "Convert an order master sheet into the two import workbooks.

The template (reference workbook) must contain the sheets 'page' and 'page2'.
It is resolved in this order:
  1. --no-template        (outputs carry no hidden sheet)
  2. --template / YMDD_TEMPLATE  (local path or http(s) URL)
  3. 'template' in the config file (path, url or github)
  4. 隐藏表格.xlsx in the working directory

Nothing is written unless both workbooks are built successfully.")]
    /// Convert a source sheet and write both workbooks
    Convert {
        /// Source order master sheet (.xlsx)
        source: PathBuf,

        /// Reference workbook: local path or http(s) URL
        #[arg(short, long, env = "YMDD_TEMPLATE")]
        template: Option<String>,

        /// Do not copy a reference sheet into the outputs
        #[arg(long, conflicts_with = "template")]
        no_template: bool,

        /// Directory the two workbooks are written to
        #[arg(short, long, env = "YMDD_OUTPUT_DIR")]
        output_dir: Option<PathBuf>,

        /// YAML config file
        #[arg(short, long, env = "YMDD_CONFIG")]
        config: Option<PathBuf>,

        /// Print a JSON summary instead of the coloured report
        #[arg(long)]
        json: bool,
    },

    /// Show expanded rows without writing files
    Preview {
        /// Source order master sheet (.xlsx)
        source: PathBuf,

        /// Rows to show per workbook
        #[arg(short, long, default_value_t = 10)]
        limit: usize,

        /// Print JSON instead of tables
        #[arg(long)]
        json: bool,
    },

    /// List the sheets and named styles of a reference workbook
    Inspect {
        /// Reference workbook: local path or http(s) URL
        template: String,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "ymdd_convert=info"
    } else {
        "ymdd_convert=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Convert {
            source,
            template,
            no_template,
            output_dir,
            config,
            json,
        } => cli::convert(
            source,
            template,
            no_template,
            output_dir,
            config,
            json,
            cli.verbose,
        ),

        Commands::Preview {
            source,
            limit,
            json,
        } => cli::preview(source, limit, json),

        Commands::Inspect { template } => cli::inspect(template),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "❌ Error:".bold().red(), e);
            ExitCode::FAILURE
        }
    }
}
