use crate::config::{ConverterConfig, TemplateLocation};
use crate::core::{deduplicate_orders, expand_workpieces, Converter};
use crate::error::{ConvertError, ConvertResult, Stage, StageContext};
use crate::excel::{read_source_file, ReferenceWorkbook};
use crate::fetch::fetch_template;
use crate::types::{
    CellValue, OrderEntryRecord, WorkpieceRecord, ORDER_HEADERS, WORKPIECE_HEADERS,
};
use crate::workbook::{column_letter, SheetVisibility};
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Machine-readable summary printed by `convert --json`.
#[derive(Debug, Serialize)]
pub struct ConvertSummary {
    pub source: PathBuf,
    pub source_rows: usize,
    pub template: Option<String>,
    pub order_file: PathBuf,
    pub order_count: usize,
    pub workpiece_file: PathBuf,
    pub workpiece_count: usize,
}

/// Machine-readable summary printed by `preview --json`.
#[derive(Debug, Serialize)]
pub struct PreviewSummary {
    pub source_rows: usize,
    pub order_count: usize,
    pub workpiece_count: usize,
    pub orders: Vec<OrderEntryRecord>,
    pub workpieces: Vec<WorkpieceRecord>,
}

/// Pick the template: `--no-template` wins, then the flag/env value, then the config file.
pub fn resolve_template(
    flag: Option<&str>,
    no_template: bool,
    config: &ConverterConfig,
) -> ConvertResult<Option<TemplateLocation>> {
    if no_template {
        return Ok(None);
    }
    match flag {
        Some(value) => value.parse().map(Some),
        None => Ok(Some(config.template.clone())),
    }
}

/// Execute the convert command
#[allow(clippy::too_many_arguments)]
pub fn convert(
    source: PathBuf,
    template: Option<String>,
    no_template: bool,
    output_dir: Option<PathBuf>,
    config: Option<PathBuf>,
    json: bool,
    verbose: bool,
) -> ConvertResult<()> {
    ensure_xlsx(&source)?;
    let config = ConverterConfig::load_or_default(config.as_deref())?;
    let location = resolve_template(template.as_deref(), no_template, &config)?;
    let output_dir = output_dir.unwrap_or_else(|| config.output_dir.clone());

    if !json {
        println!("{}", "🔥 ymdd - Converting order master sheet".bold().green());
        println!("   Source:   {}", source.display());
        match &location {
            Some(location) => println!("   Template: {}", location),
            None => println!("   Template: {}", "(none)".yellow()),
        }
        println!("   Output:   {}\n", output_dir.display());
    }

    let reference = match &location {
        Some(location) => {
            if verbose && !json {
                println!("{}", "📥 Loading reference workbook...".cyan());
            }
            let bytes = fetch_template(location).stage(Stage::LoadTemplate)?;
            let reference = ReferenceWorkbook::from_bytes(&bytes).stage(Stage::LoadTemplate)?;
            if verbose && !json {
                println!("   Sheets: {}", reference.sheet_names().join(", "));
            }
            Some(reference)
        }
        None => None,
    };

    if verbose && !json {
        println!("{}", "📖 Reading source table...".cyan());
    }
    let records = read_source_file(&source).stage(Stage::ReadSource)?;
    if verbose && !json {
        println!("   Found {} data rows\n", records.len());
    }

    let converter = match &reference {
        Some(reference) => Converter::new(&records, reference),
        None => Converter::without_reference(&records),
    };
    let result = converter.convert()?;
    let (order_path, workpiece_path) = result.write_to_dir(&output_dir)?;

    if json {
        let summary = ConvertSummary {
            source,
            source_rows: records.len(),
            template: location.map(|l| l.to_string()),
            order_file: order_path,
            order_count: result.order.record_count,
            workpiece_file: workpiece_path,
            workpiece_count: result.workpiece.record_count,
        };
        print_json(&summary)?;
        return Ok(());
    }

    println!("{}", "✅ Conversion Complete!".bold().green());
    println!(
        "   📋 {} ({} rows)",
        order_path.display().to_string().bright_blue(),
        result.order.record_count.to_string().bold()
    );
    println!(
        "   🔩 {} ({} rows)",
        workpiece_path.display().to_string().bright_blue(),
        result.workpiece.record_count.to_string().bold()
    );
    println!();
    Ok(())
}

/// Execute the inspect command
pub fn inspect(template: String) -> ConvertResult<()> {
    let location: TemplateLocation = template.parse()?;
    println!("{}", "🔍 ymdd - Reference workbook".bold().green());
    println!("   Template: {}\n", location);

    let bytes = fetch_template(&location)?;
    let reference = ReferenceWorkbook::from_bytes(&bytes)?;

    println!("{}", "📊 Sheets:".bold().cyan());
    for name in reference.sheet_names() {
        let Some(sheet) = reference.sheet(name) else {
            continue;
        };
        let state = match sheet.visibility {
            SheetVisibility::Visible => "visible".green(),
            SheetVisibility::Hidden => "hidden".yellow(),
        };
        println!("   {} [{}]", name.bright_blue().bold(), state);
        println!(
            "      {} cells, {} rows, {} merged ranges, {} conditional formats",
            sheet.cells.len(),
            sheet.row_count(),
            sheet.merged_ranges.len(),
            sheet.conditional_formats.len()
        );
        if !sheet.merged_ranges.is_empty() {
            let merges: Vec<String> = sheet.merged_ranges.iter().map(|r| r.to_string()).collect();
            println!("      Merges: {}", merges.join(", "));
        }
        if !sheet.column_widths.is_empty() {
            let widths: Vec<String> = sheet
                .column_widths
                .iter()
                .map(|(col, width)| {
                    format!("{}={}", column_letter(*col), format_width(*width))
                })
                .collect();
            println!("      Widths: {}", widths.join(", "));
        }
        let used = sheet.referenced_styles();
        if !used.is_empty() {
            let used: Vec<&str> = used.into_iter().collect();
            println!("      Styles: {}", used.join(", "));
        }
    }

    println!();
    println!("{}", "🎨 Named styles:".bold().cyan());
    for style in reference.named_styles() {
        match style.builtin_id {
            Some(id) => println!("   {} (builtin {})", style.name.bright_blue(), id),
            None => println!("   {}", style.name.bright_blue()),
        }
    }
    println!();
    Ok(())
}

/// Execute the preview command
pub fn preview(source: PathBuf, limit: usize, json: bool) -> ConvertResult<()> {
    ensure_xlsx(&source)?;
    let records = read_source_file(&source)?;
    let orders = deduplicate_orders(&records)?;
    let workpieces = expand_workpieces(&records)?;

    if json {
        let summary = PreviewSummary {
            source_rows: records.len(),
            order_count: orders.len(),
            workpiece_count: workpieces.len(),
            orders: orders.iter().take(limit).cloned().collect(),
            workpieces: workpieces.iter().take(limit).cloned().collect(),
        };
        return print_json(&summary);
    }

    println!("{}", "👀 ymdd - Preview".bold().green());
    println!("   Source: {}", source.display());
    println!(
        "   {} source rows → {} orders, {} workpieces\n",
        records.len(),
        orders.len().to_string().bold(),
        workpieces.len().to_string().bold()
    );

    println!("{}", "📋 Order entry:".bold().cyan());
    println!("   {}", ORDER_HEADERS.join(" | ").bright_blue());
    for order in orders.iter().take(limit) {
        println!("   {}", join_row(&order.to_row()));
    }
    if orders.len() > limit {
        println!("   {}", format!("... {} more", orders.len() - limit).dimmed());
    }

    println!();
    println!("{}", "🔩 Workpieces:".bold().cyan());
    println!("   {}", WORKPIECE_HEADERS.join(" | ").bright_blue());
    for workpiece in workpieces.iter().take(limit) {
        println!("   {}", join_row(&workpiece.to_row()));
    }
    if workpieces.len() > limit {
        println!("   {}", format!("... {} more", workpieces.len() - limit).dimmed());
    }
    println!();
    Ok(())
}

fn join_row(row: &[CellValue]) -> String {
    row.iter()
        .map(|v| v.to_text().unwrap_or_default())
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Widths without trailing zeros: `12.5`, `8`.
fn format_width(width: f64) -> String {
    format!("{:.2}", width)
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

fn print_json<T: Serialize>(value: &T) -> ConvertResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| ConvertError::Workbook(format!("cannot serialize summary: {}", e)))?;
    println!("{}", text);
    Ok(())
}

fn ensure_xlsx(path: &Path) -> ConvertResult<()> {
    let is_xlsx = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("xlsx"));
    if is_xlsx {
        Ok(())
    } else {
        Err(ConvertError::Data(format!(
            "{} is not an .xlsx workbook",
            path.display()
        )))
    }
}
