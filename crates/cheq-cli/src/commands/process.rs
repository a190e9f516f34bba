//! Process command - extract cheque fields from a token layout.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::{debug, info};

use cheq_core::cheque::rules::format_amount;
use cheq_core::{ChequeExtractionResult, ChequeExtractor, ChequeParser, FieldExtractionResult};

use super::{load_config, InputArgs};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Year two-digit years resolve against (default: current year)
    #[arg(long)]
    reference_year: Option<i32>,

    /// Show extraction confidence scores
    #[arg(long)]
    show_confidence: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

pub fn run(args: ProcessArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = load_config(config_path)?;
    let layout = args.input.load_layout()?;

    info!("Processing file: {}", args.input.input.display());

    let mut parser = ChequeParser::new(config);
    if let Some(year) = args.reference_year {
        parser = parser.with_reference_year(year);
    }

    let result = parser.extract(&layout)?;

    let source = args.input.input.display().to_string();
    let output = format_result(&result, &source, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if args.show_confidence {
        println!();
        for field in result.fields() {
            println!(
                "{} {}: {:.1}%",
                style("ℹ").blue(),
                field.field,
                field.confidence * 100.0
            );
        }
        println!(
            "{} Overall confidence: {:.1}%",
            style("ℹ").blue(),
            result.overall_confidence * 100.0
        );
        if let Some(time_ms) = result.metadata.processing_time_ms {
            println!("{} Processing time: {}ms", style("ℹ").blue(), time_ms);
        }
    }

    if result.needs_review() {
        eprintln!(
            "{} Verdict: {} ({} flags)",
            style("!").yellow(),
            result.verdict,
            result.flags.len()
        );
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

fn format_result(result: &ChequeExtractionResult, source: &str, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(result)?),
        OutputFormat::Csv => format_csv(result, source),
        OutputFormat::Text => Ok(format_text(result)),
    }
}

fn format_csv(result: &ChequeExtractionResult, source: &str) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.serialize(result.to_record(source))?;
    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn field_line(label: &str, field: &FieldExtractionResult) -> String {
    let value = match (&field.value, &field.raw_text) {
        (Some(value), _) => value.to_string(),
        (None, Some(raw)) => format!("'{}' (unreadable)", raw),
        (None, None) => "-".to_string(),
    };
    format!("{:<15}{}\n", format!("{}:", label), value)
}

fn format_text(result: &ChequeExtractionResult) -> String {
    let mut output = String::new();

    output.push_str(&field_line("Payee", &result.payee));

    let amount = result
        .amount
        .value
        .map(format_amount)
        .unwrap_or_else(|| "-".to_string());
    let agreement = match result.amount.consistent {
        Some(true) => " (numeric and written agree)",
        Some(false) => " (numeric and written DISAGREE)",
        None => "",
    };
    output.push_str(&format!("{:<15}{}{}\n", "Amount:", amount, agreement));
    output.push_str(&field_line("  Numeric", &result.amount.numeric));
    output.push_str(&field_line("  Written", &result.amount.written));

    output.push_str(&field_line("Date", &result.date));
    output.push_str(&field_line("Cheque number", &result.cheque_number));
    output.push('\n');

    output.push_str(&format!(
        "{:<15}{} (confidence {:.1}%)\n",
        "Verdict:",
        result.verdict,
        result.overall_confidence * 100.0
    ));

    if !result.flags.is_empty() {
        output.push_str("Flags:\n");
        for flag in &result.flags {
            output.push_str(&format!("  - {}\n", flag));
        }
    }

    output
}
