//! CLI entry point for the EDA toolkit.

use anyhow::{Result, anyhow};
use clap::{Parser, ValueEnum};
use lex_eda::{
    CorrelationMethod, Eda, EdaConfig, EdaOutput, Palette, ReportGenerator, Table, TableInput,
    Theme,
};
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// CLI-compatible theme enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliTheme {
    Whitegrid,
    Darkgrid,
    White,
    Dark,
    Ticks,
}

impl From<CliTheme> for Theme {
    fn from(cli: CliTheme) -> Self {
        match cli {
            CliTheme::Whitegrid => Theme::WhiteGrid,
            CliTheme::Darkgrid => Theme::DarkGrid,
            CliTheme::White => Theme::White,
            CliTheme::Dark => Theme::Dark,
            CliTheme::Ticks => Theme::Ticks,
        }
    }
}

/// CLI-compatible palette enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliPalette {
    Deep,
    Muted,
    Pastel,
    Bright,
    Dark,
    Colorblind,
}

impl From<CliPalette> for Palette {
    fn from(cli: CliPalette) -> Self {
        match cli {
            CliPalette::Deep => Palette::Deep,
            CliPalette::Muted => Palette::Muted,
            CliPalette::Pastel => Palette::Pastel,
            CliPalette::Bright => Palette::Bright,
            CliPalette::Dark => Palette::Dark,
            CliPalette::Colorblind => Palette::Colorblind,
        }
    }
}

/// CLI-compatible correlation method enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliCorrelation {
    /// Linear correlation
    Pearson,
    /// Rank correlation
    Spearman,
}

impl From<CliCorrelation> for CorrelationMethod {
    fn from(cli: CliCorrelation) -> Self {
        match cli {
            CliCorrelation::Pearson => CorrelationMethod::Pearson,
            CliCorrelation::Spearman => CorrelationMethod::Spearman,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    author = "Lex Machina Team",
    version,
    about = "Exploratory data analysis: summaries, plots and a PDF report",
    long_about = "Summarize a tabular dataset, render the standard plot battery and \
                  write a paginated data summary report.\n\n\
                  EXAMPLES:\n  \
                  # Plots and report into ./outputs\n  \
                  lex-eda -i data.csv\n\n  \
                  # Named dataset, some columns left out\n  \
                  lex-eda -i titanic.csv --name Titanic --exclude Name,Ticket\n\n  \
                  # Summary only, as JSON on stdout\n  \
                  lex-eda -i data.json --json"
)]
struct Args {
    /// Path to the CSV, JSON or Parquet file to analyze
    #[arg(short, long)]
    input: String,

    /// Output directory for figures and reports
    #[arg(short, long, default_value = "./outputs")]
    output: String,

    /// Dataset name shown in the report header
    ///
    /// Defaults to the input file name without extension
    #[arg(long)]
    name: Option<String>,

    /// Comma-separated columns to leave out of the plots and feature listing
    #[arg(long, value_delimiter = ',')]
    exclude: Vec<String>,

    /// Plot theme
    #[arg(long, value_enum, default_value = "whitegrid")]
    theme: CliTheme,

    /// Plot color palette
    #[arg(long, value_enum, default_value = "deep")]
    palette: CliPalette,

    /// Font size multiplier for figures
    #[arg(long, default_value = "1.2")]
    font_scale: f64,

    /// TrueType font for figure text, also embedded in the PDF report
    #[arg(long)]
    font: Option<PathBuf>,

    /// Correlation coefficient for the correlation matrix
    #[arg(long, value_enum, default_value = "pearson")]
    correlation: CliCorrelation,

    /// Skip the plot battery
    #[arg(long)]
    no_plots: bool,

    /// Skip the PDF report
    #[arg(long)]
    no_report: bool,

    /// Also write the report as Markdown
    #[arg(long)]
    markdown: bool,

    /// Print the summary as JSON to stdout and write nothing else
    ///
    /// Disables all logs so the output can be piped: `... --json | jq .shape`
    #[arg(long)]
    json: bool,

    /// Write summary.json to the output directory
    #[arg(long)]
    emit_summary: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Only show warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, args.quiet, args.json);

    if !Path::new(&args.input).exists() {
        return Err(anyhow!("Input file not found: {}", args.input));
    }

    let config = build_config(&args)?;
    let eda = Eda::new(config);

    info!("Loading dataset from: {}", args.input);
    let table = eda.load(TableInput::from_path(&args.input)?)?;
    info!("Dataset loaded successfully: {:?}", table.frame().shape());

    if args.json {
        let snapshot = ReportGenerator::new(&table, eda.config()).snapshot()?;
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    let output = match eda.run(&table) {
        Ok(output) => output,
        Err(e) => {
            error!("EDA failed: {}", e);
            return Err(anyhow!("EDA failed: {}", e));
        }
    };

    if args.emit_summary {
        let path = ReportGenerator::new(&table, eda.config()).write_summary_json()?;
        info!("Summary written to: {}", path.display());
    }

    print_human_readable_summary(&table, &output, eda.config());
    Ok(())
}

fn build_config(args: &Args) -> Result<EdaConfig> {
    let name = args
        .name
        .clone()
        .unwrap_or_else(|| extract_file_stem(&args.input));

    let mut builder = EdaConfig::builder()
        .output_dir(&args.output)
        .dataset_name(name)
        .exclude_columns(args.exclude.iter().map(|c| c.trim().to_string()))
        .theme(args.theme.into())
        .palette(args.palette.into())
        .font_scale(args.font_scale)
        .correlation_method(args.correlation.into())
        .generate_plots(!args.no_plots)
        .generate_report(!args.no_report)
        .generate_markdown(args.markdown);

    if let Some(ref font) = args.font {
        builder = builder.font_path(font);
    }

    Ok(builder.build()?)
}

/// Extract the file stem (name without extension) from a path.
fn extract_file_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Dataset")
        .to_string()
}

/// Print what was written.
///
/// Uses `println!` on purpose: this is the command's output, not a log line.
fn print_human_readable_summary(table: &Table, output: &EdaOutput, config: &EdaConfig) {
    println!();
    println!("{}", "=".repeat(80));
    println!("EDA COMPLETE: {}", config.dataset_name);
    println!("{}", "=".repeat(80));
    println!();
    println!("Rows: {}  Columns: {}", table.height(), table.width());
    println!(
        "Numeric: {}  Categorical: {}  Datetime: {}",
        table.numeric_columns().len(),
        table.categorical_columns().len(),
        table.datetime_columns().len()
    );
    println!();

    if let Some(plots) = &output.plots {
        println!("Figures: {} written to {}", plots.paths.len(), config.output_dir.display());
        if !plots.skipped.is_empty() {
            println!("  skipped: {}", plots.skipped.join(", "));
        }
    }
    if let Some(report) = &output.report {
        println!("Report: {}", report.display());
    }
    if let Some(markdown) = &output.markdown {
        println!("Markdown: {}", markdown.display());
    }
    println!();
    println!("Use --json for machine-readable output");
    println!("{}", "=".repeat(80));
}
