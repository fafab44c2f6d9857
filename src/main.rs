//! CLI entry point for the score sheet rater.
//!
//! Extracts student scores from multi-sheet workbooks, classifies them into
//! tiers and writes the tables, chart series and summaries for reporting.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use score_sheet_rater::config::{LayoutConfig, ModeKind};
use score_sheet_rater::error::PipelineError;
use score_sheet_rater::output::{export_tables, write_json};
use score_sheet_rater::pipeline::process_workbook;
use score_sheet_rater::pipeline::types::{AnalysisScale, ScoreRange};
use score_sheet_rater::report::{build_markdown, chart_series, summary_index};
use score_sheet_rater::workbook::load_workbook;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "score_sheet_rater")]
#[command(about = "Extract and classify student scores from spreadsheet workbooks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    /// Fixed column offsets with header rows (nómina export)
    Raw,
    /// Labelled columns in the first row
    Preprocessed,
}

impl From<ModeArg> for ModeKind {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Raw => ModeKind::Raw,
            ModeArg::Preprocessed => ModeKind::Preprocessed,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ScaleArg {
    Simce,
    Paes,
}

impl From<ScaleArg> for AnalysisScale {
    fn from(scale: ScaleArg) -> Self {
        match scale {
            ScaleArg::Simce => AnalysisScale::Simce,
            ScaleArg::Paes => AnalysisScale::Paes,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Extract, classify and export the scores of a workbook
    Extract {
        /// Path to the spreadsheet
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Directory for the exported tables and summaries
        #[arg(short, long, default_value = "out")]
        output_dir: PathBuf,

        /// Column layout of the sheets
        #[arg(short, long, value_enum, default_value_t = ModeArg::Raw)]
        mode: ModeArg,

        /// Classification scale
        #[arg(short, long, value_enum, default_value_t = ScaleArg::Simce)]
        scale: ScaleArg,

        /// Optional: JSON layout config
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Leading rows to skip in every sheet
        #[arg(long)]
        header_rows: Option<usize>,

        /// Zero-based index of the name column (raw layout)
        #[arg(long)]
        name_column: Option<usize>,

        /// Zero-based index of the score column (raw layout)
        #[arg(long)]
        score_column: Option<usize>,

        /// Lowest accepted score
        #[arg(long, requires = "max_score", conflicts_with = "no_range_check")]
        min_score: Option<f64>,

        /// Highest accepted score
        #[arg(long, requires = "min_score", conflicts_with = "no_range_check")]
        max_score: Option<f64>,

        /// Accept every numeric score regardless of range
        #[arg(long, default_value_t = false)]
        no_range_check: bool,

        /// Gzip compress the exported CSV tables
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// List the sheets of a workbook with their dimensions
    Inspect {
        /// Path to the spreadsheet
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/score_sheet_rater.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("score_sheet_rater.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Extract {
            input,
            output_dir,
            mode,
            scale,
            config,
            header_rows,
            name_column,
            score_column,
            min_score,
            max_score,
            no_range_check,
            gzip,
        } => {
            let valid_range = match (no_range_check, min_score, max_score) {
                (true, _, _) => Some(None),
                (false, Some(min), Some(max)) => {
                    anyhow::ensure!(min <= max, "--min-score {min} is greater than --max-score {max}");
                    Some(Some(ScoreRange::new(min, max)))
                }
                _ => None,
            };
            let overrides = LayoutConfig {
                header_rows,
                name_column,
                score_column,
                valid_range,
                ..Default::default()
            };
            let layout = match config {
                Some(path) => overrides.or(LayoutConfig::load(&path)?),
                None => overrides,
            };

            extract(&input, &output_dir, &layout, mode.into(), scale.into(), gzip)?;
        }
        Commands::Inspect { input } => inspect(&input)?,
    }

    Ok(())
}

/// Runs the pipeline over `input` and writes every report artifact.
#[tracing::instrument(skip(input, output_dir, layout), fields(input = %input.display(), output_dir = %output_dir.display()))]
fn extract(
    input: &Path,
    output_dir: &Path,
    layout: &LayoutConfig,
    kind: ModeKind,
    scale: AnalysisScale,
    gzip: bool,
) -> Result<()> {
    for field in layout.ignored_fields(kind) {
        warn!(field, mode = ?kind, "Layout setting has no effect in this mode");
    }

    let options = layout.resolve(kind, scale);
    let header_rows = layout.header_rows(kind);
    info!(
        mode = options.mode.label(),
        %scale,
        header_rows,
        valid_range = ?options.valid_range,
        "Loading workbook"
    );

    let workbook = load_workbook(input, header_rows)?;

    let report = match process_workbook(&workbook, &options) {
        Ok(report) => report,
        Err(PipelineError::NoValidData { skipped }) => {
            for sheet in &skipped {
                warn!(sheet = %sheet.sheet_name, reason = %sheet.reason, "Sheet skipped");
            }
            anyhow::bail!(PipelineError::NoValidData { skipped });
        }
        Err(e) => return Err(e.into()),
    };
    drop(workbook);

    let generated_at = Utc::now();
    let tables = export_tables(output_dir, &report, gzip)?;

    write_json(&output_dir.join("charts.json"), &chart_series(&report))?;
    write_json(
        &output_dir.join("summary.json"),
        &summary_index(&report, &options, generated_at),
    )?;
    std::fs::write(
        output_dir.join("summary.md"),
        build_markdown(&report, &options, generated_at),
    )
    .context("failed to write summary.md")?;

    info!(
        tables = tables.len(),
        skipped = report.skipped().count(),
        students = report.population.record_count,
        mean_score = report.population.mean_score,
        "Extraction complete"
    );
    Ok(())
}

/// Logs the sheets of `input` with their dimensions.
#[tracing::instrument(skip(input), fields(input = %input.display()))]
fn inspect(input: &Path) -> Result<()> {
    let workbook = load_workbook(input, 0)?;

    for sheet in &workbook.sheets {
        info!(
            sheet = %sheet.name,
            rows = sheet.rows.len(),
            columns = sheet.width(),
            "Sheet"
        );
    }

    let empty = workbook.sheets.iter().filter(|s| s.rows.is_empty()).count();
    info!(
        total = workbook.sheets.len(),
        empty,
        sheets = ?workbook.sheet_names().collect::<Vec<_>>(),
        "Workbook summary"
    );
    Ok(())
}
