//! Report shapes handed to the chart and summary renderers.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::pipeline::types::{
    AnalysisScale, PipelineOptions, PopulationResult, ScoreRange, SheetOutcome, Tier, TierCounts,
    WorkbookReport,
};

/// Title of the chart covering every processed sheet.
pub const POPULATION_TITLE: &str = "Total";

/// One bar of a tier chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartBar {
    pub tier: Tier,
    pub count: usize,
}

/// Category-count series over the three tiers, in ascending tier order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub title: String,
    pub bars: Vec<ChartBar>,
    /// Mean score shown as the chart caption.
    pub mean_score: f64,
}

impl ChartSeries {
    fn new(title: &str, counts: TierCounts, mean_score: f64) -> Self {
        Self {
            title: title.to_string(),
            bars: counts
                .series()
                .into_iter()
                .map(|(tier, count)| ChartBar { tier, count })
                .collect(),
            mean_score,
        }
    }
}

/// One series per processed sheet followed by the population series.
pub fn chart_series(report: &WorkbookReport) -> Vec<ChartSeries> {
    report
        .processed()
        .map(|s| ChartSeries::new(s.sheet_name(), s.tier_counts(), s.mean_score()))
        .chain(std::iter::once(ChartSeries::new(
            POPULATION_TITLE,
            report.population.tier_counts,
            report.population.mean_score,
        )))
        .collect()
}

/// Outcome of one sheet as listed in the summary index.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SheetSummaryEntry {
    Processed {
        sheet_name: String,
        score_label: String,
        records: usize,
        tier_counts: TierCounts,
        mean_score: f64,
        score_stddev: f64,
    },
    Skipped {
        sheet_name: String,
        reason: String,
    },
}

/// Top-level summary written as `summary.json`.
#[derive(Debug, Serialize)]
pub struct SummaryIndex {
    pub generated_at: DateTime<Utc>,
    pub scale: AnalysisScale,
    pub mode: &'static str,
    pub valid_range: Option<ScoreRange>,
    pub sheets: Vec<SheetSummaryEntry>,
    pub population: PopulationResult,
}

pub fn summary_index(
    report: &WorkbookReport,
    options: &PipelineOptions,
    generated_at: DateTime<Utc>,
) -> SummaryIndex {
    let sheets = report
        .sheets
        .iter()
        .map(|outcome| match outcome {
            SheetOutcome::Processed(s) => SheetSummaryEntry::Processed {
                sheet_name: s.sheet_name().to_string(),
                score_label: s.score_label().to_string(),
                records: s.records().len(),
                tier_counts: s.tier_counts(),
                mean_score: s.mean_score(),
                score_stddev: s.score_stddev(),
            },
            SheetOutcome::Skipped(s) => SheetSummaryEntry::Skipped {
                sheet_name: s.sheet_name.clone(),
                reason: s.reason.to_string(),
            },
        })
        .collect();

    SummaryIndex {
        generated_at,
        scale: options.scale,
        mode: options.mode.label(),
        valid_range: options.valid_range,
        sheets,
        population: report.population.clone(),
    }
}

/// Renders the printable summary as Markdown.
pub fn build_markdown(
    report: &WorkbookReport,
    options: &PipelineOptions,
    generated_at: DateTime<Utc>,
) -> String {
    let mut output = String::new();
    let population = &report.population;

    let _ = writeln!(output, "# {} Score Summary", options.scale);
    let _ = writeln!(
        output,
        "Generated {} ({} layout{})",
        generated_at.format("%Y-%m-%d %H:%M UTC"),
        options.mode.label(),
        match options.valid_range {
            Some(r) => format!(", scores {}-{}", r.min, r.max),
            None => String::new(),
        }
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Population");
    let _ = writeln!(
        output,
        "{} students across {} sheets, mean score {:.1}",
        population.record_count, population.sheet_count, population.mean_score
    );
    let _ = writeln!(output);
    for (tier, count) in population.tier_counts.series() {
        let _ = writeln!(
            output,
            "- {}: {} ({:.1}%)",
            tier,
            count,
            percent(count, population.record_count)
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Sheets");
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "| Sheet | Score column | Students | Insufficient | Intermediate | Adequate | Mean |"
    );
    let _ = writeln!(output, "|---|---|---|---|---|---|---|");
    for sheet in report.processed() {
        let counts = sheet.tier_counts();
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} | {} | {} | {:.1} |",
            sheet.sheet_name(),
            sheet.score_label(),
            sheet.records().len(),
            counts.insufficient,
            counts.intermediate,
            counts.adequate,
            sheet.mean_score()
        );
    }

    let skipped: Vec<_> = report.skipped().collect();
    if !skipped.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Warnings");
        for sheet in skipped {
            let _ = writeln!(output, "- Sheet '{}' skipped: {}", sheet.sheet_name, sheet.reason);
        }
    }

    output
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}
