//! Data types used by the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SheetError;
use crate::pipeline::locator::CANONICAL_SCORE_LABEL;
use crate::pipeline::utility::mean_and_stddev;

/// An untyped spreadsheet value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Dates, durations and spreadsheet error values.
    Other,
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Number(value as f64)
    }
}

/// One spreadsheet tab with its header rows already removed.
///
/// Column indices are absolute: index 0 is column A even when the used
/// range of the tab starts further to the right.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSheet {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

impl RawSheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    /// Returns the cell at `(row, col)`, treating anything past the end of a
    /// short row as empty.
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        const EMPTY: &Cell = &Cell::Empty;
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(EMPTY)
    }

    /// Number of columns of the widest row.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

/// A decoded workbook: sheets in workbook order.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    pub sheets: Vec<RawSheet>,
}

impl Workbook {
    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.iter().map(|s| s.name.as_str())
    }
}

/// Inclusive score bounds applied by the normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreRange {
    pub min: f64,
    pub max: f64,
}

impl ScoreRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, score: f64) -> bool {
        (self.min..=self.max).contains(&score)
    }
}

/// Fixed-offset extraction from an undeclared column layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawLayout {
    pub name_column: usize,
    pub score_column: usize,
}

/// Label-based extraction from a sheet whose first row declares the columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreprocessedLayout {
    pub name_label: String,
    /// Accepted labels for the score column, in lookup order.
    pub score_labels: Vec<String>,
    /// Label every accepted score label is normalized to.
    pub canonical_score_label: String,
}

/// How the Locator finds the name and score columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum InputMode {
    Raw(RawLayout),
    Preprocessed(PreprocessedLayout),
}

impl InputMode {
    pub fn label(&self) -> &'static str {
        match self {
            InputMode::Raw(_) => "raw",
            InputMode::Preprocessed(_) => "preprocessed",
        }
    }
}

/// Standardized-score scale used to classify records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AnalysisScale {
    Simce,
    Paes,
}

impl fmt::Display for AnalysisScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisScale::Simce => f.write_str("SIMCE"),
            AnalysisScale::Paes => f.write_str("PAES"),
        }
    }
}

/// Ordered performance tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    Insufficient,
    Intermediate,
    Adequate,
}

impl Tier {
    /// All tiers in ascending order.
    pub const ALL: [Tier; 3] = [Tier::Insufficient, Tier::Intermediate, Tier::Adequate];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Insufficient => "Insufficient",
            Tier::Intermediate => "Intermediate",
            Tier::Adequate => "Adequate",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Column positions resolved by the Locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedColumns {
    pub name: usize,
    pub score: usize,
    /// First row holding data (1 when the first row carries labels).
    pub data_start: usize,
    /// Canonical label the score column is reported under.
    pub score_label: String,
}

/// A single accepted row of a sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentRecord {
    pub name: String,
    pub score: f64,
    pub tier: Tier,
}

/// Number of records per tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TierCounts {
    pub insufficient: usize,
    pub intermediate: usize,
    pub adequate: usize,
}

impl TierCounts {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a StudentRecord>) -> Self {
        let mut counts = TierCounts::default();
        for record in records {
            counts.increment(record.tier);
        }
        counts
    }

    fn increment(&mut self, tier: Tier) {
        match tier {
            Tier::Insufficient => self.insufficient += 1,
            Tier::Intermediate => self.intermediate += 1,
            Tier::Adequate => self.adequate += 1,
        }
    }

    pub fn get(&self, tier: Tier) -> usize {
        match tier {
            Tier::Insufficient => self.insufficient,
            Tier::Intermediate => self.intermediate,
            Tier::Adequate => self.adequate,
        }
    }

    pub fn total(&self) -> usize {
        self.insufficient + self.intermediate + self.adequate
    }

    /// Counts in ascending tier order.
    pub fn series(&self) -> [(Tier, usize); 3] {
        Tier::ALL.map(|tier| (tier, self.get(tier)))
    }
}

/// Cleaned records of one sheet with statistics derived from them.
///
/// The statistics are only computed in [`SheetResult::new`], so they always
/// agree with `records`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetResult {
    sheet_name: String,
    score_label: String,
    records: Vec<StudentRecord>,
    tier_counts: TierCounts,
    mean_score: f64,
    score_stddev: f64,
}

impl SheetResult {
    pub fn new(sheet_name: impl Into<String>, records: Vec<StudentRecord>) -> Self {
        let tier_counts = TierCounts::from_records(&records);
        let (mean_score, score_stddev) = mean_and_stddev(records.iter().map(|r| r.score));
        Self {
            sheet_name: sheet_name.into(),
            score_label: CANONICAL_SCORE_LABEL.to_string(),
            mean_score,
            score_stddev,
            tier_counts,
            records,
        }
    }

    /// Replaces the label the score column is reported under.
    pub fn with_score_label(mut self, label: impl Into<String>) -> Self {
        self.score_label = label.into();
        self
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    pub fn score_label(&self) -> &str {
        &self.score_label
    }

    pub fn records(&self) -> &[StudentRecord] {
        &self.records
    }

    pub fn tier_counts(&self) -> TierCounts {
        self.tier_counts
    }

    pub fn mean_score(&self) -> f64 {
        self.mean_score
    }

    pub fn score_stddev(&self) -> f64 {
        self.score_stddev
    }
}

/// A sheet that produced no records, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedSheet {
    pub sheet_name: String,
    #[serde(serialize_with = "serialize_reason")]
    pub reason: SheetError,
}

fn serialize_reason<S: serde::Serializer>(reason: &SheetError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(reason)
}

/// Result of running the pipeline over one sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SheetOutcome {
    Processed(SheetResult),
    Skipped(SkippedSheet),
}

impl SheetOutcome {
    pub fn sheet_name(&self) -> &str {
        match self {
            SheetOutcome::Processed(result) => result.sheet_name(),
            SheetOutcome::Skipped(skipped) => &skipped.sheet_name,
        }
    }

    pub fn as_processed(&self) -> Option<&SheetResult> {
        match self {
            SheetOutcome::Processed(result) => Some(result),
            SheetOutcome::Skipped(_) => None,
        }
    }

    pub fn as_skipped(&self) -> Option<&SkippedSheet> {
        match self {
            SheetOutcome::Skipped(skipped) => Some(skipped),
            SheetOutcome::Processed(_) => None,
        }
    }
}

/// Population-wide statistics over every processed sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopulationResult {
    pub tier_counts: TierCounts,
    pub mean_score: f64,
    pub score_stddev: f64,
    pub sheet_count: usize,
    pub record_count: usize,
}

/// Per-invocation pipeline settings.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    pub mode: InputMode,
    pub scale: AnalysisScale,
    pub valid_range: Option<ScoreRange>,
}

/// Complete pipeline output for one workbook.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkbookReport {
    pub sheets: Vec<SheetOutcome>,
    pub population: PopulationResult,
}

impl WorkbookReport {
    pub fn processed(&self) -> impl Iterator<Item = &SheetResult> {
        self.sheets.iter().filter_map(SheetOutcome::as_processed)
    }

    pub fn skipped(&self) -> impl Iterator<Item = &SkippedSheet> {
        self.sheets.iter().filter_map(SheetOutcome::as_skipped)
    }
}
