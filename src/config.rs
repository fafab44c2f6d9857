//! Layout configuration.
//!
//! Stored as a JSON object on disk; every field is optional:
//! ```json
//! {
//!   "header_rows": 10,
//!   "name_column": 2,
//!   "score_column": 165,
//!   "valid_range": { "min": 0, "max": 1000 }
//! }
//! ```
//! `"valid_range": null` disables range filtering.

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};
use std::path::Path;

use crate::pipeline::locator::RAW_HEADER_ROWS;
use crate::pipeline::types::{
    AnalysisScale, InputMode, PipelineOptions, PreprocessedLayout, RawLayout, ScoreRange,
};

/// Default score bounds of the raw layout for each scale.
pub fn default_range(scale: AnalysisScale) -> ScoreRange {
    match scale {
        AnalysisScale::Simce => ScoreRange::new(100.0, 400.0),
        AnalysisScale::Paes => ScoreRange::new(0.0, 1000.0),
    }
}

/// Which layout family the sheets follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeKind {
    Raw,
    Preprocessed,
}

/// Overrides applied on top of the defaults of a mode and scale.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutConfig {
    pub header_rows: Option<usize>,
    pub name_column: Option<usize>,
    pub score_column: Option<usize>,
    /// `Some(None)` when the file sets `valid_range` to `null`.
    #[serde(deserialize_with = "explicit_null")]
    pub valid_range: Option<Option<ScoreRange>>,
    pub name_label: Option<String>,
    pub score_labels: Option<Vec<String>>,
    pub canonical_score_label: Option<String>,
}

fn explicit_null<'de, D>(deserializer: D) -> std::result::Result<Option<Option<ScoreRange>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<ScoreRange>::deserialize(deserializer).map(Some)
}

impl LayoutConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read layout config {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("invalid layout config {}", path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: LayoutConfig = serde_json::from_str(content)?;
        if let Some(Some(range)) = config.valid_range {
            anyhow::ensure!(
                range.min <= range.max,
                "valid_range min {} is greater than max {}",
                range.min,
                range.max
            );
        }
        Ok(config)
    }

    /// Fills the fields still unset in `self` from `other`.
    pub fn or(self, other: LayoutConfig) -> LayoutConfig {
        LayoutConfig {
            header_rows: self.header_rows.or(other.header_rows),
            name_column: self.name_column.or(other.name_column),
            score_column: self.score_column.or(other.score_column),
            valid_range: self.valid_range.or(other.valid_range),
            name_label: self.name_label.or(other.name_label),
            score_labels: self.score_labels.or(other.score_labels),
            canonical_score_label: self.canonical_score_label.or(other.canonical_score_label),
        }
    }

    /// Set fields that the layout family `kind` does not read.
    pub fn ignored_fields(&self, kind: ModeKind) -> Vec<&'static str> {
        let fields = match kind {
            ModeKind::Raw => vec![
                ("name_label", self.name_label.is_some()),
                ("score_labels", self.score_labels.is_some()),
                ("canonical_score_label", self.canonical_score_label.is_some()),
            ],
            ModeKind::Preprocessed => vec![
                ("name_column", self.name_column.is_some()),
                ("score_column", self.score_column.is_some()),
            ],
        };
        fields
            .into_iter()
            .filter_map(|(field, set)| set.then_some(field))
            .collect()
    }

    /// Header rows to drop before the pipeline sees a sheet.
    pub fn header_rows(&self, kind: ModeKind) -> usize {
        self.header_rows.unwrap_or(match kind {
            ModeKind::Raw => RAW_HEADER_ROWS,
            ModeKind::Preprocessed => 0,
        })
    }

    /// Resolves the final pipeline options for `kind` and `scale`.
    pub fn resolve(&self, kind: ModeKind, scale: AnalysisScale) -> PipelineOptions {
        let (mode, fallback_range) = match kind {
            ModeKind::Raw => {
                let defaults = RawLayout::for_scale(scale);
                let layout = RawLayout {
                    name_column: self.name_column.unwrap_or(defaults.name_column),
                    score_column: self.score_column.unwrap_or(defaults.score_column),
                };
                (InputMode::Raw(layout), Some(default_range(scale)))
            }
            ModeKind::Preprocessed => {
                let defaults = PreprocessedLayout::default();
                let layout = PreprocessedLayout {
                    name_label: self.name_label.clone().unwrap_or(defaults.name_label),
                    score_labels: self.score_labels.clone().unwrap_or(defaults.score_labels),
                    canonical_score_label: self
                        .canonical_score_label
                        .clone()
                        .unwrap_or(defaults.canonical_score_label),
                };
                (InputMode::Preprocessed(layout), None)
            }
        };

        PipelineOptions {
            mode,
            scale,
            valid_range: self.valid_range.unwrap_or(fallback_range),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_defaults_follow_scale() {
        let options = LayoutConfig::default().resolve(ModeKind::Raw, AnalysisScale::Simce);
        assert_eq!(
            options.mode,
            InputMode::Raw(RawLayout {
                name_column: 2,
                score_column: 166,
            })
        );
        assert_eq!(options.valid_range, Some(ScoreRange::new(100.0, 400.0)));

        let options = LayoutConfig::default().resolve(ModeKind::Raw, AnalysisScale::Paes);
        assert_eq!(options.valid_range, Some(ScoreRange::new(0.0, 1000.0)));
    }

    #[test]
    fn test_preprocessed_has_no_range_by_default() {
        let config = LayoutConfig::default();
        let options = config.resolve(ModeKind::Preprocessed, AnalysisScale::Simce);
        assert_eq!(options.valid_range, None);
        assert_eq!(config.header_rows(ModeKind::Preprocessed), 0);
        assert_eq!(config.header_rows(ModeKind::Raw), 10);
    }

    #[test]
    fn test_json_overrides() {
        let config = LayoutConfig::from_json(
            r#"{ "score_column": 165, "valid_range": { "min": 0, "max": 1000 } }"#,
        )
        .unwrap();
        let options = config.resolve(ModeKind::Raw, AnalysisScale::Simce);

        assert_eq!(
            options.mode,
            InputMode::Raw(RawLayout {
                name_column: 2,
                score_column: 165,
            })
        );
        assert_eq!(options.valid_range, Some(ScoreRange::new(0.0, 1000.0)));
    }

    #[test]
    fn test_null_range_disables_filtering() {
        let config = LayoutConfig::from_json(r#"{ "valid_range": null }"#).unwrap();
        assert_eq!(config.valid_range, Some(None));
        let options = config.resolve(ModeKind::Raw, AnalysisScale::Simce);
        assert_eq!(options.valid_range, None);
    }

    #[test]
    fn test_missing_range_keeps_default() {
        let config = LayoutConfig::from_json("{}").unwrap();
        assert_eq!(config.valid_range, None);
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        let result = LayoutConfig::from_json(r#"{ "valid_range": { "min": 400, "max": 100 } }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        assert!(LayoutConfig::from_json(r#"{ "score_col": 3 }"#).is_err());
    }

    #[test]
    fn test_ignored_fields_per_layout() {
        let config = LayoutConfig {
            name_column: Some(1),
            score_column: Some(3),
            score_labels: Some(vec!["Puntaje".to_string()]),
            ..Default::default()
        };

        assert_eq!(
            config.ignored_fields(ModeKind::Preprocessed),
            ["name_column", "score_column"]
        );
        assert_eq!(config.ignored_fields(ModeKind::Raw), ["score_labels"]);
        assert!(LayoutConfig::default().ignored_fields(ModeKind::Raw).is_empty());
    }

    #[test]
    fn test_or_prefers_self() {
        let cli = LayoutConfig {
            score_column: Some(10),
            ..Default::default()
        };
        let file = LayoutConfig {
            score_column: Some(20),
            name_column: Some(1),
            ..Default::default()
        };

        let merged = cli.or(file);
        assert_eq!(merged.score_column, Some(10));
        assert_eq!(merged.name_column, Some(1));
    }
}
