use tracing::{debug, info, info_span, warn};

use crate::error::{PipelineError, SheetError};
use crate::pipeline::classify::classify;
use crate::pipeline::locator::locate;
use crate::pipeline::normalize::normalize;
use crate::pipeline::types::{
    AnalysisScale, InputMode, PipelineOptions, PopulationResult, RawSheet, ScoreRange,
    SheetOutcome, SheetResult, SkippedSheet, StudentRecord, TierCounts, Workbook, WorkbookReport,
};
use crate::pipeline::utility::mean_and_stddev;

/// Runs Locator → Normalizer → Classifier over a single sheet.
///
/// Failures are returned as [`SheetOutcome::Skipped`] rather than errors so
/// one bad sheet never stops the rest of the workbook.
pub fn process_sheet(
    sheet: &RawSheet,
    mode: &InputMode,
    scale: AnalysisScale,
    valid_range: Option<ScoreRange>,
) -> SheetOutcome {
    match build_sheet(sheet, mode, scale, valid_range) {
        Ok(result) => SheetOutcome::Processed(result),
        Err(reason) => SheetOutcome::Skipped(SkippedSheet {
            sheet_name: sheet.name.clone(),
            reason,
        }),
    }
}

fn build_sheet(
    sheet: &RawSheet,
    mode: &InputMode,
    scale: AnalysisScale,
    valid_range: Option<ScoreRange>,
) -> Result<SheetResult, SheetError> {
    let columns = locate(sheet, mode)?;
    let rows = normalize(sheet, &columns, valid_range);
    if rows.is_empty() {
        return Err(SheetError::NoValidRows);
    }

    let dropped = sheet.rows.len().saturating_sub(columns.data_start) - rows.len();
    debug!(kept = rows.len(), dropped, "Rows normalized");

    let records = rows
        .into_iter()
        .map(|(name, score)| StudentRecord {
            tier: classify(score, scale),
            name,
            score,
        })
        .collect();

    Ok(SheetResult::new(sheet.name.clone(), records).with_score_label(columns.score_label))
}

/// Combines every processed sheet into population-wide statistics.
///
/// The mean is taken over all records, so larger sheets weigh more.
///
/// # Errors
///
/// Returns [`PipelineError::NoValidData`] when `sheets` is empty.
pub fn aggregate(sheets: &[SheetResult]) -> Result<PopulationResult, PipelineError> {
    if sheets.is_empty() {
        return Err(PipelineError::NoValidData {
            skipped: Vec::new(),
        });
    }

    let records = || sheets.iter().flat_map(|s| s.records());
    let (mean_score, score_stddev) = mean_and_stddev(records().map(|r| r.score));

    Ok(PopulationResult {
        tier_counts: TierCounts::from_records(records()),
        mean_score,
        score_stddev,
        sheet_count: sheets.len(),
        record_count: records().count(),
    })
}

/// Processes every sheet of `workbook` in order and aggregates the results.
///
/// # Errors
///
/// Returns [`PipelineError::NoValidData`], carrying every skipped sheet,
/// when no sheet yields a record.
pub fn process_workbook(
    workbook: &Workbook,
    options: &PipelineOptions,
) -> Result<WorkbookReport, PipelineError> {
    let mut outcomes = Vec::with_capacity(workbook.sheets.len());

    for sheet in &workbook.sheets {
        let span = info_span!("process_sheet", sheet = %sheet.name);
        let _enter = span.enter();

        let outcome = process_sheet(sheet, &options.mode, options.scale, options.valid_range);
        match &outcome {
            SheetOutcome::Processed(result) => info!(
                records = result.records().len(),
                mean_score = result.mean_score(),
                "Sheet processed"
            ),
            SheetOutcome::Skipped(skipped) => {
                warn!(reason = %skipped.reason, "Sheet skipped")
            }
        }
        outcomes.push(outcome);
    }

    let processed: Vec<SheetResult> = outcomes
        .iter()
        .filter_map(SheetOutcome::as_processed)
        .cloned()
        .collect();

    let population = match aggregate(&processed) {
        Ok(population) => population,
        Err(PipelineError::NoValidData { .. }) => {
            let skipped = outcomes
                .into_iter()
                .filter_map(|o| match o {
                    SheetOutcome::Skipped(s) => Some(s),
                    SheetOutcome::Processed(_) => None,
                })
                .collect();
            return Err(PipelineError::NoValidData { skipped });
        }
        Err(e) => return Err(e),
    };

    info!(
        sheets = population.sheet_count,
        records = population.record_count,
        mean_score = population.mean_score,
        "Workbook aggregated"
    );

    Ok(WorkbookReport {
        sheets: outcomes,
        population,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::{Cell, PreprocessedLayout, RawLayout, Tier};

    fn raw_mode() -> InputMode {
        InputMode::Raw(RawLayout {
            name_column: 2,
            score_column: 4,
        })
    }

    fn raw_row(name: Cell, score: Cell) -> Vec<Cell> {
        vec![Cell::Empty, Cell::Empty, name, Cell::Empty, score]
    }

    fn scenario_a_sheet() -> RawSheet {
        RawSheet::new(
            "4A",
            vec![
                raw_row(Cell::from("Ana"), Cell::from(310.0)),
                raw_row(Cell::from("Luis"), Cell::from("N/A")),
                raw_row(Cell::from("Eva"), Cell::from(90.0)),
                raw_row(Cell::from("Tom"), Cell::from(260.0)),
            ],
        )
    }

    fn records_sheet(name: &str, scores: &[f64]) -> SheetResult {
        let records = scores
            .iter()
            .enumerate()
            .map(|(i, &score)| StudentRecord {
                name: format!("student {i}"),
                score,
                tier: classify(score, AnalysisScale::Simce),
            })
            .collect();
        SheetResult::new(name, records)
    }

    #[test]
    fn test_scenario_a_raw_layout_with_range() {
        let outcome = process_sheet(
            &scenario_a_sheet(),
            &raw_mode(),
            AnalysisScale::Simce,
            Some(ScoreRange::new(100.0, 400.0)),
        );

        let result = outcome.as_processed().expect("sheet should be processed");
        let got: Vec<_> = result
            .records()
            .iter()
            .map(|r| (r.name.as_str(), r.score, r.tier))
            .collect();
        assert_eq!(
            got,
            vec![
                ("Ana", 310.0, Tier::Adequate),
                ("Tom", 260.0, Tier::Intermediate)
            ]
        );
        assert_eq!(result.mean_score(), 285.0);
        assert_eq!(result.tier_counts().adequate, 1);
        assert_eq!(result.tier_counts().intermediate, 1);
        assert_eq!(result.tier_counts().insufficient, 0);
    }

    #[test]
    fn test_without_range_out_of_range_scores_are_kept() {
        let outcome = process_sheet(&scenario_a_sheet(), &raw_mode(), AnalysisScale::Simce, None);
        let result = outcome.as_processed().unwrap();
        assert_eq!(result.records().len(), 3);
        assert_eq!(result.records()[1].name, "Eva");
        assert_eq!(result.records()[1].tier, Tier::Insufficient);
    }

    #[test]
    fn test_process_sheet_is_idempotent() {
        let sheet = scenario_a_sheet();
        let range = Some(ScoreRange::new(100.0, 400.0));
        let first = process_sheet(&sheet, &raw_mode(), AnalysisScale::Simce, range);
        let second = process_sheet(&sheet, &raw_mode(), AnalysisScale::Simce, range);
        assert_eq!(first, second);
    }

    #[test]
    fn test_scenario_b_alternate_label() {
        let sheet = RawSheet::new(
            "paes",
            vec![
                vec![Cell::from("Nombre"), Cell::from("Puntaje PAES")],
                vec![Cell::from("Ana"), Cell::from(650.0)],
            ],
        );
        let mode = InputMode::Preprocessed(PreprocessedLayout::default());

        let outcome = process_sheet(&sheet, &mode, AnalysisScale::Paes, None);
        let result = outcome.as_processed().unwrap();
        assert_eq!(result.records()[0].tier, Tier::Intermediate);
        assert_eq!(result.score_label(), "Puntaje");
    }

    #[test]
    fn test_canonical_score_label_reaches_sheet_result() {
        let sheet = RawSheet::new(
            "3A",
            vec![
                vec![Cell::from("Nombre"), Cell::from("Puntaje SIMCE")],
                vec![Cell::from("Ana"), Cell::from(300.0)],
            ],
        );
        let default_mode = InputMode::Preprocessed(PreprocessedLayout::default());
        let renamed_mode = InputMode::Preprocessed(PreprocessedLayout {
            canonical_score_label: "Puntaje final".to_string(),
            ..PreprocessedLayout::default()
        });

        let default_outcome = process_sheet(&sheet, &default_mode, AnalysisScale::Simce, None);
        let renamed_outcome = process_sheet(&sheet, &renamed_mode, AnalysisScale::Simce, None);

        assert_ne!(default_outcome, renamed_outcome);
        assert_eq!(
            renamed_outcome.as_processed().unwrap().score_label(),
            "Puntaje final"
        );
    }

    #[test]
    fn test_locator_failure_becomes_skipped_sheet() {
        let sheet = RawSheet::new("narrow", vec![vec![Cell::from("Ana")]]);
        let outcome = process_sheet(&sheet, &raw_mode(), AnalysisScale::Simce, None);

        let skipped = outcome.as_skipped().unwrap();
        assert_eq!(skipped.sheet_name, "narrow");
        assert!(matches!(skipped.reason, SheetError::ColumnNotFound(_)));
    }

    #[test]
    fn test_all_rows_dropped_becomes_no_valid_rows() {
        let sheet = RawSheet::new(
            "vacía",
            vec![raw_row(Cell::from("Luis"), Cell::from("N/A"))],
        );
        let outcome = process_sheet(&sheet, &raw_mode(), AnalysisScale::Simce, None);
        assert_eq!(
            outcome.as_skipped().map(|s| &s.reason),
            Some(&SheetError::NoValidRows)
        );
    }

    #[test]
    fn test_aggregate_empty_is_no_valid_data() {
        assert!(matches!(
            aggregate(&[]),
            Err(PipelineError::NoValidData { .. })
        ));
    }

    #[test]
    fn test_population_mean_is_weighted_by_sheet_size() {
        let sheets = vec![
            records_sheet("a", &[300.0]),
            records_sheet("b", &[200.0, 200.0, 200.0]),
        ];

        let population = aggregate(&sheets).unwrap();
        // Mean of means would be 250.
        assert!((population.mean_score - 225.0).abs() < 1e-9);
        assert_eq!(population.record_count, 4);
        assert_eq!(population.sheet_count, 2);
        assert_eq!(population.tier_counts.insufficient, 3);
        assert_eq!(population.tier_counts.adequate, 1);
    }

    #[test]
    fn test_workbook_keeps_order_and_skips() {
        let workbook = Workbook {
            sheets: vec![
                RawSheet::new("vacía", vec![]),
                scenario_a_sheet(),
            ],
        };
        let options = PipelineOptions {
            mode: raw_mode(),
            scale: AnalysisScale::Simce,
            valid_range: Some(ScoreRange::new(100.0, 400.0)),
        };

        let report = process_workbook(&workbook, &options).unwrap();
        let names: Vec<_> = report.sheets.iter().map(|s| s.sheet_name()).collect();
        assert_eq!(names, ["vacía", "4A"]);
        assert_eq!(report.skipped().count(), 1);
        assert_eq!(report.processed().count(), 1);
        assert_eq!(report.population.record_count, 2);
    }

    #[test]
    fn test_scenario_c_every_sheet_fails_locator() {
        let workbook = Workbook {
            sheets: vec![
                RawSheet::new("a", vec![vec![Cell::from("x")]]),
                RawSheet::new("b", vec![]),
            ],
        };
        let options = PipelineOptions {
            mode: raw_mode(),
            scale: AnalysisScale::Simce,
            valid_range: None,
        };

        match process_workbook(&workbook, &options) {
            Err(PipelineError::NoValidData { skipped }) => {
                assert_eq!(skipped.len(), 2);
                assert!(skipped
                    .iter()
                    .all(|s| matches!(s.reason, SheetError::ColumnNotFound(_))));
            }
            other => panic!("expected NoValidData, got {other:?}"),
        }
    }
}
