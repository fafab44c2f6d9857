use crate::pipeline::types::{AnalysisScale, Tier};

/// Upper bounds (inclusive) of the two lower tiers for each scale.
/// Scores above the second bound are [`Tier::Adequate`].
///
/// | Scale | Insufficient | Intermediate | Adequate |
/// |-------|--------------|--------------|----------|
/// | SIMCE | <= 250       | <= 285       | > 285    |
/// | PAES  | <= 599       | <= 799       | > 799    |
static THRESHOLDS: &[(AnalysisScale, [f64; 2])] = &[
    (AnalysisScale::Simce, [250.0, 285.0]),
    (AnalysisScale::Paes, [599.0, 799.0]),
];

/// Returns the `(t1, t2)` thresholds of `scale`.
pub fn thresholds(scale: AnalysisScale) -> [f64; 2] {
    THRESHOLDS
        .iter()
        .find(|(s, _)| *s == scale)
        .map(|(_, t)| *t)
        .unwrap_or([f64::INFINITY, f64::INFINITY])
}

/// Maps a finite score to its tier under `scale`.
///
/// Boundary values belong to the lower tier.
pub fn classify(score: f64, scale: AnalysisScale) -> Tier {
    let [t1, t2] = thresholds(scale);
    match score {
        s if s <= t1 => Tier::Insufficient,
        s if s <= t2 => Tier::Intermediate,
        _ => Tier::Adequate,
    }
}
