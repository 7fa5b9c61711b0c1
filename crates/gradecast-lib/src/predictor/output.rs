//! Prediction output normalization
//!
//! Converts raw predictor outputs into a `PredictionResult` on the 0..1
//! probability scale with the fixed pass threshold applied.

use crate::models::{PredictionLabel, PredictionResult, PredictorKind};

/// Probability at or above which a student is predicted to pass
pub const PASS_THRESHOLD: f64 = 0.5;

/// Upper bound of the percentage score scale
pub const MAX_SCORE: f64 = 100.0;

/// Label for a 0..1 probability
pub fn label_for(probability: f64) -> PredictionLabel {
    if probability >= PASS_THRESHOLD {
        PredictionLabel::Pass
    } else {
        PredictionLabel::Fail
    }
}

/// Build a result from a pass-class probability
///
/// Returns `None` for NaN so callers can fall back.
pub fn from_probability(probability: f64, source: PredictorKind) -> Option<PredictionResult> {
    if probability.is_nan() {
        return None;
    }
    let probability = probability.clamp(0.0, 1.0);
    Some(PredictionResult {
        label: label_for(probability),
        probability,
        source,
    })
}

/// Build a result from a 0..100 percentage score
///
/// The score is clamped into [0, 100] before scaling to 0..1.
pub fn from_score(score: f64, source: PredictorKind) -> Option<PredictionResult> {
    if score.is_nan() {
        return None;
    }
    from_probability(score.clamp(0.0, MAX_SCORE) / MAX_SCORE, source)
}
