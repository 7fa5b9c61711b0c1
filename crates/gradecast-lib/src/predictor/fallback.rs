//! Rule-based fallback predictor
//!
//! Used whenever no trained model is available. Scores a student with a
//! fixed weighted sum of the three features.

use super::output::{self, MAX_SCORE};
use super::Predictor;
use crate::models::{PredictionResult, PredictorKind, StudentFeatures};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default weight of marks in the composite score
pub const DEFAULT_MARKS_WEIGHT: f64 = 0.5;

/// Default weight of attendance in the composite score
pub const DEFAULT_ATTENDANCE_WEIGHT: f64 = 0.3;

/// Default weight of the assignment score in the composite score
pub const DEFAULT_ASSIGNMENT_WEIGHT: f64 = 0.2;

/// Allowed drift of the weight sum from 1.0
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WeightsError {
    #[error("weight `{0}` must be a non-negative finite number")]
    Invalid(&'static str),

    #[error("weights must sum to 1.0, got {0}")]
    BadSum(f64),
}

/// Composite score weights, validated to be non-negative and sum to 1.0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawWeights")]
pub struct FallbackWeights {
    marks: f64,
    attendance: f64,
    assignment_score: f64,
}

impl FallbackWeights {
    pub fn new(marks: f64, attendance: f64, assignment_score: f64) -> Result<Self, WeightsError> {
        for (value, name) in [
            (marks, "marks"),
            (attendance, "attendance"),
            (assignment_score, "assignment_score"),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(WeightsError::Invalid(name));
            }
        }

        let sum = marks + attendance + assignment_score;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(WeightsError::BadSum(sum));
        }

        Ok(Self {
            marks,
            attendance,
            assignment_score,
        })
    }

    pub fn marks(&self) -> f64 {
        self.marks
    }

    pub fn attendance(&self) -> f64 {
        self.attendance
    }

    pub fn assignment_score(&self) -> f64 {
        self.assignment_score
    }
}

/// Unchecked wire form of [`FallbackWeights`]
#[derive(Deserialize)]
struct RawWeights {
    marks: f64,
    attendance: f64,
    assignment_score: f64,
}

impl TryFrom<RawWeights> for FallbackWeights {
    type Error = WeightsError;

    fn try_from(raw: RawWeights) -> Result<Self, Self::Error> {
        Self::new(raw.marks, raw.attendance, raw.assignment_score)
    }
}

impl Default for FallbackWeights {
    fn default() -> Self {
        Self {
            marks: DEFAULT_MARKS_WEIGHT,
            attendance: DEFAULT_ATTENDANCE_WEIGHT,
            assignment_score: DEFAULT_ASSIGNMENT_WEIGHT,
        }
    }
}

/// Fallback predictor that uses a weighted composite score
#[derive(Debug, Clone, Default)]
pub struct FallbackPredictor {
    weights: FallbackWeights,
}

impl FallbackPredictor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(weights: FallbackWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> FallbackWeights {
        self.weights
    }

    /// Weighted composite score on the 0..100 scale
    pub fn composite_score(&self, features: &StudentFeatures) -> f64 {
        let w = &self.weights;
        let score = w.marks * sanitize(features.marks)
            + w.attendance * sanitize(features.attendance)
            + w.assignment_score * sanitize(features.assignment_score);
        score.clamp(0.0, MAX_SCORE)
    }

    /// Total prediction; never fails
    pub fn score(&self, features: &StudentFeatures) -> PredictionResult {
        let probability = self.composite_score(features) / MAX_SCORE;
        PredictionResult {
            label: output::label_for(probability),
            probability,
            source: PredictorKind::Fallback,
        }
    }
}

impl Predictor for FallbackPredictor {
    fn predict(&self, features: &StudentFeatures) -> Result<PredictionResult> {
        Ok(self.score(features))
    }

    fn kind(&self) -> PredictorKind {
        PredictorKind::Fallback
    }

    fn model_version(&self) -> &str {
        "fallback"
    }
}

/// NaN, infinite and out-of-range features count as 0
fn sanitize(value: f64) -> f64 {
    if value.is_finite() && (0.0..=MAX_SCORE).contains(&value) {
        value
    } else {
        0.0
    }
}
