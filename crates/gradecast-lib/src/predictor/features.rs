//! Feature extraction for prediction
//!
//! Turns a stored student record into the `[marks, attendance,
//! assignment_score]` triple the predictors consume.

use crate::error::ExtractionSkip;
use crate::models::{Student, StudentFeatures};

/// Extracts prediction features from student records
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Total extraction: missing or non-finite values become 0, nothing is rejected.
    pub fn extract(&self, student: &Student) -> StudentFeatures {
        let [marks, attendance, assignment_score] = Self::raw(student).map(finite_or_zero);
        StudentFeatures::new(marks, attendance, assignment_score)
    }

    /// Strict extraction used when persisting predictions.
    ///
    /// Missing values still default to 0, but a record with no feature at
    /// all, or with a stored NaN/infinity, is reported instead.
    pub fn try_extract(&self, student: &Student) -> Result<StudentFeatures, ExtractionSkip> {
        let raw = Self::raw(student);

        if raw.iter().all(Option::is_none) {
            return Err(ExtractionSkip::NoFeatures);
        }

        for (value, feature) in raw.iter().zip(FEATURE_NAMES) {
            if let Some(v) = value {
                if !v.is_finite() {
                    return Err(ExtractionSkip::NonFinite { feature });
                }
            }
        }

        Ok(self.extract(student))
    }

    fn raw(student: &Student) -> [Option<f64>; StudentFeatures::COUNT] {
        [
            student.marks.or(student.previous_marks),
            student.attendance.or(student.attendance_percent),
            student.assignment_score,
        ]
    }
}

fn finite_or_zero(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Feature names in tensor order
pub const FEATURE_NAMES: [&str; StudentFeatures::COUNT] = ["marks", "attendance", "assignment_score"];
