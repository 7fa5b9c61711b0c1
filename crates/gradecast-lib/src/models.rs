//! Core data models for student prediction

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

pub type StudentId = i64;
pub type TeacherId = i64;

/// Student record as held by the store
///
/// Only `prediction` and `probability` are written by the prediction
/// service; everything else is read-only input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub teacher_id: TeacherId,
    pub name: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default, deserialize_with = "lenient_score")]
    pub marks: Option<f64>,
    #[serde(default, deserialize_with = "lenient_score")]
    pub attendance: Option<f64>,
    #[serde(default, deserialize_with = "lenient_score")]
    pub assignment_score: Option<f64>,
    /// Legacy column, used when `marks` is absent
    #[serde(default, deserialize_with = "lenient_score")]
    pub previous_marks: Option<f64>,
    /// Legacy column, used when `attendance` is absent
    #[serde(default, deserialize_with = "lenient_score")]
    pub attendance_percent: Option<f64>,
    #[serde(default)]
    pub prediction: Option<String>,
    #[serde(default)]
    pub probability: Option<f64>,
}

/// Read a score column that may hold junk
///
/// Numbers and numeric strings are kept; any other value becomes NaN so
/// the record survives loading and is skipped by batch prediction.
fn lenient_score<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => None,
        Some(serde_json::Value::String(s)) => Some(s.trim().parse().unwrap_or(f64::NAN)),
        Some(_) => Some(f64::NAN),
    })
}

impl Student {
    pub fn new(id: StudentId, teacher_id: TeacherId, name: impl Into<String>) -> Self {
        Self {
            id,
            teacher_id,
            name: name.into(),
            age: None,
            marks: None,
            attendance: None,
            assignment_score: None,
            previous_marks: None,
            attendance_percent: None,
            prediction: None,
            probability: None,
        }
    }

    pub fn with_scores(
        mut self,
        marks: Option<f64>,
        attendance: Option<f64>,
        assignment_score: Option<f64>,
    ) -> Self {
        self.marks = marks;
        self.attendance = attendance;
        self.assignment_score = assignment_score;
        self
    }
}

/// Feature vector for prediction, ordered `[marks, attendance, assignment_score]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StudentFeatures {
    pub marks: f64,
    pub attendance: f64,
    pub assignment_score: f64,
}

impl StudentFeatures {
    pub const COUNT: usize = 3;

    pub fn new(marks: f64, attendance: f64, assignment_score: f64) -> Self {
        Self {
            marks,
            attendance,
            assignment_score,
        }
    }

    pub fn to_array(&self) -> [f64; Self::COUNT] {
        [self.marks, self.attendance, self.assignment_score]
    }
}

/// Pass/fail verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PredictionLabel {
    Pass,
    Fail,
}

impl PredictionLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionLabel::Pass => "Pass",
            PredictionLabel::Fail => "Fail",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Pass" => Some(PredictionLabel::Pass),
            "Fail" => Some(PredictionLabel::Fail),
            _ => None,
        }
    }
}

impl fmt::Display for PredictionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which predictor produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictorKind {
    Model,
    Fallback,
}

impl PredictorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredictorKind::Model => "model",
            PredictorKind::Fallback => "fallback",
        }
    }
}

/// Prediction output, probability always on the 0..1 scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub label: PredictionLabel,
    pub probability: f64,
    pub source: PredictorKind,
}

/// Which students a batch operation covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerScope {
    /// Students owned by one teacher
    Teacher(TeacherId),
    /// Every student (admin view)
    All,
}

impl OwnerScope {
    pub fn contains(&self, student: &Student) -> bool {
        match self {
            OwnerScope::Teacher(id) => student.teacher_id == *id,
            OwnerScope::All => true,
        }
    }
}

/// Per-student entry of a batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentPrediction {
    pub student_id: StudentId,
    pub label: PredictionLabel,
    pub probability: f64,
}

/// Outcome of a batch prediction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub updated: usize,
    pub skipped: usize,
    pub results: Vec<StudentPrediction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate view over stored predictions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionStats {
    pub total: usize,
    pub passes: usize,
    pub fails: usize,
    pub avg_prob_pass: f64,
    pub avg_prob_fail: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_round_trips_through_strings() {
        assert_eq!(PredictionLabel::parse("Pass"), Some(PredictionLabel::Pass));
        assert_eq!(PredictionLabel::parse("Fail"), Some(PredictionLabel::Fail));
        assert_eq!(PredictionLabel::parse("pass"), None);
        assert_eq!(PredictionLabel::Pass.to_string(), "Pass");
    }

    #[test]
    fn test_label_serializes_as_plain_string() {
        let json = serde_json::to_string(&PredictionLabel::Fail).unwrap();
        assert_eq!(json, "\"Fail\"");
    }

    #[test]
    fn test_scope_contains() {
        let student = Student::new(1, 7, "Ada");
        assert!(OwnerScope::Teacher(7).contains(&student));
        assert!(!OwnerScope::Teacher(8).contains(&student));
        assert!(OwnerScope::All.contains(&student));
    }

    #[test]
    fn test_student_deserializes_with_missing_columns() {
        let student: Student =
            serde_json::from_str(r#"{"id": 3, "teacher_id": 1, "name": "Grace", "marks": 71.5}"#)
                .unwrap();
        assert_eq!(student.marks, Some(71.5));
        assert!(student.attendance.is_none());
        assert!(student.prediction.is_none());
    }

    #[test]
    fn test_dirty_score_columns_become_nan() {
        let student: Student = serde_json::from_str(
            r#"{"id": 2, "teacher_id": 1, "name": "Bob", "marks": "n/a", "attendance": "85", "assignment_score": "", "previous_marks": true}"#,
        )
        .unwrap();
        assert!(student.marks.unwrap().is_nan());
        assert_eq!(student.attendance, Some(85.0));
        assert!(student.assignment_score.is_none());
        assert!(student.previous_marks.unwrap().is_nan());
    }
}
