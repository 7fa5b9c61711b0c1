//! Prediction orchestration
//!
//! Pulls student records from the store, runs the active predictor and
//! writes the verdict back. Callers are responsible for authorization:
//! every id handed to this service is assumed to be in the caller's scope.

use crate::error::{PredictionError, StoreError};
use crate::models::{
    BatchSummary, OwnerScope, PredictionLabel, PredictionResult, PredictionStats, Student,
    StudentFeatures, StudentId, StudentPrediction,
};
use crate::observability::{ServiceMetrics, StructuredLogger};
use crate::predictor::{FallbackPredictor, FeatureExtractor, Predictor};
use crate::store::StudentStore;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Single-record and batch prediction over a student store
pub struct PredictionService {
    store: Arc<dyn StudentStore>,
    predictor: Arc<dyn Predictor>,
    extractor: FeatureExtractor,
    safety_net: FallbackPredictor,
    metrics: ServiceMetrics,
    logger: StructuredLogger,
}

impl PredictionService {
    pub fn new(
        store: Arc<dyn StudentStore>,
        predictor: Arc<dyn Predictor>,
        metrics: ServiceMetrics,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            store,
            predictor,
            extractor: FeatureExtractor::new(),
            safety_net: FallbackPredictor::new(),
            metrics,
            logger,
        }
    }

    pub fn predictor(&self) -> &dyn Predictor {
        self.predictor.as_ref()
    }

    /// Predict for one pre-authorized student and persist the result
    pub fn predict_one(&self, student_id: StudentId) -> Result<PredictionResult, PredictionError> {
        let student = self
            .store
            .get(student_id)?
            .ok_or(PredictionError::NotFound(student_id))?;
        let features = self.extractor.extract(&student);
        self.predict_student(&student, &features)
    }

    /// Predict for every student in scope, skipping records that cannot be scored
    pub fn predict_all(&self, scope: OwnerScope) -> Result<BatchSummary, PredictionError> {
        let students = self.store.list(scope)?;

        if students.is_empty() {
            return Ok(BatchSummary {
                error: Some(empty_scope_message(scope)),
                ..Default::default()
            });
        }

        let mut summary = BatchSummary::default();
        for student in &students {
            let features = match self.extractor.try_extract(student) {
                Ok(features) => features,
                Err(reason) => {
                    summary.skipped += 1;
                    self.metrics.inc_records_skipped();
                    self.logger.log_record_skipped(student.id, &reason.to_string());
                    continue;
                }
            };

            match self.predict_student(student, &features) {
                Ok(result) => {
                    summary.updated += 1;
                    summary.results.push(StudentPrediction {
                        student_id: student.id,
                        label: result.label,
                        probability: result.probability,
                    });
                }
                // Removed between listing and writing
                Err(PredictionError::NotFound(student_id)) => {
                    summary.skipped += 1;
                    self.metrics.inc_records_skipped();
                    self.logger.log_record_skipped(student_id, "record no longer exists");
                }
                Err(e) => return Err(e),
            }
        }

        self.logger
            .log_batch(&scope_label(scope), summary.updated, summary.skipped);
        Ok(summary)
    }

    /// Pass/fail counts and mean probabilities over stored predictions
    pub fn stats(&self, scope: OwnerScope) -> Result<PredictionStats, StoreError> {
        let students = self.store.list(scope)?;

        let mut stats = PredictionStats {
            total: students.len(),
            ..Default::default()
        };
        let (mut pass_sum, mut fail_sum) = (0.0, 0.0);

        for student in &students {
            let label = student.prediction.as_deref().and_then(PredictionLabel::parse);
            let probability = student.probability.unwrap_or(0.0);
            match label {
                Some(PredictionLabel::Pass) => {
                    stats.passes += 1;
                    pass_sum += probability;
                }
                Some(PredictionLabel::Fail) => {
                    stats.fails += 1;
                    fail_sum += probability;
                }
                None => {}
            }
        }

        stats.avg_prob_pass = mean(pass_sum, stats.passes);
        stats.avg_prob_fail = mean(fail_sum, stats.fails);
        Ok(stats)
    }

    fn predict_student(
        &self,
        student: &Student,
        features: &StudentFeatures,
    ) -> Result<PredictionResult, PredictionError> {
        let start = Instant::now();

        let result = match self.predictor.predict(features) {
            Ok(result) => result,
            Err(e) => {
                warn!(student_id = student.id, error = %e, "Predictor failed, using fallback");
                self.metrics.inc_prediction_errors();
                self.safety_net.score(features)
            }
        };

        self.store.save_prediction(student.id, &result)?;

        self.metrics
            .observe_prediction_latency(start.elapsed().as_secs_f64());
        self.metrics.inc_prediction(&result);
        self.logger.log_prediction(student.id, &result);
        debug!(
            student_id = student.id,
            duration_us = start.elapsed().as_micros() as u64,
            "Prediction persisted"
        );

        Ok(result)
    }
}

fn mean(sum: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn scope_label(scope: OwnerScope) -> String {
    match scope {
        OwnerScope::Teacher(id) => format!("teacher:{}", id),
        OwnerScope::All => "all".to_string(),
    }
}

fn empty_scope_message(scope: OwnerScope) -> String {
    match scope {
        OwnerScope::Teacher(_) => "No students found for this teacher".to_string(),
        OwnerScope::All => "No students found".to_string(),
    }
}
