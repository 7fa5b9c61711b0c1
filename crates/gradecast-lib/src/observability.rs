//! Observability infrastructure for the prediction service
//!
//! Provides:
//! - Prometheus metrics (prediction latency, outcomes, skips, model info)
//! - Structured JSON logging with tracing

use crate::models::{PredictionResult, StudentId};
use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_counter_vec,
    register_int_gauge, GaugeVec, Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for prediction latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ServiceMetricsInner> = OnceLock::new();

struct ServiceMetricsInner {
    prediction_latency_seconds: Histogram,
    predictions_total: IntCounterVec,
    records_skipped: IntCounter,
    prediction_errors: IntCounter,
    students_stored: IntGauge,
    model_info: GaugeVec,
}

impl ServiceMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "gradecast_prediction_latency_seconds",
                "Time spent computing a single prediction",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_total: register_int_counter_vec!(
                "gradecast_predictions_total",
                "Predictions written, by label and predictor",
                &["label", "source"]
            )
            .expect("Failed to register predictions_total"),

            records_skipped: register_int_counter!(
                "gradecast_records_skipped_total",
                "Batch records skipped because features could not be extracted"
            )
            .expect("Failed to register records_skipped"),

            prediction_errors: register_int_counter!(
                "gradecast_prediction_errors_total",
                "Predictor errors recovered by the fallback scorer"
            )
            .expect("Failed to register prediction_errors"),

            students_stored: register_int_gauge!(
                "gradecast_students_stored",
                "Number of student records loaded at startup"
            )
            .expect("Failed to register students_stored"),

            model_info: register_gauge_vec!(
                "gradecast_model_info",
                "Information about the active predictor",
                &["version", "kind"]
            )
            .expect("Failed to register model_info"),
        }
    }
}

/// Service metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share it.
#[derive(Clone)]
pub struct ServiceMetrics {
    _private: (),
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ServiceMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn inc_prediction(&self, result: &PredictionResult) {
        self.inner()
            .predictions_total
            .with_label_values(&[result.label.as_str(), result.source.as_str()])
            .inc();
    }

    pub fn inc_records_skipped(&self) {
        self.inner().records_skipped.inc();
    }

    pub fn inc_prediction_errors(&self) {
        self.inner().prediction_errors.inc();
    }

    /// Record the store size after loading; no route adds or removes records
    pub fn set_students_stored(&self, count: i64) {
        self.inner().students_stored.set(count);
    }

    pub fn set_model_info(&self, version: &str, kind: &str) {
        self.inner().model_info.reset();
        self.inner()
            .model_info
            .with_label_values(&[version, kind])
            .set(1.0);
    }
}

/// Structured logger for service events
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn log_prediction(&self, student_id: StudentId, result: &PredictionResult) {
        info!(
            event = "prediction_generated",
            instance = %self.instance,
            student_id = student_id,
            label = %result.label,
            probability = result.probability,
            source = result.source.as_str(),
            "Generated pass/fail prediction"
        );
    }

    pub fn log_record_skipped(&self, student_id: StudentId, reason: &str) {
        warn!(
            event = "record_skipped",
            instance = %self.instance,
            student_id = student_id,
            reason = %reason,
            "Skipped student in batch prediction"
        );
    }

    pub fn log_batch(&self, scope: &str, updated: usize, skipped: usize) {
        info!(
            event = "batch_prediction_completed",
            instance = %self.instance,
            scope = %scope,
            updated = updated,
            skipped = skipped,
            "Batch prediction completed"
        );
    }

    pub fn log_model_fallback(&self, model_version: &str) {
        warn!(
            event = "model_fallback",
            instance = %self.instance,
            model_version = %model_version,
            "No trained model active, predictions use the rule-based scorer"
        );
    }

    pub fn log_startup(&self, version: &str, model_version: &str) {
        info!(
            event = "service_started",
            instance = %self.instance,
            service_version = %version,
            model_version = %model_version,
            "Prediction service started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Prediction service shutting down"
        );
    }
}
