//! Pass/fail prediction engine

mod fallback;
mod features;
mod inference;
mod loader;
mod output;

pub use fallback::{
    FallbackPredictor, FallbackWeights, WeightsError, DEFAULT_ASSIGNMENT_WEIGHT,
    DEFAULT_ATTENDANCE_WEIGHT, DEFAULT_MARKS_WEIGHT,
};
pub use features::{FeatureExtractor, FEATURE_NAMES};
pub use inference::{interpret_output, ModelLoadError, OnnxPredictor, OutputMode, NUM_FEATURES};
pub use loader::{compute_checksum, load_predictor, ModelSource, DEFAULT_MAX_MODEL_SIZE};
pub use output::{label_for, PASS_THRESHOLD};

use crate::models::{PredictionResult, PredictorKind, StudentFeatures};
use anyhow::Result;
use tracing::warn;

/// Trait for prediction implementations
pub trait Predictor: Send + Sync {
    /// Generate a pass/fail prediction from features
    fn predict(&self, features: &StudentFeatures) -> Result<PredictionResult>;

    /// Which kind of predictor this is
    fn kind(&self) -> PredictorKind;

    /// Get current model version
    fn model_version(&self) -> &str;
}

/// The predictor selected at startup
///
/// Built once by [`load_predictor`] and shared read-only afterwards.
#[derive(Debug)]
pub enum ActivePredictor {
    /// A loaded ONNX model, with the rule-based scorer as a safety net
    Loaded {
        model: OnnxPredictor,
        fallback: FallbackPredictor,
    },
    /// No usable model
    Fallback(FallbackPredictor),
}

impl ActivePredictor {
    pub fn fallback(predictor: FallbackPredictor) -> Self {
        ActivePredictor::Fallback(predictor)
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ActivePredictor::Fallback(_))
    }

    /// Total prediction: model failures degrade to the fallback scorer
    pub fn predict_or_fallback(&self, features: &StudentFeatures) -> PredictionResult {
        match self {
            ActivePredictor::Fallback(fallback) => fallback.score(features),
            ActivePredictor::Loaded { model, fallback } => match model.predict(features) {
                Ok(result) => result,
                Err(e) => {
                    warn!(error = %e, "Inference error, using fallback");
                    fallback.score(features)
                }
            },
        }
    }
}

impl Predictor for ActivePredictor {
    fn predict(&self, features: &StudentFeatures) -> Result<PredictionResult> {
        Ok(self.predict_or_fallback(features))
    }

    fn kind(&self) -> PredictorKind {
        match self {
            ActivePredictor::Loaded { .. } => PredictorKind::Model,
            ActivePredictor::Fallback(_) => PredictorKind::Fallback,
        }
    }

    fn model_version(&self) -> &str {
        match self {
            ActivePredictor::Loaded { model, .. } => model.model_version(),
            ActivePredictor::Fallback(fallback) => fallback.model_version(),
        }
    }
}
