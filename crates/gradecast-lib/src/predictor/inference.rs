//! ONNX inference using tract
//!
//! Runs a pre-trained pass/fail model over the three student features.
//! Classifiers exported with a probability output are read directly;
//! regressors are treated as producing a 0..100 score.

use super::output;
use super::Predictor;
use crate::models::{PredictionResult, PredictorKind, StudentFeatures};
use anyhow::{Context, Result};
use std::time::Instant;
use thiserror::Error;
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// Number of input features expected by the model
pub const NUM_FEATURES: usize = StudentFeatures::COUNT;

/// Maximum inference latency before warning
const MAX_INFERENCE_MS: u128 = 5;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Reasons a model file cannot be used
#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("model file not found: {0}")]
    Missing(String),

    #[error("failed to read model file: {0}")]
    Io(#[from] std::io::Error),

    #[error("model size {size} exceeds maximum {max}")]
    TooLarge { size: usize, max: usize },

    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("failed to parse ONNX model: {0}")]
    Corrupt(String),

    #[error("model is incompatible with {expected} input features: {reason}")]
    IncompatibleFeatures { expected: usize, reason: String },
}

/// How to read the model's output tensors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// An f32 `[1, 2]` output holding per-class probabilities; class 1 is pass
    ClassProbabilities { output: usize },
    /// The first output is a raw 0..100 score
    Score,
}

/// ONNX-based predictor using tract for lightweight inference
pub struct OnnxPredictor {
    model: TractModel,
    mode: OutputMode,
    model_version: String,
}

impl std::fmt::Debug for OnnxPredictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxPredictor")
            .field("mode", &self.mode)
            .field("model_version", &self.model_version)
            .finish()
    }
}

impl OnnxPredictor {
    /// Create a new predictor from model bytes
    pub fn new(model_bytes: &[u8], model_version: impl Into<String>) -> Result<Self, ModelLoadError> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .map_err(|e| ModelLoadError::Corrupt(format!("{:#}", e)))?;
        Self::from_model(model, model_version)
    }

    /// Create a predictor from an already parsed ONNX graph
    pub fn from_model(
        model: InferenceModel,
        model_version: impl Into<String>,
    ) -> Result<Self, ModelLoadError> {
        let (model, mode) = Self::prepare(model)?;
        Ok(Self {
            model,
            mode,
            model_version: model_version.into(),
        })
    }

    /// Shape-check and optimize a parsed model
    fn prepare(model: InferenceModel) -> Result<(TractModel, OutputMode), ModelLoadError> {
        let inputs = model
            .input_outlets()
            .map_err(|e| ModelLoadError::Corrupt(format!("{:#}", e)))?
            .len();
        if inputs != 1 {
            return Err(ModelLoadError::IncompatibleFeatures {
                expected: NUM_FEATURES,
                reason: format!("model declares {} inputs", inputs),
            });
        }

        let typed = model
            .with_input_fact(0, f32::fact([1, NUM_FEATURES]).into())
            .and_then(|m| m.into_optimized())
            .map_err(|e| ModelLoadError::IncompatibleFeatures {
                expected: NUM_FEATURES,
                reason: format!("{:#}", e),
            })?;

        let mode = detect_output_mode(&typed);

        let plan = typed
            .into_runnable()
            .map_err(|e| ModelLoadError::Corrupt(format!("{:#}", e)))?;

        Ok((plan, mode))
    }

    pub fn output_mode(&self) -> OutputMode {
        self.mode
    }

    /// Convert features to a `[1, 3]` f32 tensor
    fn features_to_tensor(&self, features: &StudentFeatures) -> Result<Tensor> {
        let data: Vec<f32> = features.to_array().iter().map(|v| *v as f32).collect();
        let array = tract_ndarray::Array2::from_shape_vec((1, NUM_FEATURES), data)
            .context("Failed to shape feature tensor")?;
        Ok(array.into())
    }

    /// Pull the values the output mode needs out of the model outputs
    fn read_output(&self, outputs: &TVec<TValue>) -> Result<Vec<f32>> {
        let index = match self.mode {
            OutputMode::ClassProbabilities { output } => output,
            OutputMode::Score => 0,
        };
        let tensor = outputs.get(index).context("No output from model")?;
        let values = tensor.cast_to::<f32>()?;
        Ok(values.as_slice::<f32>()?.to_vec())
    }
}

impl Predictor for OnnxPredictor {
    fn predict(&self, features: &StudentFeatures) -> Result<PredictionResult> {
        let start = Instant::now();

        let input = self.features_to_tensor(features)?;
        let outputs = self.model.run(tvec!(input.into()))?;
        let values = self.read_output(&outputs)?;

        let elapsed = start.elapsed();
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        interpret_output(self.mode, &values)
            .with_context(|| format!("Unusable model output {:?}", values))
    }

    fn kind(&self) -> PredictorKind {
        PredictorKind::Model
    }

    fn model_version(&self) -> &str {
        &self.model_version
    }
}

/// Pick the output mode from the optimized model's output facts
fn detect_output_mode(model: &TypedModel) -> OutputMode {
    let count = model.output_outlets().map(|o| o.len()).unwrap_or(0);
    for ix in 0..count {
        if let Ok(fact) = model.output_fact(ix) {
            if fact.datum_type == f32::datum_type() && fact.shape.as_concrete() == Some(&[1, 2][..]) {
                return OutputMode::ClassProbabilities { output: ix };
            }
        }
    }
    OutputMode::Score
}

/// Turn raw output values into a result; non-finite values are rejected
pub fn interpret_output(mode: OutputMode, values: &[f32]) -> Option<PredictionResult> {
    let raw = match mode {
        OutputMode::ClassProbabilities { .. } => *values.get(1)?,
        OutputMode::Score => *values.first()?,
    } as f64;

    if !raw.is_finite() {
        return None;
    }

    match mode {
        OutputMode::ClassProbabilities { .. } => output::from_probability(raw, PredictorKind::Model),
        OutputMode::Score => output::from_score(raw, PredictorKind::Model),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PredictionLabel;
    use crate::predictor::{ActivePredictor, FallbackPredictor};
    use tract_onnx::pb;

    #[test]
    fn test_probability_output_uses_pass_column() {
        let mode = OutputMode::ClassProbabilities { output: 1 };
        let result = interpret_output(mode, &[0.25, 0.75]).unwrap();
        assert!((result.probability - 0.75).abs() < 1e-6);
        assert_eq!(result.label, PredictionLabel::Pass);
        assert_eq!(result.source, PredictorKind::Model);
    }

    #[test]
    fn test_probability_output_missing_column() {
        let mode = OutputMode::ClassProbabilities { output: 0 };
        assert!(interpret_output(mode, &[0.9]).is_none());
    }

    #[test]
    fn test_score_output_is_percentage() {
        let result = interpret_output(OutputMode::Score, &[42.0]).unwrap();
        assert!((result.probability - 0.42).abs() < 1e-6);
        assert_eq!(result.label, PredictionLabel::Fail);
    }

    #[test]
    fn test_score_output_clamped() {
        let result = interpret_output(OutputMode::Score, &[180.0]).unwrap();
        assert_eq!(result.probability, 1.0);
    }

    #[test]
    fn test_non_finite_output_rejected() {
        assert!(interpret_output(OutputMode::Score, &[f32::NAN]).is_none());
        assert!(interpret_output(OutputMode::Score, &[f32::INFINITY]).is_none());
        assert!(interpret_output(OutputMode::Score, &[]).is_none());
    }

    #[test]
    fn test_label_matches_threshold_for_model_outputs() {
        for raw in [0.0f32, 0.1, 0.49, 0.5, 0.51, 0.99, 1.0] {
            let mode = OutputMode::ClassProbabilities { output: 1 };
            let r = interpret_output(mode, &[1.0 - raw, raw]).unwrap();
            assert_eq!(r.label == PredictionLabel::Pass, r.probability >= 0.5);
        }
    }

    const FLOAT: i32 = 1;

    fn tensor_type(dims: &[i64]) -> pb::TypeProto {
        let dim = dims
            .iter()
            .map(|d| pb::tensor_shape_proto::Dimension {
                value: Some(pb::tensor_shape_proto::dimension::Value::DimValue(*d)),
                ..Default::default()
            })
            .collect();
        pb::TypeProto {
            value: Some(pb::type_proto::Value::TensorType(pb::type_proto::Tensor {
                elem_type: FLOAT,
                shape: Some(pb::TensorShapeProto { dim }),
            })),
            ..Default::default()
        }
    }

    /// A single MatMul of `[1, inputs]` features against an `[inputs, classes]` weight matrix
    fn linear_model(inputs: i64, weights: &[f32], classes: i64) -> InferenceModel {
        let value = |name: &str, dims: &[i64]| pb::ValueInfoProto {
            name: name.to_string(),
            r#type: Some(tensor_type(dims)),
            ..Default::default()
        };
        let graph = pb::GraphProto {
            name: "linear".to_string(),
            node: vec![pb::NodeProto {
                input: vec!["features".to_string(), "weights".to_string()],
                output: vec!["output".to_string()],
                op_type: "MatMul".to_string(),
                ..Default::default()
            }],
            initializer: vec![pb::TensorProto {
                name: "weights".to_string(),
                dims: vec![inputs, classes],
                data_type: FLOAT,
                float_data: weights.to_vec(),
                ..Default::default()
            }],
            input: vec![value("features", &[1, inputs])],
            output: vec![value("output", &[1, classes])],
            ..Default::default()
        };
        let proto = pb::ModelProto {
            ir_version: 7,
            opset_import: vec![pb::OperatorSetIdProto {
                domain: String::new(),
                version: 13,
            }],
            graph: Some(graph),
            ..Default::default()
        };
        tract_onnx::onnx().model_for_proto_model(&proto).unwrap()
    }

    fn ada() -> StudentFeatures {
        StudentFeatures::new(80.0, 90.0, 70.0)
    }

    #[test]
    fn test_regressor_model_scores_out_of_100() {
        let weights = [0.5, 0.3, 0.2];
        let predictor = OnnxPredictor::from_model(linear_model(3, &weights, 1), "v1").unwrap();
        assert_eq!(predictor.output_mode(), OutputMode::Score);

        let result = predictor.predict(&ada()).unwrap();
        assert!((result.probability - 0.81).abs() < 1e-4);
        assert_eq!(result.label, PredictionLabel::Pass);
        assert_eq!(result.source, PredictorKind::Model);
        assert_eq!(predictor.model_version(), "v1");
    }

    #[test]
    fn test_classifier_model_reads_pass_column() {
        // Column 0 is the fail class, column 1 the pass class
        let weights = [0.0045, 0.008, 0.0, 0.0, 0.0, 0.0];
        let predictor = OnnxPredictor::from_model(linear_model(3, &weights, 2), "v2").unwrap();
        assert_eq!(
            predictor.output_mode(),
            OutputMode::ClassProbabilities { output: 0 }
        );

        let result = predictor.predict(&ada()).unwrap();
        assert!((result.probability - 0.64).abs() < 1e-4);
        assert_eq!(result.label == PredictionLabel::Pass, result.probability >= 0.5);

        let weak = predictor.predict(&StudentFeatures::new(50.0, 0.0, 0.0)).unwrap();
        assert!((weak.probability - 0.4).abs() < 1e-4);
        assert_eq!(weak.label, PredictionLabel::Fail);
    }

    #[test]
    fn test_non_finite_model_output_falls_back() {
        let weights = [f32::INFINITY, 0.0, 0.0];
        let model = OnnxPredictor::from_model(linear_model(3, &weights, 1), "v3").unwrap();
        assert!(model.predict(&ada()).is_err());

        let predictor = ActivePredictor::Loaded {
            model,
            fallback: FallbackPredictor::new(),
        };
        let result = predictor.predict_or_fallback(&ada());
        assert_eq!(result.source, PredictorKind::Fallback);
        assert!((result.probability - 0.81).abs() < 1e-9);
        assert_eq!(result.label, PredictionLabel::Pass);
    }

    #[test]
    fn test_model_with_wrong_feature_count_is_incompatible() {
        let err = OnnxPredictor::from_model(linear_model(2, &[0.5, 0.5], 1), "v4").unwrap_err();
        assert!(matches!(
            err,
            ModelLoadError::IncompatibleFeatures { .. } | ModelLoadError::Corrupt(_)
        ));
    }

    #[test]
    fn test_garbage_bytes_are_corrupt() {
        let err = OnnxPredictor::new(b"definitely not protobuf", "test").unwrap_err();
        assert!(matches!(
            err,
            ModelLoadError::Corrupt(_) | ModelLoadError::IncompatibleFeatures { .. }
        ));
    }
}
