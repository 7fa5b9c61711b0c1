//! Best-effort model loading
//!
//! Reads and validates a model file at startup. Any failure selects the
//! rule-based fallback instead; startup never aborts on a bad model.

use super::{ActivePredictor, FallbackPredictor, ModelLoadError, OnnxPredictor};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

/// Maximum model size in bytes (16MB)
pub const DEFAULT_MAX_MODEL_SIZE: usize = 16 * 1024 * 1024;

/// Where to find the model and how to validate it
#[derive(Debug, Clone)]
pub struct ModelSource {
    pub path: PathBuf,
    /// Expected SHA256 of the file, hex encoded
    pub checksum: Option<String>,
    pub max_size: usize,
}

impl ModelSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            checksum: None,
            max_size: DEFAULT_MAX_MODEL_SIZE,
        }
    }

    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = Some(checksum.into());
        self
    }

    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Read, validate and parse the model
    pub fn load(&self) -> Result<OnnxPredictor, ModelLoadError> {
        if !self.path.exists() {
            return Err(ModelLoadError::Missing(self.path.display().to_string()));
        }

        let bytes = fs::read(&self.path)?;
        if bytes.len() > self.max_size {
            return Err(ModelLoadError::TooLarge {
                size: bytes.len(),
                max: self.max_size,
            });
        }

        let actual = compute_checksum(&bytes);
        if let Some(expected) = &self.checksum {
            if !expected.eq_ignore_ascii_case(&actual) {
                return Err(ModelLoadError::ChecksumMismatch {
                    expected: expected.clone(),
                    actual,
                });
            }
        }

        let version = format!("onnx-{}", &actual[..12]);
        let predictor = OnnxPredictor::new(&bytes, version)?;

        info!(
            path = %self.path.display(),
            size = bytes.len(),
            checksum = %actual,
            mode = ?predictor.output_mode(),
            "Loaded prediction model"
        );

        Ok(predictor)
    }
}

/// Select the predictor for the process lifetime
///
/// Without a source, or when loading fails, the fallback is returned.
pub fn load_predictor(source: Option<&ModelSource>, fallback: FallbackPredictor) -> ActivePredictor {
    let Some(source) = source else {
        info!("No model configured, using rule-based fallback");
        return ActivePredictor::fallback(fallback);
    };

    match source.load() {
        Ok(model) => ActivePredictor::Loaded { model, fallback },
        Err(e) => {
            warn!(
                path = %source.path.display(),
                error = %e,
                "Model unavailable, using rule-based fallback"
            );
            ActivePredictor::fallback(fallback)
        }
    }
}

/// Compute SHA256 checksum of data
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
