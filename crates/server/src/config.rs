//! Server configuration

use anyhow::{Context, Result};
use gradecast_lib::predictor::{
    FallbackPredictor, FallbackWeights, ModelSource, DEFAULT_ASSIGNMENT_WEIGHT,
    DEFAULT_ATTENDANCE_WEIGHT, DEFAULT_MARKS_WEIGHT, DEFAULT_MAX_MODEL_SIZE,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Prefix of environment variables read by the server
pub const ENV_PREFIX: &str = "GRADECAST";

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Name attached to structured log events
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// ONNX model; absence is tolerated
    #[serde(default = "default_model_path")]
    pub model_path: Option<PathBuf>,

    /// Expected SHA256 of the model file
    #[serde(default)]
    pub model_checksum: Option<String>,

    #[serde(default = "default_max_model_size")]
    pub max_model_size: usize,

    /// JSON file of student records, loaded at startup and saved on shutdown
    #[serde(default)]
    pub data_path: Option<PathBuf>,

    #[serde(default = "default_marks_weight")]
    pub marks_weight: f64,

    #[serde(default = "default_attendance_weight")]
    pub attendance_weight: f64,

    #[serde(default = "default_assignment_weight")]
    pub assignment_weight: f64,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "gradecast".to_string())
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    8080
}

fn default_model_path() -> Option<PathBuf> {
    Some(PathBuf::from("models/student_model.onnx"))
}

fn default_max_model_size() -> usize {
    DEFAULT_MAX_MODEL_SIZE
}

fn default_marks_weight() -> f64 {
    DEFAULT_MARKS_WEIGHT
}

fn default_attendance_weight() -> f64 {
    DEFAULT_ATTENDANCE_WEIGHT
}

fn default_assignment_weight() -> f64 {
    DEFAULT_ASSIGNMENT_WEIGHT
}

impl ServerConfig {
    /// Load from `gradecast.toml` (optional) and `GRADECAST_*` variables
    pub fn load() -> Result<Self> {
        Self::load_from(
            Some(Path::new("gradecast")),
            ::config::Environment::with_prefix(ENV_PREFIX),
        )
    }

    /// Load from an optional file stem and an environment source
    pub fn load_from(file: Option<&Path>, env: ::config::Environment) -> Result<Self> {
        let mut builder = ::config::Config::builder();
        if let Some(file) = file {
            builder = builder.add_source(::config::File::from(file).required(false));
        }

        let config = builder
            .add_source(env.try_parsing(true))
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Invalid configuration")
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.api_port)
    }

    pub fn model_source(&self) -> Option<ModelSource> {
        let path = self.model_path.as_ref()?;
        let mut source = ModelSource::new(path).with_max_size(self.max_model_size);
        if let Some(checksum) = &self.model_checksum {
            source = source.with_checksum(checksum.clone());
        }
        Some(source)
    }

    /// Fallback scorer with the configured weights, or the defaults if they are invalid
    pub fn fallback_predictor(&self) -> FallbackPredictor {
        match FallbackWeights::new(self.marks_weight, self.attendance_weight, self.assignment_weight) {
            Ok(weights) => FallbackPredictor::with_weights(weights),
            Err(e) => {
                warn!(error = %e, "Invalid fallback weights, using defaults");
                FallbackPredictor::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(vars: &[(&str, &str)]) -> ::config::Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ::config::Environment::with_prefix(ENV_PREFIX).source(Some(map))
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::load_from(None, env(&[])).unwrap();
        assert_eq!(config.api_port, 8080);
        assert_eq!(config.listen_addr(), "0.0.0.0:8080");
        assert_eq!(
            config.model_path.as_deref(),
            Some(Path::new("models/student_model.onnx"))
        );
        assert!(config.data_path.is_none());
        assert_eq!(config.fallback_predictor().weights(), FallbackWeights::default());
    }

    #[test]
    fn test_environment_overrides() {
        let config = ServerConfig::load_from(
            None,
            env(&[
                ("GRADECAST_API_PORT", "9191"),
                ("GRADECAST_DATA_PATH", "/tmp/students.json"),
                ("GRADECAST_MODEL_CHECKSUM", "abc123"),
            ]),
        )
        .unwrap();

        assert_eq!(config.api_port, 9191);
        assert_eq!(config.data_path.as_deref(), Some(Path::new("/tmp/students.json")));
        assert_eq!(
            config.model_source().unwrap().checksum.as_deref(),
            Some("abc123")
        );
    }

    #[test]
    fn test_file_source() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("gradecast.toml");
        std::fs::write(
            &path,
            "api_port = 7000\nmarks_weight = 0.6\nattendance_weight = 0.3\nassignment_weight = 0.1\n",
        )
        .unwrap();

        let config = ServerConfig::load_from(Some(&path), env(&[])).unwrap();
        assert_eq!(config.api_port, 7000);

        let weights = config.fallback_predictor().weights();
        assert!((weights.marks() - 0.6).abs() < 1e-9);
        assert!((weights.assignment_score() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_weights_fall_back_to_defaults() {
        let config = ServerConfig::load_from(
            None,
            env(&[("GRADECAST_MARKS_WEIGHT", "0.9")]),
        )
        .unwrap();
        assert_eq!(config.fallback_predictor().weights(), FallbackWeights::default());
    }
}
