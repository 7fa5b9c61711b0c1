//! Library for student pass/fail prediction
//!
//! This crate provides the core functionality for:
//! - Feature extraction from stored student records
//! - Model-backed and rule-based pass/fail prediction
//! - Single-record and batch prediction with persistence
//! - Health checks and observability

pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod service;
pub mod store;

pub use error::{ExtractionSkip, PredictionError, StoreError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{ServiceMetrics, StructuredLogger};
pub use service::PredictionService;
pub use store::{InMemoryStudentStore, StudentStore};
