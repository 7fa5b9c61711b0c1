//! Student persistence
//!
//! The prediction service only needs to read records and write back the
//! `prediction`/`probability` pair, so that is all the trait exposes.

mod memory;

pub use memory::InMemoryStudentStore;

use crate::error::StoreError;
use crate::models::{OwnerScope, PredictionResult, Student, StudentId};

/// Storage backend for student records
pub trait StudentStore: Send + Sync {
    /// Fetch one student
    fn get(&self, id: StudentId) -> Result<Option<Student>, StoreError>;

    /// All students in scope, newest id first
    fn list(&self, scope: OwnerScope) -> Result<Vec<Student>, StoreError>;

    /// Write a prediction onto an existing record
    fn save_prediction(&self, id: StudentId, result: &PredictionResult) -> Result<(), StoreError>;
}
