//! In-memory student store with optional JSON file backing

use super::StudentStore;
use crate::error::StoreError;
use crate::models::{OwnerScope, PredictionResult, Student, StudentId};
use dashmap::DashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, warn};

/// Concurrent student store keyed by id
///
/// Writes to different records never contend; concurrent writes to the
/// same record are last-write-wins.
#[derive(Debug, Default)]
pub struct InMemoryStudentStore {
    students: DashMap<StudentId, Student>,
}

impl InMemoryStudentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_students(students: impl IntoIterator<Item = Student>) -> Self {
        let store = Self::new();
        for student in students {
            store.insert(student);
        }
        store
    }

    /// Load students from a JSON array file; a missing file yields an empty store
    ///
    /// Rows that do not decode as a student are skipped with a warning. The
    /// file as a whole must still be a JSON array.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            info!(path = %path.display(), "No student data file, starting empty");
            return Ok(Self::new());
        }

        let content = fs::read_to_string(path)?;
        let rows: Vec<serde_json::Value> = serde_json::from_str(&content)?;

        let store = Self::new();
        let mut skipped = 0usize;
        for (index, row) in rows.into_iter().enumerate() {
            match serde_json::from_value::<Student>(row) {
                Ok(student) => store.insert(student),
                Err(e) => {
                    skipped += 1;
                    warn!(path = %path.display(), row = index, error = %e, "Skipping undecodable student record");
                }
            }
        }

        info!(
            path = %path.display(),
            count = store.len(),
            skipped,
            "Loaded student records"
        );
        Ok(store)
    }

    /// Write all students to a JSON file, replacing it atomically
    pub fn persist(&self, path: &Path) -> Result<(), StoreError> {
        let students = self.list(OwnerScope::All)?;
        let content = serde_json::to_vec_pretty(&students)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        // Write to temp file first
        let temp_path = path.with_extension("tmp");
        let mut file = File::create(&temp_path)?;
        file.write_all(&content)?;
        file.sync_all()?;
        fs::rename(&temp_path, path)?;

        debug!(path = %path.display(), count = students.len(), "Persisted student records");
        Ok(())
    }

    pub fn insert(&self, student: Student) {
        self.students.insert(student.id, student);
    }

    pub fn len(&self) -> usize {
        self.students.len()
    }

    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }
}

impl StudentStore for InMemoryStudentStore {
    fn get(&self, id: StudentId) -> Result<Option<Student>, StoreError> {
        Ok(self.students.get(&id).map(|entry| entry.value().clone()))
    }

    fn list(&self, scope: OwnerScope) -> Result<Vec<Student>, StoreError> {
        let mut students: Vec<Student> = self
            .students
            .iter()
            .filter(|entry| scope.contains(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        students.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(students)
    }

    fn save_prediction(&self, id: StudentId, result: &PredictionResult) -> Result<(), StoreError> {
        let mut entry = self.students.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        entry.prediction = Some(result.label.as_str().to_string());
        entry.probability = Some(result.probability);
        Ok(())
    }
}
