use std::sync::{Arc, Mutex};

use super::models::{Case, NewCase};

#[derive(Debug, thiserror::Error)]
pub enum CaseStoreError {
    #[error("invalid image reference: {0}")]
    InvalidImageRef(String),
    #[error("empty {0}")]
    EmptyField(&'static str),
}

/// In-memory, process-lifetime case history. Append-only: cases are
/// prepended and never updated or removed. Constructed once at startup
/// and injected into the handlers that need it.
#[derive(Clone, Default)]
pub struct CaseStore {
    cases: Arc<Mutex<Vec<Case>>>,
}

impl CaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_case(&self, new_case: NewCase) -> Result<Case, CaseStoreError> {
        if new_case.condition.trim().is_empty() {
            return Err(CaseStoreError::EmptyField("condition"));
        }
        if new_case.advice.trim().is_empty() {
            return Err(CaseStoreError::EmptyField("advice"));
        }
        if !is_valid_image_ref(&new_case.image_ref) {
            return Err(CaseStoreError::InvalidImageRef(new_case.image_ref));
        }

        let case = Case::new(new_case);
        let mut cases = self.cases.lock().unwrap();
        cases.insert(0, case.clone());
        Ok(case)
    }

    /// Most-recent-first snapshot of the history.
    pub fn list_cases(&self) -> Vec<Case> {
        self.cases.lock().unwrap().clone()
    }
}

/// Opaque image references come from the capturing client; only local
/// file, content-provider, and http(s) URIs are accepted.
fn is_valid_image_ref(uri: &str) -> bool {
    uri.starts_with("file://") || uri.starts_with("content://") || uri.starts_with("http")
}
