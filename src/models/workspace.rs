use crate::models::snapshot::Period;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceMeta {
    pub path: String,
    pub teams: Vec<String>,
    pub periods: Vec<Period>,
    pub row_count: usize,
    pub last_import_at: Option<i64>,
}

/// Outcome of loading one raw file into the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSummary {
    pub label: String,
    pub period: Option<Period>,
    pub rows_read: usize,
    pub rows_stored: usize,
}
