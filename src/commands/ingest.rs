use crate::analysis::normalizer::{normalize_rows, RawRow};
use crate::commands::db::replace_snapshots;
use crate::commands::workspace::open_store;
use crate::models::snapshot::Period;
use crate::models::workspace::ImportSummary;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

const UPLOAD_PATTERN: &str = "uploads/metri*_*.json";

/// Load one upload (a JSON array of row objects) into the workspace store.
/// `period_override` stamps every row, replacing column and file-name periods.
pub fn import_file(
    workspace_path: &str,
    file_path: &str,
    period_override: Option<Period>,
) -> Result<ImportSummary, String> {
    let raw = fs::read_to_string(file_path)
        .map_err(|e| format!("Failed to read {file_path}: {e}"))?;
    let rows: Vec<RawRow> = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse {file_path}: {e}"))?;

    let label = Path::new(file_path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_path.to_string());

    let mut snapshots = normalize_rows(&rows, &label);
    if let Some(period) = period_override {
        for snapshot in &mut snapshots {
            snapshot.period = Some(period);
        }
    }

    let conn = open_store(workspace_path)?;
    replace_snapshots(&conn, &label, &snapshots).map_err(|e| format!("Insert error: {e}"))?;

    let periods: BTreeSet<Period> = snapshots.iter().filter_map(|s| s.period).collect();
    let period = match periods.len() {
        1 => periods.into_iter().next(),
        _ => None,
    };

    log::info!(
        "Imported {label}: {} of {} rows stored",
        snapshots.len(),
        rows.len()
    );

    Ok(ImportSummary {
        label,
        period,
        rows_read: rows.len(),
        rows_stored: snapshots.len(),
    })
}

/// Import every `uploads/metri*_*.json` file in the workspace, oldest name
/// first. A file that fails to load is reported and skipped.
pub fn scan_uploads(workspace_path: &str) -> Result<Vec<ImportSummary>, String> {
    let pattern = Path::new(workspace_path).join(UPLOAD_PATTERN);
    let pattern = pattern.to_string_lossy();

    let mut files: Vec<String> = glob::glob(&pattern)
        .map_err(|e| format!("Invalid upload pattern: {e}"))?
        .filter_map(|entry| entry.ok())
        .map(|path| path.to_string_lossy().into_owned())
        .collect();
    files.sort();

    let mut summaries = Vec::with_capacity(files.len());
    for file in files {
        match import_file(workspace_path, &file, None) {
            Ok(summary) => summaries.push(summary),
            Err(e) => log::warn!("Skipping {file}: {e}"),
        }
    }

    Ok(summaries)
}
