use crate::commands::db::{get_db_connection, last_import_at, load_snapshot_store};
use crate::models::snapshot::SnapshotStore;
use crate::models::workspace::WorkspaceMeta;
use rusqlite::Connection;
use std::fs;
use std::path::Path;

pub fn open_workspace(path: &str) -> Result<WorkspaceMeta, String> {
    let workspace_path = Path::new(path);

    if !workspace_path.is_dir() {
        return Err("PATH_NOT_FOUND: Directory does not exist".to_string());
    }

    // Create .okrlens directory
    let okrlens_dir = workspace_path.join(".okrlens");
    fs::create_dir_all(&okrlens_dir)
        .map_err(|e| format!("INIT_FAILED: Could not create .okrlens directory: {e}"))?;

    // Initialize SQLite database with migrations.
    let conn = get_db_connection(path)
        .map_err(|e| format!("INIT_FAILED: Could not initialize database: {e}"))?;

    // Initialize settings file with defaults/migrations.
    crate::commands::settings::load_settings_from_disk(path)
        .map_err(|e| format!("INIT_FAILED: Could not initialize settings: {e}"))?;

    let store = load_snapshot_store(&conn).map_err(|e| format!("DB error: {e}"))?;
    let last_import_at = last_import_at(&conn).map_err(|e| format!("DB error: {e}"))?;

    Ok(WorkspaceMeta {
        path: path.to_string(),
        teams: store.teams(),
        periods: store.periods(),
        row_count: store.rows().len(),
        last_import_at,
    })
}

/// Database handle for a workspace, creating `.okrlens/` on first use.
pub fn open_store(workspace_path: &str) -> Result<Connection, String> {
    fs::create_dir_all(Path::new(workspace_path).join(".okrlens"))
        .map_err(|e| format!("Failed to create .okrlens directory: {e}"))?;
    get_db_connection(workspace_path).map_err(|e| format!("DB error: {e}"))
}

pub fn load_store(workspace_path: &str) -> Result<SnapshotStore, String> {
    let conn = open_store(workspace_path)?;
    load_snapshot_store(&conn).map_err(|e| format!("Query error: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_missing_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("nope");
        let err = open_workspace(&missing.to_string_lossy()).unwrap_err();
        assert!(err.starts_with("PATH_NOT_FOUND"));
    }

    #[test]
    fn initializes_state_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let meta = open_workspace(&dir.path().to_string_lossy()).expect("open");

        assert!(dir.path().join(".okrlens/state.db").exists());
        assert!(dir.path().join(".okrlens/settings.json").exists());
        assert_eq!(meta.row_count, 0);
        assert!(meta.periods.is_empty());
        assert_eq!(meta.last_import_at, None);
    }
}
