use crate::models::metric::Rating;
use crate::models::snapshot::{BugCounts, MetricSnapshot, Period, SnapshotStore};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Error, Result, Row};
use std::collections::BTreeSet;

const DB_SCHEMA_VERSION: i64 = 2;

pub fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;",
    )?;

    let mut version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if version < 1 {
        apply_migration_1(conn)?;
        version = 1;
        conn.pragma_update(None, "user_version", version)?;
    }

    if version < 2 {
        apply_migration_2(conn)?;
        version = 2;
        conn.pragma_update(None, "user_version", version)?;
    }

    if version > DB_SCHEMA_VERSION {
        // Future schema; do not fail reads/writes for forward-compatible changes.
        conn.pragma_update(None, "user_version", version)?;
    }

    Ok(())
}

fn apply_migration_1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metric_snapshots (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            period TEXT,
            team_id TEXT NOT NULL,
            project_id TEXT NOT NULL,
            security TEXT CHECK(security IN ('A', 'B', 'C', 'D', 'E')),
            reliability TEXT CHECK(reliability IN ('A', 'B', 'C', 'D', 'E')),
            maintainability TEXT CHECK(maintainability IN ('A', 'B', 'C', 'D', 'E')),
            complexity TEXT CHECK(complexity IN ('A', 'B', 'C', 'D', 'E')),
            coverage REAL,
            bugs_blocker INTEGER NOT NULL DEFAULT 0,
            bugs_critical INTEGER NOT NULL DEFAULT 0,
            bugs_major INTEGER NOT NULL DEFAULT 0,
            bugs_minor INTEGER NOT NULL DEFAULT 0,
            source_label TEXT NOT NULL,
            imported_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS imports (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            label TEXT NOT NULL,
            period TEXT,
            row_count INTEGER NOT NULL,
            imported_at INTEGER NOT NULL
        );
        ",
    )
}

fn apply_migration_2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE INDEX IF NOT EXISTS idx_metric_snapshots_period ON metric_snapshots(period);
        CREATE INDEX IF NOT EXISTS idx_metric_snapshots_team ON metric_snapshots(team_id, period);
        CREATE INDEX IF NOT EXISTS idx_imports_imported_at ON imports(imported_at);
        ",
    )
}

pub fn get_db_connection(workspace_path: &str) -> Result<Connection> {
    let db_path = format!("{workspace_path}/.okrlens/state.db");
    let conn = Connection::open(db_path)?;
    initialize_schema(&conn)?;
    Ok(conn)
}

/// Store one upload. Every period the upload carries is replaced wholesale,
/// as are undated rows previously stored under the same label.
pub fn replace_snapshots(conn: &Connection, label: &str, rows: &[MetricSnapshot]) -> Result<()> {
    let now = chrono::Utc::now().timestamp();
    let periods: BTreeSet<Period> = rows.iter().filter_map(|row| row.period).collect();

    let tx = conn.unchecked_transaction()?;

    for period in &periods {
        tx.execute(
            "DELETE FROM metric_snapshots WHERE period = ?1",
            params![period.to_string()],
        )?;
    }
    tx.execute(
        "DELETE FROM metric_snapshots WHERE period IS NULL AND source_label = ?1",
        params![label],
    )?;

    for row in rows {
        insert_snapshot(&tx, row, label, now)?;
    }

    // A single-period upload records its period; mixed uploads leave it empty.
    let import_period = match periods.len() {
        1 => periods.iter().next().map(|p| p.to_string()),
        _ => None,
    };
    tx.execute(
        "INSERT INTO imports (label, period, row_count, imported_at) VALUES (?1, ?2, ?3, ?4)",
        params![label, import_period, rows.len() as i64, now],
    )?;

    tx.commit()
}

fn stored_count(count: u64) -> Result<i64> {
    i64::try_from(count).map_err(|e| Error::ToSqlConversionFailure(Box::new(e)))
}

fn insert_snapshot(conn: &Connection, row: &MetricSnapshot, label: &str, now: i64) -> Result<()> {
    conn.execute(
        "
        INSERT INTO metric_snapshots (
            period,
            team_id,
            project_id,
            security,
            reliability,
            maintainability,
            complexity,
            coverage,
            bugs_blocker,
            bugs_critical,
            bugs_major,
            bugs_minor,
            source_label,
            imported_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
        ",
        params![
            row.period.map(|p| p.to_string()),
            row.team_id,
            row.project_id,
            row.security.map(Rating::as_str),
            row.reliability.map(Rating::as_str),
            row.maintainability.map(Rating::as_str),
            row.complexity.map(Rating::as_str),
            row.coverage,
            stored_count(row.bugs.blocker)?,
            stored_count(row.bugs.critical)?,
            stored_count(row.bugs.major)?,
            stored_count(row.bugs.minor)?,
            label,
            now,
        ],
    )?;

    Ok(())
}

pub fn load_snapshot_store(conn: &Connection) -> Result<SnapshotStore> {
    let mut stmt = conn.prepare(
        "SELECT period, team_id, project_id, security, reliability, maintainability, complexity, coverage, bugs_blocker, bugs_critical, bugs_major, bugs_minor FROM metric_snapshots ORDER BY id ASC",
    )?;

    let rows = stmt
        .query_map([], snapshot_from_row)?
        .collect::<Result<Vec<_>>>()?;

    Ok(SnapshotStore::new(rows))
}

fn snapshot_from_row(row: &Row<'_>) -> Result<MetricSnapshot> {
    let rating = |index: usize| -> Result<Option<Rating>> {
        Ok(row
            .get::<_, Option<String>>(index)?
            .and_then(|raw| Rating::parse_lenient(&raw)))
    };
    let count = |index: usize| -> Result<u64> {
        u64::try_from(row.get::<_, i64>(index)?)
            .map_err(|e| Error::FromSqlConversionFailure(index, Type::Integer, Box::new(e)))
    };

    Ok(MetricSnapshot {
        period: row
            .get::<_, Option<String>>(0)?
            .and_then(|raw| Period::parse(&raw).ok()),
        team_id: row.get(1)?,
        project_id: row.get(2)?,
        security: rating(3)?,
        reliability: rating(4)?,
        maintainability: rating(5)?,
        complexity: rating(6)?,
        coverage: row.get(7)?,
        bugs: BugCounts {
            blocker: count(8)?,
            critical: count(9)?,
            major: count(10)?,
            minor: count(11)?,
        },
    })
}

pub fn last_import_at(conn: &Connection) -> Result<Option<i64>> {
    conn.query_row("SELECT MAX(imported_at) FROM imports", [], |row| row.get(0))
}
