use crate::models::metric::Rating;
use crate::models::snapshot::{BugCounts, MetricSnapshot, Period};
use serde_json::{Map, Value};

/// One uploaded row: column name to string or number cell.
pub type RawRow = Map<String, Value>;

const TEAM_COLUMNS: &[&str] = &["team_id", "celula", "team"];
const PROJECT_COLUMNS: &[&str] = &["project_id", "nombreproyecto", "project"];
const PERIOD_COLUMNS: &[&str] = &["period", "mes"];
const SECURITY_COLUMNS: &[&str] = &["security_rating", "security"];
const RELIABILITY_COLUMNS: &[&str] = &["reliability_rating", "reliability"];
const MAINTAINABILITY_COLUMNS: &[&str] = &["maintainability_rating", "sqale_rating", "maintainability"];
// The source exports the complexity grade under the duplications column name.
const COMPLEXITY_COLUMNS: &[&str] = &["complexity_rating", "duplicated_lines_density", "complexity"];
const COVERAGE_COLUMNS: &[&str] = &["coverage"];

/// Normalize one upload. Rows missing a team or project id are dropped;
/// every other defect degrades to an absent value (or 0 for bug counts).
pub fn normalize_rows(rows: &[RawRow], label: &str) -> Vec<MetricSnapshot> {
    let label_period = Period::find_in(label);
    let snapshots: Vec<MetricSnapshot> = rows
        .iter()
        .enumerate()
        .filter_map(|(index, row)| normalize_row(row, label_period, label, index))
        .collect();

    if snapshots.is_empty() {
        log::info!("No usable rows in {label}; treating it as no data");
    }

    snapshots
}

fn normalize_row(
    row: &RawRow,
    label_period: Option<Period>,
    label: &str,
    index: usize,
) -> Option<MetricSnapshot> {
    let row = trimmed_columns(row);

    let Some(team_id) = text_cell(&row, TEAM_COLUMNS) else {
        log::warn!("{label} row {index}: missing team, row skipped");
        return None;
    };
    let Some(project_id) = text_cell(&row, PROJECT_COLUMNS) else {
        log::warn!("{label} row {index}: missing project id, row skipped");
        return None;
    };

    let period = text_cell(&row, PERIOD_COLUMNS)
        .and_then(|raw| match Period::parse(&raw) {
            Ok(period) => Some(period),
            Err(_) => {
                log::warn!("{label} row {index}: unparseable period {raw:?}");
                None
            }
        })
        .or(label_period);

    if period.is_none() {
        log::warn!("{label} row {index}: no period for {project_id}");
    }

    Some(MetricSnapshot {
        security: rating_cell(&row, SECURITY_COLUMNS, &project_id),
        reliability: rating_cell(&row, RELIABILITY_COLUMNS, &project_id),
        maintainability: rating_cell(&row, MAINTAINABILITY_COLUMNS, &project_id),
        complexity: rating_cell(&row, COMPLEXITY_COLUMNS, &project_id),
        coverage: coverage_cell(&row, &project_id),
        bugs: BugCounts {
            blocker: bug_cell(&row, "bugs_blocker", &project_id),
            critical: bug_cell(&row, "bugs_critical", &project_id),
            major: bug_cell(&row, "bugs_major", &project_id),
            minor: bug_cell(&row, "bugs_minor", &project_id),
        },
        project_id,
        team_id,
        period,
    })
}

fn trimmed_columns(row: &RawRow) -> Map<String, Value> {
    row.iter()
        .map(|(key, value)| (key.trim().to_ascii_lowercase(), value.clone()))
        .collect()
}

fn lookup<'a>(row: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases
        .iter()
        .filter_map(|alias| row.get(*alias))
        .find(|value| !value.is_null())
}

fn text_cell(row: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    let text = match lookup(row, aliases)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn rating_cell(row: &Map<String, Value>, aliases: &[&str], project: &str) -> Option<Rating> {
    let raw = text_cell(row, aliases)?;
    let rating = Rating::parse_lenient(&raw);
    if rating.is_none() && !is_blank_marker(&raw) {
        log::warn!("{project}: invalid rating {raw:?} treated as absent");
    }
    rating
}

fn coverage_cell(row: &Map<String, Value>, project: &str) -> Option<f64> {
    let parsed = match lookup(row, COVERAGE_COLUMNS)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if is_blank_marker(s) => return None,
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(value) if value.is_finite() => Some(value),
        _ => {
            log::warn!("{project}: non-numeric coverage treated as absent");
            None
        }
    }
}

fn bug_cell(row: &Map<String, Value>, column: &str, project: &str) -> u64 {
    let Some(value) = lookup(row, &[column]) else {
        return 0;
    };

    let parsed = match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().and_then(whole_count)),
        Value::String(s) if is_blank_marker(s) => return 0,
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(whole_count))
        }
        _ => None,
    }
    .filter(|count| *count <= BugCounts::MAX_COUNT);

    parsed.unwrap_or_else(|| {
        log::warn!("{project}: unparseable {column} {value} counted as 0");
        0
    })
}

fn whole_count(value: f64) -> Option<u64> {
    (value.is_finite() && value >= 0.0 && value.fract() == 0.0).then_some(value as u64)
}

fn is_blank_marker(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "" | "nan" | "none" | "null" | "n/a" | "-"
    )
}
