use crate::error::EngineError;
use crate::models::metric::{Metric, Rating};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;

/// Calendar month a snapshot belongs to, rendered as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Result<Self, EngineError> {
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(|_| Period { year, month })
            .ok_or_else(|| EngineError::InvalidPeriod(format!("{year}-{month}")))
    }

    /// Accepts `YYYY-MM`, or a full date/timestamp starting with one.
    pub fn parse(raw: &str) -> Result<Self, EngineError> {
        let trimmed = raw.trim();
        let bytes = trimmed.as_bytes();
        let well_formed = bytes.len() >= 7
            && bytes[4] == b'-'
            && bytes[..4].iter().all(u8::is_ascii_digit)
            && bytes[5..7].iter().all(u8::is_ascii_digit)
            && matches!(bytes.get(7), None | Some(b'-' | b'T' | b' '));

        if !well_formed {
            return Err(EngineError::InvalidPeriod(raw.to_string()));
        }

        NaiveDate::parse_from_str(&format!("{}-01", &trimmed[..7]), "%Y-%m-%d")
            .map(|date| Period {
                year: date.year(),
                month: date.month(),
            })
            .map_err(|_| EngineError::InvalidPeriod(raw.to_string()))
    }

    /// First `YYYY-MM` token embedded in a label such as `metricas_2025-05.xlsx`.
    pub fn find_in(label: &str) -> Option<Self> {
        let bytes = label.as_bytes();
        if bytes.len() < 7 {
            return None;
        }

        (0..=bytes.len() - 7).find_map(|start| {
            let preceded_by_digit = start > 0 && bytes[start - 1].is_ascii_digit();
            let followed_by_digit = bytes.get(start + 7).is_some_and(u8::is_ascii_digit);
            if preceded_by_digit || followed_by_digit {
                return None;
            }
            label
                .get(start..start + 7)
                .and_then(|candidate| Period::parse(candidate).ok())
        })
    }

    pub fn year(self) -> i32 {
        self.year
    }

    pub fn month(self) -> u32 {
        self.month
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Period {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Period::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Bug counts by severity. Missing counts are zero, not unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BugCounts {
    pub blocker: u64,
    pub critical: u64,
    pub major: u64,
    pub minor: u64,
}

impl BugCounts {
    /// Largest count accepted per severity; it must fit an SQLite INTEGER.
    pub const MAX_COUNT: u64 = i64::MAX as u64;

    pub fn total(&self) -> u64 {
        self.blocker
            .saturating_add(self.critical)
            .saturating_add(self.major)
            .saturating_add(self.minor)
    }
}

/// A measured value for one metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Rating(Rating),
    Ratio(f64),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Rating(rating) => write!(f, "{rating}"),
            MetricValue::Ratio(value) => write!(f, "{value:.1}"),
        }
    }
}

/// One project's normalized row for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub project_id: String,
    pub team_id: String,
    pub period: Option<Period>,
    pub security: Option<Rating>,
    pub reliability: Option<Rating>,
    pub maintainability: Option<Rating>,
    pub complexity: Option<Rating>,
    pub coverage: Option<f64>,
    pub bugs: BugCounts,
}

impl MetricSnapshot {
    pub fn value(&self, metric: Metric) -> Option<MetricValue> {
        match metric {
            Metric::Security => self.security.map(MetricValue::Rating),
            Metric::Reliability => self.reliability.map(MetricValue::Rating),
            Metric::Maintainability => self.maintainability.map(MetricValue::Rating),
            Metric::Complexity => self.complexity.map(MetricValue::Rating),
            Metric::Coverage => self.coverage.map(MetricValue::Ratio),
        }
    }
}

/// Every snapshot row known to the engine, dated or not.
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    rows: Vec<MetricSnapshot>,
}

impl SnapshotStore {
    pub fn new(rows: Vec<MetricSnapshot>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[MetricSnapshot] {
        &self.rows
    }

    /// Distinct dated periods, ascending.
    pub fn periods(&self) -> Vec<Period> {
        self.rows
            .iter()
            .filter_map(|row| row.period)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Periods in which `team` has at least one row, ascending.
    pub fn team_periods(&self, team: &str) -> Vec<Period> {
        self.rows
            .iter()
            .filter(|row| row.team_id == team)
            .filter_map(|row| row.period)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn teams(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| row.team_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn latest_period(&self) -> Option<Period> {
        self.rows.iter().filter_map(|row| row.period).max()
    }

    pub fn period_rows(&self, period: Period) -> Vec<&MetricSnapshot> {
        self.rows
            .iter()
            .filter(|row| row.period == Some(period))
            .collect()
    }

    pub fn team_rows(&self, team: &str, period: Period) -> Vec<&MetricSnapshot> {
        self.rows
            .iter()
            .filter(|row| row.team_id == team && row.period == Some(period))
            .collect()
    }

    /// The team's rows in its most recent period, followed by its undated rows.
    pub fn latest_rows(&self, team: &str) -> Vec<&MetricSnapshot> {
        let latest = self.team_periods(team).last().copied();
        self.rows
            .iter()
            .filter(|row| row.team_id == team)
            .filter(|row| row.period.is_none() || row.period == latest)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(team: &str, project: &str, period: Option<&str>) -> MetricSnapshot {
        MetricSnapshot {
            project_id: project.to_string(),
            team_id: team.to_string(),
            period: period.map(|p| Period::parse(p).unwrap()),
            security: None,
            reliability: None,
            maintainability: None,
            complexity: None,
            coverage: None,
            bugs: BugCounts::default(),
        }
    }

    #[test]
    fn parses_month_labels_and_timestamps() {
        assert_eq!(Period::parse("2025-05").unwrap().to_string(), "2025-05");
        assert_eq!(Period::parse("2025-05-01 00:00:00").unwrap().month(), 5);
        assert!(Period::parse("2025-13").is_err());
        assert!(Period::parse("May 2025").is_err());
        assert!(Period::parse("2025-5").is_err());
    }

    #[test]
    fn finds_period_inside_upload_file_name() {
        assert_eq!(
            Period::find_in("metricas_2025-05.xlsx").map(|p| p.to_string()),
            Some("2025-05".to_string())
        );
        assert_eq!(Period::find_in("metrics_latest.json"), None);
        assert_eq!(Period::find_in("export_12025-05.json"), None);
    }

    #[test]
    fn periods_are_sorted_chronologically() {
        let store = SnapshotStore::new(vec![
            row("core", "a", Some("2025-02")),
            row("core", "a", Some("2024-12")),
            row("web", "b", Some("2025-03")),
            row("core", "c", None),
        ]);

        let labels: Vec<String> = store.periods().iter().map(|p| p.to_string()).collect();
        assert_eq!(labels, vec!["2024-12", "2025-02", "2025-03"]);
        assert_eq!(store.team_periods("core").len(), 2);
        assert_eq!(store.latest_period().unwrap().to_string(), "2025-03");
    }

    #[test]
    fn latest_rows_include_undated_rows() {
        let store = SnapshotStore::new(vec![
            row("core", "old", Some("2025-01")),
            row("core", "new", Some("2025-02")),
            row("core", "undated", None),
        ]);

        let ids: Vec<&str> = store
            .latest_rows("core")
            .iter()
            .map(|r| r.project_id.as_str())
            .collect();
        assert_eq!(ids, vec!["new", "undated"]);
    }
}
