use crate::models::compliance::{ComplianceResult, OkrResult, ProjectOutcome, Regression};
use crate::models::metric::Metric;
use crate::models::snapshot::{BugCounts, Period};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BugRollup {
    pub blocker: u64,
    pub critical: u64,
    pub major: u64,
    pub minor: u64,
    pub total: u64,
}

impl BugRollup {
    pub fn add(&mut self, bugs: &BugCounts) {
        self.blocker = self.blocker.saturating_add(bugs.blocker);
        self.critical = self.critical.saturating_add(bugs.critical);
        self.major = self.major.saturating_add(bugs.major);
        self.minor = self.minor.saturating_add(bugs.minor);
        self.total = BugCounts {
            blocker: self.blocker,
            critical: self.critical,
            major: self.major,
            minor: self.minor,
        }
        .total();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BugTrendPoint {
    pub period: Period,
    pub rollup: BugRollup,
    /// Signed change in total bugs against the previous period in the series.
    pub growth: Option<i64>,
    /// Backlog removed relative to the January baseline, may be negative.
    pub backlog_elimination: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectBugDelta {
    pub project_id: String,
    pub total: u64,
    pub previous_total: u64,
    pub variation: i64,
    pub bugs: BugCounts,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BugVariationReport {
    pub period: Option<Period>,
    pub previous_period: Option<Period>,
    pub increased: Vec<ProjectBugDelta>,
    pub decreased: Vec<ProjectBugDelta>,
    pub projects_compared: usize,
    pub increased_count: usize,
    pub reduced_count: usize,
    pub unchanged_count: usize,
    pub total_current: u64,
    pub total_previous: u64,
    pub total_variation: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BugReport {
    pub team_id: String,
    pub trend: Vec<BugTrendPoint>,
    pub variations: BugVariationReport,
}

/// One row of a team's OKR table plus the per-project detail behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricReport {
    pub metric: Metric,
    pub label: String,
    pub compliance: ComplianceResult,
    pub okr: OkrResult,
    pub projects: Vec<ProjectOutcome>,
    /// Mean of the counted values; coverage only.
    pub average_value: Option<f64>,
    /// Hard-excluded projects present for the team, listed apart.
    pub excluded_projects: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRegressions {
    pub metric: Metric,
    pub regressions: Vec<Regression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamReport {
    pub team_id: String,
    pub period: Option<Period>,
    pub previous_period: Option<Period>,
    pub metrics: Vec<MetricReport>,
    pub bugs: BugRollup,
    pub regressions: Vec<MetricRegressions>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrgMetricSummary {
    pub metric: Metric,
    pub label: String,
    pub compliance: ComplianceResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrgSummary {
    pub period: Option<Period>,
    pub project_count: usize,
    pub metrics: Vec<OrgMetricSummary>,
    pub projects_per_team: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualMonth {
    pub period: Period,
    pub okr: BTreeMap<Metric, Option<i64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualMetricSummary {
    pub metric: Metric,
    pub months_met: usize,
    pub months_with_data: usize,
    /// Share of months at or above 100% OKR, one decimal.
    pub met_percentage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualSummary {
    pub team_id: String,
    pub year: i32,
    pub months: Vec<AnnualMonth>,
    pub metrics: Vec<AnnualMetricSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rollup_total_tracks_severities() {
        let mut rollup = BugRollup::default();
        rollup.add(&BugCounts {
            blocker: 1,
            critical: 2,
            major: 3,
            minor: 4,
        });
        rollup.add(&BugCounts {
            blocker: 0,
            critical: 0,
            major: 0,
            minor: 5,
        });
        assert_eq!(rollup.minor, 9);
        assert_eq!(rollup.total, 15);
    }
}
