use crate::analysis::okr::round_half_up;
use crate::models::metric::Metric;
use crate::models::snapshot::{MetricValue, Period};
use serde::{Deserialize, Serialize};

/// How many in-scope projects meet a metric's threshold in one period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComplianceResult {
    pub total_in_scope: usize,
    pub compliant_count: usize,
    /// `None` when nothing was in scope; render as "N/A", never 0%.
    pub raw_percentage: Option<f64>,
}

impl ComplianceResult {
    pub fn from_counts(total_in_scope: usize, compliant_count: usize) -> Self {
        let compliant_count = compliant_count.min(total_in_scope);
        let raw_percentage = if total_in_scope == 0 {
            None
        } else {
            Some(100.0 * compliant_count as f64 / total_in_scope as f64)
        };

        Self {
            total_in_scope,
            compliant_count,
            raw_percentage,
        }
    }

    pub fn is_undefined(&self) -> bool {
        self.raw_percentage.is_none()
    }

    /// Whole-number percentage for tables (66.67 -> 67).
    pub fn display_percentage(&self) -> Option<i64> {
        self.raw_percentage.map(round_half_up)
    }
}

/// Compliance expressed against the configured goal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OkrResult {
    pub goal_percentage: f64,
    pub target_count: usize,
    pub compliant_count: usize,
    /// Uncapped; `None` means no data for the period.
    pub okr_percentage: Option<i64>,
}

impl OkrResult {
    pub fn meets_goal(&self) -> Option<bool> {
        self.okr_percentage.map(|okr| okr >= 100)
    }

    /// Points missing to reach 100%, zero once met.
    pub fn shortfall(&self) -> Option<i64> {
        self.okr_percentage.map(|okr| (100 - okr).max(0))
    }

    /// Progress-bar fill, the only place the OKR is clamped.
    pub fn progress_fill(&self) -> Option<i64> {
        self.okr_percentage.map(|okr| okr.clamp(0, 100))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Pass,
    Fail,
    /// No value and the N/A policy drops it from the denominator.
    NotApplicable,
}

/// One in-scope project's standing for a metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectOutcome {
    pub project_id: String,
    pub value: Option<MetricValue>,
    pub status: ProjectStatus,
}

impl ProjectOutcome {
    pub fn counted(&self) -> bool {
        self.status != ProjectStatus::NotApplicable
    }

    pub fn passed(&self) -> bool {
        self.status == ProjectStatus::Pass
    }
}

/// A project that met the threshold in the earlier period and fails it now.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Regression {
    pub project_id: String,
    pub value_before: MetricValue,
    pub value_after: MetricValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendBasis {
    Okr,
    Raw,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub period: Period,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSeries {
    pub team_id: String,
    pub metric: Metric,
    pub basis: TrendBasis,
    pub points: Vec<TrendPoint>,
}
