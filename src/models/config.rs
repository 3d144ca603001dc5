use crate::models::metric::{Metric, PerMetric, Rating};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

/// Acceptable grades per rating metric plus the coverage floor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub security: BTreeSet<Rating>,
    pub reliability: BTreeSet<Rating>,
    pub maintainability: BTreeSet<Rating>,
    pub complexity: BTreeSet<Rating>,
    pub coverage_min: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        let all: BTreeSet<Rating> = Rating::ALL.into_iter().collect();
        Self {
            security: all.clone(),
            reliability: all.clone(),
            maintainability: all.clone(),
            complexity: all,
            coverage_min: 0.0,
        }
    }
}

impl ThresholdConfig {
    /// Grade set for a rating metric; `None` for coverage.
    pub fn grades(&self, metric: Metric) -> Option<&BTreeSet<Rating>> {
        match metric {
            Metric::Security => Some(&self.security),
            Metric::Reliability => Some(&self.reliability),
            Metric::Maintainability => Some(&self.maintainability),
            Metric::Complexity => Some(&self.complexity),
            Metric::Coverage => None,
        }
    }
}

/// Which metrics restrict a team to its hand-picked projects, and the picks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeConfig {
    pub use_selected_only: PerMetric<bool>,
    pub selected: BTreeMap<String, Vec<String>>,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            use_selected_only: PerMetric::from_fn(|metric| metric == Metric::Coverage),
            selected: BTreeMap::new(),
        }
    }
}

impl ScopeConfig {
    pub fn selection(&self, team: &str) -> &[String] {
        self.selected.get(team).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Per metric: keep projects without a value (counted as failing) or drop them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NaPolicy(pub PerMetric<bool>);

impl Default for NaPolicy {
    fn default() -> Self {
        NaPolicy(PerMetric::from_fn(|_| false))
    }
}

impl NaPolicy {
    pub fn include_na(&self, metric: Metric) -> bool {
        *self.0.get(metric)
    }
}

/// OKR target percentage per metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GoalConfig(pub PerMetric<f64>);

impl Default for GoalConfig {
    fn default() -> Self {
        GoalConfig(PerMetric::from_fn(|metric| match metric {
            Metric::Coverage => 50.0,
            _ => 90.0,
        }))
    }
}

impl GoalConfig {
    pub fn goal(&self, metric: Metric) -> f64 {
        *self.0.get(metric)
    }
}

pub fn default_displayed_metrics() -> Vec<Metric> {
    vec![
        Metric::Reliability,
        Metric::Maintainability,
        Metric::Coverage,
        Metric::Complexity,
    ]
}

pub fn default_excluded_teams() -> Vec<String> {
    vec!["obsoleta".to_string(), "nan".to_string()]
}

/// Everything a computation reads besides the snapshots themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub thresholds: ThresholdConfig,
    pub scope: ScopeConfig,
    pub na_policy: NaPolicy,
    pub goals: GoalConfig,
    pub displayed_metrics: Vec<Metric>,
    pub excluded_teams: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            thresholds: ThresholdConfig::default(),
            scope: ScopeConfig::default(),
            na_policy: NaPolicy::default(),
            goals: GoalConfig::default(),
            displayed_metrics: default_displayed_metrics(),
            excluded_teams: default_excluded_teams(),
        }
    }
}

impl EngineConfig {
    /// Case-insensitive match against the excluded team list.
    pub fn is_team_excluded(&self, team: &str) -> bool {
        let team = team.trim();
        self.excluded_teams
            .iter()
            .any(|excluded| excluded.trim().eq_ignore_ascii_case(team))
    }
}

/// Process-wide configuration slot. Readers take one `Arc` per computation,
/// so a concurrent `replace` is never observed halfway through a call.
#[derive(Debug, Clone, Default)]
pub struct SharedConfig {
    inner: Arc<Mutex<Arc<EngineConfig>>>,
}

impl SharedConfig {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Arc::new(config))),
        }
    }

    pub fn snapshot(&self) -> Arc<EngineConfig> {
        match self.inner.lock() {
            Ok(lock) => Arc::clone(&*lock),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    pub fn replace(&self, config: EngineConfig) {
        let next = Arc::new(config);
        match self.inner.lock() {
            Ok(mut lock) => *lock = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_let_every_grade_pass_and_scope_coverage_to_selection() {
        let config = EngineConfig::default();
        assert_eq!(config.thresholds.reliability.len(), 5);
        assert_eq!(config.thresholds.coverage_min, 0.0);
        assert!(*config.scope.use_selected_only.get(Metric::Coverage));
        assert!(!*config.scope.use_selected_only.get(Metric::Reliability));
        assert!(!config.na_policy.include_na(Metric::Complexity));
        assert_eq!(config.goals.goal(Metric::Coverage), 50.0);
        assert_eq!(config.goals.goal(Metric::Security), 90.0);
        assert!(!config.displayed_metrics.contains(&Metric::Security));
    }

    #[test]
    fn excluded_teams_match_case_insensitively() {
        let config = EngineConfig::default();
        assert!(config.is_team_excluded("Obsoleta"));
        assert!(config.is_team_excluded(" NaN "));
        assert!(!config.is_team_excluded("Payments"));
    }

    #[test]
    fn snapshot_is_unaffected_by_later_replace() {
        let shared = SharedConfig::new(EngineConfig::default());
        let before = shared.snapshot();

        let mut updated = EngineConfig::default();
        updated.thresholds.coverage_min = 80.0;
        shared.replace(updated);

        assert_eq!(before.thresholds.coverage_min, 0.0);
        assert_eq!(shared.snapshot().thresholds.coverage_min, 80.0);
    }

    #[test]
    fn deserializes_partial_json_with_defaults() {
        let config: EngineConfig = serde_json::from_value(serde_json::json!({
            "thresholds": { "reliability": ["A", "B"] },
            "goals": { "security": 80, "reliability": 70, "maintainability": 90,
                       "coverage": 40, "complexity": 90 }
        }))
        .unwrap();

        assert_eq!(config.thresholds.reliability.len(), 2);
        assert_eq!(config.thresholds.security.len(), 5);
        assert_eq!(config.goals.goal(Metric::Reliability), 70.0);
        assert!(!config.na_policy.include_na(Metric::Coverage));
    }
}
