use crate::analysis::scope;
use crate::models::compliance::{ComplianceResult, ProjectOutcome, ProjectStatus};
use crate::models::config::{EngineConfig, ThresholdConfig};
use crate::models::metric::Metric;
use crate::models::snapshot::{MetricSnapshot, MetricValue};
use std::collections::{BTreeMap, BTreeSet};

/// Rating metrics pass on a configured grade, coverage on reaching the floor.
pub fn passes(metric: Metric, value: &MetricValue, thresholds: &ThresholdConfig) -> bool {
    match (value, thresholds.grades(metric)) {
        (MetricValue::Rating(rating), Some(grades)) => grades.contains(rating),
        (MetricValue::Ratio(ratio), None) => *ratio >= thresholds.coverage_min,
        _ => false,
    }
}

/// Classify one project's value under the thresholds and N/A policy.
pub fn classify(
    metric: Metric,
    project_id: &str,
    value: Option<MetricValue>,
    config: &EngineConfig,
) -> ProjectOutcome {
    let status = match &value {
        Some(v) if passes(metric, v, &config.thresholds) => ProjectStatus::Pass,
        Some(_) => ProjectStatus::Fail,
        None if config.na_policy.include_na(metric) => ProjectStatus::Fail,
        None => ProjectStatus::NotApplicable,
    };

    ProjectOutcome {
        project_id: project_id.to_string(),
        value,
        status,
    }
}

/// Per-project outcomes for a team's in-scope projects, ordered by id.
/// A project listed twice in one period is read from its first row.
pub fn evaluate_projects(
    team: &str,
    metric: Metric,
    rows: &[&MetricSnapshot],
    config: &EngineConfig,
) -> Vec<ProjectOutcome> {
    let in_scope = scope::resolve(team, metric, rows, config);

    let mut first_rows: BTreeMap<&str, &MetricSnapshot> = BTreeMap::new();
    for &row in rows.iter().filter(|row| row.team_id == team) {
        first_rows.entry(row.project_id.as_str()).or_insert(row);
    }

    in_scope
        .iter()
        .filter_map(|project| first_rows.get(project.as_str()))
        .map(|row| classify(metric, &row.project_id, row.value(metric), config))
        .collect()
}

/// Counts over outcomes: N/A rows leave the denominator, everything else stays.
pub fn summarize(outcomes: &[ProjectOutcome]) -> ComplianceResult {
    let total = outcomes.iter().filter(|o| o.counted()).count();
    let compliant = outcomes.iter().filter(|o| o.passed()).count();
    ComplianceResult::from_counts(total, compliant)
}

pub fn evaluate(
    team: &str,
    metric: Metric,
    rows: &[&MetricSnapshot],
    config: &EngineConfig,
) -> ComplianceResult {
    let outcomes = evaluate_projects(team, metric, rows, config);
    let result = summarize(&outcomes);
    log::debug!(
        "compliance {team}/{metric}: {}/{} compliant",
        result.compliant_count,
        result.total_in_scope
    );
    result
}

/// Mean of the ratio values that counted; `None` when there are none.
pub fn average_value(outcomes: &[ProjectOutcome]) -> Option<f64> {
    let values: Vec<f64> = outcomes
        .iter()
        .filter_map(|o| match o.value {
            Some(MetricValue::Ratio(v)) => Some(v),
            _ => None,
        })
        .collect();

    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Organization-wide compliance for one period: every project of every
/// non-excluded team. Team selections do not apply; thresholds, N/A policy and
/// the coverage hard exclusions do.
pub fn evaluate_org(
    metric: Metric,
    rows: &[&MetricSnapshot],
    config: &EngineConfig,
) -> ComplianceResult {
    let mut seen: BTreeSet<(&str, &str)> = BTreeSet::new();
    let outcomes: Vec<ProjectOutcome> = rows
        .iter()
        .filter(|row| !config.is_team_excluded(&row.team_id))
        .filter(|row| !scope::is_hard_excluded(metric, &row.project_id))
        .filter(|row| seen.insert((row.team_id.as_str(), row.project_id.as_str())))
        .map(|row| classify(metric, &row.project_id, row.value(metric), config))
        .collect();

    summarize(&outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::metric::Rating;
    use crate::models::snapshot::BugCounts;
    use proptest::prelude::*;

    fn rated(project: &str, reliability: Option<Rating>) -> MetricSnapshot {
        MetricSnapshot {
            project_id: project.to_string(),
            team_id: "T".to_string(),
            period: None,
            security: None,
            reliability,
            maintainability: None,
            complexity: None,
            coverage: None,
            bugs: BugCounts::default(),
        }
    }

    fn covered(project: &str, coverage: Option<f64>) -> MetricSnapshot {
        MetricSnapshot {
            coverage,
            ..rated(project, None)
        }
    }

    #[test]
    fn reliability_scenario_drops_absent_values() {
        let rows = [
            rated("p1", Some(Rating::A)),
            rated("p2", Some(Rating::B)),
            rated("p3", Some(Rating::C)),
            rated("p4", None),
        ];
        let refs: Vec<&MetricSnapshot> = rows.iter().collect();
        let mut config = EngineConfig::default();
        config.thresholds.reliability = [Rating::A, Rating::B].into_iter().collect();

        let result = evaluate("T", Metric::Reliability, &refs, &config);
        assert_eq!(result.total_in_scope, 3);
        assert_eq!(result.compliant_count, 2);
        assert!((result.raw_percentage.unwrap() - 66.67).abs() < 0.01);
        assert_eq!(result.display_percentage(), Some(67));
    }

    #[test]
    fn coverage_scenario_counts_absent_as_failing() {
        let rows = [
            covered("p1", Some(40.0)),
            covered("p2", Some(60.0)),
            covered("p3", None),
        ];
        let refs: Vec<&MetricSnapshot> = rows.iter().collect();
        let mut config = EngineConfig::default();
        config.thresholds.coverage_min = 50.0;
        *config.na_policy.0.get_mut(Metric::Coverage) = true;

        let outcomes = evaluate_projects("T", Metric::Coverage, &refs, &config);
        let result = summarize(&outcomes);
        assert_eq!(result.total_in_scope, 3);
        assert_eq!(result.compliant_count, 1);
        assert_eq!(result.display_percentage(), Some(33));
        assert_eq!(outcomes[2].status, ProjectStatus::Fail);
        assert_eq!(average_value(&outcomes), Some(50.0));
    }

    #[test]
    fn empty_grade_set_lets_nothing_pass() {
        let rows = [rated("p1", Some(Rating::A))];
        let refs: Vec<&MetricSnapshot> = rows.iter().collect();
        let mut config = EngineConfig::default();
        config.thresholds.reliability.clear();

        let result = evaluate("T", Metric::Reliability, &refs, &config);
        assert_eq!(result.total_in_scope, 1);
        assert_eq!(result.compliant_count, 0);
    }

    #[test]
    fn no_rows_is_undefined_not_zero() {
        let result = evaluate("T", Metric::Security, &[], &EngineConfig::default());
        assert_eq!(result.total_in_scope, 0);
        assert_eq!(result.raw_percentage, None);
    }

    #[test]
    fn duplicate_project_rows_count_once() {
        let rows = [rated("p1", Some(Rating::A)), rated("p1", Some(Rating::E))];
        let refs: Vec<&MetricSnapshot> = rows.iter().collect();
        let mut config = EngineConfig::default();
        config.thresholds.reliability = [Rating::A].into_iter().collect();

        let result = evaluate("T", Metric::Reliability, &refs, &config);
        assert_eq!((result.total_in_scope, result.compliant_count), (1, 1));
    }

    #[test]
    fn org_view_skips_excluded_teams_and_selections() {
        let mut rows = vec![covered("a", Some(80.0)), covered("b", Some(10.0))];
        rows.push(MetricSnapshot {
            team_id: "Obsoleta".to_string(),
            ..covered("c", Some(90.0))
        });
        let refs: Vec<&MetricSnapshot> = rows.iter().collect();
        let mut config = EngineConfig::default();
        config.thresholds.coverage_min = 50.0;
        config
            .scope
            .selected
            .insert("T".to_string(), vec!["a".to_string()]);

        let result = evaluate_org(Metric::Coverage, &refs, &config);
        assert_eq!((result.total_in_scope, result.compliant_count), (2, 1));
    }

    fn arb_rating() -> impl Strategy<Value = Option<Rating>> {
        prop_oneof![
            Just(None),
            proptest::sample::select(Rating::ALL.to_vec()).prop_map(Some),
        ]
    }

    proptest! {
        #[test]
        fn including_absent_values_never_changes_compliant_count(
            ratings in proptest::collection::vec(arb_rating(), 0..12),
            grades in proptest::collection::btree_set(
                proptest::sample::select(Rating::ALL.to_vec()), 0..5),
        ) {
            let rows: Vec<MetricSnapshot> = ratings
                .iter()
                .enumerate()
                .map(|(i, r)| rated(&format!("p{i}"), *r))
                .collect();
            let refs: Vec<&MetricSnapshot> = rows.iter().collect();

            let mut excluding = EngineConfig::default();
            excluding.thresholds.reliability = grades;
            let mut including = excluding.clone();
            *including.na_policy.0.get_mut(Metric::Reliability) = true;

            let without_na = evaluate("T", Metric::Reliability, &refs, &excluding);
            let with_na = evaluate("T", Metric::Reliability, &refs, &including);
            prop_assert!(without_na.total_in_scope <= with_na.total_in_scope);
            prop_assert_eq!(without_na.compliant_count, with_na.compliant_count);
            prop_assert!(with_na.compliant_count <= with_na.total_in_scope);
        }
    }
}
