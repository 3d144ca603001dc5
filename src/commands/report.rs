use crate::analysis::{bugs, compliance, okr, scope, trend};
use crate::commands::workspace::load_store;
use crate::error::EngineError;
use crate::models::compliance::{TrendBasis, TrendSeries};
use crate::models::config::{EngineConfig, SharedConfig};
use crate::models::metric::Metric;
use crate::models::report::{
    AnnualSummary, BugReport, MetricRegressions, MetricReport, OrgMetricSummary,
    OrgSummary, TeamReport,
};
use crate::models::snapshot::{MetricSnapshot, Period, SnapshotStore};
use std::collections::{BTreeMap, BTreeSet};

pub const DEFAULT_TOP_N: usize = 5;

// Each command reads the configuration once and uses that copy for the whole
// computation.

pub fn team_report(
    workspace_path: &str,
    config: &SharedConfig,
    team: &str,
    period: Option<Period>,
) -> Result<TeamReport, String> {
    let config = config.snapshot();
    let store = load_store(workspace_path)?;
    build_team_report(&store, team, period, &config).map_err(|e| e.to_string())
}

pub fn trend_report(
    workspace_path: &str,
    config: &SharedConfig,
    team: &str,
    metric: Metric,
    basis: TrendBasis,
) -> Result<TrendSeries, String> {
    let config = config.snapshot();
    let store = load_store(workspace_path)?;
    trend::build_trend(&store, team, metric, &store.team_periods(team), basis, &config)
        .map_err(|e| e.to_string())
}

pub fn org_summary(
    workspace_path: &str,
    config: &SharedConfig,
    period: Option<Period>,
) -> Result<OrgSummary, String> {
    let config = config.snapshot();
    let store = load_store(workspace_path)?;
    Ok(build_org_summary(&store, period, &config))
}

pub fn annual_report(
    workspace_path: &str,
    config: &SharedConfig,
    team: &str,
    year: i32,
) -> Result<AnnualSummary, String> {
    let config = config.snapshot();
    let store = load_store(workspace_path)?;
    trend::annual_summary(&store, team, year, &config).map_err(|e| e.to_string())
}

pub fn bug_report(workspace_path: &str, team: &str, top_n: usize) -> Result<BugReport, String> {
    let store = load_store(workspace_path)?;
    Ok(build_bug_report(&store, team, top_n))
}

/// OKR table, per-project detail, bug roll-up and regressions for one team.
///
/// Without an explicit period the team's latest period is used; a team with
/// only undated rows is reported from those rows, with no regressions.
pub fn build_team_report(
    store: &SnapshotStore,
    team: &str,
    period: Option<Period>,
    config: &EngineConfig,
) -> Result<TeamReport, EngineError> {
    let team_periods = store.team_periods(team);
    let period = period.or_else(|| team_periods.last().copied());

    let rows: Vec<&MetricSnapshot> = match period {
        Some(period) => store.team_rows(team, period),
        None => store.latest_rows(team),
    };

    let mut metrics = Vec::with_capacity(config.displayed_metrics.len());
    for &metric in &config.displayed_metrics {
        metrics.push(metric_report(team, metric, &rows, config)?);
    }

    let bugs = match period {
        Some(period) => bugs::rollup(store, team, period),
        None => bugs::rollup_rows(&rows),
    };

    let previous_period = period.and_then(|p| trend::previous_period(&team_periods, p));
    let mut regressions = Vec::new();
    if let Some(current) = period {
        for &metric in &config.displayed_metrics {
            let (_, found) =
                trend::regressions_since_previous(store, team, metric, current, config)?;
            if !found.is_empty() {
                regressions.push(MetricRegressions {
                    metric,
                    regressions: found,
                });
            }
        }
    }

    Ok(TeamReport {
        team_id: team.to_string(),
        period,
        previous_period,
        metrics,
        bugs,
        regressions,
    })
}

fn metric_report(
    team: &str,
    metric: Metric,
    rows: &[&MetricSnapshot],
    config: &EngineConfig,
) -> Result<MetricReport, EngineError> {
    let projects = compliance::evaluate_projects(team, metric, rows, config);
    let result = compliance::summarize(&projects);
    let okr = okr::compute_okr(&result, config.goals.goal(metric))?;
    let average_value = if metric.is_rating() {
        None
    } else {
        compliance::average_value(&projects)
    };

    Ok(MetricReport {
        metric,
        label: metric.label().to_string(),
        compliance: result,
        okr,
        projects,
        average_value,
        excluded_projects: scope::excluded_present(team, metric, rows),
    })
}

/// Compliance across every non-excluded team for one period (latest by default).
pub fn build_org_summary(
    store: &SnapshotStore,
    period: Option<Period>,
    config: &EngineConfig,
) -> OrgSummary {
    let period = period.or_else(|| store.latest_period());
    let rows: Vec<&MetricSnapshot> = period
        .map(|period| store.period_rows(period))
        .unwrap_or_default();

    let projects: BTreeSet<(&str, &str)> = rows
        .iter()
        .filter(|row| !config.is_team_excluded(&row.team_id))
        .map(|row| (row.team_id.as_str(), row.project_id.as_str()))
        .collect();

    let mut projects_per_team: BTreeMap<String, usize> = BTreeMap::new();
    for (team, _) in &projects {
        *projects_per_team.entry(team.to_string()).or_default() += 1;
    }

    let metrics = config
        .displayed_metrics
        .iter()
        .map(|&metric| OrgMetricSummary {
            metric,
            label: metric.label().to_string(),
            compliance: compliance::evaluate_org(metric, &rows, config),
        })
        .collect();

    OrgSummary {
        period,
        project_count: projects.len(),
        metrics,
        projects_per_team,
    }
}

pub fn build_bug_report(store: &SnapshotStore, team: &str, top_n: usize) -> BugReport {
    BugReport {
        team_id: team.to_string(),
        trend: bugs::bug_trend(store, team),
        variations: bugs::bug_variations(store, team, top_n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::compliance::ProjectStatus;
    use crate::models::metric::Rating;
    use crate::models::snapshot::BugCounts;

    fn row(team: &str, project: &str, month: Option<&str>, rating: Rating, coverage: Option<f64>) -> MetricSnapshot {
        MetricSnapshot {
            project_id: project.to_string(),
            team_id: team.to_string(),
            period: month.map(|m| Period::parse(m).unwrap()),
            security: Some(rating),
            reliability: Some(rating),
            maintainability: Some(rating),
            complexity: Some(rating),
            coverage,
            bugs: BugCounts {
                blocker: 0,
                critical: 1,
                major: 0,
                minor: 1,
            },
        }
    }

    fn strict_config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.thresholds.reliability = [Rating::A].into_iter().collect();
        config.thresholds.coverage_min = 50.0;
        config
    }

    #[test]
    fn team_report_defaults_to_latest_period() {
        let shim = scope::COVERAGE_EXCLUDED_PROJECTS[1];
        let store = SnapshotStore::new(vec![
            row("core", "a", Some("2025-01"), Rating::A, Some(90.0)),
            row("core", "a", Some("2025-02"), Rating::C, Some(70.0)),
            row("core", "b", Some("2025-02"), Rating::A, Some(30.0)),
            row("core", shim, Some("2025-02"), Rating::A, None),
        ]);

        let report = build_team_report(&store, "core", None, &strict_config()).unwrap();
        assert_eq!(report.period.unwrap().to_string(), "2025-02");
        assert_eq!(report.previous_period.unwrap().to_string(), "2025-01");
        assert_eq!(report.bugs.total, 6);

        let reliability = &report.metrics[0];
        assert_eq!(reliability.metric, Metric::Reliability);
        assert_eq!(reliability.compliance.total_in_scope, 3);
        assert_eq!(reliability.compliance.compliant_count, 2);

        let coverage = report
            .metrics
            .iter()
            .find(|m| m.metric == Metric::Coverage)
            .unwrap();
        assert_eq!(coverage.compliance.total_in_scope, 2);
        assert_eq!(coverage.average_value, Some(50.0));
        assert_eq!(coverage.excluded_projects, vec![shim.to_string()]);
        assert!(coverage.projects.iter().all(|p| p.status != ProjectStatus::NotApplicable));

        assert_eq!(report.regressions.len(), 1);
        assert_eq!(report.regressions[0].metric, Metric::Reliability);
        assert_eq!(report.regressions[0].regressions[0].project_id, "a");
    }

    #[test]
    fn team_with_only_undated_rows_uses_latest_snapshot_view() {
        let store = SnapshotStore::new(vec![row("core", "a", None, Rating::A, Some(80.0))]);
        let report = build_team_report(&store, "core", None, &strict_config()).unwrap();

        assert_eq!(report.period, None);
        assert_eq!(report.metrics[0].compliance.compliant_count, 1);
        assert_eq!(report.bugs.total, 2);
        assert!(report.regressions.is_empty());
    }

    #[test]
    fn unknown_team_reports_no_data_rather_than_zero() {
        let store = SnapshotStore::new(vec![row("core", "a", Some("2025-01"), Rating::A, None)]);
        let report = build_team_report(&store, "ghost", None, &EngineConfig::default()).unwrap();
        assert!(report
            .metrics
            .iter()
            .all(|m| m.compliance.raw_percentage.is_none() && m.okr.okr_percentage.is_none()));
    }

    #[test]
    fn org_summary_leaves_out_excluded_teams() {
        let store = SnapshotStore::new(vec![
            row("core", "a", Some("2025-02"), Rating::A, Some(80.0)),
            row("web", "b", Some("2025-02"), Rating::C, Some(20.0)),
            row("obsoleta", "c", Some("2025-02"), Rating::A, Some(99.0)),
            row("core", "old", Some("2025-01"), Rating::A, Some(99.0)),
        ]);

        let summary = build_org_summary(&store, None, &strict_config());
        assert_eq!(summary.period.unwrap().to_string(), "2025-02");
        assert_eq!(summary.project_count, 2);
        assert_eq!(summary.projects_per_team.get("obsoleta"), None);

        let coverage = summary
            .metrics
            .iter()
            .find(|m| m.metric == Metric::Coverage)
            .unwrap();
        assert_eq!(coverage.compliance.total_in_scope, 2);
        assert_eq!(coverage.compliance.compliant_count, 1);
    }

    #[test]
    fn invalid_goal_surfaces_as_error() {
        let store = SnapshotStore::new(vec![row("core", "a", Some("2025-01"), Rating::A, None)]);
        let mut config = EngineConfig::default();
        *config.goals.0.get_mut(Metric::Reliability) = 150.0;
        assert!(matches!(
            build_team_report(&store, "core", None, &config),
            Err(EngineError::InvalidGoal(_))
        ));
    }
}
