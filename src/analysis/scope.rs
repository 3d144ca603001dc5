use crate::models::config::EngineConfig;
use crate::models::metric::Metric;
use crate::models::snapshot::MetricSnapshot;
use std::collections::BTreeSet;

/// Front-end quality-gate shims whose coverage cannot be measured. Always
/// removed from coverage scope, whatever the team selection says.
pub const COVERAGE_EXCLUDED_PROJECTS: &[&str] = &[
    "AEL.DebidaDiligencia.FrontEnd:Quality",
    "AEL.NominaElectronica.FrontEnd:Quality",
];

pub fn is_hard_excluded(metric: Metric, project_id: &str) -> bool {
    metric == Metric::Coverage && COVERAGE_EXCLUDED_PROJECTS.contains(&project_id)
}

/// Projects of `team` that count toward `metric`, given one period's rows.
///
/// With the metric's `use_selected_only` flag on and a non-empty selection,
/// the team's picks present in `rows`; otherwise every project of the team in
/// `rows`. Picks missing from the upload are skipped silently.
pub fn resolve(
    team: &str,
    metric: Metric,
    rows: &[&MetricSnapshot],
    config: &EngineConfig,
) -> BTreeSet<String> {
    let present: BTreeSet<&str> = rows
        .iter()
        .filter(|row| row.team_id == team)
        .map(|row| row.project_id.as_str())
        .collect();

    let selection = config.scope.selection(team);
    let use_selection = *config.scope.use_selected_only.get(metric) && !selection.is_empty();

    let scope: BTreeSet<String> = if use_selection {
        selection
            .iter()
            .filter(|project| present.contains(project.as_str()))
            .cloned()
            .collect()
    } else {
        present.iter().map(|project| project.to_string()).collect()
    };

    let scope: BTreeSet<String> = scope
        .into_iter()
        .filter(|project| !is_hard_excluded(metric, project))
        .collect();

    log::debug!(
        "scope {team}/{metric}: {} of {} projects (selection {})",
        scope.len(),
        present.len(),
        if use_selection { "on" } else { "off" }
    );

    scope
}

/// Hard-excluded projects the team actually has in `rows`, listed apart in reports.
pub fn excluded_present(team: &str, metric: Metric, rows: &[&MetricSnapshot]) -> Vec<String> {
    rows.iter()
        .filter(|row| row.team_id == team && is_hard_excluded(metric, &row.project_id))
        .map(|row| row.project_id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
