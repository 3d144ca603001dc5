use crate::analysis::okr::round_half_up;
use crate::analysis::trend::previous_period;
use crate::models::report::{BugRollup, BugTrendPoint, BugVariationReport, ProjectBugDelta};
use crate::models::snapshot::{BugCounts, MetricSnapshot, Period, SnapshotStore};
use std::collections::{BTreeMap, BTreeSet};

/// Per-severity sum over every project of the team in `period`.
/// No scope or threshold applies here.
pub fn rollup(store: &SnapshotStore, team: &str, period: Period) -> BugRollup {
    rollup_rows(&store.team_rows(team, period))
}

/// Sum of the first row seen for each project; repeated rows are ignored.
pub fn rollup_rows(rows: &[&MetricSnapshot]) -> BugRollup {
    let mut seen = BTreeSet::new();
    let mut rollup = BugRollup::default();
    for row in rows {
        if seen.insert(row.project_id.as_str()) {
            rollup.add(&row.bugs);
        }
    }
    rollup
}

fn signed_change(after: u64, before: u64) -> i64 {
    let change = i128::from(after) - i128::from(before);
    i64::try_from(change).unwrap_or(if change < 0 { i64::MIN } else { i64::MAX })
}

/// Roll-up per team period with growth against the previous period and
/// backlog elimination against the first January in the series.
pub fn bug_trend(store: &SnapshotStore, team: &str) -> Vec<BugTrendPoint> {
    let series: Vec<(Period, BugRollup)> = store
        .team_periods(team)
        .into_iter()
        .map(|period| (period, rollup(store, team, period)))
        .collect();

    let baseline = series
        .iter()
        .enumerate()
        .find(|(_, (period, _))| period.month() == 1)
        .map(|(index, (_, rollup))| (index, rollup.total));

    series
        .iter()
        .enumerate()
        .map(|(index, (period, rollup))| {
            let growth = index
                .checked_sub(1)
                .map(|prev| signed_change(rollup.total, series[prev].1.total));

            let backlog_elimination = match baseline {
                Some((base_index, base)) if index > base_index && base > 0 => Some(round_half_up(
                    (base as f64 - rollup.total as f64) / base as f64 * 100.0,
                )),
                _ => None,
            };

            BugTrendPoint {
                period: *period,
                rollup: *rollup,
                growth,
                backlog_elimination,
            }
        })
        .collect()
}

/// Compare each project's bug total in the latest period with that project's
/// own preceding period; keep the `top_n` biggest increases and decreases.
pub fn bug_variations(store: &SnapshotStore, team: &str, top_n: usize) -> BugVariationReport {
    let mut history: BTreeMap<&str, BTreeMap<Period, BugCounts>> = BTreeMap::new();
    for row in store.rows().iter().filter(|row| row.team_id == team) {
        if let Some(period) = row.period {
            history
                .entry(row.project_id.as_str())
                .or_default()
                .entry(period)
                .or_insert(row.bugs);
        }
    }

    // (current period, delta) for every project month that has a predecessor.
    let mut deltas: Vec<(Period, ProjectBugDelta)> = Vec::new();
    for (project, months) in &history {
        let months: Vec<(&Period, &BugCounts)> = months.iter().collect();
        for pair in months.windows(2) {
            let (_, before) = pair[0];
            let (period, after) = pair[1];
            deltas.push((
                *period,
                ProjectBugDelta {
                    project_id: project.to_string(),
                    total: after.total(),
                    previous_total: before.total(),
                    variation: signed_change(after.total(), before.total()),
                    bugs: *after,
                },
            ));
        }
    }

    let Some(latest) = deltas.iter().map(|(period, _)| *period).max() else {
        return BugVariationReport::default();
    };
    let previous = previous_period(&store.team_periods(team), latest);

    let current: Vec<ProjectBugDelta> = deltas
        .into_iter()
        .filter(|(period, _)| *period == latest)
        .map(|(_, delta)| delta)
        .collect();

    let mut increased: Vec<ProjectBugDelta> =
        current.iter().filter(|d| d.variation > 0).cloned().collect();
    increased.sort_by(|a, b| b.variation.cmp(&a.variation));
    let increased_count = increased.len();
    increased.truncate(top_n);

    let mut decreased: Vec<ProjectBugDelta> =
        current.iter().filter(|d| d.variation < 0).cloned().collect();
    decreased.sort_by_key(|d| d.variation);
    let reduced_count = decreased.len();
    decreased.truncate(top_n);

    BugVariationReport {
        period: Some(latest),
        previous_period: previous,
        projects_compared: current.len(),
        increased_count,
        reduced_count,
        unchanged_count: current.iter().filter(|d| d.variation == 0).count(),
        total_current: current.iter().fold(0, |sum, d| sum.saturating_add(d.total)),
        total_previous: current
            .iter()
            .fold(0, |sum, d| sum.saturating_add(d.previous_total)),
        total_variation: current
            .iter()
            .fold(0, |sum: i64, d| sum.saturating_add(d.variation)),
        increased,
        decreased,
    }
}
