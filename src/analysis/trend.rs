use crate::analysis::compliance;
use crate::analysis::okr::{compute_okr, round_half_up};
use crate::error::EngineError;
use crate::models::compliance::{
    ComplianceResult, OkrResult, Regression, TrendBasis, TrendPoint, TrendSeries,
};
use crate::models::config::EngineConfig;
use crate::models::metric::Metric;
use crate::models::report::{AnnualMetricSummary, AnnualMonth, AnnualSummary};
use crate::models::snapshot::{Period, SnapshotStore};
use std::collections::{BTreeMap, BTreeSet};

/// Compliance and OKR for one team, metric and period.
pub fn period_okr(
    store: &SnapshotStore,
    team: &str,
    metric: Metric,
    period: Period,
    config: &EngineConfig,
) -> Result<(ComplianceResult, OkrResult), EngineError> {
    let rows = store.team_rows(team, period);
    let compliance = compliance::evaluate(team, metric, &rows, config);
    let okr = compute_okr(&compliance, config.goals.goal(metric))?;
    Ok((compliance, okr))
}

/// One point per period in `periods` that has data for the team; periods
/// with an undefined result are left out rather than plotted as zero.
pub fn build_trend(
    store: &SnapshotStore,
    team: &str,
    metric: Metric,
    periods: &[Period],
    basis: TrendBasis,
    config: &EngineConfig,
) -> Result<TrendSeries, EngineError> {
    let ordered: BTreeSet<Period> = periods.iter().copied().collect();
    let mut points = Vec::with_capacity(ordered.len());

    for period in ordered {
        let (compliance, okr) = period_okr(store, team, metric, period, config)?;
        let value = match basis {
            TrendBasis::Okr => okr.okr_percentage.map(|okr| okr as f64),
            TrendBasis::Raw => compliance.raw_percentage,
        };
        if let Some(value) = value {
            points.push(TrendPoint { period, value });
        }
    }

    Ok(TrendSeries {
        team_id: team.to_string(),
        metric,
        basis,
        points,
    })
}

/// The latest period strictly before `current`, in chronological order.
pub fn previous_period(periods: &[Period], current: Period) -> Option<Period> {
    periods.iter().copied().filter(|p| *p < current).max()
}

/// Projects that met `metric`'s threshold in `earlier` and fail it in `later`.
/// Only projects in scope with a value in both periods are compared.
pub fn diff(
    store: &SnapshotStore,
    team: &str,
    metric: Metric,
    earlier: Period,
    later: Period,
    config: &EngineConfig,
) -> Result<Vec<Regression>, EngineError> {
    if earlier >= later {
        return Err(EngineError::PeriodOrder {
            earlier: earlier.to_string(),
            later: later.to_string(),
        });
    }

    let before = compliance::evaluate_projects(team, metric, &store.team_rows(team, earlier), config);
    let after = compliance::evaluate_projects(team, metric, &store.team_rows(team, later), config);

    let before_by_project: BTreeMap<&str, _> = before
        .iter()
        .map(|outcome| (outcome.project_id.as_str(), outcome))
        .collect();

    let regressions: Vec<Regression> = after
        .iter()
        .filter_map(|now| {
            let then = before_by_project.get(now.project_id.as_str())?;
            let value_before = then.value?;
            let value_after = now.value?;
            (then.passed() && !now.passed()).then(|| Regression {
                project_id: now.project_id.clone(),
                value_before,
                value_after,
            })
        })
        .collect();

    if !regressions.is_empty() {
        log::debug!(
            "{team}/{metric}: {} regressions {earlier} -> {later}",
            regressions.len()
        );
    }

    Ok(regressions)
}

/// Regressions of `period` against the team's immediately preceding period.
/// Empty when the team has no earlier period.
pub fn regressions_since_previous(
    store: &SnapshotStore,
    team: &str,
    metric: Metric,
    period: Period,
    config: &EngineConfig,
) -> Result<(Option<Period>, Vec<Regression>), EngineError> {
    match previous_period(&store.team_periods(team), period) {
        Some(previous) => Ok((Some(previous), diff(store, team, metric, previous, period, config)?)),
        None => Ok((None, Vec::new())),
    }
}

/// Month-by-month OKR for the displayed metrics in `year`, with how many of
/// those months reached 100%.
pub fn annual_summary(
    store: &SnapshotStore,
    team: &str,
    year: i32,
    config: &EngineConfig,
) -> Result<AnnualSummary, EngineError> {
    let periods: Vec<Period> = store
        .team_periods(team)
        .into_iter()
        .filter(|p| p.year() == year)
        .collect();

    let mut months = Vec::with_capacity(periods.len());
    for period in periods {
        let mut okr = BTreeMap::new();
        for &metric in &config.displayed_metrics {
            let (_, result) = period_okr(store, team, metric, period, config)?;
            okr.insert(metric, result.okr_percentage);
        }
        months.push(AnnualMonth { period, okr });
    }

    let metrics = config
        .displayed_metrics
        .iter()
        .map(|&metric| {
            let values: Vec<i64> = months
                .iter()
                .filter_map(|month| month.okr.get(&metric).copied().flatten())
                .collect();
            let months_met = values.iter().filter(|&&okr| okr >= 100).count();
            let months_with_data = values.len();
            let met_percentage = (months_with_data > 0).then(|| {
                round_half_up(1000.0 * months_met as f64 / months_with_data as f64) as f64 / 10.0
            });
            AnnualMetricSummary {
                metric,
                months_met,
                months_with_data,
                met_percentage,
            }
        })
        .collect();

    Ok(AnnualSummary {
        team_id: team.to_string(),
        year,
        months,
        metrics,
    })
}
