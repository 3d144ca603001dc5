use crate::error::EngineError;
use crate::models::compliance::{ComplianceResult, OkrResult};

/// Round to the nearest integer with exact halves going up: `floor(x + 0.5)`.
///
/// Applies to negative inputs too, so -0.5 becomes 0 and -2.5 becomes -2.
pub fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// Convert raw compliance into achievement against `goal_percentage`.
///
/// - target = round_half_up(total * goal / 100)
/// - okr = round_half_up(100 * compliant / target), uncapped
/// - a zero target counts as met (100), whatever the compliant count
/// - an empty scope leaves the OKR undefined
pub fn compute_okr(compliance: &ComplianceResult, goal_percentage: f64) -> Result<OkrResult, EngineError> {
    if !goal_percentage.is_finite() || !(0.0..=100.0).contains(&goal_percentage) {
        return Err(EngineError::InvalidGoal(goal_percentage));
    }

    let target_count =
        round_half_up(compliance.total_in_scope as f64 * goal_percentage / 100.0).max(0) as usize;

    let okr_percentage = if compliance.is_undefined() {
        None
    } else if target_count > 0 {
        Some(round_half_up(
            100.0 * compliance.compliant_count as f64 / target_count as f64,
        ))
    } else {
        Some(100)
    };

    Ok(OkrResult {
        goal_percentage,
        target_count,
        compliant_count: compliance.compliant_count,
        okr_percentage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rounds_exact_halves_up() {
        assert_eq!(round_half_up(49.5), 50);
        assert_eq!(round_half_up(49.49), 49);
        assert_eq!(round_half_up(2.5), 3);
        assert_eq!(round_half_up(0.0), 0);
        assert_eq!(round_half_up(-0.5), 0);
        assert_eq!(round_half_up(-2.5), -2);
    }

    #[test]
    fn goal_relative_percentage_for_three_projects() {
        let compliance = ComplianceResult::from_counts(3, 2);
        let okr = compute_okr(&compliance, 90.0).unwrap();
        assert_eq!(okr.target_count, 3);
        assert_eq!(okr.okr_percentage, Some(67));
        assert_eq!(okr.meets_goal(), Some(false));
        assert_eq!(okr.shortfall(), Some(33));
    }

    #[test]
    fn exceeding_goal_is_not_capped() {
        let compliance = ComplianceResult::from_counts(10, 9);
        let okr = compute_okr(&compliance, 50.0).unwrap();
        assert_eq!(okr.target_count, 5);
        assert_eq!(okr.okr_percentage, Some(180));
    }

    #[test]
    fn zero_target_counts_as_met() {
        let none_pass = ComplianceResult::from_counts(4, 0);
        assert_eq!(compute_okr(&none_pass, 0.0).unwrap().okr_percentage, Some(100));

        let some_pass = ComplianceResult::from_counts(4, 3);
        let okr = compute_okr(&some_pass, 0.0).unwrap();
        assert_eq!(okr.target_count, 0);
        assert_eq!(okr.okr_percentage, Some(100));

        // 1 * 10% = 0.1 rounds to a zero target as well.
        let tiny = ComplianceResult::from_counts(1, 0);
        assert_eq!(compute_okr(&tiny, 10.0).unwrap().okr_percentage, Some(100));
    }

    #[test]
    fn empty_scope_leaves_okr_undefined() {
        let compliance = ComplianceResult::from_counts(0, 0);
        let okr = compute_okr(&compliance, 90.0).unwrap();
        assert_eq!(okr.okr_percentage, None);
        assert_eq!(okr.meets_goal(), None);
        assert_eq!(okr.progress_fill(), None);
    }

    #[test]
    fn rejects_goals_outside_percentage_range() {
        let compliance = ComplianceResult::from_counts(3, 2);
        assert_eq!(
            compute_okr(&compliance, -5.0),
            Err(EngineError::InvalidGoal(-5.0))
        );
        assert!(compute_okr(&compliance, 120.0).is_err());
        assert!(compute_okr(&compliance, f64::NAN).is_err());
    }

    proptest! {
        #[test]
        fn round_half_up_matches_floor_formula(x in -1.0e6f64..1.0e6) {
            prop_assert_eq!(round_half_up(x), (x + 0.5).floor() as i64);
        }

        #[test]
        fn round_half_up_of_integer_halves_goes_up(n in 0i64..100_000) {
            prop_assert_eq!(round_half_up(n as f64 + 0.5), n + 1);
        }

        #[test]
        fn zero_target_with_zero_compliant_is_full(total in 0usize..20) {
            let compliance = ComplianceResult::from_counts(total, 0);
            let okr = compute_okr(&compliance, 0.0).unwrap();
            if total > 0 {
                prop_assert_eq!(okr.okr_percentage, Some(100));
            } else {
                prop_assert_eq!(okr.okr_percentage, None);
            }
        }

        #[test]
        fn okr_is_defined_exactly_when_scope_is_non_empty(
            total in 0usize..50,
            passing in 0usize..50,
            goal in 0.0f64..=100.0,
        ) {
            let compliance = ComplianceResult::from_counts(total, passing);
            let okr = compute_okr(&compliance, goal).unwrap();
            prop_assert_eq!(okr.okr_percentage.is_some(), total > 0);
            prop_assert_eq!(compliance.raw_percentage.is_some(), total > 0);
        }
    }
}
