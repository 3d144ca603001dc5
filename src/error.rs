/// Caller mistakes. Bad data never ends up here; it degrades to `None`
/// inside the result types instead.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    #[error("Unknown rating: {0}")]
    UnknownRating(String),

    #[error("Goal percentage must be within 0..=100, got {0}")]
    InvalidGoal(f64),

    #[error("Invalid period (expected YYYY-MM): {0}")]
    InvalidPeriod(String),

    #[error("Period {earlier} must precede {later}")]
    PeriodOrder { earlier: String, later: String },
}
