/// Failures the engine can report to a calling layer.
///
/// Numeric inputs are clamped rather than rejected inside the engine, so only
/// admission checks and explicit validation helpers produce these.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error(
        "cut weight {requested:.1}% would exceed 100% (current total {current_total:.1}%, remaining {remaining:.1}%)"
    )]
    WeightOverflow {
        current_total: f64,
        requested: f64,
        remaining: f64,
    },
    #[error("cut weight must be a number in (0, 100], got {0}")]
    InvalidWeight(f64),
    #[error("grade must be a number in [0, 5], got {0}")]
    InvalidGrade(f64),
    #[error("passing grade must be a number in (0, 5], got {0}")]
    InvalidPassingGrade(f64),
}
