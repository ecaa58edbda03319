use thiserror::Error;

/// Errors raised by the rational and symbolic rings.
///
/// Everything here is fatal for the current solve: there is no retry beyond
/// the one built-in fallback (exact arithmetic -> float rationalization),
/// and that fallback escalates to [`RingError::RationalizationFailed`] when
/// its verification step rejects the approximation.
#[derive(Debug, Error)]
pub enum RingError {
    #[error("ring elements come from different environments")]
    EnvMismatch,

    #[error("symbol `{0}` already exists in this environment")]
    DuplicateSymbol(String),

    #[error("cannot add dissimilar monomials `{0}` and `{1}`")]
    DissimilarAdd(String, String),

    #[error("rationalization of {value} failed: {num}/{den} is outside tolerance")]
    RationalizationFailed { value: f64, num: i64, den: i64 },

    #[error("division by zero")]
    DivisionByZero,

    #[error("monomial `{0}` is not linear")]
    NotLinear(String),

    #[error("zero denominator in rational coefficient")]
    ZeroDenominator,
}
