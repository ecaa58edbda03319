use thiserror::Error;

use poscert_ring::RingError;

#[derive(Debug, Error)]
pub enum SdpError {
    #[error("invalid problem state: {0}")]
    InvalidState(&'static str),

    #[error("constraint must be linear in solver unknowns, got `{0}`")]
    NotLinear(String),

    #[error("`{0}` is not a Gram entry name")]
    BadGramName(String),

    #[error("row {row} or column {col} outside matrix of size {size}")]
    IndexOutOfRange { row: usize, col: usize, size: usize },

    #[error("the CSDP file format only supports equality conditions")]
    UnsupportedCondition,

    #[error("no solution available yet")]
    NotSolved,

    #[error(
        "solution violates condition {condition} of {total}: |{actual}| exceeds {allowed}"
    )]
    ConstraintViolated {
        condition: usize,
        total: usize,
        actual: f64,
        allowed: f64,
    },

    #[error("solver `{solver}` exited with {status}")]
    SolverFailed { solver: &'static str, status: String },

    #[error("malformed solver output: {0}")]
    MalformedOutput(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Ring(#[from] RingError),
}
