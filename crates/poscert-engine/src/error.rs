//! Errors of the certificate builder.
//!
//! Infeasibility of the underlying SDP is not an error; it is reported as
//! [`crate::Feasibility::Infeasible`]. Errors here are genuine failures:
//! structural misuse, unsupported shapes, and propagated failures of the
//! lower layers.

use thiserror::Error;

use poscert_dsl::{EvalError, ParseError};
use poscert_ring::RingError;
use poscert_sdp::SdpError;

#[derive(Debug, Error)]
pub enum EstimatorError {
    #[error("function `{name}` has arity {arity}; templates support arity up to 2")]
    UnsupportedArity { name: String, arity: u32 },

    #[error("name `{0}` is reserved for the solver's Gram matrix entries")]
    ReservedName(String),

    #[error("the system is not solved yet; call solve() first")]
    NotSolved,

    #[error("the system is infeasible; no certificate exists")]
    Infeasible,

    #[error(
        "certificate emission writes an executable script; \
         call accept_trusted_input_only() first"
    )]
    UntrustedInput,

    #[error("certificate emission supports exactly one conclusion per condition, got {0}")]
    UnsupportedConclusionCount(usize),

    #[error("cannot render `{0}` inside a certificate expression")]
    UnrenderableExpression(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Sdp(#[from] SdpError),

    #[error(transparent)]
    Ring(#[from] RingError),

    #[error("certificate write failed: {0}")]
    Io(#[from] std::io::Error),
}
