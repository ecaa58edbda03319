//! Semidefinite feasibility problems over Gram-matrix unknowns.
//!
//! The pipeline upstream produces linear equality constraints over two kinds
//! of solver unknowns: entries of symmetric Gram matrices (named
//! `l_<id>_<row>_<col>`) and free scalar coefficients (every other name).
//! [`SdpProblem`] collects those constraints, and a [`SolverBackend`] hands
//! the problem to an external solver process and reads the primal solution
//! back. Feasibility of the SDP is the whole point; there is no objective.

pub mod backend;
pub mod csdp;
pub mod error;
pub mod expr;
pub mod gram;
pub mod mosek;
pub mod problem;

pub use backend::{SdpOutcome, SolverBackend};
pub use csdp::CsdpBackend;
pub use error::SdpError;
pub use expr::{ConditionKind, LinearMatrixExpression};
pub use gram::GramEntry;
pub use mosek::MosekBackend;
pub use problem::{SdpProblem, SdpSolution};
