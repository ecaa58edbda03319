//! The seam between the problem model and external solver processes.

use crate::error::SdpError;
use crate::problem::SdpProblem;

/// What the solver concluded. A `Feasible` outcome means the validated
/// primal solution is installed on the problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdpOutcome {
    Feasible,
    Infeasible,
}

pub trait SolverBackend {
    /// Human-readable backend name for logs and errors.
    fn name(&self) -> &'static str;

    /// Solves the feasibility problem, installing the solution on success.
    fn solve(&self, problem: &mut SdpProblem) -> Result<SdpOutcome, SdpError>;
}
