//! CSDP backend: writes the sparse problem file into a scratch directory,
//! runs the `csdp` binary, and reads the result file back.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use std::process::Command;

use tracing::info;

use crate::backend::{SdpOutcome, SolverBackend};
use crate::error::SdpError;
use crate::problem::SdpProblem;

/// CSDP reports infeasibility through its exit status.
const EXIT_PRIMAL_INFEASIBLE: i32 = 1;
const EXIT_DUAL_INFEASIBLE: i32 = 2;

/// CSDP rounds aggressively, so equality residuals are checked loosely.
const CSDP_ALLOWED_ERROR: f64 = 1e-4;

#[derive(Debug, Clone)]
pub struct CsdpBackend {
    binary: PathBuf,
}

impl CsdpBackend {
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("csdp"),
        }
    }

    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for CsdpBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SolverBackend for CsdpBackend {
    fn name(&self) -> &'static str {
        "csdp"
    }

    fn solve(&self, problem: &mut SdpProblem) -> Result<SdpOutcome, SdpError> {
        let scratch = tempfile::tempdir()?;
        let input_path = scratch.path().join("problem.dat-s");
        let result_path = scratch.path().join("problem.result");

        let mut input = BufWriter::new(File::create(&input_path)?);
        problem.write_csdp(&mut input)?;
        drop(input);

        info!(binary = %self.binary.display(), input = %input_path.display(), "running csdp");
        let status = Command::new(&self.binary)
            .arg(&input_path)
            .arg(&result_path)
            .status()?;

        match status.code() {
            Some(0) => {}
            Some(EXIT_PRIMAL_INFEASIBLE) | Some(EXIT_DUAL_INFEASIBLE) => {
                info!(code = ?status.code(), "csdp reports infeasibility");
                return Ok(SdpOutcome::Infeasible);
            }
            _ => {
                return Err(SdpError::SolverFailed {
                    solver: self.name(),
                    status: status.to_string(),
                })
            }
        }

        let result = BufReader::new(File::open(&result_path)?);
        let (matrices, scalars) = problem.read_csdp(result)?;
        problem.set_allowed_error(CSDP_ALLOWED_ERROR);
        problem.set_solution(matrices, scalars)?;
        Ok(SdpOutcome::Feasible)
    }
}
