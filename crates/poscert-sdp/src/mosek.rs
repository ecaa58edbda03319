//! Mosek backend, driven through the `mosek` command line tool.
//!
//! The problem is written in conic benchmark format (CBF) into a scratch
//! directory; the tool drops an interior point solution file next to it.
//! Equalities are emitted as single `L=` rows, ranged conditions as an
//! `L+`/`L-` row pair.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::process::Command;

use tracing::info;

use crate::backend::{SdpOutcome, SolverBackend};
use crate::error::SdpError;
use crate::expr::ConditionKind;
use crate::problem::SdpProblem;

const MOSEK_ALLOWED_ERROR: f64 = 1e-6;

const ACCEPTED_STATUSES: &[&str] = &["PRIMAL_AND_DUAL_FEASIBLE", "PRIMAL_FEASIBLE"];

#[derive(Debug, Clone)]
pub struct MosekBackend {
    binary: PathBuf,
}

impl MosekBackend {
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("mosek"),
        }
    }

    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Writes the problem in CBF version 1. Each condition becomes one or
    /// two scalar rows; coordinates index the shared PSD variables and the
    /// free scalar variables.
    pub fn write_cbf(&self, problem: &SdpProblem, out: &mut impl Write) -> Result<(), SdpError> {
        // (cone, constant shift) per emitted row, in condition order.
        let mut rows: Vec<(usize, &'static str, f64)> = Vec::new();
        for (index, condition) in problem.conditions().iter().enumerate() {
            match condition.kind() {
                Some(ConditionKind::Eq) => rows.push((index, "L=", 0.0)),
                Some(ConditionKind::Geq) => rows.push((index, "L+", 0.0)),
                Some(ConditionKind::InRange(range)) => {
                    rows.push((index, "L+", range));
                    rows.push((index, "L-", -range));
                }
                None => return Err(SdpError::InvalidState("condition without a kind")),
            }
        }

        writeln!(out, "VER\n1\n")?;

        writeln!(out, "PSDVAR\n{}", problem.matrix_count())?;
        for _ in 0..problem.matrix_count() {
            writeln!(out, "{}", problem.matrix_size())?;
        }
        writeln!(out)?;

        if problem.scalar_count() > 0 {
            writeln!(out, "VAR\n{} 1\nF {}\n", problem.scalar_count(), problem.scalar_count())?;
        }

        writeln!(out, "CON\n{} {}", rows.len(), rows.len())?;
        for (_, cone, _) in &rows {
            writeln!(out, "{cone} 1")?;
        }
        writeln!(out)?;

        // Lower-triangle PSD coordinates per row.
        let mut fcoord = Vec::new();
        let mut acoord = Vec::new();
        let mut bcoord = Vec::new();
        for (row_index, (condition_index, _, shift)) in rows.iter().enumerate() {
            let condition = &problem.conditions()[*condition_index];
            for (&matrix, cells) in condition.matrix_coefficients() {
                for i in 0..problem.matrix_size() {
                    for j in 0..=i {
                        // Mirror cells carry half each; CBF reads the lower
                        // triangle, so fold the halves back together.
                        let value = if i == j { cells[i][j] } else { 2.0 * cells[i][j] };
                        if value != 0.0 {
                            fcoord.push(format!("{row_index} {matrix} {i} {j} {value}"));
                        }
                    }
                }
            }
            for (&scalar, &value) in condition.free_coefficients() {
                if value != 0.0 {
                    acoord.push(format!("{row_index} {scalar} {value}"));
                }
            }
            let constant = condition.constant() + shift;
            if constant != 0.0 {
                bcoord.push(format!("{row_index} {constant}"));
            }
        }

        writeln!(out, "FCOORD\n{}", fcoord.len())?;
        for line in &fcoord {
            writeln!(out, "{line}")?;
        }
        writeln!(out)?;

        if !acoord.is_empty() {
            writeln!(out, "ACOORD\n{}", acoord.len())?;
            for line in &acoord {
                writeln!(out, "{line}")?;
            }
            writeln!(out)?;
        }

        if !bcoord.is_empty() {
            writeln!(out, "BCOORD\n{}", bcoord.len())?;
            for line in &bcoord {
                writeln!(out, "{line}")?;
            }
        }
        Ok(())
    }

    /// Parses the interior point solution file: the problem status line,
    /// the scalar `VARIABLES` section, and the `SYMMETRIC MATRIX VARIABLES`
    /// section with one `(matrix, row, col, primal)` entry per line.
    pub fn read_solution(
        &self,
        problem: &SdpProblem,
        input: impl BufRead,
    ) -> Result<Option<(Vec<Vec<Vec<f64>>>, Vec<f64>)>, SdpError> {
        #[derive(PartialEq)]
        enum Section {
            Preamble,
            Constraints,
            Variables,
            MatrixVariables,
        }

        let mut status: Option<String> = None;
        let mut scalars = vec![0.0; problem.scalar_count()];
        let mut matrices = vec![
            vec![vec![0.0; problem.matrix_size()]; problem.matrix_size()];
            problem.matrix_count()
        ];
        let mut section = Section::Preamble;

        for line in input.lines() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if let Some(value) = trimmed.strip_prefix("PROBLEM STATUS") {
                status = Some(value.trim_start_matches([' ', ':']).trim().to_string());
                continue;
            }
            if trimmed == "CONSTRAINTS" {
                section = Section::Constraints;
                continue;
            }
            if trimmed == "SYMMETRIC MATRIX VARIABLES" {
                section = Section::MatrixVariables;
                continue;
            }
            if trimmed == "VARIABLES" {
                section = Section::Variables;
                continue;
            }
            if trimmed.starts_with("INDEX") {
                continue;
            }

            let fields: Vec<&str> = trimmed.split_whitespace().collect();
            match section {
                Section::Variables => {
                    // INDEX NAME AT ACTIVITY ...
                    if fields.len() < 4 {
                        return Err(SdpError::MalformedOutput(format!(
                            "short variable row `{trimmed}`"
                        )));
                    }
                    let index: usize = fields[0].parse().map_err(|_| {
                        SdpError::MalformedOutput(format!("bad variable index `{}`", fields[0]))
                    })?;
                    let value: f64 = fields[3].parse().map_err(|_| {
                        SdpError::MalformedOutput(format!("bad activity `{}`", fields[3]))
                    })?;
                    if index < scalars.len() {
                        scalars[index] = value;
                    }
                }
                Section::MatrixVariables => {
                    // INDEX NAME I J PRIMAL ...
                    if fields.len() < 5 {
                        return Err(SdpError::MalformedOutput(format!(
                            "short matrix row `{trimmed}`"
                        )));
                    }
                    let index: usize = fields[0].parse().map_err(|_| {
                        SdpError::MalformedOutput(format!("bad matrix index `{}`", fields[0]))
                    })?;
                    let row: usize = fields[2].parse().map_err(|_| {
                        SdpError::MalformedOutput(format!("bad row `{}`", fields[2]))
                    })?;
                    let col: usize = fields[3].parse().map_err(|_| {
                        SdpError::MalformedOutput(format!("bad column `{}`", fields[3]))
                    })?;
                    let value: f64 = fields[4].parse().map_err(|_| {
                        SdpError::MalformedOutput(format!("bad primal `{}`", fields[4]))
                    })?;
                    if index >= matrices.len() {
                        return Err(SdpError::MalformedOutput(format!(
                            "matrix index {index} out of range"
                        )));
                    }
                    if row >= problem.matrix_size() || col >= problem.matrix_size() {
                        return Err(SdpError::MalformedOutput(format!(
                            "matrix cell ({row}, {col}) out of range for size {}",
                            problem.matrix_size()
                        )));
                    }
                    matrices[index][row][col] = value;
                    matrices[index][col][row] = value;
                }
                Section::Preamble | Section::Constraints => {}
            }
        }

        let status = status
            .ok_or_else(|| SdpError::MalformedOutput("missing problem status".into()))?;
        if !ACCEPTED_STATUSES.contains(&status.as_str()) {
            info!(%status, "mosek reports an unusable status");
            return Ok(None);
        }
        Ok(Some((matrices, scalars)))
    }
}

impl Default for MosekBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SolverBackend for MosekBackend {
    fn name(&self) -> &'static str {
        "mosek"
    }

    fn solve(&self, problem: &mut SdpProblem) -> Result<SdpOutcome, SdpError> {
        let scratch = tempfile::tempdir()?;
        let task_path = scratch.path().join("problem.cbf");
        let solution_path = scratch.path().join("problem.sol");

        let mut task = BufWriter::new(File::create(&task_path)?);
        self.write_cbf(problem, &mut task)?;
        drop(task);

        info!(binary = %self.binary.display(), task = %task_path.display(), "running mosek");
        let status = Command::new(&self.binary).arg(&task_path).status()?;
        if !status.success() {
            return Err(SdpError::SolverFailed {
                solver: self.name(),
                status: status.to_string(),
            });
        }

        let solution = BufReader::new(File::open(&solution_path)?);
        match self.read_solution(problem, solution)? {
            Some((matrices, scalars)) => {
                problem.set_allowed_error(MOSEK_ALLOWED_ERROR);
                problem.set_solution(matrices, scalars)?;
                Ok(SdpOutcome::Feasible)
            }
            None => Ok(SdpOutcome::Infeasible),
        }
    }
}
