//! Verification-script emission.
//!
//! A solved estimator renders its certificate as a self-contained sympy
//! script: the solved scalar assignment, the Gram matrices with PSD
//! asserts, the monomial vector, and per condition the residual
//! `Σ sos·hypothesis − conclusion` asserted to have near-zero coefficients.
//! The script is independently executable; nothing from this crate is
//! needed to re-check a certificate.

use std::collections::BTreeMap;
use std::io::Write;

use poscert_dsl::Expr;
use poscert_ring::SymbolicPolynomial;
use poscert_sdp::GramEntry;

use crate::config::Feasibility;
use crate::error::EstimatorError;
use crate::estimator::{relation_lhs, ComplexityEstimator};

/// Formal-argument symbols declared in the script. Fixed, not tied to the
/// program's arities, so hand-edited certificates keep working.
const SCRIPT_FUNCTION_ARGS: u32 = 10;

const IND: &str = "    ";

/// Renders an expression as sympy source. Variables and functions resolve
/// through `check.` attributes; function calls substitute the shared formal
/// argument symbols.
fn expr_to_sympy(expr: &Expr) -> Result<String, EstimatorError> {
    match expr {
        Expr::Constant(value) => Ok(value.to_string()),
        Expr::Variable(name) => Ok(format!("check.{name}")),
        Expr::BinaryOp { op, left, right } => Ok(format!(
            "(({}) {} ({}))",
            expr_to_sympy(left)?,
            op.symbol(),
            expr_to_sympy(right)?
        )),
        Expr::UnaryOp { op, expr } => {
            Ok(format!("({}({}))", op.symbol(), expr_to_sympy(expr)?))
        }
        Expr::Function { name, args } => {
            let mut substitutions = Vec::with_capacity(args.len());
            for (index, arg) in args.iter().enumerate() {
                substitutions.push(format!(
                    "check._function_arg_{index}: {}",
                    expr_to_sympy(arg)?
                ));
            }
            Ok(format!("check.{name}.subs({{{}}})", substitutions.join(", ")))
        }
        Expr::Relation { .. } => {
            Err(EstimatorError::UnrenderableExpression(expr.to_string()))
        }
    }
}

/// Ring `Display` output is already sympy-compatible except for the
/// coefficient brackets.
fn render_polynomial(polynomial: &SymbolicPolynomial) -> String {
    polynomial.to_string().replace('[', "(").replace(']', ")")
}

fn script_header(invocation: &str) -> String {
    format!(
        "#{invocation}\n\
         import sys\n\
         import sympy as sp\n\
         \n\
         \n\
         EPS_MATRIX_NORM = 1e-6\n\
         EPS_EIG = 1e-4\n\
         EPS_POLY_COEFF = 1e-3\n\
         \n\
         # check matrix norm\n\
         def check_matrix_symmetric(spmatrix):\n\
         {IND}return (spmatrix - spmatrix.T).norm() < EPS_MATRIX_NORM\n\
         \n\
         \n\
         def check_matrix_psd(spmatrix):\n\
         {IND}return check_matrix_symmetric(spmatrix) and \
         min(spmatrix.eigenvals(multiple=True)) + EPS_EIG > 0\n\
         \n\
         \n\
         def get_poly_max_coeff(poly):\n\
         {IND}return max(map(abs, sp.poly(sp.expand(poly)).coeffs()))\n\
         \n\
         \n\
         def check_polynomial_almost_zero(poly):\n\
         {IND}max_abs_coeff = max(map(abs, sp.poly(sp.expand(poly)).coeffs()))\n\
         {IND}return max_abs_coeff < EPS_POLY_COEFF\n"
    )
}

impl ComplexityEstimator {
    /// Writes the sympy verification script for a feasible solve. The
    /// `invocation` string is embedded in the header comment.
    pub fn write_certificate(
        &self,
        invocation: &str,
        out: &mut impl Write,
    ) -> Result<(), EstimatorError> {
        if !self.trusted_input() {
            return Err(EstimatorError::UntrustedInput);
        }
        match self.feasibility() {
            Feasibility::Unknown => return Err(EstimatorError::NotSolved),
            Feasibility::Infeasible => return Err(EstimatorError::Infeasible),
            Feasibility::Feasible => {}
        }

        // Split the solution map into Gram matrices and free scalars.
        let dim = self.sos_monomials.len();
        let mut matrices: BTreeMap<usize, Vec<Vec<f64>>> = BTreeMap::new();
        let mut scalars: BTreeMap<&str, f64> = BTreeMap::new();
        for (name, &value) in &self.solution {
            if GramEntry::is_gram_name(name) {
                let entry = GramEntry::parse(name)?;
                let matrix = matrices
                    .entry(entry.id)
                    .or_insert_with(|| vec![vec![0.0; dim]; dim]);
                matrix[entry.row][entry.col] = value;
                matrix[entry.col][entry.row] = value;
            } else {
                scalars.insert(name, value);
            }
        }

        write!(out, "{}", script_header(invocation))?;
        writeln!(out)?;
        writeln!(out)?;
        writeln!(out, "def check(need_check_matrix_psd, is_only_answer):")?;

        for (name, value) in &scalars {
            writeln!(out, "{IND}check.{name} = sp.symbols('{name}')")?;
            writeln!(out, "{IND}check.{name} = {value}")?;
            writeln!(out, "{IND}{name} = check.{name}")?;
        }
        writeln!(out)?;

        for i in 0..SCRIPT_FUNCTION_ARGS {
            writeln!(
                out,
                "{IND}check._function_arg_{i} = sp.symbols('_function_arg_{i}')"
            )?;
            writeln!(out, "{IND}_function_arg_{i} = check._function_arg_{i}")?;
        }

        for (name, template) in &self.templates {
            writeln!(out, "{IND}check.{name} = {}", render_polynomial(template))?;
            writeln!(out, "{IND}if is_only_answer:")?;
            writeln!(
                out,
                "{IND}{IND}print(f\"{name} = {{sp.simplify(check.{name})}}\")"
            )?;
        }

        writeln!(out, "{IND}if is_only_answer:")?;
        writeln!(out, "{IND}{IND}return")?;
        writeln!(out)?;

        writeln!(out, "{IND}# all psd matrices")?;
        let mut matrix_names = Vec::with_capacity(matrices.len());
        for (id, matrix) in &matrices {
            let name = GramEntry::matrix_name(*id);
            let rows: Vec<String> = matrix
                .iter()
                .map(|row| {
                    let cells: Vec<String> = row.iter().map(f64::to_string).collect();
                    format!("[{}]", cells.join(", "))
                })
                .collect();
            writeln!(
                out,
                "{IND}check.{name} = sp.matrices.Matrix([{}])",
                rows.join(", ")
            )?;
            matrix_names.push(format!("check.{name}"));
        }
        writeln!(out)?;
        writeln!(out, "{IND}check.l_all = [{}]", matrix_names.join(", "))?;
        writeln!(out)?;

        writeln!(out, "{IND}# check matrices are positive semidefinite")?;
        writeln!(out, "{IND}if need_check_matrix_psd:")?;
        writeln!(out, "{IND}{IND}for l in check.l_all:")?;
        writeln!(out, "{IND}{IND}{IND}assert(check_matrix_psd(l))")?;
        writeln!(out)?;

        for name in &self.variable_names {
            writeln!(out, "{IND}check.{name} = sp.symbols('{name}')")?;
            writeln!(out, "{IND}{name} = check.{name}")?;
        }
        writeln!(out)?;

        let vector: Vec<String> = self
            .sos_monomials
            .iter()
            .map(|m| m.to_string().replace('[', "(").replace(']', ")"))
            .collect();
        writeln!(
            out,
            "{IND}check.monomial_vector = sp.matrices.Matrix([{}])",
            vector.join(", ")
        )?;
        writeln!(out)?;

        writeln!(out, "{IND}check.sos_all = []")?;
        writeln!(out, "{IND}for l in check.l_all:")?;
        writeln!(
            out,
            "{IND}{IND}check.sos_all.append((check.monomial_vector.transpose() \
             * l * check.monomial_vector)[0, 0])"
        )?;
        writeln!(out)?;

        for (index, condition) in self.program().conditions.iter().enumerate() {
            let counter = index + 1;
            if condition.conclusions.len() != 1 {
                return Err(EstimatorError::UnsupportedConclusionCount(
                    condition.conclusions.len(),
                ));
            }

            writeln!(out, "{IND}# Verifying condition: {counter}")?;
            writeln!(out)?;

            writeln!(out, "{IND}check.cond_{counter} = [")?;
            for (i, hypothesis) in condition.hypotheses.iter().enumerate() {
                let rendered = expr_to_sympy(relation_lhs(hypothesis)?)?;
                if i + 1 != condition.hypotheses.len() {
                    writeln!(out, "{IND}{rendered}, # >= 0")?;
                } else {
                    writeln!(out, "{IND}{rendered} # >= 0")?;
                }
            }
            writeln!(out, "{IND}]")?;

            writeln!(out, "{IND}# Implies")?;
            let conclusion = expr_to_sympy(relation_lhs(&condition.conclusions[0])?)?;
            writeln!(out, "{IND}check.conc_{counter} = {conclusion} # >= 0")?;
            writeln!(out)?;

            let (start, end) = self.condition_gram_ranges[index];
            writeln!(
                out,
                "{IND}check.sos_{counter} = check.sos_all[{start}:{end}]"
            )?;
            writeln!(
                out,
                "{IND}check.res_{counter} = sum(x * y for x, y in \
                 zip(check.cond_{counter}, check.sos_{counter})) - check.conc_{counter}"
            )?;
            writeln!(
                out,
                "{IND}# ############# PROOF OF CONDITION {counter} #####################"
            )?;
            writeln!(
                out,
                "{IND}assert(check_polynomial_almost_zero(check.res_{counter}))"
            )?;
        }
        writeln!(out)?;

        writeln!(out, "if __name__ == '__main__':")?;
        writeln!(
            out,
            "{IND}is_fast_check = len(sys.argv) >= 2 and sys.argv[1] == \"fast\""
        )?;
        writeln!(
            out,
            "{IND}is_only_answer = len(sys.argv) >= 2 and sys.argv[1] == \"answer\""
        )?;
        writeln!(out)?;
        writeln!(out, "{IND}try:")?;
        writeln!(out, "{IND}{IND}check(not is_fast_check, is_only_answer)")?;
        writeln!(out, "{IND}{IND}if not is_only_answer:")?;
        writeln!(
            out,
            "{IND}{IND}{IND}print(\"The program is \\033[92mcorrect\\033[0m\")"
        )?;
        writeln!(out, "{IND}{IND}else:")?;
        writeln!(
            out,
            "{IND}{IND}{IND}print(\"The program status is \\033[92mUNKNOWN\\033[0m, \
             to check the program, run without \\\"answer\\\" argument\")"
        )?;
        writeln!(out, "{IND}except AssertionError:")?;
        writeln!(
            out,
            "{IND}{IND}print(\"The program is \\033[91mINCORRECT\\033[0m\")"
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use poscert_dsl::{parse_program, ParseConfig};
    use poscert_sdp::{SdpError, SdpOutcome, SdpProblem, SolverBackend};

    use crate::config::SolverConfig;
    use crate::estimator::ComplexityEstimator;

    struct IdentitySolver;

    impl SolverBackend for IdentitySolver {
        fn name(&self) -> &'static str {
            "identity"
        }

        fn solve(&self, problem: &mut SdpProblem) -> Result<SdpOutcome, SdpError> {
            let n = problem.matrix_size();
            let mut matrix = vec![vec![0.0; n]; n];
            for (i, row) in matrix.iter_mut().enumerate() {
                row[i] = 1.0;
            }
            let matrices = vec![matrix; problem.matrix_count()];
            let scalars = vec![0.0; problem.scalar_count()];
            problem.set_solution(matrices, scalars)?;
            Ok(SdpOutcome::Feasible)
        }
    }

    fn solved_trivial_estimator() -> ComplexityEstimator {
        let program = parse_program(
            "real n;\nif { n >= 0 } => { n >= 0 }",
            &ParseConfig::default(),
        )
        .expect("parse");
        let config = SolverConfig {
            degree: 0,
            add_one_geq_zero: false,
            ..SolverConfig::default()
        };
        let mut estimator = ComplexityEstimator::new(program, config);
        estimator.solve_with(&IdentitySolver).expect("solve");
        estimator
    }

    #[test]
    fn expressions_render_through_check_attributes() {
        let program = parse_program(
            "real n;\nfunction T[1, 1];\nif { n >= 1 } => { T(n) >= n }",
            &ParseConfig::default(),
        )
        .expect("parse");
        let call = &program.conditions[0].conclusions[0];
        let Expr::Relation { left, .. } = call else {
            panic!("expected a relation");
        };
        assert_eq!(
            expr_to_sympy(left).expect("render"),
            "check.T.subs({check._function_arg_0: check.n})"
        );
    }

    #[test]
    fn relations_are_not_renderable() {
        let program = parse_program(
            "real n;\nif { n >= 1 } => { n >= 0 }",
            &ParseConfig::default(),
        )
        .expect("parse");
        let err = expr_to_sympy(&program.conditions[0].hypotheses[0])
            .expect_err("relation");
        assert!(err.to_string().contains("cannot render"));
    }

    #[test]
    fn certificate_requires_the_trusted_input_opt_in() {
        let estimator = solved_trivial_estimator();
        let mut out = Vec::new();
        let err = estimator
            .write_certificate("poscert --inp sample", &mut out)
            .expect_err("guard");
        assert!(err.to_string().contains("accept_trusted_input_only"));
    }

    #[test]
    fn certificate_script_carries_the_full_proof_skeleton() {
        let mut estimator = solved_trivial_estimator();
        estimator.accept_trusted_input_only();

        let mut out = Vec::new();
        estimator
            .write_certificate("poscert --inp sample", &mut out)
            .expect("write");
        let script = String::from_utf8(out).expect("utf8");

        assert!(script.starts_with("#poscert --inp sample\n"));
        assert!(script.contains("EPS_POLY_COEFF = 1e-3"));
        assert!(script.contains("def check(need_check_matrix_psd, is_only_answer):"));
        // Identity solution of the 1x1 system: l_0_0_0 = 1.
        assert!(script.contains("check.l_0 = sp.matrices.Matrix([[1]])"));
        assert!(script.contains("check.l_all = [check.l_0]"));
        assert!(script.contains("check.n = sp.symbols('n')"));
        assert!(script.contains("((check.n) - (0)) # >= 0"));
        assert!(script.contains("check.sos_1 = check.sos_all[0:1]"));
        assert!(script.contains("assert(check_polynomial_almost_zero(check.res_1))"));
        assert!(script.contains("if __name__ == '__main__':"));
    }

    #[test]
    fn certificate_before_solve_is_an_error() {
        let program = parse_program(
            "real n;\nif { n >= 0 } => { n >= 0 }",
            &ParseConfig::default(),
        )
        .expect("parse");
        let mut estimator =
            ComplexityEstimator::new(program, SolverConfig::default());
        estimator.accept_trusted_input_only();
        let mut out = Vec::new();
        let err = estimator
            .write_certificate("poscert", &mut out)
            .expect_err("not solved");
        assert!(err.to_string().contains("not solved"));
    }
}
