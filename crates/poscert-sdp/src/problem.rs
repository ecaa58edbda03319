//! The SDP feasibility problem and its CSDP sparse file protocol.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};
use tracing::debug;

use poscert_ring::QPolynomial;

use crate::error::SdpError;
use crate::expr::{ConditionKind, LinearMatrixExpression};
use crate::gram::GramEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ReadyToStart,
    ReadyToAdd,
}

/// Primal solution: one dense symmetric matrix per Gram id (indexed by
/// inner matrix index) plus the free scalar values (indexed by inner scalar
/// index).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdpSolution {
    pub matrices: Vec<Vec<Vec<f64>>>,
    pub scalars: Vec<f64>,
}

/// A system of linear conditions over shared PSD matrix unknowns of one
/// common size and free scalar unknowns.
///
/// Matrix unknowns arrive under sparse outer ids (Gram ids) and scalar
/// unknowns under names; both are remapped to dense inner indices on first
/// use. Conditions are built through a start/add/end protocol so a
/// half-built condition can never be solved.
#[derive(Debug)]
pub struct SdpProblem {
    matrix_size: usize,
    conditions: Vec<LinearMatrixExpression>,
    state: State,

    outer_to_inner: BTreeMap<usize, usize>,
    inner_to_outer: Vec<usize>,

    scalar_to_inner: BTreeMap<String, usize>,
    inner_to_scalar: Vec<String>,

    solution: Option<SdpSolution>,
    ignored: BTreeSet<String>,
    allowed_error: f64,
    legacy_double_remap: bool,
}

impl SdpProblem {
    pub fn new(matrix_size: usize) -> Self {
        Self {
            matrix_size,
            conditions: Vec::new(),
            state: State::ReadyToStart,
            outer_to_inner: BTreeMap::new(),
            inner_to_outer: Vec::new(),
            scalar_to_inner: BTreeMap::new(),
            inner_to_scalar: Vec::new(),
            solution: None,
            ignored: BTreeSet::new(),
            allowed_error: 1e-6,
            legacy_double_remap: true,
        }
    }

    pub fn matrix_size(&self) -> usize {
        self.matrix_size
    }

    pub fn matrix_count(&self) -> usize {
        self.inner_to_outer.len()
    }

    pub fn scalar_count(&self) -> usize {
        self.inner_to_scalar.len()
    }

    pub fn condition_count(&self) -> usize {
        self.conditions.len()
    }

    pub fn conditions(&self) -> &[LinearMatrixExpression] {
        &self.conditions
    }

    pub fn set_allowed_error(&mut self, allowed_error: f64) {
        self.allowed_error = allowed_error;
    }

    pub fn set_legacy_double_remap(&mut self, enabled: bool) {
        self.legacy_double_remap = enabled;
    }

    /// Excludes a solver unknown from [`Self::solution_as_map`] output.
    pub fn ignore(&mut self, name: &str) {
        self.ignored.insert(name.to_string());
    }

    fn intern_matrix(&mut self, outer: usize) -> usize {
        match self.outer_to_inner.get(&outer) {
            Some(&inner) => inner,
            None => {
                let inner = self.inner_to_outer.len();
                self.outer_to_inner.insert(outer, inner);
                self.inner_to_outer.push(outer);
                inner
            }
        }
    }

    fn intern_scalar(&mut self, name: &str) -> usize {
        match self.scalar_to_inner.get(name) {
            Some(&inner) => inner,
            None => {
                let inner = self.inner_to_scalar.len();
                self.scalar_to_inner.insert(name.to_string(), inner);
                self.inner_to_scalar.push(name.to_string());
                inner
            }
        }
    }

    pub fn start_new_condition(&mut self) -> Result<(), SdpError> {
        if self.state != State::ReadyToStart {
            return Err(SdpError::InvalidState("previous condition still open"));
        }
        self.state = State::ReadyToAdd;
        self.conditions
            .push(LinearMatrixExpression::new(self.matrix_size));
        Ok(())
    }

    fn open_condition(&mut self) -> Result<&mut LinearMatrixExpression, SdpError> {
        if self.state != State::ReadyToAdd {
            return Err(SdpError::InvalidState("no open condition"));
        }
        // A condition exists whenever the state is ReadyToAdd.
        self.conditions
            .last_mut()
            .ok_or(SdpError::InvalidState("no open condition"))
    }

    pub fn add_matrix_entry(
        &mut self,
        gram_id: usize,
        row: usize,
        col: usize,
        coefficient: f64,
    ) -> Result<(), SdpError> {
        let inner = self.intern_matrix(gram_id);
        self.open_condition()?
            .add_matrix_entry(inner, row, col, coefficient)
    }

    pub fn add_free_scalar(&mut self, name: &str, coefficient: f64) -> Result<(), SdpError> {
        let inner = self.intern_scalar(name);
        self.open_condition()?.add_free_coefficient(inner, coefficient);
        Ok(())
    }

    pub fn add_constant(&mut self, value: f64) -> Result<(), SdpError> {
        self.open_condition()?.add_constant(value);
        Ok(())
    }

    pub fn end_condition(&mut self, kind: ConditionKind) -> Result<(), SdpError> {
        self.open_condition()?.set_kind(kind);
        self.state = State::ReadyToStart;
        Ok(())
    }

    /// Adds one equality condition `lhs == 0` from a polynomial that must
    /// be linear in solver unknowns. Gram entry names route into matrix
    /// coefficients, every other name becomes a free scalar, and the
    /// constant monomial lands in the constant part.
    pub fn add_linear_equality_constraint(
        &mut self,
        lhs: &QPolynomial,
    ) -> Result<(), SdpError> {
        self.start_new_condition()?;
        for monomial in lhs.reduced_monomials()? {
            if monomial.is_zero() {
                continue;
            }
            if monomial.is_constant() {
                self.add_constant(monomial.numerator() as f64 / monomial.denominator() as f64)?;
                continue;
            }
            if !monomial.is_linear() {
                self.end_condition(ConditionKind::Eq)?;
                return Err(SdpError::NotLinear(monomial.to_string()));
            }
            let name = monomial.linear_name()?.to_string();
            let coefficient = monomial.numerator() as f64 / monomial.denominator() as f64;
            if GramEntry::is_gram_name(&name) {
                let entry = GramEntry::parse(&name)?;
                self.add_matrix_entry(entry.id, entry.row, entry.col, coefficient)?;
            } else {
                self.add_free_scalar(&name, coefficient)?;
            }
        }
        self.end_condition(ConditionKind::Eq)
    }

    /// Installs a candidate solution after checking it against every
    /// condition within the allowed error.
    pub fn set_solution(
        &mut self,
        matrices: Vec<Vec<Vec<f64>>>,
        scalars: Vec<f64>,
    ) -> Result<(), SdpError> {
        if matrices.len() != self.matrix_count() {
            return Err(SdpError::InvalidState("wrong number of solution matrices"));
        }
        if scalars.len() != self.scalar_count() {
            return Err(SdpError::InvalidState("wrong number of solution scalars"));
        }

        let total = self.conditions.len();
        for (index, condition) in self.conditions.iter().enumerate() {
            let actual = condition.evaluate(&matrices, &scalars);
            let violated = match condition.kind() {
                Some(ConditionKind::Eq) => actual.abs() > self.allowed_error,
                Some(ConditionKind::Geq) => actual < -self.allowed_error,
                Some(ConditionKind::InRange(range)) => {
                    actual.abs() > range + self.allowed_error
                }
                None => return Err(SdpError::InvalidState("condition without a kind")),
            };
            if violated {
                return Err(SdpError::ConstraintViolated {
                    condition: index + 1,
                    total,
                    actual,
                    allowed: self.allowed_error,
                });
            }
        }

        debug!(conditions = total, "solution validated");
        self.solution = Some(SdpSolution { matrices, scalars });
        Ok(())
    }

    pub fn solution(&self) -> Result<&SdpSolution, SdpError> {
        self.solution.as_ref().ok_or(SdpError::NotSolved)
    }

    /// Maps an inner matrix index back to the outer Gram id used in symbol
    /// names. With `legacy_double_remap` the inner-to-outer map is applied
    /// twice, reproducing the historical naming of solution maps; both
    /// agree whenever Gram ids are dense and allocated in first-use order.
    fn remap_matrix_index(&self, inner: usize) -> usize {
        let outer = self.inner_to_outer[inner];
        if self.legacy_double_remap {
            if let Some(&again) = self.inner_to_outer.get(outer) {
                return again;
            }
        }
        outer
    }

    /// Flattens the solution into `name -> value`, one entry per Gram
    /// matrix cell plus one per free scalar, minus the ignored names.
    pub fn solution_as_map(
        &self,
        extra_ignored: &BTreeSet<String>,
    ) -> Result<BTreeMap<String, f64>, SdpError> {
        let solution = self.solution()?;
        let mut map = BTreeMap::new();

        for (inner, matrix) in solution.matrices.iter().enumerate() {
            let id = self.remap_matrix_index(inner);
            for (row, cells) in matrix.iter().enumerate() {
                for (col, value) in cells.iter().enumerate() {
                    map.insert(format!("l_{id}_{row}_{col}"), *value);
                }
            }
        }
        for (inner, value) in solution.scalars.iter().enumerate() {
            map.insert(self.inner_to_scalar[inner].clone(), *value);
        }

        for name in self.ignored.iter().chain(extra_ignored) {
            map.remove(name);
        }
        Ok(map)
    }

    // ------------------------------------------------------------------
    // CSDP sparse file protocol (dat-s input, result file output)
    // ------------------------------------------------------------------

    fn scalar_block(&self, inner: usize) -> usize {
        self.matrix_count() + 1 + inner
    }

    /// Writes the problem in CSDP's sparse `dat-s` format. Every condition
    /// must be an equality. Each matrix unknown gets one block of the
    /// common size; each free scalar gets one diagonal 2x2 block encoding
    /// `s = s_plus - s_minus`.
    pub fn write_csdp(&self, out: &mut impl Write) -> Result<(), SdpError> {
        if self
            .conditions
            .iter()
            .any(|c| c.kind() != Some(ConditionKind::Eq))
        {
            return Err(SdpError::UnsupportedCondition);
        }

        writeln!(out, "{}", self.condition_count())?;
        writeln!(out, "{}", self.matrix_count() + self.scalar_count())?;

        for _ in 0..self.matrix_count() {
            write!(out, "{} ", self.matrix_size)?;
        }
        for _ in 0..self.scalar_count() {
            write!(out, "-2 ")?;
        }
        writeln!(out)?;

        for condition in &self.conditions {
            write!(out, "{} ", -condition.constant())?;
        }
        writeln!(out)?;

        for (index, condition) in self.conditions.iter().enumerate() {
            for (&inner, cells) in condition.matrix_coefficients() {
                for row in 0..self.matrix_size {
                    for col in row..self.matrix_size {
                        let value = cells[row][col];
                        if value == 0.0 {
                            continue;
                        }
                        writeln!(
                            out,
                            "{} {} {} {} {}",
                            index + 1,
                            inner + 1,
                            row + 1,
                            col + 1,
                            value
                        )?;
                    }
                }
            }
            for (&inner, &value) in condition.free_coefficients() {
                if value == 0.0 {
                    continue;
                }
                let block = self.scalar_block(inner);
                writeln!(out, "{} {} 1 1 {}", index + 1, block, value)?;
                writeln!(out, "{} {} 2 2 {}", index + 1, block, -value)?;
            }
        }
        Ok(())
    }

    /// Reads a CSDP result file back into solution matrices and scalars.
    /// The dual row is skipped; entry lines tagged with option 1 (dual
    /// slack) are ignored; matrix entries are mirrored; each scalar is
    /// recombined from its 2x2 block as `(1,1) - (2,2)`.
    pub fn read_csdp(
        &self,
        input: impl BufRead,
    ) -> Result<(Vec<Vec<Vec<f64>>>, Vec<f64>), SdpError> {
        let mut matrices =
            vec![vec![vec![0.0; self.matrix_size]; self.matrix_size]; self.matrix_count()];
        let mut scalars = vec![0.0; self.scalar_count()];

        let mut tokens = Vec::new();
        for line in input.lines() {
            let line = line?;
            tokens.extend(line.split_whitespace().map(str::to_string));
        }
        let mut tokens = tokens.into_iter();

        // The first row holds one dual value per condition.
        for _ in 0..self.condition_count() {
            let token = tokens
                .next()
                .ok_or_else(|| SdpError::MalformedOutput("missing dual row".into()))?;
            token
                .parse::<f64>()
                .map_err(|_| SdpError::MalformedOutput(format!("bad dual value `{token}`")))?;
        }

        loop {
            let Some(first) = tokens.next() else {
                break;
            };
            let mut field = |name: &str| -> Result<String, SdpError> {
                tokens
                    .next()
                    .ok_or_else(|| SdpError::MalformedOutput(format!("missing {name}")))
            };
            let option: u8 = first
                .parse()
                .map_err(|_| SdpError::MalformedOutput(format!("bad option `{first}`")))?;
            let block: usize = field("block")?
                .parse()
                .map_err(|_| SdpError::MalformedOutput("bad block index".into()))?;
            let row: usize = field("row")?
                .parse()
                .map_err(|_| SdpError::MalformedOutput("bad row index".into()))?;
            let col: usize = field("column")?
                .parse()
                .map_err(|_| SdpError::MalformedOutput("bad column index".into()))?;
            let value: f64 = field("value")?
                .parse()
                .map_err(|_| SdpError::MalformedOutput("bad entry value".into()))?;

            if option == 1 {
                continue;
            }

            if block >= 1 && block <= self.matrix_count() {
                if !(1..=self.matrix_size).contains(&row)
                    || !(1..=self.matrix_size).contains(&col)
                {
                    return Err(SdpError::MalformedOutput(format!(
                        "matrix cell ({row}, {col}) out of range for size {}",
                        self.matrix_size
                    )));
                }
                let matrix = &mut matrices[block - 1];
                matrix[row - 1][col - 1] = value;
                if row != col {
                    matrix[col - 1][row - 1] = value;
                }
            } else if block > self.matrix_count()
                && block <= self.matrix_count() + self.scalar_count()
            {
                let inner = block - self.matrix_count() - 1;
                match (row, col) {
                    (1, 1) => scalars[inner] += value,
                    (2, 2) => scalars[inner] -= value,
                    _ => {
                        return Err(SdpError::MalformedOutput(format!(
                            "unexpected scalar block cell ({row}, {col})"
                        )))
                    }
                }
            } else {
                return Err(SdpError::MalformedOutput(format!(
                    "block index {block} out of range"
                )));
            }
        }

        Ok((matrices, scalars))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use poscert_ring::{Env, QMonomial, QPolynomial};

    fn linear(env: &mut Env, terms: &[(&str, i64, i64)], constant: (i64, i64)) -> QPolynomial {
        let mut poly = QPolynomial::from_monomial(
            QMonomial::from_fraction(env.id(), constant.0, constant.1).expect("constant"),
        );
        for (name, num, den) in terms {
            let symbol = env.get_or_create(name);
            let monomial = QMonomial::from_symbol(&symbol, 1)
                .mul_scalar(*num)
                .expect("scale")
                .div_scalar(*den)
                .expect("scale");
            poly = poly.add(&QPolynomial::from_monomial(monomial)).expect("add");
        }
        poly
    }

    #[test]
    fn conditions_follow_the_start_add_end_protocol() {
        let mut problem = SdpProblem::new(2);
        assert!(problem.add_constant(1.0).is_err());
        problem.start_new_condition().expect("start");
        assert!(problem.start_new_condition().is_err());
        problem.add_constant(1.0).expect("add");
        problem.end_condition(ConditionKind::Eq).expect("end");
        assert!(problem.end_condition(ConditionKind::Eq).is_err());
    }

    #[test]
    fn equality_constraint_routes_names_into_the_right_buckets() {
        let mut env = Env::new();
        let lhs = linear(
            &mut env,
            &[("l_0_0_1", 2, 1), ("_coeff_1_T", -1, 3)],
            (5, 1),
        );
        let mut problem = SdpProblem::new(2);
        problem.add_linear_equality_constraint(&lhs).expect("add");

        assert_eq!(problem.matrix_count(), 1);
        assert_eq!(problem.scalar_count(), 1);
        let condition = &problem.conditions()[0];
        assert_relative_eq!(condition.constant(), 5.0);
        // 2 * l_0_0_1, split across mirror cells.
        assert_relative_eq!(condition.matrix_coefficients()[&0][0][1], 1.0);
        assert_relative_eq!(condition.matrix_coefficients()[&0][1][0], 1.0);
        assert_relative_eq!(condition.free_coefficients()[&0], -1.0 / 3.0);
    }

    #[test]
    fn nonlinear_constraint_is_rejected() {
        let mut env = Env::new();
        let symbol = env.get_or_create("l_0_0_0");
        let quadratic = QPolynomial::from_monomial(QMonomial::from_symbol(&symbol, 2));
        let mut problem = SdpProblem::new(2);
        let err = problem
            .add_linear_equality_constraint(&quadratic)
            .expect_err("quadratic");
        assert!(err.to_string().contains("linear"));
    }

    #[test]
    fn csdp_write_is_bit_exact() {
        let mut env = Env::new();
        let mut problem = SdpProblem::new(2);
        problem
            .add_linear_equality_constraint(&linear(
                &mut env,
                &[("l_0_0_0", 1, 1), ("a", 2, 1)],
                (-3, 1),
            ))
            .expect("condition 1");
        problem
            .add_linear_equality_constraint(&linear(
                &mut env,
                &[("l_0_0_1", 4, 1)],
                (1, 2),
            ))
            .expect("condition 2");

        let mut out = Vec::new();
        problem.write_csdp(&mut out).expect("write");
        let text = String::from_utf8(out).expect("utf8");
        // Dimension and constant rows carry a trailing separator space.
        let expected = concat!(
            "2\n",
            "2\n",
            "2 -2 \n",
            "3 -0.5 \n",
            "1 1 1 1 1\n",
            "1 2 1 1 2\n",
            "1 2 2 2 -2\n",
            "2 1 1 2 2\n",
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn csdp_write_rejects_non_equality_conditions() {
        let mut problem = SdpProblem::new(2);
        problem.start_new_condition().expect("start");
        problem.add_matrix_entry(0, 0, 0, 1.0).expect("add");
        problem.end_condition(ConditionKind::Geq).expect("end");
        let mut out = Vec::new();
        assert!(problem.write_csdp(&mut out).is_err());
    }

    #[test]
    fn csdp_result_parses_into_mirrored_matrices_and_recombined_scalars() {
        let mut env = Env::new();
        let mut problem = SdpProblem::new(2);
        problem
            .add_linear_equality_constraint(&linear(
                &mut env,
                &[("l_0_0_1", 1, 1), ("a", 1, 1)],
                (0, 1),
            ))
            .expect("condition");

        // Dual row, then dual slack entries (option 1, skipped), then the
        // primal entries (option 2).
        let result = "\
0.25
1 1 1 1 9.0
2 1 1 1 1.0
2 1 1 2 0.5
2 2 1 1 4.0
2 2 2 2 3.5
";
        let (matrices, scalars) = problem
            .read_csdp(result.as_bytes())
            .expect("parse result");
        assert_relative_eq!(matrices[0][0][1], 0.5);
        assert_relative_eq!(matrices[0][1][0], 0.5);
        assert_relative_eq!(matrices[0][0][0], 1.0);
        assert_relative_eq!(scalars[0], 0.5);
    }

    #[test]
    fn csdp_result_with_out_of_range_cells_is_rejected() {
        let mut env = Env::new();
        let mut problem = SdpProblem::new(2);
        problem
            .add_linear_equality_constraint(&linear(
                &mut env,
                &[("l_0_0_1", 1, 1)],
                (0, 1),
            ))
            .expect("condition");

        // CSDP cell indices are 1-based and bounded by the block size.
        for result in ["0.0\n2 1 0 1 5.0\n", "0.0\n2 1 9 9 5.0\n"] {
            let err = problem
                .read_csdp(result.as_bytes())
                .expect_err("cell out of range");
            assert!(err.to_string().contains("out of range"));
        }
    }

    #[test]
    fn solution_validation_names_the_violated_condition() {
        let mut env = Env::new();
        let mut problem = SdpProblem::new(1);
        problem
            .add_linear_equality_constraint(&linear(&mut env, &[("l_0_0_0", 1, 1)], (-1, 1)))
            .expect("condition");
        problem.set_allowed_error(1e-4);

        // l_0_0_0 = 2 leaves 2 - 1 = 1 on an equality.
        let err = problem
            .set_solution(vec![vec![vec![2.0]]], vec![])
            .expect_err("violated");
        assert!(err.to_string().contains("condition 1 of 1"));

        problem
            .set_solution(vec![vec![vec![1.0]]], vec![])
            .expect("exact solution");
        let map = problem.solution_as_map(&BTreeSet::new()).expect("map");
        assert_relative_eq!(map["l_0_0_0"], 1.0);
    }

    #[test]
    fn solution_map_respects_ignored_names() {
        let mut env = Env::new();
        let mut problem = SdpProblem::new(1);
        problem
            .add_linear_equality_constraint(&linear(
                &mut env,
                &[("l_0_0_0", 1, 1), ("_one", -1, 1)],
                (0, 1),
            ))
            .expect("condition");
        problem.ignore("_one");
        problem
            .set_solution(vec![vec![vec![3.0]]], vec![3.0])
            .expect("solution");
        let map = problem.solution_as_map(&BTreeSet::new()).expect("map");
        assert!(map.contains_key("l_0_0_0"));
        assert!(!map.contains_key("_one"));
    }
}
