//! The certificate builder pipeline.
//!
//! One estimator owns one parsed [`Program`] and runs it through:
//! normalization (`move_to_greater_side` on every relation), the optional
//! Handelman monoid extension, the optional `1 >= 0` hypothesis injection,
//! function-template instantiation, evaluation into the symbolic ring, the
//! SOS ansatz, reduction to a linear equality system over the solver
//! unknowns, and one backend solve. The normalized program, the monomial
//! vector, the templates, the per-condition Gram-id ranges, and the
//! solution map are kept for certificate emission.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use poscert_dsl::{
    evaluate, move_to_greater_side, BinOp, EvalContext, Expr, FunctionTemplate, Program,
    RelOp,
};
use poscert_ring::combinatorics::bounded_sum_vectors;
use poscert_ring::{Env, QMonomial, QPolynomial, SymbolicPolynomial};
use poscert_sdp::{
    CsdpBackend, GramEntry, MosekBackend, SdpOutcome, SdpProblem, SolverBackend,
};

use crate::config::{Engine, Feasibility, Method, SolverConfig};
use crate::error::EstimatorError;
use crate::sos::{get_sos, GramIdAllocator};
use crate::templates::{build_function_template, formal_arg_name, MAX_ARITY};

struct SymbolicCondition {
    hypotheses: Vec<SymbolicPolynomial>,
    conclusions: Vec<SymbolicPolynomial>,
}

pub struct ComplexityEstimator {
    program: Program,
    config: SolverConfig,
    feasibility: Feasibility,
    trusted_input: bool,

    pub(crate) solution: BTreeMap<String, f64>,
    pub(crate) variable_names: Vec<String>,
    pub(crate) sos_monomials: Vec<QMonomial>,
    pub(crate) templates: BTreeMap<String, SymbolicPolynomial>,
    /// Per condition, the half-open Gram-id range of its SOS multipliers.
    pub(crate) condition_gram_ranges: Vec<(usize, usize)>,
}

impl ComplexityEstimator {
    pub fn new(program: Program, config: SolverConfig) -> Self {
        Self {
            program,
            config,
            feasibility: Feasibility::Unknown,
            trusted_input: false,
            solution: BTreeMap::new(),
            variable_names: Vec::new(),
            sos_monomials: Vec::new(),
            templates: BTreeMap::new(),
            condition_gram_ranges: Vec::new(),
        }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// The program as mutated by the pipeline (normalized relations, monoid
    /// extension, injected hypotheses). Before `solve` it is the parsed
    /// input unchanged.
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Certificate emission writes an executable script whose content
    /// embeds program text verbatim. Callers must opt in to confirm the
    /// input is trusted.
    pub fn accept_trusted_input_only(&mut self) {
        self.trusted_input = true;
    }

    pub(crate) fn trusted_input(&self) -> bool {
        self.trusted_input
    }

    pub fn feasibility(&self) -> Feasibility {
        self.feasibility
    }

    pub fn is_feasible(&self) -> Result<bool, EstimatorError> {
        match self.feasibility {
            Feasibility::Unknown => Err(EstimatorError::NotSolved),
            Feasibility::Feasible => Ok(true),
            Feasibility::Infeasible => Ok(false),
        }
    }

    pub fn solution(&self) -> Result<&BTreeMap<String, f64>, EstimatorError> {
        match self.feasibility {
            Feasibility::Unknown => Err(EstimatorError::NotSolved),
            _ => Ok(&self.solution),
        }
    }

    /// Solves with the backend selected by the configuration.
    pub fn solve(&mut self) -> Result<Feasibility, EstimatorError> {
        match self.config.engine {
            Engine::Csdp => self.solve_with(&CsdpBackend::new()),
            Engine::Mosek => self.solve_with(&MosekBackend::new()),
        }
    }

    /// Runs the whole pipeline against the given backend. A second call
    /// returns the recorded outcome without re-running.
    pub fn solve_with(
        &mut self,
        backend: &dyn SolverBackend,
    ) -> Result<Feasibility, EstimatorError> {
        if self.feasibility != Feasibility::Unknown {
            return Ok(self.feasibility);
        }

        self.normalize()?;
        if self.config.method == Method::Handelman {
            self.extend_with_monoid(self.config.degree)?;
        }
        if self.config.add_one_geq_zero {
            for condition in &mut self.program.conditions {
                condition
                    .hypotheses
                    .push(Expr::relation(RelOp::Geq, Expr::Constant(1), Expr::Constant(0)));
            }
        }

        let mut env = Env::new();
        let context = self.build_context(&mut env)?;
        let symbolic_conditions = self.evaluate_conditions(&mut env, &context)?;
        self.sos_monomials = self.build_monomial_vector(&mut env)?;
        debug!(
            conditions = symbolic_conditions.len(),
            monomial_vector = self.sos_monomials.len(),
            "symbolic system built"
        );

        let must_vanish = self.build_linear_system(&mut env, &symbolic_conditions)?;
        debug!(equalities = must_vanish.len(), "linear system reduced");

        let mut problem = SdpProblem::new(self.sos_monomials.len());
        problem.set_legacy_double_remap(self.config.legacy_double_remap);
        for polynomial in &must_vanish {
            problem.add_linear_equality_constraint(polynomial)?;
        }

        info!(backend = backend.name(), "solving SDP feasibility problem");
        match backend.solve(&mut problem)? {
            SdpOutcome::Feasible => {
                self.solution = problem.solution_as_map(&BTreeSet::new())?;
                self.feasibility = Feasibility::Feasible;
            }
            SdpOutcome::Infeasible => {
                self.feasibility = Feasibility::Infeasible;
            }
        }
        Ok(self.feasibility)
    }

    fn normalize(&mut self) -> Result<(), EstimatorError> {
        for condition in &mut self.program.conditions {
            for expr in condition
                .hypotheses
                .iter_mut()
                .chain(condition.conclusions.iter_mut())
            {
                *expr = move_to_greater_side(expr)?;
            }
        }
        Ok(())
    }

    /// Handelman extension: appends, per condition, every product of
    /// hypothesis left-hand sides whose power vector sums to a value in
    /// `[2, degree]`, each wrapped as a new `>= 0` relation.
    fn extend_with_monoid(&mut self, degree: u32) -> Result<(), EstimatorError> {
        for condition in &mut self.program.conditions {
            if condition.hypotheses.is_empty() {
                continue;
            }

            let mut extension = Vec::new();
            for powers in bounded_sum_vectors(condition.hypotheses.len(), degree) {
                if powers.iter().sum::<u32>() < 2 {
                    continue;
                }
                let mut term = Expr::Constant(1);
                for (hypothesis, &power) in condition.hypotheses.iter().zip(&powers) {
                    let lhs = relation_lhs(hypothesis)?;
                    for _ in 0..power {
                        term = Expr::binary(BinOp::Mul, term, lhs.clone());
                    }
                }
                extension.push(Expr::relation(RelOp::Geq, term, Expr::Constant(0)));
            }
            debug!(products = extension.len(), "monoid extension");
            condition.hypotheses.extend(extension);
        }
        Ok(())
    }

    fn build_context(&mut self, env: &mut Env) -> Result<EvalContext, EstimatorError> {
        let mut context = EvalContext::new();

        self.variable_names = self.program.variables().map(str::to_string).collect();
        let mut variable_monomials = Vec::with_capacity(self.variable_names.len());
        for name in &self.variable_names {
            // The Gram namespace is the solver's; a variable that parses as
            // an entry name would be misrouted into a matrix coefficient.
            if GramEntry::parse(name).is_ok() {
                return Err(EstimatorError::ReservedName(name.clone()));
            }
            let symbol = env.sym(name)?;
            let monomial = QMonomial::from_symbol(&symbol, 1);
            context.bind_variable(name, QPolynomial::from_monomial(monomial.clone()));
            variable_monomials.push(monomial);
        }

        let max_arity = self.program.functions().map(|f| f.arity).max().unwrap_or(0);
        if let Some(decl) = self.program.functions().find(|f| f.arity > MAX_ARITY) {
            return Err(EstimatorError::UnsupportedArity {
                name: decl.name.clone(),
                arity: decl.arity,
            });
        }

        let mut formal_args = Vec::with_capacity(max_arity as usize);
        let mut formal_names = Vec::with_capacity(max_arity as usize);
        for i in 0..max_arity {
            let name = formal_arg_name(i);
            let symbol = env.sym(&name)?;
            formal_args.push(QMonomial::from_symbol(&symbol, 1));
            formal_names.push(name);
        }

        self.templates.clear();
        let declarations: Vec<_> = self.program.functions().cloned().collect();
        for decl in declarations {
            let degree = decl.highest_degree.unwrap_or(self.config.degree);
            let template = build_function_template(
                env,
                &decl.name,
                &formal_args[..decl.arity as usize],
                degree,
            )?;
            self.templates.insert(decl.name.clone(), template.clone());
            context.bind_function(
                &decl.name,
                FunctionTemplate {
                    polynomial: template,
                    formal_args: formal_names[..decl.arity as usize].to_vec(),
                },
            );
        }
        Ok(context)
    }

    fn evaluate_conditions(
        &self,
        env: &mut Env,
        context: &EvalContext,
    ) -> Result<Vec<SymbolicCondition>, EstimatorError> {
        let mut result = Vec::with_capacity(self.program.conditions.len());
        for condition in &self.program.conditions {
            let mut symbolic = SymbolicCondition {
                hypotheses: Vec::with_capacity(condition.hypotheses.len()),
                conclusions: Vec::with_capacity(condition.conclusions.len()),
            };
            for expr in &condition.hypotheses {
                symbolic
                    .hypotheses
                    .push(evaluate(expr, env, context)?.into_symbolic()?);
            }
            for expr in &condition.conclusions {
                symbolic
                    .conclusions
                    .push(evaluate(expr, env, context)?.into_symbolic()?);
            }
            result.push(symbolic);
        }
        Ok(result)
    }

    /// All bounded-sum monomials over the declared variables. Putinar uses
    /// the configured degree; Handelman keeps the multipliers at
    /// `handelman_sos_degree` because the monoid already carries the
    /// hypothesis powers.
    fn build_monomial_vector(&self, env: &mut Env) -> Result<Vec<QMonomial>, EstimatorError> {
        let degree = match self.config.method {
            Method::Putinar => self.config.degree,
            Method::Handelman => self.config.handelman_sos_degree,
        };

        let mut monomials = Vec::new();
        for powers in bounded_sum_vectors(self.variable_names.len(), degree) {
            let mut monomial = env.q_monomial_one();
            for (name, &power) in self.variable_names.iter().zip(&powers) {
                if power > 0 {
                    let symbol = env.get_or_create(name);
                    monomial = monomial.mul(&QMonomial::from_symbol(&symbol, power))?;
                }
            }
            monomials.push(monomial);
        }
        Ok(monomials)
    }

    /// Per (condition, conclusion): `Σ sos_i · hypothesis_i − conclusion`,
    /// accumulated with deferred reduction. Every coefficient polynomial of
    /// the reduced result must vanish.
    fn build_linear_system(
        &mut self,
        env: &mut Env,
        conditions: &[SymbolicCondition],
    ) -> Result<Vec<QPolynomial>, EstimatorError> {
        let mut allocator = GramIdAllocator::new();
        let mut must_vanish = Vec::new();
        self.condition_gram_ranges.clear();

        for condition in conditions {
            let range_start = allocator.peek();
            for conclusion in &condition.conclusions {
                let mut encoding = env.symbolic_polynomial_zero();
                for hypothesis in &condition.hypotheses {
                    let sos = get_sos(env, &self.sos_monomials, allocator.next_id())?;
                    encoding = encoding.add(&sos.mul(hypothesis)?, false)?;
                }
                encoding = encoding.add(&conclusion.mul_scalar(-1)?, false)?;

                for monomial in encoding.reduced_monomials()? {
                    must_vanish.push(monomial.coefficient().clone());
                }
            }
            self.condition_gram_ranges
                .push((range_start, range_start + condition.hypotheses.len()));
        }
        Ok(must_vanish)
    }
}

/// The left-hand side of a normalized relation `lhs >= 0`.
pub(crate) fn relation_lhs(expr: &Expr) -> Result<&Expr, EstimatorError> {
    match expr {
        Expr::Relation { left, .. } => Ok(left),
        other => Err(EstimatorError::UnrenderableExpression(other.to_string())),
    }
}
