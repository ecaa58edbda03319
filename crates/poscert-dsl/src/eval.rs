//! AST evaluation into ring elements.
//!
//! Every node evaluates to either a rational polynomial over the program
//! variables or a symbolic polynomial once an uninterpreted function enters
//! the picture. A binary node is symbolic as soon as either child is;
//! rational results are cast up on demand.
//!
//! Relations do not evaluate to booleans. A relation evaluates to the
//! polynomial that must be non-negative for it to hold: `r - l` for `<` and
//! `<=`, `l - r` for `>`, `>=` and `==`.

use std::collections::BTreeMap;

use poscert_ring::{
    symbolic_from_qpolynomial_as_base, Env, QPolynomial, SymbolicPolynomial,
};

use crate::ast::{BinOp, Expr, RelOp, UnOp};
use crate::error::EvalError;

/// Result of evaluating an AST node.
#[derive(Debug, Clone)]
pub enum Value {
    Rational(QPolynomial),
    Symbolic(SymbolicPolynomial),
}

impl Value {
    pub fn is_symbolic(&self) -> bool {
        matches!(self, Value::Symbolic(_))
    }

    /// Casts up into the symbolic ring.
    pub fn into_symbolic(self) -> Result<SymbolicPolynomial, EvalError> {
        match self {
            Value::Symbolic(p) => Ok(p),
            Value::Rational(p) => Ok(symbolic_from_qpolynomial_as_base(&p)?),
        }
    }
}

/// A declared function bound to its polynomial template. The template is a
/// symbolic polynomial over the formal argument symbols; a call substitutes
/// the actual arguments into the bases, leaving the template coefficients
/// free for the solver.
#[derive(Debug, Clone)]
pub struct FunctionTemplate {
    pub polynomial: SymbolicPolynomial,
    pub formal_args: Vec<String>,
}

/// Variable and function bindings for evaluation.
#[derive(Debug, Clone, Default)]
pub struct EvalContext {
    variables: BTreeMap<String, QPolynomial>,
    functions: BTreeMap<String, FunctionTemplate>,
}

impl EvalContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind_variable(&mut self, name: &str, value: QPolynomial) {
        self.variables.insert(name.to_string(), value);
    }

    pub fn bind_function(&mut self, name: &str, template: FunctionTemplate) {
        self.functions.insert(name.to_string(), template);
    }

    pub fn variable(&self, name: &str) -> Result<&QPolynomial, EvalError> {
        self.variables
            .get(name)
            .ok_or_else(|| EvalError::UndeclaredVariable(name.to_string()))
    }

    pub fn function(&self, name: &str) -> Result<&FunctionTemplate, EvalError> {
        self.functions
            .get(name)
            .ok_or_else(|| EvalError::UndeclaredFunction(name.to_string()))
    }

    pub fn functions(&self) -> impl Iterator<Item = (&str, &FunctionTemplate)> {
        self.functions.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Extracts the `(numerator, denominator)` of a divisor, which must reduce
/// to a single constant monomial.
fn constant_divisor(value: &Value) -> Result<(i64, i64), EvalError> {
    let rational = match value {
        Value::Rational(p) => p,
        Value::Symbolic(_) => return Err(EvalError::DivisionByNonMonomial),
    };
    let monomials = rational.reduced_monomials().map_err(EvalError::Ring)?;
    if monomials.len() != 1 {
        return Err(EvalError::DivisionByNonMonomial);
    }
    if !monomials[0].is_constant() {
        return Err(EvalError::DivisionByNonConstant);
    }
    Ok((monomials[0].numerator(), monomials[0].denominator()))
}

fn eval_binary(
    op: BinOp,
    left: Value,
    right: Value,
) -> Result<Value, EvalError> {
    if let BinOp::Div = op {
        // Dividing by `n/d` is multiplying by `d/n`; the divisor must be a
        // constant either way.
        let (num, den) = constant_divisor(&right)?;
        return match left {
            Value::Rational(p) => Ok(Value::Rational(p.mul_scalar(den)?.div_scalar(num)?)),
            Value::Symbolic(p) => Ok(Value::Symbolic(p.mul_scalar(den)?.div_scalar(num)?)),
        };
    }

    if left.is_symbolic() || right.is_symbolic() {
        let l = left.into_symbolic()?;
        let r = right.into_symbolic()?;
        let result = match op {
            BinOp::Add => l.add(&r, true)?,
            BinOp::Sub => l.add(&r.mul_scalar(-1)?, true)?,
            BinOp::Mul => l.mul(&r)?,
            BinOp::Div => unreachable!("handled above"),
        };
        return Ok(Value::Symbolic(result));
    }

    let (Value::Rational(l), Value::Rational(r)) = (left, right) else {
        unreachable!("both sides are rational here");
    };
    let result = match op {
        BinOp::Add => l.add(&r)?,
        BinOp::Sub => l.add(&r.mul_scalar(-1)?)?,
        BinOp::Mul => l.mul(&r)?,
        BinOp::Div => unreachable!("handled above"),
    };
    Ok(Value::Rational(result))
}

fn eval_relation(op: RelOp, left: Value, right: Value) -> Result<Value, EvalError> {
    let l = left.into_symbolic()?;
    let r = right.into_symbolic()?;
    let difference = match op {
        RelOp::Lt | RelOp::Leq => r.add(&l.mul_scalar(-1)?, true)?,
        RelOp::Gt | RelOp::Geq | RelOp::Eq => l.add(&r.mul_scalar(-1)?, true)?,
    };
    Ok(Value::Symbolic(difference))
}

/// Evaluates an expression under the given context.
pub fn evaluate(expr: &Expr, env: &mut Env, context: &EvalContext) -> Result<Value, EvalError> {
    match expr {
        Expr::Constant(value) => Ok(Value::Rational(
            env.q_polynomial_one().mul_scalar(*value)?,
        )),
        Expr::Variable(name) => Ok(Value::Rational(context.variable(name)?.clone())),
        Expr::Function { name, args } => {
            let template = context.function(name)?.clone();
            if args.len() != template.formal_args.len() {
                return Err(EvalError::ArityMismatch {
                    name: name.clone(),
                    got: args.len(),
                    declared: template.formal_args.len(),
                });
            }
            let mut result = template.polynomial;
            for (formal, actual) in template.formal_args.iter().zip(args) {
                let value = match evaluate(actual, env, context)? {
                    Value::Rational(p) => p,
                    Value::Symbolic(_) => {
                        return Err(EvalError::SymbolicFunctionArgument(actual.to_string()))
                    }
                };
                let symbol = env.get_or_create(formal);
                result = result.substitute_in_base(&symbol, &value)?;
            }
            Ok(Value::Symbolic(result))
        }
        Expr::BinaryOp { op, left, right } => {
            let l = evaluate(left, env, context)?;
            let r = evaluate(right, env, context)?;
            eval_binary(*op, l, r)
        }
        Expr::UnaryOp { op, expr } => {
            let value = evaluate(expr, env, context)?;
            match op {
                UnOp::Plus => Ok(value),
                UnOp::Minus => match value {
                    Value::Rational(p) => Ok(Value::Rational(p.mul_scalar(-1)?)),
                    Value::Symbolic(p) => Ok(Value::Symbolic(p.mul_scalar(-1)?)),
                },
            }
        }
        Expr::Relation { op, left, right } => {
            let l = evaluate(left, env, context)?;
            let r = evaluate(right, env, context)?;
            eval_relation(*op, l, r)
        }
    }
}
