//! Polynomial templates for declared functions.
//!
//! A declared function of arity `a` and degree `d` becomes the generic
//! degree-`d` polynomial over its formal arguments: one free coefficient
//! unknown `_coeff_<p0>_..._<fname>` per exponent tuple with bounded sum.
//! The coefficients stay free for the solver; a call site substitutes the
//! actual arguments into the bases only.

use poscert_ring::combinatorics::bounded_sum_vectors;
use poscert_ring::{Env, QMonomial, QPolynomial, SymbolicMonomial, SymbolicPolynomial};

use crate::error::EstimatorError;

/// Largest supported function arity.
pub const MAX_ARITY: u32 = 2;

/// Name of the `index`-th shared formal argument symbol.
pub fn formal_arg_name(index: u32) -> String {
    format!("_function_arg_{index}")
}

fn coefficient_name(powers: &[u32], function_name: &str) -> String {
    let mut label = String::from("_coeff_");
    for power in powers {
        label.push_str(&format!("{power}_"));
    }
    label.push_str(function_name);
    label
}

/// Builds the template polynomial for `name` over the given formal argument
/// monomials (`args.len()` is the arity).
pub fn build_function_template(
    env: &mut Env,
    name: &str,
    args: &[QMonomial],
    degree: u32,
) -> Result<SymbolicPolynomial, EstimatorError> {
    if args.len() as u32 > MAX_ARITY {
        return Err(EstimatorError::UnsupportedArity {
            name: name.to_string(),
            arity: args.len() as u32,
        });
    }

    let mut template = env.symbolic_polynomial_zero();
    for powers in bounded_sum_vectors(args.len(), degree) {
        let mut base = env.q_monomial_one();
        for (arg, &power) in args.iter().zip(&powers) {
            for _ in 0..power {
                base = base.mul(arg)?;
            }
        }

        let coefficient = env.sym(&coefficient_name(&powers, name))?;
        let term = SymbolicMonomial::new(
            base,
            QPolynomial::from_monomial(QMonomial::from_symbol(&coefficient, 1)),
        );
        template = template.add(&SymbolicPolynomial::from_monomial(term), true)?;
    }
    Ok(template)
}
