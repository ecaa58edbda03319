//! The two-level symbolic ring.
//!
//! A [`SymbolicMonomial`] pairs a base monomial in program variables with a
//! coefficient that is itself a rational polynomial in solver unknowns
//! (Gram-matrix entries, free scalars). A [`SymbolicPolynomial`] is a sum of
//! such monomials, merged by base-monomial similarity.
//!
//! Two substitution modes exist and must stay separate:
//! - [`SymbolicPolynomial::substitute_in_base`] replaces a program variable
//!   inside the bases (function-template instantiation at a call site),
//! - [`SymbolicPolynomial::substitute_in_coefficients`] replaces a solver
//!   variable inside the coefficients (numeric back-substitution).

use serde::{Deserialize, Serialize};

use crate::env::{EnvId, Symbol};
use crate::error::RingError;
use crate::monomial::QMonomial;
use crate::polynomial::QPolynomial;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolicMonomial {
    base: QMonomial,
    coeff: QPolynomial,
}

impl SymbolicMonomial {
    pub fn new(base: QMonomial, coeff: QPolynomial) -> Self {
        Self { base, coeff }
    }

    /// Casts a rational monomial up: coefficient polynomial 1.
    pub fn from_qmonomial(base: QMonomial) -> Self {
        let one = QPolynomial::from_monomial(QMonomial::constant(base.env(), 1));
        Self { base, coeff: one }
    }

    /// Casts a rational polynomial up: base monomial 1.
    pub fn from_qpolynomial(coeff: QPolynomial) -> Self {
        let base = QMonomial::constant(coeff.env(), 1);
        Self { base, coeff }
    }

    pub fn env(&self) -> EnvId {
        self.base.env()
    }

    pub fn base(&self) -> &QMonomial {
        &self.base
    }

    pub fn coefficient(&self) -> &QPolynomial {
        &self.coeff
    }

    pub fn is_unitary(&self) -> bool {
        self.base.is_unitary()
    }

    /// Folds the base coefficient into the coefficient polynomial so the
    /// base coefficient becomes exactly 1. Required before adding two
    /// monomials with proportional bases. Fails on a zero base.
    pub fn unitize(&mut self) -> Result<(), RingError> {
        let num = self.base.numerator();
        let den = self.base.denominator();
        if num == 0 {
            return Err(RingError::DivisionByZero);
        }
        self.base = self.base.mul_scalar(den)?.div_scalar(num)?;
        self.coeff = self.coeff.mul_scalar(num)?.div_scalar(den)?;
        Ok(())
    }

    fn check_env(&self, other: &Self) -> Result<(), RingError> {
        if self.env() != other.env() {
            return Err(RingError::EnvMismatch);
        }
        Ok(())
    }

    pub fn mul(&self, other: &Self) -> Result<Self, RingError> {
        self.check_env(other)?;
        Ok(Self {
            base: self.base.mul(&other.base)?,
            coeff: self.coeff.mul(&other.coeff)?,
        })
    }

    pub fn mul_scalar(&self, scalar: i64) -> Result<Self, RingError> {
        Ok(Self {
            base: self.base.clone(),
            coeff: self.coeff.mul_scalar(scalar)?,
        })
    }

    pub fn div_scalar(&self, scalar: i64) -> Result<Self, RingError> {
        Ok(Self {
            base: self.base.clone(),
            coeff: self.coeff.div_scalar(scalar)?,
        })
    }

    /// Adds two monomials with similar bases by unitizing both and adding
    /// the coefficient polynomials. A zero base short-circuits.
    pub fn add(&self, other: &Self) -> Result<Self, RingError> {
        self.check_env(other)?;
        if !self.base.is_similar(&other.base)? {
            return Err(RingError::DissimilarAdd(
                self.to_string(),
                other.to_string(),
            ));
        }
        if self.base.is_zero() {
            return Ok(other.clone());
        }
        if other.base.is_zero() {
            return Ok(self.clone());
        }

        let mut lhs = self.clone();
        let mut rhs = other.clone();
        lhs.unitize()?;
        rhs.unitize()?;
        lhs.coeff = lhs.coeff.add(&rhs.coeff)?;
        Ok(lhs)
    }

    fn signature_cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.base.signature_cmp(&other.base)
    }
}

impl std::fmt::Display for SymbolicMonomial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}*[{}]", self.base, self.coeff)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolicPolynomial {
    env: EnvId,
    monomials: Vec<SymbolicMonomial>,
}

impl SymbolicPolynomial {
    pub fn from_monomial(monomial: SymbolicMonomial) -> Self {
        Self {
            env: monomial.env(),
            monomials: vec![monomial],
        }
    }

    pub fn env(&self) -> EnvId {
        self.env
    }

    pub fn monomials(&self) -> &[SymbolicMonomial] {
        &self.monomials
    }

    fn check_env(&self, other: &Self) -> Result<(), RingError> {
        if self.env != other.env {
            return Err(RingError::EnvMismatch);
        }
        Ok(())
    }

    /// Sorts by base signature and merges similar bases.
    pub fn reduce(&mut self) -> Result<(), RingError> {
        let mut sorted = std::mem::take(&mut self.monomials);
        sorted.sort_by(SymbolicMonomial::signature_cmp);

        let Some(first) = sorted.first() else {
            return Ok(());
        };

        let mut current = first.clone();
        for monomial in &sorted[1..] {
            if current.base().is_similar(monomial.base())? {
                current = current.add(monomial)?;
            } else {
                self.monomials.push(current);
                current = monomial.clone();
            }
        }
        self.monomials.push(current);
        Ok(())
    }

    /// Deferred-reduction addition. Hot accumulation loops pass
    /// `need_reduce = false` and force reduction once at the read-out;
    /// [`Self::reduced_monomials`] always reduces.
    pub fn add(&self, other: &Self, need_reduce: bool) -> Result<Self, RingError> {
        self.check_env(other)?;
        let mut result = self.clone();
        result.monomials.extend(other.monomials.iter().cloned());
        if need_reduce {
            result.reduce()?;
        }
        Ok(result)
    }

    /// Full distribution; always reduced (required for correctness).
    pub fn mul(&self, other: &Self) -> Result<Self, RingError> {
        self.check_env(other)?;
        let mut result = Self {
            env: self.env,
            monomials: Vec::with_capacity(self.monomials.len() * other.monomials.len()),
        };
        for left in &self.monomials {
            for right in &other.monomials {
                result.monomials.push(left.mul(right)?);
            }
        }
        result.reduce()?;
        Ok(result)
    }

    pub fn mul_scalar(&self, scalar: i64) -> Result<Self, RingError> {
        let mut result = self.clone();
        for monomial in &mut result.monomials {
            *monomial = monomial.mul_scalar(scalar)?;
        }
        Ok(result)
    }

    pub fn div_scalar(&self, scalar: i64) -> Result<Self, RingError> {
        if scalar == 0 {
            return Err(RingError::DivisionByZero);
        }
        let mut result = self.clone();
        for monomial in &mut result.monomials {
            *monomial = monomial.div_scalar(scalar)?;
        }
        Ok(result)
    }

    /// Reduced copy of the monomial list; the only sanctioned read-out.
    pub fn reduced_monomials(&self) -> Result<Vec<SymbolicMonomial>, RingError> {
        let mut copy = self.clone();
        copy.reduce()?;
        Ok(copy.monomials)
    }

    /// Canonical (reduced, sorted) text form; used by tests to compare
    /// polynomials built along different paths.
    pub fn canonical_string(&self) -> Result<String, RingError> {
        let monomials = self.reduced_monomials()?;
        let terms: Vec<String> = monomials.iter().map(|m| m.to_string()).collect();
        Ok(terms.join(" + "))
    }

    /// Replaces `symbol` inside every base monomial by `substitution`,
    /// expanding powers; coefficients are untouched.
    pub fn substitute_in_base(
        &self,
        symbol: &Symbol,
        substitution: &QPolynomial,
    ) -> Result<Self, RingError> {
        let zero = SymbolicMonomial::new(
            QMonomial::constant(self.env, 0),
            QPolynomial::from_monomial(QMonomial::constant(self.env, 1)),
        );
        let mut result = Self::from_monomial(zero);

        for monomial in self.reduced_monomials()? {
            let substituted = substitute(monomial.base(), symbol, substitution)?;
            for base in substituted.monomials() {
                let term = SymbolicMonomial::new(base.clone(), monomial.coefficient().clone());
                result = result.add(&Self::from_monomial(term), true)?;
            }
        }
        Ok(result)
    }

    /// Replaces `symbol` inside every coefficient polynomial; bases are
    /// untouched.
    pub fn substitute_in_coefficients(
        &self,
        symbol: &Symbol,
        substitution: &QPolynomial,
    ) -> Result<Self, RingError> {
        let zero = SymbolicMonomial::new(
            QMonomial::constant(self.env, 0),
            QPolynomial::from_monomial(QMonomial::constant(self.env, 1)),
        );
        let mut result = Self::from_monomial(zero);

        for monomial in self.reduced_monomials()? {
            let mut coeff = QPolynomial::from_monomial(QMonomial::constant(self.env, 0));
            for coeff_monomial in monomial.coefficient().monomials() {
                coeff = coeff.add(&substitute(coeff_monomial, symbol, substitution)?)?;
            }
            let term = SymbolicMonomial::new(monomial.base().clone(), coeff);
            result = result.add(&Self::from_monomial(term), true)?;
        }
        Ok(result)
    }
}

impl std::fmt::Display for SymbolicPolynomial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, monomial) in self.monomials.iter().enumerate() {
            if i > 0 {
                write!(f, " + ")?;
            }
            write!(f, "{monomial}")?;
        }
        Ok(())
    }
}

/// Replaces one variable of a rational monomial by a polynomial, expanding
/// the power by repeated multiplication.
pub fn substitute(
    monomial: &QMonomial,
    symbol: &Symbol,
    substitution: &QPolynomial,
) -> Result<QPolynomial, RingError> {
    let env = substitution.env();
    let one = QPolynomial::from_monomial(QMonomial::constant(env, 1));
    let mut result = one
        .mul_scalar(monomial.numerator())?
        .div_scalar(monomial.denominator())?;

    for (var, power) in monomial.variables_and_powers() {
        if var == symbol.name() {
            for _ in 0..*power {
                result = result.mul(substitution)?;
            }
        } else {
            let kept = QMonomial::from_var(env, var, *power);
            result = result.mul(&QPolynomial::from_monomial(kept))?;
        }
    }
    let mut reduced = result;
    reduced.reduce()?;
    Ok(reduced)
}

/// Casts every monomial of a rational polynomial up into the symbolic ring
/// as a base with coefficient 1.
pub fn symbolic_from_qpolynomial_as_base(
    qpolynomial: &QPolynomial,
) -> Result<SymbolicPolynomial, RingError> {
    let env = qpolynomial.env();
    let zero = SymbolicMonomial::from_qmonomial(QMonomial::constant(env, 0));
    let mut result = SymbolicPolynomial::from_monomial(zero);
    for monomial in qpolynomial.monomials() {
        let term = SymbolicMonomial::from_qmonomial(monomial.clone());
        result = result.add(&SymbolicPolynomial::from_monomial(term), true)?;
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Env;

    #[test]
    fn unitize_moves_base_coefficient() {
        let mut env = Env::new();
        let x = env.sym("x").expect("declare");
        let l = env.sym("l_0_0_0").expect("declare");

        let base = QMonomial::from_symbol(&x, 1).mul_scalar(3).expect("mul");
        let coeff = QPolynomial::from_monomial(QMonomial::from_symbol(&l, 1));
        let mut monomial = SymbolicMonomial::new(base, coeff);
        monomial.unitize().expect("unitize");

        assert!(monomial.is_unitary());
        assert_eq!(monomial.coefficient().monomials()[0].numerator(), 3);
    }

    #[test]
    fn add_merges_proportional_bases() {
        let mut env = Env::new();
        let x = env.sym("x").expect("declare");
        let a = SymbolicMonomial::from_qmonomial(
            QMonomial::from_symbol(&x, 1).mul_scalar(2).expect("mul"),
        );
        let b = SymbolicMonomial::from_qmonomial(
            QMonomial::from_symbol(&x, 1).mul_scalar(5).expect("mul"),
        );
        let sum = a.add(&b).expect("add");
        assert!(sum.is_unitary());
        assert_eq!(sum.coefficient().monomials()[0].numerator(), 7);
    }

    #[test]
    fn substitute_expands_powers() {
        let mut env = Env::new();
        let x = env.sym("x").expect("declare");
        let y = env.sym("y").expect("declare");

        // substitute x := y + 1 into 2*x^2 -> 2y^2 + 4y + 2
        let target = QMonomial::from_symbol(&x, 2).mul_scalar(2).expect("mul");
        let y_poly = QPolynomial::from_monomial(QMonomial::from_symbol(&y, 1));
        let substitution = y_poly.add(&env.q_polynomial_one()).expect("add");

        let result = substitute(&target, &x, &substitution).expect("substitute");
        let monomials = result.reduced_monomials().expect("reduce");
        assert_eq!(monomials.len(), 3);
        let coeffs: Vec<i64> = monomials.iter().map(|m| m.numerator()).collect();
        assert_eq!(coeffs, vec![2, 4, 2]);
    }

    #[test]
    fn substitute_in_base_keeps_coefficients() {
        let mut env = Env::new();
        let x = env.sym("x").expect("declare");
        let y = env.sym("y").expect("declare");
        let l = env.sym("l_0_0_0").expect("declare");

        let base = QMonomial::from_symbol(&x, 1);
        let coeff = QPolynomial::from_monomial(QMonomial::from_symbol(&l, 1));
        let poly = SymbolicPolynomial::from_monomial(SymbolicMonomial::new(base, coeff));

        let y_poly = QPolynomial::from_monomial(QMonomial::from_symbol(&y, 1));
        let result = poly.substitute_in_base(&x, &y_poly).expect("substitute");

        let monomials = result.reduced_monomials().expect("reduce");
        let nonzero: Vec<_> = monomials.iter().filter(|m| !m.base().is_zero()).collect();
        assert_eq!(nonzero.len(), 1);
        assert_eq!(
            nonzero[0].base().variables_and_powers(),
            &[("y".to_string(), 1)]
        );
        assert_eq!(
            nonzero[0].coefficient().monomials()[0].variables_and_powers(),
            &[("l_0_0_0".to_string(), 1)]
        );
    }

    #[test]
    fn substitute_in_coefficients_keeps_bases() {
        let mut env = Env::new();
        let x = env.sym("x").expect("declare");
        let l = env.sym("l_0_0_0").expect("declare");

        let base = QMonomial::from_symbol(&x, 1);
        let coeff = QPolynomial::from_monomial(QMonomial::from_symbol(&l, 1));
        let poly = SymbolicPolynomial::from_monomial(SymbolicMonomial::new(base, coeff));

        // back-substitute l_0_0_0 := 7
        let seven = env.q_polynomial_one().mul_scalar(7).expect("mul");
        let result = poly
            .substitute_in_coefficients(&l, &seven)
            .expect("substitute");

        let monomials = result.reduced_monomials().expect("reduce");
        let nonzero: Vec<_> = monomials.iter().filter(|m| !m.base().is_zero()).collect();
        assert_eq!(nonzero.len(), 1);
        assert_eq!(
            nonzero[0].base().variables_and_powers(),
            &[("x".to_string(), 1)]
        );
        assert_eq!(nonzero[0].coefficient().monomials()[0].numerator(), 7);
    }

    #[test]
    fn distributivity_in_canonical_form() {
        let mut env = Env::new();
        let x = env.sym("x").expect("declare");
        let y = env.sym("y").expect("declare");

        let p = SymbolicPolynomial::from_monomial(SymbolicMonomial::from_qmonomial(
            QMonomial::from_symbol(&x, 1),
        ));
        let q = SymbolicPolynomial::from_monomial(SymbolicMonomial::from_qmonomial(
            QMonomial::from_symbol(&y, 2),
        ));
        let r = SymbolicPolynomial::from_monomial(SymbolicMonomial::from_qmonomial(
            QMonomial::from_symbol(&x, 1).mul_scalar(3).expect("mul"),
        ));

        let lhs = p.add(&q, true).expect("add").mul(&r).expect("mul");
        let rhs = p
            .mul(&r)
            .expect("mul")
            .add(&q.mul(&r).expect("mul"), true)
            .expect("add");
        assert_eq!(
            lhs.canonical_string().expect("canonical"),
            rhs.canonical_string().expect("canonical")
        );
    }
}
