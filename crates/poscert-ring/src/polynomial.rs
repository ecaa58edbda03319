//! Rational polynomials: ordered sums of [`QMonomial`].
//!
//! A polynomial is *reduced* when its monomials are sorted by signature and
//! no two share one. Reduction never produces an empty list: an identically
//! zero polynomial is a single explicit zero monomial, and callers rely on
//! that "at least one term" invariant.

use serde::{Deserialize, Serialize};

use crate::env::EnvId;
use crate::error::RingError;
use crate::monomial::QMonomial;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QPolynomial {
    env: EnvId,
    monomials: Vec<QMonomial>,
}

impl QPolynomial {
    pub fn from_monomial(monomial: QMonomial) -> Self {
        Self {
            env: monomial.env(),
            monomials: vec![monomial],
        }
    }

    pub fn env(&self) -> EnvId {
        self.env
    }

    pub fn monomials(&self) -> &[QMonomial] {
        &self.monomials
    }

    pub fn is_zero(&self) -> bool {
        self.monomials.iter().all(QMonomial::is_zero)
    }

    /// True when the polynomial reduces to one constant monomial.
    pub fn as_constant(&self) -> Option<&QMonomial> {
        if self.monomials.len() == 1 && self.monomials[0].is_constant() {
            Some(&self.monomials[0])
        } else {
            None
        }
    }

    fn check_env(&self, other: &Self) -> Result<(), RingError> {
        if self.env != other.env {
            return Err(RingError::EnvMismatch);
        }
        Ok(())
    }

    /// Sorts by monomial signature and merges like terms. An identically
    /// zero leading term collapses to the explicit zero monomial.
    pub fn reduce(&mut self) -> Result<(), RingError> {
        let mut sorted = std::mem::take(&mut self.monomials);
        sorted.sort_by(QMonomial::signature_cmp);

        let Some(first) = sorted.first() else {
            self.monomials.push(QMonomial::constant(self.env, 0));
            return Ok(());
        };

        let mut current = if first.is_zero() {
            QMonomial::constant(self.env, 0)
        } else {
            first.clone()
        };

        for monomial in &sorted[1..] {
            if current.variables_and_powers() == monomial.variables_and_powers()
                || current.is_zero()
                || monomial.is_zero()
            {
                current = current.add(monomial)?;
            } else {
                self.monomials.push(current);
                current = monomial.clone();
            }
        }
        self.monomials.push(current);
        Ok(())
    }

    pub fn add(&self, other: &Self) -> Result<Self, RingError> {
        self.check_env(other)?;
        let mut result = self.clone();
        result.monomials.extend(other.monomials.iter().cloned());
        result.reduce()?;
        Ok(result)
    }

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
        if scalar == 0 {
            return Ok(Self::from_monomial(QMonomial::constant(self.env, 0)));
        }
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

    /// Reduced copy of the monomial list.
    pub fn reduced_monomials(&self) -> Result<Vec<QMonomial>, RingError> {
        let mut copy = self.clone();
        copy.reduce()?;
        Ok(copy.monomials)
    }
}

impl std::fmt::Display for QPolynomial {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Env;

    #[test]
    fn reduce_merges_like_terms() {
        let mut env = Env::new();
        let x = env.sym("x").expect("declare");
        let a = QMonomial::from_symbol(&x, 2).mul_scalar(3).expect("mul");
        let b = QMonomial::from_symbol(&x, 2).mul_scalar(4).expect("mul");
        let sum = QPolynomial::from_monomial(a)
            .add(&QPolynomial::from_monomial(b))
            .expect("add");
        assert_eq!(sum.monomials().len(), 1);
        assert_eq!(sum.monomials()[0].numerator(), 7);
    }

    #[test]
    fn zero_result_keeps_one_explicit_zero_monomial() {
        let mut env = Env::new();
        let x = env.sym("x").expect("declare");
        let a = QPolynomial::from_monomial(QMonomial::from_symbol(&x, 1));
        let b = a.mul_scalar(-1).expect("negate");
        let sum = a.add(&b).expect("add");
        assert_eq!(sum.monomials().len(), 1);
        assert!(sum.is_zero());
        assert!(sum.monomials()[0].is_constant());
    }

    #[test]
    fn mul_distributes() {
        let mut env = Env::new();
        let x = env.sym("x").expect("declare");
        // (x + 1) * (x - 1) == x^2 - 1
        let x_poly = QPolynomial::from_monomial(QMonomial::from_symbol(&x, 1));
        let one = env.q_polynomial_one();
        let lhs = x_poly.add(&one).expect("add");
        let rhs = x_poly.add(&one.mul_scalar(-1).expect("negate")).expect("add");
        let product = lhs.mul(&rhs).expect("mul");

        let x2 = QPolynomial::from_monomial(QMonomial::from_symbol(&x, 2));
        let expected = x2.add(&one.mul_scalar(-1).expect("negate")).expect("add");
        assert_eq!(
            product.reduced_monomials().expect("reduce"),
            expected.reduced_monomials().expect("reduce")
        );
    }

    #[test]
    fn as_constant_detects_constants_only() {
        let mut env = Env::new();
        let x = env.sym("x").expect("declare");
        assert!(env.q_polynomial_one().as_constant().is_some());
        let x_poly = QPolynomial::from_monomial(QMonomial::from_symbol(&x, 1));
        assert!(x_poly.as_constant().is_none());
    }
}
