//! Rational monomials: a sparse variable/power map with an exact rational
//! coefficient.
//!
//! Invariants:
//! - the variable list is sorted by name and never stores a zero power,
//! - the coefficient is in lowest terms with a positive denominator,
//! - both operands of any binary operation share one environment.
//!
//! Coefficient arithmetic is exact `i64`; on overflow it is recomputed in
//! `f64` and rationalized back (see [`crate::rational::fractionize`]), which
//! either lands within tolerance or fails the whole operation.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::env::{EnvId, Symbol};
use crate::error::RingError;
use crate::rational;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QMonomial {
    env: EnvId,
    /// Sorted `(variable, power)` pairs, powers strictly positive.
    vars: Vec<(String, u32)>,
    num: i64,
    den: i64,
}

impl QMonomial {
    /// A constant monomial (empty variable list).
    pub fn constant(env: EnvId, value: i64) -> Self {
        Self {
            env,
            vars: Vec::new(),
            num: value,
            den: 1,
        }
    }

    /// A constant monomial with an explicit fraction coefficient.
    pub fn from_fraction(env: EnvId, num: i64, den: i64) -> Result<Self, RingError> {
        let (num, den) = rational::normalize(num, den)?;
        Ok(Self {
            env,
            vars: Vec::new(),
            num,
            den,
        })
    }

    /// `var^power` by name, for variables already interned upstream.
    pub(crate) fn from_var(env: EnvId, var: &str, power: u32) -> Self {
        let vars = if power == 0 {
            Vec::new()
        } else {
            vec![(var.to_string(), power)]
        };
        Self {
            env,
            vars,
            num: 1,
            den: 1,
        }
    }

    /// `symbol^power` with coefficient 1. A zero power yields a constant.
    pub fn from_symbol(symbol: &Symbol, power: u32) -> Self {
        let vars = if power == 0 {
            Vec::new()
        } else {
            vec![(symbol.name().to_string(), power)]
        };
        Self {
            env: symbol.env(),
            vars,
            num: 1,
            den: 1,
        }
    }

    pub fn env(&self) -> EnvId {
        self.env
    }

    pub fn numerator(&self) -> i64 {
        self.num
    }

    pub fn denominator(&self) -> i64 {
        self.den
    }

    pub fn variables_and_powers(&self) -> &[(String, u32)] {
        &self.vars
    }

    pub fn is_zero(&self) -> bool {
        self.num == 0
    }

    pub fn is_constant(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn is_unitary(&self) -> bool {
        self.num == self.den
    }

    pub fn is_linear(&self) -> bool {
        self.vars.len() == 1 && self.vars[0].1 == 1
    }

    /// The single variable name of a linear monomial.
    pub fn linear_name(&self) -> Result<&str, RingError> {
        if self.is_linear() {
            Ok(&self.vars[0].0)
        } else {
            Err(RingError::NotLinear(self.to_string()))
        }
    }

    fn check_env(&self, other: &Self) -> Result<(), RingError> {
        if self.env != other.env {
            return Err(RingError::EnvMismatch);
        }
        Ok(())
    }

    /// Same variable/power signature. A zero monomial is similar to anything.
    pub fn is_similar(&self, other: &Self) -> Result<bool, RingError> {
        self.check_env(other)?;
        if self.is_zero() || other.is_zero() {
            return Ok(true);
        }
        Ok(self.vars == other.vars)
    }

    pub fn mul(&self, other: &Self) -> Result<Self, RingError> {
        self.check_env(other)?;
        let (num, den) = coeff_mul((self.num, self.den), (other.num, other.den))?;
        if num == 0 {
            return Ok(Self::constant(self.env, 0));
        }

        let mut powers: BTreeMap<&str, u32> = BTreeMap::new();
        for (var, power) in self.vars.iter().chain(other.vars.iter()) {
            *powers.entry(var.as_str()).or_insert(0) += power;
        }
        let vars = powers
            .into_iter()
            .filter(|(_, power)| *power > 0)
            .map(|(var, power)| (var.to_string(), power))
            .collect();

        Ok(Self {
            env: self.env,
            vars,
            num,
            den,
        })
    }

    pub fn mul_scalar(&self, scalar: i64) -> Result<Self, RingError> {
        let (num, den) = coeff_mul((self.num, self.den), (scalar, 1))?;
        let mut result = self.clone();
        result.num = num;
        result.den = den;
        if num == 0 {
            result.vars.clear();
        }
        Ok(result)
    }

    pub fn div_scalar(&self, scalar: i64) -> Result<Self, RingError> {
        if scalar == 0 {
            return Err(RingError::DivisionByZero);
        }
        let (num, den) = coeff_mul((self.num, self.den), (1, scalar))?;
        let mut result = self.clone();
        result.num = num;
        result.den = den;
        if num == 0 {
            result.vars.clear();
        }
        Ok(result)
    }

    /// Coefficient addition of two similar monomials.
    pub fn add(&self, other: &Self) -> Result<Self, RingError> {
        self.check_env(other)?;
        if !self.is_similar(other)? {
            return Err(RingError::DissimilarAdd(
                self.to_string(),
                other.to_string(),
            ));
        }
        if self.is_zero() {
            return Ok(other.clone());
        }
        if other.is_zero() {
            return Ok(self.clone());
        }

        let coeff = match rational::add_fractions((self.num, self.den), (other.num, other.den)) {
            Some(pair) => pair,
            None => {
                warn!(
                    left = %self,
                    right = %other,
                    "exact addition overflowed i64, rationalizing the f64 sum"
                );
                let sum =
                    self.num as f64 / self.den as f64 + other.num as f64 / other.den as f64;
                rational::fractionize(sum)?
            }
        };

        let mut result = self.clone();
        result.num = coeff.0;
        result.den = coeff.1;
        if result.num == 0 {
            result.vars.clear();
        }
        Ok(result)
    }

    /// Ordering by the variable/power signature only; the coefficient is
    /// deliberately ignored so sorting groups similar monomials together.
    pub fn signature_cmp(&self, other: &Self) -> Ordering {
        self.vars.cmp(&other.vars)
    }
}

/// Exact coefficient multiply with the rationalization fallback.
fn coeff_mul(l: (i64, i64), r: (i64, i64)) -> Result<(i64, i64), RingError> {
    match rational::mul_fractions(l, r) {
        Some(pair) => rational::normalize(pair.0, pair.1),
        None => {
            warn!(
                left = format_args!("{}/{}", l.0, l.1),
                right = format_args!("{}/{}", r.0, r.1),
                "exact multiplication overflowed i64, rationalizing the f64 product"
            );
            let product = (l.0 as f64 / l.1 as f64) * (r.0 as f64 / r.1 as f64);
            rational::fractionize(product)
        }
    }
}

impl PartialEq for QMonomial {
    fn eq(&self, other: &Self) -> bool {
        self.env == other.env
            && self.vars == other.vars
            && cross_eq((self.num, self.den), (other.num, other.den))
    }
}

impl Eq for QMonomial {}

/// Value equality of two fractions by cross-multiplication, falling back to
/// `f64` comparison when the cross products overflow.
fn cross_eq(l: (i64, i64), r: (i64, i64)) -> bool {
    match (l.0.checked_mul(r.1), r.0.checked_mul(l.1)) {
        (Some(a), Some(b)) => a == b,
        _ => (l.0 as f64 / l.1 as f64) == (r.0 as f64 / r.1 as f64),
    }
}

impl std::fmt::Display for QMonomial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}/{})", self.num, self.den)?;
        for (var, power) in &self.vars {
            write!(f, "*{var}**({power})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Env;

    fn env_with(names: &[&str]) -> (Env, Vec<Symbol>) {
        let mut env = Env::new();
        let symbols = names
            .iter()
            .map(|name| env.sym(name).expect("declare"))
            .collect();
        (env, symbols)
    }

    #[test]
    fn mul_merges_powers_and_reduces_coefficients() {
        let (_env, symbols) = env_with(&["x", "y"]);
        let x = QMonomial::from_symbol(&symbols[0], 2);
        let xy = QMonomial::from_symbol(&symbols[0], 1)
            .mul(&QMonomial::from_symbol(&symbols[1], 3))
            .expect("mul");
        let product = x.mul(&xy).expect("mul");
        assert_eq!(
            product.variables_and_powers(),
            &[("x".to_string(), 3), ("y".to_string(), 3)]
        );
        assert_eq!(product.numerator(), 1);
    }

    #[test]
    fn mul_by_zero_collapses_variables() {
        let (env, symbols) = env_with(&["x"]);
        let x = QMonomial::from_symbol(&symbols[0], 1);
        let zero = QMonomial::constant(env.id(), 0);
        let product = x.mul(&zero).expect("mul");
        assert!(product.is_zero());
        assert!(product.is_constant());
    }

    #[test]
    fn add_requires_similarity() {
        let (_env, symbols) = env_with(&["x", "y"]);
        let x = QMonomial::from_symbol(&symbols[0], 1);
        let y = QMonomial::from_symbol(&symbols[1], 1);
        let err = x.add(&y).expect_err("dissimilar add should error");
        assert!(err.to_string().contains("dissimilar"));
    }

    #[test]
    fn add_of_zero_is_identity() {
        let (env, symbols) = env_with(&["x"]);
        let x = QMonomial::from_symbol(&symbols[0], 1);
        let zero = QMonomial::constant(env.id(), 0);
        assert_eq!(zero.add(&x).expect("add"), x);
        assert_eq!(x.add(&zero).expect("add"), x);
    }

    #[test]
    fn overflowing_mul_falls_back_to_rationalization() {
        let (env, _symbols) = env_with(&[]);
        let scale = 1i64 << 40;
        // (scale+1)/scale * scale/(scale+1): raw cross products overflow i64
        // but the value is exactly 1.
        let a = QMonomial::from_fraction(env.id(), scale + 1, scale).expect("fraction");
        let b = QMonomial::from_fraction(env.id(), scale, scale + 1).expect("fraction");
        let product = a.mul(&b).expect("fallback mul");
        assert_eq!(product.numerator(), 1);
        assert_eq!(product.denominator(), 1);
    }

    #[test]
    fn unrationalizable_overflow_is_an_error() {
        let (env, _symbols) = env_with(&[]);
        let big = QMonomial::from_fraction(env.id(), i64::MAX / 2, 1).expect("fraction");
        let err = big.mul_scalar(4).expect_err("overflow past i64 range");
        assert!(err.to_string().contains("rationalization"));
    }

    #[test]
    fn env_mismatch_is_rejected() {
        let (_e1, s1) = env_with(&["x"]);
        let (_e2, s2) = env_with(&["x"]);
        let a = QMonomial::from_symbol(&s1[0], 1);
        let b = QMonomial::from_symbol(&s2[0], 1);
        let err = a.mul(&b).expect_err("cross-env mul should error");
        assert!(err.to_string().contains("environments"));
    }

    #[test]
    fn equality_cross_multiplies_coefficients() {
        let (env, _symbols) = env_with(&[]);
        let a = QMonomial::from_fraction(env.id(), 2, 4).expect("fraction");
        let b = QMonomial::from_fraction(env.id(), 1, 2).expect("fraction");
        assert_eq!(a, b);
    }
}
