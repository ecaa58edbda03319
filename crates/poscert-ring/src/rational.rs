//! Exact `i64` fraction helpers with the float-rationalization fallback.
//!
//! The ring keeps coefficients as `num/den` in lowest terms with `den > 0`.
//! Operations that would overflow `i64` are recomputed in `f64` and turned
//! back into a fraction by continued-fraction expansion ([`fractionize`]);
//! the result is only accepted when it round-trips within [`FALLBACK_TOL`].

use crate::error::RingError;

/// Absolute tolerance for accepting a rationalized float result.
pub const FALLBACK_TOL: f64 = 1e-5;

/// Continued-fraction expansion depth cap. Plain doubles converge in far
/// fewer steps; hitting the cap means the value is not representable.
const MAX_CF_TERMS: usize = 64;

/// Greatest common divisor, always non-negative.
pub fn gcd(a: i64, b: i64) -> i64 {
    let (mut a, mut b) = (a, b);
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a.abs()
}

/// Least common multiple; `None` when the product overflows.
pub fn lcm(a: i64, b: i64) -> Option<i64> {
    let g = gcd(a, b);
    if g == 0 {
        return None;
    }
    (a / g).checked_mul(b)
}

pub fn is_mul_safe(a: i64, b: i64) -> bool {
    a.checked_mul(b).is_some()
}

/// Brings `num/den` to lowest terms with a positive denominator.
pub fn normalize(num: i64, den: i64) -> Result<(i64, i64), RingError> {
    if den == 0 {
        return Err(RingError::ZeroDenominator);
    }
    if num == 0 {
        return Ok((0, 1));
    }
    let g = gcd(num, den);
    let (mut num, mut den) = (num / g, den / g);
    if den < 0 {
        num = -num;
        den = -den;
    }
    Ok((num, den))
}

/// Exact fraction addition; `None` on overflow so the caller can fall back.
pub fn add_fractions(l: (i64, i64), r: (i64, i64)) -> Option<(i64, i64)> {
    let (ln, ld) = l;
    let (rn, rd) = r;
    if ln == 0 {
        return Some((rn, rd));
    }
    if rn == 0 {
        return Some((ln, ld));
    }
    let common = lcm(ld, rd)?;
    let num = ln
        .checked_mul(common / ld)?
        .checked_add(rn.checked_mul(common / rd)?)?;
    let g = gcd(num, common);
    if g == 0 {
        return Some((0, 1));
    }
    Some((num / g, common / g))
}

/// Exact fraction multiplication; `None` on overflow.
pub fn mul_fractions(l: (i64, i64), r: (i64, i64)) -> Option<(i64, i64)> {
    let num = l.0.checked_mul(r.0)?;
    let den = l.1.checked_mul(r.1)?;
    let g = gcd(num, den);
    if g == 0 {
        return Some((0, 1));
    }
    Some((num / g, den / g))
}

/// Best-rational-approximation of `value` by continued-fraction expansion.
///
/// Returns the fraction in lowest terms with a positive denominator, or
/// [`RingError::RationalizationFailed`] when the round-trip error exceeds
/// [`FALLBACK_TOL`].
pub fn fractionize(value: f64) -> Result<(i64, i64), RingError> {
    if !value.is_finite() {
        return Err(RingError::RationalizationFailed {
            value,
            num: 0,
            den: 0,
        });
    }

    let mut terms: Vec<f64> = Vec::new();
    let mut v = value;
    let (mut num, mut den) = (0.0f64, 1.0f64);
    loop {
        let int_part = v.trunc();
        v -= int_part;
        terms.push(int_part);

        let (n, d) = eval_continued_fraction(&terms);
        num = n;
        den = d;
        if n / d == value || terms.len() >= MAX_CF_TERMS || v == 0.0 {
            break;
        }
        v = 1.0 / v;
    }

    let (num, den) = normalize(num as i64, den as i64)?;
    let roundtrip = num as f64 / den as f64;
    if (roundtrip - value).abs() > FALLBACK_TOL {
        return Err(RingError::RationalizationFailed { value, num, den });
    }
    Ok((num, den))
}

/// Evaluates `[a0; a1, a2, ...]` back to a single fraction, back to front.
fn eval_continued_fraction(terms: &[f64]) -> (f64, f64) {
    let mut num = 1.0f64;
    let mut den = 0.0f64;
    for term in terms.iter().rev() {
        std::mem::swap(&mut num, &mut den);
        num += term * den;
    }
    (num, den)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn gcd_handles_signs_and_zero() {
        assert_eq!(gcd(12, 8), 4);
        assert_eq!(gcd(-12, 8), 4);
        assert_eq!(gcd(0, 5), 5);
        assert_eq!(gcd(0, 0), 0);
    }

    #[test]
    fn normalize_reduces_and_fixes_sign() {
        assert_eq!(normalize(6, -4).expect("normalize"), (-3, 2));
        assert_eq!(normalize(0, -7).expect("normalize"), (0, 1));
        assert!(matches!(normalize(1, 0), Err(RingError::ZeroDenominator)));
    }

    #[test]
    fn add_fractions_exact() {
        assert_eq!(add_fractions((1, 2), (1, 3)), Some((5, 6)));
        assert_eq!(add_fractions((1, 2), (-1, 2)), Some((0, 1)));
    }

    #[test]
    fn fractionize_recovers_simple_fractions() {
        assert_eq!(fractionize(0.5).expect("fractionize"), (1, 2));
        assert_eq!(fractionize(-2.25).expect("fractionize"), (-9, 4));
        assert_eq!(fractionize(3.0).expect("fractionize"), (3, 1));
    }

    #[test]
    fn fractionize_is_close_for_irrationals() {
        let (num, den) = fractionize(std::f64::consts::PI).expect("fractionize");
        assert_abs_diff_eq!(
            num as f64 / den as f64,
            std::f64::consts::PI,
            epsilon = FALLBACK_TOL
        );
    }
}
