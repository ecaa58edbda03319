use poscert_ring::{Env, QMonomial, QPolynomial, Symbol};
use proptest::prelude::*;

/// Small coefficients keep the exact path exercised; the fallback path has
/// its own dedicated tests.
fn coeff() -> impl Strategy<Value = (i64, i64)> {
    (-1000i64..=1000, 1i64..=50)
}

fn powers() -> impl Strategy<Value = Vec<u32>> {
    proptest::collection::vec(0u32..=3, 3)
}

fn build_monomial(
    env_symbols: &(Env, Vec<Symbol>),
    powers: &[u32],
    coeff: (i64, i64),
) -> QMonomial {
    let (env, symbols) = env_symbols;
    let mut monomial = QMonomial::from_fraction(env.id(), coeff.0, coeff.1).expect("fraction");
    for (symbol, power) in symbols.iter().zip(powers) {
        monomial = monomial
            .mul(&QMonomial::from_symbol(symbol, *power))
            .expect("mul");
    }
    monomial
}

fn fresh_env() -> (Env, Vec<Symbol>) {
    let mut env = Env::new();
    let symbols = ["x", "y", "z"]
        .iter()
        .map(|name| env.sym(name).expect("declare"))
        .collect();
    (env, symbols)
}

fn poly(monomial: QMonomial) -> QPolynomial {
    QPolynomial::from_monomial(monomial)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn polynomial_add_commutes((pa, pb) in (powers(), powers()), (ca, cb) in (coeff(), coeff())) {
        let ctx = fresh_env();
        let a = poly(build_monomial(&ctx, &pa, ca));
        let b = poly(build_monomial(&ctx, &pb, cb));
        prop_assert_eq!(
            a.add(&b).expect("add").reduced_monomials().expect("reduce"),
            b.add(&a).expect("add").reduced_monomials().expect("reduce")
        );
    }

    #[test]
    fn polynomial_mul_commutes((pa, pb) in (powers(), powers()), (ca, cb) in (coeff(), coeff())) {
        let ctx = fresh_env();
        let a = poly(build_monomial(&ctx, &pa, ca));
        let b = poly(build_monomial(&ctx, &pb, cb));
        prop_assert_eq!(
            a.mul(&b).expect("mul").reduced_monomials().expect("reduce"),
            b.mul(&a).expect("mul").reduced_monomials().expect("reduce")
        );
    }

    #[test]
    fn polynomial_add_associates(
        (pa, pb, pc) in (powers(), powers(), powers()),
        (ca, cb, cc) in (coeff(), coeff(), coeff()),
    ) {
        let ctx = fresh_env();
        let a = poly(build_monomial(&ctx, &pa, ca));
        let b = poly(build_monomial(&ctx, &pb, cb));
        let c = poly(build_monomial(&ctx, &pc, cc));
        let left = a.add(&b).expect("add").add(&c).expect("add");
        let right = a.add(&b.add(&c).expect("add")).expect("add");
        prop_assert_eq!(
            left.reduced_monomials().expect("reduce"),
            right.reduced_monomials().expect("reduce")
        );
    }

    #[test]
    fn polynomial_mul_associates(
        (pa, pb, pc) in (powers(), powers(), powers()),
        (ca, cb, cc) in (coeff(), coeff(), coeff()),
    ) {
        let ctx = fresh_env();
        let a = poly(build_monomial(&ctx, &pa, ca));
        let b = poly(build_monomial(&ctx, &pb, cb));
        let c = poly(build_monomial(&ctx, &pc, cc));
        let left = a.mul(&b).expect("mul").mul(&c).expect("mul");
        let right = a.mul(&b.mul(&c).expect("mul")).expect("mul");
        prop_assert_eq!(
            left.reduced_monomials().expect("reduce"),
            right.reduced_monomials().expect("reduce")
        );
    }

    #[test]
    fn one_is_multiplicative_identity(p in powers(), c in coeff()) {
        let ctx = fresh_env();
        let a = poly(build_monomial(&ctx, &p, c));
        let one = ctx.0.q_polynomial_one();
        prop_assert_eq!(
            a.mul(&one).expect("mul").reduced_monomials().expect("reduce"),
            a.reduced_monomials().expect("reduce")
        );
    }

    #[test]
    fn adding_the_negation_yields_the_zero_polynomial(p in powers(), c in coeff()) {
        let ctx = fresh_env();
        let a = poly(build_monomial(&ctx, &p, c));
        let negated = a.mul_scalar(-1).expect("negate");
        let sum = a.add(&negated).expect("add");
        prop_assert!(sum.is_zero());
        let reduced = sum.reduced_monomials().expect("reduce");
        prop_assert_eq!(reduced.len(), 1);
        prop_assert!(reduced[0].is_constant());
    }
}
