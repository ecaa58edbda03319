//! Exact rational polynomial algebra and the two-level symbolic ring.
//!
//! The certificate pipeline works over two rings:
//! - [`QPolynomial`]: polynomials over program variables with exact rational
//!   coefficients (64-bit numerator/denominator, lowest terms), and
//! - [`SymbolicPolynomial`]: polynomials whose monomial bases live in program
//!   variables while each coefficient is itself a [`QPolynomial`] in solver
//!   unknowns (Gram-matrix entries and free scalars).
//!
//! All arithmetic is exact unless the exact path would overflow `i64`, in
//! which case it falls back to a continued-fraction rationalization of the
//! `f64` result and verifies the approximation before accepting it.
//!
//! Ring elements are scoped to one [`Env`]; combining elements from two
//! environments is an error, checked on every binary operation.

pub mod combinatorics;
pub mod env;
pub mod error;
pub mod monomial;
pub mod polynomial;
pub mod rational;
pub mod symbolic;

pub use env::{Env, EnvId, Symbol};
pub use error::RingError;
pub use monomial::QMonomial;
pub use polynomial::QPolynomial;
pub use symbolic::{
    symbolic_from_qpolynomial_as_base, SymbolicMonomial, SymbolicPolynomial,
};
