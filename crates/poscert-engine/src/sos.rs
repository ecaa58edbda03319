//! SOS ansatz construction.
//!
//! For a monomial vector `m` of length `n`, the ansatz is `mᵗ·L·m` where
//! `L` is an `n×n` symmetric matrix of fresh Gram-entry unknowns. Symmetry
//! comes for free: both triangles intern the same canonical symbol name.

use poscert_ring::{
    Env, QMonomial, QPolynomial, RingError, SymbolicMonomial, SymbolicPolynomial,
};
use poscert_sdp::GramEntry;

/// Hands out Gram matrix ids in allocation order. One allocator is threaded
/// through a whole build so ids never collide across condition pairs.
#[derive(Debug, Default)]
pub struct GramIdAllocator {
    next: usize,
}

impl GramIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The id the next call to [`Self::next_id`] will return.
    pub fn peek(&self) -> usize {
        self.next
    }

    pub fn next_id(&mut self) -> usize {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// Builds the quadratic form `mᵗ·L·m` over fresh Gram unknowns for matrix
/// `gram_id`, reduced.
pub fn get_sos(
    env: &mut Env,
    monomials: &[QMonomial],
    gram_id: usize,
) -> Result<SymbolicPolynomial, RingError> {
    let n = monomials.len();

    let mut entries = Vec::with_capacity(n * n);
    for row in 0..n {
        for col in 0..n {
            let symbol = env.get_or_create(&GramEntry::new(gram_id, row, col).name());
            entries.push(QPolynomial::from_monomial(QMonomial::from_symbol(
                &symbol, 1,
            )));
        }
    }

    let mut result = env.symbolic_polynomial_zero();
    for col in 0..n {
        let mut column_sum = env.symbolic_polynomial_zero();
        for row in 0..n {
            let term = SymbolicMonomial::new(
                monomials[row].clone(),
                entries[row * n + col].clone(),
            );
            column_sum = column_sum.add(&SymbolicPolynomial::from_monomial(term), false)?;
        }
        column_sum.reduce()?;

        let col_monomial = SymbolicPolynomial::from_monomial(SymbolicMonomial::from_qmonomial(
            monomials[col].clone(),
        ));
        result = result.add(&column_sum.mul(&col_monomial)?, false)?;
    }
    result.reduce()?;
    Ok(result)
}
