//! Symbol environments.
//!
//! An [`Env`] is the per-run registry of interned symbol names. Every ring
//! element carries the [`EnvId`] of the environment it was created in, and
//! binary operations refuse to combine elements from different environments.
//! One certificate-construction run owns exactly one environment.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::RingError;
use crate::monomial::QMonomial;
use crate::polynomial::QPolynomial;
use crate::symbolic::{SymbolicMonomial, SymbolicPolynomial};

static NEXT_ENV_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of an [`Env`]. Cheap to copy and compare; used
/// for the environment check on every binary ring operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EnvId(u64);

/// An interned symbol name bound to one environment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Symbol {
    name: String,
    env: EnvId,
}

impl Symbol {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn env(&self) -> EnvId {
        self.env
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Registry of symbol names for one run.
#[derive(Debug)]
pub struct Env {
    id: EnvId,
    names: BTreeSet<String>,
}

impl Env {
    pub fn new() -> Self {
        Self {
            id: EnvId(NEXT_ENV_ID.fetch_add(1, Ordering::Relaxed)),
            names: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> EnvId {
        self.id
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Interns a fresh name; duplicate declarations are an error.
    pub fn sym(&mut self, name: &str) -> Result<Symbol, RingError> {
        if self.names.contains(name) {
            return Err(RingError::DuplicateSymbol(name.to_string()));
        }
        self.names.insert(name.to_string());
        Ok(Symbol {
            name: name.to_string(),
            env: self.id,
        })
    }

    /// Interns a name, reusing it when already present. Gram-entry symbols
    /// rely on this so the two triangles of one matrix alias to one name.
    pub fn get_or_create(&mut self, name: &str) -> Symbol {
        self.names.insert(name.to_string());
        Symbol {
            name: name.to_string(),
            env: self.id,
        }
    }

    /// First unused `prefix<N>` name, counting from 0.
    pub fn free_symbol(&mut self, prefix: &str) -> Symbol {
        let mut counter = 0usize;
        loop {
            let candidate = format!("{prefix}{counter}");
            if !self.names.contains(&candidate) {
                return self.get_or_create(&candidate);
            }
            counter += 1;
        }
    }

    pub fn q_monomial_one(&self) -> QMonomial {
        QMonomial::constant(self.id, 1)
    }

    pub fn q_monomial_zero(&self) -> QMonomial {
        QMonomial::constant(self.id, 0)
    }

    pub fn q_polynomial_one(&self) -> QPolynomial {
        QPolynomial::from_monomial(self.q_monomial_one())
    }

    pub fn q_polynomial_zero(&self) -> QPolynomial {
        QPolynomial::from_monomial(self.q_monomial_zero())
    }

    pub fn symbolic_monomial_one(&self) -> SymbolicMonomial {
        SymbolicMonomial::from_qmonomial(self.q_monomial_one())
    }

    pub fn symbolic_monomial_zero(&self) -> SymbolicMonomial {
        SymbolicMonomial::from_qmonomial(self.q_monomial_zero())
    }

    pub fn symbolic_polynomial_one(&self) -> SymbolicPolynomial {
        SymbolicPolynomial::from_monomial(self.symbolic_monomial_one())
    }

    pub fn symbolic_polynomial_zero(&self) -> SymbolicPolynomial {
        SymbolicPolynomial::from_monomial(self.symbolic_monomial_zero())
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sym_rejects_duplicates() {
        let mut env = Env::new();
        env.sym("n").expect("first declaration");
        let err = env.sym("n").expect_err("duplicate should error");
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn get_or_create_aliases() {
        let mut env = Env::new();
        let a = env.get_or_create("l_0_0_1");
        let b = env.get_or_create("l_0_0_1");
        assert_eq!(a, b);
    }

    #[test]
    fn free_symbol_skips_taken_names() {
        let mut env = Env::new();
        env.sym("t0").expect("declare t0");
        let s = env.free_symbol("t");
        assert_eq!(s.name(), "t1");
    }

    #[test]
    fn distinct_envs_have_distinct_ids() {
        assert_ne!(Env::new().id(), Env::new().id());
    }
}
