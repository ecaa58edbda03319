//! Parsed program model: declarations plus if-then conditions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ast::Expr;
use crate::error::ParseError;

/// A declared uninterpreted function: `function T[arity, degree];`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    pub arity: u32,
    /// Degree bound for the polynomial template; `None` defers to the
    /// solver-wide degree setting.
    pub highest_degree: Option<u32>,
}

/// One implication: every hypothesis holding entails every conclusion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfThenCondition {
    pub hypotheses: Vec<Expr>,
    pub conclusions: Vec<Expr>,
}

/// A whole parsed program. Variable and function declarations are kept in
/// sorted maps so iteration order is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    variables: BTreeMap<String, ()>,
    functions: BTreeMap<String, FunctionDecl>,
    pub conditions: Vec<IfThenCondition>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare_real(&mut self, name: &str) -> Result<(), ParseError> {
        if self.variables.contains_key(name) || self.functions.contains_key(name) {
            return Err(ParseError::DuplicateVariable(name.to_string()));
        }
        self.variables.insert(name.to_string(), ());
        Ok(())
    }

    pub fn declare_function(&mut self, decl: FunctionDecl) -> Result<(), ParseError> {
        if self.functions.contains_key(&decl.name) || self.variables.contains_key(&decl.name) {
            return Err(ParseError::DuplicateFunction(decl.name));
        }
        self.functions.insert(decl.name.clone(), decl);
        Ok(())
    }

    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionDecl> {
        self.functions.values()
    }

    pub fn function(&self, name: &str) -> Option<&FunctionDecl> {
        self.functions.get(name)
    }

    pub fn is_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_variable_is_rejected() {
        let mut p = Program::new();
        p.declare_real("n").expect("first");
        let err = p.declare_real("n").expect_err("second");
        assert!(err.to_string().contains("already declared"));
    }

    #[test]
    fn function_and_variable_share_a_namespace() {
        let mut p = Program::new();
        p.declare_real("T").expect("real");
        let err = p
            .declare_function(FunctionDecl {
                name: "T".into(),
                arity: 1,
                highest_degree: Some(1),
            })
            .expect_err("name clash");
        assert!(err.to_string().contains("already declared"));
    }
}
