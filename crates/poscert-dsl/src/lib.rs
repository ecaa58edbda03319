//! Surface language for if-then systems over recurrence-defined functions.
//!
//! A program consists of `real` variable declarations, `function` arity and
//! degree declarations, and `if { ... } => { ... }` implications between
//! polynomial (in)equalities:
//!
//! ```text
//! real n;
//! function T[1, 1];
//! if { n >= 1 } => { T(n) == 2*T(n/2) + 2 }
//! if { n == 0 } => { T(n) == 1 }
//! ```
//!
//! This crate provides the tokenizer, the expression and program parsers,
//! the typed expression AST, and the evaluator that turns AST nodes into
//! ring elements under a variable/function binding context.

pub mod ast;
pub mod error;
pub mod eval;
pub mod expr_parser;
pub mod parser;
pub mod program;
pub mod token;
pub mod tokenizer;

pub use ast::{move_to_greater_side, BinOp, Expr, RelOp, UnOp};
pub use error::{EvalError, ParseError};
pub use eval::{evaluate, EvalContext, FunctionTemplate, Value};
pub use parser::{parse_program, ParseConfig};
pub use program::{FunctionDecl, IfThenCondition, Program};
