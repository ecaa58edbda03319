use thiserror::Error;

use poscert_ring::RingError;

/// Tokenizer and parser errors. Every variant that corresponds to a source
/// location carries the 1-based line number.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unexpected token `{value}` at line {line}")]
    UnexpectedToken { value: String, line: usize },

    #[error("unrecognized token `{value}` at line {line}")]
    UnrecognizedToken { value: String, line: usize },

    #[error("invalid number `{value}` at line {line}")]
    InvalidNumber { value: String, line: usize },

    #[error("empty subexpression at line {line}")]
    EmptySubexpression { line: usize },

    #[error("unmatched bracket at line {line}")]
    UnmatchedBracket { line: usize },

    #[error("invalid expression `{text}` at line {line}")]
    InvalidExpression { text: String, line: usize },

    #[error("power must be a positive integer literal, got `{value}` at line {line}")]
    InvalidPower { value: String, line: usize },

    #[error("variable `{0}` already declared")]
    DuplicateVariable(String),

    #[error("function `{0}` already declared")]
    DuplicateFunction(String),

    #[error("cannot canonicalize `{0}`: split `==` into `<=` and `>=` first")]
    EqualityNotCanonicalizable(String),

    #[error("`{0}` is not a relation")]
    NotARelation(String),

    #[error("empty input")]
    EmptyInput,
}

/// Evaluation errors: unknown bindings, kind mismatches, and the explicit
/// division restriction (the system models polynomials, never rational
/// functions).
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("variable `{0}` is not bound in the evaluation context")]
    UndeclaredVariable(String),

    #[error("function `{0}` is not bound in the evaluation context")]
    UndeclaredFunction(String),

    #[error("division by non-monomial")]
    DivisionByNonMonomial,

    #[error("division by non-constant")]
    DivisionByNonConstant,

    #[error("function argument `{0}` must evaluate to a rational polynomial")]
    SymbolicFunctionArgument(String),

    #[error("function `{name}` called with {got} arguments, declared with {declared}")]
    ArityMismatch {
        name: String,
        got: usize,
        declared: usize,
    },

    #[error(transparent)]
    Ring(#[from] RingError),
}
