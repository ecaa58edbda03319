//! Typed expression AST.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnOp {
    Plus,
    Minus,
}

impl UnOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnOp::Plus => "+",
            UnOp::Minus => "-",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelOp {
    Lt,
    Gt,
    Leq,
    Geq,
    Eq,
}

impl RelOp {
    pub fn symbol(self) -> &'static str {
        match self {
            RelOp::Lt => "<",
            RelOp::Gt => ">",
            RelOp::Leq => "<=",
            RelOp::Geq => ">=",
            RelOp::Eq => "==",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Constant(i64),
    Variable(String),
    Function {
        name: String,
        args: Vec<Expr>,
    },
    BinaryOp {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    UnaryOp {
        op: UnOp,
        expr: Box<Expr>,
    },
    Relation {
        op: RelOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    pub fn binary(op: BinOp, left: Expr, right: Expr) -> Self {
        Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn relation(op: RelOp, left: Expr, right: Expr) -> Self {
        Expr::Relation {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn is_relation(&self) -> bool {
        matches!(self, Expr::Relation { .. })
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Constant(value) => write!(f, "{value}"),
            Expr::Variable(name) => write!(f, "{name}"),
            Expr::Function { name, args } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Expr::BinaryOp { op, left, right } => {
                write!(f, "({left} {} {right})", op.symbol())
            }
            Expr::UnaryOp { op, expr } => write!(f, "({}{expr})", op.symbol()),
            Expr::Relation { op, left, right } => {
                write!(f, "({left} {} {right})", op.symbol())
            }
        }
    }
}

/// Rewrites a relation so everything sits on the greater side of a `>=`.
///
/// `l < r` and `l <= r` become `(r - l) >= 0`; `l > r` and `l >= r` become
/// `(l - r) >= 0`. Strict relations are relaxed to non-strict ones, which is
/// sound for positivity certificates. Equalities must have been split into a
/// `<=`/`>=` pair before this point.
pub fn move_to_greater_side(expr: &Expr) -> Result<Expr, ParseError> {
    match expr {
        Expr::Relation { op, left, right } => match op {
            RelOp::Lt | RelOp::Leq => Ok(Expr::relation(
                RelOp::Geq,
                Expr::binary(BinOp::Sub, (**right).clone(), (**left).clone()),
                Expr::Constant(0),
            )),
            RelOp::Gt | RelOp::Geq => Ok(Expr::relation(
                RelOp::Geq,
                Expr::binary(BinOp::Sub, (**left).clone(), (**right).clone()),
                Expr::Constant(0),
            )),
            RelOp::Eq => Err(ParseError::EqualityNotCanonicalizable(expr.to_string())),
        },
        other => Err(ParseError::NotARelation(other.to_string())),
    }
}
