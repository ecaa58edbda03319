//! Program parser.
//!
//! Grammar:
//!
//! ```text
//! program  := (real-decl | fun-decl | if-then)* EOF
//! real-decl := "real" ident ("," ident)* ";"
//! fun-decl  := "function" signature ("," signature)* ";"
//! signature := ident "[" number ("," number)? "]"
//! if-then   := "if" "{" exprs "}" "=>" "{" exprs "}"
//! exprs     := expr (";" expr)*
//! ```
//!
//! Expressions inside the braces are collected as raw token runs and handed
//! to the expression parser; braces never occur inside an expression.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ast::{Expr, RelOp};
use crate::error::ParseError;
use crate::expr_parser::parse_expression;
use crate::program::{FunctionDecl, IfThenCondition, Program};
use crate::token::{Token, TokenKind};
use crate::tokenizer::{expand_power_groups, tokenize};

/// Knobs for the parsing pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseConfig {
    /// Rewrite every `a == b` as the pair `a <= b`, `a >= b`. The rest of
    /// the pipeline only understands inequalities, so this stays on unless a
    /// caller wants to inspect equalities verbatim.
    pub rewrite_equal_as_two_inequalities: bool,
    /// Expand `base ^ k` into a `k`-fold product before parsing.
    pub expand_power_groups: bool,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            rewrite_equal_as_two_inequalities: true,
            expand_power_groups: true,
        }
    }
}

struct Cursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> &'a Token {
        // The tokenizer guarantees a trailing EOF token.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn bump(&mut self) -> &'a Token {
        let token = self.peek();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn unexpected(&self) -> ParseError {
        let token = self.peek();
        ParseError::UnexpectedToken {
            value: token.text.clone(),
            line: token.line,
        }
    }

    fn expect_text(&mut self, text: &str) -> Result<&'a Token, ParseError> {
        if self.peek().is(text) {
            Ok(self.bump())
        } else {
            Err(self.unexpected())
        }
    }

    fn expect_identifier(&mut self) -> Result<&'a Token, ParseError> {
        if self.peek().kind == TokenKind::Identifier {
            Ok(self.bump())
        } else {
            Err(self.unexpected())
        }
    }

    fn expect_number(&mut self) -> Result<u32, ParseError> {
        let token = self.peek();
        if token.kind != TokenKind::Number {
            return Err(self.unexpected());
        }
        let value = token.text.parse().map_err(|_| ParseError::InvalidNumber {
            value: token.text.clone(),
            line: token.line,
        })?;
        self.bump();
        Ok(value)
    }
}

fn parse_real_decl(cursor: &mut Cursor<'_>, program: &mut Program) -> Result<(), ParseError> {
    loop {
        let name = cursor.expect_identifier()?;
        program.declare_real(&name.text)?;
        if cursor.peek().is(",") {
            cursor.bump();
            continue;
        }
        cursor.expect_text(";")?;
        return Ok(());
    }
}

fn parse_fun_decl(cursor: &mut Cursor<'_>, program: &mut Program) -> Result<(), ParseError> {
    loop {
        let name = cursor.expect_identifier()?;
        cursor.expect_text("[")?;
        let arity = cursor.expect_number()?;
        let highest_degree = if cursor.peek().is(",") {
            cursor.bump();
            Some(cursor.expect_number()?)
        } else {
            None
        };
        cursor.expect_text("]")?;
        program.declare_function(FunctionDecl {
            name: name.text.clone(),
            arity,
            highest_degree,
        })?;
        if cursor.peek().is(",") {
            cursor.bump();
            continue;
        }
        cursor.expect_text(";")?;
        return Ok(());
    }
}

/// Collects the token run of one expression: everything up to the next `;`
/// or `}` at the top level. Braces never nest inside expressions.
fn collect_expression_run<'a>(cursor: &mut Cursor<'a>) -> Result<&'a [Token], ParseError> {
    let start = cursor.pos;
    while cursor.peek().is_expression_token() {
        cursor.bump();
    }
    if cursor.pos == start {
        return Err(cursor.unexpected());
    }
    Ok(&cursor.tokens[start..cursor.pos])
}

fn push_parsed(
    target: &mut Vec<Expr>,
    tokens: &[Token],
    config: &ParseConfig,
) -> Result<(), ParseError> {
    let expr = parse_expression(tokens)?;
    debug!(expression = %expr, "parsed");
    match expr {
        Expr::Relation { op: RelOp::Eq, left, right }
            if config.rewrite_equal_as_two_inequalities =>
        {
            target.push(Expr::Relation {
                op: RelOp::Leq,
                left: left.clone(),
                right: right.clone(),
            });
            target.push(Expr::Relation {
                op: RelOp::Geq,
                left,
                right,
            });
        }
        other => target.push(other),
    }
    Ok(())
}

fn parse_expression_block(
    cursor: &mut Cursor<'_>,
    config: &ParseConfig,
) -> Result<Vec<Expr>, ParseError> {
    cursor.expect_text("{")?;
    let mut exprs = Vec::new();
    loop {
        let run = collect_expression_run(cursor)?;
        push_parsed(&mut exprs, run, config)?;
        if cursor.peek().is(";") {
            cursor.bump();
            continue;
        }
        cursor.expect_text("}")?;
        return Ok(exprs);
    }
}

fn parse_if_then(
    cursor: &mut Cursor<'_>,
    program: &mut Program,
    config: &ParseConfig,
) -> Result<(), ParseError> {
    let hypotheses = parse_expression_block(cursor, config)?;
    cursor.expect_text("=>")?;
    let conclusions = parse_expression_block(cursor, config)?;
    program.conditions.push(IfThenCondition {
        hypotheses,
        conclusions,
    });
    Ok(())
}

/// Parses a whole program text.
pub fn parse_program(input: &str, config: &ParseConfig) -> Result<Program, ParseError> {
    let mut tokens = tokenize(input)?;
    if config.expand_power_groups {
        tokens = expand_power_groups(tokens)?;
    }

    let mut program = Program::new();
    let mut cursor = Cursor::new(&tokens);
    loop {
        let token = cursor.peek();
        match token.kind {
            TokenKind::Eof => return Ok(program),
            TokenKind::Keyword if token.is("real") => {
                cursor.bump();
                parse_real_decl(&mut cursor, &mut program)?;
            }
            TokenKind::Keyword if token.is("function") => {
                cursor.bump();
                parse_fun_decl(&mut cursor, &mut program)?;
            }
            TokenKind::Keyword if token.is("if") => {
                cursor.bump();
                parse_if_then(&mut cursor, &mut program, config)?;
            }
            _ => return Err(cursor.unexpected()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::RelOp;

    const MERGE_SORT: &str = "\
real n;
function T[1, 1];
if { n >= 1 } => { T(n) == 2*T(n/2) + 2 }
if { n == 0 } => { T(n) == 1 }
";

    #[test]
    fn parses_declarations_and_conditions() {
        let program =
            parse_program(MERGE_SORT, &ParseConfig::default()).expect("parse");
        assert_eq!(program.variables().collect::<Vec<_>>(), vec!["n"]);
        let t = program.function("T").expect("T declared");
        assert_eq!(t.arity, 1);
        assert_eq!(t.highest_degree, Some(1));
        assert_eq!(program.conditions.len(), 2);
    }

    #[test]
    fn equality_splits_into_leq_and_geq_pair() {
        let program =
            parse_program(MERGE_SORT, &ParseConfig::default()).expect("parse");
        let conclusions = &program.conditions[0].conclusions;
        assert_eq!(conclusions.len(), 2);
        let ops: Vec<_> = conclusions
            .iter()
            .map(|e| match e {
                Expr::Relation { op, .. } => *op,
                other => panic!("not a relation: {other}"),
            })
            .collect();
        assert_eq!(ops, vec![RelOp::Leq, RelOp::Geq]);
        // Both halves keep the original operands.
        assert_eq!(conclusions[0].to_string(), "(T(n) <= ((2 * T((n / 2))) + 2))");
        assert_eq!(conclusions[1].to_string(), "(T(n) >= ((2 * T((n / 2))) + 2))");
    }

    #[test]
    fn equality_splitting_leaves_no_eq_behind() {
        let program =
            parse_program(MERGE_SORT, &ParseConfig::default()).expect("parse");
        for condition in &program.conditions {
            for expr in condition.hypotheses.iter().chain(&condition.conclusions) {
                if let Expr::Relation { op, .. } = expr {
                    assert_ne!(*op, RelOp::Eq);
                }
            }
        }
    }

    #[test]
    fn equality_survives_with_splitting_disabled() {
        let config = ParseConfig {
            rewrite_equal_as_two_inequalities: false,
            ..ParseConfig::default()
        };
        let program = parse_program(MERGE_SORT, &config).expect("parse");
        assert_eq!(program.conditions[0].conclusions.len(), 1);
    }

    #[test]
    fn equality_splits_in_hypotheses_too() {
        let program =
            parse_program(MERGE_SORT, &ParseConfig::default()).expect("parse");
        assert_eq!(program.conditions[1].hypotheses.len(), 2);
    }

    #[test]
    fn function_without_degree_bound() {
        let program =
            parse_program("function S[2];", &ParseConfig::default()).expect("parse");
        let s = program.function("S").expect("S declared");
        assert_eq!(s.arity, 2);
        assert_eq!(s.highest_degree, None);
    }

    #[test]
    fn comma_separated_declarations() {
        let program = parse_program(
            "real n, m;\nfunction T[1, 1], S[2, 2];",
            &ParseConfig::default(),
        )
        .expect("parse");
        assert_eq!(program.variables().collect::<Vec<_>>(), vec!["m", "n"]);
        assert!(program.function("S").is_some());
    }

    #[test]
    fn multiple_semicolon_separated_hypotheses() {
        let program = parse_program(
            "real n, m;\nif { n >= 1; m >= n } => { m + n >= 2 }",
            &ParseConfig::default(),
        )
        .expect("parse");
        assert_eq!(program.conditions[0].hypotheses.len(), 2);
        assert_eq!(program.conditions[0].conclusions.len(), 1);
    }

    #[test]
    fn grammar_error_names_token_and_line() {
        let err = parse_program("real n;\nfunction T(1);", &ParseConfig::default())
            .expect_err("bad bracket kind");
        assert_eq!(err.to_string(), "unexpected token `(` at line 2");
    }

    #[test]
    fn power_groups_expand_by_default() {
        let program = parse_program(
            "real n;\nif { n >= 0 } => { n^2 >= 0 }",
            &ParseConfig::default(),
        )
        .expect("parse");
        assert_eq!(
            program.conditions[0].conclusions[0].to_string(),
            "((n * n) >= 0)"
        );
    }
}
