//! Recursive-descent expression parser over the merged token stream.
//!
//! The parser works on token ranges. At each step it strips redundant outer
//! brackets, then splits the range at the lowest-priority operator that sits
//! at bracket depth zero (relations bind loosest, then `+`/`-`, then
//! `*`/`/`). Among operators of equal priority the rightmost wins, which
//! gives the usual left associativity.

use crate::ast::{BinOp, Expr, RelOp, UnOp};
use crate::error::ParseError;
use crate::token::{Token, TokenKind};

fn priority(op: &str) -> Option<u8> {
    match op {
        "<" | ">" | "<=" | ">=" | "==" => Some(0),
        "+" | "-" => Some(1),
        "*" | "/" => Some(2),
        _ => None,
    }
}

/// Strips bracket pairs that enclose the whole range. `( (a + b) )` becomes
/// `a + b`, but `(a) + (b)` is left alone.
fn trim_outer_brackets(tokens: &[Token]) -> Result<&[Token], ParseError> {
    let mut range = tokens;
    loop {
        if range.len() < 2 || !range[0].is("(") || !range[range.len() - 1].is(")") {
            return Ok(range);
        }
        let mut depth = 0i32;
        let mut wraps_whole_range = true;
        for (i, token) in range.iter().enumerate() {
            if token.is("(") {
                depth += 1;
            } else if token.is(")") {
                depth -= 1;
                if depth < 0 {
                    return Err(ParseError::UnmatchedBracket { line: token.line });
                }
            }
            if depth == 0 && i + 1 != range.len() {
                wraps_whole_range = false;
                break;
            }
        }
        if depth_of(range)? != 0 {
            return Err(ParseError::UnmatchedBracket {
                line: range[0].line,
            });
        }
        if !wraps_whole_range {
            return Ok(range);
        }
        range = &range[1..range.len() - 1];
    }
}

fn depth_of(tokens: &[Token]) -> Result<i32, ParseError> {
    let mut depth = 0i32;
    for token in tokens {
        if token.is("(") {
            depth += 1;
        } else if token.is(")") {
            depth -= 1;
            if depth < 0 {
                return Err(ParseError::UnmatchedBracket { line: token.line });
            }
        }
    }
    Ok(depth)
}

/// Index of the operator to split at, if any: minimal priority at depth
/// zero, rightmost among equals.
fn split_point(tokens: &[Token]) -> Result<Option<usize>, ParseError> {
    let mut depth = 0i32;
    let mut best: Option<(u8, usize)> = None;
    for (i, token) in tokens.iter().enumerate() {
        if token.is("(") {
            depth += 1;
        } else if token.is(")") {
            depth -= 1;
            if depth < 0 {
                return Err(ParseError::UnmatchedBracket { line: token.line });
            }
        } else if depth == 0 && token.kind == TokenKind::Operation {
            if let Some(p) = priority(&token.text) {
                match best {
                    Some((bp, _)) if bp < p => {}
                    _ => best = Some((p, i)),
                }
            } else {
                return Err(ParseError::UnexpectedToken {
                    value: token.text.clone(),
                    line: token.line,
                });
            }
        }
    }
    if depth != 0 {
        return Err(ParseError::UnmatchedBracket {
            line: tokens[0].line,
        });
    }
    Ok(best.map(|(_, i)| i))
}

fn range_text(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|t| t.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_atom(tokens: &[Token]) -> Result<Expr, ParseError> {
    if tokens.len() == 1 {
        let token = &tokens[0];
        return match token.kind {
            TokenKind::Number => {
                let value: i64 =
                    token.text.parse().map_err(|_| ParseError::InvalidNumber {
                        value: token.text.clone(),
                        line: token.line,
                    })?;
                Ok(Expr::Constant(value))
            }
            TokenKind::Identifier => Ok(Expr::Variable(token.text.clone())),
            _ => Err(ParseError::UnexpectedToken {
                value: token.text.clone(),
                line: token.line,
            }),
        };
    }

    // The only multi-token atom is a call: `name ( args )`.
    if tokens.len() >= 3
        && tokens[0].kind == TokenKind::Identifier
        && tokens[1].is("(")
        && tokens[tokens.len() - 1].is(")")
    {
        let name = tokens[0].text.clone();
        let inner = &tokens[2..tokens.len() - 1];
        let mut args = Vec::new();
        let mut depth = 0i32;
        let mut arg_start = 0;
        for (i, token) in inner.iter().enumerate() {
            if token.is("(") {
                depth += 1;
            } else if token.is(")") {
                depth -= 1;
            } else if token.is(",") && depth == 0 {
                args.push(parse_range(&inner[arg_start..i])?);
                arg_start = i + 1;
            }
        }
        args.push(parse_range(&inner[arg_start..])?);
        return Ok(Expr::Function { name, args });
    }

    Err(ParseError::InvalidExpression {
        text: range_text(tokens),
        line: tokens[0].line,
    })
}

fn parse_range(tokens: &[Token]) -> Result<Expr, ParseError> {
    let range = trim_outer_brackets(tokens)?;
    if range.is_empty() {
        let line = tokens.first().map(|t| t.line).unwrap_or(1);
        return Err(ParseError::EmptySubexpression { line });
    }

    match split_point(range)? {
        None => parse_atom(range),
        Some(0) => {
            let op = match range[0].text.as_str() {
                "+" => UnOp::Plus,
                "-" => UnOp::Minus,
                other => {
                    return Err(ParseError::UnexpectedToken {
                        value: other.to_string(),
                        line: range[0].line,
                    })
                }
            };
            Ok(Expr::UnaryOp {
                op,
                expr: Box::new(parse_range(&range[1..])?),
            })
        }
        Some(i) => {
            let left = parse_range(&range[..i])?;
            let right = parse_range(&range[i + 1..])?;
            match range[i].text.as_str() {
                "+" => Ok(Expr::binary(BinOp::Add, left, right)),
                "-" => Ok(Expr::binary(BinOp::Sub, left, right)),
                "*" => Ok(Expr::binary(BinOp::Mul, left, right)),
                "/" => Ok(Expr::binary(BinOp::Div, left, right)),
                "<" => Ok(Expr::relation(RelOp::Lt, left, right)),
                ">" => Ok(Expr::relation(RelOp::Gt, left, right)),
                "<=" => Ok(Expr::relation(RelOp::Leq, left, right)),
                ">=" => Ok(Expr::relation(RelOp::Geq, left, right)),
                "==" => Ok(Expr::relation(RelOp::Eq, left, right)),
                other => Err(ParseError::UnexpectedToken {
                    value: other.to_string(),
                    line: range[i].line,
                }),
            }
        }
    }
}

/// Parses a token range into an expression tree.
pub fn parse_expression(tokens: &[Token]) -> Result<Expr, ParseError> {
    if tokens.is_empty() {
        return Err(ParseError::EmptyInput);
    }
    parse_range(tokens)
}
