//! Line-based tokenizer.
//!
//! Tokenization is three passes:
//! 1. per line: cut `//` comments, pad every single-character symbol with
//!    spaces, split on whitespace, classify each word;
//! 2. merge the two-character operators the padding pass split apart
//!    (`> =` to `>=`, `< =` to `<=`, `= =` to `==`, `= >` to `=>`);
//! 3. optionally expand power groups (`a ^ k`, `( ... ) ^ k`) into explicit
//!    `k`-fold products, so the expression parser never sees `^`.
//!
//! An EOF token terminates the stream.

use std::sync::OnceLock;

use nom::{bytes::complete::take_while1, combinator::all_consuming};
use regex::Regex;

use crate::error::ParseError;
use crate::token::{Token, TokenKind};

const SYMBOLS: &[char] = &[
    ';', ',', '[', ']', '(', ')', '{', '}', '+', '-', '*', '/', '^', '=', '>', '<',
];

const DELIMITERS: &[&str] = &[";", ",", "[", "]", "(", ")", "{", "}"];
const KEYWORDS: &[&str] = &["real", "function", "if", "=>"];
const OPERATIONS: &[&str] = &[
    "+", "-", "*", "/", "^", "=", "==", ">=", "<=", ">", "<",
];

fn identifier_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex"))
}

fn is_number(word: &str) -> bool {
    all_consuming(take_while1::<_, &str, nom::error::Error<&str>>(|c: char| {
        c.is_ascii_digit() || c == '.'
    }))(word)
    .is_ok()
}

fn cut_comment(line: &str) -> &str {
    match line.find("//") {
        Some(pos) => &line[..pos],
        None => line,
    }
}

fn pad_symbols(line: &str) -> String {
    let mut padded = String::with_capacity(line.len() * 2);
    for c in line.chars() {
        if SYMBOLS.contains(&c) {
            padded.push(' ');
            padded.push(c);
            padded.push(' ');
        } else {
            padded.push(c);
        }
    }
    padded
}

fn classify(word: &str, line: usize) -> Result<Token, ParseError> {
    let kind = if DELIMITERS.contains(&word) {
        TokenKind::Delimiter
    } else if KEYWORDS.contains(&word) {
        TokenKind::Keyword
    } else if OPERATIONS.contains(&word) {
        TokenKind::Operation
    } else if is_number(word) {
        TokenKind::Number
    } else if identifier_regex().is_match(word) {
        TokenKind::Identifier
    } else {
        return Err(ParseError::UnrecognizedToken {
            value: word.to_string(),
            line,
        });
    };
    Ok(Token::new(kind, word, line))
}

fn pretokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    for (idx, raw_line) in input.lines().enumerate() {
        let line = idx + 1;
        let cleaned = pad_symbols(cut_comment(raw_line));
        for word in cleaned.split_whitespace() {
            tokens.push(classify(word, line)?);
        }
    }
    Ok(tokens)
}

/// Re-joins two-character operators split by the padding pass.
fn merge_tokens(tokens: Vec<Token>) -> Vec<Token> {
    let mut merged = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        let pair = (
            tokens[i].text.as_str(),
            tokens.get(i + 1).map(|t| t.text.as_str()),
        );
        let line = tokens[i].line;
        match pair {
            (">", Some("=")) => {
                merged.push(Token::new(TokenKind::Operation, ">=", line));
                i += 2;
            }
            ("<", Some("=")) => {
                merged.push(Token::new(TokenKind::Operation, "<=", line));
                i += 2;
            }
            ("=", Some("=")) => {
                merged.push(Token::new(TokenKind::Operation, "==", line));
                i += 2;
            }
            ("=", Some(">")) => {
                merged.push(Token::new(TokenKind::Keyword, "=>", line));
                i += 2;
            }
            _ => {
                merged.push(tokens[i].clone());
                i += 1;
            }
        }
    }
    merged
}

/// Full tokenization; the returned stream always ends with an EOF token.
pub fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let tokens = pretokenize(input)?;
    let mut merged = merge_tokens(tokens);
    let last_line = merged.last().map(|t| t.line).unwrap_or(1);
    merged.push(Token::new(TokenKind::Eof, "", last_line));
    Ok(merged)
}

// ============================================================================
// Power-group expansion
// ============================================================================

struct PowerGroup {
    group_start: usize,
    /// Exclusive end of the base group; the `^` token itself.
    group_finish: usize,
    power_value: usize,
}

fn matching_open_bracket(tokens: &[Token], close: usize) -> Result<usize, ParseError> {
    let mut depth = 0i32;
    for i in (0..=close).rev() {
        if tokens[i].is(")") {
            depth += 1;
        } else if tokens[i].is("(") {
            depth -= 1;
        }
        if depth == 0 {
            return Ok(i);
        }
    }
    Err(ParseError::UnmatchedBracket {
        line: tokens[close].line,
    })
}

fn find_power_groups(tokens: &[Token]) -> Result<Vec<PowerGroup>, ParseError> {
    let mut groups = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        if !token.is("^") {
            continue;
        }
        if i == 0 {
            return Err(ParseError::UnexpectedToken {
                value: "^".to_string(),
                line: token.line,
            });
        }
        let group_start = if tokens[i - 1].is(")") {
            matching_open_bracket(tokens, i - 1)?
        } else if tokens[i - 1].kind == TokenKind::Number
            || tokens[i - 1].kind == TokenKind::Identifier
        {
            i - 1
        } else {
            return Err(ParseError::UnexpectedToken {
                value: tokens[i - 1].text.clone(),
                line: tokens[i - 1].line,
            });
        };
        let power_value = match tokens.get(i + 1) {
            Some(t) if t.kind == TokenKind::Number => i + 1,
            Some(t) => {
                return Err(ParseError::InvalidPower {
                    value: t.text.clone(),
                    line: t.line,
                })
            }
            None => {
                return Err(ParseError::InvalidPower {
                    value: String::new(),
                    line: token.line,
                })
            }
        };
        groups.push(PowerGroup {
            group_start,
            group_finish: i,
            power_value,
        });
    }
    Ok(groups)
}

/// Rewrites every `base ^ k` group into `( base * base * ... )` with `k`
/// copies. `k` must be a positive integer literal.
pub fn expand_power_groups(tokens: Vec<Token>) -> Result<Vec<Token>, ParseError> {
    let groups = find_power_groups(&tokens)?;
    if groups.is_empty() {
        return Ok(tokens);
    }

    #[derive(Clone, Copy, PartialEq)]
    enum Membership {
        Outside,
        First(usize),
        Inside,
    }

    let mut membership = vec![Membership::Outside; tokens.len()];
    for (gi, group) in groups.iter().enumerate() {
        for slot in membership
            .iter_mut()
            .take(group.power_value + 1)
            .skip(group.group_start)
        {
            *slot = Membership::Inside;
        }
        membership[group.group_start] = Membership::First(gi);
    }

    let mut expanded = Vec::with_capacity(tokens.len() * 2);
    for (i, token) in tokens.iter().enumerate() {
        match membership[i] {
            Membership::Outside => expanded.push(token.clone()),
            Membership::Inside => {}
            Membership::First(gi) => {
                let group = &groups[gi];
                let power_token = &tokens[group.power_value];
                let power: i64 = power_token.text.parse().map_err(|_| {
                    ParseError::InvalidNumber {
                        value: power_token.text.clone(),
                        line: power_token.line,
                    }
                })?;
                if power <= 0 {
                    return Err(ParseError::InvalidPower {
                        value: power_token.text.clone(),
                        line: power_token.line,
                    });
                }
                let line = token.line;
                expanded.push(Token::new(TokenKind::Delimiter, "(", line));
                for repeat in 0..power {
                    expanded
                        .extend_from_slice(&tokens[group.group_start..group.group_finish]);
                    if repeat != power - 1 {
                        expanded.push(Token::new(TokenKind::Operation, "*", line));
                    }
                }
                expanded.push(Token::new(TokenKind::Delimiter, ")", line));
            }
        }
    }
    Ok(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn splits_and_remerges_relational_operators() {
        let tokens = tokenize("n>=1").expect("tokenize");
        assert_eq!(texts(&tokens), vec!["n", ">=", "1", ""]);
        assert_eq!(tokens[1].kind, TokenKind::Operation);
    }

    #[test]
    fn merges_implication_arrow_as_keyword() {
        let tokens = tokenize("} => {").expect("tokenize");
        assert_eq!(tokens[1].text, "=>");
        assert_eq!(tokens[1].kind, TokenKind::Keyword);
    }

    #[test]
    fn cuts_comments_to_end_of_line() {
        let tokens = tokenize("real n; // the input size\nreal m;").expect("tokenize");
        let words = texts(&tokens);
        assert!(!words.contains(&"the"));
        assert!(words.contains(&"m"));
    }

    #[test]
    fn tracks_line_numbers() {
        let tokens = tokenize("real n;\nreal m;").expect("tokenize");
        let m = tokens.iter().find(|t| t.is("m")).expect("m token");
        assert_eq!(m.line, 2);
    }

    #[test]
    fn rejects_garbage_tokens() {
        let err = tokenize("real n$;").expect_err("should reject");
        assert!(err.to_string().contains("unrecognized"));
    }

    #[test]
    fn expands_simple_power() {
        let tokens = tokenize("n^3").expect("tokenize");
        let expanded = expand_power_groups(tokens).expect("expand");
        assert_eq!(texts(&expanded), vec!["(", "n", "*", "n", "*", "n", ")", ""]);
    }

    #[test]
    fn expands_bracketed_power() {
        let tokens = tokenize("(n+1)^2").expect("tokenize");
        let expanded = expand_power_groups(tokens).expect("expand");
        assert_eq!(
            texts(&expanded),
            vec!["(", "(", "n", "+", "1", ")", "*", "(", "n", "+", "1", ")", ")", ""]
        );
    }

    #[test]
    fn rejects_non_positive_power() {
        let tokens = tokenize("n^0").expect("tokenize");
        let err = expand_power_groups(tokens).expect_err("zero power");
        assert!(err.to_string().contains("positive"));
    }

    #[test]
    fn rejects_symbolic_power() {
        let tokens = tokenize("n^m").expect("tokenize");
        let err = expand_power_groups(tokens).expect_err("symbolic power");
        assert!(err.to_string().contains("positive integer literal"));
    }
}
