//! Token model shared by the tokenizer and both parsers.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    Identifier,
    Keyword,
    Delimiter,
    /// `+ - * / ^ = == >= <= > <`
    Operation,
    Number,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// 1-based source line, kept for diagnostics.
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
        }
    }

    pub fn is(&self, text: &str) -> bool {
        self.text == text
    }

    /// True for tokens that may appear inside an expression body.
    pub fn is_expression_token(&self) -> bool {
        self.kind == TokenKind::Operation
            || self.kind == TokenKind::Identifier
            || self.kind == TokenKind::Number
            || self.is("(")
            || self.is(")")
            || self.is(",")
    }
}
