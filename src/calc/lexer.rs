//! Tokenizer for the calculator expression language.

use crate::error::MeshScopeError;

/// One lexical token.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Token {
    Number(f64),
    /// Quoted dataset reference, e.g. `"Depth"`.
    DatasetRef(String),
    /// Bare identifier: function name or `and`/`or`/`not`.
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    LParen,
    RParen,
    Comma,
}

/// A token plus its byte offset in the source, for error reporting.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct SpannedToken {
    pub token: Token,
    pub offset: usize,
}

fn syntax_error(offset: usize, message: impl Into<String>) -> MeshScopeError {
    MeshScopeError::ExpressionSyntax {
        offset,
        message: message.into(),
    }
}

/// Tokenize an expression.
pub(crate) fn tokenize(input: &str) -> Result<Vec<SpannedToken>, MeshScopeError> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        let start = i;
        let token = match c {
            ' ' | '\t' | '\r' | '\n' => {
                i += 1;
                continue;
            }
            '+' => {
                i += 1;
                Token::Plus
            }
            '-' => {
                i += 1;
                Token::Minus
            }
            '*' => {
                i += 1;
                Token::Star
            }
            '/' => {
                i += 1;
                Token::Slash
            }
            '^' => {
                i += 1;
                Token::Caret
            }
            '(' => {
                i += 1;
                Token::LParen
            }
            ')' => {
                i += 1;
                Token::RParen
            }
            ',' => {
                i += 1;
                Token::Comma
            }
            '=' => {
                i += 1;
                Token::Eq
            }
            '<' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    i += 2;
                    Token::Le
                } else {
                    i += 1;
                    Token::Lt
                }
            }
            '>' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    i += 2;
                    Token::Ge
                } else {
                    i += 1;
                    Token::Gt
                }
            }
            '!' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    i += 2;
                    Token::Ne
                } else {
                    return Err(syntax_error(start, "expected `!=`"));
                }
            }
            '"' => {
                let mut j = i + 1;
                while j < bytes.len() && bytes[j] != b'"' {
                    j += 1;
                }
                if j == bytes.len() {
                    return Err(syntax_error(start, "unterminated dataset reference"));
                }
                let name = input[i + 1..j].to_owned();
                i = j + 1;
                Token::DatasetRef(name)
            }
            '0'..='9' | '.' => {
                let mut j = i;
                while j < bytes.len()
                    && (bytes[j].is_ascii_digit() || bytes[j] == b'.' || bytes[j] == b'e'
                        || bytes[j] == b'E'
                        || ((bytes[j] == b'+' || bytes[j] == b'-')
                            && matches!(bytes.get(j.wrapping_sub(1)), Some(b'e' | b'E'))))
                {
                    j += 1;
                }
                let text = &input[i..j];
                let value: f64 = text
                    .parse()
                    .map_err(|_| syntax_error(start, format!("invalid number `{text}`")))?;
                i = j;
                Token::Number(value)
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut j = i;
                while j < bytes.len()
                    && ((bytes[j] as char).is_ascii_alphanumeric() || bytes[j] == b'_')
                {
                    j += 1;
                }
                let ident = input[i..j].to_owned();
                i = j;
                Token::Ident(ident)
            }
            other => return Err(syntax_error(start, format!("unexpected character `{other}`"))),
        };
        tokens.push(SpannedToken {
            token,
            offset: start,
        });
    }
    Ok(tokens)
}
