//! Recursive-descent parser for the calculator expression language.
//!
//! Precedence, loosest first: `or`, `and`, `not`, comparisons,
//! additive, multiplicative, unary minus, `^` (right-associative),
//! primaries. Function calls are `min(a,b)`, `max(a,b)`, `abs(x)` and
//! `if(cond, then, else)`; quoted strings reference datasets by name.

use crate::calc::lexer::{SpannedToken, Token, tokenize};
use crate::error::MeshScopeError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Function {
    Min,
    Max,
    Abs,
    If,
}

impl Function {
    fn arity(self) -> usize {
        match self {
            Function::Abs => 1,
            Function::Min | Function::Max => 2,
            Function::If => 3,
        }
    }
}

/// Parsed expression tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Number(f64),
    DatasetRef(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call(Function, Vec<Expr>),
}

impl Expr {
    /// Names of all datasets the expression references, in first-seen
    /// order without duplicates.
    pub fn dataset_refs(&self) -> Vec<&str> {
        let mut refs = Vec::new();
        self.collect_refs(&mut refs);
        refs
    }

    fn collect_refs<'a>(&'a self, refs: &mut Vec<&'a str>) {
        match self {
            Expr::Number(_) => {}
            Expr::DatasetRef(name) => {
                if !refs.contains(&name.as_str()) {
                    refs.push(name);
                }
            }
            Expr::Unary(_, inner) => inner.collect_refs(refs),
            Expr::Binary(_, lhs, rhs) => {
                lhs.collect_refs(refs);
                rhs.collect_refs(refs);
            }
            Expr::Call(_, args) => {
                for arg in args {
                    arg.collect_refs(refs);
                }
            }
        }
    }
}

/// Parse an expression string into an [`Expr`].
pub fn parse(input: &str) -> Result<Expr, MeshScopeError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        input_len: input.len(),
    };
    let expr = parser.parse_or()?;
    if let Some(t) = parser.peek() {
        return Err(parser.error_at(t.offset, "unexpected trailing input"));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
    input_len: usize,
}

impl Parser {
    fn peek(&self) -> Option<&SpannedToken> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<SpannedToken> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn error_at(&self, offset: usize, message: impl Into<String>) -> MeshScopeError {
        MeshScopeError::ExpressionSyntax {
            offset,
            message: message.into(),
        }
    }

    fn error_here(&self, message: impl Into<String>) -> MeshScopeError {
        let offset = self.peek().map_or(self.input_len, |t| t.offset);
        self.error_at(offset, message)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek().is_some_and(|t| &t.token == token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token, what: &str) -> Result<(), MeshScopeError> {
        if self.eat(&token) {
            Ok(())
        } else {
            Err(self.error_here(format!("expected {what}")))
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self
            .peek()
            .is_some_and(|t| matches!(&t.token, Token::Ident(s) if s == keyword))
        {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> Result<Expr, MeshScopeError> {
        let mut lhs = self.parse_and()?;
        while self.eat_keyword("or") {
            let rhs = self.parse_and()?;
            lhs = Expr::Binary(BinaryOp::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, MeshScopeError> {
        let mut lhs = self.parse_not()?;
        while self.eat_keyword("and") {
            let rhs = self.parse_not()?;
            lhs = Expr::Binary(BinaryOp::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr, MeshScopeError> {
        if self.eat_keyword("not") {
            let inner = self.parse_not()?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, MeshScopeError> {
        let lhs = self.parse_additive()?;
        let op = match self.peek().map(|t| &t.token) {
            Some(Token::Lt) => BinaryOp::Lt,
            Some(Token::Le) => BinaryOp::Le,
            Some(Token::Gt) => BinaryOp::Gt,
            Some(Token::Ge) => BinaryOp::Ge,
            Some(Token::Eq) => BinaryOp::Eq,
            Some(Token::Ne) => BinaryOp::Ne,
            _ => return Ok(lhs),
        };
        self.pos += 1;
        let rhs = self.parse_additive()?;
        Ok(Expr::Binary(op, Box::new(lhs), Box::new(rhs)))
    }

    fn parse_additive(&mut self) -> Result<Expr, MeshScopeError> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek().map(|t| &t.token) {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, MeshScopeError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek().map(|t| &t.token) {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, MeshScopeError> {
        if self.eat(&Token::Minus) {
            let inner = self.parse_unary()?;
            return Ok(Expr::Unary(UnaryOp::Neg, Box::new(inner)));
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> Result<Expr, MeshScopeError> {
        let base = self.parse_primary()?;
        if self.eat(&Token::Caret) {
            // Right-associative: a^b^c parses as a^(b^c).
            let exponent = self.parse_unary()?;
            return Ok(Expr::Binary(
                BinaryOp::Pow,
                Box::new(base),
                Box::new(exponent),
            ));
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> Result<Expr, MeshScopeError> {
        let Some(t) = self.advance() else {
            return Err(self.error_here("unexpected end of expression"));
        };
        match t.token {
            Token::Number(value) => Ok(Expr::Number(value)),
            Token::DatasetRef(name) => Ok(Expr::DatasetRef(name)),
            Token::LParen => {
                let inner = self.parse_or()?;
                self.expect(Token::RParen, "`)`")?;
                Ok(inner)
            }
            Token::Ident(name) => {
                let function = match name.as_str() {
                    "min" => Function::Min,
                    "max" => Function::Max,
                    "abs" => Function::Abs,
                    "if" => Function::If,
                    other => {
                        return Err(self.error_at(t.offset, format!("unknown function `{other}`")));
                    }
                };
                self.expect(Token::LParen, "`(` after function name")?;
                let mut args = vec![self.parse_or()?];
                while self.eat(&Token::Comma) {
                    args.push(self.parse_or()?);
                }
                self.expect(Token::RParen, "`)`")?;
                if args.len() != function.arity() {
                    return Err(self.error_at(
                        t.offset,
                        format!(
                            "`{name}` takes {} argument(s), got {}",
                            function.arity(),
                            args.len()
                        ),
                    ));
                }
                Ok(Expr::Call(function, args))
            }
            _ => Err(self.error_at(t.offset, "expected a value")),
        }
    }
}
