//! Module: expr::parser
//! Responsibility: recursive-descent parsing of token streams into `Expr`.
//! Does not own: column resolution (see `Expression::prepare`).
//!
//! Precedence, loosest first: OR, AND, NOT, comparison and IS [NOT], `||`,
//! `+ -`, `* / %`, unary minus.

use crate::{
    expr::{
        ParseError,
        ast::{BinaryOp, Expr, Special, UnaryOp},
        function::Function,
        lexer::{Spanned, Token, tokenize},
    },
    value::Value,
};

/// Parse one expression text into a tree.
pub(crate) fn parse(text: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(text)?;
    let mut parser = Parser {
        tokens,
        position: 0,
        end: text.len(),
    };

    if parser.tokens.is_empty() {
        return Err(ParseError::new(0, "expression is empty"));
    }

    let expr = parser.or()?;
    if let Some(spanned) = parser.peek_spanned() {
        return Err(ParseError::new(
            spanned.offset,
            format!("unexpected {}", spanned.token.describe()),
        ));
    }

    Ok(expr)
}

struct Parser {
    tokens: Vec<Spanned>,
    position: usize,
    end: usize,
}

impl Parser {
    fn peek_spanned(&self) -> Option<&Spanned> {
        self.tokens.get(self.position)
    }

    fn peek(&self) -> Option<&Token> {
        self.peek_spanned().map(|spanned| &spanned.token)
    }

    fn offset(&self) -> usize {
        self.peek_spanned().map_or(self.end, |spanned| spanned.offset)
    }

    fn advance(&mut self) -> Option<Spanned> {
        let spanned = self.tokens.get(self.position).cloned();
        if spanned.is_some() {
            self.position += 1;
        }

        spanned
    }

    fn eat(&mut self, wanted: &Token) -> bool {
        if self.peek() == Some(wanted) {
            self.position += 1;
            return true;
        }

        false
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if matches!(self.peek(), Some(Token::Ident(word)) if word.eq_ignore_ascii_case(keyword)) {
            self.position += 1;
            return true;
        }

        false
    }

    fn expect(&mut self, wanted: &Token) -> Result<(), ParseError> {
        if self.eat(wanted) {
            return Ok(());
        }

        Err(self.error_here(format!("expected '{}'", wanted.describe())))
    }

    fn error_here(&self, expected: String) -> ParseError {
        let found = self
            .peek()
            .map_or_else(|| "end of input".to_string(), Token::describe);

        ParseError::new(self.offset(), format!("{expected}, found {found}"))
    }

    fn or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.and()?;
        while self.eat_keyword("OR") {
            let right = self.and()?;
            left = binary(BinaryOp::Or, left, right);
        }

        Ok(left)
    }

    fn and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.not()?;
        while self.eat_keyword("AND") {
            let right = self.not()?;
            left = binary(BinaryOp::And, left, right);
        }

        Ok(left)
    }

    fn not(&mut self) -> Result<Expr, ParseError> {
        if self.eat_keyword("NOT") {
            let operand = self.not()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }

        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.concat()?;
        loop {
            if self.eat_keyword("IS") {
                let op = if self.eat_keyword("NOT") {
                    BinaryOp::IsNot
                } else {
                    BinaryOp::Is
                };
                let right = self.concat()?;
                left = binary(op, left, right);
                continue;
            }

            let op = match self.peek() {
                Some(Token::Eq) => BinaryOp::Eq,
                Some(Token::Ne) => BinaryOp::Ne,
                Some(Token::Lt) => BinaryOp::Lt,
                Some(Token::Le) => BinaryOp::Le,
                Some(Token::Gt) => BinaryOp::Gt,
                Some(Token::Ge) => BinaryOp::Ge,
                _ => return Ok(left),
            };
            self.position += 1;
            let right = self.concat()?;
            left = binary(op, left, right);
        }
    }

    fn concat(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.additive()?;
        while self.eat(&Token::Concat) {
            let right = self.additive()?;
            left = binary(BinaryOp::Concat, left, right);
        }

        Ok(left)
    }

    fn additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.position += 1;
            let right = self.multiplicative()?;
            left = binary(op, left, right);
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Mod,
                _ => return Ok(left),
            };
            self.position += 1;
            let right = self.unary()?;
            left = binary(op, left, right);
        }
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        if self.eat(&Token::Minus) {
            let operand = self.unary()?;
            return Ok(match operand {
                Expr::Literal(Value::Int(i)) if i != i64::MIN => Expr::Literal(Value::Int(-i)),
                Expr::Literal(Value::Float(f)) => Expr::Literal(Value::Float(-f)),
                other => Expr::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(other),
                },
            });
        }
        if self.eat(&Token::Plus) {
            return self.unary();
        }

        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let offset = self.offset();
        let Some(spanned) = self.advance() else {
            return Err(self.error_here("expected an operand".to_string()));
        };

        match spanned.token {
            Token::Int(i) => Ok(Expr::Literal(Value::Int(i))),
            Token::Float(f) => Ok(Expr::Literal(Value::Float(f))),
            Token::Str(s) => Ok(Expr::Literal(Value::Text(s))),
            Token::QuotedIdent(name) => Ok(Expr::Column { name, index: None }),
            Token::Variable(name) => Ok(Expr::Variable(name)),
            Token::Special(name) => Special::from_name(&name)
                .map(Expr::Special)
                .ok_or_else(|| ParseError::new(offset, format!("unknown special '${name}'"))),
            Token::LParen => {
                let inner = self.or()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Token::Ident(word) => self.identifier(word, offset),
            other => Err(ParseError::new(
                offset,
                format!("unexpected {}", other.describe()),
            )),
        }
    }

    fn identifier(&mut self, word: String, offset: usize) -> Result<Expr, ParseError> {
        if self.peek() == Some(&Token::LParen) {
            return self.call(&word, offset);
        }

        let literal = match word.to_ascii_uppercase().as_str() {
            "NULL" => Value::Null,
            "TRUE" => Value::Bool(true),
            "FALSE" => Value::Bool(false),
            "AND" | "OR" | "NOT" | "IS" => {
                return Err(ParseError::new(
                    offset,
                    format!("unexpected keyword {word}"),
                ));
            }
            _ => return Ok(Expr::Column { name: word, index: None }),
        };

        Ok(Expr::Literal(literal))
    }

    fn call(&mut self, name: &str, offset: usize) -> Result<Expr, ParseError> {
        let function = Function::lookup(name)
            .ok_or_else(|| ParseError::new(offset, format!("function '{name}' is not known")))?;
        self.expect(&Token::LParen)?;

        let mut args = Vec::new();
        if !self.eat(&Token::RParen) {
            loop {
                args.push(self.or()?);
                if self.eat(&Token::RParen) {
                    break;
                }
                self.expect(&Token::Comma)?;
            }
        }

        let arity = function.arity();
        if !arity.accepts(args.len()) {
            let expected = match arity.max {
                Some(max) if max == arity.min => format!("{max}"),
                Some(max) => format!("{} to {max}", arity.min),
                None => format!("at least {}", arity.min),
            };
            return Err(ParseError::new(
                offset,
                format!(
                    "function '{}' expects {expected} arguments, got {}",
                    function.name(),
                    args.len()
                ),
            ));
        }

        Ok(Expr::Call { function, args })
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}
