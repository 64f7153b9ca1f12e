//! Module: expr::lexer
//! Responsibility: split expression text into positioned tokens.
//! Does not own: keyword recognition (identifiers are classified by the parser).

use crate::expr::ParseError;

///
/// Token
///

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    QuotedIdent(String),
    Variable(String),
    Special(String),
    LParen,
    RParen,
    Comma,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Concat,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Token {
    /// Short description used in parser diagnostics.
    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Str(s) => format!("'{s}'"),
            Self::Ident(s) => s.clone(),
            Self::QuotedIdent(s) => format!("\"{s}\""),
            Self::Variable(s) => format!("@{s}"),
            Self::Special(s) => format!("${s}"),
            Self::LParen => "(".to_string(),
            Self::RParen => ")".to_string(),
            Self::Comma => ",".to_string(),
            Self::Plus => "+".to_string(),
            Self::Minus => "-".to_string(),
            Self::Star => "*".to_string(),
            Self::Slash => "/".to_string(),
            Self::Percent => "%".to_string(),
            Self::Concat => "||".to_string(),
            Self::Eq => "=".to_string(),
            Self::Ne => "<>".to_string(),
            Self::Lt => "<".to_string(),
            Self::Le => "<=".to_string(),
            Self::Gt => ">".to_string(),
            Self::Ge => ">=".to_string(),
        }
    }
}

///
/// Spanned
///
/// Token plus its byte offset in the source text.
///

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Spanned {
    pub(crate) token: Token,
    pub(crate) offset: usize,
}

/// Tokenize one expression text.
pub(crate) fn tokenize(text: &str) -> Result<Vec<Spanned>, ParseError> {
    let mut lexer = Lexer {
        chars: text.char_indices().peekable(),
        tokens: Vec::new(),
    };
    lexer.run()?;

    Ok(lexer.tokens)
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    tokens: Vec<Spanned>,
}

impl Lexer<'_> {
    fn run(&mut self) -> Result<(), ParseError> {
        while let Some(&(offset, ch)) = self.chars.peek() {
            if ch.is_whitespace() {
                self.chars.next();
                continue;
            }

            let token = match ch {
                '(' => self.single(Token::LParen),
                ')' => self.single(Token::RParen),
                ',' => self.single(Token::Comma),
                '+' => self.single(Token::Plus),
                '-' => self.single(Token::Minus),
                '*' => self.single(Token::Star),
                '/' => self.single(Token::Slash),
                '%' => self.single(Token::Percent),
                '=' => self.single(Token::Eq),
                '|' => {
                    self.chars.next();
                    if !self.eat('|') {
                        return Err(ParseError::new(offset, "expected '||'"));
                    }
                    Token::Concat
                }
                '!' => {
                    self.chars.next();
                    if !self.eat('=') {
                        return Err(ParseError::new(offset, "expected '!='"));
                    }
                    Token::Ne
                }
                '<' => {
                    self.chars.next();
                    if self.eat('=') {
                        Token::Le
                    } else if self.eat('>') {
                        Token::Ne
                    } else {
                        Token::Lt
                    }
                }
                '>' => {
                    self.chars.next();
                    if self.eat('=') { Token::Ge } else { Token::Gt }
                }
                '\'' => Token::Str(self.quoted('\'', offset)?),
                '"' => Token::QuotedIdent(self.quoted('"', offset)?),
                '@' | '$' => {
                    self.chars.next();
                    let name = self.word();
                    if name.is_empty() {
                        return Err(ParseError::new(offset, format!("expected a name after '{ch}'")));
                    }
                    if ch == '@' {
                        Token::Variable(name)
                    } else {
                        Token::Special(name)
                    }
                }
                c if c.is_ascii_digit() || c == '.' => self.number(offset)?,
                c if c.is_alphabetic() || c == '_' => Token::Ident(self.word()),
                other => {
                    return Err(ParseError::new(
                        offset,
                        format!("unexpected character '{other}'"),
                    ));
                }
            };

            self.tokens.push(Spanned { token, offset });
        }

        Ok(())
    }

    fn single(&mut self, token: Token) -> Token {
        self.chars.next();
        token
    }

    fn eat(&mut self, wanted: char) -> bool {
        if self.chars.peek().is_some_and(|&(_, ch)| ch == wanted) {
            self.chars.next();
            return true;
        }

        false
    }

    fn word(&mut self) -> String {
        let mut out = String::new();
        while let Some(&(_, ch)) = self.chars.peek() {
            if !(ch.is_alphanumeric() || ch == '_') {
                break;
            }
            out.push(ch);
            self.chars.next();
        }

        out
    }

    // Quoted run; a doubled quote character escapes itself.
    fn quoted(&mut self, quote: char, offset: usize) -> Result<String, ParseError> {
        self.chars.next();
        let mut out = String::new();
        loop {
            match self.chars.next() {
                Some((_, ch)) if ch == quote => {
                    if self.eat(quote) {
                        out.push(quote);
                    } else {
                        return Ok(out);
                    }
                }
                Some((_, ch)) => out.push(ch),
                None => {
                    return Err(ParseError::new(offset, "unterminated quoted text"));
                }
            }
        }
    }

    fn number(&mut self, offset: usize) -> Result<Token, ParseError> {
        let mut digits = String::new();
        let mut is_float = false;
        while let Some(&(_, ch)) = self.chars.peek() {
            match ch {
                '0'..='9' => digits.push(ch),
                '.' if !is_float => {
                    is_float = true;
                    digits.push(ch);
                }
                'e' | 'E' => {
                    is_float = true;
                    digits.push(ch);
                    self.chars.next();
                    if let Some(&(_, sign)) = self.chars.peek()
                        && (sign == '+' || sign == '-')
                    {
                        digits.push(sign);
                        self.chars.next();
                    }
                    continue;
                }
                _ => break,
            }
            self.chars.next();
        }

        let invalid = || ParseError::new(offset, format!("invalid number '{digits}'"));
        if is_float {
            digits.parse::<f64>().map(Token::Float).map_err(|_| invalid())
        } else {
            digits.parse::<i64>().map(Token::Int).map_err(|_| invalid())
        }
    }
}
