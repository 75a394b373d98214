//! Statement parsing and row filtering for the simulated query service.
//!
//! Only the shape used by fixtures and procedure callers is understood:
//!
//! ```text
//! SELECT * FROM <bucket> [WHERE <path> = <operand> [AND <path> = <operand>]...] [;]
//! ```
//!
//! `<operand>` is a string (`'..'` or `".."`), number, `true`/`false`/`null`,
//! a positional parameter (`$1`) or a named parameter (`$name`). Keywords are
//! case-insensitive and identifiers may be backtick-quoted.

use docfix_core::{Error, JsonObject, QueryOptions, Result};
use serde_json::Value;

/// Right-hand side of an equality predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Inline literal
    Literal(Value),
    /// `$n`, 1-based
    Positional(usize),
    /// `$name`
    Named(String),
}

/// `path = operand`
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    /// Field path inside the document
    pub path: Vec<String>,
    /// Value the field must equal
    pub operand: Operand,
}

/// A parsed `SELECT *` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    /// Keyspace being scanned
    pub bucket: String,
    /// Conjunction of predicates
    pub predicates: Vec<Predicate>,
}

/// A predicate with its parameter resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundPredicate {
    path: Vec<String>,
    value: Value,
}

impl SelectStatement {
    /// Resolve parameters against `options`.
    pub fn bind(&self, options: &QueryOptions) -> Result<Vec<BoundPredicate>> {
        self.predicates
            .iter()
            .map(|p| {
                let value = match &p.operand {
                    Operand::Literal(v) => v.clone(),
                    Operand::Positional(n) => options
                        .positional
                        .get(n - 1)
                        .cloned()
                        .ok_or_else(|| {
                            Error::InvalidQuery(format!("no value for positional parameter ${}", n))
                        })?,
                    Operand::Named(name) => options.named.get(name).cloned().ok_or_else(|| {
                        Error::InvalidQuery(format!("no value for named parameter ${}", name))
                    })?,
                };
                Ok(BoundPredicate {
                    path: p.path.clone(),
                    value,
                })
            })
            .collect()
    }
}

/// Whether `doc` satisfies every predicate.
pub fn matches(doc: &JsonObject, predicates: &[BoundPredicate]) -> bool {
    predicates.iter().all(|p| {
        let mut fields = p.path.iter();
        let first = match fields.next() {
            Some(f) => f,
            None => return false,
        };
        let mut current = match doc.get(first) {
            Some(v) => v,
            None => return false,
        };
        for field in fields {
            current = match current.get(field) {
                Some(v) => v,
                None => return false,
            };
        }
        values_equal(current, &p.value)
    })
}

// Numbers compare by value so `1` matches `1.0`.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

// =============================================================================
// Tokenizer
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Quoted(String),
    Str(String),
    Number(Value),
    Param(String),
    Star,
    Eq,
    Dot,
    Semicolon,
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '=' => {
                chars.next();
                // Accept `==` as well.
                if chars.peek() == Some(&'=') {
                    chars.next();
                }
                tokens.push(Token::Eq);
            }
            '.' => {
                chars.next();
                tokens.push(Token::Dot);
            }
            ';' => {
                chars.next();
                tokens.push(Token::Semicolon);
            }
            '\'' | '"' | '`' => {
                let quote = c;
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        // Doubled quote is an escaped quote.
                        Some(ch) if ch == quote => {
                            if chars.peek() == Some(&quote) {
                                chars.next();
                                text.push(quote);
                            } else {
                                break;
                            }
                        }
                        Some(ch) => text.push(ch),
                        None => {
                            return Err(Error::InvalidQuery(format!(
                                "unterminated {} literal",
                                quote
                            )))
                        }
                    }
                }
                tokens.push(if quote == '`' {
                    Token::Quoted(text)
                } else {
                    Token::Str(text)
                });
            }
            '$' => {
                chars.next();
                let mut name = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_ascii_alphanumeric() || ch == '_' {
                        name.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if name.is_empty() {
                    return Err(Error::InvalidQuery("empty parameter name".into()));
                }
                tokens.push(Token::Param(name));
            }
            c if c.is_ascii_digit() || c == '-' => {
                let mut text = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_ascii_digit() || matches!(ch, '-' | '.' | 'e' | 'E' | '+') {
                        text.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value: Value = serde_json::from_str(&text)
                    .map_err(|_| Error::InvalidQuery(format!("invalid number {:?}", text)))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut word = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-') {
                        word.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Word(word));
            }
            other => {
                return Err(Error::InvalidQuery(format!(
                    "unexpected character {:?}",
                    other
                )))
            }
        }
    }
    Ok(tokens)
}

// =============================================================================
// Parser
// =============================================================================

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        match self.next() {
            Some(Token::Word(w)) if w.eq_ignore_ascii_case(keyword) => Ok(()),
            other => Err(Error::InvalidQuery(format!(
                "expected {}, found {:?}",
                keyword.to_ascii_uppercase(),
                other
            ))),
        }
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Word(w)) if w.eq_ignore_ascii_case(keyword))
    }

    fn identifier(&mut self) -> Result<String> {
        match self.next() {
            Some(Token::Word(w)) | Some(Token::Quoted(w)) => Ok(w),
            other => Err(Error::InvalidQuery(format!(
                "expected identifier, found {:?}",
                other
            ))),
        }
    }

    fn path(&mut self) -> Result<Vec<String>> {
        let mut path = vec![self.identifier()?];
        while self.peek() == Some(&Token::Dot) {
            self.next();
            path.push(self.identifier()?);
        }
        Ok(path)
    }

    fn operand(&mut self) -> Result<Operand> {
        match self.next() {
            Some(Token::Str(s)) => Ok(Operand::Literal(Value::String(s))),
            Some(Token::Number(n)) => Ok(Operand::Literal(n)),
            Some(Token::Word(w)) if w.eq_ignore_ascii_case("true") => {
                Ok(Operand::Literal(Value::Bool(true)))
            }
            Some(Token::Word(w)) if w.eq_ignore_ascii_case("false") => {
                Ok(Operand::Literal(Value::Bool(false)))
            }
            Some(Token::Word(w)) if w.eq_ignore_ascii_case("null") => {
                Ok(Operand::Literal(Value::Null))
            }
            Some(Token::Param(p)) => match p.parse::<usize>() {
                Ok(0) => Err(Error::InvalidQuery("positional parameters start at $1".into())),
                Ok(n) => Ok(Operand::Positional(n)),
                Err(_) => Ok(Operand::Named(p)),
            },
            other => Err(Error::InvalidQuery(format!(
                "expected value, found {:?}",
                other
            ))),
        }
    }
}

/// Parse a statement.
pub fn parse(statement: &str) -> Result<SelectStatement> {
    let mut parser = Parser {
        tokens: tokenize(statement)?,
        pos: 0,
    };

    parser.expect_keyword("select")?;
    match parser.next() {
        Some(Token::Star) => {}
        other => {
            return Err(Error::InvalidQuery(format!(
                "only SELECT * is supported, found {:?}",
                other
            )))
        }
    }
    parser.expect_keyword("from")?;
    let bucket = parser.identifier()?;

    let mut predicates = Vec::new();
    if parser.at_keyword("where") {
        parser.next();
        loop {
            let path = parser.path()?;
            match parser.next() {
                Some(Token::Eq) => {}
                other => {
                    return Err(Error::InvalidQuery(format!(
                        "only equality predicates are supported, found {:?}",
                        other
                    )))
                }
            }
            let operand = parser.operand()?;
            predicates.push(Predicate { path, operand });
            if parser.at_keyword("and") {
                parser.next();
            } else {
                break;
            }
        }
    }

    if parser.peek() == Some(&Token::Semicolon) {
        parser.next();
    }
    if let Some(extra) = parser.peek() {
        return Err(Error::InvalidQuery(format!(
            "unexpected trailing input {:?}",
            extra
        )));
    }

    Ok(SelectStatement { bucket, predicates })
}
