//! Filter expression grammar and evaluator.
//!
//! ```text
//! expr    := or
//! or      := and ( "||" and )*
//! and     := unary ( "&&" unary )*
//! unary   := "!" unary | primary
//! primary := "(" expr ")" | field op literal
//! op      := "==" | "!=" | "<" | "<=" | ">" | ">="
//! literal := integer | '"' text '"' | "'" text "'"
//! ```
//!
//! Fields are derived from one instant in UTC. `weekday` accepts a day name
//! (case-insensitive, full or abbreviated) or a number with Sunday = 0.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};

use super::FilterError;

/// A value derived from the instant under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// Unix seconds.
    Date,
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    /// Days since Sunday.
    Weekday,
}

impl Field {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "date" => Self::Date,
            "year" => Self::Year,
            "month" => Self::Month,
            "day" => Self::Day,
            "hour" => Self::Hour,
            "minute" => Self::Minute,
            "second" => Self::Second,
            "weekday" => Self::Weekday,
            _ => return None,
        })
    }

    fn value(self, instant: i64, at: Option<&DateTime<Utc>>) -> Option<i64> {
        match self {
            Self::Date => Some(instant),
            Self::Year => at.map(|t| i64::from(t.year())),
            Self::Month => at.map(|t| i64::from(t.month())),
            Self::Day => at.map(|t| i64::from(t.day())),
            Self::Hour => at.map(|t| i64::from(t.hour())),
            Self::Minute => at.map(|t| i64::from(t.minute())),
            Self::Second => at.map(|t| i64::from(t.second())),
            Self::Weekday => at.map(|t| i64::from(t.weekday().num_days_from_sunday())),
        }
    }
}

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    const fn apply(self, lhs: i64, rhs: i64) -> bool {
        match self {
            Self::Eq => lhs == rhs,
            Self::Ne => lhs != rhs,
            Self::Lt => lhs < rhs,
            Self::Le => lhs <= rhs,
            Self::Gt => lhs > rhs,
            Self::Ge => lhs >= rhs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Compare { field: Field, op: CmpOp, value: i64 },
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
    Not(Box<Node>),
}

impl Node {
    fn eval(&self, instant: i64, at: Option<&DateTime<Utc>>) -> bool {
        match self {
            Self::Compare { field, op, value } => field
                .value(instant, at)
                .is_some_and(|lhs| op.apply(lhs, *value)),
            Self::And(lhs, rhs) => lhs.eval(instant, at) && rhs.eval(instant, at),
            Self::Or(lhs, rhs) => lhs.eval(instant, at) || rhs.eval(instant, at),
            Self::Not(inner) => !inner.eval(instant, at),
        }
    }
}

/// A parsed filter, evaluated against one instant at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterExpression {
    source: String,
    root: Node,
}

impl FilterExpression {
    /// Parses a compiled filter (date literals already turned into seconds).
    pub fn parse(source: &str) -> Result<Self, FilterError> {
        let tokens = tokenize(source)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            end: source.len(),
        };
        let root = parser.expr()?;
        if let Some((offset, token)) = parser.tokens.get(parser.pos) {
            return Err(error(*offset, format!("unexpected {token}")));
        }
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluates the filter for an instant given in Unix seconds.
    pub fn matches(&self, instant: i64) -> bool {
        let at = DateTime::<Utc>::from_timestamp(instant, 0);
        self.root.eval(instant, at.as_ref())
    }
}

impl FromStr for FilterExpression {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FilterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn error(offset: usize, message: impl Into<String>) -> FilterError {
    FilterError::Compilation {
        offset,
        message: message.into(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Int(i64),
    Str(String),
    Op(CmpOp),
    And,
    Or,
    Not,
    LParen,
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(name) => write!(f, "identifier `{name}`"),
            Self::Int(value) => write!(f, "number {value}"),
            Self::Str(text) => write!(f, "string {text:?}"),
            Self::Op(op) => write!(f, "operator {op:?}"),
            Self::And => f.write_str("`&&`"),
            Self::Or => f.write_str("`||`"),
            Self::Not => f.write_str("`!`"),
            Self::LParen => f.write_str("`(`"),
            Self::RParen => f.write_str("`)`"),
        }
    }
}

fn tokenize(source: &str) -> Result<Vec<(usize, Token)>, FilterError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let two = source.get(offset..offset + 2).unwrap_or("");
        let token = match two {
            "&&" => Some(Token::And),
            "||" => Some(Token::Or),
            "==" => Some(Token::Op(CmpOp::Eq)),
            "!=" => Some(Token::Op(CmpOp::Ne)),
            "<=" => Some(Token::Op(CmpOp::Le)),
            ">=" => Some(Token::Op(CmpOp::Ge)),
            _ => None,
        };
        if let Some(token) = token {
            chars.next();
            chars.next();
            tokens.push((offset, token));
            continue;
        }

        match c {
            '<' | '>' | '!' | '(' | ')' => {
                chars.next();
                let token = match c {
                    '<' => Token::Op(CmpOp::Lt),
                    '>' => Token::Op(CmpOp::Gt),
                    '!' => Token::Not,
                    '(' => Token::LParen,
                    _ => Token::RParen,
                };
                tokens.push((offset, token));
            }
            '"' | '\'' => {
                chars.next();
                let mut text = String::new();
                let mut closed = false;
                for (_, ch) in chars.by_ref() {
                    if ch == c {
                        closed = true;
                        break;
                    }
                    text.push(ch);
                }
                if !closed {
                    return Err(error(offset, "unterminated string"));
                }
                tokens.push((offset, Token::Str(text)));
            }
            c if c.is_ascii_digit() || c == '-' => {
                let mut text = String::new();
                text.push(c);
                chars.next();
                while let Some(&(_, d)) = chars.peek() {
                    if !d.is_ascii_digit() {
                        break;
                    }
                    text.push(d);
                    chars.next();
                }
                let value = text
                    .parse()
                    .map_err(|_| error(offset, format!("invalid number `{text}`")))?;
                tokens.push((offset, Token::Int(value)));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut name = String::new();
                while let Some(&(_, ch)) = chars.peek() {
                    if !(ch.is_ascii_alphanumeric() || ch == '_') {
                        break;
                    }
                    name.push(ch);
                    chars.next();
                }
                tokens.push((offset, Token::Ident(name)));
            }
            other => return Err(error(offset, format!("unexpected character `{other}`"))),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, token)| token)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |(offset, _)| *offset)
    }

    fn advance(&mut self) -> Option<(usize, Token)> {
        let item = self.tokens.get(self.pos).cloned();
        if item.is_some() {
            self.pos += 1;
        }
        item
    }

    fn expr(&mut self) -> Result<Node, FilterError> {
        let mut lhs = self.and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let rhs = self.and()?;
            lhs = Node::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and(&mut self) -> Result<Node, FilterError> {
        let mut lhs = self.unary()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Node::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Node, FilterError> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            return Ok(Node::Not(Box::new(self.unary()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Node, FilterError> {
        let offset = self.offset();
        match self.advance() {
            Some((_, Token::LParen)) => {
                let inner = self.expr()?;
                match self.advance() {
                    Some((_, Token::RParen)) => Ok(inner),
                    _ => Err(error(offset, "unbalanced parenthesis")),
                }
            }
            Some((_, Token::Ident(name))) => {
                let field = Field::from_name(&name)
                    .ok_or_else(|| error(offset, format!("unknown field `{name}`")))?;
                let op_offset = self.offset();
                let Some((_, Token::Op(op))) = self.advance() else {
                    return Err(error(op_offset, format!("expected comparison after `{name}`")));
                };
                let literal_offset = self.offset();
                let value = match self.advance() {
                    Some((_, literal @ (Token::Int(_) | Token::Str(_)))) => {
                        resolve(field, &name, literal, literal_offset)?
                    }
                    _ => return Err(error(literal_offset, format!("expected a value for `{name}`"))),
                };
                Ok(Node::Compare { field, op, value })
            }
            Some((_, token)) => Err(error(offset, format!("unexpected {token}"))),
            None => Err(error(offset, "expected a comparison")),
        }
    }
}

fn resolve(field: Field, name: &str, literal: Token, offset: usize) -> Result<i64, FilterError> {
    match (field, literal) {
        (Field::Weekday, Token::Str(day)) => day
            .parse::<Weekday>()
            .map(|w| i64::from(w.num_days_from_sunday()))
            .map_err(|_| error(offset, format!("unknown weekday {day:?}"))),
        (Field::Weekday, Token::Int(value)) if !(0..=6).contains(&value) => Err(error(
            offset,
            format!("weekday number must be 0 (Sunday) to 6, got {value}"),
        )),
        (_, Token::Int(value)) => Ok(value),
        (_, Token::Str(text)) => Err(error(
            offset,
            format!("`{name}` expects a number, got {text:?}"),
        )),
        (_, other) => Err(error(offset, format!("unexpected {other}"))),
    }
}
