//! Parser and evaluator for the `where` query parameter.
//!
//! Grammar accepted:
//!
//! ```text
//! expr := term (("~and" | "~or") term)*
//! term := "~not" term | "(" expr ")" | "(" column "," op ["," value]* ")"
//! ```
//!
//! Connectives are applied left to right without precedence; callers nest
//! groups to force an order. Date operators (`isWithin`) are rejected.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use crate::error::ApiError;

type Record = Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Condition(Condition),
    Not(Box<Node>),
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
}

impl Node {
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Node::Condition(c) => c.matches(record),
            Node::Not(inner) => !inner.matches(record),
            Node::And(a, b) => a.matches(record) && b.matches(record),
            Node::Or(a, b) => a.matches(record) || b.matches(record),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Neq,
    Gt,
    Ge,
    Lt,
    Le,
    Is,
    IsNot,
    In,
    Btw,
    Nbtw,
    Like,
    Nlike,
    AllOf,
    AnyOf,
    NAllOf,
    NAnyOf,
}

impl Op {
    fn parse(raw: &str) -> Result<Self, ApiError> {
        Ok(match raw {
            "eq" => Op::Eq,
            "neq" => Op::Neq,
            "gt" => Op::Gt,
            "ge" => Op::Ge,
            "lt" => Op::Lt,
            "le" => Op::Le,
            "is" => Op::Is,
            "isnot" => Op::IsNot,
            "in" => Op::In,
            "btw" => Op::Btw,
            "nbtw" => Op::Nbtw,
            "like" => Op::Like,
            "nlike" => Op::Nlike,
            "allof" => Op::AllOf,
            "anyof" => Op::AnyOf,
            "nallof" => Op::NAllOf,
            "nanyof" => Op::NAnyOf,
            other => return Err(ApiError::bad_request(format!("'{other}' is not supported"))),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: String,
    pub op: Op,
    pub values: Vec<String>,
}

impl Condition {
    fn parse(raw: &str) -> Result<Self, ApiError> {
        let mut parts = raw.split(',');
        let column = parts.next().unwrap_or_default().trim();
        if column.is_empty() {
            return Err(ApiError::bad_request(format!("missing column in '({raw})'")));
        }
        let op = parts
            .next()
            .ok_or_else(|| ApiError::bad_request(format!("missing operator in '({raw})'")))?;
        Ok(Self {
            column: column.to_string(),
            op: Op::parse(op.trim())?,
            values: parts.map(str::to_string).collect(),
        })
    }

    pub fn matches(&self, record: &Record) -> bool {
        let cell = record.get(&self.column).unwrap_or(&Value::Null);
        let first = self.values.first().map(String::as_str).unwrap_or_default();
        match self.op {
            Op::Eq => equals(cell, first),
            Op::Neq => !equals(cell, first),
            Op::Gt => compare(cell, first) == Some(Ordering::Greater),
            Op::Ge => matches!(compare(cell, first), Some(Ordering::Greater | Ordering::Equal)),
            Op::Lt => compare(cell, first) == Some(Ordering::Less),
            Op::Le => matches!(compare(cell, first), Some(Ordering::Less | Ordering::Equal)),
            Op::Is => is(cell, first),
            Op::IsNot => !is(cell, first),
            Op::In => self.values.iter().any(|v| equals(cell, v)),
            Op::Btw => self.between(cell),
            Op::Nbtw => !self.between(cell),
            Op::Like => like(&text(cell), first),
            Op::Nlike => !like(&text(cell), first),
            Op::AllOf => {
                let options = options(cell);
                self.values.iter().all(|v| options.contains(&v.trim()))
            }
            Op::AnyOf => {
                let options = options(cell);
                self.values.iter().any(|v| options.contains(&v.trim()))
            }
            Op::NAllOf => {
                let options = options(cell);
                !self.values.iter().all(|v| options.contains(&v.trim()))
            }
            Op::NAnyOf => {
                let options = options(cell);
                !self.values.iter().any(|v| options.contains(&v.trim()))
            }
        }
    }

    fn between(&self, cell: &Value) -> bool {
        let [min, max] = self.values.as_slice() else {
            return false;
        };
        matches!(compare(cell, min), Some(Ordering::Greater | Ordering::Equal))
            && matches!(compare(cell, max), Some(Ordering::Less | Ordering::Equal))
    }
}

/// Parse a full `where` expression.
pub fn parse(input: &str) -> Result<Node, ApiError> {
    let mut parser = Parser { src: input, pos: 0 };
    let node = parser.expr()?;
    if parser.pos != input.len() {
        return Err(ApiError::bad_request(format!(
            "unexpected input at position {} in where clause",
            parser.pos
        )));
    }
    Ok(node)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn rest(&self) -> &str {
        &self.src[self.pos..]
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn expr(&mut self) -> Result<Node, ApiError> {
        let mut left = self.term()?;
        loop {
            if self.eat("~and") {
                left = Node::And(Box::new(left), Box::new(self.term()?));
            } else if self.eat("~or") {
                left = Node::Or(Box::new(left), Box::new(self.term()?));
            } else {
                return Ok(left);
            }
        }
    }

    fn term(&mut self) -> Result<Node, ApiError> {
        if self.eat("~not") {
            return Ok(Node::Not(Box::new(self.term()?)));
        }
        if !self.eat("(") {
            return Err(ApiError::bad_request(format!(
                "expected '(' at position {} in where clause",
                self.pos
            )));
        }
        if self.rest().starts_with('(') || self.rest().starts_with('~') {
            let inner = self.expr()?;
            if !self.eat(")") {
                return Err(ApiError::bad_request("unclosed group in where clause"));
            }
            return Ok(inner);
        }
        let end = self
            .rest()
            .find(')')
            .ok_or_else(|| ApiError::bad_request("unclosed condition in where clause"))?;
        let condition = Condition::parse(&self.rest()[..end])?;
        self.pos += end + 1;
        Ok(Node::Condition(condition))
    }
}

/// Display form of a cell used for text operators.
fn text(cell: &Value) -> String {
    match cell {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn equals(cell: &Value, value: &str) -> bool {
    match cell {
        Value::Bool(b) => value.eq_ignore_ascii_case(&b.to_string()),
        _ => compare(cell, value) == Some(Ordering::Equal),
    }
}

/// Numeric comparison when both sides are numbers, text otherwise. Null
/// cells compare with nothing.
fn compare(cell: &Value, value: &str) -> Option<Ordering> {
    match cell {
        Value::Null => None,
        Value::Number(n) => {
            let lhs = n.as_f64()?;
            match value.trim().parse::<f64>() {
                Ok(rhs) => lhs.partial_cmp(&rhs),
                Err(_) => Some(text(cell).as_str().cmp(value)),
            }
        }
        _ => Some(text(cell).as_str().cmp(value)),
    }
}

fn is(cell: &Value, value: &str) -> bool {
    match value {
        "null" => cell.is_null(),
        "notnull" => !cell.is_null(),
        "true" | "checked" => cell == &Value::Bool(true),
        "false" | "notchecked" => cell.is_null() || cell == &Value::Bool(false),
        "empty" | "blank" => cell.is_null() || cell == &Value::String(String::new()),
        "notempty" | "notblank" => !(cell.is_null() || cell == &Value::String(String::new())),
        _ => false,
    }
}

/// Case-insensitive `like`. `%` is a wildcard; a pattern without one
/// matches anywhere in the text.
fn like(text: &str, pattern: &str) -> bool {
    let text = text.to_lowercase();
    let pattern = pattern.to_lowercase();
    if !pattern.contains('%') {
        return text.contains(&pattern);
    }

    let anchored_start = !pattern.starts_with('%');
    let anchored_end = !pattern.ends_with('%');
    let pieces: Vec<&str> = pattern.split('%').filter(|p| !p.is_empty()).collect();

    let mut cursor = 0;
    for (i, piece) in pieces.iter().enumerate() {
        if i == 0 && anchored_start {
            if !text.starts_with(piece) {
                return false;
            }
            cursor = piece.len();
            continue;
        }
        match text[cursor..].find(piece) {
            Some(found) => cursor += found + piece.len(),
            None => return false,
        }
    }
    if anchored_end {
        return pieces.last().is_none_or(|last| text.ends_with(last));
    }
    true
}

/// Options of a multi-select cell (`"a,b,c"`).
fn options(cell: &Value) -> Vec<&str> {
    match cell {
        Value::String(s) => s.split(',').map(str::trim).filter(|s| !s.is_empty()).collect(),
        _ => Vec::new(),
    }
}
