//! A small AQL subset for the in-process backend.
//!
//! Supported forms (keywords are case-insensitive, `//` starts a comment):
//!
//! ```text
//! FOR v IN <collection | @@bind>
//!     [FILTER v.field (== | !=) <literal | @bind>]...
//!     [SORT (v.field | RAND()) [ASC | DESC]]...
//!     [LIMIT [<offset>,] <count>]...
//!     RETURN v[.field...]
//!
//! RETURN LENGTH(<collection | @@bind>)
//! ```
//!
//! Clauses apply in the order written. Errors carry the same wording the
//! database server uses so clients see identical `arango_message` values
//! whichever backend is configured.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use docgate_core::{BackendError, BackendResult, BindVars};
use rand::seq::SliceRandom;
use serde_json::{Number, Value};

use super::Collection;

// =============================================================================
// Tokens
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Bind(String),
    CollectionBind(String),
    Str(String),
    Num(Number),
    Dot,
    Comma,
    LParen,
    RParen,
    Eq,
    NotEq,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Ident(s) => format!("identifier '{}'", s),
            Token::Bind(s) => format!("bind parameter '@{}'", s),
            Token::CollectionBind(s) => format!("bind parameter '@@{}'", s),
            Token::Str(_) => "quoted string".to_string(),
            Token::Num(_) => "number".to_string(),
            Token::Dot => "'.'".to_string(),
            Token::Comma => "','".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::Eq => "'=='".to_string(),
            Token::NotEq => "'!='".to_string(),
        }
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Token::Ident(s) if s.eq_ignore_ascii_case(keyword))
    }
}

#[derive(Debug, Clone)]
struct Spanned {
    token: Token,
    offset: usize,
}

fn syntax_error(src: &str, offset: usize, unexpected: &str) -> BackendError {
    let before = &src[..offset.min(src.len())];
    let line = before.matches('\n').count() + 1;
    let column = before.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
    let near: String = src[offset.min(src.len())..].chars().take(32).collect();
    BackendError::query(format!(
        "AQL: syntax error, unexpected {} near '{}' at position {}:{} (while parsing)",
        unexpected,
        near.trim_end(),
        line,
        column
    ))
}

fn tokenize(src: &str) -> BackendResult<Vec<Spanned>> {
    let chars: Vec<(usize, char)> = src.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    let ident_end = |mut j: usize| {
        while j < chars.len() && (chars[j].1.is_ascii_alphanumeric() || chars[j].1 == '_') {
            j += 1;
        }
        j
    };
    let slice = |from: usize, to: usize| {
        let start = chars.get(from).map_or(src.len(), |c| c.0);
        let end = chars.get(to).map_or(src.len(), |c| c.0);
        &src[start..end]
    };

    while i < chars.len() {
        let (offset, c) = chars[i];
        let next = chars.get(i + 1).map(|c| c.1);

        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c == '/' && next == Some('/') {
            while i < chars.len() && chars[i].1 != '\n' {
                i += 1;
            }
            continue;
        }

        let token = if c.is_ascii_alphabetic() || c == '_' {
            let end = ident_end(i + 1);
            let token = Token::Ident(slice(i, end).to_string());
            i = end;
            token
        } else if c == '@' {
            let collection = next == Some('@');
            let start = if collection { i + 2 } else { i + 1 };
            let end = ident_end(start);
            if end == start {
                return Err(syntax_error(src, offset, "'@'"));
            }
            let name = slice(start, end).to_string();
            i = end;
            if collection {
                Token::CollectionBind(name)
            } else {
                Token::Bind(name)
            }
        } else if c == '"' || c == '\'' {
            let mut value = String::new();
            let mut j = i + 1;
            loop {
                match chars.get(j).map(|c| c.1) {
                    None => return Err(syntax_error(src, offset, "unterminated string")),
                    Some(q) if q == c => break,
                    Some('\\') => {
                        let escaped = chars.get(j + 1).map(|c| c.1);
                        value.push(match escaped {
                            Some('n') => '\n',
                            Some('t') => '\t',
                            Some(other) => other,
                            None => return Err(syntax_error(src, offset, "unterminated string")),
                        });
                        j += 2;
                    }
                    Some(other) => {
                        value.push(other);
                        j += 1;
                    }
                }
            }
            i = j + 1;
            Token::Str(value)
        } else if c.is_ascii_digit() || (c == '-' && next.is_some_and(|n| n.is_ascii_digit())) {
            let mut j = i + 1;
            while j < chars.len() && (chars[j].1.is_ascii_digit() || chars[j].1 == '.') {
                j += 1;
            }
            let text = slice(i, j);
            let number = if text.contains('.') {
                text.parse::<f64>().ok().and_then(Number::from_f64)
            } else {
                text.parse::<i64>().ok().map(Number::from)
            };
            let number = number.ok_or_else(|| syntax_error(src, offset, "number"))?;
            i = j;
            Token::Num(number)
        } else {
            let (token, width) = match (c, next) {
                ('=', Some('=')) => (Token::Eq, 2),
                ('!', Some('=')) => (Token::NotEq, 2),
                ('.', _) => (Token::Dot, 1),
                (',', _) => (Token::Comma, 1),
                ('(', _) => (Token::LParen, 1),
                (')', _) => (Token::RParen, 1),
                _ => return Err(syntax_error(src, offset, &format!("'{}'", c))),
            };
            i += width;
            token
        };
        tokens.push(Spanned { token, offset });
    }
    Ok(tokens)
}

// =============================================================================
// Plan
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Source {
    Named(String),
    /// Name of the bind variable, including its leading `@`.
    Bind(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Literal(Value),
    Bind(String),
}

#[derive(Debug, Clone, PartialEq)]
enum SortKey {
    Path(Vec<String>),
    Random,
}

#[derive(Debug, Clone, PartialEq)]
enum Step {
    Filter {
        path: Vec<String>,
        negate: bool,
        value: Operand,
    },
    Sort {
        key: SortKey,
        descending: bool,
    },
    Limit {
        offset: Option<Operand>,
        count: Operand,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum Plan {
    Scan {
        source: Source,
        steps: Vec<Step>,
        projection: Vec<String>,
    },
    Length {
        source: Source,
    },
}

/// Rows produced by one execution plus scan counters for the stats block.
#[derive(Debug)]
pub(super) struct Execution {
    pub rows: Vec<Value>,
    pub scanned: u64,
    pub filtered: u64,
}

/// A parsed query with its declared bind parameters.
#[derive(Debug)]
pub(super) struct Query {
    plan: Plan,
    declared: BTreeSet<String>,
}

impl Query {
    /// Parse `src`.
    pub(super) fn parse(src: &str) -> BackendResult<Self> {
        let tokens = tokenize(src)?;
        Parser {
            src,
            tokens,
            pos: 0,
            declared: BTreeSet::new(),
        }
        .parse()
    }

    /// Check that `vars` supplies exactly the declared bind parameters.
    pub(super) fn check_binds(&self, vars: &BindVars) -> BackendResult<()> {
        if let Some(extra) = vars.keys().find(|k| !self.declared.contains(k.as_str())) {
            return Err(BackendError::query(format!(
                "AQL: bind parameter '{}' was not declared in the query (while parsing)",
                extra
            )));
        }
        if let Some(missing) = self.declared.iter().find(|d| !vars.contains_key(d.as_str())) {
            return Err(BackendError::query(format!(
                "AQL: no value specified for declared bind parameter '{}' (while parsing)",
                missing
            )));
        }
        Ok(())
    }

    /// Evaluate against `collections`.
    pub(super) fn run(
        &self,
        vars: &BindVars,
        collections: &HashMap<String, Collection>,
    ) -> BackendResult<Execution> {
        self.check_binds(vars)?;
        match &self.plan {
            Plan::Length { source } => {
                let collection = resolve_collection(source, vars, collections)?;
                let len = collection.docs.len() as u64;
                Ok(Execution {
                    rows: vec![Value::from(len)],
                    scanned: len,
                    filtered: 0,
                })
            }
            Plan::Scan {
                source,
                steps,
                projection,
            } => {
                let collection = resolve_collection(source, vars, collections)?;
                let mut rows: Vec<Value> = collection
                    .docs
                    .values()
                    .map(|doc| Value::Object(doc.clone()))
                    .collect();
                let scanned = rows.len() as u64;
                let mut filtered = 0;

                for step in steps {
                    match step {
                        Step::Filter {
                            path,
                            negate,
                            value,
                        } => {
                            let expected = resolve_operand(value, vars);
                            let before = rows.len();
                            rows.retain(|row| {
                                let equal =
                                    compare(lookup(row, path), Some(expected)) == Ordering::Equal;
                                equal != *negate
                            });
                            filtered += (before - rows.len()) as u64;
                        }
                        Step::Sort {
                            key: SortKey::Random,
                            ..
                        } => rows.shuffle(&mut rand::thread_rng()),
                        Step::Sort {
                            key: SortKey::Path(path),
                            descending,
                        } => rows.sort_by(|a, b| {
                            let ord = compare(lookup(a, path), lookup(b, path));
                            if *descending {
                                ord.reverse()
                            } else {
                                ord
                            }
                        }),
                        Step::Limit { offset, count } => {
                            let skip = match offset {
                                Some(o) => limit_value(resolve_operand(o, vars))?,
                                None => 0,
                            };
                            let take = limit_value(resolve_operand(count, vars))?;
                            rows = rows.into_iter().skip(skip).take(take).collect();
                        }
                    }
                }

                if !projection.is_empty() {
                    rows = rows
                        .iter()
                        .map(|row| lookup(row, projection).cloned().unwrap_or(Value::Null))
                        .collect();
                }
                Ok(Execution {
                    rows,
                    scanned,
                    filtered,
                })
            }
        }
    }
}

fn resolve_collection<'a>(
    source: &Source,
    vars: &BindVars,
    collections: &'a HashMap<String, Collection>,
) -> BackendResult<&'a Collection> {
    let name = match source {
        Source::Named(name) => name.as_str(),
        Source::Bind(bind) => match vars.get(bind) {
            Some(Value::String(name)) if !name.is_empty() => name.as_str(),
            _ => {
                return Err(BackendError::query(format!(
                    "AQL: bind parameter '{}' has an invalid value or type (while parsing)",
                    bind
                )))
            }
        },
    };
    collections.get(name).ok_or_else(|| {
        BackendError::query(format!(
            "AQL: collection or view not found: {} (while parsing)",
            name
        ))
    })
}

static NULL: Value = Value::Null;

fn resolve_operand<'a>(operand: &'a Operand, vars: &'a BindVars) -> &'a Value {
    match operand {
        Operand::Literal(value) => value,
        // Presence is checked by `check_binds` before evaluation.
        Operand::Bind(name) => vars.get(name).unwrap_or(&NULL),
    }
}

fn limit_value(value: &Value) -> BackendResult<usize> {
    value
        .as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| {
            BackendError::query(
                "AQL: LIMIT value is not a number or out of range (while executing)",
            )
        })
}

fn lookup<'a>(row: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(row, |value, field| value.get(field))
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over JSON values: null < bool < number < string < array < object.
/// A missing attribute compares as null.
fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.unwrap_or(&NULL);
    let b = b.unwrap_or(&NULL);
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x
            .iter()
            .zip(y)
            .map(|(l, r)| compare(Some(l), Some(r)))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        (Value::Object(x), Value::Object(y)) => {
            let keys: BTreeSet<&String> = x.keys().chain(y.keys()).collect();
            keys.into_iter()
                .map(|k| compare(x.get(k), y.get(k)))
                .find(|o| *o != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

// =============================================================================
// Parser
// =============================================================================

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Spanned>,
    pos: usize,
    declared: BTreeSet<String>,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn unexpected(&self) -> BackendError {
        match self.tokens.get(self.pos) {
            Some(s) => syntax_error(self.src, s.offset, &s.token.describe()),
            None => syntax_error(self.src, self.src.len(), "end of query string"),
        }
    }

    fn advance(&mut self) -> BackendResult<Token> {
        let token = self.peek().cloned().ok_or_else(|| self.unexpected())?;
        self.pos += 1;
        Ok(token)
    }

    fn keyword(&mut self, keyword: &str) -> bool {
        let found = self.peek().is_some_and(|t| t.is_keyword(keyword));
        if found {
            self.pos += 1;
        }
        found
    }

    fn expect_keyword(&mut self, keyword: &str) -> BackendResult<()> {
        if self.keyword(keyword) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn expect(&mut self, token: Token) -> BackendResult<()> {
        if self.peek() == Some(&token) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn ident(&mut self) -> BackendResult<String> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.unexpected()),
        }
    }

    fn parse(mut self) -> BackendResult<Query> {
        let plan = if self.keyword("FOR") {
            self.parse_scan()?
        } else if self.keyword("RETURN") {
            if !self.keyword("LENGTH") && !self.keyword("COUNT") {
                return Err(self.unexpected());
            }
            self.expect(Token::LParen)?;
            let source = self.parse_source()?;
            self.expect(Token::RParen)?;
            Plan::Length { source }
        } else {
            return Err(self.unexpected());
        };

        if self.pos < self.tokens.len() {
            return Err(self.unexpected());
        }
        Ok(Query {
            plan,
            declared: self.declared,
        })
    }

    fn parse_scan(&mut self) -> BackendResult<Plan> {
        let var = self.ident()?;
        self.expect_keyword("IN")?;
        let source = self.parse_source()?;

        let mut steps = Vec::new();
        loop {
            if self.keyword("FILTER") {
                let path = self.parse_path(&var)?;
                let negate = match self.advance()? {
                    Token::Eq => false,
                    Token::NotEq => true,
                    _ => {
                        self.pos -= 1;
                        return Err(self.unexpected());
                    }
                };
                let value = self.parse_operand()?;
                steps.push(Step::Filter {
                    path,
                    negate,
                    value,
                });
            } else if self.keyword("SORT") {
                let key = if self.keyword("RAND") {
                    self.expect(Token::LParen)?;
                    self.expect(Token::RParen)?;
                    SortKey::Random
                } else {
                    SortKey::Path(self.parse_path(&var)?)
                };
                let descending = if self.keyword("DESC") {
                    true
                } else {
                    self.keyword("ASC");
                    false
                };
                steps.push(Step::Sort { key, descending });
            } else if self.keyword("LIMIT") {
                let first = self.parse_operand()?;
                let step = if self.peek() == Some(&Token::Comma) {
                    self.pos += 1;
                    Step::Limit {
                        offset: Some(first),
                        count: self.parse_operand()?,
                    }
                } else {
                    Step::Limit {
                        offset: None,
                        count: first,
                    }
                };
                steps.push(step);
            } else {
                break;
            }
        }

        self.expect_keyword("RETURN")?;
        let projection = self.parse_path(&var)?;
        Ok(Plan::Scan {
            source,
            steps,
            projection,
        })
    }

    fn parse_source(&mut self) -> BackendResult<Source> {
        match self.advance()? {
            Token::Ident(name) => Ok(Source::Named(name)),
            Token::CollectionBind(name) => {
                let bind = format!("@{}", name);
                self.declared.insert(bind.clone());
                Ok(Source::Bind(bind))
            }
            _ => {
                self.pos -= 1;
                Err(self.unexpected())
            }
        }
    }

    /// `var(.field)*`; returns the fields after `var`.
    fn parse_path(&mut self, var: &str) -> BackendResult<Vec<String>> {
        let name = self.ident()?;
        if name != var {
            return Err(BackendError::query(format!(
                "AQL: variable '{}' is not known (while parsing)",
                name
            )));
        }
        let mut path = Vec::new();
        while self.peek() == Some(&Token::Dot) {
            self.pos += 1;
            path.push(self.ident()?);
        }
        Ok(path)
    }

    fn parse_operand(&mut self) -> BackendResult<Operand> {
        let operand = match self.advance()? {
            Token::Str(s) => Operand::Literal(Value::String(s)),
            Token::Num(n) => Operand::Literal(Value::Number(n)),
            Token::Ident(word) if word.eq_ignore_ascii_case("true") => {
                Operand::Literal(Value::Bool(true))
            }
            Token::Ident(word) if word.eq_ignore_ascii_case("false") => {
                Operand::Literal(Value::Bool(false))
            }
            Token::Ident(word) if word.eq_ignore_ascii_case("null") => {
                Operand::Literal(Value::Null)
            }
            Token::Bind(name) => {
                self.declared.insert(name.clone());
                Operand::Bind(name)
            }
            _ => {
                self.pos -= 1;
                return Err(self.unexpected());
            }
        };
        Ok(operand)
    }
}
