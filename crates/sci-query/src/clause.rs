//! WHERE clause model.
//!
//! Every fluent `where_*` call reduces to one [`Node`]. A node either carries
//! one or more conditions joined by its [`MatchMode`], or opens/closes a
//! parenthesised group.

use std::fmt;

use crate::{query::Query, value::SqlValue};

/// Boolean connective placed before a node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Joiner {
    #[default]
    And,
    Or,
}

impl Joiner {
    pub fn as_str(self) -> &'static str {
        match self {
            Joiner::And => "AND",
            Joiner::Or => "OR",
        }
    }
}

/// How the conditions of a single multi-pair call combine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MatchMode {
    /// Every pair must hold (`AND`).
    #[default]
    All,
    /// At least one pair must hold (`OR`).
    Any,
}

impl MatchMode {
    pub fn joiner(self) -> Joiner {
        match self {
            MatchMode::All => Joiner::And,
            MatchMode::Any => Joiner::Or,
        }
    }
}

/// Joiner and negation applied to one clause node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClauseOptions {
    pub joiner: Joiner,
    pub negate: bool,
}

impl ClauseOptions {
    pub fn and() -> Self {
        Self::default()
    }

    pub fn or() -> Self {
        Self {
            joiner: Joiner::Or,
            negate: false,
        }
    }

    pub fn negated(mut self) -> Self {
        self.negate = true;
        self
    }
}

/// Comparison operators accepted by predicates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
    Like,
    NotLike,
}

impl Operator {
    /// Parses an SQL operator token, case-insensitively for keywords.
    pub fn parse(token: &str) -> Option<Self> {
        let op = match token.trim().to_ascii_uppercase().as_str() {
            "=" | "==" => Operator::Eq,
            "!=" | "<>" => Operator::NotEq,
            "<" => Operator::Lt,
            "<=" => Operator::Lte,
            ">" => Operator::Gt,
            ">=" => Operator::Gte,
            "LIKE" => Operator::Like,
            "NOT LIKE" => Operator::NotLike,
            _ => return None,
        };
        Some(op)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::NotEq => "!=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// LIKE pattern shapes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pattern {
    /// `%x%`
    Contains,
    /// `n` single-character wildcards, then `x%`
    ContainsAt(usize),
    /// `x%`
    StartsWith,
    /// `%x`
    EndsWith,
    /// `x`, used as given
    Exact,
}

impl Pattern {
    pub fn apply(self, value: &str) -> String {
        match self {
            Pattern::Contains => format!("%{value}%"),
            Pattern::ContainsAt(offset) => format!("{}{value}%", "_".repeat(offset)),
            Pattern::StartsWith => format!("{value}%"),
            Pattern::EndsWith => format!("%{value}"),
            Pattern::Exact => value.to_string(),
        }
    }
}

/// One `column op value` pair. A missing column means the primary key.
#[derive(Clone, Debug, PartialEq)]
pub struct Predicate {
    pub(crate) column: Option<String>,
    pub(crate) op: Operator,
    pub(crate) value: SqlValue,
}

impl Predicate {
    pub fn new(column: impl Into<String>, op: Operator, value: impl Into<SqlValue>) -> Self {
        Self {
            column: Some(column.into()),
            op,
            value: value.into(),
        }
    }
}

/// Normalized argument list for the `where_*` family.
///
/// Accepts `(column, value)`, `(column, "op", value)`, lists of either, or a
/// bare value compared against the primary key. An unknown operator is kept
/// as an error and reported when the query is compiled.
#[derive(Clone, Debug, Default)]
pub struct Predicates {
    pub(crate) items: Vec<Predicate>,
    pub(crate) error: Option<String>,
}

impl Predicates {
    pub fn new() -> Self {
        Self::default()
    }

    /// `primary_key = value`
    pub fn key(value: impl Into<SqlValue>) -> Self {
        Self {
            items: vec![Predicate {
                column: None,
                op: Operator::Eq,
                value: value.into(),
            }],
            error: None,
        }
    }

    pub fn eq(self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.push(Predicate::new(column, Operator::Eq, value))
    }

    pub fn cmp(mut self, column: impl Into<String>, op: &str, value: impl Into<SqlValue>) -> Self {
        match Operator::parse(op) {
            Some(op) => self.push(Predicate::new(column, op, value)),
            None => {
                let column = column.into();
                self.error
                    .get_or_insert_with(|| format!("unknown operator `{op}` for column `{column}`"));
                self
            }
        }
    }

    pub fn push(mut self, predicate: Predicate) -> Self {
        self.items.push(predicate);
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl From<Predicate> for Predicates {
    fn from(predicate: Predicate) -> Self {
        Predicates::new().push(predicate)
    }
}

impl<C: Into<String>, V: Into<SqlValue>> From<(C, V)> for Predicates {
    fn from((column, value): (C, V)) -> Self {
        Predicates::new().eq(column, value)
    }
}

impl<'a, C: Into<String>, V: Into<SqlValue>> From<(C, &'a str, V)> for Predicates {
    fn from((column, op, value): (C, &'a str, V)) -> Self {
        Predicates::new().cmp(column, op, value)
    }
}

impl<C: Into<String>, V: Into<SqlValue>> From<Vec<(C, V)>> for Predicates {
    fn from(pairs: Vec<(C, V)>) -> Self {
        pairs
            .into_iter()
            .fold(Predicates::new(), |acc, (column, value)| acc.eq(column, value))
    }
}

impl<C: Into<String>, V: Into<SqlValue>, const N: usize> From<[(C, V); N]> for Predicates {
    fn from(pairs: [(C, V); N]) -> Self {
        pairs
            .into_iter()
            .fold(Predicates::new(), |acc, (column, value)| acc.eq(column, value))
    }
}

impl<'a, C: Into<String>, V: Into<SqlValue>> From<Vec<(C, &'a str, V)>> for Predicates {
    fn from(triples: Vec<(C, &'a str, V)>) -> Self {
        triples
            .into_iter()
            .fold(Predicates::new(), |acc, (column, op, value)| {
                acc.cmp(column, op, value)
            })
    }
}

impl<'a, C: Into<String>, V: Into<SqlValue>, const N: usize> From<[(C, &'a str, V); N]>
    for Predicates
{
    fn from(triples: [(C, &'a str, V); N]) -> Self {
        triples
            .into_iter()
            .fold(Predicates::new(), |acc, (column, op, value)| {
                acc.cmp(column, op, value)
            })
    }
}

macro_rules! impl_key_predicates {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Predicates {
                fn from(value: $ty) -> Self {
                    Predicates::key(value)
                }
            }
        )*
    };
}

impl_key_predicates!(i32, i64, u32, &str, String);

/// Members of an `IN` set.
#[derive(Clone, Debug)]
pub(crate) enum SetSource {
    Values(Vec<SqlValue>),
    Query(Box<Query>),
}

/// A single condition inside a node.
#[derive(Clone, Debug)]
pub(crate) enum Condition {
    Compare {
        column: String,
        op: Operator,
        value: SqlValue,
    },
    Raw {
        sql: String,
        bind: Option<SqlValue>,
    },
    In {
        column: String,
        not_in: bool,
        set: SetSource,
    },
    Like {
        column: String,
        pattern: String,
        not_like: bool,
    },
}

#[derive(Clone, Debug)]
pub(crate) enum Node {
    Conditions {
        joiner: Joiner,
        negate: bool,
        mode: MatchMode,
        items: Vec<Condition>,
    },
    GroupOpen {
        joiner: Joiner,
        negate: bool,
    },
    GroupClose,
}
