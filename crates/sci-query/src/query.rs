//! The fluent query builder.

use sci_config::query::{QuerySettings, DEFAULT_PRIMARY_KEY};
use tracing::trace;

use crate::{
    clause::{ClauseOptions, Condition, MatchMode, Node, Pattern, Predicates, SetSource},
    compile::CompiledQuery,
    dialect::Dialect,
    error::{QueryError, Result},
    value::SqlValue,
};

/// Sort direction for `ORDER BY`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
}

impl JoinKind {
    pub fn as_str(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Join {
    pub kind: JoinKind,
    pub table: String,
    pub first: String,
    pub op: String,
    pub second: String,
}

#[derive(Clone, Debug)]
pub(crate) enum Source {
    Table(String),
    Sub { query: Box<Query>, alias: String },
}

#[derive(Clone, Debug)]
pub(crate) enum Column {
    Plain(String),
    Aliased { expr: String, alias: String },
    Sub { query: Box<Query>, alias: String },
}

/// Accumulates clauses through a fluent API and compiles them with
/// [`Query::compose_query`].
///
/// ```ignore
/// let compiled = Query::table("users")
///     .where_(("age", ">", 18))
///     .or_where(("role", "admin"))
///     .sort_by("name")
///     .limit(10)
///     .to_sql()?;
///
/// assert_eq!(
///     compiled.sql(),
///     "SELECT * FROM users WHERE age > ? OR role = ? ORDER BY `name` ASC LIMIT 10"
/// );
/// ```
#[derive(Clone, Debug)]
pub struct Query {
    pub(crate) source: Option<Source>,
    pub(crate) columns: Vec<Column>,
    pub(crate) joins: Vec<Join>,
    pub(crate) nodes: Vec<Node>,
    pub(crate) sort_column: Option<String>,
    pub(crate) direction: Direction,
    pub(crate) limit: u64,
    pub(crate) skip: u64,
    pub(crate) primary_key: String,
    pub(crate) dialect: Dialect,
    pub(crate) deferred: Option<String>,
}

impl Default for Query {
    fn default() -> Self {
        Self::new()
    }
}

impl Query {
    /// An empty query with no source; call [`from`](Self::from) before compiling.
    pub fn new() -> Self {
        Self {
            source: None,
            columns: Vec::new(),
            joins: Vec::new(),
            nodes: Vec::new(),
            sort_column: None,
            direction: Direction::Asc,
            limit: 0,
            skip: 0,
            primary_key: DEFAULT_PRIMARY_KEY.to_string(),
            dialect: Dialect::default(),
            deferred: None,
        }
    }

    pub fn table(table: impl Into<String>) -> Self {
        Self::new().from(table)
    }

    /// A query on `table` using the configured primary key and dialect.
    pub fn with_settings(table: impl Into<String>, settings: &QuerySettings) -> Self {
        Self::table(table)
            .primary_key(settings.primary_key())
            .dialect(Dialect::from(settings))
    }

    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = column.into();
        self
    }

    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn primary_key_name(&self) -> &str {
        &self.primary_key
    }

    pub fn table_name(&self) -> Option<&str> {
        match &self.source {
            Some(Source::Table(table)) => Some(table),
            _ => None,
        }
    }

    // Primitives

    /// Adds one node holding every pair in `predicates`, joined by `mode`.
    pub fn add_predicate(
        self,
        predicates: impl Into<Predicates>,
        options: ClauseOptions,
        mode: MatchMode,
    ) -> Self {
        let predicates = predicates.into();
        if let Some(err) = predicates.error {
            return self.defer(err);
        }

        let items = predicates
            .items
            .into_iter()
            .map(|p| {
                Condition::Compare {
                    column: p.column.unwrap_or_else(|| self.primary_key.clone()),
                    op: p.op,
                    value: p.value,
                }
            })
            .collect();
        self.push_conditions(options, mode, items)
    }

    /// Adds trusted SQL verbatim. When `bind` is given, the fragment must
    /// contain exactly one `?`, which is replaced by a bound parameter.
    pub fn add_raw(
        self,
        sql: impl Into<String>,
        bind: Option<SqlValue>,
        options: ClauseOptions,
    ) -> Self {
        let sql = sql.into();
        if bind.is_some() {
            let slots = sql.matches('?').count();
            if slots != 1 {
                return self.defer(format!(
                    "raw fragment `{sql}` must contain exactly one `?` to bind a value, found {slots}"
                ));
            }
        }
        self.push_conditions(options, MatchMode::All, vec![Condition::Raw { sql, bind }])
    }

    pub fn add_set_membership<I, V>(
        self,
        column: impl Into<String>,
        values: I,
        not_in: bool,
        options: ClauseOptions,
    ) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        let set = SetSource::Values(values.into_iter().map(Into::into).collect());
        self.push_conditions(
            options,
            MatchMode::All,
            vec![Condition::In {
                column: column.into(),
                not_in,
                set,
            }],
        )
    }

    pub fn add_pattern_match(
        self,
        column: impl Into<String>,
        value: &str,
        pattern: Pattern,
        options: ClauseOptions,
    ) -> Self {
        self.push_conditions(
            options,
            MatchMode::All,
            vec![Condition::Like {
                column: column.into(),
                pattern: pattern.apply(value),
                not_like: false,
            }],
        )
    }

    pub fn open_group(mut self, options: ClauseOptions) -> Self {
        self.nodes.push(Node::GroupOpen {
            joiner: options.joiner,
            negate: options.negate,
        });
        self
    }

    pub fn close_group(mut self) -> Self {
        self.nodes.push(Node::GroupClose);
        self
    }

    // Predicates

    pub fn where_(self, predicates: impl Into<Predicates>) -> Self {
        self.add_predicate(predicates, ClauseOptions::and(), MatchMode::All)
    }

    pub fn or_where(self, predicates: impl Into<Predicates>) -> Self {
        self.add_predicate(predicates, ClauseOptions::or(), MatchMode::All)
    }

    pub fn where_not(self, predicates: impl Into<Predicates>) -> Self {
        self.add_predicate(predicates, ClauseOptions::and().negated(), MatchMode::All)
    }

    pub fn or_where_not(self, predicates: impl Into<Predicates>) -> Self {
        self.add_predicate(predicates, ClauseOptions::or().negated(), MatchMode::All)
    }

    /// Pairs are joined with `OR` and wrapped in parentheses.
    pub fn where_any(self, predicates: impl Into<Predicates>) -> Self {
        self.add_predicate(predicates, ClauseOptions::and(), MatchMode::Any)
    }

    pub fn or_where_any(self, predicates: impl Into<Predicates>) -> Self {
        self.add_predicate(predicates, ClauseOptions::or(), MatchMode::Any)
    }

    pub fn where_null(self, column: impl Into<String>) -> Self {
        self.where_((column.into(), SqlValue::Null))
    }

    pub fn where_not_null(self, column: impl Into<String>) -> Self {
        self.where_((column.into(), "!=", SqlValue::Null))
    }

    // Raw

    pub fn where_raw(self, sql: impl Into<String>) -> Self {
        self.add_raw(sql, None, ClauseOptions::and())
    }

    pub fn or_where_raw(self, sql: impl Into<String>) -> Self {
        self.add_raw(sql, None, ClauseOptions::or())
    }

    pub fn where_not_raw(self, sql: impl Into<String>) -> Self {
        self.add_raw(sql, None, ClauseOptions::and().negated())
    }

    /// Raw fragment with its single `?` bound to `value`.
    pub fn where_raw_bind(self, sql: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.add_raw(sql, Some(value.into()), ClauseOptions::and())
    }

    // Set membership

    pub fn where_in<I, V>(self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        self.add_set_membership(column, values, false, ClauseOptions::and())
    }

    pub fn or_where_in<I, V>(self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        self.add_set_membership(column, values, false, ClauseOptions::or())
    }

    pub fn where_not_in<I, V>(self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        self.add_set_membership(column, values, true, ClauseOptions::and())
    }

    pub fn or_where_not_in<I, V>(self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        self.add_set_membership(column, values, true, ClauseOptions::or())
    }

    /// `column [NOT] IN (<sub-query>)`
    pub fn add_subquery_membership(
        self,
        column: impl Into<String>,
        query: Query,
        not_in: bool,
        options: ClauseOptions,
    ) -> Self {
        self.push_conditions(
            options,
            MatchMode::All,
            vec![Condition::In {
                column: column.into(),
                not_in,
                set: SetSource::Query(Box::new(query)),
            }],
        )
    }

    pub fn where_in_query(self, column: impl Into<String>, query: Query) -> Self {
        self.add_subquery_membership(column, query, false, ClauseOptions::and())
    }

    pub fn or_where_in_query(self, column: impl Into<String>, query: Query) -> Self {
        self.add_subquery_membership(column, query, false, ClauseOptions::or())
    }

    pub fn where_not_in_query(self, column: impl Into<String>, query: Query) -> Self {
        self.add_subquery_membership(column, query, true, ClauseOptions::and())
    }

    pub fn or_where_not_in_query(self, column: impl Into<String>, query: Query) -> Self {
        self.add_subquery_membership(column, query, true, ClauseOptions::or())
    }

    // Pattern match

    pub fn where_like(self, column: impl Into<String>, value: &str, pattern: Pattern) -> Self {
        self.add_pattern_match(column, value, pattern, ClauseOptions::and())
    }

    pub fn or_where_like(self, column: impl Into<String>, value: &str, pattern: Pattern) -> Self {
        self.add_pattern_match(column, value, pattern, ClauseOptions::or())
    }

    pub fn where_not_like(self, column: impl Into<String>, value: &str, pattern: Pattern) -> Self {
        self.push_conditions(
            ClauseOptions::and(),
            MatchMode::All,
            vec![Condition::Like {
                column: column.into(),
                pattern: pattern.apply(value),
                not_like: true,
            }],
        )
    }

    // Groups

    /// Wraps whatever `f` adds in parentheses, joined with `AND`.
    pub fn where_group(self, f: impl FnOnce(Query) -> Query) -> Self {
        f(self.open_group(ClauseOptions::and())).close_group()
    }

    pub fn or_where_group(self, f: impl FnOnce(Query) -> Query) -> Self {
        f(self.open_group(ClauseOptions::or())).close_group()
    }

    /// Applies `(method, predicates)` calls by name inside one group.
    ///
    /// Recognized names: `where`, `or_where`, `where_not`, `or_where_not`,
    /// `where_any`, `or_where_any`.
    pub fn group_dispatch<'a, I, P>(self, calls: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, P)>,
        P: Into<Predicates>,
    {
        let mut query = self.open_group(ClauseOptions::and());
        for (method, predicates) in calls {
            query = match method {
                "where" | "where_" => query.where_(predicates),
                "or_where" => query.or_where(predicates),
                "where_not" => query.where_not(predicates),
                "or_where_not" => query.or_where_not(predicates),
                "where_any" => query.where_any(predicates),
                "or_where_any" => query.or_where_any(predicates),
                other => {
                    return Err(QueryError::InvalidArgument(format!(
                        "unknown clause method `{other}`"
                    )));
                }
            };
        }
        Ok(query.close_group())
    }

    // Projection and sources

    /// Replaces the projection list.
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns
            .into_iter()
            .map(|c| Column::Plain(c.into()))
            .collect();
        self
    }

    pub fn add_select(mut self, column: impl Into<String>) -> Self {
        self.columns.push(Column::Plain(column.into()));
        self
    }

    pub fn select_as(mut self, expr: impl Into<String>, alias: impl Into<String>) -> Self {
        self.columns.push(Column::Aliased {
            expr: expr.into(),
            alias: alias.into(),
        });
        self
    }

    /// `(<sub-query>) AS alias` in the projection.
    pub fn select_sub(mut self, query: Query, alias: impl Into<String>) -> Self {
        self.columns.push(Column::Sub {
            query: Box::new(query),
            alias: alias.into(),
        });
        self
    }

    pub fn from(mut self, table: impl Into<String>) -> Self {
        self.source = Some(Source::Table(table.into()));
        self
    }

    pub fn from_sub(mut self, query: Query, alias: impl Into<String>) -> Self {
        self.source = Some(Source::Sub {
            query: Box::new(query),
            alias: alias.into(),
        });
        self
    }

    pub fn join(self, table: impl Into<String>, first: &str, op: &str, second: &str) -> Self {
        self.push_join(JoinKind::Inner, table.into(), first, op, second)
    }

    pub fn left_join(self, table: impl Into<String>, first: &str, op: &str, second: &str) -> Self {
        self.push_join(JoinKind::Left, table.into(), first, op, second)
    }

    pub fn right_join(self, table: impl Into<String>, first: &str, op: &str, second: &str) -> Self {
        self.push_join(JoinKind::Right, table.into(), first, op, second)
    }

    // Paging and ordering

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    /// 1-based page of `per_page` rows.
    pub fn page(mut self, page: u64, per_page: u64) -> Self {
        self.limit = per_page;
        self.skip = page.saturating_sub(1).saturating_mul(per_page);
        self
    }

    pub fn sort_by(mut self, column: impl Into<String>) -> Self {
        self.sort_column = Some(column.into());
        self
    }

    pub fn order(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    // Compilation

    /// Compiles the query. `count_only` selects `COUNT(*)` and drops
    /// ordering and paging.
    pub fn compose_query(&self, count_only: bool) -> Result<CompiledQuery> {
        if let Some(err) = &self.deferred {
            return Err(QueryError::InvalidArgument(err.clone()));
        }
        let compiled = crate::compile::compile(self, count_only)?;
        trace!("compiled query: {}", compiled.sql());
        Ok(compiled)
    }

    pub fn to_sql(&self) -> Result<CompiledQuery> {
        self.compose_query(false)
    }

    fn push_conditions(
        mut self,
        options: ClauseOptions,
        mode: MatchMode,
        items: Vec<Condition>,
    ) -> Self {
        if items.is_empty() {
            return self;
        }
        self.nodes.push(Node::Conditions {
            joiner: options.joiner,
            negate: options.negate,
            mode,
            items,
        });
        self
    }

    fn push_join(
        mut self,
        kind: JoinKind,
        table: String,
        first: &str,
        op: &str,
        second: &str,
    ) -> Self {
        self.joins.push(Join {
            kind,
            table,
            first: first.to_string(),
            op: op.to_string(),
            second: second.to_string(),
        });
        self
    }

    /// Keeps the first builder error; it is reported by `compose_query`.
    fn defer(mut self, err: String) -> Self {
        self.deferred.get_or_insert(err);
        self
    }
}
