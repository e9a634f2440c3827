//! Turns a [`Query`] into SQL text plus ordered bound parameters.

use std::{fmt, ops::Range};

use tracing::warn;

use crate::{
    clause::{Condition, Node, Operator, SetSource},
    dialect::Dialect,
    error::{QueryError, Result},
    query::{Column, Query, Source},
    value::SqlValue,
};

/// Renders a literal for inlining into SQL text.
pub trait Escape {
    fn escape(&self, value: &SqlValue) -> String;
}

/// Double-quotes strings and backslash-escapes the characters MySQL treats
/// specially inside string literals.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultEscaper;

impl Escape for DefaultEscaper {
    fn escape(&self, value: &SqlValue) -> String {
        match value {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            SqlValue::Int(n) => n.to_string(),
            SqlValue::Float(f) if f.is_finite() => f.to_string(),
            SqlValue::Float(_) => "NULL".to_string(),
            SqlValue::Text(s) => {
                let mut out = String::with_capacity(s.len() + 2);
                out.push('"');
                for c in s.chars() {
                    match c {
                        '\\' => out.push_str("\\\\"),
                        '"' => out.push_str("\\\""),
                        '\'' => out.push_str("\\'"),
                        '\0' => out.push_str("\\0"),
                        '\n' => out.push_str("\\n"),
                        '\r' => out.push_str("\\r"),
                        '\x1a' => out.push_str("\\Z"),
                        c => out.push(c),
                    }
                }
                out.push('"');
                out
            }
        }
    }
}

/// SQL text with placeholders and the values bound to them, in order.
#[derive(Clone, Debug, PartialEq)]
pub struct CompiledQuery {
    sql: String,
    params: Vec<SqlValue>,
    slots: Vec<Range<usize>>,
}

impl CompiledQuery {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }

    pub fn into_parts(self) -> (String, Vec<SqlValue>) {
        (self.sql, self.params)
    }

    /// Replaces every placeholder with its escaped value.
    ///
    /// Meant for logging and for drivers without parameter binding.
    pub fn interpolate(&self, escaper: &dyn Escape) -> String {
        let mut out = String::with_capacity(self.sql.len());
        let mut last = 0;
        for (slot, value) in self.slots.iter().zip(&self.params) {
            out.push_str(&self.sql[last..slot.start]);
            out.push_str(&escaper.escape(value));
            last = slot.end;
        }
        out.push_str(&self.sql[last..]);
        out
    }
}

impl fmt::Display for CompiledQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

struct Writer<'d> {
    sql: String,
    params: Vec<SqlValue>,
    slots: Vec<Range<usize>>,
    dialect: &'d Dialect,
}

impl<'d> Writer<'d> {
    fn new(dialect: &'d Dialect) -> Self {
        Self {
            sql: String::new(),
            params: Vec::new(),
            slots: Vec::new(),
            dialect,
        }
    }

    fn push(&mut self, text: &str) {
        self.sql.push_str(text);
    }

    fn bind(&mut self, value: SqlValue) {
        let start = self.sql.len();
        let placeholder = self.dialect.placeholder(self.params.len() + 1);
        self.sql.push_str(&placeholder);
        self.slots.push(start..self.sql.len());
        self.params.push(value);
    }

    fn finish(self) -> CompiledQuery {
        CompiledQuery {
            sql: self.sql,
            params: self.params,
            slots: self.slots,
        }
    }
}

pub(crate) fn compile(query: &Query, count_only: bool) -> Result<CompiledQuery> {
    let mut writer = Writer::new(&query.dialect);
    write_select(query, &mut writer, count_only)?;
    Ok(writer.finish())
}

fn write_select(query: &Query, w: &mut Writer<'_>, count_only: bool) -> Result<()> {
    w.push("SELECT ");
    if count_only {
        w.push("COUNT(*)");
    } else if query.columns.is_empty() {
        w.push("*");
    } else {
        for (i, column) in query.columns.iter().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            match column {
                Column::Plain(name) => w.push(name),
                Column::Aliased { expr, alias } => {
                    w.push(expr);
                    w.push(" AS ");
                    w.push(alias);
                }
                Column::Sub { query, alias } => {
                    w.push("(");
                    write_select(query, w, false)?;
                    w.push(") AS ");
                    w.push(alias);
                }
            }
        }
    }

    w.push(" FROM ");
    match &query.source {
        Some(Source::Table(table)) => w.push(table),
        Some(Source::Sub { query, alias }) => {
            w.push("(");
            write_select(query, w, false)?;
            w.push(") AS ");
            w.push(alias);
        }
        None => {
            return Err(QueryError::MalformedQuery(
                "query has no FROM source".to_string(),
            ));
        }
    }

    for join in &query.joins {
        w.push(&format!(
            " {} {} ON {} {} {}",
            join.kind.as_str(),
            join.table,
            join.first,
            join.op,
            join.second
        ));
    }

    write_where(query, w)?;

    if count_only {
        return Ok(());
    }

    let sort = query.sort_column.as_deref().unwrap_or(&query.primary_key);
    let sort = if sort.contains('(') {
        sort.to_string()
    } else {
        w.dialect.quote_identifier(sort)
    };
    w.push(&format!(" ORDER BY {} {}", sort, query.direction.as_str()));

    if query.limit > 0 {
        w.push(&format!(" LIMIT {}", query.limit));
    } else if query.skip > 0 {
        w.push(&format!(" LIMIT {}", w.dialect.unbounded_limit()));
    }
    if query.skip > 0 {
        w.push(&format!(" OFFSET {}", query.skip));
    }

    Ok(())
}

enum Step<'a> {
    Node(&'a Node),
    Close,
}

/// Drops empty nodes and stray closes, elides empty groups and closes any
/// group left open.
fn balance(nodes: &[Node], strict: bool) -> Result<Vec<Step<'_>>> {
    fn close(steps: &mut Vec<Step<'_>>) {
        if matches!(steps.last(), Some(Step::Node(Node::GroupOpen { .. }))) {
            steps.pop();
        } else {
            steps.push(Step::Close);
        }
    }

    let mut steps = Vec::with_capacity(nodes.len());
    let mut depth = 0usize;

    for node in nodes {
        match node {
            Node::Conditions { items, .. } if items.is_empty() => {}
            Node::GroupOpen { .. } => {
                depth += 1;
                steps.push(Step::Node(node));
            }
            Node::GroupClose if depth == 0 => {
                if strict {
                    return Err(QueryError::MalformedQuery(
                        "`close_group` without a matching `open_group`".to_string(),
                    ));
                }
                warn!("ignoring close_group without a matching open_group");
            }
            Node::GroupClose => {
                depth -= 1;
                close(&mut steps);
            }
            Node::Conditions { .. } => steps.push(Step::Node(node)),
        }
    }

    if depth > 0 {
        if strict {
            return Err(QueryError::MalformedQuery(format!(
                "{depth} group(s) opened but never closed"
            )));
        }
        warn!("closing {depth} unbalanced group(s)");
        for _ in 0..depth {
            close(&mut steps);
        }
    }

    Ok(steps)
}

fn write_where(query: &Query, w: &mut Writer<'_>) -> Result<()> {
    let steps = balance(&query.nodes, w.dialect.strict_groups())?;
    if steps.is_empty() {
        return Ok(());
    }

    w.push(" WHERE ");
    let mut first = true;

    for step in steps {
        match step {
            Step::Node(Node::Conditions {
                joiner,
                negate,
                mode,
                items,
            }) => {
                if !first {
                    w.push(&format!(" {} ", joiner.as_str()));
                }
                if *negate {
                    w.push("NOT ");
                }

                let wrap =
                    items.len() > 1 || (*negate && matches!(items.as_slice(), [Condition::Raw { .. }]));
                if wrap {
                    w.push("(");
                }
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        w.push(&format!(" {} ", mode.joiner().as_str()));
                    }
                    write_condition(item, w)?;
                }
                if wrap {
                    w.push(")");
                }
                first = false;
            }
            Step::Node(Node::GroupOpen { joiner, negate }) => {
                if !first {
                    w.push(&format!(" {} ", joiner.as_str()));
                }
                if *negate {
                    w.push("NOT ");
                }
                w.push("(");
                first = true;
            }
            Step::Node(Node::GroupClose) | Step::Close => {
                w.push(")");
                first = false;
            }
        }
    }

    Ok(())
}

fn write_condition(condition: &Condition, w: &mut Writer<'_>) -> Result<()> {
    match condition {
        Condition::Compare {
            column,
            op,
            value: SqlValue::Null,
        } if matches!(op, Operator::Eq | Operator::NotEq) => {
            w.push(column);
            w.push(if *op == Operator::Eq {
                " IS NULL"
            } else {
                " IS NOT NULL"
            });
        }
        Condition::Compare { column, op, value } => {
            w.push(&format!("{column} {op} "));
            w.bind(value.clone());
        }
        Condition::Raw { sql, bind: None } => w.push(sql),
        Condition::Raw {
            sql,
            bind: Some(value),
        } => {
            let (before, after) = sql.split_once('?').ok_or_else(|| {
                QueryError::InvalidArgument(format!("raw fragment `{sql}` has no `?` to bind"))
            })?;
            w.push(before);
            w.bind(value.clone());
            w.push(after);
        }
        Condition::In {
            not_in,
            set: SetSource::Values(values),
            ..
        } if values.is_empty() => {
            // Nothing is IN an empty set; everything is NOT IN it.
            w.push(if *not_in { "1 = 1" } else { "1 = 0" });
        }
        Condition::In { column, not_in, set } => {
            w.push(column);
            w.push(if *not_in { " NOT IN (" } else { " IN (" });
            match set {
                SetSource::Values(values) => {
                    for (i, value) in values.iter().enumerate() {
                        if i > 0 {
                            w.push(",");
                        }
                        w.bind(value.clone());
                    }
                }
                SetSource::Query(query) => write_select(query, w, false)?,
            }
            w.push(")");
        }
        Condition::Like {
            column,
            pattern,
            not_like,
        } => {
            w.push(column);
            w.push(if *not_like { " NOT LIKE " } else { " LIKE " });
            w.bind(SqlValue::Text(pattern.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clause::{ClauseOptions, MatchMode, Pattern},
        query::Direction,
    };

    fn interpolated(query: &Query) -> String {
        query.to_sql().unwrap().interpolate(&DefaultEscaper)
    }

    #[test]
    fn test_users_query_with_or() {
        let query = Query::table("users")
            .where_(("age", ">", 18))
            .or_where(("role", "admin"))
            .sort_by("name")
            .limit(10);

        let compiled = query.to_sql().unwrap();
        assert_eq!(
            compiled.sql(),
            "SELECT * FROM users WHERE age > ? OR role = ? ORDER BY `name` ASC LIMIT 10"
        );
        assert_eq!(
            compiled.params(),
            &[SqlValue::Int(18), SqlValue::Text("admin".into())]
        );
        assert_eq!(
            compiled.interpolate(&DefaultEscaper),
            "SELECT * FROM users WHERE age > 18 OR role = \"admin\" ORDER BY `name` ASC LIMIT 10"
        );
    }

    #[test]
    fn test_where_in_interpolation() {
        let query = Query::table("orders").where_in("status", ["active", "pending"]);

        assert!(interpolated(&query).contains("status IN (\"active\",\"pending\")"));
        assert_eq!(query.to_sql().unwrap().params().len(), 2);
    }

    #[test]
    fn test_first_clause_has_no_joiner() {
        let sql = Query::table("t")
            .or_where(("a", 1))
            .or_where(("b", 2))
            .to_sql()
            .unwrap();
        assert!(sql.sql().contains("WHERE a = ? OR b = ?"));
        assert!(!sql.sql().contains("WHERE OR"));
    }

    #[test]
    fn test_unbalanced_groups_are_closed() {
        let balanced = Query::table("t")
            .where_(("a", 1))
            .open_group(ClauseOptions::and())
            .where_(("b", 2))
            .close_group()
            .to_sql()
            .unwrap();
        assert_eq!(
            balanced.sql(),
            "SELECT * FROM t WHERE a = ? AND (b = ?) ORDER BY `id` ASC"
        );

        let unbalanced = Query::table("t")
            .where_(("a", 1))
            .open_group(ClauseOptions::or())
            .where_(("b", 2))
            .open_group(ClauseOptions::and())
            .where_(("c", 3))
            .to_sql()
            .unwrap();
        assert!(unbalanced
            .sql()
            .contains("WHERE a = ? OR (b = ? AND (c = ?)) ORDER BY"));
    }

    #[test]
    fn test_strict_groups_reject_imbalance() {
        let strict = crate::dialect::Dialect::default().with_strict_groups(true);

        let err = Query::table("t")
            .dialect(strict.clone())
            .open_group(ClauseOptions::and())
            .where_(("a", 1))
            .to_sql()
            .unwrap_err();
        assert!(matches!(err, QueryError::MalformedQuery(_)));

        let err = Query::table("t")
            .dialect(strict)
            .where_(("a", 1))
            .close_group()
            .to_sql()
            .unwrap_err();
        assert!(matches!(err, QueryError::MalformedQuery(_)));
    }

    #[test]
    fn test_stray_close_and_empty_groups_are_dropped() {
        let sql = Query::table("t")
            .close_group()
            .where_group(|q| q)
            .where_(("a", 1))
            .to_sql()
            .unwrap();
        assert_eq!(sql.sql(), "SELECT * FROM t WHERE a = ? ORDER BY `id` ASC");
    }

    #[test]
    fn test_pattern_values() {
        let compiled = Query::table("t")
            .where_like("a", "x", Pattern::StartsWith)
            .where_like("b", "x", Pattern::EndsWith)
            .where_like("c", "x", Pattern::Contains)
            .where_like("d", "x", Pattern::ContainsAt(2))
            .where_not_like("e", "x", Pattern::Exact)
            .to_sql()
            .unwrap();

        let values: Vec<_> = compiled
            .params()
            .iter()
            .filter_map(SqlValue::as_str)
            .collect();
        assert_eq!(values, ["x%", "%x", "%x%", "__x%", "x"]);
        assert!(compiled.sql().contains("e NOT LIKE ?"));
    }

    #[test]
    fn test_offset_without_limit() {
        let sql = Query::table("t").skip(5).to_sql().unwrap();
        assert!(sql.sql().ends_with(" LIMIT 18446744073709551615 OFFSET 5"));

        let sql = Query::table("t").page(3, 20).to_sql().unwrap();
        assert!(sql.sql().ends_with(" LIMIT 20 OFFSET 40"));
    }

    #[test]
    fn test_multi_pair_grouping() {
        let any = Query::table("t")
            .where_any([("col_a", 1), ("col_b", 2)])
            .to_sql()
            .unwrap();
        assert_eq!(
            any.interpolate(&DefaultEscaper),
            "SELECT * FROM t WHERE (col_a = 1 OR col_b = 2) ORDER BY `id` ASC"
        );

        let single = Query::table("t")
            .add_predicate([("col_a", 1)], ClauseOptions::and(), MatchMode::Any)
            .to_sql()
            .unwrap();
        assert!(single.sql().contains("WHERE col_a = ? ORDER BY"));
    }

    #[test]
    fn test_negation_placement() {
        let sql = Query::table("t")
            .where_(("a", 1))
            .or_where_not([("b", 2), ("c", 3)])
            .where_not_raw("d > e OR f")
            .to_sql()
            .unwrap();
        assert!(sql
            .sql()
            .contains("WHERE a = ? OR NOT (b = ? AND c = ?) AND NOT (d > e OR f)"));

        let sql = Query::table("t")
            .open_group(ClauseOptions::and().negated())
            .where_(("a", 1))
            .close_group()
            .to_sql()
            .unwrap();
        assert!(sql.sql().contains("WHERE NOT (a = ?)"));
    }

    #[test]
    fn test_null_comparisons() {
        let sql = Query::table("t")
            .where_null("deleted_at")
            .where_not_null("email")
            .where_(("age", ">", SqlValue::Null))
            .to_sql()
            .unwrap();
        assert!(sql
            .sql()
            .contains("WHERE deleted_at IS NULL AND email IS NOT NULL AND age > ?"));
        assert_eq!(sql.params(), &[SqlValue::Null]);
    }

    #[test]
    fn test_bare_value_targets_primary_key() {
        let sql = Query::table("posts")
            .primary_key("post_id")
            .where_(42)
            .to_sql()
            .unwrap();
        assert_eq!(
            sql.sql(),
            "SELECT * FROM posts WHERE post_id = ? ORDER BY `post_id` ASC"
        );
    }

    #[test]
    fn test_raw_bind() {
        let sql = Query::table("t")
            .where_raw_bind("LOWER(name) = ?", "bob")
            .or_where_raw("1 = 1")
            .to_sql()
            .unwrap();
        assert!(sql.sql().contains("WHERE LOWER(name) = ? OR 1 = 1"));
        assert_eq!(sql.params(), &[SqlValue::from("bob")]);

        let err = Query::table("t")
            .where_raw_bind("a = ? AND b = ?", 1)
            .to_sql()
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidArgument(_)));
    }

    #[test]
    fn test_unknown_operator_surfaces_at_compile() {
        let err = Query::table("t")
            .where_(("a", "~=", 1))
            .to_sql()
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidArgument(msg) if msg.contains("`~=`")));
    }

    #[test]
    fn test_group_dispatch() {
        let sql = Query::table("t")
            .where_(("a", 1))
            .group_dispatch([("where", ("b", 2)), ("or_where", ("c", 3))])
            .unwrap()
            .to_sql()
            .unwrap();
        assert!(sql.sql().contains("WHERE a = ? AND (b = ? OR c = ?)"));

        let err = Query::table("t")
            .group_dispatch([("where_sideways", ("b", 2))])
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidArgument(_)));
    }

    #[test]
    fn test_where_group_closure() {
        let sql = Query::table("t")
            .where_(("a", 1))
            .or_where_group(|q| q.where_(("b", 2)).where_(("c", 3)))
            .to_sql()
            .unwrap();
        assert!(sql.sql().contains("WHERE a = ? OR (b = ? AND c = ?)"));
    }

    #[test]
    fn test_sort_quoting() {
        let sql = Query::table("t").sort_by("RAND()").to_sql().unwrap();
        assert!(sql.sql().ends_with("ORDER BY RAND() ASC"));

        let sql = Query::table("t")
            .sort_by("t.created_at")
            .order(Direction::Desc)
            .to_sql()
            .unwrap();
        assert!(sql.sql().ends_with("ORDER BY `t`.`created_at` DESC"));
    }

    #[test]
    fn test_count_mode() {
        let sql = Query::table("users")
            .select(["id", "name"])
            .where_(("active", true))
            .sort_by("name")
            .limit(10)
            .skip(20)
            .compose_query(true)
            .unwrap();
        assert_eq!(sql.sql(), "SELECT COUNT(*) FROM users WHERE active = ?");
    }

    #[test]
    fn test_projection_and_joins() {
        let latest = Query::table("comments")
            .select(["COUNT(*)"])
            .where_raw("comments.post_id = posts.id");

        let sql = Query::table("posts")
            .select(["posts.id"])
            .add_select("users.name")
            .select_as("posts.title", "heading")
            .select_sub(latest, "comment_count")
            .left_join("users", "users.id", "=", "posts.user_id")
            .where_(("posts.published", 1))
            .to_sql()
            .unwrap();

        assert_eq!(
            sql.sql(),
            "SELECT posts.id, users.name, posts.title AS heading, \
             (SELECT COUNT(*) FROM comments WHERE comments.post_id = posts.id ORDER BY `id` ASC) AS comment_count \
             FROM posts LEFT JOIN users ON users.id = posts.user_id \
             WHERE posts.published = ? ORDER BY `id` ASC"
        );
    }

    #[test]
    fn test_subquery_membership_variants() {
        let banned = || Query::table("bans").select(["user_id"]).where_(("active", 1));

        let sql = Query::table("users")
            .where_(("role", "admin"))
            .or_where_in_query("id", banned())
            .where_not_in_query("id", banned())
            .or_where_not_in_query("team_id", Query::table("teams").select(["id"]))
            .to_sql()
            .unwrap();

        assert_eq!(
            sql.sql(),
            "SELECT * FROM users WHERE role = ? \
             OR id IN (SELECT user_id FROM bans WHERE active = ? ORDER BY `id` ASC) \
             AND id NOT IN (SELECT user_id FROM bans WHERE active = ? ORDER BY `id` ASC) \
             OR team_id NOT IN (SELECT id FROM teams ORDER BY `id` ASC) \
             ORDER BY `id` ASC"
        );
        assert_eq!(sql.params().len(), 3);
    }

    #[test]
    fn test_subquery_placeholders_are_numbered_in_order() {
        let inner = Query::table("orders")
            .select(["user_id"])
            .where_(("total", ">", 100));

        let sql = Query::new()
            .from_sub(Query::table("users").where_(("active", 1)), "u")
            .where_in_query("u.id", inner)
            .where_(("u.age", ">=", 21))
            .dialect(Dialect::postgres())
            .to_sql()
            .unwrap();

        assert_eq!(
            sql.sql(),
            "SELECT * FROM (SELECT * FROM users WHERE active = $1 ORDER BY \"id\" ASC) AS u \
             WHERE u.id IN (SELECT user_id FROM orders WHERE total > $2 ORDER BY \"id\" ASC) \
             AND u.age >= $3 ORDER BY \"id\" ASC"
        );
        assert_eq!(
            sql.params(),
            &[SqlValue::Int(1), SqlValue::Int(100), SqlValue::Int(21)]
        );
        assert_eq!(
            sql.interpolate(&DefaultEscaper),
            "SELECT * FROM (SELECT * FROM users WHERE active = 1 ORDER BY \"id\" ASC) AS u \
             WHERE u.id IN (SELECT user_id FROM orders WHERE total > 100 ORDER BY \"id\" ASC) \
             AND u.age >= 21 ORDER BY \"id\" ASC"
        );
    }

    #[test]
    fn test_empty_in_list() {
        let sql = Query::table("t")
            .where_in("id", Vec::<i64>::new())
            .or_where_not_in("id", Vec::<i64>::new())
            .to_sql()
            .unwrap();
        assert!(sql.sql().contains("WHERE 1 = 0 OR 1 = 1"));
    }

    #[test]
    fn test_compose_is_repeatable() {
        let query = Query::table("t").where_(("a", 1)).open_group(ClauseOptions::and()).where_(("b", 2));
        assert_eq!(query.to_sql().unwrap(), query.to_sql().unwrap());
    }

    #[test]
    fn test_missing_source() {
        assert!(matches!(
            Query::new().to_sql(),
            Err(QueryError::MalformedQuery(_))
        ));
    }

    #[test]
    fn test_escaper() {
        let escaper = DefaultEscaper;
        assert_eq!(escaper.escape(&SqlValue::from("say \"hi\"")), "\"say \\\"hi\\\"\"");
        assert_eq!(escaper.escape(&SqlValue::from("it's")), "\"it\\'s\"");
        assert_eq!(escaper.escape(&SqlValue::Bool(true)), "1");
        assert_eq!(escaper.escape(&SqlValue::Null), "NULL");
    }
}
