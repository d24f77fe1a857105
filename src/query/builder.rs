//! Parameterized query composer
//!
//! Fragments render in a fixed shape regardless of the order builder calls are made:
//!
//! ```text
//! <base> WHERE p1 AND p2 ... GROUP BY g ORDER BY c1 d1, c2 d2 ... LIMIT ?
//! ```
//!
//! Arguments are flattened as predicate args (declaration order) followed by the limit.

use std::fmt;

/// A bound query argument
#[derive(Debug, Clone, PartialEq)]
pub enum QueryArg {
    Int(i64),
    Text(String),
}

impl From<i64> for QueryArg {
    fn from(v: i64) -> Self {
        QueryArg::Int(v)
    }
}

impl From<u32> for QueryArg {
    fn from(v: u32) -> Self {
        QueryArg::Int(i64::from(v))
    }
}

impl From<&str> for QueryArg {
    fn from(v: &str) -> Self {
        QueryArg::Text(v.to_string())
    }
}

impl From<String> for QueryArg {
    fn from(v: String) -> Self {
        QueryArg::Text(v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
struct Predicate {
    text: String,
    args: Vec<QueryArg>,
}

/// Final query text plus its flat argument list
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedQuery {
    pub sql: String,
    pub args: Vec<QueryArg>,
}

/// Append-only query builder
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    base: String,
    predicates: Vec<Predicate>,
    ordering: Vec<(String, Direction)>,
    group_by: Option<String>,
    limit: Option<u32>,
}

impl QueryBuilder {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            predicates: Vec::new(),
            ordering: Vec::new(),
            group_by: None,
            limit: None,
        }
    }

    /// Add a predicate, AND-joined with the ones declared before it
    ///
    /// A predicate without placeholders (e.g. `language IS NULL`) takes `[]`.
    pub fn filter<I>(&mut self, predicate: impl Into<String>, args: I) -> &mut Self
    where
        I: IntoIterator<Item = QueryArg>,
    {
        self.predicates.push(Predicate {
            text: predicate.into(),
            args: args.into_iter().collect(),
        });
        self
    }

    pub fn order_by(&mut self, column: impl Into<String>, direction: Direction) -> &mut Self {
        self.ordering.push((column.into(), direction));
        self
    }

    /// Set the grouping column; a later call replaces an earlier one
    pub fn group_by(&mut self, column: impl Into<String>) -> &mut Self {
        self.group_by = Some(column.into());
        self
    }

    pub fn limit(&mut self, n: u32) -> &mut Self {
        self.limit = Some(n);
        self
    }

    pub fn render(&self) -> RenderedQuery {
        let mut sql = self.base.trim_end().to_string();
        let mut args = Vec::new();

        if !self.predicates.is_empty() {
            let clauses: Vec<&str> = self.predicates.iter().map(|p| p.text.as_str()).collect();
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));

            for predicate in &self.predicates {
                args.extend(predicate.args.iter().cloned());
            }
        }

        if let Some(column) = &self.group_by {
            sql.push_str(" GROUP BY ");
            sql.push_str(column);
        }

        if !self.ordering.is_empty() {
            let pairs: Vec<String> = self
                .ordering
                .iter()
                .map(|(column, direction)| format!("{} {}", column, direction))
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&pairs.join(", "));
        }

        if let Some(n) = self.limit {
            sql.push_str(" LIMIT ?");
            args.push(QueryArg::from(n));
        }

        RenderedQuery { sql, args }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicates_render_in_declaration_order() {
        let mut qb = QueryBuilder::new("SELECT * FROM t");
        qb.filter("a = ?", [QueryArg::from(1i64)]);
        qb.filter("b = ?", [QueryArg::from(2i64)]);

        let query = qb.render();
        assert_eq!(query.sql, "SELECT * FROM t WHERE a = ? AND b = ?");
        assert_eq!(query.args, vec![QueryArg::Int(1), QueryArg::Int(2)]);
    }

    #[test]
    fn test_limit_arg_is_last_regardless_of_call_order() {
        let mut qb = QueryBuilder::new("SELECT * FROM t");
        qb.order_by("c", Direction::Desc);
        qb.filter("a = ?", [QueryArg::from(1i64)]);
        qb.limit(5);
        qb.group_by("g");
        qb.filter("b = ?", [QueryArg::from(2i64)]);
        qb.order_by("d", Direction::Asc);

        let query = qb.render();
        assert_eq!(
            query.sql,
            "SELECT * FROM t WHERE a = ? AND b = ? GROUP BY g ORDER BY c DESC, d ASC LIMIT ?"
        );
        assert_eq!(
            query.args,
            vec![QueryArg::Int(1), QueryArg::Int(2), QueryArg::Int(5)]
        );
    }

    #[test]
    fn test_zero_arg_predicate_contributes_text_only() {
        let mut qb = QueryBuilder::new("SELECT * FROM t");
        qb.filter("language IS NULL", []);
        qb.filter("trend_date > ?", [QueryArg::from("2024-01-01")]);

        let query = qb.render();
        assert_eq!(
            query.sql,
            "SELECT * FROM t WHERE language IS NULL AND trend_date > ?"
        );
        assert_eq!(query.args, vec![QueryArg::Text("2024-01-01".to_string())]);
    }

    #[test]
    fn test_multi_key_ordering_keeps_call_order() {
        let mut qb = QueryBuilder::new("SELECT * FROM t");
        qb.order_by("featured_count", Direction::Desc)
            .order_by("best_ranking", Direction::Asc)
            .order_by("repositories.id", Direction::Asc);

        assert_eq!(
            qb.render().sql,
            "SELECT * FROM t ORDER BY featured_count DESC, best_ranking ASC, repositories.id ASC"
        );
    }

    #[test]
    fn test_render_is_repeatable() {
        let mut qb = QueryBuilder::new("SELECT * FROM t ");
        qb.filter("a = ?", [QueryArg::from("x")]).limit(3);

        assert_eq!(qb.render(), qb.render());
        assert_eq!(qb.render().sql, "SELECT * FROM t WHERE a = ? LIMIT ?");
    }

    #[test]
    fn test_empty_builder_renders_base() {
        let qb = QueryBuilder::new("SELECT 1");
        let query = qb.render();
        assert_eq!(query.sql, "SELECT 1");
        assert!(query.args.is_empty());
    }
}
