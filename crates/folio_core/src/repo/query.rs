//! Parameterized SQL query builder over a [`Table`].
//!
//! # Responsibility
//! - Translate filter predicates into `WHERE` clauses with bound parameters.
//! - Support declared joins, explicit ordering and result limits.
//!
//! # Invariants
//! - Values are always bound, never interpolated into SQL text.
//! - A query with no applied filter is rejected with `EmptyFilter`.
//! - Filters on a joined table require the join to be declared first.
//! - Joined queries select `DISTINCT` rows, so a limit applies after
//!   duplicates from one-to-many joins collapse.
//! - Absent values sort last in both directions; ties fall back to id.

use super::table::{to_sql_value, Column, Joinable, Table};
use super::{RecordId, RepoError, RepoResult};
use crate::filter::{FieldFilter, FilterSpec, Predicate, SortOrder};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::marker::PhantomData;

/// Accumulates filters for one record type, then runs them.
pub struct QueryBuilder<'conn, R: Table> {
    conn: &'conn Connection,
    joins: Vec<&'static str>,
    tables: Vec<&'static str>,
    clauses: Vec<String>,
    params: Vec<Value>,
    order: Option<(Column, SortOrder)>,
    limit: Option<usize>,
    missing_join: Option<&'static str>,
    _record: PhantomData<R>,
}

impl<'conn, R: Table> QueryBuilder<'conn, R> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            joins: Vec::new(),
            tables: R::TABLES.to_vec(),
            clauses: Vec::new(),
            params: Vec::new(),
            order: None,
            limit: None,
            missing_join: None,
            _record: PhantomData,
        }
    }

    /// Declares a join with `J`'s table.
    pub fn join<J: Table>(&mut self) -> &mut Self
    where
        R: Joinable<J>,
    {
        if !self.tables.contains(&J::TABLE) {
            self.joins.push(<R as Joinable<J>>::JOIN);
            self.tables.push(J::TABLE);
        }
        self
    }

    /// Adds a filter on one of the record's own fields.
    pub fn filter(&mut self, filter: FieldFilter<R::Field>) -> &mut Self {
        self.push(R::column(filter.field), &filter.predicate);
        self
    }

    /// Adds a filter on a field of a joined record type.
    pub fn filter_joined<J: Table>(&mut self, filter: FieldFilter<J::Field>) -> &mut Self {
        self.push(J::column(filter.field), &filter.predicate);
        self
    }

    /// Adds every predicate of `spec`, plus its order and limit.
    pub fn apply(&mut self, spec: &FilterSpec<R::Field>) -> &mut Self {
        for filter in spec.predicates() {
            self.filter(filter);
        }
        if let Some((field, order)) = spec.order() {
            self.order_by(field, order);
        }
        if let Some(limit) = spec.limit() {
            self.limit(limit);
        }
        self
    }

    pub fn order_by(&mut self, field: R::Field, order: SortOrder) -> &mut Self {
        self.order = Some((R::column(field), order));
        self
    }

    pub fn limit(&mut self, limit: usize) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    /// Clears accumulated filters; joins, order and limit are kept.
    pub fn reset(&mut self) -> &mut Self {
        self.clauses.clear();
        self.params.clear();
        self.missing_join = None;
        self
    }

    pub fn filter_count(&self) -> usize {
        self.clauses.len()
    }

    /// Runs the query and maps rows to records.
    pub fn run(&self) -> RepoResult<Vec<R>> {
        let (sql, params) = self.build(R::SELECT)?;
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(params))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(R::from_row(row)?);
        }
        Ok(records)
    }

    /// Runs the query and returns matching surrogate ids.
    pub fn run_ids(&self) -> RepoResult<Vec<RecordId>> {
        let select = format!("{}.id AS id", R::TABLE);
        let (sql, params) = self.build(&select)?;
        let mut stmt = self.conn.prepare(&sql)?;
        let ids = stmt
            .query_map(params_from_iter(params), |row| row.get::<_, RecordId>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    fn push(&mut self, column: Column, predicate: &Predicate) {
        if self.missing_join.is_some() {
            return;
        }
        if !self.tables.contains(&column.table) {
            self.missing_join = Some(column.table);
            return;
        }

        let target = column.qualified();
        let clause = match predicate {
            Predicate::Equals(value) => {
                self.params.push(to_sql_value(value));
                format!("{target} = ?")
            }
            Predicate::OneOf(values) => {
                self.params.extend(values.iter().map(to_sql_value));
                format!("{target} IN ({})", placeholders(values.len()))
            }
            Predicate::TextContainsAny(needles) => {
                self.params.extend(
                    needles
                        .iter()
                        .map(|needle| Value::Text(format!("%{}%", escape_like(needle)))),
                );
                let alternatives = vec![format!("lower({target}) LIKE ? ESCAPE '\\'"); needles.len()];
                format!("({})", alternatives.join(" OR "))
            }
            Predicate::TextEqualsAny(values) => {
                self.params
                    .extend(values.iter().map(|value| Value::Text(value.clone())));
                format!("lower({target}) IN ({})", placeholders(values.len()))
            }
            Predicate::Between { min, max } => {
                let mut bounds = Vec::new();
                if let Some(min) = min {
                    self.params.push(to_sql_value(min));
                    bounds.push(format!("{target} >= ?"));
                }
                if let Some(max) = max {
                    self.params.push(to_sql_value(max));
                    bounds.push(format!("{target} <= ?"));
                }
                format!("({})", bounds.join(" AND "))
            }
            Predicate::IsNull => format!("{target} IS NULL"),
        };
        self.clauses.push(clause);
    }

    fn build(&self, select: &str) -> RepoResult<(String, Vec<Value>)> {
        if let Some(table) = self.missing_join {
            return Err(RepoError::JoinRequired { table });
        }
        if self.clauses.is_empty() {
            return Err(RepoError::EmptyFilter { kind: R::KIND });
        }

        let distinct = if self.joins.is_empty() { "" } else { "DISTINCT " };
        let mut sql = format!("SELECT {distinct}{select} FROM {}", R::SOURCE);
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }
        sql.push_str(" WHERE ");
        sql.push_str(&self.clauses.join(" AND "));

        let id_column = format!("{}.id", R::TABLE);
        match self.order {
            Some((column, order)) => {
                let direction = match order {
                    SortOrder::Ascending => "ASC",
                    SortOrder::Descending => "DESC",
                };
                let target = column.qualified();
                sql.push_str(&format!(
                    " ORDER BY {target} IS NULL, {target} {direction}, {id_column}"
                ));
            }
            None => sql.push_str(&format!(" ORDER BY {id_column}")),
        }

        let mut params = self.params.clone();
        if let Some(limit) = self.limit {
            sql.push_str(" LIMIT ?");
            params.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
        }
        sql.push(';');
        Ok((sql, params))
    }
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Escapes `LIKE` wildcards so needles match literally.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::{escape_like, placeholders};

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("100%_a\\b"), "100\\%\\_a\\\\b");
    }

    #[test]
    fn placeholders_are_comma_separated() {
        assert_eq!(placeholders(3), "?, ?, ?");
    }
}
