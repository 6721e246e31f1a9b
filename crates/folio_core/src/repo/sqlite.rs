//! SQLite-backed generic repository.
//!
//! # Responsibility
//! - Implement [`Repository`] for every [`Table`] record type.
//! - Translate store constraint failures into repository errors.
//!
//! # Invariants
//! - Construction checks the schema version, tables and columns.
//! - Duplicate detection relies on each table's unique index, so the
//!   check and the insert are one atomic statement.
//! - `AUTOINCREMENT` keys keep ids from being reused after delete.

use super::query::QueryBuilder;
use super::table::{lookup_unique_key, Table};
use super::{
    apply_changes, ensure_filtered, Changes, RecordId, RepoError, RepoResult, Repository,
};
use crate::db::{latest_version, schema_version};
use crate::filter::FilterSpec;
use log::{debug, warn};
use rusqlite::ffi;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension};
use std::marker::PhantomData;

pub struct SqliteRepository<'conn, R: Table> {
    conn: &'conn Connection,
    _record: PhantomData<R>,
}

impl<'conn, R: Table> SqliteRepository<'conn, R> {
    /// Binds a repository to a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations have not run.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` on schema drift.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready::<R>(conn)?;
        Ok(Self {
            conn,
            _record: PhantomData,
        })
    }

    /// Query builder for joins and ad hoc filters beyond [`FilterSpec`].
    pub fn query(&self) -> QueryBuilder<'conn, R> {
        QueryBuilder::new(self.conn)
    }

    fn write_row(&self, sql: &str, record: &R, id: Option<RecordId>) -> RepoResult<usize> {
        let mut values = record.to_row(self.conn)?;
        if let Some(id) = id {
            values.push(id.into());
        }
        self.conn
            .execute(sql, params_from_iter(values))
            .map_err(|err| translate_write_error::<R>(err, || record.describe()))
    }
}

impl<R: Table> Repository<R> for SqliteRepository<'_, R> {
    fn add(&mut self, record: &R) -> RepoResult<RecordId> {
        record.validate()?;
        let placeholders = (1..=R::COLUMNS.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({placeholders});",
            R::TABLE,
            R::COLUMNS.join(", ")
        );
        self.write_row(&sql, record, None)?;

        let id = self.conn.last_insert_rowid();
        debug!("event=record_add module=repo backend=sqlite kind={} id={id}", R::KIND);
        Ok(id)
    }

    fn get(&self, id: RecordId) -> RepoResult<Option<R>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {}.id = ?1;",
            R::SELECT,
            R::SOURCE,
            R::TABLE
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params![id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(R::from_row(row)?));
        }
        Ok(None)
    }

    fn list(&self) -> RepoResult<Vec<R>> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY {}.id;",
            R::SELECT,
            R::SOURCE,
            R::TABLE
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(R::from_row(row)?);
        }
        Ok(records)
    }

    fn find(&self, spec: &FilterSpec<R::Field>) -> RepoResult<Vec<R>> {
        ensure_filtered::<R>(spec)?;
        self.query().apply(spec).run()
    }

    fn find_ids(&self, spec: &FilterSpec<R::Field>) -> RepoResult<Vec<RecordId>> {
        ensure_filtered::<R>(spec)?;
        self.query().apply(spec).run_ids()
    }

    fn id_of(&self, record: &R) -> RepoResult<Option<RecordId>> {
        lookup_unique_key(self.conn, record)
    }

    fn update(&mut self, id: RecordId, changes: &Changes<R::Field>) -> RepoResult<usize> {
        let mut record = self
            .get(id)?
            .ok_or(RepoError::NotFound { kind: R::KIND, id })?;
        apply_changes(&mut record, changes)?;

        let assignments = R::COLUMNS
            .iter()
            .enumerate()
            .map(|(index, column)| format!("{column} = ?{}", index + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {assignments} WHERE id = ?{};",
            R::TABLE,
            R::COLUMNS.len() + 1
        );
        let changed = self.write_row(&sql, &record, Some(id))?;
        debug!("event=record_update module=repo backend=sqlite kind={} id={id}", R::KIND);
        Ok(changed)
    }

    fn delete(&mut self, id: RecordId) -> RepoResult<R> {
        let record = self
            .get(id)?
            .ok_or(RepoError::NotFound { kind: R::KIND, id })?;
        let sql = format!("DELETE FROM {} WHERE id = ?1;", R::TABLE);
        self.conn
            .execute(&sql, params![id])
            .map_err(|err| translate_write_error::<R>(err, || record.describe()))?;
        debug!("event=record_delete module=repo backend=sqlite kind={} id={id}", R::KIND);
        Ok(record)
    }

    fn delete_where(&mut self, spec: &FilterSpec<R::Field>) -> RepoResult<usize> {
        let ids = self.find_ids(spec)?;
        if ids.is_empty() {
            return Ok(0);
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("DELETE FROM {} WHERE id IN ({placeholders});", R::TABLE);
        let removed = self
            .conn
            .execute(&sql, params_from_iter(ids.iter()))
            .map_err(|err| translate_write_error::<R>(err, || format!("{} records", ids.len())))?;
        debug!(
            "event=record_delete module=repo backend=sqlite kind={} count={removed}",
            R::KIND
        );
        Ok(removed)
    }

    fn delete_all(&mut self) -> RepoResult<usize> {
        let sql = format!("DELETE FROM {};", R::TABLE);
        let removed = self.conn.execute(&sql, [])?;
        debug!(
            "event=record_delete module=repo backend=sqlite kind={} count={removed}",
            R::KIND
        );
        Ok(removed)
    }

    fn count(&self) -> RepoResult<usize> {
        let sql = format!("SELECT COUNT(*) FROM {};", R::TABLE);
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        usize::try_from(count).map_err(|_| RepoError::InvalidData(format!("row count {count}")))
    }
}

/// Maps store constraint failures to `DuplicateIdentity` or
/// `ConstraintViolation`; other errors pass through as `Db`.
fn translate_write_error<R: Table>(
    err: rusqlite::Error,
    detail: impl FnOnce() -> String,
) -> RepoError {
    let rusqlite::Error::SqliteFailure(failure, message) = &err else {
        return err.into();
    };
    if failure.code != ErrorCode::ConstraintViolation {
        return err.into();
    }

    let error_code = match failure.extended_code {
        ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => "unique",
        ffi::SQLITE_CONSTRAINT_CHECK => "check",
        ffi::SQLITE_CONSTRAINT_NOTNULL => "not_null",
        ffi::SQLITE_CONSTRAINT_FOREIGNKEY => "foreign_key",
        _ => "other",
    };
    warn!(
        "event=constraint_violation module=repo status=error kind={} error_code={error_code}",
        R::KIND
    );

    if error_code == "unique" {
        return RepoError::DuplicateIdentity {
            kind: R::KIND,
            detail: detail(),
        };
    }
    RepoError::ConstraintViolation(
        message
            .clone()
            .unwrap_or_else(|| format!("{} {error_code} constraint failed", R::KIND)),
    )
}

fn ensure_connection_ready<R: Table>(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = schema_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in R::TABLES {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(*table));
        }
    }

    for column in std::iter::once(&"id").chain(R::COLUMNS) {
        if !table_has_column(conn, R::TABLE, column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: R::TABLE,
                column: *column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1;",
            [table],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(exists.is_some())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::SqliteRepository;
    use crate::db::open_db_in_memory;
    use crate::model::employment::Employment;
    use crate::model::work::Work;
    use crate::repo::RepoError;
    use rusqlite::Connection;

    #[test]
    fn unmigrated_connection_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        let result = SqliteRepository::<Work>::try_new(&conn);
        assert!(matches!(
            result,
            Err(RepoError::UninitializedConnection {
                actual_version: 0,
                ..
            })
        ));
    }

    #[test]
    fn missing_column_is_reported() {
        let conn = open_db_in_memory().unwrap();
        conn.execute_batch("ALTER TABLE employment DROP COLUMN phone;")
            .unwrap();
        let result = SqliteRepository::<Employment>::try_new(&conn);
        assert!(matches!(
            result,
            Err(RepoError::MissingRequiredColumn {
                table: "employment",
                column: "phone"
            })
        ));
    }
}
