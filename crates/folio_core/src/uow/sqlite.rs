//! SQLite store: one connection and one IMMEDIATE transaction per scope.
//!
//! # Invariants
//! - The provider is called exactly once per scope.
//! - The connection is owned by the scope and dropped on every exit path;
//!   a dropped, uncommitted transaction rolls back.
//! - IMMEDIATE transactions take the write lock up front, so a second
//!   concurrent writer waits on the busy timeout or fails in SQLite.

use super::{begin, Repositories, ScopeState, Store, UnitOfWork};
use crate::db::{open_db, DbError, DbResult};
use crate::model::address::Address;
use crate::model::book::Book;
use crate::model::employment::Employment;
use crate::model::travel::Travel;
use crate::model::work::Work;
use crate::repo::sqlite::SqliteRepository;
use crate::repo::{RepoError, RepoResult, Repository};
use log::{error, info};
use rusqlite::{Connection, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::time::Instant;
use uuid::Uuid;

/// Hands out live, migrated connections.
pub trait ConnectionProvider {
    fn connect(&self) -> DbResult<Connection>;
}

impl<F> ConnectionProvider for F
where
    F: Fn() -> DbResult<Connection>,
{
    fn connect(&self) -> DbResult<Connection> {
        self()
    }
}

/// Opens the database file at a fixed path.
#[derive(Debug, Clone)]
pub struct FileConnectionProvider {
    path: PathBuf,
}

impl FileConnectionProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConnectionProvider for FileConnectionProvider {
    fn connect(&self) -> DbResult<Connection> {
        open_db(&self.path)
    }
}

struct SqliteRepositories<'conn> {
    works: SqliteRepository<'conn, Work>,
    books: SqliteRepository<'conn, Book>,
    travels: SqliteRepository<'conn, Travel>,
    addresses: SqliteRepository<'conn, Address>,
    employments: SqliteRepository<'conn, Employment>,
}

impl<'conn> SqliteRepositories<'conn> {
    fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        Ok(Self {
            works: SqliteRepository::try_new(conn)?,
            books: SqliteRepository::try_new(conn)?,
            travels: SqliteRepository::try_new(conn)?,
            addresses: SqliteRepository::try_new(conn)?,
            employments: SqliteRepository::try_new(conn)?,
        })
    }
}

impl Repositories for SqliteRepositories<'_> {
    fn works(&mut self) -> &mut dyn Repository<Work> {
        &mut self.works
    }

    fn books(&mut self) -> &mut dyn Repository<Book> {
        &mut self.books
    }

    fn travels(&mut self) -> &mut dyn Repository<Travel> {
        &mut self.travels
    }

    fn addresses(&mut self) -> &mut dyn Repository<Address> {
        &mut self.addresses
    }

    fn employments(&mut self) -> &mut dyn Repository<Employment> {
        &mut self.employments
    }
}

/// Store backed by SQLite connections from `P`.
#[derive(Debug, Clone)]
pub struct SqliteStore<P> {
    provider: P,
}

impl<P: ConnectionProvider> SqliteStore<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

impl SqliteStore<FileConnectionProvider> {
    /// Store over the database file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::new(FileConnectionProvider::new(path))
    }
}

impl<P: ConnectionProvider> Store for SqliteStore<P> {
    type Uow<'s> = SqliteUnitOfWork<'s, P> where Self: 's;

    fn unit_of_work(&self) -> SqliteUnitOfWork<'_, P> {
        SqliteUnitOfWork {
            provider: &self.provider,
            state: ScopeState::Idle,
            scope_id: Uuid::new_v4(),
        }
    }
}

pub struct SqliteUnitOfWork<'s, P> {
    provider: &'s P,
    state: ScopeState,
    scope_id: Uuid,
}

impl<P: ConnectionProvider> SqliteUnitOfWork<'_, P> {
    fn roll_back(&mut self, started_at: Instant, reason: &str) {
        self.state = ScopeState::RolledBack;
        info!(
            "event=uow_rollback module=uow status=ok scope_id={} duration_ms={} reason={reason}",
            self.scope_id,
            started_at.elapsed().as_millis()
        );
    }
}

impl<P: ConnectionProvider> UnitOfWork for SqliteUnitOfWork<'_, P> {
    fn state(&self) -> ScopeState {
        self.state
    }

    fn run<T, E, F>(&mut self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn Repositories) -> Result<T, E>,
        E: From<RepoError>,
    {
        begin(&mut self.state)?;
        let started_at = Instant::now();
        info!(
            "event=uow_begin module=uow status=start scope_id={}",
            self.scope_id
        );

        let mut conn = match self.provider.connect() {
            Ok(conn) => conn,
            Err(err) => {
                error!(
                    "event=uow_begin module=uow status=error scope_id={} error_code=connect_failed error={err}",
                    self.scope_id
                );
                self.roll_back(started_at, "connect_failed");
                return Err(RepoError::from(err).into());
            }
        };
        let tx = match conn.transaction_with_behavior(TransactionBehavior::Immediate) {
            Ok(tx) => tx,
            Err(err) => {
                self.roll_back(started_at, "begin_failed");
                return Err(RepoError::from(err).into());
            }
        };

        let outcome = match SqliteRepositories::try_new(&tx) {
            Ok(mut repos) => work(&mut repos),
            Err(err) => Err(err.into()),
        };

        match outcome {
            Ok(value) => match tx.commit() {
                Ok(()) => {
                    self.state = ScopeState::Committed;
                    info!(
                        "event=uow_commit module=uow status=ok scope_id={} duration_ms={}",
                        self.scope_id,
                        started_at.elapsed().as_millis()
                    );
                    Ok(value)
                }
                Err(err) => {
                    error!(
                        "event=uow_commit module=uow status=error scope_id={} error_code=commit_failed error={err}",
                        self.scope_id
                    );
                    self.roll_back(started_at, "commit_failed");
                    Err(RepoError::TransactionFailure(DbError::Sqlite(err)).into())
                }
            },
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    error!(
                        "event=uow_rollback module=uow status=error scope_id={} error={rollback_err}",
                        self.scope_id
                    );
                }
                self.roll_back(started_at, "scope_error");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SqliteStore;
    use crate::db::{open_db_in_memory, DbError};
    use crate::repo::RepoError;
    use crate::uow::{ScopeState, Store, UnitOfWork};
    use rusqlite::Connection;

    #[test]
    fn second_run_on_same_scope_is_rejected() {
        let store = SqliteStore::new(open_db_in_memory);
        let mut uow = store.unit_of_work();
        uow.run(|repos| repos.works().count()).unwrap();
        assert_eq!(uow.state(), ScopeState::Committed);

        let err = uow
            .run(|repos| repos.works().count())
            .unwrap_err();
        assert!(matches!(err, RepoError::ScopeReused));
    }

    #[test]
    fn connect_failure_rolls_back_scope() {
        let store = SqliteStore::new(|| -> Result<Connection, DbError> {
            Err(DbError::UnsupportedSchemaVersion {
                db_version: 99,
                latest_supported: 1,
            })
        });
        let mut uow = store.unit_of_work();
        let err = uow.run(|repos| repos.works().count()).unwrap_err();
        assert!(matches!(err, RepoError::Db(_)));
        assert_eq!(uow.state(), ScopeState::RolledBack);
    }
}
