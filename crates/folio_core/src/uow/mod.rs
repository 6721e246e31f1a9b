//! Unit of work: one atomic transactional scope over all repositories.
//!
//! # Responsibility
//! - Bind every record repository to one transaction.
//! - Commit when the scope closure returns `Ok`, roll back otherwise.
//!
//! # Invariants
//! - State moves `Idle -> Active -> Committed | RolledBack` exactly once; a
//!   second `run` on the same instance fails with `ScopeReused`.
//! - Repositories handed to the closure cannot outlive the scope.
//! - The storage resource is released on every exit path, panics included.

pub mod memory;
pub mod sqlite;

use crate::model::address::Address;
use crate::model::book::Book;
use crate::model::employment::Employment;
use crate::model::travel::Travel;
use crate::model::work::Work;
use crate::repo::{RepoError, Repository};

pub use memory::{InMemoryStore, MemoryUnitOfWork};
pub use sqlite::{ConnectionProvider, FileConnectionProvider, SqliteStore, SqliteUnitOfWork};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeState {
    Idle,
    Active,
    Committed,
    RolledBack,
}

/// Repositories bound to one active scope.
pub trait Repositories {
    fn works(&mut self) -> &mut dyn Repository<Work>;
    fn books(&mut self) -> &mut dyn Repository<Book>;
    fn travels(&mut self) -> &mut dyn Repository<Travel>;
    fn addresses(&mut self) -> &mut dyn Repository<Address>;
    fn employments(&mut self) -> &mut dyn Repository<Employment>;
}

/// Single-use transactional scope.
pub trait UnitOfWork {
    fn state(&self) -> ScopeState;

    /// Runs `work` inside the scope.
    ///
    /// `Ok` commits; `Err` rolls back and is returned unchanged. A commit
    /// failure rolls back and returns `TransactionFailure`.
    fn run<T, E, F>(&mut self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn Repositories) -> Result<T, E>,
        E: From<RepoError>;
}

/// Source of fresh units of work over one backing store.
pub trait Store {
    type Uow<'s>: UnitOfWork
    where
        Self: 's;

    fn unit_of_work(&self) -> Self::Uow<'_>;
}

/// Rejects entering a scope that has already run.
pub(crate) fn begin(state: &mut ScopeState) -> Result<(), RepoError> {
    if *state != ScopeState::Idle {
        return Err(RepoError::ScopeReused);
    }
    *state = ScopeState::Active;
    Ok(())
}
