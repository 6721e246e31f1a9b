//! In-memory store: scopes run against a working copy swapped in on commit.

use super::{begin, Repositories, ScopeState, Store, UnitOfWork};
use crate::model::address::Address;
use crate::model::book::Book;
use crate::model::employment::Employment;
use crate::model::travel::Travel;
use crate::model::work::Work;
use crate::repo::memory::{InMemoryCatalog, InMemoryRepository};
use crate::repo::{RepoError, Repository};
use log::{debug, info};
use std::cell::RefCell;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
struct MemoryRepositories {
    catalog: InMemoryCatalog,
    travels: InMemoryRepository<Travel>,
    addresses: InMemoryRepository<Address>,
    employments: InMemoryRepository<Employment>,
}

impl Repositories for MemoryRepositories {
    fn works(&mut self) -> &mut dyn Repository<Work> {
        &mut self.catalog
    }

    fn books(&mut self) -> &mut dyn Repository<Book> {
        &mut self.catalog
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

/// Process-local store, mainly for tests and dry runs.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    committed: RefCell<MemoryRepositories>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for InMemoryStore {
    type Uow<'s> = MemoryUnitOfWork<'s>;

    fn unit_of_work(&self) -> MemoryUnitOfWork<'_> {
        MemoryUnitOfWork {
            store: self,
            state: ScopeState::Idle,
            scope_id: Uuid::new_v4(),
        }
    }
}

pub struct MemoryUnitOfWork<'s> {
    store: &'s InMemoryStore,
    state: ScopeState,
    scope_id: Uuid,
}

impl UnitOfWork for MemoryUnitOfWork<'_> {
    fn state(&self) -> ScopeState {
        self.state
    }

    fn run<T, E, F>(&mut self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn Repositories) -> Result<T, E>,
        E: From<RepoError>,
    {
        begin(&mut self.state)?;
        let scope_id = self.scope_id;
        debug!("event=uow_begin module=uow status=start backend=memory scope_id={scope_id}");

        let mut working = self.store.committed.borrow().clone();
        match work(&mut working) {
            Ok(value) => {
                *self.store.committed.borrow_mut() = working;
                self.state = ScopeState::Committed;
                debug!("event=uow_commit module=uow status=ok backend=memory scope_id={scope_id}");
                Ok(value)
            }
            Err(err) => {
                self.state = ScopeState::RolledBack;
                info!(
                    "event=uow_rollback module=uow status=ok backend=memory scope_id={scope_id}"
                );
                Err(err)
            }
        }
    }
}
