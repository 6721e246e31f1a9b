//! Record-keeping core for Folio.
//!
//! Typed records with identity and ordering semantics, a backend-neutral
//! filter vocabulary, repositories over memory and SQLite, and units of work
//! that make multi-record changes atomic.

pub mod config;
pub mod db;
pub mod filter;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod uow;

pub use config::{ConfigError, FolioConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use filter::{Constraint, FilterSpec, SortOrder};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status, LoggingError};
pub use model::address::{Address, AddressField, Location};
pub use model::book::{Book, BookField, BookFormat};
pub use model::employment::{Employment, EmploymentContact, EmploymentField};
pub use model::record::Record;
pub use model::travel::{Travel, TravelField};
pub use model::work::{Work, WorkField};
pub use model::{FieldValue, RecordField, ValidationError};
pub use repo::memory::{InMemoryCatalog, InMemoryRepository};
pub use repo::sqlite::SqliteRepository;
pub use repo::{Changes, RecordId, RepoError, RepoResult, Repository};
pub use service::{ServiceError, ServiceResult};
pub use uow::{InMemoryStore, Repositories, ScopeState, SqliteStore, Store, UnitOfWork};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
