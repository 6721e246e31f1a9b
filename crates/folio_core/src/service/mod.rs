//! Record use-case services.
//!
//! # Responsibility
//! - Turn raw caller input into validated records.
//! - Run each use case inside one unit of work.
//! - Enforce cross-record rules (no overlapping address periods, books
//!   belong to a stored work).
//!
//! # Invariants
//! - Services never bypass repository validation/persistence contracts.
//! - Services stay storage-agnostic: they depend on [`Store`] only.

pub mod address_service;
pub mod employment_service;
pub mod travel_service;
pub mod work_service;

use crate::model::ValidationError;
use crate::repo::{RecordId, RepoError};
use crate::uow::{Repositories, Store, UnitOfWork};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub use address_service::{AddressInput, AddressService};
pub use employment_service::{EmploymentInput, EmploymentService};
pub use travel_service::{TravelInput, TravelQuery, TravelService};
pub use work_service::{BookInput, BookQuery, WorkInput, WorkQuery, WorkService};

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug)]
pub enum ServiceError {
    /// Caller input failed validation.
    Validation(ValidationError),
    /// Referenced record does not exist.
    NotFound { kind: &'static str, id: RecordId },
    /// New or updated period intersects a stored one.
    PeriodOverlap { existing: String },
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::PeriodOverlap { existing } => {
                write!(f, "period overlaps an existing entry: {existing}")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { kind, id } => Self::NotFound { kind, id },
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

/// Runs `work` in a fresh unit of work of `store`.
pub(crate) fn in_scope<S, T, F>(store: &S, work: F) -> ServiceResult<T>
where
    S: Store,
    F: FnOnce(&mut dyn Repositories) -> ServiceResult<T>,
{
    store.unit_of_work().run(work)
}
