//! Repository layer: storage-neutral record persistence contract.
//!
//! # Responsibility
//! - Define the generic add/get/list/find/update/delete contract for one
//!   record type.
//! - Provide the error taxonomy every backend reports in.
//!
//! # Invariants
//! - Write paths validate records before they reach storage.
//! - `find` and `delete_where` reject a filter that resolves to no predicate.
//! - Surrogate ids are assigned on `add` and never reused by a backend.
//! - Backends translate storage failures into [`RepoError`] variants; callers
//!   never match on driver error types.
//!
//! # See also
//! - `memory` and `sqlite` for the two backends.

pub mod memory;
pub mod query;
pub mod sqlite;
pub mod table;

use crate::db::DbError;
use crate::filter::FilterSpec;
use crate::model::record::Record;
use crate::model::{FieldValue, RecordField, UnknownField, ValidationError};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-assigned surrogate key.
pub type RecordId = i64;

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    NotFound {
        kind: &'static str,
        id: RecordId,
    },
    /// Another stored record has the same identity fields.
    DuplicateIdentity {
        kind: &'static str,
        detail: String,
    },
    /// Unknown field name, or a field that cannot be updated.
    InvalidField {
        kind: &'static str,
        field: String,
    },
    /// Filter resolved to no predicate.
    EmptyFilter {
        kind: &'static str,
    },
    /// Store-level constraint failure other than identity collisions.
    ConstraintViolation(String),
    /// Commit failed; the scope was rolled back.
    TransactionFailure(DbError),
    /// A unit of work was entered twice.
    ScopeReused,
    /// Filter references a table that was never joined.
    JoinRequired {
        table: &'static str,
    },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::DuplicateIdentity { kind, detail } => {
                write!(f, "{kind} already exists: {detail}")
            }
            Self::InvalidField { kind, field } => {
                write!(f, "invalid {kind} field `{field}`")
            }
            Self::EmptyFilter { kind } => {
                write!(f, "refusing to query {kind} records without any filter")
            }
            Self::ConstraintViolation(message) => write!(f, "constraint violation: {message}"),
            Self::TransactionFailure(err) => write!(f, "transaction failed: {err}"),
            Self::ScopeReused => write!(f, "unit of work has already been used"),
            Self::JoinRequired { table } => {
                write!(f, "filter on `{table}` requires a join with that table")
            }
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "repository requires column `{table}.{column}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) | Self::TransactionFailure(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<UnknownField> for RepoError {
    fn from(value: UnknownField) -> Self {
        Self::InvalidField {
            kind: value.record,
            field: value.name,
        }
    }
}

/// Field updates for one record. Null values are skipped when applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Changes<F> {
    values: Vec<(F, FieldValue)>,
}

impl<F> Default for Changes<F> {
    fn default() -> Self {
        Self { values: Vec::new() }
    }
}

impl<F: RecordField> Changes<F> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: F, value: impl Into<FieldValue>) -> Self {
        self.values.push((field, value.into()));
        self
    }

    /// Adds a change for a field given by name.
    pub fn named(self, name: &str, value: impl Into<FieldValue>) -> Result<Self, UnknownField> {
        let field = F::parse(name)?;
        Ok(self.set(field, value))
    }

    /// Non-null changes, in insertion order.
    pub fn effective(&self) -> impl Iterator<Item = (F, &FieldValue)> {
        self.values
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(field, value)| (*field, value))
    }

    pub fn is_empty(&self) -> bool {
        self.effective().next().is_none()
    }
}

/// Applies `changes` to `record` and re-validates it.
///
/// # Errors
/// - `Validation(NoChanges)` when every supplied value is null.
/// - `InvalidField` for a field that cannot be updated.
/// - `Validation` when a value has the wrong type or breaks an invariant.
pub(crate) fn apply_changes<R: Record>(
    record: &mut R,
    changes: &Changes<R::Field>,
) -> RepoResult<()> {
    if changes.is_empty() {
        return Err(ValidationError::NoChanges.into());
    }
    for (field, value) in changes.effective() {
        if !field.is_updatable() {
            return Err(RepoError::InvalidField {
                kind: R::KIND,
                field: field.name().to_string(),
            });
        }
        record.set_field(field, value.clone())?;
    }
    record.validate()?;
    Ok(())
}

pub(crate) fn ensure_filtered<R: Record>(spec: &FilterSpec<R::Field>) -> RepoResult<()> {
    if spec.is_empty() {
        return Err(RepoError::EmptyFilter { kind: R::KIND });
    }
    Ok(())
}

/// Persistence contract for one record type.
pub trait Repository<R: Record> {
    /// Persists `record` and returns its new surrogate id.
    ///
    /// # Errors
    /// - `DuplicateIdentity` when a record with the same unique key exists.
    fn add(&mut self, record: &R) -> RepoResult<RecordId>;

    /// Record stored under `id`; `None` when absent.
    fn get(&self, id: RecordId) -> RepoResult<Option<R>>;

    /// All records, in id order.
    fn list(&self) -> RepoResult<Vec<R>>;

    /// Records matching every predicate of `spec`.
    ///
    /// # Errors
    /// - `EmptyFilter` when `spec` imposes no constraint.
    fn find(&self, spec: &FilterSpec<R::Field>) -> RepoResult<Vec<R>>;

    /// Ids of records matching `spec`, honoring its order and limit.
    fn find_ids(&self, spec: &FilterSpec<R::Field>) -> RepoResult<Vec<RecordId>>;

    /// Surrogate id of the stored record with the same unique key as `record`.
    fn id_of(&self, record: &R) -> RepoResult<Option<RecordId>>;

    /// Applies non-null `changes` to the record at `id`; returns rows changed.
    ///
    /// # Errors
    /// - `NotFound` when `id` is absent.
    /// - `DuplicateIdentity` when the result collides with another record.
    fn update(&mut self, id: RecordId, changes: &Changes<R::Field>) -> RepoResult<usize>;

    /// Removes and returns the record at `id`.
    fn delete(&mut self, id: RecordId) -> RepoResult<R>;

    /// Removes records matching `spec`; returns how many were removed.
    fn delete_where(&mut self, spec: &FilterSpec<R::Field>) -> RepoResult<usize>;

    /// Removes every record.
    fn delete_all(&mut self) -> RepoResult<usize>;

    fn count(&self) -> RepoResult<usize> {
        Ok(self.list()?.len())
    }
}
