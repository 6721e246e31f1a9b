//! Record contract shared by every persisted entity.
//!
//! # Responsibility
//! - Declare identity fields, ordering fields and the human-readable form.
//! - Derive equality, hashing and comparison from those tuples once.
//!
//! # Invariants
//! - `a == b` iff `a.identity_fields() == b.identity_fields()`.
//! - `hash(a)` is the hash of `a.identity_fields()`.
//! - `compare` is a lexicographic compare of `ordering_fields()`.
//! - `unique_key()` is what a store keeps unique. It extends the identity
//!   for dated records, so one location or employer may recur over
//!   separate periods.
//! - Optional tuple members are paired as `(is_absent, value)` so that an
//!   absent value always sorts after every present value.
//!
//! Ordering and identity may disagree (two addresses with the same location
//! but different periods are equal yet not `Ordering::Equal`), so records
//! expose `compare` instead of implementing `Ord`.

use super::{FieldValue, RecordField, ValidationError};
use std::cmp::Ordering;
use std::fmt::Debug;
use std::hash::Hash;

/// Pairs an optional value with its absence flag so `None` sorts last.
pub type AbsentLast<T> = (bool, Option<T>);

/// Builds the `(is_absent, value)` pair for an optional tuple member.
pub fn absent_last<T>(value: Option<T>) -> AbsentLast<T> {
    (value.is_none(), value)
}

/// Capability interface implemented by each concrete record type.
pub trait Record: Clone + Debug + Eq + Hash {
    /// Closed attribute enumeration for this record type.
    type Field: RecordField;
    /// Normalized identity tuple.
    type Identity: Clone + Debug + Eq + Hash + Ord;
    /// Total-order sort key.
    type Ordering: Debug + Ord;
    /// Storage uniqueness key; the identity for undated records.
    type UniqueKey: Clone + Debug + Eq + Hash;

    /// Record kind, also the storage table name.
    const KIND: &'static str;

    fn identity_fields(&self) -> Self::Identity;

    fn ordering_fields(&self) -> Self::Ordering;

    fn unique_key(&self) -> Self::UniqueKey;

    /// Human-readable form. Not used for equality.
    fn describe(&self) -> String;

    /// Re-checks construction invariants.
    fn validate(&self) -> Result<(), ValidationError>;

    /// Reads one attribute.
    fn field(&self, field: Self::Field) -> FieldValue;

    /// Writes one attribute, checking the value type and normalizing text.
    ///
    /// Cross-field invariants are checked by `validate`, not here.
    fn set_field(&mut self, field: Self::Field, value: FieldValue) -> Result<(), ValidationError>;

    fn same_identity(&self, other: &Self) -> bool {
        self.identity_fields() == other.identity_fields()
    }

    fn compare(&self, other: &Self) -> Ordering {
        self.ordering_fields().cmp(&other.ordering_fields())
    }
}

/// Sorts records by their ordering fields.
pub fn sort_records<R: Record>(records: &mut [R]) {
    records.sort_by_cached_key(R::ordering_fields);
}

/// Implements `PartialEq`, `Eq` and `Hash` through `Record::identity_fields`.
macro_rules! identity_semantics {
    ($ty:ty) => {
        impl PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                <$ty as $crate::model::record::Record>::identity_fields(self)
                    == <$ty as $crate::model::record::Record>::identity_fields(other)
            }
        }

        impl Eq for $ty {}

        impl std::hash::Hash for $ty {
            fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
                std::hash::Hash::hash(
                    &<$ty as $crate::model::record::Record>::identity_fields(self),
                    state,
                );
            }
        }
    };
}

pub(crate) use identity_semantics;

#[cfg(test)]
mod tests {
    use super::absent_last;

    #[test]
    fn absent_values_sort_after_present_values() {
        let mut keys = vec![absent_last(None), absent_last(Some(3)), absent_last(Some(-10))];
        keys.sort();
        assert_eq!(keys, vec![(false, Some(-10)), (false, Some(3)), (true, None)]);
    }
}
