//! Address history use-case service.
//!
//! # Invariants
//! - Stored address periods never overlap. Periods are half-open
//!   `[start, end)` and open-ended periods run to the reference date.
//! - The reference date is today unless a fixed one is supplied.

use super::{in_scope, ServiceError, ServiceResult};
use crate::filter::{FilterSpec, SortOrder};
use crate::model::address::{Address, AddressField, Location};
use crate::model::date::{parse_date, parse_optional_date, today};
use crate::model::record::Record;
use crate::repo::{apply_changes, Changes, RecordId};
use crate::uow::{Repositories, Store};
use chrono::NaiveDate;

/// Raw input for a new address; dates are `YYYY-MM-DD`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressInput {
    pub street: String,
    pub city: String,
    pub province: Option<String>,
    pub country: String,
    pub postal_code: String,
    pub start: String,
    pub end: Option<String>,
}

pub struct AddressService<'s, S: Store> {
    store: &'s S,
    as_of: Option<NaiveDate>,
}

impl<'s, S: Store> AddressService<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store, as_of: None }
    }

    /// Uses `as_of` instead of today to close open-ended periods.
    pub fn with_reference_date(store: &'s S, as_of: NaiveDate) -> Self {
        Self {
            store,
            as_of: Some(as_of),
        }
    }

    fn reference_date(&self) -> NaiveDate {
        self.as_of.unwrap_or_else(today)
    }

    /// Validates and stores a new address.
    ///
    /// # Errors
    /// - `Validation` for malformed input or dates.
    /// - `PeriodOverlap` when the period intersects a stored one.
    /// - `Repo(DuplicateIdentity)` when the location is stored for the same period.
    pub fn add(&self, input: &AddressInput) -> ServiceResult<RecordId> {
        let location = Location {
            street: input.street.clone(),
            city: input.city.clone(),
            province: input.province.clone(),
            country: input.country.clone(),
            postal_code: input.postal_code.clone(),
        };
        let address = Address::new(
            &location,
            parse_date(&input.start)?,
            parse_optional_date(input.end.as_deref())?,
        )?;
        let as_of = self.reference_date();
        in_scope(self.store, |repos| {
            ensure_no_overlap(repos, &address, None, as_of)?;
            Ok(repos.addresses().add(&address)?)
        })
    }

    pub fn get(&self, id: RecordId) -> ServiceResult<Option<Address>> {
        in_scope(self.store, |repos| Ok(repos.addresses().get(id)?))
    }

    /// Addresses sorted longest period first.
    pub fn list(&self) -> ServiceResult<Vec<Address>> {
        let as_of = self.reference_date();
        let mut addresses = in_scope(self.store, |repos| Ok(repos.addresses().list()?))?;
        addresses.sort_by_cached_key(|address| address.ordering_fields_as_of(as_of));
        Ok(addresses)
    }

    pub fn find(&self, spec: &FilterSpec<AddressField>) -> ServiceResult<Vec<Address>> {
        in_scope(self.store, |repos| Ok(repos.addresses().find(spec)?))
    }

    /// The open-ended address with the latest start, if any.
    pub fn current(&self) -> ServiceResult<Option<Address>> {
        let spec = FilterSpec::new()
            .absent(AddressField::End)
            .with_order(AddressField::Start, SortOrder::Descending)
            .with_limit(1);
        let mut found = self.find(&spec)?;
        Ok(found.pop())
    }

    /// Applies `changes`, keeping periods disjoint.
    pub fn update(&self, id: RecordId, changes: &Changes<AddressField>) -> ServiceResult<usize> {
        let as_of = self.reference_date();
        in_scope(self.store, |repos| {
            let stored = repos.addresses().get(id)?.ok_or(ServiceError::NotFound {
                kind: Address::KIND,
                id,
            })?;
            let mut candidate = stored.clone();
            apply_changes(&mut candidate, changes)?;
            ensure_no_overlap(repos, &candidate, Some(&stored), as_of)?;
            Ok(repos.addresses().update(id, changes)?)
        })
    }

    pub fn delete(&self, id: RecordId) -> ServiceResult<Address> {
        in_scope(self.store, |repos| Ok(repos.addresses().delete(id)?))
    }

    pub fn delete_where(&self, spec: &FilterSpec<AddressField>) -> ServiceResult<usize> {
        in_scope(self.store, |repos| Ok(repos.addresses().delete_where(spec)?))
    }
}

fn ensure_no_overlap(
    repos: &mut dyn Repositories,
    candidate: &Address,
    replacing: Option<&Address>,
    as_of: NaiveDate,
) -> ServiceResult<()> {
    let mut stored = repos.addresses().list()?;
    stored.sort_by_cached_key(|address| address.ordering_fields_as_of(as_of));
    let clash = stored
        .iter()
        .filter(|existing| replacing.map_or(true, |replaced| !existing.same_identity(replaced)))
        .find(|existing| existing.overlaps(candidate.start(), candidate.end(), as_of));
    match clash {
        Some(existing) => Err(ServiceError::PeriodOverlap {
            existing: existing.describe(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::{AddressInput, AddressService};
    use crate::service::ServiceError;
    use crate::uow::InMemoryStore;
    use chrono::NaiveDate;

    fn input(street: &str, start: &str, end: Option<&str>) -> AddressInput {
        AddressInput {
            street: street.to_string(),
            city: "Halifax".to_string(),
            province: Some("NS".to_string()),
            country: "Canada".to_string(),
            postal_code: "B3H 1A1".to_string(),
            start: start.to_string(),
            end: end.map(str::to_string),
        }
    }

    #[test]
    fn overlapping_period_is_rejected() {
        let store = InMemoryStore::new();
        let as_of = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let service = AddressService::with_reference_date(&store, as_of);
        service
            .add(&input("1 Main St", "2020-01-01", Some("2021-01-01")))
            .unwrap();

        let err = service
            .add(&input("2 Side St", "2020-06-01", None))
            .unwrap_err();
        assert!(matches!(err, ServiceError::PeriodOverlap { .. }));

        service.add(&input("2 Side St", "2021-01-01", None)).unwrap();
        assert_eq!(service.current().unwrap().unwrap().street(), "2 Side St");
    }

    #[test]
    fn malformed_date_is_a_validation_error() {
        let store = InMemoryStore::new();
        let service = AddressService::new(&store);
        let err = service
            .add(&input("1 Main St", "01/01/2020", None))
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}
