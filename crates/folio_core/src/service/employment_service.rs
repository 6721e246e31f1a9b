//! Employment history use-case service.

use super::{in_scope, ServiceResult};
use crate::filter::FilterSpec;
use crate::model::date::{parse_date, parse_optional_date, today};
use crate::model::employment::{Employment, EmploymentContact, EmploymentField};
use crate::repo::{Changes, RecordId};
use crate::uow::Store;

/// Raw input for a new employment; dates are `YYYY-MM-DD`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmploymentInput {
    pub company: String,
    pub start: String,
    pub end: Option<String>,
    pub supervisor: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
}

pub struct EmploymentService<'s, S: Store> {
    store: &'s S,
}

impl<'s, S: Store> EmploymentService<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    pub fn add(&self, input: &EmploymentInput) -> ServiceResult<RecordId> {
        let contact = EmploymentContact {
            supervisor: input.supervisor.clone(),
            address: input.address.clone(),
            phone: input.phone.clone(),
        };
        let employment = Employment::new(
            &input.company,
            parse_date(&input.start)?,
            parse_optional_date(input.end.as_deref())?,
            &contact,
        )?;
        in_scope(self.store, |repos| Ok(repos.employments().add(&employment)?))
    }

    pub fn get(&self, id: RecordId) -> ServiceResult<Option<Employment>> {
        in_scope(self.store, |repos| Ok(repos.employments().get(id)?))
    }

    /// Jobs sorted longest period first.
    pub fn list(&self) -> ServiceResult<Vec<Employment>> {
        let as_of = today();
        let mut jobs = in_scope(self.store, |repos| Ok(repos.employments().list()?))?;
        jobs.sort_by_cached_key(|job| job.ordering_fields_as_of(as_of));
        Ok(jobs)
    }

    pub fn find(&self, spec: &FilterSpec<EmploymentField>) -> ServiceResult<Vec<Employment>> {
        in_scope(self.store, |repos| Ok(repos.employments().find(spec)?))
    }

    pub fn update(
        &self,
        id: RecordId,
        changes: &Changes<EmploymentField>,
    ) -> ServiceResult<usize> {
        in_scope(self.store, |repos| Ok(repos.employments().update(id, changes)?))
    }

    pub fn delete(&self, id: RecordId) -> ServiceResult<Employment> {
        in_scope(self.store, |repos| Ok(repos.employments().delete(id)?))
    }
}
