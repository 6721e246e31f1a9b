//! Travel log use-case service.

use super::{in_scope, ServiceResult};
use crate::filter::{Constraint, FilterSpec};
use crate::model::date::{parse_date, parse_optional_date};
use crate::model::normalize::location_code;
use crate::model::record::sort_records;
use crate::model::travel::{Travel, TravelField};
use crate::repo::RecordId;
use crate::uow::Store;

/// Raw input for a new trip; `date` is `YYYY-MM-DD`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TravelInput {
    pub origin: String,
    pub destination: String,
    pub date: String,
    pub notes: String,
}

/// Trip search parameters; dates are `YYYY-MM-DD` and inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TravelQuery {
    pub origins: Vec<String>,
    pub destinations: Vec<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

impl TravelQuery {
    fn to_spec(&self) -> ServiceResult<FilterSpec<TravelField>> {
        let origins = self
            .origins
            .iter()
            .map(|code| location_code("origin", code))
            .collect::<Result<Vec<_>, _>>()?;
        let destinations = self
            .destinations
            .iter()
            .map(|code| location_code("destination", code))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(FilterSpec::new()
            .one_of(TravelField::Origin, origins)
            .one_of(TravelField::Destination, destinations)
            .constrain(
                TravelField::Date,
                Constraint::Range {
                    min: parse_optional_date(self.date_from.as_deref())?.map(Into::into),
                    max: parse_optional_date(self.date_to.as_deref())?.map(Into::into),
                    exact: None,
                },
            ))
    }
}

pub struct TravelService<'s, S: Store> {
    store: &'s S,
}

impl<'s, S: Store> TravelService<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    pub fn add(&self, input: &TravelInput) -> ServiceResult<RecordId> {
        let travel = Travel::new(
            &input.origin,
            &input.destination,
            parse_date(&input.date)?,
            &input.notes,
        )?;
        in_scope(self.store, |repos| Ok(repos.travels().add(&travel)?))
    }

    pub fn get(&self, id: RecordId) -> ServiceResult<Option<Travel>> {
        in_scope(self.store, |repos| Ok(repos.travels().get(id)?))
    }

    /// Trips in chronological order.
    pub fn list(&self) -> ServiceResult<Vec<Travel>> {
        let mut trips = in_scope(self.store, |repos| Ok(repos.travels().list()?))?;
        sort_records(&mut trips);
        Ok(trips)
    }

    /// Matching trips in chronological order.
    pub fn find(&self, query: &TravelQuery) -> ServiceResult<Vec<Travel>> {
        let spec = query.to_spec()?;
        let mut trips = in_scope(self.store, |repos| Ok(repos.travels().find(&spec)?))?;
        sort_records(&mut trips);
        Ok(trips)
    }

    pub fn delete(&self, id: RecordId) -> ServiceResult<Travel> {
        in_scope(self.store, |repos| Ok(repos.travels().delete(id)?))
    }

    /// Deletes every trip. Filtered deletes go through [`Self::find`] ids.
    pub fn delete_all(&self) -> ServiceResult<usize> {
        in_scope(self.store, |repos| Ok(repos.travels().delete_all()?))
    }
}
