//! Address domain model: a residence over a dated period.
//!
//! # Invariants
//! - Identity is the folded location `(street, city, province, country,
//!   postal_code)`; the period is not part of identity.
//! - The store keeps `(identity, start, end)` unique, so one location may be
//!   recorded for several separate periods.
//! - Ordering is longest period first, then start, then end (open periods
//!   last), with open periods measured up to today.
//! - `end`, when set, is not before `start`.

use super::date::{period_days, today};
use super::normalize::{fold_case, optional_text, required_text};
use super::record::{absent_last, identity_semantics, AbsentLast, Record};
use super::{type_mismatch, FieldValue, RecordField, ValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressField {
    Start,
    End,
    Street,
    City,
    Province,
    Country,
    PostalCode,
}

impl RecordField for AddressField {
    const ALL: &'static [Self] = &[
        Self::Start,
        Self::End,
        Self::Street,
        Self::City,
        Self::Province,
        Self::Country,
        Self::PostalCode,
    ];
    const RECORD: &'static str = "address";

    fn name(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::End => "end",
            Self::Street => "street",
            Self::City => "city",
            Self::Province => "province",
            Self::Country => "country",
            Self::PostalCode => "postal_code",
        }
    }
}

/// Folded `(street, city, province, country, postal_code)`.
pub type LocationKey = (String, String, String, String, String);

/// Period ordering key shared by dated records: longest first, then start,
/// then end with open periods last.
pub type PeriodKey = (Reverse<i64>, NaiveDate, AbsentLast<NaiveDate>);

pub(crate) fn period_key(start: NaiveDate, end: Option<NaiveDate>, as_of: NaiveDate) -> PeriodKey {
    (
        Reverse(period_days(start, end, as_of)),
        start,
        absent_last(end),
    )
}

pub(crate) fn check_period(start: NaiveDate, end: Option<NaiveDate>) -> Result<(), ValidationError> {
    match end {
        Some(end) if end < start => Err(ValidationError::PeriodReversed { start, end }),
        _ => Ok(()),
    }
}

/// Location fields of an [`Address`], grouped for construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub street: String,
    pub city: String,
    pub province: Option<String>,
    pub country: String,
    pub postal_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "AddressFields")]
pub struct Address {
    start: NaiveDate,
    end: Option<NaiveDate>,
    street: String,
    city: String,
    province: Option<String>,
    country: String,
    postal_code: String,
}

impl Address {
    /// # Errors
    /// - `Blank` for an empty street, city, country or postal code.
    /// - `PeriodReversed` when `end` precedes `start`.
    pub fn new(
        location: &Location,
        start: NaiveDate,
        end: Option<NaiveDate>,
    ) -> Result<Self, ValidationError> {
        check_period(start, end)?;
        Ok(Self {
            start,
            end,
            street: required_text("street", &location.street)?,
            city: required_text("city", &location.city)?,
            province: optional_text(location.province.as_deref()),
            country: required_text("country", &location.country)?,
            postal_code: required_text("postal_code", &location.postal_code)?,
        })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.end
    }

    pub fn street(&self) -> &str {
        &self.street
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn province(&self) -> Option<&str> {
        self.province.as_deref()
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn postal_code(&self) -> &str {
        &self.postal_code
    }

    /// Days lived at the address, open periods measured up to `as_of`.
    pub fn duration_days_as_of(&self, as_of: NaiveDate) -> i64 {
        period_days(self.start, self.end, as_of)
    }

    pub fn ordering_fields_as_of(&self, as_of: NaiveDate) -> PeriodKey {
        period_key(self.start, self.end, as_of)
    }

    /// Whether the half-open periods `[start, end)` intersect, open ends
    /// running to `as_of`.
    pub fn overlaps(&self, start: NaiveDate, end: Option<NaiveDate>, as_of: NaiveDate) -> bool {
        let existing_end = self.end.unwrap_or(as_of);
        let candidate_end = end.unwrap_or(as_of);
        start < existing_end && self.start < candidate_end
    }
}

#[derive(Deserialize)]
struct AddressFields {
    start: NaiveDate,
    #[serde(default)]
    end: Option<NaiveDate>,
    street: String,
    city: String,
    #[serde(default)]
    province: Option<String>,
    country: String,
    postal_code: String,
}

impl TryFrom<AddressFields> for Address {
    type Error = ValidationError;

    fn try_from(raw: AddressFields) -> Result<Self, Self::Error> {
        let location = Location {
            street: raw.street,
            city: raw.city,
            province: raw.province,
            country: raw.country,
            postal_code: raw.postal_code,
        };
        Address::new(&location, raw.start, raw.end)
    }
}

identity_semantics!(Address);

impl Record for Address {
    type Field = AddressField;
    type Identity = LocationKey;
    type Ordering = PeriodKey;
    type UniqueKey = (LocationKey, NaiveDate, Option<NaiveDate>);

    const KIND: &'static str = "address";

    fn identity_fields(&self) -> Self::Identity {
        (
            fold_case(&self.street),
            fold_case(&self.city),
            fold_case(self.province.as_deref().unwrap_or_default()),
            fold_case(&self.country),
            fold_case(&self.postal_code),
        )
    }

    fn ordering_fields(&self) -> PeriodKey {
        self.ordering_fields_as_of(today())
    }

    fn unique_key(&self) -> Self::UniqueKey {
        (self.identity_fields(), self.start, self.end)
    }

    fn describe(&self) -> String {
        let end = self
            .end
            .map_or_else(|| "Present".to_string(), |end| end.to_string());
        let province = self
            .province
            .as_deref()
            .map(|province| format!(", {province}"))
            .unwrap_or_default();
        format!(
            "{}, {}{province}, {} {} ({} -> {end} [{} days])",
            self.street,
            self.city,
            self.country,
            self.postal_code,
            self.start,
            self.duration_days_as_of(today())
        )
    }

    fn validate(&self) -> Result<(), ValidationError> {
        check_period(self.start, self.end)?;
        for (field, value) in [
            ("street", &self.street),
            ("city", &self.city),
            ("country", &self.country),
            ("postal_code", &self.postal_code),
        ] {
            required_text(field, value)?;
        }
        Ok(())
    }

    fn field(&self, field: AddressField) -> FieldValue {
        match field {
            AddressField::Start => self.start.into(),
            AddressField::End => self.end.into(),
            AddressField::Street => self.street.clone().into(),
            AddressField::City => self.city.clone().into(),
            AddressField::Province => self.province.clone().into(),
            AddressField::Country => self.country.clone().into(),
            AddressField::PostalCode => self.postal_code.clone().into(),
        }
    }

    fn set_field(&mut self, field: AddressField, value: FieldValue) -> Result<(), ValidationError> {
        let name = field.name();
        match (field, &value) {
            (AddressField::Start, FieldValue::Date(date)) => self.start = *date,
            (AddressField::End, FieldValue::Date(date)) => self.end = Some(*date),
            (AddressField::End, FieldValue::Null) => self.end = None,
            (AddressField::Start | AddressField::End, other) => {
                return Err(type_mismatch(name, "date", other));
            }
            (AddressField::Province, FieldValue::Text(text)) => {
                self.province = optional_text(Some(text.as_str()));
            }
            (AddressField::Province, FieldValue::Null) => self.province = None,
            (AddressField::Street, FieldValue::Text(text)) => {
                self.street = required_text(name, text)?;
            }
            (AddressField::City, FieldValue::Text(text)) => self.city = required_text(name, text)?,
            (AddressField::Country, FieldValue::Text(text)) => {
                self.country = required_text(name, text)?;
            }
            (AddressField::PostalCode, FieldValue::Text(text)) => {
                self.postal_code = required_text(name, text)?;
            }
            (_, other) => return Err(type_mismatch(name, "text", other)),
        }
        Ok(())
    }
}
