//! Travel domain model: one international trip leg.

use super::normalize::location_code;
use super::record::{identity_semantics, Record};
use super::{type_mismatch, FieldValue, RecordField, ValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TravelField {
    Origin,
    Destination,
    Date,
    Notes,
}

impl RecordField for TravelField {
    const ALL: &'static [Self] = &[Self::Origin, Self::Destination, Self::Date, Self::Notes];
    const RECORD: &'static str = "travel";

    fn name(self) -> &'static str {
        match self {
            Self::Origin => "origin",
            Self::Destination => "destination",
            Self::Date => "date",
            Self::Notes => "notes",
        }
    }
}

/// A trip from `origin` to `destination` (3-letter codes) on `date`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "TravelFields")]
pub struct Travel {
    origin: String,
    destination: String,
    date: NaiveDate,
    notes: String,
}

impl Travel {
    /// # Errors
    /// - `InvalidLocationCode` when either code is not three ASCII letters.
    pub fn new(
        origin: &str,
        destination: &str,
        date: NaiveDate,
        notes: &str,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            origin: location_code("origin", origin)?,
            destination: location_code("destination", destination)?,
            date,
            notes: notes.trim().to_string(),
        })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }
}

#[derive(Deserialize)]
struct TravelFields {
    origin: String,
    destination: String,
    date: NaiveDate,
    #[serde(default)]
    notes: String,
}

impl TryFrom<TravelFields> for Travel {
    type Error = ValidationError;

    fn try_from(raw: TravelFields) -> Result<Self, Self::Error> {
        Travel::new(&raw.origin, &raw.destination, raw.date, &raw.notes)
    }
}

identity_semantics!(Travel);

impl Record for Travel {
    type Field = TravelField;
    type Identity = (String, String, NaiveDate);
    type Ordering = (NaiveDate,);
    type UniqueKey = (String, String, NaiveDate);

    const KIND: &'static str = "travel";

    fn identity_fields(&self) -> Self::Identity {
        (self.origin.clone(), self.destination.clone(), self.date)
    }

    fn ordering_fields(&self) -> Self::Ordering {
        (self.date,)
    }

    fn unique_key(&self) -> Self::UniqueKey {
        self.identity_fields()
    }

    fn describe(&self) -> String {
        if self.notes.is_empty() {
            format!("{}: {} -> {}", self.date, self.origin, self.destination)
        } else {
            format!(
                "{}: {} -> {} ({})",
                self.date, self.origin, self.destination, self.notes
            )
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        location_code("origin", &self.origin)?;
        location_code("destination", &self.destination)?;
        Ok(())
    }

    fn field(&self, field: TravelField) -> FieldValue {
        match field {
            TravelField::Origin => self.origin.clone().into(),
            TravelField::Destination => self.destination.clone().into(),
            TravelField::Date => self.date.into(),
            TravelField::Notes => self.notes.clone().into(),
        }
    }

    fn set_field(&mut self, field: TravelField, value: FieldValue) -> Result<(), ValidationError> {
        let name = field.name();
        match (field, &value) {
            (TravelField::Origin, FieldValue::Text(code)) => {
                self.origin = location_code(name, code)?;
            }
            (TravelField::Destination, FieldValue::Text(code)) => {
                self.destination = location_code(name, code)?;
            }
            (TravelField::Date, FieldValue::Date(date)) => self.date = *date,
            (TravelField::Notes, FieldValue::Text(notes)) => self.notes = notes.trim().to_string(),
            (TravelField::Notes, FieldValue::Null) => self.notes.clear(),
            (TravelField::Date, other) => return Err(type_mismatch(name, "date", other)),
            (_, other) => return Err(type_mismatch(name, "text", other)),
        }
        Ok(())
    }
}
