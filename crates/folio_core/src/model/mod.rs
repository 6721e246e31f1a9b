//! Record domain model.
//!
//! # Responsibility
//! - Define the record contract (identity, ordering, description) and the
//!   concrete record types built on it.
//! - Provide the field vocabulary shared by filters, updates and storage.
//!
//! # Invariants
//! - Records are validated at construction; an invalid record is never
//!   materialized.
//! - Equality and hashing follow identity fields only.

pub mod address;
pub mod book;
pub mod date;
pub mod employment;
pub mod normalize;
pub mod record;
pub mod travel;
pub mod work;

use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::hash::Hash;

/// Dynamically typed attribute value used by filters, updates and row mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Text(String),
    Integer(i64),
    Bool(bool),
    Date(NaiveDate),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short type tag used in validation messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Text(_) => "text",
            Self::Integer(_) => "integer",
            Self::Bool(_) => "boolean",
            Self::Date(_) => "date",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Compares two values of the same type. Mixed types and nulls are
    /// incomparable.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(b)),
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::Date(a), Self::Date(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Closed enumeration of one record type's attributes.
pub trait RecordField: Copy + Eq + Hash + Debug + 'static {
    /// Every field, in declaration order.
    const ALL: &'static [Self];
    /// Record kind the field belongs to, used in error messages.
    const RECORD: &'static str;

    /// Stable attribute name.
    fn name(self) -> &'static str;

    /// Whether `update` may change this field.
    fn is_updatable(self) -> bool {
        true
    }

    /// Resolves a field from its attribute name.
    fn parse(name: &str) -> Result<Self, UnknownField> {
        let trimmed = name.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|field| field.name() == trimmed)
            .ok_or_else(|| UnknownField {
                record: Self::RECORD,
                name: trimmed.to_string(),
            })
    }
}

/// A field name that is not part of a record's attribute set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownField {
    pub record: &'static str,
    pub name: String,
}

impl Display for UnknownField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown {} field `{}`", self.record, self.name)
    }
}

impl Error for UnknownField {}

/// Construction/update invariant violations for records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required text is empty after trimming.
    Blank { field: &'static str },
    /// Publication year outside the accepted window.
    YearOutOfRange { year: i64, max: i64 },
    /// Travel code is not three uppercase ASCII letters.
    InvalidLocationCode { field: &'static str, value: String },
    /// Text does not parse as `YYYY-MM-DD`.
    InvalidDate { value: String },
    /// Period ends before it starts.
    PeriodReversed { start: NaiveDate, end: NaiveDate },
    /// Page count must be positive.
    InvalidPages(i64),
    /// ISBN does not have a 10 or 13 character shape.
    InvalidIsbn(String),
    /// Book format tag is not recognized.
    UnknownFormat(String),
    /// Value type does not match the field type.
    FieldType {
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },
    /// Update carried no non-null values.
    NoChanges,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blank { field } => write!(f, "{field} must not be empty"),
            Self::YearOutOfRange { year, max } => {
                write!(f, "year {year} must be between -2100 and {max}")
            }
            Self::InvalidLocationCode { field, value } => {
                write!(f, "{field} must be a 3-letter code, got `{value}`")
            }
            Self::InvalidDate { value } => {
                write!(f, "invalid date `{value}`, expected YYYY-MM-DD")
            }
            Self::PeriodReversed { start, end } => {
                write!(f, "end date ({end}) must be >= start date ({start})")
            }
            Self::InvalidPages(pages) => write!(f, "pages must be positive, got {pages}"),
            Self::InvalidIsbn(value) => {
                write!(f, "invalid ISBN `{value}`, expected ISBN-10 or ISBN-13")
            }
            Self::UnknownFormat(value) => {
                write!(f, "unknown book format `{value}`, expected print|audio|ebook")
            }
            Self::FieldType {
                field,
                expected,
                found,
            } => write!(f, "{field} expects a {expected} value, got {found}"),
            Self::NoChanges => write!(f, "no fields to update"),
        }
    }
}

impl Error for ValidationError {}

/// Helper for `Record::set_field` implementations.
pub(crate) fn type_mismatch(
    field: &'static str,
    expected: &'static str,
    found: &FieldValue,
) -> ValidationError {
    ValidationError::FieldType {
        field,
        expected,
        found: found.type_name(),
    }
}

#[cfg(test)]
mod tests {
    use super::FieldValue;
    use chrono::NaiveDate;
    use std::cmp::Ordering;

    #[test]
    fn option_conversion_maps_none_to_null() {
        assert_eq!(FieldValue::from(None::<i64>), FieldValue::Null);
        assert_eq!(FieldValue::from(Some("x")), FieldValue::Text("x".to_string()));
    }

    #[test]
    fn compare_only_orders_matching_types() {
        let early = FieldValue::from(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        let late = FieldValue::from(NaiveDate::from_ymd_opt(2021, 1, 1).unwrap());
        assert_eq!(early.compare(&late), Some(Ordering::Less));
        assert_eq!(FieldValue::from(1).compare(&FieldValue::from("1")), None);
        assert_eq!(FieldValue::Null.compare(&FieldValue::Null), None);
    }
}
