//! Work domain model: a literary work, independent of any edition.
//!
//! # Invariants
//! - `title` and `author` are non-empty and trimmed.
//! - `year`, when set, lies in `(-2100, current_year + 2]`.
//! - Identity is `(author, title, year)` with case folded and unknown years
//!   sorted last; ordering uses the same tuple.

use super::normalize::{fold_case, optional_text, required_text};
use super::record::{absent_last, identity_semantics, AbsentLast, Record};
use super::{date, type_mismatch, FieldValue, RecordField, ValidationError};
use chrono::Datelike;
use serde::{Deserialize, Serialize};

const EARLIEST_YEAR: i64 = -2100;
const UNPUBLISHED_YEAR_BUFFER: i64 = 2;

/// Attributes of [`Work`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkField {
    Title,
    Author,
    Year,
    Genre,
    IsRead,
}

impl RecordField for WorkField {
    const ALL: &'static [Self] = &[
        Self::Title,
        Self::Author,
        Self::Year,
        Self::Genre,
        Self::IsRead,
    ];
    const RECORD: &'static str = "work";

    fn name(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Author => "author",
            Self::Year => "year",
            Self::Genre => "genre",
            Self::IsRead => "is_read",
        }
    }
}

/// Identity/ordering key of a work.
pub type WorkKey = (String, String, AbsentLast<i32>);

/// A literary work (the concept of a book rather than a copy of it).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "WorkFields")]
pub struct Work {
    title: String,
    author: String,
    year: Option<i32>,
    genre: Option<String>,
    is_read: bool,
}

impl Work {
    /// Builds a validated work from raw input.
    ///
    /// # Errors
    /// - `Blank` when title or author is empty after trimming.
    /// - `YearOutOfRange` when `year` is outside the accepted window.
    pub fn new(
        title: &str,
        author: &str,
        year: Option<i32>,
        genre: Option<&str>,
        is_read: bool,
    ) -> Result<Self, ValidationError> {
        let work = Self {
            title: required_text("title", title)?,
            author: required_text("author", author)?,
            year,
            genre: optional_text(genre),
            is_read,
        };
        work.validate()?;
        Ok(work)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn year(&self) -> Option<i32> {
        self.year
    }

    pub fn genre(&self) -> Option<&str> {
        self.genre.as_deref()
    }

    pub fn is_read(&self) -> bool {
        self.is_read
    }
}

/// Unchecked serialized form of [`Work`].
#[derive(Deserialize)]
struct WorkFields {
    title: String,
    author: String,
    #[serde(default)]
    year: Option<i32>,
    #[serde(default)]
    genre: Option<String>,
    #[serde(default)]
    is_read: bool,
}

impl TryFrom<WorkFields> for Work {
    type Error = ValidationError;

    fn try_from(raw: WorkFields) -> Result<Self, Self::Error> {
        Work::new(
            &raw.title,
            &raw.author,
            raw.year,
            raw.genre.as_deref(),
            raw.is_read,
        )
    }
}

identity_semantics!(Work);

impl Record for Work {
    type Field = WorkField;
    type Identity = WorkKey;
    type Ordering = WorkKey;
    type UniqueKey = WorkKey;

    const KIND: &'static str = "work";

    fn identity_fields(&self) -> WorkKey {
        (
            fold_case(&self.author),
            fold_case(&self.title),
            absent_last(self.year),
        )
    }

    fn ordering_fields(&self) -> WorkKey {
        self.identity_fields()
    }

    fn unique_key(&self) -> WorkKey {
        self.identity_fields()
    }

    fn describe(&self) -> String {
        let year = self
            .year
            .map_or_else(|| "unknown".to_string(), |year| year.to_string());
        let read = if self.is_read { "Read" } else { "Not read" };
        format!("{} by {} (year: {year}, {read})", self.title, self.author)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::Blank { field: "title" });
        }
        if self.author.trim().is_empty() {
            return Err(ValidationError::Blank { field: "author" });
        }
        if let Some(year) = self.year {
            let year = i64::from(year);
            let max = i64::from(date::today().year()) + UNPUBLISHED_YEAR_BUFFER;
            if year <= EARLIEST_YEAR || year > max {
                return Err(ValidationError::YearOutOfRange { year, max });
            }
        }
        Ok(())
    }

    fn field(&self, field: WorkField) -> FieldValue {
        match field {
            WorkField::Title => self.title.clone().into(),
            WorkField::Author => self.author.clone().into(),
            WorkField::Year => self.year.into(),
            WorkField::Genre => self.genre.clone().into(),
            WorkField::IsRead => self.is_read.into(),
        }
    }

    fn set_field(&mut self, field: WorkField, value: FieldValue) -> Result<(), ValidationError> {
        let name = field.name();
        match (field, &value) {
            (WorkField::Title, FieldValue::Text(text)) => {
                self.title = required_text(name, text)?;
            }
            (WorkField::Author, FieldValue::Text(text)) => {
                self.author = required_text(name, text)?;
            }
            (WorkField::Year, FieldValue::Integer(year)) => {
                let year = i32::try_from(*year).map_err(|_| ValidationError::YearOutOfRange {
                    year: *year,
                    max: i64::from(date::today().year()) + UNPUBLISHED_YEAR_BUFFER,
                })?;
                self.year = Some(year);
            }
            (WorkField::Year, FieldValue::Null) => self.year = None,
            (WorkField::Genre, FieldValue::Text(text)) => {
                self.genre = optional_text(Some(text.as_str()));
            }
            (WorkField::Genre, FieldValue::Null) => self.genre = None,
            (WorkField::IsRead, FieldValue::Bool(flag)) => self.is_read = *flag,
            (WorkField::Title | WorkField::Author | WorkField::Genre, other) => {
                return Err(type_mismatch(name, "text", other));
            }
            (WorkField::Year, other) => return Err(type_mismatch(name, "integer", other)),
            (WorkField::IsRead, other) => return Err(type_mismatch(name, "boolean", other)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Work, WorkField};
    use crate::model::record::Record;
    use crate::model::{FieldValue, ValidationError};

    #[test]
    fn new_trims_text_and_drops_blank_genre() {
        let work = Work::new("  Dune ", "Frank Herbert", Some(1965), Some("  "), true).unwrap();
        assert_eq!(work.title(), "Dune");
        assert_eq!(work.genre(), None);
    }

    #[test]
    fn new_rejects_far_future_year() {
        let err = Work::new("Dune", "Frank Herbert", Some(9999), None, false).unwrap_err();
        assert!(matches!(err, ValidationError::YearOutOfRange { year: 9999, .. }));
    }

    #[test]
    fn set_field_checks_value_types() {
        let mut work = Work::new("Dune", "Frank Herbert", None, None, false).unwrap();
        let err = work
            .set_field(WorkField::Year, FieldValue::from("1965"))
            .unwrap_err();
        assert!(matches!(err, ValidationError::FieldType { field: "year", .. }));

        work.set_field(WorkField::Year, FieldValue::from(1965)).unwrap();
        assert_eq!(work.year(), Some(1965));
    }

    #[test]
    fn describe_mentions_read_state() {
        let work = Work::new("Dune", "Frank Herbert", None, None, false).unwrap();
        assert_eq!(work.describe(), "Dune by Frank Herbert (year: unknown, Not read)");
    }
}
