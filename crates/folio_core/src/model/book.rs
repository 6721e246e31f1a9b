//! Book domain model: one edition/copy of a [`Work`].
//!
//! # Invariants
//! - Identity is `(work identity, format, isbn or "")`; page count is not
//!   part of identity.
//! - `pages`, when set, is positive.
//! - `isbn`, when set, is stored without separators.

use super::normalize;
use super::record::{absent_last, identity_semantics, AbsentLast, Record};
use super::work::{Work, WorkField, WorkKey};
use super::{type_mismatch, FieldValue, RecordField, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Physical or digital form of a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookFormat {
    Print,
    Audio,
    Ebook,
}

impl BookFormat {
    /// Stable string tag used for identity and storage.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Print => "print",
            Self::Audio => "audio",
            Self::Ebook => "ebook",
        }
    }

    /// Parses a tag case-insensitively.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "print" => Ok(Self::Print),
            "audio" => Ok(Self::Audio),
            "ebook" => Ok(Self::Ebook),
            _ => Err(ValidationError::UnknownFormat(value.trim().to_string())),
        }
    }
}

impl Display for BookFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attributes of [`Book`]. `Title`, `Author` and `Year` read through the
/// owning work and are not updatable from a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookField {
    Title,
    Author,
    Year,
    Pages,
    Format,
    Isbn,
}

impl RecordField for BookField {
    const ALL: &'static [Self] = &[
        Self::Title,
        Self::Author,
        Self::Year,
        Self::Pages,
        Self::Format,
        Self::Isbn,
    ];
    const RECORD: &'static str = "book";

    fn name(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Author => "author",
            Self::Year => "year",
            Self::Pages => "pages",
            Self::Format => "format",
            Self::Isbn => "isbn",
        }
    }

    fn is_updatable(self) -> bool {
        matches!(self, Self::Pages | Self::Format | Self::Isbn)
    }
}

pub type BookKey = (WorkKey, &'static str, String);

/// A specific book instance of a work.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "BookFields")]
pub struct Book {
    work: Work,
    pages: Option<u32>,
    format: BookFormat,
    isbn: Option<String>,
}

impl Book {
    /// Builds a validated book for `work`.
    ///
    /// # Errors
    /// - `InvalidPages` when `pages` is zero.
    /// - `InvalidIsbn` when `isbn` does not have an ISBN-10/13 shape.
    pub fn new(
        work: Work,
        pages: Option<u32>,
        format: BookFormat,
        isbn: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let isbn = match normalize::optional_text(isbn) {
            Some(raw) => Some(normalize::isbn(&raw)?),
            None => None,
        };
        let book = Self {
            work,
            pages,
            format,
            isbn,
        };
        book.validate()?;
        Ok(book)
    }

    pub fn work(&self) -> &Work {
        &self.work
    }

    pub fn pages(&self) -> Option<u32> {
        self.pages
    }

    pub fn format(&self) -> BookFormat {
        self.format
    }

    pub fn isbn(&self) -> Option<&str> {
        self.isbn.as_deref()
    }

    /// Same edition attached to `work`, as the owning work is stored now.
    pub(crate) fn with_work(mut self, work: Work) -> Self {
        self.work = work;
        self
    }
}

#[derive(Deserialize)]
struct BookFields {
    work: Work,
    #[serde(default)]
    pages: Option<u32>,
    format: BookFormat,
    #[serde(default)]
    isbn: Option<String>,
}

impl TryFrom<BookFields> for Book {
    type Error = ValidationError;

    fn try_from(raw: BookFields) -> Result<Self, Self::Error> {
        Book::new(raw.work, raw.pages, raw.format, raw.isbn.as_deref())
    }
}

identity_semantics!(Book);

impl Record for Book {
    type Field = BookField;
    type Identity = BookKey;
    type Ordering = (BookKey, AbsentLast<u32>);
    type UniqueKey = BookKey;

    const KIND: &'static str = "book";

    fn identity_fields(&self) -> BookKey {
        (
            self.work.identity_fields(),
            self.format.as_str(),
            self.isbn.clone().unwrap_or_default(),
        )
    }

    fn ordering_fields(&self) -> Self::Ordering {
        (self.identity_fields(), absent_last(self.pages))
    }

    fn unique_key(&self) -> BookKey {
        self.identity_fields()
    }

    fn describe(&self) -> String {
        let pages = self
            .pages
            .map_or_else(|| "?".to_string(), |pages| pages.to_string());
        let isbn = self.isbn.as_deref().unwrap_or("no ISBN");
        format!(
            "{} - {}: {pages} pages, {isbn} ({})",
            self.work.title(),
            self.work.author(),
            self.format
        )
    }

    fn validate(&self) -> Result<(), ValidationError> {
        self.work.validate()?;
        if self.pages == Some(0) {
            return Err(ValidationError::InvalidPages(0));
        }
        Ok(())
    }

    fn field(&self, field: BookField) -> FieldValue {
        match field {
            BookField::Title => self.work.field(WorkField::Title),
            BookField::Author => self.work.field(WorkField::Author),
            BookField::Year => self.work.field(WorkField::Year),
            BookField::Pages => self.pages.into(),
            BookField::Format => self.format.as_str().into(),
            BookField::Isbn => self.isbn.clone().into(),
        }
    }

    fn set_field(&mut self, field: BookField, value: FieldValue) -> Result<(), ValidationError> {
        let name = field.name();
        match (field, &value) {
            (BookField::Title, _) => self.work.set_field(WorkField::Title, value.clone())?,
            (BookField::Author, _) => self.work.set_field(WorkField::Author, value.clone())?,
            (BookField::Year, _) => self.work.set_field(WorkField::Year, value.clone())?,
            (BookField::Pages, FieldValue::Integer(pages)) => {
                let pages = u32::try_from(*pages)
                    .ok()
                    .filter(|pages| *pages > 0)
                    .ok_or(ValidationError::InvalidPages(*pages))?;
                self.pages = Some(pages);
            }
            (BookField::Pages, FieldValue::Null) => self.pages = None,
            (BookField::Pages, other) => return Err(type_mismatch(name, "integer", other)),
            (BookField::Format, FieldValue::Text(tag)) => self.format = BookFormat::parse(tag)?,
            (BookField::Isbn, FieldValue::Text(raw)) => {
                self.isbn = match normalize::optional_text(Some(raw.as_str())) {
                    Some(raw) => Some(normalize::isbn(&raw)?),
                    None => None,
                };
            }
            (BookField::Isbn, FieldValue::Null) => self.isbn = None,
            (BookField::Format | BookField::Isbn, other) => {
                return Err(type_mismatch(name, "text", other));
            }
        }
        Ok(())
    }
}
