//! Work and book use-case service.
//!
//! # Responsibility
//! - Add works and books, with books attached to an existing work.
//! - Search works and books through filter specifications.
//! - Delete a work together with its books, linked by work id.
//!
//! # Invariants
//! - `list_*` results are sorted by record ordering fields.
//! - A book is only added for a stored work.

use super::{in_scope, ServiceError, ServiceResult};
use crate::filter::{Constraint, FilterSpec};
use crate::model::book::{Book, BookField, BookFormat};
use crate::model::normalize;
use crate::model::record::{sort_records, Record};
use crate::model::work::{Work, WorkField};
use crate::repo::{Changes, RecordId};
use crate::uow::Store;

/// Raw input for a new work.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkInput {
    pub title: String,
    pub author: String,
    pub year: Option<i32>,
    pub genre: Option<String>,
    pub is_read: bool,
}

/// Raw input for a new book of a stored work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookInput {
    pub pages: Option<u32>,
    /// `print`, `audio` or `ebook`.
    pub format: String,
    pub isbn: Option<String>,
}

/// Work search parameters. Empty lists and `None` impose no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkQuery {
    pub titles: Vec<String>,
    pub authors: Vec<String>,
    pub genres: Vec<String>,
    /// Substring instead of whole-value text matching.
    pub partial: bool,
    pub year_min: Option<i32>,
    pub year_max: Option<i32>,
    /// Exact years; overrides `year_min`/`year_max`.
    pub years: Vec<i32>,
    pub is_read: Option<bool>,
    pub limit: Option<usize>,
}

impl WorkQuery {
    fn to_spec(&self) -> FilterSpec<WorkField> {
        let mut spec = FilterSpec::new()
            .text(WorkField::Title, self.titles.iter().cloned())
            .text(WorkField::Author, self.authors.iter().cloned())
            .text(WorkField::Genre, self.genres.iter().cloned())
            .constrain(
                WorkField::Year,
                Constraint::Range {
                    min: self.year_min.map(Into::into),
                    max: self.year_max.map(Into::into),
                    exact: Some(self.years.iter().copied().map(Into::into).collect()),
                },
            )
            .flag(WorkField::IsRead, self.is_read)
            .with_partial(self.partial);
        if let Some(limit) = self.limit {
            spec = spec.with_limit(limit);
        }
        spec
    }
}

/// Book search parameters. Empty lists and `None` impose no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookQuery {
    pub titles: Vec<String>,
    pub authors: Vec<String>,
    pub partial: bool,
    pub pages_min: Option<u32>,
    pub pages_max: Option<u32>,
    pub formats: Vec<String>,
    pub isbn: Option<String>,
}

impl BookQuery {
    fn to_spec(&self) -> ServiceResult<FilterSpec<BookField>> {
        let formats = self
            .formats
            .iter()
            .map(|format| BookFormat::parse(format).map(|format| format.as_str()))
            .collect::<Result<Vec<_>, _>>()?;
        let isbn = match self.isbn.as_deref() {
            Some(raw) => Some(normalize::isbn(raw)?),
            None => None,
        };
        Ok(FilterSpec::new()
            .text(BookField::Title, self.titles.iter().cloned())
            .text(BookField::Author, self.authors.iter().cloned())
            .constrain(
                BookField::Pages,
                Constraint::Range {
                    min: self.pages_min.map(Into::into),
                    max: self.pages_max.map(Into::into),
                    exact: None,
                },
            )
            .one_of(BookField::Format, formats)
            .exact(BookField::Isbn, isbn)
            .with_partial(self.partial))
    }
}

pub struct WorkService<'s, S: Store> {
    store: &'s S,
}

impl<'s, S: Store> WorkService<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    /// Validates and stores a new work.
    ///
    /// # Errors
    /// - `Validation` for malformed input.
    /// - `Repo(DuplicateIdentity)` when the work is already stored.
    pub fn add_work(&self, input: &WorkInput) -> ServiceResult<RecordId> {
        let work = Work::new(
            &input.title,
            &input.author,
            input.year,
            input.genre.as_deref(),
            input.is_read,
        )?;
        in_scope(self.store, |repos| Ok(repos.works().add(&work)?))
    }

    /// Adds a book of the work stored under `work_id`.
    ///
    /// # Errors
    /// - `NotFound` when `work_id` is absent.
    pub fn add_book(&self, work_id: RecordId, input: &BookInput) -> ServiceResult<RecordId> {
        let format = BookFormat::parse(&input.format)?;
        in_scope(self.store, |repos| {
            let work = repos
                .works()
                .get(work_id)?
                .ok_or(ServiceError::NotFound {
                    kind: Work::KIND,
                    id: work_id,
                })?;
            let book = Book::new(work, input.pages, format, input.isbn.as_deref())?;
            Ok(repos.books().add(&book)?)
        })
    }

    pub fn get_work(&self, id: RecordId) -> ServiceResult<Option<Work>> {
        in_scope(self.store, |repos| Ok(repos.works().get(id)?))
    }

    pub fn get_book(&self, id: RecordId) -> ServiceResult<Option<Book>> {
        in_scope(self.store, |repos| Ok(repos.books().get(id)?))
    }

    pub fn list_works(&self) -> ServiceResult<Vec<Work>> {
        let mut works = in_scope(self.store, |repos| Ok(repos.works().list()?))?;
        sort_records(&mut works);
        Ok(works)
    }

    pub fn list_books(&self) -> ServiceResult<Vec<Book>> {
        let mut books = in_scope(self.store, |repos| Ok(repos.books().list()?))?;
        sort_records(&mut books);
        Ok(books)
    }

    /// # Errors
    /// - `Repo(EmptyFilter)` when `query` sets nothing.
    pub fn find_works(&self, query: &WorkQuery) -> ServiceResult<Vec<Work>> {
        let spec = query.to_spec();
        in_scope(self.store, |repos| Ok(repos.works().find(&spec)?))
    }

    /// # Errors
    /// - `Repo(EmptyFilter)` when `query` sets nothing.
    pub fn find_books(&self, query: &BookQuery) -> ServiceResult<Vec<Book>> {
        let spec = query.to_spec()?;
        in_scope(self.store, |repos| Ok(repos.books().find(&spec)?))
    }

    pub fn update_work(&self, id: RecordId, changes: &Changes<WorkField>) -> ServiceResult<usize> {
        in_scope(self.store, |repos| Ok(repos.works().update(id, changes)?))
    }

    pub fn update_book(&self, id: RecordId, changes: &Changes<BookField>) -> ServiceResult<usize> {
        in_scope(self.store, |repos| Ok(repos.books().update(id, changes)?))
    }

    /// Deletes the work at `id`; both stores remove its books with it.
    pub fn delete_work(&self, id: RecordId) -> ServiceResult<Work> {
        in_scope(self.store, |repos| {
            if repos.works().get(id)?.is_none() {
                return Err(ServiceError::NotFound {
                    kind: Work::KIND,
                    id,
                });
            }
            Ok(repos.works().delete(id)?)
        })
    }

    pub fn delete_book(&self, id: RecordId) -> ServiceResult<Book> {
        in_scope(self.store, |repos| Ok(repos.books().delete(id)?))
    }
}
