//! In-memory repository backend.
//!
//! # Invariants
//! - `keys` maps each stored record's unique key to its id; a key appears at
//!   most once.
//! - [`InMemoryCatalog`] relates books to works by work id, like the SQLite
//!   foreign key: a book reads its work as currently stored, and removing a
//!   work removes its books.
//! - Ids come from a monotonic counter and are never reused after delete.
//! - Results honor the same ordering contract as SQLite: id order by
//!   default, absent values last under an explicit order.

use super::{
    apply_changes, ensure_filtered, Changes, RecordId, RepoError, RepoResult, Repository,
};
use crate::filter::{FilterSpec, SortOrder};
use crate::model::book::{Book, BookField};
use crate::model::record::Record;
use crate::model::work::{Work, WorkField};
use crate::model::FieldValue;
use log::debug;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone)]
pub struct InMemoryRepository<R: Record> {
    rows: BTreeMap<RecordId, R>,
    keys: HashMap<R::UniqueKey, RecordId>,
    next_id: RecordId,
}

impl<R: Record> Default for InMemoryRepository<R> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            keys: HashMap::new(),
            next_id: 1,
        }
    }
}

impl<R: Record> InMemoryRepository<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swaps the record at `id` for `record`, re-keying it.
    fn replace(&mut self, id: RecordId, record: R) -> RepoResult<()> {
        let key = record.unique_key();
        if let Some(existing) = self.keys.get(&key) {
            if *existing != id {
                return Err(RepoError::DuplicateIdentity {
                    kind: R::KIND,
                    detail: record.describe(),
                });
            }
        }
        if let Some(previous) = self.rows.get(&id) {
            self.keys.remove(&previous.unique_key());
        }
        self.keys.insert(key, id);
        self.rows.insert(id, record);
        Ok(())
    }

    fn matching(&self, spec: &FilterSpec<R::Field>) -> Vec<(RecordId, &R)> {
        let predicates = spec.predicates();
        let mut hits: Vec<(RecordId, &R)> = self
            .rows
            .iter()
            .filter(|(_, record)| predicates.iter().all(|predicate| predicate.matches(*record)))
            .map(|(id, record)| (*id, record))
            .collect();

        if let Some((field, order)) = spec.order() {
            // Stable sort keeps id order among ties.
            hits.sort_by(|(_, a), (_, b)| compare_nulls_last(&a.field(field), &b.field(field), order));
        }
        if let Some(limit) = spec.limit() {
            hits.truncate(limit);
        }
        hits
    }
}

fn compare_nulls_last(a: &FieldValue, b: &FieldValue, order: SortOrder) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let ordering = a.compare(b).unwrap_or(Ordering::Equal);
            match order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            }
        }
    }
}

impl<R: Record> Repository<R> for InMemoryRepository<R> {
    fn add(&mut self, record: &R) -> RepoResult<RecordId> {
        record.validate()?;
        let key = record.unique_key();
        if self.keys.contains_key(&key) {
            return Err(RepoError::DuplicateIdentity {
                kind: R::KIND,
                detail: record.describe(),
            });
        }

        let id = self.next_id;
        self.next_id += 1;
        self.keys.insert(key, id);
        self.rows.insert(id, record.clone());
        debug!("event=record_add module=repo backend=memory kind={} id={id}", R::KIND);
        Ok(id)
    }

    fn get(&self, id: RecordId) -> RepoResult<Option<R>> {
        Ok(self.rows.get(&id).cloned())
    }

    fn list(&self) -> RepoResult<Vec<R>> {
        Ok(self.rows.values().cloned().collect())
    }

    fn find(&self, spec: &FilterSpec<R::Field>) -> RepoResult<Vec<R>> {
        ensure_filtered::<R>(spec)?;
        Ok(self
            .matching(spec)
            .into_iter()
            .map(|(_, record)| record.clone())
            .collect())
    }

    fn find_ids(&self, spec: &FilterSpec<R::Field>) -> RepoResult<Vec<RecordId>> {
        ensure_filtered::<R>(spec)?;
        Ok(self.matching(spec).into_iter().map(|(id, _)| id).collect())
    }

    fn id_of(&self, record: &R) -> RepoResult<Option<RecordId>> {
        Ok(self.keys.get(&record.unique_key()).copied())
    }

    fn update(&mut self, id: RecordId, changes: &Changes<R::Field>) -> RepoResult<usize> {
        let current = self
            .rows
            .get(&id)
            .ok_or(RepoError::NotFound { kind: R::KIND, id })?;
        let mut updated = current.clone();
        apply_changes(&mut updated, changes)?;
        self.replace(id, updated)?;
        debug!("event=record_update module=repo backend=memory kind={} id={id}", R::KIND);
        Ok(1)
    }

    fn delete(&mut self, id: RecordId) -> RepoResult<R> {
        let record = self
            .rows
            .remove(&id)
            .ok_or(RepoError::NotFound { kind: R::KIND, id })?;
        self.keys.remove(&record.unique_key());
        debug!("event=record_delete module=repo backend=memory kind={} id={id}", R::KIND);
        Ok(record)
    }

    fn delete_where(&mut self, spec: &FilterSpec<R::Field>) -> RepoResult<usize> {
        let ids = self.find_ids(spec)?;
        for id in &ids {
            self.delete(*id)?;
        }
        Ok(ids.len())
    }

    fn delete_all(&mut self) -> RepoResult<usize> {
        let removed = self.rows.len();
        self.rows.clear();
        self.keys.clear();
        debug!(
            "event=record_delete module=repo backend=memory kind={} count={removed}",
            R::KIND
        );
        Ok(removed)
    }

    fn count(&self) -> RepoResult<usize> {
        Ok(self.rows.len())
    }
}

/// Works and books kept side by side, books linked to their work's id.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    works: InMemoryRepository<Work>,
    books: InMemoryRepository<Book>,
    /// Book id to owning work id.
    owners: BTreeMap<RecordId, RecordId>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn books_of(&self, work_id: RecordId) -> Vec<RecordId> {
        self.owners
            .iter()
            .filter(|(_, owner)| **owner == work_id)
            .map(|(book_id, _)| *book_id)
            .collect()
    }

    fn refresh_books(&mut self, work_id: RecordId) -> RepoResult<()> {
        let Some(work) = self.works.rows.get(&work_id).cloned() else {
            return Ok(());
        };
        for book_id in self.books_of(work_id) {
            if let Some(book) = self.books.rows.get(&book_id).cloned() {
                self.books.replace(book_id, book.with_work(work.clone()))?;
            }
        }
        Ok(())
    }

    fn remove_books_of(&mut self, work_id: RecordId) -> RepoResult<()> {
        let book_ids = self.books_of(work_id);
        for book_id in &book_ids {
            self.books.delete(*book_id)?;
            self.owners.remove(book_id);
        }
        if !book_ids.is_empty() {
            debug!(
                "event=record_delete module=repo backend=memory kind=book count={} cascade=work",
                book_ids.len()
            );
        }
        Ok(())
    }
}

impl Repository<Work> for InMemoryCatalog {
    fn add(&mut self, record: &Work) -> RepoResult<RecordId> {
        self.works.add(record)
    }

    fn get(&self, id: RecordId) -> RepoResult<Option<Work>> {
        self.works.get(id)
    }

    fn list(&self) -> RepoResult<Vec<Work>> {
        self.works.list()
    }

    fn find(&self, spec: &FilterSpec<WorkField>) -> RepoResult<Vec<Work>> {
        self.works.find(spec)
    }

    fn find_ids(&self, spec: &FilterSpec<WorkField>) -> RepoResult<Vec<RecordId>> {
        self.works.find_ids(spec)
    }

    fn id_of(&self, record: &Work) -> RepoResult<Option<RecordId>> {
        self.works.id_of(record)
    }

    fn update(&mut self, id: RecordId, changes: &Changes<WorkField>) -> RepoResult<usize> {
        let changed = self.works.update(id, changes)?;
        self.refresh_books(id)?;
        Ok(changed)
    }

    fn delete(&mut self, id: RecordId) -> RepoResult<Work> {
        let work = self.works.delete(id)?;
        self.remove_books_of(id)?;
        Ok(work)
    }

    fn delete_where(&mut self, spec: &FilterSpec<WorkField>) -> RepoResult<usize> {
        let ids = self.works.find_ids(spec)?;
        for id in &ids {
            <Self as Repository<Work>>::delete(self, *id)?;
        }
        Ok(ids.len())
    }

    fn delete_all(&mut self) -> RepoResult<usize> {
        self.owners.clear();
        self.books.delete_all()?;
        self.works.delete_all()
    }

    fn count(&self) -> RepoResult<usize> {
        self.works.count()
    }
}

impl Repository<Book> for InMemoryCatalog {
    /// # Errors
    /// - `ConstraintViolation` when the book's work is not stored.
    fn add(&mut self, record: &Book) -> RepoResult<RecordId> {
        record.validate()?;
        let stored = self
            .works
            .id_of(record.work())?
            .and_then(|work_id| Some((work_id, self.works.rows.get(&work_id)?.clone())));
        let Some((work_id, work)) = stored else {
            return Err(RepoError::ConstraintViolation(format!(
                "book references a work that is not stored: {}",
                record.work().describe()
            )));
        };
        let id = self.books.add(&record.clone().with_work(work))?;
        self.owners.insert(id, work_id);
        Ok(id)
    }

    fn get(&self, id: RecordId) -> RepoResult<Option<Book>> {
        self.books.get(id)
    }

    fn list(&self) -> RepoResult<Vec<Book>> {
        self.books.list()
    }

    fn find(&self, spec: &FilterSpec<BookField>) -> RepoResult<Vec<Book>> {
        self.books.find(spec)
    }

    fn find_ids(&self, spec: &FilterSpec<BookField>) -> RepoResult<Vec<RecordId>> {
        self.books.find_ids(spec)
    }

    fn id_of(&self, record: &Book) -> RepoResult<Option<RecordId>> {
        self.books.id_of(record)
    }

    fn update(&mut self, id: RecordId, changes: &Changes<BookField>) -> RepoResult<usize> {
        self.books.update(id, changes)
    }

    fn delete(&mut self, id: RecordId) -> RepoResult<Book> {
        let book = self.books.delete(id)?;
        self.owners.remove(&id);
        Ok(book)
    }

    fn delete_where(&mut self, spec: &FilterSpec<BookField>) -> RepoResult<usize> {
        let ids = self.books.find_ids(spec)?;
        for id in &ids {
            <Self as Repository<Book>>::delete(self, *id)?;
        }
        Ok(ids.len())
    }

    fn delete_all(&mut self) -> RepoResult<usize> {
        self.owners.clear();
        self.books.delete_all()
    }

    fn count(&self) -> RepoResult<usize> {
        self.books.count()
    }
}
