use folio_core::db::open_db;
use folio_core::{
    Book, BookFormat, InMemoryStore, RepoError, ScopeState, SqliteStore, Store, UnitOfWork, Work,
};
use rusqlite::Connection;

fn dune() -> Work {
    Work::new("Dune", "Frank Herbert", Some(1965), None, false).unwrap()
}

fn add_work_then_fail<S: Store>(store: &S) -> ScopeState {
    let mut uow = store.unit_of_work();
    let result: Result<(), RepoError> = uow.run(|repos| {
        repos.works().add(&dune())?;
        repos
            .books()
            .add(&Book::new(dune(), Some(412), BookFormat::Print, None)?)?;
        Err(RepoError::ConstraintViolation("caller aborted".to_string()))
    });
    assert!(matches!(result, Err(RepoError::ConstraintViolation(_))));
    uow.state()
}

fn work_count<S: Store>(store: &S) -> usize {
    store
        .unit_of_work()
        .run(|repos| repos.works().count())
        .unwrap()
}

#[test]
fn file_store_commits_are_visible_to_new_connections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("folio.sqlite3");
    let store = SqliteStore::open(&path);

    let mut uow = store.unit_of_work();
    let id = uow
        .run(|repos| {
            let id = repos.works().add(&dune())?;
            repos
                .books()
                .add(&Book::new(dune(), None, BookFormat::Audio, None)?)?;
            Ok::<_, RepoError>(id)
        })
        .unwrap();
    assert_eq!(uow.state(), ScopeState::Committed);

    let conn: Connection = open_db(&path).unwrap();
    let stored: String = conn
        .query_row("SELECT title FROM work WHERE id = ?1;", [id], |row| row.get(0))
        .unwrap();
    assert_eq!(stored, "Dune");
}

#[test]
fn file_store_rolls_back_every_write_of_a_failed_scope() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(dir.path().join("folio.sqlite3"));

    assert_eq!(add_work_then_fail(&store), ScopeState::RolledBack);
    assert_eq!(work_count(&store), 0);
    let books = store
        .unit_of_work()
        .run(|repos| repos.books().count())
        .unwrap();
    assert_eq!(books, 0);
}

#[test]
fn memory_store_rolls_back_every_write_of_a_failed_scope() {
    let store = InMemoryStore::new();
    assert_eq!(add_work_then_fail(&store), ScopeState::RolledBack);
    assert_eq!(work_count(&store), 0);
}

#[test]
fn validation_errors_inside_a_scope_roll_back() {
    let store = InMemoryStore::new();
    let result: Result<(), RepoError> = store.unit_of_work().run(|repos| {
        repos.works().add(&dune())?;
        repos
            .works()
            .add(&Work::new("Dune", "Frank Herbert", Some(9999), None, false)?)?;
        Ok(())
    });
    assert!(matches!(result, Err(RepoError::Validation(_))));
    assert_eq!(work_count(&store), 0);
}

#[test]
fn scopes_are_single_use() {
    let dir = tempfile::tempdir().unwrap();
    let sqlite = SqliteStore::open(dir.path().join("folio.sqlite3"));
    let memory = InMemoryStore::new();

    let mut uow = sqlite.unit_of_work();
    assert_eq!(uow.state(), ScopeState::Idle);
    uow.run(|repos| repos.works().add(&dune())).unwrap();
    assert!(matches!(
        uow.run(|repos| repos.works().count()).unwrap_err(),
        RepoError::ScopeReused
    ));

    let mut uow = memory.unit_of_work();
    uow.run(|repos| repos.works().count()).unwrap();
    assert!(matches!(
        uow.run(|repos| repos.works().count()).unwrap_err(),
        RepoError::ScopeReused
    ));
}

#[test]
fn each_scope_sees_earlier_commits() {
    let store = InMemoryStore::new();
    store
        .unit_of_work()
        .run(|repos| repos.works().add(&dune()))
        .unwrap();
    let err = store
        .unit_of_work()
        .run(|repos| repos.works().add(&dune()))
        .unwrap_err();
    assert!(matches!(err, RepoError::DuplicateIdentity { .. }));
    assert_eq!(work_count(&store), 1);
}
