//! Behavior both repository backends must share.

use chrono::NaiveDate;
use folio_core::db::open_db_in_memory;
use folio_core::{
    Address, BookField, Changes, Employment, EmploymentContact, EmploymentField, FilterSpec,
    InMemoryRepository, Location, RepoError, Repository, SortOrder, SqliteRepository,
    ValidationError, Work, WorkField,
};
use rusqlite::Connection;

fn work(title: &str, author: &str, year: Option<i32>, genre: Option<&str>) -> Work {
    Work::new(title, author, year, genre, false).unwrap()
}

fn with_each_backend(check: impl Fn(&mut dyn Repository<Work>)) {
    let mut memory = InMemoryRepository::<Work>::new();
    check(&mut memory);

    let conn: Connection = open_db_in_memory().unwrap();
    let mut sqlite = SqliteRepository::<Work>::try_new(&conn).unwrap();
    check(&mut sqlite);
}

#[test]
fn add_get_and_list_in_id_order() {
    with_each_backend(|repo| {
        let dune = repo.add(&work("Dune", "Frank Herbert", Some(1965), None)).unwrap();
        let emma = repo.add(&work("Emma", "Jane Austen", None, Some("Novel"))).unwrap();
        assert!(emma > dune);

        let loaded = repo.get(emma).unwrap().unwrap();
        assert_eq!(loaded.title(), "Emma");
        assert_eq!(loaded.year(), None);
        assert_eq!(loaded.genre(), Some("Novel"));
        assert!(repo.get(emma + 100).unwrap().is_none());

        let titles: Vec<String> = repo
            .list()
            .unwrap()
            .iter()
            .map(|work| work.title().to_string())
            .collect();
        assert_eq!(titles, vec!["Dune", "Emma"]);
        assert_eq!(repo.count().unwrap(), 2);
        assert_eq!(
            repo.id_of(&work("DUNE", "frank herbert", Some(1965), None))
                .unwrap(),
            Some(dune)
        );
    });
}

#[test]
fn duplicate_identity_is_rejected_case_insensitively() {
    with_each_backend(|repo| {
        repo.add(&work("Dune", "Frank Herbert", Some(1965), None)).unwrap();
        let err = repo
            .add(&work("dune", "FRANK HERBERT", Some(1965), Some("sf")))
            .unwrap_err();
        assert!(matches!(err, RepoError::DuplicateIdentity { kind: "work", .. }));

        // Absent and present years are different identities.
        repo.add(&work("Dune", "Frank Herbert", None, None)).unwrap();
        assert_eq!(repo.count().unwrap(), 2);
    });
}

#[test]
fn empty_filters_are_rejected_for_find_and_delete_where() {
    with_each_backend(|repo| {
        repo.add(&work("Dune", "Frank Herbert", Some(1965), None)).unwrap();
        let empty = FilterSpec::new()
            .text(WorkField::Title, Vec::<String>::new())
            .flag(WorkField::IsRead, None);

        assert!(matches!(
            repo.find(&empty).unwrap_err(),
            RepoError::EmptyFilter { kind: "work" }
        ));
        assert!(matches!(
            repo.delete_where(&empty).unwrap_err(),
            RepoError::EmptyFilter { .. }
        ));
        assert_eq!(repo.count().unwrap(), 1);
    });
}

#[test]
fn partial_text_range_and_absent_filters_agree() {
    with_each_backend(|repo| {
        repo.add(&work("Dune", "Frank Herbert", Some(1965), Some("Science Fiction")))
            .unwrap();
        repo.add(&work("Leviathan", "Thomas Hobbes", Some(1651), Some("Political Science")))
            .unwrap();
        repo.add(&work("The Hobbit", "J. R. R. Tolkien", Some(1937), Some("Fantasy")))
            .unwrap();
        repo.add(&work("Beowulf", "Anonymous", None, None)).unwrap();

        let science = FilterSpec::new()
            .text(WorkField::Genre, ["science"])
            .with_partial(true);
        assert_eq!(repo.find(&science).unwrap().len(), 2);

        let modern = FilterSpec::new().range(WorkField::Year, 1900, 2000);
        let titles: Vec<String> = repo
            .find(&modern)
            .unwrap()
            .iter()
            .map(|work| work.title().to_string())
            .collect();
        assert_eq!(titles, vec!["Dune", "The Hobbit"]);

        let undated = FilterSpec::new().absent(WorkField::Year);
        assert_eq!(repo.find(&undated).unwrap()[0].title(), "Beowulf");
    });
}

#[test]
fn explicit_order_puts_absent_values_last_and_limits() {
    with_each_backend(|repo| {
        repo.add(&work("A", "Author", None, Some("x"))).unwrap();
        repo.add(&work("B", "Author", Some(1990), Some("x"))).unwrap();
        repo.add(&work("C", "Author", Some(2001), Some("x"))).unwrap();

        let spec = FilterSpec::new()
            .text(WorkField::Genre, ["x"])
            .with_order(WorkField::Year, SortOrder::Descending);
        let titles: Vec<String> = repo
            .find(&spec)
            .unwrap()
            .iter()
            .map(|work| work.title().to_string())
            .collect();
        assert_eq!(titles, vec!["C", "B", "A"]);

        let first = repo.find_ids(&spec.clone().with_limit(1)).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(repo.get(first[0]).unwrap().unwrap().title(), "C");
    });
}

#[test]
fn update_applies_changes_and_guards_identity() {
    with_each_backend(|repo| {
        let dune = repo.add(&work("Dune", "Frank Herbert", Some(1965), None)).unwrap();
        let emma = repo.add(&work("Emma", "Jane Austen", Some(1815), None)).unwrap();

        let changed = repo
            .update(
                dune,
                &Changes::new()
                    .set(WorkField::Genre, "Science Fiction")
                    .set(WorkField::IsRead, true),
            )
            .unwrap();
        assert_eq!(changed, 1);
        let loaded = repo.get(dune).unwrap().unwrap();
        assert_eq!(loaded.genre(), Some("Science Fiction"));
        assert!(loaded.is_read());

        let collision = Changes::new()
            .set(WorkField::Title, "emma")
            .set(WorkField::Author, "jane austen")
            .set(WorkField::Year, 1815);
        assert!(matches!(
            repo.update(dune, &collision).unwrap_err(),
            RepoError::DuplicateIdentity { .. }
        ));
        assert_eq!(repo.get(emma).unwrap().unwrap().title(), "Emma");

        let nulls = Changes::new().set(WorkField::Genre, Option::<String>::None);
        assert!(matches!(
            repo.update(dune, &nulls).unwrap_err(),
            RepoError::Validation(ValidationError::NoChanges)
        ));

        let future = Changes::new().set(WorkField::Year, 9999);
        assert!(matches!(
            repo.update(dune, &future).unwrap_err(),
            RepoError::Validation(ValidationError::YearOutOfRange { .. })
        ));

        assert!(matches!(
            repo.update(999, &Changes::new().set(WorkField::IsRead, false))
                .unwrap_err(),
            RepoError::NotFound { kind: "work", id: 999 }
        ));
    });
}

#[test]
fn unknown_field_names_are_invalid_fields() {
    let err = RepoError::from(Changes::<BookField>::new().named("colour", "red").unwrap_err());
    assert!(matches!(err, RepoError::InvalidField { kind: "book", .. }));
}

#[test]
fn delete_variants_report_what_they_removed() {
    with_each_backend(|repo| {
        let dune = repo.add(&work("Dune", "Frank Herbert", Some(1965), None)).unwrap();
        repo.add(&work("Children of Dune", "Frank Herbert", Some(1976), None))
            .unwrap();
        repo.add(&work("Emma", "Jane Austen", Some(1815), None)).unwrap();

        let removed = repo.delete(dune).unwrap();
        assert_eq!(removed.title(), "Dune");
        assert!(matches!(
            repo.delete(dune).unwrap_err(),
            RepoError::NotFound { .. }
        ));

        let herbert = FilterSpec::new().text(WorkField::Author, ["frank herbert"]);
        assert_eq!(repo.delete_where(&herbert).unwrap(), 1);
        assert_eq!(repo.delete_all().unwrap(), 1);
        assert_eq!(repo.count().unwrap(), 0);

        // Ids are never reused after deletes.
        let next = repo.add(&work("Dune", "Frank Herbert", Some(1965), None)).unwrap();
        assert!(next > dune);
    });
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn halifax(start: NaiveDate, end: Option<NaiveDate>) -> Address {
    let location = Location {
        street: "1 Main St".to_string(),
        city: "Halifax".to_string(),
        province: None,
        country: "Canada".to_string(),
        postal_code: "B3H 1A1".to_string(),
    };
    Address::new(&location, start, end).unwrap()
}

#[test]
fn one_location_may_be_stored_for_separate_periods() {
    let conn = open_db_in_memory().unwrap();
    let mut memory = InMemoryRepository::<Address>::new();
    let mut sqlite = SqliteRepository::<Address>::try_new(&conn).unwrap();
    let backends: [&mut dyn Repository<Address>; 2] = [&mut memory, &mut sqlite];

    for repo in backends {
        let first = halifax(date(2010, 1, 1), Some(date(2012, 1, 1)));
        let second = halifax(date(2015, 1, 1), Some(date(2016, 1, 1)));
        let first_id = repo.add(&first).unwrap();
        let second_id = repo.add(&second).unwrap();
        assert_ne!(first_id, second_id);
        assert_eq!(repo.id_of(&second).unwrap(), Some(second_id));

        // The same location and period is still a duplicate.
        assert!(matches!(
            repo.add(&halifax(date(2015, 1, 1), Some(date(2016, 1, 1)))).unwrap_err(),
            RepoError::DuplicateIdentity { kind: "address", .. }
        ));
        assert_eq!(repo.count().unwrap(), 2);
    }
}

#[test]
fn a_company_may_be_rejoined_on_a_later_start_date() {
    let conn = open_db_in_memory().unwrap();
    let mut memory = InMemoryRepository::<Employment>::new();
    let mut sqlite = SqliteRepository::<Employment>::try_new(&conn).unwrap();
    let backends: [&mut dyn Repository<Employment>; 2] = [&mut memory, &mut sqlite];
    let contact = EmploymentContact::default();

    for repo in backends {
        let first = Employment::new("Acme", date(2010, 1, 1), Some(date(2012, 1, 1)), &contact)
            .unwrap();
        let rehired = Employment::new("ACME", date(2014, 3, 1), None, &contact).unwrap();
        let first_id = repo.add(&first).unwrap();
        let rehired_id = repo.add(&rehired).unwrap();

        let same_start =
            Employment::new("acme", date(2010, 1, 1), Some(date(2011, 1, 1)), &contact).unwrap();
        assert!(matches!(
            repo.add(&same_start).unwrap_err(),
            RepoError::DuplicateIdentity { kind: "employment", .. }
        ));

        // Moving the second stint onto the first one's start collides.
        let onto_first = Changes::new().set(EmploymentField::Start, date(2010, 1, 1));
        assert!(matches!(
            repo.update(rehired_id, &onto_first).unwrap_err(),
            RepoError::DuplicateIdentity { .. }
        ));
        assert_eq!(repo.get(first_id).unwrap().unwrap().company(), "Acme");
    }
}
