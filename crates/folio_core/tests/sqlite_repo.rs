use chrono::NaiveDate;
use folio_core::db::open_db_in_memory;
use folio_core::filter::{exact_match, range_filter, text_filter};
use folio_core::{
    Address, AddressField, Book, BookField, BookFormat, Changes, Employment, EmploymentContact,
    FieldValue, FilterSpec, Location, RepoError, Repository, SqliteRepository, Travel,
    TravelField, Work,
};
use rusqlite::Connection;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn dune() -> Work {
    Work::new("Dune", "Frank Herbert", Some(1965), Some("Science Fiction"), true).unwrap()
}

fn emma() -> Work {
    Work::new("Emma", "Jane Austen", Some(1815), None, false).unwrap()
}

fn store_works(conn: &Connection, works: &[Work]) {
    let mut repo = SqliteRepository::<Work>::try_new(conn).unwrap();
    for work in works {
        repo.add(work).unwrap();
    }
}

#[test]
fn book_reads_title_and_author_through_its_work() {
    let conn = open_db_in_memory().unwrap();
    store_works(&conn, &[dune(), emma()]);
    let mut books = SqliteRepository::<Book>::try_new(&conn).unwrap();
    let id = books
        .add(&Book::new(dune(), Some(412), BookFormat::Print, Some("978-0-441-17271-9")).unwrap())
        .unwrap();
    books
        .add(&Book::new(emma(), None, BookFormat::Audio, None).unwrap())
        .unwrap();

    let loaded = books.get(id).unwrap().unwrap();
    assert_eq!(loaded.work().title(), "Dune");
    assert_eq!(loaded.isbn(), Some("9780441172719"));

    let by_author = FilterSpec::new()
        .text(BookField::Author, ["herbert"])
        .with_partial(true);
    let found = books.find(&by_author).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].format(), BookFormat::Print);
}

#[test]
fn page_range_is_inclusive_on_both_ends() {
    let conn = open_db_in_memory().unwrap();
    let works: Vec<Work> = (0..4)
        .map(|n| Work::new(&format!("Volume {n}"), "Serial Author", Some(2000 + n), None, false).unwrap())
        .collect();
    store_works(&conn, &works);
    let mut books = SqliteRepository::<Book>::try_new(&conn).unwrap();
    for (work, pages) in works.iter().zip([150, 200, 500, 650]) {
        books
            .add(&Book::new(work.clone(), Some(pages), BookFormat::Print, None).unwrap())
            .unwrap();
    }

    let spec = FilterSpec::new().range(BookField::Pages, 200, 500);
    let pages: Vec<Option<u32>> = books
        .find(&spec)
        .unwrap()
        .iter()
        .map(Book::pages)
        .collect();
    assert_eq!(pages, vec![Some(200), Some(500)]);
}

#[test]
fn book_for_unstored_work_violates_constraint() {
    let conn = open_db_in_memory().unwrap();
    let mut books = SqliteRepository::<Book>::try_new(&conn).unwrap();
    let err = books
        .add(&Book::new(dune(), None, BookFormat::Ebook, None).unwrap())
        .unwrap_err();
    assert!(matches!(err, RepoError::ConstraintViolation(_)));
}

#[test]
fn book_title_is_not_updatable() {
    let conn = open_db_in_memory().unwrap();
    store_works(&conn, &[dune()]);
    let mut books = SqliteRepository::<Book>::try_new(&conn).unwrap();
    let id = books
        .add(&Book::new(dune(), None, BookFormat::Print, None).unwrap())
        .unwrap();

    let err = books
        .update(id, &Changes::new().set(BookField::Title, "Dune Messiah"))
        .unwrap_err();
    assert!(matches!(err, RepoError::InvalidField { kind: "book", .. }));

    books
        .update(id, &Changes::new().set(BookField::Pages, 896u32))
        .unwrap();
    assert_eq!(books.get(id).unwrap().unwrap().pages(), Some(896));
}

#[test]
fn deleting_a_work_cascades_to_its_books() {
    let conn = open_db_in_memory().unwrap();
    store_works(&conn, &[dune()]);
    let mut books = SqliteRepository::<Book>::try_new(&conn).unwrap();
    books
        .add(&Book::new(dune(), None, BookFormat::Print, None).unwrap())
        .unwrap();

    let mut works = SqliteRepository::<Work>::try_new(&conn).unwrap();
    works.delete_all().unwrap();
    assert_eq!(books.count().unwrap(), 0);
}

#[test]
fn joined_query_is_distinct_before_limit() {
    let conn = open_db_in_memory().unwrap();
    store_works(&conn, &[dune(), emma()]);
    let mut books = SqliteRepository::<Book>::try_new(&conn).unwrap();
    for isbn in ["0441172717", "9780441172719"] {
        books
            .add(&Book::new(dune(), None, BookFormat::Print, Some(isbn)).unwrap())
            .unwrap();
    }
    books
        .add(&Book::new(emma(), None, BookFormat::Print, None).unwrap())
        .unwrap();

    let works = SqliteRepository::<Work>::try_new(&conn).unwrap();
    let mut query = works.query();
    query
        .join::<Book>()
        .filter_joined::<Book>(exact_match(BookField::Format, "print").unwrap())
        .limit(2);
    let titles: Vec<String> = query
        .run()
        .unwrap()
        .iter()
        .map(|work| work.title().to_string())
        .collect();
    assert_eq!(titles, vec!["Dune", "Emma"]);

    // Reset keeps the join and limit but drops filters.
    query.reset();
    assert_eq!(query.filter_count(), 0);
    query.filter_joined::<Book>(text_filter(BookField::Isbn, ["0441"], true).unwrap());
    assert_eq!(query.run_ids().unwrap().len(), 1);
}

#[test]
fn filter_on_unjoined_table_requires_join() {
    let conn = open_db_in_memory().unwrap();
    store_works(&conn, &[dune()]);
    let works = SqliteRepository::<Work>::try_new(&conn).unwrap();

    let mut query = works.query();
    query.filter_joined::<Book>(exact_match(BookField::Format, "audio").unwrap());
    assert!(matches!(
        query.run().unwrap_err(),
        RepoError::JoinRequired { table: "book" }
    ));
}

#[test]
fn unfiltered_query_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let works = SqliteRepository::<Work>::try_new(&conn).unwrap();
    assert!(matches!(
        works.query().run().unwrap_err(),
        RepoError::EmptyFilter { kind: "work" }
    ));
}

#[test]
fn dates_round_trip_through_iso_text() {
    let conn = open_db_in_memory().unwrap();
    let location = Location {
        street: "1 Main St".to_string(),
        city: "Halifax".to_string(),
        province: None,
        country: "Canada".to_string(),
        postal_code: "B3H 1A1".to_string(),
    };
    let mut addresses = SqliteRepository::<Address>::try_new(&conn).unwrap();
    let id = addresses
        .add(&Address::new(&location, date(2020, 2, 29), None).unwrap())
        .unwrap();
    let loaded = addresses.get(id).unwrap().unwrap();
    assert_eq!(loaded.start(), date(2020, 2, 29));
    assert_eq!(loaded.end(), None);
    assert_eq!(loaded.province(), None);

    let stored: String = conn
        .query_row("SELECT start_date FROM address WHERE id = ?1;", [id], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(stored, "2020-02-29");

    let open = FilterSpec::new().absent(AddressField::End);
    assert_eq!(addresses.find(&open).unwrap().len(), 1);

    let mut jobs = SqliteRepository::<Employment>::try_new(&conn).unwrap();
    let contact = EmploymentContact {
        phone: Some("555-0100".to_string()),
        ..EmploymentContact::default()
    };
    let id = jobs
        .add(&Employment::new("Acme", date(2010, 1, 4), Some(date(2012, 6, 30)), &contact).unwrap())
        .unwrap();
    let job = jobs.get(id).unwrap().unwrap();
    assert_eq!(job.end(), Some(date(2012, 6, 30)));
    assert_eq!(job.phone(), Some("555-0100"));
    assert_eq!(job.supervisor(), None);
}

#[test]
fn travel_date_window_uses_range_filter() {
    let conn = open_db_in_memory().unwrap();
    let mut trips = SqliteRepository::<Travel>::try_new(&conn).unwrap();
    for (origin, destination, day) in [
        ("YYZ", "LHR", date(2023, 5, 1)),
        ("LHR", "CDG", date(2023, 5, 9)),
        ("CDG", "YYZ", date(2023, 6, 2)),
    ] {
        trips
            .add(&Travel::new(origin, destination, day, "").unwrap())
            .unwrap();
    }

    let may = range_filter(
        TravelField::Date,
        Some(FieldValue::from(date(2023, 5, 1))),
        Some(FieldValue::from(date(2023, 5, 31))),
        None,
    )
    .unwrap();
    let mut query = trips.query();
    query.filter(may);
    assert_eq!(query.run().unwrap().len(), 2);

    let duplicate = Travel::new("yyz", "lhr", date(2023, 5, 1), "again").unwrap();
    assert!(matches!(
        trips.add(&duplicate).unwrap_err(),
        RepoError::DuplicateIdentity { kind: "travel", .. }
    ));
}

#[test]
fn corrupt_stored_rows_surface_as_invalid_data() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO travel (origin, destination, date, notes) VALUES ('YYZ', 'LHR', 'soon', '');",
        [],
    )
    .unwrap();
    let trips = SqliteRepository::<Travel>::try_new(&conn).unwrap();
    assert!(matches!(
        trips.list().unwrap_err(),
        RepoError::InvalidData(_)
    ));
}
