//! Relational mapping of record types onto SQLite tables.
//!
//! # Responsibility
//! - Declare each record's table, persisted columns and select source.
//! - Convert records to bound parameter rows and back.
//!
//! # Invariants
//! - Dates are stored as ISO-8601 `YYYY-MM-DD` text, booleans as 0/1 and
//!   enums as their string tag.
//! - `UNIQUE_KEY` expressions mirror the table's unique index so a lookup by
//!   key agrees with the store's duplicate detection.
//! - Read paths reject invalid persisted state instead of masking it.

use super::{RecordId, RepoError, RepoResult};
use crate::model::address::{Address, AddressField, Location};
use crate::model::book::{Book, BookField, BookFormat};
use crate::model::date::{format_date, parse_date};
use crate::model::employment::{Employment, EmploymentContact, EmploymentField};
use crate::model::normalize::fold_case;
use crate::model::record::Record;
use crate::model::travel::{Travel, TravelField};
use crate::model::work::{Work, WorkField};
use crate::model::FieldValue;
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};

/// A column of a specific table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub table: &'static str,
    pub name: &'static str,
}

impl Column {
    const fn of(table: &'static str, name: &'static str) -> Self {
        Self { table, name }
    }

    pub fn qualified(&self) -> String {
        format!("{}.{}", self.table, self.name)
    }
}

/// SQLite mapping of one record type.
pub trait Table: Record {
    /// Table holding the record's own row and surrogate id.
    const TABLE: &'static str;
    /// Persisted columns of `TABLE`, excluding `id`, in bind order.
    const COLUMNS: &'static [&'static str];
    /// Tables present in `SOURCE`.
    const TABLES: &'static [&'static str];
    /// `FROM` source for reads.
    const SOURCE: &'static str;
    /// Select list aliasing every column read by `from_row`.
    const SELECT: &'static str;
    /// SQL expressions matching the table's unique index.
    const UNIQUE_KEY: &'static [&'static str];

    fn column(field: Self::Field) -> Column;

    /// Parameter row for `COLUMNS`.
    fn to_row(&self, conn: &Connection) -> RepoResult<Vec<Value>>;

    /// Parameters for `UNIQUE_KEY`; `None` when the key cannot be stored
    /// (a book whose work is not stored).
    fn unique_key_values(&self, conn: &Connection) -> RepoResult<Option<Vec<Value>>>;

    fn from_row(row: &Row<'_>) -> RepoResult<Self>;
}

/// Tables another record type may be joined to.
pub trait Joinable<J: Table>: Table {
    /// Join clause appended to `Self::SOURCE`.
    const JOIN: &'static str;
}

impl Joinable<Book> for Work {
    const JOIN: &'static str = "INNER JOIN book ON book.work_id = work.id";
}

/// Id of the stored record with the same unique key as `record`.
pub fn lookup_unique_key<R: Table>(conn: &Connection, record: &R) -> RepoResult<Option<RecordId>> {
    let Some(values) = record.unique_key_values(conn)? else {
        return Ok(None);
    };
    let clause = R::UNIQUE_KEY
        .iter()
        .enumerate()
        .map(|(index, expr)| format!("{expr} = ?{}", index + 1))
        .collect::<Vec<_>>()
        .join(" AND ");
    let sql = format!(
        "SELECT {table}.id FROM {table} WHERE {clause} LIMIT 1;",
        table = R::TABLE
    );
    let id = conn
        .query_row(&sql, params_from_iter(values), |row| row.get(0))
        .optional()?;
    Ok(id)
}

/// Bound parameter form of a field value.
pub fn to_sql_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Text(text) => Value::Text(text.clone()),
        FieldValue::Integer(number) => Value::Integer(*number),
        FieldValue::Bool(flag) => Value::Integer(bool_to_int(*flag)),
        FieldValue::Date(date) => Value::Text(format_date(*date)),
    }
}

fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}

fn optional_text(value: Option<&str>) -> Value {
    value.map_or(Value::Null, text)
}

fn date(value: NaiveDate) -> Value {
    Value::Text(format_date(value))
}

fn optional_date(value: Option<NaiveDate>) -> Value {
    value.map_or(Value::Null, date)
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

fn read_date(row: &Row<'_>, column: &str) -> RepoResult<NaiveDate> {
    let raw: String = row.get(column)?;
    parse_date(&raw)
        .map_err(|_| RepoError::InvalidData(format!("invalid date `{raw}` in column {column}")))
}

fn read_optional_date(row: &Row<'_>, column: &str) -> RepoResult<Option<NaiveDate>> {
    match row.get::<_, Option<String>>(column)? {
        Some(raw) => parse_date(&raw).map(Some).map_err(|_| {
            RepoError::InvalidData(format!("invalid date `{raw}` in column {column}"))
        }),
        None => Ok(None),
    }
}

fn read_bool(row: &Row<'_>, column: &str) -> RepoResult<bool> {
    match row.get::<_, i64>(column)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean `{other}` in column {column}"
        ))),
    }
}

fn invalid_row<E: std::fmt::Display>(table: &'static str) -> impl Fn(E) -> RepoError {
    move |err| RepoError::InvalidData(format!("{table} row: {err}"))
}

fn work_from_row(row: &Row<'_>) -> RepoResult<Work> {
    let year = match row.get::<_, Option<i64>>("year")? {
        Some(year) => Some(i32::try_from(year).map_err(invalid_row("work"))?),
        None => None,
    };
    let genre: Option<String> = row.get("genre")?;
    Work::new(
        &row.get::<_, String>("title")?,
        &row.get::<_, String>("author")?,
        year,
        genre.as_deref(),
        read_bool(row, "is_read")?,
    )
    .map_err(invalid_row("work"))
}

fn work_key_values(work: &Work) -> Vec<Value> {
    vec![
        text(&fold_case(work.author())),
        text(&fold_case(work.title())),
        work.year()
            .map_or_else(|| text("absent"), |year| Value::Integer(i64::from(year))),
    ]
}

impl Table for Work {
    const TABLE: &'static str = "work";
    const COLUMNS: &'static [&'static str] = &["title", "author", "year", "genre", "is_read"];
    const TABLES: &'static [&'static str] = &["work"];
    const SOURCE: &'static str = "work";
    const SELECT: &'static str = "work.id AS id, work.title AS title, work.author AS author, \
         work.year AS year, work.genre AS genre, work.is_read AS is_read";
    const UNIQUE_KEY: &'static [&'static str] = &[
        "lower(work.author)",
        "lower(work.title)",
        "ifnull(work.year, 'absent')",
    ];

    fn column(field: WorkField) -> Column {
        let name = match field {
            WorkField::Title => "title",
            WorkField::Author => "author",
            WorkField::Year => "year",
            WorkField::Genre => "genre",
            WorkField::IsRead => "is_read",
        };
        Column::of("work", name)
    }

    fn to_row(&self, _conn: &Connection) -> RepoResult<Vec<Value>> {
        Ok(vec![
            text(self.title()),
            text(self.author()),
            self.year()
                .map_or(Value::Null, |year| Value::Integer(i64::from(year))),
            optional_text(self.genre()),
            Value::Integer(bool_to_int(self.is_read())),
        ])
    }

    fn unique_key_values(&self, _conn: &Connection) -> RepoResult<Option<Vec<Value>>> {
        Ok(Some(work_key_values(self)))
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        work_from_row(row)
    }
}

impl Table for Book {
    const TABLE: &'static str = "book";
    const COLUMNS: &'static [&'static str] = &["work_id", "pages", "format", "isbn"];
    const TABLES: &'static [&'static str] = &["book", "work"];
    const SOURCE: &'static str = "book INNER JOIN work ON work.id = book.work_id";
    const SELECT: &'static str = "book.id AS id, work.title AS title, work.author AS author, \
         work.year AS year, work.genre AS genre, work.is_read AS is_read, \
         book.pages AS pages, book.format AS format, book.isbn AS isbn";
    const UNIQUE_KEY: &'static [&'static str] =
        &["book.work_id", "book.format", "ifnull(book.isbn, '')"];

    fn column(field: BookField) -> Column {
        match field {
            BookField::Title => Column::of("work", "title"),
            BookField::Author => Column::of("work", "author"),
            BookField::Year => Column::of("work", "year"),
            BookField::Pages => Column::of("book", "pages"),
            BookField::Format => Column::of("book", "format"),
            BookField::Isbn => Column::of("book", "isbn"),
        }
    }

    fn to_row(&self, conn: &Connection) -> RepoResult<Vec<Value>> {
        let work_id = lookup_unique_key(conn, self.work())?.ok_or_else(|| {
            RepoError::ConstraintViolation(format!(
                "book references a work that is not stored: {}",
                self.work().describe()
            ))
        })?;
        Ok(vec![
            Value::Integer(work_id),
            self.pages()
                .map_or(Value::Null, |pages| Value::Integer(i64::from(pages))),
            text(self.format().as_str()),
            optional_text(self.isbn()),
        ])
    }

    fn unique_key_values(&self, conn: &Connection) -> RepoResult<Option<Vec<Value>>> {
        let Some(work_id) = lookup_unique_key(conn, self.work())? else {
            return Ok(None);
        };
        Ok(Some(vec![
            Value::Integer(work_id),
            text(self.format().as_str()),
            text(self.isbn().unwrap_or_default()),
        ]))
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        let work = work_from_row(row)?;
        let pages = match row.get::<_, Option<i64>>("pages")? {
            Some(pages) => Some(u32::try_from(pages).map_err(invalid_row("book"))?),
            None => None,
        };
        let format = BookFormat::parse(&row.get::<_, String>("format")?)
            .map_err(invalid_row("book"))?;
        let isbn: Option<String> = row.get("isbn")?;
        Book::new(work, pages, format, isbn.as_deref()).map_err(invalid_row("book"))
    }
}

impl Table for Travel {
    const TABLE: &'static str = "travel";
    const COLUMNS: &'static [&'static str] = &["origin", "destination", "date", "notes"];
    const TABLES: &'static [&'static str] = &["travel"];
    const SOURCE: &'static str = "travel";
    const SELECT: &'static str = "travel.id AS id, travel.origin AS origin, \
         travel.destination AS destination, travel.date AS date, travel.notes AS notes";
    const UNIQUE_KEY: &'static [&'static str] =
        &["travel.origin", "travel.destination", "travel.date"];

    fn column(field: TravelField) -> Column {
        let name = match field {
            TravelField::Origin => "origin",
            TravelField::Destination => "destination",
            TravelField::Date => "date",
            TravelField::Notes => "notes",
        };
        Column::of("travel", name)
    }

    fn to_row(&self, _conn: &Connection) -> RepoResult<Vec<Value>> {
        Ok(vec![
            text(self.origin()),
            text(self.destination()),
            date(self.date()),
            text(self.notes()),
        ])
    }

    fn unique_key_values(&self, _conn: &Connection) -> RepoResult<Option<Vec<Value>>> {
        Ok(Some(vec![
            text(self.origin()),
            text(self.destination()),
            date(self.date()),
        ]))
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Travel::new(
            &row.get::<_, String>("origin")?,
            &row.get::<_, String>("destination")?,
            read_date(row, "date")?,
            &row.get::<_, String>("notes")?,
        )
        .map_err(invalid_row("travel"))
    }
}

impl Table for Address {
    const TABLE: &'static str = "address";
    const COLUMNS: &'static [&'static str] = &[
        "start_date",
        "end_date",
        "street",
        "city",
        "province",
        "country",
        "postal_code",
    ];
    const TABLES: &'static [&'static str] = &["address"];
    const SOURCE: &'static str = "address";
    const SELECT: &'static str = "address.id AS id, address.start_date AS start_date, \
         address.end_date AS end_date, address.street AS street, address.city AS city, \
         address.province AS province, address.country AS country, \
         address.postal_code AS postal_code";
    const UNIQUE_KEY: &'static [&'static str] = &[
        "lower(address.street)",
        "lower(address.city)",
        "lower(ifnull(address.province, ''))",
        "lower(address.country)",
        "lower(address.postal_code)",
        "address.start_date",
        "ifnull(address.end_date, '')",
    ];

    fn column(field: AddressField) -> Column {
        let name = match field {
            AddressField::Start => "start_date",
            AddressField::End => "end_date",
            AddressField::Street => "street",
            AddressField::City => "city",
            AddressField::Province => "province",
            AddressField::Country => "country",
            AddressField::PostalCode => "postal_code",
        };
        Column::of("address", name)
    }

    fn to_row(&self, _conn: &Connection) -> RepoResult<Vec<Value>> {
        Ok(vec![
            date(self.start()),
            optional_date(self.end()),
            text(self.street()),
            text(self.city()),
            optional_text(self.province()),
            text(self.country()),
            text(self.postal_code()),
        ])
    }

    fn unique_key_values(&self, _conn: &Connection) -> RepoResult<Option<Vec<Value>>> {
        let ((street, city, province, country, postal_code), start, end) = self.unique_key();
        let mut values: Vec<Value> = [street, city, province, country, postal_code]
            .into_iter()
            .map(Value::Text)
            .collect();
        values.push(date(start));
        values.push(end.map_or_else(|| text(""), date));
        Ok(Some(values))
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        let location = Location {
            street: row.get("street")?,
            city: row.get("city")?,
            province: row.get("province")?,
            country: row.get("country")?,
            postal_code: row.get("postal_code")?,
        };
        Address::new(
            &location,
            read_date(row, "start_date")?,
            read_optional_date(row, "end_date")?,
        )
        .map_err(invalid_row("address"))
    }
}

impl Table for Employment {
    const TABLE: &'static str = "employment";
    const COLUMNS: &'static [&'static str] = &[
        "start_date",
        "end_date",
        "company",
        "supervisor",
        "address",
        "phone",
    ];
    const TABLES: &'static [&'static str] = &["employment"];
    const SOURCE: &'static str = "employment";
    const SELECT: &'static str = "employment.id AS id, employment.start_date AS start_date, \
         employment.end_date AS end_date, employment.company AS company, \
         employment.supervisor AS supervisor, employment.address AS address, \
         employment.phone AS phone";
    const UNIQUE_KEY: &'static [&'static str] =
        &["lower(employment.company)", "employment.start_date"];

    fn column(field: EmploymentField) -> Column {
        let name = match field {
            EmploymentField::Start => "start_date",
            EmploymentField::End => "end_date",
            EmploymentField::Company => "company",
            EmploymentField::Supervisor => "supervisor",
            EmploymentField::Address => "address",
            EmploymentField::Phone => "phone",
        };
        Column::of("employment", name)
    }

    fn to_row(&self, _conn: &Connection) -> RepoResult<Vec<Value>> {
        Ok(vec![
            date(self.start()),
            optional_date(self.end()),
            text(self.company()),
            optional_text(self.supervisor()),
            optional_text(self.address()),
            optional_text(self.phone()),
        ])
    }

    fn unique_key_values(&self, _conn: &Connection) -> RepoResult<Option<Vec<Value>>> {
        let (company, start) = self.unique_key();
        Ok(Some(vec![Value::Text(company), date(start)]))
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        let contact = EmploymentContact {
            supervisor: row.get("supervisor")?,
            address: row.get("address")?,
            phone: row.get("phone")?,
        };
        Employment::new(
            &row.get::<_, String>("company")?,
            read_date(row, "start_date")?,
            read_optional_date(row, "end_date")?,
            &contact,
        )
        .map_err(invalid_row("employment"))
    }
}
