//! CLI smoke entry point.
//!
//! # Responsibility
//! - Resolve configuration and logging the same way an embedding app would.
//! - Open the configured store and print a JSON summary of its records.

use folio_core::model::record::sort_records;
use folio_core::{FolioConfig, RepoError, SqliteStore, Store, UnitOfWork};
use log::info;
use serde_json::json;
use std::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("folio: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let config = FolioConfig::from_env()?;
    folio_core::init_from_config(&config)?;
    info!("event=cli_start module=cli status=ok version={}", folio_core::core_version());

    let store = SqliteStore::open(config.db_path.clone());
    let summary = store.unit_of_work().run(|repos| {
        let mut works = repos.works().list()?;
        sort_records(&mut works);
        let work_count = works.len();
        Ok::<_, RepoError>(json!({
            "db_path": config.db_path.display().to_string(),
            "counts": {
                "works": work_count,
                "books": repos.books().count()?,
                "travels": repos.travels().count()?,
                "addresses": repos.addresses().count()?,
                "employments": repos.employments().count()?,
            },
            "works": works,
        }))
    })?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
