//! Runtime configuration resolved from the environment.
//!
//! # Invariants
//! - Log level names go through the same normalization as logging init.
//! - A configured log directory is always absolute.

use crate::logging::{default_log_level, normalize_level, normalize_log_dir};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const DB_PATH_VAR: &str = "FOLIO_DB_PATH";
pub const LOG_LEVEL_VAR: &str = "FOLIO_LOG_LEVEL";
pub const LOG_DIR_VAR: &str = "FOLIO_LOG_DIR";

const DEFAULT_DB_FILE: &str = "folio.sqlite3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolioConfig {
    pub db_path: PathBuf,
    pub log_level: &'static str,
    /// `None` leaves logging disabled.
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue { var: &'static str, message: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { var, message } => write!(f, "invalid {var}: {message}"),
        }
    }
}

impl Error for ConfigError {}

impl FolioConfig {
    /// Resolves configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Resolves configuration through `lookup`; blank values count as unset.
    pub fn from_lookup<L>(lookup: L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let read = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());

        let db_path = read(DB_PATH_VAR)
            .map(|value| PathBuf::from(value.trim()))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE));

        let log_level = match read(LOG_LEVEL_VAR) {
            Some(value) => normalize_level(&value).map_err(|message| ConfigError::InvalidValue {
                var: LOG_LEVEL_VAR,
                message,
            })?,
            None => default_log_level(),
        };

        let log_dir = read(LOG_DIR_VAR)
            .map(|value| normalize_log_dir(&value))
            .transpose()
            .map_err(|message| ConfigError::InvalidValue {
                var: LOG_DIR_VAR,
                message,
            })?;

        Ok(Self {
            db_path,
            log_level,
            log_dir,
        })
    }
}
