//! Input normalization applied by record constructors.
//!
//! # Invariants
//! - Text is trimmed before it is stored.
//! - Case folding is ASCII-only so in-memory identity agrees with SQLite's
//!   `lower()` used by the identity indexes.

use super::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;

static LOCATION_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{3}$").expect("valid location code regex"));
static ISBN_SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s\-]+").expect("valid isbn separator regex"));
static ISBN_SHAPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[0-9]{9}[0-9X]|[0-9]{13})$").expect("valid isbn shape regex"));

/// Trims required text and rejects blank values.
pub fn required_text(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Blank { field });
    }
    Ok(trimmed.to_string())
}

/// Trims optional text; blank input becomes `None`.
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

/// Identity key form of a text value.
pub fn fold_case(value: &str) -> String {
    value.trim().to_ascii_lowercase()
}

/// Normalizes a 3-letter travel location code to uppercase.
pub fn location_code(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let code = value.trim().to_ascii_uppercase();
    if !LOCATION_CODE_RE.is_match(&code) {
        return Err(ValidationError::InvalidLocationCode {
            field,
            value: value.trim().to_string(),
        });
    }
    Ok(code)
}

/// Strips separators from an ISBN and checks its 10/13 character shape.
///
/// Checksum verification is left to the caller's ISBN tooling.
pub fn isbn(value: &str) -> Result<String, ValidationError> {
    let compact = ISBN_SEPARATOR_RE
        .replace_all(value.trim(), "")
        .to_ascii_uppercase();
    if !ISBN_SHAPE_RE.is_match(&compact) {
        return Err(ValidationError::InvalidIsbn(value.trim().to_string()));
    }
    Ok(compact)
}
