//! Collection query codec.
//!
//! # Responsibility
//! - Encode structured listing filters to a canonical query string.
//! - Decode query strings back into filters, rejecting malformed values.
//!
//! # Invariants
//! - Encoding normalizes first: `deleted_only` implies `include_deleted`,
//!   blank scope/text values are dropped.
//! - Unknown keys are ignored on decode; the last occurrence of a key wins.

mod filter;

pub use filter::{NoteFilter, TodoFilter};

use crate::model::resource::ValidationError;
use url::form_urlencoded;

/// Filter that round-trips through a URL query string.
pub trait QueryFilter: Sized {
    /// Canonical ordered key/value pairs. Callers get normalized output.
    fn to_pairs(&self) -> Vec<(&'static str, String)>;

    /// Applies one decoded pair. Unknown keys must be ignored.
    fn accept_pair(&mut self, key: &str, value: &str) -> Result<(), ValidationError>;

    /// Default filter before any pair is applied.
    fn empty() -> Self;

    fn normalized(self) -> Self;

    fn to_query(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.to_pairs())
            .finish()
    }

    fn from_query(query: &str) -> Result<Self, ValidationError> {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut filter = Self::empty();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            filter.accept_pair(&key, &value)?;
        }
        Ok(filter.normalized())
    }
}

pub(crate) fn parse_flag(key: &str, value: &str) -> Result<bool, ValidationError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        _ => Err(ValidationError::Malformed(format!(
            "{key} must be one of 1, 0, true, false"
        ))),
    }
}

pub(crate) fn parse_count(key: &str, value: &str) -> Result<u32, ValidationError> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|_| ValidationError::Malformed(format!("{key} must be a non-negative integer")))
}

pub(crate) fn flag(value: bool) -> String {
    let text = if value { "1" } else { "0" };
    text.to_string()
}

/// Trimmed non-empty text, or `None`.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}
