//! Todo and note listing filters.

use crate::model::resource::{ResourceId, ValidationError};
use crate::query::{flag, non_blank, parse_count, parse_flag, QueryFilter};
use serde::{Deserialize, Serialize};

/// Listing filter for todos.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoFilter {
    pub include_done: bool,
    pub include_deleted: bool,
    pub deleted_only: bool,
    pub list_id: Option<ResourceId>,
    pub query: Option<String>,
    /// `None` or `0` means the authority default.
    pub limit: Option<u32>,
    pub offset: u32,
}

impl TodoFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include_done(mut self, value: bool) -> Self {
        self.include_done = value;
        self
    }

    pub fn include_deleted(mut self, value: bool) -> Self {
        self.include_deleted = value;
        self
    }

    pub fn deleted_only(mut self, value: bool) -> Self {
        self.deleted_only = value;
        self
    }

    pub fn in_list(mut self, list_id: impl Into<ResourceId>) -> Self {
        self.list_id = Some(list_id.into());
        self
    }

    pub fn matching(mut self, text: impl Into<String>) -> Self {
        self.query = Some(text.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }
}

impl QueryFilter for TodoFilter {
    fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let filter = self.clone().normalized();
        let mut pairs = vec![("include_done", flag(filter.include_done))];
        if filter.include_deleted {
            pairs.push(("include_deleted", flag(true)));
        }
        if filter.deleted_only {
            pairs.push(("deleted_only", flag(true)));
        }
        if let Some(list_id) = filter.list_id {
            pairs.push(("list_id", list_id));
        }
        if let Some(query) = filter.query {
            pairs.push(("query", query));
        }
        if let Some(limit) = filter.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if filter.offset > 0 {
            pairs.push(("offset", filter.offset.to_string()));
        }
        pairs
    }

    fn accept_pair(&mut self, key: &str, value: &str) -> Result<(), ValidationError> {
        match key {
            "include_done" => self.include_done = parse_flag(key, value)?,
            "include_deleted" => self.include_deleted = parse_flag(key, value)?,
            "deleted_only" => self.deleted_only = parse_flag(key, value)?,
            "list_id" => self.list_id = Some(value.to_string()),
            "query" => self.query = Some(value.to_string()),
            "limit" => self.limit = Some(parse_count(key, value)?),
            "offset" => self.offset = parse_count(key, value)?,
            _ => {}
        }
        Ok(())
    }

    fn empty() -> Self {
        Self::default()
    }

    fn normalized(mut self) -> Self {
        if self.deleted_only {
            self.include_deleted = true;
        }
        self.list_id = non_blank(self.list_id);
        self.query = non_blank(self.query);
        self
    }
}

/// Listing filter for notes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteFilter {
    pub include_deleted: bool,
    pub deleted_only: bool,
    pub group_id: Option<ResourceId>,
    pub query: Option<String>,
    pub limit: Option<u32>,
    pub offset: u32,
}

impl NoteFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include_deleted(mut self, value: bool) -> Self {
        self.include_deleted = value;
        self
    }

    pub fn deleted_only(mut self, value: bool) -> Self {
        self.deleted_only = value;
        self
    }

    pub fn in_group(mut self, group_id: impl Into<ResourceId>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    pub fn matching(mut self, text: impl Into<String>) -> Self {
        self.query = Some(text.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }
}

impl QueryFilter for NoteFilter {
    fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let filter = self.clone().normalized();
        let mut pairs = Vec::new();
        if filter.include_deleted {
            pairs.push(("include_deleted", flag(true)));
        }
        if filter.deleted_only {
            pairs.push(("deleted_only", flag(true)));
        }
        if let Some(group_id) = filter.group_id {
            pairs.push(("group_id", group_id));
        }
        if let Some(query) = filter.query {
            pairs.push(("query", query));
        }
        if let Some(limit) = filter.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if filter.offset > 0 {
            pairs.push(("offset", filter.offset.to_string()));
        }
        pairs
    }

    fn accept_pair(&mut self, key: &str, value: &str) -> Result<(), ValidationError> {
        match key {
            "include_deleted" => self.include_deleted = parse_flag(key, value)?,
            "deleted_only" => self.deleted_only = parse_flag(key, value)?,
            "group_id" => self.group_id = Some(value.to_string()),
            "query" => self.query = Some(value.to_string()),
            "limit" => self.limit = Some(parse_count(key, value)?),
            "offset" => self.offset = parse_count(key, value)?,
            _ => {}
        }
        Ok(())
    }

    fn empty() -> Self {
        Self::default()
    }

    fn normalized(mut self) -> Self {
        if self.deleted_only {
            self.include_deleted = true;
        }
        self.group_id = non_blank(self.group_id);
        self.query = non_blank(self.query);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{NoteFilter, TodoFilter};
    use crate::model::resource::ValidationError;
    use crate::query::QueryFilter;

    #[test]
    fn todo_filter_encodes_canonical_key_order() {
        let encoded = TodoFilter::new()
            .in_list("L1")
            .matching("buy milk")
            .limit(20)
            .offset(40)
            .to_query();
        assert_eq!(
            encoded,
            "include_done=0&list_id=L1&query=buy+milk&limit=20&offset=40"
        );
    }

    #[test]
    fn deleted_only_always_carries_include_deleted() {
        let encoded = NoteFilter::new().deleted_only(true).to_query();
        assert_eq!(encoded, "include_deleted=1&deleted_only=1");
    }

    #[test]
    fn blank_scope_is_omitted() {
        let encoded = TodoFilter::new().include_done(true).in_list("  ").to_query();
        assert_eq!(encoded, "include_done=1");
    }

    #[test]
    fn decode_accepts_word_booleans_and_percent_escapes() {
        let filter =
            TodoFilter::from_query("?include_done=true&query=caf%C3%A9%20run&unknown=x").unwrap();
        assert!(filter.include_done);
        assert_eq!(filter.query.as_deref(), Some("café run"));
    }

    #[test]
    fn decode_rejects_malformed_numbers() {
        let err = NoteFilter::from_query("limit=ten").unwrap_err();
        assert!(matches!(err, ValidationError::Malformed(_)));
        assert!(TodoFilter::from_query("include_done=yes").is_err());
    }
}
