//! Note and note-group table mappings.
//!
//! # Invariants
//! - Note listings are most-recently-updated first.
//! - Free-text search matches title and markdown body.

use crate::model::note::{Note, NoteGroup};
use crate::model::resource::{ResourceMeta, Timestamp, ValidationError};
use crate::repo::resource_repo::{
    bool_to_int, int_to_bool, opt_int, opt_text, ContainerRecord, RepoResult, ResourceRecord,
    SqliteResourceRepository,
};
use rusqlite::types::Value;
use rusqlite::Row;

pub type SqliteNoteRepository<'conn> = SqliteResourceRepository<'conn, Note>;
pub type SqliteNoteGroupRepository<'conn> = SqliteResourceRepository<'conn, NoteGroup>;

impl ResourceRecord for Note {
    const KIND: &'static str = "note";
    const TABLE: &'static str = "notes";
    const COLUMNS: &'static [&'static str] = &["group_id", "title", "body_md", "deleted_at"];
    const SOFT_DELETE: bool = true;
    const SCOPE_COLUMN: Option<&'static str> = Some("group_id");
    const SEARCH_COLUMNS: &'static [&'static str] = &["title", "body_md"];
    const ORDER_BY: &'static str = "updated_at DESC, id ASC";

    fn column_values(&self) -> Vec<Value> {
        vec![
            opt_text(self.group_id.as_deref()),
            Value::Text(self.title.clone()),
            Value::Text(self.body_md.clone()),
            opt_int(self.deleted_at),
        ]
    }

    fn from_row(meta: ResourceMeta, row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            meta,
            group_id: row.get("group_id")?,
            title: row.get("title")?,
            body_md: row.get("body_md")?,
            deleted_at: row.get("deleted_at")?,
        })
    }
}

impl ResourceRecord for NoteGroup {
    const KIND: &'static str = "note group";
    const TABLE: &'static str = "note_groups";
    const COLUMNS: &'static [&'static str] = &["name", "is_default"];
    const SOFT_DELETE: bool = false;
    const SCOPE_COLUMN: Option<&'static str> = None;
    const SEARCH_COLUMNS: &'static [&'static str] = &["name"];
    const ORDER_BY: &'static str = "lower(name) ASC, created_at ASC, id ASC";

    fn column_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.name.clone()),
            Value::Integer(bool_to_int(self.is_default)),
        ]
    }

    fn from_row(meta: ResourceMeta, row: &Row<'_>) -> RepoResult<Self> {
        let is_default: i64 = row.get("is_default")?;
        Ok(Self {
            meta,
            name: row.get("name")?,
            is_default: int_to_bool(is_default, "note_groups.is_default")?,
        })
    }
}

impl ContainerRecord for NoteGroup {
    const MEMBER_TABLE: &'static str = "notes";
    const MEMBER_COLUMN: &'static str = "group_id";

    fn is_default(&self) -> bool {
        self.is_default
    }

    fn default_for(owner: &str, now: Timestamp) -> Result<Self, ValidationError> {
        NoteGroup::default_for(owner, now)
    }
}
