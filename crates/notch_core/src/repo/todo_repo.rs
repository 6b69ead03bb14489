//! Todo and todo-list table mappings plus reminder queries.
//!
//! # Responsibility
//! - Map `Todo`/`TodoList` onto the generic resource repository.
//! - Serve the reminder collaborator (due scan, sent marker).
//!
//! # Invariants
//! - Todo listings order open items first, then by `remind_at` ascending
//!   with unset reminders last, then most recently updated.
//! - Marking a reminder sent is a versioned mutation like any other.

use crate::model::resource::{next_stamp, ResourceMeta, Timestamp, ValidationError, Versioned};
use crate::model::todo::{Todo, TodoList};
use crate::repo::resource_repo::{
    bool_to_int, int_to_bool, opt_int, opt_text, parse_record, select_sql, ContainerRecord,
    RepoError, RepoResult, ResourceRecord, ResourceRepository, SqliteResourceRepository,
};
use rusqlite::types::Value;
use rusqlite::{params, Row};

pub type SqliteTodoRepository<'conn> = SqliteResourceRepository<'conn, Todo>;
pub type SqliteTodoListRepository<'conn> = SqliteResourceRepository<'conn, TodoList>;

impl ResourceRecord for Todo {
    const KIND: &'static str = "todo";
    const TABLE: &'static str = "todos";
    const COLUMNS: &'static [&'static str] = &[
        "title",
        "done",
        "due_at",
        "remind_at",
        "remind_sent_at",
        "assigned_to",
        "list_id",
        "deleted_at",
    ];
    const SOFT_DELETE: bool = true;
    const SCOPE_COLUMN: Option<&'static str> = Some("list_id");
    const SEARCH_COLUMNS: &'static [&'static str] = &["title"];
    const ORDER_BY: &'static str = "done ASC, \
        CASE WHEN remind_at IS NULL THEN 1 ELSE 0 END ASC, \
        remind_at ASC, updated_at DESC, id ASC";

    fn column_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.title.clone()),
            Value::Integer(bool_to_int(self.done)),
            opt_int(self.due_at),
            opt_int(self.remind_at),
            opt_int(self.remind_sent_at),
            opt_text(self.assigned_to.as_deref()),
            opt_text(self.list_id.as_deref()),
            opt_int(self.deleted_at),
        ]
    }

    fn from_row(meta: ResourceMeta, row: &Row<'_>) -> RepoResult<Self> {
        let done: i64 = row.get("done")?;
        Ok(Self {
            meta,
            title: row.get("title")?,
            done: int_to_bool(done, "todos.done")?,
            due_at: row.get("due_at")?,
            remind_at: row.get("remind_at")?,
            remind_sent_at: row.get("remind_sent_at")?,
            assigned_to: row.get("assigned_to")?,
            list_id: row.get("list_id")?,
            deleted_at: row.get("deleted_at")?,
        })
    }
}

impl ResourceRecord for TodoList {
    const KIND: &'static str = "list";
    const TABLE: &'static str = "todo_lists";
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
            is_default: int_to_bool(is_default, "todo_lists.is_default")?,
        })
    }
}

impl ContainerRecord for TodoList {
    const MEMBER_TABLE: &'static str = "todos";
    const MEMBER_COLUMN: &'static str = "list_id";

    fn is_default(&self) -> bool {
        self.is_default
    }

    fn default_for(owner: &str, now: Timestamp) -> Result<Self, ValidationError> {
        TodoList::default_for(owner, now)
    }
}

/// Queries used by the reminder/notification collaborator.
pub trait ReminderRepository {
    /// Active, unfinished todos whose reminder is due and not yet sent.
    fn due_reminders(&self, now: Timestamp, limit: u32) -> RepoResult<Vec<Todo>>;
    /// Stamps `remind_sent_at`, bumping version and `updated_at`.
    fn mark_reminder_sent(&self, id: &str, sent_at: Timestamp) -> RepoResult<Todo>;
}

impl ReminderRepository for SqliteTodoRepository<'_> {
    fn due_reminders(&self, now: Timestamp, limit: u32) -> RepoResult<Vec<Todo>> {
        let mut stmt = self.connection().prepare(&format!(
            "{} WHERE deleted_at IS NULL
               AND done = 0
               AND remind_at IS NOT NULL
               AND remind_at <= ?1
               AND remind_sent_at IS NULL
             ORDER BY remind_at ASC, id ASC
             LIMIT ?2;",
            select_sql::<Todo>()
        ))?;
        let mut rows = stmt.query(params![now, i64::from(limit)])?;
        let mut todos = Vec::new();
        while let Some(row) = rows.next()? {
            todos.push(parse_record(row)?);
        }
        Ok(todos)
    }

    fn mark_reminder_sent(&self, id: &str, sent_at: Timestamp) -> RepoResult<Todo> {
        let mut todo = self.get(id)?.ok_or_else(|| RepoError::NotFound {
            kind: Todo::KIND,
            id: id.to_string(),
        })?;
        let expected = todo.meta().version;
        todo.remind_sent_at = Some(sent_at);
        todo.meta.version += 1;
        todo.meta.updated_at = next_stamp(todo.meta.updated_at, sent_at);
        self.update_versioned(&todo, expected)?;
        Ok(todo)
    }
}
