//! Core domain logic for notch.
//!
//! This crate is the single source of truth for resource lifecycle rules:
//! versioning, sharing, soft delete and restore. It also carries the
//! SQLite-backed reference authority and the JSON API router in front of it.

pub mod api;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod service;

pub use api::{ApiRequest, ApiResponse, ErrorKind, Method, Router};
pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::note::{NewNote, NewNoteGroup, Note, NoteGroup, NoteGroupPatch, NotePatch};
pub use model::resource::{now_ms, ResourceId, ResourceMeta, Timestamp, UserId, ValidationError};
pub use model::share::{IssuedShare, ShareLink, ShareRequest};
pub use model::todo::{NewTodo, NewTodoList, Todo, TodoList, TodoListPatch, TodoPatch};
pub use model::user::{LoginRequest, NewUser, Principal, User};
pub use query::{NoteFilter, QueryFilter, TodoFilter};
pub use repo::resource_repo::{RepoError, RepoResult};
pub use service::{ServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
