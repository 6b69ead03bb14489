//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Repository writes enforce `Versioned::validate()` before persistence.
//! - Versioned writes are compare-and-swap on the stored `version`.
//! - Repository APIs return semantic errors (`NotFound`, `VersionConflict`)
//!   in addition to DB transport errors.

pub mod note_repo;
pub mod resource_repo;
pub mod share_repo;
pub mod todo_repo;
pub mod user_repo;
