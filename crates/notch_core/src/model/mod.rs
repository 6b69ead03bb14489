//! Domain model for the todo and note resource families.
//!
//! # Responsibility
//! - Define the versioned shareable resource shape shared by every type.
//! - Define per-type create payloads and closed partial-update patches.
//!
//! # Invariants
//! - Every resource is identified by a stable opaque id.
//! - `version` starts at 1 and advances by exactly 1 per accepted mutation.
//! - Item deletion is a soft-delete marker, never a hard delete.

pub mod note;
pub mod patch;
pub mod resource;
pub mod share;
pub mod todo;
pub mod user;
