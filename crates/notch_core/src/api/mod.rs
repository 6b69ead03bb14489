//! JSON-over-HTTP contract.
//!
//! # Responsibility
//! - Define the wire error taxonomy and response envelopes.
//! - Route requests onto services (the reference authority).

pub mod envelope;
pub mod error;
pub mod router;

pub use error::{status_text, ErrorBody, ErrorKind};
pub use router::{ApiRequest, ApiResponse, Method, Router};
