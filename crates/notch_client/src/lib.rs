//! Typed client for the notch API.
//!
//! # Responsibility
//! - Own the credential lifecycle through an explicit `Session`.
//! - Send typed requests over a pluggable `Transport`.
//! - Decode envelopes, classify errors and page through listings.

pub mod client;
pub mod config;
pub mod error;
pub mod pager;
pub mod session;
pub mod transport;

pub use client::NotchClient;
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use notch_core::api::ErrorKind;
pub use pager::{Listing, MAX_PAGE_SIZE};
pub use session::{Session, SessionStore, StoreError, TOKEN_KEY};
#[cfg(feature = "http")]
pub use transport::HttpTransport;
pub use transport::{LocalTransport, Transport};
