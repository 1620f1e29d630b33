//! Rust client for the username search API.
//!
//! [`ApiClient`] wraps the HTTP routes; [`relay`] turns the streaming bodies
//! into typed items; [`session`] folds a search stream into
//! [`shared_types::SearchState`].

pub mod api;
pub mod error;
pub mod relay;
pub mod session;

pub use api::ApiClient;
pub use error::{ClientError, RelayError};
