//! # contacts-client
//!
//! Offline-first client for the contact API.
//!
//! - [`remote`]: HTTP access to the server, with failures classified as
//!   validation, not-found, connectivity or server errors.
//! - [`local`]: the durable local copy of the contact list.
//! - [`queue`] and [`sync`]: writes made while offline are queued and
//!   replayed in order once the server is reachable again.
//! - [`service`]: the read/write operations the REPL in `main.rs` calls.

pub mod config;
pub mod connectivity;
pub mod error;
pub mod local;
pub mod notice;
pub mod queue;
pub mod remote;
pub mod service;
pub mod sync;
pub mod view;

#[cfg(test)]
mod testing;

pub use error::{ApiError, ClientError, Result};
pub use service::{ContactService, WriteOutcome};
