//! # contacts-store
//!
//! SQLite persistence for the contact list manager.
//!
//! One schema serves both sides of the system:
//! - `contacts`: the relational table behind the API server, keyed by an
//!   autoincrement row id that becomes the public contact id.
//! - `contact_cache`: the client's Local Durable Store, keyed by contact id
//!   (server-assigned or temporary) and surviving restarts.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` and provides typed helpers for each table.

pub mod cache;
pub mod contacts;
pub mod database;
pub mod migrations;

mod error;

pub use database::Database;
pub use error::{Result, StoreError};
