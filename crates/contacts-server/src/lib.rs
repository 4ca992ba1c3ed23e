//! # contacts-server
//!
//! REST API for the contact list manager.
//!
//! - **CRUD** over `/api/contacts` (axum), returning the canonical record on
//!   every write
//! - **Two interchangeable backends**: a relational SQLite table and a
//!   document collection on disk, selected at startup
//! - **Health check** used by clients to detect connectivity
//! - Optional **static frontend** serving with an `index.html` fallback

pub mod api;
pub mod config;
pub mod error;
pub mod repository;
