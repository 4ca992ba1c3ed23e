//! Server configuration loaded from environment variables.
//!
//! All settings have defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use contacts_shared::constants::DEFAULT_HTTP_PORT;

/// Which persistence backend serves `/contacts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Relational table in a SQLite file.
    Sqlite,
    /// One JSON document per contact in a collection directory.
    Document,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "relational" | "sql" => Ok(Self::Sqlite),
            "document" | "documents" | "doc" => Ok(Self::Document),
            other => Err(format!("unknown storage backend: {other}")),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`, or `PORT` to change only the port.
    /// Default: `0.0.0.0:3000`
    pub http_addr: SocketAddr,

    /// Env: `CONTACTS_BACKEND` (`sqlite` | `document`)
    /// Default: `sqlite`
    pub backend: StorageBackend,

    /// SQLite file for the relational backend.
    /// Env: `DATABASE_PATH`
    /// Default: `./contacts.db`
    pub database_path: PathBuf,

    /// Collection directory for the document backend.
    /// Env: `DOCUMENT_PATH`
    /// Default: `./documents`
    pub document_path: PathBuf,

    /// Directory of static frontend files served outside `/api`.
    /// Env: `STATIC_DIR`
    /// Default: unset (no static serving).
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            backend: StorageBackend::Sqlite,
            database_path: PathBuf::from("./contacts.db"),
            document_path: PathBuf::from("./documents"),
            static_dir: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = var("HTTP_ADDR") {
            match addr.parse::<SocketAddr>() {
                Ok(parsed) => config.http_addr = parsed,
                Err(_) => tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default"),
            }
        }

        if let Some(port) = var("PORT") {
            match port.parse::<u16>() {
                Ok(port) => config.http_addr.set_port(port),
                Err(_) => tracing::warn!(value = %port, "Invalid PORT, ignoring"),
            }
        }

        if let Some(backend) = var("CONTACTS_BACKEND") {
            match backend.parse() {
                Ok(parsed) => config.backend = parsed,
                Err(e) => tracing::warn!(error = %e, "Invalid CONTACTS_BACKEND, using sqlite"),
            }
        }

        if let Some(path) = var("DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        }

        if let Some(path) = var("DOCUMENT_PATH") {
            config.document_path = PathBuf::from(path);
        }

        if let Some(dir) = var("STATIC_DIR") {
            if !dir.is_empty() {
                config.static_dir = Some(PathBuf::from(dir));
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}
