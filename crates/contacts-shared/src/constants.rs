/// Application name
pub const APP_NAME: &str = "Contact List Manager";

/// Prefix reserved for client-generated ids of records not yet synced.
/// Server ids never start with it.
pub const TEMP_ID_PREFIX: &str = "tmp-";

/// Path prefix under which the REST API is mounted
pub const API_BASE_PATH: &str = "/api";

/// Collection path, relative to [`API_BASE_PATH`]
pub const CONTACTS_PATH: &str = "/contacts";

/// Health check path, relative to [`API_BASE_PATH`]
pub const HEALTH_PATH: &str = "/health";

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 3000;

/// Default timeout for a single remote call, in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Default interval between connectivity probes, in seconds
pub const DEFAULT_PROBE_INTERVAL_SECS: u64 = 5;
