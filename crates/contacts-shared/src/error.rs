use thiserror::Error;

/// Presence-check failure on a contact payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Name, email, and phone are required (missing {0})")]
    MissingField(&'static str),
}
