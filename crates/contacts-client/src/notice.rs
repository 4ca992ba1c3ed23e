//! User-facing sync notices, delivered over a broadcast channel.

use serde::Serialize;
use tokio::sync::broadcast;

use contacts_shared::ContactId;

use crate::error::ApiError;
use crate::queue::OperationKind;

const NOTICE_CAPACITY: usize = 64;

/// Error class carried by a [`SyncNotice::RetryLater`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorClass {
    Validation,
    NotFound,
    Connectivity,
    Server,
}

impl From<&ApiError> for ErrorClass {
    fn from(error: &ApiError) -> Self {
        match error {
            ApiError::Validation(_) => ErrorClass::Validation,
            ApiError::NotFound(_) => ErrorClass::NotFound,
            ApiError::Connectivity(_) => ErrorClass::Connectivity,
            ApiError::Server(_) => ErrorClass::Server,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncNotice {
    Connectivity {
        online: bool,
    },
    Queued {
        kind: OperationKind,
        target: ContactId,
    },
    Synced {
        replayed: usize,
    },
    /// A drain stopped at its head. `terminal` means replaying the same
    /// entry again will fail the same way.
    RetryLater {
        class: ErrorClass,
        terminal: bool,
        message: String,
    },
    Refreshed {
        count: usize,
    },
    /// The head of the queue was dropped by the user.
    Discarded {
        kind: OperationKind,
        target: ContactId,
    },
}

impl SyncNotice {
    /// One-line text for display.
    pub fn message(&self) -> String {
        match self {
            SyncNotice::Connectivity { online: true } => "Back online.".to_string(),
            SyncNotice::Connectivity { online: false } => {
                "You are offline. Changes will be saved locally.".to_string()
            }
            SyncNotice::Queued { kind, target } => {
                format!("Saved offline: {kind} {target} will sync when back online.")
            }
            SyncNotice::Synced { replayed } => {
                format!("Synced {replayed} offline change(s).")
            }
            SyncNotice::RetryLater {
                terminal: true,
                message,
                ..
            } => format!("Sync blocked: {message}. Use 'discard' to drop the change."),
            SyncNotice::RetryLater { class, message, .. } => {
                format!("Sync paused ({class:?}): {message}. Will retry when back online.")
            }
            SyncNotice::Refreshed { count } => format!("Refreshed {count} contact(s)."),
            SyncNotice::Discarded { kind, target } => {
                format!("Discarded pending {kind} of {target}.")
            }
        }
    }
}

/// Fan-out of [`SyncNotice`]s. Emitting with no subscribers is not an error.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<SyncNotice>,
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(NOTICE_CAPACITY);
        Self { tx }
    }

    pub fn emit(&self, notice: SyncNotice) {
        tracing::debug!(?notice, "Sync notice");
        // Err only means nobody is listening.
        let _ = self.tx.send(notice);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncNotice> {
        self.tx.subscribe()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}
