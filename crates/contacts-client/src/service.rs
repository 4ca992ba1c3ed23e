//! Contact service: the operations the view layer calls.
//!
//! Writes go straight to the server when the connectivity signal is online
//! and nothing is queued ahead of them. Otherwise, or when the server cannot
//! be reached, they are applied to the local store and queued for the sync
//! controller. Validation and not-found errors are never queued.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use contacts_shared::filter::{filter_contacts, sort_by_name};
use contacts_shared::{Contact, ContactId, ContactInput};
use contacts_store::{Database, StoreError};

use crate::config::ClientConfig;
use crate::connectivity::{spawn_probe, Connectivity};
use crate::error::{ApiError, ClientError, Result};
use crate::local::{LocalContactStore, SqliteCache};
use crate::notice::{Notifier, SyncNotice};
use crate::queue::{OperationKind, PendingOperation};
use crate::remote::{HttpContactApi, RemoteContactApi};
use crate::sync::{DrainReport, SyncController, SyncState};

/// File name of the cache under the platform data directory.
pub const CACHE_FILE_NAME: &str = "contacts-cache.db";

/// Whether a write reached the server or is waiting in the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome<T> {
    Synced(T),
    Queued(T),
}

impl<T> WriteOutcome<T> {
    pub fn is_queued(&self) -> bool {
        matches!(self, WriteOutcome::Queued(_))
    }

    pub fn value(&self) -> &T {
        match self {
            WriteOutcome::Synced(v) | WriteOutcome::Queued(v) => v,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            WriteOutcome::Synced(v) | WriteOutcome::Queued(v) => v,
        }
    }
}

pub struct ContactService {
    controller: Arc<SyncController>,
    connectivity: Arc<Connectivity>,
}

impl ContactService {
    pub fn new(controller: Arc<SyncController>, connectivity: Arc<Connectivity>) -> Self {
        Self {
            controller,
            connectivity,
        }
    }

    /// Wire up the HTTP remote and the SQLite cache from configuration.
    ///
    /// The signal starts offline; the first probe flips it.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let remote = Arc::new(HttpContactApi::new(&config.api_url, config.request_timeout)?);
        let db = match &config.cache_path {
            Some(path) => Database::open_at(path)?,
            None => Database::open_default(CACHE_FILE_NAME)?,
        };
        if let Some(path) = db.path() {
            tracing::info!(path = %path.display(), "Local cache opened");
        }
        let local = Arc::new(SqliteCache::new(db));
        let controller = Arc::new(SyncController::new(remote, local, Notifier::new()));
        Ok(Self::new(controller, Arc::new(Connectivity::new(false))))
    }

    pub fn controller(&self) -> &Arc<SyncController> {
        &self.controller
    }

    pub fn connectivity(&self) -> &Arc<Connectivity> {
        &self.connectivity
    }

    pub fn notices(&self) -> broadcast::Receiver<SyncNotice> {
        self.controller.notices().subscribe()
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    /// User switch for offline mode.
    pub fn set_offline(&self, offline: bool) {
        self.connectivity.set_forced_offline(offline);
    }

    pub async fn pending(&self) -> Vec<PendingOperation> {
        self.controller.pending().await
    }

    /// Drop the head of the queue (typically one the server rejected),
    /// restore its local entry, then replay whatever follows it.
    pub async fn discard(&self) -> Result<Option<PendingOperation>> {
        let online = self.is_online();
        let discarded = self.controller.discard_head(online).await?;
        if discarded.is_some() && online {
            self.controller.drain().await;
        }
        Ok(discarded)
    }

    /// Start the sync task and the connectivity probe.
    pub fn start(&self, probe_interval: Duration) -> Vec<JoinHandle<()>> {
        vec![
            self.controller.spawn(self.connectivity.subscribe()),
            spawn_probe(
                Arc::clone(self.controller.remote()),
                Arc::clone(&self.connectivity),
                probe_interval,
            ),
        ]
    }

    /// Explicit sync request.
    pub async fn sync(&self) -> DrainReport {
        if !self.is_online() {
            return DrainReport {
                replayed: 0,
                remaining: self.controller.pending_len().await,
                failure: Some(ApiError::Connectivity("offline".into())),
                refreshed: false,
            };
        }
        self.controller.drain().await
    }

    pub async fn create(&self, input: ContactInput) -> Result<WriteOutcome<Contact>> {
        input.validate()?;
        let mut state = self.controller.lock_state().await;

        if self.online_and_drained(&mut state).await {
            match self.remote().create(&input).await {
                Ok(created) => {
                    log_store(self.local().put(&created).await, &created.id);
                    tracing::info!(id = %created.id, "Contact created");
                    return Ok(WriteOutcome::Synced(created));
                }
                Err(e) if e.is_retryable() => log_degraded(OperationKind::Create, &e),
                Err(e) => return Err(ClientError::from_api(e, None)),
            }
        }

        let contact = Contact::provisional(ContactId::temporary(), &input);
        self.local().put(&contact).await?;
        state.queue.enqueue(PendingOperation::Create {
            temporary_id: contact.id.clone(),
            payload: input,
        });
        self.announce_queued(OperationKind::Create, &contact.id);
        Ok(WriteOutcome::Queued(contact))
    }

    pub async fn update(&self, id: &ContactId, input: ContactInput) -> Result<WriteOutcome<Contact>> {
        input.validate()?;
        let mut state = self.controller.lock_state().await;

        if self.online_and_drained(&mut state).await {
            let resolved = state.resolve(id);
            if !resolved.is_temporary() {
                match self.remote().update(&resolved, &input).await {
                    Ok(updated) => {
                        let stored = if resolved != *id {
                            self.local().replace(id, &updated).await
                        } else {
                            self.local().put(&updated).await
                        };
                        log_store(stored, &updated.id);
                        tracing::info!(id = %updated.id, "Contact updated");
                        return Ok(WriteOutcome::Synced(updated));
                    }
                    Err(e) if e.is_retryable() => log_degraded(OperationKind::Update, &e),
                    Err(e) => return Err(ClientError::from_api(e, Some(id))),
                }
            }
        }

        let target = state.resolve(id);
        let existing = self
            .local()
            .get(&target)
            .await?
            .ok_or_else(|| ClientError::NotFound(id.clone()))?;
        let updated = existing.with_input(&input);
        self.local().put(&updated).await?;

        // A provisional record nothing in the queue will create.
        let op = if target.is_temporary() && !state.queue.owns_provisional(&target) {
            PendingOperation::Create {
                temporary_id: target.clone(),
                payload: input,
            }
        } else {
            PendingOperation::Update {
                target: target.clone(),
                payload: input,
            }
        };
        let kind = op.kind();
        state.queue.enqueue(op);
        self.announce_queued(kind, &target);
        Ok(WriteOutcome::Queued(updated))
    }

    pub async fn delete(&self, id: &ContactId) -> Result<WriteOutcome<()>> {
        let mut state = self.controller.lock_state().await;

        if self.online_and_drained(&mut state).await {
            let resolved = state.resolve(id);
            if !resolved.is_temporary() {
                match self.remote().delete(&resolved).await {
                    Ok(()) => {
                        let mut stored = self.local().delete(id).await.map(|_| ());
                        if resolved != *id && stored.is_ok() {
                            stored = self.local().delete(&resolved).await.map(|_| ());
                        }
                        log_store(stored, &resolved);
                        tracing::info!(id = %resolved, "Contact deleted");
                        return Ok(WriteOutcome::Synced(()));
                    }
                    Err(e) if e.is_retryable() => log_degraded(OperationKind::Delete, &e),
                    Err(e) => return Err(ClientError::from_api(e, Some(id))),
                }
            }
        }

        let target = state.resolve(id);
        if !self.local().delete(&target).await? {
            return Err(ClientError::NotFound(id.clone()));
        }
        if target.is_temporary() && !state.queue.owns_provisional(&target) {
            // Never reached the server, so there is nothing to replay.
            return Ok(WriteOutcome::Synced(()));
        }
        state.queue.enqueue(PendingOperation::Delete {
            target: target.clone(),
        });
        self.announce_queued(OperationKind::Delete, &target);
        Ok(WriteOutcome::Queued(()))
    }

    /// All contacts, sorted by name.
    ///
    /// Server data when online with nothing pending (mirrored into the
    /// local store), otherwise the local snapshot with its optimistic edits.
    pub async fn list(&self) -> Result<Vec<Contact>> {
        let mut contacts = {
            let mut state = self.controller.lock_state().await;
            match self.prepare_remote(&mut state).await {
                // the drain just reloaded the local store from the server
                Some(true) => self.local().get_all().await?,
                Some(false) => match self.remote().list().await {
                    Ok(contacts) => {
                        if let Err(e) = self.local().replace_all(&contacts).await {
                            tracing::error!(error = %e, "Failed to mirror contacts locally");
                        }
                        contacts
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Listing from server failed, using local copy");
                        self.local().get_all().await?
                    }
                },
                None => self.local().get_all().await?,
            }
        };
        sort_by_name(&mut contacts);
        Ok(contacts)
    }

    /// Case-insensitive name/email filter over [`list`](Self::list).
    pub async fn search(&self, term: &str) -> Result<Vec<Contact>> {
        Ok(filter_contacts(self.list().await?, term))
    }

    /// Local lookup first, then the server when online and nothing is
    /// pending that the server does not know about yet.
    pub async fn get(&self, id: &ContactId) -> Result<Option<Contact>> {
        let state = self.controller.lock_state().await;
        let resolved = state.resolve(id);
        if let Some(contact) = self.local().get(&resolved).await? {
            return Ok(Some(contact));
        }
        if resolved.is_temporary() || !state.queue.is_empty() || !self.is_online() {
            return Ok(None);
        }
        drop(state);

        match self.remote().get(&resolved).await {
            Ok(contact) => Ok(Some(contact)),
            Err(ApiError::NotFound(_)) => Ok(None),
            Err(e) if e.is_retryable() => {
                tracing::warn!(%id, error = %e, "Remote lookup failed");
                Ok(None)
            }
            Err(e) => Err(ClientError::from_api(e, Some(id))),
        }
    }

    fn remote(&self) -> &Arc<dyn RemoteContactApi> {
        self.controller.remote()
    }

    fn local(&self) -> &Arc<dyn LocalContactStore> {
        self.controller.local()
    }

    /// Drain if needed; true when a write may go straight to the server.
    async fn online_and_drained(&self, state: &mut SyncState) -> bool {
        self.prepare_remote(state).await.is_some()
    }

    /// `Some(refreshed)` when the queue is empty and the server may be
    /// called, where `refreshed` means a drain just reloaded the local store.
    /// A blocked queue is not replayed again, so this stays `None` until its
    /// head is discarded.
    async fn prepare_remote(&self, state: &mut SyncState) -> Option<bool> {
        if !self.is_online() {
            return None;
        }
        let mut refreshed = false;
        if !state.queue.is_empty() {
            refreshed = self.controller.drain_locked(state).await.refreshed;
        }
        state.queue.is_empty().then_some(refreshed)
    }

    fn announce_queued(&self, kind: OperationKind, target: &ContactId) {
        tracing::info!(%kind, %target, "Operation queued for sync");
        self.controller.notices().emit(SyncNotice::Queued {
            kind,
            target: target.clone(),
        });
    }
}

fn log_degraded(kind: OperationKind, error: &ApiError) {
    match error {
        ApiError::Server(_) => tracing::error!(%kind, error = %error, "Server failed, saving offline"),
        _ => tracing::warn!(%kind, error = %error, "Server unreachable, saving offline"),
    }
}

fn log_store(result: std::result::Result<(), StoreError>, id: &ContactId) {
    if let Err(e) = result {
        tracing::error!(%id, error = %e, "Failed to update local store");
    }
}
