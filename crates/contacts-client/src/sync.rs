//! Sync Controller.
//!
//! Owns the pending queue and the temporary-to-canonical id remap table
//! behind a single async mutex. A drain holds that mutex from the first
//! `peek` until it stops, so drains never overlap and the write path cannot
//! slip an operation in between two replays.
//!
//! Drain policy: replay the head, dequeue it only on remote success, stop at
//! the first failure and leave everything from the failed head onward
//! queued in its original order.
//!
//! A terminal failure (rejected payload, missing target) blocks the queue:
//! later drains return without calling the server until the head is removed
//! with [`SyncController::discard_head`].

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{watch, Mutex, MutexGuard};
use tokio::task::JoinHandle;

use contacts_shared::{Contact, ContactId};
use contacts_store::StoreError;

use crate::error::ApiError;
use crate::local::LocalContactStore;
use crate::notice::{Notifier, SyncNotice};
use crate::queue::{PendingOperation, PendingQueue};
use crate::remote::RemoteContactApi;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Draining,
}

/// Outcome of one drain attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub replayed: usize,
    pub remaining: usize,
    pub failure: Option<ApiError>,
    /// The local store was reloaded from the server after the drain.
    pub refreshed: bool,
}

impl DrainReport {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none() && self.remaining == 0
    }
}

/// State guarded by the controller lock.
#[derive(Debug, Default)]
pub(crate) struct SyncState {
    pub(crate) queue: PendingQueue,
    remapped: HashMap<ContactId, ContactId>,
    /// Terminal failure of the current head, if any.
    blocked: Option<ApiError>,
}

impl SyncState {
    /// The id to use against the server for `id`.
    pub(crate) fn resolve(&self, id: &ContactId) -> ContactId {
        self.remapped.get(id).cloned().unwrap_or_else(|| id.clone())
    }
}

pub struct SyncController {
    remote: Arc<dyn RemoteContactApi>,
    local: Arc<dyn LocalContactStore>,
    state: Mutex<SyncState>,
    phase: watch::Sender<SyncPhase>,
    notices: Notifier,
}

impl SyncController {
    pub fn new(
        remote: Arc<dyn RemoteContactApi>,
        local: Arc<dyn LocalContactStore>,
        notices: Notifier,
    ) -> Self {
        let (phase, _rx) = watch::channel(SyncPhase::Idle);
        Self {
            remote,
            local,
            state: Mutex::new(SyncState::default()),
            phase,
            notices,
        }
    }

    pub fn phase(&self) -> SyncPhase {
        *self.phase.borrow()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<SyncPhase> {
        self.phase.subscribe()
    }

    pub fn notices(&self) -> &Notifier {
        &self.notices
    }

    /// Snapshot of the queue, head first.
    pub async fn pending(&self) -> Vec<PendingOperation> {
        self.state.lock().await.queue.iter().cloned().collect()
    }

    pub async fn pending_len(&self) -> usize {
        self.state.lock().await.queue.len()
    }

    pub(crate) fn remote(&self) -> &Arc<dyn RemoteContactApi> {
        &self.remote
    }

    pub(crate) fn local(&self) -> &Arc<dyn LocalContactStore> {
        &self.local
    }

    pub(crate) async fn lock_state(&self) -> MutexGuard<'_, SyncState> {
        self.state.lock().await
    }

    /// Replay the queue until it is empty or an operation fails.
    pub async fn drain(&self) -> DrainReport {
        let mut state = self.state.lock().await;
        self.drain_locked(&mut state).await
    }

    /// [`drain`](Self::drain) for callers already holding the state lock.
    pub(crate) async fn drain_locked(&self, state: &mut SyncState) -> DrainReport {
        if state.queue.is_empty() {
            return DrainReport::default();
        }
        if let Some(error) = &state.blocked {
            tracing::debug!(error = %error, "Queue head is blocked, not replaying");
            return DrainReport {
                remaining: state.queue.len(),
                failure: Some(error.clone()),
                ..DrainReport::default()
            };
        }

        self.phase.send_replace(SyncPhase::Draining);
        tracing::info!(pending = state.queue.len(), "Draining pending operations");

        let mut replayed = 0;
        let mut failure = None;
        while let Some(op) = state.queue.peek().cloned() {
            match self.replay(state, &op).await {
                Ok(()) => {
                    state.queue.dequeue();
                    replayed += 1;
                }
                Err(e) => {
                    log_failure(&op, &e);
                    failure = Some(e);
                    break;
                }
            }
        }

        self.phase.send_replace(SyncPhase::Idle);
        let mut report = DrainReport {
            replayed,
            remaining: state.queue.len(),
            failure,
            refreshed: false,
        };

        match &report.failure {
            None => {
                tracing::info!(replayed, "Pending operations synced");
                self.notices.emit(SyncNotice::Synced { replayed });
                report.refreshed = self.refresh_cache().await;
            }
            Some(e) => {
                if !e.is_retryable() {
                    state.blocked = Some(e.clone());
                }
                self.notices.emit(SyncNotice::RetryLater {
                    class: e.into(),
                    terminal: !e.is_retryable(),
                    message: e.to_string(),
                });
            }
        }
        report
    }

    /// Apply one queued operation remotely, then mirror the result locally.
    ///
    /// Only a remote failure is returned. Once the server has accepted the
    /// operation it must be dequeued, so local errors are logged instead.
    async fn replay(&self, state: &mut SyncState, op: &PendingOperation) -> Result<(), ApiError> {
        match op {
            PendingOperation::Create {
                temporary_id,
                payload,
            } => {
                let created = self.remote.create(payload).await?;
                tracing::info!(temporary = %temporary_id, id = %created.id, "Provisional contact created");
                let local = self.local.replace(temporary_id, &created).await;
                log_local(local, &created.id);
                state
                    .remapped
                    .insert(temporary_id.clone(), created.id.clone());
            }
            PendingOperation::Update { target, payload } => {
                let resolved = state.resolve(target);
                let updated = self.remote.update(&resolved, payload).await?;
                let local = if resolved != *target {
                    self.local.replace(target, &updated).await
                } else {
                    self.local.put(&updated).await
                };
                log_local(local, &updated.id);
            }
            PendingOperation::Delete { target } => {
                let resolved = state.resolve(target);
                self.remote.delete(&resolved).await?;
                let mut local = self.local.delete(target).await.map(|_| ());
                if resolved != *target && local.is_ok() {
                    local = self.local.delete(&resolved).await.map(|_| ());
                }
                log_local(local, &resolved);
            }
        }
        Ok(())
    }

    /// Replace the local store with the server's list. Never fails; returns
    /// whether the local store now mirrors the server.
    async fn refresh_cache(&self) -> bool {
        let contacts = match self.remote.list().await {
            Ok(contacts) => contacts,
            Err(e) => {
                tracing::warn!(error = %e, "Post-sync refresh failed");
                return false;
            }
        };
        match self.local.replace_all(&contacts).await {
            Ok(()) => {
                self.notices.emit(SyncNotice::Refreshed {
                    count: contacts.len(),
                });
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to store refreshed contacts");
                false
            }
        }
    }

    /// The terminal failure holding up the queue, if any.
    pub async fn blocked(&self) -> Option<ApiError> {
        self.state.lock().await.blocked.clone()
    }

    /// Remove the head of the queue without replaying it and undo its local
    /// effect, unblocking the queue.
    ///
    /// A discarded create drops its provisional record. For an update or
    /// delete, `restore_from_server` resets the local entry to the server's
    /// copy, or removes it when the server has none; otherwise the local
    /// entry is left until the next refresh.
    pub async fn discard_head(
        &self,
        restore_from_server: bool,
    ) -> Result<Option<PendingOperation>, StoreError> {
        let mut state = self.state.lock().await;
        let Some(op) = state.queue.peek().cloned() else {
            return Ok(None);
        };

        match &op {
            PendingOperation::Create { temporary_id, .. } => {
                self.local.delete(temporary_id).await?;
            }
            PendingOperation::Update { target, .. } | PendingOperation::Delete { target } => {
                if restore_from_server {
                    self.restore_entry(&state, target).await?;
                }
            }
        }

        state.queue.dequeue();
        state.blocked = None;
        tracing::info!(kind = %op.kind(), target = %op.target(), "Pending operation discarded");
        self.notices.emit(SyncNotice::Discarded {
            kind: op.kind(),
            target: op.target().clone(),
        });
        Ok(Some(op))
    }

    async fn restore_entry(&self, state: &SyncState, target: &ContactId) -> Result<(), StoreError> {
        let resolved = state.resolve(target);
        if resolved.is_temporary() {
            return Ok(());
        }
        match self.remote.get(&resolved).await {
            Ok(contact) => {
                if resolved != *target {
                    self.local.delete(target).await?;
                }
                self.local.put(&contact).await
            }
            Err(ApiError::NotFound(_)) => {
                self.local.delete(target).await?;
                self.local.delete(&resolved).await.map(|_| ())
            }
            Err(e) => {
                tracing::warn!(%target, error = %e, "Could not restore from server, keeping local copy");
                Ok(())
            }
        }
    }

    /// Re-queue a create for every provisional record in the local store
    /// that no queued operation owns. The queue is not persisted, so this
    /// restores pending creates after a restart.
    pub async fn recover_provisional(&self) -> Result<usize, StoreError> {
        let mut state = self.state.lock().await;
        let orphans: Vec<Contact> = self
            .local
            .get_all()
            .await?
            .into_iter()
            .filter(|c| c.is_provisional() && !state.queue.owns_provisional(&c.id))
            .collect();

        for contact in &orphans {
            tracing::info!(id = %contact.id, "Recovered provisional contact");
            state.queue.enqueue(PendingOperation::Create {
                temporary_id: contact.id.clone(),
                payload: contact.input(),
            });
        }
        Ok(orphans.len())
    }

    /// React to connectivity transitions until the signal closes: announce
    /// each change and drain whenever the signal turns online.
    pub async fn run(self: Arc<Self>, mut online: watch::Receiver<bool>) {
        if *online.borrow_and_update() {
            self.drain().await;
        }
        while online.changed().await.is_ok() {
            let now_online = *online.borrow_and_update();
            self.notices
                .emit(SyncNotice::Connectivity { online: now_online });
            if now_online {
                self.drain().await;
            }
        }
        tracing::debug!("Connectivity signal closed, sync task exiting");
    }

    pub fn spawn(self: &Arc<Self>, online: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(Arc::clone(self).run(online))
    }
}

fn log_failure(op: &PendingOperation, error: &ApiError) {
    let kind = op.kind();
    let target = op.target();
    match error {
        ApiError::Connectivity(_) => {
            tracing::warn!(%kind, %target, error = %error, "Replay deferred, server unreachable")
        }
        ApiError::Server(_) => {
            tracing::error!(%kind, %target, error = %error, "Replay failed on server")
        }
        _ => tracing::warn!(%kind, %target, error = %error, "Replay rejected, drain blocked"),
    }
}

fn log_local(result: Result<(), StoreError>, id: &ContactId) {
    if let Err(e) = result {
        tracing::error!(%id, error = %e, "Local store update after replay failed");
    }
}
