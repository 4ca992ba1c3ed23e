//! Connectivity signal.
//!
//! `true` means online. Subscribers only wake on transitions. The value is
//! the conjunction of the last probe result and the user's forced-offline
//! switch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::remote::RemoteContactApi;

pub struct Connectivity {
    tx: watch::Sender<bool>,
    reachable: AtomicBool,
    forced_offline: AtomicBool,
}

impl Connectivity {
    /// Start with the given reachability assumption.
    pub fn new(initially_online: bool) -> Self {
        let (tx, _rx) = watch::channel(initially_online);
        Self {
            tx,
            reachable: AtomicBool::new(initially_online),
            forced_offline: AtomicBool::new(false),
        }
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    pub fn is_forced_offline(&self) -> bool {
        self.forced_offline.load(Ordering::SeqCst)
    }

    /// Record the outcome of a reachability check.
    pub fn report_probe(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
        self.publish();
    }

    /// User override: while set, the signal stays offline whatever the
    /// probe says.
    pub fn set_forced_offline(&self, forced: bool) {
        self.forced_offline.store(forced, Ordering::SeqCst);
        self.publish();
    }

    fn publish(&self) {
        let online = self.reachable.load(Ordering::SeqCst) && !self.is_forced_offline();
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            tracing::info!(online, "Connectivity changed");
        }
    }
}

/// Poll the remote health endpoint every `interval` and feed the result
/// into `connectivity`.
pub fn spawn_probe(
    remote: Arc<dyn RemoteContactApi>,
    connectivity: Arc<Connectivity>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let reachable = match remote.ping().await {
                Ok(()) => true,
                Err(e) => {
                    tracing::debug!(error = %e, "Health probe failed");
                    false
                }
            };
            connectivity.report_probe(reachable);
        }
    })
}
