//! Pending Operation Queue.
//!
//! Writes attempted while offline are appended here and replayed strictly
//! front-to-back by the sync controller. Entries are immutable once queued:
//! the only way to change the queue is to append at the tail or remove the
//! head. The queue lives in memory only.

use std::collections::VecDeque;

use serde::Serialize;

use contacts_shared::{ContactId, ContactInput};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OperationKind::Create => "create",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// A write waiting to be replayed against the remote API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingOperation {
    /// Created offline. `temporary_id` names the provisional record in the
    /// local store that this entry owns until it is reconciled.
    Create {
        temporary_id: ContactId,
        payload: ContactInput,
    },
    Update {
        target: ContactId,
        payload: ContactInput,
    },
    Delete {
        target: ContactId,
    },
}

impl PendingOperation {
    pub fn kind(&self) -> OperationKind {
        match self {
            PendingOperation::Create { .. } => OperationKind::Create,
            PendingOperation::Update { .. } => OperationKind::Update,
            PendingOperation::Delete { .. } => OperationKind::Delete,
        }
    }

    /// The id this operation acts on (the temporary id for a create).
    pub fn target(&self) -> &ContactId {
        match self {
            PendingOperation::Create { temporary_id, .. } => temporary_id,
            PendingOperation::Update { target, .. } | PendingOperation::Delete { target } => {
                target
            }
        }
    }

    pub fn payload(&self) -> Option<&ContactInput> {
        match self {
            PendingOperation::Create { payload, .. } | PendingOperation::Update { payload, .. } => {
                Some(payload)
            }
            PendingOperation::Delete { .. } => None,
        }
    }

    pub fn temporary_id(&self) -> Option<&ContactId> {
        match self {
            PendingOperation::Create { temporary_id, .. } => Some(temporary_id),
            _ => None,
        }
    }
}

/// FIFO of [`PendingOperation`]s.
#[derive(Debug, Default)]
pub struct PendingQueue {
    entries: VecDeque<PendingOperation>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append at the tail.
    pub fn enqueue(&mut self, op: PendingOperation) {
        self.entries.push_back(op);
    }

    /// The head, without removing it.
    pub fn peek(&self) -> Option<&PendingOperation> {
        self.entries.front()
    }

    /// Remove and return the head.
    pub fn dequeue(&mut self) -> Option<PendingOperation> {
        self.entries.pop_front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingOperation> {
        self.entries.iter()
    }

    /// Whether a queued create still owns the provisional record `id`.
    pub fn owns_provisional(&self, id: &ContactId) -> bool {
        self.entries
            .iter()
            .any(|op| op.temporary_id() == Some(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str) -> ContactInput {
        ContactInput::new(name, format!("{name}@x.com"), "1")
    }

    #[test]
    fn fifo_order() {
        let mut queue = PendingQueue::new();
        queue.enqueue(PendingOperation::Delete {
            target: ContactId::from("1"),
        });
        queue.enqueue(PendingOperation::Update {
            target: ContactId::from("2"),
            payload: input("b"),
        });

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.peek().unwrap().target().as_str(), "1");
        // peek does not consume
        assert_eq!(queue.peek().unwrap().target().as_str(), "1");

        assert_eq!(queue.dequeue().unwrap().kind(), OperationKind::Delete);
        assert_eq!(queue.dequeue().unwrap().kind(), OperationKind::Update);
        assert!(queue.dequeue().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn create_exposes_its_temporary_id() {
        let temp = ContactId::temporary();
        let op = PendingOperation::Create {
            temporary_id: temp.clone(),
            payload: input("ada"),
        };

        assert_eq!(op.kind(), OperationKind::Create);
        assert_eq!(op.target(), &temp);
        assert_eq!(op.temporary_id(), Some(&temp));
        assert_eq!(op.payload().unwrap().name, "ada");

        let mut queue = PendingQueue::new();
        queue.enqueue(op);
        assert!(queue.owns_provisional(&temp));
        assert!(!queue.owns_provisional(&ContactId::temporary()));
    }

    #[test]
    fn delete_has_no_payload() {
        let op = PendingOperation::Delete {
            target: ContactId::from("9"),
        };
        assert!(op.payload().is_none());
        assert!(op.temporary_id().is_none());
    }
}
