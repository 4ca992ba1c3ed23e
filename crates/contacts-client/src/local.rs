//! Local Durable Store used by the client.
//!
//! The trait is what the sync controller and service talk to; [`SqliteCache`]
//! is the production implementation over `contacts_store::Database`.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use contacts_shared::{Contact, ContactId};
use contacts_store::{Database, StoreError};

type StoreResult<T> = Result<T, StoreError>;

/// Key-value store of contact records by id, surviving restarts.
#[async_trait]
pub trait LocalContactStore: Send + Sync {
    async fn get(&self, id: &ContactId) -> StoreResult<Option<Contact>>;
    async fn put(&self, contact: &Contact) -> StoreResult<()>;
    /// Returns `true` if a record was removed.
    async fn delete(&self, id: &ContactId) -> StoreResult<bool>;
    async fn get_all(&self) -> StoreResult<Vec<Contact>>;
    async fn clear(&self) -> StoreResult<()>;

    /// Atomically swap the record under `old_id` for `contact`.
    async fn replace(&self, old_id: &ContactId, contact: &Contact) -> StoreResult<()>;

    /// Atomically replace the whole store with `contacts`.
    async fn replace_all(&self, contacts: &[Contact]) -> StoreResult<()>;
}

/// SQLite-backed [`LocalContactStore`].
pub struct SqliteCache {
    db: Mutex<Database>,
}

impl SqliteCache {
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    pub fn open(path: &Path) -> StoreResult<Self> {
        Ok(Self::new(Database::open_at(path)?))
    }

    pub fn in_memory() -> StoreResult<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Database>> {
        self.db.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

#[async_trait]
impl LocalContactStore for SqliteCache {
    async fn get(&self, id: &ContactId) -> StoreResult<Option<Contact>> {
        self.lock()?.cache_get(id)
    }

    async fn put(&self, contact: &Contact) -> StoreResult<()> {
        self.lock()?.cache_put(contact)
    }

    async fn delete(&self, id: &ContactId) -> StoreResult<bool> {
        self.lock()?.cache_delete(id)
    }

    async fn get_all(&self) -> StoreResult<Vec<Contact>> {
        self.lock()?.cache_all()
    }

    async fn clear(&self) -> StoreResult<()> {
        self.lock()?.cache_clear()
    }

    async fn replace(&self, old_id: &ContactId, contact: &Contact) -> StoreResult<()> {
        self.lock()?.cache_replace(old_id, contact)
    }

    async fn replace_all(&self, contacts: &[Contact]) -> StoreResult<()> {
        self.lock()?.cache_replace_all(contacts)
    }
}
