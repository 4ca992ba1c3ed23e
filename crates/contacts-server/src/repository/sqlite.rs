//! Relational backend: the `contacts` table of a SQLite file.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use contacts_shared::{Contact, ContactInput};
use contacts_store::{Database, StoreError};

use super::ContactRepository;
use crate::error::ServerError;

pub struct SqliteRepository {
    db: Mutex<Database>,
}

impl SqliteRepository {
    pub fn open(path: &Path) -> Result<Self, ServerError> {
        let db = Database::open_at(path)?;
        Ok(Self { db: Mutex::new(db) })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Database>, ServerError> {
        self.db
            .lock()
            .map_err(|e| ServerError::Internal(format!("Lock poisoned: {e}")))
    }
}

/// Row ids are positive integers; anything else cannot name a row.
fn parse_id(id: &str) -> Result<i64, ServerError> {
    id.parse::<i64>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| ServerError::NotFound(id.to_string()))
}

fn store_error(id: &str) -> impl FnOnce(StoreError) -> ServerError + '_ {
    move |e| match e {
        StoreError::NotFound => ServerError::NotFound(id.to_string()),
        other => ServerError::from(other),
    }
}

#[async_trait]
impl ContactRepository for SqliteRepository {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn list(&self) -> Result<Vec<Contact>, ServerError> {
        Ok(self.lock()?.list_contacts()?)
    }

    async fn get(&self, id: &str) -> Result<Contact, ServerError> {
        let row_id = parse_id(id)?;
        self.lock()?.get_contact(row_id).map_err(store_error(id))
    }

    async fn create(&self, input: &ContactInput) -> Result<Contact, ServerError> {
        Ok(self.lock()?.insert_contact(input, Utc::now())?)
    }

    async fn update(&self, id: &str, input: &ContactInput) -> Result<Contact, ServerError> {
        let row_id = parse_id(id)?;
        self.lock()?
            .update_contact(row_id, input, Utc::now())
            .map_err(store_error(id))
    }

    async fn delete(&self, id: &str) -> Result<(), ServerError> {
        let row_id = parse_id(id)?;
        if self.lock()?.delete_contact(row_id)? {
            Ok(())
        } else {
            Err(ServerError::NotFound(id.to_string()))
        }
    }
}
