//! The client's Local Durable Store: `contact_cache` keyed by contact id.
//!
//! Holds canonical records mirrored from the server and provisional records
//! under temporary ids. The two multi-row operations, [`Database::cache_replace`]
//! and [`Database::cache_replace_all`], run inside a single transaction.

use rusqlite::{params, Connection, OptionalExtension};

use contacts_shared::{Contact, ContactId};

use crate::contacts::parse_timestamp;
use crate::database::Database;
use crate::error::{Result, StoreError};

const SELECT_COLUMNS: &str =
    "SELECT id, name, email, phone, created_at, updated_at FROM contact_cache";

impl Database {
    pub fn cache_get(&self, id: &ContactId) -> Result<Option<Contact>> {
        self.conn()
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                params![id.as_str()],
                row_to_contact,
            )
            .optional()
            .map_err(StoreError::Sqlite)
    }

    /// Insert or overwrite a record under its own id.
    pub fn cache_put(&self, contact: &Contact) -> Result<()> {
        put(self.conn(), contact)
    }

    /// Remove a record. Returns `true` if one was present.
    pub fn cache_delete(&self, id: &ContactId) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM contact_cache WHERE id = ?1",
            params![id.as_str()],
        )?;
        Ok(affected > 0)
    }

    pub fn cache_all(&self) -> Result<Vec<Contact>> {
        let mut stmt = self.conn().prepare(&format!("{SELECT_COLUMNS} ORDER BY id ASC"))?;
        let rows = stmt.query_map([], row_to_contact)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    pub fn cache_clear(&self) -> Result<()> {
        self.conn().execute("DELETE FROM contact_cache", [])?;
        Ok(())
    }

    /// Swap the record stored under `old_id` for `contact` in one step.
    ///
    /// After commit exactly one of the two ids is present: `contact.id`.
    pub fn cache_replace(&mut self, old_id: &ContactId, contact: &Contact) -> Result<()> {
        let tx = self.conn_mut().transaction()?;
        tx.execute(
            "DELETE FROM contact_cache WHERE id = ?1",
            params![old_id.as_str()],
        )?;
        put(&tx, contact)?;
        tx.commit()?;
        Ok(())
    }

    /// Replace the whole cache with `contacts` (authoritative resync).
    pub fn cache_replace_all(&mut self, contacts: &[Contact]) -> Result<()> {
        let tx = self.conn_mut().transaction()?;
        tx.execute("DELETE FROM contact_cache", [])?;
        for contact in contacts {
            put(&tx, contact)?;
        }
        tx.commit()?;
        Ok(())
    }
}

fn put(conn: &Connection, contact: &Contact) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO contact_cache (id, name, email, phone, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            contact.id.as_str(),
            contact.name,
            contact.email,
            contact.phone,
            contact.created_at.map(|t| t.to_rfc3339()),
            contact.updated_at.map(|t| t.to_rfc3339()),
        ],
    )?;
    Ok(())
}

fn row_to_contact(row: &rusqlite::Row<'_>) -> rusqlite::Result<Contact> {
    let id: String = row.get(0)?;
    let created_str: Option<String> = row.get(4)?;
    let updated_str: Option<String> = row.get(5)?;

    Ok(Contact {
        id: ContactId(id),
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        created_at: created_str
            .map(|s| parse_timestamp(4, &s))
            .transpose()?,
        updated_at: updated_str
            .map(|s| parse_timestamp(5, &s))
            .transpose()?,
    })
}
