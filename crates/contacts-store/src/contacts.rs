//! CRUD for the relational `contacts` table (server side).
//!
//! Ids are SQLite row ids; they leave this module as decimal strings inside
//! [`Contact::id`].

use chrono::{DateTime, Utc};
use rusqlite::params;

use contacts_shared::{Contact, ContactId, ContactInput};

use crate::database::Database;
use crate::error::{Result, StoreError};

const SELECT_COLUMNS: &str = "SELECT id, name, email, phone, created_at, updated_at FROM contacts";

impl Database {
    /// Insert a new contact, stamping both timestamps with `now`.
    pub fn insert_contact(&self, input: &ContactInput, now: DateTime<Utc>) -> Result<Contact> {
        self.conn().execute(
            "INSERT INTO contacts (name, email, phone, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![input.name, input.email, input.phone, now.to_rfc3339()],
        )?;
        let id = self.conn().last_insert_rowid();
        self.get_contact(id)
    }

    pub fn get_contact(&self, id: i64) -> Result<Contact> {
        self.conn()
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                params![id],
                row_to_contact,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// All contacts, ordered by name.
    pub fn list_contacts(&self) -> Result<Vec<Contact>> {
        let mut stmt = self
            .conn()
            .prepare(&format!("{SELECT_COLUMNS} ORDER BY name COLLATE NOCASE ASC, id ASC"))?;
        let rows = stmt.query_map([], row_to_contact)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Overwrite the editable fields of an existing contact.
    ///
    /// `updated_at` never moves backwards, even if the wall clock does.
    pub fn update_contact(
        &self,
        id: i64,
        input: &ContactInput,
        now: DateTime<Utc>,
    ) -> Result<Contact> {
        let existing = self.get_contact(id)?;
        let updated_at = match existing.updated_at {
            Some(prior) if prior > now => prior,
            _ => now,
        };

        self.conn().execute(
            "UPDATE contacts SET name = ?2, email = ?3, phone = ?4, updated_at = ?5
             WHERE id = ?1",
            params![id, input.name, input.email, input.phone, updated_at.to_rfc3339()],
        )?;
        self.get_contact(id)
    }

    /// Delete a contact. Returns `true` if a row was deleted.
    pub fn delete_contact(&self, id: i64) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM contacts WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }
}

fn row_to_contact(row: &rusqlite::Row<'_>) -> rusqlite::Result<Contact> {
    let id: i64 = row.get(0)?;
    let created_str: String = row.get(4)?;
    let updated_str: String = row.get(5)?;

    Ok(Contact {
        id: ContactId(id.to_string()),
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        created_at: Some(parse_timestamp(4, &created_str)?),
        updated_at: Some(parse_timestamp(5, &updated_str)?),
    })
}

/// Parse an RFC-3339 column value, reporting failures against `idx`.
pub(crate) fn parse_timestamp(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn ada() -> ContactInput {
        ContactInput::new("Ada", "ada@x.com", "123")
    }

    #[test]
    fn insert_assigns_sequential_ids_and_timestamps() {
        let db = db();
        let now = Utc::now();
        let first = db.insert_contact(&ada(), now).unwrap();
        let second = db
            .insert_contact(&ContactInput::new("Bob", "bob@x.com", "456"), now)
            .unwrap();

        assert_eq!(first.id.as_str(), "1");
        assert_eq!(second.id.as_str(), "2");
        assert_eq!(first.created_at, first.updated_at);
        assert!(first.created_at.is_some());
    }

    #[test]
    fn get_missing_is_not_found() {
        assert!(matches!(db().get_contact(99), Err(StoreError::NotFound)));
    }

    #[test]
    fn list_is_ordered_by_name() {
        let db = db();
        let now = Utc::now();
        db.insert_contact(&ContactInput::new("zed", "z@x.com", "1"), now)
            .unwrap();
        db.insert_contact(&ContactInput::new("Amy", "a@x.com", "2"), now)
            .unwrap();

        let names: Vec<_> = db
            .list_contacts()
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, ["Amy", "zed"]);
    }

    #[test]
    fn update_refreshes_updated_at_and_keeps_created_at() {
        let db = db();
        let t0 = Utc::now();
        let created = db.insert_contact(&ada(), t0).unwrap();
        let id: i64 = created.id.as_str().parse().unwrap();

        let t1 = t0 + Duration::seconds(5);
        let updated = db
            .update_contact(id, &ContactInput::new("Ada L.", "ada@x.com", "999"), t1)
            .unwrap();

        assert_eq!(updated.name, "Ada L.");
        assert_eq!(updated.phone, "999");
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[test]
    fn update_never_moves_updated_at_backwards() {
        let db = db();
        let t0 = Utc::now();
        let created = db.insert_contact(&ada(), t0).unwrap();
        let id: i64 = created.id.as_str().parse().unwrap();

        let updated = db
            .update_contact(id, &ada(), t0 - Duration::hours(1))
            .unwrap();
        assert_eq!(updated.updated_at, created.updated_at);
    }

    #[test]
    fn update_missing_is_not_found() {
        let result = db().update_contact(5, &ada(), Utc::now());
        assert!(matches!(result, Err(StoreError::NotFound)));
    }

    #[test]
    fn delete_reports_whether_a_row_went_away() {
        let db = db();
        let created = db.insert_contact(&ada(), Utc::now()).unwrap();
        let id: i64 = created.id.as_str().parse().unwrap();

        assert!(db.delete_contact(id).unwrap());
        assert!(!db.delete_contact(id).unwrap());
    }
}
