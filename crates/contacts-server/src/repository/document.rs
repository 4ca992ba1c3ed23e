//! Document backend: one JSON document per contact inside a collection
//! directory.
//!
//! Document ids are random 32-char hex tokens. Incoming ids are checked
//! against a strict charset before they are ever joined onto a path, so a
//! crafted id cannot escape the collection directory.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use contacts_shared::filter::sort_by_name;
use contacts_shared::{Contact, ContactId, ContactInput};

use super::ContactRepository;
use crate::error::ServerError;

const DOCUMENT_EXT: &str = "json";

#[derive(Debug)]
pub struct DocumentRepository {
    base_path: PathBuf,
    /// Serializes read-modify-write cycles on documents.
    write_lock: Mutex<()>,
}

impl DocumentRepository {
    pub async fn open(base_path: PathBuf) -> Result<Self, ServerError> {
        fs::create_dir_all(&base_path).await.map_err(|e| {
            ServerError::Storage(format!(
                "Failed to create collection directory '{}': {}",
                base_path.display(),
                e
            ))
        })?;

        info!(path = %base_path.display(), "Document collection initialized");

        Ok(Self {
            base_path,
            write_lock: Mutex::new(()),
        })
    }

    /// Path of the document for `id`, or `None` if `id` is not a legal
    /// document id.
    fn document_path(&self, id: &str) -> Option<PathBuf> {
        let legal = !id.is_empty()
            && id.len() <= 64
            && id
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        legal.then(|| self.base_path.join(format!("{id}.{DOCUMENT_EXT}")))
    }

    async fn read_document(&self, id: &str) -> Result<Contact, ServerError> {
        let path = self
            .document_path(id)
            .ok_or_else(|| ServerError::NotFound(id.to_string()))?;

        let data = match fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ServerError::NotFound(id.to_string()));
            }
            Err(e) => {
                return Err(ServerError::Storage(format!(
                    "Failed to read document {id}: {e}"
                )))
            }
        };

        serde_json::from_slice(&data)
            .map_err(|e| ServerError::Storage(format!("Corrupt document {id}: {e}")))
    }

    /// Write through a temporary file and rename, so readers never see a
    /// half-written document.
    async fn write_document(&self, contact: &Contact) -> Result<(), ServerError> {
        let id = contact.id.as_str();
        let path = self
            .document_path(id)
            .ok_or_else(|| ServerError::Internal(format!("Illegal document id {id}")))?;
        let tmp_path = self.base_path.join(format!(".{id}.tmp"));

        let data = serde_json::to_vec_pretty(contact)
            .map_err(|e| ServerError::Internal(format!("Failed to encode document {id}: {e}")))?;

        fs::write(&tmp_path, &data)
            .await
            .map_err(|e| ServerError::Storage(format!("Failed to write document {id}: {e}")))?;
        fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| ServerError::Storage(format!("Failed to commit document {id}: {e}")))?;

        debug!(id = %id, size = data.len(), "Stored document");
        Ok(())
    }
}

#[async_trait]
impl ContactRepository for DocumentRepository {
    fn backend(&self) -> &'static str {
        "document"
    }

    async fn list(&self) -> Result<Vec<Contact>, ServerError> {
        let mut contacts = Vec::new();
        let mut entries = fs::read_dir(&self.base_path)
            .await
            .map_err(|e| ServerError::Storage(format!("Failed to list collection: {e}")))?;

        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            ServerError::Storage(format!("Failed to read directory entry: {e}"))
        })? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(DOCUMENT_EXT) {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match self.read_document(id).await {
                Ok(contact) => contacts.push(contact),
                // Deleted between read_dir and read.
                Err(ServerError::NotFound(_)) => {}
                Err(e) => warn!(id = %id, error = %e, "Skipping unreadable document"),
            }
        }

        sort_by_name(&mut contacts);
        Ok(contacts)
    }

    async fn get(&self, id: &str) -> Result<Contact, ServerError> {
        self.read_document(id).await
    }

    async fn create(&self, input: &ContactInput) -> Result<Contact, ServerError> {
        let _guard = self.write_lock.lock().await;

        let now = Utc::now();
        let contact = Contact {
            id: ContactId(Uuid::new_v4().simple().to_string()),
            name: input.name.clone(),
            email: input.email.clone(),
            phone: input.phone.clone(),
            created_at: Some(now),
            updated_at: Some(now),
        };
        self.write_document(&contact).await?;
        Ok(contact)
    }

    async fn update(&self, id: &str, input: &ContactInput) -> Result<Contact, ServerError> {
        let _guard = self.write_lock.lock().await;

        let existing = self.read_document(id).await?;
        let now = Utc::now();
        let updated_at = match existing.updated_at {
            Some(prior) if prior > now => prior,
            _ => now,
        };

        let contact = Contact {
            updated_at: Some(updated_at),
            ..existing.with_input(input)
        };
        self.write_document(&contact).await?;
        Ok(contact)
    }

    async fn delete(&self, id: &str) -> Result<(), ServerError> {
        let _guard = self.write_lock.lock().await;

        let path = self
            .document_path(id)
            .ok_or_else(|| ServerError::NotFound(id.to_string()))?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(id = %id, "Deleted document");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ServerError::NotFound(id.to_string()))
            }
            Err(e) => Err(ServerError::Storage(format!(
                "Failed to delete document {id}: {e}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn test_repo() -> (DocumentRepository, TempDir) {
        let dir = TempDir::new().unwrap();
        let repo = DocumentRepository::open(dir.path().to_path_buf())
            .await
            .unwrap();
        (repo, dir)
    }

    #[tokio::test]
    async fn test_ids_are_hex_tokens() {
        let (repo, _dir) = test_repo().await;
        let contact = repo
            .create(&ContactInput::new("Ada", "ada@x.com", "123"))
            .await
            .unwrap();
        assert_eq!(contact.id.as_str().len(), 32);
        assert!(contact.id.as_str().bytes().all(|b| b.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn test_traversal_ids_rejected() {
        let (repo, _dir) = test_repo().await;
        assert!(repo.document_path("../secret").is_none());
        assert!(repo.document_path("a/b").is_none());
        assert!(repo.document_path("abc_DEF-123").is_some());
    }

    #[tokio::test]
    async fn test_list_ignores_foreign_files() {
        let (repo, dir) = test_repo().await;
        repo.create(&ContactInput::new("Ada", "ada@x.com", "123"))
            .await
            .unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"hello").unwrap();
        std::fs::write(dir.path().join("broken.json"), b"{not json").unwrap();

        let contacts = repo.list().await.unwrap();
        assert_eq!(contacts.len(), 1);
    }

    #[tokio::test]
    async fn test_documents_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let created = {
            let repo = DocumentRepository::open(dir.path().to_path_buf())
                .await
                .unwrap();
            repo.create(&ContactInput::new("Ada", "ada@x.com", "123"))
                .await
                .unwrap()
        };

        let repo = DocumentRepository::open(dir.path().to_path_buf())
            .await
            .unwrap();
        assert_eq!(repo.get(created.id.as_str()).await.unwrap(), created);
    }
}
