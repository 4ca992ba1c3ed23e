//! Persistence backends for the `/contacts` collection.
//!
//! Both backends implement [`ContactRepository`] with identical semantics,
//! so handlers never know which one is active.

pub mod document;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;

use contacts_shared::{Contact, ContactInput};

use crate::config::{ServerConfig, StorageBackend};
use crate::error::ServerError;

pub use document::DocumentRepository;
pub use sqlite::SqliteRepository;

/// Narrow CRUD interface over the contact collection.
///
/// Ids arrive as raw path segments; an id that cannot exist in the backend
/// is reported as [`ServerError::NotFound`].
#[async_trait]
pub trait ContactRepository: Send + Sync {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    async fn list(&self) -> Result<Vec<Contact>, ServerError>;

    async fn get(&self, id: &str) -> Result<Contact, ServerError>;

    /// Persist a new contact and return it with its id and timestamps.
    async fn create(&self, input: &ContactInput) -> Result<Contact, ServerError>;

    /// Overwrite the editable fields, refreshing `updated_at`.
    async fn update(&self, id: &str, input: &ContactInput) -> Result<Contact, ServerError>;

    async fn delete(&self, id: &str) -> Result<(), ServerError>;

    /// Cheap reachability check run once at startup.
    async fn ping(&self) -> Result<(), ServerError> {
        self.list().await.map(|_| ())
    }
}

/// Open the backend selected in `config`.
pub async fn open_repository(
    config: &ServerConfig,
) -> Result<Arc<dyn ContactRepository>, ServerError> {
    let repo: Arc<dyn ContactRepository> = match config.backend {
        StorageBackend::Sqlite => Arc::new(SqliteRepository::open(&config.database_path)?),
        StorageBackend::Document => {
            Arc::new(DocumentRepository::open(config.document_path.clone()).await?)
        }
    };

    repo.ping().await?;
    tracing::info!(backend = repo.backend(), "Connected to contact storage");

    Ok(repo)
}

#[cfg(test)]
mod tests {
    //! Contract tests run against both backends.

    use super::*;
    use tempfile::TempDir;

    async fn backends() -> (Vec<Arc<dyn ContactRepository>>, TempDir) {
        let dir = TempDir::new().unwrap();
        let sqlite: Arc<dyn ContactRepository> =
            Arc::new(SqliteRepository::open(&dir.path().join("contacts.db")).unwrap());
        let document: Arc<dyn ContactRepository> = Arc::new(
            DocumentRepository::open(dir.path().join("documents"))
                .await
                .unwrap(),
        );
        (vec![sqlite, document], dir)
    }

    fn ada() -> ContactInput {
        ContactInput::new("Ada", "ada@x.com", "123")
    }

    #[tokio::test]
    async fn create_then_get() {
        let (repos, _dir) = backends().await;
        for repo in repos {
            let created = repo.create(&ada()).await.unwrap();
            assert!(!created.id.is_temporary(), "{}", repo.backend());
            assert!(created.created_at.is_some());
            assert_eq!(created.created_at, created.updated_at);

            let fetched = repo.get(created.id.as_str()).await.unwrap();
            assert_eq!(fetched, created, "{}", repo.backend());
        }
    }

    #[tokio::test]
    async fn update_round_trip() {
        let (repos, _dir) = backends().await;
        for repo in repos {
            let created = repo.create(&ada()).await.unwrap();
            let input = ContactInput::new("Ada Lovelace", "ada@engine.org", "456");

            let updated = repo.update(created.id.as_str(), &input).await.unwrap();
            let fetched = repo.get(created.id.as_str()).await.unwrap();

            assert_eq!(fetched.name, "Ada Lovelace", "{}", repo.backend());
            assert_eq!(fetched.email, "ada@engine.org");
            assert_eq!(fetched, updated);
            assert_eq!(fetched.created_at, created.created_at);
            assert!(fetched.updated_at >= created.updated_at);
        }
    }

    #[tokio::test]
    async fn missing_ids_are_not_found() {
        let (repos, _dir) = backends().await;
        for repo in repos {
            for id in ["999", "no-such-doc", "../etc/passwd", ""] {
                assert!(
                    matches!(repo.get(id).await, Err(ServerError::NotFound(_))),
                    "{} get {id}",
                    repo.backend()
                );
                assert!(matches!(
                    repo.update(id, &ada()).await,
                    Err(ServerError::NotFound(_))
                ));
                assert!(matches!(repo.delete(id).await, Err(ServerError::NotFound(_))));
            }
        }
    }

    #[tokio::test]
    async fn delete_removes_from_list() {
        let (repos, _dir) = backends().await;
        for repo in repos {
            let keep = repo.create(&ada()).await.unwrap();
            let gone = repo
                .create(&ContactInput::new("Bob", "bob@x.com", "789"))
                .await
                .unwrap();

            repo.delete(gone.id.as_str()).await.unwrap();

            let ids: Vec<_> = repo.list().await.unwrap().into_iter().map(|c| c.id).collect();
            assert_eq!(ids, vec![keep.id.clone()], "{}", repo.backend());
            assert!(matches!(
                repo.delete(gone.id.as_str()).await,
                Err(ServerError::NotFound(_))
            ));
        }
    }

    #[tokio::test]
    async fn list_is_sorted_by_name() {
        let (repos, _dir) = backends().await;
        for repo in repos {
            for name in ["carol", "Alice", "bob"] {
                repo.create(&ContactInput::new(name, "x@x.com", "1"))
                    .await
                    .unwrap();
            }
            let names: Vec<_> = repo.list().await.unwrap().into_iter().map(|c| c.name).collect();
            assert_eq!(names, ["Alice", "bob", "carol"], "{}", repo.backend());
        }
    }
}
