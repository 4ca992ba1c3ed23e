//! End-to-end: the real API router on an ephemeral port, driven through the
//! HTTP remote, the SQLite cache and the sync controller.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tempfile::TempDir;
use tokio::net::TcpListener;

use contacts_client::connectivity::Connectivity;
use contacts_client::local::{LocalContactStore, SqliteCache};
use contacts_client::notice::Notifier;
use contacts_client::remote::{HttpContactApi, RemoteContactApi};
use contacts_client::sync::SyncController;
use contacts_client::{ApiError, ContactService};
use contacts_server::api::{self, AppState};
use contacts_server::config::ServerConfig;
use contacts_server::repository::SqliteRepository;
use contacts_shared::{ContactId, ContactInput};

struct Server {
    url: String,
    _dir: TempDir,
}

async fn start_server() -> Server {
    let dir = TempDir::new().unwrap();
    let repo = SqliteRepository::open(&dir.path().join("contacts.db")).unwrap();
    let state = AppState {
        repo: Arc::new(repo),
        config: Arc::new(ServerConfig::default()),
    };
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/api", listener.local_addr().unwrap());
    tokio::spawn(api::serve_on(listener, state));
    Server { url, _dir: dir }
}

fn remote(url: &str) -> Arc<HttpContactApi> {
    Arc::new(HttpContactApi::new(url, Duration::from_secs(5)).unwrap())
}

fn client_service(url: &str, cache: &Path, online: bool) -> (ContactService, Arc<SqliteCache>) {
    let local = Arc::new(SqliteCache::open(cache).unwrap());
    let controller = Arc::new(SyncController::new(
        remote(url),
        local.clone(),
        Notifier::new(),
    ));
    let connectivity = Arc::new(Connectivity::new(online));
    (ContactService::new(controller, connectivity), local)
}

fn ada() -> ContactInput {
    ContactInput::new("Ada", "ada@x.com", "123")
}

#[tokio::test]
async fn http_errors_are_classified() {
    let server = start_server().await;
    let api = remote(&server.url);

    api.ping().await.unwrap();

    let err = api
        .create(&ContactInput::new("Ada", "", "123"))
        .await
        .unwrap_err();
    match err {
        ApiError::Validation(message) => assert!(message.contains("required"), "{message}"),
        other => panic!("expected validation error, got {other:?}"),
    }

    let err = api.get(&ContactId::from("999")).await.unwrap_err();
    assert_eq!(err, ApiError::NotFound("Contact not found".into()));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn hung_server_times_out_as_connectivity_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/api", listener.local_addr().unwrap());
    // Accept connections and never answer.
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let api = HttpContactApi::new(&url, Duration::from_millis(300)).unwrap();
    let started = Instant::now();
    let err = api.list().await.unwrap_err();

    assert!(matches!(err, ApiError::Connectivity(_)), "got {err:?}");
    assert!(err.is_retryable());
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn crud_round_trip_over_http() {
    let server = start_server().await;
    let api = remote(&server.url);

    let created = api.create(&ada()).await.unwrap();
    assert_eq!(created.id.as_str(), "1");
    assert!(created.created_at.is_some());

    let updated = api
        .update(&created.id, &ContactInput::new("Ada L", "ada@x.com", "456"))
        .await
        .unwrap();
    assert_eq!(updated.phone, "456");
    assert!(updated.updated_at >= created.updated_at);
    assert_eq!(updated.created_at, created.created_at);

    assert_eq!(api.get(&created.id).await.unwrap(), updated);
    api.delete(&created.id).await.unwrap();
    assert!(api.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn offline_edits_sync_after_reconnect() {
    let server = start_server().await;
    let cache = TempDir::new().unwrap();
    let (service, local) = client_service(&server.url, &cache.path().join("cache.db"), true);

    let ada = service.create(ada()).await.unwrap().into_inner();
    assert_eq!(ada.id.as_str(), "1");

    service.set_offline(true);
    let bob = service
        .create(ContactInput::new("Bob", "bob@x.com", "789"))
        .await
        .unwrap();
    assert!(bob.is_queued());
    let bob_temp = bob.into_inner().id;
    service
        .update(&bob_temp, ContactInput::new("Bobby", "bob@x.com", "789"))
        .await
        .unwrap();
    service.delete(&ada.id).await.unwrap();
    assert_eq!(service.pending().await.len(), 3);

    let offline_view = service.list().await.unwrap();
    assert_eq!(offline_view.len(), 1);
    assert_eq!(offline_view[0].name, "Bobby");

    service.set_offline(false);
    let report = service.sync().await;
    assert!(report.is_complete(), "{report:?}");
    assert_eq!(report.replayed, 3);

    let server_view = remote(&server.url).list().await.unwrap();
    assert_eq!(server_view.len(), 1);
    assert_eq!(server_view[0].id.as_str(), "2");
    assert_eq!(server_view[0].name, "Bobby");

    let cached = local.get_all().await.unwrap();
    assert_eq!(cached, server_view);
}

#[tokio::test]
async fn provisional_records_survive_restart() {
    let server = start_server().await;
    let cache = TempDir::new().unwrap();
    let cache_path = cache.path().join("cache.db");

    {
        let (service, _) = client_service(&server.url, &cache_path, false);
        service.create(ada()).await.unwrap();
        assert_eq!(service.pending().await.len(), 1);
    }

    let (service, local) = client_service(&server.url, &cache_path, true);
    assert!(service.pending().await.is_empty());
    assert_eq!(service.controller().recover_provisional().await.unwrap(), 1);

    assert!(service.sync().await.is_complete());
    let cached = local.get_all().await.unwrap();
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].id.as_str(), "1");
    assert_eq!(remote(&server.url).list().await.unwrap().len(), 1);
}
