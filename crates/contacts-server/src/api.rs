use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{Method, StatusCode},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::info;

use contacts_shared::constants::{API_BASE_PATH, CONTACTS_PATH, HEALTH_PATH};
use contacts_shared::filter::filter_contacts;
use contacts_shared::{Contact, ContactInput};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::repository::ContactRepository;

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn ContactRepository>,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    let api = Router::new()
        .route(HEALTH_PATH, get(health_check))
        .route(CONTACTS_PATH, get(list_contacts).post(create_contact))
        .route(
            &format!("{CONTACTS_PATH}/:id"),
            get(get_contact).put(update_contact).delete(delete_contact),
        );

    let mut router = Router::new().nest(API_BASE_PATH, api);

    // Any other route serves the frontend, falling back to its index page.
    if let Some(dir) = &state.config.static_dir {
        let index = ServeFile::new(dir.join("index.html"));
        router = router.fallback_service(ServeDir::new(dir).fallback(index));
    }

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

#[derive(Deserialize)]
struct ListQuery {
    /// Optional name/email filter, same predicate the client applies.
    q: Option<String>,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn list_contacts(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Contact>>, ServerError> {
    let contacts = state.repo.list().await?;
    let contacts = match query.q {
        Some(term) => filter_contacts(contacts, &term),
        None => contacts,
    };
    Ok(Json(contacts))
}

async fn get_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Contact>, ServerError> {
    Ok(Json(state.repo.get(&id).await?))
}

async fn create_contact(
    State(state): State<AppState>,
    payload: Result<Json<ContactInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Contact>), ServerError> {
    let Json(input) = payload.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    input.validate()?;

    let contact = state.repo.create(&input).await?;
    info!(id = %contact.id, backend = state.repo.backend(), "Contact created");

    Ok((StatusCode::CREATED, Json(contact)))
}

async fn update_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ContactInput>, JsonRejection>,
) -> Result<Json<Contact>, ServerError> {
    let Json(input) = payload.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    input.validate()?;

    let contact = state.repo.update(&id, &input).await?;
    info!(id = %contact.id, "Contact updated");

    Ok(Json(contact))
}

async fn delete_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ServerError> {
    state.repo.delete(&id).await?;
    info!(id = %id, "Contact deleted");

    Ok(Json(MessageResponse {
        message: "Contact deleted successfully",
    }))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    serve_on(listener, state).await
}

/// Serve the API on an already bound listener.
pub async fn serve_on(listener: tokio::net::TcpListener, state: AppState) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %listener.local_addr()?, "Starting HTTP API server");
    axum::serve(listener, app).await?;

    Ok(())
}
