//! Remote contact API over HTTP.
//!
//! Every call resolves to either a value or an [`ApiError`] that says how
//! the caller should react. No retries happen here; the sync controller owns
//! that decision.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use contacts_shared::constants::{CONTACTS_PATH, HEALTH_PATH};
use contacts_shared::{Contact, ContactId, ContactInput};

use crate::error::{ApiError, ClientError};

/// The server-side contact resource.
#[async_trait]
pub trait RemoteContactApi: Send + Sync {
    async fn list(&self) -> Result<Vec<Contact>, ApiError>;
    async fn get(&self, id: &ContactId) -> Result<Contact, ApiError>;
    async fn create(&self, input: &ContactInput) -> Result<Contact, ApiError>;
    async fn update(&self, id: &ContactId, input: &ContactInput) -> Result<Contact, ApiError>;
    async fn delete(&self, id: &ContactId) -> Result<(), ApiError>;

    /// Cheap reachability check used by the connectivity probe.
    async fn ping(&self) -> Result<(), ApiError>;
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    message: String,
}

/// [`RemoteContactApi`] backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpContactApi {
    client: Client,
    base_url: String,
}

impl HttpContactApi {
    /// `base_url` includes the API prefix, e.g. `http://host:3000/api`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Http(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, url)
            .header(header::CACHE_CONTROL, "no-cache")
    }

    fn contact_path(id: &ContactId) -> String {
        format!("{CONTACTS_PATH}/{}", id.as_str())
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = match response.json::<MessageBody>().await {
            Ok(body) => body.message,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("Unexpected response")
                .to_string(),
        };
        tracing::debug!(%status, %message, "Remote call failed");
        Err(classify_status(status, message))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = self.send(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Server(format!("Invalid response body: {e}")))
    }
}

#[async_trait]
impl RemoteContactApi for HttpContactApi {
    async fn list(&self) -> Result<Vec<Contact>, ApiError> {
        self.send_json(self.request(Method::GET, CONTACTS_PATH)).await
    }

    async fn get(&self, id: &ContactId) -> Result<Contact, ApiError> {
        self.send_json(self.request(Method::GET, &Self::contact_path(id)))
            .await
    }

    async fn create(&self, input: &ContactInput) -> Result<Contact, ApiError> {
        self.send_json(self.request(Method::POST, CONTACTS_PATH).json(input))
            .await
    }

    async fn update(&self, id: &ContactId, input: &ContactInput) -> Result<Contact, ApiError> {
        self.send_json(self.request(Method::PUT, &Self::contact_path(id)).json(input))
            .await
    }

    async fn delete(&self, id: &ContactId) -> Result<(), ApiError> {
        self.send(self.request(Method::DELETE, &Self::contact_path(id)))
            .await
            .map(|_| ())
    }

    async fn ping(&self) -> Result<(), ApiError> {
        self.send(self.request(Method::GET, HEALTH_PATH))
            .await
            .map(|_| ())
    }
}

/// A request that produced no HTTP response at all.
fn transport_error(error: reqwest::Error) -> ApiError {
    if error.is_builder() {
        ApiError::Server(error.to_string())
    } else {
        ApiError::Connectivity(error.to_string())
    }
}

/// Map a non-success status to the error taxonomy.
///
/// Gateway failures mean the server itself was not reached, so they count as
/// connectivity problems rather than server faults.
pub(crate) fn classify_status(status: StatusCode, message: String) -> ApiError {
    match status {
        StatusCode::BAD_REQUEST => ApiError::Validation(message),
        StatusCode::NOT_FOUND => ApiError::NotFound(message),
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
            ApiError::Connectivity(message)
        }
        _ => ApiError::Server(message),
    }
}
