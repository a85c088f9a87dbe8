//! HTTP client for a nete backend.
//!
//! [`NeteClient`] speaks the backend's REST interface over the transport
//! selected by its [`NeteUrl`] and implements [`RemoteNoteClient`] so it
//! can serve as the remote side of a sync pass.

mod ssh;
mod transport;
mod url;

use std::time::Duration;

use async_trait::async_trait;
use http::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::models::{Note, NoteDraft, NoteId, NoteIndexEntry, NoteSummary, RevisionId};
use crate::sync::{RemoteNoteClient, SyncReport};
use crate::util::compact_text;
use transport::{HttpRequest, HttpResponse, Transport};

pub use url::NeteUrl;

/// Default timeout for connecting and for each request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Backend error: {message}")]
    Server { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("SSH error: {0}")]
    Ssh(String),

    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),

    #[error("Request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Invalid response payload: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Connection to one backend.
#[derive(Debug)]
pub struct NeteClient {
    url: NeteUrl,
    transport: Transport,
}

impl NeteClient {
    pub async fn connect(url: NeteUrl) -> Result<Self, ClientError> {
        Self::connect_with_timeout(url, DEFAULT_TIMEOUT).await
    }

    /// Open a connection; for `http+ssh` URLs this starts the tunnel.
    pub async fn connect_with_timeout(
        url: NeteUrl,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let transport = Transport::open(&url, timeout).await?;
        debug!(%url, "connected to backend");
        Ok(Self { url, transport })
    }

    pub const fn url(&self) -> &NeteUrl {
        &self.url
    }

    /// Release the connection, stopping an SSH tunnel if one is running.
    pub async fn close(self) {
        self.transport.close().await;
    }

    pub async fn list_summaries(&self) -> Result<Vec<NoteSummary>, ClientError> {
        self.get_json("/notes?view=summary").await
    }

    /// Create a note from a draft; the backend assigns what is missing.
    pub async fn create_draft(&self, draft: &NoteDraft) -> Result<Note, ClientError> {
        let response = self
            .send(HttpRequest::new(Method::POST, "/notes").json(draft)?)
            .await?;
        decode(&response)
    }

    pub async fn delete(&self, id: &NoteId) -> Result<(), ClientError> {
        self.send(HttpRequest::new(Method::DELETE, note_path(id)))
            .await?;
        Ok(())
    }

    /// Ask the backend to run one sync pass against its configured peer.
    pub async fn trigger_sync(&self) -> Result<SyncReport, ClientError> {
        self.get_json("/notes/sync").await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self.send(HttpRequest::new(Method::GET, path)).await?;
        decode(&response)
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ClientError> {
        let response = self.transport.send(request).await?;
        check_status(response)
    }
}

#[async_trait]
impl RemoteNoteClient for NeteClient {
    async fn list_index(&self) -> Result<Vec<NoteIndexEntry>, ClientError> {
        self.get_json("/notes").await
    }

    async fn fetch(&self, id: &NoteId) -> Result<Note, ClientError> {
        self.get_json(&note_path(id)).await
    }

    async fn create(&self, note: &Note) -> Result<Note, ClientError> {
        self.create_draft(&NoteDraft::from(note.clone())).await
    }

    async fn update(&self, note: &Note, expected: RevisionId) -> Result<Note, ClientError> {
        let request = HttpRequest::new(Method::PUT, note_path(&note.id))
            .json(note)?
            .if_match(expected);
        let response = self.send(request).await?;
        decode(&response)
    }
}

fn note_path(id: &NoteId) -> String {
    format!("/notes/{id}")
}

fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ClientError> {
    Ok(serde_json::from_slice(&response.body)?)
}

fn check_status(response: HttpResponse) -> Result<HttpResponse, ClientError> {
    if response.status.is_success() {
        return Ok(response);
    }

    let message = parse_api_error(response.status, &String::from_utf8_lossy(&response.body));
    Err(match response.status {
        StatusCode::NOT_FOUND => ClientError::NotFound(message),
        StatusCode::CONFLICT => ClientError::Conflict(message),
        status => ClientError::Server {
            status: status.as_u16(),
            message,
        },
    })
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.error.or(payload.message) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}
