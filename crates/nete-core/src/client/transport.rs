//! HTTP transports: reqwest for TCP, a hyper client connection for Unix
//! domain sockets (local or SSH-forwarded).

use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, IF_MATCH};
use http::{Method, StatusCode};
use serde::Serialize;

use super::ssh::SshTunnel;
use super::{ClientError, NeteUrl};
use crate::models::RevisionId;

#[derive(Debug)]
pub(crate) struct HttpRequest {
    method: Method,
    path: String,
    if_match: Option<RevisionId>,
    body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub(crate) fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            if_match: None,
            body: None,
        }
    }

    pub(crate) fn json(mut self, body: &impl Serialize) -> Result<Self, ClientError> {
        self.body = Some(serde_json::to_vec(body)?);
        Ok(self)
    }

    pub(crate) const fn if_match(mut self, revision_id: RevisionId) -> Self {
        self.if_match = Some(revision_id);
        self
    }

    fn if_match_value(&self) -> Option<String> {
        self.if_match.map(|revision_id| format!("\"{revision_id}\""))
    }
}

#[derive(Debug)]
pub(crate) struct HttpResponse {
    pub(crate) status: StatusCode,
    pub(crate) body: Bytes,
}

#[derive(Debug)]
pub(crate) enum Transport {
    Tcp {
        base_url: String,
        client: reqwest::Client,
    },
    Unix {
        socket_path: PathBuf,
        timeout: Duration,
    },
    Ssh {
        tunnel: SshTunnel,
        timeout: Duration,
    },
}

impl Transport {
    pub(crate) async fn open(url: &NeteUrl, timeout: Duration) -> Result<Self, ClientError> {
        match url {
            NeteUrl::Tcp { base_url } => Ok(Self::Tcp {
                base_url: base_url.clone(),
                client: reqwest::Client::builder()
                    .connect_timeout(timeout)
                    .timeout(timeout)
                    .build()?,
            }),
            NeteUrl::Unix { socket_path } => Ok(Self::Unix {
                socket_path: socket_path.clone(),
                timeout,
            }),
            NeteUrl::Ssh {
                host,
                port,
                username,
            } => Ok(Self::Ssh {
                tunnel: SshTunnel::open(host, *port, username.as_deref(), timeout).await?,
                timeout,
            }),
        }
    }

    pub(crate) async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ClientError> {
        match self {
            Self::Tcp { base_url, client } => send_tcp(client, base_url, request).await,
            Self::Unix {
                socket_path,
                timeout,
            } => send_unix_with_timeout(socket_path, request, *timeout).await,
            Self::Ssh { tunnel, timeout } => {
                send_unix_with_timeout(tunnel.socket_path(), request, *timeout).await
            }
        }
    }

    pub(crate) async fn close(self) {
        if let Self::Ssh { tunnel, .. } = self {
            tunnel.close().await;
        }
    }
}

async fn send_tcp(
    client: &reqwest::Client,
    base_url: &str,
    request: HttpRequest,
) -> Result<HttpResponse, ClientError> {
    let mut builder = client.request(
        request.method.clone(),
        format!("{base_url}{}", request.path),
    );
    if let Some(if_match) = request.if_match_value() {
        builder = builder.header(IF_MATCH, if_match);
    }
    if let Some(body) = request.body {
        builder = builder.header(CONTENT_TYPE, "application/json").body(body);
    }

    let response = builder.send().await?;
    let status = response.status();
    let body = response.bytes().await?;
    Ok(HttpResponse { status, body })
}

async fn send_unix_with_timeout(
    socket_path: &Path,
    request: HttpRequest,
    timeout: Duration,
) -> Result<HttpResponse, ClientError> {
    tokio::time::timeout(timeout, send_unix(socket_path, request))
        .await
        .map_err(|_| ClientError::Timeout(timeout))?
}

#[cfg(unix)]
async fn send_unix(socket_path: &Path, request: HttpRequest) -> Result<HttpResponse, ClientError> {
    use http::header::HOST;
    use http_body_util::{BodyExt, Full};
    use hyper_util::rt::TokioIo;
    use tokio::net::UnixStream;

    let stream = UnixStream::connect(socket_path).await.map_err(|error| {
        ClientError::Transport(format!(
            "Could not connect to {}: {error}",
            socket_path.display()
        ))
    })?;
    let (mut sender, connection) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
        .await
        .map_err(transport_error)?;
    tokio::spawn(async move {
        if let Err(error) = connection.await {
            tracing::debug!(%error, "unix socket connection closed with error");
        }
    });

    let mut builder = http::Request::builder()
        .method(request.method.clone())
        .uri(request.path.as_str())
        .header(HOST, "localhost");
    if let Some(if_match) = request.if_match_value() {
        builder = builder.header(IF_MATCH, if_match);
    }
    if request.body.is_some() {
        builder = builder.header(CONTENT_TYPE, "application/json");
    }
    let body = Full::new(Bytes::from(request.body.unwrap_or_default()));
    let http_request = builder.body(body).map_err(transport_error)?;

    let response = sender
        .send_request(http_request)
        .await
        .map_err(transport_error)?;
    let status = response.status();
    let body = response
        .into_body()
        .collect()
        .await
        .map_err(transport_error)?
        .to_bytes();
    Ok(HttpResponse { status, body })
}

#[cfg(not(unix))]
async fn send_unix(socket_path: &Path, _request: HttpRequest) -> Result<HttpResponse, ClientError> {
    Err(ClientError::Transport(format!(
        "Unix domain sockets are not supported on this platform ({})",
        socket_path.display()
    )))
}

#[cfg(unix)]
fn transport_error(error: impl std::fmt::Display) -> ClientError {
    ClientError::Transport(error.to_string())
}
