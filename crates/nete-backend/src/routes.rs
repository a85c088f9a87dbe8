use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Path, Query, Request, State};
use axum::http::header::{ETAG, IF_MATCH, LOCATION, SERVER};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use nete_core::storage::CreateOutcome;
use nete_core::{
    NeteClient, NeteUrl, Note, NoteDraft, NoteId, NoteIndexEntry, NoteStore, NoteSummary,
    RevisionId, SyncReport, Synchronizer,
};
use serde::Deserialize;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

use crate::error::AppError;

const SERVER_NAME: &str = concat!("nete-backend/", env!("CARGO_PKG_VERSION"));

/// Peer used by `GET /notes/sync`.
#[derive(Debug, Clone)]
pub struct SyncTarget {
    pub url: NeteUrl,
    pub timeout: Duration,
}

#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn NoteStore>,
    sync_target: Option<Arc<SyncTarget>>,
    sync_running: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(store: Arc<dyn NoteStore>, sync_target: Option<SyncTarget>) -> Self {
        Self {
            store,
            sync_target: sync_target.map(Arc::new),
            sync_running: Arc::new(Mutex::new(())),
        }
    }
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/notes", get(index).post(create_note))
        .route("/notes/sync", get(synchronize))
        .route(
            "/notes/{note_id}",
            get(get_note).put(update_note).delete(delete_note),
        )
        .layer(middleware::from_fn(add_server_header))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn add_server_header(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert(SERVER, HeaderValue::from_static(SERVER_NAME));
    response
}

#[derive(Debug, Default, Deserialize)]
struct IndexQuery {
    view: Option<String>,
}

async fn index(
    State(state): State<AppState>,
    Query(query): Query<IndexQuery>,
) -> Result<Response, AppError> {
    let notes = state.store.list().await?;
    match query.view.as_deref() {
        None | Some("index") => {
            let entries: Vec<NoteIndexEntry> = notes.iter().map(Note::index_entry).collect();
            Ok(Json(entries).into_response())
        }
        Some("summary") => {
            let summaries: Vec<NoteSummary> = notes.iter().map(Note::summary).collect();
            Ok(Json(summaries).into_response())
        }
        Some(other) => Err(AppError::bad_request(format!("Unknown view »{other}«"))),
    }
}

async fn get_note(
    State(state): State<AppState>,
    Path(note_id): Path<String>,
) -> Result<Response, AppError> {
    let id = note_id
        .parse::<NoteId>()
        .map_err(|_| AppError::not_found(format!("Note not found: {note_id}")))?;
    let note = state.store.read(&id).await?;
    Ok((
        [(ETAG, format!("\"{}\"", note.revision_id))],
        Json(note),
    )
        .into_response())
}

async fn create_note(State(state): State<AppState>, body: Bytes) -> Result<Response, AppError> {
    let draft: NoteDraft = serde_json::from_slice(&body)
        .map_err(|error| AppError::bad_request(format!("Invalid note: {error}")))?;

    match state.store.create(draft.into_note()).await? {
        CreateOutcome::Created(note) => {
            tracing::debug!(note_id = %note.id, "created note");
            Ok((
                StatusCode::CREATED,
                [(LOCATION, format!("/notes/{}", note.id))],
                Json(note),
            )
                .into_response())
        }
        CreateOutcome::AlreadyExists(note) => Ok(Json(note).into_response()),
    }
}

async fn update_note(
    State(state): State<AppState>,
    Path(note_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Note>, AppError> {
    let if_match = headers
        .get(IF_MATCH)
        .ok_or_else(|| AppError::bad_request("If-Match header is missing"))?;
    let expected = if_match
        .to_str()
        .ok()
        .and_then(|value| value.parse::<RevisionId>().ok())
        .ok_or_else(|| AppError::bad_request("If-Match header is not a revision id"))?;
    let id = note_id
        .parse::<NoteId>()
        .map_err(|_| AppError::bad_request(format!("Invalid note id: {note_id}")))?;

    let note: Note = serde_json::from_slice(&body)
        .map_err(|error| AppError::bad_request(format!("Invalid note: {error}")))?;
    if note.id != id {
        return Err(AppError::unprocessable(
            "Ids from path and from JSON body don't match",
        ));
    }

    let note = state.store.update(note, expected).await?;
    tracing::debug!(note_id = %note.id, revision_id = %note.revision_id, "updated note");
    Ok(Json(note))
}

async fn delete_note(
    State(state): State<AppState>,
    Path(note_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = note_id
        .parse::<NoteId>()
        .map_err(|_| AppError::not_found(format!("Note not found: {note_id}")))?;
    state.store.delete(&id).await?;
    tracing::debug!(note_id = %id, "deleted note");
    Ok(StatusCode::NO_CONTENT)
}

async fn synchronize(State(state): State<AppState>) -> Result<Json<SyncReport>, AppError> {
    let target = state
        .sync_target
        .as_deref()
        .ok_or_else(|| AppError::Config("No sync URL defined".to_string()))?;
    let Ok(_running) = state.sync_running.try_lock() else {
        return Err(AppError::Conflict(
            "A sync pass is already running".to_string(),
        ));
    };

    tracing::info!(url = %target.url, "starting sync");
    let client = NeteClient::connect_with_timeout(target.url.clone(), target.timeout).await?;
    let result = Synchronizer::new(state.store.as_ref(), &client)
        .synchronize()
        .await;
    client.close().await;

    Ok(Json(result?))
}
