use std::sync::Arc;
use std::time::Duration;

use nete_core::{
    ClientError, FilesystemNoteStore, NeteClient, NeteUrl, Note, NoteDraft, NoteStore,
    RemoteNoteClient, RevisionId,
};
use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::routes::{app_router, AppState, SyncTarget};

struct TestServer {
    base_url: String,
    store: Arc<FilesystemNoteStore>,
    _dir: TempDir,
}

impl TestServer {
    async fn start(sync_target: Option<SyncTarget>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FilesystemNoteStore::open(dir.path()).unwrap());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = app_router(AppState::new(store.clone(), sync_target));
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            store,
            _dir: dir,
        }
    }

    async fn syncing_with(peer: &Self) -> Self {
        Self::start(Some(SyncTarget {
            url: peer.url(),
            timeout: Duration::from_secs(5),
        }))
        .await
    }

    fn url(&self) -> NeteUrl {
        self.base_url.parse().unwrap()
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn client(&self) -> NeteClient {
        NeteClient::connect(self.url()).await.unwrap()
    }
}

fn http() -> reqwest::Client {
    reqwest::Client::new()
}

#[tokio::test]
async fn create_then_get_returns_location_and_etag() {
    let server = TestServer::start(None).await;

    let response = http()
        .post(server.endpoint("/notes"))
        .json(&json!({"title": "Groceries", "text": "milk"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(response.headers()["server"]
        .to_str()
        .unwrap()
        .starts_with("nete-backend/"));
    let location = response.headers()["location"].to_str().unwrap().to_string();
    let created: Note = response.json().await.unwrap();
    assert_eq!(location, format!("/notes/{}", created.id));

    let response = http().get(server.endpoint(&location)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["etag"].to_str().unwrap(),
        format!("\"{}\"", created.revision_id)
    );
    let fetched: Note = response.json().await.unwrap();
    assert_eq!(fetched.title, "Groceries");
    assert_eq!(fetched.text, "milk");
}

#[tokio::test]
async fn index_lists_ids_and_revisions() {
    let server = TestServer::start(None).await;
    let note = server.store.write(Note::new("title", "body")).await.unwrap();

    let index: Vec<Value> = http()
        .get(server.endpoint("/notes"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        index,
        vec![json!({"id": note.id, "revision_id": note.revision_id})]
    );

    let summaries = server.client().await.list_summaries().await.unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].title, "title");

    let response = http()
        .get(server.endpoint("/notes?view=bogus"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_is_idempotent_for_the_same_version() {
    let server = TestServer::start(None).await;
    let note = Note::new("title", "text");

    for expected in [StatusCode::CREATED, StatusCode::OK] {
        let response = http()
            .post(server.endpoint("/notes"))
            .json(&note)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), expected);
    }

    let other_version = Note {
        revision_id: RevisionId::new(),
        ..note
    };
    let response = http()
        .post(server.endpoint("/notes"))
        .json(&other_version)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn update_requires_matching_if_match() {
    let server = TestServer::start(None).await;
    let note = server.store.write(Note::new("title", "old")).await.unwrap();
    let edited = note.clone().edited("title", "new");
    let path = server.endpoint(&format!("/notes/{}", note.id));

    let response = http().put(&path).json(&edited).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("If-Match"));

    let response = http()
        .put(&path)
        .header("if-match", format!("\"{}\"", RevisionId::new()))
        .json(&edited)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = http()
        .put(&path)
        .header("if-match", note.revision_id.to_string())
        .json(&note)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let other = Note::new("other", "");
    let response = http()
        .put(&path)
        .header("if-match", note.revision_id.to_string())
        .json(&other)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = http()
        .put(&path)
        .header("if-match", format!("\"{}\"", note.revision_id))
        .json(&edited)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let stored = server.store.read(&note.id).await.unwrap();
    assert_eq!(stored.revision_id, edited.revision_id);
    assert_eq!(stored.text, "new");
}

#[tokio::test]
async fn update_of_missing_note_is_not_found() {
    let server = TestServer::start(None).await;
    let note = Note::new("title", "");

    let response = http()
        .put(server.endpoint(&format!("/notes/{}", note.id)))
        .header("if-match", note.revision_id.to_string())
        .json(&note.clone().edited("title", "x"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = http()
        .put(server.endpoint("/notes/not-a-uuid"))
        .header("if-match", note.revision_id.to_string())
        .json(&note)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_and_malformed_ids_are_not_found() {
    let server = TestServer::start(None).await;

    for path in ["/notes/not-a-uuid", "/notes/5f2b1a8e-0c1d-4b6e-9a51-3c0d7e2f9b11"] {
        let response = http().get(server.endpoint(path)).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: Value = response.json().await.unwrap();
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn delete_removes_note() {
    let server = TestServer::start(None).await;
    let note = server.store.write(Note::new("title", "")).await.unwrap();
    let path = server.endpoint(&format!("/notes/{}", note.id));

    let response = http().delete(&path).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = http().delete(&path).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn client_maps_statuses_to_errors() {
    let server = TestServer::start(None).await;
    let client = server.client().await;
    let note = client
        .create_draft(&NoteDraft::new("title", "text"))
        .await
        .unwrap();

    let err = client
        .update(&note.clone().edited("title", "x"), RevisionId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Conflict(_)));

    client.delete(&note.id).await.unwrap();
    assert!(client.fetch(&note.id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn sync_without_url_is_a_server_error() {
    let server = TestServer::start(None).await;
    let response = http()
        .get(server.endpoint("/notes/sync"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn sync_with_unreachable_peer_is_bad_gateway() {
    let server = TestServer::start(Some(SyncTarget {
        url: "http://127.0.0.1:9".parse().unwrap(),
        timeout: Duration::from_secs(2),
    }))
    .await;
    server.store.write(Note::new("title", "")).await.unwrap();

    let response = http()
        .get(server.endpoint("/notes/sync"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(server.store.load_status().await.unwrap().is_empty());
}

#[tokio::test]
async fn sync_between_two_backends_converges() {
    let remote = TestServer::start(None).await;
    let local = TestServer::syncing_with(&remote).await;
    local.store.write(Note::new("local", "a")).await.unwrap();
    remote.store.write(Note::new("remote", "b")).await.unwrap();

    let report = local.client().await.trigger_sync().await.unwrap();

    assert_eq!(report.created_here, 1);
    assert_eq!(report.created_there, 1);
    assert!(report.is_clean());
    let mut local_titles: Vec<String> = local
        .store
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|note| note.title)
        .collect();
    local_titles.sort();
    assert_eq!(local_titles, vec!["local", "remote"]);
    assert_eq!(remote.store.list().await.unwrap().len(), 2);

    let again = local.client().await.trigger_sync().await.unwrap();
    assert_eq!(again.unchanged, 2);
}

#[tokio::test]
async fn sync_over_http_preserves_conflicting_edits() {
    let remote = TestServer::start(None).await;
    let local = TestServer::syncing_with(&remote).await;
    let note = local.store.write(Note::new("plan", "v1")).await.unwrap();
    local.client().await.trigger_sync().await.unwrap();

    local
        .store
        .write(note.clone().edited("plan", "local v2"))
        .await
        .unwrap();
    remote
        .store
        .write(note.clone().edited("plan", "remote v2"))
        .await
        .unwrap();

    let report = local.client().await.trigger_sync().await.unwrap();

    assert_eq!(report.conflicts, 1);
    let copy = report.conflict_copies[0].copy;
    assert_eq!(local.store.read(&note.id).await.unwrap().text, "remote v2");
    assert_eq!(local.store.read(&copy).await.unwrap().text, "local v2");
    assert_eq!(remote.store.read(&copy).await.unwrap().text, "local v2");
}

#[cfg(unix)]
#[tokio::test]
async fn client_talks_over_unix_socket() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FilesystemNoteStore::open(dir.path().join("storage")).unwrap());
    let socket_path = dir.path().join("backend.sock");
    let listener = tokio::net::UnixListener::bind(&socket_path).unwrap();
    let router = app_router(AppState::new(store.clone(), None));
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let url: NeteUrl = format!("local:{}", socket_path.display()).parse().unwrap();
    let client = NeteClient::connect(url).await.unwrap();

    let note = client
        .create_draft(&NoteDraft::new("socket", "hello"))
        .await
        .unwrap();
    let index = client.list_index().await.unwrap();
    assert_eq!(index, vec![note.index_entry()]);

    let edited = note.clone().edited("socket", "updated");
    client.update(&edited, note.revision_id).await.unwrap();
    assert_eq!(client.fetch(&note.id).await.unwrap().text, "updated");
    assert_eq!(store.read(&note.id).await.unwrap().text, "updated");

    client.delete(&note.id).await.unwrap();
    assert!(client.list_index().await.unwrap().is_empty());
    client.close().await;
}
