//! Unit tests for the RPC handler: every JSON-RPC method dispatched by `handle_method`.
//!
//! These tests go through the same code path as the `bookmark-sync-rpc`
//! binary, over an in-memory SQLite backend and a temporary settings file.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tempfile::TempDir;
use tokio::sync::{Mutex, Notify, Semaphore};

use bookmark_sync::app::App;
use bookmark_sync::rpc_handler::{bookmarks_changed_event, handle_method};
use bookmark_sync::services::backend::{BookmarkBackend, ChangeSubscription};
use bookmark_sync::services::settings_engine::SettingsEngine;
use bookmark_sync::services::sqlite_backend::SqliteBackend;
use bookmark_sync::types::bookmark::Bookmark;
use bookmark_sync::types::errors::BackendError;

/// Parks every insert until the test releases it.
struct HeldInsertBackend {
    inner: SqliteBackend,
    entered: Notify,
    release: Semaphore,
}

#[async_trait]
impl BookmarkBackend for HeldInsertBackend {
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Bookmark>, BackendError> {
        self.inner.list_by_owner(owner_id).await
    }

    async fn insert(&self, bookmark: &Bookmark) -> Result<(), BackendError> {
        self.entered.notify_one();
        self.release.acquire().await.expect("semaphore open").forget();
        self.inner.insert(bookmark).await
    }

    async fn delete_by_id(&self, id: &str) -> Result<(), BackendError> {
        self.inner.delete_by_id(id).await
    }

    fn subscribe_to_changes(&self) -> ChangeSubscription {
        self.inner.subscribe_to_changes()
    }
}

/// Create a fresh App with its settings file in a temp directory.
fn setup() -> (Mutex<App>, TempDir) {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let settings_path = tmp.path().join("settings.json");
    let engine = SettingsEngine::new(Some(settings_path.to_string_lossy().to_string()));
    let backend = Arc::new(SqliteBackend::open_in_memory().expect("Failed to open backend"));
    (Mutex::new(App::with_backend(backend, engine)), tmp)
}

async fn sign_in(app: &Mutex<App>, user_id: &str) {
    handle_method(app, "auth.sign_in", &json!({"user_id": user_id}))
        .await
        .expect("sign in");
}

// ─── Ping ───

#[tokio::test]
async fn test_ping() {
    let (app, _tmp) = setup();
    let res = handle_method(&app, "ping", &json!({})).await.unwrap();
    assert_eq!(res, json!({"pong": true}));
}

// ─── Unknown method ───

#[tokio::test]
async fn test_unknown_method_returns_error() {
    let (app, _tmp) = setup();
    let res = handle_method(&app, "nonexistent.method", &json!({})).await;
    assert!(res.unwrap_err().contains("unknown method"));
}

// ─── Auth & routing ───

#[tokio::test]
async fn test_auth_status_transitions() {
    let (app, _tmp) = setup();
    let status = handle_method(&app, "auth.status", &json!({})).await.unwrap();
    assert_eq!(status["state"], "anonymous");

    let res = handle_method(
        &app,
        "auth.sign_in",
        &json!({"user_id": "alice", "email": "alice@example.com"}),
    )
    .await
    .unwrap();
    assert_eq!(res["user_id"], "alice");
    assert_eq!(res["bookmarks"], json!([]));

    let status = handle_method(&app, "auth.status", &json!({})).await.unwrap();
    assert_eq!(status["state"], "authenticated");
    assert_eq!(status["user_id"], "alice");
    assert_eq!(status["email"], "alice@example.com");

    handle_method(&app, "auth.sign_out", &json!({})).await.unwrap();
    let status = handle_method(&app, "auth.status", &json!({})).await.unwrap();
    assert_eq!(status["state"], "anonymous");
}

#[tokio::test]
async fn test_sign_in_requires_user_id() {
    let (app, _tmp) = setup();
    assert!(handle_method(&app, "auth.sign_in", &json!({})).await.is_err());
    let res = handle_method(&app, "auth.sign_in", &json!({"user_id": ""})).await;
    assert!(res.unwrap_err().contains("Invalid bookmark"));
}

#[tokio::test]
async fn test_route_resolution_redirects() {
    let (app, _tmp) = setup();
    let res = handle_method(&app, "route.resolve", &json!({"route": "bookmarks"})).await.unwrap();
    assert_eq!(res["route"], "login");
    let res = handle_method(&app, "route.resolve", &json!({"route": "login"})).await.unwrap();
    assert_eq!(res["route"], "login");

    sign_in(&app, "alice").await;
    let res = handle_method(&app, "route.resolve", &json!({"route": "/login"})).await.unwrap();
    assert_eq!(res["route"], "bookmarks");
    let res = handle_method(&app, "route.resolve", &json!({"route": "bookmarks"})).await.unwrap();
    assert_eq!(res["route"], "bookmarks");

    let res = handle_method(&app, "route.resolve", &json!({"route": "admin"})).await;
    assert!(res.unwrap_err().contains("unknown route"));
}

// ─── Bookmarks ───

#[tokio::test]
async fn test_bookmark_calls_require_sign_in() {
    let (app, _tmp) = setup();
    for (method, params) in [
        ("bookmark.list", json!({})),
        ("bookmark.add", json!({"title": "A", "url": "https://a.io"})),
        ("bookmark.delete", json!({"id": "x"})),
    ] {
        let res = handle_method(&app, method, &params).await;
        assert_eq!(res.unwrap_err(), "Not authenticated", "method {}", method);
    }
}

#[tokio::test]
async fn test_bookmark_add_list_delete() {
    let (app, _tmp) = setup();
    sign_in(&app, "alice").await;

    let first = handle_method(&app, "bookmark.add", &json!({"title": "A", "url": "https://a.io"}))
        .await
        .unwrap();
    assert_eq!(first["user_id"], "alice");
    assert_eq!(first["url"], "https://a.io");
    handle_method(&app, "bookmark.add", &json!({"title": "B", "url": "https://b.io"}))
        .await
        .unwrap();

    let list = handle_method(&app, "bookmark.list", &json!({})).await.unwrap();
    let arr = list.as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["title"], "B");
    assert_eq!(arr[1]["title"], "A");

    let id = first["id"].as_str().unwrap();
    handle_method(&app, "bookmark.delete", &json!({"id": id})).await.unwrap();
    let list = handle_method(&app, "bookmark.list", &json!({})).await.unwrap();
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_bookmark_add_validation_error() {
    let (app, _tmp) = setup();
    sign_in(&app, "alice").await;

    let res = handle_method(&app, "bookmark.add", &json!({"title": "", "url": "https://a.io"})).await;
    assert!(res.unwrap_err().starts_with("Invalid bookmark"));
    assert!(handle_method(&app, "bookmark.add", &json!({"title": "A"})).await.is_err());

    let list = handle_method(&app, "bookmark.list", &json!({})).await.unwrap();
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn test_bookmarks_are_scoped_to_signed_in_user() {
    let (app, _tmp) = setup();
    sign_in(&app, "alice").await;
    handle_method(&app, "bookmark.add", &json!({"title": "Mine", "url": "https://a.io"}))
        .await
        .unwrap();

    sign_in(&app, "bob").await;
    let list = handle_method(&app, "bookmark.list", &json!({})).await.unwrap();
    assert_eq!(list, json!([]));

    sign_in(&app, "alice").await;
    let list = handle_method(&app, "bookmark.list", &json!({})).await.unwrap();
    assert_eq!(list[0]["title"], "Mine");
}

#[tokio::test]
async fn test_bookmarks_changed_event_shape() {
    let event = bookmarks_changed_event(&[]);
    assert_eq!(event, json!({"event": "bookmarks.changed", "bookmarks": []}));
}

// ─── Settings ───

#[tokio::test]
async fn test_settings_get_and_set() {
    let (app, tmp) = setup();
    let settings = handle_method(&app, "settings.get", &json!({})).await.unwrap();
    assert_eq!(settings["sync"]["delete_rollback"], "Snapshot");
    assert_eq!(settings["sync"]["retry"]["max_attempts"], 3);

    handle_method(
        &app,
        "settings.set",
        &json!({"key": "sync.delete_rollback", "value": "ReinsertEntry"}),
    )
    .await
    .unwrap();
    let settings = handle_method(&app, "settings.get", &json!({})).await.unwrap();
    assert_eq!(settings["sync"]["delete_rollback"], "ReinsertEntry");
    assert!(tmp.path().join("settings.json").exists());
}

#[tokio::test]
async fn test_settings_set_rejects_bad_input() {
    let (app, _tmp) = setup();
    let res = handle_method(&app, "settings.set", &json!({"key": "sync.nope", "value": 1})).await;
    assert!(res.unwrap_err().contains("Invalid settings key"));

    let res = handle_method(
        &app,
        "settings.set",
        &json!({"key": "sync.retry.max_attempts", "value": "lots"}),
    )
    .await;
    assert!(res.unwrap_err().contains("Invalid settings value"));

    assert!(handle_method(&app, "settings.set", &json!({"value": 1})).await.is_err());
}

// ─── Locking ───

#[tokio::test]
async fn test_app_lock_is_free_while_write_is_pending() {
    let tmp = TempDir::new().unwrap();
    let engine = SettingsEngine::new(Some(tmp.path().join("settings.json").to_string_lossy().to_string()));
    let backend = Arc::new(HeldInsertBackend {
        inner: SqliteBackend::open_in_memory().unwrap(),
        entered: Notify::new(),
        release: Semaphore::new(0),
    });
    let app = Arc::new(Mutex::new(App::with_backend(backend.clone(), engine)));
    sign_in(&app, "alice").await;

    let pending = {
        let app = app.clone();
        tokio::spawn(async move {
            handle_method(&app, "bookmark.add", &json!({"title": "Slow", "url": "https://slow.io"})).await
        })
    };
    backend.entered.notified().await;

    let status = handle_method(&app, "auth.status", &json!({})).await.unwrap();
    assert_eq!(status["user_id"], "alice");
    let list = handle_method(&app, "bookmark.list", &json!({})).await.unwrap();
    assert_eq!(list[0]["title"], "Slow");

    backend.release.add_permits(1);
    let added = pending.await.unwrap().unwrap();
    assert_eq!(added["title"], "Slow");
}
