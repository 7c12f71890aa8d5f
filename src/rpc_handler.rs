//! RPC method handler for the bookmark sync JSON-RPC protocol.
//!
//! Extracted from `rpc_server.rs` so it can be unit-tested independently.
//! The server loop awaits one request at a time. Bookmark calls clone the
//! active session out of the `App` and release the app lock before awaiting
//! the backend, so the lock is never held across a backend write.

use tokio::sync::Mutex;

use crate::app::App;
use crate::services::settings_engine::SettingsEngineTrait;
use crate::types::bookmark::Bookmark;
use crate::types::session::Route;

use serde_json::{json, Value};

/// Serializes a bookmark for clients.
pub fn bookmark_json(b: &Bookmark) -> Value {
    json!({
        "id": b.id,
        "title": b.title,
        "url": b.url,
        "user_id": b.user_id,
        "created_at": b.created_at,
    })
}

/// Builds the push notification sent whenever the list changes.
pub fn bookmarks_changed_event(bookmarks: &[Bookmark]) -> Value {
    let arr: Vec<Value> = bookmarks.iter().map(bookmark_json).collect();
    json!({"event": "bookmarks.changed", "bookmarks": arr})
}

/// Dispatch a JSON-RPC method call to the appropriate handler.
///
/// Returns `Ok(Value)` on success or `Err(String)` with an error message.
pub async fn handle_method(app: &Mutex<App>, method: &str, params: &Value) -> Result<Value, String> {
    match method {
        "ping" => Ok(json!({"pong": true})),

        // ─── Auth ───
        "auth.sign_in" => {
            let user_id = params.get("user_id").and_then(|v| v.as_str()).ok_or("missing user_id")?;
            let email = params.get("email").and_then(|v| v.as_str()).map(str::to_string);
            let mut a = app.lock().await;
            let session = a.sign_in(user_id, email).await.map_err(|e| e.to_string())?;
            let arr: Vec<Value> = session.bookmarks().iter().map(bookmark_json).collect();
            Ok(json!({"user_id": user_id, "bookmarks": arr}))
        }
        "auth.sign_out" => {
            let mut a = app.lock().await;
            a.sign_out();
            Ok(json!({"ok": true}))
        }
        "auth.status" => {
            let a = app.lock().await;
            serde_json::to_value(a.auth_state()).map_err(|e| e.to_string())
        }
        "route.resolve" => {
            let name = params.get("route").and_then(|v| v.as_str()).ok_or("missing route")?;
            let requested = Route::parse(name).ok_or_else(|| format!("unknown route: {}", name))?;
            let a = app.lock().await;
            Ok(json!({"route": a.resolve_route(requested).as_str()}))
        }

        // ─── Bookmarks ───
        "bookmark.list" => {
            let session = app.lock().await.session().map_err(|e| e.to_string())?;
            let arr: Vec<Value> = session.bookmarks().iter().map(bookmark_json).collect();
            Ok(json!(arr))
        }
        "bookmark.add" => {
            let title = params.get("title").and_then(|v| v.as_str()).ok_or("missing title")?;
            let url = params.get("url").and_then(|v| v.as_str()).ok_or("missing url")?;
            let session = app.lock().await.session().map_err(|e| e.to_string())?;
            let bookmark = session.add(title, url).await.map_err(|e| e.to_string())?;
            Ok(bookmark_json(&bookmark))
        }
        "bookmark.delete" => {
            let id = params.get("id").and_then(|v| v.as_str()).ok_or("missing id")?;
            let session = app.lock().await.session().map_err(|e| e.to_string())?;
            session.delete(id).await.map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }

        // ─── Settings ───
        "settings.get" => {
            let a = app.lock().await;
            serde_json::to_value(a.settings_engine.get_settings()).map_err(|e| e.to_string())
        }
        "settings.set" => {
            let key = params.get("key").and_then(|v| v.as_str()).ok_or("missing key")?;
            let value = params.get("value").cloned().ok_or("missing value")?;
            let mut a = app.lock().await;
            a.settings_engine.set_value(key, value).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }

        _ => Err(format!("unknown method: {}", method)),
    }
}
