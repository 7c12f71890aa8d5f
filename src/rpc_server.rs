//! Bookmark sync RPC Server: JSON-RPC over stdin/stdout.
//!
//! Protocol: one JSON object per line (newline-delimited JSON).
//! Request:  {"id":1, "method":"bookmark.add", "params":{"title":"...","url":"..."}}
//! Response: {"id":1, "result":{...}} or {"id":1, "error":"..."}
//! Push:     {"event":"bookmarks.changed", "bookmarks":[...]}
//!
//! Logs go to stderr; stdout carries only protocol lines.

use std::io::{self, Write};
use std::time::Instant;

use bookmark_sync::app::App;
use bookmark_sync::rpc_handler::{bookmarks_changed_event, handle_method};
use bookmark_sync::services::settings_engine::{SettingsEngine, SettingsEngineTrait};

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Simple rate limiter: max requests per second.
struct RateLimiter {
    window_start: Instant,
    request_count: u32,
    max_per_second: u32,
}

impl RateLimiter {
    fn new(max_per_second: u32) -> Self {
        Self { window_start: Instant::now(), request_count: 0, max_per_second }
    }

    /// Returns true if the request is allowed, false if rate-limited.
    fn check(&mut self) -> bool {
        if self.window_start.elapsed().as_secs() >= 1 {
            self.window_start = Instant::now();
            self.request_count = 0;
        }
        self.request_count += 1;
        self.request_count <= self.max_per_second
    }
}

fn emit(line: &Value) {
    let mut out = io::stdout().lock();
    let _ = writeln!(out, "{}", line);
    let _ = out.flush();
}

/// Forwards list changes of the current session as push events.
async fn spawn_forwarder(app: &Mutex<App>) -> Option<JoinHandle<()>> {
    let session = app.lock().await.session().ok()?;
    let mut changes = session.watch();
    drop(session);
    Some(tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            let event = bookmarks_changed_event(&changes.borrow_and_update());
            emit(&event);
        }
    }))
}

#[tokio::main]
async fn main() {
    let mut settings_engine = SettingsEngine::new(std::env::var("BOOKMARK_SYNC_CONFIG").ok());
    let log_filter = settings_engine
        .load()
        .map(|s| s.logging.filter)
        .unwrap_or_else(|_| "bookmark_sync=info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_filter)))
        .with_writer(io::stderr)
        .init();

    let app = match App::new(settings_engine) {
        Ok(app) => Mutex::new(app),
        Err(e) => {
            error!(error = %e, "failed to initialize");
            std::process::exit(1);
        }
    };

    emit(&json!({"event":"ready","version":env!("CARGO_PKG_VERSION")}));
    info!("rpc server ready");

    let mut rate_limiter = RateLimiter::new(200);
    let mut forwarder: Option<JoinHandle<()>> = None;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() { continue; }

        let req: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                emit(&json!({"id":null,"error":format!("parse error: {}",e)}));
                continue;
            }
        };

        let id = req.get("id").cloned().unwrap_or(Value::Null);

        if !rate_limiter.check() {
            emit(&json!({"id": id, "error": "rate limit exceeded"}));
            continue;
        }

        let method = req.get("method").and_then(|v| v.as_str()).unwrap_or("");
        let params = req.get("params").cloned().unwrap_or(json!({}));

        let result = handle_method(&app, method, &params).await;

        if method.starts_with("auth.sign_") {
            if let Some(task) = forwarder.take() {
                task.abort();
            }
            forwarder = spawn_forwarder(&app).await;
        }

        let response = match result {
            Ok(val) => json!({"id": id, "result": val}),
            Err(err) => json!({"id": id, "error": err}),
        };
        emit(&response);
    }

    app.lock().await.sign_out();
}
