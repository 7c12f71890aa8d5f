//! SQLite-backed implementation of [`BookmarkBackend`].
//!
//! Stands in for the hosted backend: rows live in a local `rusqlite`
//! database and every committed insert or delete is broadcast to all
//! change subscribers as a raw payload, regardless of owner.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::params;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

use crate::database::connection::Database;
use crate::services::backend::{BookmarkBackend, ChangeSubscription};
use crate::types::bookmark::{Bookmark, ChangeEvent};
use crate::types::errors::BackendError;

/// Default per-subscriber buffer for change payloads.
pub const DEFAULT_CHANGE_BUFFER: usize = 256;

/// Bookmark backend over a local SQLite database.
pub struct SqliteBackend {
    db: Mutex<Database>,
    changes: broadcast::Sender<Value>,
}

impl SqliteBackend {
    /// Wraps an opened database.
    pub fn new(db: Database, change_buffer: usize) -> Self {
        let (changes, _) = broadcast::channel(change_buffer.max(1));
        Self {
            db: Mutex::new(db),
            changes,
        }
    }

    /// Opens an in-memory backend, mostly for tests.
    pub fn open_in_memory() -> Result<Self, BackendError> {
        let db = Database::open_in_memory()?;
        Ok(Self::new(db, DEFAULT_CHANGE_BUFFER))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Database>, BackendError> {
        self.db
            .lock()
            .map_err(|e| BackendError::Unavailable(format!("database lock poisoned: {}", e)))
    }

    /// Broadcasts a change. Having no subscribers is not an error.
    fn publish(&self, event: ChangeEvent) {
        let receivers = self.changes.send(event.to_payload()).unwrap_or(0);
        debug!(id = event.id(), receivers, "published change");
    }

    /// Reads a single `Bookmark` row into a struct.
    fn row_to_bookmark(row: &rusqlite::Row) -> rusqlite::Result<Bookmark> {
        Ok(Bookmark {
            id: row.get(0)?,
            title: row.get(1)?,
            url: row.get(2)?,
            user_id: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    /// Returns the number of open change subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.changes.receiver_count()
    }

    /// Returns the number of stored bookmarks across all owners.
    pub fn count(&self) -> Result<i64, BackendError> {
        let db = self.lock()?;
        let count = db
            .connection()
            .query_row("SELECT COUNT(*) FROM bookmarks", [], |row| row.get(0))?;
        Ok(count)
    }
}

#[async_trait]
impl BookmarkBackend for SqliteBackend {
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Bookmark>, BackendError> {
        let db = self.lock()?;
        let mut stmt = db.connection().prepare(
            "SELECT id, title, url, user_id, created_at FROM bookmarks \
             WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC",
        )?;
        let rows = stmt.query_map(params![owner_id], Self::row_to_bookmark)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    async fn insert(&self, bookmark: &Bookmark) -> Result<(), BackendError> {
        {
            let db = self.lock()?;
            db.connection().execute(
                "INSERT INTO bookmarks (id, title, url, user_id, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    bookmark.id,
                    bookmark.title,
                    bookmark.url,
                    bookmark.user_id,
                    bookmark.created_at
                ],
            )?;
        }
        self.publish(ChangeEvent::Insert(bookmark.clone()));
        Ok(())
    }

    async fn delete_by_id(&self, id: &str) -> Result<(), BackendError> {
        let affected = {
            let db = self.lock()?;
            db.connection()
                .execute("DELETE FROM bookmarks WHERE id = ?1", params![id])?
        };
        if affected > 0 {
            self.publish(ChangeEvent::Delete { id: id.to_string() });
        }
        Ok(())
    }

    fn subscribe_to_changes(&self) -> ChangeSubscription {
        ChangeSubscription::new(self.changes.subscribe())
    }
}
