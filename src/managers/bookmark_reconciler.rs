//! Bookmark Reconciler.
//!
//! Owns the in-memory, newest-first list of the current user's bookmarks and
//! merges three inputs into it: the initial snapshot, local optimistic
//! mutations, and remote change events. The reconciler performs no I/O; the
//! async driver in [`crate::managers::bookmark_session`] calls `begin_*`
//! before talking to the backend and `rollback_*` when the backend fails.
//!
//! Invariants held after every call:
//! - no two entries share an `id`
//! - every entry belongs to `owner`
//! - entries are ordered by insertion, newest first

use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::types::bookmark::{Bookmark, ChangeEvent};
use crate::types::errors::ReconcileError;
use crate::types::settings::DeleteRollback;

/// State captured by [`BookmarkReconciler::begin_delete`] so a failed
/// delete can be undone.
#[derive(Debug, Clone)]
pub struct DeleteTicket {
    pub id: String,
    /// The full list as it was right before the optimistic removal.
    pub snapshot: Vec<Bookmark>,
    /// Index and value of the removed entry, if it was present.
    pub removed: Option<(usize, Bookmark)>,
}

/// In-memory bookmark list for a single user.
#[derive(Debug, Clone)]
pub struct BookmarkReconciler {
    owner: String,
    list: Vec<Bookmark>,
}

impl BookmarkReconciler {
    /// Creates a reconciler seeded from the initial snapshot.
    ///
    /// Rows owned by someone else and repeated ids are dropped; the first
    /// occurrence of an id wins. Snapshot order is kept as given.
    pub fn new(owner: impl Into<String>, snapshot: Vec<Bookmark>) -> Self {
        let owner = owner.into();
        let mut list: Vec<Bookmark> = Vec::with_capacity(snapshot.len());
        for bookmark in snapshot {
            if bookmark.user_id != owner {
                debug!(id = %bookmark.id, "dropping foreign bookmark from snapshot");
                continue;
            }
            if list.iter().any(|b| b.id == bookmark.id) {
                debug!(id = %bookmark.id, "dropping duplicate bookmark from snapshot");
                continue;
            }
            list.push(bookmark);
        }
        Self { owner, list }
    }

    /// Returns the current UNIX timestamp in seconds.
    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Returns the bookmarks, newest first.
    pub fn bookmarks(&self) -> &[Bookmark] {
        &self.list
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.list.iter().any(|b| b.id == id)
    }

    /// Validates input and builds a new bookmark with a fresh client id.
    pub fn prepare(&self, title: &str, url: &str) -> Result<Bookmark, ReconcileError> {
        if title.is_empty() {
            return Err(ReconcileError::Validation("title must not be empty".to_string()));
        }
        if url.is_empty() {
            return Err(ReconcileError::Validation("url must not be empty".to_string()));
        }
        Ok(Bookmark {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            url: url.to_string(),
            user_id: self.owner.clone(),
            created_at: Self::now(),
        })
    }

    /// Optimistically adds a bookmark. Returns the record to persist.
    pub fn begin_add(&mut self, title: &str, url: &str) -> Result<Bookmark, ReconcileError> {
        let bookmark = self.prepare(title, url)?;
        self.list.insert(0, bookmark.clone());
        debug!(id = %bookmark.id, "optimistic add");
        Ok(bookmark)
    }

    /// Undoes an optimistic add. Returns true if the entry was still present.
    pub fn rollback_add(&mut self, id: &str) -> bool {
        let removed = self.remove(id).is_some();
        debug!(id, removed, "rolled back add");
        removed
    }

    /// Optimistically removes `id`, capturing what is needed to undo it.
    ///
    /// An unknown id leaves the list untouched.
    pub fn begin_delete(&mut self, id: &str) -> DeleteTicket {
        let snapshot = self.list.clone();
        let removed = self.remove(id);
        debug!(id, present = removed.is_some(), "optimistic delete");
        DeleteTicket {
            id: id.to_string(),
            snapshot,
            removed,
        }
    }

    /// Undoes an optimistic delete using the given strategy.
    pub fn rollback_delete(&mut self, ticket: DeleteTicket, mode: DeleteRollback) {
        match mode {
            DeleteRollback::Snapshot => {
                self.list = ticket.snapshot;
            }
            DeleteRollback::ReinsertEntry => {
                let Some((index, bookmark)) = ticket.removed else {
                    return;
                };
                if self.contains(&bookmark.id) {
                    return;
                }
                // Land just before the nearest older neighbour that survived.
                let position = ticket.snapshot[index + 1..]
                    .iter()
                    .find_map(|older| self.position(&older.id))
                    .unwrap_or(self.list.len());
                self.list.insert(position, bookmark);
            }
        }
        debug!(id = %ticket.id, ?mode, "rolled back delete");
    }

    /// Applies a remote change event. Returns true if the list changed.
    ///
    /// Applying the same event twice has the same effect as applying it once.
    pub fn apply_remote(&mut self, event: ChangeEvent) -> bool {
        match event {
            ChangeEvent::Insert(bookmark) => {
                if bookmark.user_id != self.owner {
                    return false;
                }
                if self.contains(&bookmark.id) {
                    debug!(id = %bookmark.id, "ignoring echoed insert");
                    return false;
                }
                debug!(id = %bookmark.id, "remote insert");
                self.list.insert(0, bookmark);
                true
            }
            ChangeEvent::Delete { id } => {
                let removed = self.remove(&id).is_some();
                if removed {
                    debug!(id = %id, "remote delete");
                }
                removed
            }
        }
    }

    /// Decodes and applies a raw change payload. Malformed payloads are dropped.
    pub fn apply_payload(&mut self, payload: &Value) -> bool {
        match ChangeEvent::from_payload(payload) {
            Some(event) => self.apply_remote(event),
            None => {
                debug!("dropping unrecognized change payload");
                false
            }
        }
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.list.iter().position(|b| b.id == id)
    }

    fn remove(&mut self, id: &str) -> Option<(usize, Bookmark)> {
        let index = self.position(id)?;
        Some((index, self.list.remove(index)))
    }
}
