//! Backend collaborator contract.
//!
//! The backend stores bookmarks and pushes change notifications. It is
//! treated as opaque: the reconciler only relies on the four operations of
//! [`BookmarkBackend`]. The change stream carries events for every user;
//! filtering by owner happens on the client.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::warn;

use crate::types::bookmark::Bookmark;
use crate::types::errors::BackendError;

/// Trait defining the storage backend operations.
#[async_trait]
pub trait BookmarkBackend: Send + Sync {
    /// Returns every bookmark owned by `owner_id`, newest first.
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Bookmark>, BackendError>;
    /// Persists a bookmark under its client-supplied id.
    async fn insert(&self, bookmark: &Bookmark) -> Result<(), BackendError>;
    /// Removes a bookmark by id. Removing an unknown id is not an error.
    async fn delete_by_id(&self, id: &str) -> Result<(), BackendError>;
    /// Opens a live stream of raw change payloads for the bookmarks table.
    fn subscribe_to_changes(&self) -> ChangeSubscription;
}

/// A live change stream. Dropping it unsubscribes.
pub struct ChangeSubscription {
    receiver: broadcast::Receiver<Value>,
}

impl ChangeSubscription {
    pub fn new(receiver: broadcast::Receiver<Value>) -> Self {
        Self { receiver }
    }

    /// Waits for the next change payload.
    ///
    /// Returns `None` once the backend has closed the stream. Payloads
    /// skipped because this subscriber fell behind are logged and skipped.
    pub async fn recv(&mut self) -> Option<Value> {
        loop {
            match self.receiver.recv().await {
                Ok(payload) => return Some(payload),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "change subscriber lagged; events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
