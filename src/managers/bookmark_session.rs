//! Bookmark Session.
//!
//! Drives a [`BookmarkReconciler`] against a [`BookmarkBackend`] for one
//! signed-in user. Local actions mutate the list before the backend call is
//! awaited and are rolled back if it fails; a background pump applies the
//! backend's change stream. The state lock is only ever held for synchronous
//! mutation, never across an `.await`, so local actions and remote events
//! interleave only at suspension points.
//!
//! The change subscription lives exactly as long as the session is active:
//! it is acquired in [`BookmarkSession::start`] and released by
//! [`BookmarkSession::end`] or when the session is dropped.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::managers::bookmark_reconciler::BookmarkReconciler;
use crate::services::backend::{BookmarkBackend, ChangeSubscription};
use crate::services::retry::RetryPolicy;
use crate::types::bookmark::Bookmark;
use crate::types::errors::ReconcileError;
use crate::types::settings::{DeleteRollback, ReconcileSettings};

/// State shared between the session and its change pump.
struct Shared {
    reconciler: BookmarkReconciler,
    /// Cleared under the lock when the session ends so the pump cannot
    /// apply another event afterwards.
    live: bool,
}

/// Mutates the shared state and publishes the list if it changed.
fn mutate<R>(
    shared: &Mutex<Shared>,
    view: &watch::Sender<Vec<Bookmark>>,
    f: impl FnOnce(&mut Shared) -> R,
) -> R {
    let mut guard = shared.lock().unwrap_or_else(PoisonError::into_inner);
    let result = f(&mut guard);
    let current = guard.reconciler.bookmarks();
    view.send_if_modified(|published| {
        if published.as_slice() == current {
            false
        } else {
            *published = current.to_vec();
            true
        }
    });
    result
}

/// An active bookmark view for one user.
pub struct BookmarkSession {
    owner: String,
    backend: Arc<dyn BookmarkBackend>,
    shared: Arc<Mutex<Shared>>,
    view: Arc<watch::Sender<Vec<Bookmark>>>,
    retry: RetryPolicy,
    delete_rollback: DeleteRollback,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl BookmarkSession {
    /// Starts a session: subscribes to changes, loads the user's bookmarks
    /// and begins applying remote events.
    ///
    /// The subscription is opened before the snapshot is read so no change
    /// committed in between is missed; replaying it is harmless.
    pub async fn start(
        backend: Arc<dyn BookmarkBackend>,
        user_id: &str,
        settings: &ReconcileSettings,
    ) -> Result<Self, ReconcileError> {
        if user_id.trim().is_empty() {
            return Err(ReconcileError::NotAuthenticated);
        }
        let subscription = backend.subscribe_to_changes();
        let retry = RetryPolicy::new(&settings.retry);
        let snapshot = retry
            .run("list_by_owner", || backend.list_by_owner(user_id))
            .await?;
        Ok(Self::from_parts(backend, user_id, snapshot, subscription, settings))
    }

    /// Starts a session from an externally supplied snapshot.
    pub fn with_snapshot(
        backend: Arc<dyn BookmarkBackend>,
        user_id: &str,
        snapshot: Vec<Bookmark>,
        settings: &ReconcileSettings,
    ) -> Self {
        let subscription = backend.subscribe_to_changes();
        Self::from_parts(backend, user_id, snapshot, subscription, settings)
    }

    fn from_parts(
        backend: Arc<dyn BookmarkBackend>,
        user_id: &str,
        snapshot: Vec<Bookmark>,
        subscription: ChangeSubscription,
        settings: &ReconcileSettings,
    ) -> Self {
        let reconciler = BookmarkReconciler::new(user_id, snapshot);
        let (view, _) = watch::channel(reconciler.bookmarks().to_vec());
        let shared = Arc::new(Mutex::new(Shared {
            reconciler,
            live: true,
        }));
        let view = Arc::new(view);
        let pump = Self::spawn_pump(subscription, shared.clone(), view.clone());

        info!(user_id, "bookmark session started");
        Self {
            owner: user_id.to_string(),
            backend,
            shared,
            view,
            retry: RetryPolicy::new(&settings.retry),
            delete_rollback: settings.delete_rollback,
            pump: Mutex::new(Some(pump)),
        }
    }

    fn spawn_pump(
        mut subscription: ChangeSubscription,
        shared: Arc<Mutex<Shared>>,
        view: Arc<watch::Sender<Vec<Bookmark>>>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(payload) = subscription.recv().await {
                let live = mutate(&shared, &view, |state| {
                    if state.live {
                        state.reconciler.apply_payload(&payload);
                    }
                    state.live
                });
                if !live {
                    break;
                }
            }
            debug!("change pump stopped");
        })
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut BookmarkReconciler) -> R) -> R {
        mutate(&self.shared, &self.view, |state| f(&mut state.reconciler))
    }

    /// The signed-in user this session belongs to.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Returns a copy of the current list, newest first.
    pub fn bookmarks(&self) -> Vec<Bookmark> {
        self.shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .reconciler
            .bookmarks()
            .to_vec()
    }

    /// Returns a receiver that observes every change to the list.
    pub fn watch(&self) -> watch::Receiver<Vec<Bookmark>> {
        self.view.subscribe()
    }

    /// Returns true while the change subscription is held.
    pub fn is_subscribed(&self) -> bool {
        self.shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .live
    }

    /// Adds a bookmark.
    ///
    /// The bookmark is visible in the list before this future first yields.
    /// If the backend ultimately fails the entry is removed again and the
    /// error is returned.
    pub async fn add(&self, title: &str, url: &str) -> Result<Bookmark, ReconcileError> {
        let bookmark = self.mutate(|r| r.begin_add(title, url))?;

        let backend = &self.backend;
        match self.retry.run("insert", || backend.insert(&bookmark)).await {
            Ok(()) => {
                debug!(id = %bookmark.id, "bookmark persisted");
                Ok(bookmark)
            }
            Err(err) => {
                warn!(id = %bookmark.id, error = %err, "insert failed; rolling back");
                self.mutate(|r| r.rollback_add(&bookmark.id));
                Err(err.into())
            }
        }
    }

    /// Deletes a bookmark.
    ///
    /// The entry disappears immediately. If the backend fails the list is
    /// restored according to the configured [`DeleteRollback`] strategy and
    /// the error is returned. Unknown ids leave the list unchanged.
    pub async fn delete(&self, id: &str) -> Result<(), ReconcileError> {
        let ticket = self.mutate(|r| r.begin_delete(id));

        let backend = &self.backend;
        match self.retry.run("delete_by_id", || backend.delete_by_id(id)).await {
            Ok(()) => Ok(()),
            Err(err) => {
                warn!(id, error = %err, "delete failed; rolling back");
                let mode = self.delete_rollback;
                self.mutate(|r| r.rollback_delete(ticket, mode));
                Err(err.into())
            }
        }
    }

    /// Releases the change subscription. Idempotent.
    ///
    /// No remote event is applied after this returns. The list keeps its
    /// last state; local add/delete still work but no longer see echoes.
    pub fn end(&self) {
        {
            let mut state = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
            state.live = false;
        }
        let pump = self
            .pump
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(pump) = pump {
            pump.abort();
            info!(user_id = %self.owner, "bookmark session ended");
        }
    }
}

impl Drop for BookmarkSession {
    fn drop(&mut self) {
        self.end();
    }
}
