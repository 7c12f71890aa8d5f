//! App Core for bookmark sync.
//!
//! Holds the backend, the settings engine and the signed-in user's bookmark
//! session. Signing in starts a session; signing out or switching users
//! tears the previous one down before anything else happens, so a change
//! stream never outlives the user it was opened for.

use std::sync::Arc;

use tracing::info;

use crate::database::connection::Database;
use crate::managers::bookmark_session::BookmarkSession;
use crate::services::backend::BookmarkBackend;
use crate::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use crate::services::sqlite_backend::SqliteBackend;
use crate::types::errors::ReconcileError;
use crate::types::session::{resolve_route, AuthState, Route, UserSession};

/// Central application struct.
pub struct App {
    pub backend: Arc<dyn BookmarkBackend>,
    pub settings_engine: SettingsEngine,
    auth: AuthState,
    session: Option<Arc<BookmarkSession>>,
}

impl App {
    /// Creates a new App backed by the SQLite store named in the settings.
    pub fn new(mut settings_engine: SettingsEngine) -> Result<Self, Box<dyn std::error::Error>> {
        settings_engine.load()?;
        let db = Database::open(settings_engine.database_path())?;
        let backend = SqliteBackend::new(db, settings_engine.get_settings().sync.change_buffer);
        Ok(Self::with_backend(Arc::new(backend), settings_engine))
    }

    /// Creates an App over an arbitrary backend.
    pub fn with_backend(backend: Arc<dyn BookmarkBackend>, settings_engine: SettingsEngine) -> Self {
        Self {
            backend,
            settings_engine,
            auth: AuthState::Anonymous,
            session: None,
        }
    }

    pub fn auth_state(&self) -> &AuthState {
        &self.auth
    }

    /// Signs `user_id` in and starts their bookmark session.
    ///
    /// Any existing session is ended first, even when signing in as the same user.
    pub async fn sign_in(
        &mut self,
        user_id: &str,
        email: Option<String>,
    ) -> Result<Arc<BookmarkSession>, ReconcileError> {
        if user_id.trim().is_empty() {
            return Err(ReconcileError::Validation("user id must not be empty".to_string()));
        }
        self.sign_out();

        let settings = self.settings_engine.get_settings().sync.clone();
        let session = Arc::new(BookmarkSession::start(self.backend.clone(), user_id, &settings).await?);

        self.auth = AuthState::Authenticated(UserSession {
            user_id: user_id.to_string(),
            email,
        });
        self.session = Some(session.clone());
        info!(user_id, "signed in");
        Ok(session)
    }

    /// Signs the current user out and releases their change subscription.
    pub fn sign_out(&mut self) {
        if let Some(session) = self.session.take() {
            session.end();
            info!(user_id = session.owner(), "signed out");
        }
        self.auth = AuthState::Anonymous;
    }

    /// Returns the active bookmark session.
    pub fn session(&self) -> Result<Arc<BookmarkSession>, ReconcileError> {
        self.session.clone().ok_or(ReconcileError::NotAuthenticated)
    }

    /// Resolves a navigation request against the current auth state.
    pub fn resolve_route(&self, requested: Route) -> Route {
        resolve_route(requested, &self.auth)
    }
}
