use serde::{Deserialize, Serialize};

/// The authenticated user behind a bookmark session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    pub user_id: String,
    pub email: Option<String>,
}

/// Authentication state supplied by the session collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AuthState {
    #[default]
    Anonymous,
    Authenticated(UserSession),
}

impl AuthState {
    /// Returns the current user's identifier, if signed in.
    pub fn user_id(&self) -> Option<&str> {
        match self {
            AuthState::Anonymous => None,
            AuthState::Authenticated(session) => Some(&session.user_id),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated(_))
    }
}

/// Views a client can navigate to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Login,
    Bookmarks,
}

impl Route {
    /// Parses a route name as sent by clients (`"login"`, `"bookmarks"`).
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim_start_matches('/') {
            "login" => Some(Route::Login),
            "bookmarks" | "" => Some(Route::Bookmarks),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Login => "login",
            Route::Bookmarks => "bookmarks",
        }
    }
}

/// Resolves where a request for `requested` should actually land.
///
/// Anonymous users are redirected to the login view; signed-in users are
/// redirected away from it.
pub fn resolve_route(requested: Route, auth: &AuthState) -> Route {
    match (requested, auth.is_authenticated()) {
        (Route::Bookmarks, false) => Route::Login,
        (Route::Login, true) => Route::Bookmarks,
        (route, _) => route,
    }
}
