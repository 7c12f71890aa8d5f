use thiserror::Error;

// === BackendError ===

/// Errors reported by the storage backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// The backend could not be reached. Transient; worth retrying.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
    /// The backend refused the request (constraint violation, permissions).
    #[error("Backend rejected request: {0}")]
    Rejected(String),
    /// A storage-level failure inside the backend.
    #[error("Backend database error: {0}")]
    Database(String),
}

impl BackendError {
    /// Returns true if the same request may succeed when retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, BackendError::Unavailable(_))
    }
}

impl From<rusqlite::Error> for BackendError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, msg)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                BackendError::Rejected(msg.clone().unwrap_or_else(|| err.to_string()))
            }
            rusqlite::Error::SqliteFailure(code, _)
                if matches!(
                    code.code,
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                ) =>
            {
                BackendError::Unavailable(err.to_string())
            }
            _ => BackendError::Database(err.to_string()),
        }
    }
}

// === ReconcileError ===

/// Errors surfaced to callers of bookmark operations.
///
/// None of these are fatal: validation errors leave state untouched and
/// persistence errors have already been rolled back when they are returned.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReconcileError {
    /// The input was rejected before any state change.
    #[error("Invalid bookmark: {0}")]
    Validation(String),
    /// The backend failed; local state was rolled back.
    #[error("Failed to save changes: {0}")]
    Persistence(#[from] BackendError),
    /// No user is signed in.
    #[error("Not authenticated")]
    NotAuthenticated,
}

// === SettingsError ===

/// Errors related to settings management.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// An I/O error occurred while reading or writing settings.
    #[error("Settings I/O error: {0}")]
    IoError(String),
    /// Failed to serialize or deserialize settings.
    #[error("Settings serialization error: {0}")]
    SerializationError(String),
    /// The provided settings key is invalid.
    #[error("Invalid settings key: {0}")]
    InvalidKey(String),
    /// The provided settings value is invalid.
    #[error("Invalid settings value: {0}")]
    InvalidValue(String),
}
