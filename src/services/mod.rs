// Bookmark sync services
// Backend contract and its SQLite implementation, retry policy, settings.

pub mod backend;
pub mod retry;
pub mod settings_engine;
pub mod sqlite_backend;
