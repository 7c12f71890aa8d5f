// Bookmark sync state managers
// The reconciler owns the list; the session drives it against a backend.

pub mod bookmark_reconciler;
pub mod bookmark_session;
