//! bookmark-sync: personal bookmark manager sync core.
//!
//! Keeps a signed-in user's bookmark list consistent across optimistic local
//! edits and the backend's live change stream. This library crate exposes all
//! modules for use by the RPC binary and integration tests.

pub mod app;
pub mod database;
pub mod managers;
pub mod platform;
pub mod rpc_handler;
pub mod services;
pub mod types;
