//! Shared application state for HTTP handlers.

use kopi_db::Database;

/// State threaded through every axum handler.
///
/// `Database` is a cheap clone around the connection pool, so handlers
/// can grab repositories without locking.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        AppState { db }
    }
}
