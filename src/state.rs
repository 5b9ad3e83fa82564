//! Shared application state.
//!
//! Cheap to clone — every part is an `Arc`-backed handle or small config.

use crate::auth::AuthTokens;
use crate::db::Database;
use crate::email::Mailer;
use crate::upload::UploadStore;

/// Server-level settings threaded through handlers.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Origin of the front end, used for CORS and reset links.
    pub frontend_url: String,
    /// Disable the MX deliverability check on registration (offline/dev).
    pub skip_mx_check: bool,
    /// Allow any CORS origin (development).
    pub permissive_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            frontend_url: "http://localhost:3000".to_string(),
            skip_mx_check: false,
            permissive_cors: false,
        }
    }
}

/// Shared server state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub uploads: UploadStore,
    pub mailer: Mailer,
    pub tokens: AuthTokens,
    pub config: ServerConfig,
}
