//! Session identity.
//!
//! Each shell session gets its own session store file so that concurrent
//! shells never see each other's session-scoped values. The identifier comes
//! from `POSH_SESSION_ID` when the shell integration exports one, otherwise a
//! fresh UUID is generated and kept for the lifetime of the process.

use std::sync::OnceLock;

use tracing::debug;
use uuid::Uuid;

use crate::config::SESSION_ID_ENV;

static SESSION_ID: OnceLock<String> = OnceLock::new();

/// The process-wide session identifier. The first call decides it.
pub fn session_id() -> &'static str {
    SESSION_ID.get_or_init(|| resolve_session_id(std::env::var(SESSION_ID_ENV).ok()))
}

/// Pick the session identifier from an optional externally supplied value.
pub fn resolve_session_id(supplied: Option<String>) -> String {
    match supplied {
        Some(id) if !id.trim().is_empty() => id.trim().to_string(),
        _ => {
            let id = Uuid::new_v4().to_string();
            debug!(session_id = %id, "Generated session identifier");
            id
        }
    }
}
