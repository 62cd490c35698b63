//! Persistent client session id.

use std::path::Path;

use chrono::Utc;

/// Read the session id stored at `path`, or create and store a new one.
///
/// New ids look like `sess_<unix-millis>`. A write failure is logged and the
/// fresh id is still returned, so the caller can chat for this run.
pub fn load_or_create_session_id(path: &Path) -> String {
    if let Ok(contents) = std::fs::read_to_string(path) {
        let id = contents.trim().to_string();
        if !id.is_empty() {
            tracing::debug!("Session id loaded from {}", path.display());
            return id;
        }
    }

    let id = format!("sess_{}", Utc::now().timestamp_millis());

    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!(error = %e, "Failed to create session directory {}", parent.display());
        }
    }
    if let Err(e) = std::fs::write(path, &id) {
        tracing::warn!(error = %e, "Failed to save session id to {}", path.display());
    } else {
        tracing::info!("New session id saved to {}", path.display());
    }

    id
}
