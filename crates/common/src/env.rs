//! Environment/runtime helpers
//!
//! Sanity checks to ensure expected directories exist at startup.

use std::path::Path;

use tracing::debug;

/// Create the parent directory of a data file if it does not exist yet.
///
/// Bare file names (`db.json`) resolve to the working directory and need nothing.
pub async fn ensure_parent_dir(file: &Path) -> std::io::Result<()> {
    match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            if tokio::fs::metadata(parent).await.is_err() {
                debug!(dir = %parent.display(), "creating data directory");
            }
            tokio::fs::create_dir_all(parent).await
        }
        _ => Ok(()),
    }
}
