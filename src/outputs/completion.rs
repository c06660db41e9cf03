//! Completion tracking.
//!
//! The set of story ids a previous cycle already handled, read from the
//! download root once at the start of each cycle.

use super::COMPLETE_MARKER;
use crate::config::CompletionMode;
use crate::error::CrawlError;
use std::collections::HashSet;
use std::path::Path;
use tokio::fs;
use tracing::{debug, instrument};

/// Story ids considered done.
///
/// In [`CompletionMode::Directory`] that is every immediate subdirectory of
/// `root`, including empty ones. In [`CompletionMode::Marker`] only
/// subdirectories holding the completion marker count.
///
/// # Arguments
///
/// * `root` - The download root
/// * `mode` - Which subdirectories count as done
///
/// # Returns
///
/// Names of the qualifying subdirectories. Non-UTF-8 names are skipped.
///
/// # Errors
///
/// [`CrawlError::MissingRoot`] if `root` is not an existing directory. The
/// root is never created here. [`CrawlError::Io`] if listing it fails.
#[instrument(level = "debug", skip_all, fields(root = %root.display(), ?mode))]
pub async fn already_done(
    root: &Path,
    mode: CompletionMode,
) -> Result<HashSet<String>, CrawlError> {
    if !fs::metadata(root).await.map(|m| m.is_dir()).unwrap_or(false) {
        return Err(CrawlError::MissingRoot(root.to_path_buf()));
    }

    let mut done = HashSet::new();
    let mut entries = fs::read_dir(root).await.map_err(|e| CrawlError::io(root, e))?;
    while let Some(entry) = entries.next_entry().await.map_err(|e| CrawlError::io(root, e))? {
        let is_dir = entry
            .file_type()
            .await
            .map(|t| t.is_dir())
            .unwrap_or(false);
        if !is_dir {
            continue;
        }
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if mode == CompletionMode::Marker
            && !fs::try_exists(entry.path().join(COMPLETE_MARKER))
                .await
                .unwrap_or(false)
        {
            continue;
        }
        done.insert(name);
    }

    debug!(count = done.len(), "Read completion set");
    Ok(done)
}
