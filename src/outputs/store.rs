//! Writing into the download tree.

use super::COMPLETE_MARKER;
use super::completion::already_done;
use crate::config::CompletionMode;
use crate::error::CrawlError;
use crate::utils::url_filename;
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, instrument};

/// Handle on the download root.
#[derive(Debug, Clone)]
pub struct DownloadStore {
    root: PathBuf,
    mode: CompletionMode,
}

impl DownloadStore {
    /// Store rooted at `root`. Nothing is touched on disk until the first
    /// write.
    pub fn new(root: impl Into<PathBuf>, mode: CompletionMode) -> Self {
        Self {
            root: root.into(),
            mode,
        }
    }

    /// How finished stories are recognised.
    pub fn mode(&self) -> CompletionMode {
        self.mode
    }

    pub fn story_dir(&self, story_id: &str) -> PathBuf {
        self.root.join(story_id)
    }

    /// Story ids handled by a previous cycle.
    pub async fn completed(&self) -> Result<HashSet<String>, CrawlError> {
        already_done(&self.root, self.mode).await
    }

    /// Create the story's directory if it does not exist yet.
    ///
    /// Only the story directory itself is created: if the root has gone
    /// missing this fails instead of recreating it.
    pub async fn ensure_story_dir(&self, story_id: &str) -> Result<PathBuf, CrawlError> {
        let dir = self.story_dir(story_id);
        match fs::create_dir(&dir).await {
            Ok(()) => {
                debug!(story_id, "Created story directory");
                Ok(dir)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(dir),
            Err(e) => Err(CrawlError::io(dir, e)),
        }
    }

    /// Write a downloaded body into the story's directory, named after the
    /// URL. The whole body is written in one call.
    #[instrument(level = "debug", skip(self, body), fields(bytes = body.len()))]
    pub async fn write(
        &self,
        story_id: &str,
        url: &str,
        body: &[u8],
    ) -> Result<PathBuf, CrawlError> {
        let path = self.story_dir(story_id).join(url_filename(url));
        fs::write(&path, body)
            .await
            .map_err(|e| CrawlError::io(&path, e))?;
        Ok(path)
    }

    /// Drop the completion marker into the story's directory.
    pub async fn mark_complete(&self, story_id: &str) -> Result<(), CrawlError> {
        let path = self.story_dir(story_id).join(COMPLETE_MARKER);
        fs::write(&path, b"")
            .await
            .map_err(|e| CrawlError::io(&path, e))
    }
}
