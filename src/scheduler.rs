//! Download scheduling for one cycle.
//!
//! Work runs in two phases, both gated by the shared [`Limiter`]:
//!
//! 1. **Discovery**: every eligible story's thread is fetched and its
//!    top-level comment links collected. All of these are joined before
//!    anything else happens.
//! 2. **Download**: every `(story, url)` target is fetched concurrently and
//!    each 200 body is written to the story's directory.
//!
//! The story directory is created before its fetch starts. In directory
//! completion mode that means a story whose fetches all fail is still
//! considered done by the next cycle; marker mode closes that gap.
//!
//! Everything runs as futures joined on the caller's task, nothing is
//! spawned.

use crate::config::CompletionMode;
use crate::fetcher::Fetch;
use crate::limiter::Limiter;
use crate::models::{CycleReport, DownloadTarget, Story};
use crate::outputs::store::DownloadStore;
use crate::scrapers::thread::extract_comment_links;
use futures::future::join_all;
use std::collections::BTreeSet;
use tracing::{error, info, instrument, warn};

/// Run one cycle: discover comment links, then download every target.
///
/// # Arguments
///
/// * `stories` - Eligible stories; completed ones must already be filtered out
/// * `fetcher` - Used for both thread and download fetches
/// * `limiter` - Bounds every fetch made by the cycle
/// * `store` - Where bodies and completion markers are written
///
/// # Returns
///
/// Counts for the cycle. Individual fetch and write failures are logged and
/// counted, never returned.
#[instrument(level = "info", skip_all, fields(stories = stories.len()))]
pub async fn run_cycle<F: Fetch>(
    mut stories: Vec<Story>,
    fetcher: &F,
    limiter: &Limiter,
    store: &DownloadStore,
) -> CycleReport {
    discover_links(&mut stories, fetcher, limiter).await;

    let targets: Vec<DownloadTarget<'_>> =
        stories.iter().flat_map(|story| story.download_targets()).collect();
    info!(targets = targets.len(), "Link discovery finished; downloading");

    let results = join_all(
        targets
            .iter()
            .map(|target| download_one(*target, fetcher, limiter, store)),
    )
    .await;

    let stories_written: BTreeSet<&str> = targets
        .iter()
        .zip(&results)
        .filter(|(_, written)| **written)
        .map(|(target, _)| target.story_id)
        .collect();

    if store.mode() == CompletionMode::Marker {
        for story_id in &stories_written {
            if let Err(e) = store.mark_complete(story_id).await {
                error!(story_id, error = %e, "Failed to write completion marker");
            }
        }
    }

    let downloaded = results.iter().filter(|w| **w).count();
    CycleReport {
        eligible_stories: stories.len(),
        attempted: results.len(),
        downloaded,
        failed: results.len() - downloaded,
        stories_with_downloads: stories_written.len(),
    }
}

/// Phase 1: fill in `comment_urls` for every story. Returns only once every
/// thread fetch has finished, successfully or not.
async fn discover_links<F: Fetch>(stories: &mut [Story], fetcher: &F, limiter: &Limiter) {
    let discovered = join_all(stories.iter().map(|story| async move {
        match limiter.acquire().await {
            Ok(_permit) => extract_comment_links(fetcher, &story.id).await,
            Err(e) => {
                warn!(story_id = %story.id, error = %e, "Skipping thread");
                Vec::new()
            }
        }
    }))
    .await;

    for (story, links) in stories.iter_mut().zip(discovered) {
        story.comment_urls = links;
    }
}

/// Phase 2 task: download one target. Returns whether a file was written.
async fn download_one<F: Fetch>(
    target: DownloadTarget<'_>,
    fetcher: &F,
    limiter: &Limiter,
    store: &DownloadStore,
) -> bool {
    let DownloadTarget { story_id, url } = target;
    if let Err(e) = store.ensure_story_dir(story_id).await {
        error!(story_id, error = %e, "Cannot create story directory");
        return false;
    }

    let _permit = match limiter.acquire().await {
        Ok(permit) => permit,
        Err(e) => {
            warn!(story_id, %url, error = %e, "Skipping download");
            return false;
        }
    };

    info!(story_id, %url, "Downloading url({story_id}): {url}");
    let Some(body) = fetcher.fetch(url).await.ok().and_then(|f| f.into_body()) else {
        return false;
    };

    match store.write(story_id, url, &body).await {
        Ok(_) => true,
        Err(e) => {
            error!(story_id, %url, error = %e, "Failed to save download");
            false
        }
    }
}
