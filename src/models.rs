//! Data models shared across the pipeline.
//!
//! - [`Story`]: one front-page entry and the links discovered in its thread
//! - [`Fetched`]: an HTTP response as seen by the pipeline
//! - [`DownloadTarget`]: one `(story, url)` pair handed to the scheduler
//! - [`CycleReport`]: aggregate counts for one poll cycle

use crate::error::FetchFailure;

/// A story from the front-page listing.
///
/// Created fresh every cycle. `comment_urls` stays empty until the thread has
/// been inspected by the comment extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Story {
    /// The listing row's identifier, also the story's directory name.
    pub id: String,
    /// The story's own link, absolute.
    pub primary_url: String,
    /// Links found in top-level comments, in page order.
    pub comment_urls: Vec<String>,
}

impl Story {
    pub fn new(id: impl Into<String>, primary_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            primary_url: primary_url.into(),
            comment_urls: Vec::new(),
        }
    }

    /// Everything to download for this story: the primary link first, then
    /// every comment link.
    pub fn download_targets(&self) -> impl Iterator<Item = DownloadTarget<'_>> {
        std::iter::once(self.primary_url.as_str())
            .chain(self.comment_urls.iter().map(String::as_str))
            .map(move |url| DownloadTarget {
                story_id: &self.id,
                url,
            })
    }
}

/// One URL to download on behalf of a story.
///
/// Not deduplicated across stories: a URL shared by two stories is fetched
/// twice and lands in both directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadTarget<'a> {
    pub story_id: &'a str,
    pub url: &'a str,
}

/// An HTTP response. `body` is only present for status 200.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    pub status: u16,
    pub body: Option<Vec<u8>>,
}

impl Fetched {
    /// A 200 response carrying `body`.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: Some(body.into()),
        }
    }

    /// A response with `status` and no body kept.
    pub fn status(status: u16) -> Self {
        Self { status, body: None }
    }

    /// The body, if this was a 200 response.
    pub fn into_body(self) -> Option<Vec<u8>> {
        match self.status {
            200 => self.body,
            _ => None,
        }
    }
}

/// Result of a single fetch.
pub type FetchResult = Result<Fetched, FetchFailure>;

/// Status of a fetch result, with failures reported as the sentinel 500.
pub fn status_of(result: &FetchResult) -> u16 {
    match result {
        Ok(fetched) => fetched.status,
        Err(failure) => failure.status(),
    }
}

/// Aggregate counts for one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Stories not found in the completion set.
    pub eligible_stories: usize,
    /// Download tasks run in phase 2.
    pub attempted: usize,
    /// Files written.
    pub downloaded: usize,
    /// Tasks that wrote nothing (non-200, transport failure, write error).
    pub failed: usize,
    /// Stories with at least one file written.
    pub stories_with_downloads: usize,
}

impl CycleReport {
    /// The human-readable one-liner logged after each cycle.
    pub fn summary(&self) -> String {
        if self.attempted == 0 {
            "There is nothing new to download".to_string()
        } else {
            format!(
                "Downloaded {} links for {} stories",
                self.downloaded, self.stories_with_downloads
            )
        }
    }
}
