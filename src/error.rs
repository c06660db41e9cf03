//! Error types for the crawler.
//!
//! Two layers of failure exist:
//! - [`FetchFailure`]: a single URL could not be fetched. Always absorbed by the
//!   caller; the URL is simply not downloaded this cycle.
//! - [`CrawlError`]: conditions that abort a cycle or the whole process
//!   (front page unreachable, download root missing, bad configuration).

use std::path::PathBuf;
use thiserror::Error;

/// Sentinel status reported for a fetch that never produced an HTTP response.
pub const FAILED_FETCH_STATUS: u16 = 500;

/// Why a fetch produced no HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    #[error("timed out")]
    Timeout,
    #[error("connection refused or reset")]
    ConnectionRefused,
    #[error("{0}")]
    Other(String),
}

impl FetchFailure {
    /// Status code callers see in place of a real response.
    pub fn status(&self) -> u16 {
        FAILED_FETCH_STATUS
    }
}

/// Errors that stop a cycle or the process.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("front page {url} returned status {status}")]
    FrontPage { url: String, status: u16 },

    #[error("download directory {} does not exist; create it before starting", .0.display())]
    MissingRoot(PathBuf),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read config file {}: {source}", path.display())]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("concurrency limiter closed")]
    LimiterClosed,
}

impl CrawlError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CrawlError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the poll loop must end. Only an unreachable front page is;
    /// anything else costs at most the current cycle.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CrawlError::FrontPage { .. })
    }
}
