//! The poll loop.
//!
//! [`Poller`] cycles through three states until stopped:
//!
//! ```text
//! FetchListing ──► ProcessCycle ──► Sleep ──┐
//!      ▲                                    │
//!      └────────────────────────────────────┘
//! ```
//!
//! - `FetchListing`: a front page that does not answer 200 is fatal.
//! - `ProcessCycle`: extract stories, drop completed ones, run the scheduler.
//!   A missing or unreadable download root skips the cycle.
//! - `Sleep`: wait for the refresh interval, or until [`StopHandle::stop`].
//!
//! Stopping never interrupts a cycle; the current one runs to completion and
//! no new one starts.

use crate::config::Settings;
use crate::error::CrawlError;
use crate::fetcher::Fetch;
use crate::limiter::Limiter;
use crate::markup::HtmlDocument;
use crate::models::{CycleReport, status_of};
use crate::outputs::store::DownloadStore;
use crate::scheduler;
use crate::scrapers::FRONT_PAGE_URL;
use crate::scrapers::listing::extract_listing;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info, instrument};

enum State {
    FetchListing,
    ProcessCycle(String),
    Sleep,
}

/// Asks a running [`Poller`] to stop after its current cycle.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }
}

/// The crawler service.
pub struct Poller<F> {
    fetcher: F,
    limiter: Limiter,
    store: DownloadStore,
    refresh_interval: Duration,
    stop: StopHandle,
}

impl<F: Fetch> Poller<F> {
    /// One limiter is created here and reused by every cycle.
    pub fn new(settings: &Settings, fetcher: F) -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            fetcher,
            limiter: Limiter::new(settings.worker_count),
            store: DownloadStore::new(&settings.directory, settings.completion),
            refresh_interval: settings.refresh_interval(),
            stop: StopHandle { tx: Arc::new(tx) },
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Poll until stopped.
    ///
    /// Returns `Ok(())` after [`StopHandle::stop`], or
    /// [`CrawlError::FrontPage`] as soon as the front page cannot be fetched.
    pub async fn run_forever(&self) -> Result<(), CrawlError> {
        let mut state = State::FetchListing;
        loop {
            state = match state {
                State::FetchListing => {
                    if self.stop.is_stopped() {
                        break;
                    }
                    State::ProcessCycle(self.fetch_listing().await?)
                }
                State::ProcessCycle(markup) => {
                    match self.process_cycle(&markup).await {
                        Ok(report) => info!(
                            eligible = report.eligible_stories,
                            attempted = report.attempted,
                            failed = report.failed,
                            "{}",
                            report.summary()
                        ),
                        Err(e) if !e.is_fatal() => error!(error = %e, "Skipping cycle"),
                        Err(e) => return Err(e),
                    }
                    State::Sleep
                }
                State::Sleep => {
                    if self.sleep_or_stop().await {
                        break;
                    }
                    State::FetchListing
                }
            };
        }
        info!("Poller stopped");
        Ok(())
    }

    /// Fetch the front page.
    #[instrument(level = "info", skip(self))]
    pub async fn fetch_listing(&self) -> Result<String, CrawlError> {
        let result = self.fetcher.fetch(FRONT_PAGE_URL).await;
        let status = status_of(&result);
        match result.ok().and_then(|f| f.into_body()) {
            Some(body) => Ok(String::from_utf8_lossy(&body).into_owned()),
            None => {
                error!(status, "Error fetching front page");
                Err(CrawlError::FrontPage {
                    url: FRONT_PAGE_URL.to_string(),
                    status,
                })
            }
        }
    }

    /// Extract, filter and download one cycle's worth of stories from the
    /// front-page markup.
    #[instrument(level = "info", skip_all)]
    pub async fn process_cycle(&self, markup: &str) -> Result<CycleReport, CrawlError> {
        let t0 = Instant::now();
        let stories = extract_listing(&HtmlDocument::parse(markup));
        let done = self.store.completed().await?;

        let total = stories.len();
        let eligible: Vec<_> = stories
            .into_iter()
            .filter(|story| !done.contains(&story.id))
            .collect();
        info!(
            listed = total,
            eligible = eligible.len(),
            "Filtered stories already downloaded"
        );

        let report =
            scheduler::run_cycle(eligible, &self.fetcher, &self.limiter, &self.store).await;
        debug!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            peak_in_flight = self.limiter.peak(),
            capacity = self.limiter.capacity(),
            "Cycle finished"
        );
        Ok(report)
    }

    /// Sleep for the refresh interval. Returns `true` if stopped meanwhile.
    async fn sleep_or_stop(&self) -> bool {
        let mut rx = self.stop.tx.subscribe();
        tokio::select! {
            _ = tokio::time::sleep(self.refresh_interval) => self.stop.is_stopped(),
            _ = rx.wait_for(|stopped| *stopped) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompletionMode;
    use crate::models::Fetched;
    use crate::scrapers::thread_url;
    use crate::testing::{StubFetcher, refused};
    use std::path::Path;

    const LISTING: &str = r#"
    <table>
      <tr class="athing submission" id="1">
        <td class="title"><span class="titleline"><a href="http://a.example/x">A</a></span></td>
      </tr>
    </table>
    "#;

    const THREAD: &str = r#"
    <table><tr class="athing comtr">
      <td class="ind" indent="0"></td>
      <td><span class="commtext c00"><a href="http://b.example/y">y</a></span></td>
    </tr></table>
    "#;

    fn settings(root: &Path, completion: CompletionMode) -> Settings {
        Settings {
            directory: root.to_path_buf(),
            refresh_interval_seconds: 3600,
            worker_count: 2,
            completion,
            ..Settings::default()
        }
    }

    #[tokio::test]
    async fn test_end_to_end_single_story() {
        let root = tempfile::tempdir().unwrap();
        let stub = StubFetcher::new()
            .with(thread_url("1"), Ok(Fetched::status(404)))
            .with("http://a.example/x", Ok(Fetched::ok(&b"hello"[..])));
        let poller = Poller::new(&settings(root.path(), CompletionMode::Directory), &stub);

        let report = poller.process_cycle(LISTING).await.unwrap();

        let dirs: Vec<_> = std::fs::read_dir(root.path()).unwrap().collect();
        assert_eq!(dirs.len(), 1);
        let story_dir = root.path().join("1");
        let files: Vec<_> = std::fs::read_dir(&story_dir).unwrap().collect();
        assert_eq!(files.len(), 1);
        assert_eq!(
            std::fs::read(story_dir.join("http_a_example_x")).unwrap(),
            b"hello"
        );
        assert_eq!(report.downloaded, 1);
        assert_eq!(report.stories_with_downloads, 1);
        assert_eq!(report.summary(), "Downloaded 1 links for 1 stories");
    }

    #[tokio::test]
    async fn test_second_cycle_downloads_nothing() {
        let root = tempfile::tempdir().unwrap();
        let stub = StubFetcher::new()
            .with(thread_url("1"), Ok(Fetched::ok(THREAD)))
            .with("http://a.example/x", Ok(Fetched::ok("a")))
            .with("http://b.example/y", Ok(Fetched::ok("b")));
        let poller = Poller::new(&settings(root.path(), CompletionMode::Directory), &stub);

        let first = poller.process_cycle(LISTING).await.unwrap();
        let fetches_after_first = stub.fetched_urls().len();
        let second = poller.process_cycle(LISTING).await.unwrap();

        assert_eq!(first.downloaded, 2);
        assert_eq!(second, CycleReport::default());
        assert_eq!(second.summary(), "There is nothing new to download");
        assert_eq!(stub.fetched_urls().len(), fetches_after_first);
    }

    #[tokio::test]
    async fn test_directory_mode_skips_story_with_empty_directory() {
        let root = tempfile::tempdir().unwrap();
        let stub = StubFetcher::new().with("http://a.example/x", refused());
        let poller = Poller::new(&settings(root.path(), CompletionMode::Directory), &stub);

        let first = poller.process_cycle(LISTING).await.unwrap();
        let second = poller.process_cycle(LISTING).await.unwrap();

        assert_eq!(first.attempted, 1);
        assert_eq!(first.downloaded, 0);
        assert_eq!(second.attempted, 0);
    }

    #[tokio::test]
    async fn test_marker_mode_retries_story_with_nothing_written() {
        let root = tempfile::tempdir().unwrap();
        let stub = StubFetcher::new().with("http://a.example/x", refused());
        let poller = Poller::new(&settings(root.path(), CompletionMode::Marker), &stub);

        poller.process_cycle(LISTING).await.unwrap();
        let second = poller.process_cycle(LISTING).await.unwrap();

        assert_eq!(second.eligible_stories, 1);
        assert_eq!(second.attempted, 1);
    }

    #[tokio::test]
    async fn test_missing_root_fails_cycle_without_creating_it() {
        let parent = tempfile::tempdir().unwrap();
        let root = parent.path().join("downloaded");
        let stub = StubFetcher::new();
        let poller = Poller::new(&settings(&root, CompletionMode::Directory), &stub);

        let err = poller.process_cycle(LISTING).await.unwrap_err();

        assert!(matches!(err, CrawlError::MissingRoot(_)));
        assert!(!root.exists());
        assert!(stub.fetched_urls().is_empty());
    }

    #[tokio::test]
    async fn test_cycle_error_keeps_polling() {
        let parent = tempfile::tempdir().unwrap();
        let root = parent.path().join("downloaded");
        let stub = StubFetcher::new().with(FRONT_PAGE_URL, Ok(Fetched::ok(LISTING)));
        let poller = Poller::new(
            &Settings {
                refresh_interval_seconds: 0,
                ..settings(&root, CompletionMode::Directory)
            },
            &stub,
        );
        let handle = poller.stop_handle();

        let stopper = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            handle.stop();
        };
        let (result, ()) = tokio::time::timeout(Duration::from_secs(5), async {
            tokio::join!(poller.run_forever(), stopper)
        })
        .await
        .unwrap();

        assert!(result.is_ok());
        assert!(stub.fetched_urls().len() >= 2);
        assert!(stub.fetched_urls().iter().all(|u| u.as_str() == FRONT_PAGE_URL));
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn test_front_page_failure_is_fatal() {
        let root = tempfile::tempdir().unwrap();
        let stub = StubFetcher::new().with(FRONT_PAGE_URL, Ok(Fetched::status(503)));
        let poller = Poller::new(&settings(root.path(), CompletionMode::Directory), &stub);

        let err = poller.run_forever().await.unwrap_err();

        assert!(matches!(err, CrawlError::FrontPage { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_front_page_connection_failure_reports_sentinel() {
        let root = tempfile::tempdir().unwrap();
        let stub = StubFetcher::new().with(FRONT_PAGE_URL, refused());
        let poller = Poller::new(&settings(root.path(), CompletionMode::Directory), &stub);

        let err = poller.fetch_listing().await.unwrap_err();

        assert!(matches!(err, CrawlError::FrontPage { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_stop_ends_sleep() {
        let root = tempfile::tempdir().unwrap();
        let stub = StubFetcher::new().with(FRONT_PAGE_URL, Ok(Fetched::ok(LISTING)));
        let poller = Poller::new(&settings(root.path(), CompletionMode::Directory), &stub);
        let handle = poller.stop_handle();

        let stopper = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            handle.stop();
        };
        let (result, ()) = tokio::time::timeout(Duration::from_secs(5), async {
            tokio::join!(poller.run_forever(), stopper)
        })
        .await
        .unwrap();

        assert!(result.is_ok());
        assert_eq!(
            stub.fetched_urls()
                .iter()
                .filter(|u| u.as_str() == FRONT_PAGE_URL)
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_stopped_before_start_does_nothing() {
        let root = tempfile::tempdir().unwrap();
        let stub = StubFetcher::new();
        let poller = Poller::new(&settings(root.path(), CompletionMode::Directory), &stub);
        poller.stop_handle().stop();

        poller.run_forever().await.unwrap();

        assert!(stub.fetched_urls().is_empty());
        assert_eq!(poller.limiter.capacity(), 2);
    }
}
