//! Test doubles shared by the unit tests.

use crate::error::FetchFailure;
use crate::fetcher::Fetch;
use crate::models::{FetchResult, Fetched};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// What the stub saw, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Started(String),
    Finished(String),
}

/// A [`Fetch`] that serves canned responses.
///
/// Unknown URLs get a 404. Every fetch sleeps for the configured latency so
/// concurrent fetches overlap, and the stub tracks how many were in flight
/// at once.
#[derive(Debug, Default)]
pub struct StubFetcher {
    responses: HashMap<String, FetchResult>,
    latency: Duration,
    events: Mutex<Vec<Event>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: impl Into<String>, response: FetchResult) -> Self {
        self.responses.insert(url.into(), response);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    /// URLs in the order their fetches started.
    pub fn fetched_urls(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Started(url) => Some(url),
                Event::Finished(_) => None,
            })
            .collect()
    }

    /// Most fetches ever in flight at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl Fetch for StubFetcher {
    async fn fetch(&self, url: &str) -> FetchResult {
        self.events
            .lock()
            .unwrap()
            .push(Event::Started(url.to_string()));
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if self.latency.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.latency).await;
        }

        self.active.fetch_sub(1, Ordering::SeqCst);
        self.events
            .lock()
            .unwrap()
            .push(Event::Finished(url.to_string()));

        self.responses
            .get(url)
            .cloned()
            .unwrap_or(Ok(Fetched::status(404)))
    }
}

/// Shorthand for a failed fetch in test tables.
pub fn refused() -> FetchResult {
    Err(FetchFailure::ConnectionRefused)
}
