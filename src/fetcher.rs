//! Content fetching.
//!
//! [`Fetch`] is the seam between the pipeline and the network: the scheduler,
//! the comment extractor and the poll loop only ever see a `FetchResult`.
//! [`HttpFetcher`] is the production implementation on top of one shared
//! `reqwest::Client`.
//!
//! # Failure policy
//!
//! - Non-200 responses come back as `Ok` with no body.
//! - Connection failures are logged as a warning naming the URL.
//! - Timeouts are reported silently (debug level only).
//! - Nothing is retried here. A URL that fails is picked up again by a later
//!   cycle as long as its story has not been marked complete.

use crate::config::FetchSettings;
use crate::error::{CrawlError, FetchFailure};
use crate::models::{FetchResult, Fetched};
use std::time::Instant;
use tracing::{debug, instrument, warn};

/// Something that can GET a URL.
pub trait Fetch {
    /// Fetch `url`. Never panics and never returns a transport error as
    /// anything but a tagged [`FetchFailure`].
    async fn fetch(&self, url: &str) -> FetchResult;
}

impl<T: Fetch> Fetch for &T {
    async fn fetch(&self, url: &str) -> FetchResult {
        (**self).fetch(url).await
    }
}

/// HTTP implementation of [`Fetch`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build the shared client with connect and read timeouts.
    ///
    /// There is no overall request deadline: a slow body that keeps
    /// trickling in is read to the end.
    ///
    /// # Arguments
    ///
    /// * `settings` - Timeouts and TLS verification policy
    ///
    /// # Errors
    ///
    /// [`CrawlError::Client`] if the TLS backend cannot be initialised.
    pub fn new(settings: &FetchSettings) -> Result<Self, CrawlError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout())
            .read_timeout(settings.read_timeout())
            .danger_accept_invalid_certs(settings.accept_invalid_certs)
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> FetchResult {
        let t0 = Instant::now();
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify(url, &e))?;

        let status = response.status().as_u16();
        if status != 200 {
            debug!(%url, status, "Non-200 response; dropping body");
            return Ok(Fetched::status(status));
        }

        let body = response.bytes().await.map_err(|e| classify(url, &e))?;
        debug!(
            %url,
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched"
        );
        Ok(Fetched::ok(body.to_vec()))
    }
}

/// Map a reqwest error onto the failure tags and log it according to policy.
fn classify(url: &str, err: &reqwest::Error) -> FetchFailure {
    if err.is_timeout() {
        debug!(%url, "Request timed out");
        FetchFailure::Timeout
    } else if err.is_connect() {
        warn!(%url, "Not able to connect to {url}");
        FetchFailure::ConnectionRefused
    } else {
        warn!(%url, error = %err, "Request failed");
        FetchFailure::Other(err.to_string())
    }
}
