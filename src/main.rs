//! # hn_harvester
//!
//! Polls the Hacker News front page and downloads, for every story it has not
//! seen before, the story's own link and the first link of each top-level
//! comment in its discussion thread.
//!
//! ## Usage
//!
//! ```sh
//! mkdir downloaded
//! hn_harvester -d ./downloaded -r 5 -w 5
//! ```
//!
//! ## Architecture
//!
//! Each cycle is a pipeline:
//! 1. **Listing**: fetch the front page and extract stories
//! 2. **Filter**: drop stories whose directory already exists
//! 3. **Discovery**: fetch every remaining thread and collect comment links
//! 4. **Download**: fetch every link and save it under `<root>/<story id>/`
//!
//! All fetches share one concurrency limiter sized by `--workers`. The loop
//! sleeps `--refresh` seconds between cycles and runs until interrupted
//! (Ctrl-C or SIGTERM).

use clap::Parser;
use std::error::Error;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod error;
mod fetcher;
mod limiter;
mod markup;
mod models;
mod outputs;
mod poller;
mod scheduler;
mod scrapers;
mod shutdown;
#[cfg(test)]
mod testing;
mod utils;

use cli::Cli;
use config::Settings;
use fetcher::HttpFetcher;
use poller::Poller;
use scrapers::FRONT_PAGE_URL;
use shutdown::ShutdownSignals;
use utils::check_download_root;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let args = Cli::parse();
    let settings = match Settings::load(&args) {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };

    if let Err(e) = check_download_root(&settings.directory).await {
        error!(
            path = %settings.directory.display(),
            error = %e,
            "Download directory unusable (create it or choose a different path)"
        );
        return Err(e.into());
    }

    let fetcher = HttpFetcher::new(&settings.fetch)?;
    let poller = Poller::new(&settings, fetcher);

    info!(
        source = FRONT_PAGE_URL,
        directory = %settings.directory.display(),
        workers = settings.worker_count,
        refresh_secs = settings.refresh_interval_seconds,
        completion = ?settings.completion,
        "Crawler started"
    );

    let stop = poller.stop_handle();
    let mut signals = ShutdownSignals::register()?;
    tokio::spawn(async move {
        let signal = signals.recv().await;
        warn!(signal, "Stop requested; finishing the current cycle (signal again to abort)");
        stop.stop();
        let signal = signals.recv().await;
        warn!(signal, "Second stop request; aborting");
        std::process::exit(130);
    });

    if let Err(e) = poller.run_forever().await {
        error!(error = %e, "Crawler stopped");
        return Err(e.into());
    }

    info!("Exit");
    Ok(())
}
