//! Runtime settings.
//!
//! Settings are layered: built-in defaults, then an optional YAML file, then
//! command-line flags (which also read their environment variables). The
//! front page and thread URLs are constants of the crawler and are not
//! configurable here.
//!
//! ```yaml
//! directory: ./downloaded
//! refresh_interval_seconds: 5
//! worker_count: 5
//! completion: marker
//! fetch:
//!   connect_timeout_seconds: 10
//!   read_timeout_seconds: 10
//!   accept_invalid_certs: false
//! ```

use crate::cli::Cli;
use crate::error::CrawlError;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, instrument};

/// How the completion tracker decides a story has been handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CompletionMode {
    /// A story directory existing means the story is done, even if it is empty.
    #[default]
    Directory,
    /// A story is done once its directory holds a `.complete` marker.
    Marker,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub connect_timeout_seconds: u64,
    pub read_timeout_seconds: u64,
    pub accept_invalid_certs: bool,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout_seconds: 10,
            read_timeout_seconds: 10,
            accept_invalid_certs: false,
        }
    }
}

impl FetchSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Download root. Must exist before the crawler starts.
    pub directory: PathBuf,
    pub refresh_interval_seconds: u64,
    /// Capacity of the concurrency limiter.
    pub worker_count: usize,
    pub completion: CompletionMode,
    pub fetch: FetchSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./downloaded"),
            refresh_interval_seconds: 5,
            worker_count: 5,
            completion: CompletionMode::default(),
            fetch: FetchSettings::default(),
        }
    }
}

impl Settings {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_seconds)
    }

    /// Parse settings from YAML. Missing keys take their defaults.
    pub fn from_yaml(yaml: &str, path: &Path) -> Result<Self, CrawlError> {
        serde_yaml::from_str(yaml).map_err(|source| CrawlError::ConfigFile {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Build settings from the command line, reading the config file it
    /// names if any.
    #[instrument(level = "info", skip_all)]
    pub fn load(cli: &Cli) -> Result<Self, CrawlError> {
        let base = match &cli.config {
            Some(path) => {
                let yaml =
                    std::fs::read_to_string(path).map_err(|e| CrawlError::io(path, e))?;
                let settings = Self::from_yaml(&yaml, path)?;
                debug!(path = %path.display(), "Loaded config file");
                settings
            }
            None => Self::default(),
        };

        let settings = base.with_overrides(cli);
        settings.validate()?;
        Ok(settings)
    }

    /// Apply flags given on the command line on top of `self`.
    pub fn with_overrides(mut self, cli: &Cli) -> Self {
        if let Some(directory) = &cli.directory {
            self.directory = directory.clone();
        }
        if let Some(refresh) = cli.refresh {
            self.refresh_interval_seconds = refresh;
        }
        if let Some(workers) = cli.workers {
            self.worker_count = workers;
        }
        if let Some(completion) = cli.completion {
            self.completion = completion;
        }
        if cli.insecure {
            self.fetch.accept_invalid_certs = true;
        }
        self
    }

    /// Reject settings the crawler cannot run with.
    ///
    /// # Errors
    ///
    /// [`CrawlError::Config`] for a zero worker count or a zero timeout.
    pub fn validate(&self) -> Result<(), CrawlError> {
        if self.worker_count == 0 {
            return Err(CrawlError::Config(
                "worker_count must be at least 1".to_string(),
            ));
        }
        if self.fetch.connect_timeout_seconds == 0 || self.fetch.read_timeout_seconds == 0 {
            return Err(CrawlError::Config(
                "fetch timeouts must be at least 1 second".to_string(),
            ));
        }
        Ok(())
    }
}
