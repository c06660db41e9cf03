//! Small helpers: file naming and download root checks.

use crate::error::CrawlError;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Turn a URL into a file name.
///
/// `://`, `.`, `/`, `?` and `&` each become `_`, in that order. The mapping
/// is deterministic but lossy: two URLs can map to the same name, in which
/// case the last write wins.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(url_filename("https://a.example/x?y=1&z=2"), "https_a_example_x_y=1_z=2");
/// ```
pub fn url_filename(url: &str) -> String {
    url.replace("://", "_")
        .replace('.', "_")
        .replace('/', "_")
        .replace('?', "_")
        .replace('&', "_")
}

/// Check that the download root exists and is a directory.
///
/// Unlike most output directories this one is never created on the
/// operator's behalf; a missing root usually means a wrong path.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn check_download_root(path: &Path) -> Result<(), CrawlError> {
    match fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => {
            info!("Download directory found");
            Ok(())
        }
        Ok(_) => Err(CrawlError::Config(format!(
            "{} is not a directory",
            path.display()
        ))),
        Err(_) => Err(CrawlError::MissingRoot(path.to_path_buf())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_filename() {
        assert_eq!(
            url_filename("https://a.example/x?y=1&z=2"),
            "https_a_example_x_y=1_z=2"
        );
        assert_eq!(url_filename("http://b.example/y"), "http_b_example_y");
    }

    #[test]
    fn test_url_filename_is_deterministic() {
        let url = "https://news.ycombinator.com/item?id=2";
        assert_eq!(url_filename(url), url_filename(url));
        assert_eq!(url_filename(url), "https_news_ycombinator_com_item_id=2");
    }

    #[test]
    fn test_url_filename_distinguishes_scheme_host_path() {
        let names = [
            url_filename("http://a.example/x"),
            url_filename("https://a.example/x"),
            url_filename("http://b.example/x"),
            url_filename("http://a.example/y"),
        ];
        for (i, a) in names.iter().enumerate() {
            for b in &names[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_url_filename_known_collision() {
        // Separators all collapse to `_`.
        assert_eq!(
            url_filename("http://a.example/b"),
            url_filename("http://a/example.b")
        );
    }

    #[test]
    fn test_url_filename_never_starts_with_dot() {
        assert!(!url_filename(".complete").starts_with('.'));
    }

    #[tokio::test]
    async fn test_check_download_root() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_download_root(dir.path()).await.is_ok());

        let missing = dir.path().join("missing");
        assert!(matches!(
            check_download_root(&missing).await,
            Err(CrawlError::MissingRoot(_))
        ));
        assert!(!missing.exists());
    }
}
