//! Hacker News page extractors.
//!
//! The crawler reads two kinds of pages:
//!
//! | Page | Module | Produces |
//! |------|--------|----------|
//! | Front page (`/`) | [`listing`] | ordered [`Story`](crate::models::Story) records |
//! | Discussion thread (`/item?id=N`) | [`thread`] | links from top-level comments |
//!
//! Both extractors work against the [`Markup`](crate::markup::Markup) traits and
//! skip malformed elements without reporting them.

use once_cell::sync::Lazy;
use url::Url;

pub mod listing;
pub mod thread;

/// The front page, also the base for resolving relative links.
pub const FRONT_PAGE_URL: &str = "https://news.ycombinator.com/";

/// Discussion threads live at this prefix followed by the story id.
pub const THREAD_URL_PREFIX: &str = "https://news.ycombinator.com/item?id=";

static SITE_ROOT: Lazy<Option<Url>> = Lazy::new(|| Url::parse(FRONT_PAGE_URL).ok());

/// URL of the discussion thread for `story_id`.
pub fn thread_url(story_id: &str) -> String {
    format!("{THREAD_URL_PREFIX}{story_id}")
}

/// Make `href` absolute.
///
/// Absolute links are returned verbatim; relative ones (such as `item?id=2`)
/// are resolved against the site root.
pub fn resolve_link(href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    if Url::parse(href).is_ok() {
        return Some(href.to_string());
    }
    SITE_ROOT
        .as_ref()
        .and_then(|root| root.join(href).ok())
        .map(|resolved| resolved.to_string())
}

/// Keep `href` only if it points off-site.
///
/// Relative references and absolute links back to the site itself (other
/// threads, user pages) are dropped. External links are returned verbatim.
pub fn external_link(href: &str) -> Option<String> {
    let href = href.trim();
    let url = Url::parse(href).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let site_host = SITE_ROOT.as_ref().and_then(|root| root.host_str());
    if url.host_str().is_none() || url.host_str() == site_host {
        return None;
    }
    Some(href.to_string())
}
