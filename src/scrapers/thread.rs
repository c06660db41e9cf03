//! Discussion thread → links from top-level comments.
//!
//! Comments are `tr.comtr` rows. Nesting depth is carried by the `indent`
//! attribute of the row's `td.ind` cell; only depth 0 is inspected. From each
//! top-level comment the first link inside `span.commtext` is taken, as long
//! as it leaves the site.

use super::{external_link, thread_url};
use crate::fetcher::Fetch;
use crate::markup::{HtmlDocument, Markup, MarkupElement};
use tracing::{debug, instrument};

const COMMENT_ROW: &str = "tr.comtr";
const INDENT_CELL: &str = "td.ind";
const COMMENT_TEXT: &str = "span.commtext";

/// Fetch the thread for `story_id` and return the links of its top-level
/// comments.
///
/// A thread that does not come back with status 200 yields no links; the
/// story is then downloaded for its primary link only.
#[instrument(level = "info", skip(fetcher))]
pub async fn extract_comment_links<F: Fetch>(fetcher: &F, story_id: &str) -> Vec<String> {
    let url = thread_url(story_id);
    let body = match fetcher.fetch(&url).await {
        Ok(fetched) => match fetched.into_body() {
            Some(body) => body,
            None => {
                debug!(%url, "Thread unavailable");
                return Vec::new();
            }
        },
        Err(_) => return Vec::new(),
    };

    let markup = String::from_utf8_lossy(&body);
    let links = parse_comment_links(&HtmlDocument::parse(&markup));
    debug!(count = links.len(), "Extracted comment links");
    links
}

/// External links of top-level comments in a parsed thread page, in page
/// order. A comment whose first link stays on the site contributes nothing.
pub fn parse_comment_links<M: Markup>(doc: &M) -> Vec<String> {
    doc.find_all(COMMENT_ROW)
        .into_iter()
        .filter(|row| indent(row) == 0)
        .filter_map(|row| {
            row.find_all(COMMENT_TEXT)
                .into_iter()
                .next()
                .and_then(|text| text.first_link())
                .and_then(external_link)
        })
        .collect()
}

/// Nesting depth of a comment row. Rows without an indent cell count as top
/// level.
fn indent<'a, E: MarkupElement<'a>>(row: &E) -> u32 {
    row.find_all(INDENT_CELL)
        .into_iter()
        .next()
        .and_then(|cell| cell.attribute("indent"))
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(0)
}
