//! Front page → stories.
//!
//! Each story is a `tr.athing` row whose `id` attribute is the story id and
//! whose title link sits in `span.titleline`. Self posts link to their own
//! thread with a relative `item?id=N` href, which is resolved to an absolute
//! URL.

use super::resolve_link;
use crate::markup::{Markup, MarkupElement};
use crate::models::Story;
use std::collections::HashSet;
use tracing::{debug, instrument};

const STORY_ROW: &str = ".athing";
const TITLE_LINE: &str = "span.titleline";

/// Extract stories from front-page markup, in page order.
///
/// Rows without an id or a title link are skipped. A repeated id keeps its
/// first row.
#[instrument(level = "info", skip_all)]
pub fn extract_listing<M: Markup>(doc: &M) -> Vec<Story> {
    let mut seen = HashSet::new();
    let mut stories = Vec::new();

    for row in doc.find_all(STORY_ROW) {
        let Some(id) = row.attribute("id").map(str::trim).filter(|id| is_safe_id(id)) else {
            debug!("Skipping story row without a usable id");
            continue;
        };
        let Some(url) = row
            .find_all(TITLE_LINE)
            .into_iter()
            .find_map(|title| title.first_link())
            .and_then(resolve_link)
        else {
            debug!(story_id = id, "Skipping story row without a title link");
            continue;
        };
        if !seen.insert(id.to_string()) {
            continue;
        }
        stories.push(Story::new(id, url));
    }

    debug!(count = stories.len(), "Extracted stories");
    stories
}

/// Story ids become directory names, so they must be a single plain path
/// component.
fn is_safe_id(id: &str) -> bool {
    !id.is_empty() && id != "." && id != ".." && !id.contains(['/', '\\', '\0'])
}
