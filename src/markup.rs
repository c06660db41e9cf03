//! Structural markup queries.
//!
//! The extractors only need three capabilities from an HTML parser: find all
//! elements matching a CSS selector, read an attribute, and get the first
//! hyperlink inside an element. [`Markup`] and [`MarkupElement`] describe
//! exactly that; [`HtmlDocument`] implements them on top of `scraper`.
//!
//! An invalid selector is treated like a selector that matches nothing.

use scraper::{ElementRef, Html, Selector};
use tracing::warn;

/// A parsed document that can be queried.
pub trait Markup {
    type Element<'a>: MarkupElement<'a>
    where
        Self: 'a;

    /// All elements matching `selector`, in document order.
    fn find_all<'a>(&'a self, selector: &str) -> Vec<Self::Element<'a>>;
}

/// An element handle borrowed from a [`Markup`] document.
pub trait MarkupElement<'a>: Sized {
    /// Descendants of this element matching `selector`, in document order.
    fn find_all(&self, selector: &str) -> Vec<Self>;

    fn attribute(&self, name: &str) -> Option<&'a str>;

    /// `href` of the first `<a href>` inside this element.
    fn first_link(&self) -> Option<&'a str>;
}

/// An HTML document parsed with `scraper`.
pub struct HtmlDocument {
    html: Html,
}

impl HtmlDocument {
    /// Parse a whole page. Malformed markup is repaired, never rejected.
    pub fn parse(markup: &str) -> Self {
        Self {
            html: Html::parse_document(markup),
        }
    }
}

/// An element of an [`HtmlDocument`].
#[derive(Debug, Clone, Copy)]
pub struct HtmlElement<'a>(ElementRef<'a>);

fn selector(query: &str) -> Option<Selector> {
    match Selector::parse(query) {
        Ok(selector) => Some(selector),
        Err(e) => {
            warn!(%query, error = %e, "Invalid selector");
            None
        }
    }
}

impl Markup for HtmlDocument {
    type Element<'a> = HtmlElement<'a>;

    fn find_all<'a>(&'a self, query: &str) -> Vec<HtmlElement<'a>> {
        selector(query)
            .map(|s| self.html.select(&s).map(HtmlElement).collect())
            .unwrap_or_default()
    }
}

impl<'a> MarkupElement<'a> for HtmlElement<'a> {
    fn find_all(&self, query: &str) -> Vec<Self> {
        selector(query)
            .map(|s| self.0.select(&s).map(HtmlElement).collect())
            .unwrap_or_default()
    }

    fn attribute(&self, name: &str) -> Option<&'a str> {
        self.0.value().attr(name)
    }

    fn first_link(&self) -> Option<&'a str> {
        self.find_all("a[href]")
            .into_iter()
            .find_map(|a| a.attribute("href"))
    }
}
