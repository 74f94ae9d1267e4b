//! Tolerant sitemap parsing
//!
//! Sitemaps in the wild are frequently malformed (stray whitespace, missing
//! namespaces, plugin debug output appended after the root element), so this is
//! a pattern match over `<loc>` elements rather than a validating XML parse.

use regex::Regex;
use std::sync::LazyLock;

static LOC_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<loc>\s*([^<]+)\s*</loc>").expect("static <loc> pattern is valid")
});

/// Marker that identifies a sitemap index document
const INDEX_MARKER: &str = "<sitemapindex";

/// A parsed sitemap document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapDocument {
    /// A sitemap index: every `<loc>` is a child sitemap
    Index(Vec<String>),
    /// A leaf sitemap: every `<loc>` is a page URL
    Leaf(Vec<String>),
}

impl SitemapDocument {
    pub fn locations(&self) -> &[String] {
        match self {
            Self::Index(locs) | Self::Leaf(locs) => locs,
        }
    }
}

/// Parses a sitemap body into an index or a leaf document
///
/// # Example
///
/// ```
/// use cache_warmer::sitemap::{parse_sitemap, SitemapDocument};
///
/// let body = "<sitemapindex><sitemap><loc> https://example.com/post-sitemap.xml </loc></sitemap></sitemapindex>";
/// assert_eq!(
///     parse_sitemap(body),
///     SitemapDocument::Index(vec!["https://example.com/post-sitemap.xml".to_string()])
/// );
/// ```
pub fn parse_sitemap(body: &str) -> SitemapDocument {
    let locs = extract_locations(body);
    if body.contains(INDEX_MARKER) {
        SitemapDocument::Index(locs)
    } else {
        SitemapDocument::Leaf(locs)
    }
}

/// Extracts every `<loc>` value in document order
pub fn extract_locations(body: &str) -> Vec<String> {
    LOC_PATTERN
        .captures_iter(body)
        .filter_map(|caps| caps.get(1))
        .map(|m| unescape_xml(m.as_str().trim()))
        .filter(|loc| !loc.is_empty())
        .collect()
}

/// Decodes the five predefined XML entities
///
/// Sitemap generators escape `&` in query strings as `&amp;`.
fn unescape_xml(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
