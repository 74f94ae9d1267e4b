//! URL filtering for cache warmup
//!
//! Sitemaps list every public URL of a site, but not every URL is worth warming:
//! cart, checkout and account pages are per-visitor and never cached, filter and
//! sort query strings explode the key space, and API namespaces are not pages.
//! This module reduces a raw sitemap listing to the deduplicated, order-preserving
//! subsequence of URLs a cache should hold.

mod matcher;

pub use matcher::{first_match, matches_pattern};

use crate::config::FilterConfig;
use std::collections::HashSet;
use std::fmt;
use url::Url;

/// Reason a URL was excluded from warming
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Not an absolute http(s) URL with a host
    Invalid,
    /// A path segment is on the commerce/account denylist
    DeniedSegment(String),
    /// A query parameter name matches a denied pattern
    DeniedParam(String),
    /// The path points into an API namespace
    ApiNamespace(String),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid => write!(f, "not a valid absolute URL"),
            Self::DeniedSegment(s) => write!(f, "denied path segment '{}'", s),
            Self::DeniedParam(p) => write!(f, "denied query parameter '{}'", p),
            Self::ApiNamespace(s) => write!(f, "API namespace '{}'", s),
        }
    }
}

/// Parses a candidate as an absolute http(s) URL with a host
pub fn parse_absolute(candidate: &str) -> Option<Url> {
    let url = Url::parse(candidate).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.host_str().filter(|h| !h.is_empty())?;
    Some(url)
}

/// Checks a single, already-trimmed URL against the filter rules
///
/// Returns `Ok(())` if the URL should be warmed, or the first rule it breaks.
pub fn check_url(candidate: &str, rules: &FilterConfig) -> Result<(), Rejection> {
    let url = parse_absolute(candidate).ok_or(Rejection::Invalid)?;

    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    for segment in &segments {
        if let Some(denied) = rules
            .denied_segments
            .iter()
            .find(|d| d.eq_ignore_ascii_case(segment))
        {
            return Err(Rejection::DeniedSegment(denied.clone()));
        }
    }

    for (name, _) in url.query_pairs() {
        if let Some(pattern) = first_match(&rules.denied_params, &name) {
            return Err(Rejection::DeniedParam(pattern.to_string()));
        }
    }

    for segment in &segments {
        if let Some(api) = rules
            .api_segments
            .iter()
            .find(|a| a.eq_ignore_ascii_case(segment))
        {
            return Err(Rejection::ApiNamespace(api.clone()));
        }
    }

    Ok(())
}

/// Filters a raw URL listing down to warmable URLs
///
/// Steps, in order: trim whitespace, drop repeats (first occurrence wins),
/// then drop every URL that fails [`check_url`]. The output is the surviving
/// subsequence of the input.
///
/// # Examples
///
/// ```
/// use cache_warmer::config::FilterConfig;
/// use cache_warmer::url::filter_urls;
///
/// let urls = vec![
///     " https://example.com/shop ".to_string(),
///     "https://example.com/cart/".to_string(),
///     "https://example.com/shop".to_string(),
/// ];
/// let kept = filter_urls(&urls, &FilterConfig::default());
/// assert_eq!(kept, vec!["https://example.com/shop".to_string()]);
/// ```
pub fn filter_urls(urls: &[String], rules: &FilterConfig) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut kept = Vec::new();

    for raw in urls {
        let candidate = raw.trim();
        if !seen.insert(candidate) {
            continue;
        }

        match check_url(candidate, rules) {
            Ok(()) => kept.push(candidate.to_string()),
            Err(reason) => tracing::trace!("Skipping {}: {}", candidate, reason),
        }
    }

    tracing::debug!("URL filter kept {} of {} URLs", kept.len(), urls.len());
    kept
}
