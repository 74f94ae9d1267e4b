//! Integration tests for cache-warmer
//!
//! These tests use wiremock to stand in for the site and the CDN API, and
//! drive the public API end-to-end over real HTTP.

mod purge_tests;
mod runner_tests;
mod warmup_tests;

/// Renders a leaf sitemap listing `paths` under `base`
pub fn urlset(base: &str, paths: &[String]) -> String {
    let entries: String = paths
        .iter()
        .map(|p| format!("  <url><loc>{}{}</loc></url>\n", base, p))
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n{}</urlset>\n",
        entries
    )
}

/// Renders a sitemap index listing `paths` under `base`
pub fn sitemap_index(base: &str, paths: &[&str]) -> String {
    let entries: String = paths
        .iter()
        .map(|p| format!("  <sitemap><loc>{}{}</loc></sitemap>\n", base, p))
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<sitemapindex xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n{}</sitemapindex>\n",
        entries
    )
}
