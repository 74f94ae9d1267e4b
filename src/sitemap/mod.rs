//! Sitemap discovery
//!
//! Turns a site's sitemap index into the flat list of page URLs to warm.

mod parser;
mod resolver;

pub use parser::{extract_locations, parse_sitemap, SitemapDocument};
pub use resolver::SitemapResolver;
