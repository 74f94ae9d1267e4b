use crate::sitemap::parser::{parse_sitemap, SitemapDocument};
use crate::warmer::Transport;
use std::collections::HashSet;
use std::sync::Arc;

/// Walks a sitemap hierarchy and collects leaf page URLs
///
/// The descent uses an explicit stack instead of recursion. Child sitemaps are
/// pushed in reverse so documents are visited depth-first in the order they are
/// listed. Two bounds guarantee termination regardless of how the hierarchy is
/// shaped: a sitemap URL is fetched at most once (so index cycles are
/// harmless), and at most `max_documents` documents are fetched per resolve.
pub struct SitemapResolver {
    transport: Arc<dyn Transport>,
    max_documents: usize,
}

impl SitemapResolver {
    pub fn new(transport: Arc<dyn Transport>, max_documents: usize) -> Self {
        Self {
            transport,
            max_documents,
        }
    }

    /// Resolves the entry sitemaps into at most `limit` page URLs
    ///
    /// Unreachable or empty sitemaps contribute nothing; they are logged and the
    /// walk continues. Duplicates across sitemaps are kept for the URL filter.
    pub async fn resolve(&self, entries: &[String], limit: usize) -> Vec<String> {
        let mut urls: Vec<String> = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut stack: Vec<String> = entries.iter().rev().cloned().collect();

        while let Some(sitemap) = stack.pop() {
            if urls.len() >= limit {
                break;
            }

            if visited.contains(&sitemap) {
                tracing::debug!("Sitemap {} already visited, skipping", sitemap);
                continue;
            }

            if visited.len() >= self.max_documents {
                tracing::warn!(
                    "Reached the limit of {} sitemap documents, {} left unvisited",
                    self.max_documents,
                    stack.len() + 1
                );
                break;
            }
            visited.insert(sitemap.clone());

            let Some(body) = self.fetch_document(&sitemap).await else {
                continue;
            };

            match parse_sitemap(&body) {
                SitemapDocument::Index(children) => {
                    tracing::debug!("Sitemap index {} lists {} sitemaps", sitemap, children.len());
                    stack.extend(children.into_iter().rev());
                }
                SitemapDocument::Leaf(locs) => {
                    tracing::debug!("Sitemap {} lists {} URLs", sitemap, locs.len());
                    let room = limit - urls.len();
                    urls.extend(locs.into_iter().take(room));
                }
            }
        }

        tracing::info!(
            "Resolved {} URLs from {} sitemap documents",
            urls.len(),
            visited.len()
        );
        urls
    }

    async fn fetch_document(&self, url: &str) -> Option<String> {
        match self.transport.get_text(url).await {
            Ok((status, body)) if (200..300).contains(&status) => {
                if body.trim().is_empty() {
                    tracing::warn!("Sitemap {} returned an empty body", url);
                    None
                } else {
                    Some(body)
                }
            }
            Ok((status, _)) => {
                tracing::warn!("Sitemap {} returned HTTP {}", url, status);
                None
            }
            Err(e) => {
                tracing::warn!("Sitemap fetch failed: {}", e);
                None
            }
        }
    }
}
