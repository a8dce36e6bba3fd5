use crate::browser::{BrowserEngine, BrowserPage};
use crate::config::BookConfig;
use crate::error::Result;
use crate::filter::{UrlFilter, normalized_string, url_identity};
use crate::parsers::Parser;
use crate::results::DiscoveredUrl;
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use url::Url;

/// Bounds and politeness settings for one discovery run
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub start_url: String,
    pub path_pattern: String,
    pub max_depth: usize,
    pub max_pages: usize,
    pub delay: Duration,
    pub navigation_timeout: Duration,
    pub settle: Duration,
    pub allow_external: bool,
    pub exclude_patterns: Vec<String>,
}

impl CrawlOptions {
    pub fn from_config(config: &BookConfig) -> Result<Self> {
        Ok(Self {
            start_url: config.start_url.clone(),
            path_pattern: config.resolved_pattern()?,
            max_depth: config.max_depth,
            max_pages: config.max_pages,
            delay: Duration::from_millis(config.crawl_delay_ms),
            navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
            settle: Duration::from_millis(config.settle_ms),
            allow_external: config.allow_external,
            exclude_patterns: config.exclude_patterns.clone(),
        })
    }
}

/// Breadth-first discovery from the seed URL.
///
/// Visits run one at a time on a single page. A failed visit is logged and the
/// URL dropped. The result is sorted by URL.
pub async fn discover<E: BrowserEngine>(
    engine: &E,
    options: &CrawlOptions,
) -> Result<Vec<DiscoveredUrl>> {
    ::log::info!("Starting discovery from: {}", options.start_url);

    let seed = Url::parse(&options.start_url)?;
    let url_filter = UrlFilter::for_seed(
        &seed,
        &options.path_pattern,
        options.allow_external,
        &options.exclude_patterns,
    )?;

    let mut page = engine.open_page().await?;
    let mut discovered = crawl(&mut page, seed, &url_filter, options).await;
    page.close().await;

    discovered.sort_by(|a, b| a.url.cmp(&b.url));
    ::log::info!("Discovered {} pages", discovered.len());
    Ok(discovered)
}

async fn crawl<P: BrowserPage>(
    page: &mut P,
    seed: Url,
    url_filter: &UrlFilter,
    options: &CrawlOptions,
) -> Vec<DiscoveredUrl> {
    let mut frontier: VecDeque<(Url, usize)> = VecDeque::new();
    // identities that are queued or already visited
    let mut seen: HashSet<String> = HashSet::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut discovered = Vec::new();

    seen.insert(url_identity(&seed));
    frontier.push_back((seed, 0));

    while let Some((url, depth)) = frontier.pop_front() {
        if discovered.len() >= options.max_pages {
            ::log::info!("Reached page budget of {}", options.max_pages);
            break;
        }

        if !visited.insert(url_identity(&url)) {
            ::log::trace!("Skipping already visited: {}", url);
            continue;
        }

        if visited.len() > 1 && !options.delay.is_zero() {
            tokio::time::sleep(options.delay).await;
        }

        let source = match visit(page, &url, options).await {
            Ok(source) => source,
            Err(e) => {
                ::log::warn!("Dropping {}: {}", url, e);
                continue;
            }
        };

        let normalized = normalized_string(&url);
        ::log::debug!("Discovered {} at depth {}", normalized, depth);
        discovered.push(DiscoveredUrl::new(normalized, depth));

        if depth >= options.max_depth {
            continue;
        }

        let links = Parser::parse_links(&source);
        ::log::debug!("Found {} links in {}", links.len(), url);
        for href in links {
            let Some(link) = url_filter.accept_link(&url, &href) else {
                continue;
            };
            if seen.insert(url_identity(&link)) {
                ::log::debug!("Queuing link for crawling: {}", link);
                frontier.push_back((link, depth + 1));
            }
        }
    }

    discovered
}

async fn visit<P: BrowserPage>(page: &mut P, url: &Url, options: &CrawlOptions) -> Result<String> {
    page.navigate(url.as_str(), options.navigation_timeout).await?;
    if !options.settle.is_zero() {
        tokio::time::sleep(options.settle).await;
    }
    page.page_source().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeEngine, FakePage, FakeSite};
    use std::sync::atomic::Ordering;

    fn options(seed: &str, max_depth: usize, max_pages: usize) -> CrawlOptions {
        CrawlOptions {
            start_url: seed.to_string(),
            path_pattern: "/docs/".to_string(),
            max_depth,
            max_pages,
            delay: Duration::ZERO,
            navigation_timeout: Duration::from_secs(5),
            settle: Duration::ZERO,
            allow_external: false,
            exclude_patterns: Vec::new(),
        }
    }

    fn links(hrefs: &[&str]) -> String {
        let anchors: String = hrefs
            .iter()
            .map(|h| format!("<a href=\"{}\">link</a>", h))
            .collect();
        format!("<html><body><main>{}</main></body></html>", anchors)
    }

    /// docs -> a -> b -> c, plus duplicates of `a` spelled differently
    fn chain_site() -> FakeSite {
        FakeSite::new()
            .page(
                "https://example.com/docs",
                FakePage::html(&links(&["/docs/a", "/docs/a/", "/docs/a#top", "/blog/x"])),
            )
            .page(
                "https://example.com/docs/a",
                FakePage::html(&links(&["/docs/a/b/", "/docs/a", "/docs/"])),
            )
            .page("https://example.com/docs/a/b", FakePage::html(&links(&["c"])))
            .page("https://example.com/docs/a/b/c", FakePage::html(&links(&[])))
    }

    fn urls(found: &[DiscoveredUrl]) -> Vec<&str> {
        found.iter().map(|d| d.url.as_str()).collect()
    }

    #[tokio::test]
    async fn test_fragment_and_trailing_slash_variants_are_one_page() {
        let engine = FakeEngine::new(chain_site());
        let found = discover(&engine, &options("https://example.com/docs/", 1, 100))
            .await
            .unwrap();

        assert_eq!(urls(&found), vec!["https://example.com/docs", "https://example.com/docs/a"]);
        assert_eq!(engine.visits().len(), 2);
    }

    #[tokio::test]
    async fn test_depth_bound() {
        let engine = FakeEngine::new(chain_site());

        let found = discover(&engine, &options("https://example.com/docs/", 0, 100))
            .await
            .unwrap();
        assert_eq!(urls(&found), vec!["https://example.com/docs"]);

        let found = discover(&engine, &options("https://example.com/docs/", 2, 100))
            .await
            .unwrap();
        assert_eq!(found.len(), 3);
        assert!(found.iter().all(|d| d.depth <= 2));
        assert!(!urls(&found).contains(&"https://example.com/docs/a/b/c"));
    }

    #[tokio::test]
    async fn test_budget_bound() {
        let mut site = FakeSite::new();
        let children: Vec<String> = (0..10).map(|i| format!("/docs/p{}", i)).collect();
        let child_refs: Vec<&str> = children.iter().map(|s| s.as_str()).collect();
        site = site.page("https://example.com/docs", FakePage::html(&links(&child_refs)));
        for child in &children {
            site = site.page(
                &format!("https://example.com{}", child),
                FakePage::html(&links(&[])),
            );
        }
        let engine = FakeEngine::new(site);

        let found = discover(&engine, &options("https://example.com/docs", 1, 4))
            .await
            .unwrap();
        assert_eq!(found.len(), 4);
    }

    #[tokio::test]
    async fn test_failed_visit_is_dropped() {
        let site = FakeSite::new()
            .page(
                "https://example.com/docs",
                FakePage::html(&links(&["/docs/broken", "/docs/ok"])),
            )
            .page("https://example.com/docs/broken", FakePage::failing())
            .page("https://example.com/docs/ok", FakePage::html(&links(&[])));
        let engine = FakeEngine::new(site);

        let found = discover(&engine, &options("https://example.com/docs", 1, 2))
            .await
            .unwrap();

        // the failure does not use up the budget
        assert_eq!(urls(&found), vec!["https://example.com/docs", "https://example.com/docs/ok"]);
        assert_eq!(engine.opened.load(Ordering::SeqCst), 1);
        assert_eq!(engine.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unreachable_seed_yields_nothing() {
        let engine = FakeEngine::new(FakeSite::new());
        let found = discover(&engine, &options("https://example.com/docs", 2, 10))
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_output_sorted() {
        let site = FakeSite::new()
            .page(
                "https://example.com/docs",
                FakePage::html(&links(&["/docs/zebra", "/docs/apple"])),
            )
            .page("https://example.com/docs/zebra", FakePage::html(&links(&[])))
            .page("https://example.com/docs/apple", FakePage::html(&links(&[])));
        let engine = FakeEngine::new(site);

        let found = discover(&engine, &options("https://example.com/docs", 1, 10))
            .await
            .unwrap();
        assert_eq!(
            urls(&found),
            vec![
                "https://example.com/docs",
                "https://example.com/docs/apple",
                "https://example.com/docs/zebra"
            ]
        );
    }
}
