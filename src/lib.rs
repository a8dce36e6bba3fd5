pub mod assembler;
pub mod browser;
pub mod config;
pub mod crawlers;
pub mod error;
pub mod filter;
pub mod geometry;
pub mod pagination;
pub mod parsers;
pub mod pdf;
pub mod render;
pub mod results;
pub mod utils;

#[cfg(test)]
mod testing;

// Re-export commonly used types for convenience
pub use config::BookConfig;
pub use error::{Error, Result};
pub use results::BookSummary;

use assembler::{AssembleOptions, Assembler};
use browser::{BrowserEngine, WebDriverEngine};
use crawlers::CrawlOptions;
use render::{RenderOptions, Renderer};
use std::sync::Arc;

/// Main builder for turning a documentation site into one PDF
pub struct Book {
    config: BookConfig,
}

impl Book {
    /// Create a new Book builder from a full configuration
    pub fn new(config: BookConfig) -> Self {
        Self { config }
    }

    /// Create a new Book builder for a seed URL with default settings
    pub fn from_url(start_url: &str) -> Self {
        Self::new(BookConfig::new(start_url))
    }

    /// Set the maximum number of pages rendered at once
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.config.concurrency = max_concurrency.max(1);
        self
    }

    /// Set the maximum number of link hops from the seed
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.config.max_depth = max_depth;
        self
    }

    /// Set the maximum number of pages to discover
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.config.max_pages = max_pages;
        self
    }

    /// Set the substring every followed link must contain
    pub fn with_url_pattern(mut self, pattern: &str) -> Self {
        self.config.url_pattern = Some(pattern.to_string());
        self
    }

    pub fn with_output_dir(mut self, output_dir: &str) -> Self {
        self.config.output_dir = Some(output_dir.to_string());
        self
    }

    pub fn with_document_title(mut self, title: &str) -> Self {
        self.config.document_title = Some(title.to_string());
        self
    }

    pub fn with_webdriver_url(mut self, webdriver_url: &str) -> Self {
        self.config.webdriver_url = webdriver_url.to_string();
        self
    }

    pub fn config(&self) -> &BookConfig {
        &self.config
    }

    /// Runs the whole pipeline against a WebDriver server
    pub async fn build(self) -> Result<BookSummary> {
        let mut config = self.config;

        // Override the WebDriver URL with an environment variable if provided
        if let Ok(webdriver_url) = std::env::var("WEBDRIVER_URL") {
            if !webdriver_url.is_empty() {
                config.webdriver_url = webdriver_url;
            }
        }

        let engine = Arc::new(WebDriverEngine::new(&config.webdriver_url));
        let result = build_with(Arc::clone(&engine), &config).await;
        engine.shutdown().await;
        result
    }
}

/// Crawl, render, number and merge, using the given browser engine.
///
/// Fails on an empty discovery result or when nothing could be merged; every
/// other per-page problem is logged and skipped.
pub async fn build_with<E: BrowserEngine>(
    engine: Arc<E>,
    config: &BookConfig,
) -> Result<BookSummary> {
    let output_dir = config.resolved_output_dir()?;
    tokio::fs::create_dir_all(&output_dir).await?;
    ::log::info!("Writing to {}", output_dir);

    let discovered = crawlers::discover(engine.as_ref(), &CrawlOptions::from_config(config)?).await?;
    if discovered.is_empty() {
        return Err(Error::NoPages);
    }

    let renderer = Renderer::new(Arc::clone(&engine), RenderOptions::from_config(config)?);
    let sections = renderer.render_all(&discovered).await;
    if sections.is_empty() {
        return Err(Error::NothingToMerge);
    }

    let title = config.resolved_document_title()?;
    let cover = renderer
        .render_cover(&title, &config.cover_subtitle)
        .await?;

    let pagination = pagination::resolve(&renderer, cover.page_count, &sections).await?;

    let assembler = Assembler::new(AssembleOptions::from_config(config)?);
    let path = assembler.merge(&cover, &pagination.contents, &sections, &pagination.layouts)?;
    assembler.organize(&cover, &pagination.contents, &sections);

    Ok(BookSummary {
        path,
        contents_pages: pagination.contents_pages(),
        converged: pagination.converged,
        sections: pagination.layouts,
    })
}
