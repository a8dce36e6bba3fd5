//! Turns discovered pages and generated HTML into PDF files on disk.

pub mod scripts;
pub mod templates;

use crate::browser::{BrowserEngine, BrowserPage, PrintOptions};
use crate::config::BookConfig;
use crate::error::{Error, Result};
use crate::geometry::{CssRect, PageBox, Px, split_into_page};
use crate::pagination::ContentsRenderer;
use crate::parsers::Parser;
use crate::pdf;
use crate::results::{
    Artifact, ContentFingerprint, ContentsPage, DiscoveredUrl, RenderedSection, SectionLayout,
    TocLinkRect,
};
use crate::utils;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;

pub const COVER_FILENAME: &str = "_cover.pdf";
pub const CONTENTS_FILENAME: &str = "_index.pdf";

/// Settings shared by every render worker
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub output_dir: PathBuf,
    pub concurrency: usize,
    pub stable_filenames: bool,
    pub title_suffixes: Vec<String>,
    pub navigation_timeout: Duration,
    pub settle: Duration,
}

impl RenderOptions {
    pub fn from_config(config: &BookConfig) -> Result<Self> {
        Ok(Self {
            output_dir: PathBuf::from(config.resolved_output_dir()?),
            concurrency: config.concurrency.max(1),
            stable_filenames: config.stable_filenames,
            title_suffixes: config.title_suffixes.clone(),
            navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
            settle: Duration::from_millis(config.settle_ms),
        })
    }
}

type SeenFingerprints = Mutex<HashSet<ContentFingerprint>>;

/// Renders articles, the cover and the contents page through a browser engine
pub struct Renderer<E: BrowserEngine> {
    engine: Arc<E>,
    options: Arc<RenderOptions>,
}

impl<E: BrowserEngine> Renderer<E> {
    pub fn new(engine: Arc<E>, options: RenderOptions) -> Self {
        Self {
            engine,
            options: Arc::new(options),
        }
    }

    /// Renders every URL with at most `concurrency` pages open at once.
    ///
    /// Sequence numbers follow the order of `urls`. Duplicate content and
    /// failed renders produce no section. The result is sorted by sequence.
    pub async fn render_all(&self, urls: &[DiscoveredUrl]) -> Vec<RenderedSection> {
        ::log::info!(
            "Rendering {} pages with concurrency {}",
            urls.len(),
            self.options.concurrency
        );

        let semaphore = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
        let seen: Arc<SeenFingerprints> = Arc::new(Mutex::new(HashSet::new()));
        let mut tasks = JoinSet::new();

        for (index, discovered) in urls.iter().enumerate() {
            let sequence = index + 1;
            let url = discovered.url.clone();
            let engine = Arc::clone(&self.engine);
            let options = Arc::clone(&self.options);
            let semaphore = Arc::clone(&semaphore);
            let seen = Arc::clone(&seen);

            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return None;
                };

                match render_article(engine.as_ref(), &options, &seen, sequence, &url).await {
                    Ok(section) => section,
                    Err(e) => {
                        ::log::warn!("Skipping {}: {}", url, e);
                        None
                    }
                }
            });
        }

        let mut sections = Vec::with_capacity(urls.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Some(section)) => sections.push(section),
                Ok(None) => {}
                Err(e) => ::log::error!("Render worker panicked: {}", e),
            }
        }

        sections.sort_by_key(|section| section.sequence);
        ::log::info!("Rendered {} of {} pages", sections.len(), urls.len());
        sections
    }

    /// Renders the cover page to `_cover.pdf`
    pub async fn render_cover(&self, title: &str, subtitle: &str) -> Result<Artifact> {
        let html = templates::cover_html(title, subtitle);
        let path = self.options.output_dir.join(COVER_FILENAME);

        let mut page = self.engine.open_page().await?;
        let result = print_generated(&mut page, &html, &path).await;
        page.close().await;

        let artifact = result?;
        ::log::info!("Created cover page: {}", artifact.path.display());
        Ok(artifact)
    }
}

impl<E: BrowserEngine> ContentsRenderer for Renderer<E> {
    /// Renders the contents page to `_index.pdf` and measures every row
    async fn render_contents(&self, layouts: &[SectionLayout]) -> Result<ContentsPage> {
        let page_box = PageBox::A4;
        let html = templates::contents_html(layouts, page_box);
        let path = self.options.output_dir.join(CONTENTS_FILENAME);

        let mut page = self.engine.open_page().await?;
        let result = contents_on_page(&mut page, &html, &path, page_box).await;
        page.close().await;
        result
    }
}

async fn render_article<E: BrowserEngine>(
    engine: &E,
    options: &RenderOptions,
    seen: &SeenFingerprints,
    sequence: usize,
    url: &str,
) -> Result<Option<RenderedSection>> {
    let mut page = engine.open_page().await?;
    let result = article_on_page(&mut page, options, seen, sequence, url).await;
    page.close().await;
    result
}

async fn article_on_page<P: BrowserPage>(
    page: &mut P,
    options: &RenderOptions,
    seen: &SeenFingerprints,
    sequence: usize,
    url: &str,
) -> Result<Option<RenderedSection>> {
    ::log::debug!("Rendering [{}] {}", sequence, url);
    page.navigate(url, options.navigation_timeout).await?;
    if !options.settle.is_zero() {
        tokio::time::sleep(options.settle).await;
    }

    let source = page.page_source().await?;
    let parsed = Parser::parse(&source, &options.title_suffixes);
    let fingerprint = parsed.fingerprint();

    if !seen.lock().await.insert(fingerprint.clone()) {
        ::log::info!("Skipping duplicate content: {} ({})", url, fingerprint);
        return Ok(None);
    }

    match print_article(page, options, sequence, url, &parsed.title).await {
        Ok(artifact) => {
            ::log::info!(
                "Rendered [{}] {} ({} pages)",
                sequence,
                parsed.title,
                artifact.page_count
            );
            Ok(Some(RenderedSection {
                sequence,
                url: url.to_string(),
                title: parsed.title,
                fingerprint,
                artifact,
            }))
        }
        Err(e) => {
            // let a later copy of the same content take this one's place
            seen.lock().await.remove(&fingerprint);
            Err(e)
        }
    }
}

async fn print_article<P: BrowserPage>(
    page: &mut P,
    options: &RenderOptions,
    sequence: usize,
    url: &str,
    title: &str,
) -> Result<Artifact> {
    if let Err(e) = page
        .evaluate(scripts::PAGINATION_FIXUPS, Vec::new())
        .await
    {
        ::log::warn!("Could not prepare {} for printing: {}", url, e);
    }

    let filename = utils::article_filename(sequence, url, title, options.stable_filenames);
    let path = options.output_dir.join(filename);

    let bytes = page.print_pdf(&PrintOptions::ARTICLE).await?;
    write_artifact(&path, bytes).await
}

async fn print_generated<P: BrowserPage>(page: &mut P, html: &str, path: &Path) -> Result<Artifact> {
    page.set_content(html).await?;
    let bytes = page.print_pdf(&PrintOptions::FULL_BLEED).await?;
    write_artifact(path, bytes).await
}

/// Row rectangle as reported by the contents measuring script
#[derive(Debug, Deserialize)]
struct RowRect {
    seq: usize,
    left: f64,
    top: f64,
    right: f64,
    bottom: f64,
}

async fn contents_on_page<P: BrowserPage>(
    page: &mut P,
    html: &str,
    path: &Path,
    page_box: PageBox,
) -> Result<ContentsPage> {
    page.set_viewport(page_box.width.0 as u32, page_box.height.0 as u32)
        .await?;
    page.set_content(html).await?;

    let measured = page
        .evaluate(scripts::CONTENTS_ROW_RECTS, Vec::new())
        .await?;
    let rows: Vec<RowRect> = serde_json::from_value(measured)?;

    let link_rects = rows
        .into_iter()
        .map(|row| {
            let document_rect = CssRect {
                left: Px(row.left),
                top: Px(row.top),
                right: Px(row.right),
                bottom: Px(row.bottom),
            };
            let (contents_page, rect) = split_into_page(document_rect, page_box);
            TocLinkRect {
                sequence: row.seq,
                contents_page,
                rect,
            }
        })
        .collect::<Vec<_>>();

    let bytes = page.print_pdf(&PrintOptions::FULL_BLEED).await?;
    let artifact = write_artifact(path, bytes).await?;
    ::log::debug!(
        "Contents page has {} pages and {} rows",
        artifact.page_count,
        link_rects.len()
    );

    Ok(ContentsPage {
        artifact,
        link_rects,
    })
}

async fn write_artifact(path: &Path, bytes: Vec<u8>) -> Result<Artifact> {
    let page_count = pdf::page_count(&bytes)?;
    if page_count == 0 {
        return Err(Error::Print(format!("empty PDF for {}", path.display())));
    }
    tokio::fs::write(path, &bytes).await?;
    Ok(Artifact {
        path: path.to_path_buf(),
        page_count,
    })
}
