//! In-process browser and PDF fixtures shared by the unit and pipeline tests.

use crate::browser::{BrowserEngine, BrowserPage, PrintOptions};
use crate::error::{Error, Result};
use crate::filter::normalized_string;
use crate::geometry::PageBox;
use crate::render::scripts;
use lopdf::{Document, Object, ObjectId, Stream, dictionary};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// Where the first contents row starts on a generated page
const FIRST_ROW_TOP: f64 = 150.0;
const ROW_LEFT: f64 = 48.0;
const ROW_RIGHT: f64 = 746.0;

/// Builds an A4 PDF with `pages` blank pages; the MediaBox sits on the page
/// tree node so merging has to carry it down to each page.
pub fn pdf_with_pages(pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let kids: Vec<Object> = (0..pages)
        .map(|_| {
            let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            page_id.into()
        })
        .collect();

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(595),
                Object::Integer(842),
            ],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// Simple article page: the title in an `<h1>` followed by one paragraph
pub fn article(title: &str, body: &str) -> String {
    format!(
        "<html><head><title>{title} | Example</title></head>\
         <body><main><h1>{title}</h1><p>{body}</p></main></body></html>"
    )
}

/// `(title, 0-based page)` for every outline entry, in outline order
pub fn outline_targets(document: &Document) -> Vec<(String, usize)> {
    let pages: Vec<ObjectId> = document.get_pages().into_values().collect();
    let catalog = document.catalog().unwrap();
    let Ok(outlines) = catalog.get(b"Outlines").and_then(Object::as_reference) else {
        return Vec::new();
    };
    let outlines = document.get_dictionary(outlines).unwrap();

    let mut targets = Vec::new();
    let mut next = outlines.get(b"First").and_then(Object::as_reference).ok();
    while let Some(id) = next {
        let item = document.get_dictionary(id).unwrap();
        let title = match item.get(b"Title").unwrap() {
            Object::String(bytes, _) => String::from_utf8_lossy(bytes).to_string(),
            other => panic!("unexpected title {:?}", other),
        };
        let dest = item.get(b"Dest").unwrap().as_array().unwrap();
        let page_id = dest[0].as_reference().unwrap();
        targets.push((title, pages.iter().position(|p| *p == page_id).unwrap()));
        next = item.get(b"Next").and_then(Object::as_reference).ok();
    }
    targets
}

/// `(source page, destination page)` for every link annotation, by page
pub fn link_targets(document: &Document) -> Vec<(usize, usize)> {
    let pages: Vec<ObjectId> = document.get_pages().into_values().collect();
    let mut links = Vec::new();

    for (source, page_id) in pages.iter().enumerate() {
        let page = document.get_dictionary(*page_id).unwrap();
        let annots = match page.get(b"Annots") {
            Ok(Object::Array(items)) => items.clone(),
            Ok(Object::Reference(id)) => document.get_object(*id).unwrap().as_array().unwrap().clone(),
            _ => continue,
        };
        for annot in annots {
            let annot = document.get_dictionary(annot.as_reference().unwrap()).unwrap();
            let dest = annot.get(b"Dest").unwrap().as_array().unwrap();
            let dest_id = dest[0].as_reference().unwrap();
            links.push((source, pages.iter().position(|p| *p == dest_id).unwrap()));
        }
    }
    links
}

/// One page served by the fake browser
#[derive(Debug, Clone)]
pub struct FakePage {
    html: String,
    pdf_pages: usize,
    delay: Duration,
    fail: bool,
}

impl FakePage {
    pub fn html(html: &str) -> Self {
        Self {
            html: html.to_string(),
            pdf_pages: 1,
            delay: Duration::ZERO,
            fail: false,
        }
    }

    /// A page whose navigation always fails
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::html("")
        }
    }

    pub fn with_pdf_pages(mut self, pages: usize) -> Self {
        self.pdf_pages = pages;
        self
    }

    /// Delay before navigation completes
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Pages keyed by normalized URL, plus the layout used for generated documents
#[derive(Debug, Clone)]
pub struct FakeSite {
    pages: HashMap<String, FakePage>,
    row_height: f64,
}

impl Default for FakeSite {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeSite {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            row_height: 40.0,
        }
    }

    pub fn page(mut self, url: &str, page: FakePage) -> Self {
        let key = Url::parse(url)
            .map(|u| normalized_string(&u))
            .unwrap_or_else(|_| url.to_string());
        self.pages.insert(key, page);
        self
    }

    /// Height of every contents row in generated documents
    pub fn with_row_height(mut self, height: f64) -> Self {
        self.row_height = height;
        self
    }

    /// Lays out contents rows top to bottom the way a screen would, so a row
    /// may straddle a page boundary. Returns `(seq, top)` per row and the
    /// page count.
    fn layout_rows(&self, html: &str) -> (Vec<(usize, f64)>, usize) {
        let page_height = PageBox::A4.height.0;
        let doc = scraper::Html::parse_document(html);
        let selector = scraper::Selector::parse(".row[data-seq]").unwrap();

        let mut y = FIRST_ROW_TOP;
        let mut rows = Vec::new();
        for row in doc.select(&selector) {
            let seq = row
                .value()
                .attr("data-seq")
                .and_then(|s| s.parse().ok())
                .unwrap_or(0);
            rows.push((seq, y));
            y += self.row_height;
        }

        let pages = (y / page_height).ceil().max(1.0) as usize;
        (rows, pages)
    }
}

/// Browser engine answering from a [`FakeSite`]
pub struct FakeEngine {
    site: Arc<FakeSite>,
    pub opened: Arc<AtomicUsize>,
    pub closed: Arc<AtomicUsize>,
    /// Most pages open at the same time
    pub peak_open: Arc<AtomicUsize>,
    visits: Arc<Mutex<Vec<String>>>,
}

impl FakeEngine {
    pub fn new(site: FakeSite) -> Self {
        Self {
            site: Arc::new(site),
            opened: Arc::new(AtomicUsize::new(0)),
            closed: Arc::new(AtomicUsize::new(0)),
            peak_open: Arc::new(AtomicUsize::new(0)),
            visits: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Successful navigations, in order
    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().unwrap().clone()
    }
}

impl BrowserEngine for FakeEngine {
    type Page = FakeTab;

    async fn open_page(&self) -> Result<FakeTab> {
        let opened = self.opened.fetch_add(1, Ordering::SeqCst) + 1;
        let open_now = opened - self.closed.load(Ordering::SeqCst);
        self.peak_open.fetch_max(open_now, Ordering::SeqCst);

        Ok(FakeTab {
            site: Arc::clone(&self.site),
            closed: Arc::clone(&self.closed),
            visits: Arc::clone(&self.visits),
            current: Current::Blank,
        })
    }
}

enum Current {
    Blank,
    Site(FakePage),
    Generated(String),
}

pub struct FakeTab {
    site: Arc<FakeSite>,
    closed: Arc<AtomicUsize>,
    visits: Arc<Mutex<Vec<String>>>,
    current: Current,
}

impl BrowserPage for FakeTab {
    async fn navigate(&mut self, url: &str, _timeout: Duration) -> Result<()> {
        let key = normalized_string(&Url::parse(url)?);
        let Some(page) = self.site.pages.get(&key).cloned() else {
            return Err(Error::Navigation {
                url: url.to_string(),
                reason: "404".to_string(),
            });
        };

        if !page.delay.is_zero() {
            tokio::time::sleep(page.delay).await;
        }
        if page.fail {
            return Err(Error::Navigation {
                url: url.to_string(),
                reason: "connection reset".to_string(),
            });
        }

        self.visits.lock().unwrap().push(key);
        self.current = Current::Site(page);
        Ok(())
    }

    async fn page_source(&mut self) -> Result<String> {
        Ok(match &self.current {
            Current::Blank => String::new(),
            Current::Site(page) => page.html.clone(),
            Current::Generated(html) => html.clone(),
        })
    }

    async fn evaluate(&mut self, script: &str, _args: Vec<Value>) -> Result<Value> {
        match &self.current {
            Current::Generated(html) if script == scripts::CONTENTS_ROW_RECTS => {
                let (rows, _) = self.site.layout_rows(html);
                let rects: Vec<Value> = rows
                    .into_iter()
                    .map(|(seq, top)| {
                        json!({
                            "seq": seq,
                            "left": ROW_LEFT,
                            "top": top,
                            "right": ROW_RIGHT,
                            "bottom": top + self.site.row_height,
                        })
                    })
                    .collect();
                Ok(Value::Array(rects))
            }
            _ => Ok(Value::Null),
        }
    }

    async fn set_content(&mut self, html: &str) -> Result<()> {
        self.current = Current::Generated(html.to_string());
        Ok(())
    }

    async fn set_viewport(&mut self, _width: u32, _height: u32) -> Result<()> {
        Ok(())
    }

    async fn print_pdf(&mut self, _options: &PrintOptions) -> Result<Vec<u8>> {
        let pages = match &self.current {
            Current::Blank => return Err(Error::Print("nothing loaded".to_string())),
            Current::Site(page) => page.pdf_pages,
            Current::Generated(html) => self.site.layout_rows(html).1,
        };
        Ok(pdf_with_pages(pages))
    }

    async fn close(self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}
