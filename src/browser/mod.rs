//! Browser-control seam.
//!
//! The pipeline only needs a handful of operations from a headless browser:
//! load a URL or a synthetic HTML document, read the DOM, run a script and
//! print the page to PDF. [`BrowserEngine`] hands out pages; every page must be
//! given back through [`BrowserPage::close`] once the caller is done with it.

pub mod webdriver;

use crate::error::Result;
use crate::geometry::PageBox;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

pub use webdriver::WebDriverEngine;

/// Page margins in centimetres
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl Margins {
    pub const fn uniform(cm: f64) -> Self {
        Self {
            top: cm,
            bottom: cm,
            left: cm,
            right: cm,
        }
    }
}

/// How a page is printed to PDF. Header and footer are always off.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrintOptions {
    pub page: PageBox,
    pub margins: Margins,
    pub print_background: bool,
}

impl PrintOptions {
    /// Articles: A4 with 1cm margins
    pub const ARTICLE: PrintOptions = PrintOptions {
        page: PageBox::A4,
        margins: Margins::uniform(1.0),
        print_background: true,
    };

    /// Cover and contents: A4 edge to edge
    pub const FULL_BLEED: PrintOptions = PrintOptions {
        page: PageBox::A4,
        margins: Margins::uniform(0.0),
        print_background: true,
    };
}

/// A single browser tab owned by one worker at a time
pub trait BrowserPage: Send {
    /// Loads `url`, failing if it takes longer than `timeout`
    fn navigate(&mut self, url: &str, timeout: Duration) -> impl Future<Output = Result<()>> + Send;

    /// Serialized DOM of the current document
    fn page_source(&mut self) -> impl Future<Output = Result<String>> + Send;

    /// Runs `script` as a function body with `args` bound to `arguments`
    fn evaluate(
        &mut self,
        script: &str,
        args: Vec<Value>,
    ) -> impl Future<Output = Result<Value>> + Send;

    /// Replaces the current document with generated HTML
    fn set_content(&mut self, html: &str) -> impl Future<Output = Result<()>> + Send;

    /// Resizes the layout viewport to the given CSS pixel size
    fn set_viewport(&mut self, width: u32, height: u32) -> impl Future<Output = Result<()>> + Send;

    /// Prints the current document
    fn print_pdf(&mut self, options: &PrintOptions) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// Releases the page; must be called on every exit path
    fn close(self) -> impl Future<Output = ()> + Send;
}

/// Source of browser pages
pub trait BrowserEngine: Send + Sync + 'static {
    type Page: BrowserPage + 'static;

    fn open_page(&self) -> impl Future<Output = Result<Self::Page>> + Send;
}
