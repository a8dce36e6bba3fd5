use crate::geometry::CssRect;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A page found by the crawler, keyed by its normalized path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredUrl {
    /// Normalized absolute URL (no query, fragment or trailing slash)
    pub url: String,

    /// Link hops from the seed (0 = seed)
    pub depth: usize,
}

impl DiscoveredUrl {
    /// Create a new discovered URL
    pub fn new(url: String, depth: usize) -> Self {
        Self { url, depth }
    }
}

/// Digest of a page's normalized text, used only to spot duplicate articles
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentFingerprint(String);

impl ContentFingerprint {
    pub fn from_hex(hex: String) -> Self {
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A PDF written to disk together with its physical page count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub page_count: usize,
}

/// One rendered article. Never mutated once the renderer hands it over.
#[derive(Debug, Clone)]
pub struct RenderedSection {
    /// Position in discovery order (1-based)
    pub sequence: usize,

    /// Source URL
    pub url: String,

    /// Extracted page title
    pub title: String,

    /// Fingerprint of the article text
    pub fingerprint: ContentFingerprint,

    /// Rendered PDF
    pub artifact: Artifact,
}

impl RenderedSection {
    pub fn page_count(&self) -> usize {
        self.artifact.page_count
    }
}

/// Where a section starts, as printed on the contents page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionLayout {
    /// Sequence index of the section this row describes
    pub sequence: usize,

    pub title: String,

    /// 1-based starting page counting the cover but not the contents pages
    pub base_page: usize,

    /// Number shown on the contents page (`base_page` + contents page count)
    pub start_page: usize,
}

/// Clickable region of one contents row, in the contents page's own CSS pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TocLinkRect {
    /// Sequence index of the target section
    pub sequence: usize,

    /// Physical page of the contents render the row landed on (0-based)
    pub contents_page: usize,

    /// Row rectangle relative to the top-left corner of that page
    pub rect: CssRect,
}

/// Result of rendering the contents page once
#[derive(Debug, Clone)]
pub struct ContentsPage {
    pub artifact: Artifact,
    pub link_rects: Vec<TocLinkRect>,
}

/// What a finished run produced
#[derive(Debug, Clone)]
pub struct BookSummary {
    /// Merged PDF
    pub path: PathBuf,

    /// Layout of every section in the book, in order
    pub sections: Vec<SectionLayout>,

    pub contents_pages: usize,

    /// Whether contents numbering reached a fixed point
    pub converged: bool,
}
