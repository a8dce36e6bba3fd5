pub mod html;
pub mod text;


use crate::results::ContentFingerprint;
use sha2::{Digest, Sha256};

/// Title used when a page has no heading or `<title>`
pub const UNTITLED: &str = "Untitled";

/// Everything the pipeline needs from one page's source
#[derive(Debug, Clone)]
pub struct ParsedPage {
    /// Title with site suffixes stripped
    pub title: String,
    /// Normalized article text used for fingerprinting
    pub text: String,
}

impl ParsedPage {
    /// Digest of the normalized article text
    pub fn fingerprint(&self) -> ContentFingerprint {
        fingerprint_text(&self.text)
    }
}

/// Main parser for rendered page sources
pub struct Parser;

impl Parser {
    /// Parses an HTML page source, stripping the given title suffixes
    pub fn parse(source: &str, title_suffixes: &[String]) -> ParsedPage {
        let doc = scraper::Html::parse_document(source);

        let title = html::parse_title(&doc)
            .map(|t| text::strip_site_suffix(&t, title_suffixes))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| UNTITLED.to_string());

        ParsedPage {
            title,
            text: html::parse_article_text(&doc),
        }
    }

    /// Extracts only the anchors from a page source
    pub fn parse_links(source: &str) -> Vec<String> {
        let doc = scraper::Html::parse_document(source);
        html::parse_links(&doc)
    }
}

/// SHA-256 of normalized text, hex encoded
pub fn fingerprint_text(text: &str) -> ContentFingerprint {
    let normalized = text::collapse_whitespace(text);
    let digest = Sha256::digest(normalized.as_bytes());
    ContentFingerprint::from_hex(hex::encode(digest))
}
