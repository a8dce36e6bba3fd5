use crate::error::Result;
use crate::utils;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use url::Url;

/// Configuration for turning a site into a book
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookConfig {
    /// URL to start crawling from
    pub start_url: String,

    /// Substring every followed link must contain (defaults to the seed's path)
    #[serde(default)]
    pub url_pattern: Option<String>,

    /// Maximum link hops from the seed
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Maximum number of pages to discover
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Pause between crawl visits, in milliseconds
    #[serde(default)]
    pub crawl_delay_ms: u64,

    /// Whether to follow links to other hosts
    #[serde(default)]
    pub allow_external: bool,

    /// Additional regex patterns for paths to skip
    #[serde(default)]
    pub exclude_patterns: Vec<String>,

    /// Maximum number of pages rendered at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Navigation timeout in seconds
    #[serde(default = "default_navigation_timeout_secs")]
    pub navigation_timeout_secs: u64,

    /// Extra wait after a page loads, in milliseconds
    #[serde(default)]
    pub settle_ms: u64,

    /// Name article files by discovery order instead of a random suffix
    #[serde(default)]
    pub stable_filenames: bool,

    /// Site-name suffixes stripped from page titles
    #[serde(default = "default_title_suffixes")]
    pub title_suffixes: Vec<String>,

    /// Output directory (defaults to a slug of the seed URL)
    #[serde(default)]
    pub output_dir: Option<String>,

    /// Title printed on the cover (defaults to one derived from the seed URL)
    #[serde(default)]
    pub document_title: Option<String>,

    /// Subtitle printed on the cover
    #[serde(default = "default_cover_subtitle")]
    pub cover_subtitle: String,

    /// Name of the merged PDF (defaults to "<title> Complete.pdf")
    #[serde(default)]
    pub merged_filename: Option<String>,

    /// Keep the individual PDFs after merging
    #[serde(default = "default_true")]
    pub keep_separate: bool,

    /// Move the individual PDFs into `individual_pdfs/`
    #[serde(default = "default_true")]
    pub organize: bool,

    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
}

impl BookConfig {
    /// Create a new configuration with default values
    pub fn new(start_url: &str) -> Self {
        Self {
            start_url: start_url.to_string(),
            url_pattern: None,
            max_depth: default_max_depth(),
            max_pages: default_max_pages(),
            crawl_delay_ms: 0,
            allow_external: false,
            exclude_patterns: Vec::new(),
            concurrency: default_concurrency(),
            navigation_timeout_secs: default_navigation_timeout_secs(),
            settle_ms: 0,
            stable_filenames: false,
            title_suffixes: default_title_suffixes(),
            output_dir: None,
            document_title: None,
            cover_subtitle: default_cover_subtitle(),
            merged_filename: None,
            keep_separate: true,
            organize: true,
            webdriver_url: default_webdriver_url(),
        }
    }

    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn seed_url(&self) -> Result<Url> {
        Ok(Url::parse(&self.start_url)?)
    }

    /// Pattern links must contain; the seed's path when not configured
    pub fn resolved_pattern(&self) -> Result<String> {
        match &self.url_pattern {
            Some(pattern) => Ok(pattern.clone()),
            None => Ok(self.seed_url()?.path().to_string()),
        }
    }

    pub fn resolved_output_dir(&self) -> Result<String> {
        match &self.output_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(utils::default_output_dir_from_url(&self.seed_url()?)),
        }
    }

    pub fn resolved_document_title(&self) -> Result<String> {
        match &self.document_title {
            Some(title) => Ok(title.clone()),
            None => Ok(utils::document_title_from_url(&self.seed_url()?)),
        }
    }

    pub fn resolved_merged_filename(&self) -> Result<String> {
        match &self.merged_filename {
            Some(name) => Ok(name.clone()),
            None => Ok(utils::merged_filename(&self.resolved_document_title()?)),
        }
    }
}

fn default_max_depth() -> usize {
    2
}

fn default_max_pages() -> usize {
    500
}

/// min(16, available parallelism)
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        .min(16)
}

fn default_navigation_timeout_secs() -> u64 {
    60
}

fn default_title_suffixes() -> Vec<String> {
    vec![" | Apple Developer".to_string()]
}

fn default_cover_subtitle() -> String {
    "A comprehensive offline reference".to_string()
}

fn default_true() -> bool {
    true
}

/// Default value for webdriver_url
fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}
