use thiserror::Error;

/// Errors produced while building a book from a site.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("WebDriver session error: {0}")]
    Session(#[from] fantoccini::error::NewSessionError),

    #[error("WebDriver command error: {0}")]
    Command(#[from] fantoccini::error::CmdError),

    #[error("Could not replace {path}: {source}")]
    Persist {
        path: String,
        #[source]
        source: tempfile::PersistError,
    },

    #[error("Failed to load {url}: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Timed out after {seconds}s loading {url}")]
    Timeout { url: String, seconds: u64 },

    #[error("Print failed: {0}")]
    Print(String),

    #[error("No pages were discovered")]
    NoPages,

    #[error("No PDFs to merge")]
    NothingToMerge,

    #[error("Missing section artifact: {0}")]
    MissingSection(String),
}

pub type Result<T> = std::result::Result<T, Error>;
