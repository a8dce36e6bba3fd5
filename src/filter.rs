use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

/// Configuration for deciding which links belong in the book
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlFilterConfig {
    /// Whether to follow links to other hosts
    #[serde(default)]
    pub allow_external: bool,

    /// Host restriction (only used when `allow_external` is false)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_host: Option<String>,

    /// Substring every followed URL must contain
    #[serde(default)]
    pub path_pattern: String,

    /// Regex patterns matched against the URL path; any hit rejects the link
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

/// Paths and suffixes that never hold article content
pub fn default_exclude_patterns() -> Vec<String> {
    vec![
        r"\.(pdf|zip|dmg)$".to_string(),
        r"/(search|download|downloads|forums?|account|contact)(/|$)".to_string(),
    ]
}

impl Default for UrlFilterConfig {
    fn default() -> Self {
        Self {
            allow_external: false,
            required_host: None,
            path_pattern: String::new(),
            exclude_patterns: default_exclude_patterns(),
        }
    }
}

/// Decides which anchors are followed and how URLs are normalized
#[derive(Debug)]
pub struct UrlFilter {
    config: UrlFilterConfig,
    exclude_regexes: Vec<Regex>,
}

impl UrlFilter {
    /// Create a new URL filter from configuration
    pub fn new(config: UrlFilterConfig) -> Result<Self, regex::Error> {
        let mut exclude_regexes = Vec::with_capacity(config.exclude_patterns.len());
        for pattern in &config.exclude_patterns {
            exclude_regexes.push(Regex::new(pattern)?);
        }

        Ok(Self {
            config,
            exclude_regexes,
        })
    }

    /// Create a filter scoped to the seed's host and the given path pattern
    pub fn for_seed(
        seed: &Url,
        path_pattern: &str,
        allow_external: bool,
        extra_excludes: &[String],
    ) -> Result<Self, regex::Error> {
        let mut exclude_patterns = default_exclude_patterns();
        exclude_patterns.extend(extra_excludes.iter().cloned());

        Self::new(UrlFilterConfig {
            allow_external,
            required_host: if allow_external {
                None
            } else {
                seed.host_str().map(|h| h.to_string())
            },
            path_pattern: path_pattern.to_string(),
            exclude_patterns,
        })
    }

    /// Resolves an `href` against the page it was found on and returns the
    /// resolved URL (fragment removed) when it should be followed.
    pub fn accept_link(&self, base: &Url, href: &str) -> Option<Url> {
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') {
            return None;
        }

        let mut resolved = base.join(href).ok()?;
        if !matches!(resolved.scheme(), "http" | "https") {
            return None;
        }

        resolved.set_fragment(None);
        // the pattern is matched before normalization strips the trailing slash
        if self.should_crawl(&resolved) {
            Some(resolved)
        } else {
            ::log::trace!("URL filter rejected: {}", resolved);
            None
        }
    }

    /// Determine if a URL passes every filtering rule
    pub fn should_crawl(&self, url: &Url) -> bool {
        if !self.is_in_host_scope(url) {
            return false;
        }

        if !self.config.path_pattern.is_empty() && !url.as_str().contains(&self.config.path_pattern)
        {
            return false;
        }

        let path = url.path();
        !self.exclude_regexes.iter().any(|regex| regex.is_match(path))
    }

    fn is_in_host_scope(&self, url: &Url) -> bool {
        if self.config.allow_external {
            return true;
        }

        match (&self.config.required_host, url.host_str()) {
            (Some(required), Some(host)) => required == host,
            _ => false,
        }
    }
}

/// Strips query, fragment and trailing slash so equivalent links compare equal
pub fn normalize_url(url: &Url) -> Url {
    let mut normalized = url.clone();
    normalized.set_fragment(None);
    normalized.set_query(None);

    let trimmed = normalized.path().trim_end_matches('/').to_string();
    normalized.set_path(&trimmed);
    normalized
}

/// Normalized URL as a string, without the slash `Url` keeps for an empty path
pub fn normalized_string(url: &Url) -> String {
    normalize_url(url).as_str().trim_end_matches('/').to_string()
}

/// Identity used for crawl dedup: the path with trailing slashes removed
pub fn url_identity(url: &Url) -> String {
    let path = url.path().trim_end_matches('/');
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}
