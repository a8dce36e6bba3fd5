use rand::Rng;
use sha2::{Digest, Sha256};
use url::Url;

const FILENAME_MAX_LEN: usize = 100;
const ARTICLE_STEM_MAX_LEN: usize = 90;

/// Removes characters that are not allowed in filenames and caps the length
pub fn sanitize_filename(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, '\\' | '/' | '*' | '?' | ':' | '"' | '<' | '>' | '|'))
        .take(FILENAME_MAX_LEN)
        .collect();
    cleaned.trim().to_string()
}

/// Filename-friendly version of a human title: letters, digits and ` .-_()`
pub fn slugify_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || " .-_()".contains(c) {
                c
            } else {
                ' '
            }
        })
        .collect();
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    let capped: String = collapsed.chars().take(120).collect();
    if capped.is_empty() {
        "Document".to_string()
    } else {
        capped
    }
}

fn path_segments(url: &Url) -> Vec<String> {
    url.path_segments()
        .map(|segments| {
            segments
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// Book title derived from the seed URL: last path segment in title case,
/// or the host for a bare domain
pub fn document_title_from_url(url: &Url) -> String {
    match path_segments(url).last() {
        Some(last) => last
            .split(['-', '_'])
            .filter(|w| !w.is_empty())
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" "),
        None => url.host_str().unwrap_or("Document").to_string(),
    }
}

/// Output directory derived from the seed URL
pub fn default_output_dir_from_url(url: &Url) -> String {
    let source = path_segments(url)
        .last()
        .cloned()
        .or_else(|| url.host_str().map(|h| h.to_string()))
        .unwrap_or_default();

    let slug: String = source
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '-' })
        .collect();
    let slug = slug
        .split('-')
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    let slug: String = slug.chars().take(60).collect();

    if slug.is_empty() {
        "Docs".to_string()
    } else {
        slug
    }
}

/// Merged file name for a book title
pub fn merged_filename(document_title: &str) -> String {
    format!("{} Complete.pdf", slugify_filename(document_title))
}

/// First eight hex digits of the URL's SHA-256
pub fn url_digest(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    hex::encode(digest)[..8].to_string()
}

/// Six random hex digits
pub fn random_suffix() -> String {
    let bytes: [u8; 3] = rand::rng().random();
    hex::encode(bytes)
}

/// Output file name for one article.
///
/// Stable names sort by discovery order and never change between runs; the
/// other mode appends a random suffix so repeated runs never collide.
pub fn article_filename(sequence: usize, url: &str, title: &str, stable: bool) -> String {
    let section = Url::parse(url)
        .ok()
        .map(|u| path_segments(&u))
        .and_then(|parts| {
            if parts.len() > 1 {
                Some(parts[parts.len() - 2].clone())
            } else {
                None
            }
        })
        .unwrap_or_else(|| "misc".to_string());

    let stem: String = sanitize_filename(&format!("{}-{}", section, title))
        .chars()
        .take(ARTICLE_STEM_MAX_LEN)
        .collect();
    let stem = if stem.is_empty() {
        "Untitled".to_string()
    } else {
        stem
    };
    let digest = url_digest(url);

    if stable {
        format!("{:04}-{}-{}.pdf", sequence, stem, digest)
    } else {
        format!("{}-{}-{}.pdf", stem, digest, random_suffix())
    }
}
