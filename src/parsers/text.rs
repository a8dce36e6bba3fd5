/// Collapses runs of whitespace into single spaces and trims the ends
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Removes any of the given suffixes (site names such as `" | Example Docs"`)
/// from a title, then trims it.
pub fn strip_site_suffix(title: &str, suffixes: &[String]) -> String {
    let mut stripped = title.trim();
    for suffix in suffixes {
        if suffix.is_empty() {
            continue;
        }
        if let Some(rest) = stripped.strip_suffix(suffix.as_str()) {
            stripped = rest.trim_end();
        }
    }
    stripped.to_string()
}

/// Escapes text for inclusion in generated HTML
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
