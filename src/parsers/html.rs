use crate::parsers::text;
use scraper::{ElementRef, Html, Node, Selector};

/// Elements whose text changes between visits and must not affect dedup
const DYNAMIC_SELECTOR: &str = "[data-dynamic], .timestamp, time, script, style, noscript";

/// Extracts every anchor `href` in document order
pub fn parse_links(doc: &Html) -> Vec<String> {
    let link_selector = Selector::parse("a[href]").unwrap();
    let links = doc
        .select(&link_selector)
        .filter_map(|e| e.value().attr("href"))
        .map(|s| s.to_string())
        .collect::<Vec<String>>();

    ::log::debug!("HTML parser found {} links", links.len());
    links
}

/// Picks the article title: first `h1`, then `<title>`, then first `h2`
pub fn parse_title(doc: &Html) -> Option<String> {
    ["h1", "title", "h2"].iter().find_map(|tag| {
        let selector = Selector::parse(tag).unwrap();
        doc.select(&selector)
            .next()
            .map(|e| text::collapse_whitespace(&e.text().collect::<String>()))
            .filter(|t| !t.is_empty())
    })
}

/// Text of `<main>` (or `<body>`) with dynamic sub-elements left out
pub fn parse_article_text(doc: &Html) -> String {
    let main_selector = Selector::parse("main").unwrap();
    let body_selector = Selector::parse("body").unwrap();
    let dynamic = Selector::parse(DYNAMIC_SELECTOR).unwrap();

    let root = doc
        .select(&main_selector)
        .next()
        .or_else(|| doc.select(&body_selector).next());

    let mut out = String::new();
    if let Some(root) = root {
        collect_text(root, &dynamic, &mut out);
    }
    text::collapse_whitespace(&out)
}

fn collect_text(element: ElementRef<'_>, skip: &Selector, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(t) => {
                out.push_str(t);
                out.push(' ');
            }
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    if !skip.matches(&child_el) {
                        collect_text(child_el, skip, out);
                    }
                }
            }
            _ => {}
        }
    }
}
