//! Content extraction from raw HTML.
//!
//! Best-effort parsing with the `scraper` crate: heavy markup is detached
//! from the parsed tree, navigation links are harvested from likely
//! containers, and the visible text is collapsed into one bounded string.
//! Everything here is synchronous CPU work; callers run it between I/O
//! waits and only ever receive owned data back.

use scraper::{ElementRef, Html, Node, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use url::Url;

/// Tag kinds that carry no readable content and get detached wholesale.
const REMOVABLE_TAGS: [&str; 13] = [
    "script", "style", "svg", "img", "video", "iframe", "noscript", "canvas", "link", "meta",
    "input", "button", "form",
];

/// Upper bound on extracted readable text, in characters.
pub const TEXT_LIMIT: usize = 5000;

/// Maximum number of navigation entries returned.
pub const NAV_LINK_CAP: usize = 15;

/// Maximum navigation label length, in characters.
pub const LABEL_LIMIT: usize = 30;

/// One harvested navigation link: visible label plus resolved absolute URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavEntry {
    pub label: String,
    pub link: String,
}

/// Everything the orchestrator needs from one page, as owned data.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub title: String,
    pub navigation: Vec<NavEntry>,
    pub text: String,
}

/// Clean and extract a page in one pass. The parsed tree never leaves this
/// module, so callers stay `Send`.
pub fn extract_page(html: &str, base: &Url) -> Extraction {
    let doc = clean_html(html);
    Extraction {
        title: page_title(&doc).unwrap_or_else(|| "Compressed Page".to_string()),
        navigation: extract_navigation(&doc, base),
        text: extract_text(&doc),
    }
}

/// Parse HTML (tolerant, never fails) and detach the denylisted tags and
/// every comment node.
pub fn clean_html(html: &str) -> Html {
    let mut doc = Html::parse_document(html);

    let mut doomed = Vec::new();
    for node in doc.tree.root().descendants() {
        match node.value() {
            Node::Comment(_) => doomed.push(node.id()),
            Node::Element(el) if REMOVABLE_TAGS.contains(&el.name()) => doomed.push(node.id()),
            _ => {}
        }
    }
    for id in doomed {
        if let Some(mut node) = doc.tree.get_mut(id) {
            node.detach();
        }
    }
    doc
}

/// The `<title>` text, if any.
pub fn page_title(doc: &Html) -> Option<String> {
    let title_sel = Selector::parse("title").unwrap();
    let title = doc
        .select(&title_sel)
        .next()
        .map(|el| collapse_whitespace(el.text()))?;
    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}

/// Harvest up to [`NAV_LINK_CAP`] navigation links.
///
/// Containers are searched in priority order: `<nav>` elements, elements
/// with `role="navigation"`, elements whose class or id contains "nav",
/// "menu", or "header", and finally the first `<ul>` under `<body>` when
/// nothing else matched. Anchors are walked in document order, resolved
/// against the base URL, and deduplicated by resolved URL.
pub fn extract_navigation(doc: &Html, base: &Url) -> Vec<NavEntry> {
    let nav_sel = Selector::parse("nav").unwrap();
    let role_sel = Selector::parse(r#"[role="navigation"]"#).unwrap();
    let any_sel = Selector::parse("*").unwrap();
    let ul_sel = Selector::parse("body ul").unwrap();
    let anchor_sel = Selector::parse("a[href]").unwrap();

    let mut containers: Vec<ElementRef> = doc.select(&nav_sel).collect();
    containers.extend(doc.select(&role_sel));
    containers.extend(doc.select(&any_sel).filter(|el| {
        ["class", "id"].iter().any(|attr| {
            el.value().attr(attr).is_some_and(|value| {
                let value = value.to_ascii_lowercase();
                value.contains("nav") || value.contains("menu") || value.contains("header")
            })
        })
    }));
    if containers.is_empty() {
        containers.extend(doc.select(&ul_sel).next());
    }

    let mut seen = HashSet::new();
    let mut entries = Vec::new();
    'containers: for container in containers {
        for anchor in container.select(&anchor_sel) {
            if entries.len() >= NAV_LINK_CAP {
                break 'containers;
            }
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let label = collapse_whitespace(anchor.text());
            // Empty labels, in-page anchors, and javascript pseudo-links
            // are useless to a text client.
            if label.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
                continue;
            }
            let Ok(resolved) = base.join(href) else {
                continue;
            };
            let link = resolved.to_string();
            if !seen.insert(link.clone()) {
                continue;
            }
            entries.push(NavEntry {
                label: truncate_chars(&label, LABEL_LIMIT),
                link,
            });
        }
    }
    entries
}

/// Visible text with whitespace collapsed to single spaces, truncated to
/// [`TEXT_LIMIT`] characters.
pub fn extract_text(doc: &Html) -> String {
    let text = collapse_whitespace(doc.root_element().text());
    truncate_chars(&text, TEXT_LIMIT)
}

fn collapse_whitespace<'a>(fragments: impl Iterator<Item = &'a str>) -> String {
    let mut words: Vec<&str> = Vec::new();
    for fragment in fragments {
        words.extend(fragment.split_whitespace());
    }
    words.join(" ")
}

/// Character-boundary-safe truncation.
pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
