//! Link discovery for the crawler
//!
//! Parses a fetched page for:
//! - Links to follow (from <a> tags and canonical links)
//! - The page title, used in debug output
//!
//! Links are resolved against `<base href>` when present, otherwise against
//! the page's final URL, and canonicalized so they compare equal to seeds.

use crate::url::{is_document_url, normalize_link, same_host};
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Canonical absolute links, deduplicated, in document order
    pub links: Vec<Url>,
}

/// Parses HTML content and extracts links and title
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` anywhere in the document
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:`, `data:` links
/// - Fragment-only links (same-page anchors)
/// - Anything that is not HTTP(S) after resolution
///
/// # Example
///
/// ```
/// use module_scout::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page/">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &base_url);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.links[0].as_str(), "https://example.com/page");
/// ```
pub fn parse_html(html: &str, page_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);
    let base = base_href(&document, page_url).unwrap_or_else(|| page_url.clone());

    ParsedPage {
        title: extract_title(&document),
        links: extract_links(&document, &base),
    }
}

/// Links from `html` worth enqueueing for a crawl rooted at `seed`
///
/// Keeps only same-host links that look like document pages. The page's
/// own URL is dropped.
pub fn discover_links(html: &str, page_url: &Url, seed: &Url) -> Vec<Url> {
    parse_html(html, page_url)
        .links
        .into_iter()
        .filter(|link| link != page_url)
        .filter(|link| same_host(seed, link))
        .filter(is_document_url)
        .collect()
}

fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Resolves `<base href>` if the document declares one
fn base_href(document: &Html, page_url: &Url) -> Option<Url> {
    let selector = Selector::parse("base[href]").ok()?;
    let href = document.select(&selector).next()?.value().attr("href")?;
    page_url.join(href.trim()).ok()
}

fn extract_links(document: &Html, base: &Url) -> Vec<Url> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    let mut push = |href: &str| {
        if let Some(url) = resolve_link(href, base) {
            if seen.insert(url.as_str().to_string()) {
                links.push(url);
            }
        }
    };

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }
            if let Some(href) = element.value().attr("href") {
                push(href);
            }
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(href) = element.value().attr("href") {
                push(href);
            }
        }
    }

    links
}

/// Resolves a link href to a canonical absolute URL
///
/// Returns None for special schemes, same-page anchors, unparsable hrefs
/// and anything the URL normalizer rejects.
fn resolve_link(href: &str, base: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let absolute = base.join(href).ok()?;
    normalize_link(&absolute)
}
