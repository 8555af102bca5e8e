//! Document-order block extraction
//!
//! Walks the parsed DOM once, depth-first, skipping chrome subtrees and
//! emitting a block per heading, paragraph-like element, list item and
//! table row. Loose text inside containers is gathered and flushed as a
//! paragraph whenever a block boundary is reached.

use super::chrome::{is_boilerplate, is_chrome};
use super::{BlockKind, ContentBlock, ExtractError, PageContent};
use crate::config::ExtractionConfig;
use crate::crawler::{FetchResult, FetchStatus};
use scraper::{ElementRef, Html, Node};
use url::Url;

/// Maximum DOM nesting depth walked before a subtree is dropped
const MAX_NESTING_DEPTH: usize = 100;

/// Elements emitted whole as one paragraph
const PARAGRAPH_TAGS: &[&str] = &["p", "pre", "dt", "dd", "summary", "figcaption", "caption"];

/// Elements that delimit blocks but are walked for their children
const BLOCK_CONTAINERS: &[&str] = &[
    "address", "article", "blockquote", "body", "center", "details", "dialog", "div", "dl",
    "fieldset", "figure", "header", "hgroup", "html", "main", "ol", "section", "table", "tbody",
    "tfoot", "thead", "ul",
];

/// Elements that separate words when their text is gathered into one line
const WORD_BREAKING: &[&str] = &["p", "div", "li", "tr", "td", "th", "dt", "dd", "section"];

/// Extracts cleaned, ordered content blocks from HTML pages
#[derive(Debug, Clone)]
pub struct ContentExtractor {
    chars_per_page: usize,
}

impl ContentExtractor {
    /// Creates an extractor keeping at most `chars_per_page` characters per
    /// page (always at least the first block)
    pub fn new(chars_per_page: usize) -> Self {
        Self { chars_per_page }
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new(config.chars_per_page)
    }

    pub fn chars_per_page(&self) -> usize {
        self.chars_per_page
    }

    /// Extracts content from a successful fetch
    pub fn extract(&self, result: &FetchResult) -> Result<PageContent, ExtractError> {
        match &result.status {
            FetchStatus::Ok { body, .. } => self.extract_html(&result.final_url, body),
            _ => Err(ExtractError::NotFetched {
                url: result.url.clone(),
            }),
        }
    }

    /// Extracts content from raw HTML
    ///
    /// Deterministic: the same input always yields the same blocks.
    ///
    /// # Example
    ///
    /// ```
    /// use module_scout::content::{BlockKind, ContentExtractor};
    /// use url::Url;
    ///
    /// let url = Url::parse("https://example.com/").unwrap();
    /// let html = "<nav>Home</nav><h1>Account</h1><p>Manage it.</p>";
    /// let page = ContentExtractor::new(1000).extract_html(&url, html).unwrap();
    /// assert_eq!(page.blocks[0].kind, BlockKind::Heading(1));
    /// assert_eq!(page.blocks.len(), 2);
    /// ```
    pub fn extract_html(&self, url: &Url, html: &str) -> Result<PageContent, ExtractError> {
        let document = Html::parse_document(html);
        let root = document.root_element();
        let start = root
            .children()
            .filter_map(ElementRef::wrap)
            .find(|e| e.value().name() == "body")
            .unwrap_or(root);

        let mut walker = Walker::new(url);
        walker.walk(start, false, 0);
        walker.flush();

        let total = walker.blocks.len();
        let blocks = truncate(walker.blocks, self.chars_per_page);
        if blocks.len() < total {
            tracing::trace!(
                "{}: kept {} of {} blocks within {} chars",
                url,
                blocks.len(),
                total,
                self.chars_per_page
            );
        }

        if blocks.is_empty() {
            tracing::debug!("No content left on {} after filtering", url);
            return Err(ExtractError::NoContent { url: url.clone() });
        }

        Ok(PageContent {
            url: url.clone(),
            blocks,
        })
    }
}

struct Walker<'a> {
    url: &'a Url,
    blocks: Vec<ContentBlock>,
    inline: String,
}

impl<'a> Walker<'a> {
    fn new(url: &'a Url) -> Self {
        Self {
            url,
            blocks: Vec::new(),
            inline: String::new(),
        }
    }

    fn walk(&mut self, element: ElementRef<'_>, in_main: bool, depth: usize) {
        if depth > MAX_NESTING_DEPTH {
            tracing::warn!("{}: nesting deeper than {}, subtree dropped", self.url, MAX_NESTING_DEPTH);
            return;
        }

        for child in element.children() {
            match child.value() {
                Node::Text(text) => self.inline.push_str(text),
                Node::Element(_) => {
                    if let Some(child) = ElementRef::wrap(child) {
                        self.visit(child, in_main, depth + 1);
                    }
                }
                _ => {}
            }
        }
    }

    fn visit(&mut self, element: ElementRef<'_>, in_main: bool, depth: usize) {
        if is_chrome(&element, in_main) {
            return;
        }

        if let Some(level) = heading_level(&element) {
            self.flush();
            let text = collect_text(element, in_main, false);
            self.push(BlockKind::Heading(level), text);
            return;
        }

        let name = element.value().name();
        match name {
            "li" => {
                self.flush();
                let text = collect_text(element, in_main, true);
                self.push(BlockKind::ListItem, text);
                self.walk_nested_lists(element, in_main, depth);
            }
            "tr" => {
                self.flush();
                let cells: Vec<String> = element
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|c| matches!(c.value().name(), "td" | "th"))
                    .filter(|c| !is_chrome(c, in_main))
                    .map(|c| collect_text(c, in_main, false))
                    .filter(|c| !c.is_empty())
                    .collect();
                self.push(BlockKind::TableRow, cells.join(" | "));
            }
            "br" => self.inline.push(' '),
            "hr" => self.flush(),
            _ if PARAGRAPH_TAGS.contains(&name) => {
                self.flush();
                let text = collect_text(element, in_main, false);
                self.push(BlockKind::Paragraph, text);
            }
            _ if BLOCK_CONTAINERS.contains(&name) => {
                self.flush();
                let in_main = in_main || opens_main(&element);
                self.walk(element, in_main, depth);
                self.flush();
            }
            // Inline element: its text joins the surrounding paragraph
            _ => self.walk(element, in_main, depth),
        }
    }

    /// Emits list items of lists nested inside a list item
    fn walk_nested_lists(&mut self, element: ElementRef<'_>, in_main: bool, depth: usize) {
        if depth > MAX_NESTING_DEPTH {
            return;
        }
        for child in element.children().filter_map(ElementRef::wrap) {
            if is_chrome(&child, in_main) {
                continue;
            }
            match child.value().name() {
                "ul" | "ol" => self.walk(child, in_main, depth + 1),
                _ => self.walk_nested_lists(child, in_main, depth + 1),
            }
        }
    }

    fn flush(&mut self) {
        if self.inline.trim().is_empty() {
            self.inline.clear();
            return;
        }
        let text = std::mem::take(&mut self.inline);
        self.push(BlockKind::Paragraph, text);
    }

    fn push(&mut self, kind: BlockKind, raw: String) {
        let text = collapse_whitespace(&raw);
        if text.is_empty() {
            return;
        }
        if !kind.is_heading() && is_boilerplate(&text) {
            tracing::trace!("{}: dropped boilerplate '{}'", self.url, text);
            return;
        }
        self.blocks.push(ContentBlock {
            kind,
            text,
            source_url: self.url.clone(),
        });
    }
}

/// Heading level for `h1`..`h6` and `role="heading"` (aria-level, default 2)
fn heading_level(element: &ElementRef<'_>) -> Option<u8> {
    let el = element.value();
    let name = el.name();

    if name.len() == 2 && name.starts_with('h') {
        if let Some(level) = name[1..].parse::<u8>().ok().filter(|l| (1..=6).contains(l)) {
            return Some(level);
        }
    }

    let is_heading_role = el
        .attr("role")
        .is_some_and(|r| r.trim().eq_ignore_ascii_case("heading"));
    if is_heading_role {
        let level = el
            .attr("aria-level")
            .and_then(|l| l.trim().parse::<u8>().ok())
            .unwrap_or(2)
            .clamp(1, 6);
        return Some(level);
    }

    None
}

fn opens_main(element: &ElementRef<'_>) -> bool {
    let el = element.value();
    matches!(el.name(), "main" | "article")
        || el
            .attr("role")
            .is_some_and(|r| r.trim().eq_ignore_ascii_case("main"))
}

/// All non-chrome text below `element`, whitespace-collapsed
///
/// With `skip_lists`, nested `ul`/`ol` are left out so a list item's text
/// does not swallow its children.
fn collect_text(element: ElementRef<'_>, in_main: bool, skip_lists: bool) -> String {
    let mut out = String::new();
    gather_text(element, in_main, skip_lists, 0, &mut out);
    collapse_whitespace(&out)
}

fn gather_text(
    element: ElementRef<'_>,
    in_main: bool,
    skip_lists: bool,
    depth: usize,
    out: &mut String,
) {
    if depth > MAX_NESTING_DEPTH {
        return;
    }

    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let Some(child) = ElementRef::wrap(child) else {
                    continue;
                };
                if is_chrome(&child, in_main) {
                    continue;
                }
                let name = el.name();
                if skip_lists && (name == "ul" || name == "ol") {
                    continue;
                }
                if name == "br" {
                    out.push(' ');
                    continue;
                }

                let breaks = WORD_BREAKING.contains(&name);
                if breaks {
                    out.push(' ');
                }
                gather_text(child, in_main, skip_lists, depth + 1, out);
                if breaks {
                    out.push(' ');
                }
            }
            _ => {}
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keeps a prefix of whole blocks whose total length fits `budget`
///
/// The first block is kept even when it alone exceeds the budget.
fn truncate(blocks: Vec<ContentBlock>, budget: usize) -> Vec<ContentBlock> {
    let mut kept = Vec::new();
    let mut total = 0;

    for block in blocks {
        let len = block.len();
        if !kept.is_empty() && total + len > budget {
            break;
        }
        total += len;
        kept.push(block);
    }

    kept
}
