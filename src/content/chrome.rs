//! Chrome and boilerplate detection
//!
//! Chrome is anything on a page that frames the content rather than being
//! part of it: navigation, banners, sidebars, cookie popups, form controls.
//! Elements are judged by tag, ARIA role, class/id tokens and visibility.

use regex::Regex;
use scraper::ElementRef;
use std::sync::LazyLock;

/// Tags that never carry documentation content
const CHROME_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "nav", "aside", "footer", "form", "button",
    "input", "select", "textarea", "label", "iframe", "svg", "canvas", "head",
];

const CHROME_ROLES: &[&str] = &[
    "navigation",
    "banner",
    "contentinfo",
    "search",
    "complementary",
    "menu",
    "menubar",
];

/// Whole class/id tokens (split on whitespace, `-` and `_`)
const CHROME_TOKENS: &[&str] = &[
    "sidebar",
    "nav",
    "navbar",
    "navigation",
    "menu",
    "breadcrumb",
    "breadcrumbs",
    "cookie",
    "cookies",
    "popup",
    "modal",
    "ad",
    "ads",
    "advert",
    "advertisement",
];

/// Containers whose class names are never trusted to mark chrome
const STRUCTURAL_TAGS: &[&str] = &["html", "body", "main", "article"];

static BOILERPLATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:©|(?:copyright|all rights reserved|we use cookies|this site uses cookies|accept cookies|advertisement|subscribe|follow us|share this)\b)",
    )
    .expect("BUG: hardcoded boilerplate regex is invalid")
});

/// Returns true if `element` (and its subtree) is page chrome
///
/// `in_main` is true inside `<main>`/`<article>`, where a `<header>` is part
/// of the content (typically the article title) rather than the site banner.
pub fn is_chrome(element: &ElementRef, in_main: bool) -> bool {
    let el = element.value();
    let name = el.name();

    if CHROME_TAGS.contains(&name) {
        return true;
    }
    if name == "header" && !in_main {
        return true;
    }

    if el.attr("hidden").is_some() {
        return true;
    }
    if el
        .attr("aria-hidden")
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    {
        return true;
    }
    if el.attr("style").is_some_and(hides_element) {
        return true;
    }

    if let Some(role) = el.attr("role") {
        let role = role.trim().to_ascii_lowercase();
        if CHROME_ROLES.contains(&role.as_str()) {
            return true;
        }
    }

    if STRUCTURAL_TAGS.contains(&name) {
        return false;
    }

    let class_tokens = el.attr("class").into_iter();
    let id_tokens = el.attr("id").into_iter();
    class_tokens.chain(id_tokens).any(has_chrome_token)
}

fn has_chrome_token(value: &str) -> bool {
    value
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|t| !t.is_empty())
        .any(|t| CHROME_TOKENS.contains(&t.to_ascii_lowercase().as_str()))
}

fn hides_element(style: &str) -> bool {
    let compact: String = style
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    compact.contains("display:none") || compact.contains("visibility:hidden")
}

/// Returns true if a non-heading line is boilerplate (copyright, cookie
/// banners, social prompts)
pub fn is_boilerplate(text: &str) -> bool {
    BOILERPLATE.is_match(text)
}
