//! Content extraction module
//!
//! Turns a fetched HTML page into an ordered sequence of [`ContentBlock`]s:
//! headings, paragraphs, list items and table rows, in document order, with
//! page chrome and boilerplate removed. Block order drives the hierarchy the
//! local inference strategy builds, so it is preserved exactly.

mod chrome;
mod extractor;

pub use chrome::{is_boilerplate, is_chrome};
pub use extractor::ContentExtractor;

use serde::Serialize;
use std::fmt;
use thiserror::Error;
use url::Url;

/// The structural role of a content block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    /// A heading with level 1..=6
    Heading(u8),
    Paragraph,
    ListItem,
    /// A table row, cells joined with `" | "`
    TableRow,
}

impl BlockKind {
    pub fn heading_level(&self) -> Option<u8> {
        match self {
            Self::Heading(level) => Some(*level),
            _ => None,
        }
    }

    pub fn is_heading(&self) -> bool {
        matches!(self, Self::Heading(_))
    }
}

/// One unit of page content
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentBlock {
    pub kind: BlockKind,
    pub text: String,
    pub source_url: Url,
}

impl ContentBlock {
    /// Number of characters in the block text
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl fmt::Display for ContentBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            BlockKind::Heading(level) => {
                write!(f, "{} {}", "#".repeat(level as usize), self.text)
            }
            BlockKind::ListItem => write!(f, "- {}", self.text),
            BlockKind::Paragraph | BlockKind::TableRow => f.write_str(&self.text),
        }
    }
}

/// The cleaned content of one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageContent {
    pub url: Url,
    pub blocks: Vec<ContentBlock>,
}

impl PageContent {
    /// Total characters across all blocks
    pub fn text_len(&self) -> usize {
        self.blocks.iter().map(ContentBlock::len).sum()
    }

    pub fn headings(&self) -> impl Iterator<Item = &ContentBlock> {
        self.blocks.iter().filter(|b| b.kind.is_heading())
    }

    /// Plain-text rendering, one block per line, headings marked with `#`
    pub fn render(&self) -> String {
        self.blocks
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Why a page produced no content
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// Nothing survived chrome and boilerplate removal
    #[error("no content extracted from {url}")]
    NoContent { url: Url },

    /// The fetch did not produce a body
    #[error("{url} was not fetched")]
    NotFetched { url: Url },
}
