//! Deterministic heading-based module inference
//!
//! On each page the shallowest heading level present marks module
//! boundaries and the next deeper level present marks submodules. Pages
//! with no deeper level use the list items of a module's section as its
//! submodules instead. Identical headings (same level, same normalized text)
//! from different pages merge into one module.

use super::describe::{describe, placeholder, truncate_at_word};
use super::strategy::{ModuleStrategy, StrategyFailure, StrategyKind};
use super::{Module, Submodule};
use crate::content::{BlockKind, PageContent};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};

/// Longest list-item prefix accepted as a submodule name
const MAX_ITEM_NAME_CHARS: usize = 80;

/// Heading-hierarchy strategy; always available
#[derive(Debug, Clone)]
pub struct LocalStrategy {
    description_max_chars: usize,
}

#[derive(Debug, Default)]
struct SubSection {
    name: String,
    prose: Vec<String>,
    /// Text carried by the list item itself, if it was one
    item_text: Option<String>,
}

#[derive(Debug)]
struct Section {
    level: u8,
    name: String,
    prose: Vec<String>,
    subs: Vec<SubSection>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    /// Text here belongs to nothing
    Outside,
    ModuleBody,
    SubBody,
    /// Just after a list item that became a submodule
    AfterItem,
}

/// A module being assembled; `None` descriptions are still placeholders
#[derive(Debug)]
struct Draft {
    name: String,
    description: Option<String>,
    submodules: Vec<(String, Option<String>)>,
}

impl Draft {
    fn absorb(&mut self, other: Draft) {
        if self.description.is_none() {
            self.description = other.description;
        }
        for (name, description) in other.submodules {
            let existing = self
                .submodules
                .iter_mut()
                .find(|(n, _)| n.to_lowercase() == name.to_lowercase());
            match existing {
                Some((_, slot)) if slot.is_none() => *slot = description,
                Some(_) => {}
                None => self.submodules.push((name, description)),
            }
        }
    }

    fn into_module(self) -> Module {
        let description = self
            .description
            .unwrap_or_else(|| placeholder(&self.name));
        let submodules = self
            .submodules
            .into_iter()
            .map(|(name, description)| {
                let description = description.unwrap_or_else(|| placeholder(&name));
                Submodule { name, description }
            })
            .collect();

        Module {
            name: self.name,
            description,
            submodules,
        }
    }
}

impl LocalStrategy {
    pub fn new(description_max_chars: usize) -> Self {
        Self {
            description_max_chars,
        }
    }

    /// Infers modules across all pages, merging identical headings
    pub fn infer(&self, pages: &[PageContent]) -> Vec<Module> {
        let mut drafts: Vec<Draft> = Vec::new();
        let mut index: HashMap<(u8, String), usize> = HashMap::new();

        for page in pages {
            let sections = sections(page);
            tracing::trace!("{}: {} sections", page.url, sections.len());

            for section in sections {
                let key = (section.level, normalize_key(&section.name));
                let draft = self.draft(section);
                match index.get(&key) {
                    Some(&i) => drafts[i].absorb(draft),
                    None => {
                        index.insert(key, drafts.len());
                        drafts.push(draft);
                    }
                }
            }
        }

        drafts.into_iter().map(Draft::into_module).collect()
    }

    fn draft(&self, section: Section) -> Draft {
        let max = self.description_max_chars;
        let description = describe(&section.prose.join(" "), &section.name, 2, max);

        let submodules = section
            .subs
            .into_iter()
            .map(|sub| {
                let from_prose = describe(&sub.prose.join(" "), &sub.name, 1, max);
                let description = match sub.item_text {
                    Some(item) => from_prose.or(Some(truncate_at_word(&item, max))),
                    None => from_prose,
                };
                (sub.name, description)
            })
            .collect();

        Draft {
            name: section.name,
            description,
            submodules,
        }
    }
}

#[async_trait]
impl ModuleStrategy for LocalStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Local
    }

    async fn attempt(&self, pages: &[PageContent]) -> Result<Vec<Module>, StrategyFailure> {
        let modules = self.infer(pages);
        if modules.is_empty() {
            return Err(StrategyFailure::EmptyResult);
        }
        Ok(modules)
    }
}

/// Splits one page into module sections
fn sections(page: &PageContent) -> Vec<Section> {
    let levels: BTreeSet<u8> = page
        .blocks
        .iter()
        .filter_map(|b| b.kind.heading_level())
        .collect();

    let Some(&top) = levels.iter().next() else {
        return Vec::new();
    };
    let sub_level = levels.iter().copied().find(|&l| l > top);

    let mut sections: Vec<Section> = Vec::new();
    let mut cursor = Cursor::Outside;

    for block in &page.blocks {
        let text = block.text.clone();

        match block.kind {
            BlockKind::Heading(level) if level == top => {
                sections.push(Section {
                    level,
                    name: text,
                    prose: Vec::new(),
                    subs: Vec::new(),
                });
                cursor = Cursor::ModuleBody;
            }
            BlockKind::Heading(level) => {
                cursor = match sections.last_mut() {
                    Some(section) if Some(level) == sub_level => {
                        section.subs.push(SubSection {
                            name: text,
                            ..SubSection::default()
                        });
                        Cursor::SubBody
                    }
                    // Deeper headings and headings before the first module
                    _ => Cursor::Outside,
                };
            }
            BlockKind::ListItem if sub_level.is_none() => {
                let Some(section) = sections.last_mut() else {
                    continue;
                };
                if matches!(cursor, Cursor::ModuleBody | Cursor::AfterItem) {
                    section.subs.push(list_item_submodule(&text));
                    cursor = Cursor::AfterItem;
                }
            }
            BlockKind::Paragraph | BlockKind::TableRow | BlockKind::ListItem => {
                let Some(section) = sections.last_mut() else {
                    continue;
                };
                match cursor {
                    Cursor::ModuleBody => section.prose.push(text),
                    Cursor::SubBody => {
                        if let Some(sub) = section.subs.last_mut() {
                            sub.prose.push(text);
                        }
                    }
                    Cursor::AfterItem => {
                        if let Some(sub) = section.subs.last_mut() {
                            sub.prose.push(text.clone());
                        }
                        section.prose.push(text);
                        cursor = Cursor::ModuleBody;
                    }
                    Cursor::Outside => {}
                }
            }
        }
    }

    sections
}

/// Turns a list item into a submodule
///
/// `"Name: what it does"` and `"Name - what it does"` split into name and
/// description when the name part is short; otherwise the (shortened)
/// item text is the name and the full text its description.
fn list_item_submodule(text: &str) -> SubSection {
    for separator in [":", " - "] {
        if let Some((head, tail)) = text.split_once(separator) {
            let head = head.trim();
            let tail = tail.trim();
            if !head.is_empty() && head.chars().count() <= MAX_ITEM_NAME_CHARS {
                return SubSection {
                    name: head.to_string(),
                    prose: Vec::new(),
                    item_text: Some(if tail.is_empty() { head } else { tail }.to_string()),
                };
            }
        }
    }

    SubSection {
        name: truncate_at_word(text, MAX_ITEM_NAME_CHARS),
        prose: Vec::new(),
        item_text: Some(text.to_string()),
    }
}

fn normalize_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
