//! URL handling module for Module-Scout
//!
//! This module turns raw operator input into canonical [`Seed`]s, applies the
//! same canonical form to discovered links, and answers the host and
//! document-type questions the crawler asks before enqueueing a link.

mod domain;
mod normalize;

use crate::UrlError;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use url::Url;

// Re-export main functions
pub use domain::{extract_domain, is_document_url, same_host};
pub use normalize::{canonicalize, normalize_str};

/// A validated, canonical crawl starting point
///
/// Two inputs that address the same host and path (modulo case, trailing
/// slash, default port, duplicate slashes and fragment) produce equal seeds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Seed(Url);

impl Seed {
    /// The canonical URL
    pub fn url(&self) -> &Url {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// The lowercase host of this seed
    pub fn host(&self) -> &str {
        self.0.host_str().unwrap_or_default()
    }
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// A rejected input together with the reason it was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidUrl {
    pub input: String,
    pub reason: UrlError,
}

impl fmt::Display for InvalidUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}': {}", self.input, self.reason)
    }
}

/// Normalizes one raw seed string
///
/// # Examples
///
/// ```
/// use module_scout::url::normalize;
///
/// let seed = normalize("example.com/docs").unwrap();
/// assert_eq!(seed.as_str(), "https://example.com/docs");
/// ```
pub fn normalize(raw: &str) -> Result<Seed, UrlError> {
    normalize_str(raw).map(Seed)
}

/// Normalizes a batch of raw seeds
///
/// Valid entries are deduplicated by canonical form and keep their
/// first-seen order. Invalid entries are reported, never fatal to the batch.
pub fn normalize_all<I, S>(raws: I) -> (Vec<Seed>, Vec<InvalidUrl>)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut seeds = Vec::new();
    let mut invalid = Vec::new();

    for raw in raws {
        let raw = raw.as_ref();
        match normalize(raw) {
            Ok(seed) => {
                if seen.insert(seed.clone()) {
                    seeds.push(seed);
                } else {
                    tracing::debug!("Dropping duplicate seed {}", seed);
                }
            }
            Err(reason) => {
                tracing::warn!("Rejected seed '{}': {}", raw, reason);
                invalid.push(InvalidUrl {
                    input: raw.to_string(),
                    reason,
                });
            }
        }
    }

    (seeds, invalid)
}

/// Canonicalizes a discovered link, returning None if it is not crawlable
pub fn normalize_link(url: &Url) -> Option<Url> {
    canonicalize(url.clone()).ok()
}
