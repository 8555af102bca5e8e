//! Crawler module for web page fetching
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry logic
//! - HTML parsing and link discovery
//! - The shared crawl context (visited set, frontier, budgets)
//! - Worker pool coordination per seed

mod coordinator;
mod fetcher;
mod parser;
mod scheduler;

pub use coordinator::Crawler;
pub use fetcher::{
    build_http_client, is_html, FetchError, FetchFailure, FetchPolicy, FetchResult, FetchStatus,
    Fetcher, SkipReason,
};
pub use parser::{discover_links, parse_html, ParsedPage};
pub use scheduler::{Claim, CrawlContext, QueuedUrl, StopReason};

use crate::config::CrawlerConfig;
use crate::state::PageState;
use crate::url::Seed;
use crate::{Result, ScoutError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// Bounds on one crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlLimits {
    /// Maximum link hops from a seed (0 = seed only)
    pub max_depth: u32,

    /// Maximum pages fetched per seed
    pub max_pages: u32,

    /// Hard timeout for each HTTP request
    pub page_timeout: Duration,

    /// Wall-clock budget per seed
    pub seed_time_budget: Duration,
}

impl CrawlLimits {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_depth: config.max_depth,
            max_pages: config.max_pages,
            page_timeout: Duration::from_secs(config.per_page_timeout_seconds),
            seed_time_budget: Duration::from_secs(config.seed_time_budget_seconds),
        }
    }

    /// Rejects limits that would make a crawl meaningless
    pub fn validate(&self) -> Result<()> {
        if self.max_pages == 0 {
            return Err(ScoutError::InvalidLimit(
                "max pages must be at least 1".to_string(),
            ));
        }
        if self.page_timeout.is_zero() {
            return Err(ScoutError::InvalidLimit(
                "per-page timeout must be greater than 0".to_string(),
            ));
        }
        if self.seed_time_budget.is_zero() {
            return Err(ScoutError::InvalidLimit(
                "seed time budget must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// One line of the crawl log: a page that was skipped or failed
#[derive(Debug, Clone, Serialize)]
pub struct CrawlLogEntry {
    pub seed: String,
    pub url: String,
    pub depth: u32,
    pub state: PageState,
    pub reason: String,
    pub retries: u32,
    pub at: DateTime<Utc>,
}

impl CrawlLogEntry {
    /// Builds the log entry for a fetch that did not produce a page
    pub fn from_result(seed: &Seed, result: &FetchResult) -> Option<Self> {
        let (reason, retries) = match &result.status {
            FetchStatus::Ok { .. } => return None,
            FetchStatus::Skipped(reason) => (reason.to_string(), 0),
            FetchStatus::Failed(failure) => (failure.to_string(), failure.retries()),
        };

        Some(Self {
            seed: seed.to_string(),
            url: result.url.to_string(),
            depth: result.depth,
            state: result.page_state(),
            reason,
            retries,
            at: result.fetched_at,
        })
    }
}

/// Everything one seed's crawl produced
#[derive(Debug, Clone)]
pub struct SeedCrawl {
    pub seed: Seed,

    /// Successfully fetched pages, in completion order
    pub pages: Vec<FetchResult>,

    /// Skipped and failed pages
    pub log: Vec<CrawlLogEntry>,

    /// Why the crawl stopped before the frontier ran dry, if it did
    pub stopped: Option<StopReason>,
}

/// Result of crawling a batch of seeds
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    pub seeds: Vec<SeedCrawl>,
}

impl CrawlReport {
    /// All fetched pages across seeds
    pub fn pages(&self) -> impl Iterator<Item = &FetchResult> {
        self.seeds.iter().flat_map(|s| s.pages.iter())
    }

    /// All log entries across seeds
    pub fn log(&self) -> impl Iterator<Item = &CrawlLogEntry> {
        self.seeds.iter().flat_map(|s| s.log.iter())
    }

    /// The crawl for one seed
    pub fn for_seed(&self, seed: &Seed) -> Option<&SeedCrawl> {
        self.seeds.iter().find(|s| &s.seed == seed)
    }
}
