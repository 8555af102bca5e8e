//! Pipeline orchestration: seeds in, module outlines out
//!
//! `normalize → crawl → extract → infer`, once per seed. The pipeline never
//! prints or writes files; everything it learns is returned in a
//! [`RunReport`].

use crate::config::Config;
use crate::content::{ContentExtractor, PageContent};
use crate::crawler::{CrawlLimits, CrawlLogEntry, Crawler, SeedCrawl};
use crate::inference::{ExtractionResult, InferenceEngine};
use crate::url::{normalize_all, InvalidUrl, Seed};
use crate::{Result, ScoutError};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Per-run limits supplied by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub max_depth: u32,
    pub max_pages: u32,
    pub chars_per_page: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_depth: 1,
            max_pages: 10,
            chars_per_page: 1000,
        }
    }
}

impl RunOptions {
    /// Options taken from the `[crawler]` and `[extraction]` sections
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_depth: config.crawler.max_depth,
            max_pages: config.crawler.max_pages,
            chars_per_page: config.extraction.chars_per_page,
        }
    }
}

/// What the pipeline produced for one seed
#[derive(Debug, Clone, Serialize)]
pub struct SeedReport {
    pub seed: Seed,
    pub extraction: ExtractionResult,
    pub crawl_log: Vec<CrawlLogEntry>,
    pub pages_fetched: usize,
    pub pages_without_content: usize,
}

/// What the pipeline produced for a whole run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub seeds: Vec<SeedReport>,

    /// Inputs rejected during normalization
    pub invalid: Vec<InvalidUrl>,

    /// SHA-256 over the canonical seeds and limits
    pub fingerprint: String,
}

impl RunReport {
    pub fn for_seed(&self, seed: &Seed) -> Option<&SeedReport> {
        self.seeds.iter().find(|s| &s.seed == seed)
    }
}

/// Runs the full pipeline against a configuration
pub struct Pipeline {
    config: Config,
    engine: Option<InferenceEngine>,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            engine: None,
        }
    }

    /// Uses `engine` instead of building the default strategy chain
    pub fn with_engine(mut self, engine: InferenceEngine) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Crawls, extracts and infers modules for every valid seed
    ///
    /// Fails only when no seed survives normalization or a limit is zero.
    /// Per-page and per-strategy failures end up in the report instead.
    pub async fn run(&self, seeds: &[String], options: RunOptions) -> Result<RunReport> {
        let (valid, invalid) = normalize_all(seeds);
        if valid.is_empty() {
            return Err(ScoutError::NoValidSeeds {
                rejected: invalid.len(),
            });
        }

        let limits = CrawlLimits {
            max_depth: options.max_depth,
            max_pages: options.max_pages,
            ..CrawlLimits::from_config(&self.config.crawler)
        };
        limits.validate()?;
        if options.chars_per_page == 0 {
            return Err(ScoutError::InvalidLimit(
                "chars per page must be at least 1".to_string(),
            ));
        }

        let fingerprint = fingerprint(&valid, &options);
        tracing::info!(
            "Run {}: {} seeds, {} rejected",
            &fingerprint[..12],
            valid.len(),
            invalid.len()
        );

        let built;
        let engine = match &self.engine {
            Some(engine) => engine,
            None => {
                built = InferenceEngine::from_config(&self.config.inference)?;
                &built
            }
        };

        let crawler = Crawler::from_config(&self.config.crawler, &self.config.user_agent)?;
        let extractor = ContentExtractor::new(options.chars_per_page);
        let report = crawler.crawl(&valid, &limits).await;

        let mut seed_reports = Vec::with_capacity(report.seeds.len());
        for crawl in report.seeds {
            seed_reports.push(process_seed(crawl, &extractor, engine).await);
        }

        Ok(RunReport {
            seeds: seed_reports,
            invalid,
            fingerprint,
        })
    }
}

async fn process_seed(
    crawl: SeedCrawl,
    extractor: &ContentExtractor,
    engine: &InferenceEngine,
) -> SeedReport {
    let mut pages: Vec<PageContent> = Vec::with_capacity(crawl.pages.len());
    let mut without_content = 0;

    for page in &crawl.pages {
        match extractor.extract(page) {
            Ok(content) => pages.push(content),
            Err(e) => {
                tracing::debug!("{}", e);
                without_content += 1;
            }
        }
    }

    tracing::info!(
        "{}: {} pages fetched, {} with content",
        crawl.seed,
        crawl.pages.len(),
        pages.len()
    );

    let extraction = engine.infer(&pages).await;
    match extraction.strategy_used {
        Some(kind) => tracing::info!(
            "{}: {} modules via {} strategy",
            crawl.seed,
            extraction.modules.len(),
            kind
        ),
        None => tracing::warn!("{}: no modules inferred", crawl.seed),
    }

    SeedReport {
        seed: crawl.seed,
        extraction,
        crawl_log: crawl.log,
        pages_fetched: crawl.pages.len(),
        pages_without_content: without_content,
    }
}

/// Hex SHA-256 over the canonical seeds and run limits
pub fn fingerprint(seeds: &[Seed], options: &RunOptions) -> String {
    let mut hasher = Sha256::new();
    for seed in seeds {
        hasher.update(seed.as_str().as_bytes());
        hasher.update(b"\n");
    }
    hasher.update(
        format!(
            "depth={};pages={};chars={}",
            options.max_depth, options.max_pages, options.chars_per_page
        )
        .as_bytes(),
    );
    hex::encode(hasher.finalize())
}
