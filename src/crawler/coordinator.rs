//! Crawler coordinator - worker pool orchestration
//!
//! Seeds are crawled one after another. For each seed a fixed pool of tokio
//! tasks pulls from the shared [`CrawlContext`] until the frontier is empty
//! or a budget runs out. At the seed's deadline no new fetch is claimed;
//! fetches already in flight finish and their pages are kept.

use super::scheduler::{Claim, CrawlContext, QueuedUrl, StopReason};
use super::{discover_links, CrawlLimits, CrawlReport, FetchResult, FetchStatus, Fetcher, SkipReason};
use crate::config::{CrawlerConfig, UserAgentConfig};
use crate::url::{same_host, Seed};
use crate::Result;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use url::Url;

/// Bounded, concurrent crawler for documentation sites
#[derive(Debug, Clone)]
pub struct Crawler {
    fetcher: Fetcher,
    workers: usize,
}

impl Crawler {
    pub fn new(fetcher: Fetcher, workers: usize) -> Self {
        Self {
            fetcher,
            workers: workers.max(1),
        }
    }

    /// Builds a crawler from configuration
    pub fn from_config(crawler: &CrawlerConfig, user_agent: &UserAgentConfig) -> Result<Self> {
        let fetcher = Fetcher::from_config(crawler, user_agent)?;
        Ok(Self::new(fetcher, crawler.workers as usize))
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    /// Crawls every seed within `limits`
    ///
    /// The visited set is shared across seeds, so a page reachable from two
    /// seeds is fetched once and attributed to the first. Never fails:
    /// unreachable seeds simply yield zero pages and a log entry.
    pub async fn crawl(&self, seeds: &[Seed], limits: &CrawlLimits) -> CrawlReport {
        let fetcher = Arc::new(self.fetcher.with_page_timeout(limits.page_timeout));
        let ctx = Arc::new(CrawlContext::new(limits.clone()));
        let mut report = CrawlReport::default();

        for seed in seeds {
            let started = Instant::now();
            let deadline = started + limits.seed_time_budget;

            tracing::info!(
                "Crawling {} (depth {}, up to {} pages)",
                seed,
                limits.max_depth,
                limits.max_pages
            );

            if ctx.begin_seed(seed, deadline) {
                self.run_workers(&ctx, &fetcher, seed, deadline).await;
            } else {
                tracing::info!("{} was already crawled from an earlier seed", seed);
            }

            if let Some(crawl) = ctx.finish_seed() {
                tracing::info!(
                    "Finished {} in {:.1}s: {} pages, {} skipped or failed{}",
                    seed,
                    started.elapsed().as_secs_f64(),
                    crawl.pages.len(),
                    crawl.log.len(),
                    crawl
                        .stopped
                        .map(|r| format!(" ({})", r))
                        .unwrap_or_default()
                );
                report.seeds.push(crawl);
            }
        }

        report
    }

    async fn run_workers(
        &self,
        ctx: &Arc<CrawlContext>,
        fetcher: &Arc<Fetcher>,
        seed: &Seed,
        deadline: Instant,
    ) {
        let mut workers = JoinSet::new();
        for id in 0..self.workers {
            workers.spawn(worker(
                id,
                Arc::clone(ctx),
                Arc::clone(fetcher),
                seed.clone(),
            ));
        }

        if tokio::time::timeout_at(deadline, drain(&mut workers, seed))
            .await
            .is_err()
        {
            // No new claims; in-flight fetches run to completion and are kept
            tracing::warn!("Time budget exhausted for {}, finishing in-flight fetches", seed);
            ctx.stop(StopReason::TimeBudget);
            drain(&mut workers, seed).await;
        }
    }
}

async fn drain(workers: &mut JoinSet<()>, seed: &Seed) {
    while let Some(joined) = workers.join_next().await {
        if let Err(e) = joined {
            tracing::error!("Crawl worker for {} ended abnormally: {}", seed, e);
        }
    }
}

/// One worker: claim, fetch, report, repeat
async fn worker(id: usize, ctx: Arc<CrawlContext>, fetcher: Arc<Fetcher>, seed: Seed) {
    loop {
        let notified = ctx.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        match ctx.claim() {
            Claim::Fetch(item) => {
                tracing::debug!("[worker {}] fetching {} (depth {})", id, item.url, item.depth);
                let result = fetcher.fetch(&item.url, item.depth).await;
                let (result, links) = review(&seed, &item, result, ctx.limits());
                ctx.complete(&item, result, links);
            }
            Claim::Wait => notified.await,
            Claim::Done => break,
        }
    }

    ctx.wake_all();
}

/// Applies seed-level rules to a finished fetch and collects its links
///
/// A redirect that leaves the seed's host turns the page into a skip. Links
/// are only parsed when the page is not already at the depth limit.
fn review(
    seed: &Seed,
    item: &QueuedUrl,
    mut result: FetchResult,
    limits: &CrawlLimits,
) -> (FetchResult, Vec<Url>) {
    let FetchStatus::Ok { body, .. } = &result.status else {
        return (result, Vec::new());
    };

    if !same_host(seed.url(), &result.final_url) {
        tracing::info!(
            "{} redirected off-domain to {}, skipping",
            result.url,
            result.final_url
        );
        result.status = FetchStatus::Skipped(SkipReason::OffDomainRedirect {
            target: result.final_url.to_string(),
        });
        return (result, Vec::new());
    }

    let links = if item.depth < limits.max_depth {
        discover_links(body, &result.final_url, seed.url())
    } else {
        Vec::new()
    };

    (result, links)
}
