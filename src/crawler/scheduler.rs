//! Shared crawl context for the worker pool
//!
//! This module handles:
//! - The visited set, global across every seed of a run
//! - The per-seed FIFO frontier (breadth-first by construction)
//! - Page and time budgets, with slots released for skipped pages
//! - Waking idle workers when new work or a terminal condition appears
//!
//! All state sits behind one `RwLock`. The lock is never held across an
//! `.await`; workers claim an item, release the lock, fetch, then report
//! back through [`CrawlContext::complete`].

use super::{CrawlLimits, CrawlLogEntry, FetchResult, FetchStatus, SeedCrawl};
use crate::state::PageState;
use crate::url::Seed;
use chrono::Utc;
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::futures::Notified;
use tokio::sync::Notify;
use tokio::time::Instant;
use url::Url;

/// A URL waiting in the frontier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedUrl {
    pub url: Url,

    /// Link hops from the seed
    pub depth: u32,
}

/// Why a seed's crawl ended before its frontier was empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    PageBudget,
    TimeBudget,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PageBudget => f.write_str("page budget exhausted"),
            Self::TimeBudget => f.write_str("time budget exhausted"),
        }
    }
}

/// What a worker should do next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    /// Fetch this URL; a budget slot is held until `complete`
    Fetch(QueuedUrl),

    /// Nothing claimable now, but in-flight fetches may add work
    Wait,

    /// The seed's crawl is over
    Done,
}

#[derive(Debug)]
struct SeedFrontier {
    seed: Seed,
    queue: VecDeque<QueuedUrl>,
    in_flight: Vec<QueuedUrl>,
    pages_used: u32,
    deadline: Instant,
    stopped: Option<StopReason>,
    pages: Vec<FetchResult>,
    log: Vec<CrawlLogEntry>,
}

impl SeedFrontier {
    fn skip_entry(&self, item: &QueuedUrl, state: PageState, reason: String) -> CrawlLogEntry {
        CrawlLogEntry {
            seed: self.seed.to_string(),
            url: item.url.to_string(),
            depth: item.depth,
            state,
            reason,
            retries: 0,
            at: Utc::now(),
        }
    }
}

#[derive(Debug, Default)]
struct CrawlState {
    visited: HashSet<String>,
    current: Option<SeedFrontier>,
}

/// Crawl state shared by every worker of a run
#[derive(Debug)]
pub struct CrawlContext {
    limits: CrawlLimits,
    state: RwLock<CrawlState>,
    wake: Notify,
}

impl CrawlContext {
    pub fn new(limits: CrawlLimits) -> Self {
        Self {
            limits,
            state: RwLock::new(CrawlState::default()),
            wake: Notify::new(),
        }
    }

    pub fn limits(&self) -> &CrawlLimits {
        &self.limits
    }

    fn read(&self) -> RwLockReadGuard<'_, CrawlState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, CrawlState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Starts the frontier for `seed`, replacing any previous seed's
    ///
    /// Returns false when the seed URL was already visited earlier in the
    /// run; the seed then finishes immediately with a log entry.
    pub fn begin_seed(&self, seed: &Seed, deadline: Instant) -> bool {
        let mut state = self.write();

        let mut frontier = SeedFrontier {
            seed: seed.clone(),
            queue: VecDeque::new(),
            in_flight: Vec::new(),
            pages_used: 0,
            deadline,
            stopped: None,
            pages: Vec::new(),
            log: Vec::new(),
        };

        let item = QueuedUrl {
            url: seed.url().clone(),
            depth: 0,
        };

        let fresh = state.visited.insert(seed.as_str().to_string());
        if fresh {
            frontier.queue.push_back(item);
        } else {
            let entry = frontier.skip_entry(
                &item,
                PageState::Skipped,
                "already visited from an earlier seed".to_string(),
            );
            frontier.log.push(entry);
        }

        state.current = Some(frontier);
        fresh
    }

    /// Returns a future that resolves on the next wake-up
    ///
    /// Call `enable()` on it before `claim()` so a wake-up between the two
    /// is not lost.
    pub fn notified(&self) -> Notified<'_> {
        self.wake.notified()
    }

    /// Wakes every waiting worker so it re-checks the frontier
    pub fn wake_all(&self) {
        self.wake.notify_waiters();
    }

    /// Takes the next URL if budgets allow
    pub fn claim(&self) -> Claim {
        let mut state = self.write();
        let Some(frontier) = state.current.as_mut() else {
            return Claim::Done;
        };

        if frontier.stopped.is_none() && Instant::now() >= frontier.deadline {
            tracing::debug!("Time budget exhausted for {}", frontier.seed);
            frontier.stopped = Some(StopReason::TimeBudget);
        }
        if frontier.stopped.is_some() {
            return Claim::Done;
        }

        if frontier.pages_used >= self.limits.max_pages {
            // An in-flight page may still be skipped and hand its slot back
            if !frontier.in_flight.is_empty() {
                return Claim::Wait;
            }
            if !frontier.queue.is_empty() {
                tracing::debug!("Page budget exhausted for {}", frontier.seed);
                frontier.stopped = Some(StopReason::PageBudget);
            }
            return Claim::Done;
        }

        match frontier.queue.pop_front() {
            Some(item) => {
                frontier.pages_used += 1;
                frontier.in_flight.push(item.clone());
                Claim::Fetch(item)
            }
            None if frontier.in_flight.is_empty() => Claim::Done,
            None => Claim::Wait,
        }
    }

    /// Records the outcome of a claimed fetch and enqueues its links
    ///
    /// Links are enqueued at `depth + 1` only while that stays within the
    /// depth limit and the crawl has not been stopped. Skipped pages give
    /// their budget slot back.
    pub fn complete(&self, item: &QueuedUrl, result: FetchResult, links: Vec<Url>) {
        {
            let mut guard = self.write();
            let state = &mut *guard;
            let Some(frontier) = state.current.as_mut() else {
                return;
            };

            frontier.in_flight.retain(|queued| queued != item);
            state.visited.insert(result.final_url.as_str().to_string());

            match &result.status {
                FetchStatus::Ok { .. } => {
                    let next_depth = item.depth + 1;
                    if frontier.stopped.is_none() && next_depth <= self.limits.max_depth {
                        for link in links {
                            if state.visited.insert(link.as_str().to_string()) {
                                frontier.queue.push_back(QueuedUrl {
                                    url: link,
                                    depth: next_depth,
                                });
                            }
                        }
                    }
                    frontier.pages.push(result);
                }
                FetchStatus::Skipped(_) => {
                    frontier.pages_used = frontier.pages_used.saturating_sub(1);
                    if let Some(entry) = CrawlLogEntry::from_result(&frontier.seed, &result) {
                        frontier.log.push(entry);
                    }
                }
                FetchStatus::Failed(_) => {
                    if let Some(entry) = CrawlLogEntry::from_result(&frontier.seed, &result) {
                        frontier.log.push(entry);
                    }
                }
            }
        }

        self.wake_all();
    }

    /// Marks the current seed as stopped
    pub fn stop(&self, reason: StopReason) {
        {
            let mut state = self.write();
            if let Some(frontier) = state.current.as_mut() {
                frontier.stopped.get_or_insert(reason);
            }
        }
        self.wake_all();
    }

    /// Closes the current seed and returns what it produced
    ///
    /// URLs still queued or in flight are logged as skipped and leave the
    /// visited set, so a later seed may still fetch them.
    pub fn finish_seed(&self) -> Option<SeedCrawl> {
        let mut state = self.write();
        let mut frontier = state.current.take()?;

        let reason = frontier
            .stopped
            .map(|r| r.to_string())
            .unwrap_or_else(|| "crawl stopped".to_string());

        let unfinished: Vec<(QueuedUrl, PageState)> = frontier
            .in_flight
            .drain(..)
            .map(|item| (item, PageState::Fetching))
            .chain(frontier.queue.drain(..).map(|item| (item, PageState::Queued)))
            .collect();

        for (item, from) in unfinished {
            state.visited.remove(item.url.as_str());
            let to = from.transition(PageState::Skipped).unwrap_or(PageState::Skipped);
            let entry = frontier.skip_entry(&item, to, reason.clone());
            frontier.log.push(entry);
        }
        drop(state);

        Some(SeedCrawl {
            seed: frontier.seed,
            pages: frontier.pages,
            log: frontier.log,
            stopped: frontier.stopped,
        })
    }

    /// Returns true if the URL has been queued or fetched in this run
    pub fn is_visited(&self, url: &Url) -> bool {
        self.read().visited.contains(url.as_str())
    }

    /// Number of distinct URLs seen in this run
    pub fn visited_count(&self) -> usize {
        self.read().visited.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{FetchError, FetchFailure, SkipReason};
    use std::time::Duration;

    fn limits(max_depth: u32, max_pages: u32) -> CrawlLimits {
        CrawlLimits {
            max_depth,
            max_pages,
            page_timeout: Duration::from_secs(5),
            seed_time_budget: Duration::from_secs(60),
        }
    }

    fn seed() -> Seed {
        crate::url::normalize("https://example.com/").unwrap()
    }

    fn url(path: &str) -> Url {
        Url::parse(&format!("https://example.com{}", path)).unwrap()
    }

    fn deadline() -> Instant {
        Instant::now() + Duration::from_secs(60)
    }

    fn result(item: &QueuedUrl, status: FetchStatus) -> FetchResult {
        FetchResult {
            url: item.url.clone(),
            final_url: item.url.clone(),
            depth: item.depth,
            fetched_at: Utc::now(),
            attempts: 1,
            status,
        }
    }

    fn ok() -> FetchStatus {
        FetchStatus::Ok {
            body: "<html></html>".to_string(),
            content_type: "text/html".to_string(),
            http_status: 200,
        }
    }

    fn claim_fetch(ctx: &CrawlContext) -> QueuedUrl {
        match ctx.claim() {
            Claim::Fetch(item) => item,
            other => panic!("expected Fetch, got {:?}", other),
        }
    }

    #[test]
    fn test_seed_is_first_claim() {
        let ctx = CrawlContext::new(limits(1, 10));
        assert!(ctx.begin_seed(&seed(), deadline()));

        let item = claim_fetch(&ctx);
        assert_eq!(item.depth, 0);
        assert_eq!(item.url.as_str(), "https://example.com/");

        // Seed in flight, nothing else queued
        assert_eq!(ctx.claim(), Claim::Wait);
    }

    #[test]
    fn test_links_enqueued_breadth_first_with_depth() {
        let ctx = CrawlContext::new(limits(2, 10));
        ctx.begin_seed(&seed(), deadline());

        let root = claim_fetch(&ctx);
        ctx.complete(&root, result(&root, ok()), vec![url("/a"), url("/b")]);

        let a = claim_fetch(&ctx);
        let b = claim_fetch(&ctx);
        assert_eq!(a.url, url("/a"));
        assert_eq!(b.url, url("/b"));
        assert_eq!(a.depth, 1);

        ctx.complete(&a, result(&a, ok()), vec![url("/a/deep")]);
        ctx.complete(&b, result(&b, ok()), vec![]);

        let deep = claim_fetch(&ctx);
        assert_eq!(deep.depth, 2);
    }

    #[test]
    fn test_depth_limit_blocks_enqueue() {
        let ctx = CrawlContext::new(limits(0, 10));
        ctx.begin_seed(&seed(), deadline());

        let root = claim_fetch(&ctx);
        ctx.complete(&root, result(&root, ok()), vec![url("/a")]);

        assert_eq!(ctx.claim(), Claim::Done);
        assert!(!ctx.is_visited(&url("/a")));

        let crawl = ctx.finish_seed().unwrap();
        assert_eq!(crawl.pages.len(), 1);
        assert!(crawl.log.is_empty());
        assert_eq!(crawl.stopped, None);
    }

    #[test]
    fn test_visited_links_not_requeued() {
        let ctx = CrawlContext::new(limits(2, 10));
        ctx.begin_seed(&seed(), deadline());

        let root = claim_fetch(&ctx);
        ctx.complete(
            &root,
            result(&root, ok()),
            vec![url("/a"), url("/"), url("/a")],
        );

        let a = claim_fetch(&ctx);
        ctx.complete(&a, result(&a, ok()), vec![url("/"), url("/a")]);
        assert_eq!(ctx.claim(), Claim::Done);
        assert_eq!(ctx.visited_count(), 2);
    }

    #[test]
    fn test_page_budget_stops_and_logs_leftovers() {
        let ctx = CrawlContext::new(limits(1, 2));
        ctx.begin_seed(&seed(), deadline());

        let root = claim_fetch(&ctx);
        ctx.complete(
            &root,
            result(&root, ok()),
            vec![url("/a"), url("/b"), url("/c")],
        );

        let a = claim_fetch(&ctx);
        // Budget reached while /a is in flight
        assert_eq!(ctx.claim(), Claim::Wait);
        ctx.complete(&a, result(&a, ok()), vec![]);
        assert_eq!(ctx.claim(), Claim::Done);

        let crawl = ctx.finish_seed().unwrap();
        assert_eq!(crawl.pages.len(), 2);
        assert_eq!(crawl.stopped, Some(StopReason::PageBudget));
        assert_eq!(crawl.log.len(), 2);
        assert!(crawl.log.iter().all(|e| e.state == PageState::Skipped));
        assert_eq!(crawl.log[0].reason, "page budget exhausted");
    }

    #[test]
    fn test_skipped_page_releases_budget_slot() {
        let ctx = CrawlContext::new(limits(1, 2));
        ctx.begin_seed(&seed(), deadline());

        let root = claim_fetch(&ctx);
        ctx.complete(
            &root,
            result(&root, ok()),
            vec![url("/file"), url("/b")],
        );

        let file = claim_fetch(&ctx);
        ctx.complete(
            &file,
            result(
                &file,
                FetchStatus::Skipped(SkipReason::NotHtml {
                    content_type: "application/pdf".to_string(),
                }),
            ),
            vec![],
        );

        let b = claim_fetch(&ctx);
        assert_eq!(b.url, url("/b"));
        ctx.complete(&b, result(&b, ok()), vec![]);

        let crawl = ctx.finish_seed().unwrap();
        assert_eq!(crawl.pages.len(), 2);
        assert_eq!(crawl.log.len(), 1);
        assert_eq!(crawl.log[0].state, PageState::Skipped);
    }

    #[test]
    fn test_failed_page_keeps_budget_slot() {
        let ctx = CrawlContext::new(limits(1, 2));
        ctx.begin_seed(&seed(), deadline());

        let root = claim_fetch(&ctx);
        ctx.complete(
            &root,
            result(
                &root,
                FetchStatus::Failed(FetchFailure {
                    error: FetchError::Status(500),
                    attempts: 3,
                }),
            ),
            vec![url("/ignored")],
        );

        assert_eq!(ctx.claim(), Claim::Done);
        let crawl = ctx.finish_seed().unwrap();
        assert!(crawl.pages.is_empty());
        assert_eq!(crawl.log.len(), 1);
        assert_eq!(crawl.log[0].state, PageState::Failed);
        assert_eq!(crawl.log[0].retries, 2);
    }

    #[test]
    fn test_expired_deadline_stops_claims() {
        let ctx = CrawlContext::new(limits(1, 10));
        ctx.begin_seed(&seed(), Instant::now());

        assert_eq!(ctx.claim(), Claim::Done);
        let crawl = ctx.finish_seed().unwrap();
        assert_eq!(crawl.stopped, Some(StopReason::TimeBudget));
        assert_eq!(crawl.log.len(), 1);
        assert_eq!(crawl.log[0].reason, "time budget exhausted");
    }

    #[test]
    fn test_stop_logs_in_flight_pages() {
        let ctx = CrawlContext::new(limits(1, 10));
        ctx.begin_seed(&seed(), deadline());
        let _root = claim_fetch(&ctx);

        ctx.stop(StopReason::TimeBudget);
        let crawl = ctx.finish_seed().unwrap();
        assert_eq!(crawl.log.len(), 1);
        assert_eq!(crawl.log[0].depth, 0);
        assert_eq!(crawl.log[0].state, PageState::Skipped);
    }

    #[test]
    fn test_visited_set_spans_seeds() {
        let ctx = CrawlContext::new(limits(1, 10));
        ctx.begin_seed(&seed(), deadline());

        let root = claim_fetch(&ctx);
        ctx.complete(&root, result(&root, ok()), vec![url("/docs")]);
        let docs = claim_fetch(&ctx);
        ctx.complete(&docs, result(&docs, ok()), vec![]);
        ctx.finish_seed();

        let second = crate::url::normalize("https://example.com/docs").unwrap();
        assert!(!ctx.begin_seed(&second, deadline()));
        assert_eq!(ctx.claim(), Claim::Done);

        let crawl = ctx.finish_seed().unwrap();
        assert!(crawl.pages.is_empty());
        assert_eq!(crawl.log.len(), 1);
    }

    #[test]
    fn test_unfetched_leftovers_leave_visited_set() {
        let ctx = CrawlContext::new(limits(1, 2));
        ctx.begin_seed(&seed(), deadline());

        let root = claim_fetch(&ctx);
        ctx.complete(&root, result(&root, ok()), vec![url("/x"), url("/api")]);
        let x = claim_fetch(&ctx);
        ctx.complete(&x, result(&x, ok()), vec![]);
        assert_eq!(ctx.claim(), Claim::Done);

        let crawl = ctx.finish_seed().unwrap();
        assert_eq!(crawl.stopped, Some(StopReason::PageBudget));
        assert!(ctx.is_visited(&url("/x")));
        assert!(!ctx.is_visited(&url("/api")));

        let api = crate::url::normalize("https://example.com/api").unwrap();
        assert!(ctx.begin_seed(&api, deadline()));
        assert_eq!(claim_fetch(&ctx).url, url("/api"));
    }

    #[test]
    fn test_claim_without_seed_is_done() {
        let ctx = CrawlContext::new(limits(1, 10));
        assert_eq!(ctx.claim(), Claim::Done);
        assert!(ctx.finish_seed().is_none());
    }
}
