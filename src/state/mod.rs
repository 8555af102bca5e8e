//! State module for tracking crawl progress
//!
//! This module provides the per-page state machine used by the fetcher and
//! recorded in every crawl log entry.

mod page_state;

// Re-export main types
pub use page_state::PageState;
