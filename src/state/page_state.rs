/// Page state definitions for tracking crawl progress
///
/// Every page walks `Queued → Fetching → {Retrying(n) → Fetching}* → terminal`,
/// where the terminal state is one of `Extracted`, `Failed` or `Skipped`.
use crate::ScoutError;
use serde::Serialize;
use std::fmt;

/// Represents the current state of a page in the crawl process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageState {
    // ===== Active States =====
    /// Page is queued and waiting for a worker
    Queued,

    /// A request for the page is in flight
    Fetching,

    /// Waiting out the backoff before attempt `n + 1`
    Retrying(u32),

    // ===== Terminal States =====
    /// Page body was fetched and handed on for extraction
    Extracted,

    /// Page could not be fetched (permanent error or retries exhausted)
    Failed,

    /// Page was deliberately not used (non-HTML, too small, off-domain redirect)
    Skipped,
}

impl PageState {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Extracted | Self::Failed | Self::Skipped)
    }

    /// Returns true if this is an active state (page may still be processed)
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if this represents a successful completion
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Extracted)
    }

    /// Returns true if the state machine allows moving from `self` to `to`
    pub fn can_transition_to(&self, to: PageState) -> bool {
        match (self, to) {
            (Self::Queued, Self::Fetching) => true,
            // Budget or time ran out before a worker picked it up
            (Self::Queued, Self::Skipped) => true,
            (Self::Fetching, Self::Retrying(_)) => true,
            (Self::Fetching, Self::Extracted | Self::Failed | Self::Skipped) => true,
            (Self::Retrying(_), Self::Fetching) => true,
            _ => false,
        }
    }

    /// Moves to `to`, rejecting transitions the state machine does not allow
    pub fn transition(self, to: PageState) -> Result<PageState, ScoutError> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(ScoutError::InvalidTransition { from: self, to })
        }
    }

    /// Short lowercase label used in logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Fetching => "fetching",
            Self::Retrying(_) => "retrying",
            Self::Extracted => "extracted",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Retrying(n) => write!(f, "retrying({})", n),
            other => f.write_str(other.label()),
        }
    }
}
