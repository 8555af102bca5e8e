//! The strategy seam of the inference chain

use super::Module;
use crate::content::PageContent;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Which strategy produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Primary remote model (OpenAI-compatible endpoint)
    OpenAi,
    /// Alternate remote model (Groq)
    Groq,
    /// Deterministic heading-based heuristic
    Local,
}

impl StrategyKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Groq => "groq",
            Self::Local => "local",
        }
    }

    pub fn is_remote(&self) -> bool {
        !matches!(self, Self::Local)
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Why a strategy did not produce modules
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StrategyFailure {
    #[error("no credential configured")]
    NoCredential,

    #[error("timed out")]
    Timeout,

    #[error("rate limited")]
    RateLimited,

    #[error("model {0} is unavailable")]
    ModelUnavailable(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("transport error: {0}")]
    TransportError(String),

    #[error("no modules found")]
    EmptyResult,
}

/// One interchangeable way of turning page content into modules
///
/// Implementations never panic on bad input; every problem is a
/// [`StrategyFailure`] so the chain can move on.
#[async_trait]
pub trait ModuleStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    async fn attempt(&self, pages: &[PageContent]) -> Result<Vec<Module>, StrategyFailure>;
}
