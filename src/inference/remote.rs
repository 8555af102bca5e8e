//! Remote language-model strategies
//!
//! Both remote providers speak the OpenAI-compatible `/chat/completions`
//! API, so one client serves both; they differ only in base URL, credential
//! and model candidates.

use super::strategy::{ModuleStrategy, StrategyFailure, StrategyKind};
use super::Module;
use crate::config::{Credentials, RemoteConfig};
use crate::content::PageContent;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;

const SYSTEM_PROMPT: &str =
    "You are a technical documentation analyzer. You reply with valid JSON only.";

/// Builds the user prompt for a documentation excerpt
///
/// The text is cut to `max_chars` characters.
pub fn build_prompt(text: &str, max_chars: usize) -> String {
    let excerpt: String = text.chars().take(max_chars).collect();
    format!(
        r#"Identify the modules (major product areas or features) described in the documentation below.

For each module give:
1. A short, clear module name
2. A description of what the module covers (1-2 sentences)
3. Its submodules: the named sub-features within it, each with a one-sentence description

Reply with ONLY a JSON array in exactly this shape, with these exact key names:
[
  {{
    "module": "Module name",
    "Description": "What this module covers",
    "Submodules": {{
      "Submodule name": "What this submodule does"
    }}
  }}
]

DOCUMENTATION TEXT:
{excerpt}
"#
    )
}

/// Parses a model reply into modules
///
/// Code fences are stripped and the outermost `[...]` span is parsed. Any
/// invalid module fails the whole reply.
pub fn parse_modules(content: &str) -> Result<Vec<Module>, StrategyFailure> {
    let cleaned = content
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let (Some(start), Some(end)) = (cleaned.find('['), cleaned.rfind(']')) else {
        return Err(StrategyFailure::MalformedResponse(
            "reply contains no JSON array".to_string(),
        ));
    };
    if end < start {
        return Err(StrategyFailure::MalformedResponse(
            "reply contains no JSON array".to_string(),
        ));
    }

    let modules: Vec<Module> = serde_json::from_str(&cleaned[start..=end])
        .map_err(|e| StrategyFailure::MalformedResponse(e.to_string()))?;

    if modules.is_empty() {
        return Err(StrategyFailure::EmptyResult);
    }
    Ok(modules)
}

/// Renders pages into one text block for a prompt
pub fn render_pages(pages: &[PageContent]) -> String {
    pages
        .iter()
        .map(PageContent::render)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// HTTP client for an OpenAI-compatible chat completions endpoint
#[derive(Debug, Clone)]
pub struct RemoteClient {
    http: Client,
    base_url: String,
    timeout: Duration,
    temperature: f32,
    prompt_max_chars: usize,
}

impl RemoteClient {
    pub fn new(http: Client, config: &RemoteConfig, prompt_max_chars: usize) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.timeout_seconds),
            temperature: config.temperature,
            prompt_max_chars,
        }
    }

    /// Overrides the timeout taken from configuration
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Asks `model` for the module list of `text`
    pub async fn infer_remote(
        &self,
        text: &str,
        credentials: &Credentials,
        model: &str,
    ) -> Result<Vec<Module>, StrategyFailure> {
        let request_body = json!({
            "model": model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": build_prompt(text, self.prompt_max_chars) }
            ],
            "temperature": self.temperature
        });

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .http
            .post(url)
            .bearer_auth(&credentials.api_key)
            .json(&request_body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transport_failure)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(StrategyFailure::RateLimited);
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            if status == StatusCode::NOT_FOUND
                || error_text.contains("decommissioned")
                || error_text.contains("model_not_found")
            {
                return Err(StrategyFailure::ModelUnavailable(model.to_string()));
            }
            let snippet: String = error_text.chars().take(200).collect();
            return Err(StrategyFailure::TransportError(format!(
                "HTTP {}: {}",
                status.as_u16(),
                snippet
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| StrategyFailure::MalformedResponse(e.to_string()))?;

        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                StrategyFailure::MalformedResponse(
                    "missing choices[0].message.content".to_string(),
                )
            })?;

        parse_modules(content)
    }
}

fn transport_failure(error: reqwest::Error) -> StrategyFailure {
    if error.is_timeout() {
        StrategyFailure::Timeout
    } else {
        StrategyFailure::TransportError(error.to_string())
    }
}

/// A remote strategy: one provider, its credential and model candidates
#[derive(Debug, Clone)]
pub struct RemoteStrategy {
    kind: StrategyKind,
    client: RemoteClient,
    credentials: Option<Credentials>,
}

impl RemoteStrategy {
    pub fn new(kind: StrategyKind, client: RemoteClient, credentials: Option<Credentials>) -> Self {
        Self {
            kind,
            client,
            credentials,
        }
    }

    /// Builds the strategy, reading the credential from the environment
    pub fn from_config(
        kind: StrategyKind,
        http: Client,
        config: &RemoteConfig,
        prompt_max_chars: usize,
    ) -> Self {
        let credentials = config.credentials();
        if credentials.is_none() {
            tracing::debug!("{} strategy has no credential ({} unset)", kind, config.api_key_env);
        }
        Self::new(
            kind,
            RemoteClient::new(http, config, prompt_max_chars),
            credentials,
        )
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    /// Tries each model candidate until one answers
    ///
    /// Only an unavailable model moves on to the next candidate; any other
    /// failure ends the attempt.
    async fn try_models(
        &self,
        text: &str,
        credentials: &Credentials,
    ) -> Result<Vec<Module>, StrategyFailure> {
        let mut unavailable = Vec::new();

        for model in &credentials.models {
            tracing::debug!("{}: trying model {}", self.kind, model);
            match self.client.infer_remote(text, credentials, model).await {
                Err(StrategyFailure::ModelUnavailable(model)) => {
                    tracing::warn!("{}: model {} unavailable, trying next", self.kind, model);
                    unavailable.push(model);
                }
                Ok(modules) => {
                    tracing::info!("{}: model {} returned {} modules", self.kind, model, modules.len());
                    return Ok(modules);
                }
                Err(e) => return Err(e),
            }
        }

        Err(StrategyFailure::ModelUnavailable(unavailable.join(", ")))
    }
}

#[async_trait]
impl ModuleStrategy for RemoteStrategy {
    fn kind(&self) -> StrategyKind {
        self.kind
    }

    async fn attempt(&self, pages: &[PageContent]) -> Result<Vec<Module>, StrategyFailure> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(StrategyFailure::NoCredential)?;

        let text = render_pages(pages);
        if text.trim().is_empty() {
            return Err(StrategyFailure::EmptyResult);
        }

        tokio::time::timeout(self.client.timeout(), self.try_models(&text, credentials))
            .await
            .map_err(|_| StrategyFailure::Timeout)?
    }
}
