use serde::Deserialize;

/// Main configuration structure for Module-Scout
///
/// Every section is optional; a missing section takes its defaults so the
/// pipeline can run without a configuration file at all.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default, rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum link hops from a seed
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Maximum pages fetched per seed
    #[serde(rename = "max-pages")]
    pub max_pages: u32,

    /// Hard timeout for a single HTTP request
    #[serde(rename = "per-page-timeout-seconds")]
    pub per_page_timeout_seconds: u64,

    /// Wall-clock budget for one seed's traversal
    #[serde(rename = "seed-time-budget-seconds")]
    pub seed_time_budget_seconds: u64,

    /// Number of concurrent fetch workers
    pub workers: u32,

    /// Total attempts per page (first try included)
    #[serde(rename = "retry-limit")]
    pub retry_limit: u32,

    /// Initial backoff for transient failures (milliseconds)
    #[serde(rename = "backoff-base-ms")]
    pub backoff_base_ms: u64,

    /// Initial backoff after HTTP 429 (milliseconds)
    #[serde(rename = "rate-limit-backoff-ms")]
    pub rate_limit_backoff_ms: u64,

    /// Upper bound for any single backoff (milliseconds)
    #[serde(rename = "max-backoff-ms")]
    pub max_backoff_ms: u64,

    /// Redirect hops followed per request
    #[serde(rename = "max-redirects")]
    pub max_redirects: u32,

    /// Send a HEAD request to check Content-Type before the GET
    #[serde(rename = "head-check")]
    pub head_check: bool,

    /// Bodies shorter than this are skipped as too small
    #[serde(rename = "min-page-bytes")]
    pub min_page_bytes: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: 1,
            max_pages: 10,
            per_page_timeout_seconds: 15,
            seed_time_budget_seconds: 120,
            workers: 4,
            retry_limit: 3,
            backoff_base_ms: 500,
            rate_limit_backoff_ms: 2000,
            max_backoff_ms: 30_000,
            max_redirects: 10,
            head_check: true,
            min_page_bytes: 100,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "ModuleScout".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: None,
        }
    }
}

impl UserAgentConfig {
    /// Formats the User-Agent header value
    ///
    /// Format: `Mozilla/5.0 (compatible; Name/Version; +ContactURL)`
    pub fn header_value(&self) -> String {
        match &self.contact_url {
            Some(contact) => format!(
                "Mozilla/5.0 (compatible; {}/{}; +{})",
                self.crawler_name, self.crawler_version, contact
            ),
            None => format!(
                "Mozilla/5.0 (compatible; {}/{})",
                self.crawler_name, self.crawler_version
            ),
        }
    }
}

/// Content extraction configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Character budget for each page's extracted text
    #[serde(rename = "chars-per-page")]
    pub chars_per_page: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            chars_per_page: 1000,
        }
    }
}

/// Module inference configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Maximum modules kept in a result
    #[serde(rename = "max-modules")]
    pub max_modules: usize,

    /// Maximum length of a generated or returned description
    #[serde(rename = "description-max-chars")]
    pub description_max_chars: usize,

    /// Maximum documentation characters placed in a remote prompt
    #[serde(rename = "prompt-max-chars")]
    pub prompt_max_chars: usize,

    /// Preferred remote provider
    pub openai: RemoteConfig,

    /// Alternate remote provider
    pub groq: RemoteConfig,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            max_modules: 20,
            description_max_chars: 400,
            prompt_max_chars: 8000,
            openai: RemoteConfig::openai(),
            groq: RemoteConfig::groq(),
        }
    }
}

/// An OpenAI-compatible chat completions endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    /// API root, e.g. `https://api.openai.com/v1`
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Environment variable holding the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// Environment variable that overrides the model list with one model
    #[serde(rename = "model-env")]
    pub model_env: Option<String>,

    /// Candidate models, tried in order while the provider reports them unavailable
    pub models: Vec<String>,

    /// Timeout for the whole strategy attempt
    #[serde(rename = "timeout-seconds", default = "default_remote_timeout")]
    pub timeout_seconds: u64,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_remote_timeout() -> u64 {
    60
}

fn default_temperature() -> f32 {
    0.2
}

impl RemoteConfig {
    pub fn openai() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            model_env: Some("OPENAI_MODEL".to_string()),
            models: vec!["gpt-4o-mini".to_string()],
            timeout_seconds: default_remote_timeout(),
            temperature: default_temperature(),
        }
    }

    pub fn groq() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
            model_env: Some("GROQ_MODEL".to_string()),
            models: vec![
                "llama-3.3-70b-versatile".to_string(),
                "llama-3.1-8b-instant".to_string(),
            ],
            timeout_seconds: default_remote_timeout(),
            temperature: default_temperature(),
        }
    }

    /// Resolves credentials from the process environment
    ///
    /// A missing or blank API key yields `None`, which callers treat as
    /// "skip this provider" rather than as an error.
    pub fn credentials(&self) -> Option<Credentials> {
        self.credentials_from(|name| std::env::var(name).ok())
    }

    /// Resolves credentials through an arbitrary variable lookup
    pub fn credentials_from<F>(&self, lookup: F) -> Option<Credentials>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(&self.api_key_env)
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())?;

        let override_model = self
            .model_env
            .as_deref()
            .and_then(|name| lookup(name))
            .map(|model| model.trim().to_string())
            .filter(|model| !model.is_empty());

        let models = match override_model {
            Some(model) => vec![model],
            None => self.models.clone(),
        };

        Some(Credentials { api_key, models })
    }
}

/// Resolved credentials for one remote provider
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub models: Vec<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("models", &self.models)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_missing_key_means_no_credentials() {
        let remote = RemoteConfig::openai();
        assert_eq!(remote.credentials_from(lookup(&[])), None);
    }

    #[test]
    fn test_blank_key_means_no_credentials() {
        let remote = RemoteConfig::groq();
        assert_eq!(
            remote.credentials_from(lookup(&[("GROQ_API_KEY", "   ")])),
            None
        );
    }

    #[test]
    fn test_key_with_default_models() {
        let remote = RemoteConfig::groq();
        let creds = remote
            .credentials_from(lookup(&[("GROQ_API_KEY", "gsk-test")]))
            .unwrap();
        assert_eq!(creds.api_key, "gsk-test");
        assert_eq!(creds.models, remote.models);
    }

    #[test]
    fn test_model_env_overrides_candidates() {
        let remote = RemoteConfig::openai();
        let creds = remote
            .credentials_from(lookup(&[
                ("OPENAI_API_KEY", "sk-test"),
                ("OPENAI_MODEL", "gpt-4"),
            ]))
            .unwrap();
        assert_eq!(creds.models, vec!["gpt-4".to_string()]);
    }

    #[test]
    fn test_credentials_debug_redacts_key() {
        let creds = Credentials {
            api_key: "sk-secret".to_string(),
            models: vec![],
        };
        let printed = format!("{:?}", creds);
        assert!(!printed.contains("sk-secret"));
        assert!(printed.contains("redacted"));
    }

    #[test]
    fn test_user_agent_header() {
        let mut ua = UserAgentConfig::default();
        ua.crawler_name = "Scout".to_string();
        ua.crawler_version = "2.0".to_string();
        assert_eq!(ua.header_value(), "Mozilla/5.0 (compatible; Scout/2.0)");

        ua.contact_url = Some("https://example.com/bot".to_string());
        assert_eq!(
            ua.header_value(),
            "Mozilla/5.0 (compatible; Scout/2.0; +https://example.com/bot)"
        );
    }
}
