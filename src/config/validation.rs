use crate::config::types::{
    Config, CrawlerConfig, ExtractionConfig, InferenceConfig, RemoteConfig, UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_extraction_config(&config.extraction)?;
    validate_inference_config(&config.inference)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    // max_depth >= 0 is always true for u32, so no check needed

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.per_page_timeout_seconds == 0 {
        return Err(ConfigError::Validation(
            "per_page_timeout_seconds must be > 0".to_string(),
        ));
    }

    if config.seed_time_budget_seconds == 0 {
        return Err(ConfigError::Validation(
            "seed_time_budget_seconds must be > 0".to_string(),
        ));
    }

    if config.workers < 1 || config.workers > 64 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 64, got {}",
            config.workers
        )));
    }

    if config.retry_limit < 1 || config.retry_limit > 10 {
        return Err(ConfigError::Validation(format!(
            "retry_limit must be between 1 and 10, got {}",
            config.retry_limit
        )));
    }

    if config.max_backoff_ms < config.backoff_base_ms {
        return Err(ConfigError::Validation(format!(
            "max_backoff_ms ({}) must be >= backoff_base_ms ({})",
            config.max_backoff_ms, config.backoff_base_ms
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if let Some(contact) = &config.contact_url {
        Url::parse(contact)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;
    }

    Ok(())
}

fn validate_extraction_config(config: &ExtractionConfig) -> Result<(), ConfigError> {
    if config.chars_per_page < 1 {
        return Err(ConfigError::Validation(
            "chars_per_page must be >= 1".to_string(),
        ));
    }
    Ok(())
}

fn validate_inference_config(config: &InferenceConfig) -> Result<(), ConfigError> {
    if config.max_modules < 1 {
        return Err(ConfigError::Validation(
            "max_modules must be >= 1".to_string(),
        ));
    }

    // Room for at least "Details about X"
    if config.description_max_chars < 20 {
        return Err(ConfigError::Validation(format!(
            "description_max_chars must be >= 20, got {}",
            config.description_max_chars
        )));
    }

    if config.prompt_max_chars < 1 {
        return Err(ConfigError::Validation(
            "prompt_max_chars must be >= 1".to_string(),
        ));
    }

    validate_remote_config("openai", &config.openai)?;
    validate_remote_config("groq", &config.groq)?;
    Ok(())
}

fn validate_remote_config(name: &str, config: &RemoteConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid {} base_url '{}': {}", name, config.base_url, e))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} base_url must be http(s), got '{}'",
            name, config.base_url
        )));
    }

    if config.api_key_env.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "{} api_key_env cannot be empty",
            name
        )));
    }

    if config.models.is_empty() {
        return Err(ConfigError::Validation(format!(
            "{} must list at least one model",
            name
        )));
    }

    if config.timeout_seconds == 0 {
        return Err(ConfigError::Validation(format!(
            "{} timeout_seconds must be > 0",
            name
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_max_pages_rejected() {
        let mut config = Config::default();
        config.crawler.max_pages = 0;
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = Config::default();
        config.crawler.per_page_timeout_seconds = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_worker_bounds() {
        let mut config = Config::default();
        config.crawler.workers = 0;
        assert!(validate(&config).is_err());
        config.crawler.workers = 65;
        assert!(validate(&config).is_err());
        config.crawler.workers = 64;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_retry_limit_bounds() {
        let mut config = Config::default();
        config.crawler.retry_limit = 0;
        assert!(validate(&config).is_err());
        config.crawler.retry_limit = 1;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_crawler_name_characters() {
        let mut config = Config::default();
        config.user_agent.crawler_name = "bad name!".to_string();
        assert!(validate(&config).is_err());
        config.user_agent.crawler_name = String::new();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_chars_per_page_rejected() {
        let mut config = Config::default();
        config.extraction.chars_per_page = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_remote_base_url_must_parse() {
        let mut config = Config::default();
        config.inference.groq.base_url = "not a url".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));

        config.inference.groq.base_url = "ftp://api.example.com".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_remote_needs_models() {
        let mut config = Config::default();
        config.inference.openai.models.clear();
        assert!(validate(&config).is_err());
    }
}
