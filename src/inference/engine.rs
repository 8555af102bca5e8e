//! The strategy chain and post-processing

use super::describe::{placeholder, truncate_at_word};
use super::local::LocalStrategy;
use super::remote::RemoteStrategy;
use super::strategy::{ModuleStrategy, StrategyFailure, StrategyKind};
use super::{ExtractionResult, Module};
use crate::config::InferenceConfig;
use crate::content::PageContent;
use crate::Result;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;

/// Bounds applied to every strategy's output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostProcess {
    pub max_modules: usize,
    pub description_max_chars: usize,
}

impl PostProcess {
    pub fn from_config(config: &InferenceConfig) -> Self {
        Self {
            max_modules: config.max_modules,
            description_max_chars: config.description_max_chars,
        }
    }

    /// Deduplicates, fills and bounds a module list
    ///
    /// - Modules whose names differ only in case collapse into the first
    ///   one seen; its name and description win, submodules are unioned
    /// - Submodules are deduplicated the same way within a module
    /// - Empty descriptions become `Details about <name>`
    /// - Descriptions are cut at a word boundary
    /// - At most `max_modules` modules are kept
    pub fn apply(&self, modules: Vec<Module>) -> Vec<Module> {
        let mut merged: Vec<Module> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for module in modules {
            let name = module.name.trim().to_string();
            if name.is_empty() {
                continue;
            }
            let key = name.to_lowercase();

            match index.get(&key) {
                Some(&i) => {
                    let first = &mut merged[i];
                    if first.description.trim().is_empty() {
                        first.description = module.description;
                    }
                    first.submodules.extend(module.submodules);
                }
                None => {
                    index.insert(key, merged.len());
                    merged.push(Module { name, ..module });
                }
            }
        }

        merged
            .into_iter()
            .take(self.max_modules)
            .map(|module| self.finish(module))
            .collect()
    }

    fn finish(&self, mut module: Module) -> Module {
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut submodules = Vec::with_capacity(module.submodules.len());

        for mut sub in std::mem::take(&mut module.submodules) {
            sub.name = sub.name.trim().to_string();
            if sub.name.is_empty() {
                continue;
            }
            match seen.get(&sub.name.to_lowercase()) {
                Some(&i) => {
                    let first: &mut super::Submodule = &mut submodules[i];
                    if first.description.trim().is_empty() {
                        first.description = sub.description;
                    }
                }
                None => {
                    seen.insert(sub.name.to_lowercase(), submodules.len());
                    submodules.push(sub);
                }
            }
        }

        for sub in &mut submodules {
            sub.description = self.bound(&sub.description, &sub.name);
        }
        module.description = self.bound(&module.description, &module.name);
        module.submodules = submodules;
        module
    }

    fn bound(&self, description: &str, name: &str) -> String {
        let description = description.trim();
        if description.is_empty() {
            return truncate_at_word(&placeholder(name), self.description_max_chars);
        }
        truncate_at_word(description, self.description_max_chars)
    }
}

/// Runs the strategy chain: first success wins
pub struct InferenceEngine {
    strategies: Vec<Box<dyn ModuleStrategy>>,
    post: PostProcess,
}

impl InferenceEngine {
    pub fn new(strategies: Vec<Box<dyn ModuleStrategy>>, post: PostProcess) -> Self {
        Self { strategies, post }
    }

    /// Builds the `[openai, groq, local]` chain
    ///
    /// Remote strategies read their credentials from the environment now;
    /// a missing key makes that strategy fail fast with `NoCredential`.
    pub fn from_config(config: &InferenceConfig) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        let strategies: Vec<Box<dyn ModuleStrategy>> = vec![
            Box::new(RemoteStrategy::from_config(
                StrategyKind::OpenAi,
                http.clone(),
                &config.openai,
                config.prompt_max_chars,
            )),
            Box::new(RemoteStrategy::from_config(
                StrategyKind::Groq,
                http,
                &config.groq,
                config.prompt_max_chars,
            )),
            Box::new(LocalStrategy::new(config.description_max_chars)),
        ];

        Ok(Self::new(strategies, PostProcess::from_config(config)))
    }

    /// Only the local strategy; no network access
    pub fn local_only(config: &InferenceConfig) -> Self {
        Self::new(
            vec![Box::new(LocalStrategy::new(config.description_max_chars))],
            PostProcess::from_config(config),
        )
    }

    /// The chain, in priority order
    pub fn strategy_kinds(&self) -> Vec<StrategyKind> {
        self.strategies.iter().map(|s| s.kind()).collect()
    }

    /// Tries each strategy in order until one yields modules
    ///
    /// Never fails: when every strategy fails the result is empty and the
    /// warnings say why.
    pub async fn infer(&self, pages: &[PageContent]) -> ExtractionResult {
        let mut warnings = Vec::new();

        for strategy in &self.strategies {
            let kind = strategy.kind();

            match strategy.attempt(pages).await {
                Ok(modules) => {
                    let modules = self.post.apply(modules);
                    if modules.is_empty() {
                        tracing::warn!("{} strategy produced no usable modules", kind);
                        warnings.push(format!("{}: {}", kind, StrategyFailure::EmptyResult));
                        continue;
                    }

                    tracing::info!("{} strategy produced {} modules", kind, modules.len());
                    return ExtractionResult {
                        modules,
                        strategy_used: Some(kind),
                        warnings,
                    };
                }
                Err(StrategyFailure::NoCredential) => {
                    tracing::debug!("{} strategy skipped: no credential", kind);
                    warnings.push(format!("{}: {}", kind, StrategyFailure::NoCredential));
                }
                Err(failure) => {
                    tracing::warn!("{} strategy failed: {}", kind, failure);
                    warnings.push(format!("{}: {}", kind, failure));
                }
            }
        }

        warnings.push("all strategies failed; no modules inferred".to_string());
        ExtractionResult {
            modules: Vec::new(),
            strategy_used: None,
            warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{BlockKind, ContentBlock};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use url::Url;

    struct Scripted {
        kind: StrategyKind,
        outcome: std::result::Result<Vec<Module>, StrategyFailure>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ModuleStrategy for Scripted {
        fn kind(&self) -> StrategyKind {
            self.kind
        }

        async fn attempt(
            &self,
            _pages: &[PageContent],
        ) -> std::result::Result<Vec<Module>, StrategyFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }

    fn scripted(
        kind: StrategyKind,
        outcome: std::result::Result<Vec<Module>, StrategyFailure>,
    ) -> (Box<dyn ModuleStrategy>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Box::new(Scripted {
                kind,
                outcome,
                calls: Arc::clone(&calls),
            }),
            calls,
        )
    }

    fn post() -> PostProcess {
        PostProcess {
            max_modules: 20,
            description_max_chars: 400,
        }
    }

    fn account_page() -> PageContent {
        let url = Url::parse("https://example.com/help").unwrap();
        let block = |kind, text: &str| ContentBlock {
            kind,
            text: text.to_string(),
            source_url: url.clone(),
        };
        PageContent {
            url: url.clone(),
            blocks: vec![
                block(BlockKind::Heading(1), "Account"),
                block(BlockKind::Heading(2), "Privacy"),
                block(BlockKind::Heading(2), "Security"),
            ],
        }
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let (a, a_calls) = scripted(
            StrategyKind::OpenAi,
            Ok(vec![Module::new("Remote", "From the model.")]),
        );
        let (b, b_calls) = scripted(StrategyKind::Groq, Ok(vec![Module::new("Other", "x")]));
        let engine = InferenceEngine::new(vec![a, b], post());

        let result = engine.infer(&[]).await;
        assert_eq!(result.strategy_used, Some(StrategyKind::OpenAi));
        assert_eq!(result.modules[0].name, "Remote");
        assert!(result.warnings.is_empty());
        assert_eq!(a_calls.load(Ordering::SeqCst), 1);
        assert_eq!(b_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_malformed_remote_falls_back_to_local() {
        let (a, _) = scripted(
            StrategyKind::OpenAi,
            Err(StrategyFailure::MalformedResponse("not an array".to_string())),
        );
        let (b, _) = scripted(StrategyKind::Groq, Err(StrategyFailure::NoCredential));
        let engine = InferenceEngine::new(
            vec![a, b, Box::new(LocalStrategy::new(400))],
            post(),
        );

        let result = engine.infer(&[account_page()]).await;
        assert_eq!(result.strategy_used, Some(StrategyKind::Local));
        assert_eq!(result.modules[0].name, "Account");
        assert_eq!(result.warnings.len(), 2);
        assert!(result.warnings[0].starts_with("openai: malformed response"));
        assert_eq!(result.warnings[1], "groq: no credential configured");
    }

    #[tokio::test]
    async fn test_local_only_engine() {
        let engine = InferenceEngine::local_only(&InferenceConfig::default());
        assert_eq!(engine.strategy_kinds(), vec![StrategyKind::Local]);

        let result = engine.infer(&[account_page()]).await;
        assert_eq!(result.strategy_used, Some(StrategyKind::Local));
        let account = &result.modules[0];
        assert!(account.submodule("Privacy").is_some());
        assert!(account.submodule("Security").is_some());
    }

    #[tokio::test]
    async fn test_all_strategies_failing_is_empty_not_error() {
        let (a, _) = scripted(StrategyKind::OpenAi, Err(StrategyFailure::Timeout));
        let (b, _) = scripted(StrategyKind::Groq, Err(StrategyFailure::RateLimited));
        let engine = InferenceEngine::new(
            vec![a, b, Box::new(LocalStrategy::new(400))],
            post(),
        );

        let result = engine.infer(&[]).await;
        assert!(result.modules.is_empty());
        assert_eq!(result.strategy_used, None);
        assert_eq!(result.warnings.len(), 4);
        assert_eq!(result.to_json().unwrap(), "[]");
    }

    #[tokio::test]
    async fn test_success_with_only_blank_modules_moves_on() {
        let (a, _) = scripted(StrategyKind::OpenAi, Ok(vec![Module::new("   ", "x")]));
        let (b, _) = scripted(StrategyKind::Groq, Ok(vec![Module::new("Real", "y")]));
        let engine = InferenceEngine::new(vec![a, b], post());

        let result = engine.infer(&[]).await;
        assert_eq!(result.strategy_used, Some(StrategyKind::Groq));
        assert_eq!(result.warnings, vec!["openai: no modules found".to_string()]);
    }

    #[test]
    fn test_case_insensitive_module_dedup() {
        let modules = vec![
            Module::new("Settings", "First description.").with_submodule("Theme", "Dark mode."),
            Module::new("settings", "Second description.")
                .with_submodule("theme", "Ignored.")
                .with_submodule("Language", "Locale."),
        ];

        let out = post().apply(modules);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "Settings");
        assert_eq!(out[0].description, "First description.");
        assert_eq!(out[0].submodules.len(), 2);
        assert_eq!(out[0].submodule("Theme"), Some("Dark mode."));
        assert_eq!(out[0].submodule("Language"), Some("Locale."));
    }

    #[test]
    fn test_empty_descriptions_are_filled() {
        let out = post().apply(vec![Module::new("Search", "  ").with_submodule("Filters", "")]);
        assert_eq!(out[0].description, "Details about Search");
        assert_eq!(out[0].submodule("Filters"), Some("Details about Filters"));
    }

    #[test]
    fn test_descriptions_truncated_and_modules_capped() {
        let post = PostProcess {
            max_modules: 2,
            description_max_chars: 20,
        };
        let out = post.apply(vec![
            Module::new("A", "one two three four five six seven"),
            Module::new("B", "short"),
            Module::new("C", "dropped"),
        ]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].description, "one two three four");
        assert_eq!(out[1].description, "short");
    }
}
