//! Module inference
//!
//! Turns extracted page content into a module outline. Strategies are tried
//! in priority order (remote models first, the local heading heuristic
//! last) and the first non-empty answer wins; see [`InferenceEngine`].

mod describe;
mod engine;
mod local;
mod module;
mod remote;
mod strategy;

pub use describe::{describe, placeholder, truncate_at_word};
pub use engine::{InferenceEngine, PostProcess};
pub use local::LocalStrategy;
pub use module::{Module, Submodule};
pub use remote::{build_prompt, parse_modules, render_pages, RemoteClient, RemoteStrategy};
pub use strategy::{ModuleStrategy, StrategyFailure, StrategyKind};

use serde::Serialize;

/// The outcome of inference for one seed
///
/// Always well formed: when every strategy fails `modules` is empty and
/// `warnings` explains each failure.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionResult {
    pub modules: Vec<Module>,
    pub strategy_used: Option<StrategyKind>,
    pub warnings: Vec<String>,
}

impl ExtractionResult {
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// The module array as pretty-printed JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.modules)
    }

    /// The module array as a JSON value
    pub fn to_value(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(&self.modules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_shape() {
        let result = ExtractionResult {
            modules: vec![Module::new("Account", "Manage your account.")
                .with_submodule("Privacy", "Who sees what.")
                .with_submodule("Security", "Passwords and keys.")],
            strategy_used: Some(StrategyKind::Local),
            warnings: Vec::new(),
        };

        let value = result.to_value().unwrap();
        let module = &value[0];
        assert_eq!(module["module"], "Account");
        assert_eq!(module["Description"], "Manage your account.");
        assert_eq!(module["Submodules"]["Privacy"], "Who sees what.");

        let keys: Vec<&String> = module["Submodules"].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["Privacy", "Security"]);
    }

    #[test]
    fn test_empty_result() {
        let result = ExtractionResult::default();
        assert!(result.is_empty());
        assert_eq!(result.to_json().unwrap(), "[]");
        assert_eq!(result.to_value().unwrap(), serde_json::json!([]));
    }
}
