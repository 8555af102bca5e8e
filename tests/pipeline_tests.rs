//! End-to-end pipeline tests against a mock documentation site

use module_scout::config::Config;
use module_scout::url::normalize;
use module_scout::{InferenceEngine, Pipeline, RunOptions, ScoutError, StrategyKind};
use serde_json::Value;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ACCOUNT_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Account docs</title></head>
<body>
  <nav>
    <h2>Site menu</h2>
    <a href="/docs/billing">Billing</a>
  </nav>
  <main>
    <h1>Account</h1>
    <p>Manage your account details and preferences.</p>
    <h2>Privacy</h2>
    <p>Control who can see your profile and activity.</p>
    <h2>Security</h2>
    <p>Set up two-factor authentication and review sessions.</p>
    <p>Continue with <a href="/docs/billing">billing</a>.</p>
  </main>
  <footer>Copyright 2024 Example Inc.</footer>
</body>
</html>"#;

const BILLING_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Billing docs</title></head>
<body>
  <main>
    <h1>Billing</h1>
    <p>Everything about paying for the service.</p>
    <h2>Invoices</h2>
    <p>Download monthly statements as PDF files.</p>
  </main>
</body>
</html>"#;

async fn docs_site() -> MockServer {
    let server = MockServer::start().await;
    for (route, body) in [("/docs", ACCOUNT_PAGE), ("/docs/billing", BILLING_PAGE)] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html"))
            .mount(&server)
            .await;
    }
    server
}

/// A configuration whose remote providers can never find a key
fn keyless_config() -> Config {
    let mut config = Config::default();
    config.inference.openai.api_key_env = "MODULE_SCOUT_TEST_UNSET_OPENAI_KEY".to_string();
    config.inference.groq.api_key_env = "MODULE_SCOUT_TEST_UNSET_GROQ_KEY".to_string();
    config
}

fn options() -> RunOptions {
    RunOptions {
        max_depth: 1,
        max_pages: 5,
        chars_per_page: 1000,
    }
}

#[tokio::test]
async fn test_run_without_keys_falls_back_to_local() {
    let server = docs_site().await;
    let seed = format!("{}/docs", server.uri());

    let report = Pipeline::new(keyless_config())
        .run(&[seed.clone()], options())
        .await
        .expect("run failed");

    assert_eq!(report.seeds.len(), 1);
    assert!(report.invalid.is_empty());
    assert_eq!(report.fingerprint.len(), 64);

    let seed_report = &report.seeds[0];
    assert_eq!(seed_report.seed, normalize(&seed).unwrap());
    assert_eq!(seed_report.pages_fetched, 2);
    assert_eq!(seed_report.pages_without_content, 0);

    let extraction = &seed_report.extraction;
    assert_eq!(extraction.strategy_used, Some(StrategyKind::Local));
    assert_eq!(extraction.warnings.len(), 2);

    let account = extraction
        .modules
        .iter()
        .find(|m| m.name == "Account")
        .expect("Account module missing");
    assert_eq!(account.description, "Manage your account details and preferences.");
    assert_eq!(
        account.submodule("Privacy"),
        Some("Control who can see your profile and activity.")
    );
    assert!(account.submodule("Security").is_some());
    assert!(extraction.modules.iter().any(|m| m.name == "Billing"));

    // Navigation chrome never becomes part of the outline
    assert!(extraction.modules.iter().all(|m| m.name != "Site menu"));
    assert!(account.submodule("Site menu").is_none());
}

#[tokio::test]
async fn test_output_json_shape() {
    let server = docs_site().await;
    let seed = format!("{}/docs", server.uri());

    let report = Pipeline::new(Config::default())
        .with_engine(InferenceEngine::local_only(&Config::default().inference))
        .run(&[seed], options())
        .await
        .expect("run failed");

    let json = report.seeds[0].extraction.to_json().unwrap();
    let value: Value = serde_json::from_str(&json).unwrap();
    let modules = value.as_array().expect("output must be a JSON array");
    assert!(!modules.is_empty());

    for module in modules {
        let object = module.as_object().unwrap();
        let keys: Vec<&str> = object.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["module", "Description", "Submodules"]);
        assert!(object["module"].is_string());
        assert!(object["Description"].is_string());
        assert!(object["Submodules"]
            .as_object()
            .unwrap()
            .values()
            .all(Value::is_string));
    }
}

#[tokio::test]
async fn test_seed_only_run_with_zero_depth() {
    let server = docs_site().await;
    let seed = format!("{}/docs", server.uri());

    let report = Pipeline::new(keyless_config())
        .run(
            &[seed],
            RunOptions {
                max_depth: 0,
                ..options()
            },
        )
        .await
        .expect("run failed");

    let seed_report = &report.seeds[0];
    assert_eq!(seed_report.pages_fetched, 1);
    let names: Vec<&str> = seed_report
        .extraction
        .modules
        .iter()
        .map(|m| m.name.as_str())
        .collect();
    assert_eq!(names, vec!["Account"]);
}

#[tokio::test]
async fn test_invalid_seeds_reported_alongside_valid_ones() {
    let server = docs_site().await;
    let seeds = vec![
        "ftp://example.com/docs".to_string(),
        format!("{}/docs", server.uri()),
    ];

    let report = Pipeline::new(keyless_config())
        .run(&seeds, options())
        .await
        .expect("run failed");

    assert_eq!(report.seeds.len(), 1);
    assert_eq!(report.invalid.len(), 1);
    assert_eq!(report.invalid[0].input, "ftp://example.com/docs");
}

#[tokio::test]
async fn test_unreachable_site_yields_empty_result() {
    let server = MockServer::start().await;
    let seed = format!("{}/docs", server.uri());

    let report = Pipeline::new(keyless_config())
        .run(&[seed], options())
        .await
        .expect("an unreachable seed must not abort the run");

    let seed_report = &report.seeds[0];
    assert_eq!(seed_report.pages_fetched, 0);
    assert_eq!(seed_report.crawl_log.len(), 1);
    assert!(seed_report.extraction.modules.is_empty());
    assert_eq!(seed_report.extraction.strategy_used, None);
    assert_eq!(seed_report.extraction.to_json().unwrap(), "[]");
}

#[tokio::test]
async fn test_all_invalid_seeds_is_an_error() {
    let result = Pipeline::new(keyless_config())
        .run(&["mailto:someone@example.com".to_string()], options())
        .await;
    assert!(matches!(result, Err(ScoutError::NoValidSeeds { rejected: 1 })));
}
