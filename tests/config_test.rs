//! Tests for TOML configuration loading and the config-driven constructor.

use std::collections::HashMap;
use std::io::Write;
use std::time::Duration;

use mimir::{Config, Mimir, MimirError};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn write_temp(content: &str, suffix: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn load_full_config_file() {
    let file = write_temp(
        r#"
            [models]
            config_path = "/srv/litellm/config.yaml"

            [cache]
            max_entries = 32
            catalog_ttl_secs = 60
            pricing_ttl_secs = 120
            leaderboard_ttl_secs = 240

            [sources]
            openrouter_url = "http://localhost:9000"
            timeout_secs = 5
            categories = ["text", "webdev"]

            [pricing]
            free_local_models = false
            local_providers = ["ollama", "lmstudio"]

            [matching]
            min_prefix_overlap = 6
            local_min_score = 0.5
        "#,
        ".toml",
    );

    let config = Config::load(Some(file.path())).unwrap();
    assert_eq!(config.models.config_path.to_str(), Some("/srv/litellm/config.yaml"));
    assert_eq!(config.cache.max_entries, 32);
    assert_eq!(config.cache.catalog_ttl(), Duration::from_secs(60));
    assert_eq!(config.cache.pricing_ttl(), Duration::from_secs(120));
    assert_eq!(config.cache.leaderboard_ttl(), Duration::from_secs(240));
    assert_eq!(config.sources.openrouter_url, "http://localhost:9000");
    assert_eq!(config.sources.timeout(), Duration::from_secs(5));
    assert_eq!(config.sources.categories, vec!["text", "webdev"]);
    assert!(!config.pricing.free_local_models);
    assert_eq!(config.pricing.local_providers, vec!["ollama", "lmstudio"]);
    assert_eq!(config.matching.min_prefix_overlap, 6);
    assert_eq!(config.matching.local_min_score, Some(0.5));

    // unset sections keep their defaults
    let defaults = Config::default();
    assert_eq!(config.sources.litellm_pricing_url, defaults.sources.litellm_pricing_url);
    assert_eq!(config.sources.lmarena_url, defaults.sources.lmarena_url);
}

#[test]
fn malformed_toml_is_configuration_error() {
    let file = write_temp("[cache\nmax_entries = ", ".toml");
    let err = Config::load(Some(file.path())).unwrap_err();
    assert!(matches!(err, MimirError::Configuration(_)));
    assert!(err.to_string().contains("parse"));
}

#[test]
fn load_or_default_still_rejects_missing_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    let err = Config::load_or_default(Some(&missing)).unwrap_err();
    assert!(matches!(err, MimirError::Configuration(_)));
}

#[test]
fn env_overrides_win_over_file_values() {
    let file = write_temp("[cache]\ncatalog_ttl_secs = 60\n", ".toml");
    let mut config = Config::load(Some(file.path())).unwrap();

    let env: HashMap<&str, &str> = [("OPENROUTER_CACHE_TTL", "900"), ("OLLAMA_FREE", "no")]
        .into_iter()
        .collect();
    config
        .apply_env_with(|key| env.get(key).map(|v| v.to_string()))
        .unwrap();

    assert_eq!(config.cache.catalog_ttl(), Duration::from_secs(900));
    assert!(!config.pricing.free_local_models);
}

// ============================================================================
// Config-driven construction
// ============================================================================

const LEADERBOARD_HTML: &str = concat!(
    "<html><body>",
    r#"<script>self.__next_f.push([1,"5:[\"$\",\"div\",null,{\"rows\":["#,
    r#"{\"rank\":1,\"modelDisplayName\":\"gpt-4o-2024-05-13\",\"rating\":1336.6,\"votes\":80102}"#,
    r#"]}]\n"])</script></body></html>"#,
);

#[tokio::test]
async fn from_config_wires_every_source() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{
                "id": "openai/gpt-4o",
                "name": "OpenAI: GPT-4o",
                "context_length": 128000,
                "pricing": {"prompt": "0.0000025", "completion": "0.00001"}
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/prices.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "gpt-4o": {"input_cost_per_token": 0.0000025, "output_cost_per_token": 0.00001}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/leaderboard/text"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LEADERBOARD_HTML))
        .expect(1)
        .mount(&server)
        .await;

    let models = write_temp(
        "model_list:\n  - model_name: gpt-4o\n    litellm_params:\n      model: openai/gpt-4o\n",
        ".yaml",
    );

    let mut config = Config::default();
    config.models.config_path = models.path().to_path_buf();
    config.sources.openrouter_url = server.uri();
    config.sources.litellm_pricing_url = format!("{}/prices.json", server.uri());
    config.sources.lmarena_url = server.uri();
    config.sources.categories = vec!["text".to_string()];

    let mimir = Mimir::from_config(&config).unwrap();
    let pass = mimir.get_all_models(false).await.unwrap();
    assert!(pass.warnings.is_empty(), "unexpected warnings: {:?}", pass.warnings);
    assert_eq!(pass.models.len(), 1);

    let gpt = &pass.models[0];
    assert_eq!(gpt.id, "openai/gpt-4o");
    assert_eq!(gpt.configured_name.as_deref(), Some("gpt-4o"));
    assert_eq!(gpt.context_length, Some(128_000));
    assert!((gpt.pricing.input_per_million.unwrap() - 2.5).abs() < 1e-9);
    assert_eq!(gpt.benchmark("text").map(|b| b.rank), Some(1));

    // second pass is served entirely from the shared cache
    let again = mimir.get_all_models(false).await.unwrap();
    assert_eq!(again.models, pass.models);
}

#[test]
fn from_config_rejects_zero_timeout() {
    let mut config = Config::default();
    config.sources.timeout_secs = 0;
    assert!(Mimir::from_config(&config).is_err());
}

#[tokio::test]
async fn maximal_ttl_override_caches_without_expiry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{"id": "openai/gpt-4o", "name": "OpenAI: GPT-4o"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = Config::default();
    config.models.config_path = "/nonexistent/mimir/config.yaml".into();
    config.sources.openrouter_url = server.uri();
    config.sources.litellm_pricing_url = format!("{}/missing.json", server.uri());
    config.sources.lmarena_url = server.uri();
    config.sources.categories = Vec::new();

    let max = u64::MAX.to_string();
    config
        .apply_env_with(|key| (key == "OPENROUTER_CACHE_TTL").then(|| max.clone()))
        .unwrap();
    assert_eq!(config.cache.catalog_ttl_secs, u64::MAX);

    let mimir = Mimir::from_config(&config).unwrap();
    let first = mimir.get_all_models(true).await.unwrap();
    let second = mimir.get_all_models(true).await.unwrap();
    assert_eq!(first.models.len(), 1);
    assert_eq!(second.models, first.models);
}
