pub mod chat;
pub mod gemini;
pub mod mock;
pub mod openai;
pub mod venice;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::config::Settings;
use crate::consts::{DEFAULT_TEMPERATURE, PLACEHOLDER_PROMPT_CHARS, PROVIDER_TIMEOUT};
use crate::error::ProviderError;
use crate::models::ConfigMap;

pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;
pub use venice::VeniceProvider;

/// A text-generation backend. Could be a remote API, a placeholder, or a
/// test script.
///
/// `config` is the agent's configuration. Unrecognized keys are ignored.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Registry key, matched against `Agent::provider`.
    fn name(&self) -> &str;
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        config: &ConfigMap,
    ) -> Result<String, ProviderError>;
}

/// Deterministic stand-in reply used when a provider has no credential:
/// `[<tag> mock:<model>] ` followed by at most 200 characters of the prompt.
pub fn placeholder(tag: &str, model: &str, prompt: &str) -> String {
    let echo: String = prompt.chars().take(PLACEHOLDER_PROMPT_CHARS).collect();
    format!("[{tag} mock:{model}] {echo}")
}

/// Sampling temperature from an agent config, falling back to 0.2.
pub fn temperature(config: &ConfigMap) -> f64 {
    config
        .get("temperature")
        .and_then(serde_json::Value::as_f64)
        .unwrap_or(DEFAULT_TEMPERATURE)
}

/// The HTTP client every remote adapter uses. Enforces the per-call cap.
pub fn http_client() -> Result<reqwest::Client, ProviderError> {
    http_client_with_timeout(PROVIDER_TIMEOUT)
}

pub fn http_client_with_timeout(timeout: Duration) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::new(format!("failed to build HTTP client: {e}")))
}

/// Maps provider identifiers to adapters. RwLock allows runtime
/// registration + parallel lookups.
pub struct ProviderRegistry {
    providers: RwLock<HashMap<String, Arc<dyn Provider>>>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: RwLock::new(HashMap::new()),
        }
    }

    /// The three built-in adapters, each holding its own credential.
    pub async fn from_settings(settings: &Settings) -> Result<Self, ProviderError> {
        let client = http_client()?;
        let registry = Self::new();
        registry
            .register(Arc::new(OpenAiProvider::new(
                client.clone(),
                settings.keys.openai.clone(),
            )))
            .await;
        registry
            .register(Arc::new(GeminiProvider::new(
                client.clone(),
                settings.keys.gemini.clone(),
            )))
            .await;
        registry
            .register(Arc::new(VeniceProvider::new(
                client,
                settings.keys.venice.clone(),
            )))
            .await;
        Ok(registry)
    }

    pub async fn register(&self, provider: Arc<dyn Provider>) {
        let name = provider.name().to_string();
        self.providers.write().await.insert(name, provider);
    }

    pub async fn unregister(&self, name: &str) {
        self.providers.write().await.remove(name);
    }

    pub async fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.read().await.get(name).cloned()
    }

    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn placeholder_tags_provider_and_model() {
        assert_eq!(
            placeholder("openai", "gpt-4o-mini", "Write a tagline"),
            "[openai mock:gpt-4o-mini] Write a tagline"
        );
    }

    #[test]
    fn placeholder_truncates_to_200_chars() {
        let prompt = "x".repeat(500);
        let out = placeholder("gemini", "m", &prompt);
        assert_eq!(out, format!("[gemini mock:m] {}", "x".repeat(200)));
    }

    #[test]
    fn placeholder_counts_chars_not_bytes() {
        let prompt = "é".repeat(300);
        let out = placeholder("venice", "m", &prompt);
        let echo = out.strip_prefix("[venice mock:m] ").unwrap();
        assert_eq!(echo.chars().count(), 200);
    }

    #[test]
    fn placeholder_is_deterministic() {
        assert_eq!(placeholder("openai", "m", "p"), placeholder("openai", "m", "p"));
    }

    #[test]
    fn temperature_defaults_when_missing_or_wrong_type() {
        assert_eq!(temperature(&ConfigMap::new()), 0.2);
        let cfg = json!({"temperature": "hot"});
        assert_eq!(temperature(cfg.as_object().unwrap()), 0.2);
    }

    #[test]
    fn temperature_reads_number_and_ignores_other_keys() {
        let cfg = json!({"temperature": 0.7, "top_k": 3});
        assert_eq!(temperature(cfg.as_object().unwrap()), 0.7);
        let cfg = json!({"temperature": 1});
        assert_eq!(temperature(cfg.as_object().unwrap()), 1.0);
    }

    #[tokio::test]
    async fn registry_from_settings_has_builtins() {
        let registry = ProviderRegistry::from_settings(&Settings::offline(":memory:"))
            .await
            .unwrap();
        assert_eq!(registry.names().await, vec!["gemini", "openai", "venice"]);
        assert!(registry.get("anthropic").await.is_none());
    }

    #[tokio::test]
    async fn register_replaces_and_unregister_removes() {
        let registry = ProviderRegistry::new();
        registry
            .register(Arc::new(mock::ScriptedProvider::always("openai", "a")))
            .await;
        registry
            .register(Arc::new(mock::ScriptedProvider::always("openai", "b")))
            .await;
        let provider = registry.get("openai").await.unwrap();
        let out = provider.generate("m", "p", &ConfigMap::new()).await.unwrap();
        assert_eq!(out, "b");

        registry.unregister("openai").await;
        assert!(registry.get("openai").await.is_none());
    }
}
