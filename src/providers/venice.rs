use async_trait::async_trait;

use super::chat::ChatCompletions;
use super::{Provider, placeholder, temperature};
use crate::error::ProviderError;
use crate::models::ConfigMap;

pub const NAME: &str = "venice";
/// Venice speaks the OpenAI chat-completions dialect.
const API_URL: &str = "https://api.venice.ai/api/v1/chat/completions";

pub struct VeniceProvider {
    api_key: Option<String>,
    chat: ChatCompletions,
}

impl VeniceProvider {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self::with_endpoint(client, api_key, API_URL)
    }

    pub fn with_endpoint(
        client: reqwest::Client,
        api_key: Option<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.is_empty()),
            chat: ChatCompletions::new(NAME, endpoint, client),
        }
    }
}

#[async_trait]
impl Provider for VeniceProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        config: &ConfigMap,
    ) -> Result<String, ProviderError> {
        let Some(api_key) = &self.api_key else {
            tracing::debug!(model, "no venice credential, answering with placeholder");
            return Ok(placeholder(NAME, model, prompt));
        };
        tracing::debug!(model, endpoint = self.chat.endpoint(), "calling venice");
        self.chat
            .complete(api_key, model, prompt, temperature(config))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn without_key_returns_placeholder() {
        let provider = VeniceProvider::new(reqwest::Client::new(), None);
        let out = provider
            .generate("llama-3.3-70b", "hello", &ConfigMap::new())
            .await
            .unwrap();
        assert_eq!(out, "[venice mock:llama-3.3-70b] hello");
    }
}
