use async_trait::async_trait;

use super::chat::ChatCompletions;
use super::{Provider, placeholder, temperature};
use crate::error::ProviderError;
use crate::models::ConfigMap;

pub const NAME: &str = "openai";
const API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI chat completions. Without a key it answers with a placeholder.
pub struct OpenAiProvider {
    api_key: Option<String>,
    chat: ChatCompletions,
}

impl OpenAiProvider {
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
impl Provider for OpenAiProvider {
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
            tracing::debug!(model, "no openai credential, answering with placeholder");
            return Ok(placeholder(NAME, model, prompt));
        };
        tracing::debug!(model, endpoint = self.chat.endpoint(), "calling openai");
        self.chat
            .complete(api_key, model, prompt, temperature(config))
            .await
    }
}
