//! OpenAI-compatible chat-completions wire format, shared by the OpenAI
//! and Venice adapters.

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// A chat-completions endpoint plus the credential to call it with.
#[derive(Clone)]
pub struct ChatCompletions {
    label: &'static str,
    endpoint: String,
    client: reqwest::Client,
}

impl ChatCompletions {
    /// `label` prefixes every error message (`openai`, `venice`).
    pub fn new(label: &'static str, endpoint: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            label,
            endpoint: endpoint.into(),
            client,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send a single user message and return the first choice's content.
    pub async fn complete(
        &self,
        api_key: &str,
        model: &str,
        prompt: &str,
        temperature: f64,
    ) -> Result<String, ProviderError> {
        let label = self.label;
        let body = ChatRequest {
            model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature,
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::new(format!("{label} request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(ProviderError::new(format!(
                "{label} API error ({status}): {text}"
            )));
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::new(format!("{label} returned a malformed body: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::new(format!("{label} response has no choices")))
    }
}

// --- API types ---

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f64,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}
