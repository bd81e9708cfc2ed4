use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Provider, placeholder, temperature};
use crate::error::ProviderError;
use crate::models::ConfigMap;

pub const NAME: &str = "gemini";
const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Google Gemini `generateContent`. Without a key it answers with a
/// placeholder.
pub struct GeminiProvider {
    api_key: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self::with_base_url(client, api_key, API_BASE)
    }

    /// `base_url` is the models collection; the model id and
    /// `:generateContent` are appended per call.
    pub fn with_base_url(
        client: reqwest::Client,
        api_key: Option<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.is_empty()),
            base_url: base_url.into(),
            client,
        }
    }

    fn url(&self, model: &str) -> String {
        format!(
            "{}/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            model
        )
    }

    fn build_request(prompt: &str, temperature: f64) -> GenerateRequest<'_> {
        GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig { temperature },
        }
    }

    /// Concatenate the text parts of the first candidate.
    fn extract_text(resp: GenerateResponse) -> Result<String, ProviderError> {
        let candidate = resp
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::new("gemini response has no candidates"))?;

        let text: String = candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|part| part.text)
            .collect();

        if text.is_empty() {
            return Err(ProviderError::new("gemini returned empty response"));
        }
        Ok(text)
    }
}

#[async_trait]
impl Provider for GeminiProvider {
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
            tracing::debug!(model, "no gemini credential, answering with placeholder");
            return Ok(placeholder(NAME, model, prompt));
        };

        let url = self.url(model);
        tracing::debug!(model, endpoint = %url, "calling gemini");

        let body = Self::build_request(prompt, temperature(config));
        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key.as_str())
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::new(format!("gemini request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(ProviderError::new(format!(
                "gemini API error ({status}): {text}"
            )));
        }

        let parsed: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::new(format!("gemini returned a malformed body: {e}")))?;

        Self::extract_text(parsed)
    }
}

// --- API types ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f64,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Result<String, ProviderError> {
        GeminiProvider::extract_text(serde_json::from_str(raw).unwrap())
    }

    #[tokio::test]
    async fn without_key_returns_placeholder() {
        let provider = GeminiProvider::new(reqwest::Client::new(), None);
        let out = provider
            .generate("gemini-1.5-flash", "hello", &ConfigMap::new())
            .await
            .unwrap();
        assert_eq!(out, "[gemini mock:gemini-1.5-flash] hello");
    }

    #[test]
    fn url_appends_model_and_method() {
        let provider =
            GeminiProvider::with_base_url(reqwest::Client::new(), None, "http://host/models/");
        assert_eq!(
            provider.url("gemini-pro"),
            "http://host/models/gemini-pro:generateContent"
        );
    }

    #[test]
    fn request_uses_camel_case_generation_config() {
        let json = serde_json::to_value(GeminiProvider::build_request("hi", 0.5)).unwrap();
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(json["generationConfig"]["temperature"], 0.5);
    }

    #[test]
    fn extract_joins_parts_of_first_candidate() {
        let raw = r#"{"candidates":[
            {"content":{"parts":[{"text":"Hello, "},{"text":"world"}]}},
            {"content":{"parts":[{"text":"ignored"}]}}
        ]}"#;
        assert_eq!(parse(raw).unwrap(), "Hello, world");
    }

    #[test]
    fn extract_fails_without_candidates() {
        let err = parse(r#"{"candidates":[]}"#).unwrap_err();
        assert!(err.message().contains("no candidates"));
        assert!(parse("{}").is_err());
    }

    #[test]
    fn extract_fails_on_blocked_candidate() {
        let err = parse(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap_err();
        assert!(err.message().contains("empty response"));
    }
}
