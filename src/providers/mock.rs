use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::Provider;
use crate::error::ProviderError;
use crate::models::ConfigMap;

/// One recorded `generate` call.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub model: String,
    pub prompt: String,
    pub config: ConfigMap,
}

/// A scripted provider for tests. Returns pre-defined replies in order
/// and records every call it receives.
pub struct ScriptedProvider {
    name: String,
    replies: Vec<Result<String, ProviderError>>,
    repeat_last: bool,
    index: AtomicUsize,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedProvider {
    pub fn new(name: &str, replies: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            name: name.to_string(),
            replies,
            repeat_last: false,
            index: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answers every call with `reply`.
    pub fn always(name: &str, reply: &str) -> Self {
        Self {
            repeat_last: true,
            ..Self::new(name, vec![Ok(reply.to_string())])
        }
    }

    /// Fails every call with `message`.
    pub fn failing(name: &str, message: &str) -> Self {
        Self {
            repeat_last: true,
            ..Self::new(name, vec![Err(ProviderError::new(message))])
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.index.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        config: &ConfigMap,
    ) -> Result<String, ProviderError> {
        let i = self.index.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(Call {
                model: model.to_string(),
                prompt: prompt.to_string(),
                config: config.clone(),
            });
        }

        let i = if self.repeat_last {
            i.min(self.replies.len().saturating_sub(1))
        } else {
            i
        };
        self.replies.get(i).cloned().unwrap_or_else(|| {
            Err(ProviderError::new(format!(
                "ScriptedProvider: no more replies (called {} times)",
                i + 1
            )))
        })
    }
}

/// Panics on every call. Exercises the orchestrator's panic boundary.
pub struct PanickingProvider(pub &'static str);

#[async_trait]
impl Provider for PanickingProvider {
    fn name(&self) -> &str {
        self.0
    }

    async fn generate(
        &self,
        _model: &str,
        _prompt: &str,
        _config: &ConfigMap,
    ) -> Result<String, ProviderError> {
        panic!("provider exploded")
    }
}
