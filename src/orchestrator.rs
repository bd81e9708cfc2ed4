//! Task execution: resolve the agent, dispatch to its provider, record the
//! outcome.

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::consts::{AGENT_NOT_FOUND, UNKNOWN_PROVIDER};
use crate::error::{ProviderError, StoreError};
use crate::models::{Agent, Task};
use crate::providers::ProviderRegistry;
use crate::store::Store;

/// Wires a [`Store`] to a [`ProviderRegistry`].
pub struct Orchestrator {
    store: Arc<dyn Store>,
    providers: Arc<ProviderRegistry>,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn Store>, providers: Arc<ProviderRegistry>) -> Self {
        Self { store, providers }
    }

    /// Run `task` to a terminal state and return it.
    ///
    /// The `running` state is persisted before the provider is called and
    /// the terminal state after, as two separate commits. A crash in
    /// between leaves the task in `running`.
    ///
    /// Provider failures never escape: they end up in `task.error`. Only
    /// store failures are returned. A task already in a terminal state is
    /// returned untouched.
    #[instrument(skip_all, fields(task_id = task.id, agent_id = task.agent_id))]
    pub async fn execute(&self, mut task: Task) -> Result<Task, StoreError> {
        if task.status.is_terminal() {
            warn!(status = %task.status, "task already finished, not running again");
            return Ok(task);
        }

        let Some(agent) = self.resolve_agent(&task).await? else {
            warn!("agent not found");
            task.fail(AGENT_NOT_FOUND);
            self.store.persist_task(&task).await?;
            return Ok(task);
        };

        task.start();
        self.store.persist_task(&task).await?;

        info!(
            provider = %agent.provider,
            model = %agent.model,
            "dispatching task"
        );

        match self.dispatch(&agent, &task.input).await {
            Ok(output) => {
                info!(chars = output.chars().count(), "task done");
                task.complete(output);
            }
            Err(e) => {
                warn!(error = %e, "task failed");
                task.fail(e.message());
            }
        }

        self.store.persist_task(&task).await?;
        Ok(task)
    }

    /// The task's agent, if it still exists and its domain belongs to the
    /// task's tenant.
    async fn resolve_agent(&self, task: &Task) -> Result<Option<Agent>, StoreError> {
        let Some(id) = task.agent_id else {
            return Ok(None);
        };
        let Some(agent) = self.store.find_agent_by_id(id).await? else {
            return Ok(None);
        };
        let owned = self
            .store
            .find_domain_by_id(agent.domain_id)
            .await?
            .is_some_and(|domain| domain.tenant_id == task.tenant_id);
        Ok(owned.then_some(agent))
    }

    /// Exactly one provider invocation. Unknown providers and panics are
    /// folded into [`ProviderError`].
    async fn dispatch(&self, agent: &Agent, input: &str) -> Result<String, ProviderError> {
        let provider = self
            .providers
            .get(&agent.provider)
            .await
            .ok_or_else(|| ProviderError::new(UNKNOWN_PROVIDER))?;

        let call = provider.generate(&agent.model, input, &agent.config);
        match AssertUnwindSafe(call).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(ProviderError::new(format!(
                "provider {} panicked: {}",
                agent.provider,
                panic_message(panic.as_ref())
            ))),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_message_handles_str_and_string() {
        let boxed: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(boxed.as_ref()), "static");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(42);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }
}
