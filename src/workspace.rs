//! Tenant-scoped operations.
//!
//! A [`Workspace`] is what a caller gets after the [`AccessGate`] accepted
//! its credential. Records owned by other tenants are reported as not
//! found, never as forbidden, so their existence doesn't leak.
//!
//! [`AccessGate`]: crate::gate::AccessGate

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::models::{Agent, ConfigMap, Domain, NewAgent, NewDomain, Task, Tenant};
use crate::orchestrator::Orchestrator;
use crate::store::Store;

pub struct Workspace {
    tenant: Tenant,
    store: Arc<dyn Store>,
    orchestrator: Arc<Orchestrator>,
}

impl Workspace {
    pub fn new(tenant: Tenant, store: Arc<dyn Store>, orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            tenant,
            store,
            orchestrator,
        }
    }

    pub fn tenant(&self) -> &Tenant {
        &self.tenant
    }

    // --- Domains ---

    pub async fn create_domain(&self, new: NewDomain) -> Result<Domain> {
        if new.name.trim().is_empty() {
            return Err(Error::Invalid("domain name must not be empty".to_string()));
        }
        let domain = self.store.create_domain(self.tenant.id, new).await?;
        tracing::info!(tenant_id = self.tenant.id, domain_id = domain.id, "domain created");
        Ok(domain)
    }

    pub async fn list_domains(&self) -> Result<Vec<Domain>> {
        Ok(self.store.list_domains(self.tenant.id).await?)
    }

    pub async fn get_domain(&self, id: i64) -> Result<Domain> {
        self.store
            .find_domain_by_id(id)
            .await?
            .filter(|d| d.tenant_id == self.tenant.id)
            .ok_or(Error::NotFound("Domain"))
    }

    /// Deletes the domain and all of its agents.
    pub async fn delete_domain(&self, id: i64) -> Result<()> {
        let domain = self.get_domain(id).await?;
        self.store.delete_domain(domain.id).await?;
        tracing::info!(tenant_id = self.tenant.id, domain_id = id, "domain deleted");
        Ok(())
    }

    // --- Agents ---

    /// The provider identifier is stored as given; an unregistered one
    /// only fails when a task runs.
    pub async fn create_agent(&self, new: NewAgent) -> Result<Agent> {
        if new.model.trim().is_empty() {
            return Err(Error::Invalid("agent model must not be empty".to_string()));
        }
        self.get_domain(new.domain_id).await?;
        let agent = self.store.create_agent(new).await?;
        tracing::info!(
            tenant_id = self.tenant.id,
            agent_id = agent.id,
            provider = %agent.provider,
            "agent created"
        );
        Ok(agent)
    }

    pub async fn list_agents(&self) -> Result<Vec<Agent>> {
        Ok(self.store.list_agents(self.tenant.id).await?)
    }

    pub async fn get_agent(&self, id: i64) -> Result<Agent> {
        let agent = self
            .store
            .find_agent_by_id(id)
            .await?
            .ok_or(Error::NotFound("Agent"))?;
        let owned = self
            .store
            .find_domain_by_id(agent.domain_id)
            .await?
            .is_some_and(|d| d.tenant_id == self.tenant.id);
        if !owned {
            return Err(Error::NotFound("Agent"));
        }
        Ok(agent)
    }

    /// Tasks that used the agent survive with a null agent reference.
    pub async fn delete_agent(&self, id: i64) -> Result<()> {
        let agent = self.get_agent(id).await?;
        self.store.delete_agent(agent.id).await?;
        tracing::info!(tenant_id = self.tenant.id, agent_id = id, "agent deleted");
        Ok(())
    }

    // --- Tasks ---

    /// Queue a task for one of this tenant's agents.
    pub async fn create_task(&self, agent_id: i64, input: &str, meta: ConfigMap) -> Result<Task> {
        if input.is_empty() {
            return Err(Error::Invalid("task input must not be empty".to_string()));
        }
        let agent = self.get_agent(agent_id).await?;
        let task = self
            .store
            .create_task(self.tenant.id, agent.id, input, meta)
            .await?;
        tracing::debug!(tenant_id = self.tenant.id, task_id = task.id, "task queued");
        Ok(task)
    }

    /// Create a task and execute it inline, returning its terminal state.
    pub async fn submit_task(&self, agent_id: i64, input: &str, meta: ConfigMap) -> Result<Task> {
        let task = self.create_task(agent_id, input, meta).await?;
        Ok(self.orchestrator.execute(task).await?)
    }

    /// Newest first.
    pub async fn list_tasks(&self) -> Result<Vec<Task>> {
        Ok(self.store.list_tasks(self.tenant.id).await?)
    }

    pub async fn get_task(&self, id: i64) -> Result<Task> {
        self.store
            .find_task_by_id(id)
            .await?
            .filter(|t| t.tenant_id == self.tenant.id)
            .ok_or(Error::NotFound("Task"))
    }
}
