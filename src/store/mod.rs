pub mod sqlite;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{Agent, ConfigMap, Domain, NewAgent, NewDomain, Task, Tenant};

/// Durable table storage for tenants, domains, agents and tasks.
///
/// Every call is atomic on its own. Tenant scoping is the caller's job;
/// the store answers by id.
#[async_trait]
pub trait Store: Send + Sync {
    async fn create_tenant(&self, name: &str, api_key: &str) -> Result<Tenant, StoreError>;
    async fn find_tenant_by_id(&self, id: i64) -> Result<Option<Tenant>, StoreError>;
    /// Exact, case-sensitive match against active tenants only.
    async fn find_active_tenant_by_key(&self, api_key: &str)
    -> Result<Option<Tenant>, StoreError>;
    async fn set_tenant_active(&self, id: i64, active: bool) -> Result<bool, StoreError>;
    /// Cascades to the tenant's domains, agents and tasks.
    async fn delete_tenant(&self, id: i64) -> Result<bool, StoreError>;

    async fn create_domain(&self, tenant_id: i64, new: NewDomain) -> Result<Domain, StoreError>;
    async fn find_domain_by_id(&self, id: i64) -> Result<Option<Domain>, StoreError>;
    async fn list_domains(&self, tenant_id: i64) -> Result<Vec<Domain>, StoreError>;
    /// Cascades to the domain's agents.
    async fn delete_domain(&self, id: i64) -> Result<bool, StoreError>;

    async fn create_agent(&self, new: NewAgent) -> Result<Agent, StoreError>;
    async fn find_agent_by_id(&self, id: i64) -> Result<Option<Agent>, StoreError>;
    /// Agents whose domain belongs to `tenant_id`.
    async fn list_agents(&self, tenant_id: i64) -> Result<Vec<Agent>, StoreError>;
    /// Tasks referencing the agent keep existing with a null agent.
    async fn delete_agent(&self, id: i64) -> Result<bool, StoreError>;

    /// Insert a task in the `queued` state.
    async fn create_task(
        &self,
        tenant_id: i64,
        agent_id: i64,
        input: &str,
        meta: ConfigMap,
    ) -> Result<Task, StoreError>;
    async fn find_task_by_id(&self, id: i64) -> Result<Option<Task>, StoreError>;
    /// Newest first.
    async fn list_tasks(&self, tenant_id: i64) -> Result<Vec<Task>, StoreError>;
    /// Write status, output, error and meta back. One committed transaction.
    /// The agent reference is owned by the agent's lifecycle and left alone.
    async fn persist_task(&self, task: &Task) -> Result<(), StoreError>;
}
