use async_trait::async_trait;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::sync::{Mutex, MutexGuard};

use super::Store;
use crate::error::StoreError;
use crate::models::{Agent, ConfigMap, Domain, NewAgent, NewDomain, Task, TaskStatus, Tenant};

const SCHEMA: &str = "
    PRAGMA foreign_keys = ON;
    CREATE TABLE IF NOT EXISTS tenants (
        id        INTEGER PRIMARY KEY AUTOINCREMENT,
        name      TEXT NOT NULL UNIQUE,
        api_key   TEXT NOT NULL UNIQUE,
        is_active INTEGER NOT NULL DEFAULT 1
    );
    CREATE TABLE IF NOT EXISTS domains (
        id        INTEGER PRIMARY KEY AUTOINCREMENT,
        tenant_id INTEGER NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
        name      TEXT NOT NULL,
        category  TEXT NOT NULL,
        config    TEXT NOT NULL DEFAULT '{}'
    );
    CREATE INDEX IF NOT EXISTS idx_domains_tenant ON domains(tenant_id);
    CREATE TABLE IF NOT EXISTS agents (
        id        INTEGER PRIMARY KEY AUTOINCREMENT,
        domain_id INTEGER NOT NULL REFERENCES domains(id) ON DELETE CASCADE,
        name      TEXT NOT NULL,
        provider  TEXT NOT NULL,
        model     TEXT NOT NULL,
        role      TEXT NOT NULL,
        config    TEXT NOT NULL DEFAULT '{}'
    );
    CREATE INDEX IF NOT EXISTS idx_agents_domain ON agents(domain_id);
    CREATE TABLE IF NOT EXISTS tasks (
        id        INTEGER PRIMARY KEY AUTOINCREMENT,
        tenant_id INTEGER NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
        agent_id  INTEGER REFERENCES agents(id) ON DELETE SET NULL,
        input     TEXT NOT NULL,
        output    TEXT,
        status    TEXT NOT NULL DEFAULT 'queued',
        error     TEXT,
        meta      TEXT NOT NULL DEFAULT '{}'
    );
    CREATE INDEX IF NOT EXISTS idx_tasks_tenant ON tasks(tenant_id);
";

const DOMAIN_COLUMNS: &str = "id, tenant_id, name, category, config";
const AGENT_COLUMNS: &str = "a.id, a.domain_id, a.name, a.provider, a.model, a.role, a.config";
const TASK_COLUMNS: &str = "id, tenant_id, agent_id, input, output, status, error, meta";

/// SQLite-backed entity store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Self::new(":memory:")
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

fn json_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<ConfigMap> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn tenant_from_row(row: &Row<'_>) -> rusqlite::Result<Tenant> {
    Ok(Tenant {
        id: row.get(0)?,
        name: row.get(1)?,
        api_key: row.get(2)?,
        is_active: row.get(3)?,
    })
}

fn domain_from_row(row: &Row<'_>) -> rusqlite::Result<Domain> {
    Ok(Domain {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        name: row.get(2)?,
        category: row.get(3)?,
        config: json_column(row, 4)?,
    })
}

fn agent_from_row(row: &Row<'_>) -> rusqlite::Result<Agent> {
    Ok(Agent {
        id: row.get(0)?,
        domain_id: row.get(1)?,
        name: row.get(2)?,
        provider: row.get(3)?,
        model: row.get(4)?,
        role: row.get(5)?,
        config: json_column(row, 6)?,
    })
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    let status: String = row.get(5)?;
    let status = status
        .parse::<TaskStatus>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, e.into()))?;
    Ok(Task {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        agent_id: row.get(2)?,
        input: row.get(3)?,
        output: row.get(4)?,
        status,
        error: row.get(6)?,
        meta: json_column(row, 7)?,
    })
}

#[async_trait]
impl Store for SqliteStore {
    async fn create_tenant(&self, name: &str, api_key: &str) -> Result<Tenant, StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO tenants (name, api_key, is_active) VALUES (?1, ?2, 1)",
            params![name, api_key],
        )?;
        Ok(Tenant {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            api_key: api_key.to_string(),
            is_active: true,
        })
    }

    async fn find_tenant_by_id(&self, id: i64) -> Result<Option<Tenant>, StoreError> {
        let conn = self.conn()?;
        let tenant = conn
            .query_row(
                "SELECT id, name, api_key, is_active FROM tenants WHERE id = ?1",
                [id],
                tenant_from_row,
            )
            .optional()?;
        Ok(tenant)
    }

    async fn find_active_tenant_by_key(
        &self,
        api_key: &str,
    ) -> Result<Option<Tenant>, StoreError> {
        let conn = self.conn()?;
        // `=` on TEXT is binary collation in SQLite: exact and case-sensitive.
        let tenant = conn
            .query_row(
                "SELECT id, name, api_key, is_active FROM tenants
                 WHERE api_key = ?1 AND is_active = 1",
                [api_key],
                tenant_from_row,
            )
            .optional()?;
        Ok(tenant)
    }

    async fn set_tenant_active(&self, id: i64, active: bool) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE tenants SET is_active = ?1 WHERE id = ?2",
            params![active, id],
        )?;
        Ok(changed > 0)
    }

    async fn delete_tenant(&self, id: i64) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        Ok(conn.execute("DELETE FROM tenants WHERE id = ?1", [id])? > 0)
    }

    async fn create_domain(&self, tenant_id: i64, new: NewDomain) -> Result<Domain, StoreError> {
        let config = serde_json::to_string(&new.config)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO domains (tenant_id, name, category, config) VALUES (?1, ?2, ?3, ?4)",
            params![tenant_id, new.name, new.category, config],
        )?;
        Ok(Domain {
            id: conn.last_insert_rowid(),
            tenant_id,
            name: new.name,
            category: new.category,
            config: new.config,
        })
    }

    async fn find_domain_by_id(&self, id: i64) -> Result<Option<Domain>, StoreError> {
        let conn = self.conn()?;
        let domain = conn
            .query_row(
                &format!("SELECT {DOMAIN_COLUMNS} FROM domains WHERE id = ?1"),
                [id],
                domain_from_row,
            )
            .optional()?;
        Ok(domain)
    }

    async fn list_domains(&self, tenant_id: i64) -> Result<Vec<Domain>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {DOMAIN_COLUMNS} FROM domains WHERE tenant_id = ?1 ORDER BY id ASC"
        ))?;
        let domains = stmt
            .query_map([tenant_id], domain_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(domains)
    }

    async fn delete_domain(&self, id: i64) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        Ok(conn.execute("DELETE FROM domains WHERE id = ?1", [id])? > 0)
    }

    async fn create_agent(&self, new: NewAgent) -> Result<Agent, StoreError> {
        let config = serde_json::to_string(&new.config)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO agents (domain_id, name, provider, model, role, config)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                new.domain_id,
                new.name,
                new.provider,
                new.model,
                new.role,
                config
            ],
        )?;
        Ok(Agent {
            id: conn.last_insert_rowid(),
            domain_id: new.domain_id,
            name: new.name,
            provider: new.provider,
            model: new.model,
            role: new.role,
            config: new.config,
        })
    }

    async fn find_agent_by_id(&self, id: i64) -> Result<Option<Agent>, StoreError> {
        let conn = self.conn()?;
        let agent = conn
            .query_row(
                &format!("SELECT {AGENT_COLUMNS} FROM agents a WHERE a.id = ?1"),
                [id],
                agent_from_row,
            )
            .optional()?;
        Ok(agent)
    }

    async fn list_agents(&self, tenant_id: i64) -> Result<Vec<Agent>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {AGENT_COLUMNS} FROM agents a
             JOIN domains d ON a.domain_id = d.id
             WHERE d.tenant_id = ?1
             ORDER BY a.id ASC"
        ))?;
        let agents = stmt
            .query_map([tenant_id], agent_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(agents)
    }

    async fn delete_agent(&self, id: i64) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        Ok(conn.execute("DELETE FROM agents WHERE id = ?1", [id])? > 0)
    }

    async fn create_task(
        &self,
        tenant_id: i64,
        agent_id: i64,
        input: &str,
        meta: ConfigMap,
    ) -> Result<Task, StoreError> {
        let meta_json = serde_json::to_string(&meta)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO tasks (tenant_id, agent_id, input, status, meta)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                tenant_id,
                agent_id,
                input,
                TaskStatus::Queued.as_str(),
                meta_json
            ],
        )?;
        Ok(Task {
            id: conn.last_insert_rowid(),
            tenant_id,
            agent_id: Some(agent_id),
            input: input.to_string(),
            output: None,
            status: TaskStatus::Queued,
            error: None,
            meta,
        })
    }

    async fn find_task_by_id(&self, id: i64) -> Result<Option<Task>, StoreError> {
        let conn = self.conn()?;
        let task = conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                [id],
                task_from_row,
            )
            .optional()?;
        Ok(task)
    }

    async fn list_tasks(&self, tenant_id: i64) -> Result<Vec<Task>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE tenant_id = ?1 ORDER BY id DESC"
        ))?;
        let tasks = stmt
            .query_map([tenant_id], task_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    async fn persist_task(&self, task: &Task) -> Result<(), StoreError> {
        let meta = serde_json::to_string(&task.meta)?;
        let conn = self.conn()?;
        conn.execute(
            "UPDATE tasks SET output = ?1, status = ?2, error = ?3, meta = ?4 WHERE id = ?5",
            params![
                task.output,
                task.status.as_str(),
                task.error,
                meta,
                task.id
            ],
        )?;
        Ok(())
    }
}
