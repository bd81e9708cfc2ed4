//! Tenants, domains, agents and tasks.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Free-form configuration attached to domains, agents and tasks.
pub type ConfigMap = serde_json::Map<String, serde_json::Value>;

/// An isolated customer account. Owns domains and tasks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tenant {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing)]
    pub api_key: String,
    pub is_active: bool,
}

/// A named grouping of agents, tagged by business category
/// (`marketing`, `finance`, `ops`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    pub id: i64,
    pub tenant_id: i64,
    pub name: String,
    pub category: String,
    pub config: ConfigMap,
}

#[derive(Debug, Clone, Default)]
pub struct NewDomain {
    pub name: String,
    pub category: String,
    pub config: ConfigMap,
}

/// A provider + model + role binding owned by a domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: i64,
    pub domain_id: i64,
    pub name: String,
    /// Registry key of the provider adapter (`openai`, `gemini`, `venice`).
    pub provider: String,
    pub model: String,
    pub role: String,
    pub config: ConfigMap,
}

#[derive(Debug, Clone, Default)]
pub struct NewAgent {
    pub domain_id: i64,
    pub name: String,
    pub provider: String,
    pub model: String,
    pub role: String,
    pub config: ConfigMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Queued,
    Running,
    Done,
    Error,
}

impl TaskStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Running => "running",
            TaskStatus::Done => "done",
            TaskStatus::Error => "error",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Error)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(TaskStatus::Queued),
            "running" => Ok(TaskStatus::Running),
            "done" => Ok(TaskStatus::Done),
            "error" => Ok(TaskStatus::Error),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

/// One unit of work executed by an agent.
///
/// `tenant_id` is denormalized for access scoping. `agent_id` becomes
/// `None` when the agent is deleted; the task itself survives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub tenant_id: i64,
    pub agent_id: Option<i64>,
    pub input: String,
    pub output: Option<String>,
    pub status: TaskStatus,
    pub error: Option<String>,
    pub meta: ConfigMap,
}

impl Task {
    /// queued -> running.
    pub fn start(&mut self) {
        self.status = TaskStatus::Running;
        self.output = None;
        self.error = None;
    }

    /// Terminal success. `output` is set only here.
    pub fn complete(&mut self, output: String) {
        self.status = TaskStatus::Done;
        self.output = Some(output);
        self.error = None;
    }

    /// Terminal failure. `error` is set only here.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = TaskStatus::Error;
        self.output = None;
        self.error = Some(message.into());
    }
}
