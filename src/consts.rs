//! Project-wide constants.

use std::path::PathBuf;
use std::time::Duration;

/// Sampling temperature used when an agent's config doesn't set one.
pub const DEFAULT_TEMPERATURE: f64 = 0.2;

/// Maximum number of prompt characters echoed back by a placeholder reply.
pub const PLACEHOLDER_PROMPT_CHARS: usize = 200;

/// Hard cap on a single remote provider call.
pub const PROVIDER_TIMEOUT: Duration = Duration::from_secs(60);

/// Message recorded on a task whose agent reference doesn't resolve.
pub const AGENT_NOT_FOUND: &str = "Agent not found";

/// Message recorded on a task whose agent names an unregistered provider.
pub const UNKNOWN_PROVIDER: &str = "Unknown provider";

/// Prefix of generated tenant keys.
pub const API_KEY_PREFIX: &str = "demo_";

/// Default database path: `~/.vltrn/vltrn.db`.
/// Single DB for tenants, agents, tasks and config.
pub fn default_db_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".vltrn")
        .join("vltrn.db")
}
