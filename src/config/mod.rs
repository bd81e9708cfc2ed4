//! Runtime settings.
//!
//! [`Settings`] is built once at start-up and handed to the components that
//! need it. Provider credentials come from the persisted `config` table
//! ([`ConfigStore`], sharing the database with the entity store) and are
//! overridden by environment variables.

use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension};

use crate::error::StoreError;

/// Config-table key and environment variable for each provider credential.
pub const OPENAI_KEY: (&str, &str) = ("openai_api_key", "OPENAI_API_KEY");
pub const GEMINI_KEY: (&str, &str) = ("google_api_key", "GOOGLE_API_KEY");
pub const VENICE_KEY: (&str, &str) = ("venice_api_key", "VENICE_API_KEY");

/// Keys `vltrn config set` accepts.
pub const KNOWN_KEYS: &[&str] = &[OPENAI_KEY.0, GEMINI_KEY.0, VENICE_KEY.0];

/// Credentials for the remote text-generation backends.
/// `None` means the adapter answers with its placeholder.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ProviderKeys {
    pub openai: Option<String>,
    pub gemini: Option<String>,
    pub venice: Option<String>,
}

impl std::fmt::Debug for ProviderKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |k: &Option<String>| if k.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("ProviderKeys")
            .field("openai", &mask(&self.openai))
            .field("gemini", &mask(&self.gemini))
            .field("venice", &mask(&self.venice))
            .finish()
    }
}

/// Immutable application settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub db_path: String,
    pub keys: ProviderKeys,
}

impl Settings {
    /// Settings with no provider credentials. Everything runs offline.
    pub fn offline(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            keys: ProviderKeys::default(),
        }
    }

    /// Resolve settings: persisted config first, environment on top.
    pub fn load(db_path: impl Into<String>, store: &ConfigStore) -> Result<Self, StoreError> {
        Self::load_with(db_path, store, |var| std::env::var(var).ok())
    }

    /// Like [`Settings::load`] with an injectable environment lookup.
    pub fn load_with(
        db_path: impl Into<String>,
        store: &ConfigStore,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, StoreError> {
        let resolve = |(key, var): (&str, &str)| -> Result<Option<String>, StoreError> {
            if let Some(value) = non_empty(env(var)) {
                return Ok(Some(value));
            }
            Ok(non_empty(store.get(key)?))
        };

        Ok(Self {
            db_path: db_path.into(),
            keys: ProviderKeys {
                openai: resolve(OPENAI_KEY)?,
                gemini: resolve(GEMINI_KEY)?,
                venice: resolve(VENICE_KEY)?,
            },
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Persistent key-value configuration store.
pub struct ConfigStore {
    conn: Mutex<Connection>,
}

impl ConfigStore {
    /// Open or create the config table in the given database.
    /// Use `":memory:"` for tests.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS config (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Get a config value by key.
    pub fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.conn()?;
        let value = conn
            .query_row("SELECT value FROM config WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Set a config value (upsert).
    pub fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO config (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [key, value],
        )?;
        Ok(())
    }

    /// Remove a config key.
    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM config WHERE key = ?1", [key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mem_config() -> ConfigStore {
        ConfigStore::open(":memory:").unwrap()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn get_returns_none_for_missing_key() {
        let config = mem_config();
        assert!(config.get("nonexistent").unwrap().is_none());
    }

    #[test]
    fn set_overwrites_existing() {
        let config = mem_config();
        config.set("openai_api_key", "old").unwrap();
        config.set("openai_api_key", "new").unwrap();
        assert_eq!(config.get("openai_api_key").unwrap().unwrap(), "new");
    }

    #[test]
    fn remove_deletes_key() {
        let config = mem_config();
        config.set("venice_api_key", "test").unwrap();
        config.remove("venice_api_key").unwrap();
        assert!(config.get("venice_api_key").unwrap().is_none());
        config.remove("venice_api_key").unwrap();
    }

    #[test]
    fn persists_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config-test.db");
        let path_str = path.to_str().unwrap();

        {
            let config = ConfigStore::open(path_str).unwrap();
            config.set("google_api_key", "persisted").unwrap();
        }

        {
            let config = ConfigStore::open(path_str).unwrap();
            assert_eq!(config.get("google_api_key").unwrap().unwrap(), "persisted");
        }
    }

    #[test]
    fn load_without_any_source_is_offline() {
        let settings = Settings::load_with("db", &mem_config(), no_env).unwrap();
        assert_eq!(settings, Settings::offline("db"));
    }

    #[test]
    fn load_reads_persisted_keys() {
        let config = mem_config();
        config.set("openai_api_key", "sk-stored").unwrap();
        let settings = Settings::load_with("db", &config, no_env).unwrap();
        assert_eq!(settings.keys.openai.as_deref(), Some("sk-stored"));
        assert!(settings.keys.gemini.is_none());
    }

    #[test]
    fn environment_overrides_persisted() {
        let config = mem_config();
        config.set("openai_api_key", "sk-stored").unwrap();
        let env = |var: &str| (var == "OPENAI_API_KEY").then(|| "sk-env".to_string());
        let settings = Settings::load_with("db", &config, env).unwrap();
        assert_eq!(settings.keys.openai.as_deref(), Some("sk-env"));
    }

    #[test]
    fn empty_values_count_as_unset() {
        let config = mem_config();
        config.set("venice_api_key", "   ").unwrap();
        let env = |var: &str| (var == "GOOGLE_API_KEY").then(String::new);
        let settings = Settings::load_with("db", &config, env).unwrap();
        assert!(settings.keys.venice.is_none());
        assert!(settings.keys.gemini.is_none());
    }

    #[test]
    fn debug_masks_credentials() {
        let keys = ProviderKeys {
            openai: Some("sk-secret".to_string()),
            ..ProviderKeys::default()
        };
        let rendered = format!("{keys:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("<set>"));
    }
}
