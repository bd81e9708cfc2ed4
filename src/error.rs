//! Error taxonomy shared by the store, the gate, the providers and the
//! orchestrator.

use thiserror::Error;

/// The persistence layer failed. Never converted into a task state;
/// it always propagates to the caller.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("corrupt JSON column: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database connection lock poisoned")]
    Poisoned,
}

/// Credential resolution failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("missing credential")]
    Missing,

    #[error("invalid credential")]
    Invalid,
}

/// A text-generation backend failed. The message is recorded on the task
/// verbatim, so keep it human-readable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ProviderError {
    message: String,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// The record is absent, or belongs to another tenant.
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("invalid input: {0}")]
    Invalid(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Persistence(#[from] StoreError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_renders_entity() {
        assert_eq!(Error::NotFound("Agent").to_string(), "Agent not found");
        assert_eq!(Error::NotFound("Domain").to_string(), "Domain not found");
    }

    #[test]
    fn auth_messages() {
        assert_eq!(AuthError::Missing.to_string(), "missing credential");
        assert_eq!(AuthError::Invalid.to_string(), "invalid credential");
    }

    #[test]
    fn provider_error_is_verbatim() {
        let err = ProviderError::new("openai API error (500): boom");
        assert_eq!(err.to_string(), "openai API error (500): boom");
        assert_eq!(err.message(), "openai API error (500): boom");
    }

    #[test]
    fn auth_error_converts_transparently() {
        let err: Error = AuthError::Invalid.into();
        assert_eq!(err.to_string(), "invalid credential");
        assert!(matches!(err, Error::Auth(AuthError::Invalid)));
    }
}
