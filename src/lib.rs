pub mod config;
pub mod consts;
pub mod error;
pub mod gate;
pub mod models;
pub mod observability;
pub mod orchestrator;
pub mod providers;
pub mod seed;
pub mod store;
pub mod workspace;

pub use error::{AuthError, Error, ProviderError, Result, StoreError};
