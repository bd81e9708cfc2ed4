//! Tenant key generation and the demo data set.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngExt;
use serde::Serialize;
use serde_json::json;

use crate::consts::API_KEY_PREFIX;
use crate::error::StoreError;
use crate::models::{Agent, ConfigMap, Domain, NewAgent, NewDomain, Tenant};
use crate::store::Store;

pub const DEMO_TENANT: &str = "Demo Co";

/// Random tenant API key: `demo_` + 24 random bytes, URL-safe base64.
pub fn generate_api_key() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 24] = rng.random();
    format!("{API_KEY_PREFIX}{}", URL_SAFE_NO_PAD.encode(bytes))
}

/// What [`seed_demo`] created. `api_key` is the only place the demo
/// tenant's key is ever shown.
#[derive(Debug, Serialize)]
pub struct DemoSeed {
    pub tenant: Tenant,
    pub api_key: String,
    pub domain: Domain,
    pub agent: Agent,
}

/// Create the demo tenant with a Marketing domain and an OpenAI content
/// agent.
pub async fn seed_demo(store: &dyn Store) -> Result<DemoSeed, StoreError> {
    let api_key = generate_api_key();
    let tenant = store.create_tenant(DEMO_TENANT, &api_key).await?;

    let domain = store
        .create_domain(
            tenant.id,
            NewDomain {
                name: "Marketing".to_string(),
                category: "marketing".to_string(),
                config: ConfigMap::new(),
            },
        )
        .await?;

    let mut config = ConfigMap::new();
    config.insert("temperature".to_string(), json!(0.2));
    let agent = store
        .create_agent(NewAgent {
            domain_id: domain.id,
            name: "ContentAgent".to_string(),
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            role: "content".to_string(),
            config,
        })
        .await?;

    tracing::info!(tenant_id = tenant.id, "demo data seeded");
    Ok(DemoSeed {
        tenant,
        api_key,
        domain,
        agent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_has_prefix_and_url_safe_body() {
        let key = generate_api_key();
        let body = key.strip_prefix("demo_").unwrap();
        // 24 bytes -> 32 base64 chars, no padding
        assert_eq!(body.len(), 32);
        assert!(
            body.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn api_keys_are_unique() {
        assert_ne!(generate_api_key(), generate_api_key());
    }
}
