use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;

use vltrn::config::{ConfigStore, KNOWN_KEYS, Settings};
use vltrn::consts::default_db_path;
use vltrn::gate::AccessGate;
use vltrn::models::{ConfigMap, NewAgent, NewDomain};
use vltrn::observability;
use vltrn::orchestrator::Orchestrator;
use vltrn::providers::ProviderRegistry;
use vltrn::seed::{generate_api_key, seed_demo};
use vltrn::store::Store;
use vltrn::store::sqlite::SqliteStore;
use vltrn::workspace::Workspace;

#[derive(Parser)]
#[command(
    name = "vltrn",
    author,
    version,
    about = "Tenants, domains and agents that turn tasks into text."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// SQLite database path (use :memory: for ephemeral)
    #[arg(short, long, global = true, env = "VLTRN_DB")]
    db: Option<String>,

    /// Tenant API key for domain/agent/task commands
    #[arg(short = 'k', long, global = true, env = "VLTRN_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Create the demo tenant, domain and agent, and print its API key
    Seed,
    /// Manage tenants (administrative, no API key needed)
    Tenant {
        #[command(subcommand)]
        action: TenantAction,
    },
    /// Manage persisted provider credentials
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Manage the tenant's domains
    Domain {
        #[command(subcommand)]
        action: DomainAction,
    },
    /// Manage the tenant's agents
    Agent {
        #[command(subcommand)]
        action: AgentAction,
    },
    /// Run and inspect tasks
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },
}

#[derive(Subcommand)]
enum TenantAction {
    /// Create a tenant and print its generated API key
    Create { name: String },
    /// Allow the tenant's API key again
    Activate { id: i64 },
    /// Reject the tenant's API key
    Deactivate { id: i64 },
    /// Delete the tenant and everything it owns
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Store a provider credential
    Set { key: String, value: String },
    /// Remove a stored provider credential
    Unset { key: String },
    /// Show which credentials are configured (values are never printed)
    List,
}

#[derive(Subcommand)]
enum DomainAction {
    Create {
        #[arg(long)]
        name: String,
        /// Business category, e.g. marketing, finance, ops
        #[arg(long)]
        category: String,
        /// JSON object
        #[arg(long, value_parser = parse_object, default_value = "{}")]
        config: ConfigMap,
    },
    List,
    Show {
        id: i64,
    },
    /// Delete the domain and its agents
    Delete {
        id: i64,
    },
}

#[derive(Subcommand)]
enum AgentAction {
    Create {
        #[arg(long)]
        domain: i64,
        #[arg(long)]
        name: String,
        /// openai, gemini or venice
        #[arg(long)]
        provider: String,
        #[arg(long)]
        model: String,
        #[arg(long)]
        role: String,
        /// JSON object, e.g. '{"temperature": 0.2}'
        #[arg(long, value_parser = parse_object, default_value = "{}")]
        config: ConfigMap,
    },
    List,
    Show {
        id: i64,
    },
    /// Delete the agent; its tasks are kept
    Delete {
        id: i64,
    },
}

#[derive(Subcommand)]
enum TaskAction {
    /// Create a task for an agent and execute it now
    Run {
        #[arg(long)]
        agent: i64,
        #[arg(long)]
        input: String,
        /// JSON object
        #[arg(long, value_parser = parse_object, default_value = "{}")]
        meta: ConfigMap,
    },
    List,
    Show {
        id: i64,
    },
}

fn parse_object(raw: &str) -> Result<ConfigMap, String> {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(_) => Err("expected a JSON object".to_string()),
        Err(e) => Err(format!("invalid JSON: {e}")),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    observability::init(cli.verbose);

    let db_path = match cli.db {
        Some(path) => path,
        None => default_db_path().to_string_lossy().into_owned(),
    };
    if db_path != ":memory:"
        && let Some(parent) = Path::new(&db_path).parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let config_store = ConfigStore::open(&db_path).context("failed to open config store")?;
    let settings = Settings::load(db_path, &config_store).context("failed to load settings")?;
    tracing::debug!(keys = ?settings.keys, "settings loaded");

    let store: Arc<dyn Store> =
        Arc::new(SqliteStore::new(&settings.db_path).context("failed to open database")?);
    let api_key = cli.api_key.as_deref();

    match cli.command {
        Command::Config { action } => handle_config(&config_store, action),
        Command::Seed => {
            let seed = seed_demo(store.as_ref()).await?;
            print_json(&seed)
        }
        Command::Tenant { action } => handle_tenant(store.as_ref(), action).await,
        Command::Domain { action } => {
            let workspace = open_workspace(store, &settings, api_key).await?;
            handle_domain(&workspace, action).await
        }
        Command::Agent { action } => {
            let workspace = open_workspace(store, &settings, api_key).await?;
            handle_agent(&workspace, action).await
        }
        Command::Task { action } => {
            let workspace = open_workspace(store, &settings, api_key).await?;
            handle_task(&workspace, action).await
        }
    }
}

/// Resolve the credential and build the tenant's workspace.
async fn open_workspace(
    store: Arc<dyn Store>,
    settings: &Settings,
    api_key: Option<&str>,
) -> anyhow::Result<Workspace> {
    let providers = Arc::new(ProviderRegistry::from_settings(settings).await?);
    let orchestrator = Arc::new(Orchestrator::new(Arc::clone(&store), providers));
    let tenant = AccessGate::new(Arc::clone(&store)).resolve(api_key).await?;
    Ok(Workspace::new(tenant, store, orchestrator))
}

fn check_config_key(key: &str) -> anyhow::Result<()> {
    if !KNOWN_KEYS.contains(&key) {
        bail!("unknown config key: {key} (expected one of {KNOWN_KEYS:?})");
    }
    Ok(())
}

fn handle_config(store: &ConfigStore, action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Set { key, value } => {
            check_config_key(&key)?;
            store.set(&key, &value)?;
            println!("✓ {key} saved");
        }
        ConfigAction::Unset { key } => {
            check_config_key(&key)?;
            store.remove(&key)?;
            println!("✓ {key} removed");
        }
        ConfigAction::List => {
            for key in KNOWN_KEYS {
                let state = if store.get(key)?.is_some() {
                    "set"
                } else {
                    "unset"
                };
                println!("  {key:<16} {state}");
            }
        }
    }
    Ok(())
}

async fn handle_tenant(store: &dyn Store, action: TenantAction) -> anyhow::Result<()> {
    match action {
        TenantAction::Create { name } => {
            let api_key = generate_api_key();
            let tenant = store
                .create_tenant(&name, &api_key)
                .await
                .with_context(|| format!("failed to create tenant {name:?}"))?;
            print_json(&json!({ "tenant": tenant, "api_key": api_key }))
        }
        TenantAction::Activate { id } => set_tenant_active(store, id, true).await,
        TenantAction::Deactivate { id } => set_tenant_active(store, id, false).await,
        TenantAction::Delete { id } => {
            if !store.delete_tenant(id).await? {
                bail!("tenant {id} not found");
            }
            println!("✓ tenant {id} deleted");
            Ok(())
        }
    }
}

async fn set_tenant_active(store: &dyn Store, id: i64, active: bool) -> anyhow::Result<()> {
    if !store.set_tenant_active(id, active).await? {
        bail!("tenant {id} not found");
    }
    print_json(&store.find_tenant_by_id(id).await?)
}

async fn handle_domain(workspace: &Workspace, action: DomainAction) -> anyhow::Result<()> {
    match action {
        DomainAction::Create {
            name,
            category,
            config,
        } => print_json(
            &workspace
                .create_domain(NewDomain {
                    name,
                    category,
                    config,
                })
                .await?,
        ),
        DomainAction::List => print_json(&workspace.list_domains().await?),
        DomainAction::Show { id } => print_json(&workspace.get_domain(id).await?),
        DomainAction::Delete { id } => {
            workspace.delete_domain(id).await?;
            println!("✓ domain {id} deleted");
            Ok(())
        }
    }
}

async fn handle_agent(workspace: &Workspace, action: AgentAction) -> anyhow::Result<()> {
    match action {
        AgentAction::Create {
            domain,
            name,
            provider,
            model,
            role,
            config,
        } => print_json(
            &workspace
                .create_agent(NewAgent {
                    domain_id: domain,
                    name,
                    provider,
                    model,
                    role,
                    config,
                })
                .await?,
        ),
        AgentAction::List => print_json(&workspace.list_agents().await?),
        AgentAction::Show { id } => print_json(&workspace.get_agent(id).await?),
        AgentAction::Delete { id } => {
            workspace.delete_agent(id).await?;
            println!("✓ agent {id} deleted");
            Ok(())
        }
    }
}

async fn handle_task(workspace: &Workspace, action: TaskAction) -> anyhow::Result<()> {
    match action {
        TaskAction::Run { agent, input, meta } => {
            print_json(&workspace.submit_task(agent, &input, meta).await?)
        }
        TaskAction::List => print_json(&workspace.list_tasks().await?),
        TaskAction::Show { id } => print_json(&workspace.get_task(id).await?),
    }
}
