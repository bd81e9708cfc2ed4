#![allow(dead_code)]

use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use vltrn::models::{Agent, ConfigMap, Domain, NewAgent, NewDomain, Tenant};
use vltrn::orchestrator::Orchestrator;
use vltrn::providers::{Provider, ProviderRegistry};
use vltrn::store::Store;
use vltrn::store::sqlite::SqliteStore;
use vltrn::workspace::Workspace;

/// An in-memory store plus an orchestrator over the given providers.
pub struct Harness {
    pub store: Arc<dyn Store>,
    pub providers: Arc<ProviderRegistry>,
    pub orchestrator: Arc<Orchestrator>,
}

impl Harness {
    /// No providers registered.
    pub async fn new() -> Self {
        let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().unwrap());
        let providers = Arc::new(ProviderRegistry::new());
        let orchestrator = Arc::new(Orchestrator::new(
            Arc::clone(&store),
            Arc::clone(&providers),
        ));
        Self {
            store,
            providers,
            orchestrator,
        }
    }

    /// A single registered provider.
    pub async fn with(provider: Arc<dyn Provider>) -> Self {
        let harness = Self::new().await;
        harness.providers.register(provider).await;
        harness
    }

    /// Built-in adapters, no credentials.
    pub async fn offline() -> Self {
        let harness = Self::new().await;
        let builtins =
            ProviderRegistry::from_settings(&vltrn::config::Settings::offline(":memory:"))
                .await
                .unwrap();
        for name in builtins.names().await {
            harness
                .providers
                .register(builtins.get(&name).await.unwrap())
                .await;
        }
        harness
    }

    pub async fn tenant(&self, name: &str) -> Tenant {
        self.store
            .create_tenant(name, &format!("key-{name}"))
            .await
            .unwrap()
    }

    pub fn workspace(&self, tenant: Tenant) -> Workspace {
        Workspace::new(
            tenant,
            Arc::clone(&self.store),
            Arc::clone(&self.orchestrator),
        )
    }

    /// Tenant + workspace + one domain + one agent on `provider`.
    pub async fn tenant_with_agent(
        &self,
        name: &str,
        provider: &str,
    ) -> (Workspace, Domain, Agent) {
        let ws = self.workspace(self.tenant(name).await);
        let domain = ws.create_domain(new_domain("Marketing")).await.unwrap();
        let agent = ws
            .create_agent(new_agent(domain.id, provider, "gpt-4o-mini"))
            .await
            .unwrap();
        (ws, domain, agent)
    }
}

pub fn new_domain(name: &str) -> NewDomain {
    NewDomain {
        name: name.to_string(),
        category: "marketing".to_string(),
        config: ConfigMap::new(),
    }
}

pub fn new_agent(domain_id: i64, provider: &str, model: &str) -> NewAgent {
    NewAgent {
        domain_id,
        name: "ContentAgent".to_string(),
        provider: provider.to_string(),
        model: model.to_string(),
        role: "content".to_string(),
        config: ConfigMap::new(),
    }
}

/// Accept one HTTP request on a local port, answer with `status` and
/// `body`, and hand back the raw request text.
pub async fn serve_once(status: u16, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        let reason = if status < 400 { "OK" } else { "Error" };
        let response = format!(
            "HTTP/1.1 {status} {reason}\r\n\
             Content-Type: application/json\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
        request
    });

    (format!("http://{addr}"), handle)
}

/// Accepts one connection, reads the request and never answers.
pub async fn serve_silence() -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_request(&mut socket).await;
        std::future::pending::<()>().await;
    });

    (format!("http://{addr}"), handle)
}

/// A URL nothing is listening on.
pub async fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let headers = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let body_len = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + body_len {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// The JSON body of a raw HTTP request.
pub fn request_body(raw: &str) -> serde_json::Value {
    let (_, body) = raw.split_once("\r\n\r\n").unwrap();
    serde_json::from_str(body).unwrap()
}
