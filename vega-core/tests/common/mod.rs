//! Test helper functions for integration tests
//!
//! Shared across test files using the tests/common/ pattern.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// Initialize logging for tests (only once per test run)
static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .with_target(true)
                    .with_level(true),
            )
            .with(tracing_subscriber::filter::EnvFilter::from_default_env())
            .try_init();
    });
}

pub const SKILLS_INDEX: &str = r#"
skills:
  kubernetes-ops:
    version: "1.2.0"
    description: Kubernetes cluster management
    author: platform-team
    tags: [k8s, cluster]
    tools: [kubectl_apply, kubectl_get]
  s1:
    version: "1.0.0"
    description: First skill
    tags: [alpha]
  s2:
    version: "1.0.0"
    description: Second skill
    tags: [beta]
"#;

pub const PERSONAS_INDEX: &str = r#"
personas:
  p1:
    version: "1.0.0"
    description: Platform operator
    tags: [ops]
"#;

pub const PROFILES_INDEX: &str = r#"
profiles:
  bundle:
    version: "0.1.0"
    description: Ops bundle
    persona: p1
    skills: [s1, s2]
"#;

pub fn manifest(kind: &str, name: &str) -> String {
    format!("kind: {kind}\nname: {name}\nversion: 1.0.0\n")
}

/// Every file of the fixture repository, as (relative path, content)
pub fn fixture_files() -> Vec<(String, String)> {
    let mut files = vec![
        ("skills/index.yaml".to_string(), SKILLS_INDEX.to_string()),
        ("personas/index.yaml".to_string(), PERSONAS_INDEX.to_string()),
        ("profiles/index.yaml".to_string(), PROFILES_INDEX.to_string()),
    ];
    for name in ["kubernetes-ops", "s1", "s2"] {
        files.push((format!("skills/{name}/vega.yaml"), manifest("skill", name)));
    }
    files.push(("personas/p1/vega.yaml".to_string(), manifest("persona", "p1")));
    files.push((
        "profiles/bundle/vega.yaml".to_string(),
        manifest("profile", "bundle"),
    ));
    files
}

/// Write the fixture repository under `root`
pub fn write_fixture_repo(root: &Path) {
    for (rel, content) in fixture_files() {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }
}

#[derive(Clone)]
enum Route {
    Respond { status: u16, body: Vec<u8> },
    /// 200 with a Content-Length larger than the body that is sent
    Truncated { advertised: usize, body: Vec<u8> },
    Hang,
}

/// Minimal HTTP/1.1 server answering GET requests from a fixed route table
///
/// Unknown paths answer 404. Every request path is recorded.
pub struct MockRegistry {
    addr: SocketAddr,
    shutdown_tx: Option<mpsc::Sender<()>>,
    requests: Arc<Mutex<Vec<String>>>,
}

pub struct MockRegistryBuilder {
    routes: HashMap<String, Route>,
}

impl MockRegistryBuilder {
    /// Serve every file of the fixture repository
    pub fn with_fixture(mut self) -> Self {
        for (rel, content) in fixture_files() {
            self = self.route(&rel, 200, content);
        }
        self
    }

    pub fn route(mut self, path: &str, status: u16, body: impl Into<Vec<u8>>) -> Self {
        self.routes.insert(
            format!("/{path}"),
            Route::Respond {
                status,
                body: body.into(),
            },
        );
        self
    }

    /// Answer 200 advertising `advertised` bytes, send `body`, then close
    pub fn truncated(mut self, path: &str, advertised: usize, body: impl Into<Vec<u8>>) -> Self {
        self.routes.insert(
            format!("/{path}"),
            Route::Truncated {
                advertised,
                body: body.into(),
            },
        );
        self
    }

    /// Accept the request but never answer it
    pub fn hang(mut self, path: &str) -> Self {
        self.routes.insert(format!("/{path}"), Route::Hang);
        self
    }

    pub async fn start(self) -> MockRegistry {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let requests = Arc::new(Mutex::new(Vec::new()));
        let requests_clone = requests.clone();
        let routes = Arc::new(self.routes);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    accept_result = listener.accept() => {
                        if let Ok((stream, _)) = accept_result {
                            let routes = routes.clone();
                            let requests = requests_clone.clone();
                            tokio::spawn(async move {
                                handle_connection(stream, routes, requests).await;
                            });
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        MockRegistry {
            addr,
            shutdown_tx: Some(shutdown_tx),
            requests,
        }
    }
}

impl MockRegistry {
    pub fn builder() -> MockRegistryBuilder {
        MockRegistryBuilder {
            routes: HashMap::new(),
        }
    }

    /// Base URL of the registry, with a trailing slash
    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// Paths requested so far, in arrival order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for MockRegistry {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.try_send(());
        }
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    routes: Arc<HashMap<String, Route>>,
    requests: Arc<Mutex<Vec<String>>>,
) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }

    let head = String::from_utf8_lossy(&buf);
    let path = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();
    requests.lock().unwrap().push(path.clone());

    let (status, body, content_length) = match routes.get(&path) {
        Some(Route::Respond { status, body }) => (*status, body.clone(), body.len()),
        Some(Route::Truncated { advertised, body }) => (200, body.clone(), *advertised),
        Some(Route::Hang) => {
            tokio::time::sleep(Duration::from_secs(60)).await;
            return;
        }
        None => {
            let body = b"not found".to_vec();
            let len = body.len();
            (404, body, len)
        }
    };

    let reason = match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    };
    let header = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Length: {content_length}\r\nContent-Type: text/yaml\r\nConnection: close\r\n\r\n"
    );

    let _ = stream.write_all(header.as_bytes()).await;
    let _ = stream.write_all(&body).await;
    let _ = stream.shutdown().await;
}
