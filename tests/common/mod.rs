//! Shared helpers for integration tests
//!
//! [`StubServer`] is a minimal in-process HTTP/1.1 server. Each route serves
//! a fixed body, can be scripted to answer the first requests with given
//! status codes (for example 429, 429, then 200), and counts HEAD and GET
//! requests separately. Every response closes the connection.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use shard_fetcher::app::{
    ClientConfig, FetchClient, TransferConfig, TransferWorker, UrlRecord,
};

/// Behaviour of one path on the stub server
#[derive(Debug, Clone)]
pub struct Route {
    body: Vec<u8>,
    script: VecDeque<u16>,
    default_status: u16,
    send_length: bool,
    truncate_to: Option<usize>,
    delay: Duration,
}

impl Route {
    /// Serve `body` with status 200
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            script: VecDeque::new(),
            default_status: 200,
            send_length: true,
            truncate_to: None,
            delay: Duration::ZERO,
        }
    }

    /// Always answer with `status` and an empty body
    pub fn status(status: u16) -> Self {
        Self {
            default_status: status,
            ..Self::ok(Vec::new())
        }
    }

    /// Answer the first requests with these statuses before serving normally
    pub fn scripted(mut self, statuses: &[u16]) -> Self {
        self.script = statuses.iter().copied().collect();
        self
    }

    /// Omit the `Content-Length` header
    pub fn without_length(mut self) -> Self {
        self.send_length = false;
        self
    }

    /// Declare the full length but close after `bytes` bytes of body
    pub fn truncated(mut self, bytes: usize) -> Self {
        self.truncate_to = Some(bytes);
        self
    }

    /// Wait before answering each request
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Default)]
struct State {
    routes: HashMap<String, Route>,
    gets: HashMap<String, usize>,
    heads: HashMap<String, usize>,
}

/// In-process HTTP server for exercising the transfer worker
pub struct StubServer {
    addr: SocketAddr,
    state: Arc<Mutex<State>>,
    accept_task: JoinHandle<()>,
}

impl StubServer {
    /// Start a server on an ephemeral local port
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(Mutex::new(State::default()));

        let accept_state = state.clone();
        let accept_task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let state = accept_state.clone();
                tokio::spawn(async move {
                    let _ = serve_connection(stream, state).await;
                });
            }
        });

        Self {
            addr,
            state,
            accept_task,
        }
    }

    /// URL prefix of the server, ending in `/`
    pub fn prefix(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// Full URL of `path`
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.prefix(), path)
    }

    /// Register `route` at `/path`
    pub fn route(&self, path: &str, route: Route) {
        self.state
            .lock()
            .unwrap()
            .routes
            .insert(format!("/{}", path), route);
    }

    /// GET requests seen for `/path`
    pub fn gets(&self, path: &str) -> usize {
        let state = self.state.lock().unwrap();
        state.gets.get(&format!("/{}", path)).copied().unwrap_or(0)
    }

    /// HEAD requests seen for `/path`
    pub fn heads(&self, path: &str) -> usize {
        let state = self.state.lock().unwrap();
        state.heads.get(&format!("/{}", path)).copied().unwrap_or(0)
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    }
}

async fn serve_connection(mut stream: TcpStream, state: Arc<Mutex<State>>) -> std::io::Result<()> {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        request.extend_from_slice(&buf[..n]);
    }

    let text = String::from_utf8_lossy(&request);
    let mut parts = text.lines().next().unwrap_or_default().split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();
    let is_head = method == "HEAD";

    let (status, route) = {
        let mut state = state.lock().unwrap();
        let counter = if is_head {
            &mut state.heads
        } else {
            &mut state.gets
        };
        *counter.entry(path.clone()).or_insert(0) += 1;

        match state.routes.get_mut(&path) {
            Some(route) => {
                let status = route.script.pop_front().unwrap_or(route.default_status);
                (status, Some(route.clone()))
            }
            None => (404, None),
        }
    };

    if let Some(route) = &route {
        if !route.delay.is_zero() {
            tokio::time::sleep(route.delay).await;
        }
    }

    let mut head = format!("HTTP/1.1 {} {}\r\nConnection: close\r\n", status, reason(status));
    let body: &[u8] = match (&route, status) {
        (Some(route), 200) => {
            if route.send_length {
                head.push_str(&format!("Content-Length: {}\r\n", route.body.len()));
            }
            let end = route.truncate_to.unwrap_or(route.body.len()).min(route.body.len());
            &route.body[..end]
        }
        _ => {
            head.push_str("Content-Length: 0\r\n");
            &[]
        }
    };
    head.push_str("\r\n");

    stream.write_all(head.as_bytes()).await?;
    if !is_head {
        stream.write_all(body).await?;
    }
    stream.flush().await?;
    stream.shutdown().await?;
    Ok(())
}

/// Transfer settings with millisecond backoff for fast tests
pub fn fast_transfer_config() -> TransferConfig {
    TransferConfig {
        max_rate_limit_retries: 3,
        initial_backoff: Duration::from_millis(10),
        max_backoff: Duration::from_millis(100),
        download_timeout: Duration::from_secs(10),
        ..Default::default()
    }
}

/// A worker backed by a fresh client
pub fn worker(config: TransferConfig) -> TransferWorker {
    let client = Arc::new(FetchClient::new(&ClientConfig::default()).unwrap());
    TransferWorker::new(client, config)
}

/// Record for `path` on `server`, stored under `base_dir`
pub fn record(server: &StubServer, path: &str, base_dir: &Path) -> UrlRecord {
    UrlRecord::new(&server.url(path), &server.prefix(), base_dir).unwrap()
}
