//! Shared utilities for integration testing.
//!
//! `MockNode` is one scripted endpoint. Every handle a `MockFactory` opens
//! for the same URL shares that node, so the invoker, the quorum checker and
//! the health monitor all observe the same behaviour and counters.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;

use tx_relay::config::{Commitment, RelayConfig};
use tx_relay::transport::{
    FreshnessToken, RpcTransport, SignatureStatus, SimulationOutcome, TransportError,
    TransportErrorKind, TransportFactory, TransportResult,
};

pub fn err(kind: TransportErrorKind, message: &str) -> TransportError {
    TransportError::new(kind, message)
}

pub fn at_depth(commitment: Commitment) -> Option<SignatureStatus> {
    Some(SignatureStatus {
        commitment: Some(commitment),
        err: None,
    })
}

pub fn confirmed() -> Option<SignatureStatus> {
    at_depth(Commitment::Confirmed)
}

pub fn executed_with_error(message: &str) -> Option<SignatureStatus> {
    Some(SignatureStatus {
        commitment: Some(Commitment::Processed),
        err: Some(message.to_string()),
    })
}

/// One scripted endpoint.
///
/// Queued results are consumed first; once a queue is empty the default
/// applies.
pub struct MockNode {
    pub name: String,
    submit_queue: Mutex<VecDeque<TransportResult<String>>>,
    submit_default: Mutex<TransportResult<String>>,
    submit_delay: Mutex<Duration>,
    simulate_result: Mutex<TransportResult<SimulationOutcome>>,
    status_queue: Mutex<VecDeque<TransportResult<Option<SignatureStatus>>>>,
    status_result: Mutex<TransportResult<Option<SignatureStatus>>>,
    status_delay: Mutex<Duration>,
    probe_result: Mutex<TransportResult<u64>>,
    fail_open: Mutex<bool>,

    pub submits: AtomicU32,
    pub simulations: AtomicU32,
    pub status_queries: AtomicU32,
    pub freshness_fetches: AtomicU32,
    pub probes: AtomicU32,
    pub opens: AtomicU32,
    pub closes: AtomicU32,
}

impl MockNode {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            submit_queue: Mutex::new(VecDeque::new()),
            submit_default: Mutex::new(Ok(format!("sig-{}", name))),
            submit_delay: Mutex::new(Duration::ZERO),
            simulate_result: Mutex::new(Ok(SimulationOutcome::default())),
            status_queue: Mutex::new(VecDeque::new()),
            status_result: Mutex::new(Ok(None)),
            status_delay: Mutex::new(Duration::ZERO),
            probe_result: Mutex::new(Ok(1)),
            fail_open: Mutex::new(false),
            submits: AtomicU32::new(0),
            simulations: AtomicU32::new(0),
            status_queries: AtomicU32::new(0),
            freshness_fetches: AtomicU32::new(0),
            probes: AtomicU32::new(0),
            opens: AtomicU32::new(0),
            closes: AtomicU32::new(0),
        })
    }

    pub fn queue_submit(&self, result: TransportResult<String>) {
        self.submit_queue.lock().unwrap().push_back(result);
    }

    pub fn set_submit(&self, result: TransportResult<String>) {
        *self.submit_default.lock().unwrap() = result;
    }

    pub fn set_submit_delay(&self, delay: Duration) {
        *self.submit_delay.lock().unwrap() = delay;
    }

    pub fn queue_status(&self, result: TransportResult<Option<SignatureStatus>>) {
        self.status_queue.lock().unwrap().push_back(result);
    }

    pub fn set_simulation(&self, result: TransportResult<SimulationOutcome>) {
        *self.simulate_result.lock().unwrap() = result;
    }

    pub fn set_status(&self, result: TransportResult<Option<SignatureStatus>>) {
        *self.status_result.lock().unwrap() = result;
    }

    pub fn set_status_delay(&self, delay: Duration) {
        *self.status_delay.lock().unwrap() = delay;
    }

    pub fn set_probe(&self, result: TransportResult<u64>) {
        *self.probe_result.lock().unwrap() = result;
    }

    pub fn set_fail_open(&self, fail: bool) {
        *self.fail_open.lock().unwrap() = fail;
    }

    pub fn count(counter: &AtomicU32) -> u32 {
        counter.load(Ordering::SeqCst)
    }
}

pub struct MockTransport {
    url: Url,
    node: Arc<MockNode>,
}

#[async_trait]
impl RpcTransport for MockTransport {
    fn url(&self) -> &Url {
        &self.url
    }

    async fn submit(&self, _tx: &[u8]) -> TransportResult<String> {
        self.node.submits.fetch_add(1, Ordering::SeqCst);
        let delay = *self.node.submit_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let queued = self.node.submit_queue.lock().unwrap().pop_front();
        match queued {
            Some(result) => result,
            None => self.node.submit_default.lock().unwrap().clone(),
        }
    }

    async fn simulate(&self, _tx: &[u8]) -> TransportResult<SimulationOutcome> {
        self.node.simulations.fetch_add(1, Ordering::SeqCst);
        self.node.simulate_result.lock().unwrap().clone()
    }

    async fn get_status(&self, _signature: &str) -> TransportResult<Option<SignatureStatus>> {
        self.node.status_queries.fetch_add(1, Ordering::SeqCst);
        let delay = *self.node.status_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let queued = self.node.status_queue.lock().unwrap().pop_front();
        match queued {
            Some(result) => result,
            None => self.node.status_result.lock().unwrap().clone(),
        }
    }

    async fn get_freshness_token(&self) -> TransportResult<FreshnessToken> {
        let n = self.node.freshness_fetches.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(FreshnessToken {
            token: format!("{}-hash-{}", self.node.name, n),
            expiry_marker: 100 + u64::from(n),
        })
    }

    async fn probe(&self) -> TransportResult<u64> {
        self.node.probes.fetch_add(1, Ordering::SeqCst);
        self.node.probe_result.lock().unwrap().clone()
    }

    async fn close(&self) {
        self.node.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Factory over a fixed set of mock nodes, keyed by URL.
pub struct MockFactory {
    nodes: HashMap<String, Arc<MockNode>>,
}

#[async_trait]
impl TransportFactory for MockFactory {
    async fn open(&self, url: &Url) -> TransportResult<Arc<dyn RpcTransport>> {
        let Some(node) = self.nodes.get(url.as_str()) else {
            return Err(err(TransportErrorKind::Dns, "unknown mock endpoint"));
        };
        node.opens.fetch_add(1, Ordering::SeqCst);
        if *node.fail_open.lock().unwrap() {
            return Err(err(TransportErrorKind::ConnectionRefused, "connection refused"));
        }
        Ok(Arc::new(MockTransport {
            url: url.clone(),
            node: node.clone(),
        }))
    }
}

/// A set of mock endpoints plus a fast configuration pointing at them.
pub struct MockCluster {
    pub nodes: Vec<Arc<MockNode>>,
    pub factory: Arc<MockFactory>,
    pub config: RelayConfig,
}

impl MockCluster {
    pub fn new(count: usize) -> Self {
        let mut nodes = Vec::with_capacity(count);
        let mut by_url = HashMap::new();
        let mut endpoints = Vec::with_capacity(count);

        for i in 0..count {
            let name = format!("node{}", i);
            let url = Url::parse(&format!("http://{}.test/", name)).unwrap();
            let node = MockNode::new(&name);
            by_url.insert(url.as_str().to_string(), node.clone());
            endpoints.push(url.to_string());
            nodes.push(node);
        }

        Self {
            nodes,
            factory: Arc::new(MockFactory { nodes: by_url }),
            config: fast_config(endpoints),
        }
    }

    pub fn url(&self, index: usize) -> String {
        self.config.endpoints[index].clone()
    }
}

/// Configuration with short delays so tests finish quickly.
pub fn fast_config(endpoints: Vec<String>) -> RelayConfig {
    let mut config = RelayConfig {
        endpoints,
        ..RelayConfig::default()
    };
    config.retries.max_retries = 5;
    config.retries.base_delay_ms = 10;
    config.retries.max_delay_ms = 50;
    config.timeouts.request_ms = 1_000;
    config.health_check.interval_ms = 0;
    config.health_check.timeout_ms = 200;
    config.delivery.timeout_secs = 5;
    config.delivery.retry_interval_ms = 50;
    config.delivery.confirmation_nodes = 3;
    config
}

/// Start a JSON-RPC backend whose reply is computed per request body.
///
/// `f` receives the raw request body and returns an HTTP status and body.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let Some(body) = read_request_body(&mut socket).await else {
                            return;
                        };
                        let (status, body) = f(body).await;
                        let status_text = match status {
                            200 => "200 OK",
                            400 => "400 Bad Request",
                            404 => "404 Not Found",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

async fn read_request_body(socket: &mut tokio::net::TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);

        let Some(header_end) = find_header_end(&buf) else {
            continue;
        };
        let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
        let length = headers
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);

        let body_start = header_end + 4;
        if buf.len() >= body_start + length {
            return Some(String::from_utf8_lossy(&buf[body_start..body_start + length]).into_owned());
        }
    }
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

/// JSON-RPC success envelope.
pub fn rpc_result(result: serde_json::Value) -> String {
    serde_json::json!({ "jsonrpc": "2.0", "id": 1, "result": result }).to_string()
}

/// JSON-RPC error envelope.
pub fn rpc_error(code: i64, message: &str) -> String {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": 1,
        "error": { "code": code, "message": message }
    })
    .to_string()
}
