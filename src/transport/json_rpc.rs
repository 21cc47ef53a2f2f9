//! JSON-RPC transport over HTTP.
//!
//! # Responsibilities
//! - Encode calls as JSON-RPC 2.0 envelopes
//! - Map HTTP and JSON-RPC failures onto `TransportErrorKind`
//! - Never retry internally; the invoker owns retry policy

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use url::Url;

use crate::config::Commitment;
use crate::transport::{
    FreshnessToken, RpcTransport, SignatureStatus, SimulationOutcome, TransportError,
    TransportErrorKind, TransportFactory, TransportResult,
};

/// JSON-RPC error code for a rejected send/simulate request.
const SEND_TRANSACTION_PREFLIGHT_FAILURE: i64 = -32002;

/// JSON-RPC transport bound to a single endpoint.
#[derive(Debug)]
pub struct JsonRpcTransport {
    client: reqwest::Client,
    url: Url,
    commitment: Commitment,
    next_id: AtomicU64,
}

impl JsonRpcTransport {
    /// Create a transport with its own connection pool.
    pub fn new(url: Url, commitment: Commitment) -> TransportResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("tx-relay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::opaque(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url,
            commitment,
            next_id: AtomicU64::new(1),
        })
    }

    async fn call<R: DeserializeOwned>(&self, method: &str, params: Value) -> TransportResult<R> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(self.url.clone())
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(TransportError::new(
                TransportErrorKind::RateLimited,
                format!("429 too many requests from {}", self.url),
            ));
        }
        if status.is_server_error() {
            return Err(TransportError::new(
                TransportErrorKind::Server(status.as_u16()),
                format!("{} returned {}", self.url, status),
            ));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(TransportError::new(
                TransportErrorKind::Server(status.as_u16()),
                format!("HTTP {}: {}", status, text),
            ));
        }

        let envelope: JsonRpcResponse<R> = response.json().await.map_err(map_reqwest_error)?;
        if let Some(error) = envelope.error {
            return Err(map_rpc_error(error));
        }
        envelope.result.ok_or_else(|| {
            TransportError::new(
                TransportErrorKind::Decode,
                format!("{} response carried neither result nor error", method),
            )
        })
    }
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<R> {
    result: Option<R>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SimulateValue {
    err: Option<Value>,
    logs: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusValue {
    confirmation_status: Option<Commitment>,
    err: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockhashValue {
    blockhash: String,
    last_valid_block_height: u64,
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    let message = e.to_string();
    let kind = if e.is_timeout() {
        TransportErrorKind::Timeout
    } else if e.is_connect() {
        let detail = format!("{:?}", e).to_lowercase();
        if detail.contains("dns") {
            TransportErrorKind::Dns
        } else if detail.contains("reset") {
            TransportErrorKind::ConnectionReset
        } else {
            TransportErrorKind::ConnectionRefused
        }
    } else if e.is_decode() {
        TransportErrorKind::Decode
    } else if e.is_request() || e.is_body() {
        TransportErrorKind::Network
    } else {
        TransportErrorKind::Opaque
    };
    TransportError::new(kind, message)
}

fn map_rpc_error(error: JsonRpcError) -> TransportError {
    let lower = error.message.to_lowercase();
    let kind = if lower.contains("blockhash not found") || lower.contains("block height exceeded") {
        TransportErrorKind::FreshnessExpired
    } else {
        TransportErrorKind::Rpc(error.code)
    };
    TransportError::new(kind, format!("RPC error {}: {}", error.code, error.message))
}

#[async_trait]
impl RpcTransport for JsonRpcTransport {
    fn url(&self) -> &Url {
        &self.url
    }

    async fn submit(&self, tx: &[u8]) -> TransportResult<String> {
        let encoded = BASE64_STANDARD.encode(tx);
        self.call(
            "sendTransaction",
            json!([encoded, {
                "encoding": "base64",
                "skipPreflight": true,
                "maxRetries": 0,
            }]),
        )
        .await
    }

    async fn simulate(&self, tx: &[u8]) -> TransportResult<SimulationOutcome> {
        let encoded = BASE64_STANDARD.encode(tx);
        let result: TransportResult<WithContext<SimulateValue>> = self
            .call(
                "simulateTransaction",
                json!([encoded, {
                    "encoding": "base64",
                    "sigVerify": false,
                    "commitment": self.commitment.as_str(),
                }]),
            )
            .await;

        match result {
            Ok(response) => Ok(SimulationOutcome {
                error: response.value.err.map(|e| e.to_string()),
                logs: response.value.logs.unwrap_or_default(),
            }),
            // A node that runs preflight may reject the dry-run itself.
            Err(e) if e.kind == TransportErrorKind::Rpc(SEND_TRANSACTION_PREFLIGHT_FAILURE) => {
                Ok(SimulationOutcome {
                    error: Some(e.message),
                    logs: Vec::new(),
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn get_status(&self, signature: &str) -> TransportResult<Option<SignatureStatus>> {
        let response: WithContext<Vec<Option<StatusValue>>> = self
            .call(
                "getSignatureStatuses",
                json!([[signature], { "searchTransactionHistory": false }]),
            )
            .await?;

        Ok(response.value.into_iter().next().flatten().map(|status| SignatureStatus {
            commitment: status.confirmation_status,
            err: status.err.map(|e| e.to_string()),
        }))
    }

    async fn get_freshness_token(&self) -> TransportResult<FreshnessToken> {
        let response: WithContext<BlockhashValue> = self
            .call(
                "getLatestBlockhash",
                json!([{ "commitment": self.commitment.as_str() }]),
            )
            .await?;

        Ok(FreshnessToken {
            token: response.value.blockhash,
            expiry_marker: response.value.last_valid_block_height,
        })
    }

    async fn probe(&self) -> TransportResult<u64> {
        self.call("getSlot", json!([])).await
    }

    async fn close(&self) {
        tracing::debug!(endpoint = %self.url, "Closing JSON-RPC transport");
    }
}

/// Factory producing a fresh `JsonRpcTransport` (and connection pool) per open.
#[derive(Debug, Clone, Default)]
pub struct JsonRpcFactory {
    commitment: Commitment,
}

impl JsonRpcFactory {
    pub fn new(commitment: Commitment) -> Self {
        Self { commitment }
    }
}

#[async_trait]
impl TransportFactory for JsonRpcFactory {
    async fn open(&self, url: &Url) -> TransportResult<Arc<dyn RpcTransport>> {
        let transport = JsonRpcTransport::new(url.clone(), self.commitment)?;
        Ok(Arc::new(transport))
    }
}
