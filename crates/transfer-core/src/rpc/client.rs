use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::{Result, TransferError};

// ---------------------------------------------------------------------------
// JSON-RPC 2.0 envelope types (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct RpcRequest<'a, P> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: P,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// A JSON-RPC 2.0 client over HTTP.
///
/// No retries: a failed call surfaces immediately and the caller decides.
#[derive(Debug)]
pub struct JsonRpcClient {
    http: reqwest::Client,
    url: Url,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let url = Url::parse(url)
            .map_err(|e| TransferError::Config(format!("invalid RPC URL {url}: {e}")))?;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransferError::Config(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            url,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Call `method` and decode its `result`. A JSON-RPC error object is
    /// returned as [`TransferError::Rpc`] with the server's message intact.
    pub async fn call<P, R>(&self, method: &str, params: P) -> Result<R>
    where
        P: Serialize + Send,
        R: DeserializeOwned,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };

        debug!(method, id, url = %self.url, "rpc call");

        let resp = self.http.post(self.url.clone()).json(&body).send().await?;

        if !resp.status().is_success() {
            return Err(TransferError::HttpStatus {
                status: resp.status().as_u16(),
                url: self.url.to_string(),
            });
        }

        let envelope: RpcResponse = resp.json().await?;
        decode_response(method, envelope)
    }
}

fn decode_response<R: DeserializeOwned>(method: &str, envelope: RpcResponse) -> Result<R> {
    if let Some(error) = envelope.error {
        debug!(method, code = error.code, message = %error.message, "rpc error");
        return Err(TransferError::Rpc {
            method: method.to_string(),
            code: Some(error.code),
            message: error.message,
        });
    }

    let result = envelope.result.unwrap_or(Value::Null);
    serde_json::from_value(result)
        .map_err(|e| TransferError::Codec(format!("{method}: unexpected result shape: {e}")))
}
