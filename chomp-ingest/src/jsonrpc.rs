//! Minimal JSON-RPC 2.0 client, grounded on `src/adapters/jsonrpc.py` in
//! `examples/original_source`. Shared by the evm/svm/sui callers, which
//! differ only in how they build `params` and decode `result`.

use serde_json::{json, Value};

use crate::error::IngestError;

pub struct JsonRpcClient {
    endpoint: String,
    http: reqwest::Client,
    version: String,
}

impl JsonRpcClient {
    pub fn new(endpoint: impl Into<String>, http: reqwest::Client) -> Self {
        JsonRpcClient {
            endpoint: endpoint.into(),
            http,
            version: "2.0".to_string(),
        }
    }

    pub async fn call(&self, method: &str, params: Value, request_id: i64) -> Result<Value, IngestError> {
        let payload = json!({
            "jsonrpc": self.version,
            "method": method,
            "params": params,
            "id": request_id,
        });
        let resp = self
            .http
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        let body: Value = resp.json().await?;
        if let Some(err) = body.get("error") {
            let code = err.get("code").and_then(Value::as_i64).unwrap_or(-1);
            let message = err
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown json-rpc error")
                .to_string();
            return Err(IngestError::JsonRpc { code, message });
        }
        Ok(body.get("result").cloned().unwrap_or(Value::Null))
    }

    pub async fn ping(&self, health_method: &str) -> bool {
        self.call(health_method, json!([]), 0).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_stores_endpoint() {
        let c = JsonRpcClient::new("http://localhost:8899", reqwest::Client::new());
        assert_eq!(c.endpoint, "http://localhost:8899");
    }
}
