use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("cache error: {0}")]
    Cache(#[from] chomp_cache::CacheError),

    #[error("storage error: {0}")]
    Storage(#[from] chomp_storage::StorageError),

    #[error("transform error: {0}")]
    Transform(#[from] chomp_transform::TransformError),

    #[error("jsonrpc error {code}: {message}")]
    JsonRpc { code: i64, message: String },

    #[error("abi error: {0}")]
    Abi(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}
