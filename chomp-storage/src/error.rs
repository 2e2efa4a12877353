use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sql error: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("unsupported adapter: {0}")]
    UnsupportedAdapter(String),

    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error("ingester '{0}' has resource_type=value and cannot be back-filled")]
    BackfillRejected(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}
