use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("wire codec error: {0}")]
    Wire(#[from] chomp_common::wire::WireError),
}
