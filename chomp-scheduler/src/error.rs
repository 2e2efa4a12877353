use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("duplicate job id: {0}")]
    DuplicateJob(String),

    #[error("no runner registered for ingester type {0:?}")]
    NoRunner(chomp_common::IngesterType),

    #[error("cache error: {0}")]
    Cache(#[from] chomp_cache::CacheError),

    #[error("ingest error: {0}")]
    Ingest(#[from] chomp_ingest::IngestError),
}
