//! Shared API dependencies, assembled once at server bootstrap (same
//! pattern as `chomp_ingest::IngestContext`, grounded on
//! `cloud-service/src/bootstrap.rs`'s `Services`).

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde_json::Value as JsonValue;

use chomp_cache::CacheBus;
use chomp_storage::StorageAdapter;

/// Query-result cache TTL: short enough that `/last` never serves data
/// staler than a typical ingester interval, long enough to absorb bursts
/// (spec.md §5 "query caching").
const QUERY_CACHE_TTL: Duration = Duration::from_secs(5);
const QUERY_CACHE_CAPACITY: u64 = 10_000;

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn StorageAdapter>,
    pub cache: CacheBus,
    pub query_cache: Cache<String, JsonValue>,
}

impl AppState {
    pub fn new(storage: Arc<dyn StorageAdapter>, cache: CacheBus) -> Self {
        let query_cache = Cache::builder()
            .max_capacity(QUERY_CACHE_CAPACITY)
            .time_to_live(QUERY_CACHE_TTL)
            .build();
        AppState { storage, cache, query_cache }
    }
}
