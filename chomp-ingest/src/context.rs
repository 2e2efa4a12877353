use std::sync::Arc;
use std::time::Duration;

use chomp_cache::CacheBus;
use chomp_storage::StorageAdapter;
use chomp_transform::TransformerCompiler;
use reqwest::Client;

/// Shared dependencies every ingester type needs, assembled once at worker
/// bootstrap and handed down to each epoch run (spec.md Design Notes:
/// "pass an explicit context struct, no globals").
#[derive(Clone)]
pub struct IngestContext {
    pub http: Client,
    pub cache: CacheBus,
    pub compiler: Arc<TransformerCompiler>,
    pub storage: Arc<dyn StorageAdapter>,
    pub proc_id: String,
}

impl IngestContext {
    pub fn new(
        cache: CacheBus,
        compiler: Arc<TransformerCompiler>,
        storage: Arc<dyn StorageAdapter>,
        proc_id: impl Into<String>,
    ) -> Self {
        let http = Client::builder()
            .pool_max_idle_per_host(512)
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client configuration is always valid");
        IngestContext {
            http,
            cache,
            compiler,
            storage,
            proc_id: proc_id.into(),
        }
    }
}
