//! Query API process wiring, mirroring `chomp_worker::WorkerServices`
//! (itself grounded on `cloud-service/src/bootstrap.rs`'s `Services`
//! pattern): build every shared dependency once at startup.

use std::str::FromStr;
use std::sync::Arc;

use chomp_cache::CacheBus;
use chomp_common::config::ServerConfig;
use chomp_storage::AdapterKind;

use crate::state::AppState;

pub struct ApiServices {
    pub state: AppState,
    pub rate_limit_per_minute: u32,
    pub bind: String,
}

impl ApiServices {
    pub async fn new(config: &ServerConfig) -> anyhow::Result<Self> {
        let cache = CacheBus::connect(&config.cache.redis_url, config.cache.namespace.clone()).await?;
        let kind = AdapterKind::from_str(&config.storage.adapter)?;
        let dsn = config
            .storage
            .dsn
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("storage.dsn is required for the query API"))?;
        let storage = chomp_storage::connect(kind, dsn).await?;
        let state = AppState::new(Arc::from(storage), cache);
        Ok(ApiServices {
            state,
            rate_limit_per_minute: config.rate_limit_per_minute,
            bind: config.bind.clone(),
        })
    }
}
