//! Worker dependency wiring, grounded on the `Services` struct pattern in
//! `cloud-service/src/bootstrap.rs`: one `new(config)` that builds every
//! shared service once and hands back a cheaply clonable handle.

use std::str::FromStr;
use std::sync::Arc;

use chomp_cache::{CacheBus, ClaimService, RegistryService};
use chomp_common::config::WorkerConfig;
use chomp_common::Instance;
use chomp_ingest::chain::{ChainRpcPool, EvmChainPools};
use chomp_ingest::IngestContext;
use chomp_storage::AdapterKind;
use chomp_transform::TransformerCompiler;

pub struct WorkerServices {
    pub cache: CacheBus,
    pub claim: ClaimService,
    pub registry: RegistryService,
    pub ctx: IngestContext,
    pub instance: Instance,
    /// One RPC pool per EVM chain id, keyed the way `evm_caller` targets
    /// are (spec.md §4.6.5).
    pub evm_pools: Arc<EvmChainPools>,
    pub svm_pool: Arc<ChainRpcPool>,
    pub sui_pool: Arc<ChainRpcPool>,
}

impl WorkerServices {
    pub async fn new(config: &WorkerConfig) -> anyhow::Result<Self> {
        let instance = Instance::new();
        let cache = CacheBus::connect(&config.cache.redis_url, config.cache.namespace.clone()).await?;
        let claim = ClaimService::new(cache.clone(), instance.tag());
        let registry = RegistryService::new(cache.clone());

        let kind = AdapterKind::from_str(&config.storage.adapter)?;
        let dsn = config
            .storage
            .dsn
            .clone()
            .ok_or_else(|| anyhow::anyhow!("storage.dsn is required for adapter {kind}"))?;
        let storage = chomp_storage::connect(kind, &dsn).await?;

        let compiler = Arc::new(TransformerCompiler::new());
        let ctx = IngestContext::new(cache.clone(), compiler, Arc::from(storage), instance.tag());

        let evm_pools = Arc::new(EvmChainPools::new(config.chains.evm.clone(), ctx.http.clone()));
        let svm_pool = Arc::new(ChainRpcPool::new(config.chains.svm.clone(), ctx.http.clone()));
        let sui_pool = Arc::new(ChainRpcPool::new(config.chains.sui.clone(), ctx.http.clone()));

        Ok(WorkerServices {
            cache,
            claim,
            registry,
            ctx,
            instance,
            evm_pools,
            svm_pool,
            sui_pool,
        })
    }
}
