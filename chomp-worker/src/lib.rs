pub mod bootstrap;
pub mod ingester_config;
pub mod retry;

pub use bootstrap::WorkerServices;

use std::sync::Arc;

use tracing::{info, warn};

use chomp_common::config::WorkerConfig;
use chomp_common::{Ingester, IngesterType};
use chomp_ingest::evm_caller::EvmCallerRunner;
use chomp_ingest::sui_caller::SuiCallerRunner;
use chomp_ingest::svm_caller::SvmCallerRunner;
use chomp_ingest::IngesterRunner;
use chomp_scheduler::Scheduler;

/// Runs the worker end to end: load ingesters, claim as many as this
/// process is allowed, then either run each once (`test_mode`) or hand
/// them to the scheduler for continuous ticking. Grounded on
/// `start_ingester` in `main.py` of `examples/original_source`.
pub async fn run_worker(config: WorkerConfig) -> anyhow::Result<()> {
    let services = WorkerServices::new(&config).await?;

    if !config.test_mode && !services.cache.ping().await {
        anyhow::bail!("failed to connect to redis, cannot proceed with task claiming");
    }

    let ingesters = ingester_config::load_ingesters(&config.ingesters_config)?;
    if ingesters.is_empty() {
        anyhow::bail!("no ingesters found in {}", config.ingesters_config.display());
    }
    info!(count = ingesters.len(), "loaded ingester configurations");
    log_ingester_summary(&ingesters);

    if !config.test_mode {
        for ingester in &ingesters {
            if let Err(e) = services.registry.register_ingester(ingester, chomp_common::Scope::DEFAULT).await {
                warn!(ingester = %ingester.name, error = %e, "failed to register ingester");
            }
        }
        if let Err(e) = services.registry.register_instance(&services.instance).await {
            warn!(error = %e, "failed to register instance");
        }
    }

    let claimed = retry::claim_with_backoff(&services, ingesters, config.max_claim_retries).await?;
    if claimed.is_empty() {
        warn!("no tasks available for this worker, exiting");
        return Ok(());
    }

    let mut scheduler = Scheduler::new(services.ctx.clone(), services.claim.clone(), config.threaded);
    for ingester in claimed {
        let runner: Arc<dyn IngesterRunner> = match ingester.ingester_type {
            IngesterType::EvmCaller => Arc::new(EvmCallerRunner { pools: services.evm_pools.clone() }),
            IngesterType::SvmCaller => Arc::new(SvmCallerRunner { pool: services.svm_pool.clone() }),
            IngesterType::SuiCaller => Arc::new(SuiCallerRunner { pool: services.sui_pool.clone() }),
            other => {
                let Some(runner) = chomp_ingest::runner_for(other) else {
                    warn!(ingester = %ingester.name, ingester_type = ?other, "no runner available, skipping");
                    continue;
                };
                runner
            }
        };
        scheduler.add_ingester(ingester, runner)?;
    }

    if config.test_mode {
        info!("TEST MODE: running a single epoch per ingester");
        for result in scheduler.run_once().await {
            if let Err(e) = result {
                warn!(error = %e, "test epoch failed");
            }
        }
        return Ok(());
    }

    let handles = Arc::new(scheduler).start();
    for handle in handles {
        let _ = handle.await;
    }
    Ok(())
}

pub(crate) fn log_ingester_summary(ingesters: &[Ingester]) {
    for ingester in ingesters {
        info!(
            name = %ingester.name,
            ingester_type = ?ingester.ingester_type,
            interval = %ingester.interval,
            fields = ingester.fields.len(),
            "configured ingester"
        );
    }
}
