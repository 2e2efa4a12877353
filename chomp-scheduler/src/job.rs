//! A single scheduled unit: one ingester paired with the runner that knows
//! how to execute its epochs (spec.md §4.6), grounded on the
//! `(fn, args)` tuple `Scheduler.job_by_id` holds in `src/actions/schedule.py`
//! of `examples/original_source`.

use std::sync::Arc;

use tokio::sync::Mutex;

use chomp_cache::ClaimService;
use chomp_common::Ingester;
use chomp_ingest::{IngestContext, IngesterRunner};

use crate::error::SchedulerError;

pub struct Job {
    pub id: String,
    pub ingester: Mutex<Ingester>,
    pub runner: Arc<dyn IngesterRunner>,
}

impl Job {
    pub fn new(ingester: Ingester, runner: Arc<dyn IngesterRunner>) -> Self {
        Job {
            id: ingester.id().to_string(),
            ingester: Mutex::new(ingester),
            runner,
        }
    }

    /// Claims the lease, runs one epoch, and frees the lease, mirroring
    /// `ensure_claim_task`-guarded `ingest()` calls in the source
    /// ingesters (spec.md §4.3 claim lifecycle).
    pub async fn run_epoch(&self, ctx: &IngestContext, claim: &ClaimService) -> Result<(), SchedulerError> {
        let mut ingester = self.ingester.lock().await;
        claim.ensure_claim_task(&ingester.name, ingester.interval, None).await?;
        let result = self.runner.run_epoch(ctx, &mut ingester).await;
        claim.free_task(&ingester.name, ingester.interval).await?;
        result.map_err(SchedulerError::from)
    }
}
