//! Claim-retry ladder, grounded on `start_ingester`'s retry loop in
//! `main.py` of `examples/original_source`: up to `max_retries` attempts,
//! starting at 30s and multiplying by 1.5 per attempt, capped at 300s.

use std::time::Duration;

use tracing::{info, warn};

use chomp_common::Ingester;

use crate::bootstrap::WorkerServices;

const INITIAL_RETRY_DELAY: Duration = Duration::from_secs(30);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(300);

pub async fn claim_with_backoff(
    services: &WorkerServices,
    ingesters: Vec<Ingester>,
    max_retries: u32,
) -> anyhow::Result<Vec<Ingester>> {
    let mut retry_delay = INITIAL_RETRY_DELAY;

    for attempt in 0..max_retries.max(1) {
        let mut unclaimed = Vec::new();
        for ingester in &ingesters {
            let claimed = services
                .claim
                .is_task_claimed(&ingester.name, ingester.interval, true)
                .await
                .unwrap_or(false);
            if !claimed {
                unclaimed.push(ingester);
            }
        }
        if unclaimed.is_empty() {
            warn!("all tasks are currently claimed by other workers");
        }

        let mut successfully_claimed = Vec::new();
        for ingester in unclaimed {
            match services.claim.ensure_claim_task(&ingester.name, ingester.interval, None).await {
                Ok(true) => successfully_claimed.push(ingester.clone()),
                Ok(false) => warn!(ingester = %ingester.name, "failed to claim task"),
                Err(e) => warn!(ingester = %ingester.name, error = %e, "error claiming task"),
            }
        }

        if !successfully_claimed.is_empty() {
            info!(claimed = successfully_claimed.len(), total = ingesters.len(), "claimed tasks");
            return Ok(successfully_claimed);
        }

        if attempt + 1 < max_retries {
            warn!(attempt = attempt + 1, max_retries, delay_secs = retry_delay.as_secs(), "no tasks claimed, retrying");
            tokio::time::sleep(retry_delay).await;
            retry_delay = std::cmp::min(retry_delay.mul_f64(1.5), MAX_RETRY_DELAY);
        }
    }

    warn!("no tasks available after all retry attempts");
    Ok(Vec::new())
}
