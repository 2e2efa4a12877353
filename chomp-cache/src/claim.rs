//! Distributed task-claim leases (spec.md §4.3), grounded on
//! `claim_task`/`ensure_claim_task`/`is_task_claimed`/`free_task` in
//! `src/cache.py` of `examples/original_source`.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, error, warn};

use chomp_common::Interval;

use crate::bus::CacheBus;
use crate::error::CacheError;

/// Backoff schedule for `ensure_claim_task`, copied verbatim from the
/// source's retry ladder.
const BACKOFF_SCHEDULE_SECS: &[f64] = &[0.1, 0.3, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0];
const CLAIM_RETRY_TIMEOUT: Duration = Duration::from_secs(120);
/// Seconds of slack added to an interval-derived claim TTL, covering
/// long-running epochs (spec.md §4.3).
const CLAIM_OVERTIME_BUFFER_SECS: u64 = 8;

#[derive(Clone)]
pub struct ClaimService {
    bus: CacheBus,
    proc_id: String,
}

impl ClaimService {
    pub fn new(bus: CacheBus, proc_id: impl Into<String>) -> Self {
        ClaimService {
            bus,
            proc_id: proc_id.into(),
        }
    }

    /// Attempts to claim `ingester_name`/`interval` for the given TTL
    /// (defaulting to `interval.seconds() + 8`). Returns `false` if another
    /// worker already holds the lease.
    pub async fn claim_task(
        &self,
        ingester_name: &str,
        interval: Interval,
        until: Option<Duration>,
    ) -> Result<bool, CacheError> {
        let key = self.bus.claim_key(ingester_name, &interval.to_string());
        if self.is_task_claimed(ingester_name, interval, true).await? {
            return Ok(false);
        }
        let ttl = until.unwrap_or_else(|| {
            Duration::from_secs(interval.seconds() + CLAIM_OVERTIME_BUFFER_SECS)
        });
        debug!(ingester = ingester_name, %interval, "claiming task");
        self.bus.set_nx_ex(&key, &self.proc_id, ttl).await
    }

    /// Retries `claim_task` along an increasing backoff ladder for up to
    /// 120s, then force-claims under a `:force` suffixed key as a last
    /// resort (spec.md §4.3 "contended claim").
    pub async fn ensure_claim_task(
        &self,
        ingester_name: &str,
        interval: Interval,
        until: Option<Duration>,
    ) -> Result<bool, CacheError> {
        if self.claim_task(ingester_name, interval, until).await? {
            return Ok(true);
        }

        let deadline = tokio::time::Instant::now() + CLAIM_RETRY_TIMEOUT;
        let mut backoff_idx = 0usize;
        while tokio::time::Instant::now() < deadline {
            if self.claim_task(ingester_name, interval, until).await? {
                return Ok(true);
            }
            let backoff = BACKOFF_SCHEDULE_SECS[backoff_idx.min(BACKOFF_SCHEDULE_SECS.len() - 1)];
            sleep(Duration::from_secs_f64(backoff)).await;
            backoff_idx += 1;
        }

        warn!(
            ingester = ingester_name,
            %interval,
            "could not claim task after retry window, attempting force claim"
        );
        let force_key = format!("{}:force", self.bus.claim_key(ingester_name, &interval.to_string()));
        let ttl = until.unwrap_or_else(|| {
            Duration::from_secs(interval.seconds() + CLAIM_OVERTIME_BUFFER_SECS)
        });
        if self.bus.set_nx_ex(&force_key, &self.proc_id, ttl).await? {
            return Ok(true);
        }

        error!(ingester = ingester_name, %interval, "failed to claim task after force attempt");
        Ok(false)
    }

    pub async fn is_task_claimed(
        &self,
        ingester_name: &str,
        interval: Interval,
        exclude_self: bool,
    ) -> Result<bool, CacheError> {
        let key = self.bus.claim_key(ingester_name, &interval.to_string());
        match self.bus.get_string(&key).await? {
            Some(holder) => Ok(!exclude_self || holder != self.proc_id),
            None => Ok(false),
        }
    }

    pub async fn free_task(&self, ingester_name: &str, interval: Interval) -> Result<bool, CacheError> {
        let key = self.bus.claim_key(ingester_name, &interval.to_string());
        self.bus.delete(&key).await
    }
}
