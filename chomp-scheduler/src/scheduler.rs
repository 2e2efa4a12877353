//! Interval-grouped cron scheduler, grounded on the `Scheduler` class in
//! `src/actions/schedule.py` of `examples/original_source`: jobs sharing
//! an interval tick together off one clock rather than each running its
//! own timer, so `m1` jobs fire on the same wall-clock second.
//!
//! The source drives ticks through `aiocron`'s crontab parser; this drives
//! them directly off [`chomp_common::Interval::next_boundary_after`] for
//! calendar units and a plain `tokio::time::interval` for fixed-duration
//! ones, avoiding a cron-string round trip for a cadence already held as
//! a typed value.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use chomp_cache::ClaimService;
use chomp_common::{Ingester, Interval};
use chomp_ingest::{IngestContext, IngesterRunner};

use crate::error::SchedulerError;
use crate::job::Job;

pub struct Scheduler {
    ctx: IngestContext,
    claim: ClaimService,
    jobs_by_interval: BTreeMap<Interval, Vec<Arc<Job>>>,
    seen_ids: std::collections::BTreeSet<String>,
    /// Mirrors the source's `threaded` flag: `false` runs a tick's jobs
    /// concurrently on one `join_all`, `true` spawns each as its own task
    /// so a slow job cannot delay its siblings' next tick.
    threaded: bool,
}

impl Scheduler {
    pub fn new(ctx: IngestContext, claim: ClaimService, threaded: bool) -> Self {
        Scheduler {
            ctx,
            claim,
            jobs_by_interval: BTreeMap::new(),
            seen_ids: std::collections::BTreeSet::new(),
            threaded,
        }
    }

    pub fn add_ingester(&mut self, ingester: Ingester, runner: Arc<dyn IngesterRunner>) -> Result<(), SchedulerError> {
        let id = ingester.id().to_string();
        if !self.seen_ids.insert(id.clone()) {
            return Err(SchedulerError::DuplicateJob(id));
        }
        let interval = ingester.interval;
        let job = Arc::new(Job::new(ingester, runner));
        self.jobs_by_interval.entry(interval).or_default().push(job);
        Ok(())
    }

    pub fn job_count(&self) -> usize {
        self.seen_ids.len()
    }

    /// Runs every interval group's jobs once, immediately, without
    /// scheduling future ticks. Used by worker `--test` mode (spec.md §8
    /// "single-shot verification run").
    pub async fn run_once(&self) -> Vec<Result<(), SchedulerError>> {
        let mut results = Vec::new();
        for jobs in self.jobs_by_interval.values() {
            results.extend(self.run_tick(jobs).await);
        }
        results
    }

    /// Starts one background tick loop per distinct interval and returns
    /// their join handles, matching `Scheduler.start`'s one-cron-per-interval
    /// topology in the source.
    pub fn start(self: Arc<Self>) -> Vec<JoinHandle<()>> {
        let intervals: Vec<Interval> = self.jobs_by_interval.keys().copied().collect();
        info!(jobs = self.job_count(), intervals = intervals.len(), "starting scheduler");
        intervals
            .into_iter()
            .map(|interval| {
                let scheduler = Arc::clone(&self);
                tokio::spawn(async move { scheduler.tick_loop(interval).await })
            })
            .collect()
    }

    async fn tick_loop(&self, interval: Interval) {
        loop {
            let now = chrono::Utc::now();
            let wait = if interval.is_fixed_duration() {
                interval.duration()
            } else {
                let next = interval.next_boundary_after(now);
                (next - now).to_std().unwrap_or(interval.duration())
            };
            tokio::time::sleep(wait).await;

            let Some(jobs) = self.jobs_by_interval.get(&interval) else {
                return;
            };
            let results = self.run_tick(jobs).await;
            for result in results {
                if let Err(e) = result {
                    error!(%interval, error = %e, "job failed");
                }
            }
        }
    }

    async fn run_tick(&self, jobs: &[Arc<Job>]) -> Vec<Result<(), SchedulerError>> {
        if self.threaded {
            let handles: Vec<_> = jobs
                .iter()
                .map(|job| {
                    let job = Arc::clone(job);
                    let ctx = self.ctx.clone();
                    let claim = self.claim.clone();
                    tokio::spawn(async move { job.run_epoch(&ctx, &claim).await })
                })
                .collect();
            let mut results = Vec::with_capacity(handles.len());
            for handle in handles {
                match handle.await {
                    Ok(result) => results.push(result),
                    Err(e) => {
                        warn!(error = %e, "job task panicked");
                        results.push(Err(SchedulerError::Ingest(chomp_ingest::IngestError::Other(
                            anyhow::anyhow!("job task panicked: {e}"),
                        ))));
                    }
                }
            }
            results
        } else {
            let futures = jobs.iter().map(|job| job.run_epoch(&self.ctx, &self.claim));
            futures_util::future::join_all(futures).await
        }
    }
}
