//! Parallel cache warming.
//!
//! Every computation in a plan runs as its own tokio task, at most
//! `concurrency` at a time. Tasks share nothing but the cache store, so a
//! failing task is logged and counted without affecting the others. Running
//! the same plan twice makes no remote calls the second time.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use statistics::{Computation, StatisticContext};

/// Default number of concurrent warming tasks.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Outcome of warming one computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarmResult {
    /// Computed remotely and stored.
    Computed,
    /// Already in the cache; nothing to do.
    AlreadyCached,
    /// Failed with the given error kind and message.
    Failed { kind: &'static str, message: String },
}

/// Totals for one warming run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WarmSummary {
    pub total: usize,
    pub computed: usize,
    pub already_cached: usize,
    pub failed: usize,
    pub duration: Duration,
}

impl WarmSummary {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    fn record(&mut self, result: &WarmResult) {
        match result {
            WarmResult::Computed => self.computed += 1,
            WarmResult::AlreadyCached => self.already_cached += 1,
            WarmResult::Failed { .. } => self.failed += 1,
        }
    }

    fn completed(&self) -> usize {
        self.computed + self.already_cached + self.failed
    }
}

/// Warms the cache for a list of computations.
pub struct CacheWarmer {
    ctx: StatisticContext,
    concurrency: usize,
}

impl CacheWarmer {
    pub fn new(ctx: StatisticContext, concurrency: usize) -> Self {
        Self {
            ctx,
            concurrency: concurrency.max(1),
        }
    }

    /// Warm every computation and report the totals.
    pub async fn warm(&self, computations: Vec<Computation>) -> WarmSummary {
        let total = computations.len();
        info!(total = total, concurrency = self.concurrency, "Starting cache warming");

        let start = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = Vec::with_capacity(total);

        for computation in computations {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    warn!(error = %e, "Warming semaphore closed");
                    break;
                }
            };
            let ctx = self.ctx.clone();

            handles.push(tokio::spawn(async move {
                let result = warm_single(&ctx, &computation).await;
                drop(permit);
                result
            }));
        }

        let mut summary = WarmSummary {
            total,
            ..Default::default()
        };
        // tasks that never started count as failures
        summary.failed += total - handles.len();

        for handle in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    warn!(error = %e, "Warming task panicked");
                    WarmResult::Failed {
                        kind: "panic",
                        message: e.to_string(),
                    }
                }
            };
            summary.record(&result);

            let completed = summary.completed();
            if completed % 100 == 0 {
                info!(
                    progress = format!("{}/{}", completed, total),
                    computed = summary.computed,
                    cached = summary.already_cached,
                    failed = summary.failed,
                    "Warming progress"
                );
            }
        }

        summary.duration = start.elapsed();
        info!(
            duration_secs = summary.duration.as_secs(),
            total = summary.total,
            computed = summary.computed,
            already_cached = summary.already_cached,
            failed = summary.failed,
            "Cache warming complete"
        );

        summary
    }
}

/// Compute one entry unless it is already cached.
async fn warm_single(ctx: &StatisticContext, computation: &Computation) -> WarmResult {
    match ctx.is_cached(computation).await {
        Ok(true) => {
            debug!(computation = %computation, "Already cached");
            return WarmResult::AlreadyCached;
        }
        Ok(false) => {}
        Err(e) => warn!(computation = %computation, error = %e, "Cache probe failed, computing anyway"),
    }

    match ctx.compute(computation).await {
        Ok(_) => WarmResult::Computed,
        Err(e) => {
            warn!(
                computation = %computation,
                kind = e.kind(),
                transient = e.is_transient(),
                error = %e,
                "Warming failed"
            );
            WarmResult::Failed {
                kind: e.kind(),
                message: e.to_string(),
            }
        }
    }
}
