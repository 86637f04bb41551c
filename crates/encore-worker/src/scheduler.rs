//! Periodic scheduler feeding a worker pool.

use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::pool::{Job, Pool};

/// Fetches up to `limit` jobs. Called once per poll with the pool's free
/// capacity as the limit.
pub type FetchFn = Arc<
    dyn Fn(CancellationToken, usize) -> BoxFuture<'static, anyhow::Result<Vec<Job>>> + Send + Sync,
>;

/// Polls for work at a fixed interval and submits it to a [`Pool`].
///
/// The scheduler never retries on its own: a fetch error is logged and the
/// next tick tries again, and anything stronger (claim recovery, terminal
/// states) belongs to the pipeline behind the fetch function.
pub struct Scheduler {
    name: String,
    pool: Arc<Pool>,
    fetch: FetchFn,
    interval: Duration,
}

impl Scheduler {
    pub fn new(name: impl Into<String>, pool: Arc<Pool>, fetch: FetchFn, interval: Duration) -> Self {
        Self {
            name: name.into(),
            pool,
            fetch,
            interval,
        }
    }

    /// Poll once immediately, then on every interval tick until cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            scheduler = %self.name,
            interval_secs = self.interval.as_secs(),
            "Scheduler starting"
        );

        self.poll(&cancel).await;

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // the interval's first tick completes immediately; we already polled
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!(scheduler = %self.name, "Scheduler stopping");
                    return;
                }
                _ = ticker.tick() => self.poll(&cancel).await,
            }
        }
    }

    async fn poll(&self, cancel: &CancellationToken) {
        let available = self.pool.available();
        if available == 0 {
            tracing::debug!(scheduler = %self.name, "No pool capacity, skipping poll");
            return;
        }

        let jobs = match (self.fetch)(cancel.clone(), available).await {
            Ok(jobs) => jobs,
            Err(e) => {
                tracing::error!(scheduler = %self.name, error = %e, "Fetch failed");
                return;
            }
        };

        let count = jobs.len();
        for job in jobs {
            if !self.pool.submit(cancel, job).await {
                tracing::info!(
                    scheduler = %self.name,
                    "Cancelled while submitting, stopping"
                );
                return;
            }
        }

        if count > 0 {
            tracing::info!(scheduler = %self.name, submitted = count, "Submitted jobs");
        }
    }
}
