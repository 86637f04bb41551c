//! Scheduler-driven pipeline orchestration.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use encore_core::config::ConcurrencyConfig;
use encore_core::models::{Pipeline, PipelineStatus, Video};
use encore_core::AppError;
use encore_db::VideoStore;
use encore_worker::{FetchFn, Job, Pool, Scheduler};

/// Business logic of one background pipeline.
///
/// A runner that succeeds has already written its own terminal state
/// (intermediate soft failures can still count as "done"); the queue only
/// writes `failed` when the runner errors out.
#[async_trait]
pub trait PipelineRunner: Send + Sync {
    fn pipeline(&self) -> Pipeline;

    async fn run(&self, cancel: CancellationToken, video: Video) -> Result<(), AppError>;
}

/// One background pipeline's claim loop: a scheduler polling the store for
/// queued rows and a pool of workers running the pipeline over them.
///
/// Every poll tick participates in stuck recovery before claiming, so a
/// crashed instance's rows are re-queued by whichever instance polls next.
pub struct PipelineQueue {
    pipeline: Pipeline,
    pool: Arc<Pool>,
    scheduler: Arc<Scheduler>,
}

impl PipelineQueue {
    pub fn new(
        store: Arc<dyn VideoStore>,
        runner: Arc<dyn PipelineRunner>,
        config: &ConcurrencyConfig,
    ) -> Self {
        let pipeline = runner.pipeline();
        let pool = Arc::new(Pool::new(
            format!("{}-processing", pipeline),
            config.concurrency,
            config.queue_size,
        ));

        let stuck_threshold = Duration::from_secs(config.stuck_threshold_mins * 60);
        let fetch = make_fetch(store, runner, stuck_threshold);

        let scheduler = Arc::new(Scheduler::new(
            pipeline.as_str(),
            pool.clone(),
            fetch,
            Duration::from_secs(config.interval_secs),
        ));

        Self {
            pipeline,
            pool,
            scheduler,
        }
    }

    /// Launch the pool and scheduler as background tasks. They stop when
    /// the token fires; in-flight jobs finish on their own.
    pub fn start(&self, cancel: CancellationToken) {
        let pool = self.pool.clone();
        let pool_cancel = cancel.clone();
        tokio::spawn(async move { pool.run(pool_cancel).await });

        let scheduler = self.scheduler.clone();
        tokio::spawn(async move { scheduler.run(cancel).await });

        tracing::info!(pipeline = %self.pipeline, "Pipeline queue started");
    }
}

/// Bridge Postgres to worker jobs: reset stuck rows, claim a batch, wrap
/// each claimed video in a job that runs the pipeline and marks `failed`
/// on error.
fn make_fetch(
    store: Arc<dyn VideoStore>,
    runner: Arc<dyn PipelineRunner>,
    stuck_threshold: Duration,
) -> FetchFn {
    Arc::new(move |_cancel, limit| {
        let store = store.clone();
        let runner = runner.clone();
        Box::pin(async move {
            let pipeline = runner.pipeline();

            if let Err(e) = store.reset_stuck(pipeline, stuck_threshold).await {
                tracing::error!(pipeline = %pipeline, error = %e, "Stuck reset failed");
            }

            let videos = store
                .claim_queued(pipeline, limit as i64)
                .await
                .map_err(anyhow::Error::new)?;

            let jobs = videos
                .into_iter()
                .map(|video| {
                    let store = store.clone();
                    let runner = runner.clone();
                    let job: Job = Box::new(move |cancel| {
                        Box::pin(async move {
                            let pipeline = runner.pipeline();
                            let video_id = video.id;
                            if let Err(e) = runner.run(cancel, video).await {
                                if let Err(mark_err) = store
                                    .set_pipeline_terminal(
                                        pipeline,
                                        video_id,
                                        PipelineStatus::Failed,
                                    )
                                    .await
                                {
                                    tracing::error!(
                                        video_id,
                                        error = %mark_err,
                                        "Failed to mark pipeline failed"
                                    );
                                }
                                return Err(anyhow::Error::new(e));
                            }
                            Ok(())
                        })
                    });
                    job
                })
                .collect();

            Ok(jobs)
        })
    })
}
