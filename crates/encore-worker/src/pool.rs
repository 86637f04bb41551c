//! Bounded worker pool over an in-process job channel.

use futures::future::BoxFuture;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// The future a job resolves to.
pub type JobFuture = BoxFuture<'static, anyhow::Result<()>>;

/// A unit of work. The job receives the pool's cancellation token;
/// long-running work must honour it.
pub type Job = Box<dyn FnOnce(CancellationToken) -> JobFuture + Send>;

/// Where job errors go. The default sink logs them.
pub type ErrorSink = std::sync::Arc<dyn Fn(&anyhow::Error) + Send + Sync>;

/// A fixed set of workers consuming a shared bounded job channel.
///
/// The channel buffer (`queue_size`) is the back-pressure surface:
/// [`Pool::available`] reports its free capacity and the scheduler uses
/// that as a credit when fetching work.
pub struct Pool {
    name: String,
    concurrency: usize,
    tx: mpsc::Sender<Job>,
    rx: Mutex<Option<mpsc::Receiver<Job>>>,
    on_error: Option<ErrorSink>,
}

impl Pool {
    pub fn new(name: impl Into<String>, concurrency: usize, queue_size: usize) -> Self {
        let (tx, rx) = mpsc::channel(queue_size.max(1));
        Self {
            name: name.into(),
            concurrency: concurrency.max(1),
            tx,
            rx: Mutex::new(Some(rx)),
            on_error: None,
        }
    }

    /// Replace the default log-only error sink.
    pub fn with_error_sink(mut self, sink: ErrorSink) -> Self {
        self.on_error = Some(sink);
        self
    }

    /// Spawn the workers and block until cancellation has drained them all.
    ///
    /// Call once; a second call returns immediately. Workers exit between
    /// jobs when the token fires; an in-flight job keeps running until it
    /// observes the token itself.
    pub async fn run(&self, cancel: CancellationToken) {
        let rx = match self.rx.lock().expect("pool receiver lock poisoned").take() {
            Some(rx) => rx,
            None => {
                tracing::warn!(pool = %self.name, "Pool::run called twice, ignoring");
                return;
            }
        };

        tracing::info!(
            pool = %self.name,
            concurrency = self.concurrency,
            "Worker pool starting"
        );

        let rx = std::sync::Arc::new(tokio::sync::Mutex::new(rx));
        let mut workers = JoinSet::new();
        for worker_id in 0..self.concurrency {
            let rx = rx.clone();
            let cancel = cancel.clone();
            let name = self.name.clone();
            let on_error = self.on_error.clone();
            workers.spawn(async move {
                worker_loop(name, worker_id, rx, cancel, on_error).await;
            });
        }

        while workers.join_next().await.is_some() {}
        tracing::info!(pool = %self.name, "All workers stopped");
    }

    /// Offer a job to the channel. Returns false if the token fires before
    /// space opens up (cancellation wins over a ready channel).
    pub async fn submit(&self, cancel: &CancellationToken, job: Job) -> bool {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(pool = %self.name, "Submit refused: cancelled");
                false
            }
            result = self.tx.send(job) => match result {
                Ok(()) => true,
                Err(_) => {
                    tracing::warn!(pool = %self.name, "Submit failed: channel closed");
                    false
                }
            }
        }
    }

    /// Remaining channel capacity, used by the scheduler as a credit hint.
    pub fn available(&self) -> usize {
        self.tx.capacity()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

async fn worker_loop(
    pool_name: String,
    worker_id: usize,
    rx: std::sync::Arc<tokio::sync::Mutex<mpsc::Receiver<Job>>>,
    cancel: CancellationToken,
    on_error: Option<ErrorSink>,
) {
    loop {
        let job = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(pool = %pool_name, worker_id, "Worker stopping");
                return;
            }
            job = async {
                let mut rx = rx.lock().await;
                rx.recv().await
            } => job,
        };

        match job {
            Some(job) => {
                if let Err(e) = job(cancel.clone()).await {
                    match &on_error {
                        Some(sink) => sink(&e),
                        None => {
                            tracing::error!(pool = %pool_name, worker_id, error = %e, "Job failed")
                        }
                    }
                }
            }
            // channel closed: all senders dropped
            None => return,
        }
    }
}
