//! Work dispatch across concurrency strategies
//!
//! The [`Dispatcher`] runs a unit of [`Work`] according to a
//! [`ConcurrencyMode`] and hands the result to a completion callback:
//!
//! - [`Blocking`](ConcurrencyMode::Blocking) - awaited inline on the caller's
//!   task, which then waits for the completion to run before `run` returns
//! - [`BackgroundSingle`](ConcurrencyMode::BackgroundSingle) - one dedicated
//!   worker, first in first out
//! - [`BackgroundPool`](ConcurrencyMode::BackgroundPool) - a pool of
//!   `pool_workers` concurrent workers, no ordering
//! - [`PromiseChain`](ConcurrencyMode::PromiseChain) - a sequential chain
//!   worker; each submission starts after the previous one was delivered
//!
//! Completions always run on the [`PresentationContext`], never on the
//! worker or the caller's task.

mod chain;

pub use chain::{Chain, ChainHandle, ChainOutcome};

use crate::config::DispatchConfig;
use crate::error::{Error, Result};
use crate::presentation::PresentationContext;
use crate::types::ConcurrencyMode;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Semaphore, mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// A unit of work producing a `T`
pub type Work<T> = BoxFuture<'static, Result<T>>;

type Job = BoxFuture<'static, ()>;

/// Schedules work and delivers results to the presentation context
pub struct Dispatcher {
    presentation: PresentationContext,
    /// Queue feeding the dedicated background worker
    serial_tx: mpsc::UnboundedSender<Job>,
    /// Queue feeding the promise-chain worker
    chain_tx: mpsc::UnboundedSender<Job>,
    /// Bounds concurrently running pool work
    pool: Arc<Semaphore>,
    chain_stage_delay: Duration,
    tracker: TaskTracker,
    shutdown: CancellationToken,
    accepting: AtomicBool,
}

impl Dispatcher {
    /// Start the background workers on the current Tokio runtime
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `pool_workers` is below 2.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn new(config: &DispatchConfig, presentation: PresentationContext) -> Result<Self> {
        if config.pool_workers < 2 {
            return Err(Error::config(
                "pool_workers",
                format!(
                    "pool needs at least 2 workers, got {}",
                    config.pool_workers
                ),
            ));
        }

        let tracker = TaskTracker::new();
        let shutdown = CancellationToken::new();

        let (serial_tx, serial_rx) = mpsc::unbounded_channel();
        tracker.spawn(queue_worker("background", serial_rx, shutdown.clone()));

        let (chain_tx, chain_rx) = mpsc::unbounded_channel();
        tracker.spawn(queue_worker("chain", chain_rx, shutdown.clone()));

        tracing::debug!(pool_workers = config.pool_workers, "dispatcher started");

        Ok(Self {
            presentation,
            serial_tx,
            chain_tx,
            pool: Arc::new(Semaphore::new(config.pool_workers)),
            chain_stage_delay: config.chain_stage_delay,
            tracker,
            shutdown,
            accepting: AtomicBool::new(true),
        })
    }

    /// The context completions are delivered to
    pub fn presentation(&self) -> &PresentationContext {
        &self.presentation
    }

    /// Run `work` under `mode` and hand its result to `on_complete`
    ///
    /// `on_complete` always runs on the presentation context. In
    /// [`ConcurrencyMode::Blocking`] this awaits the work and the completion
    /// before returning. In every other mode it returns once the work is
    /// queued.
    /// [`ConcurrencyMode::PromiseChain`] submits a one-stage chain.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShuttingDown`] after [`shutdown`](Self::shutdown).
    pub async fn run<T, F>(&self, work: Work<T>, mode: ConcurrencyMode, on_complete: F) -> Result<()>
    where
        T: Send + 'static,
        F: FnOnce(Result<T>) + Send + 'static,
    {
        self.ensure_accepting()?;

        match mode {
            ConcurrencyMode::Blocking => {
                let result = work.await;
                if self
                    .presentation
                    .post_and_wait(move || on_complete(result))
                    .await
                    .is_none()
                {
                    tracing::warn!("presentation context gone, completion did not run");
                }
            }
            ConcurrencyMode::BackgroundSingle => {
                let presentation = self.presentation.clone();
                let job: Job = Box::pin(async move {
                    let result = work.await;
                    deliver(&presentation, move || on_complete(result));
                });
                self.serial_tx.send(job).map_err(|_| Error::ShuttingDown)?;
            }
            ConcurrencyMode::BackgroundPool => {
                let presentation = self.presentation.clone();
                let pool = self.pool.clone();
                self.tracker.spawn(async move {
                    let Ok(_permit) = pool.acquire_owned().await else {
                        return;
                    };
                    let result = work.await;
                    deliver(&presentation, move || on_complete(result));
                });
            }
            ConcurrencyMode::PromiseChain => {
                let mut on_complete = Some(on_complete);
                self.run_chain(
                    Chain::new().then(move || async move { Ok(work.await) }),
                    move |_, result| {
                        if let Some(on_complete) = on_complete.take() {
                            on_complete(result);
                        }
                        true
                    },
                    |_, _| {},
                )?;
            }
        }

        Ok(())
    }

    /// Queue `chain` on the chain worker
    ///
    /// Chains run one at a time in submission order. `on_stage` runs on the
    /// presentation context after every successful stage and returns whether
    /// to go on; `on_error` runs there once if a stage fails, and the
    /// remaining stages are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShuttingDown`] after [`shutdown`](Self::shutdown).
    pub fn run_chain<T, S, E>(&self, chain: Chain<T>, on_stage: S, on_error: E) -> Result<ChainHandle>
    where
        T: Send + 'static,
        S: FnMut(usize, T) -> bool + Send + 'static,
        E: FnOnce(usize, Error) + Send + 'static,
    {
        self.ensure_accepting()?;

        let (done_tx, done_rx) = oneshot::channel();
        let presentation = self.presentation.clone();
        let stage_delay = self.chain_stage_delay;
        let job: Job = Box::pin(async move {
            let outcome = chain
                .execute(&presentation, stage_delay, on_stage, on_error)
                .await;
            let _ = done_tx.send(outcome);
        });
        self.chain_tx.send(job).map_err(|_| Error::ShuttingDown)?;

        Ok(ChainHandle::new(done_rx))
    }

    /// Stop accepting work, then wait for queued and running work to finish
    pub async fn shutdown(&self) {
        if self.accepting.swap(false, Ordering::SeqCst) {
            tracing::debug!("dispatcher shutting down");
        }
        self.shutdown.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }

    /// Whether new work is accepted
    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }

    fn ensure_accepting(&self) -> Result<()> {
        if self.is_accepting() {
            Ok(())
        } else {
            Err(Error::ShuttingDown)
        }
    }
}

/// Post a completion, logging if the presentation context is gone
fn deliver<F>(presentation: &PresentationContext, completion: F)
where
    F: FnOnce() + Send + 'static,
{
    if !presentation.post(completion) {
        tracing::warn!("presentation context gone, dropping completion");
    }
}

/// Run queued jobs one at a time until shutdown, then drain what is left
async fn queue_worker(
    name: &'static str,
    mut rx: mpsc::UnboundedReceiver<Job>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            job = rx.recv() => match job {
                Some(job) => job.await,
                None => break,
            },
            _ = shutdown.cancelled() => {
                rx.close();
                while let Some(job) = rx.recv().await {
                    job.await;
                }
                break;
            }
        }
    }
    tracing::debug!(worker = name, "worker stopped");
}
