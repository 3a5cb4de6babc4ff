//! Sequential, short-circuiting composition of stages

use super::Work;
use crate::error::{Error, Result};
use crate::presentation::PresentationContext;
use std::future::Future;
use std::time::Duration;
use tokio::sync::oneshot;

type Stage<T> = Box<dyn FnOnce() -> Work<T> + Send + 'static>;
type Guard = Box<dyn Fn() -> bool + Send + Sync + 'static>;

/// An ordered list of stages run one after another
///
/// Each stage is started only after the previous stage's completion handler
/// has run on the presentation context. The first failing stage stops the
/// chain; the stages after it are never started. A chain can also stop early
/// because it lost its right to run, see [`guarded_by`](Chain::guarded_by).
///
/// # Examples
///
/// ```no_run
/// use pixfetch::dispatcher::Chain;
///
/// let chain = Chain::new()
///     .then(|| async { Ok::<_, pixfetch::Error>(1) })
///     .then(|| async { Ok(2) });
/// assert_eq!(chain.len(), 2);
/// ```
pub struct Chain<T> {
    stages: Vec<Stage<T>>,
    guard: Option<Guard>,
}

/// How a chain ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChainOutcome {
    /// Every stage succeeded
    Completed {
        /// Number of stages run
        stages: usize,
    },
    /// The stage at `stage` failed and the rest were skipped
    Failed {
        /// Zero-based index of the failing stage
        stage: usize,
    },
    /// The chain stopped because a stage result was refused or its guard
    /// no longer held; `stage` and everything after it were not displayed
    Superseded {
        /// Zero-based index of the stage that was refused or never started
        stage: usize,
    },
    /// The presentation context stopped (or a handler panicked) before the
    /// chain finished
    Abandoned {
        /// Zero-based index of the stage whose result could not be delivered
        stage: usize,
    },
}

/// Awaitable handle to a submitted chain
pub struct ChainHandle {
    rx: oneshot::Receiver<ChainOutcome>,
}

impl ChainHandle {
    pub(crate) fn new(rx: oneshot::Receiver<ChainOutcome>) -> Self {
        Self { rx }
    }

    /// Wait for the chain to end
    ///
    /// Returns `None` if the chain was dropped without running, which only
    /// happens when its worker stopped abnormally.
    pub async fn wait(self) -> Option<ChainOutcome> {
        self.rx.await.ok()
    }
}

impl<T: Send + 'static> Chain<T> {
    /// Create an empty chain
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            guard: None,
        }
    }

    /// Append a stage; `stage` is not called until the chain reaches it
    #[must_use]
    pub fn then<F, Fut>(mut self, stage: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        self.stages.push(Box::new(move || Box::pin(stage()) as Work<T>));
        self
    }

    /// Only start a stage while `guard` returns true
    ///
    /// The guard is checked before every stage; once it fails the chain ends
    /// with [`ChainOutcome::Superseded`] without starting further work.
    #[must_use]
    pub fn guarded_by<G>(mut self, guard: G) -> Self
    where
        G: Fn() -> bool + Send + Sync + 'static,
    {
        self.guard = Some(Box::new(guard));
        self
    }

    /// Number of stages
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the chain has no stages
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage in order, delivering each result on `presentation`
    ///
    /// `on_stage` runs on the presentation context after each successful
    /// stage and returns whether the chain should go on. `on_error` runs there
    /// at most once, for the first failure.
    pub(crate) async fn execute<S, E>(
        self,
        presentation: &PresentationContext,
        stage_delay: Duration,
        mut on_stage: S,
        on_error: E,
    ) -> ChainOutcome
    where
        S: FnMut(usize, T) -> bool + Send + 'static,
        E: FnOnce(usize, Error) + Send + 'static,
    {
        let Self { stages, guard } = self;
        let total = stages.len();
        let allowed = || guard.as_ref().is_none_or(|guard| guard());

        for (index, stage) in stages.into_iter().enumerate() {
            if index > 0 && !stage_delay.is_zero() {
                tokio::time::sleep(stage_delay).await;
            }
            if !allowed() {
                tracing::debug!(stage = index, total, "chain guard failed, not starting stage");
                return ChainOutcome::Superseded { stage: index };
            }

            match stage().await {
                Ok(value) => {
                    let delivered = presentation
                        .post_and_wait(move || {
                            let go_on = on_stage(index, value);
                            (on_stage, go_on)
                        })
                        .await;
                    match delivered {
                        Some((handler, true)) => on_stage = handler,
                        Some((_, false)) => {
                            tracing::debug!(stage = index, total, "stage result refused, stopping chain");
                            return ChainOutcome::Superseded { stage: index };
                        }
                        None => {
                            tracing::warn!(stage = index, "presentation context gone, abandoning chain");
                            return ChainOutcome::Abandoned { stage: index };
                        }
                    }
                }
                Err(e) => {
                    tracing::debug!(stage = index, total, error = %e, "chain stage failed, skipping the rest");
                    if presentation
                        .post_and_wait(move || on_error(index, e))
                        .await
                        .is_none()
                    {
                        tracing::warn!(stage = index, "chain error handler did not run, abandoning chain");
                        return ChainOutcome::Abandoned { stage: index };
                    }
                    if !allowed() {
                        return ChainOutcome::Superseded { stage: index };
                    }
                    return ChainOutcome::Failed { stage: index };
                }
            }
        }

        ChainOutcome::Completed { stages: total }
    }
}

impl<T: Send + 'static> Default for Chain<T> {
    fn default() -> Self {
        Self::new()
    }
}
