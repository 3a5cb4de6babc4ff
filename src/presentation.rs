//! The presentation context
//!
//! A single serial execution context that owns user-visible state, the
//! equivalent of a UI main thread. Callbacks posted to it run one at a time,
//! in the order they were posted, on a dedicated Tokio task.

use std::panic::AssertUnwindSafe;
use tokio::sync::{mpsc, oneshot};

type Callback = Box<dyn FnOnce() + Send + 'static>;

tokio::task_local! {
    static ON_PRESENTATION: ();
}

/// Handle to the presentation context (cloneable, all clones share one queue)
///
/// The context runs until every handle has been dropped.
#[derive(Clone)]
pub struct PresentationContext {
    tx: mpsc::UnboundedSender<Callback>,
}

impl PresentationContext {
    /// Start a presentation context on the current Tokio runtime
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn spawn() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Callback>();

        tokio::spawn(ON_PRESENTATION.scope((), async move {
            while let Some(callback) = rx.recv().await {
                if std::panic::catch_unwind(AssertUnwindSafe(callback)).is_err() {
                    tracing::error!("presentation callback panicked");
                }
            }
            tracing::debug!("presentation context stopped");
        }));

        Self { tx }
    }

    /// Queue `callback` to run on the presentation context
    ///
    /// Returns `false` if the context has stopped and the callback was dropped.
    pub fn post<F>(&self, callback: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.tx.send(Box::new(callback)).is_ok()
    }

    /// Queue `callback` and wait until it has run, returning its value
    ///
    /// Returns `None` if the context has stopped or the callback panicked.
    /// Must not be awaited from the presentation context itself.
    pub async fn post_and_wait<F, R>(&self, callback: F) -> Option<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();
        let posted = self.post(move || {
            let _ = done_tx.send(callback());
        });
        if !posted {
            return None;
        }
        done_rx.await.ok()
    }

    /// Wait until every callback posted before this call has run
    pub async fn flush(&self) {
        self.post_and_wait(|| ()).await;
    }

    /// Returns true when called from a callback running on a presentation context
    pub fn is_current() -> bool {
        ON_PRESENTATION.try_with(|_| ()).is_ok()
    }
}
