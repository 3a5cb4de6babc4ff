//! Display targets
//!
//! A [`DisplayTarget`] is the caller-owned sink a pipeline assigns decoded
//! images to. It also records which run currently owns it, so results from
//! superseded runs can be recognized and dropped.

use crate::types::{Image, RunId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Image currently shown by a target (`None` when blank)
pub type Shown = Option<Arc<Image>>;

/// Caller-owned sink for decoded images (cloneable, clones share state)
///
/// The image slot is only written by pipeline completion callbacks; callers
/// read it with [`current`](Self::current) or observe it with
/// [`subscribe`](Self::subscribe).
#[derive(Clone)]
pub struct DisplayTarget {
    inner: Arc<TargetInner>,
}

struct TargetInner {
    name: String,
    image: watch::Sender<Shown>,
    /// Latest run id started for this target (0 = never used)
    latest: AtomicU64,
    /// Cancellation token of the latest run
    active: Mutex<CancellationToken>,
}

/// Bookkeeping handed back when a run takes ownership of a target
pub(crate) struct RunClaim {
    /// Cancelled when a later run claims the target under `CancelPrevious`
    pub(crate) token: CancellationToken,
    /// Token of the run that owned the target before this one
    pub(crate) previous: CancellationToken,
}

impl DisplayTarget {
    /// Create a blank target
    pub fn new(name: impl Into<String>) -> Self {
        let (image, _) = watch::channel(None);
        Self {
            inner: Arc::new(TargetInner {
                name: name.into(),
                image,
                latest: AtomicU64::new(0),
                active: Mutex::new(CancellationToken::new()),
            }),
        }
    }

    /// Target name, used in logs and events
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Image currently shown
    pub fn current(&self) -> Shown {
        self.inner.image.borrow().clone()
    }

    /// Observe every change to the shown image
    pub fn subscribe(&self) -> watch::Receiver<Shown> {
        self.inner.image.subscribe()
    }

    /// Latest run started for this target
    pub fn latest_run(&self) -> Option<RunId> {
        match self.inner.latest.load(Ordering::SeqCst) {
            0 => None,
            id => Some(RunId(id)),
        }
    }

    /// Whether `run` is still the latest run started for this target
    pub fn is_latest(&self, run: RunId) -> bool {
        self.inner.latest.load(Ordering::SeqCst) == run.get()
    }

    /// Record `run` as the target's owner and blank it
    ///
    /// Ownership only moves forward: claiming with an older id than the
    /// current owner leaves the owner and the image unchanged. Claims and
    /// [`show_if_latest`](Self::show_if_latest) are serialized on the image
    /// slot, so a stale image can never land after a newer claim's clear.
    pub(crate) fn claim(&self, run: RunId) -> RunClaim {
        let mut claim = None;
        self.inner.image.send_if_modified(|shown| {
            let owner = self.inner.latest.fetch_max(run.get(), Ordering::SeqCst);
            if owner > run.get() {
                return false;
            }

            let token = CancellationToken::new();
            let previous = {
                let mut active = self
                    .inner
                    .active
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                std::mem::replace(&mut *active, token.clone())
            };
            claim = Some(RunClaim { token, previous });
            *shown = None;
            true
        });

        claim.unwrap_or_else(|| RunClaim {
            token: CancellationToken::new(),
            previous: CancellationToken::new(),
        })
    }

    /// Show `image` if `run` still owns the target; returns whether it was shown
    pub(crate) fn show_if_latest(&self, run: RunId, image: Arc<Image>) -> bool {
        self.inner.image.send_if_modified(|shown| {
            if self.inner.latest.load(Ordering::SeqCst) != run.get() {
                return false;
            }
            *shown = Some(image);
            true
        })
    }

    /// Show `image` regardless of ownership
    pub(crate) fn show(&self, image: Arc<Image>) {
        self.inner.image.send_replace(Some(image));
    }
}

impl std::fmt::Debug for DisplayTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplayTarget")
            .field("name", &self.inner.name)
            .field("latest_run", &self.latest_run())
            .field("showing", &self.current().map(|image| image.dimensions()))
            .finish()
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn image(width: u32, height: u32) -> Arc<Image> {
        Arc::new(Image {
            width,
            height,
            pixels: vec![0; (width * height * 4) as usize],
        })
    }

    #[test]
    fn new_target_is_blank_and_unclaimed() {
        let target = DisplayTarget::new("main");

        assert_eq!(target.name(), "main");
        assert!(target.current().is_none());
        assert!(target.latest_run().is_none());
    }

    #[test]
    fn claim_blanks_the_target() {
        let target = DisplayTarget::new("main");

        target.show(image(3, 2));
        assert_eq!(target.current().unwrap().dimensions(), (3, 2));

        target.claim(RunId(1));
        assert!(target.current().is_none());
    }

    #[test]
    fn stale_claim_keeps_the_image() {
        let target = DisplayTarget::new("main");
        target.claim(RunId(2));
        assert!(target.show_if_latest(RunId(2), image(3, 2)));

        target.claim(RunId(1));

        assert_eq!(target.current().unwrap().dimensions(), (3, 2));
    }

    #[test]
    fn only_the_owner_can_show() {
        let target = DisplayTarget::new("main");
        target.claim(RunId(1));
        target.claim(RunId(2));

        assert!(!target.show_if_latest(RunId(1), image(3, 2)));
        assert!(target.current().is_none());
        assert!(target.show_if_latest(RunId(2), image(5, 5)));
        assert_eq!(target.current().unwrap().dimensions(), (5, 5));
    }

    #[test]
    fn racing_claims_never_leave_a_stale_image() {
        for _ in 0..200 {
            let target = DisplayTarget::new("main");
            target.claim(RunId(1));

            let stale = {
                let target = target.clone();
                std::thread::spawn(move || target.show_if_latest(RunId(1), image(1, 1)))
            };
            target.claim(RunId(2));
            let stale_shown = stale.join().unwrap();

            // Either the stale image landed before the newer clear, or it was refused
            assert!(target.current().is_none(), "stale_shown={stale_shown}");
        }
    }

    #[test]
    fn later_claim_supersedes_earlier() {
        let target = DisplayTarget::new("main");

        target.claim(RunId(1));
        assert!(target.is_latest(RunId(1)));

        target.claim(RunId(2));
        assert!(!target.is_latest(RunId(1)));
        assert!(target.is_latest(RunId(2)));
    }

    #[test]
    fn older_claim_never_moves_ownership_backwards() {
        let target = DisplayTarget::new("main");

        target.claim(RunId(5));
        target.claim(RunId(3));

        assert_eq!(target.latest_run(), Some(RunId(5)));
    }

    #[test]
    fn claim_hands_back_previous_token() {
        let target = DisplayTarget::new("main");

        let first = target.claim(RunId(1));
        let second = target.claim(RunId(2));

        second.previous.cancel();
        assert!(first.token.is_cancelled());
        assert!(!second.token.is_cancelled());
    }

    #[test]
    fn clones_share_state() {
        let target = DisplayTarget::new("main");
        let clone = target.clone();

        target.show(image(1, 1));
        assert!(clone.current().is_some());
    }

    #[tokio::test]
    async fn subscribers_observe_changes() {
        let target = DisplayTarget::new("main");
        let mut rx = target.subscribe();

        target.show(image(4, 4));

        let shown = rx.wait_for(|shown| shown.is_some()).await.unwrap();
        assert_eq!(shown.as_ref().unwrap().dimensions(), (4, 4));
    }
}
