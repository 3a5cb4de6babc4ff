//! Applying run results to a display target

use crate::config::SupersedePolicy;
use crate::display::DisplayTarget;
use crate::error::{Error, FetchError, Result};
use crate::types::{Event, Image, RunId};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Completion side of one run, executed on the presentation context
/// (or on the caller's context in blocking mode)
#[derive(Clone)]
pub(super) struct Delivery {
    pub(super) run: RunId,
    pub(super) target: DisplayTarget,
    pub(super) policy: SupersedePolicy,
    pub(super) events: broadcast::Sender<Event>,
}

impl Delivery {
    /// Handle the outcome of a single load
    pub(super) fn complete(&self, result: Result<Image>) {
        match result {
            Ok(image) => {
                self.show(image);
            }
            Err(e) => self.failed(&e),
        }
    }

    /// Handle one successful stage of a sequence; returns whether the
    /// sequence may go on
    pub(super) fn stage_completed(&self, stage: usize, stages: usize, image: Image) -> bool {
        if !self.show(image) {
            tracing::debug!(run = %self.run, stage, "sequence superseded, stopping");
            return false;
        }
        self.emit(Event::StageCompleted {
            run: self.run,
            stage,
        });
        if stage + 1 == stages {
            tracing::info!(run = %self.run, stages, "sequence finished");
            self.emit(Event::ChainFinished {
                run: self.run,
                stages,
            });
        }
        true
    }

    /// Handle the failing stage of a sequence
    pub(super) fn stage_failed(&self, stage: usize, error: Error) {
        self.failed(&error);
        if is_cancelled(&error) {
            return;
        }
        tracing::warn!(run = %self.run, stage, error = %error, "sequence stopped");
        self.emit(Event::ChainFailed {
            run: self.run,
            stage,
            error: error.to_string(),
        });
    }

    /// The dispatcher refused the run after the target was claimed
    pub(super) fn rejected(&self, error: &Error) {
        tracing::warn!(
            run = %self.run,
            target = self.target.name(),
            error = %error,
            "run rejected, display left blank"
        );
        self.emit(Event::FetchFailed {
            run: self.run,
            target: self.target.name().to_string(),
            error: error.to_string(),
            timed_out: false,
        });
    }

    /// Assign `image` unless this run lost its target; returns whether it was shown
    fn show(&self, image: Image) -> bool {
        let (width, height) = image.dimensions();
        let image = Arc::new(image);

        if self.policy == SupersedePolicy::LastCompletes {
            self.target.show(image);
        } else if !self.target.show_if_latest(self.run, image) {
            self.superseded();
            return false;
        }

        tracing::info!(
            run = %self.run,
            target = self.target.name(),
            width,
            height,
            "image displayed"
        );
        self.emit(Event::Displayed {
            run: self.run,
            target: self.target.name().to_string(),
            width,
            height,
        });
        true
    }

    /// Log a failure; the target is left as it is
    fn failed(&self, error: &Error) {
        match error {
            _ if is_cancelled(error) => self.superseded(),
            Error::Decode(e) => {
                tracing::warn!(
                    run = %self.run,
                    target = self.target.name(),
                    error = %e,
                    "could not decode image, display left unchanged"
                );
                self.emit(Event::DecodeFailed {
                    run: self.run,
                    target: self.target.name().to_string(),
                    error: e.to_string(),
                });
            }
            other => {
                tracing::warn!(
                    run = %self.run,
                    target = self.target.name(),
                    error = %other,
                    "fetch failed, display left unchanged"
                );
                self.emit(Event::FetchFailed {
                    run: self.run,
                    target: self.target.name().to_string(),
                    error: other.to_string(),
                    timed_out: other.is_timeout(),
                });
            }
        }
    }

    fn superseded(&self) {
        let latest = self.target.latest_run().unwrap_or(self.run);
        tracing::debug!(
            run = %self.run,
            latest = %latest,
            target = self.target.name(),
            "dropping result of superseded run"
        );
        self.emit(Event::Superseded {
            run: self.run,
            target: self.target.name().to_string(),
            latest,
        });
    }

    fn emit(&self, event: Event) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

fn is_cancelled(error: &Error) -> bool {
    matches!(error, Error::Fetch(FetchError::Cancelled { .. }))
}
