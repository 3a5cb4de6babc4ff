//! Fetch, decode and display
//!
//! [`Pipeline`] composes a [`Fetcher`], a [`Decoder`] and a [`Dispatcher`]
//! behind a single entry point, [`Pipeline::load_and_display`]:
//!
//! 1. the target is cleared immediately, on the caller's context
//! 2. fetch-then-decode is submitted to the dispatcher under the chosen mode
//! 3. the completion assigns the image to the target, or logs the failure and
//!    leaves the target blank
//!
//! Every run gets a [`RunId`] and claims its target. What happens to results
//! of runs that were superseded by a newer claim is governed by
//! [`SupersedePolicy`].

mod delivery;

use delivery::Delivery;

use crate::config::{Config, SupersedePolicy};
use crate::decoder::{Decoder, ImageDecoder};
use crate::dispatcher::{Chain, ChainHandle, ChainOutcome, Dispatcher, Work};
use crate::display::DisplayTarget;
use crate::error::{Error, FetchError, Result};
use crate::fetcher::{Fetcher, HttpFetcher, fetch_with_timeout};
use crate::presentation::PresentationContext;
use crate::types::{ConcurrencyMode, Event, FetchRequest, Image, RunId};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Image loading pipeline (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct Pipeline {
    config: Arc<Config>,
    fetcher: Arc<dyn Fetcher>,
    decoder: Arc<dyn Decoder>,
    dispatcher: Arc<Dispatcher>,
    /// Event broadcast channel sender (multiple subscribers supported)
    event_tx: broadcast::Sender<Event>,
    /// Last run id handed out
    next_run: Arc<AtomicU64>,
}

/// A sequence submitted with [`Pipeline::display_sequence`]
pub struct SequenceRun {
    /// Run id shared by every stage of the sequence
    pub run: RunId,
    handle: ChainHandle,
}

impl SequenceRun {
    /// Wait until the sequence has finished or stopped at a failing stage
    pub async fn finished(self) -> Option<ChainOutcome> {
        self.handle.wait().await
    }
}

impl Pipeline {
    /// Create a pipeline with the HTTP fetcher and `image` decoder
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let fetcher = Arc::new(HttpFetcher::new(&config.fetch)?);
        let decoder =
            Arc::new(ImageDecoder::new().with_max_dimension(config.display.max_dimension));
        Self::with_components(config, fetcher, decoder)
    }

    /// Create a pipeline from caller-supplied components
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid.
    pub fn with_components(
        config: Config,
        fetcher: Arc<dyn Fetcher>,
        decoder: Arc<dyn Decoder>,
    ) -> Result<Self> {
        config.validate()?;

        let dispatcher = Dispatcher::new(&config.dispatch, PresentationContext::spawn())?;
        let (event_tx, _rx) = broadcast::channel(config.display.event_capacity);

        tracing::debug!(
            fetcher = fetcher.name(),
            decoder = decoder.name(),
            supersede = ?config.display.supersede,
            "pipeline created"
        );

        Ok(Self {
            config: Arc::new(config),
            fetcher,
            decoder,
            dispatcher: Arc::new(dispatcher),
            event_tx,
            next_run: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Subscribe to run lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The context completions are delivered to
    pub fn presentation(&self) -> &PresentationContext {
        self.dispatcher.presentation()
    }

    /// The dispatcher running this pipeline's work
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Build a request for `url` using the configured default timeout and cache policy
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if `url` does not parse.
    pub fn request(&self, url: &str) -> Result<FetchRequest> {
        Ok(FetchRequest::new(url)?
            .with_timeout(self.config.fetch.default_timeout)
            .with_cache_policy(self.config.fetch.default_cache_policy))
    }

    /// Clear `target`, then fetch, decode and display `request` under `mode`
    ///
    /// With [`ConcurrencyMode::Blocking`] the image (or failure) has been
    /// handled by the time this returns. Otherwise it returns once the work is
    /// queued and the outcome is reported through [`subscribe`](Self::subscribe).
    ///
    /// Fetch and decode failures are not returned here: they leave the target
    /// blank and are logged and broadcast as events.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShuttingDown`] after [`shutdown`](Self::shutdown).
    pub async fn load_and_display(
        &self,
        request: FetchRequest,
        target: &DisplayTarget,
        mode: ConcurrencyMode,
    ) -> Result<RunId> {
        self.ensure_accepting()?;

        let (run, token) = self.begin(target, request.url().as_str(), mode);
        let work = self.fetch_and_decode(request, token);
        let delivery = self.delivery(run, target);
        let rejected = delivery.clone();

        if let Err(e) = self
            .dispatcher
            .run(work, mode, move |result| delivery.complete(result))
            .await
        {
            rejected.rejected(&e);
            return Err(e);
        }

        Ok(run)
    }

    /// Clear `target`, then fetch and display each request in turn
    ///
    /// The requests run as one promise chain: each fetch starts only after the
    /// previous image has been displayed (plus the configured stage delay).
    /// The first failure stops the sequence and is reported once. Unless the
    /// policy is [`SupersedePolicy::LastCompletes`], a newer run on the target
    /// also stops it: no further fetch is started and the sequence ends with
    /// [`ChainOutcome::Superseded`]. An empty sequence only clears the target.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShuttingDown`] after [`shutdown`](Self::shutdown).
    pub fn display_sequence(
        &self,
        requests: Vec<FetchRequest>,
        target: &DisplayTarget,
    ) -> Result<SequenceRun> {
        self.ensure_accepting()?;

        let first_url = requests
            .first()
            .map(|request| request.url().to_string())
            .unwrap_or_default();
        let (run, token) = self.begin(target, &first_url, ConcurrencyMode::PromiseChain);

        let stages = requests.len();
        let chain = requests.into_iter().fold(Chain::new(), |chain, request| {
            let work = self.fetch_and_decode(request, token.clone());
            chain.then(move || work)
        });
        let chain = if self.config.display.supersede == SupersedePolicy::LastCompletes {
            chain
        } else {
            let owner = target.clone();
            chain.guarded_by(move || owner.is_latest(run))
        };

        let on_stage = self.delivery(run, target);
        let on_error = on_stage.clone();
        let rejected = on_stage.clone();
        let handle = self
            .dispatcher
            .run_chain(
                chain,
                move |stage, image| on_stage.stage_completed(stage, stages, image),
                move |stage, error| on_error.stage_failed(stage, error),
            )
            .inspect_err(|e| rejected.rejected(e))?;

        Ok(SequenceRun { run, handle })
    }

    /// Stop accepting runs and wait for queued work to be delivered
    pub async fn shutdown(&self) {
        self.dispatcher.shutdown().await;
        self.presentation().flush().await;
        tracing::info!("pipeline shut down");
    }

    fn ensure_accepting(&self) -> Result<()> {
        if self.dispatcher.is_accepting() {
            Ok(())
        } else {
            Err(Error::ShuttingDown)
        }
    }

    /// Allocate a run id, then claim (and thereby clear) the target
    fn begin(
        &self,
        target: &DisplayTarget,
        url: &str,
        mode: ConcurrencyMode,
    ) -> (RunId, CancellationToken) {
        let run = RunId(self.next_run.fetch_add(1, Ordering::SeqCst) + 1);

        let claim = target.claim(run);
        if self.config.display.supersede == SupersedePolicy::CancelPrevious {
            claim.previous.cancel();
        }

        tracing::info!(run = %run, target = target.name(), url, mode = %mode, "run started");
        let _ = self.event_tx.send(Event::RunStarted {
            run,
            target: target.name().to_string(),
            url: url.to_string(),
            mode,
        });

        (run, claim.token)
    }

    fn delivery(&self, run: RunId, target: &DisplayTarget) -> Delivery {
        Delivery {
            run,
            target: target.clone(),
            policy: self.config.display.supersede,
            events: self.event_tx.clone(),
        }
    }

    /// Fetch then decode, abandoning the fetch once `cancel` fires
    fn fetch_and_decode(&self, request: FetchRequest, cancel: CancellationToken) -> Work<Image> {
        let fetcher = self.fetcher.clone();
        let decoder = self.decoder.clone();

        Box::pin(async move {
            let bytes = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(FetchError::Cancelled {
                        url: request.url().to_string(),
                    }
                    .into());
                }
                result = fetch_with_timeout(fetcher.as_ref(), &request) => result?,
            };
            Ok(decoder.decode(&bytes)?)
        })
    }
}
