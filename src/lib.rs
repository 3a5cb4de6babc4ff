//! # pixfetch
//!
//! Fetch an image over HTTP, decode it, and show it on a display target,
//! with the concurrency strategy chosen per call.
//!
//! ## Design Philosophy
//!
//! pixfetch is designed to be:
//! - **Strategy-agnostic** - The same load runs blocking, on a serial worker,
//!   on a bounded pool, or as a promise chain
//! - **Presentation-safe** - Display updates only ever happen on the
//!   presentation context
//! - **Race-aware** - Every load gets a run id, and stale results never
//!   overwrite newer ones unless configured to
//! - **Event-driven** - Consumers subscribe to events, no polling required
//!
//! ## Quick Start
//!
//! ```no_run
//! use pixfetch::{Config, ConcurrencyMode, DisplayTarget, Pipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = Pipeline::new(Config::default())?;
//!     let target = DisplayTarget::new("main");
//!
//!     // Subscribe to events
//!     let mut events = pipeline.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let request = pipeline.request("https://example.com/cat.png")?;
//!     pipeline
//!         .load_and_display(request, &target, ConcurrencyMode::BackgroundPool)
//!         .await?;
//!
//!     pipeline.shutdown().await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Image decoding
pub mod decoder;
/// Concurrency strategies and promise chains
pub mod dispatcher;
/// Display targets
pub mod display;
/// Error types
pub mod error;
/// Image fetching
pub mod fetcher;
/// Fetch, decode and display
pub mod pipeline;
/// The presentation context
pub mod presentation;
/// Core types and events
pub mod types;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use config::{Config, DispatchConfig, DisplayConfig, FetchConfig, SupersedePolicy};
pub use decoder::{Decoder, ImageDecoder};
pub use dispatcher::{Chain, ChainHandle, ChainOutcome, Dispatcher};
pub use display::DisplayTarget;
pub use error::{DecodeError, Error, FetchError, Result};
pub use fetcher::{Fetcher, HttpFetcher};
pub use pipeline::{Pipeline, SequenceRun};
pub use presentation::PresentationContext;
pub use types::{CachePolicy, ConcurrencyMode, Event, FetchRequest, Image, RunId};
