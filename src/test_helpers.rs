//! Shared test helpers: a scripted fetcher and image fixtures.

use crate::error::FetchError;
use crate::fetcher::{FetchResult, Fetcher};
use crate::types::FetchRequest;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Encode a `width` x `height` PNG with a simple gradient
pub(crate) fn encode_png(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
    });
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(image)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

/// Fetcher answering from a fixed table, recording every call
///
/// Unknown URLs fail with HTTP 404. Every call sleeps for the configured
/// latency (per-URL latency wins over the default).
#[derive(Default)]
pub(crate) struct MockFetcher {
    responses: HashMap<String, FetchResult>,
    latency: Duration,
    url_latency: HashMap<String, Duration>,
    calls: AtomicUsize,
    requested: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_response(mut self, url: &str, body: Vec<u8>) -> Self {
        self.responses.insert(url.to_string(), Ok(Bytes::from(body)));
        self
    }

    pub(crate) fn with_png(self, url: &str, width: u32, height: u32) -> Self {
        self.with_response(url, encode_png(width, height))
    }

    pub(crate) fn with_failure(mut self, url: &str, error: FetchError) -> Self {
        self.responses.insert(url.to_string(), Err(error));
        self
    }

    pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub(crate) fn with_url_latency(mut self, url: &str, latency: Duration) -> Self {
        self.url_latency.insert(url.to_string(), latency);
        self
    }

    /// Number of fetches performed
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// URLs fetched, in call order
    pub(crate) fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, request: &FetchRequest) -> FetchResult {
        let url = request.url().as_str();
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push(url.to_string());

        let latency = self.url_latency.get(url).copied().unwrap_or(self.latency);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        self.responses.get(url).cloned().unwrap_or_else(|| {
            Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
