//! Byte-to-image decoding
//!
//! Decoding is synchronous and side-effect free. The pipeline runs it on the
//! same worker that fetched the bytes, never on the presentation context.

use crate::error::DecodeError;
use crate::types::Image;

/// Turns fetched bytes into a displayable [`Image`]
///
/// Implementations must reject empty or malformed input with a
/// [`DecodeError`] and must not panic.
pub trait Decoder: Send + Sync {
    /// Decode `bytes` into an image
    fn decode(&self, bytes: &[u8]) -> Result<Image, DecodeError>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// [`Decoder`] backed by the `image` crate (PNG, JPEG and GIF)
#[derive(Clone, Debug, Default)]
pub struct ImageDecoder {
    max_dimension: Option<u32>,
}

impl ImageDecoder {
    /// Create a decoder with no dimension limit
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject images whose width or height exceeds `limit`
    #[must_use]
    pub fn with_max_dimension(mut self, limit: Option<u32>) -> Self {
        self.max_dimension = limit;
        self
    }
}

impl Decoder for ImageDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Image, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::Empty);
        }

        let decoded =
            image::load_from_memory(bytes).map_err(|e| DecodeError::Malformed(e.to_string()))?;
        let (width, height) = (decoded.width(), decoded.height());

        if let Some(limit) = self.max_dimension
            && (width > limit || height > limit)
        {
            return Err(DecodeError::TooLarge {
                width,
                height,
                limit,
            });
        }

        Ok(Image {
            width,
            height,
            pixels: decoded.into_rgba8().into_raw(),
        })
    }

    fn name(&self) -> &'static str {
        "image"
    }
}
