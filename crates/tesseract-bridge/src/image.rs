//! Image source resolution.
//!
//! Byte buffers are decoded in memory here; paths are passed through untouched so the engine layer can load them
//! with its own entry point. Bytes that do not decode are a soft failure: the pass later succeeds with empty text.

use std::path::{Path, PathBuf};

use crate::error::{BridgeError, Result};
use crate::types::ImageSource;

/// A decoded RGB8 image in the layout the engine's `set_image` expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl DecodedImage {
    pub const BYTES_PER_PIXEL: u32 = 3;

    pub fn from_dynamic(img: image::DynamicImage) -> Self {
        let rgb_image = img.to_rgb8();
        let (width, height) = rgb_image.dimensions();
        Self {
            width,
            height,
            data: rgb_image.into_raw(),
        }
    }

    pub fn bytes_per_line(&self) -> u32 {
        self.width * Self::BYTES_PER_PIXEL
    }
}

/// Outcome of resolving a request's image source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedImage {
    Decoded(DecodedImage),
    Path(PathBuf),
    /// The byte buffer was empty, malformed or in an unsupported format
    Undecodable,
}

pub fn resolve(source: &ImageSource) -> ResolvedImage {
    match source {
        ImageSource::Path(path) => ResolvedImage::Path(path.clone()),
        ImageSource::Bytes(bytes) => match decode_bytes(bytes) {
            Ok(decoded) => ResolvedImage::Decoded(decoded),
            Err(e) => {
                tracing::warn!(
                    bytes = bytes.len(),
                    error = %e,
                    "Image bytes could not be decoded, returning empty text"
                );
                ResolvedImage::Undecodable
            }
        },
    }
}

pub fn decode_bytes(bytes: &[u8]) -> Result<DecodedImage> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| BridgeError::recognition_with_source("Failed to decode image", e))?;
    Ok(DecodedImage::from_dynamic(img))
}

/// Load and decode an image file. Used by engine backends without a native file loader.
pub fn load_file(path: &Path) -> Result<DecodedImage> {
    let img = image::open(path).map_err(|e| {
        BridgeError::recognition_with_source(format!("Failed to load image from '{}'", path.display()), e)
    })?;
    Ok(DecodedImage::from_dynamic(img))
}
