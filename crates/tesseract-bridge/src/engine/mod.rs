//! Recognition engine seam and lifecycle.
//!
//! [`OcrEngine`] is the minimal surface the pipeline needs from a native engine handle and [`EngineFactory`]
//! creates one bound to a language and data directory. [`EngineManager`] owns the single live handle.
//!
//! The native Tesseract implementation lives in [`tesseract`] behind the `tesseract` feature.

pub mod lifecycle;
pub mod validation;

#[cfg(feature = "tesseract")]
pub mod tesseract;

use std::path::Path;

use crate::Result;
use crate::image::DecodedImage;
use crate::types::PageSegMode;

pub use lifecycle::{EngineManager, EngineStats};
pub use validation::{check_traineddata, validate_language_code};

/// An initialized engine handle bound to one language.
///
/// Handles are stateful and not reentrant: callers get `&mut` access only while holding the
/// [`EngineManager`] lock.
pub trait OcrEngine: Send {
    /// Assign an engine variable (e.g. `tessedit_char_whitelist`).
    fn set_variable(&mut self, name: &str, value: &str) -> Result<()>;

    fn set_page_seg_mode(&mut self, mode: PageSegMode) -> Result<()>;

    /// Set a decoded RGB8 image for the next recognition call.
    fn set_image(&mut self, image: &DecodedImage) -> Result<()>;

    /// Load an image from disk through the engine's own loader.
    ///
    /// A missing or unreadable file is an error.
    fn set_image_file(&mut self, path: &Path) -> Result<()>;

    /// Run recognition on the current image and return UTF-8 plain text.
    fn utf8_text(&mut self) -> Result<String>;

    /// Run recognition on the current image and return hOCR markup for page 0.
    fn hocr_text(&mut self) -> Result<String>;

    /// Release resources scoped to a single recognition pass (image, results). The handle stays initialized.
    fn clear(&mut self) -> Result<()>;
}

/// Creates engine handles. Creation is the expensive step the lifecycle manager amortizes.
pub trait EngineFactory: Send + Sync {
    /// Initialize a new handle for `language` using model files under `data_path`.
    ///
    /// Failures must be reported as `BridgeError::EngineInitFailed`.
    fn create(&self, data_path: &Path, language: &str) -> Result<Box<dyn OcrEngine>>;

    /// Backend name for logging.
    fn name(&self) -> &str {
        "custom"
    }
}
