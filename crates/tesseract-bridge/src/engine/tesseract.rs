//! Native Tesseract backend.
//!
//! Wraps `kreuzberg_tesseract::TesseractAPI`. The API has no file loader of its own, so path images are decoded
//! with the `image` crate and handed over as raw RGB8.

use std::path::Path;

use kreuzberg_tesseract::{TessPageSegMode, TesseractAPI};

use super::{EngineFactory, OcrEngine, check_traineddata};
use crate::error::{BridgeError, Result};
use crate::image::{DecodedImage, load_file};
use crate::types::PageSegMode;

pub struct TesseractEngine {
    api: TesseractAPI,
}

impl OcrEngine for TesseractEngine {
    fn set_variable(&mut self, name: &str, value: &str) -> Result<()> {
        self.api
            .set_variable(name, value)
            .map_err(|e| BridgeError::recognition(format!("Failed to set {}: {}", name, e)))
    }

    fn set_page_seg_mode(&mut self, mode: PageSegMode) -> Result<()> {
        self.api
            .set_page_seg_mode(TessPageSegMode::from_int(mode.as_i32()))
            .map_err(|e| BridgeError::recognition(format!("Failed to set PSM mode: {}", e)))
    }

    fn set_image(&mut self, image: &DecodedImage) -> Result<()> {
        self.api
            .set_image(
                &image.data,
                image.width as i32,
                image.height as i32,
                DecodedImage::BYTES_PER_PIXEL as i32,
                image.bytes_per_line() as i32,
            )
            .map_err(|e| BridgeError::recognition(format!("Failed to set image: {}", e)))
    }

    fn set_image_file(&mut self, path: &Path) -> Result<()> {
        let image = load_file(path)?;
        self.set_image(&image)
    }

    fn utf8_text(&mut self) -> Result<String> {
        self.api
            .recognize()
            .map_err(|e| BridgeError::recognition(format!("Failed to recognize text: {}", e)))?;
        self.api
            .get_utf8_text()
            .map_err(|e| BridgeError::recognition(format!("Failed to extract text: {}", e)))
    }

    fn hocr_text(&mut self) -> Result<String> {
        self.api
            .recognize()
            .map_err(|e| BridgeError::recognition(format!("Failed to recognize text: {}", e)))?;
        self.api
            .get_hocr_text(0)
            .map_err(|e| BridgeError::recognition(format!("Failed to extract hOCR: {}", e)))
    }

    fn clear(&mut self) -> Result<()> {
        self.api
            .clear()
            .map_err(|e| BridgeError::recognition(format!("Failed to clear engine: {}", e)))
    }
}

/// Creates [`TesseractEngine`]s.
#[derive(Debug, Clone)]
pub struct TesseractEngineFactory {
    validate_traineddata: bool,
}

impl TesseractEngineFactory {
    pub fn new(validate_traineddata: bool) -> Self {
        Self { validate_traineddata }
    }

    pub fn version() -> String {
        TesseractAPI::version()
    }
}

impl Default for TesseractEngineFactory {
    fn default() -> Self {
        Self::new(true)
    }
}

impl EngineFactory for TesseractEngineFactory {
    fn create(&self, data_path: &Path, language: &str) -> Result<Box<dyn OcrEngine>> {
        // Missing traineddata can abort inside the native init instead of returning an error
        if self.validate_traineddata {
            check_traineddata(data_path, language)?;
        }

        let data_path_str = data_path.to_str().ok_or_else(|| {
            BridgeError::engine_init(format!("Tessdata path is not valid UTF-8: {}", data_path.display()))
        })?;

        let api = TesseractAPI::new();
        api.init(data_path_str, language).map_err(|e| {
            BridgeError::engine_init(format!("Failed to initialize language '{}': {}", language, e))
        })?;

        tracing::debug!(version = %TesseractAPI::version(), language, "Tesseract initialized");
        Ok(Box::new(TesseractEngine { api }))
    }

    fn name(&self) -> &str {
        "tesseract"
    }
}
