//! Request and outcome types shared by every stage of the pipeline.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};
use crate::options::EngineOptions;

/// Page Segmentation Mode for Tesseract OCR.
///
/// Controls how the engine partitions an image into text regions before recognition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PageSegMode {
    OsdOnly = 0,
    AutoOsd = 1,
    AutoOnly = 2,
    Auto = 3,
    SingleColumn = 4,
    SingleBlockVertical = 5,
    SingleBlock = 6,
    SingleLine = 7,
    SingleWord = 8,
    CircleWord = 9,
    SingleChar = 10,
    SparseText = 11,
    SparseTextOsd = 12,
    RawLine = 13,
}

impl PageSegMode {
    /// Mode used when a request carries no `psm` option: automatic page segmentation with
    /// orientation and script detection.
    pub const DEFAULT: PageSegMode = PageSegMode::AutoOsd;

    pub fn from_i32(value: i32) -> Result<Self> {
        match value {
            0 => Ok(PageSegMode::OsdOnly),
            1 => Ok(PageSegMode::AutoOsd),
            2 => Ok(PageSegMode::AutoOnly),
            3 => Ok(PageSegMode::Auto),
            4 => Ok(PageSegMode::SingleColumn),
            5 => Ok(PageSegMode::SingleBlockVertical),
            6 => Ok(PageSegMode::SingleBlock),
            7 => Ok(PageSegMode::SingleLine),
            8 => Ok(PageSegMode::SingleWord),
            9 => Ok(PageSegMode::CircleWord),
            10 => Ok(PageSegMode::SingleChar),
            11 => Ok(PageSegMode::SparseText),
            12 => Ok(PageSegMode::SparseTextOsd),
            13 => Ok(PageSegMode::RawLine),
            _ => Err(BridgeError::invalid_option(format!(
                "Invalid PSM mode value: {} (expected 0..=13)",
                value
            ))),
        }
    }

    /// Parse the textual value of a `psm` option.
    pub fn parse(value: &str) -> Result<Self> {
        let code = value.trim().parse::<i32>().map_err(|e| {
            BridgeError::invalid_option_with_source(format!("psm must be an integer, got '{}'", value), e)
        })?;
        Self::from_i32(code)
    }

    pub fn as_i32(&self) -> i32 {
        *self as i32
    }
}

impl Default for PageSegMode {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Which extraction call a recognition pass performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    /// UTF-8 plain text
    PlainText,
    /// Page-scoped hOCR markup carrying layout information
    StructuredMarkup,
}

impl OutputKind {
    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputKind::PlainText => "text/plain",
            OutputKind::StructuredMarkup => "text/html",
        }
    }
}

/// Where the request's image comes from. Exactly one source per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Filesystem path handed to the engine's own loader
    Path(PathBuf),
    /// Encoded image bytes (PNG, JPEG, ...) decoded in memory
    Bytes(Vec<u8>),
}

impl ImageSource {
    /// Build a source from the two optional request fields.
    ///
    /// Fails with `NoImageProvided` when both are absent and `InvalidArguments` when both are present.
    pub fn from_parts(path: Option<PathBuf>, bytes: Option<Vec<u8>>) -> Result<Self> {
        match (path, bytes) {
            (None, Some(bytes)) => Ok(ImageSource::Bytes(bytes)),
            (Some(path), None) => Ok(ImageSource::Path(path)),
            (None, None) => Err(BridgeError::NoImageProvided),
            (Some(_), Some(_)) => Err(BridgeError::invalid_arguments(
                "imagePath and imageBytes are mutually exclusive",
            )),
        }
    }
}

/// A validated, immutable recognition request.
#[derive(Debug, Clone)]
pub struct RecognitionRequest {
    /// Language code, `+`-joined for multi-language models (e.g. `eng+fra`)
    pub language: String,
    /// Directory holding `<lang>.traineddata` files
    pub data_path: PathBuf,
    pub image: ImageSource,
    pub options: EngineOptions,
    pub output: OutputKind,
}

/// Successful result of one recognition pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognitionOutcome {
    pub text: String,
    pub output: OutputKind,
}

impl RecognitionOutcome {
    pub fn empty(output: OutputKind) -> Self {
        Self {
            text: String::new(),
            output,
        }
    }
}
