//! Error types for the bridge.
//!
//! Every failure that can reach the request channel is a [`BridgeError`]. Each variant maps to one stable
//! [`ErrorCode`], and the code's wire string is what the host application receives alongside the message.
//!
//! # Taxonomy
//!
//! - `NoImageProvided` - neither `imagePath` nor `imageBytes` was supplied
//! - `EngineInitFailed` - bad language or data directory; the engine slot is left empty
//! - `InvalidOption` - malformed reserved option (`psm`), raised before the engine is touched
//! - `RecognitionFailed` - an engine call failed or the recognition pass panicked
//! - `InvalidArguments` - the call arguments could not be interpreted
//! - `Config` / `Io` - configuration loading problems, never raised by a recognition pass
//!
//! Undecodable `imageBytes` is not an error: the pass succeeds with empty text.
use thiserror::Error;

/// Result type alias using `BridgeError`.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Main error type for all bridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Either imagePath or imageBytes must be provided")]
    NoImageProvided,

    #[error("Engine initialization failed: {message}")]
    EngineInitFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Invalid option: {message}")]
    InvalidOption {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Recognition failed: {message}")]
    RecognitionFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Invalid arguments: {message}")]
    InvalidArguments {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

macro_rules! error_constructor {
    ($name:ident, $variant:ident) => {
        pastey::paste! {
            #[doc = "Create a " $variant " error"]
            pub fn $name<S: Into<String>>(message: S) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: None,
                }
            }

            #[doc = "Create a " $variant " error with source"]
            pub fn [<$name _with_source>]<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
                message: S,
                source: E,
            ) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: Some(Box::new(source)),
                }
            }
        }
    };
}

impl BridgeError {
    error_constructor!(engine_init, EngineInitFailed);
    error_constructor!(invalid_option, InvalidOption);
    error_constructor!(recognition, RecognitionFailed);
    error_constructor!(invalid_arguments, InvalidArguments);
    error_constructor!(config, Config);

    /// The stable error code reported to the host for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NoImageProvided => ErrorCode::NoImage,
            Self::EngineInitFailed { .. } => ErrorCode::EngineInit,
            Self::InvalidOption { .. } => ErrorCode::InvalidOption,
            Self::RecognitionFailed { .. } => ErrorCode::Recognition,
            Self::InvalidArguments { .. } => ErrorCode::InvalidArguments,
            Self::Config { .. } | Self::Io(_) => ErrorCode::Internal,
        }
    }
}

/// Stable error codes shared with every host binding.
///
/// Numeric values and wire strings never change; new codes are only ever appended.
#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Neither image source was provided
    NoImage = 0,
    /// Engine could not be initialized for the requested language/data directory
    EngineInit = 1,
    /// A reserved option carried a malformed value
    InvalidOption = 2,
    /// The recognition pass failed
    Recognition = 3,
    /// Call arguments were missing, mistyped or contradictory
    InvalidArguments = 4,
    /// Internal bridge error (indicates a bug, should rarely occur)
    Internal = 5,
}

impl ErrorCode {
    /// Wire string sent to the host as the error code.
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::NoImage => "NO_IMAGE",
            ErrorCode::EngineInit => "ENGINE_INIT_FAILED",
            ErrorCode::InvalidOption => "INVALID_OPTION",
            ErrorCode::Recognition => "RECOGNITION_FAILED",
            ErrorCode::InvalidArguments => "INVALID_ARGUMENTS",
            ErrorCode::Internal => "INTERNAL",
        }
    }

    /// Converts from numeric error code to enum variant.
    #[inline]
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(ErrorCode::NoImage),
            1 => Some(ErrorCode::EngineInit),
            2 => Some(ErrorCode::InvalidOption),
            3 => Some(ErrorCode::Recognition),
            4 => Some(ErrorCode::InvalidArguments),
            5 => Some(ErrorCode::Internal),
            _ => None,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
