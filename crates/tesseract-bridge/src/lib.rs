//! Tesseract Bridge - OCR over a named-method request channel
//!
//! Exposes a text-recognition engine to a host application through two methods, `extractText` and
//! `extractHocr`. The bridge keeps one engine handle alive and reuses it while requests ask for the same language,
//! applies per-request options in a fixed order, and runs each recognition pass off the caller's thread while
//! still answering every call exactly once.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! # #[cfg(feature = "tesseract")]
//! # async fn run() -> tesseract_bridge::Result<()> {
//! use std::sync::Arc;
//! use serde_json::json;
//! use tesseract_bridge::{BridgeConfig, InProcessChannel, MethodCall, TesseractOcrPlugin, CHANNEL_NAME};
//!
//! let plugin = TesseractOcrPlugin::with_tesseract(tokio::runtime::Handle::current(), BridgeConfig::default())?;
//! let channel = Arc::new(InProcessChannel::new());
//! plugin.attach(channel.clone());
//!
//! let call = MethodCall::new("extractText", json!({
//!     "tessData": "/usr/share/tessdata",
//!     "imagePath": "scan.png",
//!     "args": {"psm": "6"}
//! }));
//! let response = channel.invoke(CHANNEL_NAME, call).await;
//! println!("{:?}", response);
//!
//! plugin.detach();
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Image resolution** (`image`): decode byte buffers, pass paths through
//! - **Engine lifecycle** (`engine`): single-slot, lock-guarded engine cache keyed by language
//! - **Options** (`options`): typed `psm` handling and ordered variable forwarding
//! - **Dispatch** (`dispatcher`): blocking-pool offload with exactly-once completion
//! - **Channel and plugin** (`channel`, `plugin`): method routing, argument validation, error codes
//!
//! # Features
//!
//! - `tesseract`: native backend over `kreuzberg-tesseract`. Without it, supply your own [`EngineFactory`].

#![deny(unsafe_code)]

pub mod channel;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod image;
pub mod options;
pub mod plugin;
pub mod text;
pub mod types;

pub use channel::{
    CHANNEL_NAME, ChannelRegistrar, ExtractArguments, InProcessChannel, Method, MethodCall, MethodCallHandler,
    MethodResult, Response, callback_result, oneshot_result,
};
pub use config::BridgeConfig;
pub use dispatcher::{DispatchSettings, Dispatcher, PendingOutcome, run_pass};
pub use engine::{EngineFactory, EngineManager, EngineStats, OcrEngine};
pub use error::{BridgeError, ErrorCode, Result};
pub use options::{EngineOption, EngineOptions, apply_options};
pub use plugin::TesseractOcrPlugin;
pub use types::{ImageSource, OutputKind, PageSegMode, RecognitionOutcome, RecognitionRequest};

#[cfg(feature = "tesseract")]
pub use engine::tesseract::{TesseractEngine, TesseractEngineFactory};
