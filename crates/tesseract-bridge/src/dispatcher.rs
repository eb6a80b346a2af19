//! Recognition dispatch.
//!
//! [`Dispatcher::submit`] offloads one recognition pass to the runtime's blocking pool and returns a
//! [`PendingOutcome`] that resolves exactly once. A pass that panics resolves to `RecognitionFailed`.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::engine::{EngineManager, OcrEngine};
use crate::error::{BridgeError, Result};
use crate::image::{ResolvedImage, resolve};
use crate::options::apply_options;
use crate::text::strip_control_characters;
use crate::types::{OutputKind, PageSegMode, RecognitionOutcome, RecognitionRequest};

/// Settings that apply to every pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSettings {
    pub default_mode: PageSegMode,
    pub strip_control_characters: bool,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            default_mode: PageSegMode::DEFAULT,
            strip_control_characters: true,
        }
    }
}

/// Scope of one recognition pass on a borrowed engine. Dropping it releases per-pass engine resources, also
/// when the pass unwinds.
struct RecognitionPass<'a> {
    engine: &'a mut dyn OcrEngine,
}

impl<'a> RecognitionPass<'a> {
    fn new(engine: &'a mut dyn OcrEngine) -> Self {
        Self { engine }
    }

    fn run(&mut self, image: &ResolvedImage, output: OutputKind) -> Result<String> {
        match image {
            ResolvedImage::Decoded(decoded) => self.engine.set_image(decoded)?,
            ResolvedImage::Path(path) => self.engine.set_image_file(path)?,
            ResolvedImage::Undecodable => return Ok(String::new()),
        }

        match output {
            OutputKind::StructuredMarkup => self.engine.hocr_text(),
            OutputKind::PlainText => self.engine.utf8_text(),
        }
    }
}

impl Drop for RecognitionPass<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.engine.clear() {
            tracing::warn!(error = %e, "Failed to release per-pass engine resources");
        }
    }
}

/// Run one complete pass on the calling thread: resolve, ensure engine, configure, recognize, clear.
///
/// The engine lock is held from ensure through clear.
pub fn run_pass(
    engines: &EngineManager,
    request: &RecognitionRequest,
    settings: DispatchSettings,
) -> Result<RecognitionOutcome> {
    let resolved = resolve(&request.image);

    let text = engines.with_engine(&request.language, &request.data_path, |engine| {
        apply_options(&mut *engine, &request.options, settings.default_mode)?;
        let mut pass = RecognitionPass::new(engine);
        pass.run(&resolved, request.output).map_err(|e| match e {
            e @ BridgeError::RecognitionFailed { .. } => e,
            other => BridgeError::recognition_with_source("Recognition pass failed", other),
        })
    })?;

    let text = if settings.strip_control_characters {
        strip_control_characters(&text)
    } else {
        text
    };

    tracing::debug!(
        language = %request.language,
        output = ?request.output,
        mime = request.output.mime_type(),
        chars = text.len(),
        "Recognition pass completed"
    );

    Ok(RecognitionOutcome {
        text,
        output: request.output,
    })
}

/// A recognition pass in flight. Resolves exactly once.
#[must_use = "a pending outcome must be awaited to observe the result"]
pub struct PendingOutcome {
    handle: JoinHandle<Result<RecognitionOutcome>>,
}

impl PendingOutcome {
    pub async fn wait(self) -> Result<RecognitionOutcome> {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "Recognition task panicked");
                Err(BridgeError::recognition_with_source("Recognition task panicked", e))
            }
        }
    }
}

/// Offloads recognition passes from the caller's thread.
#[derive(Clone)]
pub struct Dispatcher {
    engines: Arc<EngineManager>,
    runtime: Handle,
    settings: DispatchSettings,
}

impl Dispatcher {
    pub fn new(engines: Arc<EngineManager>, runtime: Handle, settings: DispatchSettings) -> Self {
        Self {
            engines,
            runtime,
            settings,
        }
    }

    pub fn engines(&self) -> &Arc<EngineManager> {
        &self.engines
    }

    pub fn runtime(&self) -> &Handle {
        &self.runtime
    }

    /// Start a pass on the blocking pool. Returns immediately.
    pub fn submit(&self, request: RecognitionRequest) -> PendingOutcome {
        let engines = Arc::clone(&self.engines);
        let settings = self.settings;
        let handle = self
            .runtime
            .spawn_blocking(move || run_pass(&engines, &request, settings));
        PendingOutcome { handle }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineFactory;
    use crate::engine::testing::{EngineCall, RecordingEngine};
    use crate::options::EngineOptions;
    use crate::types::ImageSource;
    use parking_lot::Mutex;
    use std::path::{Path, PathBuf};

    /// Hands out engines that push their calls into a shared log.
    #[derive(Default)]
    struct SharedLogFactory {
        log: Arc<Mutex<Vec<EngineCall>>>,
        fail_recognition: bool,
        panic_on_recognition: bool,
    }

    struct LoggedEngine {
        inner: RecordingEngine,
        log: Arc<Mutex<Vec<EngineCall>>>,
    }

    impl LoggedEngine {
        fn logged<R>(&mut self, f: impl FnOnce(&mut RecordingEngine) -> Result<R>) -> Result<R> {
            let result = f(&mut self.inner);
            self.log.lock().append(&mut self.inner.calls);
            result
        }
    }

    impl OcrEngine for LoggedEngine {
        fn set_variable(&mut self, name: &str, value: &str) -> Result<()> {
            self.logged(|e| e.set_variable(name, value))
        }
        fn set_page_seg_mode(&mut self, mode: PageSegMode) -> Result<()> {
            self.logged(|e| e.set_page_seg_mode(mode))
        }
        fn set_image(&mut self, image: &crate::image::DecodedImage) -> Result<()> {
            self.logged(|e| e.set_image(image))
        }
        fn set_image_file(&mut self, path: &Path) -> Result<()> {
            self.logged(|e| e.set_image_file(path))
        }
        fn utf8_text(&mut self) -> Result<String> {
            self.logged(|e| e.utf8_text())
        }
        fn hocr_text(&mut self) -> Result<String> {
            self.logged(|e| e.hocr_text())
        }
        fn clear(&mut self) -> Result<()> {
            self.logged(|e| e.clear())
        }
    }

    impl EngineFactory for SharedLogFactory {
        fn create(&self, _: &Path, _: &str) -> Result<Box<dyn OcrEngine>> {
            Ok(Box::new(LoggedEngine {
                inner: RecordingEngine {
                    fail_recognition: self.fail_recognition,
                    panic_on_recognition: self.panic_on_recognition,
                    ..Default::default()
                },
                log: Arc::clone(&self.log),
            }))
        }
    }

    fn png_bytes() -> Vec<u8> {
        let img = ::image::RgbImage::from_pixel(8, 8, ::image::Rgb([255, 255, 255]));
        let mut buffer = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut buffer), ::image::ImageFormat::Png)
            .unwrap();
        buffer
    }

    fn request(image: ImageSource, output: OutputKind) -> RecognitionRequest {
        RecognitionRequest {
            language: "eng".to_string(),
            data_path: PathBuf::from("/tessdata"),
            image,
            options: EngineOptions::new(),
            output,
        }
    }

    #[test]
    fn test_run_pass_plain_text() {
        let factory = Arc::new(SharedLogFactory::default());
        let engines = EngineManager::new(factory.clone());

        let outcome = run_pass(
            &engines,
            &request(ImageSource::Bytes(png_bytes()), OutputKind::PlainText),
            DispatchSettings::default(),
        )
        .unwrap();

        assert_eq!(outcome.text, "plain text\n");
        assert_eq!(
            *factory.log.lock(),
            vec![
                EngineCall::SetPageSegMode(PageSegMode::AutoOsd),
                EngineCall::SetImage(8, 8),
                EngineCall::Utf8Text,
                EngineCall::Clear,
            ]
        );
    }

    #[test]
    fn test_run_pass_hocr() {
        let engines = EngineManager::new(Arc::new(SharedLogFactory::default()));
        let outcome = run_pass(
            &engines,
            &request(ImageSource::Bytes(png_bytes()), OutputKind::StructuredMarkup),
            DispatchSettings::default(),
        )
        .unwrap();
        assert!(outcome.text.contains("ocr_page"));
        assert_eq!(outcome.output, OutputKind::StructuredMarkup);
    }

    #[test]
    fn test_undecodable_bytes_yield_empty_text() {
        let factory = Arc::new(SharedLogFactory::default());
        let engines = EngineManager::new(factory.clone());

        let outcome = run_pass(
            &engines,
            &request(ImageSource::Bytes(vec![9, 9, 9]), OutputKind::PlainText),
            DispatchSettings::default(),
        )
        .unwrap();

        assert_eq!(outcome.text, "");
        assert!(!factory.log.lock().contains(&EngineCall::Utf8Text));
    }

    #[test]
    fn test_missing_path_is_recognition_failure_and_clears() {
        let factory = Arc::new(SharedLogFactory::default());
        let engines = EngineManager::new(factory.clone());

        let err = run_pass(
            &engines,
            &request(ImageSource::Path(PathBuf::from("/nonexistent.png")), OutputKind::PlainText),
            DispatchSettings::default(),
        )
        .unwrap_err();

        assert!(matches!(err, BridgeError::RecognitionFailed { .. }));
        assert_eq!(factory.log.lock().last(), Some(&EngineCall::Clear));
        assert!(engines.is_initialized());
    }

    #[test]
    fn test_control_characters_stripped_when_enabled() {
        struct NoisyEngine;
        impl OcrEngine for NoisyEngine {
            fn set_variable(&mut self, _: &str, _: &str) -> Result<()> {
                Ok(())
            }
            fn set_page_seg_mode(&mut self, _: PageSegMode) -> Result<()> {
                Ok(())
            }
            fn set_image(&mut self, _: &crate::image::DecodedImage) -> Result<()> {
                Ok(())
            }
            fn set_image_file(&mut self, _: &Path) -> Result<()> {
                Ok(())
            }
            fn utf8_text(&mut self) -> Result<String> {
                Ok("a\x0cb\n".to_string())
            }
            fn hocr_text(&mut self) -> Result<String> {
                Ok(String::new())
            }
            fn clear(&mut self) -> Result<()> {
                Ok(())
            }
        }
        struct NoisyFactory;
        impl EngineFactory for NoisyFactory {
            fn create(&self, _: &Path, _: &str) -> Result<Box<dyn OcrEngine>> {
                Ok(Box::new(NoisyEngine))
            }
        }

        let engines = EngineManager::new(Arc::new(NoisyFactory));
        let req = request(ImageSource::Path(PathBuf::from("x.png")), OutputKind::PlainText);

        let stripped = run_pass(&engines, &req, DispatchSettings::default()).unwrap();
        assert_eq!(stripped.text, "ab\n");

        let raw = run_pass(
            &engines,
            &req,
            DispatchSettings {
                strip_control_characters: false,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(raw.text, "a\x0cb\n");
    }

    #[tokio::test]
    async fn test_submit_resolves_once() {
        let engines = Arc::new(EngineManager::new(Arc::new(SharedLogFactory::default())));
        let dispatcher = Dispatcher::new(engines, Handle::current(), DispatchSettings::default());

        let pending = dispatcher.submit(request(ImageSource::Bytes(png_bytes()), OutputKind::PlainText));
        let outcome = pending.wait().await.unwrap();
        assert_eq!(outcome.text, "plain text\n");
    }

    #[tokio::test]
    async fn test_submit_panic_becomes_recognition_failure() {
        let factory = Arc::new(SharedLogFactory {
            panic_on_recognition: true,
            ..Default::default()
        });
        let engines = Arc::new(EngineManager::new(factory.clone()));
        let dispatcher = Dispatcher::new(Arc::clone(&engines), Handle::current(), DispatchSettings::default());

        let err = dispatcher
            .submit(request(ImageSource::Bytes(png_bytes()), OutputKind::PlainText))
            .wait()
            .await
            .unwrap_err();

        assert!(matches!(err, BridgeError::RecognitionFailed { .. }));
        assert_eq!(factory.log.lock().last(), Some(&EngineCall::Clear));
        assert!(engines.is_initialized());
    }
}
