//! Shared fixtures: a scriptable fake engine, its factory, and image builders.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tesseract_bridge::image::DecodedImage;
use tesseract_bridge::{BridgeConfig, BridgeError, EngineFactory, OcrEngine, PageSegMode, Result, TesseractOcrPlugin};

/// One observable call on the fake backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create(String),
    Drop(String),
    SetVariable(String, String),
    SetPsm(i32),
    SetImage(u32, u32),
    SetImageFile(PathBuf),
    Utf8Text,
    HocrText,
    Clear,
}

/// State shared by a [`FakeFactory`] and every engine it creates.
#[derive(Default)]
pub struct FakeState {
    pub calls: Mutex<Vec<Call>>,
    pub created: AtomicUsize,
    pub dropped: AtomicUsize,
    live: AtomicUsize,
    pub max_live: AtomicUsize,
    active_passes: AtomicUsize,
    pub max_active_passes: AtomicUsize,
    fail_languages: Mutex<Vec<String>>,
    pass_delay: Mutex<Duration>,
    panic_next: AtomicBool,
    fail_next: AtomicBool,
}

impl FakeState {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn active_passes(&self) -> usize {
        self.active_passes.load(Ordering::SeqCst)
    }

    pub fn max_active_passes(&self) -> usize {
        self.max_active_passes.load(Ordering::SeqCst)
    }

    pub fn fail_language(&self, language: &str) {
        self.fail_languages.lock().push(language.to_string());
    }

    pub fn clear_failures(&self) {
        self.fail_languages.lock().clear();
    }

    pub fn set_pass_delay(&self, delay: Duration) {
        *self.pass_delay.lock() = delay;
    }

    pub fn panic_next_pass(&self) {
        self.panic_next.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_pass(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

pub struct FakeEngine {
    language: String,
    psm: i32,
    variables: Vec<(String, String)>,
    state: Arc<FakeState>,
}

impl FakeEngine {
    fn finish_pass(&mut self, call: Call) -> Result<()> {
        self.state.record(call);
        let delay = *self.state.pass_delay.lock();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        if self.state.panic_next.swap(false, Ordering::SeqCst) {
            panic!("fake engine aborted");
        }
        if self.state.fail_next.swap(false, Ordering::SeqCst) {
            return Err(BridgeError::recognition("fake engine returned no result"));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        let vars: Vec<String> = self.variables.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        format!("lang={} psm={} vars=[{}]", self.language, self.psm, vars.join(","))
    }
}

impl OcrEngine for FakeEngine {
    fn set_variable(&mut self, name: &str, value: &str) -> Result<()> {
        self.state.record(Call::SetVariable(name.to_string(), value.to_string()));
        self.variables.push((name.to_string(), value.to_string()));
        Ok(())
    }

    fn set_page_seg_mode(&mut self, mode: PageSegMode) -> Result<()> {
        self.state.record(Call::SetPsm(mode.as_i32()));
        self.psm = mode.as_i32();

        let active = self.state.active_passes.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_active_passes.fetch_max(active, Ordering::SeqCst);
        Ok(())
    }

    fn set_image(&mut self, image: &DecodedImage) -> Result<()> {
        self.state.record(Call::SetImage(image.width, image.height));
        Ok(())
    }

    fn set_image_file(&mut self, path: &Path) -> Result<()> {
        self.state.record(Call::SetImageFile(path.to_path_buf()));
        tesseract_bridge::image::load_file(path).map(|_| ())
    }

    fn utf8_text(&mut self) -> Result<String> {
        self.finish_pass(Call::Utf8Text)?;
        Ok(format!("{}\n", self.describe()))
    }

    fn hocr_text(&mut self) -> Result<String> {
        self.finish_pass(Call::HocrText)?;
        Ok(format!("<div class='ocr_page' title='{}'></div>", self.describe()))
    }

    fn clear(&mut self) -> Result<()> {
        self.state.record(Call::Clear);
        self.variables.clear();
        self.state.active_passes.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Drop for FakeEngine {
    fn drop(&mut self) {
        self.state.record(Call::Drop(self.language.clone()));
        self.state.live.fetch_sub(1, Ordering::SeqCst);
        self.state.dropped.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Clone, Default)]
pub struct FakeFactory {
    pub state: Arc<FakeState>,
}

impl FakeFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EngineFactory for FakeFactory {
    fn create(&self, _data_path: &Path, language: &str) -> Result<Box<dyn OcrEngine>> {
        if self.state.fail_languages.lock().iter().any(|l| l == language) {
            return Err(BridgeError::engine_init(format!("no traineddata for '{}'", language)));
        }

        self.state.record(Call::Create(language.to_string()));
        self.state.created.fetch_add(1, Ordering::SeqCst);
        let live = self.state.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_live.fetch_max(live, Ordering::SeqCst);

        Ok(Box::new(FakeEngine {
            language: language.to_string(),
            psm: -1,
            variables: Vec::new(),
            state: Arc::clone(&self.state),
        }))
    }

    fn name(&self) -> &str {
        "fake"
    }
}

pub fn test_config() -> BridgeConfig {
    BridgeConfig {
        tessdata_dir: Some(PathBuf::from("/fake/tessdata")),
        ..Default::default()
    }
}

/// A plugin over a fresh fake backend, running on the current runtime.
pub fn fake_plugin() -> (TesseractOcrPlugin, Arc<FakeState>) {
    let factory = FakeFactory::new();
    let state = Arc::clone(&factory.state);
    let plugin = TesseractOcrPlugin::new(tokio::runtime::Handle::current(), Arc::new(factory), test_config())
        .expect("test config is valid");
    (plugin, state)
}

/// Encode a `width` x `height` striped PNG in memory.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::ImageBuffer::from_fn(width, height, |x, _| {
        if x % 2 == 0 {
            image::Rgb([255u8, 255u8, 255u8])
        } else {
            image::Rgb([0u8, 0u8, 0u8])
        }
    });
    let mut buffer = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut buffer), image::ImageFormat::Png)
        .expect("encoding a PNG in memory");
    buffer
}

/// Write a PNG into `dir` and return its path.
pub fn png_file(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, png_bytes(width, height)).expect("writing PNG fixture");
    path
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
