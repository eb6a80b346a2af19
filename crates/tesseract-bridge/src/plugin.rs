//! Host-facing plugin.
//!
//! [`TesseractOcrPlugin`] routes `extractText` / `extractHocr` calls from a [`ChannelRegistrar`] into the
//! recognition pipeline. Argument validation happens on the calling thread and is answered immediately; the
//! recognition pass itself runs on the runtime's blocking pool and answers when it completes.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;

use crate::channel::{
    CHANNEL_NAME, ChannelRegistrar, ExtractArguments, Method, MethodCall, MethodCallHandler, MethodResult, Response,
    ResponseGuard, oneshot_result,
};
use crate::config::BridgeConfig;
use crate::dispatcher::{DispatchSettings, Dispatcher};
use crate::engine::{EngineFactory, EngineManager};
use crate::error::{BridgeError, Result};
use crate::types::RecognitionRequest;

struct PluginInner {
    config: BridgeConfig,
    dispatcher: Dispatcher,
}

impl PluginInner {
    fn prepare(&self, method: Method, call: MethodCall) -> Result<RecognitionRequest> {
        ExtractArguments::from_value(call.arguments)?.into_request(method.output_kind(), &self.config)
    }
}

impl MethodCallHandler for PluginInner {
    fn on_method_call(&self, call: MethodCall, result: Box<dyn MethodResult>) {
        let Some(method) = Method::from_name(&call.method) else {
            tracing::debug!(method = %call.method, "Unknown method");
            result.send(Response::NotImplemented);
            return;
        };

        let request = match self.prepare(method, call) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!(method = method.as_str(), error = %e, "Rejected call before dispatch");
                result.send(e.into());
                return;
            }
        };

        tracing::debug!(
            method = method.as_str(),
            language = %request.language,
            "Dispatching recognition pass"
        );
        let result = ResponseGuard::new(result);
        let pending = self.dispatcher.submit(request);
        self.dispatcher.runtime().spawn(async move {
            result.send(Response::from(pending.wait().await));
        });
    }
}

/// The OCR bridge as seen by a host application.
pub struct TesseractOcrPlugin {
    inner: Arc<PluginInner>,
    registrar: Mutex<Option<Arc<dyn ChannelRegistrar>>>,
}

impl TesseractOcrPlugin {
    /// Create a detached plugin. Recognition passes run on `runtime`'s blocking pool.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Config` if `config` fails validation.
    pub fn new(runtime: Handle, factory: Arc<dyn EngineFactory>, config: BridgeConfig) -> Result<Self> {
        config.validate()?;

        let settings = DispatchSettings {
            default_mode: config.page_seg_mode(),
            strip_control_characters: config.strip_control_characters,
        };
        let engines = Arc::new(EngineManager::new(factory));
        let dispatcher = Dispatcher::new(engines, runtime, settings);

        Ok(Self {
            inner: Arc::new(PluginInner { config, dispatcher }),
            registrar: Mutex::new(None),
        })
    }

    /// Create a plugin backed by the native Tesseract engine.
    #[cfg(feature = "tesseract")]
    pub fn with_tesseract(runtime: Handle, config: BridgeConfig) -> Result<Self> {
        let factory = crate::engine::tesseract::TesseractEngineFactory::new(config.validate_traineddata);
        Self::new(runtime, Arc::new(factory), config)
    }

    /// Install the method handler on `registrar`. Attaching again moves the plugin to the new registrar.
    ///
    /// Reopens the engine if the plugin was detached earlier.
    pub fn attach(&self, registrar: Arc<dyn ChannelRegistrar>) {
        self.inner.dispatcher.engines().reopen();
        let mut slot = self.registrar.lock();
        if let Some(previous) = slot.take() {
            previous.set_method_call_handler(CHANNEL_NAME, None);
        }

        let handler: Arc<dyn MethodCallHandler> = self.inner.clone();
        registrar.set_method_call_handler(CHANNEL_NAME, Some(handler));
        *slot = Some(registrar);
        tracing::info!(channel = CHANNEL_NAME, "Attached OCR plugin");
    }

    /// Remove the method handler and shut the engine down.
    ///
    /// Blocks until an in-flight recognition pass finishes. Later calls answer `ENGINE_INIT_FAILED` without creating
    /// an engine until the plugin is attached again. Safe to call when never attached and safe to repeat.
    pub fn detach(&self) {
        if let Some(registrar) = self.registrar.lock().take() {
            registrar.set_method_call_handler(CHANNEL_NAME, None);
            tracing::info!(channel = CHANNEL_NAME, "Detached OCR plugin");
        }
        self.inner.dispatcher.engines().shutdown();
    }

    pub fn is_attached(&self) -> bool {
        self.registrar.lock().is_some()
    }

    /// Handle one call directly, without going through a registrar.
    pub fn handle_method_call(&self, call: MethodCall, result: Box<dyn MethodResult>) {
        self.inner.on_method_call(call, result);
    }

    /// Handle one call and wait for its response.
    pub async fn call(&self, call: MethodCall) -> Response {
        let (result, receiver) = oneshot_result();
        self.handle_method_call(call, result);
        receiver.await.unwrap_or_else(|_| {
            BridgeError::recognition("Recognition task was dropped before responding (runtime shutting down)").into()
        })
    }

    pub fn engines(&self) -> &Arc<EngineManager> {
        self.inner.dispatcher.engines()
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }
}
