//! Single-slot engine cache.
//!
//! At most one engine handle is alive at a time. It is reused while requests keep asking for the same language
//! and replaced (old handle dropped first) when the language changes. All access goes through one lock held for
//! a whole ensure/configure/recognize/clear sequence, since the handle is not reentrant.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::Serialize;

use super::validation::validate_language_code;
use super::{EngineFactory, OcrEngine};
use crate::error::{BridgeError, Result};

#[derive(Default)]
struct EngineState {
    handle: Option<Box<dyn OcrEngine>>,
    bound_language: String,
    closed: bool,
}

impl EngineState {
    fn needs_init(&self, language: &str) -> bool {
        self.handle.is_none() || self.bound_language != language
    }
}

/// Counters describing the engine slot's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub initializations: u64,
    pub teardowns: u64,
    pub bound_language: Option<String>,
}

/// Owner of the process-wide engine handle.
///
/// Construct one per host attachment and share it by `Arc`.
pub struct EngineManager {
    factory: Arc<dyn EngineFactory>,
    state: Mutex<EngineState>,
    initializations: AtomicU64,
    teardowns: AtomicU64,
}

impl EngineManager {
    pub fn new(factory: Arc<dyn EngineFactory>) -> Self {
        Self {
            factory,
            state: Mutex::new(EngineState::default()),
            initializations: AtomicU64::new(0),
            teardowns: AtomicU64::new(0),
        }
    }

    /// Run `f` with exclusive access to an engine bound to `language`, initializing one first if needed.
    ///
    /// The lock is held until `f` returns, so concurrent callers are serialized.
    pub fn with_engine<R>(
        &self,
        language: &str,
        data_path: &Path,
        f: impl FnOnce(&mut dyn OcrEngine) -> Result<R>,
    ) -> Result<R> {
        let mut state = self.state.lock();
        let engine = self.ensure_locked(&mut state, language, data_path)?;
        f(engine)
    }

    /// Make sure an engine bound to `language` exists, without running anything on it.
    pub fn ensure_engine(&self, language: &str, data_path: &Path) -> Result<()> {
        let mut state = self.state.lock();
        self.ensure_locked(&mut state, language, data_path).map(|_| ())
    }

    fn ensure_locked<'a>(
        &self,
        state: &'a mut EngineState,
        language: &str,
        data_path: &Path,
    ) -> Result<&'a mut (dyn OcrEngine + 'static)> {
        if state.closed {
            return Err(BridgeError::engine_init("OCR engine is shut down (plugin detached)"));
        }

        if state.needs_init(language) {
            // The previous handle must be gone before a replacement is created, even if the new language is rejected.
            self.teardown_locked(state);
            validate_language_code(language)?;

            tracing::info!(
                backend = self.factory.name(),
                language,
                data_path = %data_path.display(),
                "Initializing OCR engine"
            );
            let handle = self.factory.create(data_path, language).map_err(|e| match e {
                e @ BridgeError::EngineInitFailed { .. } => e,
                other => BridgeError::engine_init_with_source(
                    format!("Failed to initialize language '{}'", language),
                    other,
                ),
            })?;

            self.initializations.fetch_add(1, Ordering::Relaxed);
            state.handle = Some(handle);
            state.bound_language = language.to_string();
        } else {
            tracing::debug!(language, "Reusing OCR engine");
        }

        state
            .handle
            .as_deref_mut()
            .ok_or_else(|| BridgeError::engine_init("Engine slot empty after initialization"))
    }

    fn teardown_locked(&self, state: &mut EngineState) {
        if let Some(handle) = state.handle.take() {
            tracing::info!(language = %state.bound_language, "Releasing OCR engine");
            drop(handle);
            self.teardowns.fetch_add(1, Ordering::Relaxed);
        }
        state.bound_language.clear();
    }

    /// Drop the engine handle if one exists. Waits for an in-flight pass to finish. Safe to call repeatedly.
    pub fn release(&self) {
        let mut state = self.state.lock();
        self.teardown_locked(&mut state);
    }

    /// Drop the engine handle and refuse further passes until [`reopen`](Self::reopen) is called.
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        self.teardown_locked(&mut state);
    }

    /// Accept passes again after [`shutdown`](Self::shutdown). The engine is created lazily on the next pass.
    pub fn reopen(&self) {
        self.state.lock().closed = false;
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().handle.is_some()
    }

    pub fn bound_language(&self) -> Option<String> {
        let state = self.state.lock();
        state.handle.as_ref().map(|_| state.bound_language.clone())
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            initializations: self.initializations.load(Ordering::Relaxed),
            teardowns: self.teardowns.load(Ordering::Relaxed),
            bound_language: self.bound_language(),
        }
    }
}
