//! Named-method request channel.
//!
//! The transport between the host application and the bridge is modeled as a channel of [`MethodCall`]s, each
//! answered through a [`MethodResult`] that is consumed on first use. The host installs handlers through a
//! [`ChannelRegistrar`]; [`InProcessChannel`] is a registrar that routes calls within the process.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tokio::sync::oneshot;

use crate::config::BridgeConfig;
use crate::error::{BridgeError, ErrorCode, Result};
use crate::options::EngineOptions;
use crate::types::{ImageSource, OutputKind, RecognitionOutcome, RecognitionRequest};

/// Channel name the plugin registers under.
pub const CHANNEL_NAME: &str = "tesseract_ocr";

/// Methods understood by the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    ExtractText,
    ExtractHocr,
}

impl Method {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "extractText" => Some(Method::ExtractText),
            "extractHocr" => Some(Method::ExtractHocr),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::ExtractText => "extractText",
            Method::ExtractHocr => "extractHocr",
        }
    }

    pub fn output_kind(&self) -> OutputKind {
        match self {
            Method::ExtractText => OutputKind::PlainText,
            Method::ExtractHocr => OutputKind::StructuredMarkup,
        }
    }
}

/// One incoming call: a method name plus its arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub arguments: Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }
}

/// The reply to one [`MethodCall`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    Success { result: String },
    Error { code: String, message: String },
    NotImplemented,
}

impl Response {
    pub fn success(result: impl Into<String>) -> Self {
        Response::Success { result: result.into() }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success { .. })
    }

    /// The error code string, if this is an error reply.
    pub fn error_code(&self) -> Option<&str> {
        match self {
            Response::Error { code, .. } => Some(code),
            _ => None,
        }
    }
}

impl From<BridgeError> for Response {
    fn from(error: BridgeError) -> Self {
        let code = error.code();
        if code == ErrorCode::Internal {
            tracing::error!(error = %error, "Internal error reached the request channel");
        }
        Response::Error {
            code: code.as_str().to_string(),
            message: error.to_string(),
        }
    }
}

impl From<Result<RecognitionOutcome>> for Response {
    fn from(result: Result<RecognitionOutcome>) -> Self {
        match result {
            Ok(outcome) => Response::Success { result: outcome.text },
            Err(e) => e.into(),
        }
    }
}

/// Sink for the reply to one call. Sending consumes the sink, so a call can be answered at most once.
pub trait MethodResult: Send {
    fn send(self: Box<Self>, response: Response);
}

struct CallbackResult<F> {
    callback: F,
}

impl<F> MethodResult for CallbackResult<F>
where
    F: FnOnce(Response) + Send,
{
    fn send(self: Box<Self>, response: Response) {
        (self.callback)(response)
    }
}

/// Wrap a closure as a [`MethodResult`].
pub fn callback_result<F>(callback: F) -> Box<dyn MethodResult>
where
    F: FnOnce(Response) + Send + 'static,
{
    Box::new(CallbackResult { callback })
}

struct OneshotResult {
    sender: oneshot::Sender<Response>,
}

impl MethodResult for OneshotResult {
    fn send(self: Box<Self>, response: Response) {
        if self.sender.send(response).is_err() {
            tracing::debug!("Caller stopped waiting for the response, dropping it");
        }
    }
}

/// A [`MethodResult`] paired with the receiver that observes it.
pub fn oneshot_result() -> (Box<dyn MethodResult>, oneshot::Receiver<Response>) {
    let (sender, receiver) = oneshot::channel();
    (Box::new(OneshotResult { sender }), receiver)
}

/// Holds a [`MethodResult`] across an async hop and answers `RECOGNITION_FAILED` if dropped unsent.
///
/// A task dropped by a shutting-down runtime still answers its caller exactly once.
pub(crate) struct ResponseGuard {
    result: Option<Box<dyn MethodResult>>,
}

impl ResponseGuard {
    pub(crate) fn new(result: Box<dyn MethodResult>) -> Self {
        Self { result: Some(result) }
    }

    pub(crate) fn send(mut self, response: Response) {
        if let Some(result) = self.result.take() {
            result.send(response);
        }
    }
}

impl Drop for ResponseGuard {
    fn drop(&mut self) {
        if let Some(result) = self.result.take() {
            tracing::warn!("Recognition task dropped before responding, answering with an error");
            result.send(BridgeError::recognition("Recognition task was dropped before responding").into());
        }
    }
}

/// Receives calls for one channel.
pub trait MethodCallHandler: Send + Sync {
    /// Handle `call`. Implementations must return promptly and answer `result` exactly once, possibly later from
    /// another thread.
    fn on_method_call(&self, call: MethodCall, result: Box<dyn MethodResult>);
}

/// Host-side handler table. `None` removes the handler.
pub trait ChannelRegistrar: Send + Sync {
    fn set_method_call_handler(&self, channel: &str, handler: Option<Arc<dyn MethodCallHandler>>);
}

/// Registrar that dispatches calls to handlers in the same process.
#[derive(Default)]
pub struct InProcessChannel {
    handlers: RwLock<HashMap<String, Arc<dyn MethodCallHandler>>>,
}

impl InProcessChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_handler(&self, channel: &str) -> bool {
        self.handlers.read().contains_key(channel)
    }

    /// Send `call` on `channel`. Calls on a channel without a handler answer [`Response::NotImplemented`].
    pub fn invoke(&self, channel: &str, call: MethodCall) -> oneshot::Receiver<Response> {
        let (result, receiver) = oneshot_result();
        let handler = self.handlers.read().get(channel).cloned();
        match handler {
            Some(handler) => handler.on_method_call(call, result),
            None => {
                tracing::debug!(channel, method = %call.method, "No handler registered");
                result.send(Response::NotImplemented);
            }
        }
        receiver
    }
}

impl ChannelRegistrar for InProcessChannel {
    fn set_method_call_handler(&self, channel: &str, handler: Option<Arc<dyn MethodCallHandler>>) {
        let mut handlers = self.handlers.write();
        match handler {
            Some(handler) => {
                handlers.insert(channel.to_string(), handler);
            }
            None => {
                handlers.remove(channel);
            }
        }
    }
}

/// Arguments of `extractText` / `extractHocr`.
///
/// `imageBytes` accepts either a base64 string or an array of byte values. `args` values may be strings, numbers
/// or booleans; non-strings are stringified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractArguments {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tess_data: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none", with = "image_bytes")]
    pub image_bytes: Option<Vec<u8>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_args")]
    pub args: Option<IndexMap<String, String>>,
}

impl ExtractArguments {
    /// Interpret a call's raw arguments. A missing (`null`) argument value is treated as an empty object.
    pub fn from_value(arguments: Value) -> Result<Self> {
        match arguments {
            Value::Null => Ok(Self::default()),
            Value::Object(_) => serde_json::from_value(arguments)
                .map_err(|e| BridgeError::invalid_arguments_with_source("Malformed call arguments", e)),
            other => Err(BridgeError::invalid_arguments(format!(
                "Arguments must be an object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Validate and build the request for `output`, filling in omitted fields from `config`.
    ///
    /// Check order: image source, then options, then the data directory. Nothing here touches the engine.
    pub fn into_request(self, output: OutputKind, config: &BridgeConfig) -> Result<RecognitionRequest> {
        let image = ImageSource::from_parts(self.image_path, self.image_bytes)?;

        let options = match &self.args {
            Some(args) => EngineOptions::from_args(args)?,
            None => EngineOptions::new(),
        };

        let data_path = config.resolve_tessdata(self.tess_data.as_deref()).ok_or_else(|| {
            BridgeError::engine_init("No tessdata directory given and none found (set tessData or TESSDATA_PREFIX)")
        })?;

        Ok(RecognitionRequest {
            language: self.language.unwrap_or_else(|| config.default_language.clone()),
            data_path,
            image,
            options,
            output,
        })
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

mod image_bytes {
    use base64::prelude::*;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Base64(String),
        Raw(Vec<u8>),
    }

    pub fn serialize<S: Serializer>(bytes: &Option<Vec<u8>>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match bytes {
            Some(bytes) => serializer.serialize_str(&BASE64_STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<Vec<u8>>, D::Error> {
        match Option::<Repr>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Repr::Raw(bytes)) => Ok(Some(bytes)),
            Some(Repr::Base64(encoded)) => BASE64_STANDARD
                .decode(encoded.trim())
                .map(Some)
                .map_err(|e| {
                    <D::Error as serde::de::Error>::custom(format!("imageBytes is not valid base64: {}", e))
                }),
        }
    }
}

fn lenient_args<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<IndexMap<String, String>>, D::Error> {
    let Some(raw) = Option::<IndexMap<String, Value>>::deserialize(deserializer)? else {
        return Ok(None);
    };

    raw.into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                other => {
                    return Err(<D::Error as serde::de::Error>::custom(format!(
                        "args value for '{}' must be a string, got {}",
                        key,
                        json_type_name(&other)
                    )));
                }
            };
            Ok((key, value))
        })
        .collect::<std::result::Result<IndexMap<_, _>, _>>()
        .map(Some)
}
