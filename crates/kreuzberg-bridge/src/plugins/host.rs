//! Adapters that turn host-language callbacks into plugins.
//!
//! A host binding hands over a closure that speaks wire JSON. The closure
//! returns an [`Awaitable`]: event-loop hosts return a pending future that
//! resolves when their promise settles, thread-based hosts return a ready value.
//! Adapters await only when the value is pending.
//!
//! Host errors arrive as plain messages and are mapped to the bridge's error
//! kinds here: post-processor failures become `Processor`, validator failures
//! `Validation`, OCR failures `Ocr`.

use crate::core::config::ExtractionConfig;
use crate::payload::{OcrArgument, normalize_ocr_input};
use crate::plugins::{OcrBackend, Plugin, PostProcessor, ProcessingStage, Validator};
use crate::types::{ExtractionResult, OcrResult};
use crate::{KreuzbergError, Result, wire};
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Outcome of a host callback: a payload or an error message.
pub type HostResult<T> = std::result::Result<T, String>;

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// A callback result that is either available now or later.
pub enum Awaitable<T> {
    Ready(T),
    Pending(BoxFuture<T>),
}

impl<T> Awaitable<T> {
    pub fn ready(value: T) -> Self {
        Awaitable::Ready(value)
    }

    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Awaitable::Pending(Box::pin(future))
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Awaitable::Ready(_))
    }

    pub async fn resolve(self) -> T {
        match self {
            Awaitable::Ready(value) => value,
            Awaitable::Pending(future) => future.await,
        }
    }
}

/// Host post-processor callback: wire JSON in, wire JSON out.
pub type ProcessCallback = Arc<dyn Fn(String) -> Awaitable<HostResult<String>> + Send + Sync>;

/// Host validator callback: wire JSON in, `Err(message)` to reject.
pub type ValidateCallback = Arc<dyn Fn(String) -> Awaitable<HostResult<()>> + Send + Sync>;

/// Host predicate deciding whether a validator applies to a wire result.
pub type ShouldValidateCallback = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Host OCR callback: `(image bytes, language)` in, wire OCR JSON out.
pub type OcrCallback = Arc<dyn Fn(Vec<u8>, String) -> Awaitable<HostResult<String>> + Send + Sync>;

const HOST_PLUGIN_VERSION: &str = "1.0.0";

/// Post-processor backed by a host callback.
pub struct HostPostProcessor {
    name: String,
    stage: ProcessingStage,
    callback: ProcessCallback,
}

impl HostPostProcessor {
    pub fn new(name: impl Into<String>, callback: ProcessCallback) -> Self {
        Self {
            name: name.into(),
            stage: ProcessingStage::Middle,
            callback,
        }
    }

    pub fn with_stage(mut self, stage: ProcessingStage) -> Self {
        self.stage = stage;
        self
    }
}

impl Plugin for HostPostProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> String {
        HOST_PLUGIN_VERSION.to_string()
    }
}

#[async_trait]
impl PostProcessor for HostPostProcessor {
    async fn process(&self, result: &mut ExtractionResult, _config: &ExtractionConfig) -> Result<()> {
        let payload = wire::encode(result)?;
        let reply = (self.callback)(payload)
            .resolve()
            .await
            .map_err(|message| KreuzbergError::processor(&self.name, message))?;

        *result = wire::decode(&reply)?;
        Ok(())
    }

    fn processing_stage(&self) -> ProcessingStage {
        self.stage
    }
}

/// Validator backed by a host callback.
pub struct HostValidator {
    name: String,
    priority: i32,
    callback: ValidateCallback,
    should_validate: Option<ShouldValidateCallback>,
}

impl HostValidator {
    pub fn new(name: impl Into<String>, callback: ValidateCallback) -> Self {
        Self {
            name: name.into(),
            priority: crate::plugins::validator::DEFAULT_PRIORITY,
            callback,
            should_validate: None,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_should_validate(mut self, predicate: ShouldValidateCallback) -> Self {
        self.should_validate = Some(predicate);
        self
    }
}

impl Plugin for HostValidator {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> String {
        HOST_PLUGIN_VERSION.to_string()
    }
}

#[async_trait]
impl Validator for HostValidator {
    async fn validate(&self, result: &ExtractionResult, _config: &ExtractionConfig) -> Result<()> {
        let payload = wire::encode(result)?;
        (self.callback)(payload)
            .resolve()
            .await
            .map_err(KreuzbergError::validation)
    }

    fn should_validate(&self, result: &ExtractionResult, _config: &ExtractionConfig) -> bool {
        let Some(predicate) = &self.should_validate else {
            return true;
        };
        match wire::encode(result) {
            Ok(payload) => predicate(&payload),
            Err(e) => {
                tracing::warn!(validator = %self.name, error = %e, "Could not encode result for should_validate");
                true
            }
        }
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

/// OCR backend backed by a host callback.
pub struct HostOcrBackend {
    name: String,
    languages: Vec<String>,
    callback: OcrCallback,
}

impl HostOcrBackend {
    pub fn new(name: impl Into<String>, languages: Vec<String>, callback: OcrCallback) -> Self {
        Self {
            name: name.into(),
            languages,
            callback,
        }
    }
}

impl Plugin for HostOcrBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> String {
        HOST_PLUGIN_VERSION.to_string()
    }
}

#[async_trait]
impl OcrBackend for HostOcrBackend {
    async fn process_image(&self, image_bytes: &[u8], language: &str) -> Result<OcrResult> {
        let reply = (self.callback)(image_bytes.to_vec(), language.to_string())
            .resolve()
            .await
            .map_err(KreuzbergError::ocr)?;
        wire::decode_ocr_result(&reply)
    }

    fn supported_languages(&self) -> Vec<String> {
        self.languages.clone()
    }
}

/// Entry point for raw OCR calls arriving from a host.
///
/// Normalizes the argument shape, runs the backend, and returns the wire
/// encoding of its result.
pub struct OcrBackendAdapter {
    backend: Arc<dyn OcrBackend>,
    debug_payloads: bool,
}

impl OcrBackendAdapter {
    pub fn new(backend: Arc<dyn OcrBackend>) -> Self {
        Self {
            backend,
            debug_payloads: false,
        }
    }

    pub fn with_debug_payloads(mut self, debug: bool) -> Self {
        self.debug_payloads = debug;
        self
    }

    pub async fn process(&self, payload: OcrArgument, language: Option<OcrArgument>) -> Result<OcrResult> {
        let input = normalize_ocr_input(payload, language, self.debug_payloads)?;
        self.backend
            .process_image(&input.bytes, &input.language)
            .await
            .map_err(|e| match e {
                KreuzbergError::Ocr { .. } => e,
                other => KreuzbergError::ocr_with_source(
                    format!("OCR backend '{}' failed: {}", self.backend.name(), other),
                    other,
                ),
            })
    }

    pub async fn process_to_wire(&self, payload: OcrArgument, language: Option<OcrArgument>) -> Result<String> {
        let result = self.process(payload, language).await?;
        wire::encode_ocr_result(&result)
    }
}
