//! Extraction entry points.
//!
//! [`ExtractionCore`] drives a single extraction end to end:
//!
//! 1. Image inputs with OCR configured go to an OCR backend through the adapter;
//!    everything else goes to the first extractor that supports the MIME type.
//! 2. The resulting [`ExtractionResult`] runs through the plugin pipeline.
//!
//! Batch operations run items concurrently, bounded by
//! `max_concurrent_extractions`, and return one entry per input in input order.
//! A failed item becomes an error-flavored entry; I/O errors abort the batch.
//!
//! The free functions at the bottom use the process-wide registry.

use crate::core::config::ExtractionConfig;
use crate::core::pipeline::run_pipeline;
use crate::extractors::PlainTextExtractor;
use crate::payload::OcrArgument;
use crate::plugins::{DocumentExtractor, OcrBackend, OcrBackendAdapter, PluginRegistry, global_registry};
use crate::types::ExtractionResult;
use crate::{KreuzbergError, Result};
use once_cell::sync::Lazy;
use std::sync::Arc;

/// Global Tokio runtime for synchronous operations.
///
/// Created once on first use and reused by every `*_sync` call. Creating a
/// runtime per call would dominate the cost of small extractions.
///
/// # Panics
///
/// Panics if the runtime cannot be created (out of threads or file handles).
/// Nothing in the sync API can work without it.
static GLOBAL_RUNTIME: Lazy<tokio::runtime::Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to create global Tokio runtime - system may be out of resources")
});

/// Extraction driver bound to a plugin registry.
#[derive(Clone)]
pub struct ExtractionCore {
    registry: Arc<PluginRegistry>,
    extractors: Arc<Vec<Arc<dyn DocumentExtractor>>>,
}

impl ExtractionCore {
    /// Create a core over `registry` with the built-in text extractor.
    pub fn new(registry: Arc<PluginRegistry>) -> Self {
        let text: Arc<dyn DocumentExtractor> = Arc::new(PlainTextExtractor::new());
        Self {
            registry,
            extractors: Arc::new(vec![text]),
        }
    }

    /// Create a core over the process-wide registry.
    pub fn with_global_registry() -> Self {
        Self::new(global_registry())
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// Add an extractor. Later extractors take precedence over earlier ones.
    pub fn with_extractor(mut self, extractor: Arc<dyn DocumentExtractor>) -> Self {
        Arc::make_mut(&mut self.extractors).insert(0, extractor);
        self
    }

    fn extractor_for(&self, mime_type: &str) -> Result<Arc<dyn DocumentExtractor>> {
        self.extractors
            .iter()
            .find(|extractor| extractor.supports(mime_type))
            .cloned()
            .ok_or_else(|| KreuzbergError::UnsupportedFormat(mime_type.to_string()))
    }

    fn ocr_backend_for(&self, config: &ExtractionConfig) -> Result<Option<(Arc<dyn OcrBackend>, String)>> {
        let Some(ocr) = &config.ocr else {
            return Ok(None);
        };

        let backend = match &ocr.backend {
            Some(name) => self.registry.get_ocr_backend(name)?,
            None => self.registry.get_ocr_backend_for_language(&ocr.language)?,
        };
        Ok(Some((backend, ocr.language.clone())))
    }

    /// Extract one document and run the plugin pipeline over it.
    ///
    /// # Errors
    ///
    /// - `UnsupportedFormat` if no extractor handles `mime_type`
    /// - `Ocr` / `NotRegistered` from OCR routing for image inputs
    /// - `Validation` from the first failing validator
    #[tracing::instrument(skip(self, content, config), fields(size_bytes = content.len()))]
    pub async fn extract_bytes(
        &self,
        content: &[u8],
        mime_type: &str,
        config: &ExtractionConfig,
    ) -> Result<ExtractionResult> {
        let ocr_route = if mime_type.starts_with("image/") {
            self.ocr_backend_for(config)?
        } else {
            None
        };

        let result = match ocr_route {
            Some((backend, language)) => {
                tracing::debug!(backend = backend.name(), language = %language, "Routing image to OCR backend");
                let adapter = OcrBackendAdapter::new(backend).with_debug_payloads(config.debug_payloads);
                let ocr_result = adapter
                    .process(OcrArgument::Bytes(content.to_vec()), Some(OcrArgument::Text(language)))
                    .await?;
                ExtractionResult::from(ocr_result)
            }
            None => {
                let extractor = self.extractor_for(mime_type)?;
                extractor.extract_bytes(content, mime_type, config).await?
            }
        };

        run_pipeline(result, config, &self.registry).await
    }

    /// Extract many documents concurrently.
    ///
    /// Returns one result per input in input order. A failed item yields an entry
    /// with `content = "Error: ..."` and `metadata.error = {error_type, message}`.
    ///
    /// # Errors
    ///
    /// Only I/O errors and task panics abort the whole batch.
    pub async fn batch_extract_bytes(
        &self,
        contents: Vec<(Vec<u8>, String)>,
        config: &ExtractionConfig,
    ) -> Result<Vec<ExtractionResult>> {
        use tokio::sync::Semaphore;
        use tokio::task::JoinSet;

        if contents.is_empty() {
            return Ok(vec![]);
        }

        let config = Arc::new(config.clone());
        let semaphore = Arc::new(Semaphore::new(config.max_concurrency()));
        let mut tasks = JoinSet::new();

        for (index, (bytes, mime_type)) in contents.into_iter().enumerate() {
            let core = self.clone();
            let config = Arc::clone(&config);
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => core.extract_bytes(&bytes, &mime_type, &config).await,
                    Err(e) => Err(KreuzbergError::Other(format!("Batch semaphore closed: {}", e))),
                };
                (index, result)
            });
        }

        let mut results: Vec<Option<ExtractionResult>> = vec![None; tasks.len()];

        while let Some(task_result) = tasks.join_next().await {
            match task_result {
                Ok((index, Ok(result))) => {
                    results[index] = Some(result);
                }
                Ok((index, Err(e))) => {
                    // System errors must bubble up.
                    if matches!(e, KreuzbergError::Io(_)) {
                        return Err(e);
                    }
                    tracing::debug!(index, error = %e, "Batch item failed");
                    results[index] = Some(ExtractionResult::from_error(&e));
                }
                Err(join_err) => {
                    return Err(KreuzbergError::Other(format!("Task panicked: {}", join_err)));
                }
            }
        }

        Ok(results.into_iter().flatten().collect())
    }

    /// Synchronous wrapper for [`ExtractionCore::extract_bytes`].
    ///
    /// Must not be called from inside an async runtime.
    pub fn extract_bytes_sync(
        &self,
        content: &[u8],
        mime_type: &str,
        config: &ExtractionConfig,
    ) -> Result<ExtractionResult> {
        GLOBAL_RUNTIME.block_on(self.extract_bytes(content, mime_type, config))
    }

    /// Synchronous wrapper for [`ExtractionCore::batch_extract_bytes`].
    pub fn batch_extract_bytes_sync(
        &self,
        contents: Vec<(Vec<u8>, String)>,
        config: &ExtractionConfig,
    ) -> Result<Vec<ExtractionResult>> {
        GLOBAL_RUNTIME.block_on(self.batch_extract_bytes(contents, config))
    }
}

/// Extract with the process-wide registry.
pub async fn extract_bytes(content: &[u8], mime_type: &str, config: &ExtractionConfig) -> Result<ExtractionResult> {
    ExtractionCore::with_global_registry()
        .extract_bytes(content, mime_type, config)
        .await
}

/// Batch-extract with the process-wide registry.
pub async fn batch_extract_bytes(
    contents: Vec<(Vec<u8>, String)>,
    config: &ExtractionConfig,
) -> Result<Vec<ExtractionResult>> {
    ExtractionCore::with_global_registry()
        .batch_extract_bytes(contents, config)
        .await
}

pub fn extract_bytes_sync(content: &[u8], mime_type: &str, config: &ExtractionConfig) -> Result<ExtractionResult> {
    ExtractionCore::with_global_registry().extract_bytes_sync(content, mime_type, config)
}

pub fn batch_extract_bytes_sync(
    contents: Vec<(Vec<u8>, String)>,
    config: &ExtractionConfig,
) -> Result<Vec<ExtractionResult>> {
    ExtractionCore::with_global_registry().batch_extract_bytes_sync(contents, config)
}
