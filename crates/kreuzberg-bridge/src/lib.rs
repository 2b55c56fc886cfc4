//! Kreuzberg Bridge - cross-language plugin bridge for the Kreuzberg engine
//!
//! Lets host-language callbacks (post-processors, validators, OCR backends)
//! take part in an extraction pipeline that runs in compiled code.
//!
//! # Quick Start
//!
//! ```rust
//! use kreuzberg_bridge::plugins::{Awaitable, HostPostProcessor, ProcessCallback, ProcessingStage};
//! use kreuzberg_bridge::{ExtractionConfig, ExtractionCore, PluginRegistry};
//! use std::sync::Arc;
//!
//! let registry = Arc::new(PluginRegistry::new());
//!
//! // A host callback that upper-cases the content, answering synchronously.
//! let callback: ProcessCallback = Arc::new(|payload: String| {
//!     let mut value: serde_json::Value = serde_json::from_str(&payload).unwrap();
//!     let upper = value["content"].as_str().unwrap_or_default().to_uppercase();
//!     value["content"] = serde_json::Value::String(upper);
//!     Awaitable::ready(Ok::<_, String>(value.to_string()))
//! });
//! registry
//!     .register_post_processor(Arc::new(
//!         HostPostProcessor::new("upper", callback).with_stage(ProcessingStage::Late),
//!     ))
//!     .unwrap();
//!
//! let core = ExtractionCore::new(registry);
//! let result = core
//!     .extract_bytes_sync(b"hello", "text/plain", &ExtractionConfig::default())
//!     .unwrap();
//! assert_eq!(result.content, "HELLO");
//! ```
//!
//! # Architecture
//!
//! - **Wire Codec** (`wire`): canonical JSON form of [`ExtractionResult`]
//! - **Payload Normalizer** (`payload`): reduces OCR argument shapes to `(bytes, language)`
//! - **Plugin System** (`plugins`): traits, registry, and host callback adapters
//! - **Core** (`core`): configuration, pipeline, and extraction entry points

#![deny(unsafe_code)]

pub mod core;
pub mod error;
pub mod extractors;
pub mod payload;
pub mod plugins;
pub mod types;
pub mod wire;

pub use error::{KreuzbergError, Result};
pub use types::*;

pub use core::config::{ExtractionConfig, OcrConfig, PostProcessorConfig};
pub use core::extractor::{
    ExtractionCore, batch_extract_bytes, batch_extract_bytes_sync, extract_bytes, extract_bytes_sync,
};
pub use payload::{NormalizedOcrInput, OcrArgument, normalize_ocr_input};
pub use plugins::registry::{PluginKind, PluginRegistry, global_registry};
