//! Extraction orchestration.
//!
//! - **Configuration** (`config`): what runs and how much runs at once
//! - **Pipeline** (`pipeline`): post-processors, then validators
//! - **Entry points** (`extractor`): single and batch extraction, sync wrappers
//!
//! # Example
//!
//! ```rust
//! use kreuzberg_bridge::core::extractor::ExtractionCore;
//! use kreuzberg_bridge::{ExtractionConfig, PluginRegistry};
//! use std::sync::Arc;
//!
//! let core = ExtractionCore::new(Arc::new(PluginRegistry::new()));
//! let result = core
//!     .extract_bytes_sync(b"plain text", "text/plain", &ExtractionConfig::default())
//!     .unwrap();
//! assert_eq!(result.content, "plain text");
//! ```

pub mod config;
pub mod extractor;
pub mod pipeline;

pub use config::{ExtractionConfig, OcrConfig, PostProcessorConfig};
pub use extractor::{
    ExtractionCore, batch_extract_bytes, batch_extract_bytes_sync, extract_bytes, extract_bytes_sync,
};
pub use pipeline::{run_pipeline, run_post_processors, run_validators};
