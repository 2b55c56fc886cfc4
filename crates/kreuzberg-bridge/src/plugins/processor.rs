//! Post-processor plugin trait.
//!
//! Post-processors enrich or transform a result after extraction. They run in
//! three stages (Early, Middle, Late) and, unlike validators, their failures
//! never abort an extraction: the error is recorded in metadata and the
//! pipeline moves on.

use crate::Result;
use crate::core::config::ExtractionConfig;
use crate::plugins::Plugin;
use crate::plugins::registry::global_registry;
use crate::types::ExtractionResult;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Pipeline stage of a post-processor. Stages run in declaration order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProcessingStage {
    /// Normalization and cleanup that later processors rely on.
    Early,

    #[default]
    Middle,

    /// Final touches such as summaries or statistics over the finished content.
    Late,
}

impl ProcessingStage {
    /// Parse a stage name supplied by a host, case-insensitively.
    ///
    /// Unknown names fall back to `Middle`.
    pub fn from_host(stage: &str) -> Self {
        match stage.trim().to_lowercase().as_str() {
            "early" => ProcessingStage::Early,
            "late" => ProcessingStage::Late,
            "middle" => ProcessingStage::Middle,
            other => {
                tracing::debug!(stage = other, "Unknown processing stage, defaulting to middle");
                ProcessingStage::Middle
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStage::Early => "early",
            ProcessingStage::Middle => "middle",
            ProcessingStage::Late => "late",
        }
    }
}

impl fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for post-processor plugins.
///
/// # Example
///
/// ```rust
/// use kreuzberg_bridge::plugins::{Plugin, PostProcessor, ProcessingStage};
/// use kreuzberg_bridge::{ExtractionConfig, ExtractionResult, Result};
/// use async_trait::async_trait;
///
/// struct WordCount;
///
/// impl Plugin for WordCount {
///     fn name(&self) -> &str { "word-count" }
///     fn version(&self) -> String { "1.0.0".to_string() }
/// }
///
/// #[async_trait]
/// impl PostProcessor for WordCount {
///     async fn process(&self, result: &mut ExtractionResult, _config: &ExtractionConfig) -> Result<()> {
///         let words = result.content.split_whitespace().count();
///         result.metadata.insert("word_count", words);
///         Ok(())
///     }
///
///     fn processing_stage(&self) -> ProcessingStage {
///         ProcessingStage::Late
///     }
/// }
/// ```
#[async_trait]
pub trait PostProcessor: Plugin {
    /// Process a result in place.
    ///
    /// On error the pipeline restores the result as it was before this call.
    async fn process(&self, result: &mut ExtractionResult, config: &ExtractionConfig) -> Result<()>;

    /// Read once at registration and stored with the entry.
    fn processing_stage(&self) -> ProcessingStage {
        ProcessingStage::Middle
    }

    fn should_process(&self, _result: &ExtractionResult, _config: &ExtractionConfig) -> bool {
        true
    }
}

/// Register a post-processor with the process-wide registry.
pub fn register_post_processor(processor: Arc<dyn PostProcessor>) -> Result<()> {
    global_registry().register_post_processor(processor)
}

/// Unregister a post-processor from the process-wide registry. Absent names are ignored.
pub fn unregister_post_processor(name: &str) {
    global_registry().unregister_post_processor(name)
}

pub fn clear_post_processors() {
    global_registry().clear_post_processors()
}

pub fn list_post_processors() -> Vec<String> {
    global_registry().list_post_processors()
}
