//! Extraction configuration.
//!
//! Configuration travels across the language boundary as text, so it loads
//! from TOML or JSON strings as well as files.

use crate::{KreuzbergError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main extraction configuration.
///
/// # Example
///
/// ```rust
/// use kreuzberg_bridge::ExtractionConfig;
///
/// let config = ExtractionConfig::from_json_str(r#"{"postprocessor": {"disabled_processors": ["slow"]}}"#).unwrap();
/// let processors = config.postprocessor.unwrap();
/// assert!(!processors.is_processor_enabled("slow"));
/// assert!(processors.is_processor_enabled("fast"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Post-processor selection (None = run all registered)
    #[serde(default)]
    pub postprocessor: Option<PostProcessorConfig>,

    /// OCR routing for image inputs (None = images are not OCRed)
    #[serde(default)]
    pub ocr: Option<OcrConfig>,

    /// Maximum concurrent extractions in batch operations (None = num_cpus * 2)
    #[serde(default)]
    pub max_concurrent_extractions: Option<usize>,

    /// Trace the shape of every OCR payload at debug level
    #[serde(default)]
    pub debug_payloads: bool,
}

/// Post-processor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostProcessorConfig {
    /// Master switch for all post-processors
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Whitelist of processor names to run (None = all)
    #[serde(default)]
    pub enabled_processors: Option<Vec<String>>,

    /// Blacklist of processor names to skip (None = none)
    #[serde(default)]
    pub disabled_processors: Option<Vec<String>>,
}

impl PostProcessorConfig {
    /// Whether a processor passes the name filters.
    ///
    /// When a whitelist is present it alone decides; the blacklist is ignored.
    pub fn is_processor_enabled(&self, name: &str) -> bool {
        if let Some(enabled) = &self.enabled_processors {
            return enabled.iter().any(|n| n == name);
        }
        if let Some(disabled) = &self.disabled_processors {
            return !disabled.iter().any(|n| n == name);
        }
        true
    }
}

impl Default for PostProcessorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            enabled_processors: None,
            disabled_processors: None,
        }
    }
}

/// OCR routing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Registered backend name (None = first backend supporting `language`)
    #[serde(default)]
    pub backend: Option<String>,

    /// Language code passed to the backend (e.g., "eng", "deu")
    #[serde(default = "default_eng")]
    pub language: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            backend: None,
            language: default_eng(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_eng() -> String {
    "eng".to_string()
}

impl ExtractionConfig {
    /// Concurrency limit for batch operations.
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrent_extractions
            .unwrap_or_else(|| num_cpus::get() * 2)
            .max(1)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| KreuzbergError::validation(format!("Invalid TOML config: {}", e)))
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| KreuzbergError::validation(format!("Invalid JSON config: {}", e)))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `KreuzbergError::Validation` if the file cannot be read or is invalid TOML.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            KreuzbergError::validation(format!("Failed to read config file {}: {}", path.as_ref().display(), e))
        })?;

        toml::from_str(&content)
            .map_err(|e| KreuzbergError::validation(format!("Invalid TOML in {}: {}", path.as_ref().display(), e)))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            KreuzbergError::validation(format!("Failed to read config file {}: {}", path.as_ref().display(), e))
        })?;

        serde_json::from_str(&content)
            .map_err(|e| KreuzbergError::validation(format!("Invalid JSON in {}: {}", path.as_ref().display(), e)))
    }

    /// Load from a file, choosing the format by extension (`.toml` or `.json`).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(KreuzbergError::validation(format!(
                "Unsupported config file extension: {}",
                path.display()
            ))),
        }
    }
}
