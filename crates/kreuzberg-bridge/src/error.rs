//! Error types for the plugin bridge.
//!
//! Every fallible operation in the bridge returns [`KreuzbergError`]. The variants
//! mirror how each failure is treated by the pipeline:
//!
//! - `InvalidName` / `DuplicateName` - registration was rejected
//! - `Serialization` - a wire payload could not be decoded at all
//! - `MissingLanguageParameter` - the OCR payload normalizer found no language
//! - `Processor` - a post-processor failed (recovered and recorded in metadata)
//! - `Validation` - a validator rejected the result (fatal to the extraction)
//! - `Ocr` - an OCR backend failed (fatal to the extraction)
//!
//! **System errors always bubble up unchanged.** `KreuzbergError::Io` is never
//! converted into an error-flavored batch entry.
//!
//! # Example
//!
//! ```rust
//! use kreuzberg_bridge::{KreuzbergError, Result};
//!
//! fn require_content(content: &str) -> Result<()> {
//!     if content.trim().is_empty() {
//!         return Err(KreuzbergError::validation("Content is empty"));
//!     }
//!     Ok(())
//! }
//!
//! assert!(require_content("").is_err());
//! ```
use crate::plugins::PluginKind;
use thiserror::Error;

/// Result type alias using `KreuzbergError`.
pub type Result<T> = std::result::Result<T, KreuzbergError>;

/// Main error type for all bridge operations.
#[derive(Debug, Error)]
pub enum KreuzbergError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid plugin name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("{kind} '{name}' is already registered")]
    DuplicateName { kind: PluginKind, name: String },

    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Missing language parameter: {0}")]
    MissingLanguageParameter(String),

    #[error("Post-processor error in '{plugin_name}': {message}")]
    Processor { message: String, plugin_name: String },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("OCR error: {message}")]
    Ocr {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Plugin '{plugin_name}' not registered")]
    NotRegistered { plugin_name: String },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for KreuzbergError {
    fn from(err: serde_json::Error) -> Self {
        KreuzbergError::Serialization {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<base64::DecodeError> for KreuzbergError {
    fn from(err: base64::DecodeError) -> Self {
        KreuzbergError::Serialization {
            message: format!("Invalid base64 payload: {}", err),
            source: Some(Box::new(err)),
        }
    }
}

macro_rules! error_constructor {
    ($name:ident, $variant:ident) => {
        pastey::paste! {
            #[doc = "Create a " $variant " error"]
            pub fn $name<S: Into<String>>(message: S) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: None,
                }
            }

            #[doc = "Create a " $variant " error with source"]
            pub fn [<$name _with_source>]<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
                message: S,
                source: E,
            ) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: Some(Box::new(source)),
                }
            }
        }
    };
}

impl KreuzbergError {
    error_constructor!(serialization, Serialization);
    error_constructor!(validation, Validation);
    error_constructor!(ocr, Ocr);

    /// Create a `Processor` error attributed to a named post-processor.
    pub fn processor<N: Into<String>, S: Into<String>>(plugin_name: N, message: S) -> Self {
        Self::Processor {
            message: message.into(),
            plugin_name: plugin_name.into(),
        }
    }

    /// Stable, language-neutral name of the error variant.
    ///
    /// Used as `metadata.error.error_type` on error-flavored batch entries so
    /// hosts can branch on it without parsing messages.
    pub fn error_type(&self) -> &'static str {
        match self {
            KreuzbergError::Io(_) => "IoError",
            KreuzbergError::InvalidName { .. } => "InvalidName",
            KreuzbergError::DuplicateName { .. } => "DuplicateName",
            KreuzbergError::Serialization { .. } => "SerializationError",
            KreuzbergError::MissingLanguageParameter(_) => "MissingLanguageParameter",
            KreuzbergError::Processor { .. } => "ProcessorError",
            KreuzbergError::Validation { .. } => "ValidationError",
            KreuzbergError::Ocr { .. } => "OcrBackendError",
            KreuzbergError::NotRegistered { .. } => "NotRegistered",
            KreuzbergError::UnsupportedFormat(_) => "UnsupportedFormat",
            KreuzbergError::Other(_) => "Other",
        }
    }
}
