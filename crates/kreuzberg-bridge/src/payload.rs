//! OCR payload normalization.
//!
//! Host bindings hand OCR arguments over in several shapes depending on their
//! calling convention:
//!
//! 1. `(payload, language)` as a single tuple argument
//! 2. `((payload, language),)` when the binding wraps variadic args once more
//! 3. `payload, language` as two positional arguments
//!
//! The payload itself is either raw bytes or a base64 string. Everything is
//! reduced to a canonical [`NormalizedOcrInput`].
use crate::error::{KreuzbergError, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use once_cell::sync::Lazy;
use serde_json::Value;

/// Environment switch for payload debug tracing.
pub const DEBUG_ENV_VAR: &str = "KREUZBERG_DEBUG_OCR_PAYLOAD";

const HEADER_PREVIEW_LEN: usize = 8;

static DEBUG_FROM_ENV: Lazy<bool> = Lazy::new(|| {
    std::env::var(DEBUG_ENV_VAR)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
});

/// One raw argument as received from a host binding.
#[derive(Debug, Clone, PartialEq)]
pub enum OcrArgument {
    Bytes(Vec<u8>),
    Text(String),
    Tuple(Vec<OcrArgument>),
    /// Any other host value. Never valid as payload or language.
    Other(String),
}

impl OcrArgument {
    /// Convert a JSON-shaped host argument. `null` means "not supplied".
    ///
    /// Arrays consisting solely of byte-range integers are treated as bytes, so
    /// `[]` is an empty payload; any other array is a tuple.
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::String(text) => Some(OcrArgument::Text(text)),
            Value::Array(items) => {
                if items.iter().all(is_byte) {
                    let bytes = items.iter().filter_map(Value::as_u64).map(|b| b as u8).collect();
                    return Some(OcrArgument::Bytes(bytes));
                }
                Some(OcrArgument::Tuple(items.into_iter().filter_map(Self::from_json).collect()))
            }
            other => Some(OcrArgument::Other(json_kind(&other).to_string())),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            OcrArgument::Bytes(_) => "bytes",
            OcrArgument::Text(_) => "string",
            OcrArgument::Tuple(_) => "tuple",
            OcrArgument::Other(_) => "other",
        }
    }

    fn as_pair(&self) -> Option<(&OcrArgument, &OcrArgument)> {
        match self {
            OcrArgument::Tuple(items) if items.len() == 2 => Some((&items[0], &items[1])),
            _ => None,
        }
    }
}

impl From<Vec<u8>> for OcrArgument {
    fn from(bytes: Vec<u8>) -> Self {
        OcrArgument::Bytes(bytes)
    }
}

impl From<&[u8]> for OcrArgument {
    fn from(bytes: &[u8]) -> Self {
        OcrArgument::Bytes(bytes.to_vec())
    }
}

impl From<&str> for OcrArgument {
    fn from(text: &str) -> Self {
        OcrArgument::Text(text.to_string())
    }
}

impl From<String> for OcrArgument {
    fn from(text: String) -> Self {
        OcrArgument::Text(text)
    }
}

fn is_byte(value: &Value) -> bool {
    value.as_u64().is_some_and(|n| n <= u8::MAX as u64)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Which argument shape the input arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnwrapPath {
    Positional,
    Pair,
    NestedPair,
}

/// Canonical OCR input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedOcrInput {
    pub bytes: Vec<u8>,
    pub language: String,
    pub path: UnwrapPath,
}

/// Reduce a raw OCR call to `(bytes, language)`.
///
/// `debug` forces payload tracing on; it is also enabled by setting
/// `KREUZBERG_DEBUG_OCR_PAYLOAD=1`.
pub fn normalize_ocr_input(
    payload: OcrArgument,
    language: Option<OcrArgument>,
    debug: bool,
) -> Result<NormalizedOcrInput> {
    let nested = match &payload {
        OcrArgument::Tuple(outer) if outer.len() == 1 => outer[0].as_pair(),
        _ => None,
    };

    let (data, lang, path) = if let Some((data, lang)) = nested {
        (data, Some(lang), UnwrapPath::NestedPair)
    } else if let Some((data, lang)) = payload.as_pair() {
        (data, Some(lang), UnwrapPath::Pair)
    } else {
        (&payload, language.as_ref(), UnwrapPath::Positional)
    };

    let language = match lang {
        Some(OcrArgument::Text(lang)) => lang.clone(),
        Some(other) => {
            return Err(KreuzbergError::MissingLanguageParameter(format!(
                "expected a string language, got {}",
                other.kind()
            )));
        }
        None => {
            return Err(KreuzbergError::MissingLanguageParameter(
                "no language supplied with the OCR payload".to_string(),
            ));
        }
    };

    let bytes = match data {
        OcrArgument::Bytes(bytes) => bytes.clone(),
        OcrArgument::Text(encoded) => STANDARD.decode(encoded.trim())?,
        other => {
            return Err(KreuzbergError::serialization(format!(
                "Unsupported OCR payload type: {}",
                other.kind()
            )));
        }
    };

    if debug || *DEBUG_FROM_ENV {
        let preview_len = bytes.len().min(HEADER_PREVIEW_LEN);
        tracing::debug!(
            payload_kind = data.kind(),
            byte_len = bytes.len(),
            header = ?&bytes[..preview_len],
            unwrap_path = ?path,
            language = %language,
            "Normalized OCR payload"
        );
    }

    Ok(NormalizedOcrInput { bytes, language, path })
}
