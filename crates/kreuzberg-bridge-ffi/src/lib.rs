//! C FFI bindings for the Kreuzberg plugin bridge.
//!
//! Provides a C-compatible API for hosts without a dedicated binding (Go via
//! cgo, C# via P/Invoke, Java via Panama, Zig). Everything structured crosses
//! the boundary as JSON text:
//!
//! - Extraction results are wire JSON (see `kreuzberg_bridge::wire`)
//! - Configuration is an `ExtractionConfig` JSON object, or NULL for defaults
//! - Plugin callbacks receive and return wire JSON (see [`plugins`])
//!
//! Failures return NULL/false and leave a message in a thread-local slot read
//! with `kreuzberg_last_error`. Every string the library returns must be
//! released with `kreuzberg_free_string`.

pub mod error;
pub mod plugins;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use kreuzberg_bridge::payload::{OcrArgument, UnwrapPath, normalize_ocr_input};
use kreuzberg_bridge::{ExtractionConfig, KreuzbergError, Result, wire};
use serde_json::{Value, json};
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;
use tracing_subscriber::EnvFilter;

pub use error::{kreuzberg_last_error, kreuzberg_last_error_type};
pub use plugins::*;

use error::{clear_last_error, set_last_error};

/// Environment variable holding the `tracing` filter for [`kreuzberg_init_tracing`].
pub const LOG_ENV_VAR: &str = "KREUZBERG_LOG";

const DEFAULT_LOG_FILTER: &str = "warn";

/// Borrow a required C string argument.
///
/// # Safety
///
/// `ptr` must be NULL or a valid null-terminated string that outlives `'a`.
pub(crate) unsafe fn c_str_arg<'a>(ptr: *const c_char, what: &str) -> Result<&'a str> {
    if ptr.is_null() {
        return Err(KreuzbergError::validation(format!("{} cannot be NULL", what)));
    }
    // SAFETY: non-null and null-terminated per the caller contract
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|e| KreuzbergError::validation_with_source(format!("Invalid UTF-8 in {}", what), e))
}

/// Parse an optional config argument; NULL means defaults.
unsafe fn config_arg(config_json: *const c_char) -> Result<ExtractionConfig> {
    if config_json.is_null() {
        return Ok(ExtractionConfig::default());
    }
    ExtractionConfig::from_json_str(unsafe { c_str_arg(config_json, "Config JSON") }?)
}

/// Run `op` with the last-error protocol and report success as a bool.
pub(crate) fn ffi_bool(op: impl FnOnce() -> Result<()>) -> bool {
    clear_last_error();
    match op() {
        Ok(()) => true,
        Err(e) => {
            set_last_error(&e);
            false
        }
    }
}

/// Run `op` with the last-error protocol and hand its string to the caller.
pub(crate) fn ffi_string(op: impl FnOnce() -> Result<String>) -> *mut c_char {
    clear_last_error();
    let outcome = op().and_then(|text| {
        CString::new(text)
            .map(CString::into_raw)
            .map_err(|e| KreuzbergError::serialization_with_source("Output contains a NUL byte", e))
    });
    match outcome {
        Ok(raw) => raw,
        Err(e) => {
            set_last_error(&e);
            ptr::null_mut()
        }
    }
}

/// One input document for [`kreuzberg_batch_extract_bytes_sync`].
#[repr(C)]
pub struct CBytesWithMime {
    /// Document bytes (may be NULL when `data_len` is 0)
    pub data: *const u8,
    pub data_len: usize,
    /// MIME type (null-terminated string)
    pub mime_type: *const c_char,
}

/// Borrow a byte buffer argument; NULL is only accepted for an empty buffer.
unsafe fn bytes_arg<'a>(data: *const u8, len: usize, what: &str) -> Result<&'a [u8]> {
    if len == 0 {
        return Ok(&[]);
    }
    if data.is_null() {
        return Err(KreuzbergError::validation(format!("{} cannot be NULL", what)));
    }
    // SAFETY: caller guarantees `len` readable bytes at `data`
    Ok(unsafe { std::slice::from_raw_parts(data, len) })
}

/// Extract one document and run the plugin pipeline (synchronous).
///
/// Returns the result as wire JSON.
///
/// # Safety
///
/// - `data` must point to `data_len` readable bytes (NULL allowed when `data_len` is 0)
/// - `mime_type` must be a valid null-terminated C string
/// - `config_json` must be a valid null-terminated JSON string, or NULL for defaults
/// - The returned string must be freed with `kreuzberg_free_string`
/// - Returns NULL on error (check `kreuzberg_last_error`)
///
/// # Example (C)
///
/// ```c
/// const char* text = "Hello world";
/// char* json = kreuzberg_extract_bytes_sync((const uint8_t*)text, strlen(text), "text/plain", NULL);
/// if (json != NULL) {
///     printf("%s\n", json);
///     kreuzberg_free_string(json);
/// } else {
///     printf("Error: %s\n", kreuzberg_last_error());
/// }
/// ```
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kreuzberg_extract_bytes_sync(
    data: *const u8,
    data_len: usize,
    mime_type: *const c_char,
    config_json: *const c_char,
) -> *mut c_char {
    ffi_string(|| {
        let bytes = unsafe { bytes_arg(data, data_len, "data") }?;
        let mime_type = unsafe { c_str_arg(mime_type, "MIME type") }?;
        let config = unsafe { config_arg(config_json) }?;

        let result = kreuzberg_bridge::extract_bytes_sync(bytes, mime_type, &config)?;
        wire::encode(&result)
    })
}

/// Extract many documents concurrently (synchronous).
///
/// Returns a JSON array with one wire result per input, in input order. Items
/// that fail carry `metadata.error = {"error_type", "message"}` instead of
/// aborting the batch.
///
/// # Safety
///
/// - `items` must point to `count` valid `CBytesWithMime` values (NULL allowed when `count` is 0)
/// - `config_json` must be a valid null-terminated JSON string, or NULL for defaults
/// - The returned string must be freed with `kreuzberg_free_string`
/// - Returns NULL on error (check `kreuzberg_last_error`)
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kreuzberg_batch_extract_bytes_sync(
    items: *const CBytesWithMime,
    count: usize,
    config_json: *const c_char,
) -> *mut c_char {
    ffi_string(|| {
        let config = unsafe { config_arg(config_json) }?;
        let items: &[CBytesWithMime] = if count == 0 {
            &[]
        } else if items.is_null() {
            return Err(KreuzbergError::validation("items cannot be NULL"));
        } else {
            // SAFETY: caller guarantees `count` items at `items`
            unsafe { std::slice::from_raw_parts(items, count) }
        };

        let mut contents = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let bytes = unsafe { bytes_arg(item.data, item.data_len, &format!("data at index {}", index)) }?;
            let mime_type = unsafe { c_str_arg(item.mime_type, &format!("MIME type at index {}", index)) }?;
            contents.push((bytes.to_vec(), mime_type.to_string()));
        }

        let results = kreuzberg_bridge::batch_extract_bytes_sync(contents, &config)?;
        let encoded = results.iter().map(wire::encode_value).collect::<Result<Vec<Value>>>()?;
        Ok(serde_json::to_string(&encoded)?)
    })
}

fn unwrap_path_name(path: UnwrapPath) -> &'static str {
    match path {
        UnwrapPath::Positional => "positional",
        UnwrapPath::Pair => "pair",
        UnwrapPath::NestedPair => "nested_pair",
    }
}

/// Normalize OCR call arguments to `(bytes, language)`.
///
/// `payload_json` is the host's first argument as JSON: a base64 string, an
/// array of byte integers, `[payload, language]`, or `[[payload, language]]`.
/// `language_json` is the second positional argument as JSON, or NULL.
///
/// Returns `{"bytes": "<base64>", "language": "...", "unwrap_path": "..."}`.
///
/// # Safety
///
/// - `payload_json` must be a valid null-terminated C string
/// - `language_json` must be a valid null-terminated C string, or NULL
/// - The returned string must be freed with `kreuzberg_free_string`
/// - Returns NULL on error (check `kreuzberg_last_error`)
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kreuzberg_ocr_normalize_payload(
    payload_json: *const c_char,
    language_json: *const c_char,
    debug: bool,
) -> *mut c_char {
    ffi_string(|| {
        let payload: Value = serde_json::from_str(unsafe { c_str_arg(payload_json, "OCR payload") }?)?;
        let language = if language_json.is_null() {
            None
        } else {
            let value: Value = serde_json::from_str(unsafe { c_str_arg(language_json, "OCR language") }?)?;
            OcrArgument::from_json(value)
        };

        let payload = OcrArgument::from_json(payload)
            .ok_or_else(|| KreuzbergError::serialization("OCR payload cannot be null"))?;
        let normalized = normalize_ocr_input(payload, language, debug)?;

        Ok(json!({
            "bytes": STANDARD.encode(&normalized.bytes),
            "language": normalized.language,
            "unwrap_path": unwrap_path_name(normalized.path),
        })
        .to_string())
    })
}

/// Copy a C string into a library-owned string.
///
/// Callbacks must return strings allocated here so the library can free them.
///
/// # Safety
///
/// - `s` must be a valid null-terminated C string, or NULL (returns NULL)
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kreuzberg_string_new(s: *const c_char) -> *mut c_char {
    if s.is_null() {
        return ptr::null_mut();
    }
    // SAFETY: non-null and null-terminated per the caller contract
    unsafe { CStr::from_ptr(s) }.to_owned().into_raw()
}

/// Free a string returned by a Kreuzberg function.
///
/// # Safety
///
/// - `s` must be a string previously returned by a Kreuzberg function
/// - `s` can be NULL (no-op)
/// - `s` must not be used after this call
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kreuzberg_free_string(s: *mut c_char) {
    if !s.is_null() {
        // SAFETY: `s` came from CString::into_raw in this library
        unsafe { drop(CString::from_raw(s)) };
    }
}

/// Get the library version string.
///
/// # Safety
///
/// Returns a static string that must not be freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kreuzberg_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}

/// Install a stderr `tracing` subscriber.
///
/// The filter comes from `KREUZBERG_LOG` (e.g. `kreuzberg_bridge=debug`) and
/// defaults to `warn`. Returns false if a global subscriber is already set.
#[unsafe(no_mangle)]
pub extern "C" fn kreuzberg_init_tracing() -> bool {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
