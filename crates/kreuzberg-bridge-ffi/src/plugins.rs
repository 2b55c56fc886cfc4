//! Plugin registration over the C ABI.
//!
//! C callbacks exchange wire JSON. Each one is wrapped in the bridge's host
//! adapters, so C plugins go through the same registry, ordering, and error
//! mapping as every other host.
//!
//! Strings returned by a callback are owned by the library afterwards and are
//! released with the same allocator as [`kreuzberg_free_string`](crate::kreuzberg_free_string).
//! Allocate them with [`kreuzberg_string_new`](crate::kreuzberg_string_new).

use crate::{c_str_arg, ffi_bool, ffi_string};
use kreuzberg_bridge::plugins::{
    Awaitable, HostOcrBackend, HostPostProcessor, HostResult, HostValidator, OcrCallback, ProcessCallback,
    ProcessingStage, ValidateCallback, global_registry,
};
use kreuzberg_bridge::{KreuzbergError, Result};
use std::ffi::CString;
use std::os::raw::c_char;
use std::sync::Arc;

/// Post-processor callback.
///
/// Receives the current result as wire JSON and returns the processed result as
/// wire JSON, or NULL on failure. A failure is recorded in the result metadata
/// as `<name>_error`; the pipeline continues.
pub type PostProcessorCallback = unsafe extern "C" fn(result_json: *const c_char) -> *mut c_char;

/// Validator callback.
///
/// Returns NULL when the result is acceptable, or an error message to reject it.
/// A rejection fails the extraction.
pub type ValidatorCallback = unsafe extern "C" fn(result_json: *const c_char) -> *mut c_char;

/// OCR backend callback.
///
/// Receives the image bytes and a language code and returns an OCR result as
/// JSON (`{"content": ..., "mime_type": ..., "metadata": ..., "tables": ...}`),
/// or NULL on failure. `image_bytes` is only valid for the duration of the call.
pub type OcrBackendCallback =
    unsafe extern "C" fn(image_bytes: *const u8, image_length: usize, language: *const c_char) -> *mut c_char;

/// Take ownership of a string returned by a callback.
fn take_callback_string(raw: *mut c_char) -> HostResult<Option<String>> {
    if raw.is_null() {
        return Ok(None);
    }
    // SAFETY: callbacks hand back strings allocated by kreuzberg_string_new
    let owned = unsafe { CString::from_raw(raw) };
    owned
        .into_string()
        .map(Some)
        .map_err(|e| format!("Callback returned invalid UTF-8: {}", e))
}

fn to_c_payload(payload: String) -> HostResult<CString> {
    CString::new(payload).map_err(|e| format!("Payload contains a NUL byte: {}", e))
}

/// Run a blocking C callback off the async workers.
fn blocking<T, F>(call: F) -> Awaitable<HostResult<T>>
where
    T: Send + 'static,
    F: FnOnce() -> HostResult<T> + Send + 'static,
{
    Awaitable::pending(async move {
        tokio::task::spawn_blocking(call)
            .await
            .map_err(|e| format!("Callback task panicked: {}", e))?
    })
}

fn process_callback(callback: PostProcessorCallback) -> ProcessCallback {
    Arc::new(move |payload: String| {
        blocking(move || {
            let input = to_c_payload(payload)?;
            // SAFETY: `input` outlives the call; the callback contract forbids keeping the pointer
            let output = unsafe { callback(input.as_ptr()) };
            take_callback_string(output)?.ok_or_else(|| "Post-processor returned NULL".to_string())
        })
    })
}

fn validate_callback(callback: ValidatorCallback) -> ValidateCallback {
    Arc::new(move |payload: String| {
        blocking(move || {
            let input = to_c_payload(payload)?;
            // SAFETY: see process_callback
            let output = unsafe { callback(input.as_ptr()) };
            match take_callback_string(output)? {
                Some(message) => Err(message),
                None => Ok(()),
            }
        })
    })
}

fn ocr_callback(callback: OcrBackendCallback) -> OcrCallback {
    Arc::new(move |bytes: Vec<u8>, language: String| {
        blocking(move || {
            let language = to_c_payload(language)?;
            // SAFETY: `bytes` and `language` outlive the call
            let output = unsafe { callback(bytes.as_ptr(), bytes.len(), language.as_ptr()) };
            take_callback_string(output)?.ok_or_else(|| "OCR backend returned NULL".to_string())
        })
    })
}

fn names_json(names: Vec<String>) -> Result<String> {
    Ok(serde_json::to_string(&names)?)
}

// ============================================================================
// Post-processors
// ============================================================================

/// Register a post-processor.
///
/// # Safety
///
/// - `name` must be a valid null-terminated C string
/// - `stage` is `"early"`, `"middle"` or `"late"` (case-insensitive), or NULL for middle;
///   unknown values fall back to middle
/// - `callback` must not keep the pointer it receives and must return a string
///   allocated with `kreuzberg_string_new`, or NULL
/// - Returns false on error (check `kreuzberg_last_error`)
///
/// # Example (C)
///
/// ```c
/// char* shout(const char* result_json) {
///     /* parse, upper-case content, serialize */
///     return kreuzberg_string_new(processed_json);
/// }
///
/// kreuzberg_register_post_processor("shout", shout, "late");
/// ```
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kreuzberg_register_post_processor(
    name: *const c_char,
    callback: PostProcessorCallback,
    stage: *const c_char,
) -> bool {
    ffi_bool(|| {
        let name = unsafe { c_str_arg(name, "Post-processor name") }?;
        let stage = if stage.is_null() {
            ProcessingStage::default()
        } else {
            ProcessingStage::from_host(unsafe { c_str_arg(stage, "Processing stage") }?)
        };

        let processor = HostPostProcessor::new(name, process_callback(callback)).with_stage(stage);
        global_registry().register_post_processor(Arc::new(processor))
    })
}

/// Unregister a post-processor by name. Unknown names are a no-op.
///
/// # Safety
///
/// - `name` must be a valid null-terminated C string
/// - Returns false only when `name` is NULL or not UTF-8
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kreuzberg_unregister_post_processor(name: *const c_char) -> bool {
    ffi_bool(|| {
        let name = unsafe { c_str_arg(name, "Post-processor name") }?;
        global_registry().unregister_post_processor(name);
        Ok(())
    })
}

/// Remove every registered post-processor.
#[unsafe(no_mangle)]
pub extern "C" fn kreuzberg_clear_post_processors() -> bool {
    ffi_bool(|| {
        global_registry().clear_post_processors();
        Ok(())
    })
}

/// List registered post-processor names as a JSON array, in registration order.
///
/// # Safety
///
/// The returned string must be freed with `kreuzberg_free_string`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kreuzberg_list_post_processors() -> *mut c_char {
    ffi_string(|| names_json(global_registry().list_post_processors()))
}

// ============================================================================
// Validators
// ============================================================================

/// Register a validator. Higher `priority` runs first.
///
/// # Safety
///
/// - `name` must be a valid null-terminated C string
/// - `callback` must return NULL to accept, or an error message allocated with
///   `kreuzberg_string_new` to reject
/// - Returns false on error (check `kreuzberg_last_error`)
///
/// # Example (C)
///
/// ```c
/// char* min_length(const char* result_json) {
///     return too_short(result_json) ? kreuzberg_string_new("content too short") : NULL;
/// }
///
/// kreuzberg_register_validator("min-length", min_length, 100);
/// ```
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kreuzberg_register_validator(
    name: *const c_char,
    callback: ValidatorCallback,
    priority: i32,
) -> bool {
    ffi_bool(|| {
        let name = unsafe { c_str_arg(name, "Validator name") }?;
        let validator = HostValidator::new(name, validate_callback(callback)).with_priority(priority);
        global_registry().register_validator(Arc::new(validator))
    })
}

/// Unregister a validator by name. Unknown names are a no-op.
///
/// # Safety
///
/// `name` must be a valid null-terminated C string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kreuzberg_unregister_validator(name: *const c_char) -> bool {
    ffi_bool(|| {
        let name = unsafe { c_str_arg(name, "Validator name") }?;
        global_registry().unregister_validator(name);
        Ok(())
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn kreuzberg_clear_validators() -> bool {
    ffi_bool(|| {
        global_registry().clear_validators();
        Ok(())
    })
}

/// List registered validator names as a JSON array.
///
/// # Safety
///
/// The returned string must be freed with `kreuzberg_free_string`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kreuzberg_list_validators() -> *mut c_char {
    ffi_string(|| names_json(global_registry().list_validators()))
}

// ============================================================================
// OCR backends
// ============================================================================

/// Register an OCR backend.
///
/// # Safety
///
/// - `name` must be a valid null-terminated C string
/// - `languages_json` must be a JSON array of language codes with at least one entry
/// - `callback` must not keep the image pointer and must return an OCR result
///   JSON string allocated with `kreuzberg_string_new`, or NULL
/// - Returns false on error (check `kreuzberg_last_error`)
///
/// # Example (C)
///
/// ```c
/// char* my_ocr(const uint8_t* image, size_t len, const char* language) {
///     return kreuzberg_string_new("{\"content\": \"recognized text\"}");
/// }
///
/// kreuzberg_register_ocr_backend("my-ocr", my_ocr, "[\"eng\", \"deu\"]");
/// ```
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kreuzberg_register_ocr_backend(
    name: *const c_char,
    callback: OcrBackendCallback,
    languages_json: *const c_char,
) -> bool {
    ffi_bool(|| {
        let name = unsafe { c_str_arg(name, "OCR backend name") }?;
        let languages_json = unsafe { c_str_arg(languages_json, "Supported languages") }?;
        let languages: Vec<String> = serde_json::from_str(languages_json).map_err(|e| {
            KreuzbergError::validation_with_source("Supported languages must be a JSON array of strings", e)
        })?;

        let backend = HostOcrBackend::new(name, languages, ocr_callback(callback));
        global_registry().register_ocr_backend(Arc::new(backend))
    })
}

/// Unregister an OCR backend by name. Unknown names are a no-op.
///
/// # Safety
///
/// `name` must be a valid null-terminated C string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kreuzberg_unregister_ocr_backend(name: *const c_char) -> bool {
    ffi_bool(|| {
        let name = unsafe { c_str_arg(name, "OCR backend name") }?;
        global_registry().unregister_ocr_backend(name);
        Ok(())
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn kreuzberg_clear_ocr_backends() -> bool {
    ffi_bool(|| {
        global_registry().clear_ocr_backends();
        Ok(())
    })
}

/// List registered OCR backend names as a JSON array.
///
/// # Safety
///
/// The returned string must be freed with `kreuzberg_free_string`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kreuzberg_list_ocr_backends() -> *mut c_char {
    ffi_string(|| names_json(global_registry().list_ocr_backends()))
}
