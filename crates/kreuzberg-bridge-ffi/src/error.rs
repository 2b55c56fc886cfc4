//! Thread-local last-error storage.
//!
//! Every exported function clears the slot on entry and fills it on failure.
//! Hosts read it back with `kreuzberg_last_error` (human-readable message) and
//! `kreuzberg_last_error_type` (stable variant name such as `ValidationError`).

use kreuzberg_bridge::KreuzbergError;
use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

struct LastError {
    error_type: CString,
    message: CString,
}

thread_local! {
    static LAST_ERROR: RefCell<Option<LastError>> = const { RefCell::new(None) };
}

/// Record `err` as this thread's last error.
pub(crate) fn set_last_error(err: &KreuzbergError) {
    tracing::debug!(error_type = err.error_type(), error = %err, "FFI call failed");
    let last = LastError {
        error_type: to_c_string_lossy(err.error_type().to_string()),
        message: to_c_string_lossy(err.to_string()),
    };
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(last));
}

pub(crate) fn clear_last_error() {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = None);
}

/// Interior NUL bytes cannot cross the boundary; drop them.
fn to_c_string_lossy(text: String) -> CString {
    CString::new(text).unwrap_or_else(|e| {
        let mut bytes = e.into_vec();
        bytes.retain(|b| *b != 0);
        CString::new(bytes).unwrap_or_default()
    })
}

/// Get the last error message from a failed operation.
///
/// # Safety
///
/// - Returns NULL if the last call on this thread succeeded
/// - The returned string is owned by the library and must not be freed
/// - It stays valid until the next Kreuzberg call on the same thread
///
/// # Example (C)
///
/// ```c
/// if (!kreuzberg_register_validator("min-length", my_validator, 50)) {
///     printf("Error: %s\n", kreuzberg_last_error());
/// }
/// ```
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kreuzberg_last_error() -> *const c_char {
    LAST_ERROR.with(|slot| match &*slot.borrow() {
        Some(last) => last.message.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the stable type name of the last error (e.g. `"ValidationError"`).
///
/// # Safety
///
/// Same lifetime rules as [`kreuzberg_last_error`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kreuzberg_last_error_type() -> *const c_char {
    LAST_ERROR.with(|slot| match &*slot.borrow() {
        Some(last) => last.error_type.as_ptr(),
        None => ptr::null(),
    })
}
