//! Base plugin trait.
//!
//! Identity plus lifecycle hooks. The registry calls `initialize` before a
//! plugin becomes visible and `shutdown` after it is removed.

use crate::Result;

/// Identity and lifecycle shared by every plugin kind.
///
/// One instance may serve several extractions at once, hence `Send + Sync`.
///
/// # Example
///
/// ```rust
/// use kreuzberg_bridge::plugins::Plugin;
/// use kreuzberg_bridge::{KreuzbergError, Result};
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// /// Plugin that needs a live host session.
/// struct SessionPlugin {
///     open_sessions: AtomicUsize,
///     host_ready: bool,
/// }
///
/// impl Plugin for SessionPlugin {
///     fn name(&self) -> &str {
///         "session-plugin"
///     }
///
///     fn version(&self) -> String {
///         "2.1.0".to_string()
///     }
///
///     fn initialize(&self) -> Result<()> {
///         if !self.host_ready {
///             return Err(KreuzbergError::Other("host session not available".to_string()));
///         }
///         self.open_sessions.fetch_add(1, Ordering::SeqCst);
///         Ok(())
///     }
///
///     fn shutdown(&self) -> Result<()> {
///         self.open_sessions.fetch_sub(1, Ordering::SeqCst);
///         Ok(())
///     }
/// }
/// ```
pub trait Plugin: Send + Sync {
    /// Unique name of this plugin within its kind. Must not be blank.
    fn name(&self) -> &str;

    fn version(&self) -> String;

    /// An error here aborts the registration.
    fn initialize(&self) -> Result<()> {
        Ok(())
    }

    /// Errors are logged by the registry and go no further.
    fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    fn description(&self) -> &str {
        ""
    }

    fn author(&self) -> &str {
        ""
    }
}
