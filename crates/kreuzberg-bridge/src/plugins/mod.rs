//! Plugin system for host-language extensions.
//!
//! Three capability traits sit on top of the base [`Plugin`] trait:
//!
//! - [`PostProcessor`] - transforms results, staged, errors recorded in metadata
//! - [`Validator`] - checks results, prioritized, errors abort the extraction
//! - [`OcrBackend`] - turns image bytes into text
//!
//! [`DocumentExtractor`] produces the initial result the pipeline starts from.
//!
//! Host bindings do not implement these traits directly. They wrap their
//! callbacks in the adapters from [`host`] and register those.

mod extractor;
pub mod host;
mod ocr;
mod processor;
pub mod registry;
mod traits;
pub(crate) mod validator;

pub use extractor::DocumentExtractor;
pub use host::{
    Awaitable, HostOcrBackend, HostPostProcessor, HostResult, HostValidator, OcrBackendAdapter, OcrCallback,
    ProcessCallback, ShouldValidateCallback, ValidateCallback,
};
pub use ocr::{OcrBackend, clear_ocr_backends, list_ocr_backends, register_ocr_backend, unregister_ocr_backend};
pub use processor::{
    PostProcessor, ProcessingStage, clear_post_processors, list_post_processors, register_post_processor,
    unregister_post_processor,
};
pub use registry::{PluginKind, PluginRegistry, PostProcessorEntry, ValidatorEntry, global_registry};
pub use traits::Plugin;
pub use validator::{
    DEFAULT_PRIORITY, Validator, clear_validators, list_validators, register_validator, unregister_validator,
};
