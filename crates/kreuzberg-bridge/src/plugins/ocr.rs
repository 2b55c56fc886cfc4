//! OCR backend plugin trait.

use crate::Result;
use crate::plugins::Plugin;
use crate::plugins::registry::global_registry;
use crate::types::OcrResult;
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for OCR backend plugins.
///
/// Backends receive already-normalized image bytes and a language code. Every
/// backend must declare at least one supported language.
#[async_trait]
pub trait OcrBackend: Plugin {
    async fn process_image(&self, image_bytes: &[u8], language: &str) -> Result<OcrResult>;

    fn supported_languages(&self) -> Vec<String>;

    fn supports_language(&self, lang: &str) -> bool {
        self.supported_languages()
            .iter()
            .any(|supported| supported.eq_ignore_ascii_case(lang))
    }
}

pub fn register_ocr_backend(backend: Arc<dyn OcrBackend>) -> Result<()> {
    global_registry().register_ocr_backend(backend)
}

pub fn unregister_ocr_backend(name: &str) {
    global_registry().unregister_ocr_backend(name)
}

pub fn list_ocr_backends() -> Vec<String> {
    global_registry().list_ocr_backends()
}

pub fn clear_ocr_backends() {
    global_registry().clear_ocr_backends()
}
