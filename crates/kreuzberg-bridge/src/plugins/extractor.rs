//! Document extractor plugin trait.
//!
//! Extractors turn raw bytes into the initial [`ExtractionResult`] that the
//! plugin pipeline then works on. The bridge ships only a UTF-8 text extractor;
//! real format parsers live in the engine.

use crate::Result;
use crate::core::config::ExtractionConfig;
use crate::plugins::Plugin;
use crate::types::ExtractionResult;
use async_trait::async_trait;

#[async_trait]
pub trait DocumentExtractor: Plugin {
    async fn extract_bytes(
        &self,
        content: &[u8],
        mime_type: &str,
        config: &ExtractionConfig,
    ) -> Result<ExtractionResult>;

    fn supported_mime_types(&self) -> &[&str];

    /// Whether this extractor handles `mime_type`. Entries ending in `/*` match
    /// the whole type family.
    fn supports(&self, mime_type: &str) -> bool {
        self.supported_mime_types().iter().any(|supported| {
            match supported.strip_suffix('*') {
                Some(prefix) => mime_type.starts_with(prefix),
                None => supported.eq_ignore_ascii_case(mime_type),
            }
        })
    }
}
