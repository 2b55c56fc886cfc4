//! Built-in document extractors.

pub mod text;

pub use text::PlainTextExtractor;
