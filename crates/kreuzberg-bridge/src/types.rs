use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Canonical extraction result exchanged with host plugins.
///
/// Optional list fields are serialized as `null` when absent, never omitted, so
/// every host sees the same key set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub content: String,
    pub mime_type: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub tables: Vec<Table>,
    #[serde(default)]
    pub detected_languages: Option<Vec<String>>,

    /// Text chunks, when the core produced any.
    ///
    /// Each chunk carries byte offsets into `content` that lie on UTF-8 boundaries.
    #[serde(default)]
    pub chunks: Option<Vec<Chunk>>,

    /// Extracted images. Each image may embed its own OCR result.
    #[serde(default)]
    pub images: Option<Vec<ExtractedImage>>,

    /// Per-page content, when page splitting was requested.
    #[serde(default)]
    pub pages: Option<Vec<PageContent>>,
}

impl ExtractionResult {
    /// Create a result with the given content and MIME type and nothing else.
    pub fn new(content: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            mime_type: mime_type.into(),
            ..Default::default()
        }
    }

    /// Build the error-flavored entry used by batch operations for a failed item.
    pub fn from_error(error: &crate::KreuzbergError) -> Self {
        let mut metadata = Metadata::new();
        metadata.set_error(ErrorMetadata {
            error_type: error.error_type().to_string(),
            message: error.to_string(),
        });

        Self {
            content: format!("Error: {}", error),
            mime_type: "text/plain".to_string(),
            metadata,
            ..Default::default()
        }
    }
}

/// Insertion-ordered metadata map.
///
/// Keys are arbitrary; post-processors add entries freely. The map is never null
/// on the wire: an absent or unparsable metadata field decodes to an empty map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(IndexMap<String, Value>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Remove a key, keeping the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Store batch error details under the `error` key.
    pub fn set_error(&mut self, error: ErrorMetadata) {
        self.0.insert(
            "error".to_string(),
            serde_json::json!({
                "error_type": error.error_type,
                "message": error.message,
            }),
        );
    }

    /// Read back batch error details, if this metadata carries any.
    pub fn error(&self) -> Option<ErrorMetadata> {
        self.0
            .get("error")
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }
}

impl From<serde_json::Map<String, Value>> for Metadata {
    fn from(map: serde_json::Map<String, Value>) -> Self {
        Self(map.into_iter().collect())
    }
}

impl From<Metadata> for Value {
    fn from(metadata: Metadata) -> Self {
        Value::Object(metadata.0.into_iter().collect())
    }
}

impl FromIterator<(String, Value)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Error metadata (for batch operations).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMetadata {
    pub error_type: String,
    pub message: String,
}

/// Extracted table structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Table cells as a 2D vector (rows × columns)
    pub cells: Vec<Vec<String>>,
    /// Markdown representation of the table
    pub markdown: String,
    /// Page number where the table was found (1-indexed)
    pub page_number: usize,
}

/// A text chunk with optional embedding and metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    pub metadata: ChunkMetadata,
}

/// Position of a chunk in the parent content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Byte offset where this chunk starts (UTF-8 boundary).
    pub byte_start: usize,
    /// Byte offset where this chunk ends (UTF-8 boundary).
    pub byte_end: usize,
    #[serde(default)]
    pub token_count: Option<usize>,
    /// Zero-based index of this chunk in the document.
    pub chunk_index: usize,
    pub total_chunks: usize,
    #[serde(default)]
    pub first_page: Option<usize>,
    #[serde(default)]
    pub last_page: Option<usize>,
}

/// Extracted image from a document.
///
/// Bytes travel as base64 on the wire. Decoding also accepts a plain array of
/// byte integers, which is what some hosts produce for typed arrays.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedImage {
    #[serde(with = "crate::wire::bytes")]
    pub data: Vec<u8>,
    /// Image format (e.g., "jpeg", "png", "webp")
    pub format: String,
    pub image_index: usize,
    #[serde(default)]
    pub page_number: Option<usize>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub colorspace: Option<String>,
    #[serde(default)]
    pub bits_per_component: Option<u32>,
    #[serde(default)]
    pub is_mask: bool,
    #[serde(default)]
    pub description: Option<String>,
    /// Nested OCR result for this image, if it was OCRed.
    #[serde(default)]
    pub ocr_result: Option<Box<ExtractionResult>>,
}

/// Content of a single page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageContent {
    /// Page number (1-indexed)
    pub page_number: usize,
    pub content: String,
    #[serde(default)]
    pub tables: Vec<Table>,
    #[serde(default)]
    pub images: Vec<ExtractedImage>,
}

/// Output of an OCR backend for one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrResult {
    pub content: String,
    #[serde(default = "default_ocr_mime_type")]
    pub mime_type: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub tables: Vec<Table>,
}

fn default_ocr_mime_type() -> String {
    "text/plain".to_string()
}

impl OcrResult {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            mime_type: default_ocr_mime_type(),
            metadata: Metadata::new(),
            tables: Vec::new(),
        }
    }
}

impl From<OcrResult> for ExtractionResult {
    fn from(ocr: OcrResult) -> Self {
        Self {
            content: ocr.content,
            mime_type: ocr.mime_type,
            metadata: ocr.metadata,
            tables: ocr.tables,
            ..Default::default()
        }
    }
}
