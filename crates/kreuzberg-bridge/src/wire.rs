//! Wire codec for results crossing the language boundary.
//!
//! Encoding always emits the full snake_case key set (`content`, `mime_type`,
//! `metadata`, `tables`, `detected_languages`, `chunks`, `images`, `pages`), with
//! `null` for absent optional lists.
//!
//! Decoding is tolerant. Hosts differ in how faithfully they echo a payload back:
//! some stringify `metadata`, some drop optional lists, some send typed arrays as
//! plain integer lists. Only three things are fatal: the payload is not JSON, it
//! is not an object, or it has no string `content`.
//!
//! ```rust
//! use kreuzberg_bridge::wire;
//!
//! let result = wire::decode(r#"{"content": "hi", "metadata": "{\"k\": 1}"}"#).unwrap();
//! assert_eq!(result.mime_type, "text/plain");
//! assert_eq!(result.metadata.get("k"), Some(&serde_json::json!(1)));
//! ```
use crate::error::{KreuzbergError, Result};
use crate::types::{Chunk, ExtractedImage, ExtractionResult, Metadata, OcrResult, PageContent, Table};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

const DEFAULT_MIME_TYPE: &str = "text/plain";

/// Encode a result as a wire JSON string.
pub fn encode(result: &ExtractionResult) -> Result<String> {
    Ok(serde_json::to_string(result)?)
}

/// Encode a result as a wire JSON value.
pub fn encode_value(result: &ExtractionResult) -> Result<Value> {
    Ok(serde_json::to_value(result)?)
}

/// Decode a wire JSON string into a result.
pub fn decode(payload: &str) -> Result<ExtractionResult> {
    let value: Value = serde_json::from_str(payload)
        .map_err(|e| KreuzbergError::serialization_with_source("Result payload is not valid JSON", e))?;
    decode_value(&value)
}

/// Decode an already-parsed wire value into a result.
pub fn decode_value(value: &Value) -> Result<ExtractionResult> {
    let object = value
        .as_object()
        .ok_or_else(|| KreuzbergError::serialization("Result payload must be a JSON object"))?;

    let content = object
        .get("content")
        .and_then(Value::as_str)
        .ok_or_else(|| KreuzbergError::serialization("Result payload is missing a string 'content' field"))?
        .to_string();

    Ok(ExtractionResult {
        content,
        mime_type: mime_type_field(object),
        metadata: metadata_field(object.get("metadata")),
        tables: list_field::<Table>(object, "tables").unwrap_or_default(),
        detected_languages: list_field::<String>(object, "detected_languages"),
        chunks: list_field::<Chunk>(object, "chunks"),
        images: object
            .get("images")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(decode_image).collect()),
        pages: object
            .get("pages")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(decode_page).collect()),
    })
}

/// Encode an OCR backend result with the wire key set.
pub fn encode_ocr_result(result: &OcrResult) -> Result<String> {
    Ok(serde_json::to_string(result)?)
}

/// Decode a host OCR backend's JSON reply.
///
/// `content` is required; `mime_type` defaults to `text/plain`, `metadata` to an
/// empty map, and `tables` to an empty list.
pub fn decode_ocr_result(payload: &str) -> Result<OcrResult> {
    let value: Value = serde_json::from_str(payload)
        .map_err(|e| KreuzbergError::serialization_with_source("OCR payload is not valid JSON", e))?;
    let object = value
        .as_object()
        .ok_or_else(|| KreuzbergError::serialization("OCR payload must be a JSON object"))?;
    let content = object
        .get("content")
        .and_then(Value::as_str)
        .ok_or_else(|| KreuzbergError::serialization("OCR payload is missing a string 'content' field"))?
        .to_string();

    Ok(OcrResult {
        content,
        mime_type: mime_type_field(object),
        metadata: metadata_field(object.get("metadata")),
        tables: list_field::<Table>(object, "tables").unwrap_or_default(),
    })
}

/// Parse metadata transmitted either as an object or as a JSON-encoded string.
///
/// Anything else, including a string that does not hold a JSON object, yields an
/// empty map.
pub fn metadata_field(value: Option<&Value>) -> Metadata {
    match value {
        Some(Value::Object(map)) => Metadata::from(map.clone()),
        Some(Value::String(raw)) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Metadata::from(map),
            _ => {
                tracing::debug!("Discarding metadata string that is not a JSON object");
                Metadata::new()
            }
        },
        _ => Metadata::new(),
    }
}

fn mime_type_field(object: &Map<String, Value>) -> String {
    object
        .get("mime_type")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_MIME_TYPE)
        .to_string()
}

fn list_field<T: DeserializeOwned>(object: &Map<String, Value>, key: &str) -> Option<Vec<T>> {
    let items = object.get(key)?.as_array()?;
    Some(items.iter().filter_map(|item| list_item(key, item)).collect())
}

fn list_item<T: DeserializeOwned>(key: &str, item: &Value) -> Option<T> {
    match serde_json::from_value(item.clone()) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::debug!(field = key, error = %e, "Skipping malformed wire entry");
            None
        }
    }
}

fn decode_image(value: &Value) -> Option<ExtractedImage> {
    let object = value.as_object()?;

    // ocr_result is decoded with the tolerant rules, not plain serde.
    let mut shallow = object.clone();
    let ocr_value = shallow.remove("ocr_result");
    let mut image: ExtractedImage = list_item("images", &Value::Object(shallow))?;

    image.ocr_result = match ocr_value {
        Some(nested @ Value::Object(_)) => match decode_value(&nested) {
            Ok(result) => Some(Box::new(result)),
            Err(e) => {
                tracing::debug!(error = %e, "Dropping undecodable nested ocr_result");
                None
            }
        },
        _ => None,
    };

    Some(image)
}

fn decode_page(value: &Value) -> Option<PageContent> {
    let object = value.as_object()?;
    let page_number = object.get("page_number").and_then(Value::as_u64)? as usize;
    let content = object.get("content").and_then(Value::as_str)?.to_string();

    Some(PageContent {
        page_number,
        content,
        tables: list_field::<Table>(object, "tables").unwrap_or_default(),
        images: object
            .get("images")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(decode_image).collect())
            .unwrap_or_default(),
    })
}

/// Serde adapter for image bytes: base64 out, base64 or integer array in.
pub mod bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::de::{self, SeqAccess, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        deserializer.deserialize_any(BytesVisitor)
    }

    struct BytesVisitor;

    impl<'de> Visitor<'de> for BytesVisitor {
        type Value = Vec<u8>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a base64 string or an array of bytes")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            STANDARD.decode(v).map_err(E::custom)
        }

        fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
            Ok(v.to_vec())
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut out = Vec::with_capacity(seq.size_hint().unwrap_or(0));
            while let Some(byte) = seq.next_element::<u8>()? {
                out.push(byte);
            }
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChunkMetadata;
    use serde_json::json;

    fn rich_result() -> ExtractionResult {
        let mut metadata = Metadata::new();
        metadata.insert("title", "Quarterly report");
        metadata.insert("page_count", 2);
        metadata.insert("nested", json!({"a": [1, 2, 3]}));

        let table = Table {
            cells: vec![vec!["a".into(), "b".into()], vec!["1".into(), "2".into()]],
            markdown: "| a | b |\n|---|---|\n| 1 | 2 |".into(),
            page_number: 1,
        };

        let content = "Héllo wörld".to_string();
        let chunk = Chunk {
            content: content.clone(),
            embedding: Some(vec![0.25, -1.5, 3.0]),
            metadata: ChunkMetadata {
                byte_start: 0,
                byte_end: content.len(),
                token_count: Some(2),
                chunk_index: 0,
                total_chunks: 1,
                first_page: Some(1),
                last_page: Some(1),
            },
        };

        let image = ExtractedImage {
            data: vec![0x89, 0x50, 0x4e, 0x47, 0x00, 0xff],
            format: "png".into(),
            image_index: 0,
            page_number: Some(1),
            width: Some(10),
            height: Some(20),
            colorspace: Some("RGB".into()),
            bits_per_component: Some(8),
            is_mask: false,
            description: None,
            ocr_result: Some(Box::new(ExtractionResult::new("ocr text", "text/plain"))),
        };

        ExtractionResult {
            content,
            mime_type: "application/pdf".into(),
            metadata,
            tables: vec![table.clone()],
            detected_languages: Some(vec!["en".into(), "de".into()]),
            chunks: Some(vec![chunk]),
            images: Some(vec![image.clone()]),
            pages: Some(vec![PageContent {
                page_number: 1,
                content: "page one".into(),
                tables: vec![table],
                images: vec![image],
            }]),
        }
    }

    #[test]
    fn test_round_trip_rich_result() {
        let original = rich_result();
        let decoded = decode(&encode(&original).unwrap()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_round_trip_minimal_result() {
        let original = ExtractionResult::new("", "text/plain");
        let decoded = decode(&encode(&original).unwrap()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_encode_emits_nulls_for_absent_lists() {
        let value = encode_value(&ExtractionResult::new("x", "text/plain")).unwrap();
        let object = value.as_object().unwrap();

        for key in ["detected_languages", "chunks", "images", "pages"] {
            assert_eq!(object.get(key), Some(&Value::Null), "key {key} should be null");
        }
        assert_eq!(object.get("tables"), Some(&json!([])));
        assert_eq!(object.get("metadata"), Some(&json!({})));
    }

    #[test]
    fn test_encode_key_order() {
        let value = encode_value(&ExtractionResult::new("x", "text/plain")).unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(
            keys,
            vec![
                "content",
                "mime_type",
                "metadata",
                "tables",
                "detected_languages",
                "chunks",
                "images",
                "pages"
            ]
        );
    }

    #[test]
    fn test_image_bytes_are_base64_on_the_wire() {
        let value = encode_value(&rich_result()).unwrap();
        assert_eq!(value["images"][0]["data"], json!("iVBORwD/"));
    }

    #[test]
    fn test_decode_metadata_as_string() {
        let result = decode(r#"{"content": "x", "metadata": "{\"word_count\": 5}"}"#).unwrap();
        assert_eq!(result.metadata.get("word_count"), Some(&json!(5)));
    }

    #[test]
    fn test_decode_metadata_unparsable_string_is_empty() {
        let result = decode(r#"{"content": "x", "metadata": "not json"}"#).unwrap();
        assert!(result.metadata.is_empty());

        let result = decode(r#"{"content": "x", "metadata": "[1, 2]"}"#).unwrap();
        assert!(result.metadata.is_empty());
    }

    #[test]
    fn test_decode_null_metadata_is_empty() {
        let result = decode(r#"{"content": "x", "metadata": null}"#).unwrap();
        assert!(result.metadata.is_empty());
    }

    #[test]
    fn test_decode_non_array_lists_become_none() {
        let result = decode(
            r#"{"content": "x", "detected_languages": "en", "chunks": 3, "images": {}, "pages": null, "tables": "no"}"#,
        )
        .unwrap();
        assert!(result.detected_languages.is_none());
        assert!(result.chunks.is_none());
        assert!(result.images.is_none());
        assert!(result.pages.is_none());
        assert!(result.tables.is_empty());
    }

    #[test]
    fn test_decode_missing_fields_default() {
        let result = decode(r#"{"content": "only content"}"#).unwrap();
        assert_eq!(result.content, "only content");
        assert_eq!(result.mime_type, "text/plain");
        assert!(result.metadata.is_empty());
    }

    #[test]
    fn test_decode_image_bytes_from_integer_array() {
        let result = decode(r#"{"content": "x", "images": [{"data": [1, 2, 255], "format": "png", "image_index": 0}]}"#)
            .unwrap();
        let images = result.images.unwrap();
        assert_eq!(images[0].data, vec![1, 2, 255]);
        assert!(!images[0].is_mask);
    }

    #[test]
    fn test_decode_nested_ocr_result_tolerantly() {
        let payload = json!({
            "content": "outer",
            "images": [{
                "data": "AAE=",
                "format": "png",
                "image_index": 0,
                "ocr_result": {"content": "inner", "metadata": "{\"confidence\": 0.8}"}
            }]
        });
        let result = decode_value(&payload).unwrap();
        let ocr = result.images.unwrap()[0].ocr_result.clone().unwrap();
        assert_eq!(ocr.content, "inner");
        assert_eq!(ocr.metadata.get("confidence"), Some(&json!(0.8)));
    }

    #[test]
    fn test_decode_rejects_non_json() {
        let err = decode("not json at all").unwrap_err();
        assert!(matches!(err, KreuzbergError::Serialization { .. }));
    }

    #[test]
    fn test_decode_rejects_non_object() {
        let err = decode("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, KreuzbergError::Serialization { .. }));
    }

    #[test]
    fn test_decode_rejects_missing_content() {
        let err = decode(r#"{"mime_type": "text/plain"}"#).unwrap_err();
        assert!(matches!(err, KreuzbergError::Serialization { .. }));

        let err = decode(r#"{"content": 42}"#).unwrap_err();
        assert!(matches!(err, KreuzbergError::Serialization { .. }));
    }

    #[test]
    fn test_ocr_result_defaults() {
        let result = decode_ocr_result(r#"{"content": "recognized"}"#).unwrap();
        assert_eq!(result.content, "recognized");
        assert_eq!(result.mime_type, "text/plain");
        assert!(result.metadata.is_empty());
        assert!(result.tables.is_empty());
    }

    #[test]
    fn test_ocr_result_requires_content() {
        let err = decode_ocr_result(r#"{"mime_type": "text/plain"}"#).unwrap_err();
        assert!(matches!(err, KreuzbergError::Serialization { .. }));
    }

    #[test]
    fn test_ocr_result_round_trip() {
        let mut original = OcrResult::new("text");
        original.metadata.insert("language", "en");
        let decoded = decode_ocr_result(&encode_ocr_result(&original).unwrap()).unwrap();
        assert_eq!(decoded, original);
    }
}
