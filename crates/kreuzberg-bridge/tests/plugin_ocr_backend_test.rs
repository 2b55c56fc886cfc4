//! Host OCR backend tests: payload shapes, routing, and error propagation.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use kreuzberg_bridge::plugins::{
    Awaitable, HostOcrBackend, OcrBackendAdapter, OcrCallback, Plugin, clear_ocr_backends, global_registry,
    list_ocr_backends, register_ocr_backend, unregister_ocr_backend,
};
use kreuzberg_bridge::{ExtractionConfig, KreuzbergError, OcrArgument, OcrConfig, extract_bytes_sync};
use parking_lot::Mutex;
use serde_json::json;
use serial_test::serial;
use std::sync::Arc;

const PNG_HEADER: &[u8] = &[0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00];

/// Backend that records every `(bytes, language)` pair it receives.
fn recording_backend(name: &str, languages: &[&str], seen: Arc<Mutex<Vec<(Vec<u8>, String)>>>) -> Arc<HostOcrBackend> {
    let callback: OcrCallback = Arc::new(move |bytes: Vec<u8>, language: String| {
        seen.lock().push((bytes.clone(), language.clone()));
        Awaitable::pending(async move {
            Ok::<_, String>(
                json!({
                    "content": format!("recognized {} bytes", bytes.len()),
                    "mime_type": "text/plain",
                    "metadata": {"ocr_language": language},
                    "tables": [{"cells": [["a"]], "markdown": "| a |", "page_number": 1}],
                })
                .to_string(),
            )
        })
    });
    Arc::new(HostOcrBackend::new(
        name,
        languages.iter().map(|l| l.to_string()).collect(),
        callback,
    ))
}

#[tokio::test]
async fn test_payload_shapes_reach_backend_identically() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let adapter = OcrBackendAdapter::new(recording_backend("shapes", &["en"], Arc::clone(&seen))).with_debug_payloads(true);
    let bytes = PNG_HEADER.to_vec();

    adapter
        .process(OcrArgument::Bytes(bytes.clone()), Some("en".into()))
        .await
        .unwrap();
    adapter
        .process(OcrArgument::Tuple(vec![OcrArgument::Bytes(bytes.clone()), "en".into()]), None)
        .await
        .unwrap();
    adapter
        .process(
            OcrArgument::Tuple(vec![OcrArgument::Tuple(vec![
                OcrArgument::Bytes(bytes.clone()),
                "en".into(),
            ])]),
            None,
        )
        .await
        .unwrap();
    adapter
        .process(OcrArgument::Text(STANDARD.encode(&bytes)), Some("en".into()))
        .await
        .unwrap();

    let seen = seen.lock();
    assert_eq!(seen.len(), 4);
    for call in seen.iter() {
        assert_eq!(call, &(bytes.clone(), "en".to_string()));
    }
}

#[tokio::test]
async fn test_json_shaped_arguments() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let adapter = OcrBackendAdapter::new(recording_backend("json", &["en"], Arc::clone(&seen)));
    let encoded = STANDARD.encode(PNG_HEADER);

    let payload = OcrArgument::from_json(json!([[encoded, "en"]])).unwrap();
    let wire = adapter.process_to_wire(payload, None).await.unwrap();

    let value: serde_json::Value = serde_json::from_str(&wire).unwrap();
    assert_eq!(value["content"], json!("recognized 10 bytes"));
    assert_eq!(value["metadata"]["ocr_language"], json!("en"));
    assert_eq!(value["tables"][0]["markdown"], json!("| a |"));
    assert_eq!(seen.lock()[0].0, PNG_HEADER.to_vec());
}

#[tokio::test]
async fn test_missing_language_and_bad_base64() {
    let adapter = OcrBackendAdapter::new(recording_backend("errors", &["en"], Arc::new(Mutex::new(Vec::new()))));

    let err = adapter.process(OcrArgument::Bytes(vec![1, 2]), None).await.unwrap_err();
    assert!(matches!(err, KreuzbergError::MissingLanguageParameter(_)));

    let err = adapter
        .process(OcrArgument::Text("%%%".to_string()), Some("en".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, KreuzbergError::Serialization { .. }));
}

#[test]
#[serial]
fn test_registration_requires_languages() {
    clear_ocr_backends();

    let err = register_ocr_backend(recording_backend("mute", &[], Arc::new(Mutex::new(Vec::new())))).unwrap_err();
    assert!(matches!(err, KreuzbergError::Validation { .. }));

    let err = register_ocr_backend(recording_backend("", &["en"], Arc::new(Mutex::new(Vec::new())))).unwrap_err();
    assert!(matches!(err, KreuzbergError::InvalidName { .. }));

    assert!(list_ocr_backends().is_empty());
}

#[test]
#[serial]
fn test_image_extraction_routes_through_registered_backend() {
    clear_ocr_backends();
    let seen = Arc::new(Mutex::new(Vec::new()));
    register_ocr_backend(recording_backend("host-ocr", &["eng", "deu"], Arc::clone(&seen))).unwrap();

    let config = ExtractionConfig {
        ocr: Some(OcrConfig {
            backend: Some("host-ocr".to_string()),
            language: "deu".to_string(),
        }),
        ..Default::default()
    };
    let result = extract_bytes_sync(PNG_HEADER, "image/png", &config).unwrap();

    assert_eq!(result.content, "recognized 10 bytes");
    assert_eq!(result.metadata.get("ocr_language"), Some(&json!("deu")));
    assert_eq!(result.tables.len(), 1);
    assert_eq!(seen.lock()[0].1, "deu");

    clear_ocr_backends();
}

#[test]
#[serial]
fn test_backend_lookup_by_language() {
    clear_ocr_backends();
    register_ocr_backend(recording_backend("english", &["eng"], Arc::new(Mutex::new(Vec::new())))).unwrap();
    register_ocr_backend(recording_backend("german", &["deu"], Arc::new(Mutex::new(Vec::new())))).unwrap();

    let registry = global_registry();
    assert_eq!(registry.get_ocr_backend_for_language("deu").unwrap().name(), "german");
    assert!(registry.get_ocr_backend_for_language("jpn").is_err());

    let config = ExtractionConfig {
        ocr: Some(OcrConfig {
            backend: None,
            language: "jpn".to_string(),
        }),
        ..Default::default()
    };
    let err = extract_bytes_sync(PNG_HEADER, "image/png", &config).unwrap_err();
    assert!(matches!(err, KreuzbergError::Ocr { .. }));

    unregister_ocr_backend("english");
    assert_eq!(list_ocr_backends(), vec!["german"]);
    clear_ocr_backends();
}

#[test]
#[serial]
fn test_backend_failure_is_fatal() {
    clear_ocr_backends();
    let callback: OcrCallback =
        Arc::new(|_: Vec<u8>, _: String| Awaitable::ready(Err::<String, _>("engine unavailable".to_string())));
    register_ocr_backend(Arc::new(HostOcrBackend::new("down", vec!["eng".to_string()], callback))).unwrap();

    let config = ExtractionConfig {
        ocr: Some(OcrConfig::default()),
        ..Default::default()
    };
    let err = extract_bytes_sync(PNG_HEADER, "image/jpeg", &config).unwrap_err();
    assert_eq!(err.to_string(), "OCR error: engine unavailable");

    clear_ocr_backends();
}
