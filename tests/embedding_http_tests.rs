//! Embedding providers and the store against a mocked HTTP server.

use chrono::{NaiveDate, NaiveDateTime};
use daybook::ai::{provider_from_config, EmbeddingProvider, OllamaClient, OpenAiClient};
use daybook::config::EmbedProvider;
use daybook::errors::{AppError, EmbeddingError};
use daybook::ops;
use daybook::{Config, DiaryStore};
use mockito::Matcher;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tempfile::tempdir;

const MODEL: &str = "nomic-embed-text";

fn timeout() -> Duration {
    Duration::from_secs(5)
}

fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 4, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

fn ollama_store(data_dir: &Path, url: &str) -> DiaryStore {
    let mut config = Config::with_data_dir(data_dir.to_path_buf());
    config.embed_provider = EmbedProvider::Ollama;
    config.embed_url = url.to_string();
    config.embed_model = MODEL.to_string();
    config.validate().unwrap();
    let provider = provider_from_config(&config).unwrap();
    DiaryStore::open(&config, provider).unwrap()
}

#[test]
fn test_ollama_embed_success() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/api/embeddings")
        .match_body(Matcher::PartialJson(json!({
            "model": MODEL,
            "prompt": "-- 09:00 -- Went hiking "
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"embedding":[0.1,0.2,0.3]}"#)
        .create();

    let client = OllamaClient::new(server.url(), MODEL, timeout()).unwrap();
    let embedding = client.embed("-- 09:00 --\nWent hiking\n").unwrap();

    assert_eq!(embedding, vec![0.1, 0.2, 0.3]);
    mock.assert();
}

#[test]
fn test_ollama_model_not_found() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("POST", "/api/embeddings")
        .with_status(404)
        .with_body(r#"{"error":"model not found"}"#)
        .create();

    let client = OllamaClient::new(server.url(), "missing-model", timeout()).unwrap();
    match client.embed("text") {
        Err(AppError::Embedding(EmbeddingError::ModelNotFound(model))) => {
            assert_eq!(model, "missing-model")
        }
        other => panic!("expected ModelNotFound, got {:?}", other),
    }
}

#[test]
fn test_ollama_server_error() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("POST", "/api/embeddings")
        .with_status(500)
        .with_body("boom")
        .create();

    let client = OllamaClient::new(server.url(), MODEL, timeout()).unwrap();
    match client.embed("text") {
        Err(AppError::Embedding(EmbeddingError::InvalidResponse(message))) => {
            assert!(message.contains("500"));
            assert!(message.contains("boom"));
        }
        other => panic!("expected InvalidResponse, got {:?}", other),
    }
}

#[test]
fn test_ollama_empty_or_malformed_embedding() {
    let mut server = mockito::Server::new();
    let _empty = server
        .mock("POST", "/api/embeddings")
        .match_body(Matcher::Regex("empty".to_string()))
        .with_status(200)
        .with_body(r#"{"embedding":[]}"#)
        .create();
    let _malformed = server
        .mock("POST", "/api/embeddings")
        .match_body(Matcher::Regex("garbled".to_string()))
        .with_status(200)
        .with_body("not json")
        .create();

    let client = OllamaClient::new(server.url(), MODEL, timeout()).unwrap();
    assert!(matches!(
        client.embed("empty"),
        Err(AppError::Embedding(EmbeddingError::InvalidResponse(_)))
    ));
    assert!(matches!(
        client.embed("garbled"),
        Err(AppError::Embedding(EmbeddingError::InvalidResponse(_)))
    ));
}

#[test]
fn test_ollama_unreachable() {
    // Nothing listens on port 1
    let client = OllamaClient::new("http://127.0.0.1:1", MODEL, timeout()).unwrap();
    assert!(matches!(
        client.embed("text"),
        Err(AppError::Embedding(EmbeddingError::ProviderUnreachable(_)))
    ));
}

#[test]
fn test_openai_embed_success() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/v1/embeddings")
        .match_header("authorization", "Bearer sk-test")
        .match_body(Matcher::PartialJson(json!({
            "model": "text-embedding-3-large",
            "input": ["Went hiking"]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"object":"list","data":[{"object":"embedding","index":0,"embedding":[0.5,-0.5]}]}"#)
        .create();

    let client =
        OpenAiClient::new(server.url(), "text-embedding-3-large", "sk-test", timeout()).unwrap();
    assert_eq!(client.embed("Went hiking").unwrap(), vec![0.5, -0.5]);
    mock.assert();
}

#[test]
fn test_openai_errors() {
    let mut server = mockito::Server::new();
    let _no_data = server
        .mock("POST", "/v1/embeddings")
        .match_body(Matcher::Regex("nodata".to_string()))
        .with_status(200)
        .with_body(r#"{"data":[]}"#)
        .create();
    let _unauthorized = server
        .mock("POST", "/v1/embeddings")
        .match_body(Matcher::Regex("denied".to_string()))
        .with_status(401)
        .with_body(r#"{"error":{"message":"Incorrect API key"}}"#)
        .create();

    let client =
        OpenAiClient::new(server.url(), "text-embedding-3-large", "sk-test", timeout()).unwrap();
    assert!(matches!(
        client.embed("nodata"),
        Err(AppError::Embedding(EmbeddingError::InvalidResponse(_)))
    ));
    match client.embed("denied") {
        Err(AppError::Embedding(EmbeddingError::InvalidResponse(message))) => {
            assert!(message.contains("401"))
        }
        other => panic!("expected InvalidResponse, got {:?}", other),
    }
}

#[test]
fn test_store_search_end_to_end() {
    let mut server = mockito::Server::new();
    let _outdoors = server
        .mock("POST", "/api/embeddings")
        .match_body(Matcher::Regex("hiking|mountain".to_string()))
        .with_status(200)
        .with_body(r#"{"embedding":[1.0,0.0]}"#)
        .create();
    let _office = server
        .mock("POST", "/api/embeddings")
        .match_body(Matcher::Regex("spreadsheet".to_string()))
        .with_status(200)
        .with_body(r#"{"embedding":[0.0,1.0]}"#)
        .create();

    let dir = tempdir().unwrap();
    let store = ollama_store(dir.path(), &server.url());
    store.append_text("Went hiking", at(1, 9, 0)).unwrap();
    store.append_text("Fixed a spreadsheet", at(2, 9, 0)).unwrap();

    // A fresh store reads the embeddings back from the cache
    let reopened = ollama_store(dir.path(), &server.url());
    let entries = reopened.load_all().unwrap();
    assert!(entries.iter().all(|e| e.embedding.is_some()));

    let embedder = reopened.embedder().unwrap();
    let matches = ops::rank(embedder, "mountain trail", &entries, 1).unwrap();
    assert_eq!(matches.len(), 1);
    assert!(matches[0].entry.text.contains("Went hiking"));

    let similar = ops::similar_to(&entries[1], &entries, 5).unwrap();
    assert_eq!(similar.len(), 1);
    assert_eq!(similar[0].entry.day(), entries[0].day());
}

#[test]
fn test_append_survives_outage_and_reindex_fills_gap() {
    let dir = tempdir().unwrap();

    let mut down = mockito::Server::new();
    let _unavailable = down
        .mock("POST", "/api/embeddings")
        .with_status(503)
        .with_body("overloaded")
        .create();

    let store = ollama_store(dir.path(), &down.url());
    let entry = store.append_text("Rainy day", at(3, 10, 0)).unwrap();
    assert!(entry.embedding.is_none());
    assert_eq!(store.load_all().unwrap()[0].text, entry.text);

    let mut up = mockito::Server::new();
    let embed_mock = up
        .mock("POST", "/api/embeddings")
        .with_status(200)
        .with_body(r#"{"embedding":[0.3,0.4]}"#)
        .expect(1)
        .create();

    let store = ollama_store(dir.path(), &up.url());
    let report = store.reindex(false).unwrap();
    assert_eq!(report.embedded, 1);

    // Nothing left to do on a second pass
    let report = store.reindex(false).unwrap();
    assert_eq!(report.embedded, 0);
    assert_eq!(report.up_to_date, 1);
    embed_mock.assert();

    assert_eq!(
        store.load_all().unwrap()[0].embedding.as_deref(),
        Some(&[0.3f32, 0.4][..])
    );
}
