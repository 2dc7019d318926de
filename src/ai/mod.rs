//! Embedding providers for semantic search.
//!
//! The core treats embedding as an opaque synchronous call that may fail.
//! Two HTTP providers are available: a local Ollama server and an
//! OpenAI-compatible embeddings endpoint. Neither retries; a failed request
//! surfaces as an `EmbeddingError` to the caller.
//!
//! # Module Structure
//!
//! - `ollama`: client for Ollama's `/api/embeddings`
//! - `openai`: client for `/v1/embeddings`
//!
//! # Example
//!
//! ```no_run
//! use daybook::ai::{EmbeddingProvider, OllamaClient};
//! use std::time::Duration;
//!
//! let client = OllamaClient::new("http://127.0.0.1:11434", "nomic-embed-text", Duration::from_secs(30))?;
//! let embedding = client.embed("Went hiking")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod ollama;
pub mod openai;

pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

use crate::config::{Config, EmbedProvider};
use crate::errors::{AppResult, EmbeddingError};
use reqwest::blocking::Response;
use std::sync::Arc;

/// Computes embedding vectors for text.
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the embedding of `text`.
    fn embed(&self, text: &str) -> AppResult<Vec<f32>>;
}

/// Builds the provider selected in `config`, or `None` when embeddings are disabled.
pub fn provider_from_config(config: &Config) -> AppResult<Option<Arc<dyn EmbeddingProvider>>> {
    let provider: Arc<dyn EmbeddingProvider> = match config.embed_provider {
        EmbedProvider::None => return Ok(None),
        EmbedProvider::Ollama => Arc::new(OllamaClient::new(
            config.embed_url.clone(),
            config.embed_model.clone(),
            config.embed_timeout,
        )?),
        EmbedProvider::OpenAi => Arc::new(OpenAiClient::new(
            config.embed_url.clone(),
            config.embed_model.clone(),
            config.embed_api_key.clone().unwrap_or_default(),
            config.embed_timeout,
        )?),
    };
    Ok(Some(provider))
}

/// Newlines are flattened before embedding; line breaks carry no meaning here.
pub(crate) fn prepare_input(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

/// Maps a non-success HTTP status to an `EmbeddingError`.
pub(crate) fn check_status(response: Response, model: &str) -> AppResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response.text().unwrap_or_default();
    if status.as_u16() == 404 {
        return Err(EmbeddingError::ModelNotFound(model.to_string()).into());
    }
    Err(EmbeddingError::InvalidResponse(format!("HTTP {}: {}", status, error_text)).into())
}

/// Rejects empty vectors, which would make every similarity zero.
pub(crate) fn non_empty(embedding: Vec<f32>) -> AppResult<Vec<f32>> {
    if embedding.is_empty() {
        return Err(EmbeddingError::InvalidResponse("empty embedding".to_string()).into());
    }
    Ok(embedding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_prepare_input_flattens_newlines() {
        assert_eq!(
            prepare_input("-- 10:00 --\nWent hiking\r\n"),
            "-- 10:00 -- Went hiking  "
        );
    }

    #[test]
    fn test_provider_from_config_none() {
        let config = Config::with_data_dir(PathBuf::from("/tmp/daybook"));
        assert!(provider_from_config(&config).unwrap().is_none());
    }

    #[test]
    fn test_provider_from_config_ollama() {
        let mut config = Config::with_data_dir(PathBuf::from("/tmp/daybook"));
        config.embed_provider = EmbedProvider::Ollama;
        config.embed_url = "http://localhost:11434".to_string();
        config.embed_model = "nomic-embed-text".to_string();
        assert!(provider_from_config(&config).unwrap().is_some());
    }

    #[test]
    fn test_non_empty_rejects_empty_vector() {
        assert!(non_empty(vec![]).is_err());
        assert_eq!(non_empty(vec![1.0]).unwrap(), vec![1.0]);
    }
}
