//! Ollama HTTP client for embeddings.

use crate::ai::{check_status, non_empty, prepare_input, EmbeddingProvider};
use crate::errors::{AppResult, EmbeddingError};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Request body for embedding generation.
#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

/// Response from embedding generation.
#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

/// Client for interacting with the Ollama API.
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: Client,
}

impl OllamaClient {
    /// Creates a new Ollama client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the Ollama API (e.g., "http://127.0.0.1:11434")
    /// * `model` - Name of the embedding model (e.g., "nomic-embed-text")
    /// * `timeout` - Upper bound for a single request
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(EmbeddingError::ProviderUnreachable)?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client,
        })
    }
}

impl EmbeddingProvider for OllamaClient {
    /// Generates an embedding for the given text.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Ollama API is not reachable or the request times out
    /// - Model is not found
    /// - API returns an error response or an empty vector
    fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        debug!("Generating embedding with model: {}", self.model);

        let url = format!("{}/api/embeddings", self.base_url);
        let prompt = prepare_input(text);
        let request = EmbedRequest {
            model: &self.model,
            prompt: &prompt,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .map_err(EmbeddingError::ProviderUnreachable)?;
        let response = check_status(response, &self.model)?;

        let embed_response: EmbedResponse = response.json().map_err(|e| {
            EmbeddingError::InvalidResponse(format!("Failed to parse embedding response: {}", e))
        })?;

        debug!(
            "Generated embedding with {} dimensions",
            embed_response.embedding.len()
        );
        non_empty(embed_response.embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ollama_client_creation_trims_trailing_slash() {
        let client =
            OllamaClient::new("http://localhost:11434/", "nomic-embed-text", Duration::from_secs(5))
                .unwrap();
        assert_eq!(client.base_url, "http://localhost:11434");
        assert_eq!(client.model, "nomic-embed-text");
    }
}
