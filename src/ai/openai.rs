//! Client for OpenAI-compatible `/v1/embeddings` endpoints.

use crate::ai::{check_status, non_empty, prepare_input, EmbeddingProvider};
use crate::errors::{AppResult, EmbeddingError};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Embedding client for the OpenAI API and compatible servers.
pub struct OpenAiClient {
    base_url: String,
    model: String,
    api_key: String,
    client: Client,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl OpenAiClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(EmbeddingError::ProviderUnreachable)?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
            client,
        })
    }
}

impl EmbeddingProvider for OpenAiClient {
    fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        debug!("Requesting embedding from {} with model {}", self.base_url, self.model);

        let url = format!("{}/v1/embeddings", self.base_url);
        let input = prepare_input(text);
        let request = EmbeddingsRequest {
            model: &self.model,
            input: [input.as_str()],
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .map_err(EmbeddingError::ProviderUnreachable)?;
        let response = check_status(response, &self.model)?;

        let body: EmbeddingsResponse = response.json().map_err(|e| {
            EmbeddingError::InvalidResponse(format!("Failed to parse embedding response: {}", e))
        })?;

        let embedding = body
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or_else(|| EmbeddingError::InvalidResponse("response has no data".to_string()))?;
        non_empty(embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_api_key() {
        let client = OpenAiClient::new(
            "https://api.openai.com",
            "text-embedding-3-large",
            "sk-secret",
            Duration::from_secs(5),
        )
        .unwrap();
        let debug = format!("{:?}", client);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_request_shape() {
        let request = EmbeddingsRequest {
            model: "text-embedding-3-large",
            input: ["Went hiking"],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "text-embedding-3-large");
        assert_eq!(json["input"][0], "Went hiking");
    }
}
