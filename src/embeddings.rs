//! Embedding provider adapter (C5): deterministic batched text-to-vector
//! mapping against an OpenAI-compatible endpoint.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tiktoken_rs::CoreBPE;

use crate::config::EmbeddingConfig;
use crate::models::page::EMBEDDING_DIM;

/// Pages are embedded in batches of this size rather than one request per
/// page (SPEC_FULL 4.3).
pub const BATCH_SIZE: usize = 64;

/// The model's token limit; input is collapsed and truncated to this many
/// `cl100k_base` BPE tokens before being sent.
pub const TOKEN_LIMIT: usize = 8192;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("failed to load tokenizer: {0}")]
    Tokenizer(String),
    #[error("embedding provider returned {count} vectors for {expected} inputs")]
    CountMismatch { count: usize, expected: usize },
    #[error("embedding provider returned a vector of length {len}, expected {EMBEDDING_DIM}")]
    WrongDimension { len: usize },
}

/// The embedding provider's wire contract takes token-id arrays, not raw
/// strings (SPEC_FULL 6): `"input": [[<token ids>], ...]`.
#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: Vec<Vec<u32>>,
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingEntry>,
}

#[derive(Deserialize)]
struct EmbeddingEntry {
    embedding: Vec<f32>,
}

#[async_trait::async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embed `texts` in request order, batching internally. Returns one
    /// vector per input, in the same order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

pub struct OpenAiEmbeddingClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    bpe: Arc<CoreBPE>,
}

impl OpenAiEmbeddingClient {
    pub fn new(config: &EmbeddingConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                let mut auth = reqwest::header::HeaderValue::from_str(&format!(
                    "Bearer {}",
                    config.api_key
                ))
                .expect("api key must be a valid header value");
                auth.set_sensitive(true);
                headers.insert(reqwest::header::AUTHORIZATION, auth);
                headers
            })
            .build()
            .expect("failed to build embedding HTTP client");

        let bpe = tiktoken_rs::cl100k_base().expect("cl100k_base tokenizer must load");

        Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            bpe: Arc::new(bpe),
        }
    }

    async fn embed_batch(&self, batch: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let input: Vec<Vec<u32>> = batch.iter().map(|t| tokenize(&self.bpe, t)).collect();
        let request = EmbeddingRequest {
            input,
            model: &self.model,
        };

        let response: EmbeddingResponse = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if response.data.len() != batch.len() {
            return Err(EmbeddingError::CountMismatch {
                count: response.data.len(),
                expected: batch.len(),
            });
        }

        for entry in &response.data {
            if entry.embedding.len() != EMBEDDING_DIM {
                return Err(EmbeddingError::WrongDimension {
                    len: entry.embedding.len(),
                });
            }
        }

        Ok(response.data.into_iter().map(|e| e.embedding).collect())
    }
}

#[async_trait::async_trait]
impl EmbeddingClient for OpenAiEmbeddingClient {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(BATCH_SIZE) {
            out.extend(self.embed_batch(chunk).await?);
        }
        Ok(out)
    }
}

/// Collapse runs of whitespace, then BPE-encode and truncate to
/// `TOKEN_LIMIT` tokens — the same normalization the original service
/// applies before sending token-id arrays upstream (some uploaded files
/// contain poster-sized pages with tiny font sizes and enormous text runs).
fn tokenize(bpe: &CoreBPE, text: &str) -> Vec<u32> {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    bpe.encode_ordinary(&collapsed)
        .into_iter()
        .take(TOKEN_LIMIT)
        .map(|id| id as u32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_collapses_whitespace_before_encoding() {
        let bpe = tiktoken_rs::cl100k_base().unwrap();
        let spaced = tokenize(&bpe, "a   b\n\tc");
        let collapsed = tokenize(&bpe, "a b c");
        assert_eq!(spaced, collapsed);
    }

    #[test]
    fn tokenize_truncates_to_token_limit() {
        let bpe = tiktoken_rs::cl100k_base().unwrap();
        let long = "word ".repeat(TOKEN_LIMIT + 10);
        let tokens = tokenize(&bpe, &long);
        assert!(tokens.len() <= TOKEN_LIMIT);
    }
}
