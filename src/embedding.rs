//! Text embeddings for the semantic validator (C6).
//!
//! `EmbeddingProvider` is the seam: the default `NullEmbeddingProvider` makes
//! semantic scoring degrade to the structural score alone (spec §4.6 "no
//! embedding provider configured"), while the optional `http-embeddings`
//! feature adds a provider that calls out to an HTTP embeddings endpoint
//! using the teacher's existing `reqwest`-free-by-default stance: no API
//! token is ever hardcoded, it comes from `EngineConfig::embedding_api_key`
//! or the `EMBEDDING_API_KEY` environment variable.

use log::warn;

/// Produces a fixed-size embedding vector for a block of text, or `None` if
/// no embedding could be produced (missing provider, request failure).
pub trait EmbeddingProvider: Send + Sync {
    fn embed(&self, text: &str) -> Option<Vec<f32>>;
}

/// The default provider: always returns `None`, so semantic scoring falls
/// back to structural-only comparison.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEmbeddingProvider;

impl EmbeddingProvider for NullEmbeddingProvider {
    fn embed(&self, _text: &str) -> Option<Vec<f32>> {
        None
    }
}

/// Cosine similarity between two embedding vectors. Returns `0.0` for
/// mismatched or empty dimensions rather than panicking, since callers
/// compare embeddings they didn't generate themselves.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

#[cfg(feature = "http-embeddings")]
pub use http::HttpEmbeddingProvider;

#[cfg(feature = "http-embeddings")]
mod http {
    use super::EmbeddingProvider;
    use serde::{Deserialize, Serialize};

    /// Calls a configurable HTTP endpoint (compatible with the common
    /// `{"input": [...]} -> {"data": [{"embedding": [...]}]}` embeddings
    /// shape) using a blocking `reqwest` client, matching the engine's
    /// synchronous, non-async style.
    pub struct HttpEmbeddingProvider {
        endpoint: String,
        api_key: String,
        client: reqwest::blocking::Client,
    }

    #[derive(Serialize)]
    struct EmbeddingRequest<'a> {
        input: &'a str,
    }

    #[derive(Deserialize)]
    struct EmbeddingResponseItem {
        embedding: Vec<f32>,
    }

    #[derive(Deserialize)]
    struct EmbeddingResponse {
        data: Vec<EmbeddingResponseItem>,
    }

    impl HttpEmbeddingProvider {
        pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
            Self {
                endpoint: endpoint.into(),
                api_key: api_key.into(),
                client: reqwest::blocking::Client::new(),
            }
        }

        /// Build a provider from `EngineConfig::embedding_api_key`, falling
        /// back to the `EMBEDDING_API_KEY` environment variable. Returns
        /// `None` if neither is set — callers should fall back to
        /// `NullEmbeddingProvider` in that case.
        pub fn from_config_or_env(
            endpoint: impl Into<String>,
            configured_key: Option<&str>,
        ) -> Option<Self> {
            let api_key = configured_key
                .map(str::to_string)
                .or_else(|| std::env::var("EMBEDDING_API_KEY").ok())?;
            Some(Self::new(endpoint, api_key))
        }
    }

    impl EmbeddingProvider for HttpEmbeddingProvider {
        fn embed(&self, text: &str) -> Option<Vec<f32>> {
            let response = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&EmbeddingRequest { input: text })
                .send()
                .and_then(|r| r.error_for_status())
                .ok()?;

            let parsed: EmbeddingResponse = response.json().ok()?;
            parsed.data.into_iter().next().map(|item| item.embedding)
        }
    }
}

/// Warn-and-degrade helper used by the validator when an embedding could
/// not be produced for one side of a comparison.
pub fn warn_embedding_unavailable(context: &str) {
    warn!("no embedding available for {context}; falling back to structural score only");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_provider_always_returns_none() {
        assert_eq!(NullEmbeddingProvider.embed("fn x() {}"), None);
    }

    #[test]
    fn cosine_similarity_of_identical_vectors_is_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_of_orthogonal_vectors_is_zero() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn mismatched_dimensions_yield_zero_not_panic() {
        let a = vec![1.0, 2.0];
        let b = vec![1.0, 2.0, 3.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }
}
