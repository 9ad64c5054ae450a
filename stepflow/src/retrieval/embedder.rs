//! Text embedding backends.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::fmt::Debug;

use crate::errors::RetrievalError;

/// Produces dense vectors for text.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Embedder: Send + Sync + Debug {
    /// Embeds one text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError>;

    /// Embeds several texts, preserving order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError>;

    /// Length of every vector this embedder returns.
    fn dimension(&self) -> usize;

    /// Model identifier, for logs.
    fn model_name(&self) -> &str;
}

/// Deterministic bag-of-words embedder using the hashing trick.
///
/// Each lowercase word is hashed into one of `dimension` buckets with a
/// sign taken from the hash; the result is L2-normalised. Texts sharing
/// vocabulary get a high cosine similarity, which is enough for tests and
/// offline demos.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self { dimension: 256 }
    }
}

impl HashingEmbedder {
    /// Creates an embedder with `dimension` buckets (at least one).
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimension];
        let words = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase);

        for word in words {
            let digest = Sha256::digest(word.as_bytes());
            let mut bucket = [0_u8; 8];
            bucket.copy_from_slice(&digest[..8]);
            let bucket = u64::from_le_bytes(bucket) % self.dimension as u64;
            let index = usize::try_from(bucket).unwrap_or_default();
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[index] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
        Ok(self.vectorize(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
        Ok(texts.iter().map(|t| self.vectorize(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "hashing"
    }
}

#[cfg(feature = "openai")]
pub use self::openai::OpenAiEmbedder;

#[cfg(feature = "openai")]
mod openai {
    use super::{async_trait, Embedder, RetrievalError};
    use crate::llm::OpenAiClient;

    const BATCH_SIZE: usize = 100;

    /// Embeddings from the OpenAI `embeddings` endpoint.
    #[derive(Debug, Clone)]
    pub struct OpenAiEmbedder {
        client: OpenAiClient,
        dimension: usize,
    }

    impl OpenAiEmbedder {
        /// Wraps a client; the model comes from its `embedding_model` setting.
        #[must_use]
        pub fn new(client: OpenAiClient) -> Self {
            let dimension = known_dimension(&client.config().embedding_model);
            Self { client, dimension }
        }

        /// Builds a client from the `OPENAI_*` environment variables.
        pub fn from_env() -> Result<Self, RetrievalError> {
            Ok(Self::new(OpenAiClient::from_env()?))
        }
    }

    fn known_dimension(model: &str) -> usize {
        match model {
            "text-embedding-3-large" => 3072,
            _ => 1536,
        }
    }

    #[async_trait]
    impl Embedder for OpenAiEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
            self.embed_batch(&[text.to_string()])
                .await?
                .pop()
                .ok_or_else(|| RetrievalError::Embedding("empty embedding response".into()))
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
            let mut vectors = Vec::with_capacity(texts.len());
            for batch in texts.chunks(BATCH_SIZE) {
                vectors.extend(self.client.embed_texts(batch).await?);
            }
            Ok(vectors)
        }

        fn dimension(&self) -> usize {
            self.dimension
        }

        fn model_name(&self) -> &str {
            &self.client.config().embedding_model
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::llm::LlmConfig;

        #[test]
        fn test_dimension_follows_model() {
            let client = OpenAiClient::new(
                LlmConfig::new("sk-test").with_embedding_model("text-embedding-3-large"),
            )
            .unwrap();
            let embedder = OpenAiEmbedder::new(client);
            assert_eq!(embedder.dimension(), 3072);
            assert_eq!(embedder.model_name(), "text-embedding-3-large");
        }
    }
}

/// Cosine similarity of two vectors; zero when either has no magnitude.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
