//! Retrieval settings.

use serde::{Deserialize, Serialize};

use super::splitter::{SentenceSplitter, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::errors::RetrievalError;

/// Chunking and search parameters shared by an index and its query engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalSettings {
    /// Chunk size in tokens.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between chunks in tokens.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Number of passages handed to the synthesizer.
    #[serde(default = "default_similarity_top_k")]
    pub similarity_top_k: usize,

    /// Embedding model name for remote embedders.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_chunk_overlap() -> usize {
    DEFAULT_CHUNK_OVERLAP
}

fn default_similarity_top_k() -> usize {
    2
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            similarity_top_k: default_similarity_top_k(),
            embedding_model: default_embedding_model(),
        }
    }
}

impl RetrievalSettings {
    /// Creates the default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the chunk size.
    #[must_use]
    pub const fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Sets the chunk overlap.
    #[must_use]
    pub const fn with_chunk_overlap(mut self, chunk_overlap: usize) -> Self {
        self.chunk_overlap = chunk_overlap;
        self
    }

    /// Sets how many passages a query retrieves (at least one).
    #[must_use]
    pub fn with_similarity_top_k(mut self, top_k: usize) -> Self {
        self.similarity_top_k = top_k.max(1);
        self
    }

    /// Sets the embedding model name.
    #[must_use]
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    /// Builds the splitter these settings describe.
    pub fn splitter(&self) -> Result<SentenceSplitter, RetrievalError> {
        SentenceSplitter::new(self.chunk_size, self.chunk_overlap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let settings = RetrievalSettings::default();
        assert_eq!(settings.chunk_size, 1024);
        assert_eq!(settings.chunk_overlap, 128);
        assert_eq!(settings.similarity_top_k, 2);
        assert_eq!(settings.embedding_model, "text-embedding-3-small");
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: RetrievalSettings = serde_json::from_str(r#"{"chunk_size": 256}"#).unwrap();
        assert_eq!(settings.chunk_size, 256);
        assert_eq!(settings.chunk_overlap, 128);
        assert_eq!(settings.splitter().unwrap().chunk_size(), 256);
    }

    #[test]
    fn test_bad_overlap_fails_at_splitter() {
        let settings = RetrievalSettings::new().with_chunk_size(64).with_chunk_overlap(64);
        assert!(settings.splitter().is_err());
        assert_eq!(RetrievalSettings::new().with_similarity_top_k(0).similarity_top_k, 1);
    }
}
