//! Vector storage and similarity search.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use super::embedder::cosine_similarity;
use super::splitter::TextNode;
use crate::errors::RetrievalError;

/// A node together with its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedNode {
    /// The stored node.
    pub node: TextNode,
    /// Its vector.
    pub embedding: Vec<f32>,
}

/// A search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredNode {
    /// Matched node.
    pub node: TextNode,
    /// Similarity to the query, higher is closer.
    pub score: f32,
}

/// Storage backend for embedded nodes.
#[async_trait]
pub trait VectorStore: Send + Sync + Debug {
    /// Inserts nodes, replacing any with the same id. Returns the ids.
    async fn add(&self, nodes: Vec<EmbeddedNode>) -> Result<Vec<String>, RetrievalError>;

    /// Returns up to `top_k` nodes ordered by descending similarity.
    async fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<ScoredNode>, RetrievalError>;

    /// Looks up a node by id.
    async fn get(&self, id: &str) -> Result<Option<TextNode>, RetrievalError>;

    /// Removes a node; returns whether it existed.
    async fn delete(&self, id: &str) -> Result<bool, RetrievalError>;

    /// Number of stored nodes.
    async fn count(&self) -> Result<usize, RetrievalError>;

    /// Removes everything.
    async fn clear(&self) -> Result<(), RetrievalError>;
}

/// Brute-force cosine search over an in-process list.
///
/// The first vector stored fixes the dimension until the store is cleared.
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    entries: RwLock<Vec<EmbeddedNode>>,
}

impl InMemoryVectorStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn check_dimension(expected: Option<usize>, actual: usize) -> Result<(), RetrievalError> {
        match expected {
            Some(expected) if expected != actual => {
                Err(RetrievalError::DimensionMismatch { expected, actual })
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn add(&self, nodes: Vec<EmbeddedNode>) -> Result<Vec<String>, RetrievalError> {
        let mut entries = self.entries.write();
        let mut dimension = entries.first().map(|e| e.embedding.len());
        for node in &nodes {
            Self::check_dimension(dimension, node.embedding.len())?;
            dimension = Some(node.embedding.len());
        }

        let mut ids = Vec::with_capacity(nodes.len());
        for node in nodes {
            ids.push(node.node.id.clone());
            match entries.iter_mut().find(|e| e.node.id == node.node.id) {
                Some(existing) => *existing = node,
                None => entries.push(node),
            }
        }
        Ok(ids)
    }

    async fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<ScoredNode>, RetrievalError> {
        let entries = self.entries.read();
        Self::check_dimension(entries.first().map(|e| e.embedding.len()), query.len())?;

        let mut scored: Vec<ScoredNode> = entries
            .iter()
            .map(|e| ScoredNode {
                node: e.node.clone(),
                score: cosine_similarity(query, &e.embedding),
            })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn get(&self, id: &str) -> Result<Option<TextNode>, RetrievalError> {
        Ok(self
            .entries
            .read()
            .iter()
            .find(|e| e.node.id == id)
            .map(|e| e.node.clone()))
    }

    async fn delete(&self, id: &str) -> Result<bool, RetrievalError> {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|e| e.node.id != id);
        Ok(entries.len() != before)
    }

    async fn count(&self) -> Result<usize, RetrievalError> {
        Ok(self.entries.read().len())
    }

    async fn clear(&self) -> Result<(), RetrievalError> {
        self.entries.write().clear();
        Ok(())
    }
}
