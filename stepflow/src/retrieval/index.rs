//! Vector index over chunked documents.

use std::sync::Arc;

use super::config::RetrievalSettings;
use super::document::Document;
use super::embedder::Embedder;
use super::query::QueryEngine;
use super::splitter::SentenceSplitter;
use super::vector_store::{EmbeddedNode, InMemoryVectorStore, ScoredNode, VectorStore};
use crate::errors::RetrievalError;
use crate::llm::LlmClient;

/// Chunks documents, embeds the chunks and answers similarity queries.
#[derive(Debug, Clone)]
pub struct VectorStoreIndex {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    splitter: SentenceSplitter,
    similarity_top_k: usize,
}

impl VectorStoreIndex {
    /// Creates an empty index over `store` with default settings.
    #[must_use]
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            embedder,
            store,
            splitter: SentenceSplitter::default(),
            similarity_top_k: RetrievalSettings::default().similarity_top_k,
        }
    }

    /// Applies chunking and search settings.
    pub fn with_settings(mut self, settings: &RetrievalSettings) -> Result<Self, RetrievalError> {
        self.splitter = settings.splitter()?;
        self.similarity_top_k = settings.similarity_top_k.max(1);
        Ok(self)
    }

    /// Builds an in-memory index holding `documents`.
    pub async fn from_documents(
        documents: &[Document],
        embedder: Arc<dyn Embedder>,
        settings: &RetrievalSettings,
    ) -> Result<Self, RetrievalError> {
        let index =
            Self::new(embedder, Arc::new(InMemoryVectorStore::new())).with_settings(settings)?;
        index.insert(documents).await?;
        Ok(index)
    }

    /// Chunks, embeds and stores `documents`. Returns the number of nodes added.
    pub async fn insert(&self, documents: &[Document]) -> Result<usize, RetrievalError> {
        let nodes = self.splitter.split_documents(documents)?;
        if nodes.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = nodes.iter().map(|n| n.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != nodes.len() {
            return Err(RetrievalError::Embedding(format!(
                "expected {} embeddings, got {}",
                nodes.len(),
                embeddings.len()
            )));
        }

        let embedded: Vec<EmbeddedNode> = nodes
            .into_iter()
            .zip(embeddings)
            .map(|(node, embedding)| EmbeddedNode { node, embedding })
            .collect();
        let added = self.store.add(embedded).await?.len();

        tracing::info!(
            documents = documents.len(),
            nodes = added,
            model = self.embedder.model_name(),
            "Indexed documents"
        );
        Ok(added)
    }

    /// Returns the `top_k` nodes most similar to `query`.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<ScoredNode>, RetrievalError> {
        let embedding = self.embedder.embed(query).await?;
        self.store.search(&embedding, top_k).await
    }

    /// Wraps the index in a query engine that answers with `llm`.
    #[must_use]
    pub fn as_query_engine(&self, llm: Arc<dyn LlmClient>) -> QueryEngine {
        QueryEngine::new(self.clone(), llm).with_top_k(self.similarity_top_k)
    }

    /// The backing store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Default number of passages retrieved per query.
    #[must_use]
    pub const fn similarity_top_k(&self) -> usize {
        self.similarity_top_k
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::embedder::{HashingEmbedder, MockEmbedder};
    use pretty_assertions::assert_eq;

    fn essays() -> Vec<Document> {
        vec![
            Document::new("Before college the author wrote short stories. He also programmed an IBM 1401.")
                .with_id("childhood"),
            Document::new("Years later he started an investment firm that funded startups.")
                .with_id("career"),
        ]
    }

    #[tokio::test]
    async fn test_retrieve_most_relevant_passage() {
        let index = VectorStoreIndex::from_documents(
            &essays(),
            Arc::new(HashingEmbedder::default()),
            &RetrievalSettings::default(),
        )
        .await
        .unwrap();

        assert_eq!(index.store().count().await.unwrap(), 2);
        let hits = index
            .retrieve("What did the author write before college?", 1)
            .await
            .unwrap();
        assert_eq!(hits[0].node.document_id, "childhood");
    }

    #[tokio::test]
    async fn test_insert_uses_one_batch_call() {
        let mut embedder = MockEmbedder::new();
        embedder
            .expect_embed_batch()
            .times(1)
            .withf(|texts| texts.len() == 2)
            .returning(|texts| Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect()));
        embedder
            .expect_model_name()
            .return_const("mock".to_string());

        let index = VectorStoreIndex::new(Arc::new(embedder), Arc::new(InMemoryVectorStore::new()));
        assert_eq!(index.insert(&essays()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_short_embedding_batch_is_an_error() {
        let mut embedder = MockEmbedder::new();
        embedder
            .expect_embed_batch()
            .returning(|_| Ok(vec![vec![1.0]]));

        let index = VectorStoreIndex::new(Arc::new(embedder), Arc::new(InMemoryVectorStore::new()));
        let err = index.insert(&essays()).await.unwrap_err();
        assert!(err.to_string().contains("expected 2 embeddings, got 1"));
        assert_eq!(index.store().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_embedder_failure_propagates() {
        let mut embedder = MockEmbedder::new();
        embedder
            .expect_embed()
            .returning(|_| Err(RetrievalError::Embedding("offline".into())));

        let index = VectorStoreIndex::new(Arc::new(embedder), Arc::new(InMemoryVectorStore::new()));
        let err = index.retrieve("anything", 2).await.unwrap_err();
        assert!(matches!(err, RetrievalError::Embedding(msg) if msg == "offline"));
    }

    #[tokio::test]
    async fn test_empty_documents_index_nothing() {
        let index = VectorStoreIndex::new(
            Arc::new(HashingEmbedder::default()),
            Arc::new(InMemoryVectorStore::new()),
        );
        assert_eq!(index.insert(&[Document::new("  ")]).await.unwrap(), 0);
    }
}
