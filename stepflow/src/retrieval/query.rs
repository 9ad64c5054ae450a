//! Question answering over a [`VectorStoreIndex`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::Instrument;

use super::index::VectorStoreIndex;
use super::vector_store::ScoredNode;
use crate::errors::RetrievalError;
use crate::llm::LlmClient;

/// Returned when nothing relevant is indexed.
pub const EMPTY_RESPONSE: &str = "Empty Response";

fn qa_prompt(context: &str, query: &str) -> String {
    format!(
        "Context information is below.\n\
         ---------------------\n\
         {context}\n\
         ---------------------\n\
         Given the context information and not prior knowledge, answer the query.\n\
         Query: {query}\n\
         Answer: "
    )
}

/// An answer plus the passages it was synthesized from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Synthesized answer.
    pub response: String,
    /// Retrieved passages, most similar first.
    pub source_nodes: Vec<ScoredNode>,
}

impl fmt::Display for QueryResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.response)
    }
}

/// Retrieves the top passages for a question and asks the LLM to answer
/// from them.
#[derive(Debug, Clone)]
pub struct QueryEngine {
    index: VectorStoreIndex,
    llm: Arc<dyn LlmClient>,
    top_k: usize,
}

impl QueryEngine {
    /// Creates an engine using the index's default `top_k`.
    #[must_use]
    pub fn new(index: VectorStoreIndex, llm: Arc<dyn LlmClient>) -> Self {
        let top_k = index.similarity_top_k();
        Self { index, llm, top_k }
    }

    /// Overrides how many passages are retrieved (at least one).
    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// Renders the synthesis prompt for `query` over `nodes`.
    #[must_use]
    pub fn build_prompt(query: &str, nodes: &[ScoredNode]) -> String {
        let context = nodes
            .iter()
            .map(|hit| match hit.node.metadata.get("file_path").and_then(|v| v.as_str()) {
                Some(path) => format!("file_path: {path}\n\n{}", hit.node.text),
                None => hit.node.text.clone(),
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        qa_prompt(&context, query)
    }

    /// Answers `query`.
    ///
    /// With nothing retrieved the LLM is not called and the response is
    /// [`EMPTY_RESPONSE`].
    pub async fn query(&self, query: &str) -> Result<QueryResponse, RetrievalError> {
        let span = tracing::info_span!("retrieval.query", top_k = self.top_k);
        self.answer(query).instrument(span).await
    }

    async fn answer(&self, query: &str) -> Result<QueryResponse, RetrievalError> {
        let source_nodes = self.index.retrieve(query, self.top_k).await?;
        if source_nodes.is_empty() {
            return Ok(QueryResponse {
                response: EMPTY_RESPONSE.to_string(),
                source_nodes,
            });
        }

        let prompt = Self::build_prompt(query, &source_nodes);
        let completion = self.llm.complete(&prompt).await?;

        tracing::debug!(
            sources = source_nodes.len(),
            best_score = source_nodes.first().map(|n| n.score),
            "Synthesized answer"
        );
        Ok(QueryResponse {
            response: completion.text.trim().to_string(),
            source_nodes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedLlm;
    use crate::retrieval::{
        Document, HashingEmbedder, InMemoryVectorStore, RetrievalSettings, TextNode,
    };
    use pretty_assertions::assert_eq;

    async fn essay_index() -> VectorStoreIndex {
        let documents = vec![
            Document::new("Growing up, the author wrote short stories and tried programming on an IBM 1401.")
                .with_id("essay-1")
                .with_metadata("file_path", "data/paul_graham/essay.txt"),
            Document::new("The investment firm later funded many startups in batches.")
                .with_id("essay-2"),
        ];
        VectorStoreIndex::from_documents(
            &documents,
            Arc::new(HashingEmbedder::default()),
            &RetrievalSettings::default().with_similarity_top_k(1),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_query_includes_most_relevant_passage() {
        let llm = Arc::new(ScriptedLlm::new(["He wrote short stories and programmed."]));
        let engine = essay_index().await.as_query_engine(llm.clone());

        let response = engine.query("What did the author do growing up?").await.unwrap();
        assert_eq!(response.to_string(), "He wrote short stories and programmed.");
        assert_eq!(response.source_nodes.len(), 1);
        assert_eq!(response.source_nodes[0].node.document_id, "essay-1");

        let prompt = llm.last_prompt().unwrap();
        assert!(prompt.contains("file_path: data/paul_graham/essay.txt"));
        assert!(prompt.contains("tried programming on an IBM 1401"));
        assert!(!prompt.contains("investment firm"));
        assert!(prompt.ends_with("Query: What did the author do growing up?\nAnswer: "));
    }

    #[tokio::test]
    async fn test_empty_index_skips_llm() {
        let llm = Arc::new(ScriptedLlm::new(Vec::<String>::new()));
        let index = VectorStoreIndex::new(
            Arc::new(HashingEmbedder::default()),
            Arc::new(InMemoryVectorStore::new()),
        );
        let response = index.as_query_engine(llm.clone()).query("anything").await.unwrap();
        assert_eq!(response.response, EMPTY_RESPONSE);
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_llm_failure_is_surfaced() {
        let llm = Arc::new(ScriptedLlm::new(Vec::<String>::new()));
        let engine = essay_index().await.as_query_engine(llm).with_top_k(2);
        let err = engine.query("What did the author do?").await.unwrap_err();
        assert!(matches!(err, RetrievalError::Llm(_)));
    }

    #[test]
    fn test_placeholder_text_in_passage_is_kept_literally() {
        let hit = ScoredNode {
            node: TextNode::new("templates", 0, "Write {query_str} where the question goes."),
            score: 1.0,
        };
        let prompt = QueryEngine::build_prompt("Who wrote it?", &[hit]);

        assert!(prompt.contains("Write {query_str} where the question goes."));
        assert_eq!(prompt.matches("Who wrote it?").count(), 1);
        assert!(prompt.starts_with("Context information is below.\n---------------------\nWrite"));
    }
}
