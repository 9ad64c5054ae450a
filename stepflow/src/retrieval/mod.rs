//! Retrieval-augmented question answering.
//!
//! Documents are loaded with [`DirectoryReader`], cut into [`TextNode`]s by
//! [`SentenceSplitter`], embedded, and stored in a [`VectorStore`]. A
//! [`QueryEngine`] retrieves the closest passages for a question and has an
//! LLM answer from them.

mod config;
mod document;
mod embedder;
mod index;
mod query;
mod splitter;
mod vector_store;

pub use config::RetrievalSettings;
pub use document::{DirectoryReader, Document};
#[cfg(feature = "openai")]
pub use embedder::OpenAiEmbedder;
pub use embedder::{cosine_similarity, Embedder, HashingEmbedder};
pub use index::VectorStoreIndex;
pub use query::{QueryEngine, QueryResponse, EMPTY_RESPONSE};
pub use splitter::{SentenceSplitter, TextNode, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
pub use vector_store::{EmbeddedNode, InMemoryVectorStore, ScoredNode, VectorStore};
