//! Sentence-aware chunking of documents into index nodes.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::OnceLock;

use super::document::Document;
use crate::errors::RetrievalError;

/// Default chunk size in whitespace tokens.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;
/// Default overlap between neighbouring chunks.
pub const DEFAULT_CHUNK_OVERLAP: usize = 128;

/// A chunk of a document, the unit stored in a vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextNode {
    /// Content hash of the source document id, chunk position and text.
    pub id: String,
    /// Id of the document the chunk came from.
    pub document_id: String,
    /// Chunk text.
    pub text: String,
    /// Metadata inherited from the document.
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl TextNode {
    /// Creates a node, deriving its id from the inputs.
    #[must_use]
    pub fn new(document_id: impl Into<String>, index: usize, text: impl Into<String>) -> Self {
        let document_id = document_id.into();
        let text = text.into();
        Self {
            id: node_id(&document_id, index, &text),
            document_id,
            text,
            metadata: HashMap::new(),
        }
    }
}

fn node_id(document_id: &str, index: usize, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(document_id.as_bytes());
    hasher.update(index.to_le_bytes());
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

fn sentence_boundary() -> Result<&'static Regex, RetrievalError> {
    static PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"[.!?]+[\x22')\]]*\s+|\n{2,}"))
        .as_ref()
        .map_err(|e| RetrievalError::InvalidSettings(format!("sentence pattern: {e}")))
}

fn token_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Splits text into chunks that keep sentences whole where possible.
///
/// Sizes are measured in whitespace-separated tokens. Text is first cut at
/// sentence and paragraph boundaries; sentences longer than a chunk are cut
/// by words. The pieces are then packed greedily, and each new chunk starts
/// with trailing sentences of the previous one up to `chunk_overlap` tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentenceSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for SentenceSplitter {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl SentenceSplitter {
    /// Creates a splitter.
    ///
    /// Fails when `chunk_size` is zero or the overlap is not smaller than it.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, RetrievalError> {
        if chunk_size == 0 {
            return Err(RetrievalError::InvalidSettings(
                "chunk_size must be greater than zero".into(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(RetrievalError::InvalidSettings(format!(
                "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    /// Maximum chunk size in tokens.
    #[must_use]
    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Overlap between chunks in tokens.
    #[must_use]
    pub const fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Splits raw text into chunk strings.
    pub fn split_text(&self, text: &str) -> Result<Vec<String>, RetrievalError> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let mut pieces = Vec::new();
        for sentence in split_sentences(text)? {
            let tokens = token_count(&sentence);
            if tokens == 0 {
                continue;
            }
            if tokens <= self.chunk_size {
                pieces.push((sentence, tokens));
            } else {
                pieces.extend(self.split_long_sentence(&sentence));
            }
        }

        Ok(self.merge(pieces))
    }

    /// Splits every document into nodes carrying the document's metadata.
    pub fn split_documents(&self, documents: &[Document]) -> Result<Vec<TextNode>, RetrievalError> {
        let mut nodes = Vec::new();
        for document in documents {
            for (index, chunk) in self.split_text(&document.text)?.into_iter().enumerate() {
                let mut node = TextNode::new(&document.id, index, chunk);
                node.metadata.clone_from(&document.metadata);
                nodes.push(node);
            }
        }
        Ok(nodes)
    }

    fn split_long_sentence(&self, sentence: &str) -> Vec<(String, usize)> {
        let words: Vec<&str> = sentence.split_whitespace().collect();
        words
            .chunks(self.chunk_size)
            .map(|chunk| (format!("{} ", chunk.join(" ")), chunk.len()))
            .collect()
    }

    fn merge(&self, pieces: Vec<(String, usize)>) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current: Vec<(String, usize)> = Vec::new();
        let mut current_tokens = 0;
        let mut has_new_content = false;

        for (piece, tokens) in pieces {
            if has_new_content && current_tokens + tokens > self.chunk_size {
                chunks.push(join_pieces(&current));

                let mut overlap = Vec::new();
                let mut overlap_tokens = 0;
                for (text, count) in current.iter().rev() {
                    if overlap_tokens + count > self.chunk_overlap {
                        break;
                    }
                    overlap_tokens += count;
                    overlap.push((text.clone(), *count));
                }
                overlap.reverse();
                current = overlap;
                current_tokens = overlap_tokens;
                has_new_content = false;

                while !current.is_empty() && current_tokens + tokens > self.chunk_size {
                    let (_, dropped) = current.remove(0);
                    current_tokens -= dropped;
                }
            }

            current_tokens += tokens;
            current.push((piece, tokens));
            has_new_content = true;
        }

        if has_new_content {
            chunks.push(join_pieces(&current));
        }
        chunks
    }
}

fn split_sentences(text: &str) -> Result<Vec<String>, RetrievalError> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for boundary in sentence_boundary()?.find_iter(text) {
        sentences.push(text[start..boundary.end()].to_string());
        start = boundary.end();
    }
    if start < text.len() {
        sentences.push(text[start..].to_string());
    }
    Ok(sentences)
}

fn join_pieces(pieces: &[(String, usize)]) -> String {
    pieces
        .iter()
        .map(|(text, _)| text.as_str())
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_small_text_is_one_chunk() {
        let splitter = SentenceSplitter::default();
        let chunks = splitter
            .split_text("This is the first sentence. This is the second sentence.")
            .unwrap();
        assert_eq!(chunks, vec!["This is the first sentence. This is the second sentence."]);
    }

    #[test]
    fn test_empty_text_has_no_chunks() {
        assert!(SentenceSplitter::default().split_text("   \n").unwrap().is_empty());
    }

    #[test]
    fn test_chunks_respect_size_and_overlap() {
        let splitter = SentenceSplitter::new(8, 4).unwrap();
        let text = "One two three. Four five six. Seven eight nine. Ten eleven twelve.";
        let chunks = splitter.split_text(text).unwrap();

        assert_eq!(
            chunks,
            vec![
                "One two three. Four five six.",
                "Four five six. Seven eight nine.",
                "Seven eight nine. Ten eleven twelve.",
            ]
        );
        assert!(chunks.iter().all(|c| token_count(c) <= 8));
    }

    #[test]
    fn test_long_sentence_is_cut_by_words() {
        let splitter = SentenceSplitter::new(3, 0).unwrap();
        let chunks = splitter.split_text("a b c d e f g").unwrap();
        assert_eq!(chunks, vec!["a b c", "d e f", "g"]);
    }

    #[test]
    fn test_paragraphs_are_boundaries() {
        let splitter = SentenceSplitter::new(4, 0).unwrap();
        let chunks = splitter
            .split_text("Heading without period\n\nBody text goes here")
            .unwrap();
        assert_eq!(chunks, vec!["Heading without period", "Body text goes here"]);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        assert!(matches!(
            SentenceSplitter::new(0, 0),
            Err(RetrievalError::InvalidSettings(_))
        ));
        let err = SentenceSplitter::new(10, 10).unwrap_err();
        assert!(err.to_string().contains("chunk_overlap (10)"));
    }

    #[test]
    fn test_nodes_inherit_metadata_and_have_stable_ids() {
        let doc = Document::new("Alpha beta. Gamma delta.")
            .with_id("essay.txt")
            .with_metadata("file_name", "essay.txt");
        let splitter = SentenceSplitter::new(2, 0).unwrap();

        let first = splitter.split_documents(std::slice::from_ref(&doc)).unwrap();
        let second = splitter.split_documents(&[doc]).unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(first[1].text, "Gamma delta.");
        assert_eq!(first[0].metadata["file_name"], "essay.txt");
        assert_eq!(first[0].id, second[0].id);
        assert_ne!(first[0].id, first[1].id);
        assert_eq!(first[0].id.len(), 64);
    }
}
