//! Source documents and the directory reader that loads them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::errors::RetrievalError;

/// A piece of source text plus metadata about where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Stable identifier. File-backed documents use their path.
    pub id: String,
    /// Raw text.
    pub text: String,
    /// Free-form metadata such as `file_path` or `file_name`.
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl Document {
    /// Creates a document with a random id.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.into(),
            metadata: HashMap::new(),
        }
    }

    /// Overrides the id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Path of the file the document was read from, if any.
    #[must_use]
    pub fn file_path(&self) -> Option<&str> {
        self.metadata.get("file_path").and_then(Value::as_str)
    }
}

/// Loads every file under a directory as one [`Document`].
///
/// Hidden files and directories are skipped. Files are returned in path
/// order so indexing is reproducible.
#[derive(Debug, Clone)]
pub struct DirectoryReader {
    root: PathBuf,
    extensions: Vec<String>,
    recursive: bool,
}

impl DirectoryReader {
    /// Creates a reader for `root`, non-recursive, accepting all extensions.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extensions: Vec::new(),
            recursive: false,
        }
    }

    /// Restricts loading to files with one of these extensions (without the dot).
    #[must_use]
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.into().trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    /// Descends into subdirectories.
    #[must_use]
    pub const fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Reads all matching files.
    ///
    /// Invalid UTF-8 is replaced rather than rejected.
    pub async fn load_data(&self) -> Result<Vec<Document>, RetrievalError> {
        let mut files = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if is_hidden(&path) {
                    continue;
                }
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    if self.recursive {
                        pending.push(path);
                    }
                } else if file_type.is_file() && self.accepts(&path) {
                    files.push(path);
                }
            }
        }
        files.sort();

        let mut documents = Vec::with_capacity(files.len());
        for path in files {
            let bytes = tokio::fs::read(&path).await?;
            let display = path.display().to_string();
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            documents.push(
                Document::new(String::from_utf8_lossy(&bytes).into_owned())
                    .with_id(display.clone())
                    .with_metadata("file_path", display)
                    .with_metadata("file_name", file_name)
                    .with_metadata("file_size", bytes.len()),
            );
        }

        tracing::debug!(
            root = %self.root.display(),
            documents = documents.len(),
            "Loaded documents"
        );
        Ok(documents)
    }

    fn accepts(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        path.extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .is_some_and(|e| self.extensions.iter().any(|allowed| *allowed == e))
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|n| n.to_string_lossy().starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    #[tokio::test]
    async fn test_loads_files_in_path_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "second").unwrap();
        fs::write(dir.path().join("a.txt"), "first").unwrap();
        fs::write(dir.path().join(".hidden"), "skip me").unwrap();

        let docs = DirectoryReader::new(dir.path()).load_data().await.unwrap();
        let texts: Vec<&str> = docs.iter().map(|d| d.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert_eq!(docs[0].metadata["file_name"], "a.txt");
        assert_eq!(docs[0].metadata["file_size"], 5);
        assert!(docs[0].file_path().unwrap().ends_with("a.txt"));
        assert_eq!(docs[0].id, docs[0].file_path().unwrap());
    }

    #[tokio::test]
    async fn test_extension_filter_and_recursion() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("notes.md"), "top").unwrap();
        fs::write(dir.path().join("data.csv"), "1,2").unwrap();
        fs::write(dir.path().join("nested").join("deep.MD"), "deep").unwrap();

        let flat = DirectoryReader::new(dir.path())
            .with_extensions([".md"])
            .load_data()
            .await
            .unwrap();
        assert_eq!(flat.len(), 1);

        let deep = DirectoryReader::new(dir.path())
            .with_extensions(["md"])
            .recursive(true)
            .load_data()
            .await
            .unwrap();
        let mut texts: Vec<&str> = deep.iter().map(|d| d.text.as_str()).collect();
        texts.sort_unstable();
        assert_eq!(texts, vec!["deep", "top"]);
    }

    #[tokio::test]
    async fn test_missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = DirectoryReader::new(dir.path().join("absent"))
            .load_data()
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::Io(_)));
    }

    #[test]
    fn test_document_builders() {
        let doc = Document::new("hello").with_id("doc-1").with_metadata("author", "pg");
        assert_eq!(doc.id, "doc-1");
        assert_eq!(doc.metadata["author"], "pg");
        assert_eq!(doc.file_path(), None);
    }
}
