//! Data types for documents, chunks, and search results.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A loaded source document: raw text plus provenance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Name shown to users and recorded as the chunk source.
    pub name: String,
    /// Where the text was read from.
    pub source_path: PathBuf,
    /// Lower-cased file extension including the dot (e.g. `.md`).
    pub file_type: String,
    /// The text content of the document.
    pub text: String,
}

impl Document {
    /// Create a document from in-memory text.
    pub fn new(
        name: impl Into<String>,
        file_type: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            source_path: PathBuf::from(&name),
            name,
            file_type: file_type.into(),
            text: text.into(),
        }
    }
}

/// Provenance recorded on every [`Chunk`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkMetadata {
    /// Display name of the parent [`Document`].
    pub source: String,
    /// File type of the parent document.
    pub file_type: String,
    /// Zero-based index, unique within the batch that produced the chunk.
    pub chunk_index: usize,
    /// Number of chunks in that batch.
    pub total_chunks: usize,
    /// Rough token estimate (`chars / 4`).
    pub token_count: usize,
    /// Character offset of the chunk text within the parent document.
    pub start_index: usize,
}

/// A segment of a [`Document`]'s text with its provenance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    /// The text content of the chunk.
    pub text: String,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    /// Length of the chunk text in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// The source document name reduced to its final path component.
    pub fn source_name(&self) -> &str {
        let source = self.metadata.source.as_str();
        source.rsplit(['/', '\\']).next().filter(|s| !s.is_empty()).unwrap_or("unknown")
    }
}

/// A [`Chunk`] stored in a vector collection together with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexedChunk {
    /// Store-assigned identifier.
    pub id: String,
    pub chunk: Chunk,
    /// The vector embedding for the chunk text.
    pub embedding: Vec<f32>,
}

/// A retrieved [`Chunk`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// The similarity score (higher is more relevant).
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk_from(source: &str) -> Chunk {
        Chunk {
            text: "body".into(),
            metadata: ChunkMetadata {
                source: source.into(),
                file_type: ".txt".into(),
                chunk_index: 0,
                total_chunks: 1,
                token_count: 1,
                start_index: 0,
            },
        }
    }

    #[test]
    fn source_name_strips_directories() {
        assert_eq!(chunk_from("docs/guide/intro.md").source_name(), "intro.md");
        assert_eq!(chunk_from("C:\\notes\\a.txt").source_name(), "a.txt");
        assert_eq!(chunk_from("plain.txt").source_name(), "plain.txt");
        assert_eq!(chunk_from("").source_name(), "unknown");
    }

    #[test]
    fn char_len_counts_scalar_values() {
        let mut chunk = chunk_from("a");
        chunk.text = "héllo".into();
        assert_eq!(chunk.char_len(), 5);
    }
}
