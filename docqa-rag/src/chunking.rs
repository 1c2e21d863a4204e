//! Document chunking strategies.
//!
//! This module provides the [`Chunker`] trait and two implementations:
//!
//! - [`RecursiveChunker`]: splits on paragraph, line, then word boundaries,
//!   falling back to raw character cuts, with bounded overlap
//! - [`FixedSizeChunker`]: splits by character count with configurable overlap
//!
//! All sizes are measured in characters (Unicode scalar values), never bytes.
//! [`split_documents`] runs a chunker over a batch and numbers the chunks.

use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::config::RagConfig;
use crate::document::{Chunk, ChunkMetadata, Document};

/// Separators tried by [`RecursiveChunker`], coarsest first. The empty
/// separator cuts between individual characters.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// A strategy for splitting documents into chunks.
///
/// Implementations produce [`Chunk`]s numbered within the document; callers
/// that chunk a batch should go through [`split_documents`], which renumbers
/// them across the batch.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has no non-whitespace text.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Split every document in `documents` and number the resulting chunks.
///
/// Chunk indices are zero-based and unique across the whole batch, in
/// document order; every chunk records the batch total. Documents that yield
/// no chunks are skipped with a warning and do not affect the others.
pub fn split_documents(chunker: &dyn Chunker, documents: &[Document]) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    for document in documents {
        let produced = chunker.chunk(document);
        if produced.is_empty() {
            warn!(document = %document.name, "document produced no chunks (empty text)");
            continue;
        }
        debug!(document = %document.name, chunk_count = produced.len(), "chunked document");
        chunks.extend(produced);
    }

    let total = chunks.len();
    for (i, chunk) in chunks.iter_mut().enumerate() {
        chunk.metadata.chunk_index = i;
        chunk.metadata.total_chunks = total;
    }
    chunks
}

/// Splits text hierarchically: paragraphs → lines → words → characters.
///
/// Text is split on the first separator it contains. Pieces shorter than
/// `chunk_size` are merged greedily; longer pieces are split again with the
/// next separator. When a merged chunk is emitted, the trailing pieces that
/// fit within `chunk_overlap` seed the next chunk, so consecutive chunks
/// share at most `chunk_overlap` characters. Chunk texts are trimmed.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(900, 100);
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of characters per chunk (at least 1)
    /// * `chunk_overlap`: maximum number of characters shared by consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size: chunk_size.max(1), chunk_overlap }
    }

    pub fn from_config(config: &RagConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    fn split_text(&self, text: &str) -> Vec<String> {
        let mut out = Vec::new();
        self.split_recursive(text, &SEPARATORS, &mut out);
        out
    }

    fn split_recursive(&self, text: &str, separators: &[&str], out: &mut Vec<String>) {
        let (separator, remaining) = pick_separator(text, separators);
        let mut pending: Vec<&str> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                pending.push(piece);
                continue;
            }
            if !pending.is_empty() {
                self.merge_pieces(&pending, out);
                pending.clear();
            }
            if remaining.is_empty() {
                push_trimmed(out, piece.to_string());
            } else {
                self.split_recursive(piece, remaining, out);
            }
        }

        if !pending.is_empty() {
            self.merge_pieces(&pending, out);
        }
    }

    /// Merge small pieces into chunks of at most `chunk_size` characters,
    /// carrying up to `chunk_overlap` characters of trailing pieces forward.
    fn merge_pieces(&self, pieces: &[&str], out: &mut Vec<String>) {
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0;

        for &piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size && !window.is_empty() {
                push_trimmed(out, window.iter().map(|(p, _)| *p).collect());
                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    let Some((_, dropped)) = window.pop_front() else { break };
                    total -= dropped;
                }
            }
            window.push_back((piece, len));
            total += len;
        }

        if !window.is_empty() {
            push_trimmed(out, window.iter().map(|(p, _)| *p).collect());
        }
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        if document.text.trim().is_empty() {
            return Vec::new();
        }
        let texts = self.split_text(&document.text);
        build_chunks(document, texts, self.chunk_overlap)
    }
}

/// Splits text into fixed-size character windows with configurable overlap.
///
/// No boundary snapping is attempted; windows may cut through words.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::FixedSizeChunker;
///
/// let chunker = FixedSizeChunker::new(256, 50);
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of characters per chunk (at least 1)
    /// * `chunk_overlap`: number of overlapping characters between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size: chunk_size.max(1), chunk_overlap }
    }

    pub fn from_config(config: &RagConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        if document.text.trim().is_empty() {
            return Vec::new();
        }

        let chars: Vec<char> = document.text.chars().collect();
        let step = self.chunk_size.saturating_sub(self.chunk_overlap);
        let mut texts = Vec::new();
        let mut start = 0;

        while start < chars.len() {
            let end = (start + self.chunk_size).min(chars.len());
            texts.push(chars[start..end].iter().collect::<String>());
            if end == chars.len() || step == 0 {
                break;
            }
            start += step;
        }

        build_chunks(document, texts, self.chunk_overlap)
    }
}

/// Attach provenance to split texts, locating each one in the document.
///
/// The search for chunk `i + 1` starts `overlap` characters before the end of
/// chunk `i` (never before its start), so repeated passages resolve to the
/// right occurrence.
fn build_chunks(document: &Document, texts: Vec<String>, overlap: usize) -> Vec<Chunk> {
    let total = texts.len();
    let mut index = 0usize;
    let mut previous_len = 0usize;

    texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            let from = index + previous_len.saturating_sub(overlap);
            index = find_char_offset(&document.text, &text, from).unwrap_or(index);
            let len = char_len(&text);
            previous_len = len;

            Chunk {
                metadata: ChunkMetadata {
                    source: document.name.clone(),
                    file_type: document.file_type.clone(),
                    chunk_index: i,
                    total_chunks: total,
                    token_count: len / 4,
                    start_index: index,
                },
                text,
            }
        })
        .collect()
}

/// Find `needle` in `haystack` at or after character offset `from`,
/// returning the character offset of the match.
fn find_char_offset(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let byte_from = haystack.char_indices().nth(from).map_or(haystack.len(), |(b, _)| b);
    let byte_pos = haystack[byte_from..].find(needle)? + byte_from;
    Some(haystack[..byte_pos].chars().count())
}

/// Choose the first separator present in `text`; the empty separator always
/// matches. Returns the separator and the finer separators after it.
fn pick_separator<'s>(text: &str, separators: &'s [&'s str]) -> (&'s str, &'s [&'s str]) {
    for (i, separator) in separators.iter().enumerate() {
        if separator.is_empty() {
            return (*separator, &[]);
        }
        if text.contains(*separator) {
            return (*separator, &separators[i + 1..]);
        }
    }
    ("", &[])
}

/// Split text at a separator, keeping the separator attached to the start of
/// the following piece. Empty pieces are dropped. The empty separator splits
/// into single characters.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text.char_indices().map(|(i, c)| &text[i..i + c.len_utf8()]).collect();
    }

    let mut result = Vec::new();
    let mut start = 0;
    for (pos, _) in text.match_indices(separator) {
        if pos > start {
            result.push(&text[start..pos]);
        }
        start = pos;
    }
    if start < text.len() {
        result.push(&text[start..]);
    }
    result
}

fn push_trimmed(out: &mut Vec<String>, text: String) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(name: &str, text: &str) -> Document {
        Document::new(name, ".txt", text)
    }

    #[test]
    fn keeps_separator_on_following_piece() {
        assert_eq!(split_keeping_separator("a\n\nb\n\nc", "\n\n"), vec!["a", "\n\nb", "\n\nc"]);
        assert_eq!(split_keeping_separator("\n\nx", "\n\n"), vec!["\n\nx"]);
        assert_eq!(split_keeping_separator("héj", ""), vec!["h", "é", "j"]);
    }

    #[test]
    fn picks_coarsest_separator_present() {
        let (sep, rest) = pick_separator("one two", &SEPARATORS);
        assert_eq!(sep, " ");
        assert_eq!(rest, &[""]);
        let (sep, rest) = pick_separator("nospaces", &SEPARATORS);
        assert_eq!(sep, "");
        assert!(rest.is_empty());
    }

    #[test]
    fn short_document_is_a_single_chunk() {
        let chunks = RecursiveChunker::new(100, 10).chunk(&doc("a.txt", "  Hello world.  "));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Hello world.");
        assert_eq!(chunks[0].metadata.start_index, 2);
        assert_eq!(chunks[0].metadata.token_count, 3);
    }

    #[test]
    fn prefers_paragraph_boundaries() {
        let text = "First paragraph here.\n\nSecond paragraph here.\n\nThird one.";
        let chunks = RecursiveChunker::new(30, 0).chunk(&doc("a.txt", text));
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["First paragraph here.", "Second paragraph here.", "Third one."]);
    }

    #[test]
    fn falls_back_to_word_boundaries_with_overlap() {
        let text = "alpha beta gamma delta epsilon zeta eta theta";
        let chunks = RecursiveChunker::new(20, 10).chunk(&doc("a.txt", text));
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.char_len() <= 20, "chunk too long: {:?}", chunk.text);
            assert!(!chunk.text.starts_with(' '));
        }
        // consecutive chunks share at least one word
        let first_last_word = chunks[0].text.rsplit(' ').next().unwrap();
        assert!(chunks[1].text.starts_with(first_last_word));
    }

    #[test]
    fn cuts_raw_characters_when_no_boundary_exists() {
        let text = "x".repeat(25);
        let chunks = RecursiveChunker::new(10, 2).chunk(&doc("a.txt", &text));
        assert!(chunks.iter().all(|c| c.char_len() <= 10));
        assert_eq!(chunks[0].text.len(), 10);
        assert_eq!(chunks[1].metadata.start_index, 8);
    }

    #[test]
    fn empty_and_whitespace_documents_yield_nothing() {
        let chunker = RecursiveChunker::new(10, 2);
        assert!(chunker.chunk(&doc("a.txt", "")).is_empty());
        assert!(chunker.chunk(&doc("b.txt", " \n\n \t")).is_empty());
    }

    #[test]
    fn split_documents_numbers_across_the_batch() {
        let chunker = RecursiveChunker::new(12, 0);
        let docs = vec![
            doc("a.txt", "one two three four"),
            doc("empty.txt", "   "),
            doc("b.txt", "five six seven"),
        ];
        let chunks = split_documents(&chunker, &docs);
        let total = chunks.len();
        assert!(total >= 3);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.metadata.chunk_index, i);
            assert_eq!(chunk.metadata.total_chunks, total);
        }
        assert_eq!(chunks.first().unwrap().metadata.source, "a.txt");
        assert_eq!(chunks.last().unwrap().metadata.source, "b.txt");
        assert!(chunks.iter().all(|c| c.metadata.source != "empty.txt"));
    }

    #[test]
    fn fixed_size_windows_overlap_exactly() {
        let chunks = FixedSizeChunker::new(4, 1).chunk(&doc("a.txt", "abcdefghij"));
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["abcd", "defg", "ghij"]);
        let starts: Vec<usize> = chunks.iter().map(|c| c.metadata.start_index).collect();
        assert_eq!(starts, vec![0, 3, 6]);
    }

    #[test]
    fn offsets_are_measured_in_characters() {
        let text = "ééé ààà ççç";
        let chunks = RecursiveChunker::new(4, 0).chunk(&doc("a.txt", text));
        let starts: Vec<usize> = chunks.iter().map(|c| c.metadata.start_index).collect();
        assert_eq!(starts, vec![0, 4, 8]);
    }
}
