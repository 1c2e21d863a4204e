//! Property tests for chunk size, overlap and provenance.

use docqa_rag::chunking::{Chunker, FixedSizeChunker, RecursiveChunker, split_documents};
use docqa_rag::document::{Chunk, Document};
use proptest::prelude::*;

/// Text made of short words, spaces, line breaks and some multi-byte
/// characters.
fn arb_text() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![
            4 => "[a-zé]{1,12}",
            2 => Just(" ".to_string()),
            1 => Just("\n".to_string()),
            1 => Just("\n\n".to_string()),
        ],
        0..200,
    )
    .prop_map(|parts| parts.concat())
}

/// `(chunk_size, chunk_overlap)` with `overlap < size`.
fn arb_sizes() -> impl Strategy<Value = (usize, usize)> {
    (1usize..120).prop_flat_map(|size| (Just(size), 0..size))
}

fn char_slice(text: &str, start: usize, len: usize) -> String {
    text.chars().skip(start).take(len).collect()
}

fn check_invariants(document: &Document, chunks: &[Chunk], size: usize, overlap: usize) {
    for chunk in chunks {
        assert!(chunk.char_len() <= size, "chunk of {} chars exceeds {size}", chunk.char_len());
        assert!(!chunk.text.trim().is_empty());
        assert_eq!(
            char_slice(&document.text, chunk.metadata.start_index, chunk.char_len()),
            chunk.text,
            "start_index does not locate the chunk text"
        );
        assert_eq!(chunk.metadata.source, document.name);
        assert_eq!(chunk.metadata.token_count, chunk.char_len() / 4);
    }

    for pair in chunks.windows(2) {
        let previous_end = pair[0].metadata.start_index + pair[0].char_len();
        let shared = previous_end.saturating_sub(pair[1].metadata.start_index);
        assert!(shared <= overlap, "consecutive chunks share {shared} chars, limit {overlap}");
        assert!(pair[1].metadata.start_index >= pair[0].metadata.start_index);
    }
}

mod prop_recursive_chunker {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn chunks_respect_size_overlap_and_offsets(
            text in arb_text(),
            (size, overlap) in arb_sizes(),
        ) {
            let document = Document::new("doc.txt", ".txt", text);
            let chunks = RecursiveChunker::new(size, overlap).chunk(&document);
            check_invariants(&document, &chunks, size, overlap);

            let expect_chunks = !document.text.trim().is_empty();
            prop_assert_eq!(!chunks.is_empty(), expect_chunks);
        }
    }
}

mod prop_fixed_size_chunker {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn windows_respect_size_and_overlap(
            text in "[a-z]{1,400}",
            (size, overlap) in arb_sizes(),
        ) {
            let document = Document::new("doc.txt", ".txt", text);
            let chunks = FixedSizeChunker::new(size, overlap).chunk(&document);
            check_invariants(&document, &chunks, size, overlap);

            // windows cover the whole document
            let last = chunks.last().unwrap();
            prop_assert_eq!(
                last.metadata.start_index + last.char_len(),
                document.text.chars().count()
            );
        }
    }
}

#[test]
fn batch_numbering_spans_documents_and_skips_empty_ones() {
    let documents = vec![
        Document::new("a.txt", ".txt", "first paragraph\n\nsecond paragraph"),
        Document::new("empty.txt", ".txt", "   \n"),
        Document::new("b.md", ".md", "third paragraph"),
    ];
    let chunker = RecursiveChunker::new(20, 0);
    let chunks = split_documents(&chunker, &documents);

    let indices: Vec<usize> = chunks.iter().map(|c| c.metadata.chunk_index).collect();
    assert_eq!(indices, (0..chunks.len()).collect::<Vec<_>>());
    assert!(chunks.iter().all(|c| c.metadata.total_chunks == chunks.len()));
    assert!(chunks.iter().all(|c| c.metadata.source != "empty.txt"));
    assert_eq!(chunks.last().unwrap().metadata.source, "b.md");
    assert_eq!(chunks.last().unwrap().metadata.file_type, ".md");
}
