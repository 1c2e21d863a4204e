//! Property tests for in-memory vector store search ordering.

use docqa_rag::document::{Chunk, ChunkMetadata, IndexedChunk};
use docqa_rag::inmemory::InMemoryVectorStore;
use docqa_rag::vectorstore::VectorStore;
use proptest::prelude::*;

/// Generate a non-zero L2-normalized embedding of the given dimension.
fn arb_normalized_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map(
        "non-zero embedding",
        |mut v| {
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm < 1e-8 {
                return None;
            }
            for val in &mut v {
                *val /= norm;
            }
            Some(v)
        },
    )
}

fn indexed(i: usize, text: String, embedding: Vec<f32>) -> IndexedChunk {
    IndexedChunk {
        id: format!("c{i}"),
        chunk: Chunk {
            text,
            metadata: ChunkMetadata {
                source: "doc.txt".to_string(),
                file_type: ".txt".to_string(),
                chunk_index: i,
                total_chunks: 0,
                token_count: 0,
                start_index: 0,
            },
        },
        embedding,
    }
}

/// Search results are ordered by descending cosine similarity and bounded by
/// both `top_k` and the number of stored chunks.
mod prop_inmemory_search_ordering {
    use super::*;

    const DIM: usize = 16;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ordered_descending_and_bounded_by_top_k(
            embeddings in proptest::collection::vec(arb_normalized_embedding(DIM), 1..20),
            query in arb_normalized_embedding(DIM),
            top_k in 1usize..25,
        ) {
            let stored = embeddings.len();
            let chunks: Vec<IndexedChunk> = embeddings
                .into_iter()
                .enumerate()
                .map(|(i, e)| indexed(i, format!("chunk {i}"), e))
                .collect();

            let rt = tokio::runtime::Runtime::new().unwrap();
            let results = rt.block_on(async {
                let store = InMemoryVectorStore::new();
                store.create_collection("test", DIM, "test-model").await.unwrap();
                store.upsert("test", &chunks).await.unwrap();
                store.search("test", &query, top_k).await.unwrap()
            });

            prop_assert_eq!(results.len(), top_k.min(stored));

            for window in results.windows(2) {
                prop_assert!(
                    window[0].score >= window[1].score,
                    "results not in descending order: {} < {}",
                    window[0].score,
                    window[1].score,
                );
            }
        }

        #[test]
        fn smaller_k_is_a_prefix_of_larger_k(
            embeddings in proptest::collection::vec(arb_normalized_embedding(DIM), 1..20),
            query in arb_normalized_embedding(DIM),
            k in 1usize..10,
        ) {
            let chunks: Vec<IndexedChunk> = embeddings
                .into_iter()
                .enumerate()
                .map(|(i, e)| indexed(i, format!("chunk {i}"), e))
                .collect();

            let rt = tokio::runtime::Runtime::new().unwrap();
            let (small, large) = rt.block_on(async {
                let store = InMemoryVectorStore::new();
                store.create_collection("test", DIM, "test-model").await.unwrap();
                store.upsert("test", &chunks).await.unwrap();
                let small = store.search("test", &query, k).await.unwrap();
                let large = store.search("test", &query, k + 5).await.unwrap();
                (small, large)
            });

            prop_assert_eq!(&small[..], &large[..small.len()]);
        }
    }
}

#[tokio::test]
async fn equal_scores_keep_insertion_order() {
    let store = InMemoryVectorStore::new();
    store.create_collection("test", 2, "test-model").await.unwrap();
    let chunks: Vec<IndexedChunk> =
        (0..4).map(|i| indexed(i, format!("same {i}"), vec![1.0, 0.0])).collect();
    store.upsert("test", &chunks).await.unwrap();

    let results = store.search("test", &[1.0, 0.0], 4).await.unwrap();
    let texts: Vec<&str> = results.iter().map(|r| r.chunk.text.as_str()).collect();
    assert_eq!(texts, vec!["same 0", "same 1", "same 2", "same 3"]);
}

#[tokio::test]
async fn upsert_with_existing_id_replaces_in_place() {
    let store = InMemoryVectorStore::new();
    store.create_collection("test", 2, "test-model").await.unwrap();
    store
        .upsert(
            "test",
            &[indexed(0, "old".into(), vec![1.0, 0.0]), indexed(1, "other".into(), vec![1.0, 0.0])],
        )
        .await
        .unwrap();
    store.upsert("test", &[indexed(0, "new".into(), vec![1.0, 0.0])]).await.unwrap();

    assert_eq!(store.count("test").await.unwrap(), 2);
    let results = store.search("test", &[1.0, 0.0], 2).await.unwrap();
    assert_eq!(results[0].chunk.text, "new");
}

#[tokio::test]
async fn missing_collection_is_a_backend_error() {
    let store = InMemoryVectorStore::new();
    let err = store.search("absent", &[1.0], 3).await.unwrap_err();
    assert!(err.is_backend());
    assert_eq!(store.count("absent").await.unwrap(), 0);
    assert!(store.describe("absent").await.unwrap().is_none());
}

#[tokio::test]
async fn nan_scores_rank_last_without_disturbing_order() {
    let store = InMemoryVectorStore::new();
    store.create_collection("test", 2, "test-model").await.unwrap();
    store
        .upsert(
            "test",
            &[
                indexed(0, "broken".into(), vec![f32::NAN, 0.0]),
                indexed(1, "close".into(), vec![1.0, 0.0]),
                indexed(2, "far".into(), vec![0.0, 1.0]),
                indexed(3, "also close".into(), vec![1.0, 0.0]),
            ],
        )
        .await
        .unwrap();

    let results = store.search("test", &[1.0, 0.0], 4).await.unwrap();
    let texts: Vec<&str> = results.iter().map(|r| r.chunk.text.as_str()).collect();
    assert_eq!(texts, vec!["close", "also close", "far", "broken"]);
    assert!(results[3].score.is_nan());
}
