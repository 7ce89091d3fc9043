//! In-memory vector index over document chunks.
//!
//! The index is a derived cache: it is always rebuilt from scratch from the
//! current document set and never updated in place. Lookup is exact
//! brute-force cosine similarity, which is fast enough for a corpus of a
//! few hundred chunks.
//!
//! A build either embeds every chunk or fails. An index missing some chunks
//! would silently produce incomplete answers, so any provider error, a
//! short response, or a vector of the wrong dimensionality aborts the build
//! with [`Error::EmbeddingServiceFailure`].

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::chunk::{chunk_document, ChunkParams};
use crate::embedding::{cosine_similarity, EmbeddingProvider};
use crate::error::{Error, Result};
use crate::models::{Chunk, DocType, ProcessedDocument};

/// A chunk with its embedding.
#[derive(Debug, Clone)]
pub struct IndexedChunk {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// A nearest-neighbour hit.
#[derive(Debug, Clone, Copy)]
pub struct Neighbor<'a> {
    pub entry: &'a IndexedChunk,
    pub similarity: f32,
}

#[derive(Debug, Clone)]
pub struct VectorIndex {
    model: String,
    dims: usize,
    entries: Vec<IndexedChunk>,
}

impl VectorIndex {
    /// Chunk and embed `docs`, embedding `batch_size` chunks per request.
    pub async fn build(
        docs: &[ProcessedDocument],
        embedder: &dyn EmbeddingProvider,
        params: &ChunkParams,
        batch_size: usize,
    ) -> Result<VectorIndex> {
        let chunks: Vec<Chunk> = docs
            .iter()
            .flat_map(|doc| chunk_document(doc, params))
            .collect();
        let dims = embedder.dims();
        let batch_size = batch_size.max(1);

        tracing::info!(
            documents = docs.len(),
            chunks = chunks.len(),
            model = embedder.model_name(),
            "building vector index"
        );

        let mut entries = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = embedder
                .embed(&texts)
                .await
                .map_err(|e| Error::embedding(format!("{:#}", e)))?;

            if vectors.len() != batch.len() {
                return Err(Error::embedding(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    vectors.len()
                )));
            }

            for (chunk, vector) in batch.iter().zip(vectors) {
                if dims > 0 && vector.len() != dims {
                    return Err(Error::embedding(format!(
                        "chunk {} embedded with {} dims, expected {}",
                        chunk.id,
                        vector.len(),
                        dims
                    )));
                }
                entries.push(IndexedChunk {
                    chunk: chunk.clone(),
                    vector,
                });
            }
        }

        Ok(VectorIndex {
            model: embedder.model_name().to_string(),
            dims,
            entries,
        })
    }

    /// Assemble an index from pre-computed entries.
    pub fn from_entries(model: impl Into<String>, dims: usize, entries: Vec<IndexedChunk>) -> Self {
        Self {
            model: model.into(),
            dims,
            entries,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[IndexedChunk] {
        &self.entries
    }

    /// Number of indexed chunks per document type.
    pub fn chunk_counts(&self) -> BTreeMap<DocType, usize> {
        let mut counts = BTreeMap::new();
        for entry in &self.entries {
            *counts.entry(entry.chunk.metadata.doc_type).or_insert(0) += 1;
        }
        counts
    }

    /// The `limit` entries most similar to `query`, best first.
    ///
    /// Ties are broken by chunk ID so results are reproducible.
    pub fn nearest(&self, query: &[f32], limit: usize) -> Vec<Neighbor<'_>> {
        let mut hits: Vec<Neighbor<'_>> = self
            .entries
            .iter()
            .map(|entry| Neighbor {
                entry,
                similarity: cosine_similarity(query, &entry.vector),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.entry.chunk.id.cmp(&b.entry.chunk.id))
        });
        hits.truncate(limit);
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentMetadata;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    /// Embeds text as letter-frequency counts over `a..=d`.
    struct LetterEmbedder {
        calls: AtomicUsize,
        fail_on_call: Option<usize>,
        short_response: bool,
    }

    impl LetterEmbedder {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_on_call: None,
                short_response: false,
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for LetterEmbedder {
        fn model_name(&self) -> &str {
            "letters"
        }

        fn dims(&self) -> usize {
            4
        }

        async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            let call = self.calls.fetch_add(1, AtomicOrdering::SeqCst);
            if self.fail_on_call == Some(call) {
                anyhow::bail!("HTTP 503 Service Unavailable");
            }
            let mut out: Vec<Vec<f32>> = texts
                .iter()
                .map(|t| {
                    ['a', 'b', 'c', 'd']
                        .iter()
                        .map(|l| t.matches(*l).count() as f32)
                        .collect()
                })
                .collect();
            if self.short_response {
                out.pop();
            }
            Ok(out)
        }
    }

    fn doc(source: &str, doc_type: DocType, content: &str) -> ProcessedDocument {
        ProcessedDocument {
            content: content.to_string(),
            metadata: DocumentMetadata {
                source: source.into(),
                doc_type,
                date: None,
            },
            special_notes: None,
        }
    }

    fn corpus() -> Vec<ProcessedDocument> {
        vec![
            doc("faq", DocType::Faq, "aaaa aaaa"),
            doc("terms", DocType::TermsAndConditions, "bbbb bbbb"),
            doc("notice", DocType::TenderNotice, "cccc dddd"),
        ]
    }

    #[tokio::test]
    async fn test_build_embeds_every_chunk() {
        let embedder = LetterEmbedder::new();
        let index = VectorIndex::build(&corpus(), &embedder, &ChunkParams::default(), 2)
            .await
            .unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(index.model(), "letters");
        assert_eq!(index.dims(), 4);
        assert_eq!(embedder.calls.load(AtomicOrdering::SeqCst), 2);
        assert_eq!(index.chunk_counts()[&DocType::Faq], 1);
    }

    #[tokio::test]
    async fn test_nearest_orders_by_similarity() {
        let index = VectorIndex::build(&corpus(), &LetterEmbedder::new(), &ChunkParams::default(), 8)
            .await
            .unwrap();
        let hits = index.nearest(&[0.0, 1.0, 0.0, 0.0], 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].entry.chunk.source, "terms");
        assert!((hits[0].similarity - 1.0).abs() < 1e-6);
        assert!(hits[0].similarity >= hits[1].similarity);
    }

    #[tokio::test]
    async fn test_provider_failure_fails_whole_build() {
        let mut embedder = LetterEmbedder::new();
        embedder.fail_on_call = Some(1);
        let result = VectorIndex::build(&corpus(), &embedder, &ChunkParams::default(), 1).await;
        match result {
            Err(Error::EmbeddingServiceFailure(msg)) => assert!(msg.contains("503")),
            other => panic!("expected embedding failure, got {:?}", other.map(|i| i.len())),
        }
    }

    #[tokio::test]
    async fn test_short_response_fails_build() {
        let mut embedder = LetterEmbedder::new();
        embedder.short_response = true;
        let result = VectorIndex::build(&corpus(), &embedder, &ChunkParams::default(), 8).await;
        assert!(matches!(result, Err(Error::EmbeddingServiceFailure(_))));
    }

    #[tokio::test]
    async fn test_empty_corpus_builds_empty_index() {
        let index = VectorIndex::build(&[], &LetterEmbedder::new(), &ChunkParams::default(), 8)
            .await
            .unwrap();
        assert!(index.is_empty());
        assert!(index.nearest(&[1.0, 0.0, 0.0, 0.0], 5).is_empty());
    }
}
