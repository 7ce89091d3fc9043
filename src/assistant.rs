//! The question-answering service.
//!
//! [`Assistant`] owns the version store, the two provider backends, and the
//! vector index, and runs the full pipeline for a question:
//!
//! ```text
//! question ─▶ embed ─▶ retrieve (k of fetch_k, composite-ranked)
//!                           │
//!          history, facts ──┴─▶ assemble prompt ─▶ language model ─▶ Answer
//! ```
//!
//! # Index lifecycle
//!
//! The index is built lazily by the first query when none exists
//! ([`Assistant::ensure_index`]); after that it changes only through
//! [`Assistant::refresh_index`]. A document update marks the served index
//! stale but never rebuilds it. A rebuild runs outside the index lock and is
//! swapped in only when complete, so queries keep reading the previous
//! index meanwhile, and keep using it if the rebuild fails.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use chrono::{Local, NaiveDate};
use parking_lot::RwLock;
use serde::Serialize;

use tender_harness_core::embedding::EmbeddingProvider;
use tender_harness_core::index::VectorIndex;
use tender_harness_core::llm::LanguageModel;
use tender_harness_core::models::{DocType, ProcessedDocument, SituationalFacts, Turn};
use tender_harness_core::prompt::{assemble, ContextRequest};
use tender_harness_core::search::{retrieve, RetrievalRequest, ScoredCandidate};
use tender_harness_core::Error;

use crate::config::Config;
use crate::embedding::{create_provider, embed_query};
use crate::ingest;
use crate::llm::create_llm;
use crate::versions::VersionStore;

/// Reply used when the pipeline fails.
pub const FALLBACK_ANSWER: &str =
    "Sorry, I could not answer that just now. Please ask your question again.";

/// A generated answer and the chunks it was grounded on.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<ScoredCandidate>,
}

/// Summary of a completed index build.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub documents: usize,
    pub chunks: usize,
    pub chunks_by_type: BTreeMap<DocType, usize>,
    pub model: String,
}

pub struct Assistant {
    config: Arc<Config>,
    store: Arc<VersionStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LanguageModel>,
    index: RwLock<Option<Arc<VectorIndex>>>,
    stale: AtomicBool,
    /// Serializes document updates and index rebuilds.
    writer: tokio::sync::Mutex<()>,
    today: Option<NaiveDate>,
}

impl Assistant {
    /// Build an assistant with the providers named in `config`.
    pub fn new(config: Config) -> Result<Self> {
        let embedder: Arc<dyn EmbeddingProvider> = Arc::from(create_provider(&config.embedding)?);
        let llm: Arc<dyn LanguageModel> = Arc::from(create_llm(&config.llm)?);
        Self::with_providers(config, embedder, llm)
    }

    pub fn with_providers(
        config: Config,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LanguageModel>,
    ) -> Result<Self> {
        let store = Arc::new(VersionStore::open(&config.data.dir)?);
        Ok(Self {
            config: Arc::new(config),
            store,
            embedder,
            llm,
            index: RwLock::new(None),
            stale: AtomicBool::new(false),
            writer: tokio::sync::Mutex::new(()),
            today: None,
        })
    }

    /// Pin the reference date used for recency weighting.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &VersionStore {
        &self.store
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    /// Store a new version of `doc_type` and mark the index stale.
    ///
    /// Extraction and file writes run on the blocking pool.
    pub async fn update_document(
        &self,
        doc_type: DocType,
        raw_path: &Path,
    ) -> tender_harness_core::Result<ProcessedDocument> {
        let _guard = self.writer.lock().await;
        let store = Arc::clone(&self.store);
        let raw_path = raw_path.to_path_buf();
        let processed =
            tokio::task::spawn_blocking(move || store.update_document(doc_type, &raw_path))
                .await
                .map_err(|e| Error::Io(std::io::Error::other(e)))??;
        self.stale.store(true, Ordering::SeqCst);
        Ok(processed)
    }

    /// Whether documents changed since the served index was built.
    pub fn index_is_stale(&self) -> bool {
        self.stale.load(Ordering::SeqCst)
    }

    pub fn get_current_file(&self, doc_type: DocType) -> Option<PathBuf> {
        self.store.get_current_file(doc_type)
    }

    /// The index currently being served, if any.
    pub fn current_index(&self) -> Option<Arc<VectorIndex>> {
        self.index.read().clone()
    }

    /// Drop the cached index; the next query rebuilds it.
    pub fn invalidate(&self) {
        *self.index.write() = None;
    }

    /// Rebuild the index from the current corpus and swap it in.
    ///
    /// On failure the previously served index (if any) is kept.
    pub async fn refresh_index(&self) -> Result<IndexStats> {
        let _guard = self.writer.lock().await;
        self.rebuild().await
    }

    async fn rebuild(&self) -> Result<IndexStats> {
        let docs = ingest::load_corpus(&self.store, &self.config.sources)?;
        let index = VectorIndex::build(
            &docs,
            self.embedder.as_ref(),
            &self.config.chunking.params(),
            self.config.embedding.batch_size,
        )
        .await?;

        let stats = IndexStats {
            documents: docs.len(),
            chunks: index.len(),
            chunks_by_type: index.chunk_counts(),
            model: index.model().to_string(),
        };
        *self.index.write() = Some(Arc::new(index));
        self.stale.store(false, Ordering::SeqCst);

        tracing::info!(
            documents = stats.documents,
            chunks = stats.chunks,
            model = %stats.model,
            "index rebuilt"
        );
        Ok(stats)
    }

    /// Return the served index, building it only if none exists yet.
    ///
    /// A stale index is still served; rebuilding it is left to
    /// [`Assistant::refresh_index`].
    pub async fn ensure_index(&self) -> Result<Arc<VectorIndex>> {
        if let Some(index) = self.current_index() {
            if self.index_is_stale() {
                tracing::debug!("serving stale index until the next refresh");
            }
            return Ok(index);
        }

        let _guard = self.writer.lock().await;
        // Another caller may have built it while we waited.
        if let Some(index) = self.current_index() {
            return Ok(index);
        }
        self.rebuild().await?;
        self.current_index()
            .ok_or_else(|| anyhow::anyhow!("index missing after rebuild"))
    }

    /// Retrieve the best chunks for `query`.
    pub async fn search(&self, query: &str) -> Result<Vec<ScoredCandidate>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let index = self.ensure_index().await?;
        let query_vec = embed_query(self.embedder.as_ref(), query).await?;
        let request = RetrievalRequest {
            query,
            query_vec: &query_vec,
            today: self.today(),
            retrieval: self.config.retrieval.params(),
            scoring: self.config.retrieval.scoring(),
        };
        Ok(retrieve(&index, &request))
    }

    /// Answer a question. Never fails: pipeline errors produce
    /// [`FALLBACK_ANSWER`] with no sources.
    pub async fn answer(
        &self,
        question: &str,
        history: &[Turn],
        situation: Option<&SituationalFacts>,
    ) -> Answer {
        match self.try_answer(question, history, situation).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!(error = %format!("{:#}", e), "answer failed");
                Answer {
                    answer: FALLBACK_ANSWER.to_string(),
                    sources: Vec::new(),
                }
            }
        }
    }

    async fn try_answer(
        &self,
        question: &str,
        history: &[Turn],
        situation: Option<&SituationalFacts>,
    ) -> Result<Answer> {
        let sources = self.search(question).await?;
        let chunks: Vec<_> = sources.iter().map(|c| c.chunk.clone()).collect();

        let max_turns = self.config.retrieval.max_history_turns;
        let recent = &history[history.len().saturating_sub(max_turns)..];

        let prompt = assemble(&ContextRequest {
            question,
            chunks: &chunks,
            history: recent,
            situation,
        });
        let text = self.llm.complete(&prompt).await?;

        tracing::info!(
            sources = sources.len(),
            model = self.llm.model_name(),
            "answered question"
        );
        Ok(Answer {
            answer: text,
            sources,
        })
    }
}
