//! Relevance scoring and retrieval.
//!
//! Retrieval runs in two stages against a [`VectorIndex`]: a similarity
//! fetch of `fetch_k` candidates, then a re-rank by composite score.
//!
//! # Scoring Algorithm
//!
//! ```text
//! composite = similarity × type_weight × recency_weight × intent_boost
//! ```
//!
//! - **type_weight**: FAQ 1.3, terms & conditions 1.2, tender notice 1.1,
//!   anything else 1.0.
//! - **recency_weight**: 1.0 when the document's month began at most
//!   `recency_window_days` ago (or lies in the future), else 0.9.
//!   Documents without a parseable `"Mon YYYY"` date get 1.0.
//! - **intent_boost**: 1.2 when the lower-cased query contains one of the
//!   vocabulary terms of the chunk's own document type, else 1.0. Each
//!   type has exactly one vocabulary, so boosts never stack.
//!
//! # Retrieval
//!
//! 1. Fetch `max(fetch_k, k)` nearest chunks by cosine similarity.
//! 2. Drop candidates below `min_similarity`, even if fewer than `k` remain.
//! 3. Sort by composite (desc), similarity (desc), chunk ID (asc).
//! 4. Truncate to `k`.
//!
//! An empty result is a valid outcome; the prompt assembler turns it into
//! an explicit "no sourced information" instruction.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::Serialize;

use crate::index::VectorIndex;
use crate::models::{Chunk, DocType};
use crate::normalize::parse_month_year;

/// Query terms that suggest a how-to or what-is question.
pub const FAQ_INTENT_TERMS: [&str; 8] = ["how", "what", "when", "where", "who", "why", "can i", "do i"];
/// Query terms that suggest a rules or requirements question.
pub const TERMS_INTENT_TERMS: [&str; 6] = ["rule", "requirement", "must", "legal", "condition", "term"];
/// Query terms that suggest a question about the current tender exercise.
pub const NOTICE_INTENT_TERMS: [&str; 5] = ["current", "latest", "tender", "date", "deadline"];

/// Composite scoring weights.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringParams {
    pub faq_weight: f64,
    pub terms_weight: f64,
    pub notice_weight: f64,
    /// Weight for every other document type.
    pub default_weight: f64,
    pub recency_window_days: i64,
    /// Recency weight for documents older than the window.
    pub stale_weight: f64,
    pub intent_boost: f64,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            faq_weight: 1.3,
            terms_weight: 1.2,
            notice_weight: 1.1,
            default_weight: 1.0,
            recency_window_days: 30,
            stale_weight: 0.9,
            intent_boost: 1.2,
        }
    }
}

impl ScoringParams {
    pub fn type_weight(&self, doc_type: DocType) -> f64 {
        match doc_type {
            DocType::Faq => self.faq_weight,
            DocType::TermsAndConditions => self.terms_weight,
            DocType::TenderNotice => self.notice_weight,
            DocType::ReferenceGuide | DocType::General => self.default_weight,
        }
    }

    pub fn recency_weight(&self, date: Option<&str>, today: NaiveDate) -> f64 {
        let Some(dated) = date.and_then(parse_doc_month) else {
            return 1.0;
        };
        let days_old = (today - dated).num_days();
        if days_old <= self.recency_window_days {
            1.0
        } else {
            self.stale_weight
        }
    }

    pub fn intent_boost(&self, doc_type: DocType, query: &str) -> f64 {
        let terms: &[&str] = match doc_type {
            DocType::Faq => &FAQ_INTENT_TERMS,
            DocType::TermsAndConditions => &TERMS_INTENT_TERMS,
            DocType::TenderNotice => &NOTICE_INTENT_TERMS,
            DocType::ReferenceGuide | DocType::General => return 1.0,
        };
        let query = query.to_lowercase();
        if terms.iter().any(|term| query.contains(term)) {
            self.intent_boost
        } else {
            1.0
        }
    }

    /// Score one chunk for `query`.
    pub fn score(&self, chunk: &Chunk, similarity: f64, query: &str, today: NaiveDate) -> ScoreBreakdown {
        let doc_type = chunk.metadata.doc_type;
        let type_weight = self.type_weight(doc_type);
        let recency_weight = self.recency_weight(chunk.metadata.date.as_deref(), today);
        let intent_boost = self.intent_boost(doc_type, query);
        ScoreBreakdown {
            similarity,
            type_weight,
            recency_weight,
            intent_boost,
            composite: similarity * type_weight * recency_weight * intent_boost,
        }
    }
}

/// `"Aug 2024"` → 2024-08-01.
fn parse_doc_month(date: &str) -> Option<NaiveDate> {
    let mut parts = date.split_whitespace();
    let month = parts.next()?;
    let year = parts.next()?;
    parse_month_year(month, year)
}

/// Retrieval sizing.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalParams {
    /// Maximum results returned.
    pub k: usize,
    /// Candidates fetched by similarity before re-ranking.
    pub fetch_k: usize,
    /// Candidates below this cosine similarity are discarded.
    pub min_similarity: f64,
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self {
            k: 6,
            fetch_k: 10,
            min_similarity: 0.25,
        }
    }
}

/// Bundles all inputs for a single retrieval.
#[derive(Debug, Clone)]
pub struct RetrievalRequest<'a> {
    pub query: &'a str,
    /// Pre-computed query embedding.
    pub query_vec: &'a [f32],
    /// Reference date for recency weighting.
    pub today: NaiveDate,
    pub retrieval: RetrievalParams,
    pub scoring: ScoringParams,
}

/// Factors of a composite score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub similarity: f64,
    pub type_weight: f64,
    pub recency_weight: f64,
    pub intent_boost: f64,
    pub composite: f64,
}

/// A retrieved chunk with its scores.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredCandidate {
    pub chunk: Chunk,
    pub similarity: f64,
    pub composite_score: f64,
    pub breakdown: ScoreBreakdown,
}

/// Retrieve the best `k` chunks for a query.
pub fn retrieve(index: &VectorIndex, req: &RetrievalRequest<'_>) -> Vec<ScoredCandidate> {
    if req.query.trim().is_empty() {
        return Vec::new();
    }

    let fetch = req.retrieval.fetch_k.max(req.retrieval.k);
    let neighbors = index.nearest(req.query_vec, fetch);
    let fetched = neighbors.len();

    let mut candidates: Vec<ScoredCandidate> = neighbors
        .into_iter()
        .filter(|n| f64::from(n.similarity) >= req.retrieval.min_similarity)
        .map(|n| {
            let similarity = f64::from(n.similarity);
            let breakdown = req.scoring.score(&n.entry.chunk, similarity, req.query, req.today);
            ScoredCandidate {
                chunk: n.entry.chunk.clone(),
                similarity,
                composite_score: breakdown.composite,
                breakdown,
            }
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.composite_score
            .partial_cmp(&a.composite_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.similarity.partial_cmp(&a.similarity).unwrap_or(Ordering::Equal))
            .then_with(|| a.chunk.id.cmp(&b.chunk.id))
    });
    candidates.truncate(req.retrieval.k);

    tracing::debug!(
        fetched,
        kept = candidates.len(),
        "retrieved context chunks"
    );
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexedChunk;
    use crate::models::DocumentMetadata;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 8, 20).unwrap()
    }

    fn chunk(id: &str, doc_type: DocType, date: Option<&str>) -> Chunk {
        Chunk {
            id: id.to_string(),
            source: doc_type.to_string(),
            chunk_index: 0,
            start: 0,
            end: 4,
            text: format!("text of {}", id),
            hash: String::new(),
            metadata: DocumentMetadata {
                source: doc_type.to_string(),
                doc_type,
                date: date.map(str::to_string),
            },
        }
    }

    fn entry(id: &str, doc_type: DocType, date: Option<&str>, vector: Vec<f32>) -> IndexedChunk {
        IndexedChunk {
            chunk: chunk(id, doc_type, date),
            vector,
        }
    }

    fn request<'a>(query: &'a str, query_vec: &'a [f32]) -> RetrievalRequest<'a> {
        RetrievalRequest {
            query,
            query_vec,
            today: today(),
            retrieval: RetrievalParams::default(),
            scoring: ScoringParams::default(),
        }
    }

    #[test]
    fn test_type_weights() {
        let p = ScoringParams::default();
        assert_eq!(p.type_weight(DocType::Faq), 1.3);
        assert_eq!(p.type_weight(DocType::TermsAndConditions), 1.2);
        assert_eq!(p.type_weight(DocType::TenderNotice), 1.1);
        assert_eq!(p.type_weight(DocType::ReferenceGuide), 1.0);
        assert_eq!(p.type_weight(DocType::General), 1.0);
    }

    #[test]
    fn test_recency_weight() {
        let p = ScoringParams::default();
        assert_eq!(p.recency_weight(Some("Aug 2024"), today()), 1.0);
        assert_eq!(p.recency_weight(Some("Jul 2024"), today()), 0.9);
        assert_eq!(p.recency_weight(Some("Sep 2024"), today()), 1.0);
        assert_eq!(p.recency_weight(Some("sometime"), today()), 1.0);
        assert_eq!(p.recency_weight(None, today()), 1.0);
    }

    #[test]
    fn test_intent_boost_is_per_type() {
        let p = ScoringParams::default();
        assert_eq!(p.intent_boost(DocType::Faq, "How do I apply?"), 1.2);
        assert_eq!(p.intent_boost(DocType::Faq, "Stall rental"), 1.0);
        assert_eq!(p.intent_boost(DocType::TermsAndConditions, "Which RULES apply"), 1.2);
        assert_eq!(p.intent_boost(DocType::TenderNotice, "latest closing"), 1.2);
        assert_eq!(p.intent_boost(DocType::TenderNotice, "rules"), 1.0);
        assert_eq!(p.intent_boost(DocType::General, "what are the latest rules"), 1.0);
    }

    #[test]
    fn test_composite_is_product_of_factors() {
        let p = ScoringParams::default();
        let c = chunk("t", DocType::TermsAndConditions, Some("Mar 2024"));
        let b = p.score(&c, 0.5, "what must I do", today());
        assert!((b.composite - 0.5 * 1.2 * 0.9 * 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_eligibility_question_prefers_newer_terms_over_stale_faq() {
        let index = VectorIndex::from_entries(
            "test",
            2,
            vec![
                entry("faq-1", DocType::Faq, Some("Mar 2024"), vec![1.0, 1.0]),
                entry("tc-1", DocType::TermsAndConditions, Some("Aug 2024"), vec![1.0, 1.0]),
            ],
        );
        let results = retrieve(
            &index,
            &request("What are the eligibility requirements?", &[1.0, 1.0]),
        );
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.id, "tc-1");
        assert_eq!(results[0].breakdown.intent_boost, 1.2);
        assert_eq!(results[1].chunk.id, "faq-1");
        assert!((results[0].similarity - results[1].similarity).abs() < 1e-9);
    }

    #[test]
    fn test_eligibility_question_prefers_faq_when_dates_match() {
        let index = VectorIndex::from_entries(
            "test",
            2,
            vec![
                entry("faq-1", DocType::Faq, Some("Aug 2024"), vec![1.0, 1.0]),
                entry("tc-1", DocType::TermsAndConditions, Some("Aug 2024"), vec![1.0, 1.0]),
            ],
        );
        let results = retrieve(
            &index,
            &request("What are the eligibility requirements?", &[1.0, 1.0]),
        );
        assert_eq!(results.len(), 2);
        // Both types match an intent term; the FAQ type weight decides.
        assert_eq!(results[0].chunk.id, "faq-1");
        assert_eq!(results[1].chunk.id, "tc-1");
        let sim = results[0].similarity;
        assert!((results[0].composite_score - sim * 1.3 * 1.2).abs() < 1e-6);
        assert!((results[1].composite_score - sim * 1.2 * 1.2).abs() < 1e-6);
    }

    #[test]
    fn test_threshold_can_leave_zero_results() {
        let index = VectorIndex::from_entries(
            "test",
            2,
            vec![entry("faq-1", DocType::Faq, None, vec![0.0, 1.0])],
        );
        let results = retrieve(&index, &request("How do I tender?", &[1.0, 0.0]));
        assert!(results.is_empty());
    }

    #[test]
    fn test_rerank_and_truncate() {
        let mut entries = Vec::new();
        for i in 0..12 {
            let angle = i as f32 * 0.05;
            entries.push(entry(
                &format!("gen-{:02}", i),
                DocType::General,
                None,
                vec![angle.cos(), angle.sin()],
            ));
        }
        entries.push(entry("faq-x", DocType::Faq, None, vec![0.95, 0.3]));
        let index = VectorIndex::from_entries("test", 2, entries);

        let results = retrieve(&index, &request("how do I bid", &[1.0, 0.0]));
        assert_eq!(results.len(), 6);
        assert_eq!(results[0].chunk.id, "faq-x");
        for pair in results.windows(2) {
            assert!(pair[0].composite_score >= pair[1].composite_score);
        }
    }

    #[test]
    fn test_raising_type_weight_raises_scores_and_keeps_order() {
        let index = VectorIndex::from_entries(
            "test",
            2,
            vec![
                entry("tc-a", DocType::TermsAndConditions, None, vec![1.0, 0.1]),
                entry("tc-b", DocType::TermsAndConditions, None, vec![1.0, 0.5]),
                entry("gen", DocType::General, None, vec![1.0, 0.3]),
            ],
        );
        let base = retrieve(&index, &request("eligibility", &[1.0, 0.0]));

        let mut raised = request("eligibility", &[1.0, 0.0]);
        raised.scoring.terms_weight = 1.5;
        let raised = retrieve(&index, &raised);

        let score = |results: &[ScoredCandidate], id: &str| {
            results.iter().find(|c| c.chunk.id == id).map(|c| c.composite_score).unwrap()
        };
        assert!(score(&raised, "tc-a") > score(&base, "tc-a"));
        assert!(score(&raised, "tc-b") > score(&base, "tc-b"));
        assert_eq!(score(&raised, "gen"), score(&base, "gen"));

        let order = |results: &[ScoredCandidate]| {
            results
                .iter()
                .filter(|c| c.chunk.metadata.doc_type == DocType::TermsAndConditions)
                .map(|c| c.chunk.id.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(order(&base), order(&raised));
    }

    #[test]
    fn test_empty_query_returns_nothing() {
        let index = VectorIndex::from_entries(
            "test",
            2,
            vec![entry("faq-1", DocType::Faq, None, vec![1.0, 0.0])],
        );
        assert!(retrieve(&index, &request("   ", &[1.0, 0.0])).is_empty());
    }
}
