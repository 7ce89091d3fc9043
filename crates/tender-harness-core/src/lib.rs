//! # Tender Harness Core
//!
//! Pure, I/O-free logic for Tender Harness: the document data model, the
//! structural normalizers, chunking, the in-memory vector index, relevance
//! scoring, and prompt assembly.
//!
//! This crate performs no filesystem or network access. Embedding and
//! completion backends are supplied by the caller through the
//! [`embedding::EmbeddingProvider`] and [`llm::LanguageModel`] traits.

pub mod chunk;
pub mod embedding;
pub mod error;
pub mod index;
pub mod llm;
pub mod models;
pub mod normalize;
pub mod prompt;
pub mod reference;
pub mod search;

pub use error::{Error, Result};
