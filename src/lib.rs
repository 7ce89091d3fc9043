//! # Tender Harness
//!
//! Versioned ingestion and relevance-weighted retrieval over hawker-stall
//! tender documents (FAQ, tender notice, terms and conditions), with a
//! language model answering questions from the retrieved text.
//!
//! The pure pipeline (normalizers, chunking, index, scoring, prompt
//! assembly) lives in `tender-harness-core`. This crate adds everything
//! that touches the outside world.
//!
//! ## Architecture
//!
//! ```text
//! raw .docx/.txt ─▶ versions (normalize, archive, atomic replace)
//!                        │
//!                        ▼
//!   current files + reference guide + general sources ─▶ ingest
//!                        │
//!                        ▼
//!        assistant: chunk ─▶ embed ─▶ VectorIndex ─▶ retrieve ─▶ prompt ─▶ LLM
//!                        │
//!                 CLI (main.rs) / HTTP (server)
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`versions`] | Current/archived document versions |
//! | [`extract`] | `.docx` text extraction |
//! | [`ingest`] | Corpus loading for index builds |
//! | [`embedding`] | OpenAI / Ollama embedding providers |
//! | [`llm`] | OpenAI / Ollama completion backends |
//! | [`http`] | Shared JSON client with retry and backoff |
//! | [`assistant`] | Index lifecycle and question answering |
//! | [`server`] | Axum JSON API |

pub mod assistant;
pub mod config;
pub mod embedding;
pub mod extract;
pub mod http;
pub mod ingest;
pub mod llm;
pub mod server;
pub mod versions;
