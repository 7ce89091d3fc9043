//! Error taxonomy shared by the core crate and the application.
//!
//! Two pipeline outcomes are not errors: a document whose text
//! matches none of its type's structural patterns still normalizes (with
//! less structure), and a retrieval that finds no relevant chunk returns an
//! empty list that the prompt assembler turns into a "no sources" instruction.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline errors.
#[derive(Debug, Error)]
pub enum Error {
    /// No configuration record exists for the requested document type.
    #[error("unknown document type: {0}")]
    UnknownDocumentType(String),

    /// A raw source file to ingest does not exist.
    #[error("source file not found: {}", .0.display())]
    SourceFileMissing(PathBuf),

    /// The embedding backend failed; the current index build is abandoned.
    #[error("embedding service failure: {0}")]
    EmbeddingServiceFailure(String),

    /// The completion backend failed.
    #[error("language model failure: {0}")]
    LanguageModel(String),

    /// Text could not be extracted from a word-processor file.
    #[error("failed to extract text from '{path}': {message}")]
    Extraction { path: String, message: String },

    /// Invalid or unreadable configuration.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::EmbeddingServiceFailure(message.into())
    }

    pub fn extraction(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Extraction {
            path: path.into(),
            message: message.into(),
        }
    }
}
