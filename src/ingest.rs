//! Corpus loading for index builds.
//!
//! The corpus is every current version in the [`VersionStore`], plus the
//! articles-of-sale reference guide and any general guidance files named in
//! `[sources]`. Current versions are already normalized, so they are read
//! back as-is; only their date is recovered from the text. Tender notices
//! also get their special notes appended as a section of their own.
//!
//! A configured source that does not exist is logged and skipped. A source
//! that exists but cannot be read or parsed fails the load.

use anyhow::{Context, Result};
use std::path::Path;
use walkdir::WalkDir;

use tender_harness_core::models::{DocType, DocumentMetadata, ProcessedDocument, RawDocument};
use tender_harness_core::normalize::{detect_date, notice, Normalizer};
use tender_harness_core::reference;

use crate::config::SourcesConfig;
use crate::extract;
use crate::versions::VersionStore;

/// Load every document that should be indexed.
pub fn load_corpus(store: &VersionStore, sources: &SourcesConfig) -> Result<Vec<ProcessedDocument>> {
    let mut docs = Vec::new();

    for doc_type in store.document_types() {
        let Some(path) = store.get_current_file(doc_type) else {
            tracing::warn!(doc_type = %doc_type, "no current version, skipping");
            continue;
        };
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read current version: {}", path.display()))?;
        docs.push(current_document(doc_type, content));
    }

    if let Some(path) = &sources.reference_guide {
        if path.is_file() {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read reference guide: {}", path.display()))?;
            let doc = reference::process(&source_name(path), &json)
                .with_context(|| format!("Failed to parse reference guide: {}", path.display()))?;
            docs.push(doc);
        } else {
            tracing::warn!(path = %path.display(), "reference guide not found, skipping");
        }
    }

    for root in &sources.general {
        if !root.exists() {
            tracing::warn!(path = %root.display(), "general source not found, skipping");
            continue;
        }
        for path in general_files(root)? {
            let text = extract::read_source(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let raw = RawDocument::new(source_name(&path), text, DocType::General);
            docs.push(Normalizer::General.process(&raw));
        }
    }

    tracing::info!(documents = docs.len(), "loaded corpus");
    Ok(docs)
}

/// Rebuild a processed document from a stored current version.
pub fn current_document(doc_type: DocType, mut content: String) -> ProcessedDocument {
    let date = detect_date(doc_type, &content);

    let special_notes = if doc_type == DocType::TenderNotice {
        let notes = notice::notes_in(&content);
        content.push_str(&notice::special_notes_appendix(&notes));
        Some(notes)
    } else {
        None
    };

    ProcessedDocument {
        content,
        metadata: DocumentMetadata {
            source: doc_type.to_string(),
            doc_type,
            date,
        },
        special_notes,
    }
}

/// `.txt`, `.md`, and `.docx` files under `root`, in path order.
fn general_files(root: &Path) -> Result<Vec<std::path::PathBuf>> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let supported = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| matches!(e.to_ascii_lowercase().as_str(), "txt" | "md" | "docx"))
            .unwrap_or(false);
        if supported {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
