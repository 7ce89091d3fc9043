//! Structure-aware recursive text chunker.
//!
//! Splits a [`ProcessedDocument`]'s content into overlapping [`Chunk`]s,
//! preferring structural boundaries (section headers of decreasing depth,
//! then paragraphs, then lines, then words) over arbitrary character
//! positions.
//!
//! Every chunk is an exact span of the source text, recorded as byte
//! offsets, and inherits the document's metadata unmodified. Chunk IDs are
//! UUIDv5 values derived from the source name, index, and text hash, so
//! re-chunking the same document always yields the same chunks.
//!
//! # Algorithm
//!
//! 1. Pick the first separator from [`SEPARATORS`] that occurs in the text
//!    (the empty separator always matches and splits into characters).
//! 2. Split the text at every occurrence, keeping the separator at the
//!    start of the following piece so that headers stay with their body.
//! 3. Pieces shorter than `chunk_size` are queued for merging. A piece that
//!    is too long flushes the queue and is split again with the remaining,
//!    finer separators.
//! 4. Merging packs queued pieces greedily into spans of at most
//!    `chunk_size` characters. When a span is emitted, pieces are dropped
//!    from its front until at most `chunk_overlap` characters remain; those
//!    pieces start the next span and provide the overlap.
//!
//! Lengths are counted in characters, not bytes.
//!
//! # Example
//!
//! ```rust
//! use tender_harness_core::chunk::{chunk_document, ChunkParams};
//! use tender_harness_core::models::{DocType, DocumentMetadata, ProcessedDocument};
//!
//! let doc = ProcessedDocument {
//!     content: "# Title\n## Eligibility\nMust be 21.".to_string(),
//!     metadata: DocumentMetadata { source: "faq".into(), doc_type: DocType::Faq, date: None },
//!     special_notes: None,
//! };
//! let chunks = chunk_document(&doc, &ChunkParams::default());
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0].text, doc.content);
//! ```

use std::collections::VecDeque;
use std::ops::Range;

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::{Chunk, ProcessedDocument};

/// Split points in priority order.
pub const SEPARATORS: [&str; 8] = ["\n## ", "\n### ", "\n#### ", "\n##### ", "\n\n", "\n", " ", ""];

/// Chunk sizing, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkParams {
    /// Maximum chunk length.
    pub chunk_size: usize,
    /// Maximum length carried over from one chunk into the next. Must be
    /// smaller than `chunk_size`.
    pub chunk_overlap: usize,
}

impl Default for ChunkParams {
    fn default() -> Self {
        Self {
            chunk_size: 1500,
            chunk_overlap: 200,
        }
    }
}

/// Split a processed document into chunks.
///
/// Chunk indices are contiguous from 0 and spans are in document order.
/// Whitespace-only spans are skipped, so an empty document yields no
/// chunks.
pub fn chunk_document(doc: &ProcessedDocument, params: &ChunkParams) -> Vec<Chunk> {
    let text = doc.content.as_str();
    let mut spans = Vec::new();
    split_recursive(text, 0, &SEPARATORS, params, &mut spans);

    spans
        .into_iter()
        .filter(|span| !text[span.clone()].trim().is_empty())
        .enumerate()
        .map(|(index, span)| make_chunk(doc, index, span))
        .collect()
}

fn split_recursive(
    text: &str,
    offset: usize,
    separators: &[&str],
    params: &ChunkParams,
    out: &mut Vec<Range<usize>>,
) {
    let mut separator = "";
    let mut finer: &[&str] = &[];
    for (i, sep) in separators.iter().enumerate() {
        if sep.is_empty() || text.contains(*sep) {
            separator = *sep;
            finer = &separators[i + 1..];
            break;
        }
    }

    let mut queued: Vec<(Range<usize>, usize)> = Vec::new();
    for piece in split_keeping_separator(text, separator) {
        let len = text[piece.clone()].chars().count();
        if len < params.chunk_size {
            queued.push((piece, len));
            continue;
        }

        if !queued.is_empty() {
            merge_pieces(&queued, offset, params, out);
            queued.clear();
        }
        if finer.is_empty() {
            out.push(offset + piece.start..offset + piece.end);
        } else {
            split_recursive(&text[piece.clone()], offset + piece.start, finer, params, out);
        }
    }

    if !queued.is_empty() {
        merge_pieces(&queued, offset, params, out);
    }
}

/// Split at every occurrence of `separator`, each piece starting with the
/// separator that preceded it. The empty separator splits into characters.
fn split_keeping_separator(text: &str, separator: &str) -> Vec<Range<usize>> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| i..i + c.len_utf8())
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (pos, _) in text.match_indices(separator) {
        if pos > start {
            pieces.push(start..pos);
        }
        start = pos;
    }
    if start < text.len() {
        pieces.push(start..text.len());
    }
    pieces
}

fn merge_pieces(
    pieces: &[(Range<usize>, usize)],
    offset: usize,
    params: &ChunkParams,
    out: &mut Vec<Range<usize>>,
) {
    let mut current: VecDeque<&(Range<usize>, usize)> = VecDeque::new();
    let mut total = 0usize;

    for piece in pieces {
        let len = piece.1;
        if total + len > params.chunk_size && !current.is_empty() {
            out.push(span_of(&current, offset));
            while total > params.chunk_overlap || (total + len > params.chunk_size && total > 0) {
                match current.pop_front() {
                    Some(first) => total -= first.1,
                    None => break,
                }
            }
        }
        current.push_back(piece);
        total += len;
    }

    if !current.is_empty() {
        out.push(span_of(&current, offset));
    }
}

fn span_of(pieces: &VecDeque<&(Range<usize>, usize)>, offset: usize) -> Range<usize> {
    let start = pieces.front().map_or(0, |p| p.0.start);
    let end = pieces.back().map_or(0, |p| p.0.end);
    offset + start..offset + end
}

/// Create a [`Chunk`] with a deterministic ID and SHA-256 content hash.
fn make_chunk(doc: &ProcessedDocument, index: usize, span: Range<usize>) -> Chunk {
    let text = doc.content[span.clone()].to_string();

    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    let name = format!("{}:{}:{}", doc.metadata.source, index, hash);
    let id = Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string();

    Chunk {
        id,
        source: doc.metadata.source.clone(),
        chunk_index: index,
        start: span.start,
        end: span.end,
        text,
        hash,
        metadata: doc.metadata.clone(),
    }
}
