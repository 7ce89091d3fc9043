//! Core data models shared by the normalizers, the index, and the retriever.
//!
//! These types are backend-agnostic: they carry no file paths beyond a
//! display `source` string and no embedding-provider state.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The kinds of document the pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocType {
    Faq,
    TenderNotice,
    TermsAndConditions,
    ReferenceGuide,
    General,
}

impl DocType {
    /// Every document type, in display order.
    pub const ALL: [DocType; 5] = [
        DocType::Faq,
        DocType::TenderNotice,
        DocType::TermsAndConditions,
        DocType::ReferenceGuide,
        DocType::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocType::Faq => "faq",
            DocType::TenderNotice => "tender_notice",
            DocType::TermsAndConditions => "terms_and_conditions",
            DocType::ReferenceGuide => "reference_guide",
            DocType::General => "general",
        }
    }

    /// Infer a document type from a file name.
    ///
    /// Names that match no known vocabulary fall through to
    /// [`DocType::General`].
    pub fn detect(file_name: &str) -> DocType {
        let name = file_name.to_lowercase();
        if name.ends_with(".json") && (name.contains("article") || name.contains("reference")) {
            DocType::ReferenceGuide
        } else if name.contains("faq") {
            DocType::Faq
        } else if name.contains("terms and conditions")
            || name.contains("terms_and_conditions")
            || name.contains("terms")
        {
            DocType::TermsAndConditions
        } else if name.contains("tender notice") || name.contains("tender_notice") {
            DocType::TenderNotice
        } else {
            DocType::General
        }
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "faq" => Ok(DocType::Faq),
            "tender_notice" | "notice" => Ok(DocType::TenderNotice),
            "terms_and_conditions" | "terms" => Ok(DocType::TermsAndConditions),
            "reference_guide" | "reference" => Ok(DocType::ReferenceGuide),
            "general" => Ok(DocType::General),
            _ => Err(Error::UnknownDocumentType(s.to_string())),
        }
    }
}

/// A document as read from disk, before normalization.
///
/// Raw documents are never mutated; re-ingesting a file produces a new one.
#[derive(Debug, Clone)]
pub struct RawDocument {
    source: String,
    content: String,
    doc_type: DocType,
}

impl RawDocument {
    pub fn new(source: impl Into<String>, content: impl Into<String>, doc_type: DocType) -> Self {
        Self {
            source: source.into(),
            content: content.into(),
            doc_type,
        }
    }

    /// Build a raw document whose type is inferred from `source`.
    pub fn detect(source: impl Into<String>, content: impl Into<String>) -> Self {
        let source = source.into();
        let doc_type = DocType::detect(&source);
        Self::new(source, content, doc_type)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn doc_type(&self) -> DocType {
        self.doc_type
    }
}

/// Metadata carried by every processed document and inherited by its chunks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub source: String,
    #[serde(rename = "type")]
    pub doc_type: DocType,
    /// Document month as `"Mon YYYY"` (e.g. `"Aug 2024"`), when known.
    pub date: Option<String>,
}

/// Annotation classes of the tender-notice marker family.
///
/// The declaration order is the extraction priority: longer asterisk runs
/// must be consumed before shorter ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NoteClass {
    #[serde(rename = "SPECIAL_NOTE_4")]
    SpecialNote4,
    #[serde(rename = "SPECIAL_NOTE_3")]
    SpecialNote3,
    #[serde(rename = "SPECIAL_NOTE_2")]
    SpecialNote2,
    #[serde(rename = "SPECIAL_NOTE_1")]
    SpecialNote1,
    #[serde(rename = "HALAL_NOTE")]
    HalalNote,
    #[serde(rename = "INDIAN_CUISINE_NOTE")]
    IndianCuisineNote,
}

impl NoteClass {
    /// Marker classes in extraction order, paired with their delimiters.
    pub const MARKERS: [(NoteClass, &'static str); 6] = [
        (NoteClass::SpecialNote4, "****"),
        (NoteClass::SpecialNote3, "***"),
        (NoteClass::SpecialNote2, "**"),
        (NoteClass::SpecialNote1, "*"),
        (NoteClass::HalalNote, "+"),
        (NoteClass::IndianCuisineNote, "^"),
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NoteClass::SpecialNote4 => "SPECIAL_NOTE_4",
            NoteClass::SpecialNote3 => "SPECIAL_NOTE_3",
            NoteClass::SpecialNote2 => "SPECIAL_NOTE_2",
            NoteClass::SpecialNote1 => "SPECIAL_NOTE_1",
            NoteClass::HalalNote => "HALAL_NOTE",
            NoteClass::IndianCuisineNote => "INDIAN_CUISINE_NOTE",
        }
    }
}

impl fmt::Display for NoteClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extracted notes, keyed by marker class, in document order.
pub type SpecialNotes = BTreeMap<NoteClass, Vec<String>>;

/// Normalized, section-tagged text produced by exactly one normalizer run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedDocument {
    pub content: String,
    pub metadata: DocumentMetadata,
    /// Only populated for tender notices.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_notes: Option<SpecialNotes>,
}

impl ProcessedDocument {
    pub fn special_notes(&self) -> Option<&SpecialNotes> {
        self.special_notes.as_ref()
    }

    /// Text under the `## <name>` header, up to the next `#` or `##` header.
    ///
    /// Returns `None` if the section header is absent.
    pub fn section(&self, name: &str) -> Option<String> {
        let header = format!("## {}", name.trim());
        let mut lines = self.content.lines();
        lines.find(|line| line.trim_end() == header)?;

        let body: Vec<&str> = lines
            .take_while(|line| !(line.starts_with("# ") || line.starts_with("## ")))
            .collect();
        Some(body.join("\n").trim().to_string())
    }
}

/// A contiguous span of a processed document, indexed independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Deterministic UUID derived from source, index, and text hash.
    pub id: String,
    pub source: String,
    pub chunk_index: usize,
    /// Byte offset of the span start in the processed content.
    pub start: usize,
    /// Byte offset one past the span end.
    pub end: usize,
    pub text: String,
    /// SHA-256 hex digest of `text`.
    pub hash: String,
    pub metadata: DocumentMetadata,
}

/// One prior question/answer exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub question: String,
    pub answer: String,
}

/// Case-specific facts appended to a prompt, such as a selected hawker
/// centre's stall counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SituationalFacts {
    pub title: String,
    pub facts: Vec<(String, String)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_doc_type_from_filename() {
        assert_eq!(DocType::detect("FAQ_on_eTender.docx"), DocType::Faq);
        assert_eq!(
            DocType::detect("Terms and Conditions of Tender.docx"),
            DocType::TermsAndConditions
        );
        assert_eq!(DocType::detect("tender_notice_aug.txt"), DocType::TenderNotice);
        assert_eq!(DocType::detect("articles_of_sale.json"), DocType::ReferenceGuide);
        assert_eq!(DocType::detect("notes.txt"), DocType::General);
    }

    #[test]
    fn test_doc_type_parse_and_display() {
        for ty in DocType::ALL {
            assert_eq!(ty.as_str().parse::<DocType>().unwrap(), ty);
        }
        assert!(matches!(
            "brochure".parse::<DocType>(),
            Err(Error::UnknownDocumentType(_))
        ));
    }

    #[test]
    fn test_doc_type_serde_snake_case() {
        let json = serde_json::to_string(&DocType::TermsAndConditions).unwrap();
        assert_eq!(json, "\"terms_and_conditions\"");
    }

    #[test]
    fn test_note_class_priority_order() {
        let classes: Vec<NoteClass> = NoteClass::MARKERS.iter().map(|(c, _)| *c).collect();
        let mut sorted = classes.clone();
        sorted.sort();
        assert_eq!(classes, sorted);
    }

    #[test]
    fn test_section_lookup() {
        let doc = ProcessedDocument {
            content: "# Title\n## Eligibility\nMust be 21.\n### Q1: Who?\nAnyone.\n## Tendering\nOnline only."
                .to_string(),
            metadata: DocumentMetadata {
                source: "faq".into(),
                doc_type: DocType::Faq,
                date: None,
            },
            special_notes: None,
        };
        assert_eq!(
            doc.section("Eligibility").as_deref(),
            Some("Must be 21.\n### Q1: Who?\nAnyone.")
        );
        assert_eq!(doc.section("Tendering").as_deref(), Some("Online only."));
        assert!(doc.section("Warranty").is_none());
    }
}
