//! Structural normalization of raw regulatory documents.
//!
//! Each document type has its own [`Normalizer`] variant. All structured
//! variants share [`basic_cleanup`] and then apply pattern-driven rewrites
//! that turn loosely formatted prose into markdown-like, section-tagged text
//! (`#` title, `##` sections, `###`+ sub-entries).
//!
//! Normalization never fails. A pattern that finds nothing leaves the text
//! as it was, so an unusual document still produces a usable (if flatter)
//! [`ProcessedDocument`]. Output is a pure function of the input: the same
//! raw document always yields byte-identical content.
//!
//! # Variants
//!
//! | Variant | Module | Notable output |
//! |---------|--------|----------------|
//! | `Faq` | [`faq`] | `## <Section>`, `### Q<n>: ...`, metadata comment |
//! | `TermsAndConditions` | [`terms`] | title banner, `### Clause N`, section metadata comments |
//! | `TenderNotice` | [`notice`] | `## Tender Dates`, `> Note (<CLASS>): ...`, location restrictions |
//! | `General` | none | passthrough |

pub mod faq;
pub mod notice;
pub mod terms;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{DocType, DocumentMetadata, ProcessedDocument, RawDocument};

static IMAGE_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[[^\]\n]*\]\([^)\n]*\)").expect("valid image regex"));
static FIELD_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[^{}\n]*\}").expect("valid field code regex"));
static NUMERIC_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\d+\]").expect("valid reference regex"));

static MONTH_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:\d{1,2}\s+)?(Jan(?:uary)?|Feb(?:ruary)?|Mar(?:ch)?|Apr(?:il)?|May|June?|July?|Aug(?:ust)?|Sep(?:t(?:ember)?)?|Oct(?:ober)?|Nov(?:ember)?|Dec(?:ember)?)\s+(\d{4})\b",
    )
    .expect("valid month regex")
});
static DATE_STAMP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(20\d{2})(\d{2})\d{2}").expect("valid stamp regex"));
static LAST_UPDATED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)last\s+updated\s*:?[ \t]*(?:\d{1,2}\s+)?([A-Za-z]+)[ \t]+(\d{4})")
        .expect("valid last-updated regex")
});
static VERSION_BANNER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Ver\s*\d+\s*:\s*([A-Za-z]+)\s+(\d{4})").expect("valid version regex")
});
static OPENING_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Opening(?:\s+on)?[ \t]*\n?[ \t]*(?:\d{1,2}\s+)?([A-Za-z]+)\s+(\d{4})")
        .expect("valid opening regex")
});

/// The per-type structural normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalizer {
    Faq,
    TermsAndConditions,
    TenderNotice,
    /// No structural rewriting; used for reference and free-form documents.
    General,
}

impl Normalizer {
    /// The default normalizer for a document type.
    pub fn for_type(doc_type: DocType) -> Normalizer {
        match doc_type {
            DocType::Faq => Normalizer::Faq,
            DocType::TermsAndConditions => Normalizer::TermsAndConditions,
            DocType::TenderNotice => Normalizer::TenderNotice,
            DocType::ReferenceGuide | DocType::General => Normalizer::General,
        }
    }

    /// Resolve a configured preprocessor name.
    ///
    /// Accepts the snake_case names returned by [`Normalizer::name`] as well
    /// as the legacy class-style names found in older configuration files.
    pub fn from_name(name: &str) -> Option<Normalizer> {
        match name.trim() {
            "faq" | "FAQPreprocessor" => Some(Normalizer::Faq),
            "terms_and_conditions" | "TenderTermsPreprocessor" => {
                Some(Normalizer::TermsAndConditions)
            }
            "tender_notice" | "TenderNoticePreprocessor" => Some(Normalizer::TenderNotice),
            "general" | "none" => Some(Normalizer::General),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Normalizer::Faq => "faq",
            Normalizer::TermsAndConditions => "terms_and_conditions",
            Normalizer::TenderNotice => "tender_notice",
            Normalizer::General => "general",
        }
    }

    /// Normalize a raw document.
    ///
    /// The metadata date is taken from the document text when the type's
    /// date pattern is present, otherwise from a month/year or `YYYYMMDD`
    /// stamp in the source name. The general variant carries no date.
    pub fn process(&self, raw: &RawDocument) -> ProcessedDocument {
        let date = match self {
            Normalizer::General => None,
            _ => detect_date(raw.doc_type(), raw.content())
                .or_else(|| detect_date_in_name(raw.source())),
        };

        let (content, special_notes) = match self {
            Normalizer::Faq => (faq::normalize(&basic_cleanup(raw.content()), date.as_deref()), None),
            Normalizer::TermsAndConditions => (terms::normalize(&basic_cleanup(raw.content())), None),
            Normalizer::TenderNotice => {
                let (content, notes) = notice::normalize(&basic_cleanup(raw.content()));
                (content, Some(notes))
            }
            Normalizer::General => (raw.content().to_string(), None),
        };

        tracing::debug!(
            source = raw.source(),
            normalizer = self.name(),
            bytes = content.len(),
            "normalized document"
        );

        ProcessedDocument {
            content,
            metadata: DocumentMetadata {
                source: raw.source().to_string(),
                doc_type: raw.doc_type(),
                date,
            },
            special_notes,
        }
    }
}

/// Cleanup shared by every structured variant.
///
/// Normalizes line endings, strips control characters other than newline
/// and tab, removes markdown image references, `{...}` field-code residue,
/// and numeric reference markers like `[3]`, then trims every line and
/// drops blank ones. Other bracketed text is kept: tender notices use it
/// for dates, locations, and section markers.
pub fn basic_cleanup(text: &str) -> String {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let text: String = text
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect();

    let text = IMAGE_REF.replace_all(&text, "");
    let text = FIELD_CODE.replace_all(&text, "");
    let text = NUMERIC_REF.replace_all(&text, "");

    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Find the month a document refers to, rendered as `"Mon YYYY"`.
///
/// Works on both raw and normalized text, so the date of a stored current
/// version can be recovered without re-running the normalizer.
pub fn detect_date(doc_type: DocType, text: &str) -> Option<String> {
    let re: &Regex = match doc_type {
        DocType::Faq => &LAST_UPDATED,
        DocType::TermsAndConditions => &VERSION_BANNER,
        DocType::TenderNotice => &OPENING_DATE,
        DocType::ReferenceGuide | DocType::General => return None,
    };
    let caps = re.captures(text)?;
    month_year(&caps[1], &caps[2])
}

/// Find a month/year or `YYYYMMDD` stamp in a file name.
pub fn detect_date_in_name(name: &str) -> Option<String> {
    if let Some(caps) = MONTH_YEAR.captures(name) {
        return month_year(&caps[1], &caps[2]);
    }
    let caps = DATE_STAMP.captures(name)?;
    let date = NaiveDate::from_ymd_opt(caps[1].parse().ok()?, caps[2].parse().ok()?, 1)?;
    Some(date.format("%b %Y").to_string())
}

/// Render a month name (full or abbreviated) and year as `"Mon YYYY"`.
pub fn month_year(month: &str, year: &str) -> Option<String> {
    parse_month_year(month, year).map(|d| d.format("%b %Y").to_string())
}

/// The first day of the named month.
pub(crate) fn parse_month_year(month: &str, year: &str) -> Option<NaiveDate> {
    let abbrev: String = month.chars().take(3).collect();
    NaiveDate::parse_from_str(&format!("1 {} {}", abbrev, year), "%d %b %Y").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_cleanup_strips_artifacts() {
        let raw = "Title\r\n\r\n  ![logo](img.png) Intro {MERGEFIELD x} text[12]\u{0000}\n\n\n[Market] stalls  ";
        assert_eq!(basic_cleanup(raw), "Title\nIntro  text\n[Market] stalls");
    }

    #[test]
    fn test_basic_cleanup_keeps_tabs_and_brackets() {
        assert_eq!(basic_cleanup("[Opening on 1 Aug 2024]\ta"), "[Opening on 1 Aug 2024]\ta");
    }

    #[test]
    fn test_from_name_accepts_legacy_names() {
        assert_eq!(Normalizer::from_name("FAQPreprocessor"), Some(Normalizer::Faq));
        assert_eq!(
            Normalizer::from_name("terms_and_conditions"),
            Some(Normalizer::TermsAndConditions)
        );
        assert_eq!(Normalizer::from_name("mystery"), None);
    }

    #[test]
    fn test_detect_date_per_type() {
        assert_eq!(
            detect_date(DocType::Faq, "Last Updated: March 2024").as_deref(),
            Some("Mar 2024")
        );
        assert_eq!(
            detect_date(DocType::TermsAndConditions, "TERMS\nVer 3: August 2024").as_deref(),
            Some("Aug 2024")
        );
        assert_eq!(
            detect_date(DocType::TenderNotice, "[Opening on 1 Aug 2024]").as_deref(),
            Some("Aug 2024")
        );
        assert_eq!(
            detect_date(DocType::TenderNotice, "## Tender Dates\n### Opening\n1 Sept 2024").as_deref(),
            Some("Sep 2024")
        );
        assert_eq!(detect_date(DocType::Faq, "Last Updated: unknown\nTopics"), None);
        assert_eq!(detect_date(DocType::General, "Ver 3: August 2024"), None);
    }

    #[test]
    fn test_detect_date_in_name() {
        assert_eq!(
            detect_date_in_name("Terms and Conditions of eTender (Aug 2024).txt").as_deref(),
            Some("Aug 2024")
        );
        assert_eq!(detect_date_in_name("faq_20240315.txt").as_deref(), Some("Mar 2024"));
        assert_eq!(detect_date_in_name("faq.txt"), None);
    }

    #[test]
    fn test_general_is_passthrough() {
        let raw = RawDocument::new("notes.txt", "  keep\r\n  as is  ", DocType::General);
        let doc = Normalizer::General.process(&raw);
        assert_eq!(doc.content, "  keep\r\n  as is  ");
        assert_eq!(doc.metadata.doc_type, DocType::General);
        assert!(doc.metadata.date.is_none());
        assert!(doc.special_notes.is_none());
    }

    #[test]
    fn test_process_is_deterministic() {
        let raw = RawDocument::new(
            "Aug 2024 Tender Notice.txt",
            "TENDER NOTICE\n[Opening on 1 Aug 2024]\n[Closing on 31 Aug 2024]\n* Halal only +pork-free+",
            DocType::TenderNotice,
        );
        let a = Normalizer::TenderNotice.process(&raw);
        let b = Normalizer::TenderNotice.process(&raw);
        assert_eq!(a, b);
    }
}
