//! Articles-of-sale reference guide.
//!
//! The reference guide arrives as a JSON array of records and is rendered
//! into a markdown document so it can be chunked and indexed alongside the
//! normalized documents:
//!
//! ```text
//! # Guide to Articles of Sale
//!
//! ## Trade Type: Cooked Food
//!
//! ### Chinese Food
//! Article of Sale: Chicken rice, noodles
//! Special Notes: No pork at halal stalls
//! ```
//!
//! Categories appear in the order they are first seen in the input.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{DocType, DocumentMetadata, ProcessedDocument};

/// One record of the reference guide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceRecord {
    #[serde(rename = "Trade Type Category")]
    pub category: String,
    #[serde(rename = "Stall Type")]
    pub stall_type: String,
    #[serde(rename = "Article of Sale")]
    pub rule: String,
    #[serde(rename = "Remarks", default)]
    pub remarks: Option<String>,
}

/// Parse the JSON array form of the guide.
pub fn parse_records(json: &str) -> Result<Vec<ReferenceRecord>> {
    Ok(serde_json::from_str(json)?)
}

/// Render records into the guide document.
pub fn render(records: &[ReferenceRecord]) -> String {
    let mut categories: Vec<(&str, Vec<&ReferenceRecord>)> = Vec::new();
    for record in records {
        match categories.iter_mut().find(|entry| entry.0 == record.category) {
            Some((_, items)) => items.push(record),
            None => categories.push((record.category.as_str(), vec![record])),
        }
    }

    let mut out = String::from("# Guide to Articles of Sale\n\n");
    for (category, items) in categories {
        out.push_str(&format!("\n## Trade Type: {}\n", category));
        for item in items {
            out.push_str(&format!("\n### {}\n", item.stall_type));
            out.push_str(&format!("Article of Sale: {}\n", item.rule));
            if let Some(remarks) = item.remarks.as_deref().filter(|r| !r.trim().is_empty()) {
                out.push_str(&format!("Special Notes: {}\n", remarks));
            }
        }
    }
    out
}

/// Parse and render a guide into a [`ProcessedDocument`].
pub fn process(source: &str, json: &str) -> Result<ProcessedDocument> {
    let records = parse_records(json)?;
    tracing::debug!(source, records = records.len(), "rendered reference guide");
    Ok(ProcessedDocument {
        content: render(&records),
        metadata: DocumentMetadata {
            source: source.to_string(),
            doc_type: DocType::ReferenceGuide,
            date: None,
        },
        special_notes: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON: &str = r#"[
        {"Trade Type Category": "Cooked Food", "Stall Type": "Chinese Food", "Article of Sale": "Chicken rice", "Remarks": "No pork at halal stalls"},
        {"Trade Type Category": "Market", "Stall Type": "Fish", "Article of Sale": "Fresh fish", "Remarks": ""},
        {"Trade Type Category": "Cooked Food", "Stall Type": "Drinks", "Article of Sale": "Coffee, tea", "Remarks": null}
    ]"#;

    #[test]
    fn test_groups_by_category_in_first_seen_order() {
        let doc = process("articles_of_sale", JSON).unwrap();
        let content = &doc.content;
        assert!(content.starts_with("# Guide to Articles of Sale\n"));
        let cooked = content.find("## Trade Type: Cooked Food").unwrap();
        let drinks = content.find("### Drinks").unwrap();
        let market = content.find("## Trade Type: Market").unwrap();
        assert!(cooked < drinks && drinks < market);
        assert_eq!(content.matches("## Trade Type: Cooked Food").count(), 1);
    }

    #[test]
    fn test_remarks_only_when_present() {
        let doc = process("articles_of_sale", JSON).unwrap();
        assert!(doc.content.contains("Article of Sale: Chicken rice\nSpecial Notes: No pork at halal stalls\n"));
        assert!(doc.content.contains("Article of Sale: Fresh fish\n"));
        assert_eq!(doc.content.matches("Special Notes:").count(), 1);
        assert_eq!(doc.metadata.doc_type, DocType::ReferenceGuide);
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(process("articles_of_sale", "{not json").is_err());
    }
}
